//! Domains and their custom image settings.
//!
//! Settings are replaced wholesale. Before a new list is accepted every entry is checked
//! against the image version and app image config services, so a list can only name
//! resources that already exist.

use super::PlatformError;
use crate::clients::{AppImageConfigClient, ImageVersionClient};
use crate::model::{Domain, DomainSettings, DomainSpec, NetworkPlacement};
use async_trait::async_trait;
use reconcile_framework::{HostedResource, ServiceHandle};
use std::collections::HashSet;
use tracing::info;

/// Clients the domain service validates settings against.
#[derive(Clone)]
pub struct DomainContext {
    pub image_versions: ImageVersionClient,
    pub app_image_configs: AppImageConfigClient,
}

impl DomainContext {
    async fn validate(&self, settings: &DomainSettings) -> Result<(), PlatformError> {
        let mut seen = HashSet::new();
        for entry in &settings.custom_images {
            if !seen.insert(entry.image_name.as_str()) {
                return Err(PlatformError::DuplicateCustomImage(entry.image_name.clone()));
            }

            let version = self
                .image_versions
                .describe(&entry.image_name)
                .await?
                .ok_or_else(|| PlatformError::UnknownImage(entry.image_name.clone()))?;
            if entry.image_version_number == 0
                || entry.image_version_number > version.resource.version
            {
                return Err(PlatformError::UnknownImageVersion {
                    image: entry.image_name.clone(),
                    version: entry.image_version_number,
                });
            }

            if self
                .app_image_configs
                .describe(&entry.app_image_config_name)
                .await?
                .is_none()
            {
                return Err(PlatformError::UnknownAppImageConfig(
                    entry.app_image_config_name.clone(),
                ));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl HostedResource for Domain {
    const KIND: &'static str = "domain";
    type Spec = DomainSpec;
    type Action = ();
    type ActionResult = ();
    type Context = DomainContext;
    type Error = PlatformError;

    fn from_spec(arn: String, name: &str, spec: DomainSpec) -> Result<Self, Self::Error> {
        let (network, settings) = match spec {
            DomainSpec::Provision { network, settings } => (network, settings),
            DomainSpec::Settings(settings) => (NetworkPlacement::default(), settings),
        };
        Ok(Self {
            arn,
            domain_id: name.to_string(),
            network,
            settings,
            revision: 0,
        })
    }

    async fn on_create(&mut self, ctx: &DomainContext) -> Result<(), Self::Error> {
        ctx.validate(&self.settings).await
    }

    async fn on_replace(&mut self, spec: DomainSpec, ctx: &DomainContext) -> Result<(), Self::Error> {
        let settings = match spec {
            DomainSpec::Provision { network, settings } => {
                ctx.validate(&settings).await?;
                self.network = network;
                settings
            }
            DomainSpec::Settings(settings) => {
                ctx.validate(&settings).await?;
                settings
            }
        };
        self.settings = settings;
        self.revision += 1;
        info!(domain = %self.domain_id, images = self.settings.custom_images.len(), revision = self.revision, "Settings replaced");
        Ok(())
    }

    async fn handle_action(&mut self, _action: (), _ctx: &DomainContext) -> Result<(), Self::Error> {
        Ok(())
    }
}
