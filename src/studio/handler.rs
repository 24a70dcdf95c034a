use super::spec::{hosted_kind, StudioPayload, DOMAIN_SETTINGS, IMAGE_NAME, VERSION};
use crate::clients::{
    AppImageConfigClient, BucketClient, DomainClient, ImageClient, ImageVersionClient,
    UserProfileClient,
};
use crate::model::{
    AppImageConfig, Bucket, Domain, DomainSettings, DomainSpec, Image, ImageVersion, UserProfile,
};
use async_trait::async_trait;
use reconcile_framework::{
    Hosted, HostedResource, LifecycleHandler, LifecycleOperation, NodeOutput, ServiceError,
    ServiceHandle,
};
use tracing::{debug, instrument};

/// Executes lifecycle operations against the hosted platform.
///
/// Every call goes to the service of the node's kind with the node's idempotency key as
/// client token. A domain settings patch is a replace of the domain's settings on create
/// and update, and a replace with an empty list on delete.
#[derive(Clone)]
pub struct StudioHandler {
    pub images: ImageClient,
    pub image_versions: ImageVersionClient,
    pub app_image_configs: AppImageConfigClient,
    pub domains: DomainClient,
    pub buckets: BucketClient,
    pub user_profiles: UserProfileClient,
}

type Op = LifecycleOperation<StudioPayload>;

fn output<T>(hosted: &Hosted<T>) -> NodeOutput {
    NodeOutput::new(&hosted.arn, &hosted.name)
}

fn version_output(hosted: &Hosted<ImageVersion>) -> NodeOutput {
    output(hosted)
        .with_attribute(IMAGE_NAME, &hosted.resource.image_name)
        .with_attribute(VERSION, hosted.resource.version)
}

fn settings_output(hosted: &Hosted<Domain>) -> NodeOutput {
    output(hosted).with_attribute("custom_images", hosted.resource.settings.custom_images.len())
}

fn payload(op: &Op) -> Result<StudioPayload, ServiceError> {
    op.payload
        .clone()
        .ok_or_else(|| ServiceError::Rejected(format!("{} has no payload", op.logical_id).into()))
}

fn unknown_kind(kind: &str) -> ServiceError {
    ServiceError::Rejected(format!("unknown resource kind '{kind}'").into())
}

fn found<T>(hosted: Option<Hosted<T>>, name: &str) -> Result<Hosted<T>, ServiceError> {
    hosted.ok_or_else(|| ServiceError::NotFound(name.to_string()))
}

impl StudioHandler {
    async fn patch_settings(
        &self,
        domain_id: &str,
        settings: DomainSettings,
    ) -> Result<NodeOutput, ServiceError> {
        debug!(domain = domain_id, images = settings.custom_images.len(), "Patching settings");
        let hosted = self
            .domains
            .inner()
            .replace(domain_id, DomainSpec::Settings(settings))
            .await?;
        Ok(settings_output(&hosted))
    }
}

#[async_trait]
impl LifecycleHandler<StudioPayload> for StudioHandler {
    #[instrument(skip_all, fields(node = %op.logical_id, kind = %op.kind))]
    async fn create(&self, op: &Op) -> Result<NodeOutput, ServiceError> {
        let (name, token) = (op.name.as_str(), op.idempotency_key.as_str());
        match payload(op)? {
            StudioPayload::Image(spec) => {
                Ok(output(&self.images.inner().create(name, token, spec).await?))
            }
            StudioPayload::ImageVersion(spec) => Ok(version_output(
                &self.image_versions.inner().create(name, token, spec).await?,
            )),
            StudioPayload::AppImageConfig(spec) => Ok(output(
                &self.app_image_configs.inner().create(name, token, spec).await?,
            )),
            StudioPayload::DomainSettings(settings) => self.patch_settings(name, settings).await,
            StudioPayload::Bucket(spec) => {
                Ok(output(&self.buckets.inner().create(name, token, spec).await?))
            }
            StudioPayload::UserProfile(spec) => Ok(output(
                &self.user_profiles.inner().create(name, token, spec).await?,
            )),
        }
    }

    #[instrument(skip_all, fields(node = %op.logical_id, kind = %op.kind))]
    async fn adopt(&self, op: &Op) -> Result<NodeOutput, ServiceError> {
        let name = op.name.as_str();
        match hosted_kind(&op.kind) {
            Image::KIND => Ok(output(&found(self.images.inner().describe(name).await?, name)?)),
            ImageVersion::KIND => Ok(version_output(&found(
                self.image_versions.inner().describe(name).await?,
                name,
            )?)),
            AppImageConfig::KIND => Ok(output(&found(
                self.app_image_configs.inner().describe(name).await?,
                name,
            )?)),
            Domain::KIND => Ok(settings_output(&found(
                self.domains.inner().describe(name).await?,
                name,
            )?)),
            Bucket::KIND => Ok(output(&found(self.buckets.inner().describe(name).await?, name)?)),
            UserProfile::KIND => Ok(output(&found(
                self.user_profiles.inner().describe(name).await?,
                name,
            )?)),
            other => Err(unknown_kind(other)),
        }
    }

    #[instrument(skip_all, fields(node = %op.logical_id, kind = %op.kind))]
    async fn update(&self, op: &Op, _current: &NodeOutput) -> Result<NodeOutput, ServiceError> {
        let name = op.name.as_str();
        match payload(op)? {
            StudioPayload::Image(spec) => Ok(output(&self.images.inner().replace(name, spec).await?)),
            StudioPayload::ImageVersion(spec) => Ok(version_output(
                &self.image_versions.inner().replace(name, spec).await?,
            )),
            StudioPayload::AppImageConfig(spec) => Ok(output(
                &self.app_image_configs.inner().replace(name, spec).await?,
            )),
            StudioPayload::DomainSettings(settings) => self.patch_settings(name, settings).await,
            StudioPayload::Bucket(spec) => {
                Ok(output(&self.buckets.inner().replace(name, spec).await?))
            }
            StudioPayload::UserProfile(spec) => Ok(output(
                &self.user_profiles.inner().replace(name, spec).await?,
            )),
        }
    }

    #[instrument(skip_all, fields(node = %op.logical_id, kind = %op.kind))]
    async fn delete(&self, op: &Op, _current: &NodeOutput) -> Result<(), ServiceError> {
        let name = op.name.as_str();
        match op.kind.as_str() {
            DOMAIN_SETTINGS => self
                .patch_settings(name, DomainSettings::default())
                .await
                .map(|_| ()),
            Image::KIND => self.images.inner().delete(name).await,
            ImageVersion::KIND => self.image_versions.inner().delete(name).await,
            AppImageConfig::KIND => self.app_image_configs.inner().delete(name).await,
            Bucket::KIND => self.buckets.inner().delete(name).await,
            UserProfile::KIND => self.user_profiles.inner().delete(name).await,
            other => Err(unknown_kind(other)),
        }
    }
}
