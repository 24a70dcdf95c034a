use super::ClientError;
use crate::model::{Domain, DomainSettings, DomainSpec, NetworkPlacement};
use async_trait::async_trait;
use reconcile_framework::{Hosted, ServiceClient, ServiceError, ServiceHandle};
use tracing::{info, instrument};

/// Client for the domain service.
#[derive(Clone)]
pub struct DomainClient {
    inner: ServiceClient<Domain>,
}

impl DomainClient {
    pub fn new(inner: ServiceClient<Domain>) -> Self {
        Self { inner }
    }

    /// Registers a domain with empty settings. Provisioning an existing domain is a no-op.
    #[instrument(skip(self, network))]
    pub async fn provision(
        &self,
        domain_id: &str,
        network: NetworkPlacement,
    ) -> Result<Hosted<Domain>, ClientError> {
        let spec = DomainSpec::Provision {
            network,
            settings: DomainSettings::default(),
        };
        match self
            .inner
            .create(domain_id, format!("provision-{domain_id}"), spec)
            .await
        {
            Ok(hosted) => {
                info!(arn = %hosted.arn, "Domain provisioned");
                Ok(hosted)
            }
            Err(ServiceError::AlreadyExists { .. }) => {
                self.describe(domain_id)
                    .await?
                    .ok_or_else(|| ClientError::Missing {
                        kind: "domain",
                        name: domain_id.to_string(),
                    })
            }
            Err(e) => Err(Self::map_error(e)),
        }
    }

    /// Current custom image settings of `domain_id`.
    #[instrument(skip(self))]
    pub async fn settings(&self, domain_id: &str) -> Result<DomainSettings, ClientError> {
        self.describe(domain_id)
            .await?
            .map(|hosted| hosted.resource.settings)
            .ok_or_else(|| ClientError::Missing {
                kind: "domain",
                name: domain_id.to_string(),
            })
    }

    /// Replaces the whole settings list of `domain_id`.
    #[instrument(skip(self, settings))]
    pub async fn replace_settings(
        &self,
        domain_id: &str,
        settings: DomainSettings,
    ) -> Result<Hosted<Domain>, ClientError> {
        self.inner
            .replace(domain_id, DomainSpec::Settings(settings))
            .await
            .map_err(Self::map_error)
    }
}

#[async_trait]
impl ServiceHandle<Domain> for DomainClient {
    type Error = ClientError;

    fn inner(&self) -> &ServiceClient<Domain> {
        &self.inner
    }

    fn map_error(e: ServiceError) -> Self::Error {
        ClientError::service::<Domain>(e)
    }
}
