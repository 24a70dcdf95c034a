use super::ClientError;
use crate::model::AppImageConfig;
use async_trait::async_trait;
use reconcile_framework::{ServiceClient, ServiceError, ServiceHandle};

/// Client for the app image config service.
#[derive(Clone)]
pub struct AppImageConfigClient {
    inner: ServiceClient<AppImageConfig>,
}

impl AppImageConfigClient {
    pub fn new(inner: ServiceClient<AppImageConfig>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ServiceHandle<AppImageConfig> for AppImageConfigClient {
    type Error = ClientError;

    fn inner(&self) -> &ServiceClient<AppImageConfig> {
        &self.inner
    }

    fn map_error(e: ServiceError) -> Self::Error {
        ClientError::service::<AppImageConfig>(e)
    }
}
