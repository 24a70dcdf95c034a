use super::ClientError;
use crate::model::UserProfile;
use async_trait::async_trait;
use reconcile_framework::{ServiceClient, ServiceError, ServiceHandle};

/// Client for the user profile service.
#[derive(Clone)]
pub struct UserProfileClient {
    inner: ServiceClient<UserProfile>,
}

impl UserProfileClient {
    pub fn new(inner: ServiceClient<UserProfile>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl ServiceHandle<UserProfile> for UserProfileClient {
    type Error = ClientError;

    fn inner(&self) -> &ServiceClient<UserProfile> {
        &self.inner
    }

    fn map_error(e: ServiceError) -> Self::Error {
        ClientError::service::<UserProfile>(e)
    }
}
