use super::ClientError;
use crate::model::Bucket;
use async_trait::async_trait;
use reconcile_framework::{ServiceClient, ServiceError, ServiceHandle};
use tracing::instrument;

/// Client for the object storage service.
#[derive(Clone)]
pub struct BucketClient {
    inner: ServiceClient<Bucket>,
}

impl BucketClient {
    pub fn new(inner: ServiceClient<Bucket>) -> Self {
        Self { inner }
    }

    /// Physical id of bucket `name`.
    #[instrument(skip(self))]
    pub async fn arn(&self, name: &str) -> Result<String, ClientError> {
        self.describe(name)
            .await?
            .map(|hosted| hosted.arn)
            .ok_or_else(|| ClientError::Missing {
                kind: "bucket",
                name: name.to_string(),
            })
    }
}

#[async_trait]
impl ServiceHandle<Bucket> for BucketClient {
    type Error = ClientError;

    fn inner(&self) -> &ServiceClient<Bucket> {
        &self.inner
    }

    fn map_error(e: ServiceError) -> Self::Error {
        ClientError::service::<Bucket>(e)
    }
}
