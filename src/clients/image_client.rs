use super::ClientError;
use crate::model::{Image, ImageSpec, ImageVersion, ImageVersionSpec};
use async_trait::async_trait;
use reconcile_framework::{Hosted, ServiceClient, ServiceError, ServiceHandle};
use tracing::instrument;

/// Client for the image service.
#[derive(Clone)]
pub struct ImageClient {
    inner: ServiceClient<Image>,
}

impl ImageClient {
    pub fn new(inner: ServiceClient<Image>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self, spec))]
    pub async fn create_image(
        &self,
        name: &str,
        client_token: &str,
        spec: ImageSpec,
    ) -> Result<Hosted<Image>, ClientError> {
        self.inner
            .create(name, client_token, spec)
            .await
            .map_err(Self::map_error)
    }
}

#[async_trait]
impl ServiceHandle<Image> for ImageClient {
    type Error = ClientError;

    fn inner(&self) -> &ServiceClient<Image> {
        &self.inner
    }

    fn map_error(e: ServiceError) -> Self::Error {
        ClientError::service::<Image>(e)
    }
}

/// Client for the image version service. Versions are addressed by image name.
#[derive(Clone)]
pub struct ImageVersionClient {
    inner: ServiceClient<ImageVersion>,
}

impl ImageVersionClient {
    pub fn new(inner: ServiceClient<ImageVersion>) -> Self {
        Self { inner }
    }

    #[instrument(skip(self))]
    pub async fn publish(
        &self,
        image_name: &str,
        base_image: &str,
    ) -> Result<Hosted<ImageVersion>, ClientError> {
        let spec = ImageVersionSpec {
            base_image: base_image.to_string(),
        };
        let published = match self.inner.describe(image_name).await.map_err(Self::map_error)? {
            Some(_) => self.inner.replace(image_name, spec).await,
            None => self.inner.create(image_name, image_name, spec).await,
        };
        published.map_err(Self::map_error)
    }

    /// Latest version number of `image_name`, if a version was ever published.
    #[instrument(skip(self))]
    pub async fn current_version(&self, image_name: &str) -> Result<Option<u32>, ClientError> {
        Ok(self
            .describe(image_name)
            .await?
            .map(|hosted| hosted.resource.version))
    }
}

#[async_trait]
impl ServiceHandle<ImageVersion> for ImageVersionClient {
    type Error = ClientError;

    fn inner(&self) -> &ServiceClient<ImageVersion> {
        &self.inner
    }

    fn map_error(e: ServiceError) -> Self::Error {
        ClientError::service::<ImageVersion>(e)
    }
}
