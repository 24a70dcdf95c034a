//! Images and their versions.
//!
//! Both kinds are addressed by the image name. A version can only be created for an
//! image that exists, which the version service checks through its injected
//! [`ImageClient`].

use super::{validate_name, PlatformError};
use crate::clients::ImageClient;
use crate::model::{Image, ImageSpec, ImageVersion, ImageVersionSpec};
use async_trait::async_trait;
use reconcile_framework::{HostedResource, ServiceHandle};
use tracing::debug;

#[async_trait]
impl HostedResource for Image {
    const KIND: &'static str = "image";
    type Spec = ImageSpec;
    type Action = ();
    type ActionResult = ();
    type Context = ();
    type Error = PlatformError;

    fn from_spec(arn: String, name: &str, spec: ImageSpec) -> Result<Self, Self::Error> {
        validate_name(Self::KIND, name)?;
        Ok(Self {
            arn,
            name: name.to_string(),
            display_name: spec.display_name,
            role_arn: spec.role_arn,
            tags: spec.tags,
        })
    }

    async fn on_replace(&mut self, spec: ImageSpec, _ctx: &()) -> Result<(), Self::Error> {
        self.display_name = spec.display_name;
        self.role_arn = spec.role_arn;
        self.tags = spec.tags;
        Ok(())
    }

    async fn handle_action(&mut self, _action: (), _ctx: &()) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[async_trait]
impl HostedResource for ImageVersion {
    const KIND: &'static str = "image-version";
    type Spec = ImageVersionSpec;
    type Action = ();
    type ActionResult = ();
    type Context = ImageClient;
    type Error = PlatformError;

    fn from_spec(arn: String, name: &str, spec: ImageVersionSpec) -> Result<Self, Self::Error> {
        if spec.base_image.trim().is_empty() {
            return Err(PlatformError::EmptyBaseImage);
        }
        Ok(Self {
            arn,
            image_name: name.to_string(),
            base_image: spec.base_image,
            version: 1,
        })
    }

    async fn on_create(&mut self, images: &ImageClient) -> Result<(), Self::Error> {
        match images.describe(&self.image_name).await? {
            Some(_) => Ok(()),
            None => Err(PlatformError::UnknownImage(self.image_name.clone())),
        }
    }

    async fn on_replace(
        &mut self,
        spec: ImageVersionSpec,
        _images: &ImageClient,
    ) -> Result<(), Self::Error> {
        if spec.base_image.trim().is_empty() {
            return Err(PlatformError::EmptyBaseImage);
        }
        if spec.base_image != self.base_image {
            self.version += 1;
            debug!(image = %self.image_name, version = self.version, "New image version");
            self.base_image = spec.base_image;
        }
        Ok(())
    }

    async fn handle_action(&mut self, _action: (), _ctx: &ImageClient) -> Result<(), Self::Error> {
        Ok(())
    }
}
