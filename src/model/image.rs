use super::Tags;

/// A custom image registered with the platform.
///
/// An image is only a named slot. The container it runs comes from its
/// [`ImageVersion`], which is addressed by the same name.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub arn: String,
    pub name: String,
    pub display_name: String,
    pub role_arn: String,
    pub tags: Tags,
}

/// Complete desired state of an [`Image`].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSpec {
    pub display_name: String,
    pub role_arn: String,
    pub tags: Tags,
}

/// The container behind an image.
///
/// The platform numbers versions from 1. Replacing the base image produces the next
/// number; replacing it with the same base image keeps the current one.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageVersion {
    pub arn: String,
    pub image_name: String,
    pub base_image: String,
    pub version: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageVersionSpec {
    /// Resolved container reference supplied by the image build pipeline.
    pub base_image: String,
}
