//! Node specs of the workspace platform.
//!
//! A [`StudioSpec`] is what a chain declares. On every pass it resolves against the
//! outputs of its predecessors into a [`StudioPayload`], the complete spec the platform
//! receives.

use crate::model::{
    AppImageConfig, AppImageConfigSpec, Bucket, BucketSpec, CustomImage, Domain, DomainSettings,
    Image, ImageSpec, ImageVersion, ImageVersionSpec, JupyterLabSettings, Tags, UserProfile,
    UserProfileSpec,
};
use reconcile_framework::{HostedResource, LogicalId, NodeSpec, ResolveError, Resolved, Upstream};

/// Kind recorded for a domain settings patch. The target is a [`Domain`], but deleting
/// the node clears the list instead of deleting the domain.
pub const DOMAIN_SETTINGS: &str = "domain-settings";

/// Output attributes of an image version node.
pub const IMAGE_NAME: &str = "image_name";
pub const VERSION: &str = "version";

/// One entry of a settings patch, by the logical ids it is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomImageRef {
    pub image_version: LogicalId,
    pub app_image_config: LogicalId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StudioSpec {
    Image {
        name: String,
        display_name: String,
        role_arn: String,
        tags: Tags,
    },
    /// Published under the name of `image`.
    ImageVersion {
        image: LogicalId,
        base_image: String,
    },
    AppImageConfig {
        name: String,
        jupyter_lab: JupyterLabSettings,
        tags: Tags,
    },
    /// The complete custom image list of `domain_id`.
    DomainSettings {
        domain_id: String,
        images: Vec<CustomImageRef>,
    },
    /// Named after the idempotency key when `name` is absent.
    Bucket { name: Option<String>, tags: Tags },
    UserProfile {
        domain_id: String,
        user_name: String,
        execution_role: String,
        tags: Tags,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StudioPayload {
    Image(ImageSpec),
    ImageVersion(ImageVersionSpec),
    AppImageConfig(AppImageConfigSpec),
    DomainSettings(DomainSettings),
    Bucket(BucketSpec),
    UserProfile(UserProfileSpec),
}

impl NodeSpec for StudioSpec {
    type Payload = StudioPayload;

    fn kind(&self) -> &'static str {
        match self {
            StudioSpec::Image { .. } => Image::KIND,
            StudioSpec::ImageVersion { .. } => ImageVersion::KIND,
            StudioSpec::AppImageConfig { .. } => AppImageConfig::KIND,
            StudioSpec::DomainSettings { .. } => DOMAIN_SETTINGS,
            StudioSpec::Bucket { .. } => Bucket::KIND,
            StudioSpec::UserProfile { .. } => UserProfile::KIND,
        }
    }

    fn resolve(&self, upstream: &Upstream<'_>) -> Result<Resolved<StudioPayload>, ResolveError> {
        let resolved = match self {
            StudioSpec::Image {
                name,
                display_name,
                role_arn,
                tags,
            } => Resolved {
                name: name.clone(),
                payload: StudioPayload::Image(ImageSpec {
                    display_name: display_name.clone(),
                    role_arn: role_arn.clone(),
                    tags: tags.clone(),
                }),
            },
            StudioSpec::ImageVersion { image, base_image } => Resolved {
                name: upstream.name(image.as_str())?.to_string(),
                payload: StudioPayload::ImageVersion(ImageVersionSpec {
                    base_image: base_image.clone(),
                }),
            },
            StudioSpec::AppImageConfig {
                name,
                jupyter_lab,
                tags,
            } => Resolved {
                name: name.clone(),
                payload: StudioPayload::AppImageConfig(AppImageConfigSpec {
                    jupyter_lab: jupyter_lab.clone(),
                    tags: tags.clone(),
                }),
            },
            StudioSpec::DomainSettings { domain_id, images } => {
                let custom_images = images
                    .iter()
                    .map(|entry| custom_image(upstream, entry))
                    .collect::<Result<Vec<_>, _>>()?;
                Resolved {
                    name: domain_id.clone(),
                    payload: StudioPayload::DomainSettings(DomainSettings { custom_images }),
                }
            }
            StudioSpec::Bucket { name, tags } => Resolved {
                name: name
                    .clone()
                    .unwrap_or_else(|| upstream.idempotency_key().to_ascii_lowercase()),
                payload: StudioPayload::Bucket(BucketSpec { tags: tags.clone() }),
            },
            StudioSpec::UserProfile {
                domain_id,
                user_name,
                execution_role,
                tags,
            } => Resolved {
                name: user_name.clone(),
                payload: StudioPayload::UserProfile(UserProfileSpec {
                    domain_id: domain_id.clone(),
                    execution_role: execution_role.clone(),
                    tags: tags.clone(),
                }),
            },
        };
        Ok(resolved)
    }
}

fn custom_image(upstream: &Upstream<'_>, entry: &CustomImageRef) -> Result<CustomImage, ResolveError> {
    let version_id = entry.image_version.as_str();
    let raw = upstream.attribute(version_id, VERSION)?;
    let image_version_number = raw
        .parse::<u32>()
        .map_err(|_| ResolveError::MalformedAttribute {
            node: entry.image_version.clone(),
            attribute: VERSION.to_string(),
            value: raw.to_string(),
        })?;
    Ok(CustomImage {
        image_name: upstream.attribute(version_id, IMAGE_NAME)?.to_string(),
        image_version_number,
        app_image_config_name: upstream.name(entry.app_image_config.as_str())?.to_string(),
    })
}

/// Kind targeted by a node of `kind`.
pub(crate) fn hosted_kind(kind: &str) -> &str {
    if kind == DOMAIN_SETTINGS {
        Domain::KIND
    } else {
        kind
    }
}
