use serde::{Deserialize, Serialize};

/// One entry of the domain's custom image list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomImage {
    pub image_name: String,
    pub image_version_number: u32,
    pub app_image_config_name: String,
}

/// The domain's default user settings as far as custom images are concerned.
///
/// Always sent complete: an update replaces the whole list, so an image missing from
/// the new list is detached from the domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSettings {
    pub custom_images: Vec<CustomImage>,
}

/// Network placement of a domain. Opaque to this crate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkPlacement {
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
    pub security_group_ids: Vec<String>,
}

/// A workspace domain. Domains are provisioned outside this crate; only their
/// settings are reconciled.
#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
    pub arn: String,
    pub domain_id: String,
    pub network: NetworkPlacement,
    pub settings: DomainSettings,
    /// Number of settings replacements applied so far.
    pub revision: u32,
}

/// Spec of a domain: its placement at creation, its settings afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainSpec {
    Provision {
        network: NetworkPlacement,
        settings: DomainSettings,
    },
    Settings(DomainSettings),
}
