//! The chains a deployment is made of.
//!
//! | Chain | Nodes |
//! |-------|-------|
//! | images | per image: `{Id}Image` → `{Id}ImageVersion`, `{Id}Image` → `{Id}AppImageConfig`; then one `DomainSettings` after all of them |
//! | shared | `SharedBucket` |
//! | per principal | `User{Name}Bucket` → `User{Name}Profile` |
//!
//! The chains share one stack id, so logical ids are unique across all of them.

use super::spec::{CustomImageRef, StudioSpec};
use crate::config::{pascal_case, DeployConfig, PrincipalConfig};
use reconcile_framework::{ChainBuilder, ChainError, LogicalId, ResourceChain};

pub const IMAGES_CHAIN: &str = "images";
pub const SHARED_CHAIN: &str = "shared";
pub const SHARED_BUCKET: &str = "SharedBucket";
pub const DOMAIN_SETTINGS_NODE: &str = "DomainSettings";

/// Name of the chain owned by `principal`.
pub fn principal_chain_name(principal: &str) -> String {
    format!("user:{principal}")
}

/// Logical id of the bucket owned by `principal`.
pub fn principal_bucket(principal: &str) -> LogicalId {
    LogicalId::new(format!("User{}Bucket", pascal_case(principal)))
}

fn builder(config: &DeployConfig) -> ChainBuilder<StudioSpec> {
    ChainBuilder::new().with_reserved_words(config.reserved_words.iter().cloned())
}

/// Images, their versions and app image configs, and the domain settings listing them.
pub fn image_chain(config: &DeployConfig) -> Result<ResourceChain<StudioSpec>, ChainError> {
    let mut chain = builder(config);
    let mut entries = Vec::new();

    for image in &config.images {
        let id = pascal_case(&image.id);
        let image_id = format!("{id}Image");
        let version_id = format!("{id}ImageVersion");
        let config_id = format!("{id}AppImageConfig");

        chain.add(
            image_id.as_str(),
            StudioSpec::Image {
                name: image.name.clone(),
                display_name: image.display_name().to_string(),
                role_arn: image.role_arn.clone(),
                tags: config.tags.clone(),
            },
            Vec::<&str>::new(),
        );
        chain.add(
            version_id.as_str(),
            StudioSpec::ImageVersion {
                image: LogicalId::from(image_id.as_str()),
                base_image: image.base_image.clone(),
            },
            [image_id.as_str()],
        );
        chain.add(
            config_id.as_str(),
            StudioSpec::AppImageConfig {
                name: image.app_image_config_name(),
                jupyter_lab: image.jupyter_lab.clone(),
                tags: config.tags.clone(),
            },
            [image_id.as_str()],
        );
        entries.push(CustomImageRef {
            image_version: version_id.into(),
            app_image_config: config_id.into(),
        });
    }

    if !entries.is_empty() {
        let depends_on: Vec<LogicalId> = entries
            .iter()
            .flat_map(|e| [e.image_version.clone(), e.app_image_config.clone()])
            .collect();
        chain.add(
            DOMAIN_SETTINGS_NODE,
            StudioSpec::DomainSettings {
                domain_id: config.domain_id.clone(),
                images: entries,
            },
            depends_on,
        );
    }
    chain.build()
}

/// The bucket every principal shares.
pub fn shared_chain(config: &DeployConfig) -> Result<ResourceChain<StudioSpec>, ChainError> {
    builder(config)
        .node(
            SHARED_BUCKET,
            StudioSpec::Bucket {
                name: config.shared.bucket.clone(),
                tags: config.tags.clone(),
            },
            Vec::<&str>::new(),
        )
        .build()
}

/// The bucket and user profile of one principal. `execution_role` is the ARN of the
/// principal's role.
pub fn principal_chain(
    config: &DeployConfig,
    principal: &PrincipalConfig,
    execution_role: &str,
) -> Result<ResourceChain<StudioSpec>, ChainError> {
    let bucket = principal_bucket(&principal.name);
    let profile = format!("User{}Profile", pascal_case(&principal.name));
    let mut tags = config.tags.clone();
    tags.insert("owner".to_string(), principal.name.clone());

    builder(config)
        .node(
            bucket.clone(),
            StudioSpec::Bucket {
                name: principal.bucket.clone(),
                tags: tags.clone(),
            },
            Vec::<&str>::new(),
        )
        .node(
            profile.as_str(),
            StudioSpec::UserProfile {
                domain_id: config.domain_id.clone(),
                user_name: principal.name.clone(),
                execution_role: execution_role.to_string(),
                tags,
            },
            [bucket],
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageConfig;

    fn config(images: &[&str]) -> DeployConfig {
        let mut config = DeployConfig::from_toml("stack_id = \"s\"\ndomain_id = \"d\"\n").unwrap();
        config.images = images
            .iter()
            .map(|id| ImageConfig {
                id: id.to_string(),
                name: id.to_string(),
                display_name: None,
                base_image: format!("registry/{id}:1"),
                role_arn: "role".to_string(),
                app_image_config: None,
                jupyter_lab: Default::default(),
            })
            .collect();
        config
    }

    fn order<'a>(ids: impl Iterator<Item = &'a LogicalId>) -> Vec<String> {
        ids.map(|id| id.to_string()).collect()
    }

    #[test]
    fn test_image_chain_create_and_delete_order() {
        let chain = image_chain(&config(&["ds"])).unwrap();

        let create = order(chain.create_order().map(|n| &n.logical_id));
        assert_eq!(
            create,
            vec!["DsImage", "DsImageVersion", "DsAppImageConfig", "DomainSettings"]
        );

        let delete = order(chain.delete_order().map(|n| &n.logical_id));
        let mut reversed = create.clone();
        reversed.reverse();
        assert_eq!(delete, reversed);
    }

    #[test]
    fn test_settings_patch_waits_for_every_image() {
        let chain = image_chain(&config(&["ds", "r-lang"])).unwrap();
        let create = order(chain.create_order().map(|n| &n.logical_id));

        assert_eq!(create.len(), 7);
        assert_eq!(create.last().map(String::as_str), Some("DomainSettings"));
        let settings = chain.node(&"DomainSettings".into()).unwrap();
        assert_eq!(settings.depends_on.len(), 4);
    }

    #[test]
    fn test_no_images_means_no_settings_patch() {
        let chain = image_chain(&config(&[])).unwrap();
        assert!(chain.is_empty());
    }

    #[test]
    fn test_reserved_word_in_image_id_is_rejected() {
        let err = image_chain(&config(&["sagemaker-ds"])).unwrap_err();
        assert!(matches!(err, ChainError::ReservedLogicalId { .. }));
    }

    #[test]
    fn test_principal_chain() {
        let config = config(&[]);
        let principal = PrincipalConfig {
            name: "alice".to_string(),
            bucket: None,
        };

        let chain = principal_chain(&config, &principal, "arn:role/alice").unwrap();
        let create = order(chain.create_order().map(|n| &n.logical_id));

        assert_eq!(create, vec!["UserAliceBucket", "UserAliceProfile"]);
        assert_eq!(principal_bucket("alice"), LogicalId::from("UserAliceBucket"));
        assert_eq!(principal_chain_name("alice"), "user:alice");
    }
}
