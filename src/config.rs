//! # Deployment Configuration
//!
//! A deployment is described by one TOML document:
//!
//! ```toml
//! stack_id = "studio-dev"
//! domain_id = "d-studio"
//!
//! [tags]
//! project = "studio"
//!
//! [[images]]
//! id = "data-science"
//! name = "data-science"
//! base_image = "registry.local/data-science:2024.1"
//! role_arn = "arn:platform:local:role/image-builder/1"
//!
//! [[principals]]
//! name = "alice"
//!
//! [shared]
//! level = "read-write"
//! ```
//!
//! Everything not listed above has a default. [`DeployConfig::validate`] runs on every
//! load and rejects documents that could not be deployed before any service is called.

use crate::model::{AccessLevel, JupyterLabSettings, NetworkPlacement, Tags};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    /// Prefix of every idempotency key.
    pub stack_id: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// The domain whose custom image settings are reconciled.
    pub domain_id: String,
    /// Words no logical id may contain.
    #[serde(default = "default_reserved_words")]
    pub reserved_words: Vec<String>,
    /// Request buffer of every hosted service.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Applied to every taggable resource.
    #[serde(default)]
    pub tags: Tags,
    #[serde(default)]
    pub network: NetworkPlacement,
    #[serde(default)]
    pub images: Vec<ImageConfig>,
    #[serde(default)]
    pub principals: Vec<PrincipalConfig>,
    #[serde(default)]
    pub shared: SharedConfig,
}

/// One custom image and the app image config it is launched with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Stable identifier, used to derive logical ids.
    pub id: String,
    pub name: String,
    pub display_name: Option<String>,
    /// Resolved reference produced by the image build pipeline.
    pub base_image: String,
    pub role_arn: String,
    /// Defaults to `"{name}-config"`.
    pub app_image_config: Option<String>,
    #[serde(default)]
    pub jupyter_lab: JupyterLabSettings,
}

impl ImageConfig {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn app_image_config_name(&self) -> String {
        self.app_image_config
            .clone()
            .unwrap_or_else(|| format!("{}-config", self.name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipalConfig {
    /// Identity of the principal. Also its role subject and user profile name.
    pub name: String,
    /// Name of the owned bucket. Derived from the stack and principal when absent.
    pub bucket: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedConfig {
    /// Name of the shared bucket. Derived from the stack when absent.
    pub bucket: Option<String>,
    /// Level every principal gets on the shared bucket.
    pub level: AccessLevel,
    /// Other resources every principal gets `level` on, e.g. a shared code repository.
    pub extra_resources: Vec<String>,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            bucket: None,
            level: AccessLevel::ReadWrite,
            extra_resources: Vec::new(),
        }
    }
}

fn default_region() -> String {
    "local".to_string()
}

fn default_reserved_words() -> Vec<String> {
    vec!["sagemaker".to_string()]
}

fn default_channel_capacity() -> usize {
    32
}

impl DeployConfig {
    /// Reads and validates a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !is_identifier(&self.stack_id) {
            return invalid(format!(
                "stack_id '{}' must be non-empty letters, digits and hyphens",
                self.stack_id
            ));
        }
        if self.region.is_empty() {
            return invalid("region must not be empty".to_string());
        }
        if self.domain_id.is_empty() {
            return invalid("domain_id must not be empty".to_string());
        }
        if self.channel_capacity == 0 {
            return invalid("channel_capacity must be at least 1".to_string());
        }

        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for image in &self.images {
            if !is_identifier(&image.id) {
                return invalid(format!("image id '{}' is not a valid identifier", image.id));
            }
            if !ids.insert(pascal_case(&image.id)) {
                return invalid(format!("image id '{}' is used twice", image.id));
            }
            if !names.insert(image.name.as_str()) {
                return invalid(format!("image name '{}' is used twice", image.name));
            }
            if image.base_image.trim().is_empty() {
                return invalid(format!("image '{}' has an empty base_image", image.id));
            }
        }

        let mut principals = HashSet::new();
        for principal in &self.principals {
            if !is_identifier(&principal.name) {
                return invalid(format!(
                    "principal name '{}' is not a valid identifier",
                    principal.name
                ));
            }
            if !principals.insert(pascal_case(&principal.name)) {
                return invalid(format!("principal '{}' is declared twice", principal.name));
            }
        }
        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// `"data-science"` → `"DataScience"`.
pub(crate) fn pascal_case(s: &str) -> String {
    s.split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
        stack_id = "studio-dev"
        domain_id = "d-studio"

        [tags]
        project = "studio"

        [[images]]
        id = "data-science"
        name = "data-science"
        base_image = "registry.local/data-science:1"
        role_arn = "arn:platform:local:role/image-builder/1"

        [images.jupyter_lab]
        container_arguments = ["--allow-root"]

        [[principals]]
        name = "alice"

        [[principals]]
        name = "bob"
        bucket = "bob-data"

        [shared]
        level = "read"
        extra_resources = ["arn:platform:local:repository/notebooks/1"]
    "#;

    #[test]
    fn test_sample_parses_with_defaults() {
        let config = DeployConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.region, "local");
        assert_eq!(config.reserved_words, vec!["sagemaker"]);
        assert_eq!(config.channel_capacity, 32);
        assert_eq!(config.images[0].display_name(), "data-science");
        assert_eq!(config.images[0].app_image_config_name(), "data-science-config");
        assert_eq!(
            config.images[0].jupyter_lab.container_arguments,
            vec!["--allow-root"]
        );
        assert_eq!(config.principals[1].bucket.as_deref(), Some("bob-data"));
        assert_eq!(config.shared.level, AccessLevel::Read);
        assert_eq!(config.shared.extra_resources.len(), 1);
    }

    #[test]
    fn test_shared_defaults_to_read_write() {
        let config =
            DeployConfig::from_toml("stack_id = \"s\"\ndomain_id = \"d\"\n").unwrap();
        assert_eq!(config.shared, SharedConfig::default());
        assert_eq!(config.shared.level, AccessLevel::ReadWrite);
    }

    #[test]
    fn test_invalid_documents_are_rejected() {
        let cases = [
            "stack_id = \"\"\ndomain_id = \"d\"",
            "stack_id = \"bad id\"\ndomain_id = \"d\"",
            "stack_id = \"s\"\ndomain_id = \"\"",
            "stack_id = \"s\"\ndomain_id = \"d\"\nchannel_capacity = 0",
            "stack_id = \"s\"\ndomain_id = \"d\"\n[[principals]]\nname = \"a\"\n[[principals]]\nname = \"a\"",
            "stack_id = \"s\"\ndomain_id = \"d\"\n[[images]]\nid = \"x\"\nname = \"x\"\nbase_image = \" \"\nrole_arn = \"r\"",
        ];
        for case in cases {
            assert!(
                matches!(DeployConfig::from_toml(case), Err(ConfigError::Invalid(_))),
                "accepted: {case}"
            );
        }
        assert!(matches!(
            DeployConfig::from_toml("stack_id = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = DeployConfig::load(file.path()).unwrap();
        assert_eq!(config.stack_id, "studio-dev");

        let missing = DeployConfig::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(pascal_case("data-science"), "DataScience");
        assert_eq!(pascal_case("alice"), "Alice");
        assert_eq!(pascal_case("r_and_d"), "RAndD");
    }
}
