use super::Tags;
use serde::{Deserialize, Serialize};

/// How the JupyterLab app starts a custom image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JupyterLabSettings {
    pub container_arguments: Vec<String>,
    pub container_entrypoint: Vec<String>,
    pub container_environment: std::collections::BTreeMap<String, String>,
}

/// Environment configuration referenced by the domain's custom image list.
#[derive(Debug, Clone, PartialEq)]
pub struct AppImageConfig {
    pub arn: String,
    pub name: String,
    pub jupyter_lab: JupyterLabSettings,
    pub tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppImageConfigSpec {
    pub jupyter_lab: JupyterLabSettings,
    pub tags: Tags,
}
