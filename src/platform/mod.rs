//! # Hosted Platform
//!
//! [`HostedResource`](reconcile_framework::HostedResource) implementations for every
//! resource kind of the workspace platform. Each kind runs in its own
//! [`ServiceActor`](reconcile_framework::ServiceActor); the
//! [`PlatformSystem`](crate::lifecycle::PlatformSystem) spawns and wires them.
//!
//! ## Cross-kind validation
//!
//! Some kinds check their references through the clients injected as `Context`:
//!
//! | Kind | Context | Checks |
//! |------|---------|--------|
//! | [`ImageVersion`](crate::model::ImageVersion) | `ImageClient` | the image exists |
//! | [`Domain`](crate::model::Domain) | [`DomainContext`] | every listed image version and app image config exists |
//! | [`UserProfile`](crate::model::UserProfile) | `DomainClient` | the domain exists |
//!
//! References only point "down" this table, so no two services ever wait on each other.

pub mod app_image_config;
pub mod domain;
pub mod identity;
pub mod image;
pub mod storage;
pub mod user_profile;

pub use domain::DomainContext;
pub use identity::{RoleAction, RoleActionResult};

use crate::clients::ClientError;
use thiserror::Error;

/// Errors raised by hosted resources. Callers see them as
/// [`ServiceError::Rejected`](reconcile_framework::ServiceError::Rejected).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("Invalid {kind} name '{name}': {reason}")]
    InvalidName {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    #[error("Base image must not be empty")]
    EmptyBaseImage,

    #[error("Execution role must not be empty")]
    EmptyExecutionRole,

    #[error("Image not found: {0}")]
    UnknownImage(String),

    #[error("Image '{image}' has no version {version}")]
    UnknownImageVersion { image: String, version: u32 },

    #[error("App image config not found: {0}")]
    UnknownAppImageConfig(String),

    #[error("Image '{0}' is listed more than once")]
    DuplicateCustomImage(String),

    #[error("Domain not found: {0}")]
    UnknownDomain(String),

    #[error("Dependency call failed: {0}")]
    Dependency(String),
}

impl From<ClientError> for PlatformError {
    fn from(e: ClientError) -> Self {
        PlatformError::Dependency(e.to_string())
    }
}

/// Names of images, app image configs and user profiles: 1 to 63 ASCII letters, digits
/// and hyphens, starting and ending with a letter or digit.
pub(crate) fn validate_name(kind: &'static str, name: &str) -> Result<(), PlatformError> {
    let invalid = |reason| PlatformError::InvalidName {
        kind,
        name: name.to_string(),
        reason,
    };
    if name.is_empty() || name.len() > 63 {
        return Err(invalid("must be 1 to 63 characters"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid("only letters, digits and hyphens are allowed"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must start and end with a letter or digit"));
    }
    Ok(())
}

/// Bucket names: 3 to 63 lowercase letters, digits, dots and hyphens, starting and
/// ending with a letter or digit.
pub(crate) fn validate_bucket_name(name: &str) -> Result<(), PlatformError> {
    let invalid = |reason| PlatformError::InvalidName {
        kind: "bucket",
        name: name.to_string(),
        reason,
    };
    if name.len() < 3 || name.len() > 63 {
        return Err(invalid("must be 3 to 63 characters"));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(invalid("only lowercase letters, digits, dots and hyphens are allowed"));
    }
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_alphanumeric());
    if !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
        return Err(invalid("must start and end with a letter or digit"));
    }
    Ok(())
}
