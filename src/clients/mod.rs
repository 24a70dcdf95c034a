//! Type-safe wrappers around [`ServiceClient`](reconcile_framework::ServiceClient), one per
//! platform resource kind.
//!
//! Every client implements [`ServiceHandle`](reconcile_framework::ServiceHandle), so
//! `describe` and `delete` come for free; the methods defined here are the kind-specific
//! calls. Failures are reported as [`ClientError`].

pub mod app_image_config_client;
pub mod domain_client;
pub mod identity_client;
pub mod image_client;
pub mod storage_client;
pub mod user_profile_client;

pub use app_image_config_client::*;
pub use domain_client::*;
pub use identity_client::*;
pub use image_client::*;
pub use storage_client::*;
pub use user_profile_client::*;

use reconcile_framework::{HostedResource, ServiceError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{kind} service: {source}")]
    Service {
        kind: &'static str,
        #[source]
        source: ServiceError,
    },

    #[error("{kind} '{name}' does not exist")]
    Missing { kind: &'static str, name: String },

    #[error("Unexpected answer from the {0} service")]
    UnexpectedResult(&'static str),
}

impl ClientError {
    pub(crate) fn service<T: HostedResource>(source: ServiceError) -> Self {
        ClientError::Service {
            kind: T::KIND,
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            ClientError::Service { source, .. } => source.is_not_found(),
            ClientError::Missing { .. } => true,
            ClientError::UnexpectedResult(_) => false,
        }
    }
}
