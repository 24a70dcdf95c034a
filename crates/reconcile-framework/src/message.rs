//! # Service Messages
//!
//! This module defines the request types exchanged between the [`ServiceClient`](crate::ServiceClient)
//! and the [`ServiceActor`](crate::ServiceActor).

use crate::entity::{Hosted, HostedResource};
use crate::error::ServiceError;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by services.
pub type Response<T> = oneshot::Sender<Result<T, ServiceError>>;

/// Request sent to a hosted service.
///
/// Resources are addressed by **name**, the way the platform API addresses them.
/// The variants map onto the platform's lifecycle calls:
///
/// - **Create**: Registers a new resource under `name`, remembering `client_token`.
///   Fails with [`ServiceError::AlreadyExists`] if the name is taken.
/// - **Describe**: Reads the current resource, if any.
/// - **Replace**: Overwrites the resource with a complete spec (no merge).
/// - **Delete**: Removes the resource. Fails with [`ServiceError::NotFound`] if absent.
/// - **Action**: Executes a kind-specific [`HostedResource::Action`].
#[derive(Debug)]
pub enum ServiceRequest<T: HostedResource> {
    Create {
        name: String,
        client_token: String,
        spec: T::Spec,
        respond_to: Response<Hosted<T>>,
    },
    Describe {
        name: String,
        respond_to: Response<Option<Hosted<T>>>,
    },
    Replace {
        name: String,
        spec: T::Spec,
        respond_to: Response<Hosted<T>>,
    },
    Delete {
        name: String,
        respond_to: Response<()>,
    },
    Action {
        name: String,
        action: T::Action,
        respond_to: Response<T::ActionResult>,
    },
}
