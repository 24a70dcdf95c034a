//! # HostedResource Trait
//!
//! The `HostedResource` trait defines the contract that every resource kind served by the
//! platform (images, app image configs, domains, ...) must implement to be managed by the
//! generic [`ServiceActor`](crate::actor::ServiceActor). It specifies associated types for the
//! desired spec, custom actions, context and errors, and provides lifecycle hooks
//! (`on_create`, `on_replace`, `on_delete`, `handle_action`).
//!
//! # Full Replacement
//! The platform never merges. `on_replace` receives the complete desired spec and the
//! resource must overwrite every field it owns with it. Anything absent from the new spec
//! is gone afterwards.
//!
//! # Provided Methods (Hooks)
//! - [`HostedResource::on_create`]
//! - [`HostedResource::on_delete`]
//!
//! You do **not** need to implement these unless you want to customize behavior.
//! The default implementation does nothing (`Ok(())`).

use async_trait::async_trait;
use std::fmt::Debug;

/// Trait that any resource kind must implement to be served by a [`ServiceActor`](crate::ServiceActor).
///
/// # Async & Context
/// This trait is `#[async_trait]` so hooks may call other services. The `Context` type is
/// injected into every hook at `run()` time, which lets services depend on each other
/// without constructing them in a particular order.
#[async_trait]
pub trait HostedResource: Clone + Send + Sync + 'static {
    /// Short name of the kind, used in ARNs and log fields (e.g. `"image"`).
    const KIND: &'static str;

    /// The complete desired state sent on create and on every replace.
    type Spec: Send + Sync + Debug;

    /// Enum representing kind-specific operations (e.g. granting access on a role).
    type Action: Send + Sync + Debug;

    /// The result type returned by custom actions.
    type ActionResult: Send + Sync + Debug;

    /// The runtime context (dependencies) injected into the service.
    /// Use `()` if no dependencies are needed.
    type Context: Send + Sync;

    /// The error type for this kind. Surfaced to callers as
    /// [`ServiceError::Rejected`](crate::ServiceError::Rejected).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Construct the resource from its assigned ARN, its name and the spec.
    /// Called synchronously before `on_create`.
    fn from_spec(arn: String, name: &str, spec: Self::Spec) -> Result<Self, Self::Error>;

    // --- Lifecycle Hooks (Async) ---

    /// Called after the resource is constructed and before it becomes visible.
    async fn on_create(&mut self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Overwrite the resource with a complete new spec.
    async fn on_replace(&mut self, spec: Self::Spec, ctx: &Self::Context)
        -> Result<(), Self::Error>;

    /// Called immediately before the resource is removed.
    async fn on_delete(&self, _ctx: &Self::Context) -> Result<(), Self::Error> {
        Ok(())
    }

    // --- Action Handler (Async) ---

    /// Handle a kind-specific action.
    async fn handle_action(
        &mut self,
        action: Self::Action,
        ctx: &Self::Context,
    ) -> Result<Self::ActionResult, Self::Error>;
}

/// A resource as stored by the service, together with the bookkeeping the
/// service keeps for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Hosted<T> {
    /// Physical identifier. Assigned once at create time.
    pub arn: String,
    pub name: String,
    /// Idempotency token the resource was created with.
    pub client_token: String,
    pub resource: T,
}
