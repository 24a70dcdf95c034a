//! # Studio Chains
//!
//! The workspace platform seen through the reconcile framework: what a node of a
//! deployment looks like ([`StudioSpec`]), how its operations reach the platform
//! ([`StudioHandler`]), and which chains a deployment consists of ([`chains`]).

pub mod chains;
pub mod handler;
pub mod spec;

pub use handler::StudioHandler;
pub use spec::{CustomImageRef, StudioPayload, StudioSpec};

use reconcile_framework::Reconciler;

/// Reconciler for studio chains.
pub type StudioReconciler = Reconciler<StudioSpec, StudioHandler>;
