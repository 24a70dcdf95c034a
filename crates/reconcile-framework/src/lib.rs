//! # Reconcile Framework
//!
//! Generic machinery for keeping resources of an imperative, full-replacement API in line
//! with a declared, dependency-ordered set of specs.
//!
//! ## Layers
//!
//! ### 1. Hosted services ([`actor`], [`client`], [`client_trait`], [`mock`])
//! An in-process stand-in for the external API: one [`ServiceActor`] per resource kind,
//! processing requests sequentially over a Tokio channel, with a cloneable
//! [`ServiceClient`] in front of it. Resource kinds implement [`HostedResource`].
//!
//! ### 2. Chains ([`chain`])
//! [`ChainBuilder`] validates node declarations (no cycles, no undeclared predecessors,
//! no duplicate or reserved ids) and fixes the plan: topological order for creation,
//! its reverse for deletion.
//!
//! ### 3. Reconciliation ([`reconciler`], [`state`])
//! [`Reconciler`] executes a chain through a [`LifecycleHandler`], threading each node's
//! [`NodeOutput`] into its dependents, and records the result as [`PhysicalState`].
//!
//! ## Concurrency Model
//! Services run in parallel, each in its own task. A single reconciliation pass is
//! sequential; independent chains may be reconciled concurrently on separate tasks.
//!
//! ## Observability
//! `tracing` throughout. See [`tracing`](crate::tracing) for `setup_tracing` and the
//! shape of the output.

pub mod actor;
pub mod chain;
pub mod client;
pub mod client_trait;
pub mod entity;
pub mod error;
pub mod message;
pub mod mock;
pub mod reconciler;
pub mod state;
pub mod tracing;

pub use actor::ServiceActor;
pub use chain::{ChainBuilder, LogicalId, ResourceChain, ResourceNode};
pub use client::ServiceClient;
pub use client_trait::ServiceHandle;
pub use entity::{Hosted, HostedResource};
pub use error::{ChainError, ReconcileError, ResolveError, ServiceError, StateError};
pub use message::ServiceRequest;
pub use reconciler::{
    LifecycleHandler, LifecycleOperation, NodeSpec, Operation, PlannedStep, Reconciler, Resolved,
    Upstream,
};
pub use state::{idempotency_key, NodeOutput, PhysicalRecord, PhysicalState};
