//! # Observability & Tracing
//!
//! [`setup_tracing`] installs the subscriber used by every binary in the workspace.
//!
//! ## Configuration
//!
//! The compact format hides the crate/module prefix (`with_target(false)`); log lines
//! identify their origin through structured fields instead (`kind`, `node`, `stack`).
//! Verbosity comes from `RUST_LOG`.
//!
//! ## What Gets Traced
//!
//! - **Service lifecycle**: `Service started` / `Shutdown` per resource kind
//! - **Service requests**: Create, Describe, Replace, Delete and custom Actions
//! - **Reconciliation**: one span per pass (`reconcile` / `teardown`) carrying the stack id,
//!   one event per node with the operation, idempotency key and resulting physical id
//! - **Errors**: the failing node, operation and the rejected payload
//!
//! ## Usage Examples
//!
//! ```bash
//! # Compact logs
//! RUST_LOG=info cargo run
//!
//! # Full payloads of every create and replace
//! RUST_LOG=debug cargo run
//!
//! # Only the reconciler
//! RUST_LOG=reconcile_framework::reconciler=debug cargo run
//! ```
//!
//! ## Pass Trace Example
//!
//! **With `RUST_LOG=info`**:
//!
//! ```text
//! INFO reconcile{stack=studio-dev nodes=4}: Reconciling
//! INFO Created kind="image" name=data-science arn=arn:platform:local:image/data-science/1 size=1
//! INFO reconcile{stack=studio-dev nodes=4}: Created node=Image physical_id=arn:platform:local:image/data-science/1
//! INFO reconcile{stack=studio-dev nodes=4}: Reconciled applied=4
//! ```
//!
//! Running the same pass again prints `Updated` for every node and no `Created` lines.

/// Initializes the global subscriber. Call once, at the start of `main`.
pub fn setup_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();
}
