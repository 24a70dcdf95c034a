//! # Cross-Tenant Access
//!
//! [`PermissionMatrix`] computes the grant edges between principals and storage;
//! [`apply_grants`] pushes them to the identity layer.

pub mod apply;
pub mod matrix;

pub use apply::{apply_grants, GrantError, GrantReport};
pub use matrix::{GrantEdge, MatrixError, PermissionMatrix, Principal, SharedGrant};
