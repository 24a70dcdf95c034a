//! # Studio Reconciler
//!
//! Keeps a workspace platform's custom images, the domain settings listing them, and
//! the per-principal storage in line with a declared configuration, and computes who
//! may access which storage.
//!
//! ## Design
//!
//! ### 1. Chains, not scripts
//! Every group of interdependent resources is a [`ResourceChain`](reconcile_framework::ResourceChain)
//! with explicit predecessors. The image chain is
//! `Image → ImageVersion, Image → AppImageConfig → DomainSettings`; creation follows the
//! topological order, deletion its reverse.
//!
//! ### 2. Full replacement
//! The platform never merges. Every pass recomputes the complete payload of every node,
//! including the full custom image list of the domain, and sends it again.
//!
//! ### 3. Idempotent passes
//! Every call carries the idempotency key `"{stack_id}-{logical_id}"`. Running a pass
//! twice changes nothing; a failed pass resumes from the state it returned.
//!
//! ### 4. Additive grants
//! Chains reconcile concurrently and never share mutable state. Access is granted
//! through the identity layer, whose `grant` only ever adds.
//!
//! ## Module Tour
//!
//! ### 1. The platform ([`model`], [`platform`], [`clients`])
//! Resource models, their hosting behavior inside a
//! [`ServiceActor`](reconcile_framework::ServiceActor), and typed clients.
//!
//! ### 2. The chains ([`studio`])
//! [`StudioSpec`](studio::StudioSpec) node specs, the [`StudioHandler`](studio::StudioHandler)
//! executing lifecycle operations, and the chain builders.
//!
//! ### 3. Access ([`access`])
//! The cross-tenant [`PermissionMatrix`](access::PermissionMatrix) and grant application.
//!
//! ### 4. Orchestration ([`config`], [`lifecycle`])
//! [`DeployConfig`](config::DeployConfig) from TOML, the
//! [`PlatformSystem`](lifecycle::PlatformSystem) running every service, and
//! [`StudioDeployment`](lifecycle::StudioDeployment) driving a whole pass.

pub mod access;
pub mod clients;
pub mod config;
pub mod lifecycle;
pub mod model;
pub mod platform;
pub mod studio;
