//! Orchestration: running the hosted platform and deploying configs against it.

pub mod deployment;
pub mod platform_system;

pub use deployment::{DeployError, DeployReport, DeployState, StudioDeployment};
pub use platform_system::PlatformSystem;
