//! Demo: deploys a config twice against an in-process platform, then tears it down.
//!
//! ```bash
//! RUST_LOG=info cargo run -- deploy.toml
//! ```
//!
//! Without an argument a built-in sample config is used.

use reconcile_framework::tracing::setup_tracing;
use studio_reconciler::config::DeployConfig;
use studio_reconciler::lifecycle::{DeployState, PlatformSystem, StudioDeployment};
use tracing::{info, info_span, Instrument};

const SAMPLE: &str = r#"
stack_id = "studio-dev"
domain_id = "d-studio"

[tags]
project = "studio"

[network]
vpc_id = "vpc-local"
subnet_ids = ["subnet-a", "subnet-b"]

[[images]]
id = "data-science"
name = "data-science"
display_name = "Data Science"
base_image = "registry.local/data-science:2024.1"
role_arn = "arn:platform:local:role/image-builder/1"

[images.jupyter_lab]
container_arguments = ["--ServerApp.base_url=/jupyterlab/default"]

[[principals]]
name = "alice"

[[principals]]
name = "bob"

[shared]
level = "read-write"
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    setup_tracing();

    let config = match std::env::args().nth(1) {
        Some(path) => DeployConfig::load(path)?,
        None => DeployConfig::from_toml(SAMPLE)?,
    };
    info!(stack = %config.stack_id, principals = config.principals.len(), "Config loaded");

    let platform = PlatformSystem::new(&config.region, config.channel_capacity);
    platform
        .seed_domain(&config.domain_id, config.network.clone())
        .await?;
    let deployment = StudioDeployment::new(config, &platform);

    let first = deployment
        .deploy(&DeployState::default())
        .instrument(info_span!("first_pass"))
        .await?;
    info!(added = first.grants.added, "First pass done");

    let second = deployment
        .deploy(&first.state)
        .instrument(info_span!("second_pass"))
        .await?;
    info!(
        added = second.grants.added,
        unchanged = second.grants.unchanged,
        same_ids = first.state.physical_ids() == second.state.physical_ids(),
        "Second pass done"
    );

    let remaining = deployment
        .teardown(&second.state)
        .instrument(info_span!("teardown"))
        .await?;
    info!(empty = remaining.is_empty(), "Teardown done");

    drop(deployment);
    platform.shutdown().await?;
    Ok(())
}
