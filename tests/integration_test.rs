use reconcile_framework::{Operation, ServiceHandle};
use studio_reconciler::config::{DeployConfig, PrincipalConfig};
use studio_reconciler::lifecycle::{DeployError, DeployState, PlatformSystem, StudioDeployment};
use studio_reconciler::model::{AccessLevel, NetworkPlacement};

const CONFIG: &str = r#"
    stack_id = "studio-test"
    domain_id = "d-test"

    [tags]
    project = "studio"

    [[images]]
    id = "ds"
    name = "ds"
    base_image = "registry/ds:1"
    role_arn = "arn:platform:local:role/builder/1"

    [[principals]]
    name = "alice"

    [[principals]]
    name = "bob"
"#;

fn config() -> DeployConfig {
    DeployConfig::from_toml(CONFIG).expect("valid config")
}

async fn platform() -> PlatformSystem {
    let platform = PlatformSystem::new("local", 16);
    platform
        .seed_domain("d-test", NetworkPlacement::default())
        .await
        .expect("domain seeded");
    platform
}

fn bucket_arn(state: &DeployState, chain: &str, node: &str) -> String {
    state
        .chain(chain)
        .and_then(|s| s.physical_id(&node.into()))
        .expect("bucket applied")
        .to_string()
}

/// Full end-to-end deploy with all real services.
#[tokio::test]
async fn test_full_deployment() {
    let platform = platform().await;
    let deployment = StudioDeployment::new(config(), &platform);

    let report = deployment.deploy(&DeployState::default()).await.unwrap();

    // Every step of a fresh deployment is a create
    assert!(report
        .plan
        .values()
        .flatten()
        .all(|step| step.operation == Operation::Create));

    // The domain lists the image at version 1 with its config
    let settings = platform.domains.settings("d-test").await.unwrap();
    assert_eq!(settings.custom_images.len(), 1);
    assert_eq!(settings.custom_images[0].image_name, "ds");
    assert_eq!(settings.custom_images[0].image_version_number, 1);
    assert_eq!(settings.custom_images[0].app_image_config_name, "ds-config");

    // Buckets and profiles exist
    for bucket in [
        "studio-test-sharedbucket",
        "studio-test-useralicebucket",
        "studio-test-userbobbucket",
    ] {
        let hosted = platform.buckets.describe(bucket).await.unwrap();
        assert!(hosted.is_some(), "{bucket} missing");
    }
    let alice = platform.user_profiles.describe("alice").await.unwrap().unwrap();
    assert_eq!(alice.resource.domain_id, "d-test");
    assert_eq!(
        alice.resource.execution_role,
        platform.identity.ensure_role("alice").await.unwrap()
    );

    // 2 own + 2 cross + 2 shared
    assert_eq!(report.grants.added, 6);
    let shared = bucket_arn(&report.state, "shared", "SharedBucket");
    let alice_bucket = bucket_arn(&report.state, "user:alice", "UserAliceBucket");
    let bob_bucket = bucket_arn(&report.state, "user:bob", "UserBobBucket");
    let grants = platform.identity.grants("alice").await.unwrap();
    assert_eq!(grants.get(&alice_bucket), Some(&AccessLevel::ReadWrite));
    assert_eq!(grants.get(&bob_bucket), Some(&AccessLevel::Read));
    assert_eq!(grants.get(&shared), Some(&AccessLevel::ReadWrite));
}

#[tokio::test]
async fn test_redeploy_is_idempotent() {
    let platform = platform().await;
    let deployment = StudioDeployment::new(config(), &platform);

    let first = deployment.deploy(&DeployState::default()).await.unwrap();
    let second = deployment.deploy(&first.state).await.unwrap();

    assert_eq!(first.state.physical_ids(), second.state.physical_ids());
    assert_eq!(second.grants.added, 0);
    assert_eq!(second.grants.unchanged, 6);
    assert!(second
        .plan
        .values()
        .flatten()
        .all(|step| step.operation == Operation::Update));

    let settings = platform.domains.settings("d-test").await.unwrap();
    assert_eq!(settings.custom_images.len(), 1);
    assert_eq!(settings.custom_images[0].image_version_number, 1);
}

#[tokio::test]
async fn test_lowered_shared_level_is_applied() {
    let platform = platform().await;
    let first = StudioDeployment::new(config(), &platform)
        .deploy(&DeployState::default())
        .await
        .unwrap();

    let mut read_only = config();
    read_only.shared.level = AccessLevel::Read;
    let second = StudioDeployment::new(read_only, &platform)
        .deploy(&first.state)
        .await
        .unwrap();

    assert_eq!(second.grants.added, 0);
    assert_eq!(second.grants.lowered, 2);
    let shared = bucket_arn(&second.state, "shared", "SharedBucket");
    for subject in ["alice", "bob"] {
        let grants = platform.identity.grants(subject).await.unwrap();
        assert_eq!(grants.get(&shared), Some(&AccessLevel::Read), "{subject}");
    }
}

#[tokio::test]
async fn test_new_base_image_replaces_the_settings_list() {
    let platform = platform().await;
    let first = StudioDeployment::new(config(), &platform)
        .deploy(&DeployState::default())
        .await
        .unwrap();

    let mut changed = config();
    changed.images[0].base_image = "registry/ds:2".to_string();
    let second = StudioDeployment::new(changed, &platform)
        .deploy(&first.state)
        .await
        .unwrap();

    assert_eq!(first.state.physical_ids(), second.state.physical_ids());
    let settings = platform.domains.settings("d-test").await.unwrap();
    assert_eq!(settings.custom_images.len(), 1);
    assert_eq!(settings.custom_images[0].image_version_number, 2);
    assert_eq!(
        platform.image_versions.current_version("ds").await.unwrap(),
        Some(2)
    );
}

#[tokio::test]
async fn test_renamed_image_replaces_the_old_resources() {
    let platform = platform().await;
    let first = StudioDeployment::new(config(), &platform)
        .deploy(&DeployState::default())
        .await
        .unwrap();

    let mut renamed = config();
    renamed.images[0].name = "ds2".to_string();
    let second = StudioDeployment::new(renamed, &platform)
        .deploy(&first.state)
        .await
        .unwrap();

    // Same logical ids, the retired records are gone
    let images = second.state.chain("images").unwrap();
    assert_eq!(images.len(), 4);
    assert_eq!(
        images.output(&"DsImage".into()).map(|o| o.name.as_str()),
        Some("ds2")
    );

    assert!(platform.images.describe("ds").await.unwrap().is_none());
    assert!(platform.image_versions.describe("ds").await.unwrap().is_none());
    assert!(platform.app_image_configs.describe("ds-config").await.unwrap().is_none());
    assert!(platform.images.describe("ds2").await.unwrap().is_some());
    assert!(platform.app_image_configs.describe("ds2-config").await.unwrap().is_some());

    let settings = platform.domains.settings("d-test").await.unwrap();
    assert_eq!(settings.custom_images.len(), 1);
    assert_eq!(settings.custom_images[0].image_name, "ds2");
    assert_eq!(settings.custom_images[0].app_image_config_name, "ds2-config");
}

#[tokio::test]
async fn test_removed_principal_is_torn_down() {
    let platform = platform().await;
    let first = StudioDeployment::new(config(), &platform)
        .deploy(&DeployState::default())
        .await
        .unwrap();

    let mut without_bob = config();
    without_bob.principals.retain(|p| p.name != "bob");
    let deployment = StudioDeployment::new(without_bob, &platform);

    let plan = deployment.plan(&first.state).unwrap();
    assert!(plan["user:bob"]
        .iter()
        .all(|step| step.operation == Operation::Delete));

    let second = deployment.deploy(&first.state).await.unwrap();

    assert!(second.state.chain("user:bob").is_none());
    assert!(platform.user_profiles.describe("bob").await.unwrap().is_none());
    assert!(platform
        .buckets
        .describe("studio-test-userbobbucket")
        .await
        .unwrap()
        .is_none());
    assert!(platform.identity.describe("bob").await.unwrap().is_none());
    assert_eq!(second.grants.added, 0);
}

#[tokio::test]
async fn test_role_of_failed_principal_is_removed() {
    let platform = platform().await;
    let mut with_carol = config();
    with_carol.principals.push(PrincipalConfig {
        name: "carol".to_string(),
        bucket: Some("BAD_NAME".to_string()),
    });
    let deployment = StudioDeployment::new(with_carol, &platform);

    let state = match deployment.deploy(&DeployState::default()).await {
        Err(DeployError::Reconcile { chain, state, .. }) => {
            assert_eq!(chain, "user:carol");
            state
        }
        other => panic!("unexpected result: {other:?}"),
    };
    // Nothing of carol's chain was applied, the role is recorded
    assert!(state.chain("user:carol").is_none());
    assert!(state.roles.contains("carol"));
    assert!(platform.identity.describe("carol").await.unwrap().is_some());

    // Dropping carol from the config removes the role
    let fixed = StudioDeployment::new(config(), &platform);
    let report = fixed.deploy(&state).await.unwrap();
    assert!(!report.state.roles.contains("carol"));
    assert!(platform.identity.describe("carol").await.unwrap().is_none());

    // Teardown removes the rest
    let remaining = fixed.teardown(&report.state).await.unwrap();
    assert!(remaining.is_empty());
    assert!(platform.identity.describe("alice").await.unwrap().is_none());
    assert!(platform.identity.describe("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn test_teardown_after_failed_principal_removes_its_role() {
    let platform = platform().await;
    let mut with_carol = config();
    with_carol.principals.push(PrincipalConfig {
        name: "carol".to_string(),
        bucket: Some("BAD_NAME".to_string()),
    });
    let deployment = StudioDeployment::new(with_carol, &platform);

    let state = match deployment.deploy(&DeployState::default()).await {
        Err(DeployError::Reconcile { state, .. }) => state,
        other => panic!("unexpected result: {other:?}"),
    };
    let remaining = deployment.teardown(&state).await.unwrap();

    assert!(remaining.is_empty());
    assert!(platform.identity.describe("carol").await.unwrap().is_none());
}

#[tokio::test]
async fn test_teardown_then_recreate() {
    let platform = platform().await;
    let deployment = StudioDeployment::new(config(), &platform);

    let first = deployment.deploy(&DeployState::default()).await.unwrap();
    let remaining = deployment.teardown(&first.state).await.unwrap();

    assert!(remaining.is_empty());
    assert!(platform
        .domains
        .settings("d-test")
        .await
        .unwrap()
        .custom_images
        .is_empty());
    assert!(platform.images.describe("ds").await.unwrap().is_none());
    assert!(platform.app_image_configs.describe("ds-config").await.unwrap().is_none());
    assert!(platform.identity.describe("alice").await.unwrap().is_none());

    // Same topology, fresh physical ids
    let again = deployment.deploy(&remaining).await.unwrap();
    let shape = |state: &DeployState| -> Vec<(String, Vec<(String, String, String)>)> {
        state
            .chains
            .iter()
            .map(|(chain, s)| {
                let nodes = s
                    .records
                    .iter()
                    .map(|(id, r)| (id.to_string(), r.kind.clone(), r.output.name.clone()))
                    .collect();
                (chain.clone(), nodes)
            })
            .collect()
    };
    assert_eq!(shape(&first.state), shape(&again.state));
    assert_eq!(again.grants.added, 6);
}

#[tokio::test]
async fn test_missing_domain_fails_and_resumes() {
    let platform = PlatformSystem::new("local", 16);
    let deployment = StudioDeployment::new(config(), &platform);

    let state = match deployment.deploy(&DeployState::default()).await {
        Err(DeployError::Reconcile { state, .. }) => state,
        other => panic!("unexpected result: {other:?}"),
    };

    // Everything before the settings patch was applied and recorded
    let images = state.chain("images").expect("image chain recorded");
    assert_eq!(images.len(), 3);
    assert!(state.chain("shared").is_some());

    platform
        .seed_domain("d-test", NetworkPlacement::default())
        .await
        .unwrap();
    let report = deployment.deploy(&state).await.unwrap();

    assert_eq!(
        report.state.chain("images").unwrap().physical_id(&"DsImage".into()),
        images.physical_id(&"DsImage".into())
    );
    assert_eq!(report.state.chain("images").unwrap().len(), 4);
    assert_eq!(report.grants.added, 6);
}
