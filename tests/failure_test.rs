use reconcile_framework::mock::MockService;
use reconcile_framework::{
    Hosted, LogicalId, Operation, PhysicalState, ReconcileError, Reconciler, ServiceError,
};
use studio_reconciler::clients::DomainClient;
use studio_reconciler::config::DeployConfig;
use studio_reconciler::lifecycle::PlatformSystem;
use studio_reconciler::model::{Domain, DomainSettings, NetworkPlacement};
use studio_reconciler::studio::chains::image_chain;

const CONFIG: &str = r#"
    stack_id = "studio-test"
    domain_id = "d-test"

    [[images]]
    id = "ds"
    name = "ds"
    base_image = "registry/ds:1"
    role_arn = "arn:platform:local:role/builder/1"
"#;

fn domain() -> Hosted<Domain> {
    Hosted {
        arn: "arn:platform:local:domain/d-test/1".to_string(),
        name: "d-test".to_string(),
        client_token: "provision-d-test".to_string(),
        resource: Domain {
            arn: "arn:platform:local:domain/d-test/1".to_string(),
            domain_id: "d-test".to_string(),
            network: NetworkPlacement::default(),
            settings: DomainSettings::default(),
            revision: 1,
        },
    }
}

/// The settings patch fails once; the retry resumes from the recorded state.
#[tokio::test]
async fn test_failed_patch_aborts_and_retry_resumes() {
    let platform = PlatformSystem::new("local", 16);
    let mut mock = MockService::<Domain>::new();
    mock.expect_replace()
        .return_err(ServiceError::Rejected("throttled".into()));
    mock.expect_replace().return_ok(domain());

    let mut handler = platform.handler();
    handler.domains = DomainClient::new(mock.client());
    let reconciler = Reconciler::new("studio-test", handler);
    let chain = image_chain(&DeployConfig::from_toml(CONFIG).unwrap()).unwrap();

    let err = reconciler
        .reconcile(&chain, &PhysicalState::new())
        .await
        .unwrap_err();

    assert_eq!(err.node(), Some(&LogicalId::from("DomainSettings")));
    assert!(err.is_retryable());
    match &err {
        ReconcileError::ExternalCall {
            operation, payload, ..
        } => {
            assert_eq!(*operation, Operation::Create);
            assert!(payload.contains("ds-config"), "{payload}");
        }
        other => panic!("unexpected error: {other}"),
    }

    // The three upstream nodes stay applied, nothing was rolled back
    let applied = err.applied().unwrap().clone();
    assert_eq!(applied.len(), 3);
    assert!(applied.get(&"DomainSettings".into()).is_none());

    let state = reconciler.reconcile(&chain, &applied).await.unwrap();

    assert_eq!(state.len(), 4);
    for id in ["DsImage", "DsImageVersion", "DsAppImageConfig"] {
        let id = LogicalId::from(id);
        assert_eq!(state.physical_id(&id), applied.physical_id(&id));
    }
    assert_eq!(
        state.physical_id(&"DomainSettings".into()),
        Some("arn:platform:local:domain/d-test/1")
    );
    assert_eq!(mock.received(), vec!["replace d-test", "replace d-test"]);
    mock.verify();
}

/// A dropped service surfaces as a retryable failure of the node that called it.
#[tokio::test]
async fn test_dropped_service_is_retryable() {
    let platform = PlatformSystem::new("local", 16);
    let mut mock = MockService::<Domain>::new();
    mock.expect_replace().return_err(ServiceError::ServiceDropped);

    let mut handler = platform.handler();
    handler.domains = DomainClient::new(mock.client());
    let reconciler = Reconciler::new("studio-test", handler);
    let chain = image_chain(&DeployConfig::from_toml(CONFIG).unwrap()).unwrap();

    let err = reconciler
        .reconcile(&chain, &PhysicalState::new())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert_eq!(err.applied().map(PhysicalState::len), Some(3));
    mock.verify();
}
