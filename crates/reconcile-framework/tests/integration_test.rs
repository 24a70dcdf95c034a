use async_trait::async_trait;
use reconcile_framework::{HostedResource, ServiceActor, ServiceClient, ServiceError, ServiceHandle};

// --- Test Resource ---

#[derive(Clone, Debug, PartialEq)]
struct Repository {
    arn: String,
    description: String,
    collaborators: Vec<String>,
}

#[derive(Debug)]
struct RepositorySpec {
    description: String,
}

#[derive(Debug)]
enum RepositoryAction {
    AddCollaborator(String),
}

#[derive(Debug, thiserror::Error)]
enum RepositoryError {
    #[error("Description must not be empty")]
    EmptyDescription,
}

#[async_trait]
impl HostedResource for Repository {
    const KIND: &'static str = "repository";
    type Spec = RepositorySpec;
    type Action = RepositoryAction;
    type ActionResult = bool;
    type Context = ();
    type Error = RepositoryError;

    fn from_spec(arn: String, _name: &str, spec: RepositorySpec) -> Result<Self, Self::Error> {
        if spec.description.is_empty() {
            return Err(RepositoryError::EmptyDescription);
        }
        Ok(Self {
            arn,
            description: spec.description,
            collaborators: Vec::new(),
        })
    }

    async fn on_replace(
        &mut self,
        spec: RepositorySpec,
        _ctx: &Self::Context,
    ) -> Result<(), Self::Error> {
        if spec.description.is_empty() {
            return Err(RepositoryError::EmptyDescription);
        }
        self.description = spec.description;
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: RepositoryAction,
        _ctx: &Self::Context,
    ) -> Result<bool, Self::Error> {
        match action {
            RepositoryAction::AddCollaborator(who) => {
                if self.collaborators.contains(&who) {
                    Ok(false)
                } else {
                    self.collaborators.push(who);
                    Ok(true)
                }
            }
        }
    }
}

fn spec(description: &str) -> RepositorySpec {
    RepositorySpec {
        description: description.to_string(),
    }
}

// --- Tests ---

#[tokio::test]
async fn test_service_full_lifecycle() {
    let (actor, client) = ServiceActor::<Repository>::new(10, "local");
    tokio::spawn(actor.run(()));

    // 1. Create
    let created = client
        .create("notebooks", "stack-Repo", spec("shared notebooks"))
        .await
        .unwrap();
    assert_eq!(created.arn, "arn:platform:local:repository/notebooks/1");
    assert_eq!(created.resource.arn, created.arn);
    assert_eq!(created.client_token, "stack-Repo");

    // 2. Same name again is reported with the original token
    let err = client
        .create("notebooks", "other-token", spec("duplicate"))
        .await
        .unwrap_err();
    match err {
        ServiceError::AlreadyExists { name, client_token } => {
            assert_eq!(name, "notebooks");
            assert_eq!(client_token, "stack-Repo");
        }
        other => panic!("expected AlreadyExists, got {other:?}"),
    }

    // 3. Actions are idempotent
    let added = client
        .perform_action("notebooks", RepositoryAction::AddCollaborator("alice".into()))
        .await
        .unwrap();
    assert!(added);
    let added = client
        .perform_action("notebooks", RepositoryAction::AddCollaborator("alice".into()))
        .await
        .unwrap();
    assert!(!added);

    // 4. Replace keeps the ARN
    let replaced = client
        .replace("notebooks", spec("team notebooks"))
        .await
        .unwrap();
    assert_eq!(replaced.arn, created.arn);
    assert_eq!(replaced.resource.description, "team notebooks");

    // 5. Rejected replace leaves the resource untouched
    let err = client.replace("notebooks", spec("")).await.unwrap_err();
    assert!(matches!(err, ServiceError::Rejected(_)));
    let current = client.describe("notebooks").await.unwrap().unwrap();
    assert_eq!(current.resource.description, "team notebooks");

    // 6. Delete, then delete again
    client.delete("notebooks").await.unwrap();
    assert!(client.describe("notebooks").await.unwrap().is_none());
    let err = client.delete("notebooks").await.unwrap_err();
    assert!(err.is_not_found());

    // 7. Recreating under the same name yields a new ARN
    let recreated = client
        .create("notebooks", "stack-Repo", spec("shared notebooks"))
        .await
        .unwrap();
    assert_ne!(recreated.arn, created.arn);
}

#[tokio::test]
async fn test_missing_resource_is_not_found() {
    let (actor, client) = ServiceActor::<Repository>::new(10, "local");
    tokio::spawn(actor.run(()));

    let err = client
        .replace("ghost", spec("anything"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = client
        .perform_action("ghost", RepositoryAction::AddCollaborator("bob".into()))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_invalid_spec_is_rejected_and_not_stored() {
    let (actor, client) = ServiceActor::<Repository>::new(10, "local");
    tokio::spawn(actor.run(()));

    let err = client.create("empty", "t", spec("")).await.unwrap_err();
    assert!(matches!(err, ServiceError::Rejected(_)));
    assert!(client.describe("empty").await.unwrap().is_none());
}

#[tokio::test]
async fn test_closed_service() {
    let (actor, client) = ServiceActor::<Repository>::new(10, "local");
    drop(actor);

    let err = client.describe("anything").await.unwrap_err();
    assert!(matches!(err, ServiceError::ServiceClosed));
}

// --- Typed handle ---

struct RepositoryClient {
    inner: ServiceClient<Repository>,
}

#[async_trait]
impl ServiceHandle<Repository> for RepositoryClient {
    type Error = String;

    fn inner(&self) -> &ServiceClient<Repository> {
        &self.inner
    }

    fn map_error(e: ServiceError) -> Self::Error {
        format!("repository: {e}")
    }
}

#[tokio::test]
async fn test_handle_maps_errors_and_tolerates_missing_on_delete_if_present() {
    let (actor, client) = ServiceActor::<Repository>::new(10, "local");
    tokio::spawn(actor.run(()));
    client
        .create("notebooks", "stack-Repo", spec("notebooks"))
        .await
        .unwrap();
    let handle = RepositoryClient { inner: client };

    let described = handle.describe("notebooks").await.unwrap().unwrap();
    assert_eq!(described.resource.description, "notebooks");

    handle.delete_if_present("notebooks").await.unwrap();
    handle.delete_if_present("notebooks").await.unwrap();
    assert!(handle.describe("notebooks").await.unwrap().is_none());

    let err = handle.delete("notebooks").await.unwrap_err();
    assert!(err.starts_with("repository: "), "{err}");
}
