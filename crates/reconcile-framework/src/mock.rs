//! # Mock Services & Testing Guide
//!
//! The `MockService<T>` hands out a real `ServiceClient<T>` whose requests are answered
//! from a queue of scripted responses instead of a `ServiceActor`. It is the tool for
//! failure injection: making the third create of a pass fail is one line.
//!
//! ## When to use Mocks vs Real Services
//!
//! | Feature | MockService | Real ServiceActor |
//! |---------|-------------|-------------------|
//! | **State** | None (scripted answers) | Real name-keyed store |
//! | **Error Injection** | Easy (`return_err`) | Needs a resource whose hooks fail |
//! | **Use Case** | Reconciler error paths, client wrappers | Idempotence, adoption, full deployments |
//!
//! ## Testing Strategies
//!
//! <details>
//! <summary><b>Pattern 0: Scripted Service (Pure Mock)</b></summary>
//!
//! ```rust
//! use reconcile_framework::mock::MockService;
//! use reconcile_framework::{HostedResource, ServiceError};
//! use async_trait::async_trait;
//!
//! #[derive(Clone, Debug, PartialEq)]
//! struct Queue { depth: u32 }
//! #[derive(Debug, thiserror::Error)] #[error("queue error")] struct QueueError;
//!
//! #[async_trait]
//! impl HostedResource for Queue {
//!     const KIND: &'static str = "queue";
//!     type Spec = u32; type Action = (); type ActionResult = ();
//!     type Context = (); type Error = QueueError;
//!     fn from_spec(_: String, _: &str, depth: u32) -> Result<Self, Self::Error> {
//!         Ok(Self { depth })
//!     }
//!     async fn on_replace(&mut self, depth: u32, _: &()) -> Result<(), Self::Error> {
//!         self.depth = depth;
//!         Ok(())
//!     }
//!     async fn handle_action(&mut self, _: (), _: &()) -> Result<(), Self::Error> { Ok(()) }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockService::<Queue>::new();
//!     mock.expect_create().return_err(ServiceError::Rejected("throttled".into()));
//!
//!     let client = mock.client();
//!     let err = client.create("jobs", "stack-jobs", 4).await.unwrap_err();
//!     assert!(matches!(err, ServiceError::Rejected(_)));
//!     assert_eq!(mock.received(), vec!["create jobs".to_string()]);
//!     mock.verify();
//! }
//! ```
//! </details>
//!
//! <details>
//! <summary><b>Pattern 1: Single Service Test</b></summary>
//!
//! Spawn a real [`ServiceActor`](crate::ServiceActor) with `tokio::spawn(actor.run(ctx))`
//! and drive it through its client. The reconciler tests in `reconciler.rs` work this way.
//! </details>
//!
//! <details>
//! <summary><b>Pattern 2: Full Platform Integration Test</b></summary>
//!
//! Spawn every service of the platform and run complete deployments against it.
//! See `tests/integration_test.rs` in the workspace root crate.
//! </details>

use crate::client::ServiceClient;
use crate::entity::{Hosted, HostedResource};
use crate::error::ServiceError;
use crate::message::ServiceRequest;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, oneshot};

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

/// A scripted answer to the next request of the matching kind.
enum Expectation<T: HostedResource> {
    Create(Result<Hosted<T>, ServiceError>),
    Describe(Result<Option<Hosted<T>>, ServiceError>),
    Replace(Result<Hosted<T>, ServiceError>),
    Delete(Result<(), ServiceError>),
    Action(Result<T::ActionResult, ServiceError>),
}

type Queue<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

fn lock<V>(mutex: &Mutex<V>) -> MutexGuard<'_, V> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A mock service with expectation tracking for fluent testing.
///
/// Expectations are consumed in order. A request that does not match the next
/// expectation panics the mock task, which drops the responder; the caller then sees
/// [`ServiceError::ServiceDropped`] and [`MockService::verify`] reports the leftovers.
pub struct MockService<T: HostedResource> {
    client: ServiceClient<T>,
    expectations: Queue<T>,
    received: Arc<Mutex<Vec<String>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: HostedResource> Default for MockService<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: HostedResource> MockService<T> {
    /// Creates a new mock service with no expectations. Must be called inside a Tokio runtime.
    pub fn new() -> Self {
        let (sender, mut receiver) = mpsc::channel::<ServiceRequest<T>>(100);
        let expectations: Queue<T> = Arc::new(Mutex::new(VecDeque::new()));
        let received = Arc::new(Mutex::new(Vec::new()));
        let expectations_clone = expectations.clone();
        let received_clone = received.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = lock(&expectations_clone).pop_front();

                match (request, expectation) {
                    (
                        ServiceRequest::Create {
                            name, respond_to, ..
                        },
                        Some(Expectation::Create(response)),
                    ) => {
                        lock(&received_clone).push(format!("create {name}"));
                        let _ = respond_to.send(response);
                    }
                    (
                        ServiceRequest::Describe { name, respond_to },
                        Some(Expectation::Describe(response)),
                    ) => {
                        lock(&received_clone).push(format!("describe {name}"));
                        let _ = respond_to.send(response);
                    }
                    (
                        ServiceRequest::Replace {
                            name, respond_to, ..
                        },
                        Some(Expectation::Replace(response)),
                    ) => {
                        lock(&received_clone).push(format!("replace {name}"));
                        let _ = respond_to.send(response);
                    }
                    (
                        ServiceRequest::Delete { name, respond_to },
                        Some(Expectation::Delete(response)),
                    ) => {
                        lock(&received_clone).push(format!("delete {name}"));
                        let _ = respond_to.send(response);
                    }
                    (
                        ServiceRequest::Action {
                            name, respond_to, ..
                        },
                        Some(Expectation::Action(response)),
                    ) => {
                        lock(&received_clone).push(format!("action {name}"));
                        let _ = respond_to.send(response);
                    }
                    _ => {
                        panic!("Unexpected request or expectation mismatch");
                    }
                }
            }
        });

        Self {
            client: ServiceClient::new(sender),
            expectations,
            received,
            _handle: handle,
        }
    }

    /// Returns the client for use in tests.
    pub fn client(&self) -> ServiceClient<T> {
        self.client.clone()
    }

    pub fn expect_create(&mut self) -> ExpectationBuilder<T, Hosted<T>> {
        self.builder(Expectation::Create)
    }

    pub fn expect_describe(&mut self) -> ExpectationBuilder<T, Option<Hosted<T>>> {
        self.builder(Expectation::Describe)
    }

    pub fn expect_replace(&mut self) -> ExpectationBuilder<T, Hosted<T>> {
        self.builder(Expectation::Replace)
    }

    pub fn expect_delete(&mut self) -> ExpectationBuilder<T, ()> {
        self.builder(Expectation::Delete)
    }

    pub fn expect_action(&mut self) -> ExpectationBuilder<T, T::ActionResult> {
        self.builder(Expectation::Action)
    }

    fn builder<R>(
        &self,
        wrap: fn(Result<R, ServiceError>) -> Expectation<T>,
    ) -> ExpectationBuilder<T, R> {
        ExpectationBuilder {
            wrap,
            expectations: self.expectations.clone(),
        }
    }

    /// Requests answered so far, as `"<operation> <name>"`.
    pub fn received(&self) -> Vec<String> {
        lock(&self.received).clone()
    }

    /// Verifies that all expectations were met.
    pub fn verify(&self) {
        let exps = lock(&self.expectations);
        if !exps.is_empty() {
            panic!("Not all expectations were met. {} remaining", exps.len());
        }
    }
}

/// Builder that queues one scripted answer.
pub struct ExpectationBuilder<T: HostedResource, R> {
    wrap: fn(Result<R, ServiceError>) -> Expectation<T>,
    expectations: Queue<T>,
}

impl<T: HostedResource, R> ExpectationBuilder<T, R> {
    /// Sets the expectation to return a successful result.
    pub fn return_ok(self, value: R) {
        lock(&self.expectations).push_back((self.wrap)(Ok(value)));
    }

    /// Sets the expectation to return an error.
    pub fn return_err(self, error: ServiceError) {
        lock(&self.expectations).push_back((self.wrap)(Err(error)));
    }
}

// =============================================================================
// CHANNEL HELPERS
// =============================================================================

/// Creates a client and the receiver its requests arrive on.
///
/// Use this when a test needs to inspect the full request (including the spec) before
/// answering. **Note**: Consider using [`MockService`] for a more fluent API.
pub fn create_mock_client<T: HostedResource>(
    buffer_size: usize,
) -> (ServiceClient<T>, mpsc::Receiver<ServiceRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ServiceClient::new(sender), receiver)
}

/// Helper to verify that the next message is a Create request.
pub async fn expect_create<T: HostedResource>(
    receiver: &mut mpsc::Receiver<ServiceRequest<T>>,
) -> Option<(
    String,
    String,
    T::Spec,
    oneshot::Sender<Result<Hosted<T>, ServiceError>>,
)> {
    match receiver.recv().await {
        Some(ServiceRequest::Create {
            name,
            client_token,
            spec,
            respond_to,
        }) => Some((name, client_token, spec, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is a Replace request.
pub async fn expect_replace<T: HostedResource>(
    receiver: &mut mpsc::Receiver<ServiceRequest<T>>,
) -> Option<(String, T::Spec, oneshot::Sender<Result<Hosted<T>, ServiceError>>)> {
    match receiver.recv().await {
        Some(ServiceRequest::Replace {
            name,
            spec,
            respond_to,
        }) => Some((name, spec, respond_to)),
        _ => None,
    }
}

/// Helper to verify that the next message is an Action request.
pub async fn expect_action<T: HostedResource>(
    receiver: &mut mpsc::Receiver<ServiceRequest<T>>,
) -> Option<(
    String,
    T::Action,
    oneshot::Sender<Result<T::ActionResult, ServiceError>>,
)> {
    match receiver.recv().await {
        Some(ServiceRequest::Action {
            name,
            action,
            respond_to,
        }) => Some((name, action, respond_to)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    #[derive(Clone, Debug, PartialEq)]
    struct Topic {
        partitions: u32,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("Topic error")]
    struct TopicError;

    #[async_trait]
    impl HostedResource for Topic {
        const KIND: &'static str = "topic";
        type Spec = u32;
        type Action = ();
        type ActionResult = u32;
        type Context = ();
        type Error = TopicError;

        fn from_spec(_arn: String, _name: &str, partitions: u32) -> Result<Self, Self::Error> {
            Ok(Self { partitions })
        }

        async fn on_replace(&mut self, partitions: u32, _ctx: &()) -> Result<(), Self::Error> {
            self.partitions = partitions;
            Ok(())
        }

        async fn handle_action(&mut self, _action: (), _ctx: &()) -> Result<u32, Self::Error> {
            Ok(self.partitions)
        }
    }

    fn hosted(partitions: u32) -> Hosted<Topic> {
        Hosted {
            arn: "arn:platform:test:topic/events/1".to_string(),
            name: "events".to_string(),
            client_token: "stack-events".to_string(),
            resource: Topic { partitions },
        }
    }

    #[tokio::test]
    async fn test_channel_helpers() {
        let (client, mut receiver) = create_mock_client::<Topic>(10);

        let create_task =
            tokio::spawn(async move { client.create("events", "stack-events", 3).await });

        let (name, token, spec, responder) = expect_create(&mut receiver)
            .await
            .expect("Expected Create request");
        assert_eq!(name, "events");
        assert_eq!(token, "stack-events");
        assert_eq!(spec, 3);
        responder.send(Ok(hosted(3))).unwrap();

        let result = create_task.await.unwrap().unwrap();
        assert_eq!(result.resource.partitions, 3);
    }

    #[tokio::test]
    async fn test_mock_service_with_expectations() {
        let mut mock = MockService::<Topic>::new();
        mock.expect_create().return_ok(hosted(1));
        mock.expect_replace().return_ok(hosted(2));
        mock.expect_delete()
            .return_err(ServiceError::NotFound("events".to_string()));

        let client = mock.client();
        client.create("events", "stack-events", 1).await.unwrap();
        let replaced = client.replace("events", 2).await.unwrap();
        assert_eq!(replaced.resource.partitions, 2);
        let err = client.delete("events").await.unwrap_err();
        assert!(err.is_not_found());

        assert_eq!(
            mock.received(),
            vec!["create events", "replace events", "delete events"]
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_mock_service_mismatch_drops_responder() {
        let mut mock = MockService::<Topic>::new();
        mock.expect_describe().return_ok(None);

        let client = mock.client();
        let err = client.delete("events").await.unwrap_err();
        assert!(matches!(err, ServiceError::ServiceDropped));
    }
}
