//! # Hosted Service Actor
//!
//! This module defines the `ServiceActor`, an in-process stand-in for one resource kind of
//! the external platform API. It processes requests sequentially and owns its store
//! exclusively, so no locking is involved.

use crate::client::ServiceClient;
use crate::entity::{Hosted, HostedResource};
use crate::error::ServiceError;
use crate::message::ServiceRequest;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// The generic actor that serves one resource kind.
///
/// # Concurrency Model
/// Each `ServiceActor` processes its own requests *sequentially* in a loop. Two callers
/// replacing the same resource are therefore serialized: the later request wins and the
/// earlier spec is gone entirely.
///
/// # Usage Pattern
///
/// 1. **Create**: Call `ServiceActor::new()` to get the `actor` (server) and `client`.
/// 2. **Wire**: Pass dependencies into `actor.run(context)`.
/// 3. **Run**: Spawn the run loop in a background task.
///
/// # Semantics
///
/// * **Create**: rejects a taken name with [`ServiceError::AlreadyExists`], reporting the
///   token the existing resource was created with. Otherwise assigns a fresh ARN
///   (`arn:platform:{region}:{kind}/{name}/{sequence}`); the sequence makes a recreated
///   resource distinguishable from its predecessor.
/// * **Replace**: full replacement via `on_replace`; the ARN never changes.
/// * **Delete**: [`ServiceError::NotFound`] if absent.
pub struct ServiceActor<T: HostedResource> {
    receiver: mpsc::Receiver<ServiceRequest<T>>,
    store: HashMap<String, Hosted<T>>,
    region: String,
    next_sequence: u32,
}

impl<T: HostedResource> ServiceActor<T> {
    /// Creates a new `ServiceActor` and its associated `ServiceClient`.
    ///
    /// * `buffer_size` - capacity of the request channel. Callers wait when it is full.
    /// * `region` - embedded in every ARN the service assigns.
    pub fn new(buffer_size: usize, region: impl Into<String>) -> (Self, ServiceClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            store: HashMap::new(),
            region: region.into(),
            next_sequence: 1,
        };
        (actor, ServiceClient::new(sender))
    }

    fn assign_arn(&mut self, name: &str) -> String {
        let arn = format!(
            "arn:platform:{}:{}/{}/{}",
            self.region,
            T::KIND,
            name,
            self.next_sequence
        );
        self.next_sequence += 1;
        arn
    }

    /// Runs the service loop until every client is dropped.
    ///
    /// The `context` argument is injected into every resource hook.
    pub async fn run(mut self, context: T::Context) {
        let kind = T::KIND;
        info!(kind, "Service started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ServiceRequest::Create {
                    name,
                    client_token,
                    spec,
                    respond_to,
                } => {
                    debug!(kind, %name, ?spec, "Create");
                    if let Some(existing) = self.store.get(&name) {
                        warn!(kind, %name, token = %existing.client_token, "Already exists");
                        let _ = respond_to.send(Err(ServiceError::AlreadyExists {
                            name,
                            client_token: existing.client_token.clone(),
                        }));
                        continue;
                    }

                    let arn = self.assign_arn(&name);
                    match T::from_spec(arn.clone(), &name, spec) {
                        Ok(mut resource) => {
                            if let Err(e) = resource.on_create(&context).await {
                                warn!(kind, %name, error = %e, "on_create failed");
                                let _ = respond_to.send(Err(ServiceError::Rejected(Box::new(e))));
                                continue;
                            }
                            let hosted = Hosted {
                                arn,
                                name: name.clone(),
                                client_token,
                                resource,
                            };
                            self.store.insert(name.clone(), hosted.clone());
                            info!(kind, %name, arn = %hosted.arn, size = self.store.len(), "Created");
                            let _ = respond_to.send(Ok(hosted));
                        }
                        Err(e) => {
                            warn!(kind, %name, error = %e, "Create failed");
                            let _ = respond_to.send(Err(ServiceError::Rejected(Box::new(e))));
                        }
                    }
                }
                ServiceRequest::Describe { name, respond_to } => {
                    let hosted = self.store.get(&name).cloned();
                    debug!(kind, %name, found = hosted.is_some(), "Describe");
                    let _ = respond_to.send(Ok(hosted));
                }
                ServiceRequest::Replace {
                    name,
                    spec,
                    respond_to,
                } => {
                    debug!(kind, %name, ?spec, "Replace");
                    if let Some(hosted) = self.store.get_mut(&name) {
                        if let Err(e) = hosted.resource.on_replace(spec, &context).await {
                            warn!(kind, %name, error = %e, "Replace failed");
                            let _ = respond_to.send(Err(ServiceError::Rejected(Box::new(e))));
                            continue;
                        }
                        info!(kind, %name, "Replaced");
                        let _ = respond_to.send(Ok(hosted.clone()));
                    } else {
                        warn!(kind, %name, "Not found");
                        let _ = respond_to.send(Err(ServiceError::NotFound(name)));
                    }
                }
                ServiceRequest::Delete { name, respond_to } => {
                    debug!(kind, %name, "Delete");
                    if let Some(hosted) = self.store.get(&name) {
                        if let Err(e) = hosted.resource.on_delete(&context).await {
                            warn!(kind, %name, error = %e, "on_delete failed");
                            let _ = respond_to.send(Err(ServiceError::Rejected(Box::new(e))));
                            continue;
                        }
                        self.store.remove(&name);
                        info!(kind, %name, size = self.store.len(), "Deleted");
                        let _ = respond_to.send(Ok(()));
                    } else {
                        warn!(kind, %name, "Not found");
                        let _ = respond_to.send(Err(ServiceError::NotFound(name)));
                    }
                }
                ServiceRequest::Action {
                    name,
                    action,
                    respond_to,
                } => {
                    debug!(kind, %name, ?action, "Action");
                    if let Some(hosted) = self.store.get_mut(&name) {
                        let result = hosted
                            .resource
                            .handle_action(action, &context)
                            .await
                            .map_err(|e| ServiceError::Rejected(Box::new(e)));
                        match &result {
                            Ok(_) => info!(kind, %name, "Action ok"),
                            Err(e) => warn!(kind, %name, error = %e, "Action failed"),
                        }
                        let _ = respond_to.send(result);
                    } else {
                        warn!(kind, %name, "Not found");
                        let _ = respond_to.send(Err(ServiceError::NotFound(name)));
                    }
                }
            }
        }

        info!(kind, size = self.store.len(), "Shutdown");
    }
}
