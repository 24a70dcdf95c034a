//! # Service Client
//!
//! Typed handle for talking to a [`ServiceActor`](crate::ServiceActor).

use crate::entity::{Hosted, HostedResource};
use crate::error::ServiceError;
use crate::message::ServiceRequest;
use tokio::sync::{mpsc, oneshot};

/// ## ServiceClient
///
/// The `ServiceClient<T>` forwards lifecycle calls to a `ServiceActor<T>` over a Tokio mpsc
/// channel and awaits the answer on a oneshot channel. It holds only a sender, so it is cheap
/// to clone and share across tasks.
///
/// Channel failures surface as [`ServiceError::ServiceClosed`] (the actor is gone before the
/// request was queued) or [`ServiceError::ServiceDropped`] (the actor went away mid-request).
pub struct ServiceClient<T: HostedResource> {
    sender: mpsc::Sender<ServiceRequest<T>>,
}

impl<T: HostedResource> Clone for ServiceClient<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<T: HostedResource> ServiceClient<T> {
    pub fn new(sender: mpsc::Sender<ServiceRequest<T>>) -> Self {
        Self { sender }
    }

    async fn call<R>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<R, ServiceError>>) -> ServiceRequest<T>,
    ) -> Result<R, ServiceError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| ServiceError::ServiceClosed)?;
        response.await.map_err(|_| ServiceError::ServiceDropped)?
    }

    pub async fn create(
        &self,
        name: impl Into<String>,
        client_token: impl Into<String>,
        spec: T::Spec,
    ) -> Result<Hosted<T>, ServiceError> {
        let name = name.into();
        let client_token = client_token.into();
        self.call(|respond_to| ServiceRequest::Create {
            name,
            client_token,
            spec,
            respond_to,
        })
        .await
    }

    pub async fn describe(&self, name: impl Into<String>) -> Result<Option<Hosted<T>>, ServiceError> {
        let name = name.into();
        self.call(|respond_to| ServiceRequest::Describe { name, respond_to })
            .await
    }

    pub async fn replace(
        &self,
        name: impl Into<String>,
        spec: T::Spec,
    ) -> Result<Hosted<T>, ServiceError> {
        let name = name.into();
        self.call(|respond_to| ServiceRequest::Replace {
            name,
            spec,
            respond_to,
        })
        .await
    }

    pub async fn delete(&self, name: impl Into<String>) -> Result<(), ServiceError> {
        let name = name.into();
        self.call(|respond_to| ServiceRequest::Delete { name, respond_to })
            .await
    }

    pub async fn perform_action(
        &self,
        name: impl Into<String>,
        action: T::Action,
    ) -> Result<T::ActionResult, ServiceError> {
        let name = name.into();
        self.call(|respond_to| ServiceRequest::Action {
            name,
            action,
            respond_to,
        })
        .await
    }
}
