use super::ClientError;
use crate::model::{AccessLevel, RolePolicy};
use crate::platform::{RoleAction, RoleActionResult};
use async_trait::async_trait;
use reconcile_framework::{ServiceClient, ServiceError, ServiceHandle};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Client for the identity service: one role policy per principal, keyed by subject.
#[derive(Clone)]
pub struct IdentityClient {
    inner: ServiceClient<RolePolicy>,
}

impl IdentityClient {
    pub fn new(inner: ServiceClient<RolePolicy>) -> Self {
        Self { inner }
    }

    /// Makes sure `subject` has a role and returns its ARN.
    #[instrument(skip(self))]
    pub async fn ensure_role(&self, subject: &str) -> Result<String, ClientError> {
        match self.inner.create(subject, format!("role-{subject}"), ()).await {
            Ok(hosted) => Ok(hosted.arn),
            Err(ServiceError::AlreadyExists { .. }) => {
                debug!("Role already exists");
                self.describe(subject)
                    .await?
                    .map(|hosted| hosted.arn)
                    .ok_or_else(|| ClientError::Missing {
                        kind: "role",
                        name: subject.to_string(),
                    })
            }
            Err(e) => Err(Self::map_error(e)),
        }
    }

    /// Grants `level` on `resource`. Returns `true` if the policy changed.
    #[instrument(skip(self))]
    pub async fn grant(
        &self,
        subject: &str,
        resource: &str,
        level: AccessLevel,
    ) -> Result<bool, ClientError> {
        let action = RoleAction::Grant {
            resource: resource.to_string(),
            level,
        };
        match self
            .inner
            .perform_action(subject, action)
            .await
            .map_err(Self::map_error)?
        {
            RoleActionResult::Grant(changed) => Ok(changed),
            _ => Err(ClientError::UnexpectedResult("role")),
        }
    }

    /// Lowers the level `subject` holds on `resource` to `level`. Returns `true` if the
    /// policy changed.
    #[instrument(skip(self))]
    pub async fn restrict(
        &self,
        subject: &str,
        resource: &str,
        level: AccessLevel,
    ) -> Result<bool, ClientError> {
        let action = RoleAction::Restrict {
            resource: resource.to_string(),
            level,
        };
        match self
            .inner
            .perform_action(subject, action)
            .await
            .map_err(Self::map_error)?
        {
            RoleActionResult::Restrict(changed) => Ok(changed),
            _ => Err(ClientError::UnexpectedResult("role")),
        }
    }

    #[instrument(skip(self))]
    pub async fn grants(&self, subject: &str) -> Result<BTreeMap<String, AccessLevel>, ClientError> {
        match self
            .inner
            .perform_action(subject, RoleAction::ListGrants)
            .await
            .map_err(Self::map_error)?
        {
            RoleActionResult::ListGrants(grants) => Ok(grants),
            _ => Err(ClientError::UnexpectedResult("role")),
        }
    }

    /// Deletes the role of `subject`. A role that is already gone counts as removed.
    #[instrument(skip(self))]
    pub async fn remove_role(&self, subject: &str) -> Result<(), ClientError> {
        self.delete_if_present(subject).await
    }
}

#[async_trait]
impl ServiceHandle<RolePolicy> for IdentityClient {
    type Error = ClientError;

    fn inner(&self) -> &ServiceClient<RolePolicy> {
        &self.inner
    }

    fn map_error(e: ServiceError) -> Self::Error {
        ClientError::service::<RolePolicy>(e)
    }
}
