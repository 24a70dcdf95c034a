use super::{validate_name, PlatformError};
use crate::clients::DomainClient;
use crate::model::{UserProfile, UserProfileSpec};
use async_trait::async_trait;
use reconcile_framework::{HostedResource, ServiceHandle};

#[async_trait]
impl HostedResource for UserProfile {
    const KIND: &'static str = "user-profile";
    type Spec = UserProfileSpec;
    type Action = ();
    type ActionResult = ();
    type Context = DomainClient;
    type Error = PlatformError;

    fn from_spec(arn: String, name: &str, spec: UserProfileSpec) -> Result<Self, Self::Error> {
        validate_name(Self::KIND, name)?;
        if spec.execution_role.is_empty() {
            return Err(PlatformError::EmptyExecutionRole);
        }
        Ok(Self {
            arn,
            name: name.to_string(),
            domain_id: spec.domain_id,
            execution_role: spec.execution_role,
            tags: spec.tags,
        })
    }

    /// A profile can only be opened in an existing domain.
    async fn on_create(&mut self, domains: &DomainClient) -> Result<(), Self::Error> {
        match domains.describe(&self.domain_id).await? {
            Some(_) => Ok(()),
            None => Err(PlatformError::UnknownDomain(self.domain_id.clone())),
        }
    }

    async fn on_replace(
        &mut self,
        spec: UserProfileSpec,
        _domains: &DomainClient,
    ) -> Result<(), Self::Error> {
        if spec.execution_role.is_empty() {
            return Err(PlatformError::EmptyExecutionRole);
        }
        self.domain_id = spec.domain_id;
        self.execution_role = spec.execution_role;
        self.tags = spec.tags;
        Ok(())
    }

    async fn handle_action(&mut self, _action: (), _ctx: &DomainClient) -> Result<(), Self::Error> {
        Ok(())
    }
}
