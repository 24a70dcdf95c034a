//! Role policies: the identity layer's view of one principal.
//!
//! [`RoleAction::Grant`] is additive and idempotent so independent chains can extend
//! the same policy without coordinating. [`RoleAction::Restrict`] is the only way a
//! level goes down; it never adds an edge.

use super::PlatformError;
use crate::model::{AccessLevel, RolePolicy};
use async_trait::async_trait;
use reconcile_framework::HostedResource;
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum RoleAction {
    Grant {
        resource: String,
        level: AccessLevel,
    },
    /// Lowers the level held on `resource` to `level`. A lower or missing grant is
    /// left alone.
    Restrict {
        resource: String,
        level: AccessLevel,
    },
    ListGrants,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoleActionResult {
    /// `true` if the policy changed.
    Grant(bool),
    /// `true` if the policy changed.
    Restrict(bool),
    ListGrants(BTreeMap<String, AccessLevel>),
}

#[async_trait]
impl HostedResource for RolePolicy {
    const KIND: &'static str = "role";
    type Spec = ();
    type Action = RoleAction;
    type ActionResult = RoleActionResult;
    type Context = ();
    type Error = PlatformError;

    fn from_spec(arn: String, name: &str, _spec: ()) -> Result<Self, Self::Error> {
        Ok(Self {
            role_arn: arn,
            subject: name.to_string(),
            grants: BTreeMap::new(),
        })
    }

    async fn on_replace(&mut self, _spec: (), _ctx: &()) -> Result<(), Self::Error> {
        Ok(())
    }

    async fn handle_action(
        &mut self,
        action: RoleAction,
        _ctx: &(),
    ) -> Result<RoleActionResult, Self::Error> {
        match action {
            RoleAction::Grant { resource, level } => {
                let held = self.grants.get(&resource).copied();
                if held.is_some_and(|held| held >= level) {
                    return Ok(RoleActionResult::Grant(false));
                }
                debug!(subject = %self.subject, %resource, %level, "Grant added");
                self.grants.insert(resource, level);
                Ok(RoleActionResult::Grant(true))
            }
            RoleAction::Restrict { resource, level } => match self.grants.get_mut(&resource) {
                Some(held) if *held > level => {
                    let from = *held;
                    *held = level;
                    debug!(subject = %self.subject, %resource, %from, to = %level, "Grant lowered");
                    Ok(RoleActionResult::Restrict(true))
                }
                _ => Ok(RoleActionResult::Restrict(false)),
            },
            RoleAction::ListGrants => Ok(RoleActionResult::ListGrants(self.grants.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RolePolicy {
        RolePolicy::from_spec("arn:platform:local:role/alice/1".to_string(), "alice", ()).unwrap()
    }

    async fn grant(policy: &mut RolePolicy, resource: &str, level: AccessLevel) -> bool {
        match policy
            .handle_action(
                RoleAction::Grant {
                    resource: resource.to_string(),
                    level,
                },
                &(),
            )
            .await
            .unwrap()
        {
            RoleActionResult::Grant(changed) => changed,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_grants_are_additive_and_idempotent() {
        let mut p = policy();
        assert!(grant(&mut p, "bucket-a", AccessLevel::Read).await);
        assert!(!grant(&mut p, "bucket-a", AccessLevel::Read).await);

        // upgrade
        assert!(grant(&mut p, "bucket-a", AccessLevel::ReadWrite).await);
        // never downgraded
        assert!(!grant(&mut p, "bucket-a", AccessLevel::Read).await);
        assert_eq!(p.level("bucket-a"), Some(AccessLevel::ReadWrite));
    }

    async fn restrict(policy: &mut RolePolicy, resource: &str, level: AccessLevel) -> bool {
        match policy
            .handle_action(
                RoleAction::Restrict {
                    resource: resource.to_string(),
                    level,
                },
                &(),
            )
            .await
            .unwrap()
        {
            RoleActionResult::Restrict(changed) => changed,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_restrict_only_lowers() {
        let mut p = policy();
        assert!(grant(&mut p, "bucket-a", AccessLevel::ReadWrite).await);

        assert!(restrict(&mut p, "bucket-a", AccessLevel::Read).await);
        assert_eq!(p.level("bucket-a"), Some(AccessLevel::Read));
        assert!(!restrict(&mut p, "bucket-a", AccessLevel::Read).await);
        assert!(!restrict(&mut p, "bucket-a", AccessLevel::ReadWrite).await);
        assert_eq!(p.level("bucket-a"), Some(AccessLevel::Read));

        // Never adds
        assert!(!restrict(&mut p, "bucket-b", AccessLevel::Read).await);
        assert_eq!(p.level("bucket-b"), None);
    }
}
