use super::matrix::PermissionMatrix;
use crate::clients::{ClientError, IdentityClient};
use crate::model::AccessLevel;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum GrantError {
    #[error("Granting to '{subject}' failed: {source}")]
    Client {
        subject: String,
        #[source]
        source: ClientError,
    },

    #[error("Grant task failed: {0}")]
    Task(#[from] JoinError),
}

/// Outcome of applying a matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantReport {
    /// Edges the identity layer did not hold before.
    pub added: usize,
    pub unchanged: usize,
    /// Edges held at a higher level than declared, now lowered.
    #[serde(default)]
    pub lowered: usize,
}

/// Applies every edge of `matrix`, one task per subject.
///
/// Each subject ends up holding exactly the declared level on every resource of the
/// matrix: missing edges are granted, edges held above the declared level are
/// restricted. Applying the same matrix again reports everything as unchanged.
/// Grants on resources outside the matrix are left alone. Roles must exist beforehand.
#[instrument(skip_all, fields(edges = matrix.len()))]
pub async fn apply_grants(
    identity: &IdentityClient,
    matrix: &PermissionMatrix,
) -> Result<GrantReport, GrantError> {
    let mut tasks = JoinSet::new();
    for (subject, edges) in matrix.by_subject() {
        let identity = identity.clone();
        let subject = subject.to_string();
        let edges: Vec<_> = edges
            .into_iter()
            .map(|edge| (edge.resource.clone(), edge.level))
            .collect();

        tasks.spawn(async move {
            converge(&identity, &subject, edges)
                .await
                .map_err(|source| GrantError::Client {
                    subject: subject.clone(),
                    source,
                })
        });
    }

    let mut total = GrantReport::default();
    while let Some(joined) = tasks.join_next().await {
        let report = joined??;
        total.added += report.added;
        total.unchanged += report.unchanged;
        total.lowered += report.lowered;
    }
    info!(
        added = total.added,
        unchanged = total.unchanged,
        lowered = total.lowered,
        "Grants applied"
    );
    Ok(total)
}

async fn converge(
    identity: &IdentityClient,
    subject: &str,
    edges: Vec<(String, AccessLevel)>,
) -> Result<GrantReport, ClientError> {
    let held = identity.grants(subject).await?;
    let mut report = GrantReport::default();
    for (resource, level) in edges {
        match held.get(&resource) {
            Some(current) if *current == level => report.unchanged += 1,
            Some(current) if *current > level => {
                identity.restrict(subject, &resource, level).await?;
                report.lowered += 1;
            }
            _ => {
                if identity.grant(subject, &resource, level).await? {
                    report.added += 1;
                } else {
                    report.unchanged += 1;
                }
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{Principal, SharedGrant};
    use crate::model::RolePolicy;
    use reconcile_framework::ServiceActor;

    fn matrix() -> PermissionMatrix {
        PermissionMatrix::build(
            &[Principal::new("alice", "ra"), Principal::new("bob", "rb")],
            &[SharedGrant {
                resource: "s".to_string(),
                level: AccessLevel::ReadWrite,
            }],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_second_application_adds_nothing() {
        let (actor, client) = ServiceActor::<RolePolicy>::new(8, "local");
        tokio::spawn(actor.run(()));
        let identity = IdentityClient::new(client);
        identity.ensure_role("alice").await.unwrap();
        identity.ensure_role("bob").await.unwrap();

        let first = apply_grants(&identity, &matrix()).await.unwrap();
        assert_eq!(
            first,
            GrantReport {
                added: 6,
                ..Default::default()
            }
        );

        let second = apply_grants(&identity, &matrix()).await.unwrap();
        assert_eq!(
            second,
            GrantReport {
                unchanged: 6,
                ..Default::default()
            }
        );

        let bob = identity.grants("bob").await.unwrap();
        assert_eq!(bob.get("ra"), Some(&AccessLevel::Read));
        assert_eq!(bob.get("rb"), Some(&AccessLevel::ReadWrite));
    }

    #[tokio::test]
    async fn test_lower_shared_level_is_applied() {
        let (actor, client) = ServiceActor::<RolePolicy>::new(8, "local");
        tokio::spawn(actor.run(()));
        let identity = IdentityClient::new(client);
        identity.ensure_role("alice").await.unwrap();
        identity.ensure_role("bob").await.unwrap();
        apply_grants(&identity, &matrix()).await.unwrap();

        let read_only = PermissionMatrix::build(
            &[Principal::new("alice", "ra"), Principal::new("bob", "rb")],
            &[SharedGrant {
                resource: "s".to_string(),
                level: AccessLevel::Read,
            }],
        )
        .unwrap();
        let report = apply_grants(&identity, &read_only).await.unwrap();

        assert_eq!(
            report,
            GrantReport {
                added: 0,
                unchanged: 4,
                lowered: 2
            }
        );
        for subject in ["alice", "bob"] {
            let grants = identity.grants(subject).await.unwrap();
            assert_eq!(grants.get("s"), Some(&AccessLevel::Read), "{subject}");
        }
        // Own buckets keep read-write
        assert_eq!(
            identity.grants("alice").await.unwrap().get("ra"),
            Some(&AccessLevel::ReadWrite)
        );
        let again = apply_grants(&identity, &read_only).await.unwrap();
        assert_eq!(again.unchanged, 6);
        assert_eq!(again.lowered, 0);
    }

    #[tokio::test]
    async fn test_missing_role_names_the_subject() {
        let (actor, client) = ServiceActor::<RolePolicy>::new(8, "local");
        tokio::spawn(actor.run(()));
        let identity = IdentityClient::new(client);
        identity.ensure_role("alice").await.unwrap();

        let err = apply_grants(&identity, &matrix()).await.unwrap_err();
        assert!(matches!(err, GrantError::Client { ref subject, .. } if subject == "bob"));
    }
}
