//! # Permission Matrix
//!
//! Who may touch which storage resource. For principals `P1..Pn`, each owning one
//! resource, and a set of shared resources:
//!
//! | Subject | Own resource | Other principals' resources | Shared resources |
//! |---------|--------------|-----------------------------|------------------|
//! | `Pi` | read-write | read | configured level |
//!
//! The matrix is a pure function of its inputs: the same principals and shared
//! resources always give the same edge set, in the same order.

use crate::model::AccessLevel;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatrixError {
    #[error("Principal '{0}' is declared twice")]
    DuplicatePrincipal(String),

    #[error("Resource '{resource}' is owned by both '{first}' and '{second}'")]
    DuplicateOwner {
        resource: String,
        first: String,
        second: String,
    },

    #[error("Resource '{resource}' owned by '{owner}' is also shared")]
    OwnedIsShared { resource: String, owner: String },

    #[error("Shared resource '{0}' is listed twice")]
    DuplicateShared(String),
}

/// A principal and the one resource it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub identity: String,
    pub owned_resource: String,
}

impl Principal {
    pub fn new(identity: impl Into<String>, owned_resource: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            owned_resource: owned_resource.into(),
        }
    }
}

/// A resource every principal gets access to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedGrant {
    pub resource: String,
    pub level: AccessLevel,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GrantEdge {
    pub subject: String,
    pub resource: String,
    pub level: AccessLevel,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionMatrix {
    edges: BTreeSet<GrantEdge>,
}

impl PermissionMatrix {
    pub fn build(principals: &[Principal], shared: &[SharedGrant]) -> Result<Self, MatrixError> {
        let mut identities = HashSet::new();
        let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
        for principal in principals {
            if !identities.insert(principal.identity.as_str()) {
                return Err(MatrixError::DuplicatePrincipal(principal.identity.clone()));
            }
            if let Some(first) = owners.insert(&principal.owned_resource, &principal.identity) {
                return Err(MatrixError::DuplicateOwner {
                    resource: principal.owned_resource.clone(),
                    first: first.to_string(),
                    second: principal.identity.clone(),
                });
            }
        }

        let mut shared_resources = HashSet::new();
        for grant in shared {
            if !shared_resources.insert(grant.resource.as_str()) {
                return Err(MatrixError::DuplicateShared(grant.resource.clone()));
            }
            if let Some(owner) = owners.get(grant.resource.as_str()) {
                return Err(MatrixError::OwnedIsShared {
                    resource: grant.resource.clone(),
                    owner: owner.to_string(),
                });
            }
        }

        let mut edges = BTreeSet::new();
        for subject in principals {
            for owner in principals {
                let level = if subject.identity == owner.identity {
                    AccessLevel::ReadWrite
                } else {
                    AccessLevel::Read
                };
                edges.insert(GrantEdge {
                    subject: subject.identity.clone(),
                    resource: owner.owned_resource.clone(),
                    level,
                });
            }
            for grant in shared {
                edges.insert(GrantEdge {
                    subject: subject.identity.clone(),
                    resource: grant.resource.clone(),
                    level: grant.level,
                });
            }
        }
        Ok(Self { edges })
    }

    pub fn edges(&self) -> impl Iterator<Item = &GrantEdge> + '_ {
        self.edges.iter()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn contains(&self, subject: &str, resource: &str, level: AccessLevel) -> bool {
        self.edges.contains(&GrantEdge {
            subject: subject.to_string(),
            resource: resource.to_string(),
            level,
        })
    }

    pub fn for_subject<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a GrantEdge> + 'a {
        self.edges.iter().filter(move |edge| edge.subject == subject)
    }

    /// Edges grouped by subject.
    pub fn by_subject(&self) -> BTreeMap<&str, Vec<&GrantEdge>> {
        let mut grouped: BTreeMap<&str, Vec<&GrantEdge>> = BTreeMap::new();
        for edge in &self.edges {
            grouped.entry(edge.subject.as_str()).or_default().push(edge);
        }
        grouped
    }
}
