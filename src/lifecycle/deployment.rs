//! # Deployment
//!
//! One deploy pass over a [`DeployConfig`]:
//!
//! 1. Build every chain. Invalid declarations fail here, before any call.
//! 2. Make sure every principal has a role, and record it.
//! 3. Reconcile all chains concurrently, one task per chain.
//! 4. Tear down chains that are no longer configured and remove the recorded roles of
//!    principals that are no longer configured.
//! 5. Build the permission matrix from the bucket ARNs and apply it.
//!
//! Every pass is idempotent: deploying an unchanged config again issues only updates
//! with identical payloads and adds no grants. A failed pass returns the state applied
//! so far in [`DeployError::Reconcile`]; deploying again from it resumes.

use super::platform_system::PlatformSystem;
use crate::access::{
    apply_grants, GrantError, GrantReport, MatrixError, PermissionMatrix, Principal, SharedGrant,
};
use crate::clients::{ClientError, IdentityClient};
use crate::config::{ConfigError, DeployConfig};
use crate::studio::chains::{
    image_chain, principal_bucket, principal_chain, principal_chain_name, shared_chain,
    IMAGES_CHAIN, SHARED_BUCKET, SHARED_CHAIN,
};
use crate::studio::{StudioReconciler, StudioSpec};
use reconcile_framework::{
    ChainError, LogicalId, PhysicalState, PlannedStep, ReconcileError, ResourceChain, StateError,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::{JoinError, JoinSet};
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Chain '{chain}' is invalid: {source}")]
    Chain {
        chain: String,
        #[source]
        source: ChainError,
    },

    #[error(transparent)]
    Matrix(#[from] MatrixError),

    #[error("Role of '{subject}' could not be changed: {source}")]
    Role {
        subject: String,
        #[source]
        source: ClientError,
        state: Box<DeployState>,
    },

    #[error(transparent)]
    Grant(#[from] GrantError),

    #[error("Chain '{chain}' failed: {source}")]
    Reconcile {
        chain: String,
        #[source]
        source: ReconcileError,
        /// Everything applied before the failure, across all chains.
        state: Box<DeployState>,
    },

    #[error("Node '{node}' of chain '{chain}' has no recorded output")]
    MissingOutput { chain: String, node: LogicalId },

    #[error("Reconcile task failed: {0}")]
    Task(#[from] JoinError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Physical state of every chain of a deployment, keyed by chain name, plus the
/// principals whose role the deployment created.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployState {
    #[serde(default)]
    pub chains: BTreeMap<String, PhysicalState>,
    #[serde(default)]
    pub roles: BTreeSet<String>,
}

impl DeployState {
    pub fn chain(&self, name: &str) -> Option<&PhysicalState> {
        self.chains.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty() && self.chains.values().all(PhysicalState::is_empty)
    }

    /// Physical ids of every applied node, keyed by chain and logical id.
    pub fn physical_ids(&self) -> BTreeMap<String, BTreeMap<LogicalId, String>> {
        self.chains
            .iter()
            .map(|(name, state)| (name.clone(), state.physical_ids()))
            .collect()
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StateError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Loads a saved state. A missing file is an empty state.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StateError> {
        match std::fs::read_to_string(path) {
            Ok(json) => Ok(serde_json::from_str(&json)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, chain: String, state: PhysicalState) {
        if state.is_empty() {
            self.chains.remove(&chain);
        } else {
            self.chains.insert(chain, state);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployReport {
    pub state: DeployState,
    pub grants: GrantReport,
    /// The steps the pass issued, per chain.
    pub plan: BTreeMap<String, Vec<PlannedStep>>,
}

/// Deploys one config against a [`PlatformSystem`].
pub struct StudioDeployment {
    config: DeployConfig,
    reconciler: Arc<StudioReconciler>,
    identity: IdentityClient,
}

impl StudioDeployment {
    pub fn new(config: DeployConfig, platform: &PlatformSystem) -> Self {
        let reconciler = StudioReconciler::new(config.stack_id.clone(), platform.handler());
        Self {
            config,
            reconciler: Arc::new(reconciler),
            identity: platform.identity.clone(),
        }
    }

    pub fn config(&self) -> &DeployConfig {
        &self.config
    }

    /// Every configured chain. Principals without an entry in `roles` get an empty
    /// execution role, which is fine for validation and planning only.
    fn chains(
        &self,
        roles: &BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, ResourceChain<StudioSpec>>, DeployError> {
        let invalid = |chain: &str| {
            let chain = chain.to_string();
            move |source: ChainError| DeployError::Chain { chain, source }
        };

        let mut chains = BTreeMap::new();
        chains.insert(
            IMAGES_CHAIN.to_string(),
            image_chain(&self.config).map_err(invalid(IMAGES_CHAIN))?,
        );
        chains.insert(
            SHARED_CHAIN.to_string(),
            shared_chain(&self.config).map_err(invalid(SHARED_CHAIN))?,
        );
        for principal in &self.config.principals {
            let name = principal_chain_name(&principal.name);
            let role = roles.get(&principal.name).map(String::as_str).unwrap_or_default();
            let chain = principal_chain(&self.config, principal, role).map_err(invalid(&name))?;
            chains.insert(name, chain);
        }
        Ok(chains)
    }

    /// The steps `deploy` would issue, without issuing any.
    pub fn plan(
        &self,
        previous: &DeployState,
    ) -> Result<BTreeMap<String, Vec<PlannedStep>>, DeployError> {
        self.config.validate()?;
        let chains = self.chains(&BTreeMap::new())?;
        let empty = PhysicalState::new();
        let mut plan = BTreeMap::new();

        for (name, chain) in &chains {
            let state = previous.chain(name).unwrap_or(&empty);
            let steps = self
                .reconciler
                .plan(chain, state)
                .map_err(|source| DeployError::Reconcile {
                    chain: name.clone(),
                    source,
                    state: Box::new(previous.clone()),
                })?;
            plan.insert(name.clone(), steps);
        }
        for (name, state) in &previous.chains {
            if !chains.contains_key(name) {
                let steps = self
                    .reconciler
                    .plan(&ResourceChain::default(), state)
                    .map_err(|source| DeployError::Reconcile {
                        chain: name.clone(),
                        source,
                        state: Box::new(previous.clone()),
                    })?;
                plan.insert(name.clone(), steps);
            }
        }
        Ok(plan)
    }

    #[instrument(skip_all, fields(stack = %self.config.stack_id))]
    pub async fn deploy(&self, previous: &DeployState) -> Result<DeployReport, DeployError> {
        let plan = self.plan(previous)?;

        let mut state = previous.clone();
        let mut roles = BTreeMap::new();
        for principal in &self.config.principals {
            let arn = match self.identity.ensure_role(&principal.name).await {
                Ok(arn) => arn,
                Err(source) => {
                    return Err(DeployError::Role {
                        subject: principal.name.clone(),
                        source,
                        state: Box::new(state),
                    })
                }
            };
            state.roles.insert(principal.name.clone());
            roles.insert(principal.name.clone(), arn);
        }
        let chains = self.chains(&roles)?;

        let mut tasks = JoinSet::new();
        for (name, chain) in chains.iter() {
            let reconciler = Arc::clone(&self.reconciler);
            let chain = chain.clone();
            let name = name.clone();
            let before = previous.chain(&name).cloned().unwrap_or_default();
            tasks.spawn(async move {
                let result = reconciler.reconcile(&chain, &before).await;
                (name, result)
            });
        }

        let mut failure = None;
        while let Some(joined) = tasks.join_next().await {
            let (name, result) = joined?;
            match result {
                Ok(applied) => state.set(name, applied),
                Err(source) => {
                    warn!(chain = %name, error = %source, "Chain failed");
                    if let Some(applied) = source.applied() {
                        state.set(name.clone(), applied.clone());
                    }
                    failure.get_or_insert((name, source));
                }
            }
        }
        if let Some((chain, source)) = failure {
            return Err(DeployError::Reconcile {
                chain,
                source,
                state: Box::new(state),
            });
        }

        let removed: Vec<String> = previous
            .chains
            .keys()
            .filter(|name| !chains.contains_key(*name))
            .cloned()
            .collect();
        for name in &removed {
            state = self.teardown_chain(name, state).await?;
        }
        let stale: BTreeSet<String> = state
            .roles
            .iter()
            .map(String::as_str)
            .chain(removed.iter().filter_map(|name| name.strip_prefix("user:")))
            .filter(|subject| !roles.contains_key(*subject))
            .map(str::to_string)
            .collect();
        state = self.remove_roles(stale, state).await?;

        let matrix = self.matrix(&state)?;
        let grants = apply_grants(&self.identity, &matrix).await?;
        info!(
            chains = state.chains.len(),
            added = grants.added,
            lowered = grants.lowered,
            "Deployed"
        );
        Ok(DeployReport {
            state,
            grants,
            plan,
        })
    }

    /// Deletes every recorded resource and every recorded role.
    #[instrument(skip_all, fields(stack = %self.config.stack_id))]
    pub async fn teardown(&self, previous: &DeployState) -> Result<DeployState, DeployError> {
        let mut state = previous.clone();
        // Principals first, the image chain last.
        let mut names: Vec<String> = previous.chains.keys().cloned().collect();
        names.sort_by_key(|name| match name.as_str() {
            IMAGES_CHAIN => 2,
            SHARED_CHAIN => 1,
            _ => 0,
        });

        for name in &names {
            state = self.teardown_chain(name, state).await?;
        }
        let subjects: BTreeSet<String> = state
            .roles
            .iter()
            .map(String::as_str)
            .chain(names.iter().filter_map(|name| name.strip_prefix("user:")))
            .map(str::to_string)
            .collect();
        state = self.remove_roles(subjects, state).await?;
        info!("Torn down");
        Ok(state)
    }

    async fn remove_roles(
        &self,
        subjects: BTreeSet<String>,
        mut state: DeployState,
    ) -> Result<DeployState, DeployError> {
        for subject in subjects {
            if let Err(source) = self.identity.remove_role(&subject).await {
                return Err(DeployError::Role {
                    subject,
                    source,
                    state: Box::new(state),
                });
            }
            info!(%subject, "Role removed");
            state.roles.remove(&subject);
        }
        Ok(state)
    }

    async fn teardown_chain(&self, name: &str, mut state: DeployState) -> Result<DeployState, DeployError> {
        let Some(recorded) = state.chain(name).cloned() else {
            return Ok(state);
        };
        match self.reconciler.teardown(&recorded).await {
            Ok(remaining) => {
                state.set(name.to_string(), remaining);
                Ok(state)
            }
            Err(source) => {
                if let Some(applied) = source.applied() {
                    state.set(name.to_string(), applied.clone());
                }
                Err(DeployError::Reconcile {
                    chain: name.to_string(),
                    source,
                    state: Box::new(state),
                })
            }
        }
    }

    fn matrix(&self, state: &DeployState) -> Result<PermissionMatrix, DeployError> {
        let arn = |chain: &str, node: LogicalId| -> Result<String, DeployError> {
            state
                .chain(chain)
                .and_then(|s| s.physical_id(&node))
                .map(str::to_string)
                .ok_or_else(|| DeployError::MissingOutput {
                    chain: chain.to_string(),
                    node,
                })
        };

        let principals = self
            .config
            .principals
            .iter()
            .map(|p| {
                let owned = arn(&principal_chain_name(&p.name), principal_bucket(&p.name))?;
                Ok(Principal::new(&p.name, owned))
            })
            .collect::<Result<Vec<_>, DeployError>>()?;

        let level = self.config.shared.level;
        let mut shared = vec![SharedGrant {
            resource: arn(SHARED_CHAIN, LogicalId::from(SHARED_BUCKET))?,
            level,
        }];
        shared.extend(
            self.config
                .shared
                .extra_resources
                .iter()
                .map(|resource| SharedGrant {
                    resource: resource.clone(),
                    level,
                }),
        );

        Ok(PermissionMatrix::build(&principals, &shared)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile_framework::{Operation, ServiceHandle};

    const CONFIG: &str = r#"
        stack_id = "studio-test"
        domain_id = "d-test"

        [[images]]
        id = "ds"
        name = "ds"
        base_image = "registry/ds:1"
        role_arn = "role"

        [[principals]]
        name = "alice"
    "#;

    #[tokio::test]
    async fn test_plan_of_fresh_deployment_only_creates() {
        let platform = PlatformSystem::new("local", 8);
        let deployment = StudioDeployment::new(DeployConfig::from_toml(CONFIG).unwrap(), &platform);

        let plan = deployment.plan(&DeployState::default()).unwrap();

        assert_eq!(plan.len(), 3);
        assert_eq!(plan["images"].len(), 4);
        assert_eq!(plan["user:alice"].len(), 2);
        assert!(plan
            .values()
            .flatten()
            .all(|step| step.operation == Operation::Create));
    }

    #[tokio::test]
    async fn test_invalid_chain_fails_before_any_call() {
        let platform = PlatformSystem::new("local", 8);
        let mut config = DeployConfig::from_toml(CONFIG).unwrap();
        config.reserved_words = vec!["alice".to_string()];
        let deployment = StudioDeployment::new(config, &platform);

        let err = deployment.deploy(&DeployState::default()).await.unwrap_err();

        assert!(matches!(err, DeployError::Chain { ref chain, .. } if chain == "user:alice"));
        assert!(platform.identity.describe("alice").await.unwrap().is_none());
    }

    #[test]
    fn test_state_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        assert_eq!(DeployState::load(&path).unwrap(), DeployState::default());

        let mut state = DeployState::default();
        state.chains.insert(
            "shared".to_string(),
            PhysicalState::from_json(
                r#"{"records":{"SharedBucket":{"kind":"bucket","output":{"physical_id":"arn:b","name":"b"}}}}"#,
            )
            .unwrap(),
        );
        state.save(&path).unwrap();

        assert_eq!(DeployState::load(&path).unwrap(), state);
    }
}
