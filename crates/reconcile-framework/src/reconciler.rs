//! # External Lifecycle Reconciler
//!
//! Drives a [`ResourceChain`] against a service that only understands imperative
//! create / replace / delete calls with full-replacement semantics.
//!
//! ## Contract
//!
//! `reconcile(desired, previous) -> new state | error`
//!
//! * **Create**: the node's idempotency key (`"{stack_id}-{logical_id}"`) travels with the
//!   call as client token. If the service answers that the name is taken by a resource
//!   carrying the *same* token, the resource is adopted and then updated so it converges.
//!   A different token is a name collision and fatal.
//! * **Update**: the complete payload is recomputed and sent again. The service replaces
//!   the resource wholesale, so anything absent from the payload disappears.
//! * **Replacement**: when a node's name or kind changes, the new resource is created and
//!   the old one stays recorded as `"{logical_id}#{old_name}"`. It is deleted with the
//!   orphans, so a failed delete is retried by the next pass.
//! * **Delete**: "not found" counts as success.
//! * **Ordering**: strictly sequential in plan order. A node resolves its inputs from the
//!   outputs of its declared predecessors only, after they were acknowledged.
//! * **Failure**: the first failing call aborts the pass. Nothing is rolled back; the
//!   error carries the state applied so far and feeding it back into `reconcile`
//!   resumes from the first unapplied node.

use crate::chain::{topological_order, LogicalId, ResourceChain};
use crate::error::{ReconcileError, ResolveError, ServiceError};
use crate::state::{idempotency_key, NodeOutput, PhysicalRecord, PhysicalState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "Create",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
        })
    }
}

/// Read access to the outputs a node is entitled to see.
///
/// Only declared predecessors are visible; anything else is an
/// [`ResolveError::UndeclaredReference`], even if it was already applied.
pub struct Upstream<'a> {
    allowed: &'a BTreeSet<LogicalId>,
    state: &'a PhysicalState,
    key: &'a str,
}

impl<'a> Upstream<'a> {
    pub fn new(allowed: &'a BTreeSet<LogicalId>, state: &'a PhysicalState, key: &'a str) -> Self {
        Self {
            allowed,
            state,
            key,
        }
    }

    /// The node's own idempotency key. Also the default resource name.
    pub fn idempotency_key(&self) -> &str {
        self.key
    }

    pub fn output(&self, logical_id: &str) -> Result<&'a NodeOutput, ResolveError> {
        let id = LogicalId::from(logical_id);
        if !self.allowed.contains(&id) {
            return Err(ResolveError::UndeclaredReference(id));
        }
        self.state
            .output(&id)
            .ok_or(ResolveError::MissingOutput(id))
    }

    pub fn physical_id(&self, logical_id: &str) -> Result<&'a str, ResolveError> {
        Ok(self.output(logical_id)?.physical_id.as_str())
    }

    pub fn name(&self, logical_id: &str) -> Result<&'a str, ResolveError> {
        Ok(self.output(logical_id)?.name.as_str())
    }

    pub fn attribute(&self, logical_id: &str, attribute: &str) -> Result<&'a str, ResolveError> {
        self.output(logical_id)?
            .attribute(attribute)
            .ok_or_else(|| ResolveError::MissingAttribute {
                node: logical_id.into(),
                attribute: attribute.to_string(),
            })
    }
}

/// Name and complete payload of a node, computed fresh on every pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved<P> {
    pub name: String,
    pub payload: P,
}

/// A declared spec the reconciler can turn into lifecycle calls.
pub trait NodeSpec: Send + Sync {
    type Payload: Clone + Debug + PartialEq + Send + Sync;

    /// Resource kind, recorded in the physical state and used to route deletes.
    fn kind(&self) -> &'static str;

    fn resolve(&self, upstream: &Upstream<'_>) -> Result<Resolved<Self::Payload>, ResolveError>;
}

/// One call the reconciler asks a [`LifecycleHandler`] to make.
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleOperation<P> {
    pub operation: Operation,
    pub logical_id: LogicalId,
    pub kind: String,
    pub name: String,
    pub idempotency_key: String,
    /// `None` for deletes.
    pub payload: Option<P>,
}

impl<P: Debug> LifecycleOperation<P> {
    fn payload_debug(&self) -> String {
        match &self.payload {
            Some(payload) => format!("{payload:?}"),
            None => "-".to_string(),
        }
    }
}

/// The imperative side: one method per call the external service offers.
#[async_trait]
pub trait LifecycleHandler<P: Send + Sync>: Send + Sync {
    /// Issue the create call. The service answers [`ServiceError::AlreadyExists`] when the
    /// name is taken.
    async fn create(&self, op: &LifecycleOperation<P>) -> Result<NodeOutput, ServiceError>;

    /// Read back a resource whose create reported it already exists under our token.
    async fn adopt(&self, op: &LifecycleOperation<P>) -> Result<NodeOutput, ServiceError>;

    /// Reissue the full payload against an existing resource.
    async fn update(
        &self,
        op: &LifecycleOperation<P>,
        current: &NodeOutput,
    ) -> Result<NodeOutput, ServiceError>;

    /// Issue the inverse call. The reconciler treats [`ServiceError::NotFound`] as success.
    async fn delete(
        &self,
        op: &LifecycleOperation<P>,
        current: &NodeOutput,
    ) -> Result<(), ServiceError>;
}

/// One step of a dry run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedStep {
    pub operation: Operation,
    pub logical_id: LogicalId,
}

/// Executes chains for one stack through one handler.
pub struct Reconciler<S, H> {
    stack_id: String,
    handler: H,
    _spec: PhantomData<fn() -> S>,
}

impl<S, H> Reconciler<S, H>
where
    S: NodeSpec,
    H: LifecycleHandler<S::Payload>,
{
    pub fn new(stack_id: impl Into<String>, handler: H) -> Self {
        Self {
            stack_id: stack_id.into(),
            handler,
            _spec: PhantomData,
        }
    }

    pub fn stack_id(&self) -> &str {
        &self.stack_id
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// The calls `reconcile` would issue, without issuing any.
    pub fn plan(
        &self,
        chain: &ResourceChain<S>,
        previous: &PhysicalState,
    ) -> Result<Vec<PlannedStep>, ReconcileError> {
        let mut steps: Vec<PlannedStep> = chain
            .create_order()
            .map(|node| PlannedStep {
                operation: if previous.get(&node.logical_id).is_some() {
                    Operation::Update
                } else {
                    Operation::Create
                },
                logical_id: node.logical_id.clone(),
            })
            .collect();

        let (_, orphans) = undeclared(chain, previous);
        steps.extend(
            deletion_order(previous, &orphans)?
                .into_iter()
                .map(|logical_id| PlannedStep {
                    operation: Operation::Delete,
                    logical_id,
                }),
        );
        Ok(steps)
    }

    /// Brings the service in line with `chain`, starting from `previous`.
    ///
    /// Declared nodes are applied in creation order. Recorded nodes that are no longer
    /// declared are deleted afterwards, dependents first.
    #[instrument(skip_all, fields(stack = %self.stack_id, nodes = chain.len()))]
    pub async fn reconcile(
        &self,
        chain: &ResourceChain<S>,
        previous: &PhysicalState,
    ) -> Result<PhysicalState, ReconcileError> {
        let mut applied = previous.clone();
        // Node id to the retired id of the resource it replaced during this pass.
        let mut retiring: BTreeMap<LogicalId, LogicalId> = BTreeMap::new();
        info!("Reconciling");

        for node in chain.create_order() {
            let key = idempotency_key(&self.stack_id, &node.logical_id);
            let resolved = {
                let upstream = Upstream::new(&node.depends_on, &applied, &key);
                node.spec.resolve(&upstream)
            };
            let resolved = match resolved {
                Ok(resolved) => resolved,
                Err(source) => {
                    return Err(ReconcileError::Resolve {
                        node: node.logical_id.clone(),
                        source,
                        applied: Box::new(applied),
                    })
                }
            };

            let kind = node.spec.kind();
            let existing = applied.get(&node.logical_id).cloned();
            let output = match existing {
                Some(record) if record.kind == kind && record.output.name == resolved.name => {
                    let op = self.operation(Operation::Update, &node.logical_id, kind, resolved);
                    self.update(&op, &record.output, &applied).await?
                }
                Some(record) => {
                    // Identity changed: the new resource comes up first, the old one stays
                    // recorded under a retired id until the orphan sweep deletes it.
                    info!(node = %node.logical_id, from = %record.output.name, to = %resolved.name, "Replacing");
                    let op = self.operation(Operation::Create, &node.logical_id, kind, resolved);
                    let output = self.create(&op, &applied).await?;
                    let retired_id = retired(&node.logical_id, &record.output.name);
                    let depends_on = record
                        .depends_on
                        .iter()
                        .flat_map(|dep| [Some(dep.clone()), retiring.get(dep).cloned()])
                        .flatten()
                        .collect();
                    applied.insert(
                        retired_id.clone(),
                        PhysicalRecord {
                            depends_on,
                            ..record
                        },
                    );
                    retiring.insert(node.logical_id.clone(), retired_id);
                    output
                }
                None => {
                    let op = self.operation(Operation::Create, &node.logical_id, kind, resolved);
                    self.create(&op, &applied).await?
                }
            };

            applied.insert(
                node.logical_id.clone(),
                PhysicalRecord {
                    kind: kind.to_string(),
                    depends_on: node.depends_on.clone(),
                    output,
                },
            );
        }

        let (live, orphans) = undeclared(chain, &applied);
        for id in live {
            // A declared node took this resource over again, it must survive.
            debug!(node = %id, "Dropping record of a resource still in use");
            applied.remove(&id);
        }
        if !orphans.is_empty() {
            info!(count = orphans.len(), "Deleting orphans");
            self.delete_all(&mut applied, &orphans).await?;
        }

        info!(applied = applied.len(), "Reconciled");
        Ok(applied)
    }

    /// Deletes every recorded node, dependents first.
    #[instrument(skip_all, fields(stack = %self.stack_id, nodes = previous.len()))]
    pub async fn teardown(&self, previous: &PhysicalState) -> Result<PhysicalState, ReconcileError> {
        let mut applied = previous.clone();
        let all: Vec<LogicalId> = applied.records.keys().cloned().collect();
        info!("Tearing down");
        self.delete_all(&mut applied, &all).await?;
        info!("Torn down");
        Ok(applied)
    }

    fn operation(
        &self,
        operation: Operation,
        logical_id: &LogicalId,
        kind: &str,
        resolved: Resolved<S::Payload>,
    ) -> LifecycleOperation<S::Payload> {
        LifecycleOperation {
            operation,
            logical_id: logical_id.clone(),
            kind: kind.to_string(),
            name: resolved.name,
            idempotency_key: idempotency_key(&self.stack_id, logical_id),
            payload: Some(resolved.payload),
        }
    }

    fn failure(
        op: &LifecycleOperation<S::Payload>,
        source: ServiceError,
        applied: &PhysicalState,
    ) -> ReconcileError {
        warn!(node = %op.logical_id, operation = %op.operation, error = %source, "Call failed");
        ReconcileError::ExternalCall {
            node: op.logical_id.clone(),
            operation: op.operation,
            payload: op.payload_debug(),
            source,
            applied: Box::new(applied.clone()),
        }
    }

    async fn create(
        &self,
        op: &LifecycleOperation<S::Payload>,
        applied: &PhysicalState,
    ) -> Result<NodeOutput, ReconcileError> {
        debug!(node = %op.logical_id, key = %op.idempotency_key, name = %op.name, "Create");
        match self.handler.create(op).await {
            Ok(output) => {
                info!(node = %op.logical_id, physical_id = %output.physical_id, "Created");
                Ok(output)
            }
            Err(ServiceError::AlreadyExists { name, client_token })
                if client_token == op.idempotency_key =>
            {
                info!(node = %op.logical_id, %name, "Adopting existing resource");
                let adopted = self
                    .handler
                    .adopt(op)
                    .await
                    .map_err(|e| Self::failure(op, e, applied))?;
                let update = LifecycleOperation {
                    operation: Operation::Update,
                    ..op.clone()
                };
                self.update(&update, &adopted, applied).await
            }
            Err(ServiceError::AlreadyExists { name, client_token }) => {
                warn!(node = %op.logical_id, %name, owner = %client_token, "Name collision");
                Err(ReconcileError::NameCollision {
                    node: op.logical_id.clone(),
                    name,
                    owner: client_token,
                    applied: Box::new(applied.clone()),
                })
            }
            Err(e) => Err(Self::failure(op, e, applied)),
        }
    }

    async fn update(
        &self,
        op: &LifecycleOperation<S::Payload>,
        current: &NodeOutput,
        applied: &PhysicalState,
    ) -> Result<NodeOutput, ReconcileError> {
        debug!(node = %op.logical_id, key = %op.idempotency_key, payload = ?op.payload, "Update");
        let output = self
            .handler
            .update(op, current)
            .await
            .map_err(|e| Self::failure(op, e, applied))?;
        if output.physical_id != current.physical_id {
            return Err(ReconcileError::PhysicalIdChanged {
                node: op.logical_id.clone(),
                before: current.physical_id.clone(),
                after: output.physical_id,
                applied: Box::new(applied.clone()),
            });
        }
        info!(node = %op.logical_id, physical_id = %output.physical_id, "Updated");
        Ok(output)
    }

    async fn delete_record(
        &self,
        logical_id: &LogicalId,
        record: &PhysicalRecord,
        applied: &PhysicalState,
    ) -> Result<(), ReconcileError> {
        let op = LifecycleOperation {
            operation: Operation::Delete,
            logical_id: logical_id.clone(),
            kind: record.kind.clone(),
            name: record.output.name.clone(),
            idempotency_key: idempotency_key(&self.stack_id, logical_id),
            payload: None,
        };
        debug!(node = %logical_id, key = %op.idempotency_key, name = %op.name, "Delete");
        match self.handler.delete(&op, &record.output).await {
            Ok(()) => {
                info!(node = %logical_id, "Deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!(node = %logical_id, "Already gone");
                Ok(())
            }
            Err(e) => Err(Self::failure(&op, e, applied)),
        }
    }

    async fn delete_all(
        &self,
        applied: &mut PhysicalState,
        targets: &[LogicalId],
    ) -> Result<(), ReconcileError> {
        for logical_id in deletion_order(applied, targets)? {
            let Some(record) = applied.get(&logical_id).cloned() else {
                continue;
            };
            self.delete_record(&logical_id, &record, applied).await?;
            applied.remove(&logical_id);
        }
        Ok(())
    }
}

/// Recorded nodes that are no longer declared, split into those whose resource a
/// declared node holds again (same kind and name) and true orphans.
fn undeclared<S>(chain: &ResourceChain<S>, state: &PhysicalState) -> (Vec<LogicalId>, Vec<LogicalId>) {
    let mut live = Vec::new();
    let mut orphans = Vec::new();
    for (id, record) in state.records.iter().filter(|(id, _)| !chain.contains(id)) {
        let held = state.records.iter().any(|(other, current)| {
            chain.contains(other)
                && current.kind == record.kind
                && current.output.name == record.output.name
        });
        if held {
            live.push(id.clone());
        } else {
            orphans.push(id.clone());
        }
    }
    (live, orphans)
}

/// Id under which a replaced resource stays recorded until it is deleted.
///
/// The `#` keeps it apart from declared ids, and the old name keeps successive
/// replacements of one node apart from each other.
fn retired(logical_id: &LogicalId, name: &str) -> LogicalId {
    LogicalId::new(format!("{logical_id}#{name}"))
}

/// Orders `targets` so that every node comes before the recorded nodes it depends on.
fn deletion_order(
    state: &PhysicalState,
    targets: &[LogicalId],
) -> Result<Vec<LogicalId>, ReconcileError> {
    let empty = BTreeSet::new();
    let nodes: Vec<(&LogicalId, &BTreeSet<LogicalId>)> = targets
        .iter()
        .map(|id| {
            let deps = state.get(id).map(|r| &r.depends_on).unwrap_or(&empty);
            (id, deps)
        })
        .collect();
    let order = topological_order(&nodes)?;
    Ok(order.into_iter().rev().map(|i| targets[i].clone()).collect())
}
