//! # Resource Chains
//!
//! A chain is a set of declared resource nodes whose explicit predecessor declarations
//! form a DAG. [`ChainBuilder::build`] validates the declarations and fixes the execution
//! plan once: creation follows the topological order, deletion its exact reverse.
//!
//! Ordering uses Kahn's algorithm. Among nodes that are ready at the same time, the one
//! declared first runs first, so the same declarations always produce the same plan.

use crate::error::ChainError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;

/// Stable identifier of a node within its stack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogicalId(String);

impl LogicalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogicalId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for LogicalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A declared resource: logical id, desired spec and the nodes it reads from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode<S> {
    pub logical_id: LogicalId,
    pub spec: S,
    pub depends_on: BTreeSet<LogicalId>,
}

/// Collects node declarations and validates them into a [`ResourceChain`].
///
/// # Example
///
/// ```rust
/// use reconcile_framework::ChainBuilder;
///
/// let chain = ChainBuilder::new()
///     .node("Image", "image", Vec::<&str>::new())
///     .node("ImageVersion", "version", ["Image"])
///     .node("AppImageConfig", "config", ["Image"])
///     .node("SettingsPatch", "patch", ["AppImageConfig"])
///     .build()
///     .unwrap();
///
/// let create: Vec<_> = chain.create_order().map(|n| n.logical_id.as_str()).collect();
/// assert_eq!(create, ["Image", "ImageVersion", "AppImageConfig", "SettingsPatch"]);
/// ```
#[derive(Debug, Clone)]
pub struct ChainBuilder<S> {
    nodes: Vec<ResourceNode<S>>,
    reserved_words: Vec<String>,
}

impl<S> Default for ChainBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> ChainBuilder<S> {
    /// Words the platform refuses in logical ids unless overridden.
    pub const DEFAULT_RESERVED_WORDS: &'static [&'static str] = &["sagemaker"];

    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            reserved_words: Self::DEFAULT_RESERVED_WORDS
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }

    /// Replaces the reserved words. Matching is case-insensitive and by substring.
    pub fn with_reserved_words<I, W>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        self.reserved_words = words
            .into_iter()
            .map(|w| w.into().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        self
    }

    /// Declares a node. Validation is deferred to [`ChainBuilder::build`].
    pub fn add<I, D>(&mut self, logical_id: impl Into<LogicalId>, spec: S, depends_on: I)
    where
        I: IntoIterator<Item = D>,
        D: Into<LogicalId>,
    {
        self.nodes.push(ResourceNode {
            logical_id: logical_id.into(),
            spec,
            depends_on: depends_on.into_iter().map(Into::into).collect(),
        });
    }

    /// Builder-style [`ChainBuilder::add`].
    pub fn node<I, D>(mut self, logical_id: impl Into<LogicalId>, spec: S, depends_on: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<LogicalId>,
    {
        self.add(logical_id, spec, depends_on);
        self
    }

    /// Validates the declarations and computes the plan.
    ///
    /// Checks run in this order, each over nodes in declaration order:
    /// empty ids, reserved words, duplicates, undeclared predecessors, cycles.
    pub fn build(self) -> Result<ResourceChain<S>, ChainError> {
        let mut index = HashMap::with_capacity(self.nodes.len());
        for (position, node) in self.nodes.iter().enumerate() {
            if node.logical_id.as_str().is_empty() {
                return Err(ChainError::EmptyLogicalId);
            }
            let lowered = node.logical_id.as_str().to_lowercase();
            if let Some(word) = self.reserved_words.iter().find(|w| lowered.contains(*w)) {
                return Err(ChainError::ReservedLogicalId {
                    node: node.logical_id.clone(),
                    word: word.clone(),
                });
            }
            if index.insert(node.logical_id.clone(), position).is_some() {
                return Err(ChainError::DuplicateNode(node.logical_id.clone()));
            }
        }

        for node in &self.nodes {
            if let Some(missing) = node.depends_on.iter().find(|d| !index.contains_key(*d)) {
                return Err(ChainError::MissingDependency {
                    node: node.logical_id.clone(),
                    dependency: missing.clone(),
                });
            }
        }

        let order = topological_order(
            self.nodes
                .iter()
                .map(|n| (&n.logical_id, &n.depends_on))
                .collect::<Vec<_>>()
                .as_slice(),
        )?;

        Ok(ResourceChain {
            nodes: self.nodes,
            index,
            order,
        })
    }
}

/// A validated chain with its fixed execution plan.
#[derive(Debug, Clone)]
pub struct ResourceChain<S> {
    nodes: Vec<ResourceNode<S>>,
    index: HashMap<LogicalId, usize>,
    order: Vec<usize>,
}

/// The empty chain. Reconciling it deletes everything recorded.
impl<S> Default for ResourceChain<S> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            index: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<S> ResourceChain<S> {
    /// Nodes in creation order: every node after all of its predecessors.
    pub fn create_order(&self) -> impl DoubleEndedIterator<Item = &ResourceNode<S>> + '_ {
        self.order.iter().map(move |&i| &self.nodes[i])
    }

    /// Nodes in deletion order, the exact reverse of [`ResourceChain::create_order`].
    pub fn delete_order(&self) -> impl Iterator<Item = &ResourceNode<S>> + '_ {
        self.create_order().rev()
    }

    pub fn node(&self, logical_id: &LogicalId) -> Option<&ResourceNode<S>> {
        self.index.get(logical_id).map(|&i| &self.nodes[i])
    }

    pub fn contains(&self, logical_id: &LogicalId) -> bool {
        self.index.contains_key(logical_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Kahn's algorithm over `(id, predecessors)` pairs. Returns positions into `nodes`.
///
/// Predecessors that are not part of `nodes` are ignored, which lets callers order a
/// subset of a recorded graph (e.g. only the orphans of a pass).
pub(crate) fn topological_order(
    nodes: &[(&LogicalId, &BTreeSet<LogicalId>)],
) -> Result<Vec<usize>, ChainError> {
    let position: HashMap<&LogicalId, usize> =
        nodes.iter().enumerate().map(|(i, (id, _))| (*id, i)).collect();

    let mut in_degree = vec![0usize; nodes.len()];
    let mut successors: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (i, (_, deps)) in nodes.iter().enumerate() {
        for dep in deps.iter() {
            if let Some(&d) = position.get(dep) {
                in_degree[i] += 1;
                successors[d].push(i);
            }
        }
    }

    let mut queue: VecDeque<usize> = (0..nodes.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(nodes.len());

    while let Some(current) = queue.pop_front() {
        order.push(current);
        // successors were pushed in ascending position order
        for &next in &successors[current] {
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if order.len() != nodes.len() {
        return Err(ChainError::Cycle {
            path: describe_cycle(nodes, &position, &in_degree),
        });
    }
    Ok(order)
}

/// Walks predecessor edges among the unresolved nodes until one repeats.
///
/// Every node left with a non-zero in-degree has at least one unresolved
/// predecessor, so the walk always closes a cycle.
fn describe_cycle(
    nodes: &[(&LogicalId, &BTreeSet<LogicalId>)],
    position: &HashMap<&LogicalId, usize>,
    in_degree: &[usize],
) -> String {
    let Some(start) = (0..nodes.len()).find(|&i| in_degree[i] > 0) else {
        return String::new();
    };

    let mut walk = vec![start];
    let mut seen = HashSet::from([start]);
    let mut current = start;
    loop {
        let next = nodes[current]
            .1
            .iter()
            .filter_map(|dep| position.get(dep).copied())
            .find(|&p| in_degree[p] > 0);
        let Some(next) = next else {
            break;
        };
        if !seen.insert(next) {
            let from = walk.iter().position(|&p| p == next).unwrap_or(0);
            let mut path: Vec<&str> = walk[from..].iter().map(|&p| nodes[p].0.as_str()).collect();
            path.push(nodes[next].0.as_str());
            return path.join(" -> ");
        }
        walk.push(next);
        current = next;
    }
    walk.iter()
        .map(|&p| nodes[p].0.as_str())
        .collect::<Vec<_>>()
        .join(" -> ")
}
