//! Network - the validated bipartite dependency graph
//!
//! A [`Network`] is built once by [`compose`] from a set of operations and is
//! immutable afterwards. Data nodes are created lazily: the first time a name
//! appears across the operation set (as a need or a provide) a node is
//! interned for it, and every later reference shares that identity.
//!
//! # Representation
//!
//! The graph is an index arena: nodes live in `Vec`s and edges are index
//! pairs ([`DataId`], [`OpId`]). This keeps the structure `Send + Sync` for
//! free, makes read-only traversal from concurrent executions safe, and
//! keeps declaration order available for deterministic tie-breaking.
//!
//! # Algorithm Reference
//!
//! Cycle detection uses three-color DFS, implemented with an explicit stack
//! so traversal depth is bounded by heap, not the call stack.

use super::error::{ComposeError, ComposeResult};
use crate::core::Operation;
use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Index of a data node within a [`Network`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DataId(pub(crate) usize);

/// Index of an operation node within a [`Network`] arena.
///
/// Operation indices follow declaration order: the n-th operation passed to
/// [`compose`] gets `OpId(n)`. The compiler relies on this for deterministic
/// tie-breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpId(pub(crate) usize);

/// A named value slot. Carries identity only, never a value.
pub(crate) struct DataNode {
    pub(crate) name: String,
    /// Operations whose `provides` include this slot, in declaration order.
    pub(crate) producers: Vec<OpId>,
    /// Operations whose `needs` include this slot, in declaration order.
    pub(crate) consumers: Vec<OpId>,
}

/// An operation wired into the network, with its edges resolved to indices.
pub(crate) struct OperationNode {
    pub(crate) op: Arc<dyn Operation>,
    pub(crate) needs: Vec<DataId>,
    pub(crate) provides: Vec<DataId>,
}

/// The validated, immutable dependency graph built from a set of operations.
///
/// Safe to share read-only across threads; compiling plans and executing them
/// never mutates the network.
pub struct Network {
    pub(crate) data: Vec<DataNode>,
    pub(crate) ops: Vec<OperationNode>,
    pub(crate) names: HashMap<String, DataId>,
}

/// Composes a set of operations into a validated [`Network`].
///
/// Fails with [`ComposeError::DuplicateOperation`] if two operations share a
/// name, [`ComposeError::EmptyProvides`] if an operation declares no outputs,
/// and [`ComposeError::CycleDetected`] if the operation dependency graph is
/// cyclic.
///
/// # Example
///
/// ```
/// use plegma::core::{FnOperation, Value, ValueMap};
/// use plegma::graph::compose;
///
/// let add = FnOperation::new("add", &["a", "b"], &["sum"], |inputs: &ValueMap| {
///     let sum = inputs["a"].as_i64().unwrap() + inputs["b"].as_i64().unwrap();
///     Ok(ValueMap::from([("sum".to_string(), Value::from(sum))]))
/// });
///
/// let network = compose([add.into_arc()]).unwrap();
/// assert_eq!(network.operation_count(), 1);
/// ```
pub fn compose<I>(operations: I) -> ComposeResult<Network>
where
    I: IntoIterator<Item = Arc<dyn Operation>>,
{
    let mut network = Network {
        data: Vec::new(),
        ops: Vec::new(),
        names: HashMap::new(),
    };
    let mut seen_names: HashSet<String> = HashSet::new();

    for op in operations {
        if !seen_names.insert(op.name().to_string()) {
            return Err(ComposeError::duplicate_operation(op.name()));
        }
        if op.provides().is_empty() {
            return Err(ComposeError::empty_provides(op.name()));
        }

        let op_id = OpId(network.ops.len());
        let needs: Vec<DataId> = op.needs().iter().map(|n| network.intern(n)).collect();
        let provides: Vec<DataId> = op.provides().iter().map(|n| network.intern(n)).collect();

        for &data_id in &needs {
            network.data[data_id.0].consumers.push(op_id);
        }
        for &data_id in &provides {
            network.data[data_id.0].producers.push(op_id);
        }

        network.ops.push(OperationNode { op, needs, provides });
    }

    if let Some(cycle) = network.find_cycle() {
        return Err(ComposeError::cycle(cycle));
    }

    debug!(
        operations = network.ops.len(),
        data_nodes = network.data.len(),
        "composed network"
    );
    Ok(network)
}

impl Network {
    /// Interns a data name, returning the existing node's id on reuse.
    fn intern(&mut self, name: &str) -> DataId {
        if let Some(&id) = self.names.get(name) {
            return id;
        }
        let id = DataId(self.data.len());
        self.data.push(DataNode {
            name: name.to_string(),
            producers: Vec::new(),
            consumers: Vec::new(),
        });
        self.names.insert(name.to_string(), id);
        id
    }

    /// Returns the number of operations in the network.
    pub fn operation_count(&self) -> usize {
        self.ops.len()
    }

    /// Returns the number of distinct data slots in the network.
    pub fn data_count(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the network holds no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterates over operations in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = &Arc<dyn Operation>> {
        self.ops.iter().map(|node| &node.op)
    }

    /// Iterates over data-slot names in interning order.
    pub fn data_names(&self) -> impl Iterator<Item = &str> {
        self.data.iter().map(|node| node.name.as_str())
    }

    /// Returns true if the network contains an operation with this name.
    pub fn contains_operation(&self, name: &str) -> bool {
        self.ops.iter().any(|node| node.op.name() == name)
    }

    /// Returns true if any operation references this data slot.
    pub fn contains_data(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Returns names of operations producing the given data slot,
    /// in declaration order.
    pub fn producers_of(&self, name: &str) -> Vec<&str> {
        self.names
            .get(name)
            .map(|&id| {
                self.data[id.0]
                    .producers
                    .iter()
                    .map(|&op_id| self.ops[op_id.0].op.name())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns names of operations consuming the given data slot,
    /// in declaration order.
    pub fn consumers_of(&self, name: &str) -> Vec<&str> {
        self.names
            .get(name)
            .map(|&id| {
                self.data[id.0]
                    .consumers
                    .iter()
                    .map(|&op_id| self.ops[op_id.0].op.name())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Successor operations of `op_id` through the data it produces,
    /// deduplicated, in declaration order.
    pub(crate) fn op_successors(&self, op_id: OpId) -> Vec<OpId> {
        let mut seen = HashSet::new();
        let mut successors = Vec::new();
        for &data_id in &self.ops[op_id.0].provides {
            for &consumer in &self.data[data_id.0].consumers {
                if seen.insert(consumer) {
                    successors.push(consumer);
                }
            }
        }
        successors.sort();
        successors
    }

    /// Detects a cycle over operation-data-operation chains.
    ///
    /// Three-color DFS with an explicit stack; the stack doubles as the
    /// current path, so the full cycle can be reported on a back edge.
    fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }

        let successors: Vec<Vec<OpId>> = (0..self.ops.len())
            .map(|i| self.op_successors(OpId(i)))
            .collect();
        let mut color = vec![Color::White; self.ops.len()];

        for start in 0..self.ops.len() {
            if color[start] != Color::White {
                continue;
            }
            // (operation index, next successor to visit)
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
            color[start] = Color::Gray;

            while let Some(frame) = stack.last_mut() {
                let u = frame.0;
                if frame.1 < successors[u].len() {
                    let v = successors[u][frame.1].0;
                    frame.1 += 1;
                    match color[v] {
                        Color::White => {
                            color[v] = Color::Gray;
                            stack.push((v, 0));
                        }
                        Color::Gray => {
                            // Back edge: the cycle is the stack suffix from v.
                            let pos = stack
                                .iter()
                                .position(|&(node, _)| node == v)
                                .unwrap_or(0);
                            let cycle = stack[pos..]
                                .iter()
                                .map(|&(node, _)| self.ops[node].op.name().to_string())
                                .collect();
                            return Some(cycle);
                        }
                        Color::Black => {}
                    }
                } else {
                    color[u] = Color::Black;
                    stack.pop();
                }
            }
        }

        None
    }

    /// Generates a DOT representation of the bipartite graph for Graphviz.
    ///
    /// Data slots render as `name`, operations as `name()`. Render with
    /// `dot -Tpng network.dot -o network.png`.
    pub fn to_dot(&self) -> String {
        let mut graph = DiGraph::<String, ()>::new();

        let op_indices: Vec<_> = self
            .ops
            .iter()
            .map(|node| graph.add_node(format!("{}()", node.op.name())))
            .collect();
        let data_indices: Vec<_> = self
            .data
            .iter()
            .map(|node| graph.add_node(node.name.clone()))
            .collect();

        for (i, node) in self.ops.iter().enumerate() {
            for &data_id in &node.needs {
                graph.add_edge(data_indices[data_id.0], op_indices[i], ());
            }
            for &data_id in &node.provides {
                graph.add_edge(op_indices[i], data_indices[data_id.0], ());
            }
        }

        format!("{:?}", Dot::with_config(&graph, &[Config::EdgeNoLabel]))
    }

    /// Saves the DOT visualization to a file.
    pub fn save_dot(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        std::fs::write(path, self.to_dot())
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network")
            .field("operations", &self.ops.len())
            .field("data_nodes", &self.data.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{FnOperation, ValueMap};

    fn noop(name: &str, needs: &[&str], provides: &[&str]) -> Arc<dyn Operation> {
        FnOperation::new(name, needs, provides, |_| Ok(ValueMap::new())).into()
    }

    #[test]
    fn test_compose_empty() {
        let network = compose(Vec::<Arc<dyn Operation>>::new()).unwrap();
        assert!(network.is_empty());
        assert_eq!(network.data_count(), 0);
    }

    #[test]
    fn test_compose_shares_data_identity() {
        let network = compose([
            noop("add", &["a", "b"], &["sum"]),
            noop("double", &["sum"], &["doubled"]),
        ])
        .unwrap();

        assert_eq!(network.operation_count(), 2);
        // a, b, sum, doubled
        assert_eq!(network.data_count(), 4);
        assert_eq!(network.producers_of("sum"), vec!["add"]);
        assert_eq!(network.consumers_of("sum"), vec!["double"]);
    }

    #[test]
    fn test_compose_duplicate_operation() {
        let result = compose([noop("same", &[], &["x"]), noop("same", &[], &["y"])]);
        assert!(matches!(
            result,
            Err(ComposeError::DuplicateOperation { name }) if name == "same"
        ));
    }

    #[test]
    fn test_compose_empty_provides() {
        let result = compose([noop("sink", &["x"], &[])]);
        assert!(matches!(
            result,
            Err(ComposeError::EmptyProvides { operation }) if operation == "sink"
        ));
    }

    #[test]
    fn test_compose_detects_two_op_cycle() {
        // a: x -> y, b: y -> x
        let result = compose([noop("a", &["x"], &["y"]), noop("b", &["y"], &["x"])]);
        match result {
            Err(ComposeError::CycleDetected { cycle }) => {
                assert_eq!(cycle.len(), 2);
                assert!(cycle.contains(&"a".to_string()));
                assert!(cycle.contains(&"b".to_string()));
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_compose_detects_self_cycle() {
        let result = compose([noop("loopy", &["x"], &["x"])]);
        match result {
            Err(ComposeError::CycleDetected { cycle }) => {
                assert_eq!(cycle, vec!["loopy".to_string()]);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_compose_diamond_is_acyclic() {
        let network = compose([
            noop("root", &["seed"], &["left_in", "right_in"]),
            noop("left", &["left_in"], &["left_out"]),
            noop("right", &["right_in"], &["right_out"]),
            noop("join", &["left_out", "right_out"], &["merged"]),
        ])
        .unwrap();
        assert_eq!(network.operation_count(), 4);
    }

    #[test]
    fn test_to_dot_contains_nodes_and_edges() {
        let network = compose([noop("add", &["a", "b"], &["sum"])]).unwrap();
        let dot = network.to_dot();
        assert!(dot.contains("add()"));
        assert!(dot.contains("sum"));
        assert!(dot.contains("->"));
    }
}
