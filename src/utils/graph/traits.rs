//! Graph abstractions used by the algorithms.
//!
//! The algorithms in [`crate::utils::graph::algorithms`] only need node enumeration and
//! adjacency, so they are written against these traits rather than a concrete graph type.

use crate::utils::graph::NodeId;

/// Node enumeration.
pub trait GraphBase {
    /// Number of nodes; valid ids are `0..node_count()`.
    fn node_count(&self) -> usize;

    /// All node ids in index order.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Forward adjacency.
pub trait Successors: GraphBase {
    /// Targets of the edges leaving `node`, in insertion order.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Backward adjacency.
pub trait Predecessors: GraphBase {
    /// Sources of the edges entering `node`, in insertion order.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// A graph with a distinguished entry node.
pub trait RootedGraph: Successors + Predecessors {
    /// The entry node.
    fn entry(&self) -> NodeId;
}
