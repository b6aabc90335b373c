//! Adjacency-list directed graph.

use crate::{
    utils::graph::{
        traits::{GraphBase, Predecessors, Successors},
        EdgeId, NodeId,
    },
    Error, Result,
};

#[derive(Debug, Clone)]
struct EdgeData<E> {
    source: NodeId,
    target: NodeId,
    data: E,
}

/// A directed multigraph with node payloads `N` and edge payloads `E`.
///
/// Nodes and edges are only ever added, so ids stay valid for the life of the graph. Edges are
/// kept in insertion order, and so are the adjacency lists.
#[derive(Debug, Clone)]
pub struct DirectedGraph<N, E> {
    nodes: Vec<N>,
    edges: Vec<EdgeData<E>>,
    outgoing: Vec<Vec<EdgeId>>,
    incoming: Vec<Vec<EdgeId>>,
}

impl<N, E> Default for DirectedGraph<N, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N, E> DirectedGraph<N, E> {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        DirectedGraph {
            nodes: Vec::new(),
            edges: Vec::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
        }
    }

    /// Creates an empty graph with room for the given number of nodes and edges.
    #[must_use]
    pub fn with_capacity(node_capacity: usize, edge_capacity: usize) -> Self {
        DirectedGraph {
            nodes: Vec::with_capacity(node_capacity),
            edges: Vec::with_capacity(edge_capacity),
            outgoing: Vec::with_capacity(node_capacity),
            incoming: Vec::with_capacity(node_capacity),
        }
    }

    /// Adds a node and returns its id.
    pub fn add_node(&mut self, data: N) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(data);
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    /// Adds an edge from `source` to `target`.
    ///
    /// # Errors
    /// Returns [`Error::GraphError`] if either endpoint does not exist.
    pub fn add_edge(&mut self, source: NodeId, target: NodeId, data: E) -> Result<EdgeId> {
        for (role, node) in [("source", source), ("target", target)] {
            if node.index() >= self.nodes.len() {
                return Err(Error::GraphError(format!(
                    "{} node {} does not exist in graph with {} nodes",
                    role,
                    node,
                    self.nodes.len()
                )));
            }
        }

        let id = EdgeId::new(self.edges.len());
        self.edges.push(EdgeData {
            source,
            target,
            data,
        });
        self.outgoing[source.index()].push(id);
        self.incoming[target.index()].push(id);

        Ok(id)
    }

    /// `true` if an edge from `source` to `target` exists.
    #[must_use]
    pub fn has_edge(&self, source: NodeId, target: NodeId) -> bool {
        self.outgoing
            .get(source.index())
            .is_some_and(|edges| edges.iter().any(|&edge| self.edges[edge.index()].target == target))
    }

    /// The payload of `node`.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&N> {
        self.nodes.get(node.index())
    }

    /// Mutable payload of `node`.
    pub fn node_mut(&mut self, node: NodeId) -> Option<&mut N> {
        self.nodes.get_mut(node.index())
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterates over `(id, payload)` pairs in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &N)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, data)| (NodeId::new(index), data))
    }

    /// The payload of `edge`.
    #[must_use]
    pub fn edge(&self, edge: EdgeId) -> Option<&E> {
        self.edges.get(edge.index()).map(|e| &e.data)
    }

    /// The `(source, target)` of `edge`.
    #[must_use]
    pub fn edge_endpoints(&self, edge: EdgeId) -> Option<(NodeId, NodeId)> {
        self.edges.get(edge.index()).map(|e| (e.source, e.target))
    }

    /// Number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges leaving `node` with their targets and payloads.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &E)> + '_ {
        self.outgoing
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge| {
                let edge = &self.edges[edge.index()];
                (edge.target, &edge.data)
            })
    }

    /// Edges entering `node` with their sources and payloads.
    pub fn incoming_edges(&self, node: NodeId) -> impl Iterator<Item = (NodeId, &E)> + '_ {
        self.incoming
            .get(node.index())
            .into_iter()
            .flatten()
            .map(|&edge| {
                let edge = &self.edges[edge.index()];
                (edge.source, &edge.data)
            })
    }

    /// Number of edges leaving `node`.
    #[must_use]
    pub fn out_degree(&self, node: NodeId) -> usize {
        self.outgoing.get(node.index()).map_or(0, Vec::len)
    }

    /// Number of edges entering `node`.
    #[must_use]
    pub fn in_degree(&self, node: NodeId) -> usize {
        self.incoming.get(node.index()).map_or(0, Vec::len)
    }
}

impl<N, E> GraphBase for DirectedGraph<N, E> {
    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId::new)
    }
}

impl<N, E> Successors for DirectedGraph<N, E> {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.outgoing_edges(node).map(|(target, _)| target)
    }
}

impl<N, E> Predecessors for DirectedGraph<N, E> {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.incoming_edges(node).map(|(source, _)| source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> (DirectedGraph<&'static str, u8>, [NodeId; 4]) {
        let mut graph = DirectedGraph::new();
        let a = graph.add_node("A");
        let b = graph.add_node("B");
        let c = graph.add_node("C");
        let d = graph.add_node("D");
        graph.add_edge(a, b, 1).unwrap();
        graph.add_edge(a, c, 2).unwrap();
        graph.add_edge(b, d, 3).unwrap();
        graph.add_edge(c, d, 4).unwrap();
        (graph, [a, b, c, d])
    }

    #[test]
    fn adjacency() {
        let (graph, [a, b, c, d]) = diamond();

        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.successors(a).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(graph.predecessors(d).collect::<Vec<_>>(), vec![b, c]);
        assert_eq!(graph.out_degree(d), 0);
        assert_eq!(graph.in_degree(a), 0);
        assert!(graph.has_edge(c, d));
        assert!(!graph.has_edge(d, c));
        assert_eq!(graph.node(b), Some(&"B"));

        let payloads: Vec<u8> = graph.incoming_edges(d).map(|(_, data)| *data).collect();
        assert_eq!(payloads, vec![3, 4]);
    }

    #[test]
    fn edges_to_missing_nodes_fail() {
        let (mut graph, [a, ..]) = diamond();
        assert!(matches!(
            graph.add_edge(a, NodeId::new(9), 0),
            Err(Error::GraphError(_))
        ));
        assert!(graph.add_edge(NodeId::new(9), a, 0).is_err());
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn parallel_edges_and_self_loops() {
        let mut graph: DirectedGraph<(), ()> = DirectedGraph::default();
        let a = graph.add_node(());
        graph.add_edge(a, a, ()).unwrap();
        graph.add_edge(a, a, ()).unwrap();
        assert_eq!(graph.successors(a).count(), 2);
        assert_eq!(graph.predecessors(a).count(), 2);
        assert!(graph.node_mut(a).is_some());
        assert!(!graph.is_empty());
    }
}
