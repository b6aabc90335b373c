//! Dominator trees and dominance frontiers.
//!
//! A node `d` **dominates** a node `n` if every path from the entry to `n` passes through `d`.
//! The **immediate dominator** of `n` is its closest strict dominator; making it the parent of
//! `n` gives the dominator tree, rooted at the entry.
//!
//! # Algorithm
//!
//! Dominators are computed with the iterative data-flow formulation of Cooper, Harvey and
//! Kennedy ("A Simple, Fast Dominance Algorithm"). Nodes are processed in reverse postorder,
//! and each node's immediate dominator is refined by intersecting the dominator chains of its
//! already-processed predecessors until nothing changes. Control-flow graphs of single methods
//! are small, and the fixpoint is typically reached in two or three passes.
//!
//! Nodes not reachable from the entry have no immediate dominator, dominate nothing and are
//! dominated by nothing.

use std::collections::HashSet;

use crate::utils::graph::{
    algorithms::reverse_postorder, NodeId, Predecessors, Successors,
};

/// Result of dominator computation.
///
/// # Examples
///
/// ```rust
/// use cafescope::utils::graph::{algorithms::compute_dominators, DirectedGraph};
///
/// let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
/// let entry = graph.add_node("entry");
/// let a = graph.add_node("a");
/// let b = graph.add_node("b");
/// graph.add_edge(entry, a, ())?;
/// graph.add_edge(a, b, ())?;
///
/// let tree = compute_dominators(&graph, entry);
/// assert!(tree.dominates(entry, b));
/// assert_eq!(tree.immediate_dominator(b), Some(a));
/// assert_eq!(tree.dominators(b).collect::<Vec<_>>(), vec![b, a, entry]);
/// # Ok::<(), cafescope::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DominatorTree {
    entry: NodeId,
    /// Immediate dominator per node; `None` for the entry and for unreachable nodes
    idom: Vec<Option<NodeId>>,
    /// Whether each node is reachable from the entry
    reachable: Vec<bool>,
    /// Dominator tree children per node, in id order
    children: Vec<Vec<NodeId>>,
}

impl DominatorTree {
    /// Returns the entry (root) node of the dominator tree.
    #[inline]
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the immediate dominator of `node`.
    ///
    /// `None` for the entry, for unreachable nodes and for nodes outside the graph.
    #[inline]
    #[must_use]
    pub fn immediate_dominator(&self, node: NodeId) -> Option<NodeId> {
        self.idom.get(node.index()).copied().flatten()
    }

    /// `true` if `node` is reachable from the entry.
    #[must_use]
    pub fn is_reachable(&self, node: NodeId) -> bool {
        self.reachable.get(node.index()).copied().unwrap_or(false)
    }

    /// Checks if `a` dominates `b`. A reachable node dominates itself.
    ///
    /// O(depth of `b`).
    #[must_use]
    pub fn dominates(&self, a: NodeId, b: NodeId) -> bool {
        if !self.is_reachable(a) || !self.is_reachable(b) {
            return false;
        }

        self.dominators(b).any(|dominator| dominator == a)
    }

    /// Checks if `a` dominates `b` and `a != b`.
    #[inline]
    #[must_use]
    pub fn strictly_dominates(&self, a: NodeId, b: NodeId) -> bool {
        a != b && self.dominates(a, b)
    }

    /// Iterates the dominators of `node`, from the node itself up to the entry.
    ///
    /// Empty for unreachable nodes.
    #[must_use]
    pub fn dominators(&self, node: NodeId) -> DominatorIterator<'_> {
        DominatorIterator {
            tree: self,
            current: self.is_reachable(node).then_some(node),
        }
    }

    /// Depth of `node` in the dominator tree; the entry has depth 0.
    #[must_use]
    pub fn depth(&self, node: NodeId) -> usize {
        self.dominators(node).count().saturating_sub(1)
    }

    /// Nodes whose immediate dominator is `node`, in id order.
    ///
    /// Empty for leaves, unreachable nodes and nodes outside the graph.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.children.get(node.index()).map(Vec::as_slice).unwrap_or_default()
    }

    /// Nodes strictly dominated by `node`, in id order.
    #[must_use]
    pub fn dominated_by(&self, node: NodeId) -> Vec<NodeId> {
        (0..self.idom.len())
            .map(NodeId::new)
            .filter(|&candidate| self.strictly_dominates(node, candidate))
            .collect()
    }

    /// Number of nodes in the graph the tree was computed for.
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.idom.len()
    }
}

/// Iterator over the dominators of a node, from the node up to the entry.
pub struct DominatorIterator<'a> {
    tree: &'a DominatorTree,
    current: Option<NodeId>,
}

impl Iterator for DominatorIterator<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        self.current = self.tree.immediate_dominator(current);
        Some(current)
    }
}

/// Walks both fingers up the partially built tree until they meet.
fn intersect(idom: &[Option<usize>], order: &[usize], mut a: usize, mut b: usize) -> usize {
    while a != b {
        while order[a] > order[b] {
            match idom[a] {
                Some(next) => a = next,
                None => return b,
            }
        }
        while order[b] > order[a] {
            match idom[b] {
                Some(next) => b = next,
                None => return a,
            }
        }
    }
    a
}

/// Computes the dominator tree of `graph` rooted at `entry`.
///
/// An `entry` outside the graph yields a tree in which every node is unreachable.
pub fn compute_dominators<G>(graph: &G, entry: NodeId) -> DominatorTree
where
    G: Successors + Predecessors,
{
    let node_count = graph.node_count();
    let rpo = reverse_postorder(graph, entry);

    // Position of each reachable node in reverse postorder; usize::MAX marks unreachable.
    let mut order = vec![usize::MAX; node_count];
    for (position, node) in rpo.iter().enumerate() {
        order[node.index()] = position;
    }

    // Internally the entry is its own dominator, which terminates `intersect`.
    let mut idom: Vec<Option<usize>> = vec![None; node_count];
    if let Some(first) = rpo.first() {
        idom[first.index()] = Some(first.index());
    }

    let mut changed = true;
    while changed {
        changed = false;

        for node in rpo.iter().skip(1) {
            let mut new_idom: Option<usize> = None;
            for predecessor in graph.predecessors(*node) {
                let predecessor = predecessor.index();
                if predecessor >= node_count || idom[predecessor].is_none() {
                    continue;
                }
                new_idom = Some(match new_idom {
                    None => predecessor,
                    Some(current) => intersect(&idom, &order, predecessor, current),
                });
            }

            if new_idom.is_some() && idom[node.index()] != new_idom {
                idom[node.index()] = new_idom;
                changed = true;
            }
        }
    }

    let mut reachable = vec![false; node_count];
    for node in &rpo {
        reachable[node.index()] = true;
    }

    let idom: Vec<Option<NodeId>> = idom
        .into_iter()
        .enumerate()
        .map(|(index, dominator)| match dominator {
            Some(dominator) if dominator != index => Some(NodeId::new(dominator)),
            _ => None,
        })
        .collect();

    let mut children = vec![Vec::new(); node_count];
    for (index, dominator) in idom.iter().enumerate() {
        if let Some(dominator) = dominator {
            children[dominator.index()].push(NodeId::new(index));
        }
    }

    DominatorTree {
        entry,
        idom,
        reachable,
        children,
    }
}

/// Computes the dominance frontier of every node.
///
/// The frontier of `n` holds the nodes `y` such that `n` dominates a predecessor of `y` but does
/// not strictly dominate `y`. Unreachable nodes have empty frontiers and unreachable
/// predecessors are ignored. The result is indexed by node id.
pub fn compute_dominance_frontiers<G>(graph: &G, tree: &DominatorTree) -> Vec<HashSet<NodeId>>
where
    G: Predecessors,
{
    let node_count = graph.node_count();
    let mut frontiers: Vec<HashSet<NodeId>> = vec![HashSet::new(); node_count];

    for node in graph.node_ids() {
        if !tree.is_reachable(node) {
            continue;
        }

        let stop = tree.immediate_dominator(node);
        for predecessor in graph.predecessors(node) {
            if !tree.is_reachable(predecessor) {
                continue;
            }

            let mut runner = Some(predecessor);
            while let Some(current) = runner {
                if Some(current) == stop {
                    break;
                }
                frontiers[current.index()].insert(node);
                runner = tree.immediate_dominator(current);
            }
        }
    }

    frontiers
}
