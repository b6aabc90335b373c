//! Depth-first traversal orders.
//!
//! All traversals are iterative and only visit nodes reachable from the start node. Successors
//! are explored in adjacency order, so the orders are deterministic for a given graph.

use crate::utils::graph::{NodeId, Successors};

/// Depth-first pre-order iterator.
pub struct DfsIterator<'g, G: Successors> {
    graph: &'g G,
    stack: Vec<NodeId>,
    visited: Vec<bool>,
}

impl<G: Successors> Iterator for DfsIterator<'_, G> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;

        let successors: Vec<NodeId> = self.graph.successors(node).collect();
        for &successor in successors.iter().rev() {
            if let Some(seen) = self.visited.get_mut(successor.index()) {
                if !*seen {
                    *seen = true;
                    self.stack.push(successor);
                }
            }
        }

        Some(node)
    }
}

/// Returns a pre-order depth-first iterator from `start`.
///
/// An out-of-range `start` yields nothing.
pub fn dfs<G: Successors>(graph: &G, start: NodeId) -> DfsIterator<'_, G> {
    let mut visited = vec![false; graph.node_count()];
    let stack = match visited.get_mut(start.index()) {
        Some(seen) => {
            *seen = true;
            vec![start]
        }
        None => Vec::new(),
    };

    DfsIterator {
        graph,
        stack,
        visited,
    }
}

/// Nodes reachable from `start`, each after all of its depth-first descendants.
#[allow(clippy::items_after_statements)]
pub fn postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let node_count = graph.node_count();
    if start.index() >= node_count {
        return Vec::new();
    }

    #[derive(Clone, Copy)]
    enum State {
        Enter,
        Exit,
    }

    let mut visited = vec![false; node_count];
    let mut result = Vec::with_capacity(node_count);
    let mut stack = vec![(start, State::Enter)];

    while let Some((node, state)) = stack.pop() {
        match state {
            State::Enter => {
                if visited[node.index()] {
                    continue;
                }
                visited[node.index()] = true;
                stack.push((node, State::Exit));

                let successors: Vec<NodeId> = graph.successors(node).collect();
                for &successor in successors.iter().rev() {
                    if successor.index() < node_count && !visited[successor.index()] {
                        stack.push((successor, State::Enter));
                    }
                }
            }
            State::Exit => result.push(node),
        }
    }

    result
}

/// Reverse of [`postorder`]: every node comes before its successors, back edges aside.
pub fn reverse_postorder<G: Successors>(graph: &G, start: NodeId) -> Vec<NodeId> {
    let mut result = postorder(graph, start);
    result.reverse();
    result
}
