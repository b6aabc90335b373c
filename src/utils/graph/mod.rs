//! Generic directed graph infrastructure.
//!
//! The control-flow graphs built by [`crate::analysis`] are [`DirectedGraph`]s; the algorithms
//! in [`algorithms`] work on anything implementing the traits in this module.
//!
//! # Key Components
//!
//! - [`NodeId`] and [`EdgeId`] - Typed handles, plain indices underneath
//! - [`DirectedGraph`] - Append-only adjacency-list graph
//! - [`algorithms`] - Traversal orders, dominators and dominance frontiers
//!
//! # Example
//!
//! ```rust
//! use cafescope::utils::graph::{algorithms, DirectedGraph};
//!
//! let mut graph: DirectedGraph<&str, ()> = DirectedGraph::new();
//! let entry = graph.add_node("entry");
//! let a = graph.add_node("a");
//! let b = graph.add_node("b");
//! let exit = graph.add_node("exit");
//! graph.add_edge(entry, a, ())?;
//! graph.add_edge(entry, b, ())?;
//! graph.add_edge(a, exit, ())?;
//! graph.add_edge(b, exit, ())?;
//!
//! let dominators = algorithms::compute_dominators(&graph, entry);
//! assert_eq!(dominators.immediate_dominator(exit), Some(entry));
//! # Ok::<(), cafescope::Error>(())
//! ```

mod directed;
mod ids;
mod traits;

pub mod algorithms;

pub use directed::DirectedGraph;
pub use ids::{EdgeId, NodeId};
pub use traits::{GraphBase, Predecessors, RootedGraph, Successors};
