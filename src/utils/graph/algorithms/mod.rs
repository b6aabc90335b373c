//! Graph algorithms.
//!
//! - [`dfs`], [`postorder`], [`reverse_postorder`] - Depth-first orders from a start node
//! - [`compute_dominators`] - Iterative dominator computation
//! - [`compute_dominance_frontiers`] - Dominance frontiers from a [`DominatorTree`]

mod dominators;
mod traversal;

pub use dominators::{compute_dominance_frontiers, compute_dominators, DominatorTree};
pub use traversal::{dfs, postorder, reverse_postorder};
