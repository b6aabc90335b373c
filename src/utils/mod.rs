//! Supporting data structures.

pub mod graph;
