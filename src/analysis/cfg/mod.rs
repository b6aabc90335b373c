//! Control flow graph (CFG) construction and analysis.
//!
//! The CFG builds upon the generic [`crate::utils::graph::DirectedGraph`] infrastructure,
//! adding JVM-specific node and edge types. Besides one node per basic block it carries three
//! global nodes (entry, regular exit and exceptional exit) and one placeholder per exception
//! table row, so that the dominator tree can tell which blocks are reachable only through a
//! given handler.
//!
//! # Key Components
//!
//! - [`ControlFlowGraph`] - The graph, with lazily computed dominators and frontiers
//! - [`ControlFlowNode`] / [`NodeKind`] - Entry, exits, basic blocks and handler placeholders
//! - [`BasicBlock`] - An instruction range with one entry and one exit
//! - [`EdgeKind`] - Normal or exceptional control transfer
//!
//! # Examples
//!
//! ```rust
//! use cafescope::analysis::ControlFlowGraph;
//! use cafescope::disassembler::decode_instructions;
//! use cafescope::metadata::constpool::ConstantPool;
//!
//! // iload_0; ifeq +5; iconst_1; ireturn; iconst_0; ireturn
//! let code = [0x1A, 0x99, 0x00, 0x05, 0x04, 0xAC, 0x03, 0xAC];
//! let instructions = decode_instructions(&code, &ConstantPool::default())?;
//! let cfg = ControlFlowGraph::build(&instructions, &[])?;
//!
//! assert_eq!(cfg.block_count(), 3);
//! let head = cfg.block_at(&instructions, 0).unwrap();
//! let tail = cfg.block_at(&instructions, 6).unwrap();
//! assert_eq!(cfg.idom(tail), Some(head));
//! # Ok::<(), cafescope::Error>(())
//! ```

mod edge;
mod graph;
mod node;

pub use edge::EdgeKind;
pub use graph::ControlFlowGraph;
pub use node::{BasicBlock, ControlFlowNode, NodeKind};
