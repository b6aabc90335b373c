//! Control-flow analysis of decoded method bodies.
//!
//! This module builds upon the generic graph infrastructure in [`crate::utils::graph`]:
//!
//! - [`cfg`] - Control flow graph with entry, exit and handler placeholder nodes
//! - [`exceptions`] - Recovery of structured try and handler ranges from the exception table
//!
//! Method bodies run the exception mapper as their last decode step, so most callers only see
//! its output in [`crate::disassembler::MethodBody::handlers`].
//!
//! # Usage
//!
//! ```rust
//! use cafescope::analysis::map_exception_handlers;
//! use cafescope::disassembler::decode_instructions;
//! use cafescope::metadata::{code::ExceptionTableEntry, constpool::ConstantPool};
//!
//! // 0: nop; 1: goto 5; 4: astore_1 (handler); 5: return
//! let code = [0x00, 0xA7, 0x00, 0x04, 0x4C, 0xB1];
//! let instructions = decode_instructions(&code, &ConstantPool::default())?;
//! let table = [ExceptionTableEntry { start: 0, end: 4, handler: 4, catch_type: None }];
//!
//! let handlers = map_exception_handlers(&instructions, &table)?;
//! assert_eq!((handlers[0].try_block.start, handlers[0].try_block.end), (0, 4));
//! assert_eq!(handlers[0].handler_block.start, 4);
//! # Ok::<(), cafescope::Error>(())
//! ```

pub mod cfg;
pub mod exceptions;

pub use cfg::{BasicBlock, ControlFlowGraph, ControlFlowNode, EdgeKind, NodeKind};
pub use exceptions::{map_exception_handlers, ExceptionHandler, InstructionRange};
