//! Control-flow nodes and basic blocks.

use std::fmt;

use crate::disassembler::{Instruction, InstructionId};

/// A maximal run of instructions entered only at the top and left only at the bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BasicBlock {
    /// First instruction
    pub first: InstructionId,
    /// Last instruction (inclusive)
    pub last: InstructionId,
    /// Offset of the first instruction
    pub start_offset: u32,
    /// Offset just past the last instruction
    pub end_offset: u32,
}

impl BasicBlock {
    /// Number of instructions in the block.
    #[must_use]
    pub fn len(&self) -> usize {
        self.last.index() - self.first.index() + 1
    }

    /// Always `false`; blocks hold at least one instruction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// `true` if `offset` lies within the block's bytes.
    #[must_use]
    pub fn contains(&self, offset: u32) -> bool {
        self.start_offset <= offset && offset < self.end_offset
    }

    /// The block's instructions within the method's instruction vector.
    #[must_use]
    pub fn instructions<'a>(&self, instructions: &'a [Instruction]) -> &'a [Instruction] {
        instructions
            .get(self.first.index()..=self.last.index())
            .unwrap_or(&[])
    }
}

/// Classification of a [`ControlFlowNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Method entry
    Entry,
    /// Target of returns
    RegularExit,
    /// Target of exceptions no handler catches
    ExceptionalExit,
    /// A basic block of real instructions
    NormalBlock,
    /// Synthetic entry of one exception table row's handler
    HandlerPlaceholder,
}

/// A node of a [`crate::analysis::ControlFlowGraph`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFlowNode {
    /// Method entry
    Entry,
    /// Target of returns
    RegularExit,
    /// Target of exceptions no handler catches
    ExceptionalExit,
    /// A basic block
    Block(BasicBlock),
    /// Synthetic node standing for the handler of exception table row `entry`.
    ///
    /// Every row gets its own placeholder, even when several rows share a handler offset.
    HandlerPlaceholder {
        /// Index of the row in the exception table
        entry: usize,
        /// Offset of the handler's first instruction
        handler_offset: u32,
    },
}

impl ControlFlowNode {
    /// The node's kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            ControlFlowNode::Entry => NodeKind::Entry,
            ControlFlowNode::RegularExit => NodeKind::RegularExit,
            ControlFlowNode::ExceptionalExit => NodeKind::ExceptionalExit,
            ControlFlowNode::Block(_) => NodeKind::NormalBlock,
            ControlFlowNode::HandlerPlaceholder { .. } => NodeKind::HandlerPlaceholder,
        }
    }

    /// The basic block, for [`NodeKind::NormalBlock`] nodes.
    #[must_use]
    pub fn block(&self) -> Option<&BasicBlock> {
        match self {
            ControlFlowNode::Block(block) => Some(block),
            _ => None,
        }
    }
}

impl fmt::Display for ControlFlowNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlFlowNode::Entry => write!(f, "entry"),
            ControlFlowNode::RegularExit => write!(f, "exit"),
            ControlFlowNode::ExceptionalExit => write!(f, "exceptional exit"),
            ControlFlowNode::Block(block) => {
                write!(f, "[{}, {})", block.start_offset, block.end_offset)
            }
            ControlFlowNode::HandlerPlaceholder {
                entry,
                handler_offset,
            } => write!(f, "handler #{entry} @{handler_offset}"),
        }
    }
}
