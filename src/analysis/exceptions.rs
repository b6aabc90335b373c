//! Structured exception handlers recovered from the flat exception table.
//!
//! An exception table only records `[start, end) -> handler` rows. Where a handler ends, and
//! which of several overlapping rows a block belongs to, is not stored anywhere. The mapper
//! recovers the handler's extent from the dominator tree of the method's
//! [`ControlFlowGraph`]: the blocks dominated by a handler's first block can only be reached
//! by entering that handler, so they form its body.
//!
//! For each row, in table order:
//!
//! 1. The try range is `[start, end)` mapped onto instructions. When `end` equals the code
//!    length the range ends at the last instruction.
//! 2. The candidate blocks are the handler's first block and everything it dominates. The walk
//!    down the dominator tree stops at placeholders and exits, so the body of an enclosing
//!    handler entered from this one is not claimed.
//! 3. A block consisting of exactly `aload s; athrow`, where `s` is the slot the handler stores
//!    the caught exception into, joins the candidates. Compilers duplicate such rethrows of
//!    `finally` bodies, which leaves them shared and therefore undominated.
//! 4. Candidates starting inside the row's own try range are dropped.
//! 5. The survivors are sorted by offset and kept while contiguous, starting at the handler
//!    offset. The handler range ends at the last kept block, or at the handler's first
//!    instruction if none is kept.

use std::fmt;

use crate::{
    analysis::cfg::{BasicBlock, ControlFlowGraph, NodeKind},
    disassembler::{FlowType, Instruction, InstructionId, LocalAccess, Operand, ValueKind},
    metadata::{code::ExceptionTableEntry, scope::TypeReference},
    utils::graph::NodeId,
    Error::HandlerNodeMissing,
    Result,
};

/// A contiguous run of instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstructionRange {
    /// First instruction
    pub first: InstructionId,
    /// Last instruction (inclusive)
    pub last: InstructionId,
    /// Offset of the first instruction
    pub start: u32,
    /// Offset just past the last instruction
    pub end: u32,
}

impl InstructionRange {
    fn new(instructions: &[Instruction], first: usize, last: usize) -> Self {
        InstructionRange {
            first: InstructionId(first),
            last: InstructionId(last),
            start: instructions[first].offset,
            end: instructions[last].end_offset(),
        }
    }

    /// `true` if instruction `id` lies in the range.
    #[must_use]
    pub fn contains(&self, id: InstructionId) -> bool {
        !id.is_sentinel() && self.first.index() <= id.index() && id.index() <= self.last.index()
    }

    /// `true` if `offset` lies in `[start, end)`.
    #[must_use]
    pub fn covers(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    /// Number of instructions in the range.
    #[must_use]
    pub fn len(&self) -> usize {
        self.last.index() - self.first.index() + 1
    }

    /// Always `false`; ranges hold at least one instruction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl fmt::Display for InstructionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// One exception table row with its try and handler extents resolved to instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionHandler {
    /// Protected instructions
    pub try_block: InstructionRange,
    /// Handler body, starting at the handler entry
    pub handler_block: InstructionRange,
    /// Caught type; `None` for `finally` and catch-all handlers
    pub catch_type: Option<TypeReference>,
}

impl ExceptionHandler {
    /// `true` if the handler catches every exception.
    #[must_use]
    pub fn is_finally(&self) -> bool {
        self.catch_type.is_none()
    }
}

impl fmt::Display for ExceptionHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "try {} ", self.try_block)?;
        match &self.catch_type {
            Some(catch_type) => write!(f, "catch {catch_type} ")?,
            None => write!(f, "finally ")?,
        }
        write!(f, "{}", self.handler_block)
    }
}

/// Maps every exception table row onto the decoded instructions, preserving table order.
///
/// # Errors
///
/// Returns [`crate::Error::HandlerNodeMissing`] if a handler offset is not the offset of an
/// instruction, and [`crate::Error::Malformed`] if a try range covers no instruction.
pub fn map_exception_handlers(
    instructions: &[Instruction],
    exception_table: &[ExceptionTableEntry],
) -> Result<Vec<ExceptionHandler>> {
    if exception_table.is_empty() {
        return Ok(Vec::new());
    }

    let cfg = ControlFlowGraph::build(instructions, exception_table)?;
    exception_table
        .iter()
        .map(|row| map_row(&cfg, instructions, row))
        .collect()
}

fn map_row(
    cfg: &ControlFlowGraph,
    instructions: &[Instruction],
    row: &ExceptionTableEntry,
) -> Result<ExceptionHandler> {
    let try_block = try_range(instructions, row)?;

    let handler_offset = u32::from(row.handler);
    let handler_node = cfg
        .block_at(instructions, handler_offset)
        .ok_or(HandlerNodeMissing(handler_offset))?;
    let handler_start = cfg
        .block(handler_node)
        .map(|block| block.first.index())
        .ok_or(HandlerNodeMissing(handler_offset))?;

    let mut candidates = dominated_blocks(cfg, handler_node);
    candidates.extend(rethrow_blocks(cfg, instructions, &candidates, handler_start));
    candidates.retain(|block| !row.covers(block.start_offset));
    candidates.sort_by_key(|block| block.start_offset);

    let mut last = handler_start;
    let mut expected = handler_offset;
    for block in &candidates {
        if block.start_offset != expected {
            break;
        }
        last = block.last.index();
        expected = block.end_offset;
    }

    Ok(ExceptionHandler {
        try_block,
        handler_block: InstructionRange::new(instructions, handler_start, last),
        catch_type: row.catch_type.clone(),
    })
}

/// The instructions in `[start, end)`; an `end` at the code length selects the last instruction.
fn try_range(instructions: &[Instruction], row: &ExceptionTableEntry) -> Result<InstructionRange> {
    let first = instructions.partition_point(|instruction| instruction.offset < u32::from(row.start));
    let past = instructions.partition_point(|instruction| instruction.offset < u32::from(row.end));

    if first >= past {
        return Err(malformed_error!(
            "Exception table range [{}, {}) covers no instruction",
            row.start,
            row.end
        ));
    }

    Ok(InstructionRange::new(instructions, first, past - 1))
}

/// The block `root` and every block below it in the dominator tree, without crossing
/// placeholders or exits.
fn dominated_blocks(cfg: &ControlFlowGraph, root: NodeId) -> Vec<BasicBlock> {
    let tree = cfg.dominators();
    let mut blocks = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        let Some(block) = cfg.block(node) else {
            continue;
        };
        blocks.push(*block);

        stack.extend(
            tree.children(node)
                .iter()
                .copied()
                .filter(|&child| cfg.kind(child) == Some(NodeKind::NormalBlock)),
        );
    }

    blocks
}

/// The slot a handler stores its caught exception into, if it starts with `astore`.
fn caught_slot(instructions: &[Instruction], handler_start: usize) -> Option<u16> {
    match &instructions.get(handler_start)?.operand {
        Operand::Local(local)
            if local.access == LocalAccess::Store && local.kind == ValueKind::Reference =>
        {
            Some(local.slot)
        }
        _ => None,
    }
}

/// Undominated `aload s; athrow` blocks rethrowing the handler's caught exception.
fn rethrow_blocks(
    cfg: &ControlFlowGraph,
    instructions: &[Instruction],
    owned: &[BasicBlock],
    handler_start: usize,
) -> Vec<BasicBlock> {
    let Some(slot) = caught_slot(instructions, handler_start) else {
        return Vec::new();
    };

    cfg.blocks()
        .map(|(_, block)| *block)
        .filter(|block| !owned.contains(block))
        .filter(|block| match block.instructions(instructions) {
            [load, throw] => {
                throw.flow_type == FlowType::Throw
                    && matches!(
                        &load.operand,
                        Operand::Local(local)
                            if local.access == LocalAccess::Load
                                && local.kind == ValueKind::Reference
                                && local.slot == slot
                    )
            }
            _ => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{disassembler::decode_instructions, metadata::constpool::ConstantPool};

    fn map(code: &[u8], table: &[ExceptionTableEntry]) -> Result<Vec<ExceptionHandler>> {
        let instructions = decode_instructions(code, &ConstantPool::default()).unwrap();
        map_exception_handlers(&instructions, table)
    }

    fn row(start: u16, end: u16, handler: u16) -> ExceptionTableEntry {
        ExceptionTableEntry {
            start,
            end,
            handler,
            catch_type: None,
        }
    }

    fn offsets(range: &InstructionRange) -> (u32, u32) {
        (range.start, range.end)
    }

    #[test]
    fn empty_table() {
        assert!(map(&[0xB1], &[]).unwrap().is_empty());
    }

    #[test]
    fn try_catch_with_handler_body() {
        // 0: nop; 1: nop; 2: goto 8; 5: astore_1; 6: aload_1; 7: pop; 8: return
        let code = [0x00, 0x00, 0xA7, 0x00, 0x06, 0x4C, 0x2B, 0x57, 0xB1];
        let handlers = map(&code, &[row(0, 5, 5)]).unwrap();

        assert_eq!(handlers.len(), 1);
        assert_eq!(offsets(&handlers[0].try_block), (0, 5));
        assert_eq!(offsets(&handlers[0].handler_block), (5, 8));
        assert_eq!(handlers[0].handler_block.len(), 3);
        assert!(handlers[0].is_finally());
    }

    #[test]
    fn try_range_ending_at_code_length_is_clipped() {
        // 0: nop; 1: astore_1; 2: return
        let handlers = map(&[0x00, 0x4C, 0xB1], &[row(0, 3, 1)]).unwrap();

        assert_eq!(handlers[0].try_block.last, InstructionId(2));
        assert_eq!(offsets(&handlers[0].try_block), (0, 3));
        // the handler starts inside its own try range, so only its first instruction is kept
        assert_eq!(offsets(&handlers[0].handler_block), (1, 2));
    }

    #[test]
    fn shared_rethrow_is_owned() {
        // 0: iload_0; 1: ifeq 12; 4: nop; 5: goto 14
        // 8: astore_1; 9: goto 12
        // 12: aload_1; 13: athrow
        // 14: return
        let code = [
            0x1A, 0x99, 0x00, 0x0B, 0x00, 0xA7, 0x00, 0x09, 0x4C, 0xA7, 0x00, 0x03, 0x2B, 0xBF,
            0xB1,
        ];
        let instructions = decode_instructions(&code, &ConstantPool::default()).unwrap();
        assert_eq!(instructions[6].offset, 12);

        let handlers = map_exception_handlers(&instructions, &[row(4, 5, 8)]).unwrap();
        // the rethrow at 12 is also reached from offset 1, so the handler does not dominate it
        assert_eq!(offsets(&handlers[0].try_block), (4, 5));
        assert_eq!(offsets(&handlers[0].handler_block), (8, 14));
        assert_eq!(handlers[0].handler_block.last, InstructionId(7));
    }

    #[test]
    fn rethrow_of_another_slot_is_not_owned() {
        // same shape, but the handler stores into slot 2 and the shared block loads slot 1
        let code = [
            0x1A, 0x99, 0x00, 0x0B, 0x00, 0xA7, 0x00, 0x09, 0x4D, 0xA7, 0x00, 0x03, 0x2B, 0xBF,
            0xB1,
        ];
        let handlers = map(&code, &[row(4, 5, 8)]).unwrap();
        assert_eq!(offsets(&handlers[0].handler_block), (8, 12));
    }

    #[test]
    fn missing_handler_node() {
        // handler offset 2 points into the middle of sipush
        let result = map(&[0x11, 0x00, 0x01, 0xB1], &[row(0, 3, 2)]);
        assert!(matches!(result, Err(HandlerNodeMissing(2))));
    }

    #[test]
    fn empty_try_range_is_malformed() {
        let result = map(&[0x00, 0x4C, 0xB1], &[row(1, 1, 1)]);
        assert!(matches!(result, Err(crate::Error::Malformed { .. })));
    }
}
