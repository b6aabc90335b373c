//! Decoded method bodies.

use log::debug;

use crate::{
    analysis::{map_exception_handlers, ExceptionHandler},
    disassembler::{
        decoder::decode_instructions,
        instruction::{Instruction, InstructionId, LocalOperand},
        variables::{bind_variables, VariableDefinition, VariableId, VariableKind},
    },
    metadata::{
        code::{CodeBlock, ExceptionTableEntry},
        method::MethodDefinition,
        scope::SymbolScope,
    },
    Result,
};

/// The materialized body of one method: instructions, variables and exception handlers.
///
/// Instructions are stored in offset order and addressed by [`InstructionId`]. Targets past the
/// end of the code refer to [`MethodBody::sentinel`], a `nop` placed at the code length.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodBody {
    /// Maximum operand stack depth
    pub max_stack: u16,
    /// Number of local variable slots
    pub max_locals: u16,
    /// Length of the code array in bytes
    pub code_length: u32,
    /// Instructions in offset order
    pub instructions: Vec<Instruction>,
    /// Variable table; operands refer to it by [`VariableId`]
    pub variables: Vec<VariableDefinition>,
    /// One handler per exception table row, in table order
    pub handlers: Vec<ExceptionHandler>,
    /// Number of labels assigned
    pub label_count: usize,
    /// The synthetic `nop` at the end of the code
    pub sentinel: Instruction,
}

impl MethodBody {
    /// Returns the instruction `id`, including the sentinel.
    #[must_use]
    pub fn instruction(&self, id: InstructionId) -> Option<&Instruction> {
        if id.is_sentinel() {
            Some(&self.sentinel)
        } else {
            self.instructions.get(id.index())
        }
    }

    /// Returns the id of the instruction starting at `offset`.
    ///
    /// The code length maps to [`InstructionId::SENTINEL`]; offsets inside an instruction map
    /// to `None`.
    #[must_use]
    pub fn at_offset(&self, offset: u32) -> Option<InstructionId> {
        if offset == self.code_length {
            return Some(InstructionId::SENTINEL);
        }

        self.instructions
            .binary_search_by_key(&offset, |instruction| instruction.offset)
            .ok()
            .map(InstructionId)
    }

    /// The instruction following `id`; the last instruction is followed by the sentinel.
    #[must_use]
    pub fn next(&self, id: InstructionId) -> Option<InstructionId> {
        if id.is_sentinel() {
            return None;
        }

        let next = id.index() + 1;
        match next.cmp(&self.instructions.len()) {
            std::cmp::Ordering::Less => Some(InstructionId(next)),
            std::cmp::Ordering::Equal => Some(InstructionId::SENTINEL),
            std::cmp::Ordering::Greater => None,
        }
    }

    /// The instruction preceding `id`.
    #[must_use]
    pub fn previous(&self, id: InstructionId) -> Option<InstructionId> {
        if id.is_sentinel() {
            return self.instructions.len().checked_sub(1).map(InstructionId);
        }

        id.index().checked_sub(1).map(InstructionId)
    }

    /// Returns the variable `id`.
    #[must_use]
    pub fn variable(&self, id: VariableId) -> Option<&VariableDefinition> {
        self.variables.get(id.index())
    }

    /// The variable a local operand is bound to.
    #[must_use]
    pub fn variable_of(&self, operand: &LocalOperand) -> Option<&VariableDefinition> {
        operand.variable().and_then(|id| self.variable(id))
    }

    /// The variables holding `this` and the parameters, in slot order.
    pub fn parameter_variables(&self) -> impl Iterator<Item = &VariableDefinition> {
        self.variables
            .iter()
            .filter(|variable| variable.kind != VariableKind::Local)
    }
}

/// Assigns dense labels, in offset order, to every branch target and exception table offset.
fn assign_labels(
    instructions: &mut [Instruction],
    sentinel: &mut Instruction,
    exception_table: &[ExceptionTableEntry],
) -> usize {
    let mut labeled = vec![false; instructions.len()];
    let mut sentinel_labeled = false;

    let mut mark = |id: InstructionId, labeled: &mut Vec<bool>| {
        if id.is_sentinel() {
            sentinel_labeled = true;
        } else if let Some(flag) = labeled.get_mut(id.index()) {
            *flag = true;
        }
    };

    for instruction in instructions.iter() {
        for target in instruction.targets() {
            mark(target, &mut labeled);
        }
    }

    for entry in exception_table {
        for offset in [entry.start, entry.handler] {
            if let Ok(index) = instructions
                .binary_search_by_key(&u32::from(offset), |instruction| instruction.offset)
            {
                mark(InstructionId(index), &mut labeled);
            }
        }
    }

    let mut count = 0;
    for (instruction, labeled) in instructions.iter_mut().zip(labeled) {
        if labeled {
            instruction.label = Some(count);
            count += 1;
        }
    }

    if sentinel_labeled {
        sentinel.label = Some(count);
        count += 1;
    }

    count
}

/// Decodes the body of `method` from its inflated `Code` attribute.
///
/// # Errors
/// Returns an error if the bytecode cannot be decoded, or if an exception handler does not
/// start at an instruction.
pub(crate) fn decode_method(
    method: &MethodDefinition,
    code: &CodeBlock,
    bytecode: &[u8],
    scope: &dyn SymbolScope,
) -> Result<MethodBody> {
    let mut instructions = decode_instructions(bytecode, scope)?;
    let variables = bind_variables(method, code, &mut instructions);

    let code_length = instructions
        .last()
        .map_or(0, |instruction| instruction.end_offset());
    let mut sentinel = Instruction::sentinel(code_length);
    let label_count = assign_labels(&mut instructions, &mut sentinel, &code.exception_table);

    let handlers = map_exception_handlers(&instructions, &code.exception_table)?;

    debug!(
        "Decoded {}.{}: {} instructions, {} variables, {} handlers",
        method.owner(),
        method.name,
        instructions.len(),
        variables.len(),
        handlers.len()
    );

    Ok(MethodBody {
        max_stack: code.max_stack,
        max_locals: code.max_locals,
        code_length,
        instructions,
        variables,
        handlers,
        label_count,
        sentinel,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::constpool::ConstantPool;

    fn body(code: &[u8], table: &[ExceptionTableEntry]) -> MethodBody {
        let mut instructions = decode_instructions(code, &ConstantPool::default()).unwrap();
        let code_length = code.len() as u32;
        let mut sentinel = Instruction::sentinel(code_length);
        let label_count = assign_labels(&mut instructions, &mut sentinel, table);
        MethodBody {
            max_stack: 2,
            max_locals: 2,
            code_length,
            instructions,
            variables: Vec::new(),
            handlers: Vec::new(),
            label_count,
            sentinel,
        }
    }

    #[test]
    fn labels_follow_offset_order() {
        // 0: iload_0; 1: ifeq +6 (7); 4: goto -4 (0); 7: goto +10 (past end)
        let code = [0x1A, 0x99, 0x00, 0x06, 0xA7, 0xFF, 0xFC, 0xA7, 0x00, 0x0A];
        let body = body(&code, &[]);

        assert_eq!(body.label_count, 3);
        assert_eq!(body.instructions[0].label, Some(0));
        assert_eq!(body.instructions[1].label, None);
        assert_eq!(body.instructions[3].label, Some(1));
        assert_eq!(body.sentinel.label, Some(2));
        assert_eq!(body.sentinel.offset, 10);
    }

    #[test]
    fn navigation() {
        // 0: iconst_0; 1: istore_1; 2: return
        let body = body(&[0x03, 0x3C, 0xB1], &[]);

        assert_eq!(body.at_offset(1), Some(InstructionId(1)));
        assert_eq!(body.at_offset(3), Some(InstructionId::SENTINEL));
        assert_eq!(body.at_offset(7), None);
        assert_eq!(body.next(InstructionId(1)), Some(InstructionId(2)));
        assert_eq!(body.next(InstructionId(2)), Some(InstructionId::SENTINEL));
        assert_eq!(body.next(InstructionId::SENTINEL), None);
        assert_eq!(body.previous(InstructionId(0)), None);
        assert_eq!(body.previous(InstructionId::SENTINEL), Some(InstructionId(2)));
        assert_eq!(body.instruction(InstructionId::SENTINEL).unwrap().mnemonic, "nop");
        assert_eq!(body.label_count, 0);
    }

    #[test]
    fn handler_offsets_are_labeled() {
        // 0: nop; 1: nop; 2: return; 3: astore_1; 4: return
        let table = [ExceptionTableEntry {
            start: 1,
            end: 2,
            handler: 3,
            catch_type: None,
        }];
        let body = body(&[0x00, 0x00, 0xB1, 0x4C, 0xB1], &table);

        assert_eq!(body.instructions[1].label, Some(0));
        assert_eq!(body.instructions[3].label, Some(1));
        assert_eq!(body.label_count, 2);
    }
}
