//! JVM bytecode decoding.
//!
//! [`decode_instructions`] turns one method's code array into an ordered instruction vector in a
//! single linear scan. Every step looks the opcode up in [`OPCODES`] and decodes the operand
//! according to the row's [`OperandShape`]; constant-pool operands are resolved through a
//! [`SymbolScope`] as they are read.
//!
//! Branch targets are resolved to [`InstructionId`]s during the same scan:
//!
//! - a target at or before the current offset is looked up among the instructions already
//!   decoded
//! - a target after it is recorded as a pending fixup keyed by the target offset; when the scan
//!   reaches that offset, every fixup waiting on it is patched to the instruction just created
//! - a target at or past the end of the code resolves to [`InstructionId::SENTINEL`]
//!
//! A target that lands inside another instruction is malformed.
//!
//! # Example
//!
//! ```rust,no_run
//! use cafescope::{disassembler::{decode_instructions, Operand, InstructionId}, metadata::constpool::ConstantPool};
//!
//! // iconst_0; istore_1; goto +3; iload_1; ireturn
//! let code = [0x03, 0x3C, 0xA7, 0x00, 0x03, 0x1B, 0xAC];
//! let instructions = decode_instructions(&code, &ConstantPool::default())?;
//! assert_eq!(instructions.len(), 5);
//! assert_eq!(instructions[2].operand, Operand::Target(InstructionId(3)));
//! # Ok::<(), cafescope::Error>(())
//! ```

use std::collections::BTreeMap;

use log::warn;

use crate::{
    disassembler::{
        instruction::{
            Instruction, InstructionId, LocalOperand, Operand, SwitchInfo, SwitchKind,
        },
        table::{OpcodeInfo, OperandShape, OPCODES},
    },
    file::cursor::ByteCursor,
    metadata::{descriptor::JvmType, scope::SymbolScope, token::Token},
    Result,
};

/// The operand field a fixup patches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixupSlot {
    Target,
    SwitchDefault,
    SwitchCase(usize),
}

#[derive(Debug, Clone, Copy)]
struct Fixup {
    instruction: usize,
    slot: FixupSlot,
}

/// A stateful decoder over one code array.
struct Decoder<'a> {
    cursor: ByteCursor<'a>,
    scope: &'a dyn SymbolScope,
    code_length: u32,
    instructions: Vec<Instruction>,
    pending: BTreeMap<u32, Vec<Fixup>>,
}

impl<'a> Decoder<'a> {
    fn new(code: &'a [u8], scope: &'a dyn SymbolScope) -> Result<Self> {
        let code_length = u32::try_from(code.len())
            .map_err(|_| malformed_error!("Code array of {} bytes is too large", code.len()))?;

        Ok(Decoder {
            cursor: ByteCursor::new(code),
            scope,
            code_length,
            instructions: Vec::new(),
            pending: BTreeMap::new(),
        })
    }

    fn decode(mut self) -> Result<Vec<Instruction>> {
        while self.cursor.has_remaining() {
            let offset = self.position();
            let id = self.instructions.len();

            let instruction = self.decode_instruction(offset, id)?;
            self.instructions.push(instruction);

            if let Some(fixups) = self.pending.remove(&offset) {
                for fixup in fixups {
                    self.patch(fixup, InstructionId(id));
                }
            }
        }

        // Anything still pending names an offset inside an instruction
        if let Some((offset, fixups)) = self.pending.iter().next() {
            let source = fixups
                .first()
                .and_then(|fixup| self.instructions.get(fixup.instruction))
                .map_or(0, |instruction| instruction.offset);
            return Err(malformed_error!(
                "Branch at offset {} targets offset {} inside an instruction",
                source,
                offset
            ));
        }

        Ok(self.instructions)
    }

    fn position(&self) -> u32 {
        // The cursor never moves past the code array, whose length fits in u32
        u32::try_from(self.cursor.position()).unwrap_or(self.code_length)
    }

    fn decode_instruction(&mut self, offset: u32, id: usize) -> Result<Instruction> {
        let opcode = self.cursor.read_u8()?;
        let mut info = OPCODES[usize::from(opcode)];
        if info.is_reserved() {
            return Err(malformed_error!(
                "Reserved opcode 0x{:02X} at offset {}",
                opcode,
                offset
            ));
        }

        let mut wide = false;
        let mut effective_opcode = opcode;
        if info.shape == OperandShape::Wide {
            effective_opcode = self.cursor.read_u8()?;
            info = OPCODES[usize::from(effective_opcode)];
            if !info.accepts_wide() {
                return Err(malformed_error!(
                    "Opcode 0x{:02X} at offset {} cannot follow wide",
                    effective_opcode,
                    offset
                ));
            }
            wide = true;
        }

        let operand = self.decode_operand(&info, offset, id, wide)?;
        let size = self.position() - offset;

        Ok(Instruction {
            offset,
            size,
            opcode: effective_opcode,
            wide,
            mnemonic: info.mnemonic,
            flow_type: info.flow,
            operand,
            label: None,
        })
    }

    fn decode_operand(
        &mut self,
        info: &OpcodeInfo,
        offset: u32,
        id: usize,
        wide: bool,
    ) -> Result<Operand> {
        let operand = match info.shape {
            OperandShape::None => Operand::None,
            OperandShape::Byte => Operand::Literal(i32::from(self.cursor.read_i8()?)),
            OperandShape::Short => Operand::Literal(i32::from(self.cursor.read_i16()?)),
            OperandShape::Constant => {
                let index = u16::from(self.cursor.read_u8()?);
                Operand::Constant(self.scope.lookup_constant(Token(index))?)
            }
            OperandShape::WideConstant => {
                let index = self.cursor.read_u16()?;
                Operand::Constant(self.scope.lookup_constant(Token(index))?)
            }
            OperandShape::Local => {
                let slot = self.read_slot(wide)?;
                Operand::Local(Self::local_operand(info, slot, offset)?)
            }
            OperandShape::ImplicitLocal(slot) => {
                Operand::Local(Self::local_operand(info, slot, offset)?)
            }
            OperandShape::LocalIncrement => {
                let slot = self.read_slot(wide)?;
                let delta = if wide {
                    self.cursor.read_i16()?
                } else {
                    i16::from(self.cursor.read_i8()?)
                };
                Operand::Increment {
                    local: Self::local_operand(info, slot, offset)?,
                    delta,
                }
            }
            OperandShape::Branch => {
                let delta = i32::from(self.cursor.read_i16()?);
                let target = self.resolve_target(offset, delta, id, FixupSlot::Target)?;
                Operand::Target(target)
            }
            OperandShape::WideBranch => {
                let delta = self.cursor.read_i32()?;
                let target = self.resolve_target(offset, delta, id, FixupSlot::Target)?;
                Operand::Target(target)
            }
            OperandShape::TableSwitch => Operand::Switch(self.decode_table_switch(offset, id)?),
            OperandShape::LookupSwitch => Operand::Switch(self.decode_lookup_switch(offset, id)?),
            OperandShape::Type => Operand::Type(self.scope.lookup_type(self.read_token()?)?),
            OperandShape::MultiArray => {
                let array_type = self.scope.lookup_type(self.read_token()?)?;
                let dimensions = self.cursor.read_u8()?;
                if dimensions == 0 {
                    return Err(malformed_error!(
                        "multianewarray at offset {} with zero dimensions",
                        offset
                    ));
                }
                Operand::MultiArray {
                    array_type,
                    dimensions,
                }
            }
            OperandShape::PrimitiveType => {
                let code = self.cursor.read_u8()?;
                let Some(element) = JvmType::from_array_type_code(code) else {
                    return Err(malformed_error!(
                        "Invalid newarray type code {} at offset {}",
                        code,
                        offset
                    ));
                };
                Operand::PrimitiveType(element)
            }
            OperandShape::Field => Operand::Field(self.scope.lookup_field(self.read_token()?)?),
            OperandShape::Method => Operand::Method(self.scope.lookup_method(self.read_token()?)?),
            OperandShape::InterfaceMethod => {
                let method = self.scope.lookup_method(self.read_token()?)?;
                let _count = self.cursor.read_u8()?;
                let _zero = self.cursor.read_u8()?;
                Operand::Method(method)
            }
            OperandShape::CallSite => {
                let call_site = self.scope.lookup_dynamic_call_site(self.read_token()?)?;
                let _zero = self.cursor.read_u16()?;
                Operand::CallSite(call_site)
            }
            OperandShape::Wide => {
                return Err(malformed_error!("Nested wide prefix at offset {}", offset));
            }
        };

        Ok(operand)
    }

    fn read_token(&mut self) -> Result<Token> {
        Ok(Token(self.cursor.read_u16()?))
    }

    fn read_slot(&mut self, wide: bool) -> Result<u16> {
        if wide {
            self.cursor.read_u16()
        } else {
            Ok(u16::from(self.cursor.read_u8()?))
        }
    }

    fn local_operand(info: &OpcodeInfo, slot: u16, offset: u32) -> Result<LocalOperand> {
        let Some((access, kind)) = info.local else {
            return Err(malformed_error!(
                "{} at offset {} has no local access mode",
                info.mnemonic,
                offset
            ));
        };
        Ok(LocalOperand::new(slot, access, kind))
    }

    /// Resolves `offset + delta` or records a fixup for it.
    fn resolve_target(
        &mut self,
        offset: u32,
        delta: i32,
        id: usize,
        slot: FixupSlot,
    ) -> Result<InstructionId> {
        let target = i64::from(offset) + i64::from(delta);
        if target < 0 {
            return Err(malformed_error!(
                "Branch at offset {} targets negative offset {}",
                offset,
                target
            ));
        }

        if target >= i64::from(self.code_length) {
            warn!(
                "Branch at offset {} targets offset {} past the end of code ({}), using a nop",
                offset, target, self.code_length
            );
            return Ok(InstructionId::SENTINEL);
        }

        // Bounded by code_length above
        let target = target as u32;
        if target == offset {
            return Ok(InstructionId(id));
        }

        if target < offset {
            return match self
                .instructions
                .binary_search_by_key(&target, |instruction| instruction.offset)
            {
                Ok(index) => Ok(InstructionId(index)),
                Err(_) => Err(malformed_error!(
                    "Branch at offset {} targets offset {} inside an instruction",
                    offset,
                    target
                )),
            };
        }

        self.pending.entry(target).or_default().push(Fixup {
            instruction: id,
            slot,
        });
        Ok(InstructionId::SENTINEL)
    }

    fn patch(&mut self, fixup: Fixup, target: InstructionId) {
        let Some(instruction) = self.instructions.get_mut(fixup.instruction) else {
            return;
        };

        match (&mut instruction.operand, fixup.slot) {
            (Operand::Target(slot), FixupSlot::Target) => *slot = target,
            (Operand::Switch(switch), FixupSlot::SwitchDefault) => switch.default = target,
            (Operand::Switch(switch), FixupSlot::SwitchCase(position)) => {
                if let Some(slot) = switch.targets.get_mut(position) {
                    *slot = target;
                }
            }
            _ => {}
        }
    }

    /// Skips the 0-3 padding bytes that align a switch body to a multiple of four from the start
    /// of the code.
    fn skip_switch_padding(&mut self) -> Result<()> {
        let padding = (4 - self.cursor.position() % 4) % 4;
        self.cursor.advance(padding)
    }

    fn decode_table_switch(&mut self, offset: u32, id: usize) -> Result<SwitchInfo> {
        self.skip_switch_padding()?;

        let default_delta = self.cursor.read_i32()?;
        let low = self.cursor.read_i32()?;
        let high = self.cursor.read_i32()?;
        if low > high {
            return Err(malformed_error!(
                "tableswitch at offset {} has low {} above high {}",
                offset,
                low,
                high
            ));
        }

        let count = i64::from(high) - i64::from(low) + 1;
        if count * 4 > self.cursor.remaining() as i64 {
            return Err(out_of_bounds_error!());
        }

        let default = self.resolve_target(offset, default_delta, id, FixupSlot::SwitchDefault)?;
        let mut targets = Vec::with_capacity(count as usize);
        for position in 0..count as usize {
            let delta = self.cursor.read_i32()?;
            targets.push(self.resolve_target(
                offset,
                delta,
                id,
                FixupSlot::SwitchCase(position),
            )?);
        }

        Ok(SwitchInfo {
            kind: SwitchKind::Table { low, high },
            default,
            targets,
        })
    }

    fn decode_lookup_switch(&mut self, offset: u32, id: usize) -> Result<SwitchInfo> {
        self.skip_switch_padding()?;

        let default_delta = self.cursor.read_i32()?;
        let pairs = self.cursor.read_i32()?;
        if pairs < 0 {
            return Err(malformed_error!(
                "lookupswitch at offset {} has negative pair count {}",
                offset,
                pairs
            ));
        }

        let pairs = pairs as usize;
        if pairs.saturating_mul(8) > self.cursor.remaining() {
            return Err(out_of_bounds_error!());
        }

        let default = self.resolve_target(offset, default_delta, id, FixupSlot::SwitchDefault)?;
        let mut keys = Vec::with_capacity(pairs);
        let mut targets = Vec::with_capacity(pairs);
        for position in 0..pairs {
            keys.push(self.cursor.read_i32()?);
            let delta = self.cursor.read_i32()?;
            targets.push(self.resolve_target(
                offset,
                delta,
                id,
                FixupSlot::SwitchCase(position),
            )?);
        }

        if keys.windows(2).any(|pair| pair[0] >= pair[1]) {
            warn!("lookupswitch at offset {} has unsorted keys", offset);
        }

        Ok(SwitchInfo {
            kind: SwitchKind::Lookup { keys },
            default,
            targets,
        })
    }
}

/// Decodes a complete code array.
///
/// Branch and switch targets are resolved to instruction ids; targets at or past the end of
/// the code become [`InstructionId::SENTINEL`]. Local variable operands are left
/// [`crate::disassembler::LocalBinding::Pending`].
///
/// # Arguments
///
/// * `code` - The code array, starting at bytecode offset 0
/// * `scope` - Resolves constant-pool operands
///
/// # Errors
///
/// Returns an error if:
/// - a reserved opcode is encountered, or `wide` prefixes an opcode that has no wide form
/// - an operand is truncated
/// - a constant-pool operand does not resolve
/// - a branch targets a negative offset or the middle of an instruction
pub fn decode_instructions(code: &[u8], scope: &dyn SymbolScope) -> Result<Vec<Instruction>> {
    Decoder::new(code, scope)?.decode()
}

/// `true` if `opcode` names a reserved or undefined byte.
#[must_use]
pub fn is_reserved_opcode(opcode: u8) -> bool {
    OPCODES[usize::from(opcode)].is_reserved()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disassembler::{
            instruction::FlowType,
            opcodes as op,
            table::{LocalAccess, ValueKind},
        },
        metadata::{
            constpool::{ConstantPool, ConstantPoolEntry},
            scope::Constant,
        },
        Error,
    };

    fn decode(code: &[u8]) -> Result<Vec<Instruction>> {
        decode_instructions(code, &ConstantPool::default())
    }

    fn target(instruction: &Instruction) -> InstructionId {
        match instruction.operand {
            Operand::Target(target) => target,
            ref other => panic!("expected branch target, got {other:?}"),
        }
    }

    #[test]
    fn offsets_are_contiguous() {
        // bipush 5; sipush 300; istore 4; iinc 4 -1; return
        let code = [0x10, 0x05, 0x11, 0x01, 0x2C, 0x36, 0x04, 0x84, 0x04, 0xFF, 0xB1];
        let instructions = decode(&code).unwrap();

        assert_eq!(instructions.len(), 5);
        let mut expected = 0;
        for instruction in &instructions {
            assert_eq!(instruction.offset, expected);
            expected += instruction.size;
        }
        assert_eq!(expected as usize, code.len());

        assert_eq!(instructions[0].operand, Operand::Literal(5));
        assert_eq!(instructions[1].operand, Operand::Literal(300));
        match &instructions[3].operand {
            Operand::Increment { local, delta } => {
                assert_eq!(local.slot, 4);
                assert_eq!(local.access, LocalAccess::Increment);
                assert_eq!(*delta, -1);
            }
            other => panic!("unexpected operand {other:?}"),
        }
        assert_eq!(instructions[4].flow_type, FlowType::Return);
    }

    #[test]
    fn forward_branches_share_target() {
        // 0: iload_0; 1: ifeq +6 (7); 4: goto +3 (7); 7: return
        let code = [0x1A, 0x99, 0x00, 0x06, 0xA7, 0x00, 0x03, 0xB1];
        let instructions = decode(&code).unwrap();

        assert_eq!(target(&instructions[1]), InstructionId(3));
        assert_eq!(target(&instructions[2]), InstructionId(3));
        assert_eq!(instructions[3].offset, 7);
    }

    #[test]
    fn backward_and_self_branches() {
        // 0: nop; 1: goto -1 (0); 4: goto +0 (4)
        let code = [0x00, 0xA7, 0xFF, 0xFF, 0xA7, 0x00, 0x00];
        let instructions = decode(&code).unwrap();

        assert_eq!(target(&instructions[1]), InstructionId(0));
        assert_eq!(target(&instructions[2]), InstructionId(2));
    }

    #[test]
    fn branch_past_end_uses_sentinel() {
        // 0: goto +10
        let code = [0xA7, 0x00, 0x0A];
        let instructions = decode(&code).unwrap();
        assert!(target(&instructions[0]).is_sentinel());
    }

    #[test]
    fn branch_into_instruction_is_malformed() {
        // 0: goto +4 (4); 3: sipush; 6: return
        let forward = [0xA7, 0x00, 0x04, 0x11, 0x00, 0x01, 0xB1];
        assert!(matches!(decode(&forward), Err(Error::Malformed { .. })));

        // 0: sipush; 3: goto -2 (1)
        let backward = [0x11, 0x00, 0x01, 0xA7, 0xFF, 0xFE];
        assert!(matches!(decode(&backward), Err(Error::Malformed { .. })));

        // 0: goto -1
        let negative = [0xA7, 0xFF, 0xFF];
        assert!(matches!(decode(&negative), Err(Error::Malformed { .. })));
    }

    #[test]
    fn table_switch_forward_and_backward() {
        let mut code = vec![
            0x00, // 0: nop
            0x1A, // 1: iload_0
            0xAA, // 2: tableswitch
            0x00, // padding to 4
        ];
        code.extend_from_slice(&28i32.to_be_bytes()); // default -> 30
        code.extend_from_slice(&(-1i32).to_be_bytes()); // low
        code.extend_from_slice(&1i32.to_be_bytes()); // high
        code.extend_from_slice(&(-2i32).to_be_bytes()); // -1 -> 0
        code.extend_from_slice(&26i32.to_be_bytes()); // 0 -> 28
        code.extend_from_slice(&28i32.to_be_bytes()); // 1 -> 30
        code.push(0x00); // 28: nop
        code.push(0x00); // 29: nop
        code.push(0xB1); // 30: return

        let instructions = decode(&code).unwrap();
        let switch = &instructions[2];
        assert_eq!(switch.size, 26);
        assert_eq!(switch.flow_type, FlowType::Switch);

        let Operand::Switch(info) = &switch.operand else {
            panic!("expected switch operand");
        };
        assert_eq!(info.kind, SwitchKind::Table { low: -1, high: 1 });
        assert_eq!(info.targets.len(), 3);
        assert_eq!(info.targets[0], InstructionId(0));
        assert_eq!(instructions[info.targets[1].index()].offset, 28);
        assert_eq!(instructions[info.targets[2].index()].offset, 30);
        assert_eq!(info.default, info.targets[2]);
    }

    #[test]
    fn lookup_switch() {
        let mut code = vec![0x1A, 0xAB, 0x00, 0x00]; // 0: iload_0; 1: lookupswitch; pad
        code.extend_from_slice(&27i32.to_be_bytes()); // default -> 28
        code.extend_from_slice(&2i32.to_be_bytes());
        code.extend_from_slice(&10i32.to_be_bytes());
        code.extend_from_slice(&27i32.to_be_bytes()); // -> 28
        code.extend_from_slice(&20i32.to_be_bytes());
        code.extend_from_slice(&28i32.to_be_bytes()); // -> 29
        code.push(0xB1); // 28: return
        code.push(0xB1); // 29: return

        let instructions = decode(&code).unwrap();
        assert_eq!(instructions[1].size, 27);
        let Operand::Switch(info) = &instructions[1].operand else {
            panic!("expected switch operand");
        };
        assert_eq!(info.kind, SwitchKind::Lookup { keys: vec![10, 20] });
        assert_eq!(info.targets, vec![InstructionId(2), InstructionId(3)]);
        assert_eq!(info.default, InstructionId(2));
    }

    #[test]
    fn bad_table_switch_bounds() {
        let mut code = vec![0xAA, 0x00, 0x00, 0x00];
        code.extend_from_slice(&0i32.to_be_bytes());
        code.extend_from_slice(&5i32.to_be_bytes());
        code.extend_from_slice(&1i32.to_be_bytes());
        assert!(matches!(decode(&code), Err(Error::Malformed { .. })));

        let mut huge = vec![0xAA, 0x00, 0x00, 0x00];
        huge.extend_from_slice(&0i32.to_be_bytes());
        huge.extend_from_slice(&i32::MIN.to_be_bytes());
        huge.extend_from_slice(&i32::MAX.to_be_bytes());
        assert!(matches!(decode(&huge), Err(Error::OutOfBounds)));
    }

    #[test]
    fn wide_forms() {
        // wide iload 300; wide iinc 300 -1000; return
        let code = [
            0xC4, 0x15, 0x01, 0x2C, 0xC4, 0x84, 0x01, 0x2C, 0xFC, 0x18, 0xB1,
        ];
        let instructions = decode(&code).unwrap();
        assert_eq!(instructions.len(), 3);

        assert!(instructions[0].wide);
        assert_eq!(instructions[0].size, 4);
        assert_eq!(instructions[0].mnemonic, "iload");
        assert_eq!(instructions[0].opcode, op::ILOAD);
        let local = instructions[0].operand.local().unwrap();
        assert_eq!((local.slot, local.kind), (300, ValueKind::Int));

        assert_eq!(instructions[1].size, 6);
        assert_eq!(
            instructions[1].operand,
            Operand::Increment {
                local: LocalOperand::new(300, LocalAccess::Increment, ValueKind::Int),
                delta: -1000,
            }
        );

        // wide nop
        assert!(matches!(decode(&[0xC4, 0x00]), Err(Error::Malformed { .. })));
    }

    #[test]
    fn reserved_and_truncated() {
        assert!(matches!(decode(&[0xCA]), Err(Error::Malformed { .. })));
        assert!(matches!(decode(&[0xFF]), Err(Error::Malformed { .. })));
        assert!(matches!(decode(&[0x11, 0x00]), Err(Error::OutOfBounds)));
        assert!(is_reserved_opcode(0xCB));
        assert!(!is_reserved_opcode(op::GOTO_W));
    }

    #[test]
    fn constant_operands() {
        let pool = ConstantPool::from_entries(vec![
            ConstantPoolEntry::Unusable,
            ConstantPoolEntry::Integer(42),
            ConstantPoolEntry::Long(7),
            ConstantPoolEntry::Unusable,
        ]);
        // ldc #1; ldc2_w #2; newarray int
        let code = [0x12, 0x01, 0x14, 0x00, 0x02, 0x04, 0xBC, 0x0A];
        let instructions = decode_instructions(&code, &pool).unwrap();

        assert_eq!(instructions[0].operand, Operand::Constant(Constant::Integer(42)));
        assert_eq!(instructions[1].operand, Operand::Constant(Constant::Long(7)));
        assert_eq!(instructions[3].operand, Operand::PrimitiveType(JvmType::Int));

        // ldc #3 is the unusable upper half of the long
        assert!(matches!(
            decode_instructions(&[0x12, 0x03], &pool),
            Err(Error::InvalidConstant { .. })
        ));
    }
}
