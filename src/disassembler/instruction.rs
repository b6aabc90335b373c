//! Decoded instructions and their operands.
//!
//! Instructions of one method body live in a single vector ordered by offset; an
//! [`InstructionId`] is an index into it. Branch and switch operands hold ids rather than byte
//! offsets, so after decoding every target is the exact instruction it names. Targets past
//! the end of the code point at [`InstructionId::SENTINEL`], a synthetic `nop` owned by the
//! [`crate::disassembler::MethodBody`].

use std::fmt;

use crate::{
    disassembler::{
        table::{LocalAccess, ValueKind},
        variables::VariableId,
    },
    metadata::{
        descriptor::JvmType,
        scope::{CallSiteReference, Constant, FieldReference, MethodReference, TypeReference},
    },
};

/// Index of an instruction within its method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstructionId(pub usize);

impl InstructionId {
    /// The synthetic no-op standing in for targets past the end of the code.
    pub const SENTINEL: InstructionId = InstructionId(usize::MAX);

    /// Returns the index into the instruction vector.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }

    /// `true` for [`InstructionId::SENTINEL`].
    #[must_use]
    pub fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }
}

impl fmt::Display for InstructionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sentinel() {
            write!(f, "<end>")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// How an instruction affects control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowType {
    /// Execution continues with the next instruction
    Sequential,
    /// Either branches or falls through
    ConditionalBranch,
    /// Always branches
    UnconditionalBranch,
    /// Multi-way branch
    Switch,
    /// Leaves the method normally
    Return,
    /// Raises an exception
    Throw,
    /// Calls a local subroutine (`jsr`); the subroutine returns to the next instruction
    Subroutine,
    /// Returns from a local subroutine (`ret`)
    SubroutineReturn,
}

/// Layout of a switch instruction's keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchKind {
    /// `tableswitch`: one target per key in `low..=high`
    Table {
        /// First key
        low: i32,
        /// Last key
        high: i32,
    },
    /// `lookupswitch`: one target per listed key
    Lookup {
        /// Keys in encoded order
        keys: Vec<i32>,
    },
}

/// The resolved operand of a `tableswitch` or `lookupswitch`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchInfo {
    /// Key layout
    pub kind: SwitchKind,
    /// Target when no key matches
    pub default: InstructionId,
    /// Targets in key order
    pub targets: Vec<InstructionId>,
}

impl SwitchInfo {
    /// Key for the target at `position`.
    #[must_use]
    pub fn key(&self, position: usize) -> Option<i32> {
        match &self.kind {
            SwitchKind::Table { low, .. } => i32::try_from(position)
                .ok()
                .and_then(|position| low.checked_add(position)),
            SwitchKind::Lookup { keys } => keys.get(position).copied(),
        }
    }
}

/// Binding state of a local variable operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalBinding {
    /// Not yet bound; never present in a finished body
    Pending,
    /// Bound to a variable of the body
    Bound(VariableId),
    /// The slot lies outside `max_locals`
    OutOfRange,
}

/// A local variable operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalOperand {
    /// Slot named by the instruction
    pub slot: u16,
    /// How the slot is used
    pub access: LocalAccess,
    /// Value family implied by the opcode
    pub kind: ValueKind,
    /// Variable the slot resolved to
    pub binding: LocalBinding,
}

impl LocalOperand {
    pub(crate) fn new(slot: u16, access: LocalAccess, kind: ValueKind) -> Self {
        LocalOperand {
            slot,
            access,
            kind,
            binding: LocalBinding::Pending,
        }
    }

    /// The bound variable, if any.
    #[must_use]
    pub fn variable(&self) -> Option<VariableId> {
        match self.binding {
            LocalBinding::Bound(variable) => Some(variable),
            _ => None,
        }
    }

    /// `true` if the slot was out of range.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.binding == LocalBinding::OutOfRange
    }
}

/// The operand of a decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No operand
    None,
    /// A numeric literal (`bipush`, `sipush`)
    Literal(i32),
    /// A loadable constant (`ldc`, `ldc_w`, `ldc2_w`)
    Constant(Constant),
    /// A local variable (`iload`, `astore_1`, `ret` ...)
    Local(LocalOperand),
    /// A local variable and the amount added to it (`iinc`)
    Increment {
        /// The incremented variable
        local: LocalOperand,
        /// Signed increment
        delta: i16,
    },
    /// A branch target
    Target(InstructionId),
    /// A switch table
    Switch(SwitchInfo),
    /// A class or array type (`new`, `checkcast` ...)
    Type(TypeReference),
    /// A multi-dimensional array type and the number of dimensions to create
    MultiArray {
        /// Array type
        array_type: TypeReference,
        /// Dimensions popped from the stack
        dimensions: u8,
    },
    /// A primitive array element type (`newarray`)
    PrimitiveType(JvmType),
    /// A field
    Field(FieldReference),
    /// A method
    Method(MethodReference),
    /// An `invokedynamic` call site
    CallSite(CallSiteReference),
}

impl Operand {
    /// The local variable operand, for load, store, increment and `ret` instructions.
    #[must_use]
    pub fn local(&self) -> Option<&LocalOperand> {
        match self {
            Operand::Local(local) | Operand::Increment { local, .. } => Some(local),
            _ => None,
        }
    }

    pub(crate) fn local_mut(&mut self) -> Option<&mut LocalOperand> {
        match self {
            Operand::Local(local) | Operand::Increment { local, .. } => Some(local),
            _ => None,
        }
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Byte offset within the method's code
    pub offset: u32,
    /// Encoded size, including any `wide` prefix and switch padding
    pub size: u32,
    /// Opcode byte (the modified opcode for `wide` forms)
    pub opcode: u8,
    /// Decoded from a `wide` form
    pub wide: bool,
    /// Mnemonic
    pub mnemonic: &'static str,
    /// Control-flow behavior
    pub flow_type: FlowType,
    /// Operand
    pub operand: Operand,
    /// Dense label index, present only if another instruction branches here
    pub label: Option<usize>,
}

impl Instruction {
    /// The synthetic `nop` at `offset`, used as the target of out-of-range branches.
    pub(crate) fn sentinel(offset: u32) -> Self {
        Instruction {
            offset,
            size: 0,
            opcode: crate::disassembler::opcodes::NOP,
            wide: false,
            mnemonic: "nop",
            flow_type: FlowType::Sequential,
            operand: Operand::None,
            label: None,
        }
    }

    /// Offset of the following instruction.
    #[must_use]
    pub fn end_offset(&self) -> u32 {
        self.offset + self.size
    }

    /// `true` for conditional, unconditional and multi-way branches.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(
            self.flow_type,
            FlowType::ConditionalBranch
                | FlowType::UnconditionalBranch
                | FlowType::Switch
                | FlowType::Subroutine
        )
    }

    /// `true` if the instruction ends a basic block.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self.flow_type, FlowType::Sequential)
    }

    /// `true` if execution can continue with the next instruction.
    #[must_use]
    pub fn falls_through(&self) -> bool {
        matches!(
            self.flow_type,
            FlowType::Sequential | FlowType::ConditionalBranch | FlowType::Subroutine
        )
    }

    /// Branch targets; for switches the default first, then the cases.
    #[must_use]
    pub fn targets(&self) -> Vec<InstructionId> {
        match &self.operand {
            Operand::Target(target) => vec![*target],
            Operand::Switch(switch) => std::iter::once(switch.default)
                .chain(switch.targets.iter().copied())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = self.label {
            write!(f, "L{label}: ")?;
        }
        write!(f, "{:>5}: ", self.offset)?;
        if self.wide {
            write!(f, "wide ")?;
        }
        write!(f, "{}", self.mnemonic)?;

        match &self.operand {
            Operand::None => Ok(()),
            Operand::Literal(value) => write!(f, " {value}"),
            Operand::Constant(constant) => write!(f, " {constant:?}"),
            Operand::Local(local) => write!(f, " {}", local.slot),
            Operand::Increment { local, delta } => write!(f, " {} {}", local.slot, delta),
            Operand::Target(target) => write!(f, " {target}"),
            Operand::Switch(switch) => {
                write!(f, " {{")?;
                for (position, target) in switch.targets.iter().enumerate() {
                    if let Some(key) = switch.key(position) {
                        write!(f, " {key}: {target},")?;
                    }
                }
                write!(f, " default: {} }}", switch.default)
            }
            Operand::Type(type_ref) => write!(f, " {type_ref}"),
            Operand::MultiArray {
                array_type,
                dimensions,
            } => write!(f, " {array_type} {dimensions}"),
            Operand::PrimitiveType(element) => write!(f, " {element}"),
            Operand::Field(field) => write!(f, " {field}"),
            Operand::Method(method) => write!(f, " {method}"),
            Operand::CallSite(call_site) => {
                write!(f, " #{} {}{}", call_site.bootstrap_index, call_site.name, call_site.descriptor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goto(offset: u32, target: InstructionId) -> Instruction {
        Instruction {
            offset,
            size: 3,
            opcode: crate::disassembler::opcodes::GOTO,
            wide: false,
            mnemonic: "goto",
            flow_type: FlowType::UnconditionalBranch,
            operand: Operand::Target(target),
            label: None,
        }
    }

    #[test]
    fn flow_predicates() {
        let jump = goto(4, InstructionId(0));
        assert!(jump.is_branch());
        assert!(jump.is_terminal());
        assert!(!jump.falls_through());
        assert_eq!(jump.targets(), vec![InstructionId(0)]);
        assert_eq!(jump.end_offset(), 7);

        let nop = Instruction::sentinel(12);
        assert!(!nop.is_terminal());
        assert!(nop.falls_through());
        assert!(nop.targets().is_empty());
    }

    #[test]
    fn switch_keys_and_targets() {
        let table = SwitchInfo {
            kind: SwitchKind::Table { low: -1, high: 1 },
            default: InstructionId(9),
            targets: vec![InstructionId(3), InstructionId(4), InstructionId(5)],
        };
        assert_eq!(table.key(0), Some(-1));
        assert_eq!(table.key(2), Some(1));

        let lookup = SwitchInfo {
            kind: SwitchKind::Lookup { keys: vec![10, 20] },
            default: InstructionId(2),
            targets: vec![InstructionId(1), InstructionId(1)],
        };
        assert_eq!(lookup.key(1), Some(20));
        assert_eq!(lookup.key(2), None);

        let mut instruction = goto(0, InstructionId(0));
        instruction.operand = Operand::Switch(lookup);
        assert_eq!(
            instruction.targets(),
            vec![InstructionId(2), InstructionId(1), InstructionId(1)]
        );
    }

    #[test]
    fn display() {
        let mut jump = goto(10, InstructionId::SENTINEL);
        jump.label = Some(2);
        assert_eq!(jump.to_string(), "L2:    10: goto <end>");
    }
}
