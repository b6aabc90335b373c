//! Local variable binding.
//!
//! Every load, store, increment and `ret` operand of a decoded body is bound to a
//! [`VariableDefinition`]. The table starts with `this` (for instance methods) and the
//! parameters, all live for the whole method, and is then merged with the
//! `LocalVariableTable`: rows naming a parameter slot at offset 0 refine that parameter, all
//! other rows become locals. Rows of the `LocalVariableTypeTable` supply generic types.
//!
//! Binding runs twice. The first pass resolves each operand in code order against the table
//! as it stands, creating an inferred variable when nothing matches; the second pass resolves
//! every operand again against the finished table.
//!
//! A store starts a new value, so it is resolved at the offset *after* the instruction. This
//! matches how compilers emit variable ranges: the range of a variable first written by
//! `istore_1` at offset 3 starts at offset 4.

use std::fmt;

use log::warn;

use crate::{
    config::LoaderConfig,
    disassembler::{
        instruction::{Instruction, LocalBinding, LocalOperand},
        table::{LocalAccess, ValueKind},
    },
    metadata::{
        code::{CodeBlock, LocalVariableEntry},
        descriptor::JvmType,
        method::MethodDefinition,
        resolver::{GenericOwner, ResolvedType, ResolverFrame},
        signature::TypeSignature,
        types::TypeId,
    },
};

/// Index of a variable within its method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VariableId(pub usize);

impl VariableId {
    /// Returns the index into the variable table.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Where a variable comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// The receiver of an instance method
    This,
    /// A formal parameter, by position in the descriptor
    Parameter(usize),
    /// A local declared in the body or inferred from its use
    Local,
}

/// The type of a variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VariableType {
    /// Declared by the method signature or the local variable tables
    Declared(ResolvedType),
    /// Implied by the instructions using the slot
    Inferred(ValueKind),
}

impl VariableType {
    /// Number of slots the variable occupies.
    #[must_use]
    pub fn slot_width(&self) -> u16 {
        match self {
            VariableType::Declared(resolved) => {
                if resolved.is_wide() {
                    2
                } else {
                    1
                }
            }
            VariableType::Inferred(kind) => kind.slot_width(),
        }
    }

    /// The value family of the type.
    #[must_use]
    pub fn value_kind(&self) -> ValueKind {
        match self {
            VariableType::Declared(ResolvedType::Primitive(primitive)) => match primitive {
                JvmType::Long => ValueKind::Long,
                JvmType::Float => ValueKind::Float,
                JvmType::Double => ValueKind::Double,
                _ => ValueKind::Int,
            },
            VariableType::Declared(_) => ValueKind::Reference,
            VariableType::Inferred(kind) => *kind,
        }
    }
}

/// A local variable of a method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDefinition {
    /// Position in the table
    pub id: VariableId,
    /// First slot
    pub slot: u16,
    /// Source name, when known
    pub name: Option<String>,
    /// Declared or inferred type
    pub variable_type: VariableType,
    /// First offset at which the variable is live
    pub start: u32,
    /// Exclusive end of the live range
    pub end: u32,
    /// Name, type and range come from the local variable tables
    pub from_metadata: bool,
    /// Origin
    pub kind: VariableKind,
}

impl VariableDefinition {
    /// `true` if `offset` lies in `[start, end)`.
    #[must_use]
    pub fn covers(&self, offset: u32) -> bool {
        self.start <= offset && offset < self.end
    }

    /// `true` if a value of `kind` may live in this variable.
    ///
    /// `astore` writes a return address with reference kind, so a reference variable also
    /// accepts the `ret` that reads it back.
    #[must_use]
    pub fn accepts(&self, kind: ValueKind) -> bool {
        let own = self.variable_type.value_kind();
        own == kind || (own == ValueKind::Reference && kind == ValueKind::ReturnAddress)
    }
}

impl fmt::Display for VariableDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name}")?,
            None => write!(f, "var{}", self.id.0)?,
        }
        write!(f, " (slot {}, [{}, {}))", self.slot, self.start, self.end)
    }
}

/// Builds the variable table of one body and binds its operands.
struct VariableBinder {
    variables: Vec<VariableDefinition>,
    max_locals: u16,
    code_length: u32,
}

impl VariableBinder {
    fn new(max_locals: u16, code_length: u32) -> Self {
        VariableBinder {
            variables: Vec::new(),
            max_locals,
            code_length,
        }
    }

    fn push(
        &mut self,
        slot: u16,
        name: Option<String>,
        variable_type: VariableType,
        start: u32,
        kind: VariableKind,
    ) -> LocalBinding {
        let id = VariableId(self.variables.len());
        self.variables.push(VariableDefinition {
            id,
            slot,
            name,
            variable_type,
            start,
            end: self.code_length,
            from_metadata: false,
            kind,
        });
        LocalBinding::Bound(id)
    }

    /// `this` and the parameters, live for the whole method.
    fn declare_signature(&mut self, method: &MethodDefinition) {
        if !method.is_static() {
            self.push(
                0,
                Some("this".to_string()),
                VariableType::Declared(ResolvedType::Local {
                    id: TypeId::SELF,
                    arguments: Vec::new(),
                }),
                0,
                VariableKind::This,
            );
        }

        for parameter in &method.parameters {
            self.push(
                parameter.slot,
                parameter.name.clone(),
                VariableType::Declared(parameter.parameter_type.clone()),
                0,
                VariableKind::Parameter(parameter.index),
            );
        }
    }

    /// Merges the local variable tables into the declared variables.
    fn merge_tables(&mut self, method: &MethodDefinition, code: &CodeBlock, config: &LoaderConfig) {
        if code.local_variables.is_empty() {
            return;
        }

        let frame = method_frame(method);
        for entry in &code.local_variables {
            let Some(variable_type) = entry_type(&frame, entry, &code.local_variable_types) else {
                continue;
            };

            let existing = self.variables.iter_mut().find(|variable| {
                !variable.from_metadata
                    && variable.kind != VariableKind::Local
                    && variable.slot == entry.slot
                    && entry.start_pc == 0
            });

            match existing {
                Some(variable) => {
                    let keep_name = match variable.kind {
                        VariableKind::Parameter(_) => {
                            variable.name.is_some() || !config.infer_parameter_names
                        }
                        _ => false,
                    };
                    if !keep_name {
                        variable.name = Some(entry.name.clone());
                    }
                    variable.variable_type = variable_type;
                    variable.start = u32::from(entry.start_pc);
                    variable.end = entry.end_pc();
                    variable.from_metadata = true;
                }
                None => {
                    let id = VariableId(self.variables.len());
                    self.variables.push(VariableDefinition {
                        id,
                        slot: entry.slot,
                        name: Some(entry.name.clone()),
                        variable_type,
                        start: u32::from(entry.start_pc),
                        end: entry.end_pc(),
                        from_metadata: true,
                        kind: VariableKind::Local,
                    });
                }
            }
        }
    }

    /// Finds the variable `operand` refers to at `offset`.
    ///
    /// Table rows win over everything else; otherwise the most recently started variable of a
    /// matching kind whose range covers the offset is chosen.
    fn find(&self, operand: &LocalOperand, offset: u32) -> Option<LocalBinding> {
        let nearest = |from_metadata: bool| {
            self.variables
                .iter()
                .filter(|variable| {
                    variable.from_metadata == from_metadata
                        && variable.slot == operand.slot
                        && variable.covers(offset)
                        && (from_metadata || variable.accepts(operand.kind))
                })
                .max_by_key(|variable| (variable.start, variable.id))
                .map(|variable| LocalBinding::Bound(variable.id))
        };

        nearest(true).or_else(|| nearest(false))
    }

    fn in_range(&self, operand: &LocalOperand) -> bool {
        u32::from(operand.slot) + u32::from(operand.kind.slot_width()) <= u32::from(self.max_locals)
    }

    /// First pass: binds in code order, creating inferred variables as needed.
    fn bind(&mut self, instructions: &mut [Instruction]) {
        for instruction in instructions.iter_mut() {
            let offset = effective_offset(instruction);
            let location = instruction.offset;
            let Some(operand) = instruction.operand.local_mut() else {
                continue;
            };

            if !self.in_range(operand) {
                warn!(
                    "Local slot {} at offset {} is outside max_locals {}",
                    operand.slot, location, self.max_locals
                );
                operand.binding = LocalBinding::OutOfRange;
                continue;
            }

            operand.binding = match self.find(operand, offset) {
                Some(binding) => binding,
                None => self.push(
                    operand.slot,
                    None,
                    VariableType::Inferred(operand.kind),
                    offset,
                    VariableKind::Local,
                ),
            };
        }
    }

    /// Second pass: binds every operand again against the finished table.
    fn rebind(&self, instructions: &mut [Instruction]) {
        for instruction in instructions.iter_mut() {
            let offset = effective_offset(instruction);
            let Some(operand) = instruction.operand.local_mut() else {
                continue;
            };
            if operand.binding == LocalBinding::OutOfRange {
                continue;
            }

            if let Some(binding) = self.find(operand, offset) {
                operand.binding = binding;
            }
        }
    }
}

/// The offset at which a local operand is resolved: after the instruction for stores.
fn effective_offset(instruction: &Instruction) -> u32 {
    match instruction.operand.local() {
        Some(operand) if operand.access == LocalAccess::Store => instruction.end_offset(),
        _ => instruction.offset,
    }
}

/// A frame resolving the owner's types and the class and method type parameters in scope.
fn method_frame(method: &MethodDefinition) -> ResolverFrame {
    let context = &method.context;
    let mut frame = ResolverFrame::new();
    for (index, name) in context.type_names.iter().enumerate() {
        frame.intern_type(name, TypeId(index));
    }

    frame.push_scope(GenericOwner::Type(TypeId::SELF), &context.type_parameters);
    let method_parameters = method
        .signature
        .as_ref()
        .map_or(&[][..], |signature| &signature.type_parameters[..]);
    frame.push_scope(GenericOwner::Method(method.index), method_parameters);
    frame
}

/// Resolves the type of a table row, preferring the matching type-table row.
fn entry_type(
    frame: &ResolverFrame,
    entry: &LocalVariableEntry,
    type_rows: &[LocalVariableEntry],
) -> Option<VariableType> {
    let generic = type_rows
        .iter()
        .find(|row| {
            row.slot == entry.slot && row.start_pc == entry.start_pc && row.length == entry.length
        })
        .and_then(|row| match TypeSignature::parse_field(&row.descriptor) {
            Ok(signature) => Some(frame.resolve(&signature)),
            Err(error) => {
                warn!(
                    "Ignoring malformed signature '{}' of local '{}': {}",
                    row.descriptor, row.name, error
                );
                None
            }
        });
    if let Some(resolved) = generic {
        return Some(VariableType::Declared(resolved));
    }

    match JvmType::parse(&entry.descriptor) {
        Ok(descriptor) => Some(VariableType::Declared(frame.resolve_descriptor(&descriptor))),
        Err(error) => {
            warn!(
                "Ignoring local '{}' with malformed descriptor '{}': {}",
                entry.name, entry.descriptor, error
            );
            None
        }
    }
}

/// Builds the variable table of `method` and binds every local operand of `instructions`.
pub(crate) fn bind_variables(
    method: &MethodDefinition,
    code: &CodeBlock,
    instructions: &mut [Instruction],
) -> Vec<VariableDefinition> {
    // Code length is bounded by the loader configuration, far below u32::MAX
    let code_length = u32::try_from(code.code_length).unwrap_or(u32::MAX);

    let mut binder = VariableBinder::new(code.max_locals, code_length);
    binder.declare_signature(method);
    binder.merge_tables(method, code, &method.context.config);
    binder.bind(instructions);
    binder.rebind(instructions);
    binder.variables
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        disassembler::{
            instruction::{FlowType, Operand},
            MethodBody,
        },
        test::{ClassFileBuilder, CodeBuilder},
        ClassFile,
    };

    fn local(offset: u32, size: u32, slot: u16, access: LocalAccess, kind: ValueKind) -> Instruction {
        Instruction {
            offset,
            size,
            opcode: 0,
            wide: false,
            mnemonic: "local",
            flow_type: FlowType::Sequential,
            operand: Operand::Local(LocalOperand::new(slot, access, kind)),
            label: None,
        }
    }

    fn binding(instruction: &Instruction) -> LocalBinding {
        instruction.operand.local().map(|l| l.binding).unwrap()
    }

    #[test]
    fn store_binds_after_instruction() {
        let mut binder = VariableBinder::new(4, 20);
        binder.variables.push(VariableDefinition {
            id: VariableId(0),
            slot: 1,
            name: Some("count".to_string()),
            variable_type: VariableType::Declared(ResolvedType::Primitive(JvmType::Int)),
            start: 2,
            end: 20,
            from_metadata: true,
            kind: VariableKind::Local,
        });

        let mut instructions = vec![
            local(1, 1, 1, LocalAccess::Store, ValueKind::Int),
            local(2, 1, 1, LocalAccess::Load, ValueKind::Int),
        ];
        binder.bind(&mut instructions);

        assert_eq!(binding(&instructions[0]), LocalBinding::Bound(VariableId(0)));
        assert_eq!(binding(&instructions[1]), LocalBinding::Bound(VariableId(0)));
        assert_eq!(binder.variables.len(), 1);
    }

    #[test]
    fn infers_variables_by_kind() {
        let mut binder = VariableBinder::new(3, 10);
        let mut instructions = vec![
            local(0, 1, 1, LocalAccess::Store, ValueKind::Long),
            local(1, 1, 1, LocalAccess::Load, ValueKind::Long),
            local(2, 1, 1, LocalAccess::Store, ValueKind::Reference),
            local(3, 1, 1, LocalAccess::Load, ValueKind::Reference),
        ];
        binder.bind(&mut instructions);
        binder.rebind(&mut instructions);

        assert_eq!(binder.variables.len(), 2);
        assert_eq!(binder.variables[0].variable_type, VariableType::Inferred(ValueKind::Long));
        assert_eq!(binder.variables[0].start, 1);
        assert_eq!(binder.variables[1].variable_type, VariableType::Inferred(ValueKind::Reference));
        assert_eq!(binding(&instructions[1]), LocalBinding::Bound(VariableId(0)));
        assert_eq!(binding(&instructions[3]), LocalBinding::Bound(VariableId(1)));
    }

    #[test]
    fn out_of_range_slot() {
        let mut binder = VariableBinder::new(2, 10);
        let mut instructions = vec![
            local(0, 2, 5, LocalAccess::Load, ValueKind::Int),
            local(2, 1, 1, LocalAccess::Store, ValueKind::Double),
            local(3, 1, 1, LocalAccess::Store, ValueKind::Int),
        ];
        binder.bind(&mut instructions);

        assert_eq!(binding(&instructions[0]), LocalBinding::OutOfRange);
        assert_eq!(binding(&instructions[1]), LocalBinding::OutOfRange);
        assert!(matches!(binding(&instructions[2]), LocalBinding::Bound(_)));
        assert_eq!(binder.variables.len(), 1);
    }

    #[test]
    fn ret_reads_the_stored_return_address() {
        let mut binder = VariableBinder::new(2, 10);
        let mut instructions = vec![
            local(0, 1, 1, LocalAccess::Store, ValueKind::Reference),
            local(1, 2, 1, LocalAccess::Load, ValueKind::ReturnAddress),
        ];
        binder.bind(&mut instructions);
        binder.rebind(&mut instructions);

        assert_eq!(binder.variables.len(), 1);
        assert_eq!(binding(&instructions[0]), LocalBinding::Bound(VariableId(0)));
        assert_eq!(binding(&instructions[1]), LocalBinding::Bound(VariableId(0)));
        assert!(binder.variables[0].accepts(ValueKind::ReturnAddress));
        assert!(!binder.variables[0].accepts(ValueKind::Int));
    }

    fn load_body(builder: &mut ClassFileBuilder, config: LoaderConfig, name: &str, descriptor: &str) -> Arc<MethodBody> {
        let class = ClassFile::from_mem_with_config(builder.build(), config).unwrap();
        let method = class.method(name, descriptor).unwrap();
        method.body().unwrap().unwrap()
    }

    #[test]
    fn table_rows_name_parameters_and_locals() {
        // 0: iload_0; 1: istore_1; 2: iload_1; 3: ireturn
        let code = CodeBuilder::new(&[0x1A, 0x3C, 0x1B, 0xAC])
            .local(0, 4, "n", "I", 0)
            .local(2, 2, "x", "I", 1)
            .line(0, 12);
        let mut builder = ClassFileBuilder::new("a/Vars");
        builder.static_method("twice", "(I)I", &code);
        let class = ClassFile::from_mem(builder.build()).unwrap();
        let method = class.method("twice", "(I)I").unwrap();
        assert_eq!(method.code().unwrap().unwrap().line_number(3), Some(12));
        let body = method.body().unwrap().unwrap();

        assert_eq!(body.variables.len(), 2);
        let n = &body.variables[0];
        assert_eq!(n.kind, VariableKind::Parameter(0));
        assert_eq!(n.name.as_deref(), Some("n"));
        assert!(n.from_metadata);
        assert_eq!((n.start, n.end), (0, 4));

        let x = &body.variables[1];
        assert_eq!(x.kind, VariableKind::Local);
        assert_eq!(x.name.as_deref(), Some("x"));
        assert!(x.from_metadata);
        assert_eq!((x.start, x.end), (2, 4));
        assert_eq!(
            x.variable_type,
            VariableType::Declared(ResolvedType::Primitive(JvmType::Int))
        );

        // the store at 1 takes effect at 2, where x begins
        assert_eq!(binding(&body.instructions[1]), LocalBinding::Bound(x.id));
        assert_eq!(binding(&body.instructions[2]), LocalBinding::Bound(x.id));
        assert_eq!(binding(&body.instructions[0]), LocalBinding::Bound(n.id));
    }

    #[test]
    fn type_table_supplies_generic_types() {
        // 0: aconst_null; 1: astore_1; 2: aload_1; 3: pop; 4: return
        let code = CodeBuilder::new(&[0x01, 0x4C, 0x2B, 0x57, 0xB1])
            .local(0, 5, "this", "La/Holder;", 0)
            .local(2, 3, "items", "Ljava/util/List;", 1)
            .local_type(2, 3, "items", "Ljava/util/List<Ljava/lang/String;>;", 1);
        let mut builder = ClassFileBuilder::new("a/Holder");
        let code = builder.code_attribute(&code);
        builder.method(0x0001, "fill", "()V", vec![code]);
        let body = load_body(&mut builder, LoaderConfig::default(), "fill", "()V");

        assert_eq!(body.variables[0].kind, VariableKind::This);
        assert!(body.variables[0].from_metadata);

        let items = body.variables.iter().find(|v| v.slot == 1).unwrap();
        assert_eq!(items.name.as_deref(), Some("items"));
        match &items.variable_type {
            VariableType::Declared(ResolvedType::External { name, arguments }) => {
                assert_eq!(name, "java/util/List");
                assert_eq!(arguments.len(), 1);
            }
            other => panic!("unexpected type {other:?}"),
        }
        assert_eq!(binding(&body.instructions[2]), LocalBinding::Bound(items.id));
    }

    #[test]
    fn parameter_names_not_inferred_when_disabled() {
        let code = CodeBuilder::new(&[0x1A, 0xAC]).local(0, 2, "n", "I", 0);
        let mut builder = ClassFileBuilder::new("a/Vars");
        builder.static_method("same", "(I)I", &code);
        let config = LoaderConfig {
            infer_parameter_names: false,
            ..LoaderConfig::default()
        };
        let body = load_body(&mut builder, config, "same", "(I)I");

        assert_eq!(body.variables.len(), 1);
        assert_eq!(body.variables[0].name, None);
        assert!(body.variables[0].from_metadata);
    }

    #[test]
    fn variable_type_kinds() {
        let long = VariableType::Declared(ResolvedType::Primitive(JvmType::Long));
        assert_eq!(long.slot_width(), 2);
        assert_eq!(long.value_kind(), ValueKind::Long);

        let boolean = VariableType::Declared(ResolvedType::Primitive(JvmType::Boolean));
        assert_eq!(boolean.value_kind(), ValueKind::Int);

        let array = VariableType::Declared(ResolvedType::Array(Box::new(
            ResolvedType::Primitive(JvmType::Int),
        )));
        assert_eq!(array.value_kind(), ValueKind::Reference);
        assert_eq!(array.slot_width(), 1);
    }
}
