//! The static per-opcode table.
//!
//! [`OPCODES`] maps every opcode byte to its mnemonic, the shape of its operand bytes, its
//! control-flow behavior and, for local variable instructions, how it accesses its slot. The
//! decoder consults the table and nothing else, so supporting a new opcode means adding one row.
//! Reserved bytes keep an empty mnemonic and are rejected during decoding.

use crate::disassembler::{instruction::FlowType, opcodes as op};

/// How an instruction's operand bytes are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandShape {
    /// No operand bytes
    None,
    /// Signed 1-byte literal (`bipush`)
    Byte,
    /// Signed 2-byte literal (`sipush`)
    Short,
    /// 1-byte constant pool index of a loadable constant (`ldc`)
    Constant,
    /// 2-byte constant pool index of a loadable constant (`ldc_w`, `ldc2_w`)
    WideConstant,
    /// 1-byte local slot, 2-byte under `wide`
    Local,
    /// Local slot encoded in the opcode itself (`iload_0` ...)
    ImplicitLocal(u16),
    /// Local slot plus signed literal (`iinc`), both widened under `wide`
    LocalIncrement,
    /// Signed 2-byte branch offset
    Branch,
    /// Signed 4-byte branch offset (`goto_w`, `jsr_w`)
    WideBranch,
    /// Padded `tableswitch` body
    TableSwitch,
    /// Padded `lookupswitch` body
    LookupSwitch,
    /// 2-byte class reference
    Type,
    /// 2-byte class reference plus dimension count (`multianewarray`)
    MultiArray,
    /// 2-byte field reference
    Field,
    /// 2-byte method reference
    Method,
    /// 2-byte interface method reference, argument count and a zero byte
    InterfaceMethod,
    /// 2-byte dynamic call site reference and two zero bytes
    CallSite,
    /// 1-byte primitive array type code (`newarray`)
    PrimitiveType,
    /// The `wide` prefix
    Wide,
}

/// How a local variable instruction uses its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalAccess {
    /// Reads the slot
    Load,
    /// Starts a new value in the slot
    Store,
    /// Reads and writes the slot in place (`iinc`)
    Increment,
}

/// The value family implied by a local variable opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// `int` and its narrower relatives
    Int,
    /// `long`
    Long,
    /// `float`
    Float,
    /// `double`
    Double,
    /// Any reference
    Reference,
    /// A `jsr` return address
    ReturnAddress,
}

impl ValueKind {
    /// Number of slots a value of this kind occupies.
    #[must_use]
    pub fn slot_width(self) -> u16 {
        match self {
            ValueKind::Long | ValueKind::Double => 2,
            _ => 1,
        }
    }
}

/// One row of the opcode table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
    /// Mnemonic, empty for reserved opcodes
    pub mnemonic: &'static str,
    /// Operand layout
    pub shape: OperandShape,
    /// Control-flow behavior
    pub flow: FlowType,
    /// Slot access for local variable instructions
    pub local: Option<(LocalAccess, ValueKind)>,
}

impl OpcodeInfo {
    const RESERVED: OpcodeInfo = OpcodeInfo::simple("");

    const fn simple(mnemonic: &'static str) -> Self {
        OpcodeInfo::op(mnemonic, OperandShape::None, FlowType::Sequential)
    }

    const fn op(mnemonic: &'static str, shape: OperandShape, flow: FlowType) -> Self {
        OpcodeInfo {
            mnemonic,
            shape,
            flow,
            local: None,
        }
    }

    const fn local(
        mnemonic: &'static str,
        shape: OperandShape,
        access: LocalAccess,
        kind: ValueKind,
    ) -> Self {
        OpcodeInfo {
            mnemonic,
            shape,
            flow: FlowType::Sequential,
            local: Some((access, kind)),
        }
    }

    /// `true` for reserved and undefined opcodes.
    #[must_use]
    pub fn is_reserved(&self) -> bool {
        self.mnemonic.is_empty()
    }

    /// `true` if the `wide` prefix may modify this opcode.
    #[must_use]
    pub fn accepts_wide(&self) -> bool {
        matches!(self.shape, OperandShape::Local | OperandShape::LocalIncrement)
    }
}

/// Opcode table indexed by opcode byte.
pub static OPCODES: [OpcodeInfo; 256] = build_table();

#[rustfmt::skip]
const fn build_table() -> [OpcodeInfo; 256] {
    let mut table = [OpcodeInfo::RESERVED; 256];

    table[op::NOP as usize] = OpcodeInfo::simple("nop");
    table[op::ACONST_NULL as usize] = OpcodeInfo::simple("aconst_null");
    table[op::ICONST_M1 as usize] = OpcodeInfo::simple("iconst_m1");
    table[op::ICONST_0 as usize] = OpcodeInfo::simple("iconst_0");
    table[op::ICONST_1 as usize] = OpcodeInfo::simple("iconst_1");
    table[op::ICONST_2 as usize] = OpcodeInfo::simple("iconst_2");
    table[op::ICONST_3 as usize] = OpcodeInfo::simple("iconst_3");
    table[op::ICONST_4 as usize] = OpcodeInfo::simple("iconst_4");
    table[op::ICONST_5 as usize] = OpcodeInfo::simple("iconst_5");
    table[op::LCONST_0 as usize] = OpcodeInfo::simple("lconst_0");
    table[op::LCONST_1 as usize] = OpcodeInfo::simple("lconst_1");
    table[op::FCONST_0 as usize] = OpcodeInfo::simple("fconst_0");
    table[op::FCONST_1 as usize] = OpcodeInfo::simple("fconst_1");
    table[op::FCONST_2 as usize] = OpcodeInfo::simple("fconst_2");
    table[op::DCONST_0 as usize] = OpcodeInfo::simple("dconst_0");
    table[op::DCONST_1 as usize] = OpcodeInfo::simple("dconst_1");
    table[op::BIPUSH as usize] = OpcodeInfo::op("bipush", OperandShape::Byte, FlowType::Sequential);
    table[op::SIPUSH as usize] = OpcodeInfo::op("sipush", OperandShape::Short, FlowType::Sequential);
    table[op::LDC as usize] = OpcodeInfo::op("ldc", OperandShape::Constant, FlowType::Sequential);
    table[op::LDC_W as usize] = OpcodeInfo::op("ldc_w", OperandShape::WideConstant, FlowType::Sequential);
    table[op::LDC2_W as usize] = OpcodeInfo::op("ldc2_w", OperandShape::WideConstant, FlowType::Sequential);
    table[op::ILOAD as usize] = OpcodeInfo::local("iload", OperandShape::Local, LocalAccess::Load, ValueKind::Int);
    table[op::LLOAD as usize] = OpcodeInfo::local("lload", OperandShape::Local, LocalAccess::Load, ValueKind::Long);
    table[op::FLOAD as usize] = OpcodeInfo::local("fload", OperandShape::Local, LocalAccess::Load, ValueKind::Float);
    table[op::DLOAD as usize] = OpcodeInfo::local("dload", OperandShape::Local, LocalAccess::Load, ValueKind::Double);
    table[op::ALOAD as usize] = OpcodeInfo::local("aload", OperandShape::Local, LocalAccess::Load, ValueKind::Reference);
    table[op::ILOAD_0 as usize] = OpcodeInfo::local("iload_0", OperandShape::ImplicitLocal(0), LocalAccess::Load, ValueKind::Int);
    table[op::ILOAD_1 as usize] = OpcodeInfo::local("iload_1", OperandShape::ImplicitLocal(1), LocalAccess::Load, ValueKind::Int);
    table[op::ILOAD_2 as usize] = OpcodeInfo::local("iload_2", OperandShape::ImplicitLocal(2), LocalAccess::Load, ValueKind::Int);
    table[op::ILOAD_3 as usize] = OpcodeInfo::local("iload_3", OperandShape::ImplicitLocal(3), LocalAccess::Load, ValueKind::Int);
    table[op::LLOAD_0 as usize] = OpcodeInfo::local("lload_0", OperandShape::ImplicitLocal(0), LocalAccess::Load, ValueKind::Long);
    table[op::LLOAD_1 as usize] = OpcodeInfo::local("lload_1", OperandShape::ImplicitLocal(1), LocalAccess::Load, ValueKind::Long);
    table[op::LLOAD_2 as usize] = OpcodeInfo::local("lload_2", OperandShape::ImplicitLocal(2), LocalAccess::Load, ValueKind::Long);
    table[op::LLOAD_3 as usize] = OpcodeInfo::local("lload_3", OperandShape::ImplicitLocal(3), LocalAccess::Load, ValueKind::Long);
    table[op::FLOAD_0 as usize] = OpcodeInfo::local("fload_0", OperandShape::ImplicitLocal(0), LocalAccess::Load, ValueKind::Float);
    table[op::FLOAD_1 as usize] = OpcodeInfo::local("fload_1", OperandShape::ImplicitLocal(1), LocalAccess::Load, ValueKind::Float);
    table[op::FLOAD_2 as usize] = OpcodeInfo::local("fload_2", OperandShape::ImplicitLocal(2), LocalAccess::Load, ValueKind::Float);
    table[op::FLOAD_3 as usize] = OpcodeInfo::local("fload_3", OperandShape::ImplicitLocal(3), LocalAccess::Load, ValueKind::Float);
    table[op::DLOAD_0 as usize] = OpcodeInfo::local("dload_0", OperandShape::ImplicitLocal(0), LocalAccess::Load, ValueKind::Double);
    table[op::DLOAD_1 as usize] = OpcodeInfo::local("dload_1", OperandShape::ImplicitLocal(1), LocalAccess::Load, ValueKind::Double);
    table[op::DLOAD_2 as usize] = OpcodeInfo::local("dload_2", OperandShape::ImplicitLocal(2), LocalAccess::Load, ValueKind::Double);
    table[op::DLOAD_3 as usize] = OpcodeInfo::local("dload_3", OperandShape::ImplicitLocal(3), LocalAccess::Load, ValueKind::Double);
    table[op::ALOAD_0 as usize] = OpcodeInfo::local("aload_0", OperandShape::ImplicitLocal(0), LocalAccess::Load, ValueKind::Reference);
    table[op::ALOAD_1 as usize] = OpcodeInfo::local("aload_1", OperandShape::ImplicitLocal(1), LocalAccess::Load, ValueKind::Reference);
    table[op::ALOAD_2 as usize] = OpcodeInfo::local("aload_2", OperandShape::ImplicitLocal(2), LocalAccess::Load, ValueKind::Reference);
    table[op::ALOAD_3 as usize] = OpcodeInfo::local("aload_3", OperandShape::ImplicitLocal(3), LocalAccess::Load, ValueKind::Reference);
    table[op::IALOAD as usize] = OpcodeInfo::simple("iaload");
    table[op::LALOAD as usize] = OpcodeInfo::simple("laload");
    table[op::FALOAD as usize] = OpcodeInfo::simple("faload");
    table[op::DALOAD as usize] = OpcodeInfo::simple("daload");
    table[op::AALOAD as usize] = OpcodeInfo::simple("aaload");
    table[op::BALOAD as usize] = OpcodeInfo::simple("baload");
    table[op::CALOAD as usize] = OpcodeInfo::simple("caload");
    table[op::SALOAD as usize] = OpcodeInfo::simple("saload");
    table[op::ISTORE as usize] = OpcodeInfo::local("istore", OperandShape::Local, LocalAccess::Store, ValueKind::Int);
    table[op::LSTORE as usize] = OpcodeInfo::local("lstore", OperandShape::Local, LocalAccess::Store, ValueKind::Long);
    table[op::FSTORE as usize] = OpcodeInfo::local("fstore", OperandShape::Local, LocalAccess::Store, ValueKind::Float);
    table[op::DSTORE as usize] = OpcodeInfo::local("dstore", OperandShape::Local, LocalAccess::Store, ValueKind::Double);
    table[op::ASTORE as usize] = OpcodeInfo::local("astore", OperandShape::Local, LocalAccess::Store, ValueKind::Reference);
    table[op::ISTORE_0 as usize] = OpcodeInfo::local("istore_0", OperandShape::ImplicitLocal(0), LocalAccess::Store, ValueKind::Int);
    table[op::ISTORE_1 as usize] = OpcodeInfo::local("istore_1", OperandShape::ImplicitLocal(1), LocalAccess::Store, ValueKind::Int);
    table[op::ISTORE_2 as usize] = OpcodeInfo::local("istore_2", OperandShape::ImplicitLocal(2), LocalAccess::Store, ValueKind::Int);
    table[op::ISTORE_3 as usize] = OpcodeInfo::local("istore_3", OperandShape::ImplicitLocal(3), LocalAccess::Store, ValueKind::Int);
    table[op::LSTORE_0 as usize] = OpcodeInfo::local("lstore_0", OperandShape::ImplicitLocal(0), LocalAccess::Store, ValueKind::Long);
    table[op::LSTORE_1 as usize] = OpcodeInfo::local("lstore_1", OperandShape::ImplicitLocal(1), LocalAccess::Store, ValueKind::Long);
    table[op::LSTORE_2 as usize] = OpcodeInfo::local("lstore_2", OperandShape::ImplicitLocal(2), LocalAccess::Store, ValueKind::Long);
    table[op::LSTORE_3 as usize] = OpcodeInfo::local("lstore_3", OperandShape::ImplicitLocal(3), LocalAccess::Store, ValueKind::Long);
    table[op::FSTORE_0 as usize] = OpcodeInfo::local("fstore_0", OperandShape::ImplicitLocal(0), LocalAccess::Store, ValueKind::Float);
    table[op::FSTORE_1 as usize] = OpcodeInfo::local("fstore_1", OperandShape::ImplicitLocal(1), LocalAccess::Store, ValueKind::Float);
    table[op::FSTORE_2 as usize] = OpcodeInfo::local("fstore_2", OperandShape::ImplicitLocal(2), LocalAccess::Store, ValueKind::Float);
    table[op::FSTORE_3 as usize] = OpcodeInfo::local("fstore_3", OperandShape::ImplicitLocal(3), LocalAccess::Store, ValueKind::Float);
    table[op::DSTORE_0 as usize] = OpcodeInfo::local("dstore_0", OperandShape::ImplicitLocal(0), LocalAccess::Store, ValueKind::Double);
    table[op::DSTORE_1 as usize] = OpcodeInfo::local("dstore_1", OperandShape::ImplicitLocal(1), LocalAccess::Store, ValueKind::Double);
    table[op::DSTORE_2 as usize] = OpcodeInfo::local("dstore_2", OperandShape::ImplicitLocal(2), LocalAccess::Store, ValueKind::Double);
    table[op::DSTORE_3 as usize] = OpcodeInfo::local("dstore_3", OperandShape::ImplicitLocal(3), LocalAccess::Store, ValueKind::Double);
    table[op::ASTORE_0 as usize] = OpcodeInfo::local("astore_0", OperandShape::ImplicitLocal(0), LocalAccess::Store, ValueKind::Reference);
    table[op::ASTORE_1 as usize] = OpcodeInfo::local("astore_1", OperandShape::ImplicitLocal(1), LocalAccess::Store, ValueKind::Reference);
    table[op::ASTORE_2 as usize] = OpcodeInfo::local("astore_2", OperandShape::ImplicitLocal(2), LocalAccess::Store, ValueKind::Reference);
    table[op::ASTORE_3 as usize] = OpcodeInfo::local("astore_3", OperandShape::ImplicitLocal(3), LocalAccess::Store, ValueKind::Reference);
    table[op::IASTORE as usize] = OpcodeInfo::simple("iastore");
    table[op::LASTORE as usize] = OpcodeInfo::simple("lastore");
    table[op::FASTORE as usize] = OpcodeInfo::simple("fastore");
    table[op::DASTORE as usize] = OpcodeInfo::simple("dastore");
    table[op::AASTORE as usize] = OpcodeInfo::simple("aastore");
    table[op::BASTORE as usize] = OpcodeInfo::simple("bastore");
    table[op::CASTORE as usize] = OpcodeInfo::simple("castore");
    table[op::SASTORE as usize] = OpcodeInfo::simple("sastore");
    table[op::POP as usize] = OpcodeInfo::simple("pop");
    table[op::POP2 as usize] = OpcodeInfo::simple("pop2");
    table[op::DUP as usize] = OpcodeInfo::simple("dup");
    table[op::DUP_X1 as usize] = OpcodeInfo::simple("dup_x1");
    table[op::DUP_X2 as usize] = OpcodeInfo::simple("dup_x2");
    table[op::DUP2 as usize] = OpcodeInfo::simple("dup2");
    table[op::DUP2_X1 as usize] = OpcodeInfo::simple("dup2_x1");
    table[op::DUP2_X2 as usize] = OpcodeInfo::simple("dup2_x2");
    table[op::SWAP as usize] = OpcodeInfo::simple("swap");
    table[op::IADD as usize] = OpcodeInfo::simple("iadd");
    table[op::LADD as usize] = OpcodeInfo::simple("ladd");
    table[op::FADD as usize] = OpcodeInfo::simple("fadd");
    table[op::DADD as usize] = OpcodeInfo::simple("dadd");
    table[op::ISUB as usize] = OpcodeInfo::simple("isub");
    table[op::LSUB as usize] = OpcodeInfo::simple("lsub");
    table[op::FSUB as usize] = OpcodeInfo::simple("fsub");
    table[op::DSUB as usize] = OpcodeInfo::simple("dsub");
    table[op::IMUL as usize] = OpcodeInfo::simple("imul");
    table[op::LMUL as usize] = OpcodeInfo::simple("lmul");
    table[op::FMUL as usize] = OpcodeInfo::simple("fmul");
    table[op::DMUL as usize] = OpcodeInfo::simple("dmul");
    table[op::IDIV as usize] = OpcodeInfo::simple("idiv");
    table[op::LDIV as usize] = OpcodeInfo::simple("ldiv");
    table[op::FDIV as usize] = OpcodeInfo::simple("fdiv");
    table[op::DDIV as usize] = OpcodeInfo::simple("ddiv");
    table[op::IREM as usize] = OpcodeInfo::simple("irem");
    table[op::LREM as usize] = OpcodeInfo::simple("lrem");
    table[op::FREM as usize] = OpcodeInfo::simple("frem");
    table[op::DREM as usize] = OpcodeInfo::simple("drem");
    table[op::INEG as usize] = OpcodeInfo::simple("ineg");
    table[op::LNEG as usize] = OpcodeInfo::simple("lneg");
    table[op::FNEG as usize] = OpcodeInfo::simple("fneg");
    table[op::DNEG as usize] = OpcodeInfo::simple("dneg");
    table[op::ISHL as usize] = OpcodeInfo::simple("ishl");
    table[op::LSHL as usize] = OpcodeInfo::simple("lshl");
    table[op::ISHR as usize] = OpcodeInfo::simple("ishr");
    table[op::LSHR as usize] = OpcodeInfo::simple("lshr");
    table[op::IUSHR as usize] = OpcodeInfo::simple("iushr");
    table[op::LUSHR as usize] = OpcodeInfo::simple("lushr");
    table[op::IAND as usize] = OpcodeInfo::simple("iand");
    table[op::LAND as usize] = OpcodeInfo::simple("land");
    table[op::IOR as usize] = OpcodeInfo::simple("ior");
    table[op::LOR as usize] = OpcodeInfo::simple("lor");
    table[op::IXOR as usize] = OpcodeInfo::simple("ixor");
    table[op::LXOR as usize] = OpcodeInfo::simple("lxor");
    table[op::IINC as usize] = OpcodeInfo::local("iinc", OperandShape::LocalIncrement, LocalAccess::Increment, ValueKind::Int);
    table[op::I2L as usize] = OpcodeInfo::simple("i2l");
    table[op::I2F as usize] = OpcodeInfo::simple("i2f");
    table[op::I2D as usize] = OpcodeInfo::simple("i2d");
    table[op::L2I as usize] = OpcodeInfo::simple("l2i");
    table[op::L2F as usize] = OpcodeInfo::simple("l2f");
    table[op::L2D as usize] = OpcodeInfo::simple("l2d");
    table[op::F2I as usize] = OpcodeInfo::simple("f2i");
    table[op::F2L as usize] = OpcodeInfo::simple("f2l");
    table[op::F2D as usize] = OpcodeInfo::simple("f2d");
    table[op::D2I as usize] = OpcodeInfo::simple("d2i");
    table[op::D2L as usize] = OpcodeInfo::simple("d2l");
    table[op::D2F as usize] = OpcodeInfo::simple("d2f");
    table[op::I2B as usize] = OpcodeInfo::simple("i2b");
    table[op::I2C as usize] = OpcodeInfo::simple("i2c");
    table[op::I2S as usize] = OpcodeInfo::simple("i2s");
    table[op::LCMP as usize] = OpcodeInfo::simple("lcmp");
    table[op::FCMPL as usize] = OpcodeInfo::simple("fcmpl");
    table[op::FCMPG as usize] = OpcodeInfo::simple("fcmpg");
    table[op::DCMPL as usize] = OpcodeInfo::simple("dcmpl");
    table[op::DCMPG as usize] = OpcodeInfo::simple("dcmpg");
    table[op::IFEQ as usize] = OpcodeInfo::op("ifeq", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IFNE as usize] = OpcodeInfo::op("ifne", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IFLT as usize] = OpcodeInfo::op("iflt", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IFGE as usize] = OpcodeInfo::op("ifge", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IFGT as usize] = OpcodeInfo::op("ifgt", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IFLE as usize] = OpcodeInfo::op("ifle", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IF_ICMPEQ as usize] = OpcodeInfo::op("if_icmpeq", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IF_ICMPNE as usize] = OpcodeInfo::op("if_icmpne", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IF_ICMPLT as usize] = OpcodeInfo::op("if_icmplt", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IF_ICMPGE as usize] = OpcodeInfo::op("if_icmpge", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IF_ICMPGT as usize] = OpcodeInfo::op("if_icmpgt", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IF_ICMPLE as usize] = OpcodeInfo::op("if_icmple", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IF_ACMPEQ as usize] = OpcodeInfo::op("if_acmpeq", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IF_ACMPNE as usize] = OpcodeInfo::op("if_acmpne", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::GOTO as usize] = OpcodeInfo::op("goto", OperandShape::Branch, FlowType::UnconditionalBranch);
    table[op::JSR as usize] = OpcodeInfo::op("jsr", OperandShape::Branch, FlowType::Subroutine);
    table[op::RET as usize] = OpcodeInfo {
        local: Some((LocalAccess::Load, ValueKind::ReturnAddress)),
        ..OpcodeInfo::op("ret", OperandShape::Local, FlowType::SubroutineReturn)
    };
    table[op::TABLESWITCH as usize] = OpcodeInfo::op("tableswitch", OperandShape::TableSwitch, FlowType::Switch);
    table[op::LOOKUPSWITCH as usize] = OpcodeInfo::op("lookupswitch", OperandShape::LookupSwitch, FlowType::Switch);
    table[op::IRETURN as usize] = OpcodeInfo::op("ireturn", OperandShape::None, FlowType::Return);
    table[op::LRETURN as usize] = OpcodeInfo::op("lreturn", OperandShape::None, FlowType::Return);
    table[op::FRETURN as usize] = OpcodeInfo::op("freturn", OperandShape::None, FlowType::Return);
    table[op::DRETURN as usize] = OpcodeInfo::op("dreturn", OperandShape::None, FlowType::Return);
    table[op::ARETURN as usize] = OpcodeInfo::op("areturn", OperandShape::None, FlowType::Return);
    table[op::RETURN as usize] = OpcodeInfo::op("return", OperandShape::None, FlowType::Return);
    table[op::GETSTATIC as usize] = OpcodeInfo::op("getstatic", OperandShape::Field, FlowType::Sequential);
    table[op::PUTSTATIC as usize] = OpcodeInfo::op("putstatic", OperandShape::Field, FlowType::Sequential);
    table[op::GETFIELD as usize] = OpcodeInfo::op("getfield", OperandShape::Field, FlowType::Sequential);
    table[op::PUTFIELD as usize] = OpcodeInfo::op("putfield", OperandShape::Field, FlowType::Sequential);
    table[op::INVOKEVIRTUAL as usize] = OpcodeInfo::op("invokevirtual", OperandShape::Method, FlowType::Sequential);
    table[op::INVOKESPECIAL as usize] = OpcodeInfo::op("invokespecial", OperandShape::Method, FlowType::Sequential);
    table[op::INVOKESTATIC as usize] = OpcodeInfo::op("invokestatic", OperandShape::Method, FlowType::Sequential);
    table[op::INVOKEINTERFACE as usize] = OpcodeInfo::op("invokeinterface", OperandShape::InterfaceMethod, FlowType::Sequential);
    table[op::INVOKEDYNAMIC as usize] = OpcodeInfo::op("invokedynamic", OperandShape::CallSite, FlowType::Sequential);
    table[op::NEW as usize] = OpcodeInfo::op("new", OperandShape::Type, FlowType::Sequential);
    table[op::NEWARRAY as usize] = OpcodeInfo::op("newarray", OperandShape::PrimitiveType, FlowType::Sequential);
    table[op::ANEWARRAY as usize] = OpcodeInfo::op("anewarray", OperandShape::Type, FlowType::Sequential);
    table[op::ARRAYLENGTH as usize] = OpcodeInfo::simple("arraylength");
    table[op::ATHROW as usize] = OpcodeInfo::op("athrow", OperandShape::None, FlowType::Throw);
    table[op::CHECKCAST as usize] = OpcodeInfo::op("checkcast", OperandShape::Type, FlowType::Sequential);
    table[op::INSTANCEOF as usize] = OpcodeInfo::op("instanceof", OperandShape::Type, FlowType::Sequential);
    table[op::MONITORENTER as usize] = OpcodeInfo::simple("monitorenter");
    table[op::MONITOREXIT as usize] = OpcodeInfo::simple("monitorexit");
    table[op::WIDE as usize] = OpcodeInfo::op("wide", OperandShape::Wide, FlowType::Sequential);
    table[op::MULTIANEWARRAY as usize] = OpcodeInfo::op("multianewarray", OperandShape::MultiArray, FlowType::Sequential);
    table[op::IFNULL as usize] = OpcodeInfo::op("ifnull", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::IFNONNULL as usize] = OpcodeInfo::op("ifnonnull", OperandShape::Branch, FlowType::ConditionalBranch);
    table[op::GOTO_W as usize] = OpcodeInfo::op("goto_w", OperandShape::WideBranch, FlowType::UnconditionalBranch);
    table[op::JSR_W as usize] = OpcodeInfo::op("jsr_w", OperandShape::WideBranch, FlowType::Subroutine);

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defined_opcodes() {
        let defined = OPCODES.iter().filter(|info| !info.is_reserved()).count();
        assert_eq!(defined, 202);
        assert!(OPCODES[op::BREAKPOINT as usize].is_reserved());
        assert!(OPCODES[op::IMPDEP2 as usize].is_reserved());
    }

    #[test]
    fn local_rows() {
        let info = OPCODES[op::DSTORE_2 as usize];
        assert_eq!(info.mnemonic, "dstore_2");
        assert_eq!(info.shape, OperandShape::ImplicitLocal(2));
        assert_eq!(info.local, Some((LocalAccess::Store, ValueKind::Double)));

        let info = OPCODES[op::IINC as usize];
        assert!(info.accepts_wide());
        assert_eq!(info.local, Some((LocalAccess::Increment, ValueKind::Int)));

        let info = OPCODES[op::RET as usize];
        assert_eq!(info.flow, FlowType::SubroutineReturn);
        assert!(info.accepts_wide());
        assert!(!OPCODES[op::ILOAD_0 as usize].accepts_wide());
    }

    #[test]
    fn flow_rows() {
        assert_eq!(OPCODES[op::IF_ACMPNE as usize].flow, FlowType::ConditionalBranch);
        assert_eq!(OPCODES[op::GOTO_W as usize].shape, OperandShape::WideBranch);
        assert_eq!(OPCODES[op::JSR as usize].flow, FlowType::Subroutine);
        assert_eq!(OPCODES[op::LOOKUPSWITCH as usize].flow, FlowType::Switch);
        assert_eq!(OPCODES[op::ARETURN as usize].flow, FlowType::Return);
        assert_eq!(OPCODES[op::ATHROW as usize].flow, FlowType::Throw);
        assert_eq!(OPCODES[op::INVOKEINTERFACE as usize].shape, OperandShape::InterfaceMethod);
    }

    #[test]
    fn value_kind_widths() {
        assert_eq!(ValueKind::Long.slot_width(), 2);
        assert_eq!(ValueKind::Reference.slot_width(), 1);
    }
}
