//! # cafescope Prelude
//!
//! Re-exports of the types most programs need, for convenient glob imports.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cafescope operations
pub use crate::Error;

/// The result type used throughout cafescope
pub use crate::Result;

/// Loader options and presets
pub use crate::LoaderConfig;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// A loaded class file
pub use crate::ClassFile;

/// Raw input and the byte cursor
pub use crate::{ByteCursor, File};

// ================================================================================================
// Class Structure
// ================================================================================================

/// Types, members and their flags
pub use crate::metadata::{
    field::{FieldAccessFlags, FieldDefinition},
    method::{MethodAccessFlags, MethodDefinition, ParameterDefinition, ParameterFlags},
    types::{ClassAccessFlags, TypeDefinition, TypeId},
};

/// Descriptors, generic signatures and resolved types
pub use crate::metadata::{
    descriptor::{JvmType, MethodDescriptor},
    resolver::{GenericParameter, ResolvedType},
    signature::TypeSignature,
};

/// Constant pool and symbolic references
pub use crate::metadata::{
    constpool::ConstantPool,
    scope::{CallSiteReference, Constant, FieldReference, MethodReference, SymbolScope, TypeReference},
    token::Token,
};

/// Attributes and the inflated `Code` attribute
pub use crate::metadata::{
    attributes::Attribute,
    code::{CodeBlock, ExceptionTableEntry},
};

// ================================================================================================
// Method Bodies
// ================================================================================================

/// Decoded instructions and variables
pub use crate::disassembler::{
    FlowType, Instruction, InstructionId, MethodBody, Operand, VariableDefinition, VariableId,
};

/// Control flow and exception handlers
pub use crate::analysis::{ControlFlowGraph, ExceptionHandler, InstructionRange};
