//! JVM bytecode decoding and variable binding.
//!
//! This module turns the code array of a method into a [`MethodBody`]: an ordered,
//! offset-addressable instruction vector with every branch resolved to its target instruction,
//! a variable table with every local operand bound, and the structured exception handlers.
//!
//! # Key Types
//! - [`Instruction`] - A decoded instruction and its resolved operand
//! - [`Operand`] - Literals, constants, member references, locals, targets and switch tables
//! - [`VariableDefinition`] - A local variable with its slot, type and live range
//! - [`MethodBody`] - Everything decoded from one `Code` attribute
//! - [`OPCODES`] - The static opcode table driving the decoder
//!
//! # Main Functions
//! - [`decode_instructions`] - Decode a code array without binding variables
//!
//! Bodies of methods in a [`crate::ClassFile`] are obtained through
//! [`crate::metadata::method::MethodDefinition::body`].
//!
//! # Example
//! ```rust,no_run
//! use cafescope::ClassFile;
//!
//! let class = ClassFile::from_file("Foo.class".as_ref())?;
//! let method = class.method("main", "([Ljava/lang/String;)V").expect("no main");
//! if let Some(body) = method.body()? {
//!     for instruction in &body.instructions {
//!         println!("{instruction}");
//!     }
//! }
//! # Ok::<(), cafescope::Error>(())
//! ```

mod body;
mod decoder;
mod instruction;
pub mod opcodes;
mod table;
mod variables;

pub use body::MethodBody;
pub(crate) use body::decode_method;
pub use decoder::{decode_instructions, is_reserved_opcode};
pub use instruction::{
    FlowType, Instruction, InstructionId, LocalBinding, LocalOperand, Operand, SwitchInfo,
    SwitchKind,
};
pub use table::{LocalAccess, OpcodeInfo, OperandShape, ValueKind, OPCODES};
pub use variables::{VariableDefinition, VariableId, VariableKind, VariableType};
