//! Symbol resolution scope.
//!
//! Instruction operands and exception-table catch types refer to the constant pool by index.
//! The decoder never inspects pool entries itself; it asks a [`SymbolScope`] to turn an index
//! into a resolved, owned reference. [`crate::metadata::constpool::ConstantPool`] is the
//! implementation used when decoding class files.

use std::fmt;

use crate::{
    metadata::{
        descriptor::{JvmType, MethodDescriptor},
        token::Token,
    },
    Result,
};

/// A class, interface or array type referenced by a `CONSTANT_Class` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeReference {
    /// Internal name (`java/lang/String`), or a descriptor for array classes (`[I`)
    pub internal_name: String,
}

impl TypeReference {
    /// Creates a reference from an internal name.
    #[must_use]
    pub fn new(internal_name: impl Into<String>) -> Self {
        TypeReference {
            internal_name: internal_name.into(),
        }
    }

    /// `true` if this names an array class.
    #[must_use]
    pub fn is_array(&self) -> bool {
        self.internal_name.starts_with('[')
    }

    /// The referenced type as a descriptor type.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an invalid array descriptor.
    pub fn as_type(&self) -> Result<JvmType> {
        JvmType::from_class_name(&self.internal_name)
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.internal_name)
    }
}

/// A field referenced by a `CONSTANT_Fieldref` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldReference {
    /// Declaring type
    pub owner: TypeReference,
    /// Field name
    pub name: String,
    /// Field type
    pub field_type: JvmType,
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}:{}",
            self.owner,
            self.name,
            self.field_type.descriptor()
        )
    }
}

/// A method referenced by a `CONSTANT_Methodref` or `CONSTANT_InterfaceMethodref` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodReference {
    /// Declaring type
    pub owner: TypeReference,
    /// Method name
    pub name: String,
    /// Parsed descriptor
    pub descriptor: MethodDescriptor,
    /// `true` when referenced through an `InterfaceMethodref`
    pub interface: bool,
}

impl fmt::Display for MethodReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.owner, self.name, self.descriptor)
    }
}

/// An `invokedynamic` call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSiteReference {
    /// Index into the `BootstrapMethods` attribute, which is kept opaque
    pub bootstrap_index: u16,
    /// Call-site name
    pub name: String,
    /// Call-site descriptor
    pub descriptor: MethodDescriptor,
}

/// The member behind a method handle constant.
#[derive(Debug, Clone, PartialEq)]
pub enum HandleTarget {
    /// `REF_getField` through `REF_putStatic`
    Field(FieldReference),
    /// `REF_invokeVirtual` through `REF_invokeInterface`
    Method(MethodReference),
}

/// A loadable constant (`ldc`, `ldc_w`, `ldc2_w`, `ConstantValue`).
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// `CONSTANT_Integer`
    Integer(i32),
    /// `CONSTANT_Float`
    Float(f32),
    /// `CONSTANT_Long`
    Long(i64),
    /// `CONSTANT_Double`
    Double(f64),
    /// `CONSTANT_String`
    String(String),
    /// `CONSTANT_Class`, a class literal
    Type(TypeReference),
    /// `CONSTANT_MethodType`
    MethodType(MethodDescriptor),
    /// `CONSTANT_MethodHandle`
    MethodHandle {
        /// Reference kind, 1 to 9
        kind: u8,
        /// Referenced member
        target: HandleTarget,
    },
    /// `CONSTANT_Dynamic`
    Dynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_index: u16,
        /// Constant name
        name: String,
        /// Constant type
        constant_type: JvmType,
    },
}

/// Resolves constant-pool indices into structural references.
///
/// Implementations validate the kind of the entry behind each index and report a mismatch as
/// [`crate::Error::InvalidConstant`].
pub trait SymbolScope {
    /// Resolves a `CONSTANT_Class` index.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConstant`] if `token` does not name a class entry.
    fn lookup_type(&self, token: Token) -> Result<TypeReference>;

    /// Resolves a `CONSTANT_Fieldref` index.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConstant`] if `token` does not name a field reference.
    fn lookup_field(&self, token: Token) -> Result<FieldReference>;

    /// Resolves a `CONSTANT_Methodref` or `CONSTANT_InterfaceMethodref` index.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConstant`] if `token` does not name a method reference.
    fn lookup_method(&self, token: Token) -> Result<MethodReference>;

    /// Resolves a `CONSTANT_InvokeDynamic` index.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConstant`] if `token` does not name a call site.
    fn lookup_dynamic_call_site(&self, token: Token) -> Result<CallSiteReference>;

    /// Resolves a loadable constant.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConstant`] if `token` does not name a loadable entry.
    fn lookup_constant(&self, token: Token) -> Result<Constant>;

    /// Resolves a `CONSTANT_Utf8` index.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConstant`] if `token` does not name a UTF-8 entry.
    fn lookup_utf8(&self, token: Token) -> Result<&str>;
}
