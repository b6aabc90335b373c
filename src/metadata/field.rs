//! Field definitions.

use bitflags::bitflags;

use crate::metadata::{
    attributes::Attribute,
    descriptor::JvmType,
    resolver::ResolvedType,
    scope::Constant,
    signature::TypeSignature,
};

bitflags! {
    /// Access and property flags of a field.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FieldAccessFlags: u16 {
        /// Declared `public`
        const PUBLIC = 0x0001;
        /// Declared `private`
        const PRIVATE = 0x0002;
        /// Declared `protected`
        const PROTECTED = 0x0004;
        /// Declared `static`
        const STATIC = 0x0008;
        /// Declared `final`
        const FINAL = 0x0010;
        /// Declared `volatile`
        const VOLATILE = 0x0040;
        /// Declared `transient`
        const TRANSIENT = 0x0080;
        /// Not present in source
        const SYNTHETIC = 0x1000;
        /// An enum constant
        const ENUM = 0x4000;
    }
}

/// A field of the decoded class.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    /// Declaration order within the class
    pub index: usize,
    /// Access flags
    pub access: FieldAccessFlags,
    /// Field name
    pub name: String,
    /// Erased type from the descriptor
    pub field_type: JvmType,
    /// Generic signature, if present and well formed
    pub signature: Option<TypeSignature>,
    /// The field type resolved against the class; generic when a signature is present
    pub resolved_type: ResolvedType,
    /// Compile-time constant initializer
    pub constant_value: Option<Constant>,
    /// All attributes, including the ones surfaced above
    pub attributes: Vec<Attribute>,
}

impl FieldDefinition {
    /// `true` for `static` fields.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.contains(FieldAccessFlags::STATIC)
    }

    /// `true` if flagged synthetic or carrying a `Synthetic` attribute.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.access.contains(FieldAccessFlags::SYNTHETIC)
            || self.attributes.contains(&Attribute::Synthetic)
    }

    /// `true` if carrying a `Deprecated` attribute.
    #[must_use]
    pub fn is_deprecated(&self) -> bool {
        self.attributes.contains(&Attribute::Deprecated)
    }
}
