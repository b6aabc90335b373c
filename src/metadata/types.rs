//! Class-level access flags and the type arena.
//!
//! Every type named by a class file's own structure (the class itself, the class it is
//! nested in, and the classes nested in it) gets one [`TypeDefinition`] in a flat arena owned
//! by the [`crate::ClassFile`]. Relationships between them are [`TypeId`] indices rather than
//! pointers; [`TypeId::SELF`] is always the class being decoded.

use bitflags::bitflags;

use crate::metadata::resolver::{GenericParameter, ResolvedType};

bitflags! {
    /// Access and property flags of a class or of an `InnerClasses` entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClassAccessFlags: u16 {
        /// Declared `public`
        const PUBLIC = 0x0001;
        /// Declared `private` (nested classes only)
        const PRIVATE = 0x0002;
        /// Declared `protected` (nested classes only)
        const PROTECTED = 0x0004;
        /// Declared `static` (nested classes only)
        const STATIC = 0x0008;
        /// Declared `final`
        const FINAL = 0x0010;
        /// Treat superclass methods specially for `invokespecial`
        const SUPER = 0x0020;
        /// An interface
        const INTERFACE = 0x0200;
        /// Declared `abstract`
        const ABSTRACT = 0x0400;
        /// Not present in source
        const SYNTHETIC = 0x1000;
        /// An annotation interface
        const ANNOTATION = 0x2000;
        /// An enum class
        const ENUM = 0x4000;
        /// A module, not a class
        const MODULE = 0x8000;
    }
}

/// Index of a [`TypeDefinition`] in its class file's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TypeId(pub usize);

impl TypeId {
    /// The class being decoded.
    pub const SELF: TypeId = TypeId(0);

    /// Returns the arena index
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One entry of the `InnerClasses` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnerClassEntry {
    /// Internal name of the nested class
    pub inner_class: String,
    /// Internal name of the enclosing class, absent for local and anonymous classes
    pub outer_class: Option<String>,
    /// Simple source name, absent for anonymous classes
    pub simple_name: Option<String>,
    /// Flags as declared in source
    pub access: ClassAccessFlags,
}

/// A type known to one class file.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDefinition {
    /// Position in the arena
    pub id: TypeId,
    /// Internal name
    pub internal_name: String,
    /// Simple source name, if nested and named
    pub simple_name: Option<String>,
    /// Flags; for nested types these are the source-level `InnerClasses` flags
    pub access: ClassAccessFlags,
    /// The enclosing type, when known
    pub declaring_type: Option<TypeId>,
    /// Nested without a simple name
    pub anonymous: bool,
    /// Types declared directly inside this one
    pub nested_types: Vec<TypeId>,
    /// Generic parameters (only populated for [`TypeId::SELF`])
    pub generic_parameters: Vec<GenericParameter>,
    /// Super class (only populated for [`TypeId::SELF`])
    pub base_type: Option<ResolvedType>,
    /// Super interfaces (only populated for [`TypeId::SELF`])
    pub interfaces: Vec<ResolvedType>,
}

impl TypeDefinition {
    /// Creates a bare definition.
    #[must_use]
    pub fn new(id: TypeId, internal_name: impl Into<String>) -> Self {
        TypeDefinition {
            id,
            internal_name: internal_name.into(),
            simple_name: None,
            access: ClassAccessFlags::empty(),
            declaring_type: None,
            anonymous: false,
            nested_types: Vec::new(),
            generic_parameters: Vec::new(),
            base_type: None,
            interfaces: Vec::new(),
        }
    }

    /// `true` if an enclosing type is known.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.declaring_type.is_some()
    }

    /// `true` for interfaces and annotation interfaces.
    #[must_use]
    pub fn is_interface(&self) -> bool {
        self.access.contains(ClassAccessFlags::INTERFACE)
    }

    /// The package part of the internal name, `""` for the default package.
    #[must_use]
    pub fn package(&self) -> &str {
        self.internal_name
            .rfind('/')
            .map_or("", |slash| &self.internal_name[..slash])
    }
}

/// Splits a binary name into `(outer, simple)` at its last unescaped `$`.
///
/// A `$` counts only when it is neither the first nor the last character and is not part of a
/// `$$` run, so synthetic names like `Foo$$Lambda` or `$Proxy` do not split there.
#[must_use]
pub fn split_outer_name(internal_name: &str) -> Option<(&str, &str)> {
    let bytes = internal_name.as_bytes();
    let package_end = internal_name.rfind('/').map_or(0, |slash| slash + 1);

    (package_end + 1..bytes.len().saturating_sub(1))
        .rev()
        .find(|&i| bytes[i] == b'$' && bytes[i - 1] != b'$' && bytes[i + 1] != b'$')
        .map(|i| (&internal_name[..i], &internal_name[i + 1..]))
}
