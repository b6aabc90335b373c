//! Method definitions and lazy body materialization.
//!
//! A [`MethodDefinition`] is produced by the second loading phase with its parameters already
//! reconciled against the descriptor, the generic signature and the `MethodParameters`
//! attribute. Its `Code` attribute stays opaque until [`MethodDefinition::code`] or
//! [`MethodDefinition::body`] is called:
//!
//! - [`MethodDefinition::code`] inflates the exception table and debug tables once and keeps
//!   them for the life of the class
//! - [`MethodDefinition::body`] decodes instructions, binds variables and maps exception
//!   handlers; the result is shared through the class's bounded body cache
//!
//! # Examples
//!
//! ```rust,no_run
//! use cafescope::ClassFile;
//!
//! let class = ClassFile::from_file("Foo.class".as_ref())?;
//! for method in class.methods() {
//!     if let Some(body) = method.body()? {
//!         println!("{} has {} instructions", method.full_name(), body.instructions.len());
//!     }
//! }
//! # Ok::<(), cafescope::Error>(())
//! ```

use std::sync::{Arc, OnceLock};

use bitflags::bitflags;

use crate::{
    disassembler::{decode_method, MethodBody},
    file::cursor::ByteCursor,
    metadata::{
        attributes::{find_raw, Attribute, AttributeKind},
        classfile::ClassContext,
        code::CodeBlock,
        descriptor::{JvmType, MethodDescriptor},
        resolver::{GenericParameter, ResolvedType},
        scope::{SymbolScope, TypeReference},
        signature::MethodSignature,
        token::Token,
    },
    Error, Result,
};

bitflags! {
    /// Access and property flags of a method.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MethodAccessFlags: u16 {
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
        /// Declared `synchronized`
        const SYNCHRONIZED = 0x0020;
        /// A compiler-generated bridge method
        const BRIDGE = 0x0040;
        /// Declared with a variable arity parameter
        const VARARGS = 0x0080;
        /// Declared `native`
        const NATIVE = 0x0100;
        /// Declared `abstract`
        const ABSTRACT = 0x0400;
        /// Declared `strictfp`
        const STRICT = 0x0800;
        /// Not present in source
        const SYNTHETIC = 0x1000;
    }
}

bitflags! {
    /// Flags of a `MethodParameters` entry.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ParameterFlags: u16 {
        /// Declared `final`
        const FINAL = 0x0010;
        /// Not present in source and not mandated
        const SYNTHETIC = 0x1000;
        /// Implicitly declared, e.g. the outer instance of an inner class constructor
        const MANDATED = 0x8000;
    }
}

/// A formal parameter after reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDefinition {
    /// Position in the descriptor's parameter list
    pub index: usize,
    /// Name from `MethodParameters`, or inferred from the local variable table when enabled
    pub name: Option<String>,
    /// Erased type from the descriptor
    pub descriptor_type: JvmType,
    /// Resolved type; generic when the signature covers this parameter
    pub parameter_type: ResolvedType,
    /// First local variable slot holding the parameter
    pub slot: u16,
    /// `MethodParameters` flags
    pub flags: ParameterFlags,
    /// Present in the descriptor but absent from the generic signature
    pub implicit: bool,
}

impl ParameterDefinition {
    /// Number of slots the parameter occupies.
    #[must_use]
    pub fn slot_width(&self) -> u16 {
        self.descriptor_type.slot_width()
    }
}

/// A method of the decoded class.
#[derive(Debug)]
pub struct MethodDefinition {
    /// Declaration order within the class
    pub index: usize,
    /// Access flags
    pub access: MethodAccessFlags,
    /// Method name
    pub name: String,
    /// Erased descriptor
    pub descriptor: MethodDescriptor,
    /// Generic signature, if present and well formed
    pub signature: Option<MethodSignature>,
    /// Method type parameters
    pub generic_parameters: Vec<GenericParameter>,
    /// Resolved result type
    pub return_type: ResolvedType,
    /// Reconciled parameters in descriptor order
    pub parameters: Vec<ParameterDefinition>,
    /// All method attributes; `Code` stays opaque
    pub attributes: Vec<Attribute>,
    pub(crate) context: Arc<ClassContext>,
    code: OnceLock<CodeBlock>,
}

impl MethodDefinition {
    pub(crate) fn new(
        index: usize,
        access: MethodAccessFlags,
        name: String,
        descriptor: MethodDescriptor,
        attributes: Vec<Attribute>,
        context: Arc<ClassContext>,
    ) -> Self {
        MethodDefinition {
            index,
            access,
            name,
            descriptor,
            signature: None,
            generic_parameters: Vec::new(),
            return_type: ResolvedType::Primitive(JvmType::Void),
            parameters: Vec::new(),
            attributes,
            context,
            code: OnceLock::new(),
        }
    }

    /// `owner.name(descriptor)`, e.g. `com/example/Foo.bar(I)V`.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}.{}{}", self.context.name, self.name, self.descriptor)
    }

    /// Internal name of the declaring class.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.context.name
    }

    /// `true` for `static` methods.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.access.contains(MethodAccessFlags::STATIC)
    }

    /// `true` for `abstract` methods.
    #[must_use]
    pub fn is_abstract(&self) -> bool {
        self.access.contains(MethodAccessFlags::ABSTRACT)
    }

    /// `true` for `native` methods.
    #[must_use]
    pub fn is_native(&self) -> bool {
        self.access.contains(MethodAccessFlags::NATIVE)
    }

    /// `true` for instance initializers.
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.name == "<init>"
    }

    /// `true` for the class initializer.
    #[must_use]
    pub fn is_static_initializer(&self) -> bool {
        self.name == "<clinit>"
    }

    /// `true` if a `Code` attribute is present.
    #[must_use]
    pub fn has_code(&self) -> bool {
        find_raw(&self.attributes, AttributeKind::Code).is_some()
    }

    /// Slot of the first declared parameter: `0` for static methods, `1` otherwise.
    #[must_use]
    pub fn first_parameter_slot(&self) -> u16 {
        u16::from(!self.is_static())
    }

    /// Inflates the `Code` attribute on first use.
    ///
    /// Returns `Ok(None)` for abstract and native methods. A successfully inflated block is kept
    /// for the life of the class; a failure is not, so a later call reports it again.
    ///
    /// # Errors
    /// Returns an error if the `Code` attribute is malformed.
    pub fn code(&self) -> Result<Option<&CodeBlock>> {
        if let Some(code) = self.code.get() {
            return Ok(Some(code));
        }

        let Some(raw) = find_raw(&self.attributes, AttributeKind::Code) else {
            return Ok(None);
        };

        let block = CodeBlock::read(
            self.context.file.data(),
            raw,
            &self.context.pool,
            &self.context.config,
        )?;
        Ok(Some(self.code.get_or_init(|| block)))
    }

    /// Returns the decoded body, decoding it if it is not cached.
    ///
    /// Returns `Ok(None)` for methods without code.
    ///
    /// # Errors
    /// Returns [`Error::MethodDecode`] naming this method if the code cannot be decoded.
    pub fn body(&self) -> Result<Option<Arc<MethodBody>>> {
        if let Some(body) = self.context.cache.get(self.index) {
            return Ok(Some(body));
        }

        let body = self.decode_body().map_err(|error| Error::MethodDecode {
            method: self.full_name(),
            source: Box::new(error),
        })?;

        Ok(body.map(|body| {
            let body = Arc::new(body);
            self.context.cache.insert(self.index, Arc::clone(&body));
            body
        }))
    }

    fn decode_body(&self) -> Result<Option<MethodBody>> {
        let Some(code) = self.code()? else {
            return Ok(None);
        };

        let bytecode = code.bytecode(self.context.file.data())?;
        decode_method(self, code, bytecode, &self.context.pool).map(Some)
    }

    /// Types declared in the `Exceptions` attribute.
    ///
    /// # Errors
    /// Returns an error if the attribute is truncated or names a non-class constant.
    pub fn thrown_types(&self) -> Result<Vec<TypeReference>> {
        let Some(raw) = find_raw(&self.attributes, AttributeKind::Exceptions) else {
            return Ok(Vec::new());
        };
        let Some(payload) = self.context.file.data().get(raw.range()) else {
            return Err(out_of_bounds_error!());
        };

        let mut cursor = ByteCursor::new(payload);
        let count = cursor.read_u16()?;
        let mut thrown = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            thrown.push(self.context.pool.lookup_type(Token(cursor.read_u16()?))?);
        }

        Ok(thrown)
    }

    /// `true` if flagged synthetic or carrying a `Synthetic` attribute.
    #[must_use]
    pub fn is_synthetic(&self) -> bool {
        self.access.contains(MethodAccessFlags::SYNTHETIC)
            || self.attributes.contains(&Attribute::Synthetic)
    }
}
