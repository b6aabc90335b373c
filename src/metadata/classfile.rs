//! The structural class reader.
//!
//! [`ClassFile`] is the entry point of the crate: it validates and parses one `.class` image
//! into a long-lived structural record. Reading happens in two phases.
//!
//! **Shallow.** The header, the constant pool and every field and method are read in one
//! linear pass. Cheap structural attributes (`SourceFile`, `ConstantValue`, `LineNumberTable`,
//! `Signature`, `MethodParameters`, `InnerClasses`) are decoded immediately; everything else,
//! including `Code`, is recorded as a byte range into the input.
//!
//! **Deep.** The shallow record is turned into definitions: the class's own type, its
//! enclosing types and its nested types are placed in a type arena and interned into a
//! [`ResolverFrame`]; the super types, field types, and method signatures are then resolved
//! against that frame, and each method's parameters are reconciled and assigned slots.
//!
//! Bytecode is never touched by either phase. Structural access therefore cannot fail because
//! of a broken method body; such failures surface from [`MethodDefinition::body`] only
//! (unless [`LoaderConfig::eager_bodies`] is set).
//!
//! # Examples
//!
//! ```rust,no_run
//! use cafescope::ClassFile;
//!
//! let class = ClassFile::from_file("Outer$Inner.class".as_ref())?;
//! println!("{} (version {}.{})", class.name(), class.version().0, class.version().1);
//! if let Some(outer) = class.declaring_type() {
//!     println!("  nested in {}", outer.internal_name);
//! }
//! for field in class.fields() {
//!     println!("  field {}: {}", field.name, field.field_type);
//! }
//! # Ok::<(), cafescope::Error>(())
//! ```

use std::{collections::HashMap, path::Path, sync::Arc};

use log::{debug, warn};
use rayon::prelude::*;

use crate::{
    config::LoaderConfig,
    disassembler::MethodBody,
    file::{cursor::ByteCursor, File},
    metadata::{
        attributes::{find_signature, read_attributes, Attribute},
        cache::BodyCache,
        constpool::ConstantPool,
        descriptor::{JvmType, MethodDescriptor},
        field::{FieldAccessFlags, FieldDefinition},
        method::{MethodAccessFlags, MethodDefinition, ParameterDefinition, ParameterFlags},
        resolver::{GenericOwner, ResolvedType, ResolverFrame},
        signature::{ClassSignature, MethodSignature, TypeParameter, TypeSignature},
        token::Token,
        types::{split_outer_name, ClassAccessFlags, InnerClassEntry, TypeDefinition, TypeId},
    },
    Error, Result,
};

/// Class file magic number.
pub const CLASS_MAGIC: u32 = 0xCAFE_BABE;

/// State shared by a class and its methods for lazy body decoding.
pub(crate) struct ClassContext {
    pub file: File,
    pub pool: ConstantPool,
    pub name: String,
    pub config: LoaderConfig,
    pub cache: BodyCache<MethodBody>,
    /// Internal names of the type arena, indexed by [`TypeId`]
    pub type_names: Vec<String>,
    /// Class type parameters, for resolving local variable signatures
    pub type_parameters: Vec<TypeParameter>,
}

impl std::fmt::Debug for ClassContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassContext")
            .field("name", &self.name)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

struct ShallowMember {
    access: u16,
    name: String,
    descriptor: String,
    attributes: Vec<Attribute>,
}

struct ShallowClass {
    minor_version: u16,
    major_version: u16,
    pool: ConstantPool,
    access: u16,
    name: String,
    super_name: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<ShallowMember>,
    methods: Vec<ShallowMember>,
    attributes: Vec<Attribute>,
}

impl ShallowClass {
    fn read(cursor: &mut ByteCursor) -> Result<ShallowClass> {
        let magic = cursor.read_u32()?;
        if magic != CLASS_MAGIC {
            return Err(Error::InvalidMagic(magic));
        }

        let minor_version = cursor.read_u16()?;
        let major_version = cursor.read_u16()?;
        let pool = ConstantPool::read(cursor)?;

        let access = cursor.read_u16()?;
        let name = pool.class_name(Token(cursor.read_u16()?))?.to_string();
        let super_name = pool
            .optional_class_name(Token(cursor.read_u16()?))?
            .map(str::to_string);

        let interface_count = cursor.read_u16()?;
        let mut interfaces = Vec::with_capacity(usize::from(interface_count));
        for _ in 0..interface_count {
            interfaces.push(pool.class_name(Token(cursor.read_u16()?))?.to_string());
        }

        let fields = Self::read_members(cursor, &pool)?;
        let methods = Self::read_members(cursor, &pool)?;
        let attributes = read_attributes(cursor, &pool, 0)?;

        if cursor.has_remaining() {
            warn!(
                "{} trailing bytes after class '{}'",
                cursor.remaining(),
                name
            );
        }

        Ok(ShallowClass {
            minor_version,
            major_version,
            pool,
            access,
            name,
            super_name,
            interfaces,
            fields,
            methods,
            attributes,
        })
    }

    fn read_members(cursor: &mut ByteCursor, pool: &ConstantPool) -> Result<Vec<ShallowMember>> {
        let count = cursor.read_u16()?;
        let mut members = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            members.push(ShallowMember {
                access: cursor.read_u16()?,
                name: pool.utf8(Token(cursor.read_u16()?))?.to_string(),
                descriptor: pool.utf8(Token(cursor.read_u16()?))?.to_string(),
                attributes: read_attributes(cursor, pool, 0)?,
            });
        }
        Ok(members)
    }
}

/// The type arena under construction, addressable by internal name.
struct TypeArena {
    types: Vec<TypeDefinition>,
    by_name: HashMap<String, TypeId>,
}

impl TypeArena {
    fn new(internal_name: &str, access: ClassAccessFlags) -> Self {
        let mut this = TypeDefinition::new(TypeId::SELF, internal_name);
        this.access = access;

        TypeArena {
            types: vec![this],
            by_name: HashMap::from([(internal_name.to_string(), TypeId::SELF)]),
        }
    }

    fn intern(&mut self, internal_name: &str) -> TypeId {
        if let Some(&id) = self.by_name.get(internal_name) {
            return id;
        }

        let id = TypeId(self.types.len());
        self.types.push(TypeDefinition::new(id, internal_name));
        self.by_name.insert(internal_name.to_string(), id);
        id
    }

    fn get_mut(&mut self, id: TypeId) -> &mut TypeDefinition {
        &mut self.types[id.index()]
    }

    /// Links `inner` under `outer`, applying the source-level details from `entry`.
    fn declare_nested(&mut self, inner: TypeId, outer: TypeId, entry: &InnerClassEntry) {
        let definition = self.get_mut(inner);
        definition.simple_name.clone_from(&entry.simple_name);
        definition.anonymous = entry.simple_name.is_none();
        definition.access = entry.access;
        if definition.declaring_type.is_some() {
            return;
        }
        definition.declaring_type = Some(outer);
        self.get_mut(outer).nested_types.push(inner);
    }
}

/// The outer class of an `InnerClasses` entry, explicit or derived from the binary name.
fn outer_name(entry: &InnerClassEntry) -> Option<&str> {
    entry
        .outer_class
        .as_deref()
        .or_else(|| split_outer_name(&entry.inner_class).map(|(outer, _)| outer))
}

/// A decoded class file.
///
/// Owns the type arena, fields and methods of one class. Methods keep a shared handle to the
/// input so their bodies can be decoded on demand, from any thread.
#[derive(Debug)]
pub struct ClassFile {
    minor_version: u16,
    major_version: u16,
    types: Vec<TypeDefinition>,
    super_name: Option<String>,
    interface_names: Vec<String>,
    fields: Vec<FieldDefinition>,
    methods: Vec<MethodDefinition>,
    attributes: Vec<Attribute>,
    context: Arc<ClassContext>,
}

impl ClassFile {
    /// Decodes a class from a file on disk, memory-mapped.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or is not a well-formed class file.
    pub fn from_file(path: &Path) -> Result<ClassFile> {
        Self::from_file_with_config(path, LoaderConfig::default())
    }

    /// Decodes a class from a file on disk with explicit options.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened or is not a well-formed class file.
    pub fn from_file_with_config(path: &Path, config: LoaderConfig) -> Result<ClassFile> {
        Self::load(File::from_file(path)?, config)
    }

    /// Decodes a class from an in-memory buffer.
    ///
    /// # Errors
    /// Returns [`Error::InvalidMagic`] if the buffer does not start with `0xCAFEBABE`, and
    /// other errors for malformed structure.
    pub fn from_mem(data: Vec<u8>) -> Result<ClassFile> {
        Self::from_mem_with_config(data, LoaderConfig::default())
    }

    /// Decodes a class from an in-memory buffer with explicit options.
    ///
    /// # Errors
    /// See [`ClassFile::from_mem`].
    pub fn from_mem_with_config(data: Vec<u8>, config: LoaderConfig) -> Result<ClassFile> {
        Self::load(File::from_mem(data)?, config)
    }

    fn load(file: File, config: LoaderConfig) -> Result<ClassFile> {
        let shallow = ShallowClass::read(&mut file.cursor())?;
        debug!(
            "Read class '{}' version {}.{}: {} fields, {} methods",
            shallow.name,
            shallow.major_version,
            shallow.minor_version,
            shallow.fields.len(),
            shallow.methods.len()
        );

        let class = ClassReader::new(shallow, file, config).read()?;

        if config.eager_bodies {
            class.decode_all_bodies()?;
        }

        Ok(class)
    }

    /// Internal name of the class, e.g. `com/example/Foo`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.context.name
    }

    /// `(major, minor)` class file version.
    #[must_use]
    pub fn version(&self) -> (u16, u16) {
        (self.major_version, self.minor_version)
    }

    /// Access flags; for nested classes the source-level flags from `InnerClasses`.
    #[must_use]
    pub fn access(&self) -> ClassAccessFlags {
        self.this_type().access
    }

    /// Internal name of the super class; `None` only for `java/lang/Object` and modules.
    #[must_use]
    pub fn super_name(&self) -> Option<&str> {
        self.super_name.as_deref()
    }

    /// Internal names of the directly implemented interfaces.
    #[must_use]
    pub fn interface_names(&self) -> &[String] {
        &self.interface_names
    }

    /// The resolved super class, generic when a class signature is present.
    #[must_use]
    pub fn base_type(&self) -> Option<&ResolvedType> {
        self.this_type().base_type.as_ref()
    }

    /// The resolved super interfaces.
    #[must_use]
    pub fn interfaces(&self) -> &[ResolvedType] {
        &self.this_type().interfaces
    }

    /// The type arena; index with [`TypeId::index`].
    #[must_use]
    pub fn types(&self) -> &[TypeDefinition] {
        &self.types
    }

    /// Looks up a type in the arena.
    #[must_use]
    pub fn type_definition(&self, id: TypeId) -> Option<&TypeDefinition> {
        self.types.get(id.index())
    }

    /// The class itself.
    #[must_use]
    pub fn this_type(&self) -> &TypeDefinition {
        &self.types[TypeId::SELF.index()]
    }

    /// The enclosing type, if this class is nested and its outer type could be determined.
    #[must_use]
    pub fn declaring_type(&self) -> Option<&TypeDefinition> {
        self.this_type()
            .declaring_type
            .and_then(|id| self.type_definition(id))
    }

    /// Named types nested directly in this class.
    pub fn nested_types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.direct_nested().filter(|t| !t.anonymous)
    }

    /// Anonymous types nested directly in this class.
    pub fn anonymous_types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.direct_nested().filter(|t| t.anonymous)
    }

    fn direct_nested(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.this_type()
            .nested_types
            .iter()
            .filter_map(|id| self.type_definition(*id))
    }

    /// Fields in declaration order.
    #[must_use]
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Methods in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[MethodDefinition] {
        &self.methods
    }

    /// Looks up a method by name and descriptor string, e.g. `("run", "()V")`.
    #[must_use]
    pub fn method(&self, name: &str, descriptor: &str) -> Option<&MethodDefinition> {
        self.methods
            .iter()
            .find(|m| m.name == name && m.descriptor.to_string() == descriptor)
    }

    /// Class-level attributes.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Name recorded in the `SourceFile` attribute.
    #[must_use]
    pub fn source_file(&self) -> Option<&str> {
        self.attributes.iter().find_map(|attribute| match attribute {
            Attribute::SourceFile(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// The constant pool, which also serves as the class's symbol scope.
    #[must_use]
    pub fn constant_pool(&self) -> &ConstantPool {
        &self.context.pool
    }

    /// Options the class was loaded with.
    #[must_use]
    pub fn config(&self) -> &LoaderConfig {
        &self.context.config
    }

    /// Decodes every method body in parallel, in method order.
    ///
    /// Bodies are inserted into the body cache as they are produced, subject to its bound.
    ///
    /// # Errors
    /// Returns the [`Error::MethodDecode`] of the first broken method in method order. Every
    /// body is attempted before the error is reported.
    pub fn decode_all_bodies(&self) -> Result<Vec<Option<Arc<MethodBody>>>> {
        let bodies: Vec<Result<Option<Arc<MethodBody>>>> = self
            .methods
            .par_iter()
            .map(MethodDefinition::body)
            .collect();
        bodies.into_iter().collect()
    }
}

/// Parses an optional generic signature, logging and dropping it if malformed.
fn parse_signature<T>(owner: &str, text: Option<&str>, parse: fn(&str) -> Result<T>) -> Option<T> {
    let text = text?;
    match parse(text) {
        Ok(signature) => Some(signature),
        Err(error) => {
            warn!("Ignoring malformed signature '{text}' of {owner}: {error}");
            None
        }
    }
}

/// Places the enclosing chain and the directly nested types of `shallow` in the arena.
fn resolve_nesting(shallow: &ShallowClass, arena: &mut TypeArena) {
    let Some(entries) = shallow.attributes.iter().find_map(|attribute| match attribute {
        Attribute::InnerClasses(entries) => Some(entries),
        _ => None,
    }) else {
        return;
    };

    let mut current = TypeId::SELF;
    let mut current_name = shallow.name.as_str();
    let mut chain = vec![TypeId::SELF];
    while let Some(entry) = entries.iter().find(|e| e.inner_class == current_name) {
        let Some(outer) = outer_name(entry) else {
            if current == TypeId::SELF {
                warn!("Cannot determine the outer type of '{current_name}'");
            }
            let definition = arena.get_mut(current);
            definition.simple_name.clone_from(&entry.simple_name);
            definition.anonymous = entry.simple_name.is_none();
            definition.access = entry.access;
            break;
        };

        let outer_id = arena.intern(outer);
        if chain.contains(&outer_id) {
            warn!("Circular nesting through '{outer}' in '{}'", shallow.name);
            break;
        }

        arena.declare_nested(current, outer_id, entry);
        chain.push(outer_id);
        current = outer_id;
        current_name = outer;
    }

    for entry in entries {
        if entry.inner_class == shallow.name || outer_name(entry) != Some(shallow.name.as_str()) {
            continue;
        }

        let inner = arena.intern(&entry.inner_class);
        if chain.contains(&inner) {
            continue;
        }
        arena.declare_nested(inner, TypeId::SELF, entry);
    }
}

/// The deep phase: turns a shallow record into definitions.
struct ClassReader {
    shallow: ShallowClass,
    signature: Option<ClassSignature>,
    context: Arc<ClassContext>,
    frame: ResolverFrame,
    arena: TypeArena,
}

impl ClassReader {
    fn new(mut shallow: ShallowClass, file: File, config: LoaderConfig) -> ClassReader {
        let mut arena = TypeArena::new(
            &shallow.name,
            ClassAccessFlags::from_bits_truncate(shallow.access),
        );
        resolve_nesting(&shallow, &mut arena);

        let signature = parse_signature(
            &shallow.name,
            find_signature(&shallow.attributes),
            ClassSignature::parse,
        );

        let context = Arc::new(ClassContext {
            file,
            pool: std::mem::take(&mut shallow.pool),
            name: shallow.name.clone(),
            config,
            cache: BodyCache::new(config.body_cache_capacity),
            type_names: arena
                .types
                .iter()
                .map(|definition| definition.internal_name.clone())
                .collect(),
            type_parameters: signature
                .as_ref()
                .map(|signature| signature.type_parameters.clone())
                .unwrap_or_default(),
        });

        ClassReader {
            shallow,
            signature,
            context,
            frame: ResolverFrame::new(),
            arena,
        }
    }

    fn read(mut self) -> Result<ClassFile> {
        for definition in &self.arena.types {
            self.frame.intern_type(&definition.internal_name, definition.id);
        }

        self.resolve_super_types();

        let fields = std::mem::take(&mut self.shallow.fields)
            .into_iter()
            .enumerate()
            .map(|(index, member)| self.build_field(index, member))
            .collect::<Result<Vec<_>>>()?;

        let methods = std::mem::take(&mut self.shallow.methods)
            .into_iter()
            .enumerate()
            .map(|(index, member)| self.build_method(index, member))
            .collect::<Result<Vec<_>>>()?;

        self.frame.pop_scope();

        debug!(
            "Decoded class '{}': {} types, {} fields, {} methods",
            self.shallow.name,
            self.arena.types.len(),
            fields.len(),
            methods.len()
        );

        Ok(ClassFile {
            minor_version: self.shallow.minor_version,
            major_version: self.shallow.major_version,
            types: self.arena.types,
            super_name: self.shallow.super_name,
            interface_names: self.shallow.interfaces,
            fields,
            methods,
            attributes: self.shallow.attributes,
            context: self.context,
        })
    }

    /// Opens the class generic scope and resolves the super class and interfaces.
    fn resolve_super_types(&mut self) {
        let signature = self.signature.take();
        let parameters = signature.as_ref().map_or(&[][..], |s| &s.type_parameters[..]);
        let generic_parameters = self
            .frame
            .push_scope(GenericOwner::Type(TypeId::SELF), parameters);

        let (base_type, interfaces) = match &signature {
            Some(signature) => (
                Some(self.frame.resolve_class(&signature.superclass)),
                signature
                    .interfaces
                    .iter()
                    .map(|interface| self.frame.resolve_class(interface))
                    .collect(),
            ),
            None => (
                self.shallow
                    .super_name
                    .as_deref()
                    .map(|name| self.frame.resolve_name(name)),
                self.shallow
                    .interfaces
                    .iter()
                    .map(|name| self.frame.resolve_name(name))
                    .collect(),
            ),
        };

        let this = self.arena.get_mut(TypeId::SELF);
        this.generic_parameters = generic_parameters;
        this.base_type = base_type;
        this.interfaces = interfaces;
    }

    fn build_field(&self, index: usize, member: ShallowMember) -> Result<FieldDefinition> {
        let field_type = JvmType::parse(&member.descriptor)?;
        let signature = parse_signature(
            &member.name,
            find_signature(&member.attributes),
            TypeSignature::parse_field,
        );

        let resolved_type = match &signature {
            Some(signature) => self.frame.resolve(signature),
            None => self.frame.resolve_descriptor(&field_type),
        };

        let constant_value = member.attributes.iter().find_map(|attribute| match attribute {
            Attribute::ConstantValue(constant) => Some(constant.clone()),
            _ => None,
        });

        Ok(FieldDefinition {
            index,
            access: FieldAccessFlags::from_bits_truncate(member.access),
            name: member.name,
            field_type,
            signature,
            resolved_type,
            constant_value,
            attributes: member.attributes,
        })
    }

    fn build_method(&mut self, index: usize, member: ShallowMember) -> Result<MethodDefinition> {
        let access = MethodAccessFlags::from_bits_truncate(member.access);
        let descriptor = MethodDescriptor::parse(&member.descriptor)?;
        let signature = parse_signature(
            &member.name,
            find_signature(&member.attributes),
            MethodSignature::parse,
        );

        let type_parameters = signature.as_ref().map_or(&[][..], |s| &s.type_parameters[..]);
        let generic_parameters = self
            .frame
            .push_scope(GenericOwner::Method(index), type_parameters);

        let return_type = match &signature {
            Some(signature) => self.frame.resolve(&signature.return_type),
            None => self.frame.resolve_descriptor(&descriptor.return_type),
        };
        let parameters = self.reconcile_parameters(&member, access, &descriptor, signature.as_ref());

        self.frame.pop_scope();

        let mut method = MethodDefinition::new(
            index,
            access,
            member.name,
            descriptor,
            member.attributes,
            Arc::clone(&self.context),
        );
        method.signature = signature;
        method.generic_parameters = generic_parameters;
        method.return_type = return_type;
        method.parameters = parameters;
        Ok(method)
    }

    /// Builds the parameter list from the descriptor, overlaying the generic signature and
    /// `MethodParameters`.
    ///
    /// Descriptor parameters the signature does not mention are implicit and sit in front of
    /// the declared ones. Slots are assigned in order from `0` (static) or `1`.
    fn reconcile_parameters(
        &self,
        member: &ShallowMember,
        access: MethodAccessFlags,
        descriptor: &MethodDescriptor,
        signature: Option<&MethodSignature>,
    ) -> Vec<ParameterDefinition> {
        let declared = descriptor.parameters.len();
        let generic = signature
            .map(|signature| &signature.parameters[..])
            .filter(|generic| {
                if generic.len() > declared {
                    warn!(
                        "Signature of {}{} declares {} parameters, descriptor only {}",
                        member.name,
                        member.descriptor,
                        generic.len(),
                        declared
                    );
                    return false;
                }
                true
            });
        let implicit_count = generic.map_or(0, |generic| declared - generic.len());

        let mut slot = u16::from(!access.contains(MethodAccessFlags::STATIC));
        let mut parameters = Vec::with_capacity(declared);
        for (index, descriptor_type) in descriptor.parameters.iter().enumerate() {
            let implicit = index < implicit_count;
            let parameter_type = match generic {
                Some(generic) if !implicit => self.frame.resolve(&generic[index - implicit_count]),
                _ => self.frame.resolve_descriptor(descriptor_type),
            };

            parameters.push(ParameterDefinition {
                index,
                name: None,
                descriptor_type: descriptor_type.clone(),
                parameter_type,
                slot,
                flags: ParameterFlags::empty(),
                implicit,
            });
            slot = slot.saturating_add(descriptor_type.slot_width());
        }

        let entries = member.attributes.iter().find_map(|attribute| match attribute {
            Attribute::MethodParameters(entries) => Some(entries),
            _ => None,
        });
        if let Some(entries) = entries {
            let first = if entries.len() == declared {
                Some(0)
            } else if entries.len() == declared - implicit_count {
                Some(implicit_count)
            } else {
                warn!(
                    "MethodParameters of {}{} has {} entries for {} parameters",
                    member.name,
                    member.descriptor,
                    entries.len(),
                    declared
                );
                None
            };

            if let Some(first) = first {
                for (parameter, entry) in parameters[first..].iter_mut().zip(entries) {
                    parameter.name.clone_from(&entry.name);
                    parameter.flags = entry.flags;
                    parameter.implicit |= entry
                        .flags
                        .intersects(ParameterFlags::SYNTHETIC | ParameterFlags::MANDATED);
                }
            }
        }

        parameters
    }
}
