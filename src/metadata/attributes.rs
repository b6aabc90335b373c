//! Attribute decoding.
//!
//! Attributes are read in one pass as `(name, length, payload)`. Small structural attributes
//! are decoded on the spot; everything else, including `Code` and `Exceptions`, is kept as a
//! [`RawAttribute`] that records where its payload lives in the input so it can be inflated
//! later without re-reading the class.

use std::str::FromStr;

use log::trace;
use strum::{AsRefStr, Display, EnumString};

use crate::{
    file::cursor::ByteCursor,
    metadata::{
        constpool::ConstantPool,
        method::ParameterFlags,
        scope::{Constant, SymbolScope},
        token::Token,
        types::{ClassAccessFlags, InnerClassEntry},
    },
    Result,
};

/// Attribute names with a defined meaning for this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, AsRefStr, Display)]
pub enum AttributeKind {
    /// Method bytecode, kept raw
    Code,
    /// Bytecode offset to source line mapping
    LineNumberTable,
    /// Local variable names and descriptors, inside `Code`
    LocalVariableTable,
    /// Local variable generic signatures, inside `Code`
    LocalVariableTypeTable,
    /// Declared thrown types, kept raw
    Exceptions,
    /// Nesting relationships
    InnerClasses,
    /// Parameter names and flags
    MethodParameters,
    /// Generic signature
    Signature,
    /// Static field initial value
    ConstantValue,
    /// Source file name
    SourceFile,
    /// Compiler-generated member
    Synthetic,
    /// Deprecated member
    Deprecated,
}

/// An undecoded attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    /// Attribute name
    pub name: String,
    /// Offset of the payload in the input, after the 6-byte header
    pub offset: usize,
    /// Payload length
    pub length: usize,
}

impl RawAttribute {
    /// The known kind of this attribute, if any.
    #[must_use]
    pub fn kind(&self) -> Option<AttributeKind> {
        AttributeKind::from_str(&self.name).ok()
    }

    /// Payload byte range in the input.
    #[must_use]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.offset..self.offset + self.length
    }
}

/// One `LineNumberTable` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineNumber {
    /// First bytecode offset of the line
    pub start_pc: u16,
    /// Source line
    pub line: u16,
}

/// One `MethodParameters` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodParameter {
    /// Declared name, absent for formal parameters without one
    pub name: Option<String>,
    /// Parameter flags
    pub flags: ParameterFlags,
}

/// A decoded or opaque attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    /// `SourceFile`
    SourceFile(String),
    /// `ConstantValue`
    ConstantValue(Constant),
    /// `LineNumberTable`
    LineNumberTable(Vec<LineNumber>),
    /// `Signature`, undecoded text
    Signature(String),
    /// `MethodParameters`
    MethodParameters(Vec<MethodParameter>),
    /// `InnerClasses`
    InnerClasses(Vec<InnerClassEntry>),
    /// `Synthetic`
    Synthetic,
    /// `Deprecated`
    Deprecated,
    /// Any other attribute
    Raw(RawAttribute),
}

impl Attribute {
    /// The attribute name as it appears in the class file.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Attribute::SourceFile(_) => "SourceFile",
            Attribute::ConstantValue(_) => "ConstantValue",
            Attribute::LineNumberTable(_) => "LineNumberTable",
            Attribute::Signature(_) => "Signature",
            Attribute::MethodParameters(_) => "MethodParameters",
            Attribute::InnerClasses(_) => "InnerClasses",
            Attribute::Synthetic => "Synthetic",
            Attribute::Deprecated => "Deprecated",
            Attribute::Raw(raw) => &raw.name,
        }
    }
}

/// Returns the first opaque attribute of `kind`.
#[must_use]
pub fn find_raw(attributes: &[Attribute], kind: AttributeKind) -> Option<&RawAttribute> {
    attributes.iter().find_map(|attribute| match attribute {
        Attribute::Raw(raw) if raw.kind() == Some(kind) => Some(raw),
        _ => None,
    })
}

/// Returns the undecoded `Signature` text, if present.
#[must_use]
pub fn find_signature(attributes: &[Attribute]) -> Option<&str> {
    attributes.iter().find_map(|attribute| match attribute {
        Attribute::Signature(signature) => Some(signature.as_str()),
        _ => None,
    })
}

/// Reads a `u2 attributes_count` attribute list.
///
/// `base` is added to cursor positions to produce input offsets for [`RawAttribute`]s.
///
/// # Errors
/// Returns an error if the list is truncated, a name index is invalid, or a structural
/// attribute's payload does not match its declared length.
pub fn read_attributes(
    cursor: &mut ByteCursor,
    pool: &ConstantPool,
    base: usize,
) -> Result<Vec<Attribute>> {
    let count = cursor.read_u16()?;
    let mut attributes = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        attributes.push(read_attribute(cursor, pool, base)?);
    }
    Ok(attributes)
}

fn read_attribute(cursor: &mut ByteCursor, pool: &ConstantPool, base: usize) -> Result<Attribute> {
    let name = pool.utf8(Token(cursor.read_u16()?))?;
    let length = cursor.read_u32()? as usize;
    let offset = base + cursor.position();
    let payload = cursor.read_bytes(length)?;

    let kind = AttributeKind::from_str(name).ok();
    let decoded = match kind {
        Some(AttributeKind::SourceFile) => Some(read_payload(payload, name, |data| {
            Ok(Attribute::SourceFile(
                pool.utf8(Token(data.read_u16()?))?.to_string(),
            ))
        })?),
        Some(AttributeKind::Signature) => Some(read_payload(payload, name, |data| {
            Ok(Attribute::Signature(
                pool.utf8(Token(data.read_u16()?))?.to_string(),
            ))
        })?),
        Some(AttributeKind::ConstantValue) => Some(read_payload(payload, name, |data| {
            Ok(Attribute::ConstantValue(
                pool.lookup_constant(Token(data.read_u16()?))?,
            ))
        })?),
        Some(AttributeKind::LineNumberTable) => Some(read_payload(payload, name, |data| {
            let count = data.read_u16()?;
            let mut lines = Vec::with_capacity(usize::from(count));
            for _ in 0..count {
                lines.push(LineNumber {
                    start_pc: data.read_u16()?,
                    line: data.read_u16()?,
                });
            }
            Ok(Attribute::LineNumberTable(lines))
        })?),
        Some(AttributeKind::MethodParameters) => Some(read_payload(payload, name, |data| {
            let count = data.read_u8()?;
            let mut parameters = Vec::with_capacity(usize::from(count));
            for _ in 0..count {
                let name_index = Token(data.read_u16()?);
                let name = if name_index.is_null() {
                    None
                } else {
                    Some(pool.utf8(name_index)?.to_string())
                };
                parameters.push(MethodParameter {
                    name,
                    flags: ParameterFlags::from_bits_truncate(data.read_u16()?),
                });
            }
            Ok(Attribute::MethodParameters(parameters))
        })?),
        Some(AttributeKind::InnerClasses) => Some(read_payload(payload, name, |data| {
            let count = data.read_u16()?;
            let mut entries = Vec::with_capacity(usize::from(count));
            for _ in 0..count {
                let inner_class = pool.class_name(Token(data.read_u16()?))?.to_string();
                let outer_class = pool
                    .optional_class_name(Token(data.read_u16()?))?
                    .map(str::to_string);
                let name_index = Token(data.read_u16()?);
                let simple_name = if name_index.is_null() {
                    None
                } else {
                    Some(pool.utf8(name_index)?.to_string())
                };
                entries.push(InnerClassEntry {
                    inner_class,
                    outer_class,
                    simple_name,
                    access: ClassAccessFlags::from_bits_truncate(data.read_u16()?),
                });
            }
            Ok(Attribute::InnerClasses(entries))
        })?),
        Some(AttributeKind::Synthetic) => Some(Attribute::Synthetic),
        Some(AttributeKind::Deprecated) => Some(Attribute::Deprecated),
        _ => None,
    };

    Ok(decoded.unwrap_or_else(|| {
        trace!("Keeping attribute '{}' ({} bytes at {}) opaque", name, length, offset);
        Attribute::Raw(RawAttribute {
            name: name.to_string(),
            offset,
            length,
        })
    }))
}

fn read_payload<F>(payload: &[u8], name: &str, parse: F) -> Result<Attribute>
where
    F: FnOnce(&mut ByteCursor) -> Result<Attribute>,
{
    let mut data = ByteCursor::new(payload);
    let attribute = parse(&mut data)?;
    if data.has_remaining() {
        return Err(malformed_error!(
            "Attribute '{}' has {} trailing bytes",
            name,
            data.remaining()
        ));
    }
    Ok(attribute)
}
