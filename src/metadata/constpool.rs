//! The constant pool.
//!
//! [`ConstantPool::read`] parses the pool that follows the version in every class file. The
//! pool is 1-indexed, and `Long`/`Double` entries occupy two indices; both the unused index 0
//! and the upper half of wide entries are stored as [`ConstantPoolEntry::Unusable`] so that
//! [`Token::index`] maps straight onto the entry vector.
//!
//! The pool implements [`SymbolScope`], turning raw indices into owned references.

use strum::FromRepr;

use crate::{
    file::cursor::ByteCursor,
    metadata::{
        descriptor::{JvmType, MethodDescriptor},
        scope::{
            CallSiteReference, Constant, FieldReference, HandleTarget, MethodReference,
            SymbolScope, TypeReference,
        },
        token::Token,
    },
    Error, Result,
};

/// Constant-pool entry tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr)]
#[repr(u8)]
pub enum ConstantTag {
    /// `CONSTANT_Utf8`
    Utf8 = 1,
    /// `CONSTANT_Integer`
    Integer = 3,
    /// `CONSTANT_Float`
    Float = 4,
    /// `CONSTANT_Long`
    Long = 5,
    /// `CONSTANT_Double`
    Double = 6,
    /// `CONSTANT_Class`
    Class = 7,
    /// `CONSTANT_String`
    String = 8,
    /// `CONSTANT_Fieldref`
    Fieldref = 9,
    /// `CONSTANT_Methodref`
    Methodref = 10,
    /// `CONSTANT_InterfaceMethodref`
    InterfaceMethodref = 11,
    /// `CONSTANT_NameAndType`
    NameAndType = 12,
    /// `CONSTANT_MethodHandle`
    MethodHandle = 15,
    /// `CONSTANT_MethodType`
    MethodType = 16,
    /// `CONSTANT_Dynamic`
    Dynamic = 17,
    /// `CONSTANT_InvokeDynamic`
    InvokeDynamic = 18,
    /// `CONSTANT_Module`
    Module = 19,
    /// `CONSTANT_Package`
    Package = 20,
}

/// One decoded constant-pool entry. Cross references are kept as raw tokens.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantPoolEntry {
    /// Index 0 and the second index of a `Long` or `Double`
    Unusable,
    /// Modified UTF-8 text
    Utf8(String),
    /// 32-bit integer
    Integer(i32),
    /// 32-bit float
    Float(f32),
    /// 64-bit integer
    Long(i64),
    /// 64-bit float
    Double(f64),
    /// Class or interface
    Class {
        /// Utf8 internal name
        name: Token,
    },
    /// String literal
    String {
        /// Utf8 value
        value: Token,
    },
    /// Field reference
    Fieldref {
        /// Class entry of the owner
        class: Token,
        /// Name-and-type entry
        name_and_type: Token,
    },
    /// Class method reference
    Methodref {
        /// Class entry of the owner
        class: Token,
        /// Name-and-type entry
        name_and_type: Token,
    },
    /// Interface method reference
    InterfaceMethodref {
        /// Class entry of the owner
        class: Token,
        /// Name-and-type entry
        name_and_type: Token,
    },
    /// Member name plus descriptor
    NameAndType {
        /// Utf8 name
        name: Token,
        /// Utf8 descriptor
        descriptor: Token,
    },
    /// Method handle
    MethodHandle {
        /// Reference kind, 1 to 9
        kind: u8,
        /// Field or method reference entry
        reference: Token,
    },
    /// Method type
    MethodType {
        /// Utf8 method descriptor
        descriptor: Token,
    },
    /// Dynamically computed constant
    Dynamic {
        /// Index into `BootstrapMethods`
        bootstrap_index: u16,
        /// Name-and-type entry
        name_and_type: Token,
    },
    /// `invokedynamic` call site
    InvokeDynamic {
        /// Index into `BootstrapMethods`
        bootstrap_index: u16,
        /// Name-and-type entry
        name_and_type: Token,
    },
    /// Module
    Module {
        /// Utf8 module name
        name: Token,
    },
    /// Package
    Package {
        /// Utf8 package name
        name: Token,
    },
}

/// The parsed constant pool of one class file.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    entries: Vec<ConstantPoolEntry>,
}

impl ConstantPool {
    /// Reads `constant_pool_count` followed by the entries.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an unknown tag or a zero count, and propagates
    /// cursor errors for truncated data or invalid modified UTF-8.
    pub fn read(cursor: &mut ByteCursor) -> Result<ConstantPool> {
        let count = usize::from(cursor.read_u16()?);
        if count == 0 {
            return Err(malformed_error!("Constant pool count must be at least 1"));
        }

        let mut entries = Vec::with_capacity(count);
        entries.push(ConstantPoolEntry::Unusable);

        while entries.len() < count {
            let tag_byte = cursor.read_u8()?;
            let Some(tag) = ConstantTag::from_repr(tag_byte) else {
                return Err(malformed_error!(
                    "Unknown constant pool tag {} at index {}",
                    tag_byte,
                    entries.len()
                ));
            };

            let entry = match tag {
                ConstantTag::Utf8 => ConstantPoolEntry::Utf8(cursor.read_utf8()?),
                ConstantTag::Integer => ConstantPoolEntry::Integer(cursor.read_i32()?),
                ConstantTag::Float => ConstantPoolEntry::Float(cursor.read_f32()?),
                ConstantTag::Long => ConstantPoolEntry::Long(cursor.read_i64()?),
                ConstantTag::Double => ConstantPoolEntry::Double(cursor.read_f64()?),
                ConstantTag::Class => ConstantPoolEntry::Class {
                    name: Token(cursor.read_u16()?),
                },
                ConstantTag::String => ConstantPoolEntry::String {
                    value: Token(cursor.read_u16()?),
                },
                ConstantTag::Fieldref => ConstantPoolEntry::Fieldref {
                    class: Token(cursor.read_u16()?),
                    name_and_type: Token(cursor.read_u16()?),
                },
                ConstantTag::Methodref => ConstantPoolEntry::Methodref {
                    class: Token(cursor.read_u16()?),
                    name_and_type: Token(cursor.read_u16()?),
                },
                ConstantTag::InterfaceMethodref => ConstantPoolEntry::InterfaceMethodref {
                    class: Token(cursor.read_u16()?),
                    name_and_type: Token(cursor.read_u16()?),
                },
                ConstantTag::NameAndType => ConstantPoolEntry::NameAndType {
                    name: Token(cursor.read_u16()?),
                    descriptor: Token(cursor.read_u16()?),
                },
                ConstantTag::MethodHandle => ConstantPoolEntry::MethodHandle {
                    kind: cursor.read_u8()?,
                    reference: Token(cursor.read_u16()?),
                },
                ConstantTag::MethodType => ConstantPoolEntry::MethodType {
                    descriptor: Token(cursor.read_u16()?),
                },
                ConstantTag::Dynamic => ConstantPoolEntry::Dynamic {
                    bootstrap_index: cursor.read_u16()?,
                    name_and_type: Token(cursor.read_u16()?),
                },
                ConstantTag::InvokeDynamic => ConstantPoolEntry::InvokeDynamic {
                    bootstrap_index: cursor.read_u16()?,
                    name_and_type: Token(cursor.read_u16()?),
                },
                ConstantTag::Module => ConstantPoolEntry::Module {
                    name: Token(cursor.read_u16()?),
                },
                ConstantTag::Package => ConstantPoolEntry::Package {
                    name: Token(cursor.read_u16()?),
                },
            };

            let wide = matches!(entry, ConstantPoolEntry::Long(_) | ConstantPoolEntry::Double(_));
            entries.push(entry);
            if wide {
                if entries.len() >= count {
                    return Err(malformed_error!(
                        "Wide constant at index {} overruns the pool",
                        entries.len() - 1
                    ));
                }
                entries.push(ConstantPoolEntry::Unusable);
            }
        }

        Ok(ConstantPool { entries })
    }

    /// Builds a pool from already-decoded entries. Index 0 must be included.
    #[must_use]
    pub fn from_entries(entries: Vec<ConstantPoolEntry>) -> ConstantPool {
        ConstantPool { entries }
    }

    /// Number of indices, including index 0.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the pool has no entries at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(token, entry)` pairs, skipping unusable indices.
    pub fn iter(&self) -> impl Iterator<Item = (Token, &ConstantPoolEntry)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| **entry != ConstantPoolEntry::Unusable)
            .filter_map(|(index, entry)| u16::try_from(index).ok().map(|i| (Token(i), entry)))
    }

    /// Returns the entry at `token`.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConstant`] if the index is out of range or unusable.
    pub fn get(&self, token: Token) -> Result<&ConstantPoolEntry> {
        match self.entries.get(token.index()) {
            Some(ConstantPoolEntry::Unusable) | None => Err(Error::InvalidConstant {
                index: token,
                expected: "usable entry",
            }),
            Some(entry) => Ok(entry),
        }
    }

    fn invalid(token: Token, expected: &'static str) -> Error {
        Error::InvalidConstant {
            index: token,
            expected,
        }
    }

    /// Returns the text of a `CONSTANT_Utf8` entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConstant`] if `token` does not name a UTF-8 entry.
    pub fn utf8(&self, token: Token) -> Result<&str> {
        match self.entries.get(token.index()) {
            Some(ConstantPoolEntry::Utf8(value)) => Ok(value),
            _ => Err(Self::invalid(token, "Utf8")),
        }
    }

    /// Returns the name of a `CONSTANT_Class` entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConstant`] if `token` does not name a class entry.
    pub fn class_name(&self, token: Token) -> Result<&str> {
        match self.entries.get(token.index()) {
            Some(ConstantPoolEntry::Class { name }) => self.utf8(*name),
            _ => Err(Self::invalid(token, "Class")),
        }
    }

    /// Returns the name of a `CONSTANT_Class` entry, or `None` for index 0.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConstant`] if a non-zero `token` does not name a class.
    pub fn optional_class_name(&self, token: Token) -> Result<Option<&str>> {
        if token.is_null() {
            Ok(None)
        } else {
            self.class_name(token).map(Some)
        }
    }

    /// Returns the `(name, descriptor)` of a `CONSTANT_NameAndType` entry.
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConstant`] if `token` does not name a name-and-type.
    pub fn name_and_type(&self, token: Token) -> Result<(&str, &str)> {
        match self.entries.get(token.index()) {
            Some(ConstantPoolEntry::NameAndType { name, descriptor }) => {
                Ok((self.utf8(*name)?, self.utf8(*descriptor)?))
            }
            _ => Err(Self::invalid(token, "NameAndType")),
        }
    }

    fn member(&self, class: Token, name_and_type: Token) -> Result<(TypeReference, &str, &str)> {
        let owner = TypeReference::new(self.class_name(class)?);
        let (name, descriptor) = self.name_and_type(name_and_type)?;
        Ok((owner, name, descriptor))
    }
}

impl SymbolScope for ConstantPool {
    fn lookup_type(&self, token: Token) -> Result<TypeReference> {
        Ok(TypeReference::new(self.class_name(token)?))
    }

    fn lookup_field(&self, token: Token) -> Result<FieldReference> {
        match self.entries.get(token.index()) {
            Some(ConstantPoolEntry::Fieldref {
                class,
                name_and_type,
            }) => {
                let (owner, name, descriptor) = self.member(*class, *name_and_type)?;
                Ok(FieldReference {
                    owner,
                    name: name.to_string(),
                    field_type: JvmType::parse(descriptor)?,
                })
            }
            _ => Err(Self::invalid(token, "Fieldref")),
        }
    }

    fn lookup_method(&self, token: Token) -> Result<MethodReference> {
        let (class, name_and_type, interface) = match self.entries.get(token.index()) {
            Some(ConstantPoolEntry::Methodref {
                class,
                name_and_type,
            }) => (*class, *name_and_type, false),
            Some(ConstantPoolEntry::InterfaceMethodref {
                class,
                name_and_type,
            }) => (*class, *name_and_type, true),
            _ => return Err(Self::invalid(token, "Methodref")),
        };

        let (owner, name, descriptor) = self.member(class, name_and_type)?;
        Ok(MethodReference {
            owner,
            name: name.to_string(),
            descriptor: MethodDescriptor::parse(descriptor)?,
            interface,
        })
    }

    fn lookup_dynamic_call_site(&self, token: Token) -> Result<CallSiteReference> {
        match self.entries.get(token.index()) {
            Some(ConstantPoolEntry::InvokeDynamic {
                bootstrap_index,
                name_and_type,
            }) => {
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Ok(CallSiteReference {
                    bootstrap_index: *bootstrap_index,
                    name: name.to_string(),
                    descriptor: MethodDescriptor::parse(descriptor)?,
                })
            }
            _ => Err(Self::invalid(token, "InvokeDynamic")),
        }
    }

    fn lookup_constant(&self, token: Token) -> Result<Constant> {
        let constant = match self.entries.get(token.index()) {
            Some(ConstantPoolEntry::Integer(value)) => Constant::Integer(*value),
            Some(ConstantPoolEntry::Float(value)) => Constant::Float(*value),
            Some(ConstantPoolEntry::Long(value)) => Constant::Long(*value),
            Some(ConstantPoolEntry::Double(value)) => Constant::Double(*value),
            Some(ConstantPoolEntry::String { value }) => {
                Constant::String(self.utf8(*value)?.to_string())
            }
            Some(ConstantPoolEntry::Class { name }) => {
                Constant::Type(TypeReference::new(self.utf8(*name)?))
            }
            Some(ConstantPoolEntry::MethodType { descriptor }) => {
                Constant::MethodType(MethodDescriptor::parse(self.utf8(*descriptor)?)?)
            }
            Some(ConstantPoolEntry::MethodHandle { kind, reference }) => {
                let target = match kind {
                    1..=4 => HandleTarget::Field(self.lookup_field(*reference)?),
                    5..=9 => HandleTarget::Method(self.lookup_method(*reference)?),
                    _ => {
                        return Err(malformed_error!(
                            "Invalid method handle kind {} at {}",
                            kind,
                            token
                        ))
                    }
                };
                Constant::MethodHandle {
                    kind: *kind,
                    target,
                }
            }
            Some(ConstantPoolEntry::Dynamic {
                bootstrap_index,
                name_and_type,
            }) => {
                let (name, descriptor) = self.name_and_type(*name_and_type)?;
                Constant::Dynamic {
                    bootstrap_index: *bootstrap_index,
                    name: name.to_string(),
                    constant_type: JvmType::parse(descriptor)?,
                }
            }
            _ => return Err(Self::invalid(token, "loadable constant")),
        };

        Ok(constant)
    }

    fn lookup_utf8(&self, token: Token) -> Result<&str> {
        self.utf8(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_bytes() -> Vec<u8> {
        let mut cursor = ByteCursor::with_capacity(64);
        cursor.write_u16(13);
        // #1 Utf8 "java/lang/Object"
        cursor.write_u8(1);
        cursor.write_utf8("java/lang/Object").unwrap();
        // #2 Class #1
        cursor.write_u8(7);
        cursor.write_u16(1);
        // #3 Utf8 "hashCode"
        cursor.write_u8(1);
        cursor.write_utf8("hashCode").unwrap();
        // #4 Utf8 "()I"
        cursor.write_u8(1);
        cursor.write_utf8("()I").unwrap();
        // #5 NameAndType #3:#4
        cursor.write_u8(12);
        cursor.write_u16(3);
        cursor.write_u16(4);
        // #6 Methodref #2.#5
        cursor.write_u8(10);
        cursor.write_u16(2);
        cursor.write_u16(5);
        // #7 Long, occupies #7 and #8
        cursor.write_u8(5);
        cursor.write_i64(-9);
        // #9 String #3
        cursor.write_u8(8);
        cursor.write_u16(3);
        // #10 Float
        cursor.write_u8(4);
        cursor.write_f32(1.5);
        // #11 InterfaceMethodref #2.#5
        cursor.write_u8(11);
        cursor.write_u16(2);
        cursor.write_u16(5);
        // #12 MethodHandle invokeVirtual #6
        cursor.write_u8(15);
        cursor.write_u8(5);
        cursor.write_u16(6);
        cursor.flip();
        cursor.into_bytes()
    }

    #[test]
    fn read_pool() {
        let bytes = pool_bytes();
        let mut cursor = ByteCursor::new(&bytes);
        let pool = ConstantPool::read(&mut cursor).unwrap();

        assert_eq!(pool.len(), 13);
        assert!(!cursor.has_remaining());
        assert_eq!(pool.utf8(Token(1)).unwrap(), "java/lang/Object");
        assert_eq!(pool.class_name(Token(2)).unwrap(), "java/lang/Object");
        assert_eq!(pool.name_and_type(Token(5)).unwrap(), ("hashCode", "()I"));
        assert!(pool.get(Token(8)).is_err());
        assert!(pool.get(Token(0)).is_err());
        assert_eq!(pool.iter().count(), 11);
    }

    #[test]
    fn scope_lookups() {
        let bytes = pool_bytes();
        let pool = ConstantPool::read(&mut ByteCursor::new(&bytes)).unwrap();

        let method = pool.lookup_method(Token(6)).unwrap();
        assert_eq!(method.owner.internal_name, "java/lang/Object");
        assert_eq!(method.name, "hashCode");
        assert_eq!(method.descriptor.return_type, JvmType::Int);
        assert!(!method.interface);
        assert!(pool.lookup_method(Token(11)).unwrap().interface);

        assert_eq!(pool.lookup_constant(Token(7)).unwrap(), Constant::Long(-9));
        assert_eq!(
            pool.lookup_constant(Token(9)).unwrap(),
            Constant::String("hashCode".into())
        );
        assert_eq!(pool.lookup_constant(Token(10)).unwrap(), Constant::Float(1.5));
        assert!(matches!(
            pool.lookup_constant(Token(12)).unwrap(),
            Constant::MethodHandle {
                kind: 5,
                target: HandleTarget::Method(_)
            }
        ));
        assert_eq!(
            pool.lookup_type(Token(2)).unwrap(),
            TypeReference::new("java/lang/Object")
        );
    }

    #[test]
    fn wrong_kind_is_invalid_constant() {
        let bytes = pool_bytes();
        let pool = ConstantPool::read(&mut ByteCursor::new(&bytes)).unwrap();

        assert!(matches!(
            pool.lookup_type(Token(1)),
            Err(Error::InvalidConstant {
                index: Token(1),
                expected: "Class"
            })
        ));
        assert!(pool.lookup_field(Token(6)).is_err());
        assert!(pool.lookup_dynamic_call_site(Token(6)).is_err());
        assert!(pool.lookup_constant(Token(5)).is_err());
        assert!(pool.lookup_utf8(Token(200)).is_err());
    }

    #[test]
    fn unknown_tag_is_malformed() {
        let bytes = [0x00, 0x02, 0x02, 0x00];
        let result = ConstantPool::read(&mut ByteCursor::new(&bytes));
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn truncated_pool_is_out_of_bounds() {
        let bytes = [0x00, 0x03, 0x07, 0x00];
        let result = ConstantPool::read(&mut ByteCursor::new(&bytes));
        assert!(matches!(result, Err(Error::OutOfBounds)));
    }

    #[test]
    fn wide_constant_overrun() {
        let mut cursor = ByteCursor::with_capacity(16);
        cursor.write_u16(2);
        cursor.write_u8(6);
        cursor.write_f64(1.0);
        cursor.flip();
        let bytes = cursor.into_bytes();
        assert!(ConstantPool::read(&mut ByteCursor::new(&bytes)).is_err());
    }
}
