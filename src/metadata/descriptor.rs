//! Field and method descriptors.
//!
//! Descriptors are the erased, always-present type strings of the class-file format:
//! `I`, `Ljava/lang/String;`, `[[D`, `(ILjava/lang/Object;)V`. This module parses them into
//! [`JvmType`] and [`MethodDescriptor`] and knows how many local-variable slots each type
//! occupies.

use std::fmt;

use crate::Result;

/// Maximum number of array dimensions a descriptor may declare.
pub const MAX_ARRAY_DIMENSIONS: usize = 255;

/// A type as written in a field descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum JvmType {
    /// `B`
    Byte,
    /// `C`
    Char,
    /// `D`
    Double,
    /// `F`
    Float,
    /// `I`
    Int,
    /// `J`
    Long,
    /// `S`
    Short,
    /// `Z`
    Boolean,
    /// `V`, only valid as a method return type
    Void,
    /// `L<internal name>;`
    Object(String),
    /// `[<component>`
    Array(Box<JvmType>),
}

impl JvmType {
    /// Parses a complete field descriptor.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the descriptor is empty, has trailing data, or is
    /// otherwise invalid.
    pub fn parse(descriptor: &str) -> Result<JvmType> {
        let mut position = 0;
        let parsed = Self::parse_at(descriptor.as_bytes(), &mut position)?;
        if position != descriptor.len() {
            return Err(malformed_error!(
                "Trailing data in field descriptor '{}'",
                descriptor
            ));
        }
        if parsed == JvmType::Void {
            return Err(malformed_error!("'V' is not a field type"));
        }

        Ok(parsed)
    }

    /// Parses one type at `position`, advancing past it. Accepts `V`.
    pub(crate) fn parse_at(bytes: &[u8], position: &mut usize) -> Result<JvmType> {
        let Some(&tag) = bytes.get(*position) else {
            return Err(malformed_error!("Descriptor ends unexpectedly"));
        };
        *position += 1;

        let parsed = match tag {
            b'B' => JvmType::Byte,
            b'C' => JvmType::Char,
            b'D' => JvmType::Double,
            b'F' => JvmType::Float,
            b'I' => JvmType::Int,
            b'J' => JvmType::Long,
            b'S' => JvmType::Short,
            b'Z' => JvmType::Boolean,
            b'V' => JvmType::Void,
            b'L' => {
                let start = *position;
                let Some(length) = bytes[start..].iter().position(|&b| b == b';') else {
                    return Err(malformed_error!("Unterminated class type in descriptor"));
                };
                if length == 0 {
                    return Err(malformed_error!("Empty class name in descriptor"));
                }
                *position = start + length + 1;
                JvmType::Object(String::from_utf8_lossy(&bytes[start..start + length]).into_owned())
            }
            b'[' => {
                let mut dimensions = 1;
                while bytes.get(*position) == Some(&b'[') {
                    dimensions += 1;
                    *position += 1;
                }
                if dimensions > MAX_ARRAY_DIMENSIONS {
                    return Err(malformed_error!(
                        "Array descriptor has {} dimensions, at most {} allowed",
                        dimensions,
                        MAX_ARRAY_DIMENSIONS
                    ));
                }

                let element = Self::parse_at(bytes, position)?;
                if element == JvmType::Void {
                    return Err(malformed_error!("Array of void in descriptor"));
                }
                (0..dimensions).fold(element, |component, _| JvmType::Array(Box::new(component)))
            }
            other => {
                return Err(malformed_error!(
                    "Invalid descriptor character '{}'",
                    char::from(other)
                ))
            }
        };

        Ok(parsed)
    }

    /// Interprets a `CONSTANT_Class` name: array classes are named by their descriptor,
    /// everything else by its internal name.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an invalid array descriptor.
    pub fn from_class_name(name: &str) -> Result<JvmType> {
        if name.starts_with('[') {
            Self::parse(name)
        } else {
            Ok(JvmType::Object(name.to_string()))
        }
    }

    /// Maps a `newarray` element-type code to its primitive type.
    #[must_use]
    pub fn from_array_type_code(code: u8) -> Option<JvmType> {
        match code {
            4 => Some(JvmType::Boolean),
            5 => Some(JvmType::Char),
            6 => Some(JvmType::Float),
            7 => Some(JvmType::Double),
            8 => Some(JvmType::Byte),
            9 => Some(JvmType::Short),
            10 => Some(JvmType::Int),
            11 => Some(JvmType::Long),
            _ => None,
        }
    }

    /// Number of local-variable slots a value of this type occupies.
    #[must_use]
    pub fn slot_width(&self) -> u16 {
        match self {
            JvmType::Long | JvmType::Double => 2,
            JvmType::Void => 0,
            _ => 1,
        }
    }

    /// `true` for class and array types.
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, JvmType::Object(_) | JvmType::Array(_))
    }

    /// `true` for the eight primitive value types.
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        !self.is_reference() && *self != JvmType::Void
    }

    /// Renders the type back into descriptor form.
    #[must_use]
    pub fn descriptor(&self) -> String {
        let mut out = String::new();
        self.write_descriptor(&mut out);
        out
    }

    fn write_descriptor(&self, out: &mut String) {
        match self {
            JvmType::Byte => out.push('B'),
            JvmType::Char => out.push('C'),
            JvmType::Double => out.push('D'),
            JvmType::Float => out.push('F'),
            JvmType::Int => out.push('I'),
            JvmType::Long => out.push('J'),
            JvmType::Short => out.push('S'),
            JvmType::Boolean => out.push('Z'),
            JvmType::Void => out.push('V'),
            JvmType::Object(name) => {
                out.push('L');
                out.push_str(name);
                out.push(';');
            }
            JvmType::Array(component) => {
                out.push('[');
                component.write_descriptor(out);
            }
        }
    }
}

impl fmt::Display for JvmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JvmType::Byte => write!(f, "byte"),
            JvmType::Char => write!(f, "char"),
            JvmType::Double => write!(f, "double"),
            JvmType::Float => write!(f, "float"),
            JvmType::Int => write!(f, "int"),
            JvmType::Long => write!(f, "long"),
            JvmType::Short => write!(f, "short"),
            JvmType::Boolean => write!(f, "boolean"),
            JvmType::Void => write!(f, "void"),
            JvmType::Object(name) => write!(f, "{}", name.replace('/', ".")),
            JvmType::Array(component) => write!(f, "{component}[]"),
        }
    }
}

/// A parsed method descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Parameter types in declaration order
    pub parameters: Vec<JvmType>,
    /// Return type, possibly [`JvmType::Void`]
    pub return_type: JvmType,
}

impl MethodDescriptor {
    /// Parses a method descriptor such as `(IJLjava/lang/String;)V`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the descriptor is invalid.
    pub fn parse(descriptor: &str) -> Result<MethodDescriptor> {
        let bytes = descriptor.as_bytes();
        if bytes.first() != Some(&b'(') {
            return Err(malformed_error!(
                "Method descriptor '{}' does not start with '('",
                descriptor
            ));
        }

        let mut position = 1;
        let mut parameters = Vec::new();
        loop {
            match bytes.get(position) {
                Some(b')') => {
                    position += 1;
                    break;
                }
                Some(_) => {
                    let parameter = JvmType::parse_at(bytes, &mut position)?;
                    if parameter == JvmType::Void {
                        return Err(malformed_error!("Void parameter in '{}'", descriptor));
                    }
                    parameters.push(parameter);
                }
                None => {
                    return Err(malformed_error!(
                        "Unterminated parameter list in '{}'",
                        descriptor
                    ))
                }
            }
        }

        let return_type = JvmType::parse_at(bytes, &mut position)?;
        if position != bytes.len() {
            return Err(malformed_error!(
                "Trailing data in method descriptor '{}'",
                descriptor
            ));
        }

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }

    /// Total slots used by the parameters, excluding any `this`.
    #[must_use]
    pub fn parameter_slots(&self) -> u16 {
        self.parameters.iter().map(JvmType::slot_width).sum()
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for parameter in &self.parameters {
            write!(f, "{}", parameter.descriptor())?;
        }
        write!(f, "){}", self.return_type.descriptor())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_field_descriptors() {
        assert_eq!(JvmType::parse("I").unwrap(), JvmType::Int);
        assert_eq!(
            JvmType::parse("Ljava/lang/String;").unwrap(),
            JvmType::Object("java/lang/String".into())
        );
        assert_eq!(
            JvmType::parse("[[J").unwrap(),
            JvmType::Array(Box::new(JvmType::Array(Box::new(JvmType::Long))))
        );
    }

    #[test]
    fn reject_bad_field_descriptors() {
        assert!(JvmType::parse("").is_err());
        assert!(JvmType::parse("V").is_err());
        assert!(JvmType::parse("II").is_err());
        assert!(JvmType::parse("Ljava/lang/String").is_err());
        assert!(JvmType::parse("L;").is_err());
        assert!(JvmType::parse("[V").is_err());
        assert!(JvmType::parse("Q").is_err());
    }

    #[test]
    fn array_dimensions_are_bounded() {
        let deepest = format!("{}I", "[".repeat(MAX_ARRAY_DIMENSIONS));
        let mut parsed = JvmType::parse(&deepest).unwrap();
        let mut dimensions = 0;
        while let JvmType::Array(component) = parsed {
            parsed = *component;
            dimensions += 1;
        }
        assert_eq!(dimensions, MAX_ARRAY_DIMENSIONS);
        assert_eq!(parsed, JvmType::Int);

        let too_deep = format!("{}I", "[".repeat(MAX_ARRAY_DIMENSIONS + 1));
        assert!(matches!(JvmType::parse(&too_deep), Err(crate::Error::Malformed { .. })));

        let hostile = format!("{}I", "[".repeat(60_000));
        assert!(matches!(JvmType::parse(&hostile), Err(crate::Error::Malformed { .. })));
        assert!(MethodDescriptor::parse(&format!("({hostile})V")).is_err());
    }

    #[test]
    fn slot_widths() {
        assert_eq!(JvmType::Long.slot_width(), 2);
        assert_eq!(JvmType::Double.slot_width(), 2);
        assert_eq!(JvmType::Int.slot_width(), 1);
        assert_eq!(JvmType::Array(Box::new(JvmType::Long)).slot_width(), 1);
        assert_eq!(JvmType::Void.slot_width(), 0);
    }

    #[test]
    fn parse_method_descriptor() {
        let descriptor = MethodDescriptor::parse("(IJ[Ljava/lang/Object;D)Ljava/lang/String;").unwrap();
        assert_eq!(descriptor.parameters.len(), 4);
        assert_eq!(descriptor.parameters[1], JvmType::Long);
        assert_eq!(descriptor.parameter_slots(), 6);
        assert_eq!(
            descriptor.return_type,
            JvmType::Object("java/lang/String".into())
        );
        assert_eq!(
            descriptor.to_string(),
            "(IJ[Ljava/lang/Object;D)Ljava/lang/String;"
        );

        let void = MethodDescriptor::parse("()V").unwrap();
        assert!(void.parameters.is_empty());
        assert_eq!(void.return_type, JvmType::Void);
    }

    #[test]
    fn reject_bad_method_descriptors() {
        assert!(MethodDescriptor::parse("V").is_err());
        assert!(MethodDescriptor::parse("(I").is_err());
        assert!(MethodDescriptor::parse("(V)V").is_err());
        assert!(MethodDescriptor::parse("()").is_err());
        assert!(MethodDescriptor::parse("()VV").is_err());
    }

    #[test]
    fn display_and_class_names() {
        assert_eq!(
            JvmType::parse("[Ljava/util/List;").unwrap().to_string(),
            "java.util.List[]"
        );
        assert_eq!(
            JvmType::from_class_name("[I").unwrap(),
            JvmType::Array(Box::new(JvmType::Int))
        );
        assert_eq!(
            JvmType::from_class_name("a/B").unwrap(),
            JvmType::Object("a/B".into())
        );
        assert_eq!(JvmType::from_array_type_code(10), Some(JvmType::Int));
        assert_eq!(JvmType::from_array_type_code(3), None);
    }
}
