//! Generic signatures.
//!
//! The `Signature` attribute carries the generic form of a class, method or field type,
//! e.g. `<T::Ljava/lang/Comparable<TT;>;>Ljava/lang/Object;`. This module parses the three
//! signature grammars into plain trees. It is purely structural: names are not resolved here
//! (see [`crate::metadata::resolver`]) and no subtyping or erasure is performed.

use std::fmt;

use crate::{
    metadata::descriptor::{JvmType, MAX_ARRAY_DIMENSIONS},
    Result,
};

/// A Java type in a generic signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSignature {
    /// A primitive type, or `void` as a method result
    Base(JvmType),
    /// A possibly parameterized class type
    Class(ClassTypeSignature),
    /// A type variable, `TT;`
    Variable(String),
    /// An array type
    Array(Box<TypeSignature>),
}

/// `Lpkg/Outer<..>.Inner<..>;`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassTypeSignature {
    /// The outermost segment carries the package-qualified internal name; later segments are
    /// the simple names of member classes.
    pub segments: Vec<ClassSegment>,
}

/// One `.`-separated part of a class type signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassSegment {
    /// Segment name
    pub name: String,
    /// Type arguments applied to this segment
    pub arguments: Vec<TypeArgument>,
}

/// A type argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArgument {
    /// `*`
    Wildcard,
    /// `+T`, `? extends T`
    Extends(TypeSignature),
    /// `-T`, `? super T`
    Super(TypeSignature),
    /// An exact type argument
    Exact(TypeSignature),
}

/// A formal type parameter with its bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeParameter {
    /// Parameter name
    pub name: String,
    /// Class bound; absent when the first bound is an interface (`T::Ljava/lang/Runnable;`)
    pub class_bound: Option<TypeSignature>,
    /// Additional interface bounds
    pub interface_bounds: Vec<TypeSignature>,
}

/// Generic signature of a class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassSignature {
    /// Formal type parameters
    pub type_parameters: Vec<TypeParameter>,
    /// Generic super class
    pub superclass: ClassTypeSignature,
    /// Generic super interfaces
    pub interfaces: Vec<ClassTypeSignature>,
}

/// Generic signature of a method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodSignature {
    /// Formal type parameters
    pub type_parameters: Vec<TypeParameter>,
    /// Parameter types
    pub parameters: Vec<TypeSignature>,
    /// Result type, [`TypeSignature::Base`] of [`JvmType::Void`] for `V`
    pub return_type: TypeSignature,
    /// `^` thrown types
    pub throws: Vec<TypeSignature>,
}

impl ClassTypeSignature {
    /// Binary internal name, joining member segments with `$`.
    #[must_use]
    pub fn internal_name(&self) -> String {
        let mut name = String::new();
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                name.push('$');
            }
            name.push_str(&segment.name);
        }
        name
    }

    /// Type arguments of the innermost segment.
    #[must_use]
    pub fn arguments(&self) -> &[TypeArgument] {
        self.segments
            .last()
            .map_or(&[][..], |segment| segment.arguments.as_slice())
    }
}

impl TypeSignature {
    /// Parses a field signature (a reference type signature).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature is invalid or has trailing data.
    pub fn parse_field(signature: &str) -> Result<TypeSignature> {
        let mut parser = SignatureParser::new(signature);
        let parsed = parser.reference_type()?;
        parser.finish()?;
        Ok(parsed)
    }

    /// Number of local-variable slots a value of this type occupies.
    #[must_use]
    pub fn slot_width(&self) -> u16 {
        match self {
            TypeSignature::Base(base) => base.slot_width(),
            _ => 1,
        }
    }
}

impl ClassSignature {
    /// Parses a class signature.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature is invalid or has trailing data.
    pub fn parse(signature: &str) -> Result<ClassSignature> {
        let mut parser = SignatureParser::new(signature);
        let type_parameters = parser.type_parameters()?;
        let superclass = parser.class_type()?;
        let mut interfaces = Vec::new();
        while !parser.at_end() {
            interfaces.push(parser.class_type()?);
        }

        Ok(ClassSignature {
            type_parameters,
            superclass,
            interfaces,
        })
    }
}

impl MethodSignature {
    /// Parses a method signature.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature is invalid or has trailing data.
    pub fn parse(signature: &str) -> Result<MethodSignature> {
        let mut parser = SignatureParser::new(signature);
        let type_parameters = parser.type_parameters()?;

        parser.expect(b'(')?;
        let mut parameters = Vec::new();
        while parser.peek() != Some(b')') {
            parameters.push(parser.java_type(false)?);
        }
        parser.expect(b')')?;

        let return_type = parser.java_type(true)?;

        let mut throws = Vec::new();
        while parser.peek() == Some(b'^') {
            parser.position += 1;
            throws.push(parser.reference_type()?);
        }
        parser.finish()?;

        Ok(MethodSignature {
            type_parameters,
            parameters,
            return_type,
            throws,
        })
    }
}

/// Maximum nesting of reference types (type arguments, bounds and array components).
const MAX_NESTING_DEPTH: usize = 512;

struct SignatureParser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    position: usize,
    depth: usize,
}

impl<'a> SignatureParser<'a> {
    fn new(input: &'a str) -> Self {
        SignatureParser {
            input,
            bytes: input.as_bytes(),
            position: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.position).copied()
    }

    fn at_end(&self) -> bool {
        self.position >= self.bytes.len()
    }

    fn next(&mut self) -> Result<u8> {
        let Some(byte) = self.peek() else {
            return Err(malformed_error!(
                "Signature '{}' ends unexpectedly",
                self.input
            ));
        };
        self.position += 1;
        Ok(byte)
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        let found = self.next()?;
        if found != expected {
            return Err(malformed_error!(
                "Expected '{}' at {} in signature '{}', found '{}'",
                char::from(expected),
                self.position - 1,
                self.input,
                char::from(found)
            ));
        }
        Ok(())
    }

    fn finish(&self) -> Result<()> {
        if !self.at_end() {
            return Err(malformed_error!(
                "Trailing data at {} in signature '{}'",
                self.position,
                self.input
            ));
        }
        Ok(())
    }

    fn identifier(&mut self, allow_slash: bool) -> Result<String> {
        let start = self.position;
        while let Some(byte) = self.peek() {
            match byte {
                b'.' | b';' | b'[' | b'<' | b'>' | b':' => break,
                b'/' if !allow_slash => break,
                _ => self.position += 1,
            }
        }

        if self.position == start {
            return Err(malformed_error!(
                "Empty identifier at {} in signature '{}'",
                start,
                self.input
            ));
        }

        Ok(self.input[start..self.position].to_string())
    }

    fn type_parameters(&mut self) -> Result<Vec<TypeParameter>> {
        let mut parameters = Vec::new();
        if self.peek() != Some(b'<') {
            return Ok(parameters);
        }
        self.position += 1;

        while self.peek() != Some(b'>') {
            let name = self.identifier(false)?;
            self.expect(b':')?;
            let class_bound = match self.peek() {
                Some(b'L' | b'T' | b'[') => Some(self.reference_type()?),
                _ => None,
            };
            let mut interface_bounds = Vec::new();
            while self.peek() == Some(b':') {
                self.position += 1;
                interface_bounds.push(self.reference_type()?);
            }
            parameters.push(TypeParameter {
                name,
                class_bound,
                interface_bounds,
            });
        }
        self.expect(b'>')?;

        if parameters.is_empty() {
            return Err(malformed_error!(
                "Empty type parameter list in signature '{}'",
                self.input
            ));
        }

        Ok(parameters)
    }

    fn java_type(&mut self, allow_void: bool) -> Result<TypeSignature> {
        let base = match self.peek() {
            Some(b'B') => JvmType::Byte,
            Some(b'C') => JvmType::Char,
            Some(b'D') => JvmType::Double,
            Some(b'F') => JvmType::Float,
            Some(b'I') => JvmType::Int,
            Some(b'J') => JvmType::Long,
            Some(b'S') => JvmType::Short,
            Some(b'Z') => JvmType::Boolean,
            Some(b'V') if allow_void => JvmType::Void,
            _ => return self.reference_type(),
        };
        self.position += 1;
        Ok(TypeSignature::Base(base))
    }

    fn reference_type(&mut self) -> Result<TypeSignature> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(malformed_error!(
                "Signature '{}' nests types deeper than {}",
                self.input,
                MAX_NESTING_DEPTH
            ));
        }

        let parsed = self.nested_reference_type();
        self.depth -= 1;
        parsed
    }

    fn nested_reference_type(&mut self) -> Result<TypeSignature> {
        match self.peek() {
            Some(b'L') => Ok(TypeSignature::Class(self.class_type()?)),
            Some(b'T') => {
                self.position += 1;
                let name = self.identifier(false)?;
                self.expect(b';')?;
                Ok(TypeSignature::Variable(name))
            }
            Some(b'[') => {
                let start = self.position;
                while self.peek() == Some(b'[') {
                    self.position += 1;
                }
                let dimensions = self.position - start;
                if dimensions > MAX_ARRAY_DIMENSIONS {
                    return Err(malformed_error!(
                        "Signature '{}' declares {} array dimensions",
                        self.input,
                        dimensions
                    ));
                }

                let element = self.java_type(false)?;
                Ok((0..dimensions).fold(element, |component, _| {
                    TypeSignature::Array(Box::new(component))
                }))
            }
            _ => Err(malformed_error!(
                "Expected a reference type at {} in signature '{}'",
                self.position,
                self.input
            )),
        }
    }

    fn class_type(&mut self) -> Result<ClassTypeSignature> {
        self.expect(b'L')?;

        let mut segments = Vec::new();
        let mut allow_slash = true;
        loop {
            let name = self.identifier(allow_slash)?;
            allow_slash = false;
            let arguments = self.type_arguments()?;
            segments.push(ClassSegment { name, arguments });

            match self.next()? {
                b';' => break,
                b'.' => {}
                other => {
                    return Err(malformed_error!(
                        "Unexpected '{}' in class type of signature '{}'",
                        char::from(other),
                        self.input
                    ))
                }
            }
        }

        Ok(ClassTypeSignature { segments })
    }

    fn type_arguments(&mut self) -> Result<Vec<TypeArgument>> {
        let mut arguments = Vec::new();
        if self.peek() != Some(b'<') {
            return Ok(arguments);
        }
        self.position += 1;

        while self.peek() != Some(b'>') {
            let argument = match self.peek() {
                Some(b'*') => {
                    self.position += 1;
                    TypeArgument::Wildcard
                }
                Some(b'+') => {
                    self.position += 1;
                    TypeArgument::Extends(self.reference_type()?)
                }
                Some(b'-') => {
                    self.position += 1;
                    TypeArgument::Super(self.reference_type()?)
                }
                _ => TypeArgument::Exact(self.reference_type()?),
            };
            arguments.push(argument);
        }
        self.expect(b'>')?;

        if arguments.is_empty() {
            return Err(malformed_error!(
                "Empty type argument list in signature '{}'",
                self.input
            ));
        }

        Ok(arguments)
    }
}

impl fmt::Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSignature::Base(base) => write!(f, "{base}"),
            TypeSignature::Class(class) => write!(f, "{class}"),
            TypeSignature::Variable(name) => write!(f, "{name}"),
            TypeSignature::Array(component) => write!(f, "{component}[]"),
        }
    }
}

impl fmt::Display for ClassTypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, segment) in self.segments.iter().enumerate() {
            if index > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment.name.replace('/', "."))?;
            if !segment.arguments.is_empty() {
                write!(f, "<")?;
                for (position, argument) in segment.arguments.iter().enumerate() {
                    if position > 0 {
                        write!(f, ", ")?;
                    }
                    match argument {
                        TypeArgument::Wildcard => write!(f, "?")?,
                        TypeArgument::Extends(bound) => write!(f, "? extends {bound}")?,
                        TypeArgument::Super(bound) => write!(f, "? super {bound}")?,
                        TypeArgument::Exact(argument) => write!(f, "{argument}")?,
                    }
                }
                write!(f, ">")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_signature_with_recursive_bound() {
        let signature =
            ClassSignature::parse("<T::Ljava/lang/Comparable<TT;>;>Ljava/lang/Object;Ljava/io/Serializable;")
                .unwrap();

        assert_eq!(signature.type_parameters.len(), 1);
        let parameter = &signature.type_parameters[0];
        assert_eq!(parameter.name, "T");
        assert!(parameter.class_bound.is_none());
        assert_eq!(parameter.interface_bounds.len(), 1);
        assert_eq!(
            parameter.interface_bounds[0].to_string(),
            "java.lang.Comparable<T>"
        );
        assert_eq!(signature.superclass.internal_name(), "java/lang/Object");
        assert_eq!(signature.interfaces.len(), 1);
    }

    #[test]
    fn method_signature() {
        let signature = MethodSignature::parse(
            "<K:Ljava/lang/Object;>(TK;[ILjava/util/Map<TK;+Ljava/lang/Number;>;J)TK;^Ljava/io/IOException;^TE;",
        )
        .unwrap();

        assert_eq!(signature.type_parameters[0].name, "K");
        assert_eq!(signature.parameters.len(), 4);
        assert_eq!(signature.parameters[0], TypeSignature::Variable("K".into()));
        assert_eq!(signature.parameters[3].slot_width(), 2);
        assert_eq!(
            signature.parameters[2].to_string(),
            "java.util.Map<K, ? extends java.lang.Number>"
        );
        assert_eq!(signature.return_type, TypeSignature::Variable("K".into()));
        assert_eq!(signature.throws.len(), 2);
    }

    #[test]
    fn void_and_inner_classes() {
        let signature =
            MethodSignature::parse("(Lcom/x/Outer<TT;>.Inner<*>;)V").unwrap();
        assert_eq!(signature.return_type, TypeSignature::Base(JvmType::Void));
        let TypeSignature::Class(class) = &signature.parameters[0] else {
            panic!("expected class type");
        };
        assert_eq!(class.internal_name(), "com/x/Outer$Inner");
        assert_eq!(class.arguments(), &[TypeArgument::Wildcard]);
    }

    #[test]
    fn field_signature() {
        let parsed = TypeSignature::parse_field("[Ljava/util/List<-TT;>;").unwrap();
        assert_eq!(parsed.to_string(), "java.util.List<? super T>[]");
        assert!(TypeSignature::parse_field("I").is_err());
    }

    #[test]
    fn malformed_signatures() {
        assert!(ClassSignature::parse("<>Ljava/lang/Object;").is_err());
        assert!(ClassSignature::parse("Ljava/lang/Object").is_err());
        assert!(MethodSignature::parse("(V)V").is_err());
        assert!(MethodSignature::parse("(I)").is_err());
        assert!(MethodSignature::parse("()Vx").is_err());
        assert!(TypeSignature::parse_field("Ljava/util/List<>;").is_err());
        assert!(TypeSignature::parse_field("T;").is_err());
    }

    #[test]
    fn nesting_is_bounded() {
        let arrays = format!("{}I", "[".repeat(60_000));
        assert!(matches!(
            TypeSignature::parse_field(&arrays),
            Err(crate::Error::Malformed { .. })
        ));
        assert!(TypeSignature::parse_field(&format!("{}I", "[".repeat(MAX_ARRAY_DIMENSIONS))).is_ok());

        let arguments = format!("{}{}", "Ljava/util/List<".repeat(2_000), ">;".repeat(2_000));
        assert!(matches!(
            TypeSignature::parse_field(&arguments),
            Err(crate::Error::Malformed { .. })
        ));
        let bounded = format!("{}TT;{}", "Ljava/util/List<".repeat(100), ">;".repeat(100));
        assert!(TypeSignature::parse_field(&bounded).is_ok());

        let method = format!("({})V", arguments);
        assert!(MethodSignature::parse(&method).is_err());
    }
}
