//! The per-class resolver frame.
//!
//! While one class is being decoded, its own type, the types it declares or is declared in,
//! and the generic parameters currently in scope are interned into a [`ResolverFrame`]. Type
//! references in descriptors and signatures then resolve against the frame:
//!
//! - class names of interned types become [`ResolvedType::Local`] arena handles, so a class
//!   whose signature mentions itself (`Node<T extends Node<T>>`) resolves without the type
//!   being finished first
//! - type variables resolve to the innermost declaring scope (method before class)
//! - everything else stays a symbolic [`ResolvedType::External`] reference
//!
//! A frame belongs to exactly one class decode and is dropped when it finishes.

use std::collections::HashMap;

use crate::metadata::{
    descriptor::JvmType,
    signature::{ClassTypeSignature, TypeArgument, TypeParameter, TypeSignature},
    types::TypeId,
};

/// The declaration that introduces a generic parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenericOwner {
    /// A class type parameter
    Type(TypeId),
    /// A method type parameter, by method index within the class
    Method(usize),
}

/// A type resolved against the frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedType {
    /// A primitive or `void`
    Primitive(JvmType),
    /// A type defined in the class file being decoded
    Local {
        /// Arena handle
        id: TypeId,
        /// Type arguments, empty for raw use
        arguments: Vec<ResolvedArgument>,
    },
    /// A type defined elsewhere
    External {
        /// Internal name
        name: String,
        /// Type arguments, empty for raw use
        arguments: Vec<ResolvedArgument>,
    },
    /// A declared generic parameter
    Variable {
        /// Declaring class or method
        owner: GenericOwner,
        /// Position in the declaring parameter list
        position: usize,
        /// Parameter name
        name: String,
    },
    /// A type variable with no declaration in scope
    Unbound(String),
    /// An array of the component type
    Array(Box<ResolvedType>),
}

/// A resolved type argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedArgument {
    /// `?`
    Wildcard,
    /// `? extends T`
    Extends(ResolvedType),
    /// `? super T`
    Super(ResolvedType),
    /// `T`
    Exact(ResolvedType),
}

/// A generic parameter with resolved bounds.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenericParameter {
    /// Parameter name
    pub name: String,
    /// Declaring class or method
    pub owner: GenericOwner,
    /// Position in the declaring parameter list
    pub position: usize,
    /// Class bound first (if any), then interface bounds
    pub bounds: Vec<ResolvedType>,
}

impl ResolvedType {
    /// The internal name of a local or external class type.
    #[must_use]
    pub fn class_name<'a>(&'a self, types: &'a [crate::metadata::types::TypeDefinition]) -> Option<&'a str> {
        match self {
            ResolvedType::Local { id, .. } => types.get(id.index()).map(|t| t.internal_name.as_str()),
            ResolvedType::External { name, .. } => Some(name),
            _ => None,
        }
    }

    /// `true` for `long` and `double`.
    #[must_use]
    pub fn is_wide(&self) -> bool {
        matches!(self, ResolvedType::Primitive(JvmType::Long | JvmType::Double))
    }
}

struct GenericScope {
    owner: GenericOwner,
    names: Vec<String>,
}

/// Interned types and generic scopes for the class currently being decoded.
#[derive(Default)]
pub struct ResolverFrame {
    types: HashMap<String, TypeId>,
    scopes: Vec<GenericScope>,
}

impl ResolverFrame {
    /// Creates an empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `internal_name` resolve to the local type `id`.
    pub fn intern_type(&mut self, internal_name: &str, id: TypeId) {
        self.types.entry(internal_name.to_string()).or_insert(id);
    }

    /// Returns the local handle for `internal_name`, if interned.
    #[must_use]
    pub fn local_type(&self, internal_name: &str) -> Option<TypeId> {
        self.types.get(internal_name).copied()
    }

    /// Number of open generic scopes.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Opens a generic scope for `owner` and declares `parameters` in it.
    ///
    /// All names are declared before any bound is resolved, so bounds may refer to the
    /// parameter itself or to later siblings.
    pub fn push_scope(
        &mut self,
        owner: GenericOwner,
        parameters: &[TypeParameter],
    ) -> Vec<GenericParameter> {
        self.scopes.push(GenericScope {
            owner,
            names: parameters.iter().map(|p| p.name.clone()).collect(),
        });

        parameters
            .iter()
            .enumerate()
            .map(|(position, parameter)| GenericParameter {
                name: parameter.name.clone(),
                owner,
                position,
                bounds: parameter
                    .class_bound
                    .iter()
                    .chain(parameter.interface_bounds.iter())
                    .map(|bound| self.resolve(bound))
                    .collect(),
            })
            .collect()
    }

    /// Closes the innermost generic scope.
    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Resolves a type variable name, innermost scope first.
    #[must_use]
    pub fn lookup_variable(&self, name: &str) -> ResolvedType {
        for scope in self.scopes.iter().rev() {
            if let Some(position) = scope.names.iter().position(|n| n == name) {
                return ResolvedType::Variable {
                    owner: scope.owner,
                    position,
                    name: name.to_string(),
                };
            }
        }

        ResolvedType::Unbound(name.to_string())
    }

    /// Resolves a class by internal name, without type arguments.
    #[must_use]
    pub fn resolve_name(&self, internal_name: &str) -> ResolvedType {
        self.class_type(internal_name, Vec::new())
    }

    fn class_type(&self, internal_name: &str, arguments: Vec<ResolvedArgument>) -> ResolvedType {
        match self.local_type(internal_name) {
            Some(id) => ResolvedType::Local { id, arguments },
            None => ResolvedType::External {
                name: internal_name.to_string(),
                arguments,
            },
        }
    }

    /// Resolves an erased descriptor type.
    #[must_use]
    pub fn resolve_descriptor(&self, descriptor: &JvmType) -> ResolvedType {
        match descriptor {
            JvmType::Object(name) => self.resolve_name(name),
            JvmType::Array(component) => {
                ResolvedType::Array(Box::new(self.resolve_descriptor(component)))
            }
            primitive => ResolvedType::Primitive(primitive.clone()),
        }
    }

    /// Resolves a generic type signature.
    #[must_use]
    pub fn resolve(&self, signature: &TypeSignature) -> ResolvedType {
        match signature {
            TypeSignature::Base(base) => ResolvedType::Primitive(base.clone()),
            TypeSignature::Class(class) => self.resolve_class(class),
            TypeSignature::Variable(name) => self.lookup_variable(name),
            TypeSignature::Array(component) => {
                ResolvedType::Array(Box::new(self.resolve(component)))
            }
        }
    }

    /// Resolves a class type signature; arguments are taken from the innermost segment.
    #[must_use]
    pub fn resolve_class(&self, class: &ClassTypeSignature) -> ResolvedType {
        let arguments = class
            .arguments()
            .iter()
            .map(|argument| match argument {
                TypeArgument::Wildcard => ResolvedArgument::Wildcard,
                TypeArgument::Extends(bound) => ResolvedArgument::Extends(self.resolve(bound)),
                TypeArgument::Super(bound) => ResolvedArgument::Super(self.resolve(bound)),
                TypeArgument::Exact(argument) => ResolvedArgument::Exact(self.resolve(argument)),
            })
            .collect();

        self.class_type(&class.internal_name(), arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::signature::{ClassSignature, MethodSignature};

    #[test]
    fn self_referential_bound_resolves_locally() {
        let signature =
            ClassSignature::parse("<T:Lcom/x/Node<TT;>;>Ljava/lang/Object;").unwrap();

        let mut frame = ResolverFrame::new();
        frame.intern_type("com/x/Node", TypeId(0));
        let parameters = frame.push_scope(GenericOwner::Type(TypeId(0)), &signature.type_parameters);

        assert_eq!(parameters.len(), 1);
        assert_eq!(
            parameters[0].bounds[0],
            ResolvedType::Local {
                id: TypeId(0),
                arguments: vec![ResolvedArgument::Exact(ResolvedType::Variable {
                    owner: GenericOwner::Type(TypeId(0)),
                    position: 0,
                    name: "T".into(),
                })],
            }
        );
        assert_eq!(
            frame.resolve_class(&signature.superclass),
            ResolvedType::External {
                name: "java/lang/Object".into(),
                arguments: Vec::new(),
            }
        );
    }

    #[test]
    fn sibling_parameters_declared_before_bounds() {
        let signature = MethodSignature::parse("<A:TB;B:Ljava/lang/Object;>(TA;)V").unwrap();
        let mut frame = ResolverFrame::new();
        let parameters = frame.push_scope(GenericOwner::Method(3), &signature.type_parameters);

        assert_eq!(
            parameters[0].bounds[0],
            ResolvedType::Variable {
                owner: GenericOwner::Method(3),
                position: 1,
                name: "B".into(),
            }
        );
    }

    #[test]
    fn method_scope_shadows_class_scope() {
        let class = ClassSignature::parse("<T:Ljava/lang/Object;>Ljava/lang/Object;").unwrap();
        let method = MethodSignature::parse("<T:Ljava/lang/Object;>()TT;").unwrap();

        let mut frame = ResolverFrame::new();
        frame.push_scope(GenericOwner::Type(TypeId(0)), &class.type_parameters);
        frame.push_scope(GenericOwner::Method(0), &method.type_parameters);
        assert_eq!(frame.depth(), 2);
        assert!(matches!(
            frame.resolve(&method.return_type),
            ResolvedType::Variable {
                owner: GenericOwner::Method(0),
                ..
            }
        ));

        frame.pop_scope();
        assert!(matches!(
            frame.lookup_variable("T"),
            ResolvedType::Variable {
                owner: GenericOwner::Type(_),
                ..
            }
        ));

        frame.pop_scope();
        assert_eq!(frame.lookup_variable("T"), ResolvedType::Unbound("T".into()));
    }

    #[test]
    fn descriptors_resolve_arrays_and_primitives() {
        let mut frame = ResolverFrame::new();
        frame.intern_type("a/Outer$Inner", TypeId(2));

        let resolved = frame.resolve_descriptor(&JvmType::parse("[La/Outer$Inner;").unwrap());
        assert_eq!(
            resolved,
            ResolvedType::Array(Box::new(ResolvedType::Local {
                id: TypeId(2),
                arguments: Vec::new(),
            }))
        );
        assert!(frame.resolve_descriptor(&JvmType::Long).is_wide());
    }
}
