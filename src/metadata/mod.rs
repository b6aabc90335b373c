//! Class-file structure for JVM classes.
//!
//! This module contains everything needed to read a `.class` image into a [`classfile::ClassFile`]:
//! the constant pool and the symbol scope backed by it, descriptor and generic signature
//! grammars, the per-class resolver frame, member definitions, and attribute decoding.
//!
//! # Key Components
//!
//! - [`classfile`] - [`classfile::ClassFile`] and the two-phase class reader
//! - [`constpool`] - Constant pool parsing; implements [`scope::SymbolScope`]
//! - [`method`] - Method definitions, parameters and lazy body materialization
//! - [`signature`] / [`resolver`] - Generic signatures and their resolution against the class
//! - [`code`] - The inflated `Code` attribute
//!
//! # Examples
//!
//! ```rust,no_run
//! use cafescope::ClassFile;
//!
//! let class = ClassFile::from_file("Foo.class".as_ref())?;
//! println!("{} extends {:?}", class.name(), class.super_name());
//! for method in class.methods() {
//!     println!("{} ({} parameters)", method.full_name(), method.parameters.len());
//! }
//! # Ok::<(), cafescope::Error>(())
//! ```

/// Attribute framing and the eagerly decoded structural attributes
pub mod attributes;
/// Bounded memoization of decoded method bodies
pub mod cache;
/// The class file and its two-phase reader
pub mod classfile;
/// The inflated `Code` attribute
pub mod code;
/// Constant pool parsing and lookup
pub mod constpool;
/// Field and method descriptors
pub mod descriptor;
/// Field definitions
pub mod field;
/// Method definitions
pub mod method;
/// The per-class resolver frame
pub mod resolver;
/// Symbol resolution scope and symbolic references
pub mod scope;
/// Generic signature grammar
pub mod signature;
/// Constant pool indices
pub mod token;
/// Class access flags and the type arena
pub mod types;
