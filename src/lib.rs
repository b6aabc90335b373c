// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

//! # cafescope
//!
//! A structural front-end for JVM class files, written for decompilers and bytecode analysis
//! tools. `cafescope` turns raw `.class` bytes into a typed class structure and, on demand,
//! into method bodies: an offset-addressable instruction sequence with every branch resolved,
//! a local-variable table with every load and store bound, and structured exception handlers
//! recovered from the flat exception table through dominance analysis.
//!
//! ## Features
//!
//! - **Bounds-checked decoding** - Every read goes through [`file::cursor::ByteCursor`], so
//!   malformed length fields produce errors instead of panics or unbounded loops
//! - **Two-phase class reading** - Cheap structural attributes are decoded eagerly; `Code`,
//!   `Exceptions` and unknown attributes stay opaque until requested
//! - **Lazy, memoized bodies** - Method bodies are decoded on first access and kept in a
//!   bounded per-class cache
//! - **Exception region recovery** - Try and handler extents rebuilt from a control-flow graph
//!   with dominator and dominance-frontier analysis
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cafescope::prelude::*;
//!
//! let class = ClassFile::from_file("Foo.class".as_ref())?;
//! println!("{} ({} methods)", class.name(), class.methods().len());
//!
//! for method in class.methods() {
//!     if let Some(body) = method.body()? {
//!         println!("{}: {} instructions", method.full_name(), body.instructions.len());
//!         for handler in &body.handlers {
//!             println!("    {handler}");
//!         }
//!     }
//! }
//! # Ok::<(), cafescope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`file`] - Input backends and the byte cursor with its big-endian and modified UTF-8 codecs
//! - [`metadata`] - Constant pool, descriptors, signatures and the structural class reader
//! - [`disassembler`] - Opcode table, instruction decoder and variable binder
//! - [`analysis`] - Control-flow graph and the exception handler mapper
//! - [`utils`] - Generic directed graph and its algorithms
//! - [`prelude`] - Convenient re-exports of commonly used types
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T>`] with [`Error`]. A wrong magic number fails the
//! whole load. Failures while decoding one method body are wrapped in
//! [`Error::MethodDecode`], which names the method; loading a class structurally never decodes
//! bytecode unless [`LoaderConfig::eager_bodies`] is set.
//!
//! ## Logging
//!
//! Diagnostics go through the [`log`] facade. Recovered conditions (branches past the end of
//! the code, out-of-range local slots, unparseable generic signatures) are logged at `warn`;
//! class and body decoding at `debug`. The library never installs a logger.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(clippy::too_many_arguments)]

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust,no_run
/// use cafescope::prelude::*;
///
/// let class = ClassFile::from_file("Foo.class".as_ref())?;
/// let bodies = class.decode_all_bodies()?;
/// println!("{} bodies", bodies.iter().flatten().count());
/// # Ok::<(), cafescope::Error>(())
/// ```
pub mod prelude;

/// Loader configuration and presets.
pub mod config;

/// Raw input and byte-level codecs.
///
/// - [`File`] - Class data from memory or a memory-mapped file
/// - [`file::cursor::ByteCursor`] - Bounds-checked, growable big-endian cursor
/// - [`file::io`] - Big-endian primitive I/O helpers
pub mod file;

/// Class-file structure: constant pool, descriptors, signatures, members and attributes.
///
/// The entry point is [`ClassFile`], which validates the magic number, parses the constant pool
/// and reads all members in two phases. See [`metadata::classfile`] for details.
///
/// # Examples
///
/// ```rust,no_run
/// use cafescope::ClassFile;
///
/// let class = ClassFile::from_file("Foo.class".as_ref())?;
/// for field in class.fields() {
///     println!("{} {}", field.field_type, field.name);
/// }
/// for nested in class.nested_types() {
///     println!("nested: {}", nested.internal_name);
/// }
/// # Ok::<(), cafescope::Error>(())
/// ```
pub mod metadata;

/// JVM bytecode decoding and local variable binding.
///
/// # Examples
///
/// ```rust
/// use cafescope::disassembler::{decode_instructions, Operand};
/// use cafescope::metadata::constpool::ConstantPool;
///
/// // iconst_0; istore_1; goto +3; iload_1; ireturn
/// let code = [0x03, 0x3C, 0xA7, 0x00, 0x03, 0x1B, 0xAC];
/// let instructions = decode_instructions(&code, &ConstantPool::default())?;
///
/// assert_eq!(instructions.len(), 5);
/// assert!(matches!(instructions[2].operand, Operand::Target(target) if target.index() == 3));
/// # Ok::<(), cafescope::Error>(())
/// ```
pub mod disassembler;

/// Control-flow graphs and exception handler recovery.
pub mod analysis;

/// Generic utilities: the directed graph and its algorithms.
pub mod utils;

/// `cafescope` Result type
///
/// A type alias for `std::result::Result<T, Error>` where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `cafescope` Error type
///
/// # Example
///
/// ```rust,no_run
/// use cafescope::{ClassFile, Error};
///
/// match ClassFile::from_file("Foo.class".as_ref()) {
///     Ok(class) => println!("Loaded {}", class.name()),
///     Err(Error::InvalidMagic(magic)) => println!("Not a class file: {magic:#010x}"),
///     Err(Error::Malformed { message, .. }) => println!("Malformed: {message}"),
///     Err(e) => println!("Error: {e}"),
/// }
/// ```
pub use error::Error;

/// Main entry point for working with class files.
///
/// See [`metadata::classfile::ClassFile`] for structural access and body materialization.
pub use metadata::classfile::ClassFile;

/// Options for [`ClassFile::from_mem_with_config`] and [`ClassFile::from_file_with_config`].
pub use config::LoaderConfig;

/// Input and cursor types.
pub use file::{cursor::ByteCursor, File};
