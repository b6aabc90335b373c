//! Crate-internal test support.
//!
//! Builders here assemble class-file bytes through [`crate::file::cursor::ByteCursor`] writes,
//! so tests can describe a class in a few lines instead of hand-encoding a constant pool.

mod builders;

pub use builders::*;
