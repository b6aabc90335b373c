//! Raw class-file input and byte-level codecs.
//!
//! This module owns the bytes a class is decoded from and the primitives used to read them.
//!
//! # Key Components
//!
//! - [`crate::file::File`] - An immutable, shareable view of the input bytes
//! - [`crate::file::Backend`] - Trait for data sources (memory-mapped files, owned buffers)
//! - [`crate::file::cursor::ByteCursor`] - Bounds-checked big-endian reader/writer with the
//!   modified UTF-8 string codec
//! - [`crate::file::io`] - The [`crate::file::io::ClassIO`] trait and free big-endian helpers
//!
//! # Examples
//!
//! ```rust
//! use cafescope::file::File;
//!
//! let file = File::from_mem(vec![0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x00, 0x00, 0x34])?;
//! let mut cursor = file.cursor();
//! assert_eq!(cursor.read_u32()?, 0xCAFE_BABE);
//! assert_eq!(file.data_slice(6, 2)?, &[0x00, 0x34]);
//! # Ok::<(), cafescope::Error>(())
//! ```

pub mod cursor;
pub mod io;

mod memory;
mod physical;

use std::path::Path;

use crate::{Error::Empty, Result};
use cursor::ByteCursor;
use memory::Memory;
use physical::Physical;

/// Source of raw class bytes.
///
/// Implementations must be thread-safe; a [`File`] is shared by every method of a class and
/// may be read from several threads while bodies are decoded in parallel.
pub trait Backend: Send + Sync {
    /// Returns `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the data.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize;
}

/// The bytes of one class file, independent of where they came from.
pub struct File {
    data: Box<dyn Backend>,
}

impl File {
    /// Memory-maps the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or mapped, and
    /// [`crate::Error::Empty`] if it has no content.
    pub fn from_file(path: &Path) -> Result<File> {
        Self::load(Physical::new(path)?)
    }

    /// Takes ownership of an in-memory buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Empty`] if `data` is empty.
    pub fn from_mem(data: Vec<u8>) -> Result<File> {
        Self::load(Memory::new(data))
    }

    fn load<T: Backend + 'static>(data: T) -> Result<File> {
        if data.len() == 0 {
            return Err(Empty);
        }

        Ok(File {
            data: Box::new(data),
        })
    }

    /// Total size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always `false`; empty inputs are rejected on load.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// The complete input.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the data.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }

    /// A read cursor over the whole input.
    #[must_use]
    pub fn cursor(&self) -> ByteCursor<'_> {
        ByteCursor::new(self.data.data())
    }

    /// A read cursor over `len` bytes starting at `offset`, with positions relative to `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the data.
    pub fn cursor_at(&self, offset: usize, len: usize) -> Result<ByteCursor<'_>> {
        Ok(ByteCursor::new(self.data.data_slice(offset, len)?))
    }
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File").field("len", &self.len()).finish()
    }
}
