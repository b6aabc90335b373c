//! Big-endian primitive I/O for class-file data.
//!
//! Every multi-byte quantity in a class file is stored big-endian. This module provides the
//! [`ClassIO`] trait, implemented for all fixed-width primitives, and free functions that
//! read or write such values at a moving offset with bounds checking. The
//! [`crate::file::cursor::ByteCursor`] builds on these.
//!
//! # Examples
//!
//! ```rust
//! use cafescope::file::io::{read_be_at, write_be_at};
//!
//! let mut data = [0u8; 6];
//! let mut offset = 0;
//! write_be_at(&mut data, &mut offset, 0xCAFE_u16)?;
//! write_be_at(&mut data, &mut offset, -2_i32)?;
//! assert_eq!(data, [0xCA, 0xFE, 0xFF, 0xFF, 0xFF, 0xFE]);
//!
//! let mut offset = 0;
//! assert_eq!(read_be_at::<u16>(&data, &mut offset)?, 0xCAFE);
//! assert_eq!(read_be_at::<i32>(&data, &mut offset)?, -2);
//! # Ok::<(), cafescope::Error>(())
//! ```

use crate::{Error::OutOfBounds, Result};

/// Trait for primitives that can be encoded to and decoded from big-endian bytes.
///
/// Floating point values go through their IEEE-754 bit patterns, so a `f32` is read as
/// the `u32` bits and reinterpreted, and a `f64` likewise through `u64`.
pub trait ClassIO: Sized + Copy {
    /// Fixed-size byte representation of the type.
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Decode from big-endian bytes.
    fn from_be_bytes(bytes: Self::Bytes) -> Self;

    /// Encode into big-endian bytes.
    fn to_be_bytes(self) -> Self::Bytes;
}

macro_rules! impl_class_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl ClassIO for $ty {
                type Bytes = [u8; $len];

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_be_bytes(bytes)
                }

                fn to_be_bytes(self) -> Self::Bytes {
                    <$ty>::to_be_bytes(self)
                }
            }
        )*
    };
}

impl_class_io! {
    u8 => 1,
    i8 => 1,
    u16 => 2,
    i16 => 2,
    u32 => 4,
    i32 => 4,
    u64 => 8,
    i64 => 8,
    f32 => 4,
    f64 => 8,
}

/// Reads a big-endian `T` from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is shorter than `T`.
pub fn read_be<T: ClassIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_be_at(data, &mut offset)
}

/// Reads a big-endian `T` at `offset` and advances `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
pub fn read_be_at<T: ClassIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(OutOfBounds);
    };

    *offset = end;

    Ok(T::from_be_bytes(read))
}

/// Writes `value` big-endian at `offset` and advances `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit into `data`.
pub fn write_be_at<T: ClassIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(OutOfBounds);
    };
    if end > data.len() {
        return Err(OutOfBounds);
    }

    data[*offset..end].copy_from_slice(value.to_be_bytes().as_ref());
    *offset = end;

    Ok(())
}
