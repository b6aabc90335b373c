//! Bounds-checked, growable byte cursor with big-endian codecs.
//!
//! [`ByteCursor`] is the single low-level reader and writer used throughout the crate. It
//! wraps a byte buffer (borrowed for decoding, owned once anything is written), a logical
//! length, and a position:
//!
//! - **Reads** are checked against the logical length and fail with
//!   [`crate::Error::OutOfBounds`] instead of returning stale bytes.
//! - **Writes** grow the backing buffer to `max(2 × capacity, required)` and extend the
//!   logical length; capacity is never shrunk eagerly.
//! - **`flip`** switches from writing to reading by truncating the logical length to the
//!   current position and rewinding to zero.
//!
//! Strings use the class-file flavour of UTF-8 ("modified UTF-8"): a u2 byte-length prefix,
//! `U+0000` encoded as `C0 80`, and supplementary characters encoded as two three-byte
//! surrogate sequences.
//!
//! # Examples
//!
//! ```rust
//! use cafescope::file::cursor::ByteCursor;
//!
//! let mut cursor = ByteCursor::with_capacity(4);
//! cursor.write_u16(0xCAFE);
//! cursor.write_utf8("héllo")?;
//! cursor.write_f64(2.5);
//! cursor.flip();
//!
//! assert_eq!(cursor.read_u16()?, 0xCAFE);
//! assert_eq!(cursor.read_utf8()?, "héllo");
//! assert_eq!(cursor.read_f64()?, 2.5);
//! assert!(cursor.read_u8().is_err());
//! # Ok::<(), cafescope::Error>(())
//! ```

use std::borrow::Cow;

use crate::{
    file::io::{read_be_at, ClassIO},
    Error, Result,
};

/// Largest byte length representable by the u2 prefix of a modified UTF-8 string.
pub const MAX_UTF8_LENGTH: usize = 0xFFFF;

/// A cursor over a byte buffer with a logical length and a read/write position.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: Cow<'a, [u8]>,
    length: usize,
    position: usize,
}

impl<'a> ByteCursor<'a> {
    /// Creates a read cursor over borrowed data. The logical length is `data.len()`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor {
            length: data.len(),
            data: Cow::Borrowed(data),
            position: 0,
        }
    }

    /// Creates a read cursor that owns `data`.
    #[must_use]
    pub fn from_vec(data: Vec<u8>) -> ByteCursor<'static> {
        ByteCursor {
            length: data.len(),
            data: Cow::Owned(data),
            position: 0,
        }
    }

    /// Creates an empty cursor with `capacity` zeroed bytes of backing storage, ready for writing.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ByteCursor<'static> {
        ByteCursor {
            data: Cow::Owned(vec![0; capacity]),
            length: 0,
            position: 0,
        }
    }

    /// Logical length of the data.
    #[must_use]
    pub fn size(&self) -> usize {
        self.length
    }

    /// Size of the backing storage.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Current position.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Moves to an absolute position within the logical length.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `position > size()`.
    pub fn set_position(&mut self, position: usize) -> Result<()> {
        if position > self.length {
            return Err(out_of_bounds_error!());
        }

        self.position = position;
        Ok(())
    }

    /// Skips `count` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `count` bytes remain.
    pub fn advance(&mut self, count: usize) -> Result<()> {
        let end = self.checked_end(count)?;
        self.position = end;
        Ok(())
    }

    /// Number of bytes between the position and the logical end.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.length.saturating_sub(self.position)
    }

    /// Returns `true` while unread bytes remain.
    #[must_use]
    pub fn has_remaining(&self) -> bool {
        self.position < self.length
    }

    /// Switches from write mode to read mode: the logical length becomes the current
    /// position and the position returns to zero.
    pub fn flip(&mut self) {
        self.length = self.position;
        self.position = 0;
    }

    /// Reinitializes the cursor to `size` zeroed bytes at position zero.
    ///
    /// The backing storage is reallocated only when `size` exceeds the current capacity or is
    /// below a quarter of it; otherwise it is reused.
    pub fn reset(&mut self, size: usize) {
        let capacity = self.data.len();
        if size > capacity || size < capacity / 4 {
            self.data = Cow::Owned(vec![0; size]);
        } else {
            self.data.to_mut()[..size].fill(0);
        }

        self.length = size;
        self.position = 0;
    }

    /// The logical content of the cursor.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.length]
    }

    /// Consumes the cursor and returns the logical content.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        let length = self.length;
        let mut data = self.data.into_owned();
        data.truncate(length);
        data
    }

    fn checked_end(&self, count: usize) -> Result<usize> {
        match self.position.checked_add(count) {
            Some(end) if end <= self.length => Ok(end),
            _ => Err(out_of_bounds_error!()),
        }
    }

    /// Reads a big-endian primitive.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value extends past the logical length.
    pub fn read_be<T: ClassIO>(&mut self) -> Result<T> {
        read_be_at::<T>(&self.data[..self.length], &mut self.position)
    }

    /// Reads an unsigned byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of data.
    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_be::<u8>()
    }

    /// Reads a signed byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of data.
    pub fn read_i8(&mut self) -> Result<i8> {
        self.read_be::<i8>()
    }

    /// Reads an unsigned big-endian short.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 2 bytes remain.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_be::<u16>()
    }

    /// Reads a signed big-endian short.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 2 bytes remain.
    pub fn read_i16(&mut self) -> Result<i16> {
        self.read_be::<i16>()
    }

    /// Reads an unsigned big-endian int.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_be::<u32>()
    }

    /// Reads a signed big-endian int.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 4 bytes remain.
    pub fn read_i32(&mut self) -> Result<i32> {
        self.read_be::<i32>()
    }

    /// Reads a signed big-endian long.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 8 bytes remain.
    pub fn read_i64(&mut self) -> Result<i64> {
        self.read_be::<i64>()
    }

    /// Reads a float through its int bit pattern.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 4 bytes remain.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_be::<u32>()?))
    }

    /// Reads a double through its long bit pattern.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 8 bytes remain.
    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_be::<u64>()?))
    }

    /// Borrows the next `count` bytes and advances past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `count` bytes remain.
    pub fn read_bytes(&mut self, count: usize) -> Result<&[u8]> {
        let start = self.position;
        let end = self.checked_end(count)?;
        self.position = end;
        Ok(&self.data[start..end])
    }

    /// Copies up to `length` bytes into `dst[offset..]`.
    ///
    /// Returns `None` when no data remains, otherwise the number of bytes copied, which is
    /// less than `length` only when the end of data is reached.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `dst` cannot hold `offset + length` bytes.
    pub fn read(&mut self, dst: &mut [u8], offset: usize, length: usize) -> Result<Option<usize>> {
        match offset.checked_add(length) {
            Some(end) if end <= dst.len() => {}
            _ => return Err(out_of_bounds_error!()),
        }

        if !self.has_remaining() {
            return Ok(None);
        }

        let count = length.min(self.remaining());
        dst[offset..offset + count]
            .copy_from_slice(&self.data[self.position..self.position + count]);
        self.position += count;
        Ok(Some(count))
    }

    /// Reads a length-prefixed modified UTF-8 string.
    ///
    /// The u2 prefix counts bytes, not characters. Pure ASCII payloads take a fast path; the
    /// first non-ASCII byte switches to full decoding of one-, two- and three-byte
    /// sequences. Surrogate pairs combine into supplementary characters and lone surrogates
    /// become `U+FFFD`. On failure the position is restored to before the prefix.
    ///
    /// # Errors
    /// - [`crate::Error::OutOfBounds`] if the payload extends past the logical length
    /// - [`crate::Error::InvalidUtf8`] on an invalid leading byte or a truncated or malformed
    ///   continuation sequence
    pub fn read_utf8(&mut self) -> Result<String> {
        let saved_position = self.position;
        let result = self.read_utf8_inner();
        if result.is_err() {
            self.position = saved_position;
        }
        result
    }

    fn read_utf8_inner(&mut self) -> Result<String> {
        let byte_length = usize::from(self.read_u16()?);
        let start = self.position;
        let end = self.checked_end(byte_length)?;
        let bytes = &self.data[start..end];

        let ascii_length = bytes
            .iter()
            .position(|&b| b == 0 || b >= 0x80)
            .unwrap_or(bytes.len());

        let mut value = String::with_capacity(byte_length);
        value.extend(bytes[..ascii_length].iter().map(|&b| char::from(b)));

        if ascii_length < bytes.len() {
            decode_modified_utf8(&bytes[ascii_length..], ascii_length, &mut value)?;
        }

        self.position = end;
        Ok(value)
    }

    fn ensure_capacity(&mut self, required: usize) {
        let capacity = self.data.len();
        if required > capacity {
            let grown = capacity.saturating_mul(2).max(required);
            self.data.to_mut().resize(grown, 0);
        }
    }

    /// Writes a big-endian primitive, growing the buffer as needed.
    pub fn write_be<T: ClassIO>(&mut self, value: T) {
        let bytes = value.to_be_bytes();
        self.write_bytes(bytes.as_ref());
    }

    /// Writes raw bytes, growing the buffer as needed.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.position + bytes.len();
        self.ensure_capacity(end);
        self.data.to_mut()[self.position..end].copy_from_slice(bytes);
        self.position = end;
        self.length = self.length.max(end);
    }

    /// Writes an unsigned byte.
    pub fn write_u8(&mut self, value: u8) {
        self.write_be(value);
    }

    /// Writes a signed byte.
    pub fn write_i8(&mut self, value: i8) {
        self.write_be(value);
    }

    /// Writes a big-endian unsigned short.
    pub fn write_u16(&mut self, value: u16) {
        self.write_be(value);
    }

    /// Writes a big-endian signed short.
    pub fn write_i16(&mut self, value: i16) {
        self.write_be(value);
    }

    /// Writes a big-endian unsigned int.
    pub fn write_u32(&mut self, value: u32) {
        self.write_be(value);
    }

    /// Writes a big-endian signed int.
    pub fn write_i32(&mut self, value: i32) {
        self.write_be(value);
    }

    /// Writes a big-endian signed long.
    pub fn write_i64(&mut self, value: i64) {
        self.write_be(value);
    }

    /// Writes a float as its int bit pattern.
    pub fn write_f32(&mut self, value: f32) {
        self.write_be(value.to_bits());
    }

    /// Writes a double as its long bit pattern.
    pub fn write_f64(&mut self, value: f64) {
        self.write_be(value.to_bits());
    }

    /// Writes a length-prefixed modified UTF-8 string.
    ///
    /// The prefix is first written optimistically as the UTF-16 length, assuming every
    /// character is ASCII. At the first character that needs more than one byte the exact
    /// byte length of the remainder is computed, the prefix is patched, and the rest is
    /// encoded with the full one/two/three-byte rules.
    ///
    /// # Errors
    /// Returns [`crate::Error::StringTooLong`] if the encoding exceeds 65535 bytes; the
    /// cursor is left as it was before the call.
    pub fn write_utf8(&mut self, value: &str) -> Result<()> {
        let char_length = value.encode_utf16().count();
        if char_length > MAX_UTF8_LENGTH {
            return Err(Error::StringTooLong(char_length));
        }

        let prefix_position = self.position;
        let saved_length = self.length;

        #[allow(clippy::cast_possible_truncation)]
        self.write_u16(char_length as u16);
        self.ensure_capacity(self.position + char_length);

        for (index, unit) in value.encode_utf16().enumerate() {
            if (0x0001..=0x007F).contains(&unit) {
                #[allow(clippy::cast_possible_truncation)]
                self.write_u8(unit as u8);
                continue;
            }

            let exact_length = index
                + value
                    .encode_utf16()
                    .skip(index)
                    .map(encoded_unit_length)
                    .sum::<usize>();
            if exact_length > MAX_UTF8_LENGTH {
                self.position = prefix_position;
                self.length = saved_length;
                return Err(Error::StringTooLong(exact_length));
            }

            #[allow(clippy::cast_possible_truncation)]
            let patched = (exact_length as u16).to_be_bytes();
            self.data.to_mut()[prefix_position..prefix_position + 2].copy_from_slice(&patched);

            for unit in value.encode_utf16().skip(index) {
                self.write_utf16_unit(unit);
            }
            break;
        }

        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_utf16_unit(&mut self, unit: u16) {
        match encoded_unit_length(unit) {
            1 => self.write_u8(unit as u8),
            2 => {
                self.write_u8(0xC0 | ((unit >> 6) & 0x1F) as u8);
                self.write_u8(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                self.write_u8(0xE0 | ((unit >> 12) & 0x0F) as u8);
                self.write_u8(0x80 | ((unit >> 6) & 0x3F) as u8);
                self.write_u8(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
}

/// Number of modified UTF-8 bytes needed for one UTF-16 code unit.
fn encoded_unit_length(unit: u16) -> usize {
    match unit {
        0x0001..=0x007F => 1,
        0x0000 | 0x0080..=0x07FF => 2,
        _ => 3,
    }
}

/// Exact byte length of `value` in modified UTF-8, excluding the u2 prefix.
#[must_use]
pub fn modified_utf8_length(value: &str) -> usize {
    value.encode_utf16().map(encoded_unit_length).sum()
}

/// Decodes a modified UTF-8 payload, appending to `out`.
///
/// `base` is the payload-relative offset of `bytes[0]`, used for error reporting.
fn decode_modified_utf8(bytes: &[u8], base: usize, out: &mut String) -> Result<()> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut index = 0;

    let continuation = |at: usize| -> Result<u16> {
        match bytes.get(at) {
            Some(&b) if b & 0xC0 == 0x80 => Ok(u16::from(b & 0x3F)),
            _ => Err(Error::InvalidUtf8 { offset: base + at }),
        }
    };

    while index < bytes.len() {
        let lead = bytes[index];
        match lead >> 4 {
            // 0xxxxxxx
            0x0..=0x7 => {
                units.push(u16::from(lead));
                index += 1;
            }
            // 110xxxxx 10xxxxxx
            0xC | 0xD => {
                let low = continuation(index + 1)?;
                units.push((u16::from(lead & 0x1F) << 6) | low);
                index += 2;
            }
            // 1110xxxx 10xxxxxx 10xxxxxx
            0xE => {
                let mid = continuation(index + 1)?;
                let low = continuation(index + 2)?;
                units.push((u16::from(lead & 0x0F) << 12) | (mid << 6) | low);
                index += 3;
            }
            _ => return Err(Error::InvalidUtf8 {
                offset: base + index,
            }),
        }
    }

    out.extend(char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)));
    Ok(())
}
