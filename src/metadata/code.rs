//! The `Code` attribute.
//!
//! A method's `Code` attribute is kept opaque while the class is read and inflated into a
//! [`CodeBlock`] on first use. The block records where the bytecode lives in the input rather
//! than copying it; [`CodeBlock::bytecode`] slices it back out.

use log::warn;

use crate::{
    config::LoaderConfig,
    file::cursor::ByteCursor,
    metadata::{
        attributes::{read_attributes, Attribute, AttributeKind, LineNumber, RawAttribute},
        constpool::ConstantPool,
        scope::{SymbolScope, TypeReference},
        token::Token,
    },
    Result,
};

/// One row of a method's exception table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionTableEntry {
    /// First covered bytecode offset
    pub start: u16,
    /// Exclusive end of the covered range
    pub end: u16,
    /// Handler entry offset
    pub handler: u16,
    /// Caught type; `None` catches everything (`finally`)
    pub catch_type: Option<TypeReference>,
}

impl ExceptionTableEntry {
    /// `true` if `offset` lies in `[start, end)`.
    #[must_use]
    pub fn covers(&self, offset: u32) -> bool {
        u32::from(self.start) <= offset && offset < u32::from(self.end)
    }
}

/// One row of a `LocalVariableTable` or `LocalVariableTypeTable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVariableEntry {
    /// First offset at which the variable has a value
    pub start_pc: u16,
    /// Length of the live range
    pub length: u16,
    /// Source name
    pub name: String,
    /// Field descriptor, or the generic signature for type-table rows
    pub descriptor: String,
    /// Local variable slot
    pub slot: u16,
}

impl LocalVariableEntry {
    /// Exclusive end of the live range.
    #[must_use]
    pub fn end_pc(&self) -> u32 {
        u32::from(self.start_pc) + u32::from(self.length)
    }
}

/// An inflated `Code` attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    /// Maximum operand stack depth
    pub max_stack: u16,
    /// Number of local variable slots
    pub max_locals: u16,
    /// Offset of the first bytecode byte in the input
    pub code_offset: usize,
    /// Number of bytecode bytes
    pub code_length: usize,
    /// Exception table in declaration order
    pub exception_table: Vec<ExceptionTableEntry>,
    /// Merged `LineNumberTable` rows, sorted by offset
    pub line_numbers: Vec<LineNumber>,
    /// Merged `LocalVariableTable` rows
    pub local_variables: Vec<LocalVariableEntry>,
    /// Merged `LocalVariableTypeTable` rows
    pub local_variable_types: Vec<LocalVariableEntry>,
    /// Remaining nested attributes
    pub attributes: Vec<Attribute>,
}

impl CodeBlock {
    /// Inflates the `Code` attribute `raw` found in `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for an empty or oversized code array and for
    /// exception-table rows outside the code, and propagates read errors.
    pub fn read(
        data: &[u8],
        raw: &RawAttribute,
        pool: &ConstantPool,
        config: &LoaderConfig,
    ) -> Result<CodeBlock> {
        let Some(payload) = data.get(raw.range()) else {
            return Err(out_of_bounds_error!());
        };
        let mut cursor = ByteCursor::new(payload);

        let max_stack = cursor.read_u16()?;
        let max_locals = cursor.read_u16()?;
        let code_length = cursor.read_u32()?;
        if code_length == 0 || code_length > config.max_code_length {
            return Err(malformed_error!(
                "Invalid code length {} (limit {})",
                code_length,
                config.max_code_length
            ));
        }

        let code_offset = raw.offset + cursor.position();
        let code_length = code_length as usize;
        cursor.advance(code_length)?;

        let table_length = cursor.read_u16()?;
        let mut exception_table = Vec::with_capacity(usize::from(table_length));
        for _ in 0..table_length {
            let start = cursor.read_u16()?;
            let end = cursor.read_u16()?;
            let handler = cursor.read_u16()?;
            let catch_token = Token(cursor.read_u16()?);

            if start >= end || usize::from(end) > code_length || usize::from(handler) >= code_length {
                return Err(malformed_error!(
                    "Exception table entry [{}, {}) -> {} outside code of length {}",
                    start,
                    end,
                    handler,
                    code_length
                ));
            }

            let catch_type = if catch_token.is_null() {
                None
            } else {
                Some(pool.lookup_type(catch_token)?)
            };

            exception_table.push(ExceptionTableEntry {
                start,
                end,
                handler,
                catch_type,
            });
        }

        let base = raw.offset;
        let nested = read_attributes(&mut cursor, pool, base)?;

        let mut line_numbers = Vec::new();
        let mut local_variables = Vec::new();
        let mut local_variable_types = Vec::new();
        let mut attributes = Vec::new();
        for attribute in nested {
            match attribute {
                Attribute::LineNumberTable(lines) => line_numbers.extend(lines),
                Attribute::Raw(raw) if raw.kind() == Some(AttributeKind::LocalVariableTable) => {
                    local_variables.extend(read_local_variables(data, &raw, pool)?);
                }
                Attribute::Raw(raw)
                    if raw.kind() == Some(AttributeKind::LocalVariableTypeTable) =>
                {
                    local_variable_types.extend(read_local_variables(data, &raw, pool)?);
                }
                other => attributes.push(other),
            }
        }
        line_numbers.sort_by_key(|line| line.start_pc);

        for variable in local_variables.iter().chain(&local_variable_types) {
            if variable.slot >= max_locals {
                warn!(
                    "Local variable '{}' uses slot {} beyond max_locals {}",
                    variable.name, variable.slot, max_locals
                );
            }
        }

        Ok(CodeBlock {
            max_stack,
            max_locals,
            code_offset,
            code_length,
            exception_table,
            line_numbers,
            local_variables,
            local_variable_types,
            attributes,
        })
    }

    /// Slices the bytecode out of the input it was read from.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is not that input.
    pub fn bytecode<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        data.get(self.code_offset..self.code_offset + self.code_length)
            .ok_or(out_of_bounds_error!())
    }

    /// Source line of the instruction at `offset`, if line numbers are present.
    #[must_use]
    pub fn line_number(&self, offset: u32) -> Option<u16> {
        self.line_numbers
            .iter()
            .take_while(|line| u32::from(line.start_pc) <= offset)
            .last()
            .map(|line| line.line)
    }
}

fn read_local_variables(
    data: &[u8],
    raw: &RawAttribute,
    pool: &ConstantPool,
) -> Result<Vec<LocalVariableEntry>> {
    let Some(payload) = data.get(raw.range()) else {
        return Err(out_of_bounds_error!());
    };
    let mut cursor = ByteCursor::new(payload);

    let count = cursor.read_u16()?;
    let mut entries = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        entries.push(LocalVariableEntry {
            start_pc: cursor.read_u16()?,
            length: cursor.read_u16()?,
            name: pool.utf8(Token(cursor.read_u16()?))?.to_string(),
            descriptor: pool.utf8(Token(cursor.read_u16()?))?.to_string(),
            slot: cursor.read_u16()?,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::constpool::ConstantPoolEntry, Error};

    fn pool() -> ConstantPool {
        ConstantPool::from_entries(vec![
            ConstantPoolEntry::Unusable,
            ConstantPoolEntry::Utf8("LocalVariableTable".into()),
            ConstantPoolEntry::Utf8("x".into()),
            ConstantPoolEntry::Utf8("I".into()),
            ConstantPoolEntry::Utf8("java/io/IOException".into()),
            ConstantPoolEntry::Class { name: Token(4) },
            ConstantPoolEntry::Utf8("LineNumberTable".into()),
        ])
    }

    fn code_attribute(code: &[u8], table: &[(u16, u16, u16, u16)]) -> Vec<u8> {
        let mut cursor = ByteCursor::with_capacity(64);
        // 4 bytes of unrelated prefix so offsets are not zero-based
        cursor.write_u32(0xDEAD_BEEF);
        cursor.write_u16(2);
        cursor.write_u16(3);
        cursor.write_u32(code.len() as u32);
        cursor.write_bytes(code);
        cursor.write_u16(table.len() as u16);
        for &(start, end, handler, catch_type) in table {
            cursor.write_u16(start);
            cursor.write_u16(end);
            cursor.write_u16(handler);
            cursor.write_u16(catch_type);
        }
        cursor.write_u16(2);
        cursor.write_u16(1);
        cursor.write_u32(12);
        cursor.write_u16(1);
        cursor.write_u16(0);
        cursor.write_u16(3);
        cursor.write_u16(2);
        cursor.write_u16(3);
        cursor.write_u16(1);
        cursor.write_u16(6);
        cursor.write_u32(10);
        cursor.write_u16(2);
        cursor.write_u16(2);
        cursor.write_u16(7);
        cursor.write_u16(0);
        cursor.write_u16(5);
        cursor.flip();
        cursor.into_bytes()
    }

    fn raw_for(bytes: &[u8]) -> RawAttribute {
        RawAttribute {
            name: "Code".into(),
            offset: 4,
            length: bytes.len() - 4,
        }
    }

    #[test]
    fn inflate_code() {
        let bytes = code_attribute(&[0x03, 0x3C, 0x1B, 0xAC], &[(0, 2, 3, 5), (0, 3, 3, 0)]);
        let block = CodeBlock::read(&bytes, &raw_for(&bytes), &pool(), &LoaderConfig::default()).unwrap();

        assert_eq!(block.max_stack, 2);
        assert_eq!(block.max_locals, 3);
        assert_eq!(block.code_offset, 12);
        assert_eq!(block.bytecode(&bytes).unwrap(), &[0x03, 0x3C, 0x1B, 0xAC]);
        assert_eq!(block.exception_table.len(), 2);
        assert_eq!(
            block.exception_table[0].catch_type,
            Some(TypeReference::new("java/io/IOException"))
        );
        assert!(block.exception_table[1].catch_type.is_none());
        assert!(block.exception_table[0].covers(1));
        assert!(!block.exception_table[0].covers(2));

        assert_eq!(block.local_variables.len(), 1);
        assert_eq!(block.local_variables[0].name, "x");
        assert_eq!(block.local_variables[0].slot, 1);
        assert_eq!(block.local_variables[0].end_pc(), 3);

        assert_eq!(block.line_number(0), Some(5));
        assert_eq!(block.line_number(3), Some(7));
        assert!(block.attributes.is_empty());
    }

    #[test]
    fn reject_bad_exception_rows() {
        let bytes = code_attribute(&[0x00, 0xB1], &[(1, 1, 0, 0)]);
        let result = CodeBlock::read(&bytes, &raw_for(&bytes), &pool(), &LoaderConfig::default());
        assert!(matches!(result, Err(Error::Malformed { .. })));

        let bytes = code_attribute(&[0x00, 0xB1], &[(0, 1, 2, 0)]);
        let result = CodeBlock::read(&bytes, &raw_for(&bytes), &pool(), &LoaderConfig::default());
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn reject_code_length_over_limit() {
        let bytes = code_attribute(&[0x00, 0x00, 0x00, 0xB1], &[]);
        let config = LoaderConfig {
            max_code_length: 3,
            ..LoaderConfig::default()
        };
        assert!(CodeBlock::read(&bytes, &raw_for(&bytes), &pool(), &config).is_err());
    }
}
