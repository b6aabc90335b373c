//! Shared helpers for the integration tests.
//!
//! [`SingleMethodClass`] writes a minimal class holding one method through the public
//! [`ByteCursor`] writer, so the tests exercise the crate exactly as a caller would.

#![allow(dead_code)]

use cafescope::{ByteCursor, ClassFile, LoaderConfig};

/// A class named `test/Subject` with one method.
pub struct SingleMethodClass {
    pool: Vec<Vec<u8>>,
    access: u16,
    name: String,
    descriptor: String,
    code: Vec<u8>,
    max_locals: u16,
    handlers: Vec<(u16, u16, u16, Option<String>)>,
}

impl SingleMethodClass {
    /// A static method `run` with the given descriptor and bytecode.
    pub fn new(descriptor: &str, code: &[u8]) -> Self {
        SingleMethodClass {
            pool: Vec::new(),
            access: 0x0009,
            name: "run".to_string(),
            descriptor: descriptor.to_string(),
            code: code.to_vec(),
            max_locals: 4,
            handlers: Vec::new(),
        }
    }

    pub fn max_locals(mut self, max_locals: u16) -> Self {
        self.max_locals = max_locals;
        self
    }

    pub fn handler(mut self, start: u16, end: u16, handler: u16, catch_type: Option<&str>) -> Self {
        self.handlers
            .push((start, end, handler, catch_type.map(str::to_string)));
        self
    }

    fn utf8(&mut self, value: &str) -> u16 {
        let mut cursor = ByteCursor::with_capacity(value.len() + 3);
        cursor.write_u8(1);
        cursor.write_utf8(value).unwrap();
        cursor.flip();
        self.push(cursor.into_bytes())
    }

    fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        let mut entry = vec![7];
        entry.extend_from_slice(&name.to_be_bytes());
        self.push(entry)
    }

    fn push(&mut self, entry: Vec<u8>) -> u16 {
        self.pool.push(entry);
        self.pool.len() as u16
    }

    /// Encodes the class file.
    pub fn build(mut self) -> Vec<u8> {
        let this_class = self.class("test/Subject");
        let super_class = self.class("java/lang/Object");
        let name = self.utf8(&self.name.clone());
        let descriptor = self.utf8(&self.descriptor.clone());
        let code_name = self.utf8("Code");
        let handlers: Vec<_> = std::mem::take(&mut self.handlers)
            .into_iter()
            .map(|(start, end, handler, catch_type)| {
                let catch_type = catch_type.map_or(0, |name| self.class(&name));
                (start, end, handler, catch_type)
            })
            .collect();

        let mut cursor = ByteCursor::with_capacity(256);
        cursor.write_u32(0xCAFE_BABE);
        cursor.write_u16(0);
        cursor.write_u16(52);
        cursor.write_u16(self.pool.len() as u16 + 1);
        for entry in &self.pool {
            cursor.write_bytes(entry);
        }
        cursor.write_u16(0x0021);
        cursor.write_u16(this_class);
        cursor.write_u16(super_class);
        cursor.write_u16(0);
        cursor.write_u16(0);

        cursor.write_u16(1);
        cursor.write_u16(self.access);
        cursor.write_u16(name);
        cursor.write_u16(descriptor);
        cursor.write_u16(1);
        cursor.write_u16(code_name);
        cursor.write_u32(12 + self.code.len() as u32 + 8 * handlers.len() as u32);
        cursor.write_u16(4);
        cursor.write_u16(self.max_locals);
        cursor.write_u32(self.code.len() as u32);
        cursor.write_bytes(&self.code);
        cursor.write_u16(handlers.len() as u16);
        for (start, end, handler, catch_type) in handlers {
            for value in [start, end, handler, catch_type] {
                cursor.write_u16(value);
            }
        }
        cursor.write_u16(0);

        cursor.write_u16(0);
        cursor.flip();
        cursor.into_bytes()
    }

    /// Builds and loads the class.
    pub fn load(self) -> ClassFile {
        ClassFile::from_mem(self.build()).unwrap()
    }

    /// Builds and loads the class without caching decoded bodies.
    pub fn load_uncached(self) -> ClassFile {
        ClassFile::from_mem_with_config(self.build(), LoaderConfig::uncached()).unwrap()
    }
}
