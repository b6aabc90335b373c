//! Class-file and `Code` attribute builders for tests.

use std::collections::HashMap;

use crate::file::cursor::ByteCursor;

/// An encoded attribute: name index and payload.
pub struct AttributeSpec {
    name: u16,
    payload: Vec<u8>,
}

struct MemberSpec {
    access: u16,
    name: u16,
    descriptor: u16,
    attributes: Vec<AttributeSpec>,
}

/// Assembles a class file with a deduplicated constant pool.
pub struct ClassFileBuilder {
    pool: Vec<Vec<u8>>,
    slots: u16,
    interned: HashMap<Vec<u8>, u16>,
    access: u16,
    this_class: u16,
    super_class: u16,
    interfaces: Vec<u16>,
    fields: Vec<MemberSpec>,
    methods: Vec<MemberSpec>,
    attributes: Vec<AttributeSpec>,
    inner_classes: Vec<(u16, u16, u16, u16)>,
    major_version: u16,
}

impl ClassFileBuilder {
    /// A public class extending `java/lang/Object`.
    pub fn new(name: &str) -> Self {
        let mut builder = ClassFileBuilder {
            pool: Vec::new(),
            slots: 1,
            interned: HashMap::new(),
            access: 0x0021,
            this_class: 0,
            super_class: 0,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            attributes: Vec::new(),
            inner_classes: Vec::new(),
            major_version: 52,
        };
        builder.this_class = builder.class(name);
        builder.super_class = builder.class("java/lang/Object");
        builder
    }

    fn entry(&mut self, bytes: Vec<u8>, wide: bool) -> u16 {
        if let Some(&index) = self.interned.get(&bytes) {
            return index;
        }
        let index = self.slots;
        self.slots += if wide { 2 } else { 1 };
        self.interned.insert(bytes.clone(), index);
        self.pool.push(bytes);
        index
    }

    fn tagged(tag: u8, values: &[u16]) -> Vec<u8> {
        let mut bytes = vec![tag];
        for value in values {
            bytes.extend_from_slice(&value.to_be_bytes());
        }
        bytes
    }

    /// `CONSTANT_Utf8`
    pub fn utf8(&mut self, value: &str) -> u16 {
        let mut cursor = ByteCursor::with_capacity(value.len() + 3);
        cursor.write_u8(1);
        cursor.write_utf8(value).unwrap();
        cursor.flip();
        self.entry(cursor.into_bytes(), false)
    }

    /// `CONSTANT_Class`
    pub fn class(&mut self, name: &str) -> u16 {
        let name = self.utf8(name);
        self.entry(Self::tagged(7, &[name]), false)
    }

    /// `CONSTANT_String`
    pub fn string(&mut self, value: &str) -> u16 {
        let value = self.utf8(value);
        self.entry(Self::tagged(8, &[value]), false)
    }

    /// `CONSTANT_Integer`
    pub fn integer(&mut self, value: i32) -> u16 {
        let mut bytes = vec![3];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.entry(bytes, false)
    }

    /// `CONSTANT_Long`, occupying two indices
    pub fn long(&mut self, value: i64) -> u16 {
        let mut bytes = vec![5];
        bytes.extend_from_slice(&value.to_be_bytes());
        self.entry(bytes, true)
    }

    /// `CONSTANT_NameAndType`
    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name = self.utf8(name);
        let descriptor = self.utf8(descriptor);
        self.entry(Self::tagged(12, &[name, descriptor]), false)
    }

    /// `CONSTANT_Fieldref`
    pub fn field_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let owner = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        self.entry(Self::tagged(9, &[owner, nat]), false)
    }

    /// `CONSTANT_Methodref`
    pub fn method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let owner = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        self.entry(Self::tagged(10, &[owner, nat]), false)
    }

    /// `CONSTANT_InterfaceMethodref`
    pub fn interface_method_ref(&mut self, owner: &str, name: &str, descriptor: &str) -> u16 {
        let owner = self.class(owner);
        let nat = self.name_and_type(name, descriptor);
        self.entry(Self::tagged(11, &[owner, nat]), false)
    }

    /// `CONSTANT_InvokeDynamic`
    pub fn invoke_dynamic(&mut self, bootstrap: u16, name: &str, descriptor: &str) -> u16 {
        let nat = self.name_and_type(name, descriptor);
        self.entry(Self::tagged(18, &[bootstrap, nat]), false)
    }

    /// Sets the class access flags.
    pub fn access(&mut self, access: u16) -> &mut Self {
        self.access = access;
        self
    }

    /// Sets the class file major version.
    pub fn major_version(&mut self, major: u16) -> &mut Self {
        self.major_version = major;
        self
    }

    /// Sets or clears the super class.
    pub fn super_class(&mut self, name: Option<&str>) -> &mut Self {
        self.super_class = name.map_or(0, |name| self.class(name));
        self
    }

    /// Adds a super interface.
    pub fn interface(&mut self, name: &str) -> &mut Self {
        let index = self.class(name);
        self.interfaces.push(index);
        self
    }

    /// An attribute with an arbitrary payload.
    pub fn raw_attribute(&mut self, name: &str, payload: Vec<u8>) -> AttributeSpec {
        AttributeSpec {
            name: self.utf8(name),
            payload,
        }
    }

    /// A `Signature` attribute.
    pub fn signature_attribute(&mut self, signature: &str) -> AttributeSpec {
        let index = self.utf8(signature);
        self.raw_attribute("Signature", index.to_be_bytes().to_vec())
    }

    /// A `ConstantValue` attribute pointing at pool entry `index`.
    pub fn constant_value_attribute(&mut self, index: u16) -> AttributeSpec {
        self.raw_attribute("ConstantValue", index.to_be_bytes().to_vec())
    }

    /// A `MethodParameters` attribute.
    pub fn method_parameters_attribute(&mut self, parameters: &[(Option<&str>, u16)]) -> AttributeSpec {
        let mut payload = vec![parameters.len() as u8];
        for &(name, flags) in parameters {
            let name = name.map_or(0, |name| self.utf8(name));
            payload.extend_from_slice(&name.to_be_bytes());
            payload.extend_from_slice(&flags.to_be_bytes());
        }
        self.raw_attribute("MethodParameters", payload)
    }

    /// An `Exceptions` attribute.
    pub fn exceptions_attribute(&mut self, thrown: &[&str]) -> AttributeSpec {
        let mut payload = (thrown.len() as u16).to_be_bytes().to_vec();
        for name in thrown {
            payload.extend_from_slice(&self.class(name).to_be_bytes());
        }
        self.raw_attribute("Exceptions", payload)
    }

    /// A `Code` attribute.
    pub fn code_attribute(&mut self, code: &CodeBuilder) -> AttributeSpec {
        let mut cursor = ByteCursor::with_capacity(64);
        cursor.write_u16(code.max_stack);
        cursor.write_u16(code.max_locals);
        cursor.write_u32(code.code.len() as u32);
        cursor.write_bytes(&code.code);

        cursor.write_u16(code.handlers.len() as u16);
        for (start, end, handler, catch_type) in &code.handlers {
            let catch_type = catch_type.as_deref().map_or(0, |name| self.class(name));
            cursor.write_u16(*start);
            cursor.write_u16(*end);
            cursor.write_u16(*handler);
            cursor.write_u16(catch_type);
        }

        let mut nested = Vec::new();
        if !code.lines.is_empty() {
            let mut payload = (code.lines.len() as u16).to_be_bytes().to_vec();
            for (pc, line) in &code.lines {
                payload.extend_from_slice(&pc.to_be_bytes());
                payload.extend_from_slice(&line.to_be_bytes());
            }
            nested.push(self.raw_attribute("LineNumberTable", payload));
        }
        for (table, rows) in [
            ("LocalVariableTable", &code.locals),
            ("LocalVariableTypeTable", &code.local_types),
        ] {
            if rows.is_empty() {
                continue;
            }
            let mut payload = (rows.len() as u16).to_be_bytes().to_vec();
            for (start, length, name, descriptor, slot) in rows {
                payload.extend_from_slice(&start.to_be_bytes());
                payload.extend_from_slice(&length.to_be_bytes());
                payload.extend_from_slice(&self.utf8(name).to_be_bytes());
                payload.extend_from_slice(&self.utf8(descriptor).to_be_bytes());
                payload.extend_from_slice(&slot.to_be_bytes());
            }
            nested.push(self.raw_attribute(table, payload));
        }
        write_attributes(&mut cursor, &nested);

        cursor.flip();
        self.raw_attribute("Code", cursor.into_bytes())
    }

    /// Adds a field.
    pub fn field(&mut self, access: u16, name: &str, descriptor: &str, attributes: Vec<AttributeSpec>) -> &mut Self {
        let member = MemberSpec {
            access,
            name: self.utf8(name),
            descriptor: self.utf8(descriptor),
            attributes,
        };
        self.fields.push(member);
        self
    }

    /// Adds a method.
    pub fn method(&mut self, access: u16, name: &str, descriptor: &str, attributes: Vec<AttributeSpec>) -> &mut Self {
        let member = MemberSpec {
            access,
            name: self.utf8(name),
            descriptor: self.utf8(descriptor),
            attributes,
        };
        self.methods.push(member);
        self
    }

    /// Adds a static method whose body is `code`.
    pub fn static_method(&mut self, name: &str, descriptor: &str, code: &CodeBuilder) -> &mut Self {
        let code = self.code_attribute(code);
        self.method(0x0009, name, descriptor, vec![code])
    }

    /// Adds a class attribute.
    pub fn attribute(&mut self, attribute: AttributeSpec) -> &mut Self {
        self.attributes.push(attribute);
        self
    }

    /// Adds an `InnerClasses` row; all rows form one attribute.
    pub fn inner_class(&mut self, inner: &str, outer: Option<&str>, simple_name: Option<&str>, flags: u16) -> &mut Self {
        let inner = self.class(inner);
        let outer = outer.map_or(0, |outer| self.class(outer));
        let simple_name = simple_name.map_or(0, |name| self.utf8(name));
        self.inner_classes.push((inner, outer, simple_name, flags));
        self
    }

    /// Encodes the class.
    pub fn build(&mut self) -> Vec<u8> {
        if !self.inner_classes.is_empty() {
            let mut payload = (self.inner_classes.len() as u16).to_be_bytes().to_vec();
            for (inner, outer, name, flags) in &self.inner_classes {
                for value in [inner, outer, name, flags] {
                    payload.extend_from_slice(&value.to_be_bytes());
                }
            }
            let attribute = self.raw_attribute("InnerClasses", payload);
            self.attributes.push(attribute);
            self.inner_classes.clear();
        }

        let mut cursor = ByteCursor::with_capacity(256);
        cursor.write_u32(0xCAFE_BABE);
        cursor.write_u16(0);
        cursor.write_u16(self.major_version);
        cursor.write_u16(self.slots);
        for entry in &self.pool {
            cursor.write_bytes(entry);
        }
        cursor.write_u16(self.access);
        cursor.write_u16(self.this_class);
        cursor.write_u16(self.super_class);
        cursor.write_u16(self.interfaces.len() as u16);
        for interface in &self.interfaces {
            cursor.write_u16(*interface);
        }
        for members in [&self.fields, &self.methods] {
            cursor.write_u16(members.len() as u16);
            for member in members {
                cursor.write_u16(member.access);
                cursor.write_u16(member.name);
                cursor.write_u16(member.descriptor);
                write_attributes(&mut cursor, &member.attributes);
            }
        }
        write_attributes(&mut cursor, &self.attributes);

        cursor.flip();
        cursor.into_bytes()
    }
}

fn write_attributes(cursor: &mut ByteCursor, attributes: &[AttributeSpec]) {
    cursor.write_u16(attributes.len() as u16);
    for attribute in attributes {
        cursor.write_u16(attribute.name);
        cursor.write_u32(attribute.payload.len() as u32);
        cursor.write_bytes(&attribute.payload);
    }
}

/// Describes a `Code` attribute.
#[derive(Clone)]
pub struct CodeBuilder {
    max_stack: u16,
    max_locals: u16,
    code: Vec<u8>,
    handlers: Vec<(u16, u16, u16, Option<String>)>,
    locals: Vec<(u16, u16, String, String, u16)>,
    local_types: Vec<(u16, u16, String, String, u16)>,
    lines: Vec<(u16, u16)>,
}

impl CodeBuilder {
    /// Bytecode with room for 4 stack entries and 4 locals.
    pub fn new(code: &[u8]) -> Self {
        CodeBuilder {
            max_stack: 4,
            max_locals: 4,
            code: code.to_vec(),
            handlers: Vec::new(),
            locals: Vec::new(),
            local_types: Vec::new(),
            lines: Vec::new(),
        }
    }

    /// Sets `max_locals`.
    pub fn max_locals(mut self, max_locals: u16) -> Self {
        self.max_locals = max_locals;
        self
    }

    /// Adds an exception table row.
    pub fn handler(mut self, start: u16, end: u16, handler: u16, catch_type: Option<&str>) -> Self {
        self.handlers.push((start, end, handler, catch_type.map(str::to_string)));
        self
    }

    /// Adds a `LocalVariableTable` row.
    pub fn local(mut self, start: u16, length: u16, name: &str, descriptor: &str, slot: u16) -> Self {
        self.locals.push((start, length, name.to_string(), descriptor.to_string(), slot));
        self
    }

    /// Adds a `LocalVariableTypeTable` row.
    pub fn local_type(mut self, start: u16, length: u16, name: &str, signature: &str, slot: u16) -> Self {
        self.local_types.push((start, length, name.to_string(), signature.to_string(), slot));
        self
    }

    /// Adds a `LineNumberTable` row.
    pub fn line(mut self, start_pc: u16, line: u16) -> Self {
        self.lines.push((start_pc, line));
        self
    }
}
