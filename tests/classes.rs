//! Integration tests for loading class files from disk and memory.

mod common;

use cafescope::{
    file::cursor::modified_utf8_length, ByteCursor, ClassFile, Error, File, Result,
};
use common::SingleMethodClass;

#[test]
fn load_from_disk() -> Result<()> {
    let bytes = SingleMethodClass::new("()V", &[0xB1]).build();
    let path = std::env::temp_dir().join(format!("cafescope-{}-Subject.class", std::process::id()));
    std::fs::write(&path, &bytes).unwrap();

    let class = ClassFile::from_file(&path);
    std::fs::remove_file(&path).unwrap();
    let class = class?;

    assert_eq!(class.name(), "test/Subject");
    assert_eq!(class.version(), (52, 0));
    assert!(class.method("run", "()V").unwrap().body()?.is_some());
    Ok(())
}

#[test]
fn missing_file_is_an_error() {
    let path = std::env::temp_dir().join("cafescope-does-not-exist.class");
    assert!(ClassFile::from_file(&path).is_err());
}

#[test]
fn empty_input_is_rejected() {
    assert!(matches!(File::from_mem(Vec::new()), Err(Error::Empty)));
    assert!(ClassFile::from_mem(Vec::new()).is_err());
}

#[test]
fn structure_survives_broken_bytecode() {
    // wide followed by a non-widenable opcode
    let class = SingleMethodClass::new("()V", &[0xC4, 0x00, 0xB1]).load();

    let method = class.method("run", "()V").unwrap();
    assert!(method.is_static());
    assert!(method.code().unwrap().is_some());
    assert!(matches!(method.body(), Err(Error::MethodDecode { .. })));
}

#[test]
fn modified_utf8_round_trip() -> Result<()> {
    let samples = ["", "plain", "nul\0inside", "caf\u{e9}", "\u{20ac}", "emoji \u{1F600}"];

    let mut cursor = ByteCursor::with_capacity(16);
    for sample in samples {
        cursor.write_utf8(sample)?;
    }
    cursor.flip();

    for sample in samples {
        let start = cursor.position();
        assert_eq!(cursor.read_utf8()?, sample);
        assert_eq!(cursor.position() - start, 2 + modified_utf8_length(sample));
    }
    assert!(!cursor.has_remaining());
    Ok(())
}

#[test]
fn cursor_bounds_are_checked() {
    let mut cursor = ByteCursor::new(&[0x00, 0x01, 0x02]);
    assert_eq!(cursor.read_u16().unwrap(), 1);
    assert!(matches!(cursor.read_u16(), Err(Error::OutOfBounds)));
    assert_eq!(cursor.position(), 2);
    assert_eq!(cursor.read_u8().unwrap(), 2);
}
