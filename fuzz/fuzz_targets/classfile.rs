#![no_main]

use cafescope::ClassFile;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(class) = ClassFile::from_mem(data.to_vec()) {
        let _ = class.decode_all_bodies();
    }
});
