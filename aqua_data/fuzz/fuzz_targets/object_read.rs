#![no_main]
use aqua_data::object_data::AquaObject;
use aqua_data::AquaData;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    let _ = AquaObject::read(&mut Cursor::new(data));
});
