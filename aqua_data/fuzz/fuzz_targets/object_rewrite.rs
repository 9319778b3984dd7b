#![no_main]
use aqua_data::object_data::AquaObject;
use aqua_data::AquaData;
use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut object) = AquaObject::read(&mut Cursor::new(data)) {
        let _ = object.split_vertex_sets_per_mesh();
        let _ = object.write(&mut Vec::<u8>::new());
    }
});
