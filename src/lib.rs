//! # aqua_lib
//!
//! aqua_lib is a library for reading and writing the Aqua binary model format.
//!
//! The types in [formats] map directly to the little-endian records stored in the file.
//! Counts and offsets are stored as they appear on disk and are not validated.
//! Offsets are absolute positions within the reader passed to the read functions.
//!
//! For a higher level API with decoded vertex data and topology, see aqua_data.
//!
//! ## Reading
/*!
```no_run
use std::io::Cursor;
use binread::BinReaderExt;
use aqua_lib::formats::objc::Objc;

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mut reader = Cursor::new(std::fs::read("model.aqo")?);
let objc = reader.read_le::<Objc>()?;
println!("{:?}", objc.schema());
# Ok(())
# }
```
*/
pub mod formats;
mod strings;
mod vectors;

pub use aqua_write::AquaWrite;
pub use strings::FixedString;
pub use vectors::{Vector2, Vector3, Vector4};

use binread::{
    io::{Read, Seek, SeekFrom},
    BinRead, BinReaderExt, BinResult,
};

/// Seeks to the absolute `offset`.
/// Negative offsets can't be represented in the stream and return an error.
pub fn seek_to<R: Read + Seek>(reader: &mut R, offset: i32) -> BinResult<u64> {
    let position = u64::try_from(offset).map_err(|_| binread::Error::AssertFail {
        pos: reader.stream_position().unwrap_or_default(),
        message: format!("Invalid negative offset {}.", offset),
    })?;
    reader.seek(SeekFrom::Start(position))?;
    Ok(position)
}

/// Reads `count` consecutive records starting at the absolute `offset`.
/// A count of zero or less returns an empty list without seeking.
pub fn read_table<T: BinRead<Args = ()>, R: Read + Seek>(
    reader: &mut R,
    offset: i32,
    count: i32,
) -> BinResult<Vec<T>> {
    if count <= 0 {
        return Ok(Vec::new());
    }

    seek_to(reader, offset)?;

    // Don't preallocate based on the count.
    // Corrupted counts should fail on the first read past the end of the stream.
    let mut elements = Vec::new();
    for _ in 0..count {
        elements.push(reader.read_le::<T>()?);
    }
    Ok(elements)
}
