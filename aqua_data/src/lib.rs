//! # aqua_data
//!
//! aqua_data provides a higher level API for Aqua object files built on aqua_lib.
//!
//! ## Features
//! - Decoding and encoding of interleaved vertex data for both object schemas
//! - Conversions between single precision and quantized vertex attributes
//! - Decoding of triangle strips and triangle lists
//! - Splitting shared vertex sets so that each mesh has its own vertices
//! - Staging types for converting triangle meshes from other formats
//!
//! ## Getting Started
//! The easiest way to access important items like [AquaObject](crate::object_data::AquaObject) is to import the [prelude].
//! For additional reading and writing options, see the [AquaData] trait.
/*!
```no_run
use aqua_data::prelude::*;

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let object = AquaObject::from_file("model.aqo")?;

for i in 0..object.meshes.len() {
    let triangles = object.mesh_strip(i)?.triangles(true);
    println!("Mesh {}: {} triangles", i, triangles.len());
}
# Ok(())
# }
```
 */
//!
//! ## File Differences
//! Vertex declarations, offsets, and counts are recalculated when saving,
//! so saving an unmodified file does not guarantee a binary identical result.
//! Unresearched fields in records are preserved.
pub mod generic_data;
pub mod object_data;
pub mod strip_data;
pub mod vtxl_data;

use std::io::{Read, Seek, Write};
use std::path::Path;

/// Functions for reading and writing supported formats.
pub trait AquaData: Sized {
    type ReadError: std::error::Error;
    type WriteError: std::error::Error;

    /// Tries to read and convert the data from `path`.
    /// The entire file is buffered for performance.
    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Self::ReadError>;

    /// Tries to read and convert the data from `reader`.
    /// For best performance when opening from a file, use [AquaData::from_file] instead.
    fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, Self::ReadError>;

    /// Converts the data and writes to the given `writer`.
    /// For best performance when writing to a file, use [AquaData::write_to_file] instead.
    fn write<W: Write>(&self, writer: &mut W) -> Result<(), Self::WriteError>;

    /// Converts the data and writes to the given `path`.
    /// The entire file is buffered for performance.
    fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Self::WriteError>;
}

/// Common imports for top level types and important traits.
pub mod prelude {
    pub use crate::generic_data::{GenericMaterial, GenericTriangles};
    pub use crate::object_data::AquaObject;
    pub use crate::strip_data::{MeshoptStripifier, StripData};
    pub use crate::vtxl_data::VertexStore;
    pub use crate::AquaData;
}

#[cfg(test)]
pub(crate) fn group_hex(a: &str, words_per_line: usize) -> String {
    use itertools::Itertools;

    // ex: "FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF..."
    let words = a
        .chars()
        .collect::<Vec<char>>()
        .chunks(8)
        .map(|c| c.iter().collect::<String>())
        .collect::<Vec<String>>();

    words.chunks(words_per_line).map(|c| c.join(" ")).join("\n")
}

#[cfg(test)]
macro_rules! assert_hex_eq {
    ($a:expr, $b:expr) => {
        assert!(
            $a == $b,
            "\n{} !=\n{}",
            crate::group_hex(&hex::encode($a), 8),
            crate::group_hex(&hex::encode($b), 8)
        )
    };
}

#[cfg(test)]
pub(crate) use assert_hex_eq;
