//! Topology set records.
use aqua_write::AquaWrite;
use binread::BinRead;

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

pub const PSET_TAG_CLASSIC: i32 = 0x2100;
pub const PSET_TAG_VARIANT: i32 = 0x1000;

/// Describes the vertex indices for a mesh.
///
/// Classic objects point to a [StripHeader] and the strip indices.
/// Variant objects store the first index in the shared index list in
/// [strip_start_count](#structfield.strip_start_count).
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, PartialEq, Eq, Default)]
pub struct Pset {
    pub tag: i32,
    /// 1 in all known files.
    pub face_type: i32,
    pub face_count_offset: i32,
    /// The number of vertex indices.
    pub pset_face_count: i32,
    pub face_offset: i32,
    pub strip_start_count: i32,
}

/// The header preceding the strip indices of classic objects.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, PartialEq, Eq, Default)]
pub struct StripHeader {
    pub tri_id_count: i32,
    pub reserve0: i32,
    pub reserve1: i32,
    pub reserve2: i32,
}
