use aqua_write::AquaWrite;
use binread::BinRead;

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

/// The usual tag for classic meshes.
pub const MESH_TAG_CLASSIC: i16 = 0x17;
/// The usual tag for variant meshes.
pub const MESH_TAG_VARIANT: i16 = 0x11;

/// Binds a vertex set and topology set to material, render, shader, and texture set records.
/// All references are indices into the corresponding tables and are not validated.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, PartialEq, Eq, Default)]
pub struct Mesh {
    pub tag: i16,
    pub unk_short0: i16,
    pub unk_byte0: u8,
    pub unk_byte1: u8,
    pub unk_short1: i16,
    pub mate_index: i32,
    pub rend_index: i32,
    pub shad_index: i32,
    pub tset_index: i32,
    /// The bone used for rigid skinning when the vertices have no weights.
    pub base_mesh_node_id: i32,
    pub vset_index: i32,
    pub pset_index: i32,
    pub base_mesh_dummy_id: i32,
    pub unk_int0: i32,
    pub reserve0: i32,
}
