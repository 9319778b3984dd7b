//! Vertex set and vertex declaration records.
use aqua_write::AquaWrite;
use binread::BinRead;

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

/// Describes the vertex data for a mesh.
///
/// Classic objects use [vtxe_offset](#structfield.vtxe_offset) and [vtxl_offset](#structfield.vtxl_offset).
/// Variant objects store an index into the shared declaration table in [vtxe_count](#structfield.vtxe_count)
/// and the first vertex in the shared vertex pool in [vtxl_start_vert](#structfield.vtxl_start_vert).
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, PartialEq, Eq, Default)]
pub struct Vset {
    /// The stride in bytes for each vertex.
    pub vert_data_size: i32,
    pub vtxe_count: i32,
    pub vtxe_offset: i32,
    pub vtxl_count: i32,
    pub vtxl_offset: i32,
    pub vtxl_start_vert: i32,
    pub bone_palette_count: i32,
    pub bone_palette_offset: i32,
    pub unk0: i32,
    pub unk1: i32,
    pub unk2: i32,
    pub edge_verts_count: i32,
    pub edge_verts_offset: i32,
}

/// A single attribute in a vertex declaration.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VtxeElement {
    /// The attribute usage like positions or normals.
    pub data_type: i32,
    /// The component type and count.
    pub struct_variation: i32,
    /// The offset in bytes from the start of the vertex.
    pub relative_address: i32,
    pub reserve0: i32,
}

/// An entry in the shared vertex declaration table of variant objects.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VtxeDescriptor {
    pub element_count: i32,
    pub element_offset: i32,
}
