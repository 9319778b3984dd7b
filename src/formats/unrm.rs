use aqua_write::AquaWrite;
use binread::BinRead;

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

/// Links vertices that were split from the same source vertex.
///
/// The group counts, mesh ids, and vertex ids are each stored at their own offset.
/// Group `i` contains `vert_group_count[i]` consecutive entries in both id lists.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, PartialEq, Default)]
pub struct UnrmHeader {
    pub vert_group_count_count: i32,
    pub vert_group_count_offset: i32,
    /// The total entries in the mesh id and vertex id lists.
    pub vert_count: i32,
    pub mesh_id_offset: i32,
    pub vert_id_offset: i32,
    pub padding0: f64,
    pub padding1: i32,
}
