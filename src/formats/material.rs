//! Material, render state, and shader records.
use aqua_write::AquaWrite;
use binread::BinRead;

use crate::{FixedString, Vector4};

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, PartialEq)]
pub struct Mate {
    pub diffuse_rgba: Vector4,
    pub unk_rgba0: Vector4,
    /// Values for the specular map.
    pub s_rgba: Vector4,
    pub unk_rgba1: Vector4,
    pub reserve0: i32,
    pub unk_float0: f32,
    pub unk_float1: f32,
    pub unk_int0: i32,
    pub unk_int1: i32,
    /// "opaque", "hollow", "blendalpha", or "add".
    pub alpha_type: FixedString,
    pub mat_name: FixedString,
}

impl Default for Mate {
    fn default() -> Self {
        Self {
            diffuse_rgba: Vector4::new(1.0, 1.0, 1.0, 1.0),
            unk_rgba0: Vector4::new(0.9, 0.9, 0.9, 1.0),
            s_rgba: Vector4::new(0.0, 0.0, 0.0, 1.0),
            unk_rgba1: Vector4::new(0.0, 0.0, 0.0, 1.0),
            reserve0: 0,
            unk_float0: 8.0,
            unk_float1: 1.0,
            unk_int0: 100,
            unk_int1: 0,
            alpha_type: "opaque".into(),
            mat_name: FixedString::default(),
        }
    }
}

/// Render state flags.
/// Equality compares every field, so equal records can be shared between meshes.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rend {
    pub tag: i32,
    pub unk0: i32,
    /// 0 for backface culling and 1 for two sided.
    pub two_sided: i32,
    pub int_0c: i32,
    pub unk1: i32,
    pub unk2: i32,
    pub unk3: i32,
    pub unk4: i32,
    pub unk5: i32,
    pub unk6: i32,
    pub unk7: i32,
    pub unk8: i32,
    pub unk9: i32,
    /// Likely the alpha cutoff.
    pub unk10: i32,
    pub unk11: i32,
    pub unk12: i32,
    pub unk13: i32,
}

impl Default for Rend {
    fn default() -> Self {
        Self {
            tag: 0x1FF,
            unk0: 3,
            two_sided: 0,
            int_0c: 0,
            unk1: 5,
            unk2: 6,
            unk3: 1,
            unk4: 0,
            unk5: 5,
            unk6: 6,
            unk7: 1,
            unk8: 1,
            unk9: 5,
            unk10: 0,
            unk11: 1,
            unk12: 4,
            unk13: 1,
        }
    }
}

#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, PartialEq, Eq, Default)]
pub struct Shad {
    pub unk0: i32,
    pub pixel_shader: FixedString,
    pub vertex_shader: FixedString,
    /// Unused for classic objects.
    pub shad_detail_offset: i32,
    /// Unused for classic objects.
    pub shad_extra_offset: i32,
}
