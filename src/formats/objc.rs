//! The object header that stores the counts and offsets for every table.
//!
//! Two schemas share the same leading block. Variant objects append a block describing
//! the shared vertex declaration table, bone palette, and auxiliary tables.
//! The narrower variant type 0xC32 is normalized to 0xC33 after reading.
use aqua_write::AquaWrite;
use binread::{
    io::{Read, Seek},
    BinRead, BinResult, ReadOptions,
};
use log::warn;

use crate::Vector3;

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

/// The canonical type for variant objects.
pub const OBJC_TYPE_VARIANT: i32 = 0xC33;

/// The narrower variant type. Normalized to [OBJC_TYPE_VARIANT] after reading.
pub const OBJC_TYPE_VARIANT_NARROW: i32 = 0xC32;

/// The type used for newly created classic objects.
pub const OBJC_TYPE_CLASSIC: i32 = 0xC2A;

/// The on-disk header layout selected by the type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderLayout {
    Classic,
    /// The variant block without the extended auxiliary block.
    VariantNarrow,
    /// The variant block followed by the extended auxiliary block.
    Variant,
}

const HEADER_LAYOUTS: [(i32, HeaderLayout); 2] = [
    (OBJC_TYPE_VARIANT_NARROW, HeaderLayout::VariantNarrow),
    (OBJC_TYPE_VARIANT, HeaderLayout::Variant),
];

impl HeaderLayout {
    /// Finds the layout for `object_type`.
    /// Unrecognized types use the classic layout.
    pub fn from_object_type(object_type: i32) -> Self {
        match HEADER_LAYOUTS.iter().find(|(t, _)| *t == object_type) {
            Some((_, layout)) => *layout,
            None => {
                if object_type > OBJC_TYPE_VARIANT {
                    warn!(
                        "Unrecognized object type 0x{:X}. Reading as a classic object.",
                        object_type
                    );
                }
                HeaderLayout::Classic
            }
        }
    }
}

/// The schema of an object after normalization.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Vertex sets store their own declarations and vertex buffers.
    /// Topology is stored as triangle strips.
    Classic,
    /// Vertex sets index into a shared declaration table and vertex pool.
    /// Topology is stored as triangle lists.
    Variant,
}

#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingVolume {
    pub model_center: Vector3,
    pub reserve0: f32,
    /// The distance of the furthest point from the center.
    pub bounding_radius: f32,
    pub model_center2: Vector3,
    pub reserve1: f32,
    pub half_extents: Vector3,
}

/// The fields shared by both schemas.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, PartialEq, Default)]
pub struct ObjcCommon {
    pub object_type: i32,
    pub size: i32,
    pub unk_mesh_value: i32,
    /// The largest vertex size in bytes.
    pub largest_vtxl: i32,
    pub total_strip_faces: i32,
    pub global_strip_offset: i32,
    pub total_vtxl_count: i32,
    pub vtxl_start_offset: i32,
    pub unk_struct_count: i32,
    pub vset_count: i32,
    pub vset_offset: i32,
    pub pset_count: i32,
    pub pset_offset: i32,
    pub mesh_count: i32,
    pub mesh_offset: i32,
    pub mate_count: i32,
    pub mate_offset: i32,
    pub rend_count: i32,
    pub rend_offset: i32,
    pub shad_count: i32,
    pub shad_offset: i32,
    pub tsta_count: i32,
    pub tsta_offset: i32,
    pub tset_count: i32,
    pub tset_offset: i32,
    pub texf_count: i32,
    pub texf_offset: i32,
    pub bounds: BoundingVolume,
    pub unk_count0: i32,
    pub unrm_offset: i32,
}

#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, PartialEq, Eq, Default)]
pub struct VariantBlock {
    pub vtxe_count: i32,
    pub vtxe_offset: i32,
    pub bone_palette_offset: i32,
    pub reserve0: i32,
    pub reserve1: i32,
    pub reserve2: i32,
    pub reserve3: i32,
    pub unk_count1: i32,
    pub unk_offset1: i32,
    pub pset2_count: i32,
    pub pset2_offset: i32,
}

/// Only present for type 0xC33.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, PartialEq, Eq, Default)]
pub struct VariantExtendedBlock {
    pub mesh2_count: i32,
    pub mesh2_offset: i32,
    pub unk_int0: i32,
    pub unk_count2: i32,
    pub unk_offset2: i32,
    pub unk_offset3: i32,
    pub unk_offset4: i32,
    pub unk_count3: i32,
}

/// The additional header fields for variant objects.
/// Narrow headers are widened with a default extended block.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(AquaWrite, Debug, Clone, PartialEq, Eq, Default)]
pub struct VariantHeader {
    pub block: VariantBlock,
    pub extended: VariantExtendedBlock,
}

#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjcSchema {
    Classic,
    Variant(VariantHeader),
}

impl AquaWrite for ObjcSchema {
    fn aqua_write<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            ObjcSchema::Classic => Ok(()),
            ObjcSchema::Variant(header) => header.aqua_write(writer),
        }
    }

    fn size_in_bytes(&self) -> u64 {
        match self {
            ObjcSchema::Classic => 0,
            ObjcSchema::Variant(header) => header.size_in_bytes(),
        }
    }
}

/// The object header.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(AquaWrite, Debug, Clone, PartialEq)]
pub struct Objc {
    pub common: ObjcCommon,
    pub schema: ObjcSchema,
}

impl Objc {
    /// Creates an empty header for the given schema using the canonical type.
    pub fn new(schema: Schema) -> Self {
        match schema {
            Schema::Classic => Self {
                common: ObjcCommon {
                    object_type: OBJC_TYPE_CLASSIC,
                    ..Default::default()
                },
                schema: ObjcSchema::Classic,
            },
            Schema::Variant => Self {
                common: ObjcCommon {
                    object_type: OBJC_TYPE_VARIANT,
                    ..Default::default()
                },
                schema: ObjcSchema::Variant(VariantHeader::default()),
            },
        }
    }

    pub fn schema(&self) -> Schema {
        match self.schema {
            ObjcSchema::Classic => Schema::Classic,
            ObjcSchema::Variant(_) => Schema::Variant,
        }
    }

    pub fn variant_header(&self) -> Option<&VariantHeader> {
        match &self.schema {
            ObjcSchema::Classic => None,
            ObjcSchema::Variant(header) => Some(header),
        }
    }
}

impl BinRead for Objc {
    type Args = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        options: &ReadOptions,
        _args: Self::Args,
    ) -> BinResult<Self> {
        let mut common = ObjcCommon::read_options(reader, options, ())?;

        let schema = match HeaderLayout::from_object_type(common.object_type) {
            HeaderLayout::Classic => ObjcSchema::Classic,
            HeaderLayout::VariantNarrow => ObjcSchema::Variant(VariantHeader {
                block: VariantBlock::read_options(reader, options, ())?,
                extended: VariantExtendedBlock::default(),
            }),
            HeaderLayout::Variant => ObjcSchema::Variant(VariantHeader {
                block: VariantBlock::read_options(reader, options, ())?,
                extended: VariantExtendedBlock::read_options(reader, options, ())?,
            }),
        };

        if let ObjcSchema::Variant(_) = schema {
            common.object_type = OBJC_TYPE_VARIANT;
        }

        Ok(Self { common, schema })
    }
}
