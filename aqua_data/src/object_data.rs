//! The decoded contents of an Aqua object file.
//!
//! [AquaObject] owns every table as a list of records.
//! Vertex and index data is decoded to [VertexStore] and [StripData],
//! so the offsets and counts stored in [Vset] and [Pset] are recalculated when writing.
//!
//! # Examples
/*!
```no_run
use aqua_data::prelude::*;

# fn main() -> Result<(), Box<dyn std::error::Error>> {
let mut object = AquaObject::from_file("model.aqo")?;
println!("{} vertices", object.vertex_count());

// Make sure each mesh has its own vertex set.
object.split_vertex_sets_per_mesh()?;
object.write_to_file("model_split.aqo")?;
# Ok(())
# }
```
 */
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use aqua_lib::formats::material::{Mate, Rend, Shad};
use aqua_lib::formats::mesh::Mesh;
use aqua_lib::formats::objc::{Objc, Schema};
use aqua_lib::formats::strip::Pset;
use aqua_lib::formats::texture::{Texf, Tset, Tsta};
use aqua_lib::formats::vertex::Vset;
use aqua_lib::Vector3;
use thiserror::Error;

use crate::strip_data::StripData;
use crate::vtxl_data::{VertexStore, VertexStoreError};
use crate::AquaData;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod read;
mod split;
mod write;

pub use split::{split_vertex_sets, SplitError, SplitVertexSets};

/// Errors while reading an object.
#[derive(Debug, Error)]
pub enum ReadError {
    /// The stream ended before all the data was read.
    #[error("Unexpected end of stream at position {}.", position)]
    StreamExhausted { position: u64 },

    /// An error occurred while parsing a record.
    #[error(transparent)]
    BinRead(#[from] binread::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The vertex set references a declaration outside the shared declaration table.
    #[error(
        "Vertex set {} uses declaration {} but the declaration table has {} entries.",
        vset_index,
        declaration_index,
        declaration_count
    )]
    InvalidDeclarationIndex {
        vset_index: usize,
        declaration_index: i32,
        declaration_count: usize,
    },

    /// The vertex set has vertices but no valid stride.
    #[error("Vertex set {} has {} vertices with stride {}.", vset_index, count, stride)]
    ZeroStride {
        vset_index: usize,
        count: i32,
        stride: i32,
    },

    /// The computed offset for the data is negative or too large.
    #[error("Invalid offset {} for {}.", offset, data)]
    InvalidOffset { data: &'static str, offset: i64 },

    /// The topology set references indices past the end of the shared index buffer.
    #[error(
        "Topology set {} uses indices {}..{} but the index buffer has {} indices.",
        pset_index,
        start,
        start + count,
        total
    )]
    StripRange {
        pset_index: usize,
        start: i32,
        count: i32,
        total: i32,
    },
}

/// Errors while writing an object.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The vertex store has inconsistent attribute lengths.
    #[error("Vertex store {} is invalid: {}", vset_index, source)]
    InvalidVertexStore {
        vset_index: usize,
        source: VertexStoreError,
    },

    /// The value does not fit in the integer type used by the file.
    #[error("The value {} for {} exceeds the maximum supported value.", value, field)]
    IndexOverflow { field: &'static str, value: usize },

    /// Two lists that should have matching lengths differ in length.
    #[error(
        "Expected {} {} to match the number of {} but found {}.",
        expected,
        table,
        related,
        actual
    )]
    TableLengthMismatch {
        table: &'static str,
        related: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// An index in a record does not point to an element of the referenced table.
#[derive(Debug, Error, PartialEq, Eq)]
#[error(
    "Index {} is out of range for table {} with length {}.",
    index,
    table,
    len
)]
pub struct IndexError {
    pub table: &'static str,
    pub index: i64,
    pub len: usize,
}

fn get_checked<'a, T>(items: &'a [T], table: &'static str, index: i64) -> Result<&'a T, IndexError> {
    usize::try_from(index)
        .ok()
        .and_then(|i| items.get(i))
        .ok_or(IndexError {
            table,
            index,
            len: items.len(),
        })
}

/// A group of vertices split from the same source vertex.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnrmVertex {
    pub mesh_id: i32,
    pub vertex_id: i32,
}

/// The vertex groups used for smoothing normals across split vertices.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UnrmData {
    pub groups: Vec<Vec<UnrmVertex>>,
    pub padding0: f64,
    pub padding1: i32,
}

/// Tables in variant objects that are preserved without being decoded.
/// Each record is stored as its raw bytes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuxiliaryTables {
    pub pset2: Vec<Vec<u8>>,
    pub mesh2: Vec<Vec<u8>>,
}

pub(crate) const PSET2_RECORD_SIZE: usize = 0x18;
pub(crate) const MESH2_RECORD_SIZE: usize = 0x30;

/// A decoded Aqua object with every table and its vertex and index data.
///
/// Each element of [vsets](#structfield.vsets) has a corresponding element in [vertex_stores](#structfield.vertex_stores).
/// Each element of [psets](#structfield.psets) has a corresponding element in [strips](#structfield.strips).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct AquaObject {
    pub objc: Objc,
    pub vsets: Vec<Vset>,
    pub vertex_stores: Vec<VertexStore>,
    pub psets: Vec<Pset>,
    pub strips: Vec<StripData>,
    pub meshes: Vec<Mesh>,
    pub mates: Vec<Mate>,
    pub rends: Vec<Rend>,
    pub shads: Vec<Shad>,
    pub tstas: Vec<Tsta>,
    pub tsets: Vec<Tset>,
    pub texfs: Vec<Texf>,
    /// The global bone ids shared by all vertex sets of a variant object.
    pub bone_palette: Vec<u32>,
    pub unrm: Option<UnrmData>,
    pub auxiliary: AuxiliaryTables,
}

impl AquaObject {
    /// Creates an empty object with the given schema.
    pub fn new(schema: Schema) -> Self {
        Self {
            objc: Objc::new(schema),
            vsets: Vec::new(),
            vertex_stores: Vec::new(),
            psets: Vec::new(),
            strips: Vec::new(),
            meshes: Vec::new(),
            mates: Vec::new(),
            rends: Vec::new(),
            shads: Vec::new(),
            tstas: Vec::new(),
            tsets: Vec::new(),
            texfs: Vec::new(),
            bone_palette: Vec::new(),
            unrm: None,
            auxiliary: AuxiliaryTables::default(),
        }
    }

    pub fn schema(&self) -> Schema {
        self.objc.schema()
    }

    /// The total number of vertices for all vertex stores.
    pub fn vertex_count(&self) -> usize {
        self.vertex_stores.iter().map(VertexStore::len).sum()
    }

    /// The total number of indices for all strips.
    pub fn strip_index_count(&self) -> usize {
        self.strips
            .iter()
            .map(|s| usize::try_from(s.tri_id_count).unwrap_or_default())
            .sum()
    }

    pub fn mesh(&self, index: usize) -> Result<&Mesh, IndexError> {
        get_checked(&self.meshes, "MESH", index as i64)
    }

    pub fn mesh_vertex_set(&self, mesh_index: usize) -> Result<&Vset, IndexError> {
        let mesh = self.mesh(mesh_index)?;
        get_checked(&self.vsets, "VSET", mesh.vset_index as i64)
    }

    pub fn mesh_vertices(&self, mesh_index: usize) -> Result<&VertexStore, IndexError> {
        let mesh = self.mesh(mesh_index)?;
        get_checked(&self.vertex_stores, "VTXL", mesh.vset_index as i64)
    }

    pub fn mesh_strip(&self, mesh_index: usize) -> Result<&StripData, IndexError> {
        let mesh = self.mesh(mesh_index)?;
        get_checked(&self.strips, "strip", mesh.pset_index as i64)
    }

    pub fn mesh_material(&self, mesh_index: usize) -> Result<&Mate, IndexError> {
        let mesh = self.mesh(mesh_index)?;
        get_checked(&self.mates, "MATE", mesh.mate_index as i64)
    }

    pub fn mesh_render_state(&self, mesh_index: usize) -> Result<&Rend, IndexError> {
        let mesh = self.mesh(mesh_index)?;
        get_checked(&self.rends, "REND", mesh.rend_index as i64)
    }

    pub fn mesh_shader(&self, mesh_index: usize) -> Result<&Shad, IndexError> {
        let mesh = self.mesh(mesh_index)?;
        get_checked(&self.shads, "SHAD", mesh.shad_index as i64)
    }

    pub fn mesh_texture_set(&self, mesh_index: usize) -> Result<&Tset, IndexError> {
        let mesh = self.mesh(mesh_index)?;
        get_checked(&self.tsets, "TSET", mesh.tset_index as i64)
    }

    /// The texture file names for the texture set at `tset_index` in texture slot order.
    pub fn texture_set_files(&self, tset_index: usize) -> Result<Vec<&Texf>, IndexError> {
        let tset = get_checked(&self.tsets, "TSET", tset_index as i64)?;
        tset.tsta_tex_ids
            .iter()
            .map(|id| get_checked(&self.texfs, "TEXF", *id as i64))
            .collect()
    }

    /// The global bone ids for the weight indices of the vertex store at `vset_index`.
    ///
    /// Variant objects share a single palette for all vertex sets.
    pub fn bone_palette(&self, vset_index: usize) -> Result<Vec<u32>, IndexError> {
        let store = get_checked(&self.vertex_stores, "VTXL", vset_index as i64)?;
        match self.schema() {
            Schema::Classic => Ok(store.bone_palette.iter().map(|b| *b as u32).collect()),
            Schema::Variant => Ok(self.bone_palette.clone()),
        }
    }

    /// The bone used for the vertices of a variant mesh without skin weights.
    pub fn fallback_bone(&self, mesh_index: usize) -> Result<Option<i32>, IndexError> {
        let mesh = self.mesh(mesh_index)?;
        let store = self.mesh_vertices(mesh_index)?;
        let has_weights = !store.weights.is_empty() && store.weight_indices.is_some();
        match self.schema() {
            Schema::Variant if !has_weights => Ok(Some(mesh.base_mesh_node_id)),
            _ => Ok(None),
        }
    }

    /// Rewrites the vertex sets so that each mesh references its own vertex set.
    /// See [split_vertex_sets] for details.
    pub fn split_vertex_sets_per_mesh(&mut self) -> Result<(), SplitError> {
        let split = split_vertex_sets(
            &self.meshes,
            &self.vsets,
            &self.vertex_stores,
            &self.psets,
            &self.strips,
        )?;

        self.meshes = split.meshes;
        self.vsets = split.vsets;
        self.vertex_stores = split.vertex_stores;
        self.psets = split.psets;
        self.strips = split.strips;

        self.objc.common.vset_count = self.vsets.len() as i32;
        self.objc.common.pset_count = self.psets.len() as i32;
        Ok(())
    }

    /// Recalculates the bounding sphere and bounding box from the positions of all vertex stores.
    pub fn update_bounds(&mut self) {
        let positions: Vec<_> = self
            .vertex_stores
            .iter()
            .flat_map(|s| s.positions.iter())
            .map(|p| geometry_tools::glam::Vec3A::new(p.x, p.y, p.z))
            .collect();

        let bounds = &mut self.objc.common.bounds;
        if positions.is_empty() {
            *bounds = Default::default();
            return;
        }

        let (sphere_center, sphere_radius) =
            geometry_tools::bounding::calculate_bounding_sphere_from_points(&positions);
        let (aabb_min, aabb_max) = geometry_tools::bounding::calculate_aabb_from_points(&positions);
        let aabb_center = (aabb_min + aabb_max) / 2.0;
        let half_extents = (aabb_max - aabb_min) / 2.0;

        bounds.model_center = Vector3::new(sphere_center.x, sphere_center.y, sphere_center.z);
        bounds.bounding_radius = sphere_radius;
        bounds.model_center2 = Vector3::new(aabb_center.x, aabb_center.y, aabb_center.z);
        bounds.half_extents = Vector3::new(half_extents.x, half_extents.y, half_extents.z);
    }
}

impl AquaData for AquaObject {
    type ReadError = ReadError;
    type WriteError = WriteError;

    fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Self::ReadError> {
        let mut reader = Cursor::new(std::fs::read(path)?);
        Self::read(&mut reader)
    }

    fn read<R: Read + Seek>(reader: &mut R) -> Result<Self, Self::ReadError> {
        match read::read_object(reader) {
            Err(ReadError::BinRead(binread::Error::Io(e)))
            | Err(ReadError::Io(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                Err(ReadError::StreamExhausted {
                    position: reader.stream_position().unwrap_or_default(),
                })
            }
            result => result,
        }
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<(), Self::WriteError> {
        let bytes = write::write_object(self)?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Self::WriteError> {
        let bytes = write::write_object(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_hex_eq;
    use aqua_write::AquaWrite;
    use crate::vtxl_data::Channel;
    use aqua_lib::formats::mesh::{MESH_TAG_CLASSIC, MESH_TAG_VARIANT};
    use aqua_lib::formats::strip::{StripHeader, PSET_TAG_CLASSIC, PSET_TAG_VARIANT};
    use aqua_lib::formats::texture::TSTA_TAG;
    use approx::assert_relative_eq;
    use glam::{Vec2, Vec3, Vec4};

    fn quad_positions() -> Vec<Vec3> {
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
        ]
    }

    fn add_material(object: &mut AquaObject) {
        object.mates.push(Mate {
            mat_name: "face".into(),
            ..Default::default()
        });
        object.rends.push(Rend::default());
        object.shads.push(Shad {
            pixel_shader: "0100p".into(),
            vertex_shader: "0100".into(),
            ..Default::default()
        });
        object.tstas.push(Tsta {
            tag: TSTA_TAG,
            tex_name: "face_d.dds".into(),
            ..Default::default()
        });
        object.tsets.push(Tset {
            tex_count: 1,
            tsta_tex_ids: vec![0],
            ..Default::default()
        });
        object.texfs.push(Texf {
            tex_name: "face_d.dds".into(),
        });
    }

    fn classic_object() -> AquaObject {
        let mut object = AquaObject::new(Schema::Classic);
        add_material(&mut object);

        object.vsets.push(Vset::default());
        object.vertex_stores.push(VertexStore {
            positions: quad_positions(),
            normals: Channel::from_legacy(vec![Vec3::Z; 4]),
            uv1: Channel::from_legacy(vec![
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(0.0, 1.0),
                Vec2::new(1.0, 1.0),
            ]),
            weights: Channel::from_legacy(vec![Vec4::X, Vec4::new(0.5, 0.5, 0.0, 0.0), Vec4::X, Vec4::X]),
            weight_indices: Some(vec![[0, 0, 0, 0], [0, 1, 0, 0], [1, 0, 0, 0], [1, 0, 0, 0]]),
            bone_palette: vec![3, 7],
            edge_verts: vec![1, 2],
            ..Default::default()
        });

        object.psets.push(Pset {
            tag: PSET_TAG_CLASSIC,
            face_type: 1,
            ..Default::default()
        });
        object.strips.push(StripData::from_header(
            &StripHeader {
                tri_id_count: 4,
                ..Default::default()
            },
            vec![0, 1, 2, 3],
        ));

        object.meshes.push(Mesh {
            tag: MESH_TAG_CLASSIC,
            base_mesh_dummy_id: -1,
            ..Default::default()
        });

        object.unrm = Some(UnrmData {
            groups: vec![
                vec![
                    UnrmVertex {
                        mesh_id: 0,
                        vertex_id: 1,
                    },
                    UnrmVertex {
                        mesh_id: 0,
                        vertex_id: 2,
                    },
                ],
                vec![UnrmVertex {
                    mesh_id: 0,
                    vertex_id: 3,
                }],
            ],
            padding0: 0.0,
            padding1: 0,
        });
        object
    }

    fn variant_object() -> AquaObject {
        let mut object = AquaObject::new(Schema::Variant);
        add_material(&mut object);

        // The second vertex set has a different layout and smaller stride.
        object.vsets.push(Vset::default());
        object.vertex_stores.push(VertexStore {
            positions: quad_positions(),
            normals: Channel::from_quantized(vec![[0, 0, 32767, 0]; 4]),
            uv1: Channel::from_quantized(vec![[0, 0], [32767, 0], [0, 32767], [32767, 32767]]),
            weights: Channel::from_quantized(vec![[65535, 0, 0, 0]; 4]),
            weight_indices: Some(vec![[0, 0, 0, 0], [1, 0, 0, 0], [2, 0, 0, 0], [2, 0, 0, 0]]),
            colors: Some(vec![[255, 128, 64, 255]; 4]),
            ..Default::default()
        });
        object.vsets.push(Vset::default());
        object.vertex_stores.push(VertexStore {
            positions: vec![Vec3::new(2.0, 0.0, 0.0), Vec3::new(3.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 0.0)],
            edge_verts: vec![0],
            ..Default::default()
        });
        object.bone_palette = vec![5, 9, 12];

        for i in 0..2 {
            object.psets.push(Pset {
                tag: PSET_TAG_VARIANT,
                face_type: 1,
                ..Default::default()
            });
            object.meshes.push(Mesh {
                tag: MESH_TAG_VARIANT,
                vset_index: i,
                pset_index: i,
                base_mesh_node_id: 4,
                ..Default::default()
            });
        }
        object
            .strips
            .push(StripData::triangle_list(vec![0, 1, 2, 2, 1, 3]));
        object.strips.push(StripData::triangle_list(vec![0, 1, 2]));

        object.auxiliary = AuxiliaryTables {
            pset2: vec![vec![1u8; PSET2_RECORD_SIZE]],
            mesh2: vec![vec![2u8; MESH2_RECORD_SIZE], vec![3u8; MESH2_RECORD_SIZE]],
        };
        object
    }

    fn write_read(object: &AquaObject) -> (Vec<u8>, AquaObject) {
        let mut bytes = Vec::new();
        object.write(&mut bytes).unwrap();
        let new_object = AquaObject::read(&mut Cursor::new(&bytes)).unwrap();
        (bytes, new_object)
    }

    fn assert_records_eq(expected: &AquaObject, actual: &AquaObject) {
        assert_eq!(expected.vertex_stores, actual.vertex_stores);
        assert_eq!(expected.strips, actual.strips);
        assert_eq!(expected.meshes, actual.meshes);
        assert_eq!(expected.mates, actual.mates);
        assert_eq!(expected.rends, actual.rends);
        assert_eq!(expected.shads, actual.shads);
        assert_eq!(expected.tstas, actual.tstas);
        assert_eq!(expected.tsets, actual.tsets);
        assert_eq!(expected.texfs, actual.texfs);
        assert_eq!(expected.bone_palette, actual.bone_palette);
        assert_eq!(expected.unrm, actual.unrm);
        assert_eq!(expected.auxiliary, actual.auxiliary);
    }

    #[test]
    fn classic_write_read() {
        let object = classic_object();
        let (bytes, new_object) = write_read(&object);
        assert_eq!(0, bytes.len() % 0x10);

        assert_eq!(Schema::Classic, new_object.schema());
        assert_records_eq(&object, &new_object);

        let common = &new_object.objc.common;
        assert_eq!(1, common.vset_count);
        assert_eq!(1, common.pset_count);
        assert_eq!(4, common.total_vtxl_count);
        assert_eq!(4, common.total_strip_faces);
        assert_ne!(0, common.unrm_offset);

        // position, weights, normal, weight indices, uv1
        let vset = &new_object.vsets[0];
        assert_eq!(12 + 16 + 12 + 4 + 8, vset.vert_data_size);
        assert_eq!(5, vset.vtxe_count);
        assert_eq!(2, vset.bone_palette_count);
        assert_eq!(2, vset.edge_verts_count);
        assert_eq!(vset.vert_data_size, common.largest_vtxl);
        assert_eq!(4, new_object.psets[0].pset_face_count);
    }

    #[test]
    fn classic_rewrite_is_identical() {
        let (bytes, new_object) = write_read(&classic_object());
        let mut new_bytes = Vec::new();
        new_object.write(&mut new_bytes).unwrap();
        assert_hex_eq!(&bytes, &new_bytes);
    }

    #[test]
    fn variant_write_read() {
        let object = variant_object();
        let (_, new_object) = write_read(&object);

        assert_eq!(Schema::Variant, new_object.schema());
        assert_records_eq(&object, &new_object);

        let common = &new_object.objc.common;
        assert_eq!(2, common.vset_count);
        assert_eq!(7, common.total_vtxl_count);
        assert_eq!(9, common.total_strip_faces);

        // Both vertex sets use the stride of the shared vertex pool.
        // position, weights, normal, color, weight indices, uv1
        let stride = 12 + 8 + 8 + 4 + 4 + 4;
        assert_eq!(stride, common.largest_vtxl);
        assert_eq!(stride, new_object.vsets[0].vert_data_size);
        assert_eq!(stride, new_object.vsets[1].vert_data_size);

        // Each layout has its own declaration.
        assert_eq!(0, new_object.vsets[0].vtxe_count);
        assert_eq!(1, new_object.vsets[1].vtxe_count);
        assert_eq!(0, new_object.vsets[0].vtxl_start_vert);
        assert_eq!(4, new_object.vsets[1].vtxl_start_vert);

        assert_eq!(0, new_object.psets[0].strip_start_count);
        assert_eq!(6, new_object.psets[1].strip_start_count);
        assert_eq!(3, new_object.psets[1].pset_face_count);

        let header = new_object.objc.variant_header().unwrap();
        assert_eq!(2, header.block.vtxe_count);
        assert_eq!(1, header.block.pset2_count);
        assert_eq!(2, header.extended.mesh2_count);
    }

    #[test]
    fn variant_rewrite_is_identical() {
        let (bytes, new_object) = write_read(&variant_object());
        let mut new_bytes = Vec::new();
        new_object.write(&mut new_bytes).unwrap();
        assert_hex_eq!(&bytes, &new_bytes);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn object_records_derive_serde() {
        // Requires the derive_serde feature of aqua_lib for the header records.
        fn assert_serde<T: Serialize + for<'de> Deserialize<'de>>() {}
        assert_serde::<Objc>();
        assert_serde::<Vset>();
        assert_serde::<AquaObject>();
    }

    #[test]
    fn variant_narrow_read() {
        // The narrow header has no extended block.
        let mut object = variant_object();
        object.auxiliary.mesh2 = Vec::new();
        let (mut bytes, _) = write_read(&object);
        bytes[0..4].copy_from_slice(&0xC32i32.to_le_bytes());

        let new_object = AquaObject::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(Schema::Variant, new_object.schema());
        assert_eq!(0xC33, new_object.objc.common.object_type);
        assert_eq!(
            vec![vec![1u8; PSET2_RECORD_SIZE]],
            new_object.auxiliary.pset2
        );
        assert!(new_object.auxiliary.mesh2.is_empty());
        assert_records_eq(&object, &new_object);

        let header = new_object.objc.variant_header().unwrap();
        assert_eq!(1, header.block.pset2_count);
        assert_eq!(0, header.extended.mesh2_count);
    }

    #[test]
    fn write_mismatched_vertex_stores() {
        let mut object = classic_object();
        object.vertex_stores.clear();
        let result = object.write(&mut Vec::<u8>::new());
        assert!(matches!(
            result,
            Err(WriteError::TableLengthMismatch {
                expected: 1,
                actual: 0,
                ..
            })
        ));
    }

    #[test]
    fn write_invalid_vertex_store() {
        let mut object = classic_object();
        object.vertex_stores[0].colors = Some(vec![[0u8; 4]; 2]);
        let result = object.write(&mut Vec::<u8>::new());
        assert!(matches!(
            result,
            Err(WriteError::InvalidVertexStore { vset_index: 0, .. })
        ));
    }

    #[test]
    fn read_empty() {
        let result = AquaObject::read(&mut Cursor::new(Vec::new()));
        assert!(matches!(result, Err(ReadError::StreamExhausted { .. })));
    }

    #[test]
    fn read_truncated_header() {
        let mut bytes = Vec::new();
        classic_object().write(&mut bytes).unwrap();
        bytes.truncate(0x20);

        let result = AquaObject::read(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(ReadError::StreamExhausted { .. })));
    }

    #[test]
    fn read_truncated_tables() {
        let mut bytes = Vec::new();
        classic_object().write(&mut bytes).unwrap();
        let header_size = Objc::new(Schema::Classic).size_in_bytes() as usize;
        bytes.truncate(header_size);

        let result = AquaObject::read(&mut Cursor::new(bytes));
        assert!(matches!(result, Err(ReadError::StreamExhausted { .. })));
    }

    #[test]
    fn read_invalid_declaration_index() {
        let (mut bytes, object) = write_read(&variant_object());

        // Point the second vertex set to a declaration that doesn't exist.
        let vset_size = Vset::default().size_in_bytes() as usize;
        let vtxe_count = object.objc.common.vset_offset as usize + vset_size + 4;
        bytes[vtxe_count..vtxe_count + 4].copy_from_slice(&5i32.to_le_bytes());

        let result = AquaObject::read(&mut Cursor::new(bytes));
        assert!(matches!(
            result,
            Err(ReadError::InvalidDeclarationIndex {
                vset_index: 1,
                declaration_index: 5,
                declaration_count: 2
            })
        ));
    }

    #[test]
    fn read_zero_stride() {
        let (mut bytes, object) = write_read(&classic_object());

        let vert_data_size = object.objc.common.vset_offset as usize;
        bytes[vert_data_size..vert_data_size + 4].copy_from_slice(&0i32.to_le_bytes());

        let result = AquaObject::read(&mut Cursor::new(bytes));
        assert!(matches!(
            result,
            Err(ReadError::ZeroStride {
                vset_index: 0,
                count: 4,
                stride: 0
            })
        ));
    }

    #[test]
    fn counts() {
        let object = variant_object();
        assert_eq!(7, object.vertex_count());
        assert_eq!(9, object.strip_index_count());

        let object = AquaObject::new(Schema::Classic);
        assert_eq!(0, object.vertex_count());
        assert_eq!(0, object.strip_index_count());
    }

    #[test]
    fn mesh_accessors() {
        let object = classic_object();
        assert_eq!(4, object.mesh_vertices(0).unwrap().len());
        assert_eq!(Vset::default(), *object.mesh_vertex_set(0).unwrap());
        assert_eq!(vec![0, 1, 2, 3], object.mesh_strip(0).unwrap().indices);
        assert_eq!("face", object.mesh_material(0).unwrap().mat_name.to_string_lossy());
        assert_eq!(Rend::default(), *object.mesh_render_state(0).unwrap());
        assert_eq!("0100", object.mesh_shader(0).unwrap().vertex_shader.to_string_lossy());
        assert_eq!(vec![0], object.mesh_texture_set(0).unwrap().tsta_tex_ids);
        assert_eq!(
            vec![&Texf {
                tex_name: "face_d.dds".into()
            }],
            object.texture_set_files(0).unwrap()
        );
    }

    #[test]
    fn mesh_accessors_invalid_index() {
        let mut object = classic_object();
        assert_eq!(
            Err(IndexError {
                table: "MESH",
                index: 1,
                len: 1
            }),
            object.mesh(1).map(|_| ())
        );

        object.meshes[0].mate_index = -1;
        assert_eq!(
            Err(IndexError {
                table: "MATE",
                index: -1,
                len: 1
            }),
            object.mesh_material(0).map(|_| ())
        );

        object.tsets[0].tsta_tex_ids = vec![3];
        assert_eq!(
            Err(IndexError {
                table: "TEXF",
                index: 3,
                len: 1
            }),
            object.texture_set_files(0).map(|_| ())
        );
    }

    #[test]
    fn mesh_strip_invalid_index() {
        let mut object = classic_object();
        object.strips.clear();
        assert_eq!(
            Err(IndexError {
                table: "strip",
                index: 0,
                len: 0
            }),
            object.mesh_strip(0).map(|_| ())
        );
    }

    #[test]
    fn bone_palettes() {
        let object = classic_object();
        assert_eq!(Ok(vec![3, 7]), object.bone_palette(0));

        let object = variant_object();
        assert_eq!(Ok(vec![5, 9, 12]), object.bone_palette(1));
        assert!(object.bone_palette(2).is_err());
    }

    #[test]
    fn fallback_bones() {
        let object = variant_object();
        assert_eq!(Ok(None), object.fallback_bone(0));
        assert_eq!(Ok(Some(4)), object.fallback_bone(1));

        let object = classic_object();
        assert_eq!(Ok(None), object.fallback_bone(0));
    }

    #[test]
    fn split_vertex_sets_updates_counts() {
        let mut object = variant_object();
        object.meshes[1].vset_index = 0;
        object.strips[1] = StripData::triangle_list(vec![1, 3, 2]);
        object.split_vertex_sets_per_mesh().unwrap();

        assert_eq!(2, object.vsets.len());
        assert_eq!(2, object.objc.common.vset_count);
        assert_eq!(2, object.objc.common.pset_count);
        assert_eq!(3, object.mesh_vertices(1).unwrap().len());
        assert_eq!(vec![0, 1, 2], object.mesh_strip(1).unwrap().indices);
    }

    #[test]
    fn update_bounds_quad() {
        let mut object = classic_object();
        object.update_bounds();

        let bounds = &object.objc.common.bounds;
        assert_relative_eq!(0.5, bounds.model_center2.x);
        assert_relative_eq!(0.5, bounds.model_center2.y);
        assert_relative_eq!(0.0, bounds.model_center2.z);
        assert_relative_eq!(0.5, bounds.half_extents.x);
        assert_relative_eq!(0.5, bounds.half_extents.y);
        assert_relative_eq!(0.0, bounds.half_extents.z);
        assert!(bounds.bounding_radius >= 2.0f32.sqrt() / 2.0 - 1e-5);
    }

    #[test]
    fn update_bounds_empty() {
        let mut object = AquaObject::new(Schema::Classic);
        object.objc.common.bounds.bounding_radius = 3.0;
        object.update_bounds();
        assert_eq!(0.0, object.objc.common.bounds.bounding_radius);
    }
}
