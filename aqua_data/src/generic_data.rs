//! Format independent staging types for converting triangle meshes to Aqua objects.
//!
//! Meshes from other formats are first converted to [GenericTriangles] and [GenericMaterial].
//! Meshes using more than one material or more bones than the object supports
//! are split before being added with [AquaObject::push_mesh].
use std::collections::BTreeSet;

use ahash::AHashMap;
use aqua_lib::formats::material::{Mate, Rend, Shad};
use aqua_lib::formats::mesh::{Mesh, MESH_TAG_CLASSIC, MESH_TAG_VARIANT};
use aqua_lib::formats::objc::Schema;
use aqua_lib::formats::strip::{Pset, PSET_TAG_CLASSIC, PSET_TAG_VARIANT};
use aqua_lib::formats::texture::{Texf, Tset, Tsta, TSTA_TAG};
use aqua_lib::formats::vertex::Vset;
use aqua_lib::{FixedString, Vector4};
use glam::Vec4;
use itertools::Itertools;
use log::debug;
use thiserror::Error;

use crate::object_data::AquaObject;
use crate::strip_data::{StripData, StripError, Stripifier};
use crate::vtxl_data::{VertexStore, VertexStoreError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The maximum number of bones for a single vertex set in classic objects.
pub const CLASSIC_BONE_LIMIT: usize = 15;

/// Errors while splitting meshes by bone count.
#[derive(Debug, Error)]
pub enum PartitionError {
    /// A single triangle uses more bones than the limit.
    #[error(
        "Triangle {} uses {} bones, which exceeds the limit of {}.",
        triangle,
        bone_count,
        max_bones
    )]
    TooManyBones {
        triangle: usize,
        bone_count: usize,
        max_bones: usize,
    },

    /// A weight index does not point to an element of the bone palette.
    #[error(
        "Vertex {} uses palette index {} but the palette has {} bones.",
        vertex,
        palette_index,
        palette_len
    )]
    InvalidPaletteIndex {
        vertex: usize,
        palette_index: u8,
        palette_len: usize,
    },

    #[error(transparent)]
    VertexStore(#[from] VertexStoreError),
}

/// Errors while adding staged meshes and materials to an object.
#[derive(Debug, Error)]
pub enum PushMeshError {
    #[error(transparent)]
    Strip(#[from] StripError),

    #[error(transparent)]
    VertexStore(#[from] VertexStoreError),

    /// The global bone id does not fit in the palette of a classic object.
    #[error("Bone id {} exceeds the maximum bone id {}.", bone, u16::MAX)]
    BoneOverflow { bone: u32 },

    /// The shared bone palette of a variant object can only be indexed with bytes.
    #[error("The shared bone palette has {} bones, which exceeds the limit of 256.", len)]
    PaletteOverflow { len: usize },

    /// A weighted slot does not point to an element of the mesh's bone palette.
    #[error(
        "Vertex {} uses palette index {} but the palette has {} bones.",
        vertex,
        palette_index,
        palette_len
    )]
    InvalidPaletteIndex {
        vertex: usize,
        palette_index: u8,
        palette_len: usize,
    },

    /// The material has more textures than a texture set can store.
    #[error("Texture count {} exceeds the maximum of 16.", count)]
    TooManyTextures { count: usize },

    /// The number of vertices or triangles can't be stored with 16-bit indices.
    #[error("Vertex count {} exceeds the maximum supported vertex count.", count)]
    TooManyVertices { count: usize },
}

/// A triangle mesh with per triangle material ids.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenericTriangles {
    pub vertices: VertexStore,
    pub triangles: Vec<[u16; 3]>,
    /// The material for each triangle or empty if all triangles use the same material.
    pub material_ids: Vec<i32>,
    /// Converts the weight indices of [vertices](#structfield.vertices) to global bone ids.
    pub bone_palette: Vec<u32>,
    pub base_mesh_node_id: i32,
    pub base_mesh_dummy_id: i32,
}

impl GenericTriangles {
    pub fn new(vertices: VertexStore, triangles: Vec<[u16; 3]>) -> Self {
        Self {
            vertices,
            triangles,
            ..Default::default()
        }
    }

    /// Creates triangles from a flat triangle list.
    /// Trailing indices that don't form a triangle are ignored.
    pub fn from_indices(vertices: VertexStore, indices: &[u16]) -> Self {
        let triangles = indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();
        Self::new(vertices, triangles)
    }

    /// The triangles as a flat triangle list.
    pub fn indices(&self) -> Vec<u16> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Returns `true` if the triangles use more than one material.
    pub fn needs_splitting(&self) -> bool {
        self.material_ids.iter().unique().nth(1).is_some()
    }

    /// Creates one mesh for each material id in the order the ids first appear.
    /// Only the vertices referenced by each material's triangles are kept.
    pub fn split_by_material(&self) -> Result<Vec<(i32, GenericTriangles)>, VertexStoreError> {
        if !self.needs_splitting() {
            let id = self.material_ids.first().copied().unwrap_or_default();
            return Ok(vec![(id, self.clone())]);
        }

        self.material_ids
            .iter()
            .unique()
            .map(|id| -> Result<(i32, GenericTriangles), VertexStoreError> {
                let triangles: Vec<_> = self
                    .material_ids
                    .iter()
                    .positions(|m| m == id)
                    .filter(|t| *t < self.triangles.len())
                    .collect();
                let (part, _) = self.extract_triangles(&triangles)?;
                Ok((*id, part))
            })
            .collect()
    }

    /// Splits the triangles into meshes that each use at most `max_bones` bones.
    ///
    /// Triangles are added to the current mesh until the next triangle would exceed the limit.
    /// The weight indices of each mesh are remapped to a new palette with only the used bones.
    /// Vertices used by more than one mesh are copied to each mesh and listed in the edge vertices.
    pub fn split_by_bone_limit(
        &self,
        max_bones: usize,
    ) -> Result<Vec<GenericTriangles>, PartitionError> {
        self.vertices.validate()?;

        let (weights, weight_indices) = match (
            self.vertices.resolved_weights(),
            &self.vertices.weight_indices,
        ) {
            (Some(weights), Some(indices)) => (weights, indices),
            _ => return Ok(vec![self.clone()]),
        };

        let vertex_bones = |vertex: u16| -> Result<Vec<u8>, PartitionError> {
            let v = vertex as usize;
            let (weights, indices) = weights
                .get(v)
                .zip(weight_indices.get(v))
                .ok_or(VertexStoreError::IndexOutOfRange {
                    index: v,
                    count: weights.len(),
                })?;

            let mut bones = Vec::new();
            for (w, i) in weights.to_array().iter().zip(indices.iter()) {
                if *w > 0.0 {
                    if *i as usize >= self.bone_palette.len() {
                        return Err(PartitionError::InvalidPaletteIndex {
                            vertex: v,
                            palette_index: *i,
                            palette_len: self.bone_palette.len(),
                        });
                    }
                    bones.push(*i);
                }
            }
            Ok(bones)
        };

        // Greedily assign triangles to parts.
        let mut parts: Vec<(Vec<usize>, BTreeSet<u8>)> = Vec::new();
        let mut part_triangles = Vec::new();
        let mut part_bones = BTreeSet::new();
        for (t, triangle) in self.triangles.iter().enumerate() {
            let mut bones = BTreeSet::new();
            for v in triangle {
                bones.extend(vertex_bones(*v)?);
            }
            if bones.len() > max_bones {
                return Err(PartitionError::TooManyBones {
                    triangle: t,
                    bone_count: bones.len(),
                    max_bones,
                });
            }

            if part_bones.union(&bones).count() > max_bones {
                parts.push((
                    std::mem::take(&mut part_triangles),
                    std::mem::take(&mut part_bones),
                ));
            }
            part_triangles.push(t);
            part_bones.extend(bones);
        }
        if !part_triangles.is_empty() {
            parts.push((part_triangles, part_bones));
        }
        debug!(
            "Split {} triangles into {} parts with at most {} bones.",
            self.triangles.len(),
            parts.len(),
            max_bones
        );

        // Count the parts using each vertex to find the edge vertices.
        let mut part_counts: AHashMap<u16, usize> = AHashMap::new();
        for (triangles, _) in &parts {
            for v in triangles
                .iter()
                .flat_map(|t| self.triangles[*t].iter())
                .unique()
            {
                *part_counts.entry(*v).or_default() += 1;
            }
        }

        parts
            .iter()
            .map(|(triangles, bones)| -> Result<GenericTriangles, PartitionError> {
                let (mut part, new_ids) = self.extract_triangles(triangles)?;
                part.remap_bones(bones, &self.bone_palette);
                part.vertices.edge_verts = new_ids
                    .iter()
                    .filter(|(old, _)| part_counts.get(*old).copied().unwrap_or_default() > 1)
                    .map(|(_, new)| *new)
                    .sorted()
                    .collect();
                Ok(part)
            })
            .collect()
    }

    // Copies the given triangles and only the vertices they reference.
    fn extract_triangles(
        &self,
        triangles: &[usize],
    ) -> Result<(GenericTriangles, AHashMap<u16, u16>), VertexStoreError> {
        let mut vertices = VertexStore::with_layout_of(&self.vertices);
        vertices.bone_palette = self.vertices.bone_palette.clone();

        let mut new_ids: AHashMap<u16, u16> = AHashMap::new();
        let mut new_triangles = Vec::new();
        for t in triangles {
            let mut new_triangle = [0u16; 3];
            for (new, old) in new_triangle.iter_mut().zip(self.triangles[*t]) {
                *new = match new_ids.get(&old) {
                    Some(id) => *id,
                    None => {
                        let id = vertices.len() as u16;
                        vertices.push_vertex_from(&self.vertices, old as usize)?;
                        new_ids.insert(old, id);
                        id
                    }
                };
            }
            new_triangles.push(new_triangle);
        }

        let material_ids = if self.material_ids.len() == self.triangles.len() {
            triangles.iter().map(|t| self.material_ids[*t]).collect()
        } else {
            self.material_ids.clone()
        };

        Ok((
            GenericTriangles {
                vertices,
                triangles: new_triangles,
                material_ids,
                bone_palette: self.bone_palette.clone(),
                base_mesh_node_id: self.base_mesh_node_id,
                base_mesh_dummy_id: self.base_mesh_dummy_id,
            },
            new_ids,
        ))
    }

    // Uses a palette of only the given bones and updates the weight indices.
    fn remap_bones(&mut self, bones: &BTreeSet<u8>, palette: &[u32]) {
        let local_indices: AHashMap<u8, u8> = bones
            .iter()
            .enumerate()
            .map(|(i, b)| (*b, i as u8))
            .collect();

        let weights = self.vertices.resolved_weights();
        if let (Some(weights), Some(indices)) = (weights, self.vertices.weight_indices.as_mut()) {
            for (w, indices) in weights.iter().zip(indices.iter_mut()) {
                for (w, i) in w.to_array().iter().zip(indices.iter_mut()) {
                    // Unused slots use the first bone with a weight of 0.
                    *i = if *w > 0.0 {
                        local_indices.get(&*i).copied().unwrap_or_default()
                    } else {
                        0
                    };
                }
            }
        }

        self.bone_palette = bones
            .iter()
            .filter_map(|b| palette.get(*b as usize).copied())
            .collect();
    }
}

/// A format independent material description.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct GenericMaterial {
    pub name: String,
    /// The alpha type like "opaque", "blendalpha", "hollow", or "add".
    pub blend_type: String,
    /// The pixel shader followed by the vertex shader.
    pub shader_names: Vec<String>,
    pub texture_names: Vec<String>,
    /// The UV map for each texture in [texture_names](#structfield.texture_names).
    pub texture_uv_sets: Vec<i32>,
    pub diffuse_rgba: Vec4,
    pub two_sided: bool,
}

impl Default for GenericMaterial {
    fn default() -> Self {
        Self {
            name: String::new(),
            blend_type: "opaque".to_string(),
            shader_names: Vec::new(),
            texture_names: Vec::new(),
            texture_uv_sets: Vec::new(),
            diffuse_rgba: Vec4::ONE,
            two_sided: false,
        }
    }
}

/// The record indices created by [AquaObject::push_material].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialBinding {
    pub mate_index: i32,
    pub rend_index: i32,
    pub shad_index: i32,
    pub tset_index: i32,
}

impl AquaObject {
    /// Adds the records for `material`.
    /// An existing render state is reused if it matches the material's render state.
    pub fn push_material(
        &mut self,
        material: &GenericMaterial,
    ) -> Result<MaterialBinding, PushMeshError> {
        if material.texture_names.len() > 16 {
            return Err(PushMeshError::TooManyTextures {
                count: material.texture_names.len(),
            });
        }

        let mate_index = self.mates.len() as i32;
        self.mates.push(Mate {
            diffuse_rgba: Vector4::from(material.diffuse_rgba.to_array()),
            alpha_type: material.blend_type.as_str().into(),
            mat_name: material.name.as_str().into(),
            ..Default::default()
        });

        let rend = Rend {
            two_sided: material.two_sided as i32,
            ..Default::default()
        };
        let rend_index = match self.rends.iter().position(|r| *r == rend) {
            Some(index) => index,
            None => {
                self.rends.push(rend);
                self.rends.len() - 1
            }
        } as i32;

        let shader_name = |i: usize| {
            material
                .shader_names
                .get(i)
                .map(|n| FixedString::from(n.as_str()))
                .unwrap_or_default()
        };
        let shad_index = self.shads.len() as i32;
        self.shads.push(Shad {
            pixel_shader: shader_name(0),
            vertex_shader: shader_name(1),
            ..Default::default()
        });

        let mut tsta_tex_ids = Vec::new();
        for (i, name) in material.texture_names.iter().enumerate() {
            tsta_tex_ids.push(self.tstas.len() as i32);
            self.tstas.push(Tsta {
                tag: TSTA_TAG,
                tex_usage_order: i as i32,
                model_uv_set: material.texture_uv_sets.get(i).copied().unwrap_or_default(),
                tex_name: name.as_str().into(),
                ..Default::default()
            });
            self.texfs.push(Texf {
                tex_name: name.as_str().into(),
            });
        }

        let tset_index = self.tsets.len() as i32;
        self.tsets.push(Tset {
            tex_count: material.texture_names.len() as i32,
            tsta_tex_ids,
            ..Default::default()
        });

        Ok(MaterialBinding {
            mate_index,
            rend_index,
            shad_index,
            tset_index,
        })
    }

    /// Adds the vertex set, topology set, and mesh records for `triangles`.
    ///
    /// Classic objects convert the triangles to a strip using `stripifier`.
    /// Variant objects store the triangle list directly and use quantized vertex attributes.
    /// Returns the index of the new mesh.
    pub fn push_mesh<S: Stripifier>(
        &mut self,
        triangles: &GenericTriangles,
        binding: MaterialBinding,
        stripifier: &S,
    ) -> Result<usize, PushMeshError> {
        triangles.vertices.validate()?;
        if triangles.vertices.len() > u16::MAX as usize + 1 {
            return Err(PushMeshError::TooManyVertices {
                count: triangles.vertices.len(),
            });
        }

        let schema = self.schema();
        let mut vertices = triangles.vertices.clone();
        let indices = triangles.indices();

        let strip = match schema {
            Schema::Classic => {
                vertices.convert_to_legacy(false);
                vertices.bone_palette = triangles
                    .bone_palette
                    .iter()
                    .map(|b| u16::try_from(*b).map_err(|_| PushMeshError::BoneOverflow { bone: *b }))
                    .collect::<Result<Vec<_>, _>>()?;
                StripData::from_triangle_list(&indices, stripifier)?
            }
            Schema::Variant => {
                vertices.convert_to_quantized(false);
                vertices.bone_palette = Vec::new();
                self.merge_shared_bone_palette(&mut vertices, &triangles.bone_palette)?;
                StripData::triangle_list(indices)
            }
        };

        let vset_index = self.vsets.len() as i32;
        self.vsets.push(Vset {
            vtxl_count: vertices.len() as i32,
            bone_palette_count: vertices.bone_palette.len() as i32,
            edge_verts_count: vertices.edge_verts.len() as i32,
            ..Default::default()
        });
        self.vertex_stores.push(vertices);

        let pset_index = self.psets.len() as i32;
        self.psets.push(Pset {
            tag: match schema {
                Schema::Classic => PSET_TAG_CLASSIC,
                Schema::Variant => PSET_TAG_VARIANT,
            },
            face_type: 1,
            pset_face_count: strip.tri_id_count,
            ..Default::default()
        });
        self.strips.push(strip);

        let mesh_index = self.meshes.len();
        self.meshes.push(Mesh {
            tag: match schema {
                Schema::Classic => MESH_TAG_CLASSIC,
                Schema::Variant => MESH_TAG_VARIANT,
            },
            mate_index: binding.mate_index,
            rend_index: binding.rend_index,
            shad_index: binding.shad_index,
            tset_index: binding.tset_index,
            base_mesh_node_id: triangles.base_mesh_node_id,
            vset_index,
            pset_index,
            base_mesh_dummy_id: triangles.base_mesh_dummy_id,
            ..Default::default()
        });

        Ok(mesh_index)
    }

    // Variant weight indices point into the palette shared by all vertex sets.
    // The object is only modified once every bone and weight index is valid.
    fn merge_shared_bone_palette(
        &mut self,
        vertices: &mut VertexStore,
        palette: &[u32],
    ) -> Result<(), PushMeshError> {
        let mut merged = self.bone_palette.clone();
        let mut shared_indices = Vec::new();
        for bone in palette {
            let index = match merged.iter().position(|b| b == bone) {
                Some(index) => index,
                None => {
                    merged.push(*bone);
                    merged.len() - 1
                }
            };
            let index = u8::try_from(index)
                .map_err(|_| PushMeshError::PaletteOverflow { len: merged.len() })?;
            shared_indices.push(index);
        }

        let weights = vertices.resolved_weights();
        let remapped = match (weights, vertices.weight_indices.as_ref()) {
            (Some(weights), Some(indices)) => {
                let mut remapped = indices.clone();
                for (vertex, (w, indices)) in weights.iter().zip(remapped.iter_mut()).enumerate() {
                    for (w, index) in w.to_array().iter().zip(indices.iter_mut()) {
                        if *w > 0.0 {
                            *index = shared_indices.get(*index as usize).copied().ok_or(
                                PushMeshError::InvalidPaletteIndex {
                                    vertex,
                                    palette_index: *index,
                                    palette_len: palette.len(),
                                },
                            )?;
                        }
                    }
                }
                Some(remapped)
            }
            _ => None,
        };

        if let Some(remapped) = remapped {
            vertices.weight_indices = Some(remapped);
        }
        self.bone_palette = merged;
        Ok(())
    }
}
