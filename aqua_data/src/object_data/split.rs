use ahash::{AHashMap, AHashSet};
use aqua_lib::formats::mesh::Mesh;
use aqua_lib::formats::strip::Pset;
use aqua_lib::formats::vertex::Vset;
use log::debug;
use thiserror::Error;

use super::{get_checked, IndexError};
use crate::strip_data::StripData;
use crate::vtxl_data::{VertexStore, VertexStoreError};

/// Errors while splitting vertex sets.
#[derive(Debug, Error)]
pub enum SplitError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    VertexStore(#[from] VertexStoreError),
}

/// The tables produced by [split_vertex_sets].
#[derive(Debug, Clone, PartialEq)]
pub struct SplitVertexSets {
    pub meshes: Vec<Mesh>,
    pub vsets: Vec<Vset>,
    pub vertex_stores: Vec<VertexStore>,
    pub psets: Vec<Pset>,
    pub strips: Vec<StripData>,
}

/// Creates new tables where each mesh references its own vertex set.
///
/// If no vertex set is referenced by more than one mesh, the tables are returned unchanged.
/// Otherwise the vertex set for mesh `i` is at index `i` in the output.
/// Meshes that share a vertex set get a copy of only the vertices their strip references
/// in the order the vertices are first referenced, and the strip indices are rewritten.
/// Meshes that share a strip as well as a vertex set get their own copy of the strip.
/// Edge vertices are remapped and any not referenced by the mesh are removed.
///
/// Applying the split to its own output produces the same tables.
pub fn split_vertex_sets(
    meshes: &[Mesh],
    vsets: &[Vset],
    stores: &[VertexStore],
    psets: &[Pset],
    strips: &[StripData],
) -> Result<SplitVertexSets, SplitError> {
    let mut group_sizes = AHashMap::new();
    for mesh in meshes {
        *group_sizes.entry(mesh.vset_index).or_insert(0usize) += 1;
    }

    let unchanged = SplitVertexSets {
        meshes: meshes.to_vec(),
        vsets: vsets.to_vec(),
        vertex_stores: stores.to_vec(),
        psets: psets.to_vec(),
        strips: strips.to_vec(),
    };
    if group_sizes.values().all(|size| *size <= 1) {
        return Ok(unchanged);
    }

    let SplitVertexSets {
        meshes: mut new_meshes,
        psets: mut new_psets,
        strips: mut new_strips,
        ..
    } = unchanged;
    let mut new_vsets = Vec::new();
    let mut new_stores = Vec::new();

    // Strips referenced by meshes without a shared vertex set keep their indices.
    let mut claimed_strips: AHashSet<i32> = meshes
        .iter()
        .filter(|m| group_sizes.get(&m.vset_index).copied().unwrap_or_default() <= 1)
        .map(|m| m.pset_index)
        .collect();

    for (i, mesh) in meshes.iter().enumerate() {
        let vset = get_checked(vsets, "VSET", mesh.vset_index as i64)?;
        let store = get_checked(stores, "VTXL", mesh.vset_index as i64)?;

        if group_sizes.get(&mesh.vset_index).copied().unwrap_or_default() <= 1 {
            new_vsets.push(vset.clone());
            new_stores.push(store.clone());
        } else {
            // Read from the input since earlier meshes may have rewritten the output strip.
            let pset = get_checked(psets, "PSET", mesh.pset_index as i64)?;
            let strip = get_checked(strips, "strip", mesh.pset_index as i64)?;
            let (new_store, new_strip) = split_mesh_vertices(store, strip)?;
            debug!(
                "Split {} of {} vertices from vertex set {} for mesh {}.",
                new_store.len(),
                store.len(),
                mesh.vset_index,
                i
            );

            let mut new_vset = vset.clone();
            new_vset.vtxl_count = new_store.len() as i32;
            new_vset.edge_verts_count = new_store.edge_verts.len() as i32;

            // The first mesh to use a strip rewrites it in place.
            if claimed_strips.insert(mesh.pset_index) {
                new_strips[mesh.pset_index as usize] = new_strip;
            } else {
                new_meshes[i].pset_index = new_psets.len() as i32;
                new_psets.push(pset.clone());
                new_strips.push(new_strip);
            }

            new_vsets.push(new_vset);
            new_stores.push(new_store);
        }

        new_meshes[i].vset_index = i as i32;
    }

    Ok(SplitVertexSets {
        meshes: new_meshes,
        vsets: new_vsets,
        vertex_stores: new_stores,
        psets: new_psets,
        strips: new_strips,
    })
}

fn split_mesh_vertices(
    store: &VertexStore,
    strip: &StripData,
) -> Result<(VertexStore, StripData), VertexStoreError> {
    let mut new_store = VertexStore::with_layout_of(store);
    new_store.bone_palette = store.bone_palette.clone();

    let mut new_ids: AHashMap<u16, u16> = AHashMap::new();
    let mut new_strip = strip.clone();
    for index in new_strip.indices.iter_mut() {
        let new_id = match new_ids.get(index) {
            Some(id) => *id,
            None => {
                // Indices are 16-bit, so the new store never has more vertices than the old one.
                let id = new_store.len() as u16;
                new_store.push_vertex_from(store, *index as usize)?;
                new_ids.insert(*index, id);
                id
            }
        };
        *index = new_id;
    }

    new_store.edge_verts = store
        .edge_verts
        .iter()
        .filter_map(|v| new_ids.get(v).copied())
        .collect();

    Ok((new_store, new_strip))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vtxl_data::Channel;
    use glam::{Vec2, Vec3};
    use pretty_assertions::assert_eq;

    fn mesh(vset_index: i32, pset_index: i32) -> Mesh {
        Mesh {
            vset_index,
            pset_index,
            ..Default::default()
        }
    }

    fn shared_store() -> VertexStore {
        VertexStore {
            positions: (0..6).map(|i| Vec3::splat(i as f32)).collect(),
            uv1: Channel::from_legacy((0..6).map(|i| Vec2::splat(i as f32)).collect()),
            bone_palette: vec![3, 7],
            edge_verts: vec![2, 5],
            ..Default::default()
        }
    }

    fn shared_vset() -> Vset {
        Vset {
            vtxl_count: 6,
            edge_verts_count: 2,
            ..Default::default()
        }
    }

    fn shared_object() -> (Vec<Mesh>, Vec<Vset>, Vec<VertexStore>, Vec<Pset>, Vec<StripData>) {
        (
            vec![mesh(0, 0), mesh(0, 1)],
            vec![shared_vset()],
            vec![shared_store()],
            vec![Pset::default(), Pset::default()],
            vec![
                StripData::triangle_list(vec![0, 1, 2]),
                StripData::triangle_list(vec![5, 3, 2, 3, 4, 5]),
            ],
        )
    }

    #[test]
    fn split_shared_vertex_set() {
        let (meshes, vsets, stores, psets, strips) = shared_object();
        let split = split_vertex_sets(&meshes, &vsets, &stores, &psets, &strips).unwrap();

        assert_eq!(vec![mesh(0, 0), mesh(1, 1)], split.meshes);
        assert_eq!(2, split.vsets.len());
        assert_eq!(3, split.vsets[0].vtxl_count);
        assert_eq!(1, split.vsets[0].edge_verts_count);
        assert_eq!(4, split.vsets[1].vtxl_count);
        assert_eq!(2, split.vsets[1].edge_verts_count);

        assert_eq!(
            vec![Vec3::splat(0.0), Vec3::splat(1.0), Vec3::splat(2.0)],
            split.vertex_stores[0].positions
        );
        assert_eq!(vec![2], split.vertex_stores[0].edge_verts);

        // Vertices are copied in the order they are first referenced.
        assert_eq!(
            vec![
                Vec3::splat(5.0),
                Vec3::splat(3.0),
                Vec3::splat(2.0),
                Vec3::splat(4.0)
            ],
            split.vertex_stores[1].positions
        );
        assert_eq!(
            Some(vec![
                Vec2::splat(5.0),
                Vec2::splat(3.0),
                Vec2::splat(2.0),
                Vec2::splat(4.0)
            ]),
            split.vertex_stores[1].uv1.legacy
        );
        assert_eq!(vec![2, 0], split.vertex_stores[1].edge_verts);
        assert_eq!(vec![3, 7], split.vertex_stores[1].bone_palette);

        assert_eq!(vec![0, 1, 2], split.strips[0].indices);
        assert_eq!(vec![0, 1, 2, 1, 3, 0], split.strips[1].indices);
        for store in &split.vertex_stores {
            store.validate().unwrap();
        }
    }

    #[test]
    fn split_preserves_triangles() {
        let (meshes, vsets, stores, psets, strips) = shared_object();
        let split = split_vertex_sets(&meshes, &vsets, &stores, &psets, &strips).unwrap();

        for (i, mesh) in split.meshes.iter().enumerate() {
            let old_positions: Vec<_> = strips[meshes[i].pset_index as usize]
                .indices
                .iter()
                .map(|v| stores[0].positions[*v as usize])
                .collect();
            let store = &split.vertex_stores[mesh.vset_index as usize];
            let new_positions: Vec<_> = split.strips[mesh.pset_index as usize]
                .indices
                .iter()
                .map(|v| store.positions[*v as usize])
                .collect();
            assert_eq!(old_positions, new_positions);
        }
    }

    #[test]
    fn split_is_idempotent() {
        let (meshes, vsets, stores, psets, strips) = shared_object();
        let first = split_vertex_sets(&meshes, &vsets, &stores, &psets, &strips).unwrap();
        let second = split_vertex_sets(
            &first.meshes,
            &first.vsets,
            &first.vertex_stores,
            &first.psets,
            &first.strips,
        )
        .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn split_unshared_is_unchanged() {
        let meshes = vec![mesh(1, 0), mesh(0, 1)];
        let vsets = vec![shared_vset(), Vset::default()];
        let stores = vec![shared_store(), VertexStore::default()];
        let psets = vec![Pset::default(); 2];
        let strips = vec![
            StripData::triangle_list(Vec::new()),
            StripData::triangle_list(vec![0, 1, 2]),
        ];

        let split = split_vertex_sets(&meshes, &vsets, &stores, &psets, &strips).unwrap();
        assert_eq!(meshes, split.meshes);
        assert_eq!(vsets, split.vsets);
        assert_eq!(stores, split.vertex_stores);
        assert_eq!(strips, split.strips);
    }

    #[test]
    fn split_shared_strip_is_duplicated() {
        let meshes = vec![mesh(0, 0), mesh(0, 0)];
        let strips = vec![StripData::triangle_list(vec![4, 5, 3])];
        let split = split_vertex_sets(
            &meshes,
            &[shared_vset()],
            &[shared_store()],
            &[Pset::default()],
            &strips,
        )
        .unwrap();

        assert_eq!(vec![mesh(0, 0), mesh(1, 1)], split.meshes);
        assert_eq!(2, split.psets.len());
        assert_eq!(vec![0, 1, 2], split.strips[0].indices);
        assert_eq!(vec![0, 1, 2], split.strips[1].indices);
        assert_eq!(
            split.vertex_stores[0].positions,
            split.vertex_stores[1].positions
        );
    }

    #[test]
    fn split_invalid_vset_index() {
        let meshes = vec![mesh(0, 0), mesh(0, 0), mesh(3, 0)];
        let result = split_vertex_sets(
            &meshes,
            &[shared_vset()],
            &[shared_store()],
            &[Pset::default()],
            &[StripData::triangle_list(vec![0, 1, 2])],
        );
        assert!(matches!(
            result,
            Err(SplitError::Index(IndexError {
                table: "VSET",
                index: 3,
                len: 1
            }))
        ));
    }

    #[test]
    fn split_vertex_index_out_of_range() {
        let meshes = vec![mesh(0, 0), mesh(0, 0)];
        let result = split_vertex_sets(
            &meshes,
            &[shared_vset()],
            &[shared_store()],
            &[Pset::default()],
            &[StripData::triangle_list(vec![0, 1, 9])],
        );
        assert!(matches!(result, Err(SplitError::VertexStore(_))));
    }

    #[test]
    fn split_missing_strip() {
        let meshes = vec![mesh(0, 0), mesh(0, 1)];
        let result = split_vertex_sets(
            &meshes,
            &[shared_vset()],
            &[shared_store()],
            &[Pset::default(), Pset::default()],
            &[StripData::triangle_list(vec![0, 1, 2])],
        );
        assert!(matches!(
            result,
            Err(SplitError::Index(IndexError {
                table: "strip",
                index: 1,
                len: 1
            }))
        ));
    }
}
