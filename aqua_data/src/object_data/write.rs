use aqua_lib::formats::objc::{Objc, ObjcCommon, ObjcSchema, Schema, VariantHeader};
use aqua_lib::formats::strip::Pset;
use aqua_lib::formats::unrm::UnrmHeader;
use aqua_lib::formats::vertex::{Vset, VtxeDescriptor, VtxeElement};
use aqua_write::AquaWrite;

use super::{AquaObject, UnrmData, WriteError};
use crate::strip_data::StripData;
use crate::vtxl_data::{create_declaration, write_vertex_buffer, VertexStore};

const ALIGNMENT: usize = 0x10;

fn to_i32(value: usize, field: &'static str) -> Result<i32, WriteError> {
    i32::try_from(value).map_err(|_| WriteError::IndexOverflow { field, value })
}

fn pad(buffer: &mut Vec<u8>) {
    let padding = (ALIGNMENT - buffer.len() % ALIGNMENT) % ALIGNMENT;
    buffer.resize(buffer.len() + padding, 0u8);
}

// Writes the value at the next aligned position and returns its offset.
fn append<T: AquaWrite + ?Sized>(buffer: &mut Vec<u8>, value: &T) -> Result<i32, WriteError> {
    pad(buffer);
    let offset = to_i32(buffer.len(), "offset")?;
    value.aqua_write(buffer)?;
    Ok(offset)
}

// Empty tables use an offset of 0.
fn append_table<T: AquaWrite>(
    buffer: &mut Vec<u8>,
    values: &[T],
    field: &'static str,
) -> Result<(i32, i32), WriteError> {
    if values.is_empty() {
        Ok((0, 0))
    } else {
        let count = to_i32(values.len(), field)?;
        Ok((count, append(buffer, values)?))
    }
}

fn check_lengths(object: &AquaObject) -> Result<(), WriteError> {
    if object.vsets.len() != object.vertex_stores.len() {
        return Err(WriteError::TableLengthMismatch {
            table: "vertex stores",
            related: "vertex sets",
            expected: object.vsets.len(),
            actual: object.vertex_stores.len(),
        });
    }
    if object.psets.len() != object.strips.len() {
        return Err(WriteError::TableLengthMismatch {
            table: "strips",
            related: "topology sets",
            expected: object.psets.len(),
            actual: object.strips.len(),
        });
    }

    for (i, store) in object.vertex_stores.iter().enumerate() {
        store
            .validate()
            .map_err(|source| WriteError::InvalidVertexStore {
                vset_index: i,
                source,
            })?;
    }
    Ok(())
}

/// Lays out the vertex data, index data, and record tables after the header.
/// The header is written last once all the offsets are known.
pub(crate) fn write_object(object: &AquaObject) -> Result<Vec<u8>, WriteError> {
    check_lengths(object)?;

    let mut objc = object.objc.clone();
    let mut vsets = object.vsets.clone();
    let mut psets = object.psets.clone();

    let header_size = objc.size_in_bytes() as usize;
    let mut buffer = vec![0u8; header_size];

    let Objc { common, schema } = &mut objc;
    match schema {
        ObjcSchema::Classic => {
            write_classic_vertex_data(&mut buffer, common, &mut vsets, &object.vertex_stores)?;
            write_classic_strips(&mut buffer, common, &mut psets, &object.strips)?;
        }
        ObjcSchema::Variant(header) => {
            write_variant_vertex_data(
                &mut buffer,
                common,
                header,
                &mut vsets,
                &object.vertex_stores,
                &object.bone_palette,
            )?;
            write_variant_strips(&mut buffer, common, &mut psets, &object.strips)?;
        }
    }

    common.total_vtxl_count = to_i32(object.vertex_count(), "total vertex count")?;

    (common.vset_count, common.vset_offset) = append_table(&mut buffer, &vsets, "VSET")?;
    (common.pset_count, common.pset_offset) = append_table(&mut buffer, &psets, "PSET")?;
    (common.mesh_count, common.mesh_offset) = append_table(&mut buffer, &object.meshes, "MESH")?;
    (common.mate_count, common.mate_offset) = append_table(&mut buffer, &object.mates, "MATE")?;
    (common.rend_count, common.rend_offset) = append_table(&mut buffer, &object.rends, "REND")?;
    (common.shad_count, common.shad_offset) = append_table(&mut buffer, &object.shads, "SHAD")?;
    (common.tsta_count, common.tsta_offset) = append_table(&mut buffer, &object.tstas, "TSTA")?;
    (common.tset_count, common.tset_offset) = append_table(&mut buffer, &object.tsets, "TSET")?;
    (common.texf_count, common.texf_offset) = append_table(&mut buffer, &object.texfs, "TEXF")?;

    common.unrm_offset = match &object.unrm {
        Some(unrm) => write_unrm(&mut buffer, unrm)?,
        None => 0,
    };

    if let ObjcSchema::Variant(header) = schema {
        let block = &mut header.block;
        (block.pset2_count, block.pset2_offset) =
            append_records(&mut buffer, &object.auxiliary.pset2, "pset2")?;

        let extended = &mut header.extended;
        (extended.mesh2_count, extended.mesh2_offset) =
            append_records(&mut buffer, &object.auxiliary.mesh2, "mesh2")?;
    }
    pad(&mut buffer);

    let mut header = Vec::new();
    objc.aqua_write(&mut header)?;
    buffer[..header.len()].copy_from_slice(&header);

    Ok(buffer)
}

fn append_records(
    buffer: &mut Vec<u8>,
    records: &[Vec<u8>],
    field: &'static str,
) -> Result<(i32, i32), WriteError> {
    if records.is_empty() {
        Ok((0, 0))
    } else {
        let bytes: Vec<u8> = records.iter().flatten().copied().collect();
        Ok((to_i32(records.len(), field)?, append(buffer, &bytes)?))
    }
}

fn write_edge_verts(
    buffer: &mut Vec<u8>,
    vset: &mut Vset,
    store: &VertexStore,
) -> Result<(), WriteError> {
    (vset.edge_verts_count, vset.edge_verts_offset) =
        append_table(buffer, &store.edge_verts, "edge vertices")?;
    Ok(())
}

fn write_classic_vertex_data(
    buffer: &mut Vec<u8>,
    common: &mut ObjcCommon,
    vsets: &mut [Vset],
    stores: &[VertexStore],
) -> Result<(), WriteError> {
    let mut largest_stride = 0;
    for (vset, store) in vsets.iter_mut().zip(stores) {
        let declaration = create_declaration(store, Schema::Classic);
        largest_stride = largest_stride.max(declaration.stride);

        vset.vert_data_size = to_i32(declaration.stride, "vertex stride")?;
        (vset.vtxe_count, vset.vtxe_offset) =
            append_table(buffer, &declaration.elements, "VTXE")?;

        pad(buffer);
        vset.vtxl_offset = to_i32(buffer.len(), "offset")?;
        vset.vtxl_count = to_i32(store.len(), "vertex count")?;
        vset.vtxl_start_vert = 0;
        write_vertex_buffer(buffer, store, Schema::Classic, declaration.stride)?;

        (vset.bone_palette_count, vset.bone_palette_offset) =
            append_table(buffer, &store.bone_palette, "bone palette")?;
        write_edge_verts(buffer, vset, store)?;
    }

    common.largest_vtxl = to_i32(largest_stride, "vertex stride")?;
    common.vtxl_start_offset = 0;
    Ok(())
}

fn write_variant_vertex_data(
    buffer: &mut Vec<u8>,
    common: &mut ObjcCommon,
    header: &mut VariantHeader,
    vsets: &mut [Vset],
    stores: &[VertexStore],
    bone_palette: &[u32],
) -> Result<(), WriteError> {
    // Vertex sets with the same attributes share a declaration.
    let mut declarations: Vec<Vec<VtxeElement>> = Vec::new();
    let mut declaration_indices = Vec::new();
    let mut pool_stride = 0;
    for store in stores {
        let declaration = create_declaration(store, Schema::Variant);
        pool_stride = pool_stride.max(declaration.stride);

        let index = match declarations.iter().position(|d| *d == declaration.elements) {
            Some(index) => index,
            None => {
                declarations.push(declaration.elements);
                declarations.len() - 1
            }
        };
        declaration_indices.push(index);
    }

    let descriptors = declarations
        .iter()
        .map(|elements| {
            Ok(VtxeDescriptor {
                element_count: to_i32(elements.len(), "VTXE")?,
                element_offset: append(buffer, elements)?,
            })
        })
        .collect::<Result<Vec<_>, WriteError>>()?;

    (header.block.vtxe_count, header.block.vtxe_offset) =
        append_table(buffer, &descriptors, "VTXE")?;

    // All vertex sets use the largest stride in the shared vertex pool.
    pad(buffer);
    common.vtxl_start_offset = to_i32(buffer.len(), "offset")?;
    common.largest_vtxl = to_i32(pool_stride, "vertex stride")?;

    let mut start_vertex = 0;
    for ((vset, store), declaration_index) in vsets.iter_mut().zip(stores).zip(declaration_indices)
    {
        vset.vert_data_size = to_i32(pool_stride, "vertex stride")?;
        vset.vtxe_count = to_i32(declaration_index, "VTXE")?;
        vset.vtxe_offset = 0;
        vset.vtxl_offset = 0;
        vset.vtxl_count = to_i32(store.len(), "vertex count")?;
        vset.vtxl_start_vert = to_i32(start_vertex, "vertex count")?;
        vset.bone_palette_offset = 0;

        write_vertex_buffer(buffer, store, Schema::Variant, pool_stride)?;
        start_vertex += store.len();
    }

    for (vset, store) in vsets.iter_mut().zip(stores) {
        write_edge_verts(buffer, vset, store)?;
    }

    header.block.bone_palette_offset = if bone_palette.is_empty() {
        0
    } else {
        let offset = append(buffer, &to_i32(bone_palette.len(), "bone palette")?)?;
        bone_palette.aqua_write(buffer)?;
        offset
    };

    Ok(())
}

fn write_classic_strips(
    buffer: &mut Vec<u8>,
    common: &mut ObjcCommon,
    psets: &mut [Pset],
    strips: &[StripData],
) -> Result<(), WriteError> {
    let mut total = 0;
    for (pset, strip) in psets.iter_mut().zip(strips) {
        pset.face_count_offset = append(buffer, &strip.header())?;
        pset.face_offset = append(buffer, &strip.indices)?;
        pset.pset_face_count = to_i32(strip.indices.len(), "strip index count")?;
        total += strip.indices.len();
    }

    common.total_strip_faces = to_i32(total, "strip index count")?;
    common.global_strip_offset = 0;
    Ok(())
}

fn write_variant_strips(
    buffer: &mut Vec<u8>,
    common: &mut ObjcCommon,
    psets: &mut [Pset],
    strips: &[StripData],
) -> Result<(), WriteError> {
    pad(buffer);
    common.global_strip_offset = to_i32(buffer.len(), "offset")?;

    let mut start = 0;
    for (pset, strip) in psets.iter_mut().zip(strips) {
        pset.face_count_offset = 0;
        pset.face_offset = 0;
        pset.strip_start_count = to_i32(start, "strip index count")?;
        pset.pset_face_count = to_i32(strip.indices.len(), "strip index count")?;

        strip.indices.aqua_write(buffer)?;
        start += strip.indices.len();
    }

    common.total_strip_faces = to_i32(start, "strip index count")?;
    Ok(())
}

fn write_unrm(buffer: &mut Vec<u8>, unrm: &UnrmData) -> Result<i32, WriteError> {
    let group_counts = unrm
        .groups
        .iter()
        .map(|g| to_i32(g.len(), "UNRM group"))
        .collect::<Result<Vec<_>, _>>()?;
    let mesh_ids: Vec<i32> = unrm.groups.iter().flatten().map(|v| v.mesh_id).collect();
    let vertex_ids: Vec<i32> = unrm.groups.iter().flatten().map(|v| v.vertex_id).collect();

    let mut header = UnrmHeader {
        vert_group_count_count: to_i32(group_counts.len(), "UNRM group")?,
        vert_group_count_offset: 0,
        vert_count: to_i32(mesh_ids.len(), "UNRM vertex")?,
        mesh_id_offset: 0,
        vert_id_offset: 0,
        padding0: unrm.padding0,
        padding1: unrm.padding1,
    };
    header.vert_group_count_offset = append(buffer, &group_counts)?;
    header.mesh_id_offset = append(buffer, &mesh_ids)?;
    header.vert_id_offset = append(buffer, &vertex_ids)?;

    append(buffer, &header)
}
