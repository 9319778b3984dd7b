use std::io::{Read, Seek};

use aqua_lib::formats::objc::{Objc, ObjcSchema, VariantHeader};
use aqua_lib::formats::strip::Pset;
use aqua_lib::formats::unrm::UnrmHeader;
use aqua_lib::formats::vertex::{Vset, VtxeDescriptor, VtxeElement};
use aqua_lib::{read_table, seek_to};
use binread::BinReaderExt;
use log::{trace, warn};

use super::{
    AquaObject, AuxiliaryTables, ReadError, UnrmData, UnrmVertex, MESH2_RECORD_SIZE,
    PSET2_RECORD_SIZE,
};
use crate::strip_data::{read_classic_strip, read_variant_strip, StripData};
use crate::vtxl_data::{read_vertex_store, VertexStore};

pub(crate) fn read_object<R: Read + Seek>(reader: &mut R) -> Result<AquaObject, ReadError> {
    let objc: Objc = reader.read_le()?;
    let common = &objc.common;
    trace!("Reading object type 0x{:X}.", common.object_type);

    let vsets: Vec<Vset> = read_table(reader, common.vset_offset, common.vset_count)?;
    let psets: Vec<Pset> = read_table(reader, common.pset_offset, common.pset_count)?;
    let meshes = read_table(reader, common.mesh_offset, common.mesh_count)?;
    let mates = read_table(reader, common.mate_offset, common.mate_count)?;
    let rends = read_table(reader, common.rend_offset, common.rend_count)?;
    let shads = read_table(reader, common.shad_offset, common.shad_count)?;
    let tstas = read_table(reader, common.tsta_offset, common.tsta_count)?;
    let tsets = read_table(reader, common.tset_offset, common.tset_count)?;
    let texfs = read_table(reader, common.texf_offset, common.texf_count)?;

    let (vertex_stores, strips, bone_palette, auxiliary) = match &objc.schema {
        ObjcSchema::Classic => (
            read_classic_vertex_stores(reader, &vsets)?,
            psets
                .iter()
                .map(|pset| read_classic_strip(reader, pset))
                .collect::<Result<Vec<_>, _>>()?,
            Vec::new(),
            AuxiliaryTables::default(),
        ),
        ObjcSchema::Variant(header) => (
            read_variant_vertex_stores(reader, &vsets, &objc, header)?,
            read_variant_strips(reader, &psets, &objc)?,
            read_shared_bone_palette(reader, header)?,
            read_auxiliary_tables(reader, header)?,
        ),
    };

    let unrm = if common.unrm_offset > 0 {
        Some(read_unrm(reader, common.unrm_offset)?)
    } else {
        None
    };

    Ok(AquaObject {
        objc,
        vsets,
        vertex_stores,
        psets,
        strips,
        meshes,
        mates,
        rends,
        shads,
        tstas,
        tsets,
        texfs,
        bone_palette,
        unrm,
        auxiliary,
    })
}

fn checked_stride(vset_index: usize, vset: &Vset) -> Result<u64, ReadError> {
    match u64::try_from(vset.vert_data_size) {
        Ok(stride) if stride > 0 || vset.vtxl_count <= 0 => Ok(stride),
        _ => Err(ReadError::ZeroStride {
            vset_index,
            count: vset.vtxl_count,
            stride: vset.vert_data_size,
        }),
    }
}

fn read_edge_verts<R: Read + Seek>(
    reader: &mut R,
    vset: &Vset,
    store: &mut VertexStore,
) -> Result<(), ReadError> {
    store.edge_verts = read_table(reader, vset.edge_verts_offset, vset.edge_verts_count)?;
    Ok(())
}

fn read_classic_vertex_stores<R: Read + Seek>(
    reader: &mut R,
    vsets: &[Vset],
) -> Result<Vec<VertexStore>, ReadError> {
    vsets
        .iter()
        .enumerate()
        .map(|(i, vset)| {
            let stride = checked_stride(i, vset)?;
            let elements: Vec<VtxeElement> =
                read_table(reader, vset.vtxe_offset, vset.vtxe_count)?;

            let offset = u64::try_from(vset.vtxl_offset).map_err(|_| ReadError::InvalidOffset {
                data: "VTXL",
                offset: vset.vtxl_offset as i64,
            })?;
            let count = usize::try_from(vset.vtxl_count).unwrap_or_default();

            let mut store = read_vertex_store(reader, &elements, offset, count, stride)?;
            store.bone_palette =
                read_table(reader, vset.bone_palette_offset, vset.bone_palette_count)?;
            read_edge_verts(reader, vset, &mut store)?;
            Ok(store)
        })
        .collect()
}

fn read_variant_vertex_stores<R: Read + Seek>(
    reader: &mut R,
    vsets: &[Vset],
    objc: &Objc,
    header: &VariantHeader,
) -> Result<Vec<VertexStore>, ReadError> {
    let descriptors: Vec<VtxeDescriptor> =
        read_table(reader, header.block.vtxe_offset, header.block.vtxe_count)?;

    let declarations = descriptors
        .iter()
        .map(|d| read_table::<VtxeElement, _>(reader, d.element_offset, d.element_count))
        .collect::<Result<Vec<_>, _>>()?;

    vsets
        .iter()
        .enumerate()
        .map(|(i, vset)| {
            // The count field stores the index of the shared declaration.
            let elements = usize::try_from(vset.vtxe_count)
                .ok()
                .and_then(|index| declarations.get(index))
                .ok_or(ReadError::InvalidDeclarationIndex {
                    vset_index: i,
                    declaration_index: vset.vtxe_count,
                    declaration_count: declarations.len(),
                })?;

            let stride = checked_stride(i, vset)?;
            let offset = objc.common.vtxl_start_offset as i64
                + vset.vtxl_start_vert as i64 * vset.vert_data_size as i64;
            let offset = u64::try_from(offset).map_err(|_| ReadError::InvalidOffset {
                data: "VTXL",
                offset,
            })?;
            let count = usize::try_from(vset.vtxl_count).unwrap_or_default();

            let mut store = read_vertex_store(reader, elements, offset, count, stride)?;
            read_edge_verts(reader, vset, &mut store)?;
            Ok(store)
        })
        .collect()
}

fn read_variant_strips<R: Read + Seek>(
    reader: &mut R,
    psets: &[Pset],
    objc: &Objc,
) -> Result<Vec<StripData>, ReadError> {
    let total = objc.common.total_strip_faces;
    psets
        .iter()
        .enumerate()
        .map(|(i, pset)| {
            let end = pset.strip_start_count as i64 + pset.pset_face_count as i64;
            if pset.strip_start_count < 0 || (total > 0 && end > total as i64) {
                return Err(ReadError::StripRange {
                    pset_index: i,
                    start: pset.strip_start_count,
                    count: pset.pset_face_count,
                    total,
                });
            }
            Ok(read_variant_strip(
                reader,
                pset,
                objc.common.global_strip_offset,
            )?)
        })
        .collect()
}

fn read_shared_bone_palette<R: Read + Seek>(
    reader: &mut R,
    header: &VariantHeader,
) -> Result<Vec<u32>, ReadError> {
    if header.block.bone_palette_offset <= 0 {
        return Ok(Vec::new());
    }

    seek_to(reader, header.block.bone_palette_offset)?;
    let count: i32 = reader.read_le()?;
    let offset = header.block.bone_palette_offset + 4;
    Ok(read_table(reader, offset, count)?)
}

fn read_records<R: Read + Seek>(
    reader: &mut R,
    offset: i32,
    count: i32,
    record_size: usize,
) -> Result<Vec<Vec<u8>>, ReadError> {
    if count <= 0 {
        return Ok(Vec::new());
    }

    seek_to(reader, offset)?;
    let mut records = Vec::new();
    for _ in 0..count {
        let mut record = vec![0u8; record_size];
        reader.read_exact(&mut record)?;
        records.push(record);
    }
    Ok(records)
}

fn read_auxiliary_tables<R: Read + Seek>(
    reader: &mut R,
    header: &VariantHeader,
) -> Result<AuxiliaryTables, ReadError> {
    Ok(AuxiliaryTables {
        pset2: read_records(
            reader,
            header.block.pset2_offset,
            header.block.pset2_count,
            PSET2_RECORD_SIZE,
        )?,
        mesh2: read_records(
            reader,
            header.extended.mesh2_offset,
            header.extended.mesh2_count,
            MESH2_RECORD_SIZE,
        )?,
    })
}

fn read_unrm<R: Read + Seek>(reader: &mut R, offset: i32) -> Result<UnrmData, ReadError> {
    seek_to(reader, offset)?;
    let header: UnrmHeader = reader.read_le()?;

    let group_counts: Vec<i32> = read_table(
        reader,
        header.vert_group_count_offset,
        header.vert_group_count_count,
    )?;
    let mesh_ids: Vec<i32> = read_table(reader, header.mesh_id_offset, header.vert_count)?;
    let vertex_ids: Vec<i32> = read_table(reader, header.vert_id_offset, header.vert_count)?;

    let mut entries = mesh_ids
        .into_iter()
        .zip(vertex_ids)
        .map(|(mesh_id, vertex_id)| UnrmVertex { mesh_id, vertex_id });

    let mut groups = Vec::new();
    for count in group_counts {
        let count = usize::try_from(count).unwrap_or_default();
        let group: Vec<_> = entries.by_ref().take(count).collect();
        if group.len() < count {
            warn!(
                "UNRM group expected {} vertices but only {} remain.",
                count,
                group.len()
            );
        }
        groups.push(group);
    }

    Ok(UnrmData {
        groups,
        padding0: header.padding0,
        padding1: header.padding1,
    })
}
