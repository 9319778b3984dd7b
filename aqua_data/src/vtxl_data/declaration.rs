use std::borrow::Cow;
use std::io::{Read, Seek, SeekFrom, Write};

use aqua_lib::formats::objc::Schema;
use aqua_lib::formats::vertex::VtxeElement;
use binread::{BinRead, BinReaderExt, BinResult};
use glam::{Vec2, Vec3, Vec4};
use log::warn;

use super::{
    dequantize_uv, dequantize_vector, dequantize_weights, Channel, ChannelData, VertexStore,
};

/// The usage of a vertex attribute stored in [VtxeElement::data_type].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VertexAttribute {
    Position,
    Weights,
    Normal,
    Color,
    Color2,
    WeightIndices,
    Uv1,
    Uv2,
    Uv3,
    Uv4,
    Tangent,
    Binormal,
    Unk0x22,
    Unk0x23,
}

impl VertexAttribute {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0x0 => Some(Self::Position),
            0x1 => Some(Self::Weights),
            0x2 => Some(Self::Normal),
            0x3 => Some(Self::Color),
            0x4 => Some(Self::Color2),
            0xB => Some(Self::WeightIndices),
            0x10 => Some(Self::Uv1),
            0x11 => Some(Self::Uv2),
            0x12 => Some(Self::Uv3),
            0x13 => Some(Self::Uv4),
            0x20 => Some(Self::Tangent),
            0x21 => Some(Self::Binormal),
            0x22 => Some(Self::Unk0x22),
            0x23 => Some(Self::Unk0x23),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Position => 0x0,
            Self::Weights => 0x1,
            Self::Normal => 0x2,
            Self::Color => 0x3,
            Self::Color2 => 0x4,
            Self::WeightIndices => 0xB,
            Self::Uv1 => 0x10,
            Self::Uv2 => 0x11,
            Self::Uv3 => 0x12,
            Self::Uv4 => 0x13,
            Self::Tangent => 0x20,
            Self::Binormal => 0x21,
            Self::Unk0x22 => 0x22,
            Self::Unk0x23 => 0x23,
        }
    }
}

/// The component type and count stored in [VtxeElement::struct_variation].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    Float2,
    Float3,
    Float4,
    ByteColor,
    Byte4,
    Short2,
    Short4,
    UShort4,
}

impl VertexFormat {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0x2 => Some(Self::Float2),
            0x3 => Some(Self::Float3),
            0x4 => Some(Self::Float4),
            0x5 => Some(Self::ByteColor),
            0x7 => Some(Self::Byte4),
            0xE => Some(Self::Short2),
            0xF => Some(Self::Short4),
            0x11 => Some(Self::UShort4),
            _ => None,
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Self::Float2 => 0x2,
            Self::Float3 => 0x3,
            Self::Float4 => 0x4,
            Self::ByteColor => 0x5,
            Self::Byte4 => 0x7,
            Self::Short2 => 0xE,
            Self::Short4 => 0xF,
            Self::UShort4 => 0x11,
        }
    }

    pub fn size_in_bytes(self) -> usize {
        match self {
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::ByteColor => 4,
            Self::Byte4 => 4,
            Self::Short2 => 4,
            Self::Short4 => 8,
            Self::UShort4 => 8,
        }
    }
}

/// The regenerated declaration for a [VertexStore].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexDeclaration {
    pub elements: Vec<VtxeElement>,
    /// The size in bytes of a single vertex.
    pub stride: usize,
}

// Reads `count` elements with `N` components each starting at `offset`.
fn read_components<R, T, const N: usize>(
    reader: &mut R,
    count: usize,
    offset: u64,
    stride: u64,
) -> BinResult<Vec<[T; N]>>
where
    R: Read + Seek,
    T: BinRead<Args = ()> + Copy + Default,
{
    let mut result = Vec::new();
    for i in 0..count as u64 {
        // Attributes are interleaved, so the element size may be smaller than the stride.
        reader.seek(SeekFrom::Start(offset + i * stride))?;

        let mut element = [T::default(); N];
        for e in element.iter_mut() {
            *e = reader.read_le::<T>()?;
        }
        result.push(element);
    }
    Ok(result)
}

/// Reads `count` interleaved vertices described by `elements` starting at `offset`.
///
/// Elements with an unrecognized data type or an unsupported format for their data type are skipped.
/// Vertices are zero if no position element is present.
pub fn read_vertex_store<R: Read + Seek>(
    reader: &mut R,
    elements: &[VtxeElement],
    offset: u64,
    count: usize,
    stride: u64,
) -> BinResult<VertexStore> {
    // Prevent reading the same vertex repeatedly for very large counts.
    if count > 0 && stride == 0 {
        return Err(binread::Error::Custom {
            pos: offset,
            err: Box::new("Invalid zero stride detected."),
        });
    }

    // Corrupted counts should fail before allocating any vertex data.
    if count > 0 {
        let last_vertex = (count as u64 - 1)
            .checked_mul(stride)
            .and_then(|o| o.checked_add(offset));
        let stream_len = reader.seek(SeekFrom::End(0))?;
        if !matches!(last_vertex, Some(last) if last < stream_len) {
            return Err(binread::Error::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "{} vertices with stride {} at {} exceed the stream length {}.",
                    count, stride, offset, stream_len
                ),
            )));
        }
    }

    let mut store = VertexStore::default();
    let mut has_positions = false;

    for element in elements {
        let attribute = match VertexAttribute::from_code(element.data_type) {
            Some(attribute) => attribute,
            None => {
                warn!(
                    "Skipping unrecognized vertex data type 0x{:X}.",
                    element.data_type
                );
                continue;
            }
        };
        let format = match VertexFormat::from_code(element.struct_variation) {
            Some(format) => format,
            None => {
                warn!(
                    "Skipping {:?} with unrecognized format 0x{:X}.",
                    attribute, element.struct_variation
                );
                continue;
            }
        };

        if element.relative_address < 0 {
            warn!(
                "Skipping {:?} with negative relative address {}.",
                attribute, element.relative_address
            );
            continue;
        }
        let start = offset + element.relative_address as u64;

        match (attribute, format) {
            (VertexAttribute::Position, VertexFormat::Float3) => {
                store.positions = read_vec3(reader, count, start, stride)?;
                has_positions = true;
            }
            (VertexAttribute::Normal, _) => {
                read_vector_channel(reader, &mut store.normals, format, count, start, stride)?
            }
            (VertexAttribute::Tangent, _) => {
                read_vector_channel(reader, &mut store.tangents, format, count, start, stride)?
            }
            (VertexAttribute::Binormal, _) => {
                read_vector_channel(reader, &mut store.binormals, format, count, start, stride)?
            }
            (VertexAttribute::Weights, VertexFormat::Float4) => {
                store.weights.legacy = Some(
                    read_components::<_, f32, 4>(reader, count, start, stride)?
                        .into_iter()
                        .map(Vec4::from)
                        .collect(),
                );
            }
            (VertexAttribute::Weights, VertexFormat::UShort4) => {
                store.weights.quantized = Some(read_components(reader, count, start, stride)?);
            }
            (VertexAttribute::Uv1, _) => {
                read_uv_channel(reader, &mut store.uv1, format, count, start, stride)?
            }
            (VertexAttribute::Uv2, _) => {
                read_uv_channel(reader, &mut store.uv2, format, count, start, stride)?
            }
            (VertexAttribute::Uv3, _) => {
                store.uv3 = read_legacy_uvs(reader, format, count, start, stride)?
            }
            (VertexAttribute::Uv4, _) => {
                store.uv4 = read_legacy_uvs(reader, format, count, start, stride)?
            }
            (
                VertexAttribute::Color | VertexAttribute::Color2 | VertexAttribute::WeightIndices,
                VertexFormat::ByteColor | VertexFormat::Byte4,
            ) => {
                let values = Some(read_components::<_, u8, 4>(reader, count, start, stride)?);
                match attribute {
                    VertexAttribute::Color => store.colors = values,
                    VertexAttribute::Color2 => store.colors2 = values,
                    _ => store.weight_indices = values,
                }
            }
            (VertexAttribute::Unk0x22, VertexFormat::Short2) => {
                store.unk_0x22 = Some(read_components(reader, count, start, stride)?);
            }
            (VertexAttribute::Unk0x23, VertexFormat::Short2) => {
                store.unk_0x23 = Some(read_components(reader, count, start, stride)?);
            }
            _ => warn!("Skipping {:?} with unsupported format {:?}.", attribute, format),
        }
    }

    if !has_positions {
        warn!("Vertex declaration has no positions.");
        store.positions = vec![Vec3::ZERO; count];
    }

    Ok(store)
}

fn read_vec3<R: Read + Seek>(
    reader: &mut R,
    count: usize,
    offset: u64,
    stride: u64,
) -> BinResult<Vec<Vec3>> {
    Ok(read_components::<_, f32, 3>(reader, count, offset, stride)?
        .into_iter()
        .map(Vec3::from)
        .collect())
}

fn read_vector_channel<R: Read + Seek>(
    reader: &mut R,
    channel: &mut Channel<Vec3, [i16; 4]>,
    format: VertexFormat,
    count: usize,
    offset: u64,
    stride: u64,
) -> BinResult<()> {
    match format {
        VertexFormat::Float3 => channel.legacy = Some(read_vec3(reader, count, offset, stride)?),
        VertexFormat::Short4 => {
            channel.quantized = Some(read_components(reader, count, offset, stride)?)
        }
        _ => warn!("Skipping vector attribute with unsupported format {:?}.", format),
    }
    Ok(())
}

fn read_uv_channel<R: Read + Seek>(
    reader: &mut R,
    channel: &mut Channel<Vec2, [i16; 2]>,
    format: VertexFormat,
    count: usize,
    offset: u64,
    stride: u64,
) -> BinResult<()> {
    match format {
        VertexFormat::Float2 => {
            channel.legacy = Some(
                read_components::<_, f32, 2>(reader, count, offset, stride)?
                    .into_iter()
                    .map(Vec2::from)
                    .collect(),
            )
        }
        VertexFormat::Short2 => {
            channel.quantized = Some(read_components(reader, count, offset, stride)?)
        }
        _ => warn!("Skipping UV attribute with unsupported format {:?}.", format),
    }
    Ok(())
}

fn read_legacy_uvs<R: Read + Seek>(
    reader: &mut R,
    format: VertexFormat,
    count: usize,
    offset: u64,
    stride: u64,
) -> BinResult<Option<Vec<Vec2>>> {
    let mut channel = Channel::default();
    read_uv_channel(reader, &mut channel, format, count, offset, stride)?;
    Ok(channel.to_legacy_values(dequantize_uv))
}

enum AttributeData<'a> {
    Float2(Cow<'a, [Vec2]>),
    Float3(Cow<'a, [Vec3]>),
    Float4(Cow<'a, [Vec4]>),
    Byte4(&'a [[u8; 4]], VertexFormat),
    Short2(&'a [[i16; 2]]),
    Short4(&'a [[i16; 4]]),
    UShort4(&'a [[u16; 4]]),
}

impl<'a> AttributeData<'a> {
    fn format(&self) -> VertexFormat {
        match self {
            AttributeData::Float2(_) => VertexFormat::Float2,
            AttributeData::Float3(_) => VertexFormat::Float3,
            AttributeData::Float4(_) => VertexFormat::Float4,
            AttributeData::Byte4(_, format) => *format,
            AttributeData::Short2(_) => VertexFormat::Short2,
            AttributeData::Short4(_) => VertexFormat::Short4,
            AttributeData::UShort4(_) => VertexFormat::UShort4,
        }
    }

    fn write_element(&self, index: usize, output: &mut [u8]) {
        fn copy<const N: usize, const M: usize>(output: &mut [u8], components: [[u8; N]; M]) {
            for (chunk, bytes) in output.chunks_exact_mut(N).zip(components) {
                chunk.copy_from_slice(&bytes);
            }
        }

        match self {
            AttributeData::Float2(v) => copy(output, v[index].to_array().map(f32::to_le_bytes)),
            AttributeData::Float3(v) => copy(output, v[index].to_array().map(f32::to_le_bytes)),
            AttributeData::Float4(v) => copy(output, v[index].to_array().map(f32::to_le_bytes)),
            AttributeData::Byte4(v, _) => output[..4].copy_from_slice(&v[index]),
            AttributeData::Short2(v) => copy(output, v[index].map(i16::to_le_bytes)),
            AttributeData::Short4(v) => copy(output, v[index].map(i16::to_le_bytes)),
            AttributeData::UShort4(v) => copy(output, v[index].map(u16::to_le_bytes)),
        }
    }
}

fn vector_data<'a>(
    channel: &'a Channel<Vec3, [i16; 4]>,
    schema: Schema,
) -> Option<AttributeData<'a>> {
    match (schema, channel.resolve()?) {
        (Schema::Variant, ChannelData::Quantized(values)) => Some(AttributeData::Short4(values)),
        (Schema::Classic, ChannelData::Quantized(values)) => Some(AttributeData::Float3(
            Cow::Owned(values.iter().map(dequantize_vector).collect()),
        )),
        (_, ChannelData::Legacy(values)) => Some(AttributeData::Float3(Cow::Borrowed(values))),
    }
}

fn uv_data<'a>(channel: &'a Channel<Vec2, [i16; 2]>, schema: Schema) -> Option<AttributeData<'a>> {
    match (schema, channel.resolve()?) {
        (Schema::Variant, ChannelData::Quantized(values)) => Some(AttributeData::Short2(values)),
        (Schema::Classic, ChannelData::Quantized(values)) => Some(AttributeData::Float2(
            Cow::Owned(values.iter().map(dequantize_uv).collect()),
        )),
        (_, ChannelData::Legacy(values)) => Some(AttributeData::Float2(Cow::Borrowed(values))),
    }
}

fn weight_data(channel: &Channel<Vec4, [u16; 4]>, schema: Schema) -> Option<AttributeData<'_>> {
    match (schema, channel.resolve()?) {
        (Schema::Variant, ChannelData::Quantized(values)) => Some(AttributeData::UShort4(values)),
        (Schema::Classic, ChannelData::Quantized(values)) => Some(AttributeData::Float4(
            Cow::Owned(values.iter().map(dequantize_weights).collect()),
        )),
        (_, ChannelData::Legacy(values)) => Some(AttributeData::Float4(Cow::Borrowed(values))),
    }
}

fn byte4_data(values: &Option<Vec<[u8; 4]>>, format: VertexFormat) -> Option<AttributeData<'_>> {
    values
        .as_deref()
        .map(|values| AttributeData::Byte4(values, format))
}

fn float2_data(values: &Option<Vec<Vec2>>) -> Option<AttributeData<'_>> {
    values
        .as_deref()
        .map(|values| AttributeData::Float2(Cow::Borrowed(values)))
}

// Attributes are ordered by data type.
fn declared_attributes(
    store: &VertexStore,
    schema: Schema,
) -> Vec<(VertexAttribute, AttributeData<'_>)> {
    let attributes = [
        (
            VertexAttribute::Position,
            Some(AttributeData::Float3(Cow::Borrowed(&store.positions))),
        ),
        (VertexAttribute::Weights, weight_data(&store.weights, schema)),
        (VertexAttribute::Normal, vector_data(&store.normals, schema)),
        (
            VertexAttribute::Color,
            byte4_data(&store.colors, VertexFormat::ByteColor),
        ),
        (
            VertexAttribute::Color2,
            byte4_data(&store.colors2, VertexFormat::ByteColor),
        ),
        (
            VertexAttribute::WeightIndices,
            byte4_data(&store.weight_indices, VertexFormat::Byte4),
        ),
        (VertexAttribute::Uv1, uv_data(&store.uv1, schema)),
        (VertexAttribute::Uv2, uv_data(&store.uv2, schema)),
        (VertexAttribute::Uv3, float2_data(&store.uv3)),
        (VertexAttribute::Uv4, float2_data(&store.uv4)),
        (VertexAttribute::Tangent, vector_data(&store.tangents, schema)),
        (VertexAttribute::Binormal, vector_data(&store.binormals, schema)),
        (
            VertexAttribute::Unk0x22,
            store.unk_0x22.as_deref().map(AttributeData::Short2),
        ),
        (
            VertexAttribute::Unk0x23,
            store.unk_0x23.as_deref().map(AttributeData::Short2),
        ),
    ];

    attributes
        .into_iter()
        .filter_map(|(attribute, data)| data.map(|data| (attribute, data)))
        .collect()
}

/// Creates the vertex declaration for the populated attributes of `store`.
///
/// Classic objects store single precision data.
/// Variant objects use the quantized encoding when present.
/**
```rust
# use aqua_data::vtxl_data::{create_declaration, VertexStore};
# use aqua_lib::formats::objc::Schema;
# use glam::Vec3;
let store = VertexStore::from_positions(vec![Vec3::ZERO]);
let declaration = create_declaration(&store, Schema::Classic);
assert_eq!(1, declaration.elements.len());
assert_eq!(12, declaration.stride);
```
 */
pub fn create_declaration(store: &VertexStore, schema: Schema) -> VertexDeclaration {
    let mut elements = Vec::new();
    let mut stride = 0;
    for (attribute, data) in declared_attributes(store, schema) {
        let format = data.format();
        elements.push(VtxeElement {
            data_type: attribute.code(),
            struct_variation: format.code(),
            relative_address: stride as i32,
            reserve0: 0,
        });
        stride += format.size_in_bytes();
    }

    VertexDeclaration { elements, stride }
}

/// Writes the interleaved vertices of `store` using the declaration from [create_declaration].
/// Each vertex is padded with zeros to `stride` bytes.
pub fn write_vertex_buffer<W: Write>(
    writer: &mut W,
    store: &VertexStore,
    schema: Schema,
    stride: usize,
) -> std::io::Result<()> {
    let declaration = create_declaration(store, schema);
    if stride < declaration.stride {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!(
                "Stride {} is smaller than the vertex size {}.",
                stride, declaration.stride
            ),
        ));
    }

    store
        .validate()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let attributes = declared_attributes(store, schema);
    let mut vertex = vec![0u8; stride];
    for i in 0..store.len() {
        for ((_, data), element) in attributes.iter().zip(declaration.elements.iter()) {
            let start = element.relative_address as usize;
            let end = start + data.format().size_in_bytes();
            data.write_element(i, &mut vertex[start..end]);
        }
        writer.write_all(&vertex)?;
    }

    Ok(())
}
