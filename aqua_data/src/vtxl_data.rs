//! Per vertex attribute data for a single vertex set.
//!
//! Attributes with both a single precision and quantized integer encoding are stored as a [Channel].
//! Classic objects store single precision "legacy" data.
//! Variant objects store quantized data for normals, tangents, binormals, weights, and the first two UV maps.
//! See [VertexStore::convert_to_quantized] and [VertexStore::convert_to_legacy] for converting between the two.
use glam::{Vec2, Vec3, Vec4};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod conversion;
mod declaration;
mod weights;

pub use conversion::*;
pub use declaration::*;
pub use weights::*;

/// Errors for vertex data with inconsistent lengths or invalid indices.
#[derive(Debug, Error)]
pub enum VertexStoreError {
    /// The number of elements for an attribute does not match the number of positions.
    #[error(
        "Attribute {} has {} elements but the vertex count is {}.",
        channel,
        actual,
        expected
    )]
    LengthMismatch {
        channel: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The vertex index is out of range for the source vertex data.
    #[error("Vertex index {} is out of range for a vertex count of {}.", index, count)]
    IndexOutOfRange { index: usize, count: usize },
}

/// An attribute that may be stored as single precision values `L`, quantized values `Q`, or both.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Channel<L, Q> {
    pub legacy: Option<Vec<L>>,
    pub quantized: Option<Vec<Q>>,
}

// Derive would require L: Default and Q: Default.
impl<L, Q> Default for Channel<L, Q> {
    fn default() -> Self {
        Self {
            legacy: None,
            quantized: None,
        }
    }
}

/// The data for a [Channel] selected by [Channel::resolve].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelData<'a, L, Q> {
    Quantized(&'a [Q]),
    Legacy(&'a [L]),
}

impl<'a, L, Q> ChannelData<'a, L, Q> {
    pub fn len(&self) -> usize {
        match self {
            ChannelData::Quantized(values) => values.len(),
            ChannelData::Legacy(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub(crate) fn has_data<T>(values: &Option<Vec<T>>) -> bool {
    matches!(values, Some(values) if !values.is_empty())
}

impl<L, Q> Channel<L, Q> {
    pub fn from_legacy(values: Vec<L>) -> Self {
        Self {
            legacy: Some(values),
            quantized: None,
        }
    }

    pub fn from_quantized(values: Vec<Q>) -> Self {
        Self {
            legacy: None,
            quantized: Some(values),
        }
    }

    /// Returns `true` if neither encoding is present.
    pub fn is_empty(&self) -> bool {
        self.legacy.is_none() && self.quantized.is_none()
    }

    /// Selects the data to use for this attribute.
    /// Quantized data takes precedence over legacy data.
    /**
    ```rust
    # use aqua_data::vtxl_data::{Channel, ChannelData};
    let mut channel = Channel::<f32, i16>::from_legacy(vec![0.5]);
    assert_eq!(Some(ChannelData::Legacy(&[0.5][..])), channel.resolve());

    channel.quantized = Some(vec![16384]);
    assert_eq!(Some(ChannelData::Quantized(&[16384][..])), channel.resolve());
    ```
     */
    pub fn resolve(&self) -> Option<ChannelData<'_, L, Q>> {
        match (&self.quantized, &self.legacy) {
            (Some(quantized), _) => Some(ChannelData::Quantized(quantized)),
            (None, Some(legacy)) => Some(ChannelData::Legacy(legacy)),
            (None, None) => None,
        }
    }

    /// The resolved values converted to single precision.
    pub fn to_legacy_values<F: Fn(&Q) -> L>(&self, dequantize: F) -> Option<Vec<L>>
    where
        L: Clone,
    {
        match self.resolve()? {
            ChannelData::Quantized(values) => Some(values.iter().map(dequantize).collect()),
            ChannelData::Legacy(values) => Some(values.to_vec()),
        }
    }

    fn empty_like(&self) -> Self {
        Self {
            legacy: self.legacy.as_ref().map(|_| Vec::new()),
            quantized: self.quantized.as_ref().map(|_| Vec::new()),
        }
    }

    fn push_from(
        &mut self,
        other: &Self,
        index: usize,
        name: &'static str,
        count: usize,
    ) -> Result<(), VertexStoreError>
    where
        L: Clone,
        Q: Clone,
    {
        push_element(&mut self.legacy, &other.legacy, index, name, count)?;
        push_element(&mut self.quantized, &other.quantized, index, name, count)?;
        Ok(())
    }

    fn validate(&self, name: &'static str, count: usize) -> Result<(), VertexStoreError> {
        validate_length(&self.legacy, name, count)?;
        validate_length(&self.quantized, name, count)?;
        Ok(())
    }
}

fn push_element<T: Clone>(
    target: &mut Option<Vec<T>>,
    source: &Option<Vec<T>>,
    index: usize,
    name: &'static str,
    count: usize,
) -> Result<(), VertexStoreError> {
    if let (Some(target), Some(source)) = (target, source) {
        let value = source
            .get(index)
            .ok_or(VertexStoreError::LengthMismatch {
                channel: name,
                expected: count,
                actual: source.len(),
            })?;
        target.push(value.clone());
    }
    Ok(())
}

fn validate_length<T>(
    values: &Option<Vec<T>>,
    name: &'static str,
    count: usize,
) -> Result<(), VertexStoreError> {
    match values {
        Some(values) if values.len() != count => Err(VertexStoreError::LengthMismatch {
            channel: name,
            expected: count,
            actual: values.len(),
        }),
        _ => Ok(()),
    }
}

/// The vertex attributes for a single vertex set.
/// Attributes are stored as parallel arrays indexed by the local vertex index.
/// Every populated attribute should have the same length as [positions](#structfield.positions).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VertexStore {
    pub positions: Vec<Vec3>,
    pub normals: Channel<Vec3, [i16; 4]>,
    pub tangents: Channel<Vec3, [i16; 4]>,
    pub binormals: Channel<Vec3, [i16; 4]>,
    pub uv1: Channel<Vec2, [i16; 2]>,
    pub uv2: Channel<Vec2, [i16; 2]>,
    pub uv3: Option<Vec<Vec2>>,
    pub uv4: Option<Vec<Vec2>>,
    /// BGRA vertex colors.
    pub colors: Option<Vec<[u8; 4]>>,
    pub colors2: Option<Vec<[u8; 4]>>,
    /// Skin weights for up to 4 influences.
    /// Unused slots have a weight of 0 and a bone index of 0.
    pub weights: Channel<Vec4, [u16; 4]>,
    /// Indices into [bone_palette](#structfield.bone_palette) for each weight.
    pub weight_indices: Option<Vec<[u8; 4]>>,
    pub unk_0x22: Option<Vec<[i16; 2]>>,
    pub unk_0x23: Option<Vec<[i16; 2]>>,
    /// Converts the local bone indices in [weight_indices](#structfield.weight_indices) to global bone ids.
    pub bone_palette: Vec<u16>,
    /// Vertices shared with another vertex set split from the same mesh.
    pub edge_verts: Vec<u16>,
}

impl VertexStore {
    /// Creates a vertex store with only positions.
    pub fn from_positions(positions: Vec<Vec3>) -> Self {
        Self {
            positions,
            ..Default::default()
        }
    }

    /// Creates an empty vertex store with the same populated attributes as `other`.
    pub fn with_layout_of(other: &VertexStore) -> Self {
        Self {
            positions: Vec::new(),
            normals: other.normals.empty_like(),
            tangents: other.tangents.empty_like(),
            binormals: other.binormals.empty_like(),
            uv1: other.uv1.empty_like(),
            uv2: other.uv2.empty_like(),
            uv3: other.uv3.as_ref().map(|_| Vec::new()),
            uv4: other.uv4.as_ref().map(|_| Vec::new()),
            colors: other.colors.as_ref().map(|_| Vec::new()),
            colors2: other.colors2.as_ref().map(|_| Vec::new()),
            weights: other.weights.empty_like(),
            weight_indices: other.weight_indices.as_ref().map(|_| Vec::new()),
            unk_0x22: other.unk_0x22.as_ref().map(|_| Vec::new()),
            unk_0x23: other.unk_0x23.as_ref().map(|_| Vec::new()),
            bone_palette: Vec::new(),
            edge_verts: Vec::new(),
        }
    }

    /// The number of vertices.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Appends every attribute of the vertex at `index` in `other`.
    /// Only attributes populated in `self` are copied.
    pub fn push_vertex_from(
        &mut self,
        other: &VertexStore,
        index: usize,
    ) -> Result<(), VertexStoreError> {
        let count = other.len();
        let position = other
            .positions
            .get(index)
            .ok_or(VertexStoreError::IndexOutOfRange { index, count })?;
        other.validate()?;

        self.normals
            .push_from(&other.normals, index, "normals", count)?;
        self.tangents
            .push_from(&other.tangents, index, "tangents", count)?;
        self.binormals
            .push_from(&other.binormals, index, "binormals", count)?;
        self.uv1.push_from(&other.uv1, index, "uv1", count)?;
        self.uv2.push_from(&other.uv2, index, "uv2", count)?;
        push_element(&mut self.uv3, &other.uv3, index, "uv3", count)?;
        push_element(&mut self.uv4, &other.uv4, index, "uv4", count)?;
        push_element(&mut self.colors, &other.colors, index, "colors", count)?;
        push_element(&mut self.colors2, &other.colors2, index, "colors2", count)?;
        self.weights
            .push_from(&other.weights, index, "weights", count)?;
        push_element(
            &mut self.weight_indices,
            &other.weight_indices,
            index,
            "weight_indices",
            count,
        )?;
        push_element(&mut self.unk_0x22, &other.unk_0x22, index, "unk_0x22", count)?;
        push_element(&mut self.unk_0x23, &other.unk_0x23, index, "unk_0x23", count)?;
        self.positions.push(*position);
        Ok(())
    }

    /// Checks that every populated attribute has one element per vertex.
    pub fn validate(&self) -> Result<(), VertexStoreError> {
        let count = self.len();
        self.normals.validate("normals", count)?;
        self.tangents.validate("tangents", count)?;
        self.binormals.validate("binormals", count)?;
        self.uv1.validate("uv1", count)?;
        self.uv2.validate("uv2", count)?;
        validate_length(&self.uv3, "uv3", count)?;
        validate_length(&self.uv4, "uv4", count)?;
        validate_length(&self.colors, "colors", count)?;
        validate_length(&self.colors2, "colors2", count)?;
        self.weights.validate("weights", count)?;
        validate_length(&self.weight_indices, "weight_indices", count)?;
        validate_length(&self.unk_0x22, "unk_0x22", count)?;
        validate_length(&self.unk_0x23, "unk_0x23", count)?;
        Ok(())
    }
}

/// Flips the V coordinate of each UV.
/// Most applications expect the opposite vertical orientation.
pub fn flip_uvs(uvs: &[Vec2]) -> Vec<Vec2> {
    uvs.iter().map(|uv| Vec2::new(uv.x, -uv.y)).collect()
}
