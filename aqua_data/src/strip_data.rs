//! Triangle strips and triangle lists for topology sets.
//!
//! Classic objects store each topology set as a single triangle strip.
//! Variant objects store a flat list of triangles in a shared index buffer.
//! [StripData::triangles] decodes both representations to triangles.
use std::io::{Read, Seek};

use aqua_lib::formats::strip::{Pset, StripHeader};
use aqua_lib::{read_table, seek_to};
use binread::{BinReaderExt, BinResult};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Errors while creating strips.
#[derive(Debug, Error)]
pub enum StripError {
    /// The strip generation routine failed.
    #[error("Failed to generate triangle strips: {}", message)]
    Stripify { message: String },

    /// The vertex index can not be represented as a 16-bit index.
    #[error("Vertex index {} exceeds the maximum index {}.", index, u16::MAX)]
    IndexOverflow { index: u32 },

    /// The index count is not a multiple of 3.
    #[error("Triangle list index count {} is not a multiple of 3.", count)]
    InvalidTriangleList { count: usize },
}

/// How to interpret the indices of a [StripData].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripFormat {
    /// A single triangle strip with alternating winding.
    Strip,
    /// Independent triangles without shared vertices between triangles.
    TriangleList,
}

/// The vertex indices for a single topology set.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripData {
    pub format: StripFormat,
    /// The number of indices in [indices](#structfield.indices).
    pub tri_id_count: i32,
    pub reserve0: i32,
    pub reserve1: i32,
    pub reserve2: i32,
    pub indices: Vec<u16>,
}

/// A routine for converting a triangle list to triangle strips.
pub trait Stripifier {
    /// Converts the triangle list `indices` referencing `vertex_count` vertices to one or more strips.
    fn stripify(&self, indices: &[u16], vertex_count: usize) -> Result<Vec<Vec<u16>>, StripError>;
}

/// A [Stripifier] using [meshopt](https://crates.io/crates/meshopt).
/// Strips are joined by degenerate triangles into a single strip.
#[derive(Debug, Default, Clone, Copy)]
pub struct MeshoptStripifier;

impl Stripifier for MeshoptStripifier {
    fn stripify(&self, indices: &[u16], vertex_count: usize) -> Result<Vec<Vec<u16>>, StripError> {
        let indices: Vec<u32> = indices.iter().map(|i| *i as u32).collect();

        // A restart index of 0 joins strips with degenerate triangles.
        let strip = meshopt::stripify(&indices, vertex_count, 0).map_err(|e| {
            StripError::Stripify {
                message: format!("{:?}", e),
            }
        })?;

        let strip = strip
            .into_iter()
            .map(|i| u16::try_from(i).map_err(|_| StripError::IndexOverflow { index: i }))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(vec![strip])
    }
}

impl StripData {
    fn new(format: StripFormat, indices: Vec<u16>) -> Self {
        Self {
            format,
            tri_id_count: indices.len() as i32,
            reserve0: 0,
            reserve1: 0,
            reserve2: 0,
            indices,
        }
    }

    /// Creates a triangle strip from a triangle list using `stripifier`.
    /// Only the first strip is kept.
    /**
    ```rust
    # use aqua_data::strip_data::{StripData, MeshoptStripifier};
    let strip = StripData::from_triangle_list(&[0, 1, 2, 2, 1, 3], &MeshoptStripifier)?;
    assert_eq!(2, strip.triangles(true).len());
    # Ok::<(), aqua_data::strip_data::StripError>(())
    ```
     */
    pub fn from_triangle_list<S: Stripifier>(
        indices: &[u16],
        stripifier: &S,
    ) -> Result<Self, StripError> {
        if indices.len() % 3 != 0 {
            return Err(StripError::InvalidTriangleList {
                count: indices.len(),
            });
        }

        let vertex_count = indices.iter().max().map(|i| *i as usize + 1).unwrap_or(0);
        let strip = stripifier
            .stripify(indices, vertex_count)?
            .into_iter()
            .next()
            .unwrap_or_default();
        Ok(Self::new(StripFormat::Strip, strip))
    }

    /// Creates a triangle list without converting to strips.
    pub fn triangle_list(indices: Vec<u16>) -> Self {
        Self::new(StripFormat::TriangleList, indices)
    }

    /// Creates a strip from the classic strip header and its indices.
    pub fn from_header(header: &StripHeader, indices: Vec<u16>) -> Self {
        Self {
            format: StripFormat::Strip,
            tri_id_count: header.tri_id_count,
            reserve0: header.reserve0,
            reserve1: header.reserve1,
            reserve2: header.reserve2,
            indices,
        }
    }

    /// The classic strip header for this strip.
    pub fn header(&self) -> StripHeader {
        StripHeader {
            tri_id_count: self.indices.len() as i32,
            reserve0: self.reserve0,
            reserve1: self.reserve1,
            reserve2: self.reserve2,
        }
    }

    /// Decodes the indices to triangles.
    ///
    /// Strips alternate winding order for each triangle.
    /// If `remove_degenerate` is `true`, strip triangles with repeated indices are skipped.
    /// Triangle lists are never filtered, and trailing indices that don't form a triangle are ignored.
    /**
    ```rust
    # use aqua_data::strip_data::StripData;
    let list = StripData::triangle_list(vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(vec![[0, 1, 2], [3, 4, 5]], list.triangles(false));
    ```
     */
    pub fn triangles(&self, remove_degenerate: bool) -> Vec<[u16; 3]> {
        match self.format {
            StripFormat::Strip => self
                .indices
                .windows(3)
                .enumerate()
                .filter(|(_, w)| !remove_degenerate || !is_degenerate(w))
                .map(|(i, w)| {
                    if i % 2 == 0 {
                        [w[0], w[1], w[2]]
                    } else {
                        [w[0], w[2], w[1]]
                    }
                })
                .collect(),
            StripFormat::TriangleList => self
                .indices
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2]])
                .collect(),
        }
    }

    /// The triangles flattened to a triangle list.
    pub fn triangle_indices(&self, remove_degenerate: bool) -> Vec<u16> {
        self.triangles(remove_degenerate)
            .into_iter()
            .flatten()
            .collect()
    }

    /// The largest vertex index or `None` if there are no indices.
    pub fn max_index(&self) -> Option<u16> {
        self.indices.iter().copied().max()
    }
}

fn is_degenerate(w: &[u16]) -> bool {
    w[0] == w[1] || w[0] == w[2] || w[1] == w[2]
}

/// Reads the strip header and indices for a classic topology set.
pub fn read_classic_strip<R: Read + Seek>(reader: &mut R, pset: &Pset) -> BinResult<StripData> {
    seek_to(reader, pset.face_count_offset)?;
    let header: StripHeader = reader.read_le()?;
    let indices = read_table(reader, pset.face_offset, header.tri_id_count)?;
    Ok(StripData::from_header(&header, indices))
}

/// Reads the triangle list for a variant topology set from the shared index buffer at `index_buffer_offset`.
pub fn read_variant_strip<R: Read + Seek>(
    reader: &mut R,
    pset: &Pset,
    index_buffer_offset: i32,
) -> BinResult<StripData> {
    let pos = reader.stream_position()?;
    let offset = pset
        .strip_start_count
        .checked_mul(2)
        .and_then(|o| o.checked_add(index_buffer_offset))
        .ok_or_else(|| binread::Error::AssertFail {
            pos,
            message: format!(
                "Index range starting at {} overflows the index buffer offset {}.",
                pset.strip_start_count, index_buffer_offset
            ),
        })?;
    let indices = read_table(reader, offset, pset.pset_face_count)?;
    Ok(StripData::triangle_list(indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use binread::io::Cursor;
    use hexlit::hex;

    struct ReverseStripifier;

    impl Stripifier for ReverseStripifier {
        fn stripify(
            &self,
            indices: &[u16],
            _vertex_count: usize,
        ) -> Result<Vec<Vec<u16>>, StripError> {
            Ok(vec![indices.iter().rev().copied().collect(), vec![0, 0, 0]])
        }
    }

    fn strip(indices: Vec<u16>) -> StripData {
        StripData::new(StripFormat::Strip, indices)
    }

    #[test]
    fn strip_triangles_alternate_winding() {
        assert_eq!(
            vec![[0, 1, 2], [1, 3, 2], [2, 3, 4]],
            strip(vec![0, 1, 2, 3, 4]).triangles(false)
        );
    }

    #[test]
    fn strip_triangles_remove_degenerate() {
        let data = strip(vec![0, 1, 2, 2, 3]);
        assert_eq!(vec![[0, 1, 2]], data.triangles(true));
    }

    #[test]
    fn strip_triangles_keep_degenerate() {
        let data = strip(vec![0, 1, 2, 2, 3]);
        assert_eq!(
            vec![[0, 1, 2], [1, 2, 2], [2, 2, 3]],
            data.triangles(false)
        );
    }

    #[test]
    fn strip_triangles_winding_after_degenerate() {
        // Skipped triangles still count toward the winding order.
        let data = strip(vec![0, 1, 2, 2, 3, 4, 5]);
        assert_eq!(
            vec![[0, 1, 2], [2, 4, 3], [3, 4, 5]],
            data.triangles(true)
        );
    }

    #[test]
    fn strip_triangles_too_short() {
        assert!(strip(vec![0, 1]).triangles(true).is_empty());
        assert!(strip(Vec::new()).triangles(false).is_empty());
    }

    #[test]
    fn triangle_list_triangles() {
        let data = StripData::triangle_list(vec![0, 1, 2, 3, 4, 5]);
        assert_eq!(vec![[0, 1, 2], [3, 4, 5]], data.triangles(true));
        assert_eq!(6, data.tri_id_count);
    }

    #[test]
    fn triangle_list_degenerate_not_removed() {
        let data = StripData::triangle_list(vec![0, 0, 1, 2, 3, 4, 5]);
        assert_eq!(vec![[0, 0, 1], [2, 3, 4]], data.triangles(true));
    }

    #[test]
    fn from_triangle_list_keeps_first_strip() {
        let data = StripData::from_triangle_list(&[0, 1, 2, 3, 4, 5], &ReverseStripifier).unwrap();
        assert_eq!(StripFormat::Strip, data.format);
        assert_eq!(vec![5, 4, 3, 2, 1, 0], data.indices);
        assert_eq!(6, data.tri_id_count);
    }

    #[test]
    fn from_triangle_list_invalid_count() {
        let result = StripData::from_triangle_list(&[0, 1], &ReverseStripifier);
        assert!(matches!(
            result,
            Err(StripError::InvalidTriangleList { count: 2 })
        ));
    }

    #[test]
    fn meshopt_strip_preserves_triangles() {
        let indices = [0, 1, 2, 2, 1, 3, 2, 3, 4, 4, 3, 5];
        let data = StripData::from_triangle_list(&indices, &MeshoptStripifier).unwrap();
        assert_eq!(data.indices.len() as i32, data.tri_id_count);

        // Compare triangles ignoring winding and order.
        let normalize = |triangles: Vec<[u16; 3]>| {
            let mut triangles: Vec<_> = triangles
                .into_iter()
                .map(|mut t| {
                    t.sort_unstable();
                    t
                })
                .collect();
            triangles.sort_unstable();
            triangles
        };
        let expected = normalize(vec![[0, 1, 2], [2, 1, 3], [2, 3, 4], [4, 3, 5]]);
        assert_eq!(expected, normalize(data.triangles(true)));
    }

    #[test]
    fn meshopt_empty() {
        let data = StripData::from_triangle_list(&[], &MeshoptStripifier).unwrap();
        assert!(data.indices.is_empty());
        assert_eq!(0, data.tri_id_count);
    }

    #[test]
    fn header_uses_index_count() {
        let mut data = strip(vec![0, 1, 2]);
        data.reserve1 = 7;
        data.tri_id_count = 100;
        assert_eq!(
            StripHeader {
                tri_id_count: 3,
                reserve0: 0,
                reserve1: 7,
                reserve2: 0
            },
            data.header()
        );
    }

    #[test]
    fn read_classic() {
        let mut reader = Cursor::new(hex!(
            "03000000 00000000 00000000 00000000 00000100 0200FFFF"
        ));
        let pset = Pset {
            face_count_offset: 0,
            face_offset: 16,
            ..Default::default()
        };
        let data = read_classic_strip(&mut reader, &pset).unwrap();
        assert_eq!(strip(vec![0, 1, 2]), data);
    }

    #[test]
    fn read_classic_past_end() {
        let mut reader = Cursor::new(hex!("05000000 00000000 00000000 00000000 00000100"));
        let pset = Pset {
            face_count_offset: 0,
            face_offset: 16,
            ..Default::default()
        };
        assert!(read_classic_strip(&mut reader, &pset).is_err());
    }

    #[test]
    fn read_variant() {
        let mut reader = Cursor::new(hex!("FFFFFFFF 00000100 02000300 04000500 0600"));
        let pset = Pset {
            strip_start_count: 1,
            pset_face_count: 6,
            ..Default::default()
        };
        let data = read_variant_strip(&mut reader, &pset, 2).unwrap();
        assert_eq!(StripData::triangle_list(vec![0, 1, 2, 3, 4, 5]), data);
        assert_eq!(vec![[0, 1, 2], [3, 4, 5]], data.triangles(false));
    }

    #[test]
    fn read_variant_negative_offset() {
        let mut reader = Cursor::new(hex!("00000100 0200"));
        let pset = Pset {
            strip_start_count: -4,
            pset_face_count: 3,
            ..Default::default()
        };
        assert!(read_variant_strip(&mut reader, &pset, 0).is_err());
    }

    #[test]
    fn read_variant_offset_overflow() {
        let mut reader = Cursor::new(hex!("00000100 0200"));
        reader.set_position(4);
        let pset = Pset {
            strip_start_count: i32::MAX,
            pset_face_count: 3,
            ..Default::default()
        };
        let result = read_variant_strip(&mut reader, &pset, 0);
        assert!(matches!(
            result,
            Err(binread::Error::AssertFail { pos: 4, .. })
        ));
    }
}
