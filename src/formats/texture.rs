//! Texture state, texture set, and texture file records.
use std::io::{Error, ErrorKind};

use aqua_write::AquaWrite;
use binread::{
    io::{Read, Seek, SeekFrom},
    BinRead, BinResult, ReadOptions,
};

use crate::{FixedString, Vector3};

#[cfg(feature = "derive_serde")]
use serde::{Deserialize, Serialize};

/// The usual tag for classic texture states.
pub const TSTA_TAG: i32 = 0x16;

#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, PartialEq, Default)]
pub struct Tsta {
    pub tag: i32,
    /// The slot of the texture in the texture set.
    pub tex_usage_order: i32,
    /// The UV map index or -1 for textures that don't use UVs.
    pub model_uv_set: i32,
    pub unk_vector0: Vector3,
    pub unk_int0: i32,
    pub unk_int1: i32,
    pub unk_int2: i32,
    pub unk_int3: i32,
    pub unk_int4: i32,
    pub unk_int5: i32,
    pub unk_float0: f32,
    pub unk_float1: f32,
    /// The texture file name including the extension.
    pub tex_name: FixedString,
}

/// A texture file name. Stored in the same order as [Tsta].
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(BinRead, AquaWrite, Debug, Clone, PartialEq, Eq, Default)]
pub struct Texf {
    pub tex_name: FixedString,
}

/// The size of the texture id area following the fixed fields.
const TEXTURE_ID_AREA_SIZE: u64 = 0x10;

/// The storage for the texture ids of a [Tset] selected by its texture count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureIdEncoding {
    /// Up to 4 ids as `i32` with -1 for empty slots.
    Int32,
    /// Up to 16 ids as `u8` with 0xFF for empty slots.
    Byte,
}

impl TextureIdEncoding {
    pub fn from_tex_count(tex_count: i32) -> Self {
        if tex_count > 4 {
            Self::Byte
        } else {
            Self::Int32
        }
    }

    fn capacity(&self) -> usize {
        match self {
            Self::Int32 => 4,
            Self::Byte => 16,
        }
    }
}

/// A set of texture states used by a mesh.
#[cfg_attr(feature = "derive_serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tset {
    pub unk_int0: i32,
    pub tex_count: i32,
    pub unk_int1: i32,
    pub unk_int2: i32,
    pub unk_int3: i32,
    /// Indices into the [Tsta] table with empty slots removed.
    pub tsta_tex_ids: Vec<i32>,
}

impl BinRead for Tset {
    type Args = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        options: &ReadOptions,
        _args: Self::Args,
    ) -> BinResult<Self> {
        let unk_int0 = i32::read_options(reader, options, ())?;
        let tex_count = i32::read_options(reader, options, ())?;
        let unk_int1 = i32::read_options(reader, options, ())?;
        let unk_int2 = i32::read_options(reader, options, ())?;
        let unk_int3 = i32::read_options(reader, options, ())?;

        let ids_start = reader.stream_position()?;

        let mut tsta_tex_ids = Vec::new();
        match TextureIdEncoding::from_tex_count(tex_count) {
            TextureIdEncoding::Byte => {
                for _ in 0..tex_count {
                    let id = u8::read_options(reader, options, ())?;
                    if id != 0xFF {
                        tsta_tex_ids.push(id as i32);
                    }
                }
            }
            TextureIdEncoding::Int32 => {
                for _ in 0..tex_count {
                    let id = i32::read_options(reader, options, ())?;
                    if id >= 0 {
                        tsta_tex_ids.push(id);
                    }
                }
            }
        }

        // The id area has a fixed size regardless of the encoding.
        reader.seek(SeekFrom::Start(ids_start + TEXTURE_ID_AREA_SIZE))?;

        Ok(Self {
            unk_int0,
            tex_count,
            unk_int1,
            unk_int2,
            unk_int3,
            tsta_tex_ids,
        })
    }
}

impl AquaWrite for Tset {
    fn aqua_write<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.unk_int0.aqua_write(writer)?;
        self.tex_count.aqua_write(writer)?;
        self.unk_int1.aqua_write(writer)?;
        self.unk_int2.aqua_write(writer)?;
        self.unk_int3.aqua_write(writer)?;

        let encoding = TextureIdEncoding::from_tex_count(self.tex_count);
        if self.tsta_tex_ids.len() > encoding.capacity() {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!(
                    "{} texture ids exceed the capacity of {} for a texture count of {}.",
                    self.tsta_tex_ids.len(),
                    encoding.capacity(),
                    self.tex_count
                ),
            ));
        }

        match encoding {
            TextureIdEncoding::Int32 => {
                let mut ids = [-1i32; 4];
                ids[..self.tsta_tex_ids.len()].copy_from_slice(&self.tsta_tex_ids);
                ids.aqua_write(writer)?;
            }
            TextureIdEncoding::Byte => {
                let mut ids = [0xFFu8; 16];
                for (output, id) in ids.iter_mut().zip(self.tsta_tex_ids.iter()) {
                    *output = u8::try_from(*id)
                        .ok()
                        .filter(|id| *id != 0xFF)
                        .ok_or_else(|| {
                            Error::new(
                                ErrorKind::InvalidData,
                                format!("Texture id {} can't be stored as a byte.", id),
                            )
                        })?;
                }
                ids.aqua_write(writer)?;
            }
        }
        Ok(())
    }

    fn size_in_bytes(&self) -> u64 {
        0x14 + TEXTURE_ID_AREA_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binread::{io::Cursor, BinReaderExt};
    use hexlit::hex;

    #[test]
    fn read_tset_byte_ids() {
        let mut reader = Cursor::new(hex!("00000000 06000000 00000000 00000000 00000000 0001FF02 FF03FFFF FFFFFFFF FFFFFFFF 01020304"));
        let tset = reader.read_le::<Tset>().unwrap();

        assert_eq!(6, tset.tex_count);
        assert_eq!(vec![0, 1, 2, 3], tset.tsta_tex_ids);
        assert_eq!(0x24, reader.stream_position().unwrap());
    }

    #[test]
    fn read_tset_int_ids() {
        let mut reader = Cursor::new(hex!("00000000 02000000 00000000 00000000 00000000 01000000 FFFFFFFF FFFFFFFF FFFFFFFF"));
        let tset = reader.read_le::<Tset>().unwrap();

        assert_eq!(2, tset.tex_count);
        assert_eq!(vec![1], tset.tsta_tex_ids);
        assert_eq!(0x24, reader.stream_position().unwrap());
    }

    #[test]
    fn read_tset_no_textures() {
        let mut reader = Cursor::new(hex!("00000000 00000000 00000000 00000000 00000000 FFFFFFFF FFFFFFFF FFFFFFFF FFFFFFFF"));
        let tset = reader.read_le::<Tset>().unwrap();

        assert!(tset.tsta_tex_ids.is_empty());
        assert_eq!(0x24, reader.stream_position().unwrap());
    }

    #[test]
    fn read_tset_consecutive_records() {
        let mut reader = Cursor::new(hex!("00000000 01000000 00000000 00000000 00000000 03000000 FFFFFFFF FFFFFFFF FFFFFFFF 00000000 05000000 00000000 00000000 00000000 00010203 04FFFFFF FFFFFFFF FFFFFFFF"));
        let first = reader.read_le::<Tset>().unwrap();
        let second = reader.read_le::<Tset>().unwrap();

        assert_eq!(vec![3], first.tsta_tex_ids);
        assert_eq!(vec![0, 1, 2, 3, 4], second.tsta_tex_ids);
    }

    #[test]
    fn write_tset_int_ids() {
        let tset = Tset {
            tex_count: 2,
            tsta_tex_ids: vec![1],
            ..Default::default()
        };

        let mut writer = Vec::new();
        tset.aqua_write(&mut writer).unwrap();
        assert_eq!(
            hex!("00000000 02000000 00000000 00000000 00000000 01000000 FFFFFFFF FFFFFFFF FFFFFFFF"),
            writer[..]
        );
        assert_eq!(writer.len() as u64, tset.size_in_bytes());
    }

    #[test]
    fn write_tset_byte_ids() {
        let tset = Tset {
            tex_count: 6,
            tsta_tex_ids: vec![0, 1, 2, 3],
            ..Default::default()
        };

        let mut writer = Vec::new();
        tset.aqua_write(&mut writer).unwrap();
        assert_eq!(
            hex!("00000000 06000000 00000000 00000000 00000000 00010203 FFFFFFFF FFFFFFFF FFFFFFFF"),
            writer[..]
        );
    }

    #[test]
    fn write_tset_too_many_ids() {
        let tset = Tset {
            tex_count: 4,
            tsta_tex_ids: vec![0, 1, 2, 3, 4],
            ..Default::default()
        };
        assert!(tset.aqua_write(&mut Vec::new()).is_err());
    }

    #[test]
    fn write_tset_byte_id_out_of_range() {
        let tset = Tset {
            tex_count: 5,
            tsta_tex_ids: vec![0, 300],
            ..Default::default()
        };
        assert!(tset.aqua_write(&mut Vec::new()).is_err());
    }

    #[test]
    fn tsta_size() {
        assert_eq!(0x58, Tsta::default().size_in_bytes());
        assert_eq!(0x20, Texf::default().size_in_bytes());
    }
}
