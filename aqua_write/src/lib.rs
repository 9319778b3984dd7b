use std::io::Write;

pub use aqua_write_derive::AquaWrite;

/// A trait for writing the little-endian byte representation of types that are part of Aqua formats.
///
/// Offsets in Aqua files are absolute, so implementations only write their own fields.
/// Any pointed to data is laid out separately by the caller.
pub trait AquaWrite {
    /// Writes the byte representation of `self` to `writer`.
    fn aqua_write<W: Write>(&self, writer: &mut W) -> std::io::Result<()>;

    /// The number of bytes written by [aqua_write](crate::AquaWrite::aqua_write).
    fn size_in_bytes(&self) -> u64;
}

impl<T: AquaWrite> AquaWrite for [T] {
    fn aqua_write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for element in self.iter() {
            element.aqua_write(writer)?;
        }
        Ok(())
    }

    fn size_in_bytes(&self) -> u64 {
        self.iter().map(AquaWrite::size_in_bytes).sum()
    }
}

impl<T: AquaWrite, const N: usize> AquaWrite for [T; N] {
    fn aqua_write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.as_slice().aqua_write(writer)
    }

    fn size_in_bytes(&self) -> u64 {
        self.as_slice().size_in_bytes()
    }
}

impl<T: AquaWrite> AquaWrite for Vec<T> {
    fn aqua_write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.as_slice().aqua_write(writer)
    }

    fn size_in_bytes(&self) -> u64 {
        self.as_slice().size_in_bytes()
    }
}

impl<T: AquaWrite> AquaWrite for Option<T> {
    fn aqua_write<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Some(value) => value.aqua_write(writer),
            None => Ok(()),
        }
    }

    fn size_in_bytes(&self) -> u64 {
        // None values are skipped entirely.
        match self {
            Some(value) => value.size_in_bytes(),
            None => 0u64,
        }
    }
}

macro_rules! aqua_write_impl {
    ($($id:ident),*) => {
        $(
            impl AquaWrite for $id {
                fn aqua_write<W: std::io::Write>(
                    &self,
                    writer: &mut W,
                ) -> std::io::Result<()> {
                    writer.write_all(&self.to_le_bytes())?;
                    Ok(())
                }

                fn size_in_bytes(&self) -> u64 {
                    std::mem::size_of::<Self>() as u64
                }
            }
        )*
    }
}

aqua_write_impl!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

/// Writes `value` followed by zeros until the total size is a multiple of `alignment`.
pub fn write_aligned<T: AquaWrite + ?Sized, W: Write>(
    writer: &mut W,
    value: &T,
    alignment: u64,
) -> std::io::Result<()> {
    value.aqua_write(writer)?;
    let size = value.size_in_bytes();
    let padding = round_up(size, alignment) - size;
    writer.write_all(&vec![0u8; padding as usize])?;
    Ok(())
}

/// Finds the next multiple of `n` greater than or equal to `value`.
pub fn round_up(value: u64, n: u64) -> u64 {
    if n == 0 {
        return value;
    }
    ((value + n - 1) / n) * n
}
