use std::str::FromStr;

use aqua_write::AquaWrite;
use binread::{
    io::{Read, Seek},
    BinRead, BinResult, ReadOptions,
};

#[cfg(feature = "derive_serde")]
use serde::{de::Visitor, Deserialize, Serialize, Serializer};

/// The size in bytes of every string field.
pub const FIXED_STRING_SIZE: usize = 0x20;

/// A NUL padded string stored inline in exactly 0x20 bytes.
/// Longer text is truncated when converting to a [FixedString].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedString([u8; FIXED_STRING_SIZE]);

impl FixedString {
    /// Creates the string from raw bytes, truncating or padding with zeros to 0x20 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut data = [0u8; FIXED_STRING_SIZE];
        let length = bytes.len().min(FIXED_STRING_SIZE);
        data[..length].copy_from_slice(&bytes[..length]);
        Self(data)
    }

    /// The bytes up to but not including the first NUL byte.
    pub fn as_bytes(&self) -> &[u8] {
        let length = self
            .0
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(FIXED_STRING_SIZE);
        &self.0[..length]
    }

    /// Converts the underlying bytes to a string.
    /// Returns `None` if the data is not valid UTF-8.
    pub fn to_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }

    /// Converts the underlying bytes to a string, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }
}

impl Default for FixedString {
    fn default() -> Self {
        Self([0u8; FIXED_STRING_SIZE])
    }
}

impl std::fmt::Debug for FixedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

impl FromStr for FixedString {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.into())
    }
}

impl From<&str> for FixedString {
    fn from(text: &str) -> Self {
        Self::from_bytes(text.as_bytes())
    }
}

impl From<String> for FixedString {
    fn from(text: String) -> Self {
        Self::from_bytes(text.as_bytes())
    }
}

impl BinRead for FixedString {
    type Args = ();

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        _options: &ReadOptions,
        _args: Self::Args,
    ) -> BinResult<Self> {
        let mut data = [0u8; FIXED_STRING_SIZE];
        reader.read_exact(&mut data)?;
        Ok(Self(data))
    }
}

impl AquaWrite for FixedString {
    fn aqua_write<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.0)
    }

    fn size_in_bytes(&self) -> u64 {
        FIXED_STRING_SIZE as u64
    }
}

#[cfg(feature = "derive_serde")]
impl Serialize for FixedString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

#[cfg(feature = "derive_serde")]
struct FixedStringVisitor;

#[cfg(feature = "derive_serde")]
impl<'de> Visitor<'de> for FixedStringVisitor {
    type Value = FixedString;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a string of at most 32 bytes")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: serde::de::Error,
    {
        if v.len() > FIXED_STRING_SIZE {
            return Err(E::invalid_length(v.len(), &self));
        }
        Ok(v.into())
    }
}

#[cfg(feature = "derive_serde")]
impl<'de> Deserialize<'de> for FixedString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(FixedStringVisitor)
    }
}
