use std::{fmt::Display, str::FromStr};

use super::PlyError;

/// Storage format of the PLY body.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlyFormat {
    /// Whitespace separated text, one element record per line.
    Ascii,
    /// Packed little endian binary records.
    BinaryLittleEndian,
    /// Packed big endian binary records.
    BinaryBigEndian,
}

impl PlyFormat {
    /// Parse the format keyword of the `format` header line.
    pub fn parse(keyword: &str) -> Result<Self, PlyError> {
        match keyword {
            "ascii" => Ok(PlyFormat::Ascii),
            "binary_little_endian" => Ok(PlyFormat::BinaryLittleEndian),
            "binary_big_endian" => Ok(PlyFormat::BinaryBigEndian),
            _ => Err(PlyError::UnsupportedFormat(keyword.to_string())),
        }
    }
}

/// Scalar data types of PLY properties.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlyDataType {
    /// 32 bit float
    Float32,
    /// 64 bit float
    Float64,
    /// signed 8 bit integer
    Int8,
    /// unsigned 8 bit integer
    UInt8,
    /// signed 16 bit integer
    Int16,
    /// unsigned 16 bit integer
    UInt16,
    /// signed 32 bit integer
    Int32,
    /// unsigned 32 bit integer
    UInt32,
}

impl PlyDataType {
    /// Size in bytes of the binary representation.
    pub fn size(&self) -> usize {
        match self {
            PlyDataType::Float32 | PlyDataType::Int32 | PlyDataType::UInt32 => 4,
            PlyDataType::Float64 => 8,
            PlyDataType::Int16 | PlyDataType::UInt16 => 2,
            PlyDataType::Int8 | PlyDataType::UInt8 => 1,
        }
    }

    /// Check if the type is a floating point type.
    pub fn is_float(&self) -> bool {
        matches!(self, PlyDataType::Float32 | PlyDataType::Float64)
    }

    /// Parse a type name of a `property` header line, old and sized spellings alike.
    pub fn parse(type_str: &str) -> Result<Self, PlyError> {
        match type_str {
            "float" | "float32" => Ok(PlyDataType::Float32),
            "double" | "float64" => Ok(PlyDataType::Float64),
            "char" | "int8" => Ok(PlyDataType::Int8),
            "uchar" | "uint8" => Ok(PlyDataType::UInt8),
            "short" | "int16" => Ok(PlyDataType::Int16),
            "ushort" | "uint16" => Ok(PlyDataType::UInt16),
            "int" | "int32" => Ok(PlyDataType::Int32),
            "uint" | "uint32" => Ok(PlyDataType::UInt32),
            _ => Err(PlyError::UnsupportedDataType(type_str.to_string())),
        }
    }
}

/// A decoded scalar property value.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum PlyScalar {
    /// 32 bit float
    Float32(f32),
    /// 64 bit float
    Float64(f64),
    /// signed 8 bit integer
    Int8(i8),
    /// unsigned 8 bit integer
    UInt8(u8),
    /// signed 16 bit integer
    Int16(i16),
    /// unsigned 16 bit integer
    UInt16(u16),
    /// signed 32 bit integer
    Int32(i32),
    /// unsigned 32 bit integer
    UInt32(u32),
}

macro_rules! decode_binary {
    ($variant:ident, $ty:ty, $bytes:expr, $big_endian:expr) => {{
        let mut raw = [0u8; std::mem::size_of::<$ty>()];
        raw.copy_from_slice(&$bytes[..std::mem::size_of::<$ty>()]);
        PlyScalar::$variant(if $big_endian {
            <$ty>::from_be_bytes(raw)
        } else {
            <$ty>::from_le_bytes(raw)
        })
    }};
}

fn parse_token<T>(token: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    token.parse().map_err(|e: T::Err| e.to_string())
}

impl PlyScalar {
    /// Convert the value to `f64`.
    pub fn as_f64(&self) -> f64 {
        match *self {
            PlyScalar::Float32(v) => v as f64,
            PlyScalar::Float64(v) => v,
            PlyScalar::Int8(v) => v as f64,
            PlyScalar::UInt8(v) => v as f64,
            PlyScalar::Int16(v) => v as f64,
            PlyScalar::UInt16(v) => v as f64,
            PlyScalar::Int32(v) => v as f64,
            PlyScalar::UInt32(v) => v as f64,
        }
    }

    /// Convert an integer value to a list length, `None` for floats and negative values.
    pub fn as_count(&self) -> Option<usize> {
        match *self {
            PlyScalar::Int8(v) => usize::try_from(v).ok(),
            PlyScalar::UInt8(v) => Some(v as usize),
            PlyScalar::Int16(v) => usize::try_from(v).ok(),
            PlyScalar::UInt16(v) => Some(v as usize),
            PlyScalar::Int32(v) => usize::try_from(v).ok(),
            PlyScalar::UInt32(v) => usize::try_from(v).ok(),
            PlyScalar::Float32(_) | PlyScalar::Float64(_) => None,
        }
    }

    /// Parse a value of an ascii body.
    pub fn parse(data_type: PlyDataType, token: &str) -> Result<Self, String> {
        let value = match data_type {
            PlyDataType::Float32 => parse_token(token).map(PlyScalar::Float32),
            PlyDataType::Float64 => parse_token(token).map(PlyScalar::Float64),
            PlyDataType::Int8 => parse_token(token).map(PlyScalar::Int8),
            PlyDataType::UInt8 => parse_token(token).map(PlyScalar::UInt8),
            PlyDataType::Int16 => parse_token(token).map(PlyScalar::Int16),
            PlyDataType::UInt16 => parse_token(token).map(PlyScalar::UInt16),
            PlyDataType::Int32 => parse_token(token).map(PlyScalar::Int32),
            PlyDataType::UInt32 => parse_token(token).map(PlyScalar::UInt32),
        };
        value.map_err(|e| format!("'{token}' as {data_type:?}: {e}"))
    }

    /// Decode a value of a binary body.
    ///
    /// PRECONDITION: `bytes` holds at least `data_type.size()` bytes.
    pub(crate) fn from_bytes(data_type: PlyDataType, bytes: &[u8], big_endian: bool) -> Self {
        match data_type {
            PlyDataType::Float32 => decode_binary!(Float32, f32, bytes, big_endian),
            PlyDataType::Float64 => decode_binary!(Float64, f64, bytes, big_endian),
            PlyDataType::Int8 => decode_binary!(Int8, i8, bytes, big_endian),
            PlyDataType::UInt8 => decode_binary!(UInt8, u8, bytes, big_endian),
            PlyDataType::Int16 => decode_binary!(Int16, i16, bytes, big_endian),
            PlyDataType::UInt16 => decode_binary!(UInt16, u16, bytes, big_endian),
            PlyDataType::Int32 => decode_binary!(Int32, i32, bytes, big_endian),
            PlyDataType::UInt32 => decode_binary!(UInt32, u32, bytes, big_endian),
        }
    }
}

/// The shape of a property.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum PlyPropertyKind {
    /// A single value.
    Scalar(PlyDataType),
    /// A length prefixed list of values.
    List {
        /// Type of the length prefix.
        count: PlyDataType,
        /// Type of the items.
        item: PlyDataType,
    },
}

/// A property declared in the header.
#[derive(Debug, PartialEq, Clone)]
pub struct PlyPropertyDefinition {
    /// Property name.
    pub name: String,
    /// Property shape and type.
    pub kind: PlyPropertyKind,
}

/// An element declared in the header.
#[derive(Debug, PartialEq, Clone)]
pub struct PlyElementDefinition {
    /// Element name, e.g. `vertex` or `face`.
    pub name: String,
    /// Number of records.
    pub count: usize,
    /// Properties of each record in storage order.
    pub properties: Vec<PlyPropertyDefinition>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_type_parsing() {
        assert_eq!(PlyDataType::parse("float").ok(), Some(PlyDataType::Float32));
        assert_eq!(PlyDataType::parse("uchar").ok(), Some(PlyDataType::UInt8));
        assert_eq!(PlyDataType::parse("uint8").ok(), Some(PlyDataType::UInt8));
        assert_eq!(
            PlyDataType::parse("double").ok(),
            Some(PlyDataType::Float64)
        );
        assert!(PlyDataType::parse("invalid").is_err());
    }

    #[test]
    fn test_from_bytes() {
        let le = 1.5f32.to_le_bytes();
        let be = 1.5f32.to_be_bytes();
        assert_eq!(
            PlyScalar::from_bytes(PlyDataType::Float32, &le, false),
            PlyScalar::Float32(1.5)
        );
        assert_eq!(
            PlyScalar::from_bytes(PlyDataType::Float32, &be, true),
            PlyScalar::Float32(1.5)
        );
        assert_eq!(
            PlyScalar::from_bytes(PlyDataType::Int16, &(-2i16).to_be_bytes(), true),
            PlyScalar::Int16(-2)
        );
    }

    #[test]
    fn test_parse_ascii_and_count() {
        assert_eq!(
            PlyScalar::parse(PlyDataType::UInt8, "200"),
            Ok(PlyScalar::UInt8(200))
        );
        assert!(PlyScalar::parse(PlyDataType::UInt8, "300").is_err());
        assert_eq!(PlyScalar::UInt8(3).as_count(), Some(3));
        assert_eq!(PlyScalar::Int32(-1).as_count(), None);
        assert_eq!(PlyScalar::Float32(3.0).as_count(), None);
        assert_eq!(PlyScalar::UInt8(255).as_f64(), 255.0);
    }
}
