//! Numeric element types for binary tile and histogram payloads.
//!
//! Payloads are raw row-major element arrays with no header; the element
//! type is carried out-of-band as a [`DataType`] tag on the owning record,
//! using canonical numpy-style names so readers in any language can
//! reinterpret the bytes.

use serde::{Deserialize, Serialize};

/// Canonical element type tag for a binary payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// 32-bit IEEE float ("float32").
    Float32,
    /// 64-bit IEEE float ("float64").
    Float64,
    /// 64-bit signed integer ("int64"), used for histogram counts.
    Int64,
}

impl DataType {
    /// Parse from the canonical tag name. Unknown tags are an error at
    /// the call site, not a silent default: a wrong tag means the payload
    /// cannot be safely reinterpreted.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "float32" => Some(Self::Float32),
            "float64" => Some(Self::Float64),
            "int64" => Some(Self::Int64),
            _ => None,
        }
    }

    /// Get the tag name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Int64 => "int64",
        }
    }

    /// Size of one element in bytes.
    pub fn element_size(&self) -> usize {
        match self {
            Self::Float32 => 4,
            Self::Float64 => 8,
            Self::Int64 => 8,
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Floating-point element type usable as tile pixel storage.
///
/// The sentinel ("no data") value is the type's NaN; masked or absent
/// positions are written as the sentinel in every payload and
/// reconstructed array.
pub trait TileElement:
    bytemuck::Pod + num_traits::Float + Send + Sync + std::fmt::Debug + 'static
{
    /// The tag recorded alongside payloads of this element type.
    const DATA_TYPE: DataType;

    /// The "no data" marker for this element type.
    fn sentinel() -> Self {
        Self::nan()
    }
}

impl TileElement for f32 {
    const DATA_TYPE: DataType = DataType::Float32;
}

impl TileElement for f64 {
    const DATA_TYPE: DataType = DataType::Float64;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for dt in [DataType::Float32, DataType::Float64, DataType::Int64] {
            assert_eq!(DataType::parse(dt.as_str()), Some(dt));
        }
        assert_eq!(DataType::parse("uint8"), None);
    }

    #[test]
    fn test_element_sizes() {
        assert_eq!(DataType::Float32.element_size(), 4);
        assert_eq!(DataType::Float64.element_size(), 8);
        assert_eq!(DataType::Int64.element_size(), 8);
    }

    #[test]
    fn test_sentinel_is_nan() {
        assert!(<f32 as TileElement>::sentinel().is_nan());
        assert!(<f64 as TileElement>::sentinel().is_nan());
        assert_eq!(<f32 as TileElement>::DATA_TYPE, DataType::Float32);
    }
}
