//! Typed binary tile codec.
//!
//! A tile payload is the raw row-major element array, exactly
//! `tile_size^2 * element_size` bytes, no header and no compression. The
//! element type travels out-of-band as a [`DataType`] tag on the tile
//! record.

use bytes::Bytes;
use map_common::{DataType, TileElement, TilerError, TilerResult};

/// A rectangular block of pixels with an optional validity mask
/// (`true` = masked out).
#[derive(Debug, Clone, PartialEq)]
pub struct TileBlock<T> {
    pub values: Vec<T>,
    pub mask: Option<Vec<bool>>,
}

impl<T: TileElement> TileBlock<T> {
    /// A block without a mask.
    pub fn unmasked(values: Vec<T>) -> Self {
        Self { values, mask: None }
    }

    /// A block with an explicit validity mask.
    pub fn masked(values: Vec<T>, mask: Vec<bool>) -> Self {
        Self {
            values,
            mask: Some(mask),
        }
    }

    /// Whether the block holds at least one finite, unmasked value.
    pub fn has_valid_data(&self) -> bool {
        self.values.iter().enumerate().any(|(i, v)| {
            let masked = self.mask.as_ref().map_or(false, |m| m[i]);
            !masked && v.is_finite()
        })
    }
}

/// Encode a tile block to its binary payload and dtype tag.
///
/// An absent block (a grid cell with no backing data) encodes as
/// `(None, None)` rather than an all-sentinel payload. Masked positions
/// are written as the NaN sentinel of the element type.
pub fn encode<T: TileElement>(block: Option<&TileBlock<T>>) -> (Option<Bytes>, Option<DataType>) {
    let Some(block) = block else {
        return (None, None);
    };

    let payload = match &block.mask {
        Some(mask) => {
            let filled: Vec<T> = block
                .values
                .iter()
                .zip(mask)
                .map(|(&v, &masked)| if masked { T::sentinel() } else { v })
                .collect();
            Bytes::from(bytemuck::cast_slice(&filled).to_vec())
        }
        None => Bytes::from(bytemuck::cast_slice(&block.values).to_vec()),
    };

    (Some(payload), Some(T::DATA_TYPE))
}

/// Decode a tile payload back into a `tile_size x tile_size` array.
///
/// Fails with `DataCorruption` when the dtype tag disagrees with the
/// requested element type or the payload length is not exactly
/// `tile_size^2 * element_size`.
pub fn decode<T: TileElement>(
    payload: &[u8],
    data_type: DataType,
    tile_size: u32,
) -> TilerResult<Vec<T>> {
    if data_type != T::DATA_TYPE {
        return Err(TilerError::corruption(format!(
            "tile payload tagged {} but {} was requested",
            data_type,
            T::DATA_TYPE
        )));
    }

    let expected = tile_size as usize * tile_size as usize * data_type.element_size();
    if payload.len() != expected {
        return Err(TilerError::corruption(format!(
            "tile payload is {} bytes, expected {} for a {}px {} tile",
            payload.len(),
            expected,
            tile_size,
            data_type
        )));
    }

    Ok(bytemuck::pod_collect_to_vec(payload))
}

/// Encode a raw scalar array (histogram edges or counts) to bytes.
pub fn encode_raw<P: bytemuck::Pod>(values: &[P]) -> Bytes {
    Bytes::from(bytemuck::cast_slice(values).to_vec())
}

/// Decode a raw scalar array payload of a known element count.
pub fn decode_raw<P: bytemuck::Pod>(payload: &[u8], expected_len: usize) -> TilerResult<Vec<P>> {
    let expected_bytes = expected_len * std::mem::size_of::<P>();
    if payload.len() != expected_bytes {
        return Err(TilerError::corruption(format!(
            "payload is {} bytes, expected {} for {} elements",
            payload.len(),
            expected_bytes,
            expected_len
        )));
    }
    Ok(bytemuck::pod_collect_to_vec(payload))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_block_encodes_null() {
        let (payload, tag) = encode::<f32>(None);
        assert!(payload.is_none());
        assert!(tag.is_none());
    }

    #[test]
    fn test_roundtrip_unmasked() {
        let values: Vec<f32> = (0..4).map(|v| v as f32).collect();
        let block = TileBlock::unmasked(values.clone());
        let (payload, tag) = encode(Some(&block));

        let decoded: Vec<f32> = decode(&payload.unwrap(), tag.unwrap(), 2).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_masked_positions_become_sentinel() {
        let block = TileBlock::masked(vec![1.0f64, 2.0, 3.0, 4.0], vec![false, true, true, false]);
        let (payload, tag) = encode(Some(&block));

        let decoded: Vec<f64> = decode(&payload.unwrap(), tag.unwrap(), 2).unwrap();
        assert_eq!(decoded[0], 1.0);
        assert!(decoded[1].is_nan());
        assert!(decoded[2].is_nan());
        assert_eq!(decoded[3], 4.0);
    }

    #[test]
    fn test_decode_rejects_short_payload() {
        let payload = vec![0u8; 10];
        let err = decode::<f32>(&payload, DataType::Float32, 2).unwrap_err();
        assert!(matches!(err, TilerError::DataCorruption(_)));
    }

    #[test]
    fn test_decode_rejects_wrong_tag() {
        let block = TileBlock::unmasked(vec![0.0f32; 4]);
        let (payload, _) = encode(Some(&block));
        let err = decode::<f32>(&payload.unwrap(), DataType::Float64, 2).unwrap_err();
        assert!(matches!(err, TilerError::DataCorruption(_)));
    }

    #[test]
    fn test_has_valid_data() {
        assert!(!TileBlock::unmasked(vec![f32::NAN; 4]).has_valid_data());
        assert!(!TileBlock::masked(vec![1.0f32; 4], vec![true; 4]).has_valid_data());
        assert!(TileBlock::masked(vec![1.0f32; 4], vec![true, true, false, true]).has_valid_data());
    }

    #[test]
    fn test_raw_scalar_roundtrip() {
        let counts = vec![3i64, 0, 12, 7];
        let payload = encode_raw(&counts);
        let decoded: Vec<i64> = decode_raw(&payload, 4).unwrap();
        assert_eq!(decoded, counts);
        assert!(decode_raw::<i64>(&payload, 5).is_err());
    }
}
