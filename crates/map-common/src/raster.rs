//! Source raster: a 2D array with an optional per-element validity mask
//! and optional world-coordinate bounds.

use crate::bbox::BoundingBox;
use crate::dtype::TileElement;
use crate::error::{TilerError, TilerResult};

/// One loaded 2D image plane.
///
/// `mask`, when present, follows the masked-array convention: `true`
/// marks an invalid element. Non-finite values are treated as invalid
/// whether or not a mask is present.
#[derive(Debug, Clone)]
pub struct Raster<T> {
    data: Vec<T>,
    mask: Option<Vec<bool>>,
    width: usize,
    height: usize,
    bounds: Option<BoundingBox>,
}

impl<T: TileElement> Raster<T> {
    /// Create a raster from row-major data.
    ///
    /// Fails with `InvalidInput` when the raster has zero area or the
    /// buffer length does not match the dimensions.
    pub fn new(data: Vec<T>, width: usize, height: usize) -> TilerResult<Self> {
        if width == 0 || height == 0 {
            return Err(TilerError::invalid_input(format!(
                "raster has zero area: {}x{}",
                width, height
            )));
        }
        if data.len() != width * height {
            return Err(TilerError::invalid_input(format!(
                "raster buffer length {} does not match {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            data,
            mask: None,
            width,
            height,
            bounds: None,
        })
    }

    /// Attach a validity mask (`true` = invalid). Length must match.
    pub fn with_mask(mut self, mask: Vec<bool>) -> TilerResult<Self> {
        if mask.len() != self.data.len() {
            return Err(TilerError::invalid_input(format!(
                "mask length {} does not match raster length {}",
                mask.len(),
                self.data.len()
            )));
        }
        self.mask = Some(mask);
        Ok(self)
    }

    /// Attach world-coordinate bounds in degrees.
    pub fn with_bounds(mut self, bounds: BoundingBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn mask(&self) -> Option<&[bool]> {
        self.mask.as_deref()
    }

    pub fn bounds(&self) -> Option<&BoundingBox> {
        self.bounds.as_ref()
    }

    /// Value at (col, row), or None outside the raster.
    pub fn get(&self, col: usize, row: usize) -> Option<T> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    /// Whether the element at a flat index is finite and unmasked.
    pub fn is_valid(&self, index: usize) -> bool {
        let masked = self.mask.as_ref().map_or(false, |m| m[index]);
        !masked && self.data[index].is_finite()
    }

    /// Iterate over all finite, unmasked values.
    pub fn valid_values(&self) -> impl Iterator<Item = T> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(i, _)| self.is_valid(*i))
            .map(|(_, v)| *v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_empty_raster() {
        assert!(Raster::<f32>::new(vec![], 0, 4).is_err());
        assert!(Raster::<f32>::new(vec![], 4, 0).is_err());
    }

    #[test]
    fn test_rejects_length_mismatch() {
        assert!(Raster::new(vec![1.0f32; 5], 2, 3).is_err());
        assert!(Raster::new(vec![1.0f32; 6], 2, 3).is_ok());
    }

    #[test]
    fn test_mask_and_finite_filtering() {
        let data = vec![1.0f32, f32::NAN, 3.0, 4.0];
        let raster = Raster::new(data, 2, 2)
            .unwrap()
            .with_mask(vec![false, false, true, false])
            .unwrap();

        let valid: Vec<f32> = raster.valid_values().collect();
        assert_eq!(valid, vec![1.0, 4.0]);
    }

    #[test]
    fn test_get() {
        let raster = Raster::new((0..6).map(|v| v as f64).collect(), 3, 2).unwrap();
        assert_eq!(raster.get(0, 0), Some(0.0));
        assert_eq!(raster.get(2, 1), Some(5.0));
        assert_eq!(raster.get(3, 0), None);
    }
}
