//! Synthetic raster generators with verifiable values.

use map_common::{BoundingBox, Raster};

/// A raster whose value at (col, row) is `col * 1000 + row`, so reads can
/// be verified positionally.
pub fn indexed_raster(width: usize, height: usize) -> Raster<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    Raster::new(data, width, height).unwrap()
}

/// A raster with a smooth CMB-like temperature gradient in microkelvin,
/// ranging roughly over [-500, 500].
pub fn temperature_raster(width: usize, height: usize) -> Raster<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let x = col as f32 / width.max(1) as f32;
            let y = row as f32 / height.max(1) as f32;
            data.push(-500.0 + (x + y) * 500.0);
        }
    }
    Raster::new(data, width, height)
        .unwrap()
        .with_bounds(BoundingBox::new(-180.0, -90.0, 180.0, 90.0))
}

/// A constant raster with a rectangular masked region.
///
/// The mask covers columns `[mask_x0, mask_x1)` and rows `[mask_y0,
/// mask_y1)`.
pub fn masked_raster(
    width: usize,
    height: usize,
    value: f32,
    mask_x0: usize,
    mask_x1: usize,
    mask_y0: usize,
    mask_y1: usize,
) -> Raster<f32> {
    let data = vec![value; width * height];
    let mask = (0..width * height)
        .map(|i| {
            let col = i % width;
            let row = i / width;
            col >= mask_x0 && col < mask_x1 && row >= mask_y0 && row < mask_y1
        })
        .collect();
    Raster::new(data, width, height)
        .unwrap()
        .with_mask(mask)
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indexed_raster_values() {
        let raster = indexed_raster(10, 5);
        assert_eq!(raster.get(0, 0), Some(0.0));
        assert_eq!(raster.get(1, 0), Some(1000.0));
        assert_eq!(raster.get(0, 1), Some(1.0));
    }

    #[test]
    fn test_masked_raster_region() {
        let raster = masked_raster(8, 8, 1.0, 4, 8, 0, 4);
        let mask = raster.mask().unwrap();
        assert!(!mask[0]); // (0, 0)
        assert!(mask[4]); // (4, 0)
        assert!(!mask[7 * 8 + 7]); // (7, 7)
    }

    #[test]
    fn test_temperature_raster_has_bounds() {
        let raster = temperature_raster(16, 8);
        assert!(raster.bounds().is_some());
    }
}
