//! Quad-tree pyramid construction.

use map_common::{Raster, TileElement, TilerError, TilerResult};
use rayon::prelude::*;
use tracing::debug;

use crate::codec::TileBlock;
use crate::downsample::{downsample_plane, DownsampleMethod};
use crate::layout::{GridShape, PyramidLayout};

/// One grid cell of one pyramid level. `block` is `None` when the cell's
/// source region holds no valid data at all.
#[derive(Debug, Clone)]
pub struct TileUnit<T> {
    pub level: u32,
    pub x: u32,
    pub y: u32,
    pub block: Option<TileBlock<T>>,
}

/// Builds the full tile grid for every pyramid level of one raster.
#[derive(Debug, Clone)]
pub struct PyramidBuilder {
    layout: PyramidLayout,
    method: DownsampleMethod,
}

impl PyramidBuilder {
    /// Build tiles for an already-computed layout.
    pub fn new(layout: PyramidLayout) -> Self {
        Self {
            layout,
            method: DownsampleMethod::default(),
        }
    }

    /// Compute the layout for a raster and wrap it in a builder.
    pub fn for_raster<T: TileElement>(
        raster: &Raster<T>,
        tile_size: u32,
        shape: GridShape,
    ) -> TilerResult<Self> {
        let layout = PyramidLayout::for_raster(tile_size, raster.width(), raster.height(), shape)?;
        Ok(Self::new(layout))
    }

    /// Override the downsampling method (mean by default).
    pub fn with_method(mut self, method: DownsampleMethod) -> Self {
        self.method = method;
        self
    }

    pub fn layout(&self) -> &PyramidLayout {
        &self.layout
    }

    /// Produce every tile of every level, ordered by (level asc, x asc,
    /// y asc). The raster anchors at the top-left of the finest-level
    /// canvas; cells beyond its footprint come back with a `None` block.
    ///
    /// Each level is derived from the full-resolution raster in a single
    /// downsampling pass, and tiles within a level are extracted in
    /// parallel.
    pub fn build<T: TileElement>(&self, raster: &Raster<T>) -> TilerResult<Vec<TileUnit<T>>> {
        let tile_size = self.layout.tile_size() as usize;
        let (canvas_w, canvas_h) = self.layout.canvas_dims(self.layout.levels() - 1);
        if raster.width() > canvas_w || raster.height() > canvas_h {
            return Err(TilerError::invalid_input(format!(
                "raster {}x{} exceeds the finest-level canvas {}x{}",
                raster.width(),
                raster.height(),
                canvas_w,
                canvas_h
            )));
        }

        let mut tiles = Vec::new();
        for depth in 0..self.layout.levels() {
            let factor = self.layout.scale(depth);
            let (plane, plane_w, plane_h) = downsample_plane(
                raster.data(),
                raster.mask(),
                raster.width(),
                raster.height(),
                factor,
                self.method,
            );

            let (nx, ny) = self.layout.grid_dims(depth);
            debug!(depth, nx, ny, factor, "building pyramid level");

            let coords: Vec<(u32, u32)> =
                (0..nx).flat_map(|x| (0..ny).map(move |y| (x, y))).collect();

            let mut level_tiles: Vec<TileUnit<T>> = coords
                .into_par_iter()
                .map(|(x, y)| TileUnit {
                    level: depth,
                    x,
                    y,
                    block: extract_tile(&plane, plane_w, plane_h, tile_size, x, y),
                })
                .collect();

            tiles.append(&mut level_tiles);
        }

        Ok(tiles)
    }
}

/// Cut one `tile_size x tile_size` block out of a level plane, sentinel
/// padded where the plane ends. Returns `None` when the block contains no
/// finite value.
fn extract_tile<T: TileElement>(
    plane: &[T],
    plane_w: usize,
    plane_h: usize,
    tile_size: usize,
    x: u32,
    y: u32,
) -> Option<TileBlock<T>> {
    let x0 = x as usize * tile_size;
    let y0 = y as usize * tile_size;
    if x0 >= plane_w || y0 >= plane_h {
        return None;
    }

    let copy_w = (plane_w - x0).min(tile_size);
    let copy_h = (plane_h - y0).min(tile_size);

    let mut values = vec![T::sentinel(); tile_size * tile_size];
    for row in 0..copy_h {
        let src = (y0 + row) * plane_w + x0;
        values[row * tile_size..row * tile_size + copy_w]
            .copy_from_slice(&plane[src..src + copy_w]);
    }

    let block = TileBlock::unmasked(values);
    block.has_valid_data().then_some(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use map_common::Raster;

    fn gradient_raster(width: usize, height: usize) -> Raster<f32> {
        let data = (0..width * height).map(|i| i as f32).collect();
        Raster::new(data, width, height).unwrap()
    }

    #[test]
    fn test_full_sky_tile_grid_and_order() {
        let raster = gradient_raster(256, 128);
        let builder = PyramidBuilder::for_raster(&raster, 64, GridShape::FullSky).unwrap();
        let tiles = builder.build(&raster).unwrap();

        // Level 0: 2x1 tiles, level 1: 4x2 tiles.
        assert_eq!(tiles.len(), 2 + 8);
        let keys: Vec<(u32, u32, u32)> = tiles.iter().map(|t| (t.level, t.x, t.y)).collect();
        assert_eq!(keys[0], (0, 0, 0));
        assert_eq!(keys[1], (0, 1, 0));
        assert_eq!(keys[2], (1, 0, 0));
        assert_eq!(keys[3], (1, 0, 1));
        assert_eq!(keys[9], (1, 3, 1));

        // All cells are covered for an exactly full-sky raster.
        assert!(tiles.iter().all(|t| t.block.is_some()));
    }

    #[test]
    fn test_finest_level_preserves_values() {
        let raster = gradient_raster(256, 128);
        let builder = PyramidBuilder::for_raster(&raster, 64, GridShape::FullSky).unwrap();
        let tiles = builder.build(&raster).unwrap();

        let tile = tiles
            .iter()
            .find(|t| t.level == 1 && t.x == 1 && t.y == 1)
            .unwrap();
        let block = tile.block.as_ref().unwrap();
        // Top-left pixel of tile (1,1) is raster (col 64, row 64).
        assert_eq!(block.values[0], (64 * 256 + 64) as f32);
    }

    #[test]
    fn test_coarse_level_is_block_mean() {
        let raster = gradient_raster(256, 128);
        let builder = PyramidBuilder::for_raster(&raster, 64, GridShape::FullSky).unwrap();
        let tiles = builder.build(&raster).unwrap();

        let tile = tiles
            .iter()
            .find(|t| t.level == 0 && t.x == 0 && t.y == 0)
            .unwrap();
        let block = tile.block.as_ref().unwrap();
        // Level 0 pixel (0,0) is the mean of raster pixels 0, 1, 256, 257.
        let expected = (0.0 + 1.0 + 256.0 + 257.0) / 4.0;
        assert!((block.values[0] - expected).abs() < 1e-3);
    }

    #[test]
    fn test_cells_outside_footprint_are_null() {
        // 60x60 raster on a 128x64 canvas: the right tile has no data.
        let raster = gradient_raster(60, 60);
        let builder = PyramidBuilder::for_raster(&raster, 64, GridShape::FullSky).unwrap();
        assert_eq!(builder.layout().levels(), 1);

        let tiles = builder.build(&raster).unwrap();
        assert_eq!(tiles.len(), 2);
        assert!(tiles[0].block.is_some());
        assert!(tiles[1].block.is_none());

        // The covered tile is sentinel-padded past column/row 59.
        let block = tiles[0].block.as_ref().unwrap();
        assert!(block.values[60].is_nan());
        assert_eq!(block.values[0], 0.0);
    }

    #[test]
    fn test_fully_masked_tile_is_null() {
        // Mask out the entire right half of a 128x64 raster.
        let width = 128;
        let height = 64;
        let data = vec![1.0f32; width * height];
        let mask: Vec<bool> = (0..width * height).map(|i| i % width >= 64).collect();
        let raster = Raster::new(data, width, height)
            .unwrap()
            .with_mask(mask)
            .unwrap();

        let builder = PyramidBuilder::for_raster(&raster, 64, GridShape::FullSky).unwrap();
        let tiles = builder.build(&raster).unwrap();

        let left = tiles.iter().find(|t| (t.x, t.y) == (0, 0)).unwrap();
        let right = tiles.iter().find(|t| (t.x, t.y) == (1, 0)).unwrap();
        assert!(left.block.is_some());
        assert!(right.block.is_none());
    }

    #[test]
    fn test_oversized_raster_is_rejected() {
        let raster = gradient_raster(300, 60);
        let layout = PyramidLayout::for_raster(64, 100, 60, GridShape::FullSky).unwrap();
        let err = PyramidBuilder::new(layout).build(&raster).unwrap_err();
        assert!(matches!(err, TilerError::InvalidInput(_)));
    }
}
