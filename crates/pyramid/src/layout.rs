//! Pyramid level and grid geometry.

use map_common::{TilerError, TilerResult};
use serde::{Deserialize, Serialize};

/// Per-level grid shape policy.
///
/// The shape formula is a projection assumption, so it is kept pluggable
/// rather than hardcoded into the builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridShape {
    /// `2^(depth+1) x 2^depth` tiles: 2:1 aspect, full-sky
    /// equirectangular layout.
    #[default]
    FullSky,
    /// `2^depth x 2^depth` tiles: generic square quad-tree.
    Square,
}

impl GridShape {
    /// Grid dimensions in tiles at a depth, as (columns, rows).
    pub fn grid_dims(&self, depth: u32) -> (u32, u32) {
        match self {
            GridShape::FullSky => (1 << (depth + 1), 1 << depth),
            GridShape::Square => (1 << depth, 1 << depth),
        }
    }
}

/// Geometry of one band's tile pyramid: tile edge length, level count
/// and grid shape.
///
/// Depth 0 is the coarsest level; depth `levels - 1` holds the raster at
/// full resolution, anchored at the top-left of its canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PyramidLayout {
    tile_size: u32,
    levels: u32,
    shape: GridShape,
}

impl PyramidLayout {
    /// Compute the layout for a raster of the given pixel dimensions.
    ///
    /// The level count is the smallest `L >= 1` whose finest-level canvas
    /// covers the raster; for rasters within the 2:1 full-sky aspect this
    /// is the smallest `L` with `max(width, height) <= tile_size * 2^L`.
    ///
    /// Fails with `InvalidInput` when `tile_size` is not a positive power
    /// of two or the raster has zero area.
    pub fn for_raster(
        tile_size: u32,
        width: usize,
        height: usize,
        shape: GridShape,
    ) -> TilerResult<Self> {
        if tile_size == 0 || !tile_size.is_power_of_two() {
            return Err(TilerError::invalid_input(format!(
                "tile size {} is not a positive power of two",
                tile_size
            )));
        }
        if width == 0 || height == 0 {
            return Err(TilerError::invalid_input(format!(
                "raster has zero area: {}x{}",
                width, height
            )));
        }

        let mut levels = 1u32;
        loop {
            let (canvas_w, canvas_h) = Self::canvas_dims_for(tile_size, levels - 1, shape);
            if canvas_w >= width && canvas_h >= height {
                break;
            }
            levels += 1;
        }

        Ok(Self {
            tile_size,
            levels,
            shape,
        })
    }

    /// Reconstitute a layout from stored band metadata.
    pub fn from_band(tile_size: u32, levels: u32, shape: GridShape) -> TilerResult<Self> {
        if tile_size == 0 || !tile_size.is_power_of_two() {
            return Err(TilerError::invalid_input(format!(
                "tile size {} is not a positive power of two",
                tile_size
            )));
        }
        if levels == 0 {
            return Err(TilerError::invalid_input("band has zero levels"));
        }
        Ok(Self {
            tile_size,
            levels,
            shape,
        })
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn levels(&self) -> u32 {
        self.levels
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Grid dimensions in tiles at a depth, as (columns, rows).
    pub fn grid_dims(&self, depth: u32) -> (u32, u32) {
        self.shape.grid_dims(depth)
    }

    /// Canvas dimensions in pixels at a depth, as (width, height).
    pub fn canvas_dims(&self, depth: u32) -> (usize, usize) {
        Self::canvas_dims_for(self.tile_size, depth, self.shape)
    }

    /// Source downsampling factor at a depth: 1 at the finest depth,
    /// doubling toward depth 0.
    pub fn scale(&self, depth: u32) -> usize {
        1 << (self.levels - 1 - depth)
    }

    fn canvas_dims_for(tile_size: u32, depth: u32, shape: GridShape) -> (usize, usize) {
        let (nx, ny) = shape.grid_dims(depth);
        (
            nx as usize * tile_size as usize,
            ny as usize * tile_size as usize,
        )
    }
}
