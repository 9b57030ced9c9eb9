//! Reassembly of one pyramid level into a contiguous array.

use bytes::Bytes;
use map_common::{DataType, TileElement, TilerError, TilerResult};
use tracing::debug;

use crate::codec;
use crate::layout::PyramidLayout;

/// One stored tile as returned by the tile store. A `None` payload means
/// the tile holds no data.
#[derive(Debug, Clone)]
pub struct TilePayload {
    pub x: u32,
    pub y: u32,
    pub payload: Option<Bytes>,
    pub data_type: Option<DataType>,
}

/// A level reassembled into one row-major array.
#[derive(Debug, Clone)]
pub struct ReconstructedLevel<T> {
    pub data: Vec<T>,
    pub width: usize,
    pub height: usize,
}

impl<T: TileElement> ReconstructedLevel<T> {
    /// Value at (col, row), or None outside the canvas.
    pub fn get(&self, col: usize, row: usize) -> Option<T> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }
}

/// Reassemble one level from its stored tiles.
///
/// The output canvas is `grid_width * tile_size` by
/// `grid_height * tile_size`, initialized to the NaN sentinel. Each tile
/// with a payload is decoded and scatter-written into its grid-aligned
/// window; null-payload tiles and tiles absent from `tiles` leave the
/// sentinel in place. No interpolation or blending happens.
pub fn reconstruct_level<T: TileElement>(
    layout: &PyramidLayout,
    depth: u32,
    tiles: impl IntoIterator<Item = TilePayload>,
) -> TilerResult<ReconstructedLevel<T>> {
    if depth >= layout.levels() {
        return Err(TilerError::invalid_input(format!(
            "depth {} out of range for a {}-level pyramid",
            depth,
            layout.levels()
        )));
    }

    let tile_size = layout.tile_size() as usize;
    let (nx, ny) = layout.grid_dims(depth);
    let (width, height) = layout.canvas_dims(depth);
    let mut data = vec![T::sentinel(); width * height];

    let mut written = 0usize;
    for tile in tiles {
        if tile.x >= nx || tile.y >= ny {
            return Err(TilerError::corruption(format!(
                "tile ({}, {}) outside the {}x{} grid at depth {}",
                tile.x, tile.y, nx, ny, depth
            )));
        }

        let (Some(payload), Some(data_type)) = (&tile.payload, tile.data_type) else {
            continue;
        };

        let pixels: Vec<T> = codec::decode(payload, data_type, layout.tile_size())?;
        let x0 = tile.x as usize * tile_size;
        let y0 = tile.y as usize * tile_size;
        for row in 0..tile_size {
            let dst = (y0 + row) * width + x0;
            data[dst..dst + tile_size].copy_from_slice(&pixels[row * tile_size..(row + 1) * tile_size]);
        }
        written += 1;
    }

    debug!(depth, written, width, height, "reconstructed pyramid level");

    Ok(ReconstructedLevel {
        data,
        width,
        height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode, TileBlock};
    use crate::layout::GridShape;

    fn layout_2_levels() -> PyramidLayout {
        PyramidLayout::for_raster(4, 16, 8, GridShape::FullSky).unwrap()
    }

    #[test]
    fn test_empty_level_is_all_sentinel() {
        let layout = layout_2_levels();
        let level: ReconstructedLevel<f32> = reconstruct_level(&layout, 0, []).unwrap();
        assert_eq!((level.width, level.height), (8, 4));
        assert!(level.data.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_scatter_write_and_gaps() {
        let layout = layout_2_levels();
        let block = TileBlock::unmasked(vec![7.0f32; 16]);
        let (payload, data_type) = encode(Some(&block));

        let tiles = vec![
            TilePayload {
                x: 1,
                y: 0,
                payload,
                data_type,
            },
            // Null-payload tile, leaves sentinel in place.
            TilePayload {
                x: 0,
                y: 0,
                payload: None,
                data_type: None,
            },
        ];

        let level: ReconstructedLevel<f32> = reconstruct_level(&layout, 0, tiles).unwrap();
        assert_eq!(level.get(4, 0), Some(7.0));
        assert_eq!(level.get(7, 3), Some(7.0));
        assert!(level.get(0, 0).unwrap().is_nan());
        assert!(level.get(3, 3).unwrap().is_nan());
    }

    #[test]
    fn test_rejects_out_of_grid_tile() {
        let layout = layout_2_levels();
        let tiles = vec![TilePayload {
            x: 2,
            y: 0,
            payload: None,
            data_type: None,
        }];
        let err = reconstruct_level::<f32>(&layout, 0, tiles).unwrap_err();
        assert!(matches!(err, TilerError::DataCorruption(_)));
    }

    #[test]
    fn test_rejects_depth_out_of_range() {
        let layout = layout_2_levels();
        let err = reconstruct_level::<f32>(&layout, 5, []).unwrap_err();
        assert!(matches!(err, TilerError::InvalidInput(_)));
    }
}
