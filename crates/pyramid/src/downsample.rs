//! Downsampling of source planes for coarser pyramid levels.
//!
//! Every level is produced directly from the full-resolution plane in a
//! single pass, rather than from the previous level, so interpolation
//! error never compounds across depths.

use map_common::TileElement;
use serde::{Deserialize, Serialize};

/// Method used to reduce each `factor x factor` block to one value.
///
/// Mean suits continuous sky maps (temperature, polarization amplitude);
/// Max preserves point sources; Nearest keeps exact values for masks and
/// categorical planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DownsampleMethod {
    /// Average of valid values in the block.
    #[default]
    Mean,
    /// Maximum of valid values in the block.
    Max,
    /// Top-left value of the block.
    Nearest,
}

/// Downsample a masked plane by an integer factor.
///
/// Masked and non-finite positions are excluded from the reduction; a
/// block with no valid contributor yields the NaN sentinel. `factor == 1`
/// returns a copy with masked positions resolved to the sentinel.
///
/// Output dimensions are `ceil(width / factor) x ceil(height / factor)`,
/// so partial edge blocks reduce over the samples that exist.
pub fn downsample_plane<T: TileElement>(
    data: &[T],
    mask: Option<&[bool]>,
    width: usize,
    height: usize,
    factor: usize,
    method: DownsampleMethod,
) -> (Vec<T>, usize, usize) {
    debug_assert!(factor >= 1);
    debug_assert_eq!(data.len(), width * height);

    let new_width = width.div_ceil(factor);
    let new_height = height.div_ceil(factor);
    let mut output = vec![T::sentinel(); new_width * new_height];

    for out_y in 0..new_height {
        for out_x in 0..new_width {
            let x0 = out_x * factor;
            let y0 = out_y * factor;
            let x1 = (x0 + factor).min(width);
            let y1 = (y0 + factor).min(height);

            output[out_y * new_width + out_x] = match method {
                DownsampleMethod::Mean => mean_of_block(data, mask, width, x0, x1, y0, y1),
                DownsampleMethod::Max => max_of_block(data, mask, width, x0, x1, y0, y1),
                DownsampleMethod::Nearest => {
                    let idx = y0 * width + x0;
                    let masked = mask.map_or(false, |m| m[idx]);
                    if masked || !data[idx].is_finite() {
                        T::sentinel()
                    } else {
                        data[idx]
                    }
                }
            };
        }
    }

    (output, new_width, new_height)
}

fn valid_block_values<'a, T: TileElement>(
    data: &'a [T],
    mask: Option<&'a [bool]>,
    width: usize,
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
) -> impl Iterator<Item = T> + 'a {
    (y0..y1).flat_map(move |y| {
        (x0..x1).filter_map(move |x| {
            let idx = y * width + x;
            if mask.map_or(false, |m| m[idx]) {
                return None;
            }
            let v = data[idx];
            v.is_finite().then_some(v)
        })
    })
}

/// Mean of valid values in a block; sentinel when none are valid.
fn mean_of_block<T: TileElement>(
    data: &[T],
    mask: Option<&[bool]>,
    width: usize,
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
) -> T {
    let mut sum = T::zero();
    let mut count = 0usize;
    for v in valid_block_values(data, mask, width, x0, x1, y0, y1) {
        sum = sum + v;
        count += 1;
    }
    if count == 0 {
        T::sentinel()
    } else {
        sum / T::from(count).unwrap_or_else(T::one)
    }
}

/// Maximum of valid values in a block; sentinel when none are valid.
fn max_of_block<T: TileElement>(
    data: &[T],
    mask: Option<&[bool]>,
    width: usize,
    x0: usize,
    x1: usize,
    y0: usize,
    y1: usize,
) -> T {
    let mut max: Option<T> = None;
    for v in valid_block_values(data, mask, width, x0, x1, y0, y1) {
        max = Some(match max {
            Some(m) if m >= v => m,
            _ => v,
        });
    }
    max.unwrap_or_else(T::sentinel)
}
