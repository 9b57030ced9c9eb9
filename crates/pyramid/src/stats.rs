//! Summary statistics for a source raster: fixed-bin histogram and
//! world-coordinate bounding box.

use map_common::{BoundingBox, Raster, TileElement, TilerError, TilerResult};

/// Compute a fixed-bin histogram over all finite, unmasked raster values.
///
/// Returns `bins + 1` uniformly spaced, strictly increasing edges between
/// `min` and `max`, and `bins` counts. Binning is half-open
/// `[edges[i], edges[i+1])` with the final bin closed; out-of-range values
/// clamp into the first/last bin, so the counts always sum to the number
/// of valid samples.
pub fn histogram<T: TileElement>(
    raster: &Raster<T>,
    bins: usize,
    min: f64,
    max: f64,
) -> TilerResult<(Vec<f64>, Vec<i64>)> {
    if bins == 0 {
        return Err(TilerError::invalid_input("histogram needs at least one bin"));
    }
    if !(min < max) {
        return Err(TilerError::invalid_input(format!(
            "histogram range [{}, {}] is empty",
            min, max
        )));
    }

    let bin_width = (max - min) / bins as f64;
    let edges: Vec<f64> = (0..=bins).map(|i| min + i as f64 * bin_width).collect();

    let mut counts = vec![0i64; bins];
    for value in raster.valid_values() {
        let v = value.to_f64().unwrap_or(f64::NAN);
        if v.is_nan() {
            continue;
        }
        let bin = ((v - min) / bin_width).floor();
        let bin = (bin.max(0.0) as usize).min(bins - 1);
        counts[bin] += 1;
    }

    Ok((edges, counts))
}

/// World-coordinate bounding box of the raster, in degrees.
///
/// Fails with `MissingMetadata` when the raster carries no coordinate
/// system; the caller decides whether that is fatal.
pub fn bounding_box<T: TileElement>(raster: &Raster<T>) -> TilerResult<BoundingBox> {
    raster
        .bounds()
        .copied()
        .ok_or_else(|| TilerError::missing_metadata("raster has no world coordinate system"))
}
