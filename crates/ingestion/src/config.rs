//! Ingestion parameters and display defaults.

use pyramid::{DownsampleMethod, GridShape};
use serde::{Deserialize, Serialize};

/// Tunable parameters for one ingestion run.
///
/// The defaults match the published ACT map releases: 256px tiles,
/// full-sky grid, mean downsampling, and a 128-bin histogram over
/// +/- 2000 uK with an RdBu_r colour map pinned to +/- 500 uK.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestOptions {
    pub tile_size: u32,
    /// Pyramid grid shape. Only [`GridShape::FullSky`] can be stored;
    /// the ingester rejects anything else.
    pub grid_shape: GridShape,
    pub downsample: DownsampleMethod,
    pub histogram_bins: usize,
    pub histogram_min: f64,
    pub histogram_max: f64,
    pub cmap: String,
    pub cmap_min: f64,
    pub cmap_max: f64,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            tile_size: 256,
            grid_shape: GridShape::FullSky,
            downsample: DownsampleMethod::Mean,
            histogram_bins: 128,
            histogram_min: -2000.0,
            histogram_max: 2000.0,
            cmap: "RdBu_r".to_string(),
            cmap_min: -500.0,
            cmap_max: 500.0,
        }
    }
}

impl IngestOptions {
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_downsample(mut self, method: DownsampleMethod) -> Self {
        self.downsample = method;
        self
    }
}

/// Physical quantity label for a pixel unit, e.g. "uK" measures
/// temperature.
pub fn quantity_for_unit(unit: &str) -> Option<&'static str> {
    match unit {
        "uK" | "mK" | "K" => Some("T"),
        _ => None,
    }
}
