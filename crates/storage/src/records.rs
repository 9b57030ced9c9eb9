//! Persisted record shapes.
//!
//! Plain data-transfer structs with explicit store operations; ownership
//! is by foreign-key reference with cascading delete performed by the
//! store, never by shared mutable state. A Map owns Bands; a Band owns
//! one Histogram and many Tiles.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use map_common::{BoundingBox, DataType, TilerError, TilerResult};

/// Identity record for one logical dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapRecord {
    /// Unique name, the primary key.
    pub name: String,
    pub description: String,
    pub telescope: Option<String>,
    pub data_release: Option<String>,
    pub season: Option<String>,
    pub tags: Option<String>,
    pub patch: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One scalar field/channel of a Map, owning its own pyramid.
///
/// Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandRecord {
    pub id: Uuid,
    pub map_name: String,
    /// Number of pyramid levels, `>= 1`.
    pub levels: u32,
    /// Tile edge length in pixels, a positive power of two.
    pub tile_size: u32,
    /// Physical unit of the pixel values, e.g. "uK".
    pub units: String,
    pub frequency: Option<String>,
    pub stokes_parameter: Option<String>,
    /// Physical-quantity classification derived from the unit, e.g. "T".
    pub quantity: Option<String>,
    pub recommended_cmap: String,
    pub recommended_cmap_min: f64,
    pub recommended_cmap_max: f64,
    /// World-coordinate bounds in degrees; null when the source raster
    /// carried no coordinate system.
    pub bounding_left: Option<f64>,
    pub bounding_right: Option<f64>,
    pub bounding_top: Option<f64>,
    pub bounding_bottom: Option<f64>,
    /// Whether the band's tiles have been materialized.
    pub tiles_available: bool,
}

impl BandRecord {
    /// The band's bounding box, when all four edges are present.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        match (
            self.bounding_left,
            self.bounding_bottom,
            self.bounding_right,
            self.bounding_top,
        ) {
            (Some(left), Some(bottom), Some(right), Some(top)) => {
                Some(BoundingBox::new(left, bottom, right, top))
            }
            _ => None,
        }
    }

    /// Check the band invariants before insertion.
    pub fn validate(&self) -> TilerResult<()> {
        if self.levels == 0 {
            return Err(TilerError::invalid_input("band must have at least one level"));
        }
        if self.tile_size == 0 || !self.tile_size.is_power_of_two() {
            return Err(TilerError::invalid_input(format!(
                "band tile size {} is not a positive power of two",
                self.tile_size
            )));
        }
        Ok(())
    }
}

/// Fixed-bin histogram of one Band's raw values, one-to-one with the Band.
#[derive(Debug, Clone)]
pub struct HistogramRecord {
    pub band_id: Uuid,
    pub start: f64,
    pub end: f64,
    pub bins: u32,
    /// `bins + 1` elements of `edges_data_type`.
    pub edges: Bytes,
    pub edges_data_type: DataType,
    /// `bins` elements of `counts_data_type`.
    pub counts: Bytes,
    pub counts_data_type: DataType,
}

impl HistogramRecord {
    /// Check the payload-length invariants before insertion.
    pub fn validate(&self) -> TilerResult<()> {
        let bins = self.bins as usize;
        let edges_expected = (bins + 1) * self.edges_data_type.element_size();
        if self.edges.len() != edges_expected {
            return Err(TilerError::corruption(format!(
                "histogram edges payload is {} bytes, expected {}",
                self.edges.len(),
                edges_expected
            )));
        }
        let counts_expected = bins * self.counts_data_type.element_size();
        if self.counts.len() != counts_expected {
            return Err(TilerError::corruption(format!(
                "histogram counts payload is {} bytes, expected {}",
                self.counts.len(),
                counts_expected
            )));
        }
        Ok(())
    }
}

/// One tile of one pyramid level, unique on `(band_id, level, x, y)`.
///
/// A null `data` payload means the tile is entirely missing data.
#[derive(Debug, Clone)]
pub struct TileRecord {
    pub band_id: Uuid,
    /// Level index, 0 = coarsest.
    pub level: u32,
    pub x: u32,
    pub y: u32,
    pub data: Option<Bytes>,
    pub data_type: Option<DataType>,
}

impl TileRecord {
    /// Check the payload-length invariant for a given tile size.
    pub fn validate(&self, tile_size: u32) -> TilerResult<()> {
        match (&self.data, self.data_type) {
            (None, None) => Ok(()),
            (Some(data), Some(data_type)) => {
                let expected =
                    tile_size as usize * tile_size as usize * data_type.element_size();
                if data.len() != expected {
                    return Err(TilerError::corruption(format!(
                        "tile ({}, {}, {}) payload is {} bytes, expected {}",
                        self.level,
                        self.x,
                        self.y,
                        data.len(),
                        expected
                    )));
                }
                Ok(())
            }
            _ => Err(TilerError::corruption(format!(
                "tile ({}, {}, {}) has a payload without a dtype tag or vice versa",
                self.level, self.x, self.y
            ))),
        }
    }
}

/// Validate a whole band insert: band invariants, histogram ownership and
/// payload shape, and every tile's key range and payload shape.
pub fn validate_band_insert(
    band: &BandRecord,
    histogram: &HistogramRecord,
    tiles: &[TileRecord],
) -> TilerResult<()> {
    band.validate()?;
    if histogram.band_id != band.id {
        return Err(TilerError::invalid_input(
            "histogram does not belong to the inserted band",
        ));
    }
    histogram.validate()?;
    for tile in tiles {
        if tile.band_id != band.id {
            return Err(TilerError::invalid_input(
                "tile does not belong to the inserted band",
            ));
        }
        if tile.level >= band.levels {
            return Err(TilerError::invalid_input(format!(
                "tile level {} out of range for a {}-level band",
                tile.level, band.levels
            )));
        }
        tile.validate(band.tile_size)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band() -> BandRecord {
        BandRecord {
            id: Uuid::new_v4(),
            map_name: "act_dr5".into(),
            levels: 2,
            tile_size: 64,
            units: "uK".into(),
            frequency: Some("90".into()),
            stokes_parameter: Some("I".into()),
            quantity: Some("T".into()),
            recommended_cmap: "RdBu_r".into(),
            recommended_cmap_min: -500.0,
            recommended_cmap_max: 500.0,
            bounding_left: Some(-180.0),
            bounding_right: Some(180.0),
            bounding_top: Some(90.0),
            bounding_bottom: Some(-90.0),
            tiles_available: true,
        }
    }

    #[test]
    fn test_band_validation() {
        assert!(band().validate().is_ok());

        let mut bad = band();
        bad.levels = 0;
        assert!(bad.validate().is_err());

        let mut bad = band();
        bad.tile_size = 48;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_band_bounding_box() {
        assert!(band().bounding_box().is_some());

        let mut unbounded = band();
        unbounded.bounding_left = None;
        assert!(unbounded.bounding_box().is_none());
    }

    #[test]
    fn test_histogram_payload_invariants() {
        let band_id = Uuid::new_v4();
        let good = HistogramRecord {
            band_id,
            start: -2000.0,
            end: 2000.0,
            bins: 4,
            edges: Bytes::from(vec![0u8; 5 * 8]),
            edges_data_type: DataType::Float64,
            counts: Bytes::from(vec![0u8; 4 * 8]),
            counts_data_type: DataType::Int64,
        };
        assert!(good.validate().is_ok());

        let mut bad = good.clone();
        bad.edges = Bytes::from(vec![0u8; 4 * 8]);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_tile_payload_invariants() {
        let null_tile = TileRecord {
            band_id: Uuid::new_v4(),
            level: 0,
            x: 0,
            y: 0,
            data: None,
            data_type: None,
        };
        assert!(null_tile.validate(64).is_ok());

        let short = TileRecord {
            data: Some(Bytes::from(vec![0u8; 16])),
            data_type: Some(DataType::Float32),
            ..null_tile.clone()
        };
        assert!(short.validate(64).is_err());

        let tagless = TileRecord {
            data: Some(Bytes::from(vec![0u8; 64 * 64 * 4])),
            data_type: None,
            ..null_tile
        };
        assert!(tagless.validate(64).is_err());
    }
}
