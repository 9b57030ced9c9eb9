//! The ingestion pipeline: raster plane in, committed band out.

use std::sync::Arc;

use chrono::Utc;
use rayon::prelude::*;
use tracing::{info, warn};
use uuid::Uuid;

use map_common::{TilerError, TilerResult};
use pyramid::{
    codec, reconstruct_level, GridShape, PyramidBuilder, PyramidLayout, ReconstructedLevel,
    TilePayload,
};
use storage::{BandRecord, HistogramRecord, MapRecord, TileRecord, TileStore};

use crate::config::{quantity_for_unit, IngestOptions};
use crate::source::{RasterSource, SourcePlane};

/// User-facing identity of the map being ingested.
#[derive(Debug, Clone)]
pub struct MapDescription {
    pub name: String,
    pub description: String,
}

/// Outcome of ingesting one plane.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub band_id: Uuid,
    pub stokes_parameter: Option<String>,
    pub levels: u32,
    pub tile_count: usize,
    pub null_tile_count: usize,
    /// Whether an older build of the same band was deleted first.
    pub replaced_existing: bool,
}

/// Drives ingestion end to end: statistics, pyramid construction, tile
/// encoding and the atomic store commit.
///
/// Re-ingesting a plane replaces its band wholesale (delete then insert)
/// rather than updating in place, so a retried run always converges to
/// the same stored state.
pub struct Ingester {
    store: Arc<dyn TileStore>,
    options: IngestOptions,
}

impl Ingester {
    pub fn new(store: Arc<dyn TileStore>) -> Self {
        Self {
            store,
            options: IngestOptions::default(),
        }
    }

    pub fn with_options(store: Arc<dyn TileStore>, options: IngestOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Ingest every plane of a source under one map.
    ///
    /// The map record is created (or refreshed) from the first plane's
    /// header before any band is written.
    pub async fn ingest_source(
        &self,
        map: &MapDescription,
        source: &dyn RasterSource,
    ) -> TilerResult<Vec<IngestReport>> {
        let planes = source.planes()?;
        if planes.is_empty() {
            return Err(TilerError::invalid_input(format!(
                "source for map '{}' has no planes",
                map.name
            )));
        }

        let header = &planes[0].header;
        let record = MapRecord {
            name: map.name.clone(),
            description: map.description.clone(),
            telescope: header.telescope().map(String::from),
            data_release: header.data_release().map(String::from),
            season: header.season().map(String::from),
            tags: header.tags().map(String::from),
            patch: header.patch().map(String::from),
            created_at: Utc::now(),
        };
        self.store.upsert_map(&record).await?;

        let mut reports = Vec::with_capacity(planes.len());
        for plane in &planes {
            reports.push(self.ingest_plane(&map.name, plane).await?);
        }
        Ok(reports)
    }

    /// Ingest a single plane as one band of an existing map.
    pub async fn ingest_plane(
        &self,
        map_name: &str,
        plane: &SourcePlane,
    ) -> TilerResult<IngestReport> {
        // The grid shape is not a band column; reconstruction of stored
        // bands always assumes the full-sky grid, so nothing else may be
        // committed.
        if self.options.grid_shape != GridShape::FullSky {
            return Err(TilerError::invalid_input(
                "only full-sky pyramids can be stored; square grids are build-time only",
            ));
        }

        let raster = &plane.raster;
        let builder =
            PyramidBuilder::for_raster(raster, self.options.tile_size, self.options.grid_shape)?
                .with_method(self.options.downsample);
        let layout = *builder.layout();

        info!(
            map_name,
            plane = %plane.identifier,
            width = raster.width(),
            height = raster.height(),
            levels = layout.levels(),
            "ingesting plane"
        );

        let (edges, counts) = pyramid::histogram(
            raster,
            self.options.histogram_bins,
            self.options.histogram_min,
            self.options.histogram_max,
        )?;

        // A missing coordinate system degrades the band, it does not
        // fail the ingest.
        let bounds = match pyramid::bounding_box(raster) {
            Ok(bbox) => Some(bbox),
            Err(TilerError::MissingMetadata(reason)) => {
                warn!(map_name, plane = %plane.identifier, %reason, "band stored without bounds");
                None
            }
            Err(e) => return Err(e),
        };

        let band_id = Uuid::new_v4();
        let units = plane.header.unit().unwrap_or_default().to_string();
        let band = BandRecord {
            id: band_id,
            map_name: map_name.to_string(),
            levels: layout.levels(),
            tile_size: layout.tile_size(),
            quantity: quantity_for_unit(&units).map(String::from),
            units,
            frequency: plane.header.frequency().map(normalize_frequency),
            stokes_parameter: Some(plane.identifier.clone()),
            recommended_cmap: self.options.cmap.clone(),
            recommended_cmap_min: self.options.cmap_min,
            recommended_cmap_max: self.options.cmap_max,
            bounding_left: bounds.map(|b| b.min_lon),
            bounding_right: bounds.map(|b| b.max_lon),
            bounding_top: bounds.map(|b| b.max_lat),
            bounding_bottom: bounds.map(|b| b.min_lat),
            tiles_available: true,
        };

        let histogram = HistogramRecord {
            band_id,
            start: self.options.histogram_min,
            end: self.options.histogram_max,
            bins: self.options.histogram_bins as u32,
            edges: codec::encode_raw(&edges),
            edges_data_type: map_common::DataType::Float64,
            counts: codec::encode_raw(&counts),
            counts_data_type: map_common::DataType::Int64,
        };

        let tiles: Vec<TileRecord> = builder
            .build(raster)?
            .into_par_iter()
            .map(|unit| {
                let (data, data_type) = codec::encode(unit.block.as_ref());
                TileRecord {
                    band_id,
                    level: unit.level,
                    x: unit.x,
                    y: unit.y,
                    data,
                    data_type,
                }
            })
            .collect();
        let tile_count = tiles.len();
        let null_tile_count = tiles.iter().filter(|t| t.data.is_none()).count();

        let replaced_existing = self
            .delete_matching_band(map_name, &band.stokes_parameter, &band.frequency)
            .await?;
        self.store.insert_band(&band, &histogram, &tiles).await?;

        info!(
            map_name,
            band_id = %band_id,
            tile_count,
            null_tile_count,
            replaced_existing,
            "band committed"
        );

        Ok(IngestReport {
            band_id,
            stokes_parameter: band.stokes_parameter,
            levels: band.levels,
            tile_count,
            null_tile_count,
            replaced_existing,
        })
    }

    /// Reassemble one stored pyramid level of a band.
    pub async fn reconstruct_level(
        &self,
        band_id: Uuid,
        depth: u32,
    ) -> TilerResult<ReconstructedLevel<f32>> {
        let band = self
            .store
            .get_band(band_id)
            .await?
            .ok_or_else(|| TilerError::invalid_input(format!("band {} does not exist", band_id)))?;

        let layout = PyramidLayout::from_band(band.tile_size, band.levels, GridShape::FullSky)?;
        let tiles = self.store.query_tiles(band_id, depth).await?;
        let payloads = tiles.into_iter().map(|t| TilePayload {
            x: t.x,
            y: t.y,
            payload: t.data,
            data_type: t.data_type,
        });

        reconstruct_level(&layout, depth, payloads)
    }

    /// Delete the previous build of a band with the same channel identity,
    /// if there is one. Returns whether anything was deleted.
    async fn delete_matching_band(
        &self,
        map_name: &str,
        stokes: &Option<String>,
        frequency: &Option<String>,
    ) -> TilerResult<bool> {
        let existing = self.store.list_bands(map_name).await?;
        let mut deleted = false;
        for band in existing {
            if &band.stokes_parameter == stokes && &band.frequency == frequency {
                self.store.delete_band(band.id).await?;
                deleted = true;
            }
        }
        Ok(deleted)
    }
}

/// Header frequency cards carry an "f" prefix ("f090", "f150"); the
/// stored frequency is the bare channel name.
fn normalize_frequency(raw: &str) -> String {
    raw.strip_prefix('f').unwrap_or(raw).to_string()
}
