//! The TileStore trait: the storage operations the pyramid engine and
//! the ingester depend on.

use async_trait::async_trait;
use uuid::Uuid;

use map_common::TilerResult;

use crate::records::{BandRecord, HistogramRecord, MapRecord, TileRecord};

/// Persistence operations for maps, bands, histograms and tiles.
///
/// `insert_band` must be atomic: either the band, its histogram and every
/// tile become visible together, or none do. The reconstructor relies on
/// this — if any tile for a (band, level) exists, the full intended grid
/// for that level was written.
///
/// Storage failures surface as [`map_common::TilerError::Storage`] and
/// are retried by the caller, never internally; re-running a band build
/// deletes then recreates, so retries are idempotent under the
/// `(band, level, x, y)` unique key.
#[async_trait]
pub trait TileStore: Send + Sync {
    /// Insert or update a map identity record.
    async fn upsert_map(&self, map: &MapRecord) -> TilerResult<()>;

    /// Look up a map by its unique name.
    async fn get_map(&self, name: &str) -> TilerResult<Option<MapRecord>>;

    /// Atomically insert a band with its histogram and all of its tiles.
    async fn insert_band(
        &self,
        band: &BandRecord,
        histogram: &HistogramRecord,
        tiles: &[TileRecord],
    ) -> TilerResult<()>;

    /// Look up a band by id.
    async fn get_band(&self, id: Uuid) -> TilerResult<Option<BandRecord>>;

    /// All bands belonging to a map.
    async fn list_bands(&self, map_name: &str) -> TilerResult<Vec<BandRecord>>;

    /// The histogram of a band.
    async fn get_histogram(&self, band_id: Uuid) -> TilerResult<Option<HistogramRecord>>;

    /// All tiles of one pyramid level of a band.
    async fn query_tiles(&self, band_id: Uuid, level: u32) -> TilerResult<Vec<TileRecord>>;

    /// Point lookup of a single tile by its unique key.
    async fn get_tile(
        &self,
        band_id: Uuid,
        level: u32,
        x: u32,
        y: u32,
    ) -> TilerResult<Option<TileRecord>>;

    /// Delete a band with its histogram and tiles.
    async fn delete_band(&self, id: Uuid) -> TilerResult<()>;

    /// Delete a map and, cascading, all of its bands, histograms and
    /// tiles.
    async fn delete_map(&self, name: &str) -> TilerResult<()>;
}
