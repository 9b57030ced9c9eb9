//! In-memory tile store for tests and demos.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use map_common::{TilerError, TilerResult};

use crate::records::{
    validate_band_insert, BandRecord, HistogramRecord, MapRecord, TileRecord,
};
use crate::store::TileStore;

#[derive(Default)]
struct State {
    maps: HashMap<String, MapRecord>,
    bands: HashMap<Uuid, BandRecord>,
    histograms: HashMap<Uuid, HistogramRecord>,
    tiles: HashMap<(Uuid, u32, u32, u32), TileRecord>,
}

/// Tile store keeping everything in process memory.
///
/// Atomicity of `insert_band` holds trivially: the whole insert happens
/// under one write lock after validation, so readers never observe a
/// partial band.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TileStore for MemoryStore {
    async fn upsert_map(&self, map: &MapRecord) -> TilerResult<()> {
        let mut state = self.state.write().await;
        state.maps.insert(map.name.clone(), map.clone());
        Ok(())
    }

    async fn get_map(&self, name: &str) -> TilerResult<Option<MapRecord>> {
        let state = self.state.read().await;
        Ok(state.maps.get(name).cloned())
    }

    async fn insert_band(
        &self,
        band: &BandRecord,
        histogram: &HistogramRecord,
        tiles: &[TileRecord],
    ) -> TilerResult<()> {
        validate_band_insert(band, histogram, tiles)?;

        let mut state = self.state.write().await;
        if !state.maps.contains_key(&band.map_name) {
            return Err(TilerError::storage(format!(
                "map '{}' does not exist",
                band.map_name
            )));
        }
        if state.bands.contains_key(&band.id) {
            return Err(TilerError::storage(format!(
                "band {} already exists",
                band.id
            )));
        }

        state.bands.insert(band.id, band.clone());
        state.histograms.insert(band.id, histogram.clone());
        for tile in tiles {
            state
                .tiles
                .insert((tile.band_id, tile.level, tile.x, tile.y), tile.clone());
        }
        Ok(())
    }

    async fn get_band(&self, id: Uuid) -> TilerResult<Option<BandRecord>> {
        let state = self.state.read().await;
        Ok(state.bands.get(&id).cloned())
    }

    async fn list_bands(&self, map_name: &str) -> TilerResult<Vec<BandRecord>> {
        let state = self.state.read().await;
        let mut bands: Vec<BandRecord> = state
            .bands
            .values()
            .filter(|b| b.map_name == map_name)
            .cloned()
            .collect();
        bands.sort_by(|a, b| {
            (&a.stokes_parameter, &a.frequency).cmp(&(&b.stokes_parameter, &b.frequency))
        });
        Ok(bands)
    }

    async fn get_histogram(&self, band_id: Uuid) -> TilerResult<Option<HistogramRecord>> {
        let state = self.state.read().await;
        Ok(state.histograms.get(&band_id).cloned())
    }

    async fn query_tiles(&self, band_id: Uuid, level: u32) -> TilerResult<Vec<TileRecord>> {
        let state = self.state.read().await;
        let mut tiles: Vec<TileRecord> = state
            .tiles
            .values()
            .filter(|t| t.band_id == band_id && t.level == level)
            .cloned()
            .collect();
        tiles.sort_by_key(|t| (t.x, t.y));
        Ok(tiles)
    }

    async fn get_tile(
        &self,
        band_id: Uuid,
        level: u32,
        x: u32,
        y: u32,
    ) -> TilerResult<Option<TileRecord>> {
        let state = self.state.read().await;
        Ok(state.tiles.get(&(band_id, level, x, y)).cloned())
    }

    async fn delete_band(&self, id: Uuid) -> TilerResult<()> {
        let mut state = self.state.write().await;
        state.bands.remove(&id);
        state.histograms.remove(&id);
        state.tiles.retain(|key, _| key.0 != id);
        Ok(())
    }

    async fn delete_map(&self, name: &str) -> TilerResult<()> {
        let mut state = self.state.write().await;
        state.maps.remove(name);
        let band_ids: Vec<Uuid> = state
            .bands
            .values()
            .filter(|b| b.map_name == name)
            .map(|b| b.id)
            .collect();
        for id in &band_ids {
            state.bands.remove(id);
            state.histograms.remove(id);
        }
        state.tiles.retain(|key, _| !band_ids.contains(&key.0));
        Ok(())
    }
}
