//! PostgreSQL tile store.

use async_trait::async_trait;
use bytes::Bytes;
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use map_common::{DataType, TilerError, TilerResult};

use crate::records::{
    validate_band_insert, BandRecord, HistogramRecord, MapRecord, TileRecord,
};
use crate::store::TileStore;

/// Tile store backed by a PostgreSQL connection pool.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect using a database URL.
    pub async fn connect(database_url: &str) -> TilerResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| TilerError::storage(format!("connection failed: {}", e)))?;

        Ok(Self { pool })
    }

    /// Create the schema if it does not exist.
    pub async fn migrate(&self) -> TilerResult<()> {
        // Split SQL statements and execute them individually
        for statement in SCHEMA_SQL.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed)
                    .execute(&self.pool)
                    .await
                    .map_err(|e| TilerError::storage(format!("migration failed: {}", e)))?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TileStore for PostgresStore {
    async fn upsert_map(&self, map: &MapRecord) -> TilerResult<()> {
        sqlx::query(
            r#"
            INSERT INTO maps (name, description, telescope, data_release, season, tags, patch, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (name)
            DO UPDATE SET
                description = EXCLUDED.description,
                telescope = EXCLUDED.telescope,
                data_release = EXCLUDED.data_release,
                season = EXCLUDED.season,
                tags = EXCLUDED.tags,
                patch = EXCLUDED.patch
            "#,
        )
        .bind(&map.name)
        .bind(&map.description)
        .bind(&map.telescope)
        .bind(&map.data_release)
        .bind(&map.season)
        .bind(&map.tags)
        .bind(&map.patch)
        .bind(map.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| TilerError::storage(format!("map upsert failed: {}", e)))?;

        Ok(())
    }

    async fn get_map(&self, name: &str) -> TilerResult<Option<MapRecord>> {
        let row = sqlx::query_as::<_, MapRow>(
            "SELECT name, description, telescope, data_release, season, tags, patch, created_at \
             FROM maps WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TilerError::storage(format!("map query failed: {}", e)))?;

        Ok(row.map(|r| r.into()))
    }

    async fn insert_band(
        &self,
        band: &BandRecord,
        histogram: &HistogramRecord,
        tiles: &[TileRecord],
    ) -> TilerResult<()> {
        validate_band_insert(band, histogram, tiles)?;

        // One transaction: the band, histogram and full tile grid become
        // visible together or not at all.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TilerError::storage(format!("transaction begin failed: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO bands (
                id, map_name, levels, tile_size, units, frequency, stokes_parameter, quantity,
                recommended_cmap, recommended_cmap_min, recommended_cmap_max,
                bounding_left, bounding_right, bounding_top, bounding_bottom, tiles_available
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(band.id)
        .bind(&band.map_name)
        .bind(band.levels as i32)
        .bind(band.tile_size as i32)
        .bind(&band.units)
        .bind(&band.frequency)
        .bind(&band.stokes_parameter)
        .bind(&band.quantity)
        .bind(&band.recommended_cmap)
        .bind(band.recommended_cmap_min)
        .bind(band.recommended_cmap_max)
        .bind(band.bounding_left)
        .bind(band.bounding_right)
        .bind(band.bounding_top)
        .bind(band.bounding_bottom)
        .bind(band.tiles_available)
        .execute(&mut *tx)
        .await
        .map_err(|e| TilerError::storage(format!("band insert failed: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO histograms (
                band_id, start_value, end_value, bins,
                edges, edges_data_type, counts, counts_data_type
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(histogram.band_id)
        .bind(histogram.start)
        .bind(histogram.end)
        .bind(histogram.bins as i32)
        .bind(histogram.edges.as_ref())
        .bind(histogram.edges_data_type.as_str())
        .bind(histogram.counts.as_ref())
        .bind(histogram.counts_data_type.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| TilerError::storage(format!("histogram insert failed: {}", e)))?;

        for tile in tiles {
            sqlx::query(
                "INSERT INTO tiles (band_id, level, x, y, data, data_type) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(tile.band_id)
            .bind(tile.level as i32)
            .bind(tile.x as i32)
            .bind(tile.y as i32)
            .bind(tile.data.as_ref().map(|d| d.as_ref()))
            .bind(tile.data_type.map(|dt| dt.as_str()))
            .execute(&mut *tx)
            .await
            .map_err(|e| TilerError::storage(format!("tile insert failed: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| TilerError::storage(format!("transaction commit failed: {}", e)))?;

        info!(
            band = %band.id,
            map = %band.map_name,
            tiles = tiles.len(),
            "committed band"
        );

        Ok(())
    }

    async fn get_band(&self, id: Uuid) -> TilerResult<Option<BandRecord>> {
        let row = sqlx::query_as::<_, BandRow>(&format!(
            "SELECT {} FROM bands WHERE id = $1",
            BAND_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TilerError::storage(format!("band query failed: {}", e)))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_bands(&self, map_name: &str) -> TilerResult<Vec<BandRecord>> {
        let rows = sqlx::query_as::<_, BandRow>(&format!(
            "SELECT {} FROM bands WHERE map_name = $1 ORDER BY stokes_parameter, frequency",
            BAND_COLUMNS
        ))
        .bind(map_name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TilerError::storage(format!("band query failed: {}", e)))?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn get_histogram(&self, band_id: Uuid) -> TilerResult<Option<HistogramRecord>> {
        let row = sqlx::query_as::<_, HistogramRow>(
            "SELECT band_id, start_value, end_value, bins, \
             edges, edges_data_type, counts, counts_data_type \
             FROM histograms WHERE band_id = $1",
        )
        .bind(band_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TilerError::storage(format!("histogram query failed: {}", e)))?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn query_tiles(&self, band_id: Uuid, level: u32) -> TilerResult<Vec<TileRecord>> {
        let rows = sqlx::query_as::<_, TileRow>(
            "SELECT band_id, level, x, y, data, data_type \
             FROM tiles WHERE band_id = $1 AND level = $2 ORDER BY x, y",
        )
        .bind(band_id)
        .bind(level as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| TilerError::storage(format!("tile query failed: {}", e)))?;

        rows.into_iter().map(|r| r.try_into()).collect()
    }

    async fn get_tile(
        &self,
        band_id: Uuid,
        level: u32,
        x: u32,
        y: u32,
    ) -> TilerResult<Option<TileRecord>> {
        let row = sqlx::query_as::<_, TileRow>(
            "SELECT band_id, level, x, y, data, data_type \
             FROM tiles WHERE band_id = $1 AND level = $2 AND x = $3 AND y = $4",
        )
        .bind(band_id)
        .bind(level as i32)
        .bind(x as i32)
        .bind(y as i32)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TilerError::storage(format!("tile query failed: {}", e)))?;

        row.map(|r| r.try_into()).transpose()
    }

    async fn delete_band(&self, id: Uuid) -> TilerResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TilerError::storage(format!("transaction begin failed: {}", e)))?;

        // Explicit multi-step cascade, children first.
        sqlx::query("DELETE FROM tiles WHERE band_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| TilerError::storage(format!("tile delete failed: {}", e)))?;
        sqlx::query("DELETE FROM histograms WHERE band_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| TilerError::storage(format!("histogram delete failed: {}", e)))?;
        sqlx::query("DELETE FROM bands WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| TilerError::storage(format!("band delete failed: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| TilerError::storage(format!("transaction commit failed: {}", e)))
    }

    async fn delete_map(&self, name: &str) -> TilerResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| TilerError::storage(format!("transaction begin failed: {}", e)))?;

        sqlx::query(
            "DELETE FROM tiles WHERE band_id IN (SELECT id FROM bands WHERE map_name = $1)",
        )
        .bind(name)
        .execute(&mut *tx)
        .await
        .map_err(|e| TilerError::storage(format!("tile delete failed: {}", e)))?;
        sqlx::query(
            "DELETE FROM histograms WHERE band_id IN (SELECT id FROM bands WHERE map_name = $1)",
        )
        .bind(name)
        .execute(&mut *tx)
        .await
        .map_err(|e| TilerError::storage(format!("histogram delete failed: {}", e)))?;
        sqlx::query("DELETE FROM bands WHERE map_name = $1")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(|e| TilerError::storage(format!("band delete failed: {}", e)))?;
        sqlx::query("DELETE FROM maps WHERE name = $1")
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(|e| TilerError::storage(format!("map delete failed: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| TilerError::storage(format!("transaction commit failed: {}", e)))?;

        info!(map = %name, "deleted map and all owned records");
        Ok(())
    }
}

const BAND_COLUMNS: &str = "id, map_name, levels, tile_size, units, frequency, stokes_parameter, \
     quantity, recommended_cmap, recommended_cmap_min, recommended_cmap_max, \
     bounding_left, bounding_right, bounding_top, bounding_bottom, tiles_available";

/// Internal row types for database queries.
#[derive(FromRow)]
struct MapRow {
    name: String,
    description: String,
    telescope: Option<String>,
    data_release: Option<String>,
    season: Option<String>,
    tags: Option<String>,
    patch: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<MapRow> for MapRecord {
    fn from(row: MapRow) -> Self {
        MapRecord {
            name: row.name,
            description: row.description,
            telescope: row.telescope,
            data_release: row.data_release,
            season: row.season,
            tags: row.tags,
            patch: row.patch,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct BandRow {
    id: Uuid,
    map_name: String,
    levels: i32,
    tile_size: i32,
    units: String,
    frequency: Option<String>,
    stokes_parameter: Option<String>,
    quantity: Option<String>,
    recommended_cmap: String,
    recommended_cmap_min: f64,
    recommended_cmap_max: f64,
    bounding_left: Option<f64>,
    bounding_right: Option<f64>,
    bounding_top: Option<f64>,
    bounding_bottom: Option<f64>,
    tiles_available: bool,
}

impl From<BandRow> for BandRecord {
    fn from(row: BandRow) -> Self {
        BandRecord {
            id: row.id,
            map_name: row.map_name,
            levels: row.levels as u32,
            tile_size: row.tile_size as u32,
            units: row.units,
            frequency: row.frequency,
            stokes_parameter: row.stokes_parameter,
            quantity: row.quantity,
            recommended_cmap: row.recommended_cmap,
            recommended_cmap_min: row.recommended_cmap_min,
            recommended_cmap_max: row.recommended_cmap_max,
            bounding_left: row.bounding_left,
            bounding_right: row.bounding_right,
            bounding_top: row.bounding_top,
            bounding_bottom: row.bounding_bottom,
            tiles_available: row.tiles_available,
        }
    }
}

#[derive(FromRow)]
struct HistogramRow {
    band_id: Uuid,
    start_value: f64,
    end_value: f64,
    bins: i32,
    edges: Vec<u8>,
    edges_data_type: String,
    counts: Vec<u8>,
    counts_data_type: String,
}

impl TryFrom<HistogramRow> for HistogramRecord {
    type Error = TilerError;

    fn try_from(row: HistogramRow) -> TilerResult<Self> {
        Ok(HistogramRecord {
            band_id: row.band_id,
            start: row.start_value,
            end: row.end_value,
            bins: row.bins as u32,
            edges: Bytes::from(row.edges),
            edges_data_type: parse_dtype(&row.edges_data_type)?,
            counts: Bytes::from(row.counts),
            counts_data_type: parse_dtype(&row.counts_data_type)?,
        })
    }
}

#[derive(FromRow)]
struct TileRow {
    band_id: Uuid,
    level: i32,
    x: i32,
    y: i32,
    data: Option<Vec<u8>>,
    data_type: Option<String>,
}

impl TryFrom<TileRow> for TileRecord {
    type Error = TilerError;

    fn try_from(row: TileRow) -> TilerResult<Self> {
        Ok(TileRecord {
            band_id: row.band_id,
            level: row.level as u32,
            x: row.x as u32,
            y: row.y as u32,
            data: row.data.map(Bytes::from),
            data_type: row.data_type.as_deref().map(parse_dtype).transpose()?,
        })
    }
}

fn parse_dtype(tag: &str) -> TilerResult<DataType> {
    DataType::parse(tag)
        .ok_or_else(|| TilerError::corruption(format!("unknown dtype tag '{}'", tag)))
}

/// Database schema SQL.
///
/// Cascading deletes are performed explicitly by the store inside one
/// transaction, not by the schema.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS maps (
    name VARCHAR(200) PRIMARY KEY,
    description TEXT NOT NULL,
    telescope VARCHAR(100),
    data_release VARCHAR(100),
    season VARCHAR(100),
    tags TEXT,
    patch VARCHAR(100),
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE TABLE IF NOT EXISTS bands (
    id UUID PRIMARY KEY,
    map_name VARCHAR(200) NOT NULL REFERENCES maps(name),
    levels INTEGER NOT NULL,
    tile_size INTEGER NOT NULL,
    units VARCHAR(50) NOT NULL,
    frequency VARCHAR(50),
    stokes_parameter VARCHAR(10),
    quantity VARCHAR(10),
    recommended_cmap VARCHAR(50) NOT NULL,
    recommended_cmap_min DOUBLE PRECISION NOT NULL,
    recommended_cmap_max DOUBLE PRECISION NOT NULL,
    bounding_left DOUBLE PRECISION,
    bounding_right DOUBLE PRECISION,
    bounding_top DOUBLE PRECISION,
    bounding_bottom DOUBLE PRECISION,
    tiles_available BOOLEAN NOT NULL DEFAULT FALSE
);

CREATE INDEX IF NOT EXISTS idx_bands_map ON bands(map_name);

CREATE TABLE IF NOT EXISTS histograms (
    band_id UUID PRIMARY KEY REFERENCES bands(id),
    start_value DOUBLE PRECISION NOT NULL,
    end_value DOUBLE PRECISION NOT NULL,
    bins INTEGER NOT NULL,
    edges BYTEA NOT NULL,
    edges_data_type VARCHAR(20) NOT NULL,
    counts BYTEA NOT NULL,
    counts_data_type VARCHAR(20) NOT NULL
);

CREATE TABLE IF NOT EXISTS tiles (
    band_id UUID NOT NULL REFERENCES bands(id),
    level INTEGER NOT NULL,
    x INTEGER NOT NULL,
    y INTEGER NOT NULL,
    data BYTEA,
    data_type VARCHAR(20),

    PRIMARY KEY (band_id, level, x, y)
);

CREATE INDEX IF NOT EXISTS idx_tiles_band_level ON tiles(band_id, level);
"#;
