//! Map tiler command-line service.
//!
//! Builds tile pyramids for sky-map rasters, inspects stored maps and
//! reconstructs pyramid levels back into raw arrays.

mod config;

use std::fs;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use uuid::Uuid;

use ingestion::{ArraySource, Ingester, MapDescription, SourcePlane};
use map_common::{keys, BoundingBox, PlaneHeader, Raster};
use storage::{PostgresStore, TileStore};

use config::TilerConfig;

#[derive(Parser, Debug)]
#[command(name = "tiler")]
#[command(about = "Tile pyramid builder for astronomical sky maps")]
struct Args {
    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ingest a raw float32 raster as one band of a map
    Create {
        /// Map name (created if it does not exist)
        #[arg(long)]
        map: String,

        /// Human-readable map description
        #[arg(long, default_value = "")]
        description: String,

        /// Path to the raw native-endian float32 raster, row-major
        #[arg(long)]
        input: String,

        /// Raster width in pixels
        #[arg(long)]
        width: usize,

        /// Raster height in pixels
        #[arg(long)]
        height: usize,

        /// Plane identifier, e.g. the Stokes parameter
        #[arg(long, default_value = "I")]
        plane: String,

        /// World bounds as "min_lon,min_lat,max_lon,max_lat" in degrees
        #[arg(long)]
        bounds: Option<String>,

        /// Pixel unit header card
        #[arg(long, default_value = "uK")]
        unit: String,

        /// Frequency header card, e.g. "f090"
        #[arg(long)]
        frequency: Option<String>,

        /// Telescope header card
        #[arg(long)]
        telescope: Option<String>,
    },

    /// Show a map with its bands
    Info {
        #[arg(long)]
        map: String,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Reassemble one pyramid level into a raw float32 file
    Reconstruct {
        /// Band id
        #[arg(long)]
        band: Uuid,

        /// Level index, 0 = coarsest
        #[arg(long)]
        level: u32,

        /// Output path for the raw native-endian float32 array
        #[arg(long)]
        output: String,
    },

    /// Delete a map (with all bands) or a single band
    Delete {
        #[arg(long, conflicts_with = "band")]
        map: Option<String>,

        #[arg(long)]
        band: Option<Uuid>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = TilerConfig::from_env()?;
    let store = PostgresStore::connect(&config.database_url).await?;
    store.migrate().await?;
    let store: Arc<dyn TileStore> = Arc::new(store);

    match args.command {
        Command::Create {
            map,
            description,
            input,
            width,
            height,
            plane,
            bounds,
            unit,
            frequency,
            telescope,
        } => {
            let raw = fs::read(&input)?;
            let data: Vec<f32> = pyramid::decode_raw(&raw, width * height)?;
            let mut raster = Raster::new(data, width, height)?;
            if let Some(spec) = &bounds {
                raster = raster.with_bounds(parse_bounds(spec)?);
            }

            let mut header = PlaneHeader::new().with(keys::UNIT, &unit);
            if let Some(frequency) = &frequency {
                header = header.with(keys::FREQUENCY, frequency);
            }
            if let Some(telescope) = &telescope {
                header = header.with(keys::TELESCOPE, telescope);
            }

            let ingester = Ingester::with_options(store, config.ingest);
            let source = ArraySource::new(vec![SourcePlane::new(plane, raster, header)]);
            let reports = ingester
                .ingest_source(
                    &MapDescription {
                        name: map.clone(),
                        description,
                    },
                    &source,
                )
                .await?;

            for report in reports {
                info!(
                    map = %map,
                    band_id = %report.band_id,
                    levels = report.levels,
                    tiles = report.tile_count,
                    "band created"
                );
                println!("{}", report.band_id);
            }
        }

        Command::Info { map, json } => {
            let record = store
                .get_map(&map)
                .await?
                .ok_or_else(|| anyhow!("map '{}' does not exist", map))?;
            let bands = store.list_bands(&map).await?;

            if json {
                let doc = serde_json::json!({
                    "map": record,
                    "bands": bands,
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                println!("{}: {}", record.name, record.description);
                if let Some(telescope) = &record.telescope {
                    println!("  telescope: {}", telescope);
                }
                for band in bands {
                    println!(
                        "  band {} stokes={} freq={} levels={} tile_size={} [{}]",
                        band.id,
                        band.stokes_parameter.as_deref().unwrap_or("-"),
                        band.frequency.as_deref().unwrap_or("-"),
                        band.levels,
                        band.tile_size,
                        band.units,
                    );
                }
            }
        }

        Command::Reconstruct {
            band,
            level,
            output,
        } => {
            let ingester = Ingester::with_options(store, config.ingest);
            let plane = ingester.reconstruct_level(band, level).await?;
            fs::write(&output, pyramid::encode_raw(&plane.data))?;
            info!(
                band_id = %band,
                level,
                width = plane.width,
                height = plane.height,
                path = %output,
                "level written"
            );
        }

        Command::Delete { map, band } => match (map, band) {
            (Some(map), None) => {
                store.delete_map(&map).await?;
                info!(map = %map, "map deleted");
            }
            (None, Some(band)) => {
                store.delete_band(band).await?;
                info!(band_id = %band, "band deleted");
            }
            _ => return Err(anyhow!("pass exactly one of --map or --band")),
        },
    }

    Ok(())
}

/// Parse "min_lon,min_lat,max_lon,max_lat".
fn parse_bounds(spec: &str) -> Result<BoundingBox> {
    let parts: Vec<f64> = spec
        .split(',')
        .map(|p| p.trim().parse())
        .collect::<Result<_, _>>()?;
    if parts.len() != 4 {
        return Err(anyhow!(
            "bounds must be min_lon,min_lat,max_lon,max_lat, got '{}'",
            spec
        ));
    }
    Ok(BoundingBox::new(parts[0], parts[1], parts[2], parts[3]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_bounds() {
        let bbox = parse_bounds("-180, -90, 180, 90").unwrap();
        assert_eq!(bbox.bottom_left(), (-180.0, -90.0));
        assert_eq!(bbox.top_right(), (180.0, 90.0));

        assert!(parse_bounds("1,2,3").is_err());
        assert!(parse_bounds("a,b,c,d").is_err());
    }

    #[test]
    fn test_raw_raster_file_loads() {
        let values: Vec<f32> = (0..8).map(|v| v as f32).collect();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(pyramid::encode_raw(&values).as_ref())
            .unwrap();

        let raw = fs::read(file.path()).unwrap();
        let data: Vec<f32> = pyramid::decode_raw(&raw, 8).unwrap();
        let raster = Raster::new(data, 4, 2).unwrap();
        assert_eq!(raster.get(3, 1), Some(7.0));

        // A truncated file is corruption, not a short raster.
        assert!(pyramid::decode_raw::<f32>(&raw, 9).is_err());
    }
}
