//! End-to-end ingestion tests against the in-memory store.

use std::sync::Arc;

use ingestion::{ArraySource, IngestOptions, Ingester, MapDescription, SourcePlane};
use map_common::{keys, PlaneHeader, TilerError};
use storage::{MemoryStore, TileStore};
use test_utils::generators::{masked_raster, temperature_raster};

fn act_header() -> PlaneHeader {
    PlaneHeader::new()
        .with(keys::TELESCOPE, "ACT")
        .with(keys::DATA_RELEASE, "DR5")
        .with(keys::FREQUENCY, "f090")
        .with(keys::UNIT, "uK")
}

fn map_description(name: &str) -> MapDescription {
    MapDescription {
        name: name.to_string(),
        description: "ACT DR5 coadd".to_string(),
    }
}

fn ingester(store: Arc<MemoryStore>) -> Ingester {
    Ingester::with_options(store, IngestOptions::default().with_tile_size(64))
}

#[tokio::test]
async fn test_full_sky_plane_roundtrip() {
    let store = Arc::new(MemoryStore::new());
    let ingester = ingester(store.clone());

    let raster = temperature_raster(256, 128);
    let source = ArraySource::new(vec![SourcePlane::new("I", raster.clone(), act_header())]);

    let reports = ingester
        .ingest_source(&map_description("act_dr5"), &source)
        .await
        .unwrap();
    assert_eq!(reports.len(), 1);

    let report = &reports[0];
    assert_eq!(report.levels, 2);
    // Level 0 is 2x1 tiles, level 1 is 4x2.
    assert_eq!(report.tile_count, 10);
    assert_eq!(report.null_tile_count, 0);
    assert!(!report.replaced_existing);

    // Map and band metadata landed.
    let map = store.get_map("act_dr5").await.unwrap().unwrap();
    assert_eq!(map.telescope.as_deref(), Some("ACT"));

    let band = store.get_band(report.band_id).await.unwrap().unwrap();
    assert_eq!(band.units, "uK");
    assert_eq!(band.quantity.as_deref(), Some("T"));
    assert_eq!(band.frequency.as_deref(), Some("090"));
    assert_eq!(band.stokes_parameter.as_deref(), Some("I"));
    assert_eq!(band.recommended_cmap, "RdBu_r");
    let bbox = band.bounding_box().unwrap();
    assert_eq!(bbox.bottom_left(), (-180.0, -90.0));

    // Histogram counts cover every pixel: the gradient stays inside
    // the default +/- 2000 range.
    let histogram = store.get_histogram(report.band_id).await.unwrap().unwrap();
    assert_eq!(histogram.bins, 128);
    let counts: Vec<i64> = pyramid::decode_raw(&histogram.counts, 128).unwrap();
    assert_eq!(counts.iter().sum::<i64>(), 256 * 128);

    // The finest level reconstructs the source exactly.
    let level = ingester.reconstruct_level(report.band_id, 1).await.unwrap();
    assert_eq!((level.width, level.height), (256, 128));
    for row in 0..128 {
        for col in 0..256 {
            assert_eq!(level.get(col, row), Some(raster.get(col, row).unwrap()));
        }
    }

    // The coarse level is fully populated too.
    let coarse = ingester.reconstruct_level(report.band_id, 0).await.unwrap();
    assert_eq!((coarse.width, coarse.height), (128, 64));
    assert!(coarse.data.iter().all(|v| v.is_finite()));
}

#[tokio::test]
async fn test_reingest_replaces_band() {
    let store = Arc::new(MemoryStore::new());
    let ingester = ingester(store.clone());

    let raster = temperature_raster(256, 128);
    let source = ArraySource::new(vec![SourcePlane::new("I", raster, act_header())]);
    let map = map_description("act_dr5");

    let first = ingester.ingest_source(&map, &source).await.unwrap();
    let second = ingester.ingest_source(&map, &source).await.unwrap();
    assert!(second[0].replaced_existing);
    assert_ne!(first[0].band_id, second[0].band_id);

    // Exactly one band remains, and the old one is fully gone.
    let bands = store.list_bands("act_dr5").await.unwrap();
    assert_eq!(bands.len(), 1);
    assert_eq!(bands[0].id, second[0].band_id);
    assert!(store.get_band(first[0].band_id).await.unwrap().is_none());
    assert!(store
        .get_histogram(first[0].band_id)
        .await
        .unwrap()
        .is_none());
    assert!(store
        .query_tiles(first[0].band_id, 0)
        .await
        .unwrap()
        .is_empty());

    // A deterministic source produces byte-identical tiles on rebuild.
    let old_tile = store.get_tile(second[0].band_id, 1, 2, 1).await.unwrap();
    let third = ingester.ingest_source(&map, &source).await.unwrap();
    let new_tile = store.get_tile(third[0].band_id, 1, 2, 1).await.unwrap();
    assert_eq!(old_tile.unwrap().data, new_tile.unwrap().data);
}

#[tokio::test]
async fn test_masked_region_stores_null_tile() {
    let store = Arc::new(MemoryStore::new());
    let ingester = ingester(store.clone());

    // Right half of a one-level full-sky canvas entirely masked.
    let raster = masked_raster(128, 64, 42.0, 64, 128, 0, 64);
    let source = ArraySource::new(vec![SourcePlane::new(
        "I",
        raster,
        PlaneHeader::new().with(keys::UNIT, "uK"),
    )]);

    let reports = ingester
        .ingest_source(&map_description("masked"), &source)
        .await
        .unwrap();
    assert_eq!(reports[0].levels, 1);
    assert_eq!(reports[0].tile_count, 2);
    assert_eq!(reports[0].null_tile_count, 1);

    let band = store.get_band(reports[0].band_id).await.unwrap().unwrap();
    // The generator attaches no coordinate system.
    assert!(band.bounding_box().is_none());

    let left = store
        .get_tile(reports[0].band_id, 0, 0, 0)
        .await
        .unwrap()
        .unwrap();
    let right = store
        .get_tile(reports[0].band_id, 0, 1, 0)
        .await
        .unwrap()
        .unwrap();
    assert!(left.data.is_some());
    assert!(right.data.is_none());
    assert!(right.data_type.is_none());

    // Reconstruction leaves the sentinel under the null tile.
    let level = ingester.reconstruct_level(reports[0].band_id, 0).await.unwrap();
    assert_eq!(level.get(0, 0), Some(42.0));
    assert!(level.get(64, 0).unwrap().is_nan());
}

#[tokio::test]
async fn test_reconstruct_rejects_bad_requests() {
    let store = Arc::new(MemoryStore::new());
    let ingester = ingester(store.clone());

    let source = ArraySource::new(vec![SourcePlane::new(
        "I",
        temperature_raster(128, 64),
        act_header(),
    )]);
    let reports = ingester
        .ingest_source(&map_description("act_dr5"), &source)
        .await
        .unwrap();

    let err = ingester
        .reconstruct_level(reports[0].band_id, 7)
        .await
        .unwrap_err();
    assert!(matches!(err, TilerError::InvalidInput(_)));

    let err = ingester
        .reconstruct_level(uuid::Uuid::new_v4(), 0)
        .await
        .unwrap_err();
    assert!(matches!(err, TilerError::InvalidInput(_)));
}

#[tokio::test]
async fn test_square_grid_is_rejected_before_any_write() {
    let store = Arc::new(MemoryStore::new());
    let mut options = IngestOptions::default().with_tile_size(64);
    options.grid_shape = pyramid::GridShape::Square;
    let ingester = Ingester::with_options(store.clone(), options);

    // 128x128 fits a square pyramid but not the stored full-sky layout.
    let source = ArraySource::new(vec![SourcePlane::new(
        "I",
        temperature_raster(128, 128),
        act_header(),
    )]);
    let err = ingester
        .ingest_source(&map_description("square"), &source)
        .await
        .unwrap_err();
    assert!(matches!(err, TilerError::InvalidInput(_)));

    // No band was committed.
    assert!(store.list_bands("square").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_source_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let ingester = ingester(store);

    let err = ingester
        .ingest_source(&map_description("empty"), &ArraySource::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TilerError::InvalidInput(_)));
}
