//! Tile and metadata persistence for the map-tiler workspace.
//!
//! Provides the record shapes the pyramid engine produces, the
//! [`TileStore`] trait the rest of the workspace programs against, a
//! PostgreSQL implementation and an in-memory implementation for tests
//! and demos.

pub mod memory;
pub mod postgres;
pub mod records;
pub mod store;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use records::{BandRecord, HistogramRecord, MapRecord, TileRecord};
pub use store::TileStore;
