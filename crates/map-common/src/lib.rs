//! Common types shared across the map-tiler workspace.

pub mod bbox;
pub mod dtype;
pub mod error;
pub mod header;
pub mod raster;

pub use bbox::BoundingBox;
pub use dtype::{DataType, TileElement};
pub use error::{TilerError, TilerResult};
pub use header::{keys, PlaneHeader};
pub use raster::Raster;
