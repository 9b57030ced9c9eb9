//! Map ingestion library.
//!
//! Turns one loaded raster plane per band into a committed tile pyramid:
//!
//! - histogram and bounding-box statistics over the full-resolution plane
//! - quad-tree pyramid construction and tile encoding (parallel per tile)
//! - one atomic store commit per band (band + histogram + all tiles)
//! - level reconstruction back into a contiguous array
//!
//! The file-format loader lives outside this workspace; it hands over
//! [`SourcePlane`] values (array, header mapping, world bounds) through
//! the [`RasterSource`] interface.

pub mod config;
pub mod ingester;
pub mod source;

pub use config::{quantity_for_unit, IngestOptions};
pub use ingester::{IngestReport, Ingester, MapDescription};
pub use source::{ArraySource, RasterSource, SourcePlane};
