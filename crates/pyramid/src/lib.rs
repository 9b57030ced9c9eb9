//! Tile pyramid construction engine.
//!
//! Partitions a source raster into power-of-two-sized tiles at successively
//! coarser resolutions, and reassembles any level back into a contiguous
//! array. The pipeline is:
//!
//! ```text
//! Raster ──► PyramidBuilder ──► [TileUnit] ──► codec::encode ──► store
//!                                                                  │
//!            reconstruct_level ◄── codec::decode ◄── query_tiles ◄─┘
//! ```
//!
//! Level 0 is the coarsest level. The default grid shape doubles width
//! relative to height per level (`2^(depth+1) x 2^depth` tiles), matching
//! a full-sky 2:1 equirectangular projection; a square quad-tree shape is
//! available for datasets that do not follow that projection.

pub mod builder;
pub mod codec;
pub mod downsample;
pub mod layout;
pub mod reconstruct;
pub mod stats;

pub use builder::{PyramidBuilder, TileUnit};
pub use codec::{decode, decode_raw, encode, encode_raw, TileBlock};
pub use downsample::{downsample_plane, DownsampleMethod};
pub use layout::{GridShape, PyramidLayout};
pub use reconstruct::{reconstruct_level, ReconstructedLevel, TilePayload};
pub use stats::{bounding_box, histogram};
