//! Header metadata attached to a loaded image plane.
//!
//! The file-format loader (outside this workspace) supplies a flat
//! key/value mapping of header cards; accessors below cover the keys the
//! ingester consumes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// FITS-style header keywords consumed during ingestion.
pub mod keys {
    pub const TELESCOPE: &str = "TELESCOP";
    pub const DATA_RELEASE: &str = "RELEASE";
    pub const SEASON: &str = "SEASON";
    pub const TAGS: &str = "ACTTAGS";
    pub const PATCH: &str = "PATCH";
    pub const FREQUENCY: &str = "FREQ";
    pub const UNIT: &str = "BUNIT";
}

/// Key/value header mapping for one image plane.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaneHeader(HashMap<String, String>);

impl PlaneHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a raw header value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Set a header value, returning self for chained construction.
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn telescope(&self) -> Option<&str> {
        self.get(keys::TELESCOPE)
    }

    pub fn data_release(&self) -> Option<&str> {
        self.get(keys::DATA_RELEASE)
    }

    pub fn season(&self) -> Option<&str> {
        self.get(keys::SEASON)
    }

    pub fn tags(&self) -> Option<&str> {
        self.get(keys::TAGS)
    }

    pub fn patch(&self) -> Option<&str> {
        self.get(keys::PATCH)
    }

    pub fn frequency(&self) -> Option<&str> {
        self.get(keys::FREQUENCY)
    }

    /// Physical unit of the pixel values, e.g. "uK".
    pub fn unit(&self) -> Option<&str> {
        self.get(keys::UNIT)
    }
}

impl FromIterator<(String, String)> for PlaneHeader {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
