//! Raster sources: where ingestable image planes come from.

use map_common::{PlaneHeader, Raster, TilerResult};

/// One image plane ready to become a band: pixel data plus the header
/// cards describing it.
#[derive(Debug, Clone)]
pub struct SourcePlane {
    /// Plane identifier within the source, e.g. the Stokes parameter
    /// ("I", "Q", "U") or an extension name.
    pub identifier: String,
    pub raster: Raster<f32>,
    pub header: PlaneHeader,
}

impl SourcePlane {
    pub fn new(identifier: impl Into<String>, raster: Raster<f32>, header: PlaneHeader) -> Self {
        Self {
            identifier: identifier.into(),
            raster,
            header,
        }
    }
}

/// A provider of image planes for one map.
///
/// Format-specific loaders implement this; the ingester only ever sees
/// decoded planes.
pub trait RasterSource {
    /// All planes of the source, in ingestion order.
    fn planes(&self) -> TilerResult<Vec<SourcePlane>>;
}

/// A source backed by in-memory planes, for tests and programmatic
/// ingestion.
#[derive(Debug, Clone, Default)]
pub struct ArraySource {
    planes: Vec<SourcePlane>,
}

impl ArraySource {
    pub fn new(planes: Vec<SourcePlane>) -> Self {
        Self { planes }
    }

    pub fn push(&mut self, plane: SourcePlane) {
        self.planes.push(plane);
    }
}

impl RasterSource for ArraySource {
    fn planes(&self) -> TilerResult<Vec<SourcePlane>> {
        Ok(self.planes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use map_common::keys;

    #[test]
    fn test_array_source_returns_planes_in_order() {
        let raster = Raster::new(vec![0.0f32; 8], 4, 2).unwrap();
        let header = PlaneHeader::new().with(keys::UNIT, "uK");

        let source = ArraySource::new(vec![
            SourcePlane::new("I", raster.clone(), header.clone()),
            SourcePlane::new("Q", raster, header),
        ]);

        let planes = source.planes().unwrap();
        assert_eq!(planes.len(), 2);
        assert_eq!(planes[0].identifier, "I");
        assert_eq!(planes[1].identifier, "Q");
    }
}
