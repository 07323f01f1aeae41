//! Vector geometry lookup interface.

use crate::WorldCoordinate;

/// A spatial query returning the geometry that contains a point.
///
/// Implementations usually index a vector source in 1x1 degree tiles and
/// cache the per-tile spatial index; that strategy is up to the implementor.
pub trait GeometryQuery: Send + Sync {
    /// The geometry type produced by the query.
    type Geometry;

    /// Get the first geometry containing the coordinate, if any.
    fn get_geometry(&self, coordinate: &WorldCoordinate) -> Option<Self::Geometry>;
}
