//! Predicates used to gate elevation models.

use crate::geometry::GeometryQuery;
use crate::WorldCoordinate;

/// A true/false test on a coordinate.
///
/// Any `Fn(&WorldCoordinate) -> bool` closure is a condition.
pub trait ElevationModelCondition: Send + Sync {
    /// Whether the condition holds for the coordinate.
    fn is_true(&self, coordinate: &WorldCoordinate) -> bool;
}

impl<F> ElevationModelCondition for F
where
    F: Fn(&WorldCoordinate) -> bool + Send + Sync,
{
    fn is_true(&self, coordinate: &WorldCoordinate) -> bool {
        self(coordinate)
    }
}

/// A condition that always holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysTrue;

impl ElevationModelCondition for AlwaysTrue {
    fn is_true(&self, _coordinate: &WorldCoordinate) -> bool {
        true
    }
}

/// A condition that never holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFalse;

impl ElevationModelCondition for AlwaysFalse {
    fn is_true(&self, _coordinate: &WorldCoordinate) -> bool {
        false
    }
}

/// Holds when the coordinate lies inside an inclusive longitude/latitude box.
///
/// The coordinate is tested as given, so wrap it in a normalized elevation
/// model if callers may pass unnormalized angles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsCondition {
    /// Longitude range in radians.
    pub longitude: (f64, f64),
    /// Latitude range in radians.
    pub latitude: (f64, f64),
}

impl BoundsCondition {
    /// Create a box condition from radian ranges.
    pub fn new(longitude: (f64, f64), latitude: (f64, f64)) -> Self {
        Self { longitude, latitude }
    }

    /// The whole globe in normalized form.
    pub fn world() -> Self {
        use std::f64::consts::{FRAC_PI_2, PI};
        Self::new((-PI, PI), (-FRAC_PI_2, FRAC_PI_2))
    }
}

impl ElevationModelCondition for BoundsCondition {
    fn is_true(&self, coordinate: &WorldCoordinate) -> bool {
        coordinate.longitude >= self.longitude.0
            && coordinate.longitude <= self.longitude.1
            && coordinate.latitude >= self.latitude.0
            && coordinate.latitude <= self.latitude.1
    }
}

/// Holds when a geometry query finds a geometry at the coordinate.
///
/// Typical use is a land or coverage mask that decides whether a terrain
/// source applies.
#[derive(Debug)]
pub struct GeometryCondition<Q> {
    query: Q,
}

impl<Q: GeometryQuery> GeometryCondition<Q> {
    /// Wrap a geometry query.
    pub fn new(query: Q) -> Self {
        Self { query }
    }

    /// Access the wrapped query.
    pub fn query(&self) -> &Q {
        &self.query
    }
}

impl<Q: GeometryQuery> ElevationModelCondition for GeometryCondition<Q> {
    fn is_true(&self, coordinate: &WorldCoordinate) -> bool {
        self.query.get_geometry(coordinate).is_some()
    }
}
