//! Solvers that locate the terrain point matching a sensor observation.
//!
//! A solver minimizes a caller-supplied cost over longitude/latitude. The cost
//! function receives the elevation model so it can place each candidate on
//! the terrain before scoring it.

mod neldermead;
mod raymarch;
mod simplex;

pub use neldermead::BoundedNelderMeadSolver;
pub use raymarch::BoundedRayMarchSolver;
pub use simplex::equilateral_triangle;

use crate::elevation::ElevationModel;
use crate::WorldCoordinate;
use serde::{Deserialize, Serialize};

/// A cost over `[longitude, latitude]` (radians) that is near zero at the
/// true terrain intersection.
///
/// Implemented for every `Fn(&[f64; 2], &dyn ElevationModel) -> f64`.
pub trait MinimizationFunction: Fn(&[f64; 2], &dyn ElevationModel) -> f64 {}

impl<T> MinimizationFunction for T where T: Fn(&[f64; 2], &dyn ElevationModel) -> f64 + ?Sized {}

/// The output of a solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Solution {
    /// Best available estimate, even when `success` is false.
    pub coordinate: WorldCoordinate,
    /// Whether the solver converged.
    pub success: bool,
}

impl Solution {
    /// A converged solution.
    pub fn converged(coordinate: WorldCoordinate) -> Self {
        Self {
            coordinate,
            success: true,
        }
    }

    /// A degraded estimate from a solve that did not converge.
    pub fn failed(coordinate: WorldCoordinate) -> Self {
        Self {
            coordinate,
            success: false,
        }
    }

    /// Split into `(coordinate, success)`.
    pub fn into_parts(self) -> (WorldCoordinate, bool) {
        (self.coordinate, self.success)
    }
}

/// Produces a world coordinate and a success flag.
pub trait Solver {
    /// Run the solve.
    fn solve(&self) -> Solution;
}

/// Absolute search limits.
///
/// Longitude and latitude bounds only take effect when both are present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverBounds {
    /// Longitude range in radians.
    pub longitude: Option<(f64, f64)>,
    /// Latitude range in radians.
    pub latitude: Option<(f64, f64)>,
    /// Height range in meters.
    pub height: Option<(f64, f64)>,
}

impl SolverBounds {
    /// No limits.
    pub fn none() -> Self {
        Self::default()
    }

    /// Set the longitude range.
    pub fn with_longitude(mut self, min: f64, max: f64) -> Self {
        self.longitude = Some((min, max));
        self
    }

    /// Set the latitude range.
    pub fn with_latitude(mut self, min: f64, max: f64) -> Self {
        self.latitude = Some((min, max));
        self
    }

    /// Set the height range.
    pub fn with_height(mut self, min: f64, max: f64) -> Self {
        self.height = Some((min, max));
        self
    }

    /// The horizontal box, if both axes are bounded.
    pub fn horizontal(&self) -> Option<[(f64, f64); 2]> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) => Some([lon, lat]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_requires_both_axes() {
        assert!(SolverBounds::none().horizontal().is_none());
        assert!(SolverBounds::none().with_longitude(0.0, 1.0).horizontal().is_none());
        assert!(SolverBounds::none().with_latitude(0.0, 1.0).horizontal().is_none());

        let bounds = SolverBounds::none()
            .with_longitude(0.0, 1.0)
            .with_latitude(-1.0, 0.0)
            .with_height(-100.0, 9000.0);
        assert_eq!(bounds.horizontal(), Some([(0.0, 1.0), (-1.0, 0.0)]));
    }

    #[test]
    fn test_solution_parts() {
        let coord = WorldCoordinate::new(0.1, 0.2, 3.0);
        assert_eq!(Solution::converged(coord).into_parts(), (coord, true));
        assert_eq!(Solution::failed(coord).into_parts(), (coord, false));
    }
}
