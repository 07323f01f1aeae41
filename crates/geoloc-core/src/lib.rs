//! # geoloc-core
//!
//! Locates the ground point seen by an image pixel by intersecting the sensor's
//! line of sight with a terrain surface.
//!
//! ## Overview
//!
//! The crate has two halves:
//!
//! - **Elevation models**: [`ElevationModel`] sources composed into an
//!   [`ElevationChain`] with conditions, fallbacks, normalization and datum
//!   offsets.
//! - **Solvers**: [`BoundedNelderMeadSolver`] minimizes a caller-supplied cost
//!   over longitude/latitude, and [`BoundedRayMarchSolver`] first brackets the
//!   terrain crossing along the sensor ray before refining it the same way.
//!
//! All angles are radians and all heights are meters above the WGS84
//! ellipsoid. The crate does no I/O apart from reading [`SolverConfig`] files;
//! raster-backed terrain lives in `geoloc-dem`.
//!
//! ## Example
//!
//! ```
//! use geoloc_core::{BoundedRayMarchSolver, ElevationChain, ElevationModel, Solver};
//!
//! let terrain = ElevationChain::constant(0.0);
//! let cost = |p: &[f64; 2], _: &dyn ElevationModel| {
//!     (p[0] - 0.001).powi(2) + (p[1] - 0.001).powi(2)
//! };
//!
//! let solution = BoundedRayMarchSolver::new(cost, &terrain, [0.0, 0.0], 0.01).solve();
//! assert!(solution.success);
//! assert!((solution.coordinate.longitude - 0.001).abs() < 1e-6);
//! assert!((solution.coordinate.latitude - 0.001).abs() < 1e-6);
//! ```

pub mod condition;
pub mod config;
pub mod coordinate;
pub mod elevation;
pub mod error;
pub mod geometry;
pub mod offset;
pub mod sensor;
pub mod solver;
pub mod transform;

pub use condition::{
    AlwaysFalse, AlwaysTrue, BoundsCondition, ElevationModelCondition, GeometryCondition,
};
pub use config::SolverConfig;
pub use coordinate::{ImageCoordinate, WorldCoordinate};
pub use elevation::{ConstantElevationModel, ElevationChain, ElevationModel, ElevationRegionSummary};
pub use error::ConfigError;
pub use geometry::GeometryQuery;
pub use offset::{ConstantOffsetProvider, ElevationOffsetProvider};
pub use sensor::{AffineSensorModel, DefaultedSensorModel, SensorModel, SensorModelOptions};
pub use solver::{
    BoundedNelderMeadSolver, BoundedRayMarchSolver, MinimizationFunction, Solution, Solver,
    SolverBounds,
};
pub use transform::GeoTransform;
