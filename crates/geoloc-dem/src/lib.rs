//! # geoloc-dem
//!
//! GeoTIFF-backed terrain and datum offsets for `geoloc-core`.
//!
//! ## Overview
//!
//! - [`DemTile`] reads one single-band GeoTIFF (ModelTiepoint + ModelPixelScale
//!   or ModelTransformation tags, or a USGS `n48w123` style filename) and
//!   samples it bilinearly between pixel centers.
//! - [`DemManager`] indexes 1x1 degree USGS tiles and loads them on demand into
//!   a bounded LRU cache.
//! - [`DemElevationModel`] exposes a manager as an
//!   [`ElevationModel`](geoloc_core::ElevationModel).
//! - [`GridOffsetProvider`] interpolates a geoid or other datum grid as an
//!   [`ElevationOffsetProvider`](geoloc_core::ElevationOffsetProvider).
//!
//! ## Example
//!
//! ```no_run
//! use geoloc_core::{ElevationChain, ElevationModel, WorldCoordinate};
//! use geoloc_dem::{DemElevationModel, DemManager, GridOffsetProvider};
//!
//! let mut manager = DemManager::new();
//! manager.add_directory("dem_data")?;
//!
//! let terrain = ElevationChain::normalized(ElevationChain::offset(
//!     ElevationChain::source(DemElevationModel::new(manager)),
//!     GridOffsetProvider::from_geotiff("egm96_15.tif", 1.0)?,
//! ));
//!
//! let mut seattle = WorldCoordinate::from_degrees(-122.3321, 47.6062, f64::NAN);
//! if terrain.set_elevation(&mut seattle) {
//!     println!("Seattle is {:.1} m above the ellipsoid", seattle.elevation);
//! }
//! # Ok::<(), geoloc_dem::DemError>(())
//! ```

mod elevation;
mod error;
mod geotiff;
mod manager;
mod offset;
mod tile;

pub use elevation::DemElevationModel;
pub use error::DemError;
pub use manager::DemManager;
pub use offset::GridOffsetProvider;
pub use tile::{DemTile, TileBounds};

/// Result type for DEM operations.
pub type Result<T> = std::result::Result<T, DemError>;
