//! Error types for the DEM crate.

use thiserror::Error;

/// Errors that can occur when working with DEM data.
#[derive(Debug, Error)]
pub enum DemError {
    /// I/O error reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TIFF decoding or encoding error.
    #[error("TIFF error: {0}")]
    Tiff(#[from] tiff::TiffError),

    /// Invalid GeoTIFF - missing or malformed georeferencing tags.
    #[error("Invalid GeoTIFF: {0}")]
    InvalidGeoTiff(String),

    /// Raster dimensions and sample count disagree.
    #[error("Invalid grid: {0}")]
    InvalidGrid(String),

    /// The geo-transform has rotation terms, so rows and columns do not map
    /// to independent latitude and longitude axes.
    #[error("Geo-transform {0:?} is not a uniform grid")]
    NonUniformTransform([f64; 6]),

    /// Coordinate is outside the bounds of the tile.
    #[error("Coordinate ({lat}, {lon}) is outside tile bounds ({min_lat}-{max_lat}, {min_lon}-{max_lon})")]
    OutOfBounds {
        /// Requested latitude.
        lat: f64,
        /// Requested longitude.
        lon: f64,
        /// Tile minimum latitude.
        min_lat: f64,
        /// Tile maximum latitude.
        max_lat: f64,
        /// Tile minimum longitude.
        min_lon: f64,
        /// Tile maximum longitude.
        max_lon: f64,
    },

    /// No tile found for the given coordinate.
    #[error("No tile found for coordinate ({lat}, {lon})")]
    NoTileFound {
        /// Requested latitude.
        lat: f64,
        /// Requested longitude.
        lon: f64,
    },

    /// Invalid tile filename - cannot parse coordinates.
    #[error("Invalid tile filename: {0}")]
    InvalidFilename(String),

    /// Cache lock was poisoned (a thread panicked while holding the lock).
    #[error("Tile cache lock was poisoned")]
    CacheLockPoisoned,

    /// No data value encountered.
    #[error("No elevation data at coordinate ({lat}, {lon})")]
    NoData {
        /// Requested latitude.
        lat: f64,
        /// Requested longitude.
        lon: f64,
    },
}
