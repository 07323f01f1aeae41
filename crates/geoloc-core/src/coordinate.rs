//! Coordinate value types shared by every component.

use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// A geodetic point referenced to the WGS84 ellipsoid.
///
/// Longitude and latitude are in radians, elevation is in meters above the
/// ellipsoid. An elevation of `NaN` means the height is not known yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldCoordinate {
    /// Longitude in radians.
    pub longitude: f64,
    /// Latitude in radians.
    pub latitude: f64,
    /// Height above the WGS84 ellipsoid in meters.
    pub elevation: f64,
}

impl WorldCoordinate {
    /// Create a coordinate from radians and meters.
    pub fn new(longitude: f64, latitude: f64, elevation: f64) -> Self {
        Self {
            longitude,
            latitude,
            elevation,
        }
    }

    /// Create a coordinate from decimal degrees and meters.
    pub fn from_degrees(longitude_deg: f64, latitude_deg: f64, elevation: f64) -> Self {
        Self::new(longitude_deg.to_radians(), latitude_deg.to_radians(), elevation)
    }

    /// Create a coordinate from a `[lon, lat, height]` array.
    pub fn from_array(values: [f64; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }

    /// Return the coordinate as a `[lon, lat, height]` array.
    pub fn to_array(&self) -> [f64; 3] {
        [self.longitude, self.latitude, self.elevation]
    }

    /// Longitude in decimal degrees.
    pub fn longitude_degrees(&self) -> f64 {
        self.longitude.to_degrees()
    }

    /// Latitude in decimal degrees.
    pub fn latitude_degrees(&self) -> f64 {
        self.latitude.to_degrees()
    }

    /// Whether the elevation has been resolved.
    pub fn has_elevation(&self) -> bool {
        !self.elevation.is_nan()
    }

    /// Return an equivalent coordinate with latitude in [-π/2, π/2] and
    /// longitude in [-π, π).
    ///
    /// A latitude past a pole is reflected back over it, which moves the point
    /// to the opposite meridian. The elevation is carried over unchanged.
    pub fn normalized(&self) -> Self {
        let mut longitude = self.longitude;
        let mut latitude = wrap_angle(self.latitude);

        if latitude > FRAC_PI_2 {
            latitude = PI - latitude;
            longitude += PI;
        } else if latitude < -FRAC_PI_2 {
            latitude = -PI - latitude;
            longitude += PI;
        }

        Self {
            longitude: wrap_angle(longitude),
            latitude,
            elevation: self.elevation,
        }
    }
}

impl Default for WorldCoordinate {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}

impl From<[f64; 3]> for WorldCoordinate {
    fn from(values: [f64; 3]) -> Self {
        Self::from_array(values)
    }
}

/// Wrap an angle into [-π, π).
fn wrap_angle(angle: f64) -> f64 {
    (angle + PI).rem_euclid(TAU) - PI
}

/// A pixel location in full-image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageCoordinate {
    /// Column (sample) coordinate.
    pub x: f64,
    /// Row (line) coordinate.
    pub y: f64,
}

impl ImageCoordinate {
    /// Create an image coordinate.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
