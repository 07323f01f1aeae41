//! Vertical datum corrections.

use crate::WorldCoordinate;

/// Provides a WGS84 height offset, in meters, for a coordinate.
///
/// Elevation sources often reference a zero level (such as a geoid) that does
/// not match the WGS84 ellipsoid; the offset converts between the two.
pub trait ElevationOffsetProvider: Send + Sync {
    /// Meters to add to a source elevation to obtain WGS84 height.
    fn get_offset(&self, coordinate: &WorldCoordinate) -> f64;
}

/// A fixed offset everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantOffsetProvider {
    /// Offset in meters.
    pub offset: f64,
}

impl ConstantOffsetProvider {
    /// Create a provider returning `offset` meters.
    pub fn new(offset: f64) -> Self {
        Self { offset }
    }
}

impl ElevationOffsetProvider for ConstantOffsetProvider {
    fn get_offset(&self, _coordinate: &WorldCoordinate) -> f64 {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_offset_provider() {
        let provider = ConstantOffsetProvider::new(10.0);
        let coord = WorldCoordinate::new(1.0, 2.0, 0.0);
        assert_eq!(provider.get_offset(&coord), 10.0);
    }
}
