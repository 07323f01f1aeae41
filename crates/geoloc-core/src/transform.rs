//! Six-term affine geo-transforms.

use serde::{Deserialize, Serialize};

/// A GDAL-style affine transform from pixel to map coordinates.
///
/// Terms are `[origin_x, pixel_width, row_rotation, origin_y, column_rotation,
/// pixel_height]`, mapping the *corner* of pixel `(col, row)` to
/// `x = t[0] + col * t[1] + row * t[2]` and `y = t[3] + col * t[4] + row * t[5]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// Create a north-up transform without rotation.
    pub fn north_up(origin_x: f64, pixel_width: f64, origin_y: f64, pixel_height: f64) -> Self {
        Self([origin_x, pixel_width, 0.0, origin_y, 0.0, pixel_height])
    }

    /// The raw terms.
    pub fn terms(&self) -> [f64; 6] {
        self.0
    }

    /// Whether the rotation terms are zero, so x depends only on the column
    /// and y only on the row.
    pub fn is_axis_aligned(&self) -> bool {
        self.0[2] == 0.0 && self.0[4] == 0.0
    }

    /// Map a pixel location to map coordinates.
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        let t = &self.0;
        (
            t[0] + col * t[1] + row * t[2],
            t[3] + col * t[4] + row * t[5],
        )
    }

    /// Map map coordinates back to a pixel location.
    ///
    /// Returns `None` if the transform is singular.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let t = &self.0;
        let det = t[1] * t[5] - t[2] * t[4];
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let dx = x - t[0];
        let dy = y - t[3];
        let col = (t[5] * dx - t[2] * dy) / det;
        let row = (t[1] * dy - t[4] * dx) / det;
        Some((col, row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_round_trip_with_rotation() {
        let transform = GeoTransform([10.0, 0.5, 0.1, 20.0, -0.05, -0.5]);
        assert!(!transform.is_axis_aligned());

        let (x, y) = transform.pixel_to_geo(12.0, 7.0);
        let (col, row) = transform.geo_to_pixel(x, y).unwrap();
        assert_abs_diff_eq!(col, 12.0, epsilon = 1e-9);
        assert_abs_diff_eq!(row, 7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_singular_transform() {
        let transform = GeoTransform([0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert!(transform.geo_to_pixel(1.0, 1.0).is_none());
    }

    #[test]
    fn test_north_up() {
        let transform = GeoTransform::north_up(-123.0, 0.25, 48.0, -0.25);
        assert!(transform.is_axis_aligned());
        assert_eq!(transform.pixel_to_geo(4.0, 4.0), (-122.0, 47.0));
    }
}
