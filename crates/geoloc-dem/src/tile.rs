//! Single DEM tile representation.

use crate::geotiff::Raster;
use crate::{DemError, Result};
use geoloc_core::{ElevationRegionSummary, GeoTransform};
use std::path::Path;
use tracing::debug;

/// Meters per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_320.0;

/// A single DEM tile loaded from a GeoTIFF file or built in memory.
///
/// USGS 1/3 arc-second tiles are typically 10812 x 10812 pixels covering
/// 1 degree of latitude and longitude. Samples are treated as pixel-is-area:
/// each value describes the center of its pixel.
#[derive(Debug)]
pub struct DemTile {
    /// Elevation data in row-major order.
    data: Vec<f32>,
    /// Width of the tile in pixels.
    width: u32,
    /// Height of the tile in pixels.
    height: u32,
    /// Pixel-corner transform in decimal degrees.
    transform: GeoTransform,
    /// Geographic bounds.
    bounds: TileBounds,
    /// No-data value (elevations equal to this should be treated as missing).
    no_data_value: Option<f32>,
    /// Lowest and highest valid sample.
    range: Option<(f32, f32)>,
}

/// Geographic bounds of a tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileBounds {
    /// Minimum latitude (south edge).
    pub min_lat: f64,
    /// Maximum latitude (north edge).
    pub max_lat: f64,
    /// Minimum longitude (west edge).
    pub min_lon: f64,
    /// Maximum longitude (east edge).
    pub max_lon: f64,
}

impl TileBounds {
    /// Check if a coordinate is within the bounds.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Bounds covered by a `width` x `height` raster under `transform`.
    fn of_raster(transform: &GeoTransform, width: u32, height: u32) -> Self {
        let (x0, y0) = transform.pixel_to_geo(0.0, 0.0);
        let (x1, y1) = transform.pixel_to_geo(width as f64, height as f64);
        TileBounds {
            min_lat: y0.min(y1),
            max_lat: y0.max(y1),
            min_lon: x0.min(x1),
            max_lon: x0.max(x1),
        }
    }
}

/// Parse the northwest corner `(lat, lon)` from a USGS tile name such as
/// `USGS_13_n48w123_20240327.tif`.
pub(crate) fn parse_tile_name(filename: &str) -> Option<(i32, i32)> {
    let bytes = filename.as_bytes();
    let digits = |start: usize| -> usize {
        bytes[start..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count()
    };

    for (i, &c) in bytes.iter().enumerate() {
        if c != b'n' && c != b's' {
            continue;
        }
        let lat_len = digits(i + 1);
        let dir = i + 1 + lat_len;
        if lat_len == 0 || dir >= bytes.len() || !matches!(bytes[dir], b'w' | b'e') {
            continue;
        }
        let lon_len = digits(dir + 1);
        if lon_len == 0 {
            continue;
        }

        let lat: i32 = filename[i + 1..dir].parse().ok()?;
        let lon: i32 = filename[dir + 1..dir + 1 + lon_len].parse().ok()?;
        let lat = if c == b'n' { lat } else { -lat };
        let lon = if bytes[dir] == b'w' { -lon } else { lon };
        return Some((lat, lon));
    }

    None
}

impl DemTile {
    /// Load a DEM tile from a GeoTIFF file.
    ///
    /// Georeferencing comes from the GeoTIFF tags; files without them must
    /// follow the USGS naming convention, which gives a 1x1 degree extent.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raster = Raster::read(path)?;
        let transform = match raster.transform {
            Some(transform) => transform,
            None => {
                let bounds = Self::bounds_from_filename(path)?;
                GeoTransform::north_up(
                    bounds.min_lon,
                    (bounds.max_lon - bounds.min_lon) / raster.width as f64,
                    bounds.max_lat,
                    -(bounds.max_lat - bounds.min_lat) / raster.height as f64,
                )
            }
        };

        debug!(
            "Loaded DEM tile {} ({}x{})",
            path.display(),
            raster.width,
            raster.height
        );
        Self::from_raw(
            raster.data,
            raster.width,
            raster.height,
            transform,
            raster.no_data_value,
        )
    }

    /// Build a tile from samples already in memory.
    ///
    /// `transform` maps pixel corners to decimal degrees and must not rotate
    /// the grid.
    pub fn from_raw(
        data: Vec<f32>,
        width: u32,
        height: u32,
        transform: GeoTransform,
        no_data_value: Option<f32>,
    ) -> Result<Self> {
        if width == 0 || height == 0 || data.len() != width as usize * height as usize {
            return Err(DemError::InvalidGrid(format!(
                "{} samples do not fill a {}x{} tile",
                data.len(),
                width,
                height
            )));
        }
        if !transform.is_axis_aligned() {
            return Err(DemError::NonUniformTransform(transform.terms()));
        }

        let is_valid =
            |v: &f32| !v.is_nan() && no_data_value.map_or(true, |nd| !is_no_data(*v, nd));
        let range = data.iter().filter(|v| is_valid(v)).fold(None, |range, &v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f32::min(lo, v), f32::max(hi, v))),
        });

        Ok(Self {
            bounds: TileBounds::of_raster(&transform, width, height),
            data,
            width,
            height,
            transform,
            no_data_value,
            range,
        })
    }

    /// Parse tile bounds from a USGS filename like "USGS_13_n48w123_*.tif".
    fn bounds_from_filename(path: &Path) -> Result<TileBounds> {
        let filename = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| DemError::InvalidFilename(path.display().to_string()))?;

        // The name gives the northwest corner of a 1 degree tile
        let (lat, lon) = parse_tile_name(filename)
            .ok_or_else(|| DemError::InvalidFilename(filename.to_string()))?;
        Ok(TileBounds {
            min_lat: lat as f64 - 1.0,
            max_lat: lat as f64,
            min_lon: lon as f64,
            max_lon: lon as f64 + 1.0,
        })
    }

    fn check_bounds(&self, lat: f64, lon: f64) -> Result<()> {
        if self.bounds.contains(lat, lon) {
            Ok(())
        } else {
            Err(DemError::OutOfBounds {
                lat,
                lon,
                min_lat: self.bounds.min_lat,
                max_lat: self.bounds.max_lat,
                min_lon: self.bounds.min_lon,
                max_lon: self.bounds.max_lon,
            })
        }
    }

    /// Continuous pixel-center position of a coordinate, clamped to the
    /// outermost centers.
    fn center_position(&self, lat: f64, lon: f64) -> (f64, f64) {
        // Axis-aligned transforms are always invertible once validated
        let (col, row) = self
            .transform
            .geo_to_pixel(lon, lat)
            .unwrap_or((f64::NAN, f64::NAN));
        (
            snap_to_center(col - 0.5).max(0.0).min((self.width - 1) as f64),
            snap_to_center(row - 0.5).max(0.0).min((self.height - 1) as f64),
        )
    }

    /// Get the elevation at a geographic coordinate.
    ///
    /// Uses bilinear interpolation between the four nearest pixel centers.
    ///
    /// # Arguments
    /// * `lat` - Latitude in decimal degrees (positive = north)
    /// * `lon` - Longitude in decimal degrees (negative = west)
    ///
    /// # Returns
    /// Elevation in meters, or an error if the coordinate is out of bounds or
    /// touches a no-data sample.
    pub fn get_elevation(&self, lat: f64, lon: f64) -> Result<f32> {
        self.check_bounds(lat, lon)?;
        let (x, y) = self.center_position(lat, lon);

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let fx = x - x0 as f64;
        let fy = y - y0 as f64;

        // Zero-weight neighbours are not read, so a no-data sample next to an
        // exact center does not spoil it
        let x1 = if fx > 0.0 { (x0 + 1).min(self.width - 1) } else { x0 };
        let y1 = if fy > 0.0 { (y0 + 1).min(self.height - 1) } else { y0 };

        let pixel = |px, py| self.get_pixel(px, py).ok_or(DemError::NoData { lat, lon });
        let v00 = pixel(x0, y0)?;
        let v10 = pixel(x1, y0)?;
        let v01 = pixel(x0, y1)?;
        let v11 = pixel(x1, y1)?;

        let elevation = v00 as f64 * (1.0 - fx) * (1.0 - fy)
            + v10 as f64 * fx * (1.0 - fy)
            + v01 as f64 * (1.0 - fx) * fy
            + v11 as f64 * fx * fy;

        Ok(elevation as f32)
    }

    /// Get the raw value of the pixel containing a coordinate (no interpolation).
    pub fn get_elevation_nearest(&self, lat: f64, lon: f64) -> Result<f32> {
        self.check_bounds(lat, lon)?;
        let (x, y) = self.center_position(lat, lon);
        self.get_pixel(x.round() as u32, y.round() as u32)
            .ok_or(DemError::NoData { lat, lon })
    }

    /// The sample at a pixel, or `None` for no-data.
    fn get_pixel(&self, x: u32, y: u32) -> Option<f32> {
        let value = self.data[y as usize * self.width as usize + x as usize];
        match self.no_data_value {
            _ if value.is_nan() => None,
            Some(nodata) if is_no_data(value, nodata) => None,
            _ => Some(value),
        }
    }

    /// Get the geographic bounds of this tile.
    pub fn bounds(&self) -> TileBounds {
        self.bounds
    }

    /// Get the pixel-corner transform of this tile.
    pub fn transform(&self) -> GeoTransform {
        self.transform
    }

    /// Get the dimensions of this tile in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Get the resolution in degrees per pixel.
    pub fn resolution(&self) -> (f64, f64) {
        let lat_range = self.bounds.max_lat - self.bounds.min_lat;
        let lon_range = self.bounds.max_lon - self.bounds.min_lon;
        (lon_range / self.width as f64, lat_range / self.height as f64)
    }

    /// Get the approximate resolution in meters at the center of the tile.
    pub fn resolution_meters(&self) -> (f64, f64) {
        let (lon_deg, lat_deg) = self.resolution();
        let center_lat = (self.bounds.min_lat + self.bounds.max_lat) / 2.0;

        // Longitude shrinks by cos(latitude)
        let meters_per_deg_lon = METERS_PER_DEGREE * center_lat.to_radians().cos();

        (lon_deg * meters_per_deg_lon, lat_deg * METERS_PER_DEGREE)
    }

    /// Summarize the whole tile.
    ///
    /// Returns `None` if every sample is no-data. A missing no-data value is
    /// reported as NaN.
    pub fn summary(&self) -> Option<ElevationRegionSummary> {
        let (min, max) = self.range?;
        let (dx, dy) = self.resolution_meters();
        Some(ElevationRegionSummary {
            min_elevation: min as f64,
            max_elevation: max as f64,
            no_data_value: self.no_data_value.map_or(f64::NAN, f64::from),
            post_spacing: dx.max(dy),
        })
    }
}

/// Round positions within 1e-9 pixels of a center onto it; inverting the
/// transform leaves that much noise on exact centers.
fn snap_to_center(position: f64) -> f64 {
    let nearest = position.round();
    if (position - nearest).abs() < 1e-9 {
        nearest
    } else {
        position
    }
}

fn is_no_data(value: f32, no_data: f32) -> bool {
    (value - no_data).abs() < 0.001
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// 3x3 tile over 1x1 degree; values increase east and south.
    fn tile(no_data: Option<f32>) -> DemTile {
        let data = vec![
            0.0, 10.0, 20.0, //
            30.0, 40.0, 50.0, //
            60.0, 70.0, -9999.0,
        ];
        DemTile::from_raw(
            data,
            3,
            3,
            GeoTransform::north_up(-123.0, 1.0 / 3.0, 48.0, -1.0 / 3.0),
            no_data,
        )
        .unwrap()
    }

    #[test]
    fn test_bounds_from_filename() {
        // Test n48w123 - should cover lat 47-48, lon -123 to -122
        let bounds = DemTile::bounds_from_filename(Path::new("USGS_13_n48w123_20240327.tif"))
            .expect("Should parse filename");

        assert_eq!(bounds.min_lat, 47.0);
        assert_eq!(bounds.max_lat, 48.0);
        assert_eq!(bounds.min_lon, -123.0);
        assert_eq!(bounds.max_lon, -122.0);

        let bounds = DemTile::bounds_from_filename(Path::new("s12e045.tif")).unwrap();
        assert_eq!((bounds.min_lat, bounds.max_lat), (-13.0, -12.0));
        assert_eq!((bounds.min_lon, bounds.max_lon), (45.0, 46.0));

        assert!(matches!(
            DemTile::bounds_from_filename(Path::new("elevation.tif")),
            Err(DemError::InvalidFilename(_))
        ));
    }

    #[test]
    fn test_parse_tile_name_skips_other_letters() {
        // The 's' in "USGS" is followed by '_' and must not match.
        assert_eq!(parse_tile_name("USGS_1_n47w122.tif"), Some((47, -122)));
        assert_eq!(parse_tile_name("dems/n01e179"), Some((1, 179)));
        assert_eq!(parse_tile_name("nowhere.tif"), None);
    }

    #[test]
    fn test_bounds_contains() {
        let bounds = TileBounds {
            min_lat: 47.0,
            max_lat: 48.0,
            min_lon: -123.0,
            max_lon: -122.0,
        };

        assert!(bounds.contains(47.5, -122.5));
        assert!(bounds.contains(47.0, -123.0)); // Corner
        assert!(bounds.contains(48.0, -122.0)); // Corner
        assert!(!bounds.contains(46.5, -122.5)); // Too far south
        assert!(!bounds.contains(48.5, -122.5)); // Too far north
        assert!(!bounds.contains(47.5, -121.5)); // Too far east
        assert!(!bounds.contains(47.5, -123.5)); // Too far west
    }

    #[test]
    fn test_bilinear_between_centers() {
        let tile = tile(Some(-9999.0));
        let third = 1.0 / 3.0;

        // Center of the top-left pixel
        assert_abs_diff_eq!(
            tile.get_elevation(48.0 - third / 2.0, -123.0 + third / 2.0).unwrap(),
            0.0
        );
        // Halfway between the first two centers of the top row
        assert_abs_diff_eq!(
            tile.get_elevation(48.0 - third / 2.0, -123.0 + third).unwrap(),
            5.0,
            epsilon = 1e-4
        );
        // Center of the middle pixel
        assert_abs_diff_eq!(tile.get_elevation(47.5, -122.5).unwrap(), 40.0, epsilon = 1e-4);
        // Between the outer edge and the first center clamps to the edge sample
        assert_abs_diff_eq!(tile.get_elevation(48.0, -123.0).unwrap(), 0.0);
    }

    #[test]
    fn test_pixel_center_next_to_no_data() {
        let tile = tile(Some(-9999.0));
        let third = 1.0 / 3.0;

        // Centers of the pixels above and left of the no-data corner
        let right_middle = tile.get_elevation(47.5, -122.0 - third / 2.0).unwrap();
        assert_abs_diff_eq!(right_middle, 50.0, epsilon = 1e-4);
        let bottom_middle = tile.get_elevation(47.0 + third / 2.0, -122.5).unwrap();
        assert_abs_diff_eq!(bottom_middle, 70.0, epsilon = 1e-4);

        assert_eq!(snap_to_center(1.0 + 1e-12), 1.0);
        assert_eq!(snap_to_center(2.0 - 1e-12), 2.0);
        assert_eq!(snap_to_center(1.25), 1.25);
    }

    #[test]
    fn test_no_data_and_out_of_bounds() {
        let tile = tile(Some(-9999.0));
        assert!(matches!(
            tile.get_elevation(47.05, -122.05),
            Err(DemError::NoData { .. })
        ));
        assert!(matches!(
            tile.get_elevation(46.0, -122.5),
            Err(DemError::OutOfBounds { .. })
        ));
        assert_eq!(tile.get_elevation_nearest(47.1, -122.5).unwrap(), 70.0);
    }

    #[test]
    fn test_summary_skips_no_data() {
        let summary = tile(Some(-9999.0)).summary().unwrap();
        assert_eq!(summary.min_elevation, 0.0);
        assert_eq!(summary.max_elevation, 70.0);
        assert_eq!(summary.no_data_value, -9999.0);
        assert_abs_diff_eq!(summary.post_spacing, METERS_PER_DEGREE / 3.0, epsilon = 1e-6);

        let summary = tile(None).summary().unwrap();
        assert_eq!(summary.min_elevation, -9999.0);
        assert!(summary.no_data_value.is_nan());
    }

    #[test]
    fn test_from_raw_rejects_bad_input() {
        let transform = GeoTransform::north_up(0.0, 1.0, 1.0, -1.0);
        assert!(matches!(
            DemTile::from_raw(vec![0.0; 3], 2, 2, transform, None),
            Err(DemError::InvalidGrid(_))
        ));
        assert!(matches!(
            DemTile::from_raw(
                vec![0.0; 4],
                2,
                2,
                GeoTransform([0.0, 1.0, 0.1, 1.0, 0.0, -1.0]),
                None
            ),
            Err(DemError::NonUniformTransform(_))
        ));
    }
}
