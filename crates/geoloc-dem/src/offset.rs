//! Datum offsets interpolated from a raster grid.

use crate::geotiff::Raster;
use crate::{DemError, Result};
use geoloc_core::{ElevationOffsetProvider, GeoTransform, WorldCoordinate};
use std::path::Path;
use tracing::debug;

/// Interpolates a WGS84 offset grid, such as geoid undulations, bilinearly
/// between pixel centers.
///
/// The grid is stored with latitude and longitude ascending regardless of the
/// source orientation. Coordinates outside the grid take the value at the
/// nearest edge.
#[derive(Debug, Clone)]
pub struct GridOffsetProvider {
    /// Row-major offsets in meters, south row first.
    values: Vec<f64>,
    width: usize,
    height: usize,
    /// Longitude (degrees) of the first column center.
    lon_origin: f64,
    /// Latitude (degrees) of the first row center.
    lat_origin: f64,
    /// Degrees between column centers.
    lon_spacing: f64,
    /// Degrees between row centers.
    lat_spacing: f64,
}

impl GridOffsetProvider {
    /// Read the first band of a GeoTIFF whose transform is in degrees.
    ///
    /// # Arguments
    /// * `path` - GeoTIFF with ModelTiepoint/ModelPixelScale or ModelTransformation tags
    /// * `scale_factor` - Multiplier converting stored values to meters
    pub fn from_geotiff<P: AsRef<Path>>(path: P, scale_factor: f64) -> Result<Self> {
        let path = path.as_ref();
        let raster = Raster::read(path)?;
        let transform = raster.transform.ok_or_else(|| {
            DemError::InvalidGeoTiff(format!("{} has no geo-transform", path.display()))
        })?;
        debug!(
            "Loaded {}x{} offset grid from {}",
            raster.width,
            raster.height,
            path.display()
        );
        Self::from_grid(
            raster.data.into_iter().map(f64::from).collect(),
            raster.width as usize,
            raster.height as usize,
            transform,
            scale_factor,
        )
    }

    /// Build a provider from row-major samples and their pixel-corner
    /// transform (degrees).
    pub fn from_grid(
        data: Vec<f64>,
        width: usize,
        height: usize,
        transform: GeoTransform,
        scale_factor: f64,
    ) -> Result<Self> {
        if width == 0 || height == 0 || data.len() != width * height {
            return Err(DemError::InvalidGrid(format!(
                "{} samples do not fill a {}x{} grid",
                data.len(),
                width,
                height
            )));
        }
        if !transform.is_axis_aligned() {
            return Err(DemError::NonUniformTransform(transform.terms()));
        }

        let [mut x0, mut dx, _, mut y0, _, mut dy] = transform.terms();
        let flip_rows = dy < 0.0;
        let flip_cols = dx < 0.0;
        if flip_rows {
            y0 += dy * height as f64;
            dy = -dy;
        }
        if flip_cols {
            x0 += dx * width as f64;
            dx = -dx;
        }

        let mut values = Vec::with_capacity(data.len());
        for row in 0..height {
            let src_row = if flip_rows { height - 1 - row } else { row };
            for col in 0..width {
                let src_col = if flip_cols { width - 1 - col } else { col };
                values.push(data[src_row * width + src_col] * scale_factor);
            }
        }

        Ok(Self {
            values,
            width,
            height,
            lon_origin: x0 + dx / 2.0,
            lat_origin: y0 + dy / 2.0,
            lon_spacing: dx,
            lat_spacing: dy,
        })
    }

    /// Fractional index of `value` along an axis of `count` centers, clamped
    /// to the grid.
    fn axis_position(value: f64, origin: f64, spacing: f64, count: usize) -> (usize, usize, f64) {
        let position = if spacing > 0.0 {
            ((value - origin) / spacing).max(0.0).min((count - 1) as f64)
        } else {
            0.0
        };
        let i0 = position.floor() as usize;
        let i1 = (i0 + 1).min(count - 1);
        (i0, i1, position - i0 as f64)
    }

    fn value(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.width + col]
    }
}

impl ElevationOffsetProvider for GridOffsetProvider {
    fn get_offset(&self, coordinate: &WorldCoordinate) -> f64 {
        let (c0, c1, fx) = Self::axis_position(
            coordinate.longitude_degrees(),
            self.lon_origin,
            self.lon_spacing,
            self.width,
        );
        let (r0, r1, fy) = Self::axis_position(
            coordinate.latitude_degrees(),
            self.lat_origin,
            self.lat_spacing,
            self.height,
        );

        self.value(r0, c0) * (1.0 - fx) * (1.0 - fy)
            + self.value(r0, c1) * fx * (1.0 - fy)
            + self.value(r1, c0) * (1.0 - fx) * fy
            + self.value(r1, c1) * fx * fy
    }
}
