//! Sensor models map between image pixels and the ground.

use crate::elevation::ElevationModel;
use crate::transform::GeoTransform;
use crate::{ImageCoordinate, WorldCoordinate};
use serde::{Deserialize, Serialize};

/// Hints passed down a stack of sensor models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorModelOptions {
    /// Skip the default elevation model of a [`DefaultedSensorModel`].
    pub ignore_default_elevation_model: Option<bool>,
}

impl SensorModelOptions {
    /// Combine `self` (defaults) with `overrides`; set fields in `overrides`
    /// win.
    pub fn merge(&self, overrides: &SensorModelOptions) -> SensorModelOptions {
        SensorModelOptions {
            ignore_default_elevation_model: overrides
                .ignore_default_elevation_model
                .or(self.ignore_default_elevation_model),
        }
    }
}

/// Converts between image and world coordinates for one image.
pub trait SensorModel: Send + Sync {
    /// Locate the ground point seen at `image_coordinate`.
    fn image_to_world(
        &self,
        image_coordinate: &ImageCoordinate,
        elevation_model: Option<&dyn ElevationModel>,
        options: Option<&SensorModelOptions>,
    ) -> WorldCoordinate;

    /// Project a ground point into the image.
    fn world_to_image(&self, world_coordinate: &WorldCoordinate) -> ImageCoordinate;
}

/// Wraps a sensor model with a default elevation model and default options.
pub struct DefaultedSensorModel<S> {
    inner: S,
    elevation_model: Option<Box<dyn ElevationModel>>,
    options: Option<SensorModelOptions>,
}

impl<S: SensorModel> DefaultedSensorModel<S> {
    /// Wrap `inner` with no defaults.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            elevation_model: None,
            options: None,
        }
    }

    /// Use `elevation_model` when a caller does not supply one.
    pub fn with_elevation_model<M: ElevationModel + 'static>(
        mut self,
        elevation_model: M,
    ) -> Self {
        self.elevation_model = Some(Box::new(elevation_model));
        self
    }

    /// Options merged under every call's options.
    pub fn with_options(mut self, options: SensorModelOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// The wrapped model.
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: SensorModel> SensorModel for DefaultedSensorModel<S> {
    fn image_to_world(
        &self,
        image_coordinate: &ImageCoordinate,
        elevation_model: Option<&dyn ElevationModel>,
        options: Option<&SensorModelOptions>,
    ) -> WorldCoordinate {
        let options = match (self.options.as_ref(), options) {
            (Some(defaults), Some(call)) => Some(defaults.merge(call)),
            (defaults, call) => call.or(defaults).copied(),
        };
        let ignore_default = options
            .and_then(|o| o.ignore_default_elevation_model)
            .unwrap_or(false);

        let elevation_model = match elevation_model {
            Some(model) => Some(model),
            None if !ignore_default => self.elevation_model.as_deref(),
            None => None,
        };

        self.inner
            .image_to_world(image_coordinate, elevation_model, options.as_ref())
    }

    fn world_to_image(&self, world_coordinate: &WorldCoordinate) -> ImageCoordinate {
        match &self.elevation_model {
            Some(model) if world_coordinate.elevation.is_nan() => {
                let mut filled = *world_coordinate;
                model.set_elevation(&mut filled);
                self.inner.world_to_image(&filled)
            }
            _ => self.inner.world_to_image(world_coordinate),
        }
    }
}

/// A sensor model for orthorectified imagery described by an affine
/// geo-transform in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineSensorModel {
    transform: GeoTransform,
}

impl AffineSensorModel {
    /// Create a model from a pixel to degrees transform.
    pub fn new(transform: GeoTransform) -> Self {
        Self { transform }
    }

    /// The pixel to degrees transform.
    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }
}

impl SensorModel for AffineSensorModel {
    /// The elevation comes from `elevation_model`, or is 0 without one.
    fn image_to_world(
        &self,
        image_coordinate: &ImageCoordinate,
        elevation_model: Option<&dyn ElevationModel>,
        _options: Option<&SensorModelOptions>,
    ) -> WorldCoordinate {
        let (lon, lat) = self
            .transform
            .pixel_to_geo(image_coordinate.x, image_coordinate.y);
        let mut coordinate = WorldCoordinate::from_degrees(lon, lat, 0.0);
        if let Some(model) = elevation_model {
            model.set_elevation(&mut coordinate);
        }
        coordinate
    }

    /// Returns a NaN pixel if the transform cannot be inverted.
    fn world_to_image(&self, world_coordinate: &WorldCoordinate) -> ImageCoordinate {
        match self.transform.geo_to_pixel(
            world_coordinate.longitude_degrees(),
            world_coordinate.latitude_degrees(),
        ) {
            Some((x, y)) => ImageCoordinate::new(x, y),
            None => ImageCoordinate::new(f64::NAN, f64::NAN),
        }
    }
}
