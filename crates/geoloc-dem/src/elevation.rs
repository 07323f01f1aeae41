//! Terrain from DEM tiles as an elevation model.

use crate::DemManager;
use geoloc_core::{ElevationModel, ElevationRegionSummary, WorldCoordinate};
use std::sync::Arc;
use tracing::trace;

/// Looks up terrain height in the tiles of a [`DemManager`].
///
/// Coordinates are expected to be normalized; wrap the model in
/// `ElevationChain::normalized` when they may not be. Heights are returned as
/// stored in the tiles, so add a datum offset with `ElevationChain::offset`
/// when the DEM is referenced to a geoid.
#[derive(Debug, Clone)]
pub struct DemElevationModel {
    manager: Arc<DemManager>,
    interpolate: bool,
}

impl DemElevationModel {
    /// Create a model sampling `manager` with bilinear interpolation.
    pub fn new(manager: impl Into<Arc<DemManager>>) -> Self {
        Self {
            manager: manager.into(),
            interpolate: true,
        }
    }

    /// Use the value of the containing pixel instead of interpolating.
    pub fn with_nearest_sampling(mut self) -> Self {
        self.interpolate = false;
        self
    }

    /// The tiles backing this model.
    pub fn manager(&self) -> &DemManager {
        &self.manager
    }
}

impl ElevationModel for DemElevationModel {
    fn set_elevation(&self, coordinate: &mut WorldCoordinate) -> bool {
        let lat = coordinate.latitude_degrees();
        let lon = coordinate.longitude_degrees();
        let result = if self.interpolate {
            self.manager.get_elevation(lat, lon)
        } else {
            self.manager.get_elevation_nearest(lat, lon)
        };

        match result {
            Ok(elevation) => {
                coordinate.elevation = elevation as f64;
                true
            }
            Err(e) => {
                trace!("No DEM elevation at ({:.6}, {:.6}): {}", lat, lon, e);
                false
            }
        }
    }

    fn describe_region(&self, coordinate: &WorldCoordinate) -> Option<ElevationRegionSummary> {
        self.manager
            .summary(coordinate.latitude_degrees(), coordinate.longitude_degrees())
            .ok()
    }
}
