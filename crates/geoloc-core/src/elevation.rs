//! Elevation models and their composition.
//!
//! An [`ElevationModel`] attempts to write the height of the terrain into a
//! [`WorldCoordinate`]. Terrain sources (DEM tiles, services, synthetic
//! surfaces) implement the trait directly; [`ElevationChain`] composes them
//! into pipelines:
//!
//! ```
//! use geoloc_core::{
//!     BoundsCondition, ConstantOffsetProvider, ElevationChain, ElevationModel, WorldCoordinate,
//! };
//!
//! let chain = ElevationChain::normalized(ElevationChain::multi(vec![
//!     ElevationChain::offset(
//!         ElevationChain::conditional(
//!             ElevationChain::constant(120.0),
//!             BoundsCondition::new((0.0, 0.1), (0.0, 0.1)),
//!         ),
//!         ConstantOffsetProvider::new(-17.0),
//!     ),
//!     ElevationChain::constant(0.0),
//! ]));
//!
//! let mut coord = WorldCoordinate::new(0.05, 0.05, f64::NAN);
//! assert!(chain.set_elevation(&mut coord));
//! assert_eq!(coord.elevation, 103.0);
//! ```

use crate::condition::ElevationModelCondition;
use crate::offset::ElevationOffsetProvider;
use crate::WorldCoordinate;
use serde::{Deserialize, Serialize};

/// Statistics about the terrain around a coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElevationRegionSummary {
    /// Lowest elevation in the region (meters).
    pub min_elevation: f64,
    /// Highest elevation in the region (meters).
    pub max_elevation: f64,
    /// Value marking missing samples in the source.
    pub no_data_value: f64,
    /// Distance between samples (meters).
    pub post_spacing: f64,
}

/// A source of terrain height.
pub trait ElevationModel: Send + Sync {
    /// Write the terrain height into `coordinate.elevation`.
    ///
    /// Returns `false` when no height is available, in which case the
    /// elevation of `coordinate` must be left as it was.
    fn set_elevation(&self, coordinate: &mut WorldCoordinate) -> bool;

    /// Summarize the terrain near `coordinate`, if the source supports it.
    fn describe_region(&self, _coordinate: &WorldCoordinate) -> Option<ElevationRegionSummary> {
        None
    }
}

/// Closures over a mutable coordinate are elevation models, which keeps
/// synthetic terrain in tests and tools short.
impl<F> ElevationModel for F
where
    F: Fn(&mut WorldCoordinate) -> bool + Send + Sync,
{
    fn set_elevation(&self, coordinate: &mut WorldCoordinate) -> bool {
        self(coordinate)
    }
}

/// A fixed elevation everywhere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantElevationModel {
    /// Height in meters.
    pub height: f64,
}

impl ConstantElevationModel {
    /// Create a model that always returns `height`.
    pub fn new(height: f64) -> Self {
        Self { height }
    }
}

impl ElevationModel for ConstantElevationModel {
    fn set_elevation(&self, coordinate: &mut WorldCoordinate) -> bool {
        coordinate.elevation = self.height;
        true
    }
}

/// A composable tree of elevation models.
///
/// Each variant owns its children, so a chain is built once and then queried
/// through [`ElevationModel`].
pub enum ElevationChain {
    /// Fixed height.
    Constant(ConstantElevationModel),
    /// Use `inner` only where `condition` holds.
    Conditional {
        /// Model used when the condition passes.
        inner: Box<ElevationChain>,
        /// Gate evaluated on the coordinate.
        condition: Box<dyn ElevationModelCondition>,
    },
    /// Try each model in order; the first success wins.
    Multi(Vec<ElevationChain>),
    /// Query `inner` with a normalized copy of the coordinate.
    Normalized(Box<ElevationChain>),
    /// Add a datum correction to the result of `inner`.
    Offset {
        /// Model that produces the raw elevation.
        inner: Box<ElevationChain>,
        /// Correction added on success.
        provider: Box<dyn ElevationOffsetProvider>,
    },
    /// Any other terrain source.
    Source(Box<dyn ElevationModel>),
}

impl ElevationChain {
    /// A fixed-height leaf.
    pub fn constant(height: f64) -> Self {
        ElevationChain::Constant(ConstantElevationModel::new(height))
    }

    /// Gate `inner` behind `condition`.
    pub fn conditional<C>(inner: ElevationChain, condition: C) -> Self
    where
        C: ElevationModelCondition + 'static,
    {
        ElevationChain::Conditional {
            inner: Box::new(inner),
            condition: Box::new(condition),
        }
    }

    /// An ordered fallback list.
    pub fn multi(models: Vec<ElevationChain>) -> Self {
        ElevationChain::Multi(models)
    }

    /// Normalize coordinates before querying `inner`.
    pub fn normalized(inner: ElevationChain) -> Self {
        ElevationChain::Normalized(Box::new(inner))
    }

    /// Add offsets from `provider` to the heights of `inner`.
    pub fn offset<P>(inner: ElevationChain, provider: P) -> Self
    where
        P: ElevationOffsetProvider + 'static,
    {
        ElevationChain::Offset {
            inner: Box::new(inner),
            provider: Box::new(provider),
        }
    }

    /// Wrap an external terrain source.
    pub fn source<M>(model: M) -> Self
    where
        M: ElevationModel + 'static,
    {
        ElevationChain::Source(Box::new(model))
    }
}

impl ElevationModel for ElevationChain {
    fn set_elevation(&self, coordinate: &mut WorldCoordinate) -> bool {
        match self {
            ElevationChain::Constant(model) => model.set_elevation(coordinate),
            ElevationChain::Conditional { inner, condition } => {
                condition.is_true(coordinate) && inner.set_elevation(coordinate)
            }
            ElevationChain::Multi(models) => {
                models.iter().any(|model| model.set_elevation(coordinate))
            }
            ElevationChain::Normalized(inner) => {
                let mut normalized = coordinate.normalized();
                if inner.set_elevation(&mut normalized) {
                    coordinate.elevation = normalized.elevation;
                    true
                } else {
                    false
                }
            }
            ElevationChain::Offset { inner, provider } => {
                if inner.set_elevation(coordinate) {
                    coordinate.elevation += provider.get_offset(coordinate);
                    true
                } else {
                    false
                }
            }
            ElevationChain::Source(model) => model.set_elevation(coordinate),
        }
    }

    fn describe_region(&self, coordinate: &WorldCoordinate) -> Option<ElevationRegionSummary> {
        match self {
            ElevationChain::Normalized(inner) => inner.describe_region(&coordinate.normalized()),
            ElevationChain::Source(model) => model.describe_region(coordinate),
            ElevationChain::Constant(_)
            | ElevationChain::Conditional { .. }
            | ElevationChain::Multi(_)
            | ElevationChain::Offset { .. } => None,
        }
    }
}

impl From<ConstantElevationModel> for ElevationChain {
    fn from(model: ConstantElevationModel) -> Self {
        ElevationChain::Constant(model)
    }
}

impl std::fmt::Debug for ElevationChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElevationChain::Constant(model) => {
                f.debug_tuple("Constant").field(&model.height).finish()
            }
            ElevationChain::Conditional { inner, .. } => f
                .debug_struct("Conditional")
                .field("inner", inner)
                .field("condition", &"<condition>")
                .finish(),
            ElevationChain::Multi(models) => f.debug_tuple("Multi").field(models).finish(),
            ElevationChain::Normalized(inner) => f.debug_tuple("Normalized").field(inner).finish(),
            ElevationChain::Offset { inner, .. } => f
                .debug_struct("Offset")
                .field("inner", inner)
                .field("provider", &"<provider>")
                .finish(),
            ElevationChain::Source(_) => f.debug_tuple("Source").field(&"<model>").finish(),
        }
    }
}
