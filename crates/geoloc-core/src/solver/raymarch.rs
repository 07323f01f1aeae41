//! Ray-march bracketing followed by a bounded Nelder-Mead refinement.

use super::neldermead::BoundedNelderMeadSolver;
use super::{MinimizationFunction, Solution, Solver, SolverBounds};
use crate::config::SolverConfig;
use crate::elevation::{ConstantElevationModel, ElevationModel};
use crate::WorldCoordinate;
use tracing::{debug, trace};

/// Smallest height difference (meters) between the reference solutions that
/// still defines a usable ray.
const MIN_REFERENCE_SEPARATION: f64 = 1e-9;

type Point = [f64; 3];

/// `point + multiple * step`.
fn advance(point: Point, step: Point, multiple: f64) -> Point {
    [
        point[0] + multiple * step[0],
        point[1] + multiple * step[1],
        point[2] + multiple * step[2],
    ]
}

fn midpoint(a: Point, b: Point) -> Point {
    [(a[0] + b[0]) / 2.0, (a[1] + b[1]) / 2.0, (a[2] + b[2]) / 2.0]
}

/// A line of sight in `[lon, lat, height]` space.
#[derive(Debug, Clone, Copy)]
struct Ray {
    /// Point on the ray between the two reference solutions.
    origin: Point,
    /// Displacement per meter of height; `step[2]` is 1.
    step: Point,
}

impl Ray {
    /// The ray through two points at different heights.
    ///
    /// Returns `None` when the heights coincide or the direction is not
    /// finite, since no 1 m step can be derived.
    fn through(lower: &WorldCoordinate, upper: &WorldCoordinate) -> Option<Self> {
        let lower = lower.to_array();
        let upper = upper.to_array();
        let rise = upper[2] - lower[2];
        if !rise.is_finite() || rise.abs() < MIN_REFERENCE_SEPARATION {
            return None;
        }

        let step = [
            (upper[0] - lower[0]) / rise,
            (upper[1] - lower[1]) / rise,
            1.0,
        ];
        if step.iter().any(|s| !s.is_finite()) {
            return None;
        }

        Some(Self {
            origin: midpoint(lower, upper),
            step,
        })
    }

    /// The point of the ray at `height`.
    fn at_height(&self, height: f64) -> Point {
        let mut point = advance(self.origin, self.step, height - self.origin[2]);
        point[2] = height;
        point
    }
}

/// Walks down (or up) a sensor ray until it crosses the terrain, then polishes
/// the crossing with a [`BoundedNelderMeadSolver`].
///
/// The ray is estimated from two constant-height solves one meter below and
/// above the terrain height at the initial guess. Marching starts from the
/// upper height bound (capped at [`SolverConfig::max_start_height`]) and
/// brackets the crossing with 50 m, 10 m and finally 1 m steps.
pub struct BoundedRayMarchSolver<'a, F> {
    minimization_function: F,
    elevation_model: &'a dyn ElevationModel,
    initial_guess: [f64; 2],
    search_distance: f64,
    bounds: SolverBounds,
    config: SolverConfig,
}

impl<'a, F: MinimizationFunction> BoundedRayMarchSolver<'a, F> {
    /// Create a solver with default configuration and no bounds.
    pub fn new(
        minimization_function: F,
        elevation_model: &'a dyn ElevationModel,
        initial_guess: [f64; 2],
        search_distance: f64,
    ) -> Self {
        Self {
            minimization_function,
            elevation_model,
            initial_guess,
            search_distance,
            bounds: SolverBounds::default(),
            config: SolverConfig::default(),
        }
    }

    /// Restrict the search. Height bounds raise the march start; horizontal
    /// bounds are forwarded to the refinement solve.
    pub fn with_bounds(mut self, bounds: SolverBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Use custom tolerances and march parameters.
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Solve at a fixed height to find where the ray passes that height.
    fn reference_solve(&self, height: f64) -> Solution {
        let constant = ConstantElevationModel::new(height);
        BoundedNelderMeadSolver::new(
            &self.minimization_function,
            &constant,
            self.initial_guess,
            self.search_distance,
        )
        .with_config(self.config.clone())
        .solve()
    }

    /// Height the march starts from.
    fn start_height(&self, height: f64) -> f64 {
        let raised = match self.bounds.height {
            Some((_, max_height)) => max_height.max(height),
            None => height,
        };
        raised.min(self.config.max_start_height)
    }

    /// Resolve the terrain height under `point`.
    fn terrain_height(&self, probe: &mut WorldCoordinate, point: &Point) -> Option<f64> {
        probe.longitude = point[0];
        probe.latitude = point[1];
        if self.elevation_model.set_elevation(probe) {
            trace!(
                "probe ({:.9}, {:.9}) ray {:.3} m terrain {:.3} m",
                point[0],
                point[1],
                point[2],
                probe.elevation
            );
            Some(probe.elevation)
        } else {
            debug!("Ray march lost terrain at ({:.9}, {:.9})", point[0], point[1]);
            None
        }
    }

    /// Step along the ray from `start` until one point is at or below the
    /// terrain and its neighbor is at or above it.
    ///
    /// Returns `(below, above)`, or `None` if the terrain could not be
    /// resolved or the step limit was hit.
    fn bracket(&self, start: Point, step: Point) -> Option<(Point, Point)> {
        let mut below = start;
        let mut above = start;
        let mut probe = WorldCoordinate::from_array(start);
        let mut terrain = self.terrain_height(&mut probe, &start)?;
        let mut steps = 0;

        if start[2] > terrain {
            while below[2] - terrain > 0.0 {
                steps += 1;
                if steps > self.config.max_march_steps {
                    debug!("Ray march exceeded {} steps going down", self.config.max_march_steps);
                    return None;
                }
                above = below;
                below = advance(below, step, -1.0);
                terrain = self.terrain_height(&mut probe, &below)?;
            }
        } else {
            while above[2] - terrain < 0.0 {
                steps += 1;
                if steps > self.config.max_march_steps {
                    debug!("Ray march exceeded {} steps going up", self.config.max_march_steps);
                    return None;
                }
                below = above;
                above = advance(above, step, 1.0);
                terrain = self.terrain_height(&mut probe, &above)?;
            }
        }

        Some((below, above))
    }

    /// Narrow the crossing with each configured step multiple in turn; every
    /// pass restarts from the upper end of the previous bracket.
    fn bracket_multistep(&self, start: Point, step: Point) -> Option<(Point, Point)> {
        let mut position = start;
        let mut result = None;
        for &multiple in &self.config.step_multiples {
            let scaled = [step[0] * multiple, step[1] * multiple, step[2] * multiple];
            let (below, above) = self.bracket(position, scaled)?;
            trace!("{} m bracket: {:.3} m to {:.3} m", multiple, below[2], above[2]);
            position = above;
            result = Some((below, above));
        }
        result
    }
}

impl<F: MinimizationFunction> Solver for BoundedRayMarchSolver<'_, F> {
    fn solve(&self) -> Solution {
        let mut baseline = WorldCoordinate::new(self.initial_guess[0], self.initial_guess[1], 0.0);
        if !self.elevation_model.set_elevation(&mut baseline) {
            debug!("No terrain at initial guess, using 0 m baseline");
        }

        let offset = self.config.reference_height_offset;
        let lower = self.reference_solve(baseline.elevation - offset);
        if !lower.success {
            debug!("Lower reference solve failed");
            return Solution::failed(baseline);
        }
        let upper = self.reference_solve(baseline.elevation + offset);
        if !upper.success {
            debug!("Upper reference solve failed");
            return Solution::failed(baseline);
        }

        let Some(ray) = Ray::through(&lower.coordinate, &upper.coordinate) else {
            debug!(
                "Degenerate ray between {:?} and {:?}",
                lower.coordinate, upper.coordinate
            );
            return Solution::failed(baseline);
        };

        let march_start = ray.at_height(self.start_height(ray.origin[2]));
        debug!(
            "Marching from {:.1} m along step ({:e}, {:e}) rad/m",
            march_start[2], ray.step[0], ray.step[1]
        );

        let Some((below, above)) = self.bracket_multistep(march_start, ray.step) else {
            let mut estimate = WorldCoordinate::from_array(ray.origin);
            self.elevation_model.set_elevation(&mut estimate);
            return Solution::failed(estimate);
        };

        let crossing = midpoint(below, above);
        let mut estimate = WorldCoordinate::from_array(crossing);
        self.elevation_model.set_elevation(&mut estimate);
        debug!(
            "Bracketed terrain at ({:.9}, {:.9}, {:.2} m)",
            estimate.longitude, estimate.latitude, estimate.elevation
        );

        BoundedNelderMeadSolver::new(
            &self.minimization_function,
            self.elevation_model,
            [crossing[0], crossing[1]],
            self.search_distance.min(self.config.refinement_search_distance),
        )
        .with_bounds(self.bounds)
        .with_config(self.config.clone())
        .solve()
    }
}
