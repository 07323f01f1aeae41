//! Bounded Nelder-Mead solve over longitude/latitude.

use super::simplex::{equilateral_triangle, BoundedSimplex};
use super::{MinimizationFunction, Solution, Solver, SolverBounds};
use crate::config::SolverConfig;
use crate::elevation::ElevationModel;
use crate::WorldCoordinate;
use argmin::core::{CostFunction, Error, Executor, State, TerminationReason, TerminationStatus};
use tracing::{debug, warn};

/// Adapts a minimization function and elevation model to argmin.
struct LonLatCost<'a, F: ?Sized> {
    function: &'a F,
    elevation_model: &'a dyn ElevationModel,
}

impl<F> CostFunction for LonLatCost<'_, F>
where
    F: MinimizationFunction + ?Sized,
{
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
        Ok((self.function)(&[p[0], p[1]], self.elevation_model))
    }
}

/// Minimizes the cost with a simplex search started from an equilateral
/// triangle around the initial guess.
///
/// The elevation of the result always comes from one final call to the
/// elevation model at the solved position.
///
/// # Example
///
/// ```
/// use geoloc_core::{BoundedNelderMeadSolver, ElevationChain, ElevationModel, Solver};
///
/// let terrain = ElevationChain::constant(250.0);
/// let cost = |p: &[f64; 2], _: &dyn ElevationModel| (p[0] - 0.01).powi(2) + (p[1] + 0.02).powi(2);
///
/// let solution = BoundedNelderMeadSolver::new(cost, &terrain, [0.0, 0.0], 0.05).solve();
/// assert!(solution.success);
/// assert!((solution.coordinate.longitude - 0.01).abs() < 1e-6);
/// assert_eq!(solution.coordinate.elevation, 250.0);
/// ```
pub struct BoundedNelderMeadSolver<'a, F> {
    minimization_function: F,
    elevation_model: &'a dyn ElevationModel,
    initial_guess: [f64; 2],
    search_distance: f64,
    bounds: SolverBounds,
    config: SolverConfig,
}

impl<'a, F: MinimizationFunction> BoundedNelderMeadSolver<'a, F> {
    /// Create a solver with default configuration and no bounds.
    ///
    /// # Arguments
    ///
    /// * `minimization_function` - Cost over `[lon, lat]` radians
    /// * `elevation_model` - Terrain passed to the cost and used for the result height
    /// * `initial_guess` - `[lon, lat]` in radians
    /// * `search_distance` - Circumradius of the starting simplex, in radians
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

    /// Restrict the search. Longitude/latitude limits apply only when both
    /// are set; height limits are ignored by this solver.
    pub fn with_bounds(mut self, bounds: SolverBounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Use custom tolerances and limits.
    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Run the simplex search, returning the final position and whether it
    /// converged.
    fn minimize(&self) -> ([f64; 2], bool) {
        let cost = LonLatCost {
            function: &self.minimization_function,
            elevation_model: self.elevation_model,
        };
        let simplex = BoundedSimplex::new(
            equilateral_triangle(self.initial_guess, self.search_distance),
            self.config.position_tolerance,
            self.config.cost_tolerance,
            self.config.max_evaluations,
        )
        .with_bounds(self.bounds.horizontal().map(|b| b.to_vec()));

        let max_iterations = self.config.max_iterations;
        let result = match Executor::new(cost, simplex)
            .configure(|state| state.max_iters(max_iterations))
            .run()
        {
            Ok(result) => result,
            Err(e) => {
                warn!("Nelder-Mead solve aborted: {}", e);
                return (self.initial_guess, false);
            }
        };

        let state = result.state();
        let converged = matches!(
            state.get_termination_status(),
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
        );
        if !converged {
            debug!(
                "Nelder-Mead did not converge after {} iterations: {:?}",
                state.get_iter(),
                state.get_termination_status()
            );
        }

        let position = state
            .get_best_param()
            .or_else(|| state.get_param())
            .map(|p| [p[0], p[1]])
            .unwrap_or(self.initial_guess);
        (position, converged)
    }
}

impl<F: MinimizationFunction> Solver for BoundedNelderMeadSolver<'_, F> {
    fn solve(&self) -> Solution {
        let (position, converged) = self.minimize();

        let mut coordinate = WorldCoordinate::new(position[0], position[1], 0.0);
        self.elevation_model.set_elevation(&mut coordinate);

        Solution {
            coordinate,
            success: converged,
        }
    }
}
