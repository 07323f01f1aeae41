//! Box-constrained Nelder-Mead simplex search as an argmin solver.
//!
//! argmin's own `NelderMead` stops on the spread of cost values alone and has
//! no bounds. Geolocation costs are tiny in absolute terms, so convergence has
//! to be judged on vertex positions *and* costs, and every trial point is
//! clipped into the search box.

use argmin::core::{
    CostFunction, Error, IterState, Problem, Solver, TerminationReason, TerminationStatus, KV,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Reflection coefficient.
const RHO: f64 = 1.0;
/// Expansion coefficient.
const CHI: f64 = 2.0;
/// Contraction coefficient.
const PSI: f64 = 0.5;
/// Shrink coefficient.
const SIGMA: f64 = 0.5;

pub(crate) type SimplexState = IterState<Vec<f64>, (), (), (), (), f64>;

/// Vertices of an equilateral triangle centered on `center` whose vertices
/// lie `radius` away from it.
///
/// Used as the starting simplex so the first steps are not biased toward
/// either axis.
pub fn equilateral_triangle(center: [f64; 2], radius: f64) -> Vec<Vec<f64>> {
    (0..3)
        .map(|i| {
            let angle = PI / 2.0 + i as f64 * 2.0 * PI / 3.0;
            vec![
                center[0] + radius * angle.cos(),
                center[1] + radius * angle.sin(),
            ]
        })
        .collect()
}

/// Nelder-Mead over a 2D simplex with optional box constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct BoundedSimplex {
    /// Vertices and their costs, best first once initialized.
    vertices: Vec<(Vec<f64>, f64)>,
    /// Per-axis `(min, max)` limits.
    bounds: Option<Vec<(f64, f64)>>,
    position_tolerance: f64,
    cost_tolerance: f64,
    max_evaluations: u64,
    evaluations: u64,
}

impl BoundedSimplex {
    pub(crate) fn new(
        initial_simplex: Vec<Vec<f64>>,
        position_tolerance: f64,
        cost_tolerance: f64,
        max_evaluations: u64,
    ) -> Self {
        Self {
            vertices: initial_simplex.into_iter().map(|v| (v, f64::INFINITY)).collect(),
            bounds: None,
            position_tolerance,
            cost_tolerance,
            max_evaluations,
            evaluations: 0,
        }
    }

    pub(crate) fn with_bounds(mut self, bounds: Option<Vec<(f64, f64)>>) -> Self {
        self.bounds = bounds;
        self
    }

    fn clip(&self, mut point: Vec<f64>) -> Vec<f64> {
        if let Some(bounds) = &self.bounds {
            for (x, (min, max)) in point.iter_mut().zip(bounds) {
                *x = x.max(*min).min(*max);
            }
        }
        point
    }

    fn evaluate<O>(&mut self, problem: &mut Problem<O>, point: &[f64]) -> Result<f64, Error>
    where
        O: CostFunction<Param = Vec<f64>, Output = f64>,
    {
        self.evaluations += 1;
        let cost = problem.cost(&point.to_vec())?;
        // NaN would sort as equal to anything and hide from the spread checks
        Ok(if cost.is_finite() { cost } else { f64::INFINITY })
    }

    /// `centroid + coefficient * (centroid - worst)`, clipped.
    fn trial_point(&self, centroid: &[f64], coefficient: f64) -> Vec<f64> {
        let worst = &self.vertices[self.vertices.len() - 1].0;
        let point = centroid
            .iter()
            .zip(worst)
            .map(|(c, w)| c + coefficient * (c - w))
            .collect();
        self.clip(point)
    }

    fn centroid(&self) -> Vec<f64> {
        let n = self.vertices.len() - 1;
        let dims = self.vertices[0].0.len();
        (0..dims)
            .map(|d| self.vertices[..n].iter().map(|(v, _)| v[d]).sum::<f64>() / n as f64)
            .collect()
    }

    fn sort(&mut self) {
        self.vertices
            .sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    }

    fn replace_worst(&mut self, point: Vec<f64>, cost: f64) {
        let last = self.vertices.len() - 1;
        self.vertices[last] = (point, cost);
    }

    fn shrink<O>(&mut self, problem: &mut Problem<O>) -> Result<(), Error>
    where
        O: CostFunction<Param = Vec<f64>, Output = f64>,
    {
        let best = self.vertices[0].0.clone();
        for i in 1..self.vertices.len() {
            let point: Vec<f64> = best
                .iter()
                .zip(&self.vertices[i].0)
                .map(|(b, v)| b + SIGMA * (v - b))
                .collect();
            let point = self.clip(point);
            let cost = self.evaluate(problem, &point)?;
            self.vertices[i] = (point, cost);
        }
        Ok(())
    }

    fn converged(&self) -> bool {
        let (best, best_cost) = &self.vertices[0];
        if !best_cost.is_finite() {
            return false;
        }
        let position_spread = self.vertices[1..]
            .iter()
            .flat_map(|(v, _)| v.iter().zip(best).map(|(a, b)| (a - b).abs()))
            .fold(0.0_f64, f64::max);
        let cost_spread = self.vertices[1..]
            .iter()
            .map(|(_, c)| (c - best_cost).abs())
            .fold(0.0_f64, f64::max);
        position_spread <= self.position_tolerance && cost_spread <= self.cost_tolerance
    }

    fn best_state(&self, state: SimplexState) -> SimplexState {
        let (param, cost) = &self.vertices[0];
        state.param(param.clone()).cost(*cost)
    }
}

impl<O> Solver<O, SimplexState> for BoundedSimplex
where
    O: CostFunction<Param = Vec<f64>, Output = f64>,
{
    const NAME: &'static str = "Bounded Nelder-Mead";

    fn init(
        &mut self,
        problem: &mut Problem<O>,
        state: SimplexState,
    ) -> Result<(SimplexState, Option<KV>), Error> {
        if self.vertices.len() < 2 {
            return Err(Error::msg("simplex needs at least two vertices"));
        }
        for i in 0..self.vertices.len() {
            let point = self.clip(self.vertices[i].0.clone());
            let cost = self.evaluate(problem, &point)?;
            self.vertices[i] = (point, cost);
        }
        self.sort();
        Ok((self.best_state(state), None))
    }

    fn next_iter(
        &mut self,
        problem: &mut Problem<O>,
        state: SimplexState,
    ) -> Result<(SimplexState, Option<KV>), Error> {
        let n = self.vertices.len() - 1;
        let centroid = self.centroid();
        let best_cost = self.vertices[0].1;
        let second_worst_cost = self.vertices[n - 1].1;
        let worst_cost = self.vertices[n].1;

        let reflected = self.trial_point(&centroid, RHO);
        let reflected_cost = self.evaluate(problem, &reflected)?;

        if reflected_cost < best_cost {
            let expanded = self.trial_point(&centroid, RHO * CHI);
            let expanded_cost = self.evaluate(problem, &expanded)?;
            if expanded_cost < reflected_cost {
                self.replace_worst(expanded, expanded_cost);
            } else {
                self.replace_worst(reflected, reflected_cost);
            }
        } else if reflected_cost < second_worst_cost {
            self.replace_worst(reflected, reflected_cost);
        } else if reflected_cost < worst_cost {
            // Outside contraction
            let contracted = self.trial_point(&centroid, PSI * RHO);
            let contracted_cost = self.evaluate(problem, &contracted)?;
            if contracted_cost <= reflected_cost {
                self.replace_worst(contracted, contracted_cost);
            } else {
                self.shrink(problem)?;
            }
        } else {
            // Inside contraction
            let contracted = self.trial_point(&centroid, -PSI);
            let contracted_cost = self.evaluate(problem, &contracted)?;
            if contracted_cost < worst_cost {
                self.replace_worst(contracted, contracted_cost);
            } else {
                self.shrink(problem)?;
            }
        }

        self.sort();
        Ok((self.best_state(state), None))
    }

    fn terminate(&mut self, _state: &SimplexState) -> TerminationStatus {
        if self.converged() {
            return TerminationStatus::Terminated(TerminationReason::SolverConverged);
        }
        if self.evaluations >= self.max_evaluations {
            return TerminationStatus::Terminated(TerminationReason::SolverExit(
                "maximum number of cost evaluations reached".to_string(),
            ));
        }
        TerminationStatus::NotTerminated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use argmin::core::{Executor, State};

    struct Bowl {
        center: [f64; 2],
    }

    impl CostFunction for Bowl {
        type Param = Vec<f64>;
        type Output = f64;

        fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
            Ok((p[0] - self.center[0]).powi(2) + 4.0 * (p[1] - self.center[1]).powi(2))
        }
    }

    #[test]
    fn test_equilateral_triangle() {
        let triangle = equilateral_triangle([1.0, -2.0], 0.5);
        assert_eq!(triangle.len(), 3);

        for vertex in &triangle {
            let r = ((vertex[0] - 1.0).powi(2) + (vertex[1] + 2.0).powi(2)).sqrt();
            assert_abs_diff_eq!(r, 0.5, epsilon = 1e-12);
        }

        let side = |a: &Vec<f64>, b: &Vec<f64>| {
            ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
        };
        let ab = side(&triangle[0], &triangle[1]);
        assert_abs_diff_eq!(ab, side(&triangle[1], &triangle[2]), epsilon = 1e-12);
        assert_abs_diff_eq!(ab, side(&triangle[2], &triangle[0]), epsilon = 1e-12);
        assert_abs_diff_eq!(ab, 0.5 * 3.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_converges_on_bowl() {
        let solver = BoundedSimplex::new(equilateral_triangle([0.0, 0.0], 1.0), 1e-8, 1e-12, 2000);
        let result = Executor::new(Bowl { center: [0.4, -0.3] }, solver)
            .configure(|state| state.max_iters(2000))
            .run()
            .unwrap();

        assert!(matches!(
            result.state().get_termination_status(),
            TerminationStatus::Terminated(TerminationReason::SolverConverged)
        ));
        let best = result.state().get_best_param().unwrap();
        assert_abs_diff_eq!(best[0], 0.4, epsilon = 1e-7);
        assert_abs_diff_eq!(best[1], -0.3, epsilon = 1e-7);
    }

    #[test]
    fn test_bounds_clip_every_vertex() {
        let solver = BoundedSimplex::new(equilateral_triangle([0.0, 0.0], 1.0), 1e-8, 1e-12, 2000)
            .with_bounds(Some(vec![(-1.0, 0.1), (-1.0, 1.0)]));
        let result = Executor::new(Bowl { center: [0.4, -0.3] }, solver)
            .configure(|state| state.max_iters(2000))
            .run()
            .unwrap();

        let best = result.state().get_best_param().unwrap();
        assert!(best[0] <= 0.1);
        assert_abs_diff_eq!(best[0], 0.1, epsilon = 1e-6);
        assert_abs_diff_eq!(best[1], -0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_evaluation_limit() {
        let solver = BoundedSimplex::new(equilateral_triangle([0.0, 0.0], 1.0), 1e-12, 1e-12, 10);
        let result = Executor::new(Bowl { center: [0.4, -0.3] }, solver)
            .configure(|state| state.max_iters(1000))
            .run()
            .unwrap();

        assert!(matches!(
            result.state().get_termination_status(),
            TerminationStatus::Terminated(TerminationReason::SolverExit(_))
        ));
    }

    /// Finite only for `p[0] <= 0`.
    struct HalfPlane;

    impl CostFunction for HalfPlane {
        type Param = Vec<f64>;
        type Output = f64;

        fn cost(&self, p: &Self::Param) -> Result<Self::Output, Error> {
            Ok(if p[0] <= 0.0 {
                p[0].powi(2) + p[1].powi(2)
            } else {
                f64::NAN
            })
        }
    }

    struct Undefined;

    impl CostFunction for Undefined {
        type Param = Vec<f64>;
        type Output = f64;

        fn cost(&self, _p: &Self::Param) -> Result<Self::Output, Error> {
            Ok(f64::NAN)
        }
    }

    #[test]
    fn test_nan_cost_is_not_a_minimum() {
        let solver = BoundedSimplex::new(equilateral_triangle([0.0, 0.0], 0.01), 1e-8, 1e-12, 400);
        let result = Executor::new(HalfPlane, solver)
            .configure(|state| state.max_iters(400))
            .run()
            .unwrap();

        let best = result.state().get_best_param().unwrap();
        assert!(best[0] <= 0.0);
        // The finite starting vertex at (0, 0.01) must not be reported.
        assert!(best[1].abs() < 1e-4);
        assert!(best[0].abs() < 1e-4);
    }

    #[test]
    fn test_all_nan_costs_never_converge() {
        let solver = BoundedSimplex::new(equilateral_triangle([0.0, 0.0], 1.0), 1e-8, 1e-12, 50);
        let result = Executor::new(Undefined, solver)
            .configure(|state| state.max_iters(1000))
            .run()
            .unwrap();

        assert!(matches!(
            result.state().get_termination_status(),
            TerminationStatus::Terminated(TerminationReason::SolverExit(_))
        ));
    }
}
