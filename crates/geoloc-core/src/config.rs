//! Solver configuration.
//!
//! All fields have defaults, so a YAML document only needs the values it
//! overrides:
//!
//! ```
//! use geoloc_core::SolverConfig;
//!
//! let config = SolverConfig::from_yaml_str("max_start_height: 9000.0\n")?;
//! assert_eq!(config.max_start_height, 9000.0);
//! assert_eq!(config.step_multiples, vec![50.0, 10.0, 1.0]);
//! # Ok::<(), geoloc_core::ConfigError>(())
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tuning parameters shared by the bounded solvers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    // Simplex search
    /// Largest vertex distance from the best vertex at convergence (radians).
    pub position_tolerance: f64,
    /// Largest cost difference from the best vertex at convergence.
    pub cost_tolerance: f64,
    /// Maximum simplex iterations.
    pub max_iterations: u64,
    /// Maximum cost function evaluations.
    pub max_evaluations: u64,

    // Ray march
    /// Height above and below the baseline used to estimate the ray (meters).
    pub reference_height_offset: f64,
    /// Highest point the march starts from (meters).
    pub max_start_height: f64,
    /// Decreasing multiples of the 1 m ray step, one bracketing pass each.
    pub step_multiples: Vec<f64>,
    /// Upper limit on the search distance of the refinement solve (radians).
    pub refinement_search_distance: f64,
    /// Steps allowed in a single bracketing pass before giving up.
    pub max_march_steps: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            position_tolerance: 0.000001_f64.to_radians(),
            cost_tolerance: 0.5,
            // 200 per free parameter (lon, lat)
            max_iterations: 400,
            max_evaluations: 400,

            reference_height_offset: 1.0,
            max_start_height: 10_000.0,
            step_multiples: vec![50.0, 10.0, 1.0],
            refinement_search_distance: 1e-5,
            max_march_steps: 100_000,
        }
    }
}

impl SolverConfig {
    /// Parse and validate a configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: SolverConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Check that every field is usable by the solvers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("position_tolerance", self.position_tolerance)?;
        positive("cost_tolerance", self.cost_tolerance)?;
        positive("reference_height_offset", self.reference_height_offset)?;
        positive("refinement_search_distance", self.refinement_search_distance)?;

        if !self.max_start_height.is_finite() {
            return Err(invalid("max_start_height", "must be finite"));
        }
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations", "must be at least 1"));
        }
        if self.max_evaluations == 0 {
            return Err(invalid("max_evaluations", "must be at least 1"));
        }
        if self.max_march_steps == 0 {
            return Err(invalid("max_march_steps", "must be at least 1"));
        }

        if self.step_multiples.is_empty() {
            return Err(invalid("step_multiples", "must not be empty"));
        }
        if self.step_multiples.iter().any(|m| !m.is_finite() || *m <= 0.0) {
            return Err(invalid("step_multiples", "all multiples must be positive"));
        }
        if self.step_multiples.windows(2).any(|w| w[1] >= w[0]) {
            return Err(invalid("step_multiples", "multiples must be strictly decreasing"));
        }

        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, format!("must be positive, got {}", value)))
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SolverConfig::default();
        config.validate().unwrap();
        assert!((config.position_tolerance - 1.745_329_251_994_33e-8).abs() < 1e-20);
        assert_eq!(config.cost_tolerance, 0.5);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "cost_tolerance: 0.1\nstep_multiples: [100.0, 5.0, 0.5]\n";
        let config = SolverConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.cost_tolerance, 0.1);
        assert_eq!(config.step_multiples, vec![100.0, 5.0, 0.5]);
        assert_eq!(config.max_start_height, 10_000.0);
    }

    #[test]
    fn test_rejects_bad_multiples() {
        let err = SolverConfig::from_yaml_str("step_multiples: [1.0, 10.0]\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "step_multiples", .. }));

        let err = SolverConfig::from_yaml_str("step_multiples: []\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "step_multiples", .. }));
    }

    #[test]
    fn test_rejects_non_positive_tolerance() {
        let err = SolverConfig::from_yaml_str("position_tolerance: 0.0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "position_tolerance", .. }));
    }

    #[test]
    fn test_yaml_syntax_error() {
        let err = SolverConfig::from_yaml_str("cost_tolerance: [").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("solver.yaml");
        std::fs::write(&path, "max_march_steps: 500\n").unwrap();
        let config = SolverConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.max_march_steps, 500);

        let missing = SolverConfig::from_yaml_file(dir.path().join("missing.yaml"));
        assert!(matches!(missing, Err(ConfigError::Io(_))));
    }
}
