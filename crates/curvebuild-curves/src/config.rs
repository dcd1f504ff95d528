//! Calibration configuration.
//!
//! Every field has a default, so a TOML document only needs to name what it
//! changes:
//!
//! ```toml
//! absolute_tolerance = 1e-12
//! root_finder = "broyden"
//! difference = "forward"
//! ```

use serde::{Deserialize, Serialize};

use curvebuild_math::solvers::{DifferenceScheme, FiniteDifferenceConfig, VectorSolverConfig};

use crate::error::{CurveError, CurveResult};

/// Finite difference scheme for Jacobians without analytic sensitivities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifferenceMethod {
    /// One-sided differences.
    Forward,
    /// Two-sided differences.
    #[default]
    Central,
}

impl From<DifferenceMethod> for DifferenceScheme {
    fn from(method: DifferenceMethod) -> Self {
        match method {
            DifferenceMethod::Forward => DifferenceScheme::Forward,
            DifferenceMethod::Central => DifferenceScheme::Central,
        }
    }
}

/// Root finder used for each calibration unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RootFinderMethod {
    /// Full Newton steps with a fresh Jacobian per iteration.
    #[default]
    Newton,
    /// Broyden's rank-one Jacobian updates.
    Broyden,
}

/// Configuration of the curve building repository.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Converged when the residual norm is at most this.
    #[serde(default = "default_tolerance")]
    pub absolute_tolerance: f64,

    /// Or when the residual norm has shrunk by this factor.
    #[serde(default = "default_tolerance")]
    pub relative_tolerance: f64,

    /// Maximum solver iterations per unit.
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Finite difference step relative to `max(|x|, 1)`.
    #[serde(default = "default_relative_bump")]
    pub relative_bump: f64,

    /// Finite difference scheme.
    #[serde(default)]
    pub difference: DifferenceMethod,

    /// Root finder.
    #[serde(default)]
    pub root_finder: RootFinderMethod,

    /// Largest par spread accepted by the post-calibration repricing check.
    #[serde(default = "default_repricing_tolerance")]
    pub repricing_tolerance: f64,
}

fn default_tolerance() -> f64 {
    1e-10
}

fn default_max_steps() -> u32 {
    100
}

fn default_relative_bump() -> f64 {
    1e-6
}

fn default_repricing_tolerance() -> f64 {
    1e-9
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            absolute_tolerance: default_tolerance(),
            relative_tolerance: default_tolerance(),
            max_steps: default_max_steps(),
            relative_bump: default_relative_bump(),
            difference: DifferenceMethod::default(),
            root_finder: RootFinderMethod::default(),
            repricing_tolerance: default_repricing_tolerance(),
        }
    }
}

impl CalibrationConfig {
    /// Sets the absolute tolerance.
    #[must_use]
    pub fn with_absolute_tolerance(mut self, tolerance: f64) -> Self {
        self.absolute_tolerance = tolerance;
        self
    }

    /// Sets the relative tolerance.
    #[must_use]
    pub fn with_relative_tolerance(mut self, tolerance: f64) -> Self {
        self.relative_tolerance = tolerance;
        self
    }

    /// Sets the iteration limit.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Sets the finite difference step.
    #[must_use]
    pub fn with_relative_bump(mut self, bump: f64) -> Self {
        self.relative_bump = bump;
        self
    }

    /// Sets the finite difference scheme.
    #[must_use]
    pub fn with_difference(mut self, difference: DifferenceMethod) -> Self {
        self.difference = difference;
        self
    }

    /// Sets the root finder.
    #[must_use]
    pub fn with_root_finder(mut self, root_finder: RootFinderMethod) -> Self {
        self.root_finder = root_finder;
        self
    }

    /// Sets the repricing tolerance.
    #[must_use]
    pub fn with_repricing_tolerance(mut self, tolerance: f64) -> Self {
        self.repricing_tolerance = tolerance;
        self
    }

    /// Checks that tolerances and steps are positive and finite.
    pub fn validate(&self) -> CurveResult<()> {
        let positive = [
            ("absolute_tolerance", self.absolute_tolerance),
            ("relative_tolerance", self.relative_tolerance),
            ("relative_bump", self.relative_bump),
            ("repricing_tolerance", self.repricing_tolerance),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(CurveError::invalid_config(format!(
                    "{field} must be positive and finite, got {value}"
                )));
            }
        }
        if self.max_steps == 0 {
            return Err(CurveError::invalid_config("max_steps must be at least 1"));
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> CurveResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| CurveError::invalid_config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn from_file(path: &str) -> CurveResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CurveError::invalid_config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    /// Solver settings for the root finders.
    #[must_use]
    pub fn solver_config(&self) -> VectorSolverConfig {
        VectorSolverConfig::new(self.absolute_tolerance, self.max_steps)
            .with_relative_tolerance(self.relative_tolerance)
    }

    /// Finite difference settings for Jacobians and sensitivities.
    #[must_use]
    pub fn finite_difference(&self) -> FiniteDifferenceConfig {
        FiniteDifferenceConfig::default()
            .with_relative_bump(self.relative_bump)
            .with_scheme(self.difference.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = CalibrationConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_steps, 100);
        assert_eq!(config.root_finder, RootFinderMethod::Newton);
        assert_eq!(config.finite_difference().scheme, DifferenceScheme::Central);
    }

    #[test]
    fn test_partial_toml() {
        let config = CalibrationConfig::from_toml_str(
            r#"
            absolute_tolerance = 1e-12
            root_finder = "broyden"
            difference = "forward"
            "#,
        )
        .unwrap();
        assert_relative_eq!(config.absolute_tolerance, 1e-12);
        assert_relative_eq!(config.relative_tolerance, 1e-10);
        assert_eq!(config.root_finder, RootFinderMethod::Broyden);
        assert_eq!(config.finite_difference().scheme, DifferenceScheme::Forward);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            CalibrationConfig::from_toml_str("max_steps = 0"),
            Err(CurveError::InvalidConfig { .. })
        ));
        assert!(matches!(
            CalibrationConfig::from_toml_str("root_finder = \"bisection\""),
            Err(CurveError::InvalidConfig { .. })
        ));
        assert!(CalibrationConfig::default()
            .with_relative_bump(-1.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_solver_config() {
        let config = CalibrationConfig::default().with_max_steps(7);
        let solver = config.solver_config();
        assert_eq!(solver.max_steps, 7);
        assert_relative_eq!(solver.relative_tolerance, 1e-10);
    }
}
