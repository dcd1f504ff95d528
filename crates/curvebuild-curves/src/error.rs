//! Error types for curve construction and calibration.
//!
//! The calibration taxonomy is: [`CurveError::MalformedBundle`] (detected
//! before any solve), [`CurveError::NonConvergence`],
//! [`CurveError::SingularSystem`] and [`CurveError::UnresolvableDependency`].
//! All of them abort the whole calibration request.

use curvebuild_math::MathError;
use thiserror::Error;

/// A specialized Result type for curve operations.
pub type CurveResult<T> = Result<T, CurveError>;

/// Error types for curve operations.
#[derive(Error, Debug, Clone)]
pub enum CurveError {
    /// A bundle is not a square system or is otherwise inconsistent.
    #[error("Malformed bundle for curve '{curve}': {reason}")]
    MalformedBundle {
        /// Curve (or unit) the problem was found in.
        curve: String,
        /// Description of the problem.
        reason: String,
    },

    /// The root finder exhausted its step budget.
    #[error(
        "Calibration of unit [{unit}] did not converge after {iterations} iterations (residual norm: {residual_norm:.2e})"
    )]
    NonConvergence {
        /// Curves of the failing unit.
        unit: String,
        /// Number of iterations attempted.
        iterations: u32,
        /// Residual norm at the last iterate.
        residual_norm: f64,
    },

    /// A Jacobian was numerically singular.
    #[error("Singular system in unit [{unit}]: {reason}")]
    SingularSystem {
        /// Curves of the failing unit.
        unit: String,
        /// Description of the singularity.
        reason: String,
    },

    /// An instrument needs a curve that is neither known nor calibrated.
    #[error("Unresolvable dependency: {name}")]
    UnresolvableDependency {
        /// Curve name or role that could not be resolved.
        name: String,
    },

    /// The same curve name appears twice where names must be unique.
    #[error("Duplicate curve: {name}")]
    DuplicateCurve {
        /// The duplicated name.
        name: String,
    },

    /// Interpolation failed.
    #[error("Interpolation error: {reason}")]
    InterpolationError {
        /// Description of the interpolation error.
        reason: String,
    },

    /// Not enough nodes to build a curve.
    #[error("Insufficient points: need at least {required}, got {got}")]
    InsufficientPoints {
        /// Minimum required points.
        required: usize,
        /// Actual number of points.
        got: usize,
    },

    /// Node times are not strictly increasing.
    #[error("Non-monotonic node times at index {index}: {prev:.4} >= {current:.4}")]
    NonMonotonicTimes {
        /// Index of the offending node.
        index: usize,
        /// Previous node time.
        prev: f64,
        /// Current node time.
        current: f64,
    },

    /// Invalid instrument definition.
    #[error("Invalid instrument: {reason}")]
    InvalidInstrument {
        /// Description of the problem.
        reason: String,
    },

    /// Invalid curve parameter or value.
    #[error("Invalid value: {reason}")]
    InvalidValue {
        /// Description of the invalid value.
        reason: String,
    },

    /// Invalid calibration configuration.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },

    /// Underlying numerical error.
    #[error("Math error: {reason}")]
    MathError {
        /// Description of the math error.
        reason: String,
    },
}

impl CurveError {
    /// Creates a malformed bundle error.
    #[must_use]
    pub fn malformed_bundle(curve: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedBundle {
            curve: curve.into(),
            reason: reason.into(),
        }
    }

    /// Creates an unresolvable dependency error.
    #[must_use]
    pub fn unresolvable(name: impl Into<String>) -> Self {
        Self::UnresolvableDependency { name: name.into() }
    }

    /// Creates a duplicate curve error.
    #[must_use]
    pub fn duplicate_curve(name: impl Into<String>) -> Self {
        Self::DuplicateCurve { name: name.into() }
    }

    /// Creates an interpolation error.
    #[must_use]
    pub fn interpolation_error(reason: impl Into<String>) -> Self {
        Self::InterpolationError {
            reason: reason.into(),
        }
    }

    /// Creates an insufficient points error.
    #[must_use]
    pub fn insufficient_points(required: usize, got: usize) -> Self {
        Self::InsufficientPoints { required, got }
    }

    /// Creates a non-monotonic times error.
    #[must_use]
    pub fn non_monotonic_times(index: usize, prev: f64, current: f64) -> Self {
        Self::NonMonotonicTimes {
            index,
            prev,
            current,
        }
    }

    /// Creates an invalid instrument error.
    #[must_use]
    pub fn invalid_instrument(reason: impl Into<String>) -> Self {
        Self::InvalidInstrument {
            reason: reason.into(),
        }
    }

    /// Creates an invalid value error.
    #[must_use]
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            reason: reason.into(),
        }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Attaches the unit label to solver failures raised without one.
    #[must_use]
    pub fn in_unit(self, label: &str) -> Self {
        match self {
            Self::NonConvergence {
                unit,
                iterations,
                residual_norm,
            } if unit.is_empty() => Self::NonConvergence {
                unit: label.to_string(),
                iterations,
                residual_norm,
            },
            Self::SingularSystem { unit, reason } if unit.is_empty() => Self::SingularSystem {
                unit: label.to_string(),
                reason,
            },
            other => other,
        }
    }

    /// Returns true for errors raised by the root finder.
    #[must_use]
    pub fn is_solver_failure(&self) -> bool {
        matches!(self, Self::NonConvergence { .. } | Self::SingularSystem { .. })
    }
}

impl From<MathError> for CurveError {
    fn from(err: MathError) -> Self {
        match err {
            MathError::ConvergenceFailed {
                iterations,
                residual,
            } => Self::NonConvergence {
                unit: String::new(),
                iterations,
                residual_norm: residual,
            },
            MathError::SingularMatrix { .. } => Self::SingularSystem {
                unit: String::new(),
                reason: err.to_string(),
            },
            MathError::ExtrapolationNotAllowed { .. } | MathError::InsufficientData { .. } => {
                Self::interpolation_error(err.to_string())
            }
            other => Self::MathError {
                reason: other.to_string(),
            },
        }
    }
}
