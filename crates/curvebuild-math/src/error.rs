//! Error types for numerical operations.

use thiserror::Error;

/// A specialized Result type for numerical operations.
pub type MathResult<T> = Result<T, MathError>;

/// Errors that can occur during numerical operations.
#[derive(Error, Debug, Clone)]
pub enum MathError {
    /// Root finder exhausted its step budget.
    #[error("Convergence failed after {iterations} iterations (residual norm: {residual:.2e})")]
    ConvergenceFailed {
        /// Number of iterations attempted.
        iterations: u32,
        /// Residual norm at the last iterate.
        residual: f64,
    },

    /// Matrix is numerically singular.
    #[error("Singular matrix: pivot {pivot:.2e} at column {column}")]
    SingularMatrix {
        /// Column at which elimination broke down.
        column: usize,
        /// The offending pivot value.
        pivot: f64,
    },

    /// Matrix or vector dimensions are incompatible.
    #[error("Incompatible dimensions: ({rows1}x{cols1}) and ({rows2}x{cols2})")]
    DimensionMismatch {
        /// Rows in first operand.
        rows1: usize,
        /// Columns in first operand.
        cols1: usize,
        /// Rows in second operand.
        rows2: usize,
        /// Columns in second operand.
        cols2: usize,
    },

    /// Interpolation point is outside the valid range.
    #[error("Extrapolation not allowed: {x} is outside [{min}, {max}]")]
    ExtrapolationNotAllowed {
        /// The query point.
        x: f64,
        /// Minimum valid value.
        min: f64,
        /// Maximum valid value.
        max: f64,
    },

    /// Insufficient data points for operation.
    #[error("Insufficient data: need at least {required}, got {actual}")]
    InsufficientData {
        /// Minimum required points.
        required: usize,
        /// Actual number of points.
        actual: usize,
    },

    /// A function evaluation produced NaN or infinity.
    #[error("Non-finite value in {context}")]
    NonFinite {
        /// Where the value was observed.
        context: String,
    },

    /// Invalid input parameter.
    #[error("Invalid input: {reason}")]
    InvalidInput {
        /// Description of the invalid input.
        reason: String,
    },
}

impl MathError {
    /// Creates a convergence failed error.
    #[must_use]
    pub fn convergence_failed(iterations: u32, residual: f64) -> Self {
        Self::ConvergenceFailed {
            iterations,
            residual,
        }
    }

    /// Creates a singular matrix error.
    #[must_use]
    pub fn singular_matrix(column: usize, pivot: f64) -> Self {
        Self::SingularMatrix { column, pivot }
    }

    /// Creates a dimension mismatch error.
    #[must_use]
    pub fn dimension_mismatch(left: (usize, usize), right: (usize, usize)) -> Self {
        Self::DimensionMismatch {
            rows1: left.0,
            cols1: left.1,
            rows2: right.0,
            cols2: right.1,
        }
    }

    /// Creates a non-finite value error.
    #[must_use]
    pub fn non_finite(context: impl Into<String>) -> Self {
        Self::NonFinite {
            context: context.into(),
        }
    }

    /// Creates an invalid input error.
    #[must_use]
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Creates an insufficient data error.
    #[must_use]
    pub fn insufficient_data(required: usize, actual: usize) -> Self {
        Self::InsufficientData { required, actual }
    }
}
