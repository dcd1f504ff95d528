//! Multidimensional root finding.
//!
//! Solves square nonlinear systems `f(x) = 0` with `f: R^n -> R^n`:
//!
//! - [`NewtonVectorRootFinder`]: Newton-Raphson with a full Jacobian per step
//! - [`BroydenVectorRootFinder`]: one Jacobian, then rank-one inverse updates
//!
//! Both take the Jacobian either from a caller-supplied closure or from
//! [`finite_difference_jacobian`]. Convergence is tested on the residual norm,
//! never on the parameter displacement. Every call to `solve` is independent;
//! solvers carry configuration only.
//!
//! The residual closure returns `Result<DVector<f64>, E>` for any error type
//! `E: From<MathError>`, so callers propagate their own structural errors
//! through the solver untouched.
//!
//! # Example
//!
//! ```rust
//! use curvebuild_math::solvers::{NewtonVectorRootFinder, VectorRootFinder};
//! use curvebuild_math::MathError;
//! use nalgebra::DVector;
//!
//! // x^2 + y^2 = 4, x = y
//! let f = |v: &DVector<f64>| -> Result<DVector<f64>, MathError> {
//!     Ok(DVector::from_vec(vec![v[0] * v[0] + v[1] * v[1] - 4.0, v[0] - v[1]]))
//! };
//!
//! let solver = NewtonVectorRootFinder::default();
//! let result = solver.solve(&f, &DVector::from_vec(vec![1.0, 0.5])).unwrap();
//! assert!((result.root[0] - 2.0_f64.sqrt()).abs() < 1e-9);
//! ```

mod broyden;
mod finite_difference;
mod newton;

pub use broyden::BroydenVectorRootFinder;
pub use finite_difference::{finite_difference_jacobian, DifferenceScheme, FiniteDifferenceConfig};
pub use newton::NewtonVectorRootFinder;

use nalgebra::{DMatrix, DVector};

use crate::error::MathError;

/// Default absolute and relative tolerance on the residual norm.
pub const DEFAULT_TOLERANCE: f64 = 1e-10;

/// Default maximum number of solver steps.
pub const DEFAULT_MAX_STEPS: u32 = 100;

/// Configuration for vector root finders.
#[derive(Debug, Clone, Copy)]
pub struct VectorSolverConfig {
    /// Converged when the residual norm is at most this value.
    pub absolute_tolerance: f64,
    /// Converged when the residual norm is at most this fraction of the
    /// residual norm at the starting point.
    pub relative_tolerance: f64,
    /// Maximum number of steps before giving up.
    pub max_steps: u32,
}

impl Default for VectorSolverConfig {
    fn default() -> Self {
        Self {
            absolute_tolerance: DEFAULT_TOLERANCE,
            relative_tolerance: DEFAULT_TOLERANCE,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

impl VectorSolverConfig {
    /// Creates a new configuration with the same absolute and relative tolerance.
    #[must_use]
    pub fn new(tolerance: f64, max_steps: u32) -> Self {
        Self {
            absolute_tolerance: tolerance,
            relative_tolerance: tolerance,
            max_steps,
        }
    }

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

    /// Sets the maximum number of steps.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Returns true if `norm` meets either tolerance.
    #[must_use]
    pub fn is_converged(&self, norm: f64, initial_norm: f64) -> bool {
        norm <= self.absolute_tolerance || norm <= self.relative_tolerance * initial_norm
    }
}

/// Result of a successful vector root solve.
#[derive(Debug, Clone)]
pub struct VectorRootResult {
    /// The root found.
    pub root: DVector<f64>,
    /// Residual vector at the root.
    pub residual: DVector<f64>,
    /// Euclidean norm of the residual.
    pub residual_norm: f64,
    /// Number of steps taken.
    pub iterations: u32,
}

/// A solver for square nonlinear systems.
pub trait VectorRootFinder {
    /// Finite-difference settings used when no Jacobian is supplied.
    fn finite_difference(&self) -> &FiniteDifferenceConfig;

    /// Solves `f(x) = 0` from `x0` using the supplied Jacobian.
    fn solve_with_jacobian<F, J, E>(
        &self,
        f: &F,
        jacobian: &J,
        x0: &DVector<f64>,
    ) -> Result<VectorRootResult, E>
    where
        F: Fn(&DVector<f64>) -> Result<DVector<f64>, E> + Sync,
        J: Fn(&DVector<f64>) -> Result<DMatrix<f64>, E>,
        E: From<MathError> + Send;

    /// Solves `f(x) = 0` from `x0` with a finite-difference Jacobian.
    fn solve<F, E>(&self, f: &F, x0: &DVector<f64>) -> Result<VectorRootResult, E>
    where
        F: Fn(&DVector<f64>) -> Result<DVector<f64>, E> + Sync,
        E: From<MathError> + Send,
    {
        let config = *self.finite_difference();
        let jacobian = |x: &DVector<f64>| finite_difference_jacobian(f, x, &config);
        self.solve_with_jacobian(f, &jacobian, x0)
    }
}

/// Evaluates `f` and checks the system is square with finite output.
pub(crate) fn evaluate<F, E>(f: &F, x: &DVector<f64>) -> Result<DVector<f64>, E>
where
    F: Fn(&DVector<f64>) -> Result<DVector<f64>, E>,
    E: From<MathError>,
{
    let fx = f(x)?;
    if fx.len() != x.len() {
        return Err(MathError::dimension_mismatch((fx.len(), 1), (x.len(), 1)).into());
    }
    if fx.iter().any(|v| !v.is_finite()) {
        return Err(MathError::non_finite("residual function").into());
    }
    Ok(fx)
}
