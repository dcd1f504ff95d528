//! Newton-Raphson for square systems.

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};

use super::{evaluate, FiniteDifferenceConfig, VectorRootFinder, VectorRootResult, VectorSolverConfig};
use crate::error::MathError;
use crate::linear_algebra::solve_linear_system;

/// Newton-Raphson root finder.
///
/// Iterates `x_{k+1} = x_k - J(x_k)^{-1} f(x_k)` with a fresh Jacobian at
/// every step and no line search. A singular Jacobian aborts the solve with
/// [`MathError::SingularMatrix`]; exhausting `max_steps` aborts with
/// [`MathError::ConvergenceFailed`] carrying the last residual norm.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewtonVectorRootFinder {
    config: VectorSolverConfig,
    finite_difference: FiniteDifferenceConfig,
}

impl NewtonVectorRootFinder {
    /// Creates a Newton solver.
    #[must_use]
    pub fn new(config: VectorSolverConfig, finite_difference: FiniteDifferenceConfig) -> Self {
        Self {
            config,
            finite_difference,
        }
    }

    /// Returns the solver configuration.
    #[must_use]
    pub fn config(&self) -> &VectorSolverConfig {
        &self.config
    }
}

impl VectorRootFinder for NewtonVectorRootFinder {
    fn finite_difference(&self) -> &FiniteDifferenceConfig {
        &self.finite_difference
    }

    fn solve_with_jacobian<F, J, E>(
        &self,
        f: &F,
        jacobian: &J,
        x0: &DVector<f64>,
    ) -> Result<VectorRootResult, E>
    where
        F: Fn(&DVector<f64>) -> Result<DVector<f64>, E> + Sync,
        J: Fn(&DVector<f64>) -> Result<DMatrix<f64>, E>,
        E: From<MathError> + Send,
    {
        let mut x = x0.clone();
        let mut fx = evaluate(f, &x)?;
        let initial_norm = fx.norm();

        for iteration in 0..=self.config.max_steps {
            let norm = fx.norm();
            trace!("newton step {iteration}: residual norm {norm:.3e}");

            if self.config.is_converged(norm, initial_norm) {
                debug!(
                    "newton converged in {iteration} steps, residual norm {norm:.3e}, n = {}",
                    x.len()
                );
                return Ok(VectorRootResult {
                    root: x,
                    residual: fx,
                    residual_norm: norm,
                    iterations: iteration,
                });
            }
            if iteration == self.config.max_steps {
                break;
            }

            let jac = jacobian(&x)?;
            if jac.shape() != (fx.len(), x.len()) {
                return Err(MathError::dimension_mismatch(jac.shape(), (fx.len(), x.len())).into());
            }
            let step = solve_linear_system(&jac, &fx)?;
            x -= step;
            fx = evaluate(f, &x)?;
        }

        let norm = fx.norm();
        debug!(
            "newton failed after {} steps, residual norm {norm:.3e}",
            self.config.max_steps
        );
        Err(MathError::convergence_failed(self.config.max_steps, norm).into())
    }
}
