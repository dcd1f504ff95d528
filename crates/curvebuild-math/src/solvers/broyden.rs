//! Broyden's method for square systems.

use log::{debug, trace};
use nalgebra::{DMatrix, DVector};

use super::{evaluate, FiniteDifferenceConfig, VectorRootFinder, VectorRootResult, VectorSolverConfig};
use crate::error::MathError;
use crate::linear_algebra::invert;

/// Broyden root finder with inverse-Jacobian updates.
///
/// The Jacobian is evaluated and inverted at the starting point; later steps
/// apply the Sherman-Morrison rank-one update to the inverse. When an update
/// denominator collapses the Jacobian is re-evaluated at the current point.
#[derive(Debug, Clone, Copy, Default)]
pub struct BroydenVectorRootFinder {
    config: VectorSolverConfig,
    finite_difference: FiniteDifferenceConfig,
}

impl BroydenVectorRootFinder {
    /// Creates a Broyden solver.
    #[must_use]
    pub fn new(config: VectorSolverConfig, finite_difference: FiniteDifferenceConfig) -> Self {
        Self {
            config,
            finite_difference,
        }
    }
}

impl VectorRootFinder for BroydenVectorRootFinder {
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
        let mut inverse: Option<DMatrix<f64>> = None;

        for iteration in 0..=self.config.max_steps {
            let norm = fx.norm();
            trace!("broyden step {iteration}: residual norm {norm:.3e}");

            if self.config.is_converged(norm, initial_norm) {
                debug!("broyden converged in {iteration} steps, residual norm {norm:.3e}");
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

            let j_inv = match inverse.take() {
                Some(m) => m,
                None => {
                    let jac = jacobian(&x)?;
                    if jac.shape() != (fx.len(), x.len()) {
                        return Err(
                            MathError::dimension_mismatch(jac.shape(), (fx.len(), x.len())).into()
                        );
                    }
                    invert(&jac)?
                }
            };

            let dx = -(&j_inv * &fx);
            x += &dx;
            let f_new = evaluate(f, &x)?;
            let df = &f_new - &fx;
            fx = f_new;

            let u = &j_inv * &df;
            let denominator = dx.dot(&u);
            if denominator.abs() <= f64::EPSILON * dx.norm() * u.norm() || !denominator.is_finite()
            {
                trace!("broyden update degenerate, refreshing jacobian");
                continue;
            }
            let correction = (&dx - &u) * (dx.transpose() * &j_inv) / denominator;
            inverse = Some(j_inv + correction);
        }

        let norm = fx.norm();
        debug!(
            "broyden failed after {} steps, residual norm {norm:.3e}",
            self.config.max_steps
        );
        Err(MathError::convergence_failed(self.config.max_steps, norm).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn system(v: &DVector<f64>) -> Result<DVector<f64>, MathError> {
        Ok(DVector::from_vec(vec![
            v[0] + 0.1 * v[1] * v[1] - 1.0,
            v[1] + 0.1 * v[0] * v[0] - 2.0,
        ]))
    }

    #[test]
    fn test_broyden_matches_newton() {
        let x0 = DVector::from_vec(vec![0.0, 0.0]);
        let broyden = BroydenVectorRootFinder::default().solve(&system, &x0).unwrap();
        let newton = super::super::NewtonVectorRootFinder::default()
            .solve(&system, &x0)
            .unwrap();

        assert_relative_eq!(broyden.root[0], newton.root[0], epsilon = 1e-9);
        assert_relative_eq!(broyden.root[1], newton.root[1], epsilon = 1e-9);
        assert!(broyden.residual_norm <= 1e-10);
    }

    #[test]
    fn test_broyden_linear_system_exact_first_step() {
        let f = |v: &DVector<f64>| -> Result<DVector<f64>, MathError> {
            Ok(DVector::from_vec(vec![3.0 * v[0] - 1.0, 4.0 * v[1] + 2.0]))
        };
        let result = BroydenVectorRootFinder::default()
            .solve(&f, &DVector::zeros(2))
            .unwrap();
        assert_relative_eq!(result.root[0], 1.0 / 3.0, epsilon = 1e-10);
        assert_relative_eq!(result.root[1], -0.5, epsilon = 1e-10);
    }

    #[test]
    fn test_broyden_singular_start() {
        let f = |v: &DVector<f64>| -> Result<DVector<f64>, MathError> {
            let s = v[0] + v[1];
            Ok(DVector::from_vec(vec![s - 1.0, s - 2.0]))
        };
        let result = BroydenVectorRootFinder::default().solve(&f, &DVector::zeros(2));
        assert!(matches!(result, Err(MathError::SingularMatrix { .. })));
    }
}
