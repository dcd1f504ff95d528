//! Finite-difference Jacobians.

use nalgebra::{DMatrix, DVector};

use crate::error::MathError;

/// Default relative bump applied to each parameter.
pub const DEFAULT_RELATIVE_BUMP: f64 = 1e-6;

/// Difference scheme for numerical derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DifferenceScheme {
    /// (f(x + h) - f(x)) / h
    Forward,
    /// (f(x + h) - f(x - h)) / 2h
    #[default]
    Central,
}

/// Configuration for finite-difference derivatives.
///
/// The absolute step for parameter `x` is `relative_bump * max(|x|, 1)`: a
/// rate near zero is bumped by `relative_bump`, an index level near 200 by
/// `200 * relative_bump`.
#[derive(Debug, Clone, Copy)]
pub struct FiniteDifferenceConfig {
    /// Relative bump size.
    pub relative_bump: f64,
    /// Difference scheme.
    pub scheme: DifferenceScheme,
}

impl Default for FiniteDifferenceConfig {
    fn default() -> Self {
        Self {
            relative_bump: DEFAULT_RELATIVE_BUMP,
            scheme: DifferenceScheme::Central,
        }
    }
}

impl FiniteDifferenceConfig {
    /// Creates a configuration.
    #[must_use]
    pub fn new(relative_bump: f64, scheme: DifferenceScheme) -> Self {
        Self {
            relative_bump,
            scheme,
        }
    }

    /// Sets the relative bump.
    #[must_use]
    pub fn with_relative_bump(mut self, relative_bump: f64) -> Self {
        self.relative_bump = relative_bump;
        self
    }

    /// Sets the difference scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: DifferenceScheme) -> Self {
        self.scheme = scheme;
        self
    }

    /// Absolute step for a parameter value.
    #[must_use]
    pub fn step(&self, x: f64) -> f64 {
        self.relative_bump * x.abs().max(1.0)
    }

    /// Combines bumped evaluations into a derivative.
    ///
    /// `down` is the unbumped value for the forward scheme.
    #[must_use]
    pub fn derivative(&self, up: f64, down: f64, h: f64) -> f64 {
        match self.scheme {
            DifferenceScheme::Forward => (up - down) / h,
            DifferenceScheme::Central => (up - down) / (2.0 * h),
        }
    }
}

/// Estimates the Jacobian of `f` at `x`, one column per parameter.
///
/// With the `parallel` feature, columns are evaluated on the rayon pool.
/// Each column is an independent evaluation, so the result does not depend on
/// the feature.
pub fn finite_difference_jacobian<F, E>(
    f: &F,
    x: &DVector<f64>,
    config: &FiniteDifferenceConfig,
) -> Result<DMatrix<f64>, E>
where
    F: Fn(&DVector<f64>) -> Result<DVector<f64>, E> + Sync,
    E: From<MathError> + Send,
{
    if config.relative_bump <= 0.0 || !config.relative_bump.is_finite() {
        return Err(MathError::invalid_input(format!(
            "relative bump must be positive, got {}",
            config.relative_bump
        ))
        .into());
    }

    let base = match config.scheme {
        DifferenceScheme::Forward => Some(f(x)?),
        DifferenceScheme::Central => None,
    };

    let column = |j: usize| -> Result<DVector<f64>, E> {
        let h = config.step(x[j]);
        let mut up = x.clone();
        up[j] += h;
        let f_up = f(&up)?;
        let f_down = match &base {
            Some(f0) => f0.clone(),
            None => {
                let mut down = x.clone();
                down[j] -= h;
                f(&down)?
            }
        };
        if f_up.len() != f_down.len() {
            return Err(MathError::dimension_mismatch((f_up.len(), 1), (f_down.len(), 1)).into());
        }
        Ok(DVector::from_iterator(
            f_up.len(),
            f_up.iter()
                .zip(f_down.iter())
                .map(|(u, d)| config.derivative(*u, *d, h)),
        ))
    };

    #[cfg(feature = "parallel")]
    let columns: Vec<DVector<f64>> = {
        use rayon::prelude::*;
        (0..x.len())
            .into_par_iter()
            .map(column)
            .collect::<Result<_, E>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let columns: Vec<DVector<f64>> = (0..x.len()).map(column).collect::<Result<_, E>>()?;

    let rows = columns.first().map_or(0, |c| c.len());
    if columns.iter().any(|c| c.len() != rows) {
        return Err(MathError::invalid_input("residual length changed between evaluations").into());
    }
    Ok(DMatrix::from_fn(rows, x.len(), |i, j| columns[j][i]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn system(v: &DVector<f64>) -> Result<DVector<f64>, MathError> {
        Ok(DVector::from_vec(vec![
            v[0] * v[0] * v[1],
            v[0].exp() + 3.0 * v[1],
            v[1].sin(),
        ]))
    }

    #[test]
    fn test_central_jacobian() {
        let x = DVector::from_vec(vec![0.5, 2.0]);
        let jac = finite_difference_jacobian(&system, &x, &FiniteDifferenceConfig::default())
            .unwrap();

        assert_eq!(jac.shape(), (3, 2));
        assert_relative_eq!(jac[(0, 0)], 2.0 * 0.5 * 2.0, epsilon = 1e-8);
        assert_relative_eq!(jac[(0, 1)], 0.25, epsilon = 1e-8);
        assert_relative_eq!(jac[(1, 0)], 0.5_f64.exp(), epsilon = 1e-8);
        assert_relative_eq!(jac[(1, 1)], 3.0, epsilon = 1e-8);
        assert_relative_eq!(jac[(2, 0)], 0.0, epsilon = 1e-12);
        assert_relative_eq!(jac[(2, 1)], 2.0_f64.cos(), epsilon = 1e-8);
    }

    #[test]
    fn test_forward_jacobian() {
        let x = DVector::from_vec(vec![0.5, 2.0]);
        let config = FiniteDifferenceConfig::default().with_scheme(DifferenceScheme::Forward);
        let jac = finite_difference_jacobian(&system, &x, &config).unwrap();
        assert_relative_eq!(jac[(1, 1)], 3.0, epsilon = 1e-6);
        assert_relative_eq!(jac[(0, 0)], 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_step_scales_with_magnitude() {
        let config = FiniteDifferenceConfig::default();
        assert_relative_eq!(config.step(0.03), 1e-6);
        assert_relative_eq!(config.step(-200.0), 2e-4);
    }

    #[test]
    fn test_rejects_bad_bump() {
        let x = DVector::from_vec(vec![0.5, 2.0]);
        let config = FiniteDifferenceConfig::default().with_relative_bump(0.0);
        assert!(finite_difference_jacobian(&system, &x, &config).is_err());
    }
}
