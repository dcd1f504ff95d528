//! Dense linear algebra for calibration systems.
//!
//! Calibration Jacobians are small and dense. Solves go through a partially
//! pivoted LU factorisation; a factorisation whose smallest pivot is
//! negligible against the largest is reported as [`MathError::SingularMatrix`]
//! instead of being allowed to produce huge or NaN steps.

use nalgebra::{linalg::LU, DMatrix, DVector, Dyn};

use crate::error::{MathError, MathResult};

/// Relative pivot size below which a matrix is treated as singular.
pub const SINGULARITY_THRESHOLD: f64 = 1e-13;

/// Factorises a square matrix, rejecting singular or non-finite input.
///
/// # Errors
///
/// Returns `DimensionMismatch` for non-square input, `NonFinite` for NaN or
/// infinite entries and `SingularMatrix` for a negligible pivot.
pub fn lu_decomposition(a: &DMatrix<f64>) -> MathResult<LU<f64, Dyn, Dyn>> {
    if !a.is_square() {
        return Err(MathError::dimension_mismatch(a.shape(), a.shape()));
    }
    if a.iter().any(|v| !v.is_finite()) {
        return Err(MathError::non_finite("matrix entries"));
    }
    if a.is_empty() {
        return Err(MathError::insufficient_data(1, 0));
    }

    let lu = a.clone().lu();
    let u = lu.u();
    let diagonal = u.diagonal();
    let largest = diagonal.iter().fold(0.0_f64, |m, p| m.max(p.abs()));

    for (column, &pivot) in diagonal.iter().enumerate() {
        if pivot == 0.0 || pivot.abs() <= SINGULARITY_THRESHOLD * largest {
            return Err(MathError::singular_matrix(column, pivot));
        }
    }

    Ok(lu)
}

/// Solves Ax = b.
pub fn solve_linear_system(a: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
    if a.nrows() != b.len() {
        return Err(MathError::dimension_mismatch(a.shape(), (b.len(), 1)));
    }
    let lu = lu_decomposition(a)?;
    let x = lu
        .solve(b)
        .ok_or_else(|| MathError::singular_matrix(a.ncols(), 0.0))?;
    check_finite(x.iter(), "linear solve")?;
    Ok(x)
}

/// Solves AX = B for a matrix of right-hand sides.
pub fn solve_matrix(a: &DMatrix<f64>, b: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
    if a.nrows() != b.nrows() {
        return Err(MathError::dimension_mismatch(a.shape(), b.shape()));
    }
    let lu = lu_decomposition(a)?;
    let x = lu
        .solve(b)
        .ok_or_else(|| MathError::singular_matrix(a.ncols(), 0.0))?;
    check_finite(x.iter(), "linear solve")?;
    Ok(x)
}

/// Inverts a square matrix.
pub fn invert(a: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
    let lu = lu_decomposition(a)?;
    let inverse = lu
        .try_inverse()
        .ok_or_else(|| MathError::singular_matrix(a.ncols(), 0.0))?;
    check_finite(inverse.iter(), "matrix inverse")?;
    Ok(inverse)
}

fn check_finite<'a>(mut values: impl Iterator<Item = &'a f64>, context: &str) -> MathResult<()> {
    if values.any(|v| !v.is_finite()) {
        return Err(MathError::non_finite(context));
    }
    Ok(())
}
