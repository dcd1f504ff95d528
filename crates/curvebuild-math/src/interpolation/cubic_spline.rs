//! Natural cubic spline interpolation.

use crate::error::MathResult;
use crate::interpolation::{check_range, find_segment, validate_nodes, Interpolator};

/// Natural cubic spline interpolation.
///
/// Piecewise cubic polynomials with continuous first and second derivatives;
/// the second derivative is zero at both endpoints.
///
/// The second derivatives are a linear function of the node values, so the
/// spline keeps that linear map (`y2_weights`) to answer
/// [`Interpolator::node_weights`] without re-solving the system.
///
/// # Example
///
/// ```rust
/// use curvebuild_math::interpolation::{CubicSpline, Interpolator};
///
/// let xs = vec![0.0, 1.0, 2.0, 3.0];
/// let ys = vec![0.0, 1.0, 4.0, 9.0];
///
/// let spline = CubicSpline::new(xs, ys).unwrap();
/// let y = spline.interpolate(1.5).unwrap();
/// assert!(y > 1.0 && y < 4.0);
/// ```
#[derive(Debug, Clone)]
pub struct CubicSpline {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at each knot
    y2s: Vec<f64>,
    /// y2_weights[k][j] = d y2s[j] / d ys[k]
    y2_weights: Vec<Vec<f64>>,
    allow_extrapolation: bool,
}

impl CubicSpline {
    /// Creates a natural cubic spline interpolator.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than 3 points or the node layout
    /// is invalid.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> MathResult<Self> {
        validate_nodes(&xs, &ys, 3)?;

        let y2s = compute_second_derivatives(&xs, &ys);
        let y2_weights = (0..ys.len())
            .map(|k| {
                let mut unit = vec![0.0; ys.len()];
                unit[k] = 1.0;
                compute_second_derivatives(&xs, &unit)
            })
            .collect();

        Ok(Self {
            xs,
            ys,
            y2s,
            y2_weights,
            allow_extrapolation: false,
        })
    }

    /// Enables extrapolation beyond the data range.
    #[must_use]
    pub fn with_extrapolation(mut self) -> Self {
        self.allow_extrapolation = true;
        self
    }

    /// Segment index, width and the two barycentric coordinates.
    fn locate(&self, x: f64) -> (usize, f64, f64, f64) {
        let i = find_segment(&self.xs, x);
        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - x) / h;
        let b = (x - self.xs[i]) / h;
        (i, h, a, b)
    }
}

impl Interpolator for CubicSpline {
    fn interpolate(&self, x: f64) -> MathResult<f64> {
        check_range(&self.xs, x, self.allow_extrapolation)?;
        let (i, h, a, b) = self.locate(x);

        let y = a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a * a * a - a) * self.y2s[i] + (b * b * b - b) * self.y2s[i + 1]) * (h * h) / 6.0;
        Ok(y)
    }

    fn derivative(&self, x: f64) -> MathResult<f64> {
        check_range(&self.xs, x, self.allow_extrapolation)?;
        let (i, h, a, b) = self.locate(x);

        let dy = (self.ys[i + 1] - self.ys[i]) / h
            - (3.0 * a * a - 1.0) / 6.0 * h * self.y2s[i]
            + (3.0 * b * b - 1.0) / 6.0 * h * self.y2s[i + 1];
        Ok(dy)
    }

    fn node_weights(&self, x: f64) -> MathResult<Vec<f64>> {
        check_range(&self.xs, x, self.allow_extrapolation)?;
        let (i, h, a, b) = self.locate(x);
        let c_lo = (a * a * a - a) * (h * h) / 6.0;
        let c_hi = (b * b * b - b) * (h * h) / 6.0;

        let weights = self
            .y2_weights
            .iter()
            .enumerate()
            .map(|(k, y2k)| {
                let direct = if k == i {
                    a
                } else if k == i + 1 {
                    b
                } else {
                    0.0
                };
                direct + c_lo * y2k[i] + c_hi * y2k[i + 1]
            })
            .collect();
        Ok(weights)
    }

    fn allows_extrapolation(&self) -> bool {
        self.allow_extrapolation
    }

    fn min_x(&self) -> f64 {
        self.xs[0]
    }

    fn max_x(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }
}

/// Computes the second derivatives for a natural cubic spline.
fn compute_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut y2s = vec![0.0; n];
    let mut u = vec![0.0; n - 1];

    // Decomposition loop
    for i in 1..n - 1 {
        let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
        let p = sig * y2s[i - 1] + 2.0;
        y2s[i] = (sig - 1.0) / p;
        u[i] = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
            - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
        u[i] = (6.0 * u[i] / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
    }

    // Natural end condition, then back-substitution
    y2s[n - 1] = 0.0;
    for i in (0..n - 1).rev() {
        y2s[i] = y2s[i] * y2s[i + 1] + u[i];
    }

    y2s
}
