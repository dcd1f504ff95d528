//! Log-linear interpolation.
//!
//! Interpolates the logarithm of values, which keeps discount factors and
//! index levels positive and yields piecewise constant forward rates.

use crate::error::{MathError, MathResult};
use crate::interpolation::{check_range, find_segment, validate_nodes, Interpolator};

/// Log-linear interpolation between data points.
///
/// ```text
/// y(x) = exp(linear_interpolate(x, ln(y)))
/// ```
///
/// # Example
///
/// ```rust
/// use curvebuild_math::interpolation::{LogLinearInterpolator, Interpolator};
///
/// let times = vec![0.0, 1.0, 2.0, 3.0];
/// let discount_factors = vec![1.0, 0.97, 0.94, 0.91];
///
/// let interp = LogLinearInterpolator::new(times, discount_factors).unwrap();
/// let df = interp.interpolate(1.5).unwrap();
/// assert!(df > 0.94 && df < 0.97);
/// ```
#[derive(Debug, Clone)]
pub struct LogLinearInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Precomputed log(y) values
    log_ys: Vec<f64>,
    allow_extrapolation: bool,
}

impl LogLinearInterpolator {
    /// Creates a new log-linear interpolator.
    ///
    /// # Errors
    ///
    /// Returns an error if the node layout is invalid or any y value is
    /// non-positive.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> MathResult<Self> {
        validate_nodes(&xs, &ys, 2)?;

        let mut log_ys = Vec::with_capacity(ys.len());
        for (i, &y) in ys.iter().enumerate() {
            if y <= 0.0 {
                return Err(MathError::invalid_input(format!(
                    "y[{i}] = {y} is not positive; log-linear requires positive values"
                )));
            }
            log_ys.push(y.ln());
        }

        Ok(Self {
            xs,
            ys,
            log_ys,
            allow_extrapolation: false,
        })
    }

    /// Enables extrapolation beyond the data range.
    #[must_use]
    pub fn with_extrapolation(mut self) -> Self {
        self.allow_extrapolation = true;
        self
    }

    /// Returns the original y values.
    #[must_use]
    pub fn y_values(&self) -> &[f64] {
        &self.ys
    }

    fn segment_weight(&self, x: f64) -> (usize, f64) {
        let i = find_segment(&self.xs, x);
        let t = (x - self.xs[i]) / (self.xs[i + 1] - self.xs[i]);
        (i, t)
    }
}

impl Interpolator for LogLinearInterpolator {
    fn interpolate(&self, x: f64) -> MathResult<f64> {
        check_range(&self.xs, x, self.allow_extrapolation)?;
        let (i, t) = self.segment_weight(x);
        let log_y = self.log_ys[i] + t * (self.log_ys[i + 1] - self.log_ys[i]);
        Ok(log_y.exp())
    }

    fn derivative(&self, x: f64) -> MathResult<f64> {
        // dy/dx = y * d(ln y)/dx
        let y = self.interpolate(x)?;
        let i = find_segment(&self.xs, x);
        let slope = (self.log_ys[i + 1] - self.log_ys[i]) / (self.xs[i + 1] - self.xs[i]);
        Ok(y * slope)
    }

    fn node_weights(&self, x: f64) -> MathResult<Vec<f64>> {
        let y = self.interpolate(x)?;
        let (i, t) = self.segment_weight(x);
        let mut weights = vec![0.0; self.ys.len()];
        weights[i] = y * (1.0 - t) / self.ys[i];
        weights[i + 1] = y * t / self.ys[i + 1];
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
