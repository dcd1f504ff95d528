//! Linear interpolation.

use crate::error::MathResult;
use crate::interpolation::{check_range, find_segment, validate_nodes, Interpolator};

/// Linear interpolation between data points.
///
/// # Example
///
/// ```rust
/// use curvebuild_math::interpolation::{LinearInterpolator, Interpolator};
///
/// let xs = vec![0.0, 1.0, 2.0, 3.0];
/// let ys = vec![0.0, 1.0, 4.0, 9.0];
///
/// let interp = LinearInterpolator::new(xs, ys).unwrap();
/// let y = interp.interpolate(1.5).unwrap();
/// assert!((y - 2.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    allow_extrapolation: bool,
}

impl LinearInterpolator {
    /// Creates a new linear interpolator.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than 2 points, lengths differ,
    /// values are non-finite or xs are not strictly increasing.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> MathResult<Self> {
        validate_nodes(&xs, &ys, 2)?;
        Ok(Self {
            xs,
            ys,
            allow_extrapolation: false,
        })
    }

    /// Enables extrapolation beyond the data range.
    #[must_use]
    pub fn with_extrapolation(mut self) -> Self {
        self.allow_extrapolation = true;
        self
    }

    /// Segment index and the weight on its right node.
    fn segment_weight(&self, x: f64) -> (usize, f64) {
        let i = find_segment(&self.xs, x);
        let t = (x - self.xs[i]) / (self.xs[i + 1] - self.xs[i]);
        (i, t)
    }
}

impl Interpolator for LinearInterpolator {
    fn interpolate(&self, x: f64) -> MathResult<f64> {
        check_range(&self.xs, x, self.allow_extrapolation)?;
        let (i, t) = self.segment_weight(x);
        Ok(self.ys[i] + t * (self.ys[i + 1] - self.ys[i]))
    }

    fn derivative(&self, x: f64) -> MathResult<f64> {
        check_range(&self.xs, x, self.allow_extrapolation)?;
        let i = find_segment(&self.xs, x);
        Ok((self.ys[i + 1] - self.ys[i]) / (self.xs[i + 1] - self.xs[i]))
    }

    fn node_weights(&self, x: f64) -> MathResult<Vec<f64>> {
        check_range(&self.xs, x, self.allow_extrapolation)?;
        let (i, t) = self.segment_weight(x);
        let mut weights = vec![0.0; self.ys.len()];
        weights[i] = 1.0 - t;
        weights[i + 1] = t;
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
