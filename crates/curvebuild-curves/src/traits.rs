//! Core trait for calibrated curves.
//!
//! A [`Curve`] is an immutable function of time built from a parameter
//! vector. Besides values it reports the sensitivity of each value to its own
//! parameters, which is what analytic calibration Jacobians are made of.

use std::fmt;

use crate::error::{CurveError, CurveResult};
use crate::value_type::CurveValueType;

/// The core trait for curves.
///
/// # Required Methods
///
/// - [`value`](Curve::value) and [`value_sensitivity`](Curve::value_sensitivity):
///   the stored quantity and its gradient with respect to the parameters
/// - [`value_type`](Curve::value_type) and [`parameter_count`](Curve::parameter_count)
///
/// # Derived Methods
///
/// Discount factors, zero rates and forwards are derived for rate curves;
/// index levels for price index curves. Asking a price index curve for a
/// discount factor (or the reverse) is an error.
pub trait Curve: Send + Sync + fmt::Debug {
    /// What the stored values represent.
    fn value_type(&self) -> CurveValueType;

    /// Returns the stored value at time `t`.
    fn value(&self, t: f64) -> CurveResult<f64>;

    /// Number of parameters the curve was built from.
    fn parameter_count(&self) -> usize;

    /// Returns d value(t) / d parameters.
    fn value_sensitivity(&self, t: f64) -> CurveResult<Vec<f64>>;

    /// Returns the discount factor to time `t`; 1.0 for t <= 0.
    fn discount_factor(&self, t: f64) -> CurveResult<f64> {
        if t <= 0.0 {
            return Ok(1.0);
        }
        match self.value_type() {
            CurveValueType::ZeroRate => Ok((-self.value(t)? * t).exp()),
            CurveValueType::DiscountFactor => self.value(t),
            CurveValueType::PriceIndex => Err(not_a_rate_curve()),
        }
    }

    /// Returns d discount_factor(t) / d parameters.
    fn discount_factor_sensitivity(&self, t: f64) -> CurveResult<Vec<f64>> {
        if t <= 0.0 {
            return Ok(vec![0.0; self.parameter_count()]);
        }
        match self.value_type() {
            CurveValueType::ZeroRate => {
                let df = self.discount_factor(t)?;
                Ok(self
                    .value_sensitivity(t)?
                    .into_iter()
                    .map(|dz| -t * df * dz)
                    .collect())
            }
            CurveValueType::DiscountFactor => self.value_sensitivity(t),
            CurveValueType::PriceIndex => Err(not_a_rate_curve()),
        }
    }

    /// Returns the continuously compounded zero rate at time `t`.
    fn zero_rate(&self, t: f64) -> CurveResult<f64> {
        if self.value_type() == CurveValueType::ZeroRate {
            return self.value(t);
        }
        if t <= 0.0 {
            return Err(CurveError::invalid_value(format!(
                "zero rate undefined at t = {t} for a discount factor curve"
            )));
        }
        Ok(-self.discount_factor(t)?.ln() / t)
    }

    /// Returns the simply-compounded forward rate between `t1` and `t2`.
    ///
    /// `F(t1, t2) = (DF(t1) / DF(t2) - 1) / (t2 - t1)`
    fn forward_rate(&self, t1: f64, t2: f64) -> CurveResult<f64> {
        if t2 <= t1 {
            return Err(CurveError::invalid_value(format!(
                "forward period must be positive: [{t1}, {t2}]"
            )));
        }
        let df1 = self.discount_factor(t1)?;
        let df2 = self.discount_factor(t2)?;
        Ok((df1 / df2 - 1.0) / (t2 - t1))
    }

    /// Returns the projected index level at time `t`.
    fn index_level(&self, t: f64) -> CurveResult<f64> {
        match self.value_type() {
            CurveValueType::PriceIndex => self.value(t),
            other => Err(CurveError::invalid_value(format!(
                "{other} curve has no index level"
            ))),
        }
    }
}

fn not_a_rate_curve() -> CurveError {
    CurveError::invalid_value("price index curve has no discount factors")
}
