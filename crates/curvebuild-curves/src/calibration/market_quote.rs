//! Sensitivities to calibration market quotes.
//!
//! A sensitivity to curve parameters `dV/dP` becomes a sensitivity to the
//! quotes of every instrument the curve was calibrated from, directly or
//! through its dependencies, by the chain rule:
//!
//! ```text
//! dV/dq = sum over curves c of  transition(c)^T * dV/dP_c
//! ```
//!
//! Curves without a Jacobian record are exogenous inputs and keep their
//! parameter sensitivity unchanged.

use curvebuild_math::solvers::FiniteDifferenceConfig;

use super::building_block::CurveBuildingBlockBundle;
use crate::calculator::{
    FiniteDifferenceSensitivity, ParSpreadCalculator, ParSpreadSensitivityCalculator,
};
use crate::error::{CurveError, CurveResult};
use crate::provider::CurveProvider;
use crate::sensitivity::ParameterSensitivity;

/// Converts parameter sensitivities into market quote sensitivities.
#[derive(Debug, Clone, Copy)]
pub struct MarketQuoteSensitivityCalculator<'a> {
    bundle: &'a CurveBuildingBlockBundle,
}

impl<'a> MarketQuoteSensitivityCalculator<'a> {
    /// Creates a calculator over the records of a calibration.
    #[must_use]
    pub fn new(bundle: &'a CurveBuildingBlockBundle) -> Self {
        Self { bundle }
    }

    /// Applies the transition matrices to `sensitivity`.
    pub fn from_parameter_sensitivity(
        &self,
        sensitivity: &ParameterSensitivity,
    ) -> CurveResult<ParameterSensitivity> {
        let mut result = ParameterSensitivity::new();
        for (name, values) in sensitivity.iter() {
            let Some(record) = self.bundle.get(name) else {
                result.add(name, values)?;
                continue;
            };
            if values.len() != record.size() {
                return Err(CurveError::invalid_value(format!(
                    "sensitivity to '{name}' has {} entries, curve has {} parameters",
                    values.len(),
                    record.size()
                )));
            }
            let quotes = record.transition().tr_mul(values);
            for (input, start, count) in record.input_layout().iter() {
                let slice: Vec<f64> = quotes.rows(start, count).iter().copied().collect();
                result.add_scaled(input, &slice, 1.0)?;
            }
        }
        Ok(result)
    }

    /// d par_spread / d market quotes, from analytic parameter sensitivities.
    pub fn par_spread_sensitivity<I>(
        &self,
        instrument: &I,
        curves: &CurveProvider,
        sensitivity: &dyn ParSpreadSensitivityCalculator<I>,
    ) -> CurveResult<ParameterSensitivity> {
        let parameters = sensitivity.par_spread_sensitivity(instrument, curves)?;
        self.from_parameter_sensitivity(&parameters)
    }

    /// d present_value / d market quotes, bumping curve parameters.
    pub fn present_value_sensitivity<I, C>(
        &self,
        instrument: &I,
        curves: &CurveProvider,
        calculator: &C,
        config: FiniteDifferenceConfig,
    ) -> CurveResult<ParameterSensitivity>
    where
        C: ParSpreadCalculator<I>,
    {
        let parameters = FiniteDifferenceSensitivity::new(calculator, config)
            .present_value_sensitivity(instrument, curves)?;
        self.from_parameter_sensitivity(&parameters)
    }
}
