//! Pluggable residual and sensitivity calculators.
//!
//! The calibration engine never prices anything itself. It asks a
//! [`ParSpreadCalculator`] for the par spread of each instrument against a
//! trial [`CurveProvider`], and optionally asks a
//! [`ParSpreadSensitivityCalculator`] for analytic derivatives of those par
//! spreads with respect to curve parameters.
//!
//! The par spread must be `implied - quote`: it is zero at calibration and
//! moves one-for-one (with opposite sign) with the market quote. The Jacobian
//! bundle relies on this to turn parameter sensitivities into market quote
//! sensitivities.

use curvebuild_math::solvers::{DifferenceScheme, FiniteDifferenceConfig};

use crate::error::CurveResult;
use crate::provider::CurveProvider;
use crate::sensitivity::ParameterSensitivity;

/// Par spread and present value of calibration instruments.
pub trait ParSpreadCalculator<I>: Send + Sync {
    /// Par spread (implied rate minus market quote) against `curves`.
    fn par_spread(&self, instrument: &I, curves: &CurveProvider) -> CurveResult<f64>;

    /// Present value per unit notional against `curves`.
    fn present_value(&self, instrument: &I, curves: &CurveProvider) -> CurveResult<f64>;

    /// Names of every curve the instrument reads, resolved through `curves`.
    ///
    /// Must fail with `UnresolvableDependency` if a needed curve is missing.
    fn curve_dependencies(&self, instrument: &I, curves: &CurveProvider) -> CurveResult<Vec<String>>;

    /// Time used to place curve nodes for this instrument.
    fn pillar_time(&self, instrument: &I) -> f64;

    /// Short description for reports and logs.
    fn label(&self, instrument: &I) -> String;
}

impl<I, C: ParSpreadCalculator<I> + ?Sized> ParSpreadCalculator<I> for &C {
    fn par_spread(&self, instrument: &I, curves: &CurveProvider) -> CurveResult<f64> {
        (**self).par_spread(instrument, curves)
    }

    fn present_value(&self, instrument: &I, curves: &CurveProvider) -> CurveResult<f64> {
        (**self).present_value(instrument, curves)
    }

    fn curve_dependencies(&self, instrument: &I, curves: &CurveProvider) -> CurveResult<Vec<String>> {
        (**self).curve_dependencies(instrument, curves)
    }

    fn pillar_time(&self, instrument: &I) -> f64 {
        (**self).pillar_time(instrument)
    }

    fn label(&self, instrument: &I) -> String {
        (**self).label(instrument)
    }
}

/// Analytic derivatives of par spreads with respect to curve parameters.
pub trait ParSpreadSensitivityCalculator<I>: Send + Sync {
    /// d par_spread / d parameters, for each curve the instrument reads.
    fn par_spread_sensitivity(
        &self,
        instrument: &I,
        curves: &CurveProvider,
    ) -> CurveResult<ParameterSensitivity>;
}

/// Sensitivities by bumping curve parameters in the provider.
///
/// Works with any [`ParSpreadCalculator`]. Every parameter of every curve the
/// instrument depends on is bumped independently with the configured
/// relative step.
#[derive(Debug, Clone, Copy)]
pub struct FiniteDifferenceSensitivity<C> {
    calculator: C,
    config: FiniteDifferenceConfig,
}

impl<C> FiniteDifferenceSensitivity<C> {
    /// Wraps a calculator.
    pub fn new(calculator: C, config: FiniteDifferenceConfig) -> Self {
        Self { calculator, config }
    }

    /// d present_value / d parameters.
    pub fn present_value_sensitivity<I>(
        &self,
        instrument: &I,
        curves: &CurveProvider,
    ) -> CurveResult<ParameterSensitivity>
    where
        C: ParSpreadCalculator<I>,
    {
        let names = self.calculator.curve_dependencies(instrument, curves)?;
        bumped_gradient(curves, &names, &self.config, |p| {
            self.calculator.present_value(instrument, p)
        })
    }
}

impl<I, C: ParSpreadCalculator<I>> ParSpreadSensitivityCalculator<I>
    for FiniteDifferenceSensitivity<C>
{
    fn par_spread_sensitivity(
        &self,
        instrument: &I,
        curves: &CurveProvider,
    ) -> CurveResult<ParameterSensitivity> {
        let names = self.calculator.curve_dependencies(instrument, curves)?;
        bumped_gradient(curves, &names, &self.config, |p| {
            self.calculator.par_spread(instrument, p)
        })
    }
}

fn bumped_gradient(
    curves: &CurveProvider,
    names: &[String],
    config: &FiniteDifferenceConfig,
    f: impl Fn(&CurveProvider) -> CurveResult<f64>,
) -> CurveResult<ParameterSensitivity> {
    let base = match config.scheme {
        DifferenceScheme::Forward => Some(f(curves)?),
        DifferenceScheme::Central => None,
    };

    let mut result = ParameterSensitivity::new();
    for name in names {
        let parameters = curves.curve(name)?.parameters().to_vec();
        let mut gradient = Vec::with_capacity(parameters.len());
        for (j, &p) in parameters.iter().enumerate() {
            let h = config.step(p);
            let mut up = parameters.clone();
            up[j] += h;
            let f_up = f(&curves.with_parameters(name, up)?)?;
            let f_down = match base {
                Some(f0) => f0,
                None => {
                    let mut down = parameters.clone();
                    down[j] -= h;
                    f(&curves.with_parameters(name, down)?)?
                }
            };
            gradient.push(config.derivative(f_up, f_down, h));
        }
        result.add_scaled(name, &gradient, 1.0)?;
    }
    Ok(result)
}
