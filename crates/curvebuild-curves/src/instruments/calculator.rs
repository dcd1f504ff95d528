//! Pricing of the reference instruments.
//!
//! # Formulas
//!
//! ```text
//! Deposit / FRA:  F = (P(s) / P(e) - 1) / tau,          par spread = F - K
//! Swaps:          N = sum_j Pd(e_j) * (Pf(s_j) / Pf(e_j) - 1)
//!                 A = sum_i tau_i * Pd(e_i),            par spread = N / A - K
//! ZCIS:           R = I(T) / I0,                        par spread = R^(1/T) - 1 - K
//! ```
//!
//! Deposits read the discount curve of their currency, FRAs and swaps
//! project on the index curve and discount on the currency curve, and the
//! inflation swap projects on the price index curve.

use super::{schedule, RateInstrument};
use crate::calculator::{ParSpreadCalculator, ParSpreadSensitivityCalculator};
use crate::error::CurveResult;
use crate::provider::{CurveProvider, ParameterizedCurve};
use crate::sensitivity::ParameterSensitivity;
use crate::traits::Curve;

/// Calculator for [`RateInstrument`]s with analytic sensitivities.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateInstrumentCalculator;

/// Both legs of a fixed vs floating swap per unit notional.
struct SwapLegs {
    annuity: f64,
    float_value: f64,
}

impl SwapLegs {
    fn price(
        discount: &dyn Curve,
        forward: &dyn Curve,
        fixed: &[(f64, f64)],
        float: &[(f64, f64)],
    ) -> CurveResult<Self> {
        let mut annuity = 0.0;
        for &(s, e) in fixed {
            annuity += (e - s) * discount.discount_factor(e)?;
        }
        let mut float_value = 0.0;
        for &(s, e) in float {
            let growth = forward.discount_factor(s)? / forward.discount_factor(e)?;
            float_value += discount.discount_factor(e)? * (growth - 1.0);
        }
        Ok(Self {
            annuity,
            float_value,
        })
    }

    fn par_rate(&self) -> f64 {
        self.float_value / self.annuity
    }
}

fn simple_forward(curve: &dyn Curve, start: f64, end: f64) -> CurveResult<f64> {
    curve.forward_rate(start, end)
}

fn forward_sensitivity(
    curve: &ParameterizedCurve,
    start: f64,
    end: f64,
    result: &mut ParameterSensitivity,
) -> CurveResult<()> {
    let c = curve.curve();
    let tau = end - start;
    let ps = c.discount_factor(start)?;
    let pe = c.discount_factor(end)?;
    result.add_scaled(
        curve.name(),
        &c.discount_factor_sensitivity(start)?,
        1.0 / (tau * pe),
    )?;
    result.add_scaled(
        curve.name(),
        &c.discount_factor_sensitivity(end)?,
        -ps / (tau * pe * pe),
    )
}

fn swap_sensitivity(
    discount: &ParameterizedCurve,
    forward: &ParameterizedCurve,
    fixed: &[(f64, f64)],
    float: &[(f64, f64)],
    result: &mut ParameterSensitivity,
) -> CurveResult<()> {
    let dsc = discount.curve();
    let fwd = forward.curve();
    let legs = SwapLegs::price(dsc, fwd, fixed, float)?;
    let a = legs.annuity;
    let n = legs.float_value;

    // dN / A
    for &(s, e) in float {
        let pd = dsc.discount_factor(e)?;
        let pfs = fwd.discount_factor(s)?;
        let pfe = fwd.discount_factor(e)?;
        result.add_scaled(
            discount.name(),
            &dsc.discount_factor_sensitivity(e)?,
            (pfs / pfe - 1.0) / a,
        )?;
        result.add_scaled(
            forward.name(),
            &fwd.discount_factor_sensitivity(s)?,
            pd / (pfe * a),
        )?;
        result.add_scaled(
            forward.name(),
            &fwd.discount_factor_sensitivity(e)?,
            -pd * pfs / (pfe * pfe * a),
        )?;
    }

    // -N dA / A^2
    for &(s, e) in fixed {
        result.add_scaled(
            discount.name(),
            &dsc.discount_factor_sensitivity(e)?,
            -n * (e - s) / (a * a),
        )?;
    }
    Ok(())
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut unique: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}

impl ParSpreadCalculator<RateInstrument> for RateInstrumentCalculator {
    fn par_spread(&self, instrument: &RateInstrument, curves: &CurveProvider) -> CurveResult<f64> {
        instrument.validate()?;
        match instrument {
            RateInstrument::Deposit {
                currency,
                start,
                end,
                rate,
            } => {
                let dsc = curves.discount_curve(currency)?.curve();
                Ok(simple_forward(dsc, *start, *end)? - rate)
            }
            RateInstrument::Fra {
                index,
                start,
                end,
                rate,
                ..
            } => {
                let fwd = curves.forward_curve(index)?.curve();
                Ok(simple_forward(fwd, *start, *end)? - rate)
            }
            RateInstrument::OvernightSwap {
                currency,
                index,
                start,
                end,
                fixed_frequency,
                rate,
            } => {
                let dsc = curves.discount_curve(currency)?.curve();
                let fwd = curves.forward_curve(index)?.curve();
                let periods = schedule(*start, *end, *fixed_frequency);
                Ok(SwapLegs::price(dsc, fwd, &periods, &periods)?.par_rate() - rate)
            }
            RateInstrument::IborSwap {
                currency,
                index,
                start,
                end,
                fixed_frequency,
                float_frequency,
                rate,
            } => {
                let dsc = curves.discount_curve(currency)?.curve();
                let fwd = curves.forward_curve(index)?.curve();
                let fixed = schedule(*start, *end, *fixed_frequency);
                let float = schedule(*start, *end, *float_frequency);
                Ok(SwapLegs::price(dsc, fwd, &fixed, &float)?.par_rate() - rate)
            }
            RateInstrument::ZeroCouponInflationSwap {
                index,
                maturity,
                base_index,
                rate,
                ..
            } => {
                let cpi = curves.price_index_curve(index)?.curve();
                let ratio = cpi.index_level(*maturity)? / base_index;
                Ok(ratio.powf(1.0 / maturity) - 1.0 - rate)
            }
        }
    }

    fn present_value(
        &self,
        instrument: &RateInstrument,
        curves: &CurveProvider,
    ) -> CurveResult<f64> {
        instrument.validate()?;
        match instrument {
            RateInstrument::Deposit {
                currency,
                start,
                end,
                rate,
            } => {
                let dsc = curves.discount_curve(currency)?.curve();
                Ok(dsc.discount_factor(*end)? * (1.0 + rate * (end - start))
                    - dsc.discount_factor(*start)?)
            }
            RateInstrument::Fra {
                currency,
                index,
                start,
                end,
                rate,
            } => {
                let dsc = curves.discount_curve(currency)?.curve();
                let fwd = curves.forward_curve(index)?.curve();
                let forward = simple_forward(fwd, *start, *end)?;
                Ok(dsc.discount_factor(*end)? * (end - start) * (forward - rate))
            }
            RateInstrument::OvernightSwap {
                currency,
                index,
                start,
                end,
                fixed_frequency,
                rate,
            } => {
                let dsc = curves.discount_curve(currency)?.curve();
                let fwd = curves.forward_curve(index)?.curve();
                let periods = schedule(*start, *end, *fixed_frequency);
                let legs = SwapLegs::price(dsc, fwd, &periods, &periods)?;
                Ok(legs.float_value - rate * legs.annuity)
            }
            RateInstrument::IborSwap {
                currency,
                index,
                start,
                end,
                fixed_frequency,
                float_frequency,
                rate,
            } => {
                let dsc = curves.discount_curve(currency)?.curve();
                let fwd = curves.forward_curve(index)?.curve();
                let fixed = schedule(*start, *end, *fixed_frequency);
                let float = schedule(*start, *end, *float_frequency);
                let legs = SwapLegs::price(dsc, fwd, &fixed, &float)?;
                Ok(legs.float_value - rate * legs.annuity)
            }
            RateInstrument::ZeroCouponInflationSwap {
                currency,
                index,
                maturity,
                base_index,
                rate,
            } => {
                let dsc = curves.discount_curve(currency)?.curve();
                let cpi = curves.price_index_curve(index)?.curve();
                let ratio = cpi.index_level(*maturity)? / base_index;
                Ok(dsc.discount_factor(*maturity)? * (ratio - (1.0 + rate).powf(*maturity)))
            }
        }
    }

    fn curve_dependencies(
        &self,
        instrument: &RateInstrument,
        curves: &CurveProvider,
    ) -> CurveResult<Vec<String>> {
        let names = match instrument {
            RateInstrument::Deposit { currency, .. } => {
                vec![curves.discount_curve(currency)?.name().to_string()]
            }
            RateInstrument::Fra {
                currency, index, ..
            }
            | RateInstrument::OvernightSwap {
                currency, index, ..
            }
            | RateInstrument::IborSwap {
                currency, index, ..
            } => vec![
                curves.discount_curve(currency)?.name().to_string(),
                curves.forward_curve(index)?.name().to_string(),
            ],
            RateInstrument::ZeroCouponInflationSwap {
                currency, index, ..
            } => vec![
                curves.discount_curve(currency)?.name().to_string(),
                curves.price_index_curve(index)?.name().to_string(),
            ],
        };
        Ok(dedup(names))
    }

    fn pillar_time(&self, instrument: &RateInstrument) -> f64 {
        instrument.maturity()
    }

    fn label(&self, instrument: &RateInstrument) -> String {
        instrument.label()
    }
}

impl ParSpreadSensitivityCalculator<RateInstrument> for RateInstrumentCalculator {
    fn par_spread_sensitivity(
        &self,
        instrument: &RateInstrument,
        curves: &CurveProvider,
    ) -> CurveResult<ParameterSensitivity> {
        instrument.validate()?;
        let mut result = ParameterSensitivity::new();
        match instrument {
            RateInstrument::Deposit {
                currency,
                start,
                end,
                ..
            } => {
                let dsc = curves.discount_curve(currency)?;
                forward_sensitivity(dsc, *start, *end, &mut result)?;
            }
            RateInstrument::Fra {
                index, start, end, ..
            } => {
                let fwd = curves.forward_curve(index)?;
                forward_sensitivity(fwd, *start, *end, &mut result)?;
            }
            RateInstrument::OvernightSwap {
                currency,
                index,
                start,
                end,
                fixed_frequency,
                ..
            } => {
                let periods = schedule(*start, *end, *fixed_frequency);
                swap_sensitivity(
                    curves.discount_curve(currency)?,
                    curves.forward_curve(index)?,
                    &periods,
                    &periods,
                    &mut result,
                )?;
            }
            RateInstrument::IborSwap {
                currency,
                index,
                start,
                end,
                fixed_frequency,
                float_frequency,
                ..
            } => {
                swap_sensitivity(
                    curves.discount_curve(currency)?,
                    curves.forward_curve(index)?,
                    &schedule(*start, *end, *fixed_frequency),
                    &schedule(*start, *end, *float_frequency),
                    &mut result,
                )?;
            }
            RateInstrument::ZeroCouponInflationSwap {
                index,
                maturity,
                base_index,
                ..
            } => {
                let cpi = curves.price_index_curve(index)?;
                let ratio = cpi.curve().index_level(*maturity)? / base_index;
                let weight = ratio.powf(1.0 / maturity - 1.0) / (maturity * base_index);
                result.add_scaled(
                    cpi.name(),
                    &cpi.curve().value_sensitivity(*maturity)?,
                    weight,
                )?;
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::calculator::FiniteDifferenceSensitivity;
    use crate::generators::{CurveGenerator, InterpolatedGenerator};
    use crate::interpolation::InterpolationMethod;
    use crate::keys::{Currency, CurveRole, PriceIndex, RateIndex};
    use crate::value_type::CurveValueType;
    use approx::assert_relative_eq;
    use curvebuild_math::solvers::FiniteDifferenceConfig;

    fn curve(name: &str, value_type: CurveValueType, times: &[f64], values: &[f64]) -> ParameterizedCurve {
        let generator: Arc<dyn CurveGenerator> = Arc::new(
            InterpolatedGenerator::new(value_type, InterpolationMethod::Linear)
                .with_node_times(times.to_vec()),
        );
        ParameterizedCurve::new(name, generator, values.to_vec()).unwrap()
    }

    fn market() -> CurveProvider {
        let times = [0.5, 1.0, 2.0, 5.0];
        CurveProvider::new()
            .with_curve(curve("dsc", CurveValueType::ZeroRate, &times, &[0.02, 0.022, 0.025, 0.03]))
            .with_curve(curve("fwd", CurveValueType::ZeroRate, &times, &[0.025, 0.027, 0.03, 0.034]))
            .with_curve(curve(
                "cpi",
                CurveValueType::PriceIndex,
                &[1.0, 5.0],
                &[102.0, 111.0],
            ))
            .with_role(&CurveRole::Discounting(Currency::new("USD")), "dsc")
            .unwrap()
            .with_role(&CurveRole::Forward(RateIndex::new("USD-FEDFUND")), "dsc")
            .unwrap()
            .with_role(&CurveRole::Forward(RateIndex::new("USD-LIBOR-3M")), "fwd")
            .unwrap()
            .with_role(&CurveRole::PriceIndex(PriceIndex::new("US-CPI")), "cpi")
            .unwrap()
    }

    fn instruments() -> Vec<RateInstrument> {
        let usd = Currency::new("USD");
        let ff = RateIndex::new("USD-FEDFUND");
        let l3m = RateIndex::new("USD-LIBOR-3M");
        vec![
            RateInstrument::deposit(usd.clone(), 0.0, 0.75, 0.02),
            RateInstrument::fra(usd.clone(), l3m.clone(), 0.5, 0.75, 0.026),
            RateInstrument::overnight_swap(usd.clone(), ff, 0.0, 3.0, 1, 0.025),
            RateInstrument::ibor_swap(usd.clone(), l3m, 0.0, 4.0, 1, 4, 0.03),
            RateInstrument::zero_coupon_inflation_swap(usd, PriceIndex::new("US-CPI"), 4.0, 100.0, 0.022),
        ]
    }

    #[test]
    fn test_deposit_par_spread() {
        let curves = market();
        let dsc = curves.curve("dsc").unwrap().curve();
        let deposit = RateInstrument::deposit(Currency::new("USD"), 0.0, 1.0, 0.01);
        let expected = (1.0 / dsc.discount_factor(1.0).unwrap() - 1.0) - 0.01;
        let spread = RateInstrumentCalculator.par_spread(&deposit, &curves).unwrap();
        assert_relative_eq!(spread, expected, epsilon = 1e-14);
    }

    #[test]
    fn test_par_spread_zero_means_zero_pv() {
        let curves = market();
        for instrument in instruments() {
            let spread = RateInstrumentCalculator.par_spread(&instrument, &curves).unwrap();
            let at_par = instrument.with_quote(instrument.quote() + spread);
            let pv = RateInstrumentCalculator.present_value(&at_par, &curves).unwrap();
            assert!(pv.abs() < 1e-12, "{}: pv {pv}", instrument.label());
        }
    }

    #[test]
    fn test_ois_single_curve_telescopes() {
        let curves = market();
        let dsc = curves.curve("dsc").unwrap().curve();
        let ois = RateInstrument::overnight_swap(
            Currency::new("USD"),
            RateIndex::new("USD-FEDFUND"),
            0.0,
            3.0,
            1,
            0.0,
        );
        let annuity: f64 = (1..=3)
            .map(|i| dsc.discount_factor(f64::from(i)).unwrap())
            .sum();
        let expected = (1.0 - dsc.discount_factor(3.0).unwrap()) / annuity;
        let spread = RateInstrumentCalculator.par_spread(&ois, &curves).unwrap();
        assert_relative_eq!(spread, expected, epsilon = 1e-14);
    }

    #[test]
    fn test_dependencies() {
        let curves = market();
        let deps: Vec<Vec<String>> = instruments()
            .iter()
            .map(|i| RateInstrumentCalculator.curve_dependencies(i, &curves).unwrap())
            .collect();
        assert_eq!(deps[0], vec!["dsc"]);
        assert_eq!(deps[1], vec!["dsc", "fwd"]);
        assert_eq!(deps[2], vec!["dsc"]);
        assert_eq!(deps[4], vec!["dsc", "cpi"]);

        let missing = RateInstrument::deposit(Currency::new("EUR"), 0.0, 1.0, 0.01);
        assert!(RateInstrumentCalculator
            .curve_dependencies(&missing, &curves)
            .is_err());
    }

    #[test]
    fn test_analytic_matches_finite_difference() {
        let curves = market();
        let fd = FiniteDifferenceSensitivity::new(
            RateInstrumentCalculator,
            FiniteDifferenceConfig::default(),
        );
        for instrument in instruments() {
            let analytic = RateInstrumentCalculator
                .par_spread_sensitivity(&instrument, &curves)
                .unwrap();
            let bumped = fd.par_spread_sensitivity(&instrument, &curves).unwrap();
            for (name, expected) in bumped.iter() {
                match analytic.get(name) {
                    Some(actual) => {
                        for (a, e) in actual.iter().zip(expected.iter()) {
                            assert!(
                                (a - e).abs() < 1e-7,
                                "{} wrt {name}: {a} vs {e}",
                                instrument.label()
                            );
                        }
                    }
                    None => assert!(expected.amax() < 1e-10, "{} wrt {name}", instrument.label()),
                }
            }
        }
    }

    #[test]
    fn test_invalid_instrument_rejected() {
        let curves = market();
        let bad = RateInstrument::deposit(Currency::new("USD"), 2.0, 1.0, 0.01);
        assert!(RateInstrumentCalculator.par_spread(&bad, &curves).is_err());
    }
}
