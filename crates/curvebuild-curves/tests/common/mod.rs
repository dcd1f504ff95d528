//! Shared market data for the calibration tests.
//!
//! | Curve          | Roles                           | Instruments                     |
//! |----------------|---------------------------------|---------------------------------|
//! | USD-OIS        | discounting USD, USD-FEDFUND    | OIS 1Y 2Y 3Y 5Y 10Y             |
//! | USD-LIBOR-3M   | USD-LIBOR-3M                    | FRA 0x3 3x6 6x9 9x12, IRS 2Y-10Y |

#![allow(dead_code)]

use std::sync::Arc;

use curvebuild_curves::prelude::*;

pub const OIS: &str = "USD-OIS";
pub const LIBOR: &str = "USD-LIBOR-3M";

pub fn usd() -> Currency {
    Currency::new("USD")
}

pub fn fedfund() -> RateIndex {
    RateIndex::new("USD-FEDFUND")
}

pub fn libor_3m() -> RateIndex {
    RateIndex::new("USD-LIBOR-3M")
}

pub fn zero_rate_generator() -> Arc<dyn CurveGenerator> {
    Arc::new(InterpolatedGenerator::new(
        CurveValueType::ZeroRate,
        InterpolationMethod::Linear,
    ))
}

pub const OIS_QUOTES: [(f64, f64); 5] = [
    (1.0, 0.0300),
    (2.0, 0.0310),
    (3.0, 0.0320),
    (5.0, 0.0330),
    (10.0, 0.0340),
];

pub const FRA_QUOTES: [(f64, f64, f64); 4] = [
    (0.0, 0.25, 0.0340),
    (0.25, 0.5, 0.0350),
    (0.5, 0.75, 0.0355),
    (0.75, 1.0, 0.0360),
];

pub const IRS_QUOTES: [(f64, f64); 4] = [(2.0, 0.0370), (3.0, 0.0380), (5.0, 0.0390), (10.0, 0.0400)];

pub fn ois_instruments(bump: Option<(usize, f64)>) -> Vec<RateInstrument> {
    OIS_QUOTES
        .iter()
        .enumerate()
        .map(|(i, &(t, r))| {
            let shift = bump.filter(|(k, _)| *k == i).map_or(0.0, |(_, e)| e);
            RateInstrument::overnight_swap(usd(), fedfund(), 0.0, t, 1, r + shift)
        })
        .collect()
}

pub fn libor_instruments(bump: Option<(usize, f64)>) -> Vec<RateInstrument> {
    let fras = FRA_QUOTES
        .iter()
        .map(|&(s, e, r)| RateInstrument::fra(usd(), libor_3m(), s, e, r));
    let swaps = IRS_QUOTES
        .iter()
        .map(|&(t, r)| RateInstrument::ibor_swap(usd(), libor_3m(), 0.0, t, 1, 4, r));
    fras.chain(swaps)
        .enumerate()
        .map(|(i, instrument)| match bump {
            Some((k, e)) if k == i => instrument.with_quote(instrument.quote() + e),
            _ => instrument,
        })
        .collect()
}

pub fn ois_bundle(bump: Option<(usize, f64)>) -> SingleCurveBundle<RateInstrument> {
    let instruments = ois_instruments(bump);
    let guess = InitialGuess::Rates(vec![0.03; instruments.len()]);
    SingleCurveBundle::new(OIS, instruments, guess, zero_rate_generator())
        .with_role(CurveRole::Discounting(usd()))
        .with_role(CurveRole::Forward(fedfund()))
}

pub fn libor_bundle(bump: Option<(usize, f64)>) -> SingleCurveBundle<RateInstrument> {
    let instruments = libor_instruments(bump);
    let guess = InitialGuess::Rates(vec![0.035; instruments.len()]);
    SingleCurveBundle::new(LIBOR, instruments, guess, zero_rate_generator())
        .with_role(CurveRole::Forward(libor_3m()))
}

/// Discounting in block 0, projection in block 1.
pub fn two_blocks(
    ois_bump: Option<(usize, f64)>,
    libor_bump: Option<(usize, f64)>,
) -> Vec<CalibrationBlock<RateInstrument>> {
    vec![
        CalibrationBlock::new().with_unit(vec![ois_bundle(ois_bump)]),
        CalibrationBlock::new().with_unit(vec![libor_bundle(libor_bump)]),
    ]
}

/// Both curves in one unit.
pub fn joint_block() -> Vec<CalibrationBlock<RateInstrument>> {
    vec![CalibrationBlock::new().with_unit(vec![ois_bundle(None), libor_bundle(None)])]
}

pub fn tight_config() -> CalibrationConfig {
    CalibrationConfig::default()
        .with_absolute_tolerance(1e-13)
        .with_relative_tolerance(1e-13)
}

pub fn calibrate(
    blocks: &[CalibrationBlock<RateInstrument>],
    config: CalibrationConfig,
    analytic: bool,
) -> CurveResult<CalibrationOutcome> {
    let analytic_calculator: &dyn ParSpreadSensitivityCalculator<RateInstrument> =
        &RateInstrumentCalculator;
    let sensitivity = analytic.then_some(analytic_calculator);
    CurveBuildingRepository::new(config).calibrate(
        blocks,
        &CurveProvider::new(),
        &CurveBuildingBlockBundle::new(),
        &RateInstrumentCalculator,
        sensitivity,
    )
}

pub fn parameters(outcome: &CalibrationOutcome, name: &str) -> Vec<f64> {
    outcome
        .provider()
        .curve(name)
        .map(|c| c.parameters().to_vec())
        .unwrap_or_default()
}

/// A 7Y swap off the calibration grid.
pub fn off_market_swap() -> RateInstrument {
    RateInstrument::ibor_swap(usd(), libor_3m(), 0.5, 7.0, 1, 4, 0.045)
}
