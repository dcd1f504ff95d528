//! Integration tests: calibration of single units, joint units and invalid
//! inputs.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use curvebuild_curves::prelude::*;

use common::*;

/// Counts par spread evaluations of the wrapped calculator.
struct CountingCalculator {
    calls: AtomicUsize,
}

impl ParSpreadCalculator<RateInstrument> for CountingCalculator {
    fn par_spread(&self, instrument: &RateInstrument, curves: &CurveProvider) -> CurveResult<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        RateInstrumentCalculator.par_spread(instrument, curves)
    }

    fn present_value(&self, instrument: &RateInstrument, curves: &CurveProvider) -> CurveResult<f64> {
        RateInstrumentCalculator.present_value(instrument, curves)
    }

    fn curve_dependencies(
        &self,
        instrument: &RateInstrument,
        curves: &CurveProvider,
    ) -> CurveResult<Vec<String>> {
        RateInstrumentCalculator.curve_dependencies(instrument, curves)
    }

    fn pillar_time(&self, instrument: &RateInstrument) -> f64 {
        RateInstrumentCalculator.pillar_time(instrument)
    }

    fn label(&self, instrument: &RateInstrument) -> String {
        RateInstrumentCalculator.label(instrument)
    }
}

#[test]
fn test_scenario_a_single_curve() {
    let instruments: Vec<RateInstrument> = [(1.0, 0.01), (2.0, 0.02), (3.0, 0.03)]
        .iter()
        .map(|&(t, r)| RateInstrument::deposit(usd(), 0.0, t, r))
        .collect();
    let bundle = SingleCurveBundle::new(
        "USD-DSC",
        instruments.clone(),
        InitialGuess::Rates(vec![0.02; 3]),
        zero_rate_generator(),
    )
    .with_role(CurveRole::Discounting(usd()));
    let outcome = calibrate(
        &[CalibrationBlock::new().with_unit(vec![bundle])],
        CalibrationConfig::default(),
        false,
    )
    .unwrap();

    let curve = outcome.provider().discount_curve(&usd()).unwrap();
    assert_eq!(curve.parameters().len(), 3);
    for instrument in &instruments {
        let spread = RateInstrumentCalculator
            .par_spread(instrument, outcome.provider())
            .unwrap();
        assert!(spread.abs() < 1e-9, "{}: {spread}", instrument.label());
    }

    // Simple deposits from 0: z(t) = ln(1 + r t) / t at each node.
    for (&(t, r), z) in [(1.0, 0.01), (2.0, 0.02), (3.0, 0.03)]
        .iter()
        .zip(curve.parameters())
    {
        assert_relative_eq!(*z, (1.0_f64 + r * t).ln() / t, epsilon = 1e-9);
    }

    let report = &outcome.reports()[0];
    assert_eq!(report.curves, vec!["USD-DSC".to_string()]);
    assert!(report.residual_norm <= 1e-10);
    assert!(outcome.repricing().is_valid());
    assert_eq!(outcome.repricing().total_count(), 3);
}

#[test]
fn test_scenario_b_joint_unit() {
    let outcome = calibrate(&joint_block(), CalibrationConfig::default(), false).unwrap();

    let ois = parameters(&outcome, OIS);
    let libor = parameters(&outcome, LIBOR);
    assert_eq!(ois.len() + libor.len(), 13);
    assert_eq!(outcome.reports().len(), 1);
    assert_eq!(outcome.reports()[0].curves.len(), 2);
    assert!(outcome.repricing().max_error() < 1e-9);

    let dsc_record = outcome.bundle().get(OIS).unwrap();
    let fwd_record = outcome.bundle().get(LIBOR).unwrap();

    // Each record covers both curves of the unit.
    let fwd_on_dsc = fwd_record.direct_sensitivity(OIS).unwrap();
    let dsc_on_fwd = dsc_record.direct_sensitivity(LIBOR).unwrap();
    assert_eq!(fwd_on_dsc.shape(), (8, 5));
    assert_eq!(dsc_on_fwd.shape(), (5, 8));
    assert!(fwd_on_dsc.amax() > 1e-3);

    assert_eq!(fwd_record.quote_sensitivity(OIS).unwrap().shape(), (8, 5));
    assert_eq!(dsc_record.quote_sensitivity(LIBOR).unwrap().shape(), (5, 8));
    assert_eq!(fwd_record.transition().shape(), (8, 13));
    assert_eq!(
        fwd_record.names().collect::<Vec<_>>(),
        vec![OIS, LIBOR]
    );
}

#[test]
fn test_scenario_c_mis_sized_guess() {
    let bad = SingleCurveBundle::new(
        LIBOR,
        libor_instruments(None),
        InitialGuess::Rates(vec![0.035; 7]),
        zero_rate_generator(),
    )
    .with_role(CurveRole::Forward(libor_3m()));
    let blocks = vec![
        CalibrationBlock::new().with_unit(vec![ois_bundle(None)]),
        CalibrationBlock::new().with_unit(vec![bad]),
    ];

    let calculator = CountingCalculator {
        calls: AtomicUsize::new(0),
    };
    let result = CurveBuildingRepository::default().calibrate(
        &blocks,
        &CurveProvider::new(),
        &CurveBuildingBlockBundle::new(),
        &calculator,
        None,
    );

    match result {
        Err(CurveError::MalformedBundle { curve, .. }) => assert_eq!(curve, LIBOR),
        other => panic!("expected a malformed bundle, got {other:?}"),
    }
    assert_eq!(calculator.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unresolvable_dependency() {
    // Projection curve without any discounting curve.
    let blocks = vec![CalibrationBlock::new().with_unit(vec![libor_bundle(None)])];
    let result = calibrate(&blocks, CalibrationConfig::default(), false);
    assert!(matches!(
        result,
        Err(CurveError::UnresolvableDependency { .. })
    ));
}

#[test]
fn test_analytic_and_bumped_jacobians_agree() {
    let bumped = calibrate(&two_blocks(None, None), CalibrationConfig::default(), false).unwrap();
    let analytic = calibrate(&two_blocks(None, None), CalibrationConfig::default(), true).unwrap();

    for name in [OIS, LIBOR] {
        let a = parameters(&analytic, name);
        let b = parameters(&bumped, name);
        for (x, y) in a.iter().zip(&b) {
            assert_relative_eq!(*x, *y, epsilon = 1e-9);
        }

        let ja = analytic.bundle().get(name).unwrap().direct_jacobian();
        let jb = bumped.bundle().get(name).unwrap().direct_jacobian();
        assert_eq!(ja.shape(), jb.shape());
        assert!((ja - jb).amax() < 1e-6, "{name}");
    }
}

#[test]
fn test_analytic_jacobian_with_upstream_discounting() {
    for method in [RootFinderMethod::Newton, RootFinderMethod::Broyden] {
        let outcome = calibrate(
            &two_blocks(None, None),
            CalibrationConfig::default().with_root_finder(method),
            true,
        )
        .unwrap();

        assert_eq!(outcome.reports().len(), 2);
        for report in outcome.reports() {
            assert!(report.residual_norm <= 1e-10, "{report}");
        }
        assert!(outcome.repricing().is_valid());

        // The projection record still sees its discounting columns.
        let record = outcome.bundle().get(LIBOR).unwrap();
        assert!(record.direct_sensitivity(OIS).unwrap().amax() > 0.0);
    }
}

#[test]
fn test_broyden_matches_newton() {
    let newton = calibrate(&joint_block(), CalibrationConfig::default(), false).unwrap();
    let broyden = calibrate(
        &joint_block(),
        CalibrationConfig::default().with_root_finder(RootFinderMethod::Broyden),
        false,
    )
    .unwrap();

    for name in [OIS, LIBOR] {
        for (x, y) in parameters(&newton, name).iter().zip(&parameters(&broyden, name)) {
            assert_relative_eq!(*x, *y, epsilon = 1e-8);
        }
    }
    assert!(broyden.repricing().is_valid());
}

#[test]
fn test_config_from_toml() {
    let config = CalibrationConfig::from_toml_str(
        r#"
        absolute_tolerance = 1e-12
        relative_tolerance = 1e-12
        max_steps = 40
        difference = "forward"
        "#,
    )
    .unwrap();
    let outcome = calibrate(&two_blocks(None, None), config, false).unwrap();
    assert!(outcome.reports().iter().all(|r| r.residual_norm <= 1e-12));
}

#[test]
fn test_non_convergence_aborts() {
    let config = CalibrationConfig::default().with_max_steps(1);
    let result = calibrate(&two_blocks(None, None), config, false);
    match result {
        Err(CurveError::NonConvergence { unit, .. }) => assert_eq!(unit, OIS),
        other => panic!("expected non-convergence, got {other:?}"),
    }
}

#[test]
fn test_singular_unit_aborts() {
    // Both deposits fix the 1Y node; nothing pins the 2Y node.
    let generator = Arc::new(
        InterpolatedGenerator::new(CurveValueType::ZeroRate, InterpolationMethod::Linear)
            .with_node_times(vec![1.0, 2.0]),
    );
    let bundle = SingleCurveBundle::new(
        "D",
        vec![
            RateInstrument::deposit(usd(), 0.0, 1.0, 0.010),
            RateInstrument::deposit(usd(), 0.0, 1.0, 0.012),
        ],
        InitialGuess::Parameters(vec![0.01; 2]),
        generator,
    )
    .with_role(CurveRole::Discounting(usd()));

    for analytic in [false, true] {
        let result = calibrate(
            &[CalibrationBlock::new().with_unit(vec![bundle.clone()])],
            CalibrationConfig::default(),
            analytic,
        );
        match result {
            Err(CurveError::SingularSystem { unit, .. }) => assert_eq!(unit, "D"),
            other => panic!("expected a singular system, got {other:?}"),
        }
    }
}

#[test]
fn test_discount_factor_curve() {
    let generator = Arc::new(InterpolatedGenerator::new(
        CurveValueType::DiscountFactor,
        InterpolationMethod::LogLinear,
    ));
    let bundle = SingleCurveBundle::new(
        OIS,
        ois_instruments(None),
        InitialGuess::Rates(vec![0.03; 5]),
        generator,
    )
    .with_role(CurveRole::Discounting(usd()))
    .with_role(CurveRole::Forward(fedfund()));
    let outcome = calibrate(
        &[CalibrationBlock::new().with_unit(vec![bundle])],
        CalibrationConfig::default(),
        true,
    )
    .unwrap();

    assert!(outcome.repricing().is_valid());
    let dfs = parameters(&outcome, OIS);
    assert!(dfs.windows(2).all(|w| w[1] < w[0]));
}
