//! Benchmarks for multi-curve calibration.
//!
//! Run with: cargo bench -p curvebuild-curves

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use curvebuild_curves::prelude::*;

// =============================================================================
// MARKET DATA
// =============================================================================

fn usd() -> Currency {
    Currency::new("USD")
}

fn generator() -> Arc<dyn CurveGenerator> {
    Arc::new(InterpolatedGenerator::new(
        CurveValueType::ZeroRate,
        InterpolationMethod::Linear,
    ))
}

fn discount_bundle(maturities: &[f64]) -> SingleCurveBundle<RateInstrument> {
    let instruments: Vec<RateInstrument> = maturities
        .iter()
        .map(|&t| {
            RateInstrument::overnight_swap(usd(), RateIndex::new("USD-SOFR"), 0.0, t, 1, 0.03 + 0.001 * t.sqrt())
        })
        .collect();
    let guess = InitialGuess::Rates(vec![0.03; instruments.len()]);
    SingleCurveBundle::new("USD-SOFR", instruments, guess, generator())
        .with_role(CurveRole::Discounting(usd()))
        .with_role(CurveRole::Forward(RateIndex::new("USD-SOFR")))
}

fn forward_bundle(maturities: &[f64]) -> SingleCurveBundle<RateInstrument> {
    let index = RateIndex::new("USD-TERM-3M");
    let instruments: Vec<RateInstrument> = maturities
        .iter()
        .map(|&t| RateInstrument::ibor_swap(usd(), index.clone(), 0.0, t, 1, 4, 0.035 + 0.001 * t.sqrt()))
        .collect();
    let guess = InitialGuess::Rates(vec![0.035; instruments.len()]);
    SingleCurveBundle::new("USD-TERM-3M", instruments, guess, generator())
        .with_role(CurveRole::Forward(index))
}

fn two_blocks(maturities: &[f64]) -> Vec<CalibrationBlock<RateInstrument>> {
    vec![
        CalibrationBlock::new().with_unit(vec![discount_bundle(maturities)]),
        CalibrationBlock::new().with_unit(vec![forward_bundle(maturities)]),
    ]
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_two_block_calibration(c: &mut Criterion) {
    let mut group = c.benchmark_group("two_block_calibration");
    let repository = CurveBuildingRepository::default();
    let known = CurveProvider::new();
    let known_bundle = CurveBuildingBlockBundle::new();

    for maturities in [
        vec![1.0, 2.0, 5.0, 10.0],
        vec![1.0, 2.0, 3.0, 5.0, 7.0, 10.0, 15.0, 20.0, 30.0],
    ] {
        let blocks = two_blocks(&maturities);

        group.bench_with_input(
            BenchmarkId::new("finite_difference", maturities.len()),
            &blocks,
            |b, blocks| {
                b.iter(|| {
                    repository
                        .calibrate(
                            black_box(blocks),
                            &known,
                            &known_bundle,
                            &RateInstrumentCalculator,
                            None,
                        )
                        .unwrap()
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("analytic", maturities.len()),
            &blocks,
            |b, blocks| {
                b.iter(|| {
                    repository
                        .calibrate(
                            black_box(blocks),
                            &known,
                            &known_bundle,
                            &RateInstrumentCalculator,
                            Some(&RateInstrumentCalculator),
                        )
                        .unwrap()
                })
            },
        );
    }

    group.finish();
}

fn bench_joint_unit(c: &mut Criterion) {
    let maturities = [1.0, 2.0, 3.0, 5.0, 7.0, 10.0];
    let blocks = vec![CalibrationBlock::new()
        .with_unit(vec![discount_bundle(&maturities), forward_bundle(&maturities)])];
    let repository = CurveBuildingRepository::default();

    c.bench_function("joint_unit_analytic", |b| {
        b.iter(|| {
            repository
                .calibrate(
                    black_box(&blocks),
                    &CurveProvider::new(),
                    &CurveBuildingBlockBundle::new(),
                    &RateInstrumentCalculator,
                    Some(&RateInstrumentCalculator),
                )
                .unwrap()
        })
    });
}

criterion_group!(calibration, bench_two_block_calibration, bench_joint_unit);
criterion_main!(calibration);
