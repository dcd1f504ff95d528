//! The curve building repository.
//!
//! Blocks are solved in order. Within a block, each unit is solved against
//! every curve known so far (the known provider, earlier blocks, earlier
//! units), then its curves and Jacobian records are folded into the context
//! used by the next unit.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use curvebuild_curves::prelude::*;
//!
//! let usd = Currency::new("USD");
//! let generator = Arc::new(InterpolatedGenerator::new(
//!     CurveValueType::DiscountFactor,
//!     InterpolationMethod::LogLinear,
//! ));
//! let deposits = vec![
//!     RateInstrument::deposit(usd.clone(), 0.0, 0.5, 0.030),
//!     RateInstrument::deposit(usd.clone(), 0.0, 1.0, 0.032),
//! ];
//! let bundle = SingleCurveBundle::new("USD-OIS", deposits, InitialGuess::Rates(vec![0.03; 2]), generator)
//!     .with_role(CurveRole::Discounting(usd.clone()));
//!
//! let repository = CurveBuildingRepository::new(CalibrationConfig::default().with_max_steps(50));
//! let outcome = repository
//!     .calibrate(
//!         &[CalibrationBlock::new().with_unit(vec![bundle])],
//!         &CurveProvider::new(),
//!         &CurveBuildingBlockBundle::new(),
//!         &RateInstrumentCalculator,
//!         Some(&RateInstrumentCalculator),
//!     )
//!     .unwrap();
//!
//! assert!(outcome.repricing().is_valid());
//! let record = outcome.bundle().get("USD-OIS").unwrap();
//! assert_eq!(record.transition().shape(), (2, 2));
//! ```

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, info_span, warn};

use curvebuild_math::solvers::{
    BroydenVectorRootFinder, NewtonVectorRootFinder, VectorRootFinder, VectorRootResult,
};

use super::building_block::{CurveBuildingBlockBundle, ParameterLayout};
use super::bundle::{CalibrationBlock, InitialGuess, SingleCurveBundle};
use super::context::{CalibrationContext, UnitReport};
use super::jacobian::{
    direct_layout, residual_jacobian, residuals, unit_building_blocks, unit_dependencies,
    UnitCurve,
};
use crate::calculator::{ParSpreadCalculator, ParSpreadSensitivityCalculator};
use crate::config::{CalibrationConfig, RootFinderMethod};
use crate::error::{CurveError, CurveResult};
use crate::provider::{CurveProvider, ParameterizedCurve};
use crate::repricing::RepricingReport;

/// Calibrated curves with their Jacobian records and diagnostics.
#[derive(Debug, Clone)]
pub struct CalibrationOutcome {
    provider: CurveProvider,
    bundle: CurveBuildingBlockBundle,
    reports: Vec<UnitReport>,
    repricing: RepricingReport,
}

impl CalibrationOutcome {
    /// Known and calibrated curves.
    #[must_use]
    pub fn provider(&self) -> &CurveProvider {
        &self.provider
    }

    /// Jacobian records of every calibrated (and known) curve.
    #[must_use]
    pub fn bundle(&self) -> &CurveBuildingBlockBundle {
        &self.bundle
    }

    /// One report per solved unit, in solve order.
    #[must_use]
    pub fn reports(&self) -> &[UnitReport] {
        &self.reports
    }

    /// Repricing of every calibration instrument.
    #[must_use]
    pub fn repricing(&self) -> &RepricingReport {
        &self.repricing
    }

    /// Splits into provider and bundle.
    #[must_use]
    pub fn into_parts(self) -> (CurveProvider, CurveBuildingBlockBundle) {
        (self.provider, self.bundle)
    }
}

/// Orchestrates the calibration of blocks of curve units.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurveBuildingRepository {
    config: CalibrationConfig,
}

impl CurveBuildingRepository {
    /// Creates a repository with the given configuration.
    #[must_use]
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    /// Configuration.
    #[must_use]
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Calibrates `blocks` in order on top of the known curves and records.
    ///
    /// Every block is validated before the first solve, so a malformed
    /// bundle anywhere fails the request without solving anything. Analytic
    /// sensitivities, when given, are used both for the Newton steps and for
    /// the Jacobian records; otherwise both are bumped.
    pub fn calibrate<I, C>(
        &self,
        blocks: &[CalibrationBlock<I>],
        known: &CurveProvider,
        known_bundle: &CurveBuildingBlockBundle,
        calculator: &C,
        sensitivity: Option<&dyn ParSpreadSensitivityCalculator<I>>,
    ) -> CurveResult<CalibrationOutcome>
    where
        I: Sync,
        C: ParSpreadCalculator<I>,
    {
        self.config.validate()?;
        for block in blocks {
            block.validate()?;
        }

        let mut context = CalibrationContext::new(known.clone(), known_bundle.clone());
        for (index, block) in blocks.iter().enumerate() {
            let span = info_span!("calibrate_block", block = index, units = block.units().len());
            let _guard = span.enter();
            context = self.calibrate_block(index, block, &context, calculator, sensitivity)?;
        }

        let repricing = RepricingReport::reprice(
            blocks,
            context.provider(),
            calculator,
            self.config.repricing_tolerance,
        )?;
        if repricing.is_valid() {
            info!(
                curves = context.provider().len(),
                max_error = repricing.max_error(),
                "calibration complete"
            );
        } else {
            warn!(
                failed = repricing.failed_count(),
                max_error = repricing.max_error(),
                tolerance = self.config.repricing_tolerance,
                "calibrated curves do not reprice their instruments"
            );
        }

        let (provider, bundle, reports) = context.into_parts();
        Ok(CalibrationOutcome {
            provider,
            bundle,
            reports,
            repricing,
        })
    }

    /// Solves the units of one block in order.
    pub fn calibrate_block<I, C>(
        &self,
        index: usize,
        block: &CalibrationBlock<I>,
        context: &CalibrationContext,
        calculator: &C,
        sensitivity: Option<&dyn ParSpreadSensitivityCalculator<I>>,
    ) -> CurveResult<CalibrationContext>
    where
        I: Sync,
        C: ParSpreadCalculator<I>,
    {
        block.validate()?;
        let mut context = context.clone();
        for (unit_index, unit) in block.units().iter().enumerate() {
            let bundles = block.unit_bundles(unit)?;
            context = self.calibrate_unit(
                (index, unit_index),
                &bundles,
                &context,
                calculator,
                sensitivity,
            )?;
        }
        Ok(context)
    }

    fn calibrate_unit<I, C>(
        &self,
        (block, unit): (usize, usize),
        bundles: &[&SingleCurveBundle<I>],
        context: &CalibrationContext,
        calculator: &C,
        sensitivity: Option<&dyn ParSpreadSensitivityCalculator<I>>,
    ) -> CurveResult<CalibrationContext>
    where
        I: Sync,
        C: ParSpreadCalculator<I>,
    {
        let label = bundles
            .iter()
            .map(|b| b.name())
            .collect::<Vec<_>>()
            .join(", ");

        // Unit curves at the initial guess, with their roles.
        let mut base = context.provider().clone();
        let mut layout = ParameterLayout::new();
        let mut guess = Vec::new();
        for bundle in bundles {
            let pillars: Vec<f64> = bundle
                .instruments()
                .iter()
                .map(|i| calculator.pillar_time(i))
                .collect();
            let generator = bundle.generator().final_generator(&pillars)?;
            let parameters = match bundle.initial_guess() {
                InitialGuess::Parameters(p) => p.clone(),
                InitialGuess::Rates(rates) => generator.initial_guess(rates)?,
            };
            let n = bundle.instrument_count();
            if parameters.len() != n || generator.parameter_count().is_some_and(|p| p != n) {
                return Err(CurveError::malformed_bundle(
                    bundle.name(),
                    format!(
                        "{} parameters for {n} instruments",
                        generator.parameter_count().unwrap_or(parameters.len())
                    ),
                ));
            }
            layout.push(bundle.name(), n)?;
            guess.extend_from_slice(&parameters);
            base = base.with_curve(ParameterizedCurve::new(
                bundle.name(),
                Arc::clone(&generator),
                parameters,
            )?);
        }
        for bundle in bundles {
            for role in bundle.roles() {
                base = base.with_role(role, bundle.name())?;
            }
        }

        let curves: Vec<UnitCurve<'_, I>> = bundles
            .iter()
            .map(|b| UnitCurve {
                name: b.name(),
                instruments: b.instruments(),
            })
            .collect();
        let dependencies = unit_dependencies(&curves, calculator, &base)?;
        let instruments: Vec<&I> = bundles.iter().flat_map(|b| b.instruments()).collect();
        let finite_difference = self.config.finite_difference();

        // The analytic gradient also covers the dependencies; the solver
        // only moves the unit columns at the end of the direct layout.
        let direct = direct_layout(&curves, &dependencies, &base)?;
        let unit_offset = direct.total() - layout.total();

        let (base, layout, direct, instruments) = (&base, &layout, &direct, &instruments[..]);
        let trial = move |x: &DVector<f64>| -> CurveResult<CurveProvider> {
            let mut provider = base.clone();
            for (name, start, count) in layout.iter() {
                provider = provider.with_parameters(name, x.rows(start, count).iter().copied().collect())?;
            }
            Ok(provider)
        };
        let residual = move |x: &DVector<f64>| residuals(instruments, calculator, &trial(x)?);
        let analytic = sensitivity.map(|s| {
            move |x: &DVector<f64>| -> CurveResult<DMatrix<f64>> {
                let full = residual_jacobian(
                    instruments,
                    calculator,
                    Some(s),
                    &trial(x)?,
                    direct,
                    &finite_difference,
                )?;
                Ok(full.columns(unit_offset, layout.total()).into_owned())
            }
        });

        debug!(
            unit = %label,
            parameters = guess.len(),
            dependencies = dependencies.len(),
            "solving unit"
        );
        let x0 = DVector::from_vec(guess);
        let solver_config = self.config.solver_config();
        let solved = match self.config.root_finder {
            RootFinderMethod::Newton => run(
                &NewtonVectorRootFinder::new(solver_config, finite_difference),
                &residual,
                analytic.as_ref(),
                &x0,
            ),
            RootFinderMethod::Broyden => run(
                &BroydenVectorRootFinder::new(solver_config, finite_difference),
                &residual,
                analytic.as_ref(),
                &x0,
            ),
        }
        .map_err(|e| e.in_unit(&label))?;

        let provider = trial(&solved.root)?;
        let records = unit_building_blocks(
            &curves,
            &dependencies,
            calculator,
            sensitivity,
            &provider,
            context.bundle(),
            &finite_difference,
        )
        .map_err(|e| e.in_unit(&label))?;

        debug!(
            unit = %label,
            iterations = solved.iterations,
            residual_norm = solved.residual_norm,
            "unit calibrated"
        );
        let report = UnitReport {
            block,
            unit,
            curves: bundles.iter().map(|b| b.name().to_string()).collect(),
            iterations: solved.iterations,
            residual_norm: solved.residual_norm,
        };
        Ok(context.extend(provider, records, report))
    }
}

fn run<S, F, J>(
    solver: &S,
    residual: &F,
    jacobian: Option<&J>,
    x0: &DVector<f64>,
) -> CurveResult<VectorRootResult>
where
    S: VectorRootFinder,
    F: Fn(&DVector<f64>) -> CurveResult<DVector<f64>> + Sync,
    J: Fn(&DVector<f64>) -> CurveResult<DMatrix<f64>>,
{
    match jacobian {
        Some(jacobian) => solver.solve_with_jacobian(residual, jacobian, x0),
        None => solver.solve(residual, x0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generators::InterpolatedGenerator;
    use crate::instruments::{RateInstrument, RateInstrumentCalculator};
    use crate::interpolation::InterpolationMethod;
    use crate::keys::{Currency, CurveRole};
    use crate::value_type::CurveValueType;

    fn deposits(rates: &[(f64, f64)]) -> Vec<RateInstrument> {
        rates
            .iter()
            .map(|&(t, r)| RateInstrument::deposit(Currency::new("USD"), 0.0, t, r))
            .collect()
    }

    fn block(rates: &[(f64, f64)], guess: InitialGuess) -> CalibrationBlock<RateInstrument> {
        let bundle = SingleCurveBundle::new(
            "USD-DSC",
            deposits(rates),
            guess,
            Arc::new(InterpolatedGenerator::new(
                CurveValueType::ZeroRate,
                InterpolationMethod::Linear,
            )),
        )
        .with_role(CurveRole::Discounting(Currency::new("USD")));
        CalibrationBlock::new().with_unit(vec![bundle])
    }

    #[test]
    fn test_single_unit() {
        let rates = [(1.0, 0.01), (2.0, 0.02), (3.0, 0.03)];
        let outcome = CurveBuildingRepository::default()
            .calibrate(
                &[block(&rates, InitialGuess::Rates(vec![0.02; 3]))],
                &CurveProvider::new(),
                &CurveBuildingBlockBundle::new(),
                &RateInstrumentCalculator,
                None,
            )
            .unwrap();

        assert_eq!(outcome.reports().len(), 1);
        assert!(outcome.repricing().is_valid());
        assert_eq!(outcome.bundle().len(), 1);
        assert_eq!(outcome.provider().curve("USD-DSC").unwrap().parameters().len(), 3);
    }

    #[test]
    fn test_parameter_guess_size_checked() {
        let rates = [(1.0, 0.01), (2.0, 0.02)];
        let result = CurveBuildingRepository::default().calibrate(
            &[block(&rates, InitialGuess::Parameters(vec![0.02]))],
            &CurveProvider::new(),
            &CurveBuildingBlockBundle::new(),
            &RateInstrumentCalculator,
            None,
        );
        assert!(matches!(result, Err(CurveError::MalformedBundle { .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let repository =
            CurveBuildingRepository::new(CalibrationConfig::default().with_max_steps(0));
        let result = repository.calibrate(
            &[block(&[(1.0, 0.01)], InitialGuess::Rates(vec![0.01]))],
            &CurveProvider::new(),
            &CurveBuildingBlockBundle::new(),
            &RateInstrumentCalculator,
            None,
        );
        assert!(matches!(result, Err(CurveError::InvalidConfig { .. })));
    }

    #[test]
    fn test_non_convergence_names_unit() {
        let repository =
            CurveBuildingRepository::new(CalibrationConfig::default().with_max_steps(1));
        let result = repository.calibrate(
            &[block(
                &[(1.0, 0.01), (2.0, 0.05), (3.0, 0.2)],
                InitialGuess::Rates(vec![0.5; 3]),
            )],
            &CurveProvider::new(),
            &CurveBuildingBlockBundle::new(),
            &RateInstrumentCalculator,
            None,
        );
        match result {
            Err(CurveError::NonConvergence { unit, iterations, .. }) => {
                assert_eq!(unit, "USD-DSC");
                assert_eq!(iterations, 1);
            }
            other => panic!("expected non-convergence, got {other:?}"),
        }
    }
}
