//! Residual Jacobians and their composition across units.
//!
//! For a solved unit with parameters `P` and dependencies `D` (curves it
//! reads but does not calibrate), the par spreads `r = implied - q` satisfy
//! `r(P, P_D) = 0`. Differentiating along the calibrated solution:
//!
//! ```text
//! J_P dP + J_D dP_D - dq = 0
//! dP/dq        = J_P^-1                        (own quotes)
//! dP/dq_inputs = -J_P^-1 * J_D * dP_D/dq_inputs (upstream quotes)
//! ```
//!
//! `dP_D/dq_inputs` is read from the bundle records of the dependencies, so
//! each new record covers every transitive input with one matrix product.
//! A dependency without a record is an exogenous curve and is its own input.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use curvebuild_math::linear_algebra::solve_matrix;
use curvebuild_math::solvers::{DifferenceScheme, FiniteDifferenceConfig};

use super::building_block::{CurveBuildingBlock, CurveBuildingBlockBundle, ParameterLayout};
use crate::calculator::{ParSpreadCalculator, ParSpreadSensitivityCalculator};
use crate::error::{CurveError, CurveResult};
use crate::provider::CurveProvider;

/// A unit's curve with the instruments that calibrate it.
pub(crate) struct UnitCurve<'a, I> {
    pub name: &'a str,
    pub instruments: &'a [I],
}

/// Par spreads of `instruments` against `provider`.
pub(crate) fn residuals<I, C>(
    instruments: &[&I],
    calculator: &C,
    provider: &CurveProvider,
) -> CurveResult<DVector<f64>>
where
    C: ParSpreadCalculator<I>,
{
    let values = instruments
        .iter()
        .map(|instrument| calculator.par_spread(instrument, provider))
        .collect::<CurveResult<Vec<f64>>>()?;
    Ok(DVector::from_vec(values))
}

/// d(par spreads) / d(parameters in `layout`) at `provider`.
///
/// Uses the analytic calculator when given, otherwise bumps each parameter
/// of each curve in the provider.
pub(crate) fn residual_jacobian<I, C>(
    instruments: &[&I],
    calculator: &C,
    sensitivity: Option<&dyn ParSpreadSensitivityCalculator<I>>,
    provider: &CurveProvider,
    layout: &ParameterLayout,
    finite_difference: &FiniteDifferenceConfig,
) -> CurveResult<DMatrix<f64>>
where
    I: Sync,
    C: ParSpreadCalculator<I>,
{
    match sensitivity {
        Some(analytic) => analytic_jacobian(instruments, analytic, provider, layout),
        None => bumped_jacobian(instruments, calculator, provider, layout, finite_difference),
    }
}

fn analytic_jacobian<I>(
    instruments: &[&I],
    sensitivity: &dyn ParSpreadSensitivityCalculator<I>,
    provider: &CurveProvider,
    layout: &ParameterLayout,
) -> CurveResult<DMatrix<f64>> {
    let mut jacobian = DMatrix::zeros(instruments.len(), layout.total());
    for (row, instrument) in instruments.iter().enumerate() {
        let gradient = sensitivity.par_spread_sensitivity(instrument, provider)?;
        for (name, values) in gradient.iter() {
            let (Some(start), Some(count)) = (layout.start(name), layout.parameter_count(name))
            else {
                if values.iter().any(|v| *v != 0.0) {
                    return Err(CurveError::invalid_value(format!(
                        "par spread is sensitive to '{name}', which is not a declared dependency"
                    )));
                }
                continue;
            };
            if values.len() != count {
                return Err(CurveError::invalid_value(format!(
                    "sensitivity to '{name}' has {} entries, curve has {count} parameters",
                    values.len()
                )));
            }
            for (k, v) in values.iter().enumerate() {
                jacobian[(row, start + k)] = *v;
            }
        }
    }
    Ok(jacobian)
}

fn bumped_jacobian<I, C>(
    instruments: &[&I],
    calculator: &C,
    provider: &CurveProvider,
    layout: &ParameterLayout,
    config: &FiniteDifferenceConfig,
) -> CurveResult<DMatrix<f64>>
where
    I: Sync,
    C: ParSpreadCalculator<I>,
{
    let mut bumps = Vec::with_capacity(layout.total());
    for (name, _, count) in layout.iter() {
        let parameters = provider.curve(name)?.parameters();
        if parameters.len() != count {
            return Err(CurveError::invalid_value(format!(
                "curve '{name}' has {} parameters, layout expects {count}",
                parameters.len()
            )));
        }
        bumps.extend((0..count).map(|k| (name, parameters, k)));
    }

    let base = match config.scheme {
        DifferenceScheme::Forward => Some(residuals(instruments, calculator, provider)?),
        DifferenceScheme::Central => None,
    };

    let column = |&(name, parameters, k): &(&str, &[f64], usize)| -> CurveResult<DVector<f64>> {
        let h = config.step(parameters[k]);
        let mut up = parameters.to_vec();
        up[k] += h;
        let f_up = residuals(instruments, calculator, &provider.with_parameters(name, up)?)?;
        let f_down = match &base {
            Some(f0) => f0.clone(),
            None => {
                let mut down = parameters.to_vec();
                down[k] -= h;
                residuals(instruments, calculator, &provider.with_parameters(name, down)?)?
            }
        };
        Ok(DVector::from_iterator(
            f_up.len(),
            f_up.iter()
                .zip(f_down.iter())
                .map(|(u, d)| config.derivative(*u, *d, h)),
        ))
    };

    #[cfg(feature = "parallel")]
    let columns: Vec<DVector<f64>> = {
        use rayon::prelude::*;
        bumps
            .par_iter()
            .map(column)
            .collect::<CurveResult<_>>()?
    };

    #[cfg(not(feature = "parallel"))]
    let columns: Vec<DVector<f64>> = bumps.iter().map(column).collect::<CurveResult<_>>()?;

    let mut jacobian = DMatrix::zeros(instruments.len(), columns.len());
    for (j, column) in columns.iter().enumerate() {
        jacobian.set_column(j, column);
    }
    Ok(jacobian)
}

/// Curves read by the unit's instruments that the unit does not calibrate,
/// in provider order.
pub(crate) fn unit_dependencies<I, C>(
    curves: &[UnitCurve<'_, I>],
    calculator: &C,
    provider: &CurveProvider,
) -> CurveResult<Vec<String>>
where
    C: ParSpreadCalculator<I>,
{
    let mut found = Vec::new();
    for curve in curves {
        for instrument in curve.instruments {
            for name in calculator.curve_dependencies(instrument, provider)? {
                if !provider.contains(&name) {
                    return Err(CurveError::unresolvable(name));
                }
                let own = curves.iter().any(|c| c.name == name);
                if !own && !found.contains(&name) {
                    found.push(name);
                }
            }
        }
    }
    found.sort_by_key(|name| provider.position(name));
    Ok(found)
}

/// Direct columns of a unit: its dependencies, then the unit curves.
pub(crate) fn direct_layout<I>(
    curves: &[UnitCurve<'_, I>],
    dependencies: &[String],
    provider: &CurveProvider,
) -> CurveResult<ParameterLayout> {
    let mut layout = ParameterLayout::new();
    for name in dependencies {
        layout.push(name, provider.curve(name)?.parameters().len())?;
    }
    for curve in curves {
        layout.push(curve.name, curve.instruments.len())?;
    }
    Ok(layout)
}

/// Builds the records of a solved unit.
///
/// `provider` holds the calibrated unit curves, `dependencies` comes from
/// [`unit_dependencies`] and `bundle` holds the records of every curve
/// solved before this unit.
pub(crate) fn unit_building_blocks<I, C>(
    curves: &[UnitCurve<'_, I>],
    dependencies: &[String],
    calculator: &C,
    sensitivity: Option<&dyn ParSpreadSensitivityCalculator<I>>,
    provider: &CurveProvider,
    bundle: &CurveBuildingBlockBundle,
    finite_difference: &FiniteDifferenceConfig,
) -> CurveResult<Vec<CurveBuildingBlock>>
where
    I: Sync,
    C: ParSpreadCalculator<I>,
{
    let direct_layout = direct_layout(curves, dependencies, provider)?;
    let unit_size: usize = curves.iter().map(|c| c.instruments.len()).sum();
    let dependency_columns = direct_layout.total() - unit_size;

    let instruments: Vec<&I> = curves.iter().flat_map(|c| c.instruments.iter()).collect();
    let jacobian = residual_jacobian(
        &instruments,
        calculator,
        sensitivity,
        provider,
        &direct_layout,
        finite_difference,
    )?;

    // Inputs: transitive inputs of the dependencies, then the unit's quotes.
    let mut input_layout = ParameterLayout::new();
    for name in dependencies {
        match bundle.get(name) {
            Some(record) => {
                for (input, _, count) in record.input_layout().iter() {
                    input_layout.push(input, count)?;
                }
            }
            None => input_layout.push(name, provider.curve(name)?.parameters().len())?,
        }
    }
    let upstream_columns = input_layout.total();
    for curve in curves {
        if input_layout.contains(curve.name) {
            return Err(CurveError::malformed_bundle(
                curve.name,
                "curve is an input of one of its own dependencies",
            ));
        }
        input_layout.push(curve.name, curve.instruments.len())?;
    }
    let total = input_layout.total();

    // d(dependency parameters) / d(inputs), one row range per dependency.
    let mut upstream = DMatrix::zeros(dependency_columns, total);
    for (name, row, count) in direct_layout.iter().take(dependencies.len()) {
        match bundle.get(name) {
            Some(record) => {
                if record.size() != count {
                    return Err(CurveError::invalid_value(format!(
                        "record of '{name}' has {} rows, curve has {count} parameters",
                        record.size()
                    )));
                }
                for (input, from, width) in record.input_layout().iter() {
                    let to = input_layout.start(input).ok_or_else(|| CurveError::unresolvable(input))?;
                    upstream
                        .view_mut((row, to), (count, width))
                        .copy_from(&record.transition().view((0, from), (count, width)));
                }
            }
            None => {
                let to = input_layout.start(name).ok_or_else(|| CurveError::unresolvable(name))?;
                upstream
                    .view_mut((row, to), (count, count))
                    .fill_with_identity();
            }
        }
    }

    // dr/dq = -I on the unit's own quotes; move the dependency term across.
    let j_unit = jacobian.columns(dependency_columns, unit_size).into_owned();
    let j_dependencies = jacobian.columns(0, dependency_columns).into_owned();
    let mut rhs = -(&j_dependencies * &upstream);
    rhs.view_mut((0, upstream_columns), (unit_size, unit_size))
        .fill_with_identity();
    let transition = solve_matrix(&j_unit, &rhs)?;

    let mut records = Vec::with_capacity(curves.len());
    let mut row = 0;
    for curve in curves {
        let n = curve.instruments.len();
        records.push(CurveBuildingBlock::new(
            curve.name,
            direct_layout.clone(),
            jacobian.rows(row, n).into_owned(),
            input_layout.clone(),
            transition.rows(row, n).into_owned(),
        )?);
        row += n;
    }
    Ok(records)
}

/// Returns `bundle` extended with `records`.
pub(crate) fn extend_bundle(
    bundle: &CurveBuildingBlockBundle,
    records: Vec<CurveBuildingBlock>,
) -> CurveBuildingBlockBundle {
    let mut next = bundle.clone();
    for record in records {
        next.insert(Arc::new(record));
    }
    next
}
