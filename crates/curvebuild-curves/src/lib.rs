//! # Curvebuild Curves
//!
//! Multi-curve interest rate calibration.
//!
//! This crate provides:
//!
//! - **Curves**: Interpolated zero-rate, discount-factor and price-index curves
//!   built from parameter vectors by [`generators`]
//! - **Curve Provider**: An immutable, copy-on-extend set of curves keyed by
//!   name, currency and index
//! - **Calibration**: Blocks of units of single-curve bundles, solved in
//!   dependency order by the [`CurveBuildingRepository`]
//! - **Jacobian Bundles**: Per-curve sensitivities to every transitive market
//!   quote, composed across units and blocks
//! - **Instruments**: Reference deposits, FRAs, swaps and zero-coupon
//!   inflation swaps with analytic par-spread sensitivities
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use curvebuild_curves::prelude::*;
//!
//! let usd = Currency::new("USD");
//! let instruments: Vec<RateInstrument> = [(1.0, 0.01), (2.0, 0.02), (3.0, 0.03)]
//!     .iter()
//!     .map(|&(t, r)| RateInstrument::deposit(usd.clone(), 0.0, t, r))
//!     .collect();
//!
//! let generator = Arc::new(InterpolatedGenerator::new(
//!     CurveValueType::ZeroRate,
//!     InterpolationMethod::Linear,
//! ));
//! let bundle = SingleCurveBundle::new("USD-DSC", instruments, InitialGuess::Rates(vec![0.02; 3]), generator)
//!     .with_role(CurveRole::Discounting(usd.clone()));
//!
//! let block = CalibrationBlock::new().with_unit(vec![bundle]);
//! let outcome = CurveBuildingRepository::default()
//!     .calibrate(&[block], &CurveProvider::new(), &CurveBuildingBlockBundle::new(), &RateInstrumentCalculator, None)
//!     .unwrap();
//!
//! let curve = outcome.provider().discount_curve(&usd).unwrap();
//! assert_eq!(curve.parameters().len(), 3);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_lines)]

pub mod calculator;
pub mod calibration;
pub mod config;
pub mod curves;
pub mod error;
pub mod generators;
pub mod instruments;
pub mod interpolation;
pub mod keys;
pub mod provider;
pub mod repricing;
pub mod sensitivity;
pub mod traits;
pub mod value_type;

pub use calibration::CurveBuildingRepository;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::calculator::{
        FiniteDifferenceSensitivity, ParSpreadCalculator, ParSpreadSensitivityCalculator,
    };
    pub use crate::calibration::{
        CalibrationBlock, CalibrationContext, CalibrationOutcome, CalibrationUnit,
        CurveBuildingBlock, CurveBuildingBlockBundle, CurveBuildingRepository, InitialGuess,
        MarketQuoteSensitivityCalculator, ParameterLayout, SingleCurveBundle, UnitReport,
    };
    pub use crate::config::{CalibrationConfig, RootFinderMethod};
    pub use crate::curves::{FlatCurve, InterpolatedCurve};
    pub use crate::error::{CurveError, CurveResult};
    pub use crate::generators::{ConstantGenerator, CurveGenerator, InterpolatedGenerator};
    pub use crate::instruments::{RateInstrument, RateInstrumentCalculator};
    pub use crate::interpolation::InterpolationMethod;
    pub use crate::keys::{Currency, CurveRole, PriceIndex, RateIndex};
    pub use crate::provider::{CurveProvider, ParameterizedCurve};
    pub use crate::repricing::{RepricingCheck, RepricingReport};
    pub use crate::sensitivity::ParameterSensitivity;
    pub use crate::traits::Curve;
    pub use crate::value_type::CurveValueType;
}
