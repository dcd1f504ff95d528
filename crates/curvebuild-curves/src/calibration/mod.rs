//! Multi-curve calibration.
//!
//! Inputs are organised in three levels:
//!
//! - [`SingleCurveBundle`]: one curve, its instruments, initial guess and
//!   generator; as many instruments as parameters
//! - [`CalibrationUnit`]: curves solved jointly as one square system
//! - [`CalibrationBlock`]: units solved in order, each seeing the curves of
//!   the units before it
//!
//! The [`CurveBuildingRepository`] solves every unit with a vector root
//! finder and records a [`CurveBuildingBlock`] per curve. Records compose
//! through the chain rule, so each one expresses its curve's sensitivity to
//! every market quote it depends on, across units and blocks.

mod building_block;
mod bundle;
mod context;
mod jacobian;
mod market_quote;
mod repository;

pub use building_block::{CurveBuildingBlock, CurveBuildingBlockBundle, ParameterLayout};
pub use bundle::{CalibrationBlock, CalibrationUnit, InitialGuess, SingleCurveBundle};
pub use context::{CalibrationContext, UnitReport};
pub use market_quote::MarketQuoteSensitivityCalculator;
pub use repository::{CalibrationOutcome, CurveBuildingRepository};
