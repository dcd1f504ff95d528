//! # Curvebuild Math
//!
//! Numerical primitives for the Curvebuild multi-curve calibration library.
//!
//! This crate provides:
//!
//! - **Solvers**: Multidimensional root finders (Newton-Raphson, Broyden)
//!   and finite-difference Jacobian estimation
//! - **Linear Algebra**: Pivoted LU solves and inverses with singularity detection
//! - **Interpolation**: Linear, log-linear and natural cubic spline interpolation,
//!   including the sensitivity of interpolated values to the node values
//!
//! ## Design Philosophy
//!
//! - **Fail loudly**: Singular systems and non-convergence are errors, never NaNs
//! - **Stateless**: Every solve is independent and can run on any thread
//! - **Dense and small**: Calibration systems have tens of unknowns, so dense
//!   `nalgebra` matrices are used throughout

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod interpolation;
pub mod linear_algebra;
pub mod solvers;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::interpolation::{
        CubicSpline, Interpolator, LinearInterpolator, LogLinearInterpolator,
    };
    pub use crate::linear_algebra::{invert, solve_linear_system};
    pub use crate::solvers::{
        finite_difference_jacobian, BroydenVectorRootFinder, DifferenceScheme,
        FiniteDifferenceConfig, NewtonVectorRootFinder, VectorRootFinder, VectorRootResult,
        VectorSolverConfig,
    };
}

pub use error::{MathError, MathResult};
