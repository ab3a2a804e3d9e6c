//! Optimization helpers: step-size rules, gradient checks, accelerated
//! gradient descent and box-constrained quasi-Newton minimization.
//!
//! Objectives are closures over `&[f64]`; gradients return a `Vec<f64>` of
//! the same length.
//!
//! # Step sizes
//!
//! - [`armijo_alpha`] backtracks until the objective decreases
//! - [`barzilai_borwein_alpha`] is the Barzilai-Borwein step along `-∇f`
//!
//! # Minimization
//!
//! - [`acc_grad_descent`] minimizes `f + h` for convex `f` and `h`, given
//!   `∇f` and the proximal operator of `h`
//! - [`minimize_quasi_newton`] is a projected BFGS/DFP method with bounds
//! - [`minimize_some_fixed`] runs it with some variables held fixed
//!
//! # Checking gradients
//!
//! - [`check_gradient`] compares an analytic gradient with finite differences

mod agd;
mod fixed;
mod gradient;
mod line_search;
mod quasi_newton;

#[cfg(test)]
mod tests;

pub use agd::{acc_grad_descent, AgdResult, AgdSettings};
pub use fixed::{minimize_some_fixed, FixedVariables};
pub use gradient::{check_gradient, finite_difference_gradient, FiniteDiff, DEFAULT_FD_STEP};
pub use line_search::{armijo_alpha, barzilai_borwein_alpha, ArmijoSettings};
pub use quasi_newton::{bfgs_update, dfp_update, minimize_quasi_newton, HessianUpdate, QuasiNewtonSettings};

use core::fmt;

use thiserror::Error;
use tracing::{info, warn};

/// Errors from optimization algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum OptimError {
    /// An iterative step ran out of iterations.
    #[error("maximum iterations exceeded")]
    MaxIterations,
    /// Backtracking did not find a decrease.
    #[error("line search failed")]
    LineSearchFailed,
    /// Two inputs that must have the same length do not.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    /// A computed value was NaN or infinite.
    #[error("computed value is NaN or infinity")]
    NotFinite,
    /// A lower bound exceeds its upper bound.
    #[error("invalid bounds for variable {index}: [{lower}, {upper}]")]
    InvalidBounds { index: usize, lower: f64, upper: f64 },
    /// A fixed-variable index is past the end of the parameter vector.
    #[error("fixed variable index {index} out of range for {n} variables")]
    FixedIndexOutOfRange { index: usize, n: usize },
}

/// Result of a minimization.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MinimizeResult {
    /// Approximate minimizer.
    pub x: Vec<f64>,
    /// `f(x)`.
    pub fx: f64,
    /// `∇f(x)`.
    pub grad: Vec<f64>,
    /// Sup norm of the projected gradient at `x`.
    pub grad_norm: f64,
    pub iterations: usize,
    pub f_evals: usize,
    pub grad_evals: usize,
    pub converged: bool,
    /// Why the iterations stopped.
    pub message: String,
}

impl fmt::Display for MinimizeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.message)?;
        if self.converged {
            writeln!(f, "Successful! in {} iterations", self.iterations)?;
        } else {
            writeln!(f, "Minimization failed after {} iterations", self.iterations)?;
        }
        writeln!(f, "evaluated {} functions and {} gradients", self.f_evals, self.grad_evals)?;
        writeln!(f, "Minimizer and gradient:")?;
        for (xi, gi) in self.x.iter().zip(&self.grad) {
            writeln!(f, "  {:>14.6e}  {:>14.6e}", xi, gi)?;
        }
        write!(f, "Minimized value is {}", self.fx)
    }
}

/// Values, bounds and starting point of a parameter vector.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimizeParams {
    pub values: Option<Vec<f64>>,
    pub bounds: Option<Vec<(f64, f64)>>,
    pub init: Option<Vec<f64>>,
}

impl OptimizeParams {
    /// Parameters starting at `init`, unbounded.
    pub fn new(init: Vec<f64>) -> Self {
        Self {
            init: Some(init),
            ..Self::default()
        }
    }

    pub fn with_bounds(mut self, bounds: Vec<(f64, f64)>) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Bounds as a slice, if any.
    pub fn bounds(&self) -> Option<&[(f64, f64)]> {
        self.bounds.as_deref()
    }
}

/// Log a minimization report under `title`.
pub fn log_optimization_results(res: &MinimizeResult, title: &str) {
    if res.converged {
        info!(
            title,
            iterations = res.iterations,
            f_evals = res.f_evals,
            grad_evals = res.grad_evals,
            fx = res.fx,
            grad_norm = res.grad_norm,
            "{}",
            res.message
        );
        info!(title, x = ?res.x, grad = ?res.grad, "minimizer");
    } else {
        warn!(title, iterations = res.iterations, "minimization failed: {}", res.message);
    }
}

/// `x` clamped to `bounds`.
pub(crate) fn project(x: &mut [f64], bounds: Option<&[(f64, f64)]>) {
    if let Some(b) = bounds {
        for (xi, &(lo, hi)) in x.iter_mut().zip(b) {
            *xi = xi.clamp(lo, hi);
        }
    }
}

pub(crate) fn check_bounds(n: usize, bounds: Option<&[(f64, f64)]>) -> Result<(), OptimError> {
    let Some(b) = bounds else {
        return Ok(());
    };
    if b.len() != n {
        return Err(OptimError::LengthMismatch { expected: n, got: b.len() });
    }
    for (index, &(lower, upper)) in b.iter().enumerate() {
        if !(lower <= upper) {
            return Err(OptimError::InvalidBounds { index, lower, upper });
        }
    }
    Ok(())
}

pub(crate) fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0, |m, x| m.max(x.abs()))
}
