use tracing::debug;

use super::quasi_newton::minimize_quasi_newton;
use super::{check_bounds, MinimizeResult, OptimError, QuasiNewtonSettings};

/// Variables held at fixed values during a minimization.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedVariables {
    /// Positions in the full parameter vector.
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl FixedVariables {
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        Self { indices, values }
    }
}

/// Full-length vector from the free values `t`, filling in the fixed ones.
fn expand(t: &[f64], free: &[usize], fixed: &FixedVariables, n: usize) -> Vec<f64> {
    let mut full = vec![0.0; n];
    for (&i, &v) in fixed.indices.iter().zip(&fixed.values) {
        full[i] = v;
    }
    for (&i, &v) in free.iter().zip(t) {
        full[i] = v;
    }
    full
}

/// Minimize `f` over the variables not listed in `fixed`, which stay at
/// their given values.
///
/// `x_init` and `bounds` cover all variables; their entries for the fixed
/// variables are ignored. The result carries the full-length minimizer and
/// the full gradient there.
pub fn minimize_some_fixed(
    mut f: impl FnMut(&[f64]) -> f64,
    mut grad: impl FnMut(&[f64]) -> Vec<f64>,
    x_init: &[f64],
    fixed: Option<&FixedVariables>,
    bounds: Option<&[(f64, f64)]>,
    settings: &QuasiNewtonSettings,
) -> Result<MinimizeResult, OptimError> {
    let Some(fixed) = fixed else {
        return minimize_quasi_newton(f, grad, x_init, bounds, settings);
    };
    let n = x_init.len();
    if fixed.indices.len() != fixed.values.len() {
        return Err(OptimError::LengthMismatch {
            expected: fixed.indices.len(),
            got: fixed.values.len(),
        });
    }
    if let Some(&index) = fixed.indices.iter().find(|&&i| i >= n) {
        return Err(OptimError::FixedIndexOutOfRange { index, n });
    }
    check_bounds(n, bounds)?;

    let free: Vec<usize> = (0..n).filter(|i| !fixed.indices.contains(i)).collect();
    debug!(n_free = free.len(), n_fixed = n - free.len(), "minimizing with fixed variables");
    let t_init: Vec<f64> = free.iter().map(|&i| x_init[i]).collect();
    let t_bounds: Option<Vec<(f64, f64)>> = bounds.map(|b| free.iter().map(|&i| b[i]).collect());

    let mut res = minimize_quasi_newton(
        |t: &[f64]| f(&expand(t, &free, fixed, n)),
        |t: &[f64]| {
            let g = grad(&expand(t, &free, fixed, n));
            free.iter().map(|&i| g[i]).collect()
        },
        &t_init,
        t_bounds.as_deref(),
        settings,
    )?;

    res.x = expand(&res.x, &free, fixed, n);
    res.grad = grad(&res.x);
    res.grad_evals += 1;
    Ok(res)
}
