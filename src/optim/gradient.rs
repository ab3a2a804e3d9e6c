use tracing::debug;

/// Default finite-difference step.
pub const DEFAULT_FD_STEP: f64 = 1e-6;

/// Finite-difference scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FiniteDiff {
    /// `(f(x + h) - f(x - h)) / 2h`.
    #[default]
    Central,
    /// `(f(x + h) - f(x)) / h`.
    Forward,
}

/// Numerical gradient of `f` at `p` with step `eps`.
///
/// ```
/// use bsutils::optim::{finite_difference_gradient, FiniteDiff};
///
/// // f(x) = x0^2 + 2 x1^2, gradient [2 x0, 4 x1]
/// let g = finite_difference_gradient(
///     |x: &[f64]| x[0] * x[0] + 2.0 * x[1] * x[1],
///     &[3.0, 4.0],
///     FiniteDiff::Central,
///     1e-6,
/// );
/// assert!((g[0] - 6.0).abs() < 1e-6);
/// assert!((g[1] - 16.0).abs() < 1e-6);
/// ```
pub fn finite_difference_gradient(
    mut f: impl FnMut(&[f64]) -> f64,
    p: &[f64],
    mode: FiniteDiff,
    eps: f64,
) -> Vec<f64> {
    let mut p1 = p.to_vec();
    let f0 = match mode {
        FiniteDiff::Forward => f(p),
        FiniteDiff::Central => 0.0,
    };
    (0..p.len())
        .map(|i| {
            p1[i] = p[i] + eps;
            let f_plus = f(&p1);
            let gi = match mode {
                FiniteDiff::Central => {
                    p1[i] = p[i] - eps;
                    (f_plus - f(&p1)) / (2.0 * eps)
                }
                FiniteDiff::Forward => (f_plus - f0) / eps,
            };
            p1[i] = p[i];
            gi
        })
        .collect()
}

/// Analytic and numeric gradients of `f` at `p`, logged side by side at
/// `debug` level.
pub fn check_gradient(
    f: impl FnMut(&[f64]) -> f64,
    mut grad: impl FnMut(&[f64]) -> Vec<f64>,
    p: &[f64],
    mode: FiniteDiff,
    eps: f64,
) -> (Vec<f64>, Vec<f64>) {
    let analytic = grad(p);
    let numeric = finite_difference_gradient(f, p, mode, eps);
    debug!(?mode, eps, "checking the gradient: analytic, numeric");
    for (i, (a, n)) in analytic.iter().zip(&numeric).enumerate() {
        debug!(i, analytic = a, numeric = n);
    }
    (analytic, numeric)
}
