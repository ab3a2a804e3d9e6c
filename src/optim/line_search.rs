use crate::matrix::{dot, norm};

use super::OptimError;

/// Settings for [`armijo_alpha`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArmijoSettings {
    /// First step tried.
    pub alpha_init: f64,
    /// Contraction factor.
    pub beta: f64,
    pub max_iter: usize,
    /// Accept when `f(x + αd) < f(x) + tol`.
    pub tol: f64,
}

impl Default for ArmijoSettings {
    fn default() -> Self {
        Self {
            alpha_init: 1.0,
            beta: 0.5,
            max_iter: 100,
            tol: 0.0,
        }
    }
}

/// Step size along `d` by backtracking: the first `alpha_init * beta^k`
/// with `f(x + α d) < f(x) + tol`.
///
/// ```
/// use bsutils::optim::{armijo_alpha, ArmijoSettings};
///
/// let f = |x: &[f64]| (x[0] - 1.0).powi(2);
/// let alpha = armijo_alpha(f, &[0.0], &[4.0], &ArmijoSettings::default()).unwrap();
/// assert_eq!(alpha, 0.25);
/// ```
pub fn armijo_alpha(
    mut f: impl FnMut(&[f64]) -> f64,
    x: &[f64],
    d: &[f64],
    settings: &ArmijoSettings,
) -> Result<f64, OptimError> {
    if d.len() != x.len() {
        return Err(OptimError::LengthMismatch { expected: x.len(), got: d.len() });
    }
    let f0 = f(x);
    let mut alpha = settings.alpha_init;
    let mut x1 = x.to_vec();
    for _ in 0..settings.max_iter {
        for ((xi, &x0), &di) in x1.iter_mut().zip(x).zip(d) {
            *xi = x0 + alpha * di;
        }
        if f(&x1) < f0 + settings.tol {
            return Ok(alpha);
        }
        alpha *= settings.beta;
    }
    Err(OptimError::LineSearchFailed)
}

/// Barzilai-Borwein step from `x` given the gradient `g` there: probe at
/// `x - g / |g|` and return `|Δx·Δg| / |Δg|²`.
pub(crate) fn bb_step(grad: &mut impl FnMut(&[f64]) -> Vec<f64>, x: &[f64], g: &[f64]) -> Result<f64, OptimError> {
    let gnorm = norm(g);
    if !(gnorm > 0.0 && gnorm.is_finite()) {
        return Err(OptimError::NotFinite);
    }
    let step = 1.0 / gnorm;
    let x_hat: Vec<f64> = x.iter().zip(g).map(|(xi, gi)| xi - step * gi).collect();
    let g_hat = grad(&x_hat);
    let dx: Vec<f64> = x.iter().zip(&x_hat).map(|(a, b)| a - b).collect();
    let dg: Vec<f64> = g.iter().zip(&g_hat).map(|(a, b)| a - b).collect();
    let alpha = dot(&dx, &dg).abs() / dot(&dg, &dg);
    if alpha.is_finite() {
        Ok(alpha)
    } else {
        Err(OptimError::NotFinite)
    }
}

/// Barzilai-Borwein step size for a move along `-∇f`, and `∇f(x)`.
///
/// Fails with [`OptimError::NotFinite`] when the gradient vanishes or does
/// not change along the probe.
pub fn barzilai_borwein_alpha(
    mut grad: impl FnMut(&[f64]) -> Vec<f64>,
    x: &[f64],
) -> Result<(f64, Vec<f64>), OptimError> {
    let g = grad(x);
    let alpha = bb_step(&mut grad, x, &g)?;
    Ok((alpha, g))
}

/// Backtracking along the projected path `P(x + α d)` until
/// `f ≤ f(x) + c1 ∇f·(P(x + α d) - x)`.
///
/// Returns the new point, its value and the number of evaluations.
#[allow(clippy::too_many_arguments)]
pub(crate) fn projected_armijo(
    f: &mut impl FnMut(&[f64]) -> f64,
    fx: f64,
    g: &[f64],
    x: &[f64],
    d: &[f64],
    bounds: Option<&[(f64, f64)]>,
    c1: f64,
    rho: f64,
    max_iter: usize,
) -> Result<(Vec<f64>, f64, usize), OptimError> {
    let mut alpha = 1.0;
    let mut x_new = vec![0.0; x.len()];
    for evals in 1..=max_iter {
        for ((xn, &xi), &di) in x_new.iter_mut().zip(x).zip(d) {
            *xn = xi + alpha * di;
        }
        super::project(&mut x_new, bounds);
        let decrease: f64 = g.iter().zip(x_new.iter().zip(x)).map(|(gi, (a, b))| gi * (a - b)).sum();
        let f_new = f(&x_new);
        if f_new.is_finite() && f_new <= fx + c1 * decrease {
            return Ok((x_new, f_new, evals));
        }
        alpha *= rho;
    }
    Err(OptimError::LineSearchFailed)
}
