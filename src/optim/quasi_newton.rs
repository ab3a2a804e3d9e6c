use tracing::debug;

use crate::matrix::dot;
use crate::Matrix;

use super::line_search::projected_armijo;
use super::{check_bounds, max_abs, project, MinimizeResult, OptimError};

/// Inverse-Hessian update rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HessianUpdate {
    #[default]
    Bfgs,
    Dfp,
}

/// Settings for [`minimize_quasi_newton`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuasiNewtonSettings {
    pub update: HessianUpdate,
    /// Convergence tolerance on the sup norm of the projected gradient.
    pub grad_tol: f64,
    /// Convergence tolerance on the relative change in `f`.
    pub f_tol: f64,
    /// Convergence tolerance on the relative step size.
    pub x_tol: f64,
    pub max_iter: usize,
    /// Armijo sufficient-decrease parameter.
    pub armijo_c1: f64,
    /// Backtracking contraction factor.
    pub armijo_rho: f64,
    pub max_ls_iter: usize,
    /// The first inverse Hessian is the identity over this scale.
    pub initial_hessian_scale: f64,
}

impl Default for QuasiNewtonSettings {
    fn default() -> Self {
        Self {
            update: HessianUpdate::Bfgs,
            grad_tol: 1e-8,
            f_tol: 1e-14,
            x_tol: 1e-14,
            max_iter: 1000,
            armijo_c1: 1e-4,
            armijo_rho: 0.5,
            max_ls_iter: 50,
            initial_hessian_scale: 1.0,
        }
    }
}

/// DFP update of the inverse Hessian `h` after a step `dx` that changed the
/// gradient by `dg`:
/// `H + dx dxᵀ / dxᵀdg - H dg dgᵀ H / dgᵀ H dg`.
pub fn dfp_update(h: &Matrix<f64>, dg: &[f64], dx: &[f64]) -> Matrix<f64> {
    let xpg = dot(dx, dg);
    let hdg = h.vecmul(dg);
    let dgp_hdg = dot(dg, &hdg);
    Matrix::from_fn(h.nrows(), h.ncols(), |i, j| {
        h[(i, j)] + dx[i] * dx[j] / xpg - hdg[i] * hdg[j] / dgp_hdg
    })
}

/// BFGS update of the inverse Hessian: the DFP update plus
/// `(dgᵀ H dg) u uᵀ` with `u = dx / dxᵀdg - H dg / dgᵀ H dg`.
///
/// ```
/// use bsutils::optim::bfgs_update;
/// use bsutils::Matrix;
///
/// // secant condition: H_new dg = dx
/// let h = Matrix::<f64>::eye(2);
/// let (dg, dx) = ([1.0, 2.0], [0.5, 0.3]);
/// let h_new = bfgs_update(&h, &dg, &dx);
/// let hg = h_new.vecmul(&dg);
/// assert!((hg[0] - 0.5).abs() < 1e-12 && (hg[1] - 0.3).abs() < 1e-12);
/// ```
pub fn bfgs_update(h: &Matrix<f64>, dg: &[f64], dx: &[f64]) -> Matrix<f64> {
    let xpg = dot(dx, dg);
    let hdg = h.vecmul(dg);
    let dgp_hdg = dot(dg, &hdg);
    let u: Vec<f64> = dx.iter().zip(&hdg).map(|(a, b)| a / xpg - b / dgp_hdg).collect();
    let mut out = dfp_update(h, dg, dx);
    for j in 0..u.len() {
        for i in 0..u.len() {
            out[(i, j)] += dgp_hdg * u[i] * u[j];
        }
    }
    out
}

/// Whether variable `i` sits on a bound that `-g` pushes against.
fn is_active(x: f64, g: f64, bound: Option<(f64, f64)>) -> bool {
    match bound {
        Some((lo, hi)) => (x <= lo && g > 0.0) || (x >= hi && g < 0.0),
        None => false,
    }
}

/// Sup norm of `x - P(x - g)`.
fn projected_grad_norm(x: &[f64], g: &[f64], bounds: Option<&[(f64, f64)]>) -> f64 {
    let mut step: Vec<f64> = x.iter().zip(g).map(|(xi, gi)| xi - gi).collect();
    project(&mut step, bounds);
    x.iter().zip(&step).fold(0.0, |m, (a, b)| m.max((a - b).abs()))
}

/// Minimize `f` within the box `bounds` (default: unbounded) by projected
/// quasi-Newton iterations.
///
/// Variables held at a bound by the gradient are frozen for the step; the
/// others move along `-H g` and the step is backtracked along its projection
/// on the box. The inverse Hessian `H` is updated with BFGS or DFP and reset
/// to a scaled identity whenever it stops giving a descent direction.
///
/// Not converging within `max_iter` iterations, or a failed line search from
/// a fresh `H`, is reported through [`MinimizeResult::converged`].
///
/// # Errors
///
/// [`OptimError::LengthMismatch`] or [`OptimError::InvalidBounds`] for bad
/// bounds, [`OptimError::NotFinite`] if `f(x0)` or its gradient is not finite.
///
/// ```
/// use bsutils::optim::{minimize_quasi_newton, QuasiNewtonSettings};
///
/// // minimum of (x0 - 1)^2 + (x1 - 2)^2 on [0, 0.5] x [0, 5]
/// let r = minimize_quasi_newton(
///     |x: &[f64]| (x[0] - 1.0).powi(2) + (x[1] - 2.0).powi(2),
///     |x: &[f64]| vec![2.0 * (x[0] - 1.0), 2.0 * (x[1] - 2.0)],
///     &[0.0, 0.0],
///     Some(&[(0.0, 0.5), (0.0, 5.0)][..]),
///     &QuasiNewtonSettings::default(),
/// )
/// .unwrap();
/// assert!(r.converged);
/// assert!((r.x[0] - 0.5).abs() < 1e-8);
/// assert!((r.x[1] - 2.0).abs() < 1e-6);
/// ```
pub fn minimize_quasi_newton(
    mut f: impl FnMut(&[f64]) -> f64,
    mut grad: impl FnMut(&[f64]) -> Vec<f64>,
    x0: &[f64],
    bounds: Option<&[(f64, f64)]>,
    settings: &QuasiNewtonSettings,
) -> Result<MinimizeResult, OptimError> {
    let n = x0.len();
    check_bounds(n, bounds)?;

    let mut x = x0.to_vec();
    project(&mut x, bounds);
    let mut fx = f(&x);
    let mut g = grad(&x);
    let mut f_evals = 1usize;
    let mut grad_evals = 1usize;
    if g.len() != n {
        return Err(OptimError::LengthMismatch { expected: n, got: g.len() });
    }
    if !fx.is_finite() || g.iter().any(|gi| !gi.is_finite()) {
        return Err(OptimError::NotFinite);
    }

    let fresh = || Matrix::<f64>::eye(n) * (1.0 / settings.initial_hessian_scale);
    let mut h = fresh();
    let mut h_is_fresh = true;
    let mut first_update = true;

    let finish = |x: Vec<f64>,
                  fx: f64,
                  g: Vec<f64>,
                  iterations: usize,
                  f_evals: usize,
                  grad_evals: usize,
                  converged: bool,
                  message: &str| {
        let grad_norm = projected_grad_norm(&x, &g, bounds);
        MinimizeResult {
            x,
            fx,
            grad: g,
            grad_norm,
            iterations,
            f_evals,
            grad_evals,
            converged,
            message: message.to_string(),
        }
    };

    for iter in 0..settings.max_iter {
        if projected_grad_norm(&x, &g, bounds) < settings.grad_tol {
            return Ok(finish(x, fx, g, iter, f_evals, grad_evals, true, "projected gradient below tolerance"));
        }

        let active: Vec<bool> = (0..n)
            .map(|i| is_active(x[i], g[i], bounds.map(|b| b[i])))
            .collect();
        let g_free: Vec<f64> = g.iter().zip(&active).map(|(&gi, &a)| if a { 0.0 } else { gi }).collect();
        let mut d: Vec<f64> = h.vecmul(&g_free).iter().map(|v| -v).collect();
        for (di, &a) in d.iter_mut().zip(&active) {
            if a {
                *di = 0.0;
            }
        }
        if dot(&d, &g_free) >= 0.0 {
            debug!(iter, "not a descent direction, resetting the inverse Hessian");
            h = fresh();
            h_is_fresh = true;
            d = g_free.iter().map(|gi| -gi / settings.initial_hessian_scale).collect();
        }

        let (x_new, f_new, ls_evals) = match projected_armijo(
            &mut f,
            fx,
            &g,
            &x,
            &d,
            bounds,
            settings.armijo_c1,
            settings.armijo_rho,
            settings.max_ls_iter,
        ) {
            Ok(step) => step,
            Err(_) if !h_is_fresh => {
                debug!(iter, "line search failed, resetting the inverse Hessian");
                f_evals += settings.max_ls_iter;
                h = fresh();
                h_is_fresh = true;
                continue;
            }
            Err(_) => {
                f_evals += settings.max_ls_iter;
                return Ok(finish(x, fx, g, iter, f_evals, grad_evals, false, "line search failed"));
            }
        };
        f_evals += ls_evals;
        let g_new = grad(&x_new);
        grad_evals += 1;
        if g_new.iter().any(|gi| !gi.is_finite()) {
            return Err(OptimError::NotFinite);
        }

        let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
        let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
        let x_scale = 1.0 + max_abs(&x);
        let f_change = (fx - f_new).abs();
        let f_scale = 1.0 + fx.abs();
        x = x_new;
        fx = f_new;
        g = g_new;

        if max_abs(&s) < settings.x_tol * x_scale {
            return Ok(finish(x, fx, g, iter + 1, f_evals, grad_evals, true, "relative step below tolerance"));
        }
        if f_change < settings.f_tol * f_scale {
            return Ok(finish(x, fx, g, iter + 1, f_evals, grad_evals, true, "relative reduction of f below tolerance"));
        }

        let ys = dot(&y, &s);
        if ys > f64::EPSILON * dot(&s, &s).sqrt() * dot(&y, &y).sqrt() {
            if first_update {
                // scale the identity to the curvature seen along s
                h = Matrix::eye(n) * (ys / dot(&y, &y));
                first_update = false;
            }
            h = match settings.update {
                HessianUpdate::Bfgs => bfgs_update(&h, &y, &s),
                HessianUpdate::Dfp => dfp_update(&h, &y, &s),
            };
            h_is_fresh = false;
        }
    }

    Ok(finish(x, fx, g, settings.max_iter, f_evals, grad_evals, false, "maximum iterations reached"))
}
