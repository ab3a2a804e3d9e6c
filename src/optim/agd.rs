use tracing::{debug, info};

use crate::matrix::{dot, norm};

use super::line_search::bb_step;
use super::{max_abs, OptimError};

/// Settings for [`acc_grad_descent`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgdSettings {
    /// Convergence tolerance on the sup norm of the gradient.
    pub tol: f64,
    /// Ceiling on the step multiplier between iterations.
    pub alpha: f64,
    /// Floor on the step multiplier between iterations.
    pub beta: f64,
    pub max_iter: usize,
}

impl Default for AgdSettings {
    fn default() -> Self {
        Self {
            tol: 1e-9,
            alpha: 1.01,
            beta: 0.5,
            max_iter: 10_000,
        }
    }
}

/// Outcome of [`acc_grad_descent`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AgdResult {
    pub x: Vec<f64>,
    pub converged: bool,
    pub iterations: usize,
    /// Sup norm of `∇f` at `x`.
    pub grad_err: f64,
}

/// Minimize `f + h` by accelerated proximal gradient descent, where `f` is
/// smooth and convex and `h` is convex.
///
/// `grad` is `∇f`. `prox(v, t)` is the proximal operator of `t h`; `None`
/// means `h = 0`. Steps start from the Barzilai-Borwein rule and adapt
/// within `[beta t, alpha t]`; momentum restarts whenever a step goes
/// backwards.
///
/// ```
/// use bsutils::optim::{acc_grad_descent, AgdSettings};
///
/// let grad = |x: &[f64]| -> Vec<f64> { x.iter().map(|xi| 2.0 * (xi - 3.0)).collect() };
/// let res = acc_grad_descent(grad, &[0.0, 10.0], None, &AgdSettings::default()).unwrap();
/// assert!(res.converged);
/// assert!((res.x[1] - 3.0).abs() < 1e-8);
/// ```
pub fn acc_grad_descent(
    mut grad: impl FnMut(&[f64]) -> Vec<f64>,
    x_init: &[f64],
    prox: Option<&dyn Fn(&[f64], f64) -> Vec<f64>>,
    settings: &AgdSettings,
) -> Result<AgdResult, OptimError> {
    let mut x = x_init.to_vec();
    let mut y = x_init.to_vec();
    let mut g = grad(&y);
    let grad_err_init = max_abs(&g);
    debug!(grad_err_init, "agd");
    if grad_err_init < settings.tol {
        return Ok(AgdResult {
            x: y,
            converged: true,
            iterations: 0,
            grad_err: grad_err_init,
        });
    }
    let mut t = bb_step(&mut grad, &y, &g)?;

    let mut theta = 1.0_f64;
    let mut iterations = 0;
    while iterations < settings.max_iter {
        let grad_err = max_abs(&g);
        if !grad_err.is_finite() {
            return Err(OptimError::NotFinite);
        }
        if grad_err < settings.tol {
            break;
        }
        let x_prev = x;
        let y_prev = y.clone();
        let step: Vec<f64> = y.iter().zip(&g).map(|(yi, gi)| yi - t * gi).collect();
        x = match prox {
            Some(p) => p(&step, t),
            None => step,
        };

        theta = 2.0 / (1.0 + (1.0 + 4.0 / (theta * theta)).sqrt());

        let y_minus_x: Vec<f64> = y.iter().zip(&x).map(|(a, b)| a - b).collect();
        let x_move: Vec<f64> = x.iter().zip(&x_prev).map(|(a, b)| a - b).collect();
        if dot(&y_minus_x, &x_move) > 0.0 {
            // wrong direction: restart the momentum
            x = x_prev;
            y = x.clone();
            theta = 1.0;
        } else {
            y = x.iter().zip(&x_move).map(|(xi, dx)| xi + (1.0 - theta) * dx).collect();
        }

        let g_prev = core::mem::replace(&mut g, grad(&y));
        let dy: Vec<f64> = y.iter().zip(&y_prev).map(|(a, b)| a - b).collect();
        let dg: Vec<f64> = g_prev.iter().zip(&g).map(|(a, b)| a - b).collect();
        let ndy = norm(&dy);
        // NaN when y did not move; f64::max then keeps beta * t
        let t_hat = 0.5 * ndy * ndy / dot(&dy, &dg).abs();
        t = (settings.alpha * t).min((settings.beta * t).max(t_hat));

        iterations += 1;
    }

    let grad_err = max_abs(&g);
    let converged = grad_err < settings.tol;
    if converged {
        info!(grad_err, iterations, "AGD converged");
    } else {
        info!(grad_err, iterations, "AGD did not converge");
    }
    Ok(AgdResult {
        x: y,
        converged,
        iterations,
        grad_err,
    })
}
