//! Cubic smoothing splines and spline regression.
//!
//! [`SmoothingSpline`] minimizes
//! `Σ wᵢ (yᵢ - g(xᵢ))² + λ ∫ g''(x)² dx`
//! over natural cubic splines with knots at the data points, using the
//! Reinsch algorithm: one pentadiagonal solve per `λ`. With `λ = 0` it is
//! the natural interpolating spline.
//!
//! [`spline_reg`] wraps it for raw data: sorting, merging tied abscissas and
//! picking `λ` from local noise estimates.
//!
//! ```
//! use bsutils::spline::SmoothingSpline;
//!
//! let x = [0.0, 1.0, 2.0, 3.0];
//! let y = [0.0, 1.0, 0.0, 1.0];
//! let s = SmoothingSpline::fit(&x, &y, None, 0.0).unwrap();
//! assert!((s.eval(2.0) - 0.0).abs() < 1e-12);
//! ```

mod banded;


use thiserror::Error;
use tracing::debug;

use crate::stats::{argsort, rice_stderr, StatsError};

use banded::PentaCholesky;

/// Errors from spline fitting.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum SplineError {
    /// Fewer than two distinct knots.
    #[error("need at least 2 distinct knots, got {0}")]
    TooFewPoints(usize),
    /// Knots are not strictly increasing.
    #[error("knots must be strictly increasing")]
    NotSorted,
    /// Inputs that must have the same length do not.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    /// A weight is not strictly positive and finite, or `λ < 0`.
    #[error("weights must be positive and finite, and lambda non-negative")]
    InvalidWeights,
    /// The pentadiagonal system is not positive definite.
    #[error("smoothing system is not positive definite")]
    NotPositiveDefinite,
    /// The local noise estimate failed.
    #[error(transparent)]
    Stats(#[from] StatsError),
}

/// A fitted natural cubic smoothing spline.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SmoothingSpline {
    knots: Vec<f64>,
    /// Fitted values at the knots.
    values: Vec<f64>,
    /// Second derivatives at the knots; zero at both ends.
    gamma: Vec<f64>,
    lambda: f64,
    weighted_rss: f64,
}

fn validate_sorted(xs: &[f64]) -> Result<(), SplineError> {
    if xs.windows(2).all(|w| w[0] < w[1]) {
        Ok(())
    } else {
        Err(SplineError::NotSorted)
    }
}

/// Index `i` with `xs[i] <= x < xs[i+1]`, clamped to the first and last
/// segments.
fn find_interval(xs: &[f64], x: f64) -> usize {
    let n = xs.len();
    xs.partition_point(|&k| k <= x).clamp(1, n - 1) - 1
}

impl SmoothingSpline {
    /// Fit with penalty `lambda` on strictly increasing knots `x`.
    ///
    /// `weights` default to one.
    pub fn fit(x: &[f64], y: &[f64], weights: Option<&[f64]>, lambda: f64) -> Result<Self, SplineError> {
        let n = x.len();
        if y.len() != n {
            return Err(SplineError::LengthMismatch { expected: n, got: y.len() });
        }
        if n < 2 {
            return Err(SplineError::TooFewPoints(n));
        }
        validate_sorted(x)?;
        let unit = vec![1.0; n];
        let w = match weights {
            Some(w) if w.len() != n => {
                return Err(SplineError::LengthMismatch { expected: n, got: w.len() })
            }
            Some(w) => w,
            None => unit.as_slice(),
        };
        if !(lambda >= 0.0) || w.iter().any(|&wi| !(wi > 0.0 && wi.is_finite())) {
            return Err(SplineError::InvalidWeights);
        }

        let h: Vec<f64> = x.windows(2).map(|p| p[1] - p[0]).collect();
        let mut gamma = vec![0.0; n];
        let mut values = y.to_vec();

        if n > 2 {
            let m = n - 2;
            // column k of Q has entries at rows k, k+1, k+2
            let q = |k: usize| -> [f64; 3] {
                [1.0 / h[k], -1.0 / h[k] - 1.0 / h[k + 1], 1.0 / h[k + 1]]
            };
            let mut diag = vec![0.0; m];
            let mut off1 = vec![0.0; m];
            let mut off2 = vec![0.0; m];
            let mut rhs = vec![0.0; m];
            for k in 0..m {
                let qk = q(k);
                // R
                diag[k] = (h[k] + h[k + 1]) / 3.0;
                if k + 1 < m {
                    off1[k] = h[k + 1] / 6.0;
                }
                // λ Qᵀ W⁻¹ Q
                diag[k] += lambda * (0..3).map(|r| qk[r] * qk[r] / w[k + r]).sum::<f64>();
                if k + 1 < m {
                    let ql = q(k + 1);
                    // shared rows k+1, k+2
                    off1[k] += lambda * (qk[1] * ql[0] / w[k + 1] + qk[2] * ql[1] / w[k + 2]);
                }
                if k + 2 < m {
                    let ql = q(k + 2);
                    off2[k] = lambda * qk[2] * ql[0] / w[k + 2];
                }
                rhs[k] = qk[0] * y[k] + qk[1] * y[k + 1] + qk[2] * y[k + 2];
            }
            let chol = PentaCholesky::new(&diag, &off1, &off2).ok_or(SplineError::NotPositiveDefinite)?;
            let g = chol.solve(&rhs);
            gamma[1..=m].copy_from_slice(&g);

            if lambda > 0.0 {
                // values = y - λ W⁻¹ Q γ
                for (k, &gk) in g.iter().enumerate() {
                    let qk = q(k);
                    for r in 0..3 {
                        values[k + r] -= lambda * qk[r] * gk / w[k + r];
                    }
                }
            }
        }

        let weighted_rss = (0..n).map(|i| w[i] * (y[i] - values[i]).powi(2)).sum();
        Ok(Self {
            knots: x.to_vec(),
            values,
            gamma,
            lambda,
            weighted_rss,
        })
    }

    pub fn knots(&self) -> &[f64] {
        &self.knots
    }

    /// Fitted values at the knots.
    pub fn fitted(&self) -> &[f64] {
        &self.values
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// `Σ wᵢ (yᵢ - g(xᵢ))²`.
    pub fn weighted_rss(&self) -> f64 {
        self.weighted_rss
    }

    /// Slope at the first and last knots.
    fn end_slopes(&self) -> (f64, f64) {
        let (x, g, c) = (&self.knots, &self.values, &self.gamma);
        let n = x.len();
        let h0 = x[1] - x[0];
        let hn = x[n - 1] - x[n - 2];
        (
            (g[1] - g[0]) / h0 - h0 * c[1] / 6.0,
            (g[n - 1] - g[n - 2]) / hn + hn * c[n - 2] / 6.0,
        )
    }

    /// Value at `t`; linear beyond the boundary knots.
    pub fn eval(&self, t: f64) -> f64 {
        let (x, g, c) = (&self.knots, &self.values, &self.gamma);
        let n = x.len();
        if t < x[0] {
            return g[0] + self.end_slopes().0 * (t - x[0]);
        }
        if t > x[n - 1] {
            return g[n - 1] + self.end_slopes().1 * (t - x[n - 1]);
        }
        let i = find_interval(x, t);
        let h = x[i + 1] - x[i];
        let (a, b) = (t - x[i], x[i + 1] - t);
        (a * g[i + 1] + b * g[i]) / h
            - a * b / 6.0 * ((1.0 + a / h) * c[i + 1] + (1.0 + b / h) * c[i])
    }

    pub fn eval_many(&self, t: &[f64]) -> Vec<f64> {
        t.iter().map(|&ti| self.eval(ti)).collect()
    }
}

/// Smoothing spline whose weighted residual sum of squares equals `target`,
/// found by bisection on `ln λ`. If even a straight line fits within
/// `target`, the smoothest fit tried is returned.
pub fn fit_with_target_rss(
    x: &[f64],
    y: &[f64],
    weights: &[f64],
    target: f64,
) -> Result<SmoothingSpline, SplineError> {
    const MAX_DECADES: i32 = 40;
    const BISECTIONS: usize = 60;

    let n = x.len();
    if n < 3 {
        return SmoothingSpline::fit(x, y, Some(weights), 0.0);
    }
    // natural unit of λ: penalty and fit terms balance at the knot spacing
    let span = x[n - 1] - x[0];
    let mean_h = span / (n - 1) as f64;
    let mean_w = weights.iter().sum::<f64>() / n as f64;
    let unit = mean_h.powi(3) * mean_w;

    let fit_at = |t: f64| SmoothingSpline::fit(x, y, Some(weights), unit * 10f64.powf(t));

    let mut lo = -8.0;
    if fit_at(lo)?.weighted_rss() > target {
        return SmoothingSpline::fit(x, y, Some(weights), 0.0);
    }
    let mut hi = lo;
    let mut hi_fit = fit_at(hi)?;
    while hi_fit.weighted_rss() < target {
        if hi >= MAX_DECADES as f64 {
            debug!(lambda = hi_fit.lambda(), "linear fit is within the target, using the smoothest spline");
            return Ok(hi_fit);
        }
        lo = hi;
        hi += 1.0;
        hi_fit = fit_at(hi)?;
    }
    for _ in 0..BISECTIONS {
        let mid = 0.5 * (lo + hi);
        let fit = fit_at(mid)?;
        if fit.weighted_rss() < target {
            lo = mid;
        } else {
            hi = mid;
            hi_fit = fit;
        }
    }
    debug!(lambda = hi_fit.lambda(), rss = hi_fit.weighted_rss(), target, "smoothing parameter");
    Ok(hi_fit)
}

/// Sort by `x` and merge tied abscissas into their mean `y`, returning the
/// distinct knots, merged values and tie counts.
fn sort_and_merge(y: &[f64], x: &[f64], is_sorted: bool) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let order: Vec<usize> = if is_sorted { (0..x.len()).collect() } else { argsort(x) };
    let mut knots: Vec<f64> = Vec::with_capacity(x.len());
    let mut values: Vec<f64> = Vec::with_capacity(x.len());
    let mut counts: Vec<f64> = Vec::with_capacity(x.len());
    for i in order {
        match knots.last() {
            Some(&last) if last == x[i] => {
                let k = knots.len() - 1;
                values[k] += y[i];
                counts[k] += 1.0;
            }
            _ => {
                knots.push(x[i]);
                values.push(y[i]);
                counts.push(1.0);
            }
        }
    }
    for (v, c) in values.iter_mut().zip(&counts) {
        *v /= c;
    }
    (knots, values, counts)
}

/// One-dimensional spline regression of `y` on `x`, evaluated at `x_new`
/// (default: `x`).
///
/// With `smooth`, each knot is weighted by its tie count over the squared
/// local Rice estimate of the noise, and `λ` is set so that the weighted
/// residual sum of squares equals the number of knots. Samples too small for
/// the Rice estimator use unit noise. Without `smooth`, the spline
/// interpolates the (merged) data.
pub fn spline_reg(
    y: &[f64],
    x: &[f64],
    x_new: Option<&[f64]>,
    is_sorted: bool,
    smooth: bool,
) -> Result<Vec<f64>, SplineError> {
    let n = x.len();
    if y.len() != n {
        return Err(SplineError::LengthMismatch { expected: n, got: y.len() });
    }
    let (knots, values, counts) = sort_and_merge(y, x, is_sorted);
    validate_sorted(&knots)?;
    if knots.len() < 2 {
        return Err(SplineError::TooFewPoints(knots.len()));
    }

    let spline = if smooth {
        let weights = match rice_stderr(&values, &knots, true) {
            Ok(s) => {
                let smax = s.iter().cloned().fold(0.0, f64::max);
                if smax > 0.0 {
                    let floor = 1e-8 * smax;
                    Some(counts.iter().zip(&s).map(|(c, si)| c / si.max(floor).powi(2)).collect::<Vec<f64>>())
                } else {
                    None
                }
            }
            Err(StatsError::TooFewObservations { .. }) => Some(counts.clone()),
            Err(e) => return Err(e.into()),
        };
        match weights {
            Some(w) => fit_with_target_rss(&knots, &values, &w, knots.len() as f64)?,
            // noise-free data
            None => SmoothingSpline::fit(&knots, &values, None, 0.0)?,
        }
    } else {
        SmoothingSpline::fit(&knots, &values, Some(&counts), 0.0)?
    };
    Ok(spline.eval_many(x_new.unwrap_or(x)))
}
