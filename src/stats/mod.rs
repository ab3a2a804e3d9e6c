//! Empirical distributions and descriptive statistics.
//!
//! - [`ecdf`], [`inv_ecdf`] and [`quantile`]: ranks and sample quantiles.
//! - [`rice_stderr`]: local estimate of the conditional standard error of
//!   `y` given a scalar `x`.
//! - [`describe`]: moments and range of a sample.
//! - [`regression`]: projections on polynomials, two-stage least squares and
//!   flexible (kernel, spline, polynomial) regression.
//! - [`density`]: normal and Gaussian-kernel density estimates.
//!
//! ```
//! use bsutils::stats::{ecdf, inv_ecdf};
//!
//! let x = [1.2, -3.6, 6.7, 1.1, -9.0];
//! assert_eq!(ecdf(&x), vec![0.8, 0.4, 1.0, 0.6, 0.2]);
//! assert_eq!(inv_ecdf(&x, 0.4).unwrap(), -3.6);
//! ```

pub mod density;
pub mod regression;


use thiserror::Error;
use tracing::info;

use crate::linalg::LinalgError;
use crate::matrix::ShapeError;

/// Errors from the statistical routines.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StatsError {
    /// Not enough observations for the requested statistic.
    #[error("need at least {needed} observations, got {got}")]
    TooFewObservations { needed: usize, got: usize },
    /// A probability outside `[0, 1]`.
    #[error("quantile level {0} is not in [0, 1]")]
    QuantileOutOfRange(f64),
    /// Two inputs that must have the same length do not.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    /// The polynomial basis would have more terms than allowed.
    #[error("polynomial basis needs {needed} terms, at most {max} allowed")]
    TooManyTerms { max: usize, needed: usize },
    /// Inputs have incompatible shapes.
    #[error(transparent)]
    Shape(#[from] ShapeError),
    /// A decomposition failed.
    #[error(transparent)]
    Linalg(#[from] LinalgError),
}

pub(crate) fn require_same_len(expected: usize, got: usize) -> Result<(), StatsError> {
    if expected == got {
        Ok(())
    } else {
        Err(StatsError::LengthMismatch { expected, got })
    }
}

pub(crate) fn sorted_copy(v: &[f64]) -> Vec<f64> {
    let mut s = v.to_vec();
    s.sort_by(f64::total_cmp);
    s
}

/// Indices that sort `v` in increasing order; ties keep their original
/// order.
pub fn argsort(v: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..v.len()).collect();
    idx.sort_by(|&i, &j| v[i].total_cmp(&v[j]));
    idx
}

pub(crate) fn mean(v: &[f64]) -> f64 {
    v.iter().sum::<f64>() / v.len() as f64
}

/// Population variance (divides by `n`).
pub(crate) fn variance(v: &[f64]) -> f64 {
    let m = mean(v);
    v.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / v.len() as f64
}

/// Empirical cdf at each observation: the value of rank `k` (1-based) gets
/// `k / n`.
pub fn ecdf(x: &[f64]) -> Vec<f64> {
    let n = x.len() as f64;
    let mut out = vec![0.0; x.len()];
    for (rank, i) in argsort(x).into_iter().enumerate() {
        out[i] = (rank + 1) as f64 / n;
    }
    out
}

/// Sorted sample extended below by `2 v₁ - v₂` and above by `v_n`.
fn extended_sorted(v: &[f64]) -> Result<Vec<f64>, StatsError> {
    let n = v.len();
    if n < 2 {
        return Err(StatsError::TooFewObservations { needed: 2, got: n });
    }
    let sorted = sorted_copy(v);
    let mut s = Vec::with_capacity(n + 2);
    s.push(2.0 * sorted[0] - sorted[1]);
    s.extend_from_slice(&sorted);
    s.push(sorted[n - 1]);
    Ok(s)
}

fn inv_ecdf_sorted(s: &[f64], q: f64) -> Result<f64, StatsError> {
    if !(0.0..=1.0).contains(&q) {
        return Err(StatsError::QuantileOutOfRange(q));
    }
    let n = (s.len() - 2) as f64;
    let nq = n * q;
    let k = (nq.floor() as usize).min(s.len() - 2);
    Ok(s[k] + (nq - k as f64) * (s[k + 1] - s[k]))
}

/// The `q`-quantile of `v`, consistent with [`ecdf`].
///
/// Interpolates linearly between order statistics, so that
/// `inv_ecdf(v, k/n)` is the observation of rank `k`. Below `1/n` the
/// interpolation continues to the point `2 v₁ - v₂`.
pub fn inv_ecdf(v: &[f64], q: f64) -> Result<f64, StatsError> {
    inv_ecdf_sorted(&extended_sorted(v)?, q)
}

/// [`inv_ecdf`] at several levels, sorting `v` once.
pub fn inv_ecdf_many(v: &[f64], q: &[f64]) -> Result<Vec<f64>, StatsError> {
    let s = extended_sorted(v)?;
    q.iter().map(|&qi| inv_ecdf_sorted(&s, qi)).collect()
}

/// Sample quantile with linear interpolation between order statistics
/// (`(n - 1) q` positions, the usual default of array libraries).
pub fn quantile(v: &[f64], q: f64) -> Result<f64, StatsError> {
    quantiles_sorted(&sorted_copy(v), &[q]).map(|r| r[0])
}

/// [`quantile`] at several levels.
pub fn quantiles(v: &[f64], q: &[f64]) -> Result<Vec<f64>, StatsError> {
    quantiles_sorted(&sorted_copy(v), q)
}

fn quantiles_sorted(s: &[f64], q: &[f64]) -> Result<Vec<f64>, StatsError> {
    if s.is_empty() {
        return Err(StatsError::TooFewObservations { needed: 1, got: 0 });
    }
    let last = s.len() - 1;
    q.iter()
        .map(|&qi| {
            if !(0.0..=1.0).contains(&qi) {
                return Err(StatsError::QuantileOutOfRange(qi));
            }
            let h = last as f64 * qi;
            let lo = (h.floor() as usize).min(last);
            let hi = (lo + 1).min(last);
            Ok(s[lo] + (h - lo as f64) * (s[hi] - s[lo]))
        })
        .collect()
}

/// Local Rice estimator of the standard error of `y` given `x`.
///
/// Observations are ordered by `x` (unless `sorted` says they already are).
/// Each one gets half the mean of the `2k - 1` squared first differences of
/// `y` in a window of `2k` neighbors, with `k = ⌊⌊√n / 2⌋ / 2⌋`; the first
/// and last `k` observations share the full-width windows at the edges. Results are returned in the
/// order of the input.
pub fn rice_stderr(y: &[f64], x: &[f64], sorted: bool) -> Result<Vec<f64>, StatsError> {
    let n = x.len();
    require_same_len(n, y.len())?;
    let n_neighbors = ((n as f64).sqrt() / 2.0) as usize;
    let k = n_neighbors / 2;
    if k < 1 {
        return Err(StatsError::TooFewObservations { needed: 16, got: n });
    }

    let order: Vec<usize> = if sorted { (0..n).collect() } else { argsort(x) };
    let ys: Vec<f64> = order.iter().map(|&i| y[i]).collect();

    // cum[i] = sum of squared differences d_0..d_{i-1}
    let mut cum = vec![0.0; n];
    for i in 1..n {
        let d = ys[i] - ys[i - 1];
        cum[i] = cum[i - 1] + d * d;
    }
    let width = 2 * k;
    let fac = 1.0 / (2.0 * (width - 1) as f64);
    let window = |start: usize| ((cum[start + width - 1] - cum[start]) * fac).sqrt();

    let mut out = vec![0.0; n];
    for (pos, &i) in order.iter().enumerate() {
        let start = pos.saturating_sub(k).min(n - width);
        out[i] = window(start);
    }
    Ok(out)
}

/// Summary statistics of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Description {
    pub nobs: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    /// Unbiased sample variance.
    pub variance: f64,
    pub skewness: f64,
    /// Excess kurtosis (zero for a normal).
    pub kurtosis: f64,
}

impl Description {
    pub fn stderr(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Number of observations, range, mean, variance, skewness and kurtosis of
/// `v`. Skewness and kurtosis use the biased moment estimators.
pub fn describe(v: &[f64]) -> Result<Description, StatsError> {
    let n = v.len();
    if n < 2 {
        return Err(StatsError::TooFewObservations { needed: 2, got: n });
    }
    let nf = n as f64;
    let m = mean(v);
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    let (mut min, mut max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &x in v {
        let d = x - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
        min = min.min(x);
        max = max.max(x);
    }
    let (m2, m3, m4) = (m2 / nf, m3 / nf, m4 / nf);
    Ok(Description {
        nobs: n,
        min,
        max,
        mean: m,
        variance: m2 * nf / (nf - 1.0),
        skewness: m3 / m2.powf(1.5),
        kurtosis: m4 / (m2 * m2) - 3.0,
    })
}

/// [`describe`], reporting the result as an `info` event.
pub fn describe_and_log(v: &[f64], name: &str) -> Result<Description, StatsError> {
    let d = describe(v)?;
    info!(
        sample = name,
        nobs = d.nobs,
        min = d.min,
        max = d.max,
        mean = d.mean,
        stderr = d.stderr(),
        "descriptive statistics"
    );
    Ok(d)
}
