//! Least-squares projections, two-stage least squares and flexible
//! regression of `y` on covariates.
//!
//! Covariates come as `(nobs, m)` matrices and never include a constant
//! column: the routines add it.

use rand::Rng;
use tracing::debug;

use super::{mean, require_same_len, variance, StatsError};
use crate::linalg::lstsq;
use crate::matrix::ShapeError;
use crate::random::{seeded_rng, DEFAULT_SEED};
use crate::spline::spline_reg;
use crate::Matrix;

/// Below this variance a variable is treated as constant and its `R²` is 1.
const MIN_VARIANCE: f64 = 1e-12;

/// Non-decreasing index tuples of length `q` from `0..m`, in lexicographic
/// order.
fn combinations_with_replacement(m: usize, q: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    let mut current = Vec::with_capacity(q);
    fn recurse(m: usize, q: usize, from: usize, current: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
        if current.len() == q {
            out.push(current.clone());
            return;
        }
        for i in from..m {
            current.push(i);
            recurse(m, q, i, current, out);
            current.pop();
        }
    }
    recurse(m, q, 0, &mut current, &mut out);
    out
}

/// Design matrix of all monomials of total degree at most `p` in the
/// columns of `z`, starting with the constant.
///
/// With one column this is `1, z, ..., z^p`. With several columns the
/// monomials of each degree are listed in lexicographic order of the
/// variables, and the basis may have at most `round(nobs / 5)` terms.
pub fn polynomial_terms(z: &Matrix<f64>, p: usize) -> Result<Matrix<f64>, StatsError> {
    let (nobs, m) = z.shape();
    if m == 1 {
        let zc = z.col(0);
        return Ok(Matrix::from_fn(nobs, p + 1, |i, k| zc[i].powi(k as i32)));
    }

    let max_terms = (nobs as f64 / 5.0).round() as usize;
    let monomials: Vec<Vec<usize>> = (1..=p)
        .flat_map(|q| combinations_with_replacement(m, q))
        .collect();
    let nterms = 1 + monomials.len();
    if nterms >= max_terms {
        return Err(StatsError::TooManyTerms {
            max: max_terms,
            needed: nterms,
        });
    }
    debug!(degree = p, nterms, "polynomial basis");

    let mut out = Matrix::fill(nobs, nterms, 1.0);
    for (k, mono) in monomials.iter().enumerate() {
        let col = out.col_mut(k + 1);
        for &var in mono {
            for (o, &zv) in col.iter_mut().zip(z.col(var)) {
                *o *= zv;
            }
        }
    }
    Ok(out)
}

/// Result of [`proj_z`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Projection {
    /// Fitted values, one column per column of `w`.
    pub fitted: Matrix<f64>,
    /// Coefficients on the polynomial basis, one column per column of `w`.
    pub coeffs: Matrix<f64>,
    /// `var(fitted) / var(w)` for each column; 1 for a constant column.
    pub r2: Vec<f64>,
}

fn final_projection(basis: &Matrix<f64>, w: &Matrix<f64>) -> Result<Projection, StatsError> {
    let coeffs = lstsq(basis, w)?;
    let fitted = basis * &coeffs;
    let r2 = (0..w.ncols())
        .map(|k| {
            let var_w = variance(w.col(k));
            if var_w > MIN_VARIANCE {
                variance(fitted.col(k)) / var_w
            } else {
                1.0
            }
        })
        .collect();
    Ok(Projection { fitted, coeffs, r2 })
}

/// Project each column of `w` on the polynomials of degree at most `p` in
/// the columns of `z`.
pub fn proj_z(w: &Matrix<f64>, z: &Matrix<f64>, p: usize) -> Result<Projection, StatsError> {
    require_same_len(z.nrows(), w.nrows())?;
    let basis = polynomial_terms(z, p)?;
    final_projection(&basis, w)
}

/// Full output of [`tsls`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TslsResults {
    /// Second-stage coefficients: constant first, then one per column of `x`.
    pub iv_estimates: Vec<f64>,
    /// First-stage `R²` of each column of `x`.
    pub r2_first_iv: Vec<f64>,
    /// `R²` of the projection of `y` on the instruments.
    pub r2_y: f64,
    /// `R²` of the second stage.
    pub r2_second: f64,
    /// `y` projected on the instruments.
    pub y_proj: Vec<f64>,
    pub y_coeffs: Vec<f64>,
    /// `x` projected on the instruments.
    pub x_iv_proj: Matrix<f64>,
    pub b_proj_iv: Matrix<f64>,
}

/// Two-stage least squares of `y` on `x` with instruments `z`.
///
/// Both `x` and `y` are projected linearly on `z`; the projected `y` is then
/// regressed on the projected `x`.
pub fn tsls(y: &[f64], x: &Matrix<f64>, z: &Matrix<f64>) -> Result<TslsResults, StatsError> {
    let first = proj_z(x, z, 1)?;
    let y_stage = proj_z(&Matrix::from_column(y), z, 1)?;
    let second = proj_z(&y_stage.fitted, &first.fitted, 1)?;
    Ok(TslsResults {
        iv_estimates: second.coeffs.into_vec(),
        r2_first_iv: first.r2,
        r2_y: y_stage.r2[0],
        r2_second: second.r2[0],
        y_proj: y_stage.fitted.into_vec(),
        y_coeffs: y_stage.coeffs.into_vec(),
        x_iv_proj: first.fitted,
        b_proj_iv: first.coeffs,
    })
}

// ── Kernel regression ───────────────────────────────────────────────

/// Bandwidth selection settings for [`kernel_regression`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KernelSettings {
    /// Size of the cross-validation subsamples; `None` means
    /// `round(200^{(m+4)/5})` for `m` regressors.
    pub n_sub: Option<usize>,
    /// Number of subsamples whose bandwidths are averaged.
    pub n_res: usize,
    /// Seed of the subsample draws.
    pub seed: u64,
    /// Coordinate-search sweeps over the bandwidths.
    pub sweeps: usize,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            n_sub: None,
            n_res: 1,
            seed: DEFAULT_SEED,
            sweeps: 3,
        }
    }
}

/// Fitted values and bandwidths of a kernel regression.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KernelFit {
    pub fitted: Vec<f64>,
    pub bandwidths: Vec<f64>,
}

/// Nadaraya-Watson estimate at `point` from the rows of `x`, skipping row
/// `skip` if given.
fn nw_estimate(y: &[f64], x: &Matrix<f64>, point: &[f64], h: &[f64], skip: Option<usize>) -> f64 {
    let (mut num, mut den) = (0.0, 0.0);
    for i in 0..x.nrows() {
        if skip == Some(i) {
            continue;
        }
        let mut arg = 0.0;
        for (j, (&pj, &hj)) in point.iter().zip(h).enumerate() {
            let u = (x[(i, j)] - pj) / hj;
            arg += u * u;
        }
        let k = (-0.5 * arg).exp();
        num += k * y[i];
        den += k;
    }
    if den > 0.0 {
        num / den
    } else {
        mean(y)
    }
}

fn loo_cv(y: &[f64], x: &Matrix<f64>, h: &[f64]) -> f64 {
    (0..x.nrows())
        .map(|i| {
            let r = y[i] - nw_estimate(y, x, &x.row(i), h, Some(i));
            r * r
        })
        .sum::<f64>()
        / x.nrows() as f64
}

/// Rule-of-thumb starting bandwidths `1.06 σ_j n^{-1/(m+4)}`.
fn silverman_bandwidths(x: &Matrix<f64>) -> Vec<f64> {
    let n = x.nrows() as f64;
    let m = x.ncols() as f64;
    x.columns()
        .map(|c| {
            let sd = variance(c).sqrt();
            let sd = if sd > 0.0 { sd } else { 1.0 };
            1.06 * sd * n.powf(-1.0 / (m + 4.0))
        })
        .collect()
}

/// Least-squares cross-validated bandwidths, by coordinate search over a
/// geometric grid around the rule of thumb.
fn cv_bandwidths(y: &[f64], x: &Matrix<f64>, sweeps: usize) -> Vec<f64> {
    let mut h = silverman_bandwidths(x);
    let mut best = loo_cv(y, x, &h);
    let mut span = 4.0_f64;
    for _ in 0..sweeps.max(1) {
        for j in 0..h.len() {
            let center = h[j];
            for step in -8..=8 {
                let candidate = center * span.powf(step as f64 / 8.0);
                let mut trial = h.clone();
                trial[j] = candidate;
                let cv = loo_cv(y, x, &trial);
                if cv < best {
                    best = cv;
                    h = trial;
                }
            }
        }
        span = span.sqrt();
    }
    h
}

/// Local-constant kernel regression of `y` on the columns of `x` with
/// product Gaussian kernels.
///
/// Bandwidths minimize the leave-one-out squared error on random subsamples
/// of size `n_sub`, are averaged over `n_res` subsamples and rescaled by
/// `(n_sub / n)^{1/(m+4)}`. With `n_sub ≥ n` the full sample is used once.
/// Fitted values are computed at the sample points.
pub fn kernel_regression(
    y: &[f64],
    x: &Matrix<f64>,
    settings: &KernelSettings,
) -> Result<KernelFit, StatsError> {
    let (n, m) = x.shape();
    require_same_len(n, y.len())?;
    if n < 2 {
        return Err(StatsError::TooFewObservations { needed: 2, got: n });
    }
    let mf = m as f64;
    let n_sub = settings
        .n_sub
        .unwrap_or_else(|| 200_f64.powf((mf + 4.0) / 5.0).round() as usize)
        .max(2);

    let bandwidths = if n_sub >= n {
        cv_bandwidths(y, x, settings.sweeps)
    } else {
        let mut rng = seeded_rng(settings.seed);
        let n_res = settings.n_res.max(1);
        let scale = (n_sub as f64 / n as f64).powf(1.0 / (mf + 4.0));
        let mut acc = vec![0.0; m];
        for _ in 0..n_res {
            let rows = sample_without_replacement(&mut rng, n, n_sub);
            let xs = x.select_rows(&rows);
            let ys: Vec<f64> = rows.iter().map(|&i| y[i]).collect();
            for (a, h) in acc.iter_mut().zip(cv_bandwidths(&ys, &xs, settings.sweeps)) {
                *a += h * scale;
            }
        }
        acc.iter().map(|a| a / n_res as f64).collect()
    };
    debug!(?bandwidths, n_sub, "kernel regression bandwidths");

    let fitted = (0..n)
        .map(|i| nw_estimate(y, x, &x.row(i), &bandwidths, None))
        .collect();
    Ok(KernelFit { fitted, bandwidths })
}

/// Partial Fisher-Yates: `k` distinct indices from `0..n`.
fn sample_without_replacement<R: Rng>(rng: &mut R, n: usize, k: usize) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..n).collect();
    for i in 0..k.min(n) {
        let j = rng.random_range(i..n);
        idx.swap(i, j);
    }
    idx.truncate(k);
    idx
}

/// What [`flexible_reg`] fits.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RegressionMode {
    /// Kernel regression.
    Nonparametric(KernelSettings),
    /// Smoothing spline; one regressor only.
    Spline,
    /// Polynomial of the given total degree.
    Polynomial(usize),
}

/// `E[y | x]` at the sample points, for each column of `y`.
pub fn flexible_reg(
    y: &Matrix<f64>,
    x: &Matrix<f64>,
    mode: RegressionMode,
) -> crate::Result<Matrix<f64>> {
    let (n, ny) = y.shape();
    require_same_len(x.nrows(), n)?;
    match mode {
        RegressionMode::Nonparametric(settings) => {
            let mut out = Matrix::zeros(n, ny);
            for k in 0..ny {
                let fit = kernel_regression(y.col(k), x, &settings)?;
                out.col_mut(k).copy_from_slice(&fit.fitted);
            }
            Ok(out)
        }
        RegressionMode::Spline => {
            if x.ncols() != 1 {
                return Err(ShapeError::DimensionMismatch {
                    expected: (n, 1),
                    got: x.shape(),
                }
                .into());
            }
            let mut out = Matrix::zeros(n, ny);
            for k in 0..ny {
                let fit = spline_reg(y.col(k), x.col(0), None, false, true)?;
                out.col_mut(k).copy_from_slice(&fit);
            }
            Ok(out)
        }
        RegressionMode::Polynomial(p) => Ok(proj_z(y, x, p)?.fitted),
    }
}
