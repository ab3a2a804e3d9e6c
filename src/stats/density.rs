//! Normal densities and Gaussian kernel density estimation.

use core::f64::consts::PI;

use tracing::debug;

use super::{mean, quantiles, require_same_len, variance, StatsError};
use crate::linalg::Cholesky;
use crate::matrix::{lexico_grid, ShapeError};
use crate::Matrix;

/// Default sample size that [`estimate_pdf`] scales by `(4 + d) / 5` to
/// decide between a kernel estimate and a fitted normal.
pub const DEFAULT_MIN_SIZE_NONPAR: usize = 200;

/// Density of `N(mean, var)` at each point of `x`.
pub fn normal_pdf(x: &[f64], mean: f64, var: f64) -> Vec<f64> {
    let norm = (2.0 * PI * var).sqrt();
    x.iter()
        .map(|&xi| {
            let r = xi - mean;
            (-0.5 * r * r / var).exp() / norm
        })
        .collect()
}

fn check_square_of(cov: &Matrix<f64>, d: usize) -> Result<(), ShapeError> {
    if cov.shape() == (d, d) {
        Ok(())
    } else {
        Err(ShapeError::DimensionMismatch {
            expected: (d, d),
            got: cov.shape(),
        })
    }
}

/// Density of `N(mean, cov)` at each row of the `(n, d)` matrix `x`.
pub fn multivariate_normal_pdf(
    x: &Matrix<f64>,
    mean: &[f64],
    cov: &Matrix<f64>,
) -> Result<Vec<f64>, StatsError> {
    let d = x.ncols();
    require_same_len(d, mean.len())?;
    check_square_of(cov, d)?;
    let chol = Cholesky::new(cov)?;
    let log_norm = -0.5 * (d as f64 * (2.0 * PI).ln() + chol.ln_det());
    Ok((0..x.nrows())
        .map(|i| {
            let r: Vec<f64> = x.row(i).iter().zip(mean).map(|(a, m)| a - m).collect();
            let z = chol.solve_lower(&r);
            let q: f64 = z.iter().map(|v| v * v).sum();
            (log_norm - 0.5 * q).exp()
        })
        .collect())
}

/// Column means and unbiased covariance of the rows of `x`.
fn mean_and_cov(x: &Matrix<f64>, w: Option<&[f64]>) -> (Vec<f64>, Matrix<f64>) {
    let (n, d) = x.shape();
    let uniform = vec![1.0 / n as f64; n];
    let w = w.unwrap_or(&uniform[..]);
    let means: Vec<f64> = x
        .columns()
        .map(|c| c.iter().zip(w).map(|(v, wi)| v * wi).sum())
        .collect();
    // unbiased for normalized weights: divide by 1 - Σw²
    let denom = 1.0 - w.iter().map(|wi| wi * wi).sum::<f64>();
    let cov = Matrix::from_fn(d, d, |a, b| {
        let (ca, cb) = (x.col(a), x.col(b));
        (0..n)
            .map(|i| w[i] * (ca[i] - means[a]) * (cb[i] - means[b]))
            .sum::<f64>()
            / denom
    });
    (means, cov)
}

/// Weighted Gaussian kernel density estimator with Silverman's bandwidth.
///
/// The kernel covariance is the weighted sample covariance scaled by
/// `(n_eff (d + 2) / 4)^{-2/(d+4)}`, where `n_eff = (Σw)² / Σw²`.
#[derive(Debug, Clone)]
pub struct GaussianKde {
    data: Matrix<f64>,
    weights: Vec<f64>,
    chol: Cholesky<f64>,
    log_norm: f64,
    factor: f64,
}

impl GaussianKde {
    /// Fit on the rows of the `(n, d)` matrix `data`, with optional
    /// observation weights.
    pub fn new(data: &Matrix<f64>, weights: Option<&[f64]>) -> Result<Self, StatsError> {
        let (n, d) = data.shape();
        if n < 2 {
            return Err(StatsError::TooFewObservations { needed: 2, got: n });
        }
        let weights: Vec<f64> = match weights {
            Some(w) => {
                require_same_len(n, w.len())?;
                let total: f64 = w.iter().sum();
                w.iter().map(|wi| wi / total).collect()
            }
            None => vec![1.0 / n as f64; n],
        };
        let n_eff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();
        let df = d as f64;
        let factor = (n_eff * (df + 2.0) / 4.0).powf(-1.0 / (df + 4.0));
        let (_, data_cov) = mean_and_cov(data, Some(&weights));
        let kernel_cov = data_cov * (factor * factor);
        let chol = Cholesky::new(&kernel_cov)?;
        let log_norm = -0.5 * (df * (2.0 * PI).ln() + chol.ln_det());
        debug!(n, d, n_eff, factor, "Gaussian KDE");
        Ok(Self {
            data: data.clone(),
            weights,
            chol,
            log_norm,
            factor,
        })
    }

    /// Bandwidth factor applied to the data covariance.
    pub fn factor(&self) -> f64 {
        self.factor
    }

    /// Estimated density at each row of `points`.
    pub fn evaluate(&self, points: &Matrix<f64>) -> Result<Vec<f64>, StatsError> {
        let d = self.data.ncols();
        require_same_len(d, points.ncols())?;
        let mut diff = vec![0.0; d];
        Ok((0..points.nrows())
            .map(|p| {
                let mut total = 0.0;
                for (i, &wi) in self.weights.iter().enumerate() {
                    for (j, dj) in diff.iter_mut().enumerate() {
                        *dj = points[(p, j)] - self.data[(i, j)];
                    }
                    let z = self.chol.solve_lower(&diff);
                    let q: f64 = z.iter().map(|v| v * v).sum();
                    total += wi * (self.log_norm - 0.5 * q).exp();
                }
                total
            })
            .collect())
    }
}

/// Density of the observations `obs` (rows of an `(n, d)` matrix) at the
/// rows of `points`.
///
/// Uses a [`GaussianKde`] when `n > min_size_nonpar^{(4+d)/5}` and a fitted
/// normal otherwise. In the normal case, given weights rescale the density
/// at each point by `w / mean(w)`, which requires one point per
/// observation.
pub fn estimate_pdf(
    obs: &Matrix<f64>,
    points: &Matrix<f64>,
    min_size_nonpar: usize,
    weights: Option<&[f64]>,
) -> Result<Vec<f64>, StatsError> {
    let (n, d) = obs.shape();
    require_same_len(d, points.ncols())?;
    if let Some(w) = weights {
        require_same_len(n, w.len())?;
    }
    let threshold = (min_size_nonpar as f64).powf((4.0 + d as f64) / 5.0);
    if n as f64 > threshold {
        return GaussianKde::new(obs, weights)?.evaluate(points);
    }

    debug!(n, threshold, "sample too small for a kernel estimate, fitting a normal");
    let mut f = if d == 1 {
        let x = obs.col(0);
        normal_pdf(points.col(0), mean(x), variance(x))
    } else {
        let (means, cov) = mean_and_cov(obs, None);
        multivariate_normal_pdf(points, &means, &cov)?
    };
    if let Some(w) = weights {
        require_same_len(n, points.nrows())?;
        let mw = mean(w);
        for (fi, wi) in f.iter_mut().zip(w) {
            *fi *= wi / mw;
        }
    }
    Ok(f)
}

/// Output of [`estimate_densities_at_quantiles`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QuantileDensities {
    /// `(nq^d, d)`: marginal densities on the lexicographic grid.
    pub margins: Matrix<f64>,
    /// `nq^d` joint densities on the grid.
    pub joint: Vec<f64>,
    /// `(nq^d, d)`: the grid of marginal quantiles.
    pub values: Matrix<f64>,
}

/// Marginal densities of each column of `x` at its sample quantiles
/// `qtiles`, and the joint density on the lexicographic grid of those
/// quantiles. With one column the joint and marginal densities coincide.
pub fn estimate_densities_at_quantiles(
    x: &Matrix<f64>,
    qtiles: &[f64],
) -> Result<QuantileDensities, StatsError> {
    let (_, d) = x.shape();
    let nq = qtiles.len();
    let mut margins = Matrix::zeros(nq, d);
    let mut nodes = Matrix::zeros(nq, d);
    for k in 0..d {
        let col = Matrix::from_column(x.col(k));
        let qk = quantiles(x.col(k), qtiles)?;
        let fk = estimate_pdf(&col, &Matrix::from_column(&qk), DEFAULT_MIN_SIZE_NONPAR, None)?;
        nodes.col_mut(k).copy_from_slice(&qk);
        margins.col_mut(k).copy_from_slice(&fk);
    }
    if d == 1 {
        return Ok(QuantileDensities {
            joint: margins.col(0).to_vec(),
            margins,
            values: nodes,
        });
    }
    let values = lexico_grid(&nodes)?;
    let joint = estimate_pdf(x, &values, DEFAULT_MIN_SIZE_NONPAR, None)?;
    Ok(QuantileDensities {
        margins: lexico_grid(&margins)?,
        joint,
        values,
    })
}
