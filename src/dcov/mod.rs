//! Distance covariance and partial distance covariance (Székely and Rizzo),
//! with bootstrap tests of independence and conditional independence.
//!
//! Observations are the rows of a `(n, d)` [`Matrix`]; wrap a single
//! variable with [`Matrix::from_column`].
//!
//! ```
//! use bsutils::dcov::dcov_dcor;
//! use bsutils::Matrix;
//!
//! let x = Matrix::from_column(&[0.0, 1.0, 2.0, 3.0, 4.0]);
//! let y = Matrix::from_column(&[0.0, 2.0, 4.0, 6.0, 8.0]);
//! let res = dcov_dcor(&x, &y, false).unwrap();
//! assert!((res.dcor - 1.0).abs() < 1e-12);
//! ```


use rand::Rng;
use thiserror::Error;
use tracing::debug;

use crate::random::resample_indices;
use crate::Matrix;

/// Default number of bootstrap draws.
pub const DEFAULT_NDRAWS: usize = 199;

/// Errors from distance covariance computations.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum DcovError {
    /// The samples do not have the same number of observations.
    #[error("samples have {expected} and {got} observations")]
    RowMismatch { expected: usize, got: usize },
    /// The unbiased statistics need at least 4 observations.
    #[error("unbiased statistics need at least 4 observations, got {0}")]
    TooFewObservations(usize),
    /// A correlation denominator is zero or negative, e.g. for a constant sample.
    #[error("zero denominator in distance correlation")]
    ZeroDenominator,
}

/// Distance covariance of two samples.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DcovResults {
    /// `dCov²(X, Y)`.
    pub dcov: f64,
    /// `n dCov²(X, Y)`, the test statistic.
    pub dcov_stat: f64,
    /// `dCor²(X, Y)`.
    pub dcor: f64,
    /// Doubly centered distances of `X`.
    pub x_dd: Matrix<f64>,
    /// Doubly centered distances of `Y`.
    pub y_dd: Matrix<f64>,
    pub unbiased: bool,
}

/// Partial distance covariance of `X` and `Y` given `Z`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PdcovResults {
    pub pdcov: f64,
    /// `n pdCov(X, Y; Z)`.
    pub pdcov_stat: f64,
    pub pdcor: f64,
    pub x_dd: Matrix<f64>,
    pub y_dd: Matrix<f64>,
    pub z_dd: Matrix<f64>,
}

/// Euclidean distances between all pairs of rows of `t`.
pub fn distance_matrix(t: &Matrix<f64>) -> Matrix<f64> {
    let n = t.nrows();
    let mut sq = Matrix::<f64>::zeros(n, n);
    for c in t.columns() {
        for j in 0..n {
            for i in 0..n {
                let d = c[i] - c[j];
                sq[(i, j)] += d * d;
            }
        }
    }
    sq.map(|x| x.sqrt())
}

/// Double centering of the square matrix `a`.
///
/// With `unbiased`, uses the U-centering of Székely and Rizzo (2014):
/// row and column sums are divided by `n - 2`, the grand sum by
/// `(n - 1)(n - 2)`, and the diagonal is zeroed.
pub fn double_decenter(a: &Matrix<f64>, unbiased: bool) -> Matrix<f64> {
    let n = a.nrows();
    let nf = n as f64;
    let col_sums = a.col_sums();
    let row_sums = a.row_sums();
    let total: f64 = col_sums.iter().sum();
    let (fac1, fac2) = if unbiased { (nf - 1.0, nf - 2.0) } else { (nf, nf) };
    let mut out = Matrix::from_fn(n, n, |i, j| {
        a[(i, j)] - col_sums[j] / fac2 - row_sums[i] / fac2 + total / (fac1 * fac2)
    });
    if unbiased {
        out.fill_diagonal(0.0);
    }
    out
}

/// `Σ a∘b / (n (n - 3))` if `unbiased`, else `Σ a∘b / n²`.
pub fn dcov_prod(a: &Matrix<f64>, b: &Matrix<f64>, unbiased: bool) -> f64 {
    let n = a.nrows() as f64;
    let fac3 = if unbiased { n - 3.0 } else { n };
    let s: f64 = a.as_slice().iter().zip(b.as_slice()).map(|(x, y)| x * y).sum();
    s / (n * fac3)
}

fn check_samples(n: usize, others: &[&Matrix<f64>], unbiased: bool) -> Result<(), DcovError> {
    for m in others {
        if m.nrows() != n {
            return Err(DcovError::RowMismatch { expected: n, got: m.nrows() });
        }
    }
    if unbiased && n < 4 {
        return Err(DcovError::TooFewObservations(n));
    }
    if n == 0 {
        return Err(DcovError::TooFewObservations(0));
    }
    Ok(())
}

fn positive(d: f64) -> Result<f64, DcovError> {
    if d > 0.0 && d.is_finite() {
        Ok(d)
    } else {
        Err(DcovError::ZeroDenominator)
    }
}

/// Distance covariance and correlation of `x` and `y`.
pub fn dcov_dcor(x: &Matrix<f64>, y: &Matrix<f64>, unbiased: bool) -> Result<DcovResults, DcovError> {
    let n = x.nrows();
    check_samples(n, &[y], unbiased)?;
    let x_dd = double_decenter(&distance_matrix(x), unbiased);
    let y_dd = double_decenter(&distance_matrix(y), unbiased);
    let dcov = dcov_prod(&x_dd, &y_dd, unbiased);
    let denom = positive(dcov_prod(&x_dd, &x_dd, unbiased) * dcov_prod(&y_dd, &y_dd, unbiased))?;
    Ok(DcovResults {
        dcov,
        dcov_stat: n as f64 * dcov,
        dcor: dcov / denom.sqrt(),
        x_dd,
        y_dd,
        unbiased,
    })
}

/// Bootstrap p-value of the test that `X` and `Y` are independent.
///
/// Each draw resamples the observations with replacement and recomputes the
/// statistic on the rearranged distance matrices;
/// `p = (1 + #{boot > stat}) / (1 + ndraws)`.
pub fn pvalue_dcov<R: Rng>(res: &DcovResults, ndraws: usize, rng: &mut R) -> f64 {
    let n = res.x_dd.nrows();
    let mut exceed = 0usize;
    for idraw in 0..ndraws {
        if idraw % 50 == 0 {
            debug!(idraw, ndraws, "dcov bootstrap");
        }
        let draws = resample_indices(rng, n);
        let xi = res.x_dd.select(&draws, &draws);
        let yi = res.y_dd.select(&draws, &draws);
        let stat = n as f64 * dcov_prod(&xi, &yi, res.unbiased);
        if res.dcov_stat < stat {
            exceed += 1;
        }
    }
    (1.0 + exceed as f64) / (1.0 + ndraws as f64)
}

/// Cross products `C_XY`, `C_XZ`, `C_YZ`, `C_ZZ` and the partial covariance.
fn partial_cov(x_dd: &Matrix<f64>, y_dd: &Matrix<f64>, z_dd: &Matrix<f64>) -> Result<f64, DcovError> {
    let c_xy = dcov_prod(x_dd, y_dd, true);
    let c_xz = dcov_prod(x_dd, z_dd, true);
    let c_yz = dcov_prod(y_dd, z_dd, true);
    let c_zz = positive(dcov_prod(z_dd, z_dd, true))?;
    Ok(c_xy - c_xz * c_yz / c_zz)
}

/// Partial distance covariance and correlation of `x` and `y` given `z`.
///
/// Always uses the unbiased (U-centered) statistics.
pub fn pdcov_pdcor(x: &Matrix<f64>, y: &Matrix<f64>, z: &Matrix<f64>) -> Result<PdcovResults, DcovError> {
    let n = x.nrows();
    check_samples(n, &[y, z], true)?;
    let x_dd = double_decenter(&distance_matrix(x), true);
    let y_dd = double_decenter(&distance_matrix(y), true);
    let z_dd = double_decenter(&distance_matrix(z), true);

    let c_xx = dcov_prod(&x_dd, &x_dd, true);
    let c_yy = dcov_prod(&y_dd, &y_dd, true);
    let c_xz = dcov_prod(&x_dd, &z_dd, true);
    let c_yz = dcov_prod(&y_dd, &z_dd, true);
    let c_zz = positive(dcov_prod(&z_dd, &z_dd, true))?;
    let pdcov = partial_cov(&x_dd, &y_dd, &z_dd)?;
    let denom = positive((c_xx - c_xz * c_xz / c_zz) * (c_yy - c_yz * c_yz / c_zz))?;
    Ok(PdcovResults {
        pdcov,
        pdcov_stat: n as f64 * pdcov,
        pdcor: pdcov / denom.sqrt(),
        x_dd,
        y_dd,
        z_dd,
    })
}

/// Bootstrap p-value of the test that `X` and `Y` are independent given `Z`.
///
/// Draws whose resampled `Z` distances are degenerate are counted as not
/// exceeding the statistic.
pub fn pvalue_pdcov<R: Rng>(res: &PdcovResults, ndraws: usize, rng: &mut R) -> f64 {
    let n = res.x_dd.nrows();
    let mut exceed = 0usize;
    for idraw in 0..ndraws {
        if idraw % 50 == 0 {
            debug!(idraw, ndraws, "pdcov bootstrap");
        }
        let draws = resample_indices(rng, n);
        let xi = res.x_dd.select(&draws, &draws);
        let yi = res.y_dd.select(&draws, &draws);
        let zi = res.z_dd.select(&draws, &draws);
        if let Ok(p) = partial_cov(&xi, &yi, &zi) {
            if res.pdcov_stat < n as f64 * p {
                exceed += 1;
            }
        }
    }
    (1.0 + exceed as f64) / (1.0 + ndraws as f64)
}
