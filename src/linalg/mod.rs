//! Linear algebra: LU, QR (least squares), Cholesky and symmetric eigen
//! decompositions on [`Matrix`](crate::Matrix).
//!
//! The `*_in_place` free functions work on any [`MatrixMut`](crate::MatrixMut);
//! the wrapper structs ([`Lu`], [`Qr`], [`Cholesky`], [`SymmetricEigen`]) keep
//! the factors and offer `solve`, `det` and friends.
//!
//! ```
//! use bsutils::Matrix;
//! use bsutils::linalg::{lstsq, Lu};
//!
//! let a = Matrix::from_rows(2, 2, &[2.0_f64, 1.0, 5.0, 3.0]);
//! let x = Lu::new(&a).unwrap().solve(&[4.0, 11.0]);
//! assert!((x[0] - 1.0).abs() < 1e-12);
//! assert!((x[1] - 2.0).abs() < 1e-12);
//!
//! // Fit y = c0 + c1 x through (0, 1), (1, 2), (2, 4)
//! let design = Matrix::from_rows(3, 2, &[1.0_f64, 0.0, 1.0, 1.0, 1.0, 2.0]);
//! let y = Matrix::from_column(&[1.0, 2.0, 4.0]);
//! let c = lstsq(&design, &y).unwrap();
//! assert!((c[(0, 0)] - 5.0 / 6.0).abs() < 1e-10);
//! assert!((c[(1, 0)] - 1.5).abs() < 1e-10);
//! ```

pub(crate) mod cholesky;
pub(crate) mod lu;
pub(crate) mod qr;
pub(crate) mod symmetric_eigen;

#[cfg(test)]
mod tests;

pub use cholesky::Cholesky;
pub use lu::Lu;
pub use qr::{lstsq, Qr};
pub use symmetric_eigen::{sqrt_pd_matrix, SymmetricEigen};

use thiserror::Error;

/// Errors from linear algebra operations.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum LinalgError {
    /// Matrix is singular or nearly singular.
    #[error("matrix is singular")]
    Singular,
    /// Matrix is not positive definite (required for Cholesky).
    #[error("matrix is not positive definite")]
    NotPositiveDefinite,
    /// Iterative algorithm did not converge within the iteration budget.
    #[error("iterative algorithm did not converge")]
    ConvergenceFailure,
    /// A square matrix was required.
    #[error("matrix should be square, not {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    /// Least squares needs at least as many rows as columns.
    #[error("least squares needs rows >= columns, got {rows}x{cols}")]
    Underdetermined { rows: usize, cols: usize },
}

pub(crate) fn require_square<T>(a: &crate::Matrix<T>) -> Result<usize, LinalgError> {
    if a.is_square() {
        Ok(a.nrows())
    } else {
        Err(LinalgError::NotSquare {
            rows: a.nrows(),
            cols: a.ncols(),
        })
    }
}
