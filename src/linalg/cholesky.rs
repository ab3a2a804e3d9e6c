use crate::linalg::{require_square, LinalgError};
use crate::traits::{FloatScalar, MatrixMut, MatrixRef};
use crate::Matrix;

/// Cholesky decomposition in place: A = L Lᵀ.
///
/// On return, the lower triangle of `a` (including diagonal) contains L.
/// The upper triangle is left unchanged.
pub fn cholesky_in_place<T: FloatScalar>(a: &mut impl MatrixMut<T>) -> Result<(), LinalgError> {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols());

    for j in 0..n {
        for k in 0..j {
            let ljk = *a.get(j, k);
            for i in j..n {
                let v = *a.get(i, j) - *a.get(i, k) * ljk;
                *a.get_mut(i, j) = v;
            }
        }

        let diag = *a.get(j, j);
        if diag <= T::zero() {
            return Err(LinalgError::NotPositiveDefinite);
        }
        let ljj = diag.sqrt();
        *a.get_mut(j, j) = ljj;
        for i in (j + 1)..n {
            let v = *a.get(i, j) / ljj;
            *a.get_mut(i, j) = v;
        }
    }

    Ok(())
}

/// Solve L x = b by forward substitution, where L is lower triangular.
pub fn forward_substitute<T: FloatScalar>(l: &impl MatrixRef<T>, b: &[T], x: &mut [T]) {
    let n = l.nrows();
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum = sum - *l.get(i, j) * x[j];
        }
        x[i] = sum / *l.get(i, i);
    }
}

/// Solve Lᵀ x = b by back substitution, where L is lower triangular.
pub fn back_substitute_lt<T: FloatScalar>(l: &impl MatrixRef<T>, b: &[T], x: &mut [T]) {
    let n = l.nrows();
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum = sum - *l.get(j, i) * x[j];
        }
        x[i] = sum / *l.get(i, i);
    }
}

/// Cholesky decomposition of a symmetric positive-definite matrix.
///
/// Used for Gaussian densities, where both `Σ⁻¹ r` and `ln det Σ` are needed.
#[derive(Debug, Clone)]
pub struct Cholesky<T> {
    l: Matrix<T>,
}

impl<T: FloatScalar> Cholesky<T> {
    /// Decompose `a`. Only the lower triangle is read.
    pub fn new(a: &Matrix<T>) -> Result<Self, LinalgError> {
        let n = require_square(a)?;
        let mut l = a.clone();
        cholesky_in_place(&mut l)?;
        for j in 1..n {
            for i in 0..j {
                l[(i, j)] = T::zero();
            }
        }
        Ok(Self { l })
    }

    /// The lower-triangular factor.
    pub fn l(&self) -> &Matrix<T> {
        &self.l
    }

    /// Solve `L y = b` (half of a solve; `‖y‖²` is the Mahalanobis form).
    pub fn solve_lower(&self, b: &[T]) -> Vec<T> {
        let mut y = vec![T::zero(); b.len()];
        forward_substitute(&self.l, b, &mut y);
        y
    }

    /// Solve `A x = b`.
    pub fn solve(&self, b: &[T]) -> Vec<T> {
        assert_eq!(b.len(), self.l.nrows(), "rhs length mismatch");
        let y = self.solve_lower(b);
        let mut x = vec![T::zero(); b.len()];
        back_substitute_lt(&self.l, &y, &mut x);
        x
    }

    /// `ln det A = 2 Σ ln L_ii`.
    pub fn ln_det(&self) -> T {
        let two = T::one() + T::one();
        (0..self.l.nrows()).fold(T::zero(), |acc, i| acc + two * self.l[(i, i)].ln())
    }
}
