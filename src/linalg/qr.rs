use crate::linalg::LinalgError;
use crate::traits::{FloatScalar, MatrixMut};
use crate::Matrix;

/// QR decomposition in place using Householder reflections.
///
/// On return, `a` contains the packed QR factorization:
/// - Upper triangle (including diagonal): R
/// - Lower triangle (excluding diagonal): Householder vectors, scaled so that
///   their leading entry is an implicit 1
///
/// `tau` is filled with the Householder scalar factors (length `ncols`).
/// Requires `nrows >= ncols`; returns `LinalgError::Singular` on a
/// (numerically) zero column.
pub fn qr_in_place<T: FloatScalar>(a: &mut impl MatrixMut<T>, tau: &mut [T]) -> Result<(), LinalgError> {
    let m = a.nrows();
    let n = a.ncols();
    debug_assert!(m >= n);
    debug_assert_eq!(tau.len(), n);

    for col in 0..n {
        let mut norm_sq = T::zero();
        for i in col..m {
            let v = *a.get(i, col);
            norm_sq = norm_sq + v * v;
        }

        if norm_sq < T::epsilon() {
            return Err(LinalgError::Singular);
        }

        let norm = norm_sq.sqrt();
        let a_cc = *a.get(col, col);
        // sign(a_cc) * ||x|| keeps v0 away from cancellation
        let sigma = if a_cc < T::zero() { -norm } else { norm };

        let v0 = a_cc + sigma;
        let tau_val = v0 / sigma;
        tau[col] = tau_val;

        for i in (col + 1)..m {
            let scaled = *a.get(i, col) / v0;
            *a.get_mut(i, col) = scaled;
        }

        // A[col:m, col+1:n] -= tau * v * (vᵀ A)
        for j in (col + 1)..n {
            let mut dot = *a.get(col, j);
            for i in (col + 1)..m {
                dot = dot + *a.get(i, col) * *a.get(i, j);
            }
            dot = dot * tau_val;

            *a.get_mut(col, j) = *a.get(col, j) - dot;
            for i in (col + 1)..m {
                let v = *a.get(i, j) - dot * *a.get(i, col);
                *a.get_mut(i, j) = v;
            }
        }

        *a.get_mut(col, col) = -sigma;
    }

    Ok(())
}

/// Householder QR decomposition of an `m x n` matrix with `m >= n`.
#[derive(Debug, Clone)]
pub struct Qr<T> {
    qr: Matrix<T>,
    tau: Vec<T>,
}

impl<T: FloatScalar> Qr<T> {
    /// Decompose `a`. Fails if `a` has fewer rows than columns or is rank
    /// deficient.
    pub fn new(a: &Matrix<T>) -> Result<Self, LinalgError> {
        let (m, n) = a.shape();
        if m < n {
            return Err(LinalgError::Underdetermined { rows: m, cols: n });
        }
        let mut qr = a.clone();
        let mut tau = vec![T::zero(); n];
        qr_in_place(&mut qr, &mut tau)?;

        // Relative rank check on the diagonal of R
        let scale = (0..n).map(|i| qr[(i, i)].abs()).fold(T::zero(), T::max);
        let tol = scale * T::epsilon() * T::from(m.max(n)).unwrap_or_else(T::one);
        if (0..n).any(|i| qr[(i, i)].abs() <= tol) {
            return Err(LinalgError::Singular);
        }
        Ok(Self { qr, tau })
    }

    /// The upper-triangular factor R (`n x n`).
    pub fn r(&self) -> Matrix<T> {
        let n = self.qr.ncols();
        Matrix::from_fn(n, n, |i, j| if j >= i { self.qr[(i, j)] } else { T::zero() })
    }

    /// Apply `Qᵀ` to `b` in place.
    fn apply_qt(&self, b: &mut [T]) {
        let (m, n) = self.qr.shape();
        for col in 0..n {
            let mut dot = b[col];
            for i in (col + 1)..m {
                dot = dot + self.qr[(i, col)] * b[i];
            }
            dot = dot * self.tau[col];
            b[col] = b[col] - dot;
            for i in (col + 1)..m {
                b[i] = b[i] - dot * self.qr[(i, col)];
            }
        }
    }

    /// Minimize `‖Ax − b‖₂`.
    pub fn solve_least_squares(&self, b: &[T]) -> Vec<T> {
        let (m, n) = self.qr.shape();
        assert_eq!(b.len(), m, "rhs length mismatch");
        let mut qtb = b.to_vec();
        self.apply_qt(&mut qtb);

        let mut x = vec![T::zero(); n];
        for i in (0..n).rev() {
            let mut sum = qtb[i];
            for j in (i + 1)..n {
                sum = sum - self.qr[(i, j)] * x[j];
            }
            x[i] = sum / self.qr[(i, i)];
        }
        x
    }
}

/// Least-squares solution of `A X = B` for every column of `B`.
pub fn lstsq<T: FloatScalar>(a: &Matrix<T>, b: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
    assert_eq!(a.nrows(), b.nrows(), "row mismatch in lstsq");
    let qr = Qr::new(a)?;
    let mut out = Matrix::zeros(a.ncols(), b.ncols());
    for j in 0..b.ncols() {
        let x = qr.solve_least_squares(b.col(j));
        out.col_mut(j).copy_from_slice(&x);
    }
    Ok(out)
}
