use crate::linalg::{require_square, LinalgError};
use crate::traits::{FloatScalar, MatrixMut, MatrixRef};
use crate::Matrix;

/// Householder tridiagonalization of a symmetric matrix.
///
/// On return:
/// - `diag[0..n]` contains the diagonal of the tridiagonal matrix
/// - `off_diag[0..n-1]` contains the sub-diagonal (`off_diag[i] = T[i+1, i]`)
/// - `q` holds the orthogonal transform with `Qᵀ A Q = T`
///
/// Only the values of `a` are read; it is not modified.
pub fn tridiagonalize<T: FloatScalar>(
    a: &impl MatrixRef<T>,
    diag: &mut [T],
    off_diag: &mut [T],
    q: &mut impl MatrixMut<T>,
) {
    let n = a.nrows();
    debug_assert!(diag.len() >= n);
    debug_assert!(off_diag.len() + 1 >= n);

    // Working copy, row-major
    let mut w = vec![T::zero(); n * n];
    for i in 0..n {
        for j in 0..n {
            w[i * n + j] = *a.get(i, j);
        }
    }

    for i in 0..n {
        for j in 0..n {
            *q.get_mut(i, j) = if i == j { T::one() } else { T::zero() };
        }
    }

    let two = T::one() + T::one();

    for k in 0..n.saturating_sub(2) {
        let mut norm_sq = T::zero();
        for i in (k + 1)..n {
            let v = w[i * n + k];
            norm_sq = norm_sq + v * v;
        }

        if norm_sq <= T::epsilon() * T::epsilon() {
            off_diag[k] = T::zero();
            continue;
        }

        let norm = norm_sq.sqrt();
        let wk1k = w[(k + 1) * n + k];
        let sigma = if wk1k < T::zero() { -norm } else { norm };

        // Householder vector v = x + sigma e1, stored as v0 plus column k
        let v0 = wk1k + sigma;
        let sub_n = n - k - 1;
        let v_at = |w: &[T], i: usize| if i == 0 { v0 } else { w[(k + 1 + i) * n + k] };

        let mut v_norm_sq = T::zero();
        for i in 0..sub_n {
            let vi = v_at(&w, i);
            v_norm_sq = v_norm_sq + vi * vi;
        }
        let tau = two / v_norm_sq;

        // p = tau * A_sub * v
        let mut p = vec![T::zero(); sub_n];
        for (i, pi) in p.iter_mut().enumerate() {
            let row = k + 1 + i;
            let mut acc = T::zero();
            for jj in 0..sub_n {
                acc = acc + w[row * n + k + 1 + jj] * v_at(&w, jj);
            }
            *pi = tau * acc;
        }

        // q_vec = p - (tau/2)(vᵀ p) v
        let mut vtp = T::zero();
        for (i, &pi) in p.iter().enumerate() {
            vtp = vtp + v_at(&w, i) * pi;
        }
        let half_tau_vtp = tau / two * vtp;
        let q_vec: Vec<T> = (0..sub_n).map(|i| p[i] - half_tau_vtp * v_at(&w, i)).collect();

        // Rank-2 update: A_sub -= v q_vecᵀ + q_vec vᵀ
        let v: Vec<T> = (0..sub_n).map(|i| v_at(&w, i)).collect();
        for i in 0..sub_n {
            for j in 0..sub_n {
                let idx = (k + 1 + i) * n + k + 1 + j;
                w[idx] = w[idx] - v[i] * q_vec[j] - q_vec[i] * v[j];
            }
        }

        off_diag[k] = -sigma;

        // Q <- Q (I - tau v vᵀ)
        for row in 0..n {
            let mut s = T::zero();
            for (m, &vm) in v.iter().enumerate() {
                s = s + *q.get(row, k + 1 + m) * vm;
            }
            s = tau * s;
            for (m, &vm) in v.iter().enumerate() {
                let updated = *q.get(row, k + 1 + m) - s * vm;
                *q.get_mut(row, k + 1 + m) = updated;
            }
        }
    }

    for i in 0..n {
        diag[i] = w[i * n + i];
    }
    if n >= 2 {
        off_diag[n - 2] = w[(n - 1) * n + (n - 2)];
    }
}

/// Implicit QR iteration with Wilkinson shift on a symmetric tridiagonal
/// matrix, accumulating the Givens rotations into `q`.
///
/// On success `diag` holds the eigenvalues sorted ascending and the columns
/// of `q` the matching eigenvectors.
pub fn tridiagonal_qr_with_vecs<T: FloatScalar>(
    diag: &mut [T],
    off_diag: &mut [T],
    q: &mut impl MatrixMut<T>,
    max_iter: usize,
) -> Result<(), LinalgError> {
    let n = diag.len();
    if n <= 1 {
        return Ok(());
    }

    let eps = T::epsilon();
    let two = T::one() + T::one();
    let mut iter = 0usize;
    let mut hi = n - 1;

    while hi > 0 {
        let mut lo = hi;
        while lo > 0 {
            let threshold = eps * (diag[lo - 1].abs() + diag[lo].abs());
            if off_diag[lo - 1].abs() <= threshold {
                off_diag[lo - 1] = T::zero();
                break;
            }
            lo -= 1;
        }

        if lo == hi {
            hi -= 1;
            continue;
        }

        iter += 1;
        if iter > max_iter {
            return Err(LinalgError::ConvergenceFailure);
        }

        // Wilkinson shift
        let d = (diag[hi - 1] - diag[hi]) / two;
        let e = off_diag[hi - 1];
        let r = (d * d + e * e).sqrt();
        let shift = diag[hi] - e * e / (d + if d >= T::zero() { r } else { -r });

        let mut x = diag[lo] - shift;
        let mut z = off_diag[lo];

        for k in lo..hi {
            let (c, s) = givens(x, z);

            if k > lo {
                off_diag[k - 1] = c * x + s * z;
            }

            let d_k = diag[k];
            let d_k1 = diag[k + 1];
            let e_k = off_diag[k];

            diag[k] = c * c * d_k + two * c * s * e_k + s * s * d_k1;
            diag[k + 1] = s * s * d_k - two * c * s * e_k + c * c * d_k1;
            off_diag[k] = c * s * (d_k1 - d_k) + (c * c - s * s) * e_k;

            if k + 1 < hi {
                let e_next = off_diag[k + 1];
                x = off_diag[k];
                z = s * e_next;
                off_diag[k + 1] = c * e_next;
            }

            for i in 0..q.nrows() {
                let qik = *q.get(i, k);
                let qik1 = *q.get(i, k + 1);
                *q.get_mut(i, k) = c * qik + s * qik1;
                *q.get_mut(i, k + 1) = c * qik1 - s * qik;
            }
        }
    }

    sort_eigen_with_vecs(diag, q);
    Ok(())
}

/// Givens rotation: `(c, s)` such that `[c, s; -s, c] [a; b] = [r; 0]`.
#[inline]
fn givens<T: FloatScalar>(a: T, b: T) -> (T, T) {
    if b == T::zero() {
        (T::one(), T::zero())
    } else if b.abs() > a.abs() {
        let t = a / b;
        let s = T::one() / (T::one() + t * t).sqrt();
        (s * t, s)
    } else {
        let t = b / a;
        let c = T::one() / (T::one() + t * t).sqrt();
        (c, c * t)
    }
}

fn sort_eigen_with_vecs<T: FloatScalar>(diag: &mut [T], q: &mut impl MatrixMut<T>) {
    let n = diag.len();
    for i in 0..n {
        let mut min_idx = i;
        for j in (i + 1)..n {
            if diag[j] < diag[min_idx] {
                min_idx = j;
            }
        }
        if min_idx != i {
            diag.swap(i, min_idx);
            for row in 0..q.nrows() {
                let tmp = *q.get(row, i);
                *q.get_mut(row, i) = *q.get(row, min_idx);
                *q.get_mut(row, min_idx) = tmp;
            }
        }
    }
}

/// Eigen decomposition `A = V diag(λ) Vᵀ` of a symmetric matrix.
///
/// Eigenvalues are sorted ascending; column `i` of `vectors` belongs to
/// `values[i]`.
#[derive(Debug, Clone)]
pub struct SymmetricEigen<T> {
    pub values: Vec<T>,
    pub vectors: Matrix<T>,
}

impl<T: FloatScalar> SymmetricEigen<T> {
    /// Decompose a symmetric matrix (symmetry is assumed, not checked).
    pub fn new(a: &Matrix<T>) -> Result<Self, LinalgError> {
        let n = require_square(a)?;
        let mut values = vec![T::zero(); n];
        let mut off_diag = vec![T::zero(); n.saturating_sub(1)];
        let mut vectors = Matrix::zeros(n, n);
        tridiagonalize(a, &mut values, &mut off_diag, &mut vectors);
        tridiagonal_qr_with_vecs(&mut values, &mut off_diag, &mut vectors, 30 * n.max(1))?;
        Ok(Self { values, vectors })
    }

    /// Rebuild `V diag(f(λ)) Vᵀ`.
    pub fn recompose(&self, f: impl Fn(T) -> T) -> Matrix<T> {
        let n = self.values.len();
        let fl: Vec<T> = self.values.iter().map(|&l| f(l)).collect();
        Matrix::from_fn(n, n, |i, j| {
            (0..n).fold(T::zero(), |acc, k| {
                acc + self.vectors[(i, k)] * fl[k] * self.vectors[(j, k)]
            })
        })
    }
}

/// Square root of a symmetric positive (semi-)definite matrix.
///
/// Negative eigenvalues from rounding are clipped to zero, so the result is
/// symmetric and squares back to `m` whenever `m` is PSD.
///
/// ```
/// use bsutils::Matrix;
/// use bsutils::linalg::sqrt_pd_matrix;
///
/// let a = Matrix::from_rows(2, 2, &[3.0_f64, 2.0, 2.0, 3.0]);
/// let b = sqrt_pd_matrix(&a).unwrap();
/// let bb = &b * &b;
/// assert!((bb[(0, 1)] - 2.0).abs() < 1e-10);
/// ```
pub fn sqrt_pd_matrix<T: FloatScalar>(m: &Matrix<T>) -> Result<Matrix<T>, LinalgError> {
    let eig = SymmetricEigen::new(m)?;
    Ok(eig.recompose(|l| l.max(T::zero()).sqrt()))
}
