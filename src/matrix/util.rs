use crate::traits::{FloatScalar, Scalar};

use super::{Matrix, ShapeError};

/// Matrix with `n` columns, each equal to `v`.
///
/// ```
/// use bsutils::matrix::repeat_col;
/// let m = repeat_col(&[0, 1, 2], 4);
/// assert_eq!(m.shape(), (3, 4));
/// assert_eq!(m.row(2), vec![2, 2, 2, 2]);
/// ```
pub fn repeat_col<T: Scalar>(v: &[T], n: usize) -> Matrix<T> {
    Matrix::from_fn(v.len(), n, |i, _| v[i])
}

/// Matrix with `m` rows, each equal to `v`.
///
/// ```
/// use bsutils::matrix::repeat_row;
/// let m = repeat_row(&[0, 1, 2], 2);
/// assert_eq!(m.row(1), vec![0, 1, 2]);
/// ```
pub fn repeat_row<T: Scalar>(v: &[T], m: usize) -> Matrix<T> {
    Matrix::from_fn(m, v.len(), |_, j| v[j])
}

/// Largest element in absolute value.
pub fn max_abs<T: FloatScalar>(a: &[T]) -> Result<T, ShapeError> {
    a.iter()
        .map(|x| x.abs())
        .reduce(|m, x| if x > m { x } else { m })
        .ok_or(ShapeError::Empty)
}

/// Prepend zeros to `v` so that it has length `n`; longer inputs are
/// returned unchanged.
pub fn pad_beg_zeros<T: Scalar>(v: &[T], n: usize) -> Vec<T> {
    if v.len() >= n {
        return v.to_vec();
    }
    let mut out = vec![T::zero(); n - v.len()];
    out.extend_from_slice(v);
    out
}

/// Append zeros to `v` so that it has length `n`; longer inputs are
/// returned unchanged.
pub fn pad_end_zeros<T: Scalar>(v: &[T], n: usize) -> Vec<T> {
    let mut out = v.to_vec();
    if out.len() < n {
        out.resize(n, T::zero());
    }
    out
}

/// Pad `mat` with zero rows and columns at the end up to `(m, n)`.
///
/// Never truncates: a dimension already larger than requested is kept.
pub fn pad2_end_zeros<T: Scalar>(mat: &Matrix<T>, m: usize, n: usize) -> Matrix<T> {
    let (nrows, ncols) = mat.shape();
    if nrows >= m && ncols >= n {
        return mat.clone();
    }
    let mut out = Matrix::zeros(nrows.max(m), ncols.max(n));
    for j in 0..ncols {
        out.col_mut(j)[..nrows].copy_from_slice(mat.col(j));
    }
    out
}

/// All pairs `(v[i], w[j])` as a `(len(v) * len(w), 2)` matrix, with the
/// first column varying slowest.
///
/// ```
/// use bsutils::matrix::grid;
/// let g = grid(&[0, 1, 2], &[0, 1, 2, 3]);
/// assert_eq!(g.shape(), (12, 2));
/// assert_eq!(g.row(5), vec![1, 1]);
/// ```
pub fn grid<T: Scalar>(v: &[T], w: &[T]) -> Matrix<T> {
    let n = w.len();
    let rows = v.len() * n;
    let mut out = Matrix::zeros(rows, 2);
    for r in 0..rows {
        out[(r, 0)] = v[r / n];
        out[(r, 1)] = w[r % n];
    }
    out
}

/// Lexicographic grid over the columns of `arr`.
///
/// For an `(nr, nc)` matrix this returns the `(nr^nc, nc)` matrix of every
/// combination `(arr[i0, 0], arr[i1, 1], ..., arr[i_{nc-1}, nc-1])`, with the
/// first column varying slowest. A single column is returned as is; with two
/// columns this is [`grid`] applied to the columns. Fails with
/// [`ShapeError::GridTooLarge`] when `nr^nc` overflows `usize`.
pub fn lexico_grid<T: Scalar>(arr: &Matrix<T>) -> Result<Matrix<T>, ShapeError> {
    let (nr, nc) = arr.shape();
    if nc <= 1 {
        return Ok(arr.clone());
    }
    let rows = u32::try_from(nc)
        .ok()
        .and_then(|e| nr.checked_pow(e))
        .ok_or(ShapeError::GridTooLarge { base: nr, exponent: nc })?;
    let mut out = Matrix::zeros(rows, nc);
    for k in 0..nc {
        // column k repeats each entry nr^(nc-1-k) times
        let block = nr.pow((nc - 1 - k) as u32);
        let src = arr.col(k);
        for (r, x) in out.col_mut(k).iter_mut().enumerate() {
            *x = src[(r / block) % nr];
        }
    }
    Ok(out)
}

/// Check that `mat` is square and return its size.
pub fn check_square<T>(mat: &Matrix<T>) -> Result<usize, ShapeError> {
    if mat.is_square() {
        Ok(mat.nrows())
    } else {
        Err(ShapeError::NotSquare {
            rows: mat.nrows(),
            cols: mat.ncols(),
        })
    }
}

/// Check that two arrays have the same length and return it.
pub fn check_same_len<A, B>(a: &[A], b: &[B]) -> Result<usize, ShapeError> {
    if a.len() == b.len() {
        Ok(a.len())
    } else {
        Err(ShapeError::LengthMismatch {
            expected: a.len(),
            got: b.len(),
        })
    }
}

/// Check that `mat` has `n` rows.
pub fn check_rows<T>(mat: &Matrix<T>, n: usize) -> Result<(), ShapeError> {
    if mat.nrows() == n {
        Ok(())
    } else {
        Err(ShapeError::DimensionMismatch {
            expected: (n, mat.ncols()),
            got: mat.shape(),
        })
    }
}

/// Dot product of two equal-length slices.
#[inline]
pub fn dot<T: Scalar>(a: &[T], b: &[T]) -> T {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).fold(T::zero(), |acc, (&x, &y)| acc + x * y)
}

/// Euclidean norm.
#[inline]
pub fn norm<T: FloatScalar>(a: &[T]) -> T {
    dot(a, a).sqrt()
}
