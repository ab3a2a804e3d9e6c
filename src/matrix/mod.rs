//! Dense, heap-allocated matrices and the array helpers built on them.
//!
//! [`Matrix<T>`] stores its elements column-major in a `Vec<T>`, so each
//! column (one variable of an `(nobs, nvars)` data matrix) is a contiguous
//! slice. One-dimensional arrays are plain slices throughout the crate; use
//! [`Matrix::from_column`] when an API takes "a vector or a matrix".
//!
//! ```
//! use bsutils::Matrix;
//!
//! let a = Matrix::from_rows(2, 3, &[1.0_f64, 2.0, 3.0, 4.0, 5.0, 6.0]);
//! assert_eq!(a[(1, 0)], 4.0);
//! assert_eq!(a.col(2), &[3.0, 6.0]);
//! assert_eq!(a.transpose().shape(), (3, 2));
//! ```

mod ops;
mod util;

#[cfg(test)]
mod tests;

pub use util::{
    check_rows, check_same_len, check_square, dot, grid, lexico_grid, max_abs, norm,
    pad2_end_zeros, pad_beg_zeros, pad_end_zeros, repeat_col, repeat_row,
};

use core::ops::{Index, IndexMut};

use thiserror::Error;

use crate::traits::{MatrixMut, MatrixRef, Scalar};

/// Errors from shape checks on arrays and matrices.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ShapeError {
    /// A square matrix was required.
    #[error("matrix should be square, not {rows}x{cols}")]
    NotSquare { rows: usize, cols: usize },
    /// Two arrays that must have the same length do not.
    #[error("length mismatch: expected {expected}, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    /// A matrix does not have the required dimensions.
    #[error("dimension mismatch: expected {}x{}, got {}x{}", .expected.0, .expected.1, .got.0, .got.1)]
    DimensionMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    /// The input has no elements.
    #[error("array is empty")]
    Empty,
    /// A lexicographic grid would have more than `usize::MAX` rows.
    #[error("grid with {base}^{exponent} rows is too large")]
    GridTooLarge { base: usize, exponent: usize },
}

/// Dynamically-sized matrix with column-major `Vec<T>` storage.
///
/// `m * n` is the matrix product; element-wise products go through
/// [`Matrix::hadamard`].
///
/// ```
/// use bsutils::Matrix;
///
/// let id = Matrix::<f64>::eye(3);
/// assert_eq!(id[(0, 0)], 1.0);
/// assert_eq!(id[(0, 1)], 0.0);
///
/// let v = Matrix::from_column(&[1.0_f64, 2.0]);
/// assert_eq!(v.shape(), (2, 1));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Matrix<T> {
    data: Vec<T>,
    nrows: usize,
    ncols: usize,
}

// ── Constructors ────────────────────────────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// An `nrows x ncols` matrix of zeros.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self::fill(nrows, ncols, T::zero())
    }

    /// An `nrows x ncols` matrix filled with `value`.
    pub fn fill(nrows: usize, ncols: usize, value: T) -> Self {
        Self {
            data: vec![value; nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// The `n x n` identity matrix.
    pub fn eye(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = T::one();
        }
        m
    }

    /// Build from an owned `Vec<T>` in column-major order.
    ///
    /// Panics if `data.len() != nrows * ncols`.
    pub fn from_vec(nrows: usize, ncols: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            nrows * ncols,
            "vec length {} does not match {}x{} matrix",
            data.len(),
            nrows,
            ncols,
        );
        Self { data, nrows, ncols }
    }

    /// Build from a flat slice in row-major order.
    ///
    /// Panics if `row_major.len() != nrows * ncols`.
    ///
    /// ```
    /// use bsutils::Matrix;
    /// let m = Matrix::from_rows(2, 3, &[1, 2, 3, 4, 5, 6]);
    /// assert_eq!(m[(0, 2)], 3);
    /// assert_eq!(m[(1, 0)], 4);
    /// ```
    pub fn from_rows(nrows: usize, ncols: usize, row_major: &[T]) -> Self {
        assert_eq!(
            row_major.len(),
            nrows * ncols,
            "slice length {} does not match {}x{} matrix",
            row_major.len(),
            nrows,
            ncols,
        );
        Self::from_fn(nrows, ncols, |i, j| row_major[i * ncols + j])
    }

    /// An `n x 1` matrix holding `v`.
    pub fn from_column(v: &[T]) -> Self {
        Self {
            data: v.to_vec(),
            nrows: v.len(),
            ncols: 1,
        }
    }

    /// Stack equal-length columns side by side.
    ///
    /// Panics if the columns have different lengths.
    pub fn from_columns(columns: &[&[T]]) -> Self {
        let nrows = columns.first().map_or(0, |c| c.len());
        let mut data = Vec::with_capacity(nrows * columns.len());
        for (j, c) in columns.iter().enumerate() {
            assert_eq!(c.len(), nrows, "column {j} has length {}, expected {nrows}", c.len());
            data.extend_from_slice(c);
        }
        Self {
            data,
            nrows,
            ncols: columns.len(),
        }
    }
}

impl<T> Matrix<T> {
    /// Build by calling `f(row, col)` for each element.
    pub fn from_fn(nrows: usize, ncols: usize, f: impl Fn(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(nrows * ncols);
        for j in 0..ncols {
            for i in 0..nrows {
                data.push(f(i, j));
            }
        }
        Self { data, nrows, ncols }
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// `(nrows, ncols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Whether the matrix is square.
    #[inline]
    pub fn is_square(&self) -> bool {
        self.nrows == self.ncols
    }

    /// Total number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the matrix has no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Column `j` as a contiguous slice.
    #[inline]
    pub fn col(&self, j: usize) -> &[T] {
        assert!(j < self.ncols, "column {j} out of range for {} columns", self.ncols);
        &self.data[j * self.nrows..(j + 1) * self.nrows]
    }

    /// Column `j` as a mutable slice.
    #[inline]
    pub fn col_mut(&mut self, j: usize) -> &mut [T] {
        assert!(j < self.ncols, "column {j} out of range for {} columns", self.ncols);
        &mut self.data[j * self.nrows..(j + 1) * self.nrows]
    }

    /// Iterate over the columns.
    pub fn columns(&self) -> impl Iterator<Item = &[T]> {
        (0..self.ncols).map(move |j| self.col(j))
    }

    /// Column-major storage.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Mutable column-major storage.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the matrix and return its column-major storage.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Apply `f` to every element.
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Matrix<U> {
        Matrix {
            data: self.data.iter().map(f).collect(),
            nrows: self.nrows,
            ncols: self.ncols,
        }
    }
}

impl<T: Copy> Matrix<T> {
    /// Row `i`, copied out.
    pub fn row(&self, i: usize) -> Vec<T> {
        assert!(i < self.nrows, "row {i} out of range for {} rows", self.nrows);
        (0..self.ncols).map(|j| self.data[j * self.nrows + i]).collect()
    }

    /// The transpose.
    pub fn transpose(&self) -> Self {
        Self::from_fn(self.ncols, self.nrows, |i, j| self[(j, i)])
    }

    /// The submatrix picking rows `rows` and columns `cols`, in that order.
    ///
    /// Indices may repeat, which is how bootstrap draws are applied to
    /// square distance matrices.
    pub fn select(&self, rows: &[usize], cols: &[usize]) -> Self {
        Self::from_fn(rows.len(), cols.len(), |i, j| self[(rows[i], cols[j])])
    }

    /// All columns for the rows in `rows`.
    pub fn select_rows(&self, rows: &[usize]) -> Self {
        Self::from_fn(rows.len(), self.ncols, |i, j| self[(rows[i], j)])
    }
}

// ── Indexing ────────────────────────────────────────────────────────

impl<T> Index<(usize, usize)> for Matrix<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        debug_assert!(i < self.nrows && j < self.ncols);
        &self.data[j * self.nrows + i]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix<T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        debug_assert!(i < self.nrows && j < self.ncols);
        &mut self.data[j * self.nrows + i]
    }
}

// ── MatrixRef / MatrixMut ───────────────────────────────────────────

impl<T> MatrixRef<T> for Matrix<T> {
    #[inline]
    fn nrows(&self) -> usize {
        self.nrows
    }

    #[inline]
    fn ncols(&self) -> usize {
        self.ncols
    }

    #[inline]
    fn get(&self, row: usize, col: usize) -> &T {
        &self[(row, col)]
    }
}

impl<T> MatrixMut<T> for Matrix<T> {
    #[inline]
    fn get_mut(&mut self, row: usize, col: usize) -> &mut T {
        &mut self[(row, col)]
    }
}
