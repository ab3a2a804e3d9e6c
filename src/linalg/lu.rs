use crate::linalg::{require_square, LinalgError};
use crate::traits::{FloatScalar, MatrixMut, MatrixRef};
use crate::Matrix;

/// Perform LU decomposition with partial pivoting, in place.
///
/// On return, `a` contains both L and U packed together:
/// - Upper triangle (including diagonal): U
/// - Lower triangle (excluding diagonal): L (diagonal of L is implicitly 1)
///
/// `perm` is filled with the row permutation indices.
/// Returns `true` if the number of row swaps was even.
pub fn lu_in_place<T: FloatScalar>(
    a: &mut impl MatrixMut<T>,
    perm: &mut [usize],
) -> Result<bool, LinalgError> {
    let n = a.nrows();
    debug_assert_eq!(n, a.ncols());
    debug_assert_eq!(n, perm.len());

    for (i, p) in perm.iter_mut().enumerate() {
        *p = i;
    }

    let mut even = true;

    for col in 0..n {
        // Partial pivoting: largest magnitude in this column
        let mut max_row = col;
        let mut max_val = a.get(col, col).abs();
        for row in (col + 1)..n {
            let val = a.get(row, col).abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < T::epsilon() {
            return Err(LinalgError::Singular);
        }

        if max_row != col {
            perm.swap(col, max_row);
            for j in 0..n {
                let tmp = *a.get(col, j);
                *a.get_mut(col, j) = *a.get(max_row, j);
                *a.get_mut(max_row, j) = tmp;
            }
            even = !even;
        }

        let inv_pivot = T::one() / *a.get(col, col);
        for row in (col + 1)..n {
            let l = *a.get(row, col) * inv_pivot;
            *a.get_mut(row, col) = l;
        }

        // Rank-1 update of the trailing block
        for j in (col + 1)..n {
            let a_col_j = *a.get(col, j);
            for row in (col + 1)..n {
                let v = *a.get(row, j) - *a.get(row, col) * a_col_j;
                *a.get_mut(row, j) = v;
            }
        }
    }

    Ok(even)
}

/// Solve Ax = b given the packed LU decomposition and permutation.
pub fn lu_solve<T: FloatScalar>(lu: &impl MatrixRef<T>, perm: &[usize], b: &[T], x: &mut [T]) {
    let n = lu.nrows();

    // Forward substitution: Ly = Pb
    for i in 0..n {
        let mut sum = b[perm[i]];
        for j in 0..i {
            sum = sum - *lu.get(i, j) * x[j];
        }
        x[i] = sum;
    }

    // Back substitution: Ux = y
    for i in (0..n).rev() {
        let mut sum = x[i];
        for j in (i + 1)..n {
            sum = sum - *lu.get(i, j) * x[j];
        }
        x[i] = sum / *lu.get(i, i);
    }
}

/// LU decomposition of a square matrix.
///
/// ```
/// use bsutils::Matrix;
/// use bsutils::linalg::Lu;
///
/// let a = Matrix::from_rows(2, 2, &[4.0_f64, 3.0, 6.0, 3.0]);
/// assert!((Lu::new(&a).unwrap().det() + 6.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone)]
pub struct Lu<T> {
    lu: Matrix<T>,
    perm: Vec<usize>,
    even: bool,
}

impl<T: FloatScalar> Lu<T> {
    /// Decompose `a`. Fails if `a` is not square or is singular.
    pub fn new(a: &Matrix<T>) -> Result<Self, LinalgError> {
        let n = require_square(a)?;
        let mut lu = a.clone();
        let mut perm = vec![0usize; n];
        let even = lu_in_place(&mut lu, &mut perm)?;
        Ok(Self { lu, perm, even })
    }

    /// Solve `Ax = b`.
    pub fn solve(&self, b: &[T]) -> Vec<T> {
        assert_eq!(b.len(), self.lu.nrows(), "rhs length mismatch");
        let mut x = vec![T::zero(); b.len()];
        lu_solve(&self.lu, &self.perm, b, &mut x);
        x
    }

    /// Solve `AX = B` column by column.
    pub fn solve_matrix(&self, b: &Matrix<T>) -> Matrix<T> {
        let mut out = Matrix::zeros(b.nrows(), b.ncols());
        for j in 0..b.ncols() {
            let x = self.solve(b.col(j));
            out.col_mut(j).copy_from_slice(&x);
        }
        out
    }

    /// Determinant of the original matrix.
    pub fn det(&self) -> T {
        let mut d = if self.even { T::one() } else { -T::one() };
        for i in 0..self.lu.nrows() {
            d = d * self.lu[(i, i)];
        }
        d
    }
}
