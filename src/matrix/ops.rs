use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::traits::Scalar;

use super::Matrix;

// ── Element-wise addition / subtraction ─────────────────────────────

fn zip_with<T: Scalar>(a: &Matrix<T>, b: &Matrix<T>, op: &str, f: impl Fn(T, T) -> T) -> Matrix<T> {
    assert_eq!(
        a.shape(),
        b.shape(),
        "dimension mismatch: {}x{} {} {}x{}",
        a.nrows,
        a.ncols,
        op,
        b.nrows,
        b.ncols,
    );
    Matrix {
        data: a.data.iter().zip(b.data.iter()).map(|(&x, &y)| f(x, y)).collect(),
        nrows: a.nrows,
        ncols: a.ncols,
    }
}

macro_rules! impl_elementwise {
    ($trait:ident, $method:ident, $op:tt, $sym:literal) => {
        impl<T: Scalar> $trait<&Matrix<T>> for &Matrix<T> {
            type Output = Matrix<T>;

            fn $method(self, rhs: &Matrix<T>) -> Matrix<T> {
                zip_with(self, rhs, $sym, |a, b| a $op b)
            }
        }

        impl<T: Scalar> $trait for Matrix<T> {
            type Output = Matrix<T>;

            fn $method(self, rhs: Matrix<T>) -> Matrix<T> {
                (&self).$method(&rhs)
            }
        }

        impl<T: Scalar> $trait<&Matrix<T>> for Matrix<T> {
            type Output = Matrix<T>;

            fn $method(self, rhs: &Matrix<T>) -> Matrix<T> {
                (&self).$method(rhs)
            }
        }
    };
}

impl_elementwise!(Add, add, +, "+");
impl_elementwise!(Sub, sub, -, "-");

impl<T: Scalar> AddAssign<&Matrix<T>> for Matrix<T> {
    fn add_assign(&mut self, rhs: &Matrix<T>) {
        assert_eq!(self.shape(), rhs.shape(), "dimension mismatch in +=");
        for (a, &b) in self.data.iter_mut().zip(rhs.data.iter()) {
            *a = *a + b;
        }
    }
}

impl<T: Scalar> SubAssign<&Matrix<T>> for Matrix<T> {
    fn sub_assign(&mut self, rhs: &Matrix<T>) {
        assert_eq!(self.shape(), rhs.shape(), "dimension mismatch in -=");
        for (a, &b) in self.data.iter_mut().zip(rhs.data.iter()) {
            *a = *a - b;
        }
    }
}

impl<T: Scalar + Neg<Output = T>> Neg for &Matrix<T> {
    type Output = Matrix<T>;

    fn neg(self) -> Matrix<T> {
        self.map(|&x| -x)
    }
}

// ── Matrix product ──────────────────────────────────────────────────

impl<T: Scalar> Mul<&Matrix<T>> for &Matrix<T> {
    type Output = Matrix<T>;

    fn mul(self, rhs: &Matrix<T>) -> Matrix<T> {
        assert_eq!(
            self.ncols, rhs.nrows,
            "dimension mismatch: {}x{} * {}x{}",
            self.nrows, self.ncols, rhs.nrows, rhs.ncols,
        );
        let mut out = Matrix::zeros(self.nrows, rhs.ncols);
        // j-k-i loop order keeps the inner loop on contiguous columns
        for j in 0..rhs.ncols {
            for k in 0..self.ncols {
                let b = rhs[(k, j)];
                if b == T::zero() {
                    continue;
                }
                let a_col = self.col(k);
                let out_col = out.col_mut(j);
                for (o, &a) in out_col.iter_mut().zip(a_col) {
                    *o = *o + a * b;
                }
            }
        }
        out
    }
}

impl<T: Scalar> Mul for Matrix<T> {
    type Output = Matrix<T>;

    fn mul(self, rhs: Matrix<T>) -> Matrix<T> {
        &self * &rhs
    }
}

impl<T: Scalar> Mul<&Matrix<T>> for Matrix<T> {
    type Output = Matrix<T>;

    fn mul(self, rhs: &Matrix<T>) -> Matrix<T> {
        &self * rhs
    }
}

// ── Scalar product ──────────────────────────────────────────────────

impl<T: Scalar> Mul<T> for &Matrix<T> {
    type Output = Matrix<T>;

    fn mul(self, rhs: T) -> Matrix<T> {
        self.map(|&x| x * rhs)
    }
}

impl<T: Scalar> Mul<T> for Matrix<T> {
    type Output = Matrix<T>;

    fn mul(mut self, rhs: T) -> Matrix<T> {
        for x in self.data.iter_mut() {
            *x = *x * rhs;
        }
        self
    }
}

// ── Other products and reductions ───────────────────────────────────

impl<T: Scalar> Matrix<T> {
    /// Matrix-vector product `A v`.
    pub fn vecmul(&self, v: &[T]) -> Vec<T> {
        assert_eq!(v.len(), self.ncols, "vector length {} does not match {} columns", v.len(), self.ncols);
        let mut out = vec![T::zero(); self.nrows];
        for (j, &vj) in v.iter().enumerate() {
            for (o, &a) in out.iter_mut().zip(self.col(j)) {
                *o = *o + a * vj;
            }
        }
        out
    }

    /// `Aᵀ B` without forming the transpose.
    pub fn tr_mul(&self, rhs: &Matrix<T>) -> Matrix<T> {
        assert_eq!(self.nrows, rhs.nrows, "row mismatch in Aᵀ B: {} vs {}", self.nrows, rhs.nrows);
        Matrix::from_fn(self.ncols, rhs.ncols, |i, j| {
            self.col(i)
                .iter()
                .zip(rhs.col(j))
                .fold(T::zero(), |acc, (&a, &b)| acc + a * b)
        })
    }

    /// Element-wise product.
    pub fn hadamard(&self, rhs: &Matrix<T>) -> Matrix<T> {
        zip_with(self, rhs, "∘", |a, b| a * b)
    }

    /// Sum of all elements.
    pub fn sum(&self) -> T {
        self.data.iter().fold(T::zero(), |acc, &x| acc + x)
    }

    /// Column sums.
    pub fn col_sums(&self) -> Vec<T> {
        self.columns()
            .map(|c| c.iter().fold(T::zero(), |acc, &x| acc + x))
            .collect()
    }

    /// Row sums.
    pub fn row_sums(&self) -> Vec<T> {
        let mut out = vec![T::zero(); self.nrows];
        for c in self.columns() {
            for (o, &x) in out.iter_mut().zip(c) {
                *o = *o + x;
            }
        }
        out
    }

    /// Overwrite the diagonal with `value`.
    pub fn fill_diagonal(&mut self, value: T) {
        for i in 0..self.nrows.min(self.ncols) {
            self[(i, i)] = value;
        }
    }
}
