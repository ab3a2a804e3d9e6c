//! Univariate and bivariate polynomials with real coefficients.
//!
//! Coefficients are stored in increasing powers. A [`BivariatePolynomial`]
//! keeps a `(deg1 + 1, deg2 + 1)` coefficient matrix whose `(i, j)` entry
//! multiplies `x1^i x2^j`.
//!
//! ```
//! use bsutils::polynomial::{outer_bivar, Polynomial};
//!
//! let p = Polynomial::new(vec![1.0, 2.0]);      // 1 + 2x
//! let q = Polynomial::new(vec![0.0, 0.0, 1.0]); // x²
//! assert_eq!((&p * &q).eval(2.0), 20.0);
//!
//! let b = outer_bivar(&p, &q);                  // (1 + 2 x1) x2²
//! assert_eq!(b.eval(1.0, 3.0), 27.0);
//! ```


use core::fmt;
use core::ops::{Add, Mul, Neg, Sub};

use crate::matrix::{pad2_end_zeros, pad_end_zeros};
use crate::Matrix;

/// A polynomial in one variable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Polynomial {
    coef: Vec<f64>,
}

impl Polynomial {
    /// From coefficients in increasing powers; an empty vector is the zero
    /// polynomial.
    pub fn new(coef: Vec<f64>) -> Self {
        if coef.is_empty() {
            Self { coef: vec![0.0] }
        } else {
            Self { coef }
        }
    }

    /// The constant polynomial `c`.
    pub fn constant(c: f64) -> Self {
        Self { coef: vec![c] }
    }

    pub fn coef(&self) -> &[f64] {
        &self.coef
    }

    /// Length of the coefficient vector minus one. Trailing zero
    /// coefficients are not trimmed.
    pub fn degree(&self) -> usize {
        self.coef.len() - 1
    }

    /// Horner evaluation.
    pub fn eval(&self, x: f64) -> f64 {
        self.coef.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }

    pub fn eval_many(&self, x: &[f64]) -> Vec<f64> {
        x.iter().map(|&xi| self.eval(xi)).collect()
    }

    fn zip_padded(&self, rhs: &Polynomial, f: impl Fn(f64, f64) -> f64) -> Polynomial {
        let n = self.coef.len().max(rhs.coef.len());
        let a = pad_end_zeros(&self.coef, n);
        let b = pad_end_zeros(&rhs.coef, n);
        Polynomial::new(a.iter().zip(&b).map(|(&x, &y)| f(x, y)).collect())
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, c) in self.coef.iter().enumerate() {
            match k {
                0 => write!(f, "{c}")?,
                1 => write!(f, " + {c} x")?,
                _ => write!(f, " + {c} x^{k}")?,
            }
        }
        Ok(())
    }
}

impl Add<&Polynomial> for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: &Polynomial) -> Polynomial {
        self.zip_padded(rhs, |a, b| a + b)
    }
}

impl Sub<&Polynomial> for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: &Polynomial) -> Polynomial {
        self.zip_padded(rhs, |a, b| a - b)
    }
}

impl Mul<&Polynomial> for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: &Polynomial) -> Polynomial {
        let mut out = vec![0.0; self.coef.len() + rhs.coef.len() - 1];
        for (i, &a) in self.coef.iter().enumerate() {
            for (j, &b) in rhs.coef.iter().enumerate() {
                out[i + j] += a * b;
            }
        }
        Polynomial::new(out)
    }
}

impl Add<f64> for &Polynomial {
    type Output = Polynomial;

    fn add(self, rhs: f64) -> Polynomial {
        let mut out = self.clone();
        out.coef[0] += rhs;
        out
    }
}

impl Sub<f64> for &Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: f64) -> Polynomial {
        self + (-rhs)
    }
}

impl Mul<f64> for &Polynomial {
    type Output = Polynomial;

    fn mul(self, rhs: f64) -> Polynomial {
        Polynomial::new(self.coef.iter().map(|&c| c * rhs).collect())
    }
}

impl Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        self * -1.0
    }
}

/// A polynomial in two variables.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BivariatePolynomial {
    coef: Matrix<f64>,
}

impl BivariatePolynomial {
    /// From a `(deg1 + 1, deg2 + 1)` coefficient matrix. An empty matrix is
    /// the zero polynomial.
    pub fn new(coef: Matrix<f64>) -> Self {
        if coef.is_empty() {
            Self {
                coef: Matrix::zeros(1, 1),
            }
        } else {
            Self { coef }
        }
    }

    pub fn coef(&self) -> &Matrix<f64> {
        &self.coef
    }

    /// Degree in `x1`.
    pub fn deg1(&self) -> usize {
        self.coef.nrows() - 1
    }

    /// Degree in `x2`.
    pub fn deg2(&self) -> usize {
        self.coef.ncols() - 1
    }

    /// Row `i` of the coefficients as a polynomial in `x2`: the factor of
    /// `x1^i`.
    pub fn x2_polynomial(&self, i: usize) -> Polynomial {
        Polynomial::new(self.coef.row(i))
    }

    /// `p(x1, x2)`.
    pub fn eval(&self, x1: f64, x2: f64) -> f64 {
        let mut val = 0.0;
        let mut x1fac = 1.0;
        for i in 0..self.coef.nrows() {
            let row = (0..self.coef.ncols())
                .rev()
                .fold(0.0, |acc, j| acc * x2 + self.coef[(i, j)]);
            val += row * x1fac;
            x1fac *= x1;
        }
        val
    }

    /// Evaluate at the pairs `(x1[k], x2[k])`.
    ///
    /// Panics if the slices differ in length.
    pub fn eval_many(&self, x1: &[f64], x2: &[f64]) -> Vec<f64> {
        assert_eq!(x1.len(), x2.len(), "x1 and x2 should have the same length");
        x1.iter().zip(x2).map(|(&a, &b)| self.eval(a, b)).collect()
    }

    fn zip_padded(&self, rhs: &Self, f: impl Fn(f64, f64) -> f64) -> Self {
        let m = self.coef.nrows().max(rhs.coef.nrows());
        let n = self.coef.ncols().max(rhs.coef.ncols());
        let a = pad2_end_zeros(&self.coef, m, n);
        let b = pad2_end_zeros(&rhs.coef, m, n);
        Self::new(Matrix::from_fn(m, n, |i, j| f(a[(i, j)], b[(i, j)])))
    }
}

impl fmt::Display for BivariatePolynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BivariatePolynomial({}, {})", self.deg1(), self.deg2())
    }
}

impl Add<&BivariatePolynomial> for &BivariatePolynomial {
    type Output = BivariatePolynomial;

    fn add(self, rhs: &BivariatePolynomial) -> BivariatePolynomial {
        self.zip_padded(rhs, |a, b| a + b)
    }
}

impl Sub<&BivariatePolynomial> for &BivariatePolynomial {
    type Output = BivariatePolynomial;

    fn sub(self, rhs: &BivariatePolynomial) -> BivariatePolynomial {
        self.zip_padded(rhs, |a, b| a - b)
    }
}

impl Mul<&BivariatePolynomial> for &BivariatePolynomial {
    type Output = BivariatePolynomial;

    /// Full two-dimensional convolution of the coefficient matrices.
    fn mul(self, rhs: &BivariatePolynomial) -> BivariatePolynomial {
        let (m1, n1) = self.coef.shape();
        let (m2, n2) = rhs.coef.shape();
        let mut out = Matrix::zeros(m1 + m2 - 1, n1 + n2 - 1);
        for j1 in 0..n1 {
            for i1 in 0..m1 {
                let a = self.coef[(i1, j1)];
                if a == 0.0 {
                    continue;
                }
                for j2 in 0..n2 {
                    for i2 in 0..m2 {
                        out[(i1 + i2, j1 + j2)] += a * rhs.coef[(i2, j2)];
                    }
                }
            }
        }
        BivariatePolynomial::new(out)
    }
}

impl Add<f64> for &BivariatePolynomial {
    type Output = BivariatePolynomial;

    fn add(self, rhs: f64) -> BivariatePolynomial {
        let mut out = self.clone();
        out.coef[(0, 0)] += rhs;
        out
    }
}

impl Sub<f64> for &BivariatePolynomial {
    type Output = BivariatePolynomial;

    fn sub(self, rhs: f64) -> BivariatePolynomial {
        self + (-rhs)
    }
}

impl Mul<f64> for &BivariatePolynomial {
    type Output = BivariatePolynomial;

    fn mul(self, rhs: f64) -> BivariatePolynomial {
        BivariatePolynomial::new(&self.coef * rhs)
    }
}

// Owned-operand forwarding for both polynomial types.
macro_rules! forward_owned {
    ($ty:ty, $($trait:ident :: $method:ident),*) => {$(
        impl $trait<$ty> for $ty {
            type Output = $ty;

            fn $method(self, rhs: $ty) -> $ty {
                (&self).$method(&rhs)
            }
        }

        impl $trait<&$ty> for $ty {
            type Output = $ty;

            fn $method(self, rhs: &$ty) -> $ty {
                (&self).$method(rhs)
            }
        }

        impl $trait<f64> for $ty {
            type Output = $ty;

            fn $method(self, rhs: f64) -> $ty {
                (&self).$method(rhs)
            }
        }

        impl $trait<$ty> for f64 {
            type Output = $ty;

            fn $method(self, rhs: $ty) -> $ty {
                (&rhs).$method(self)
            }
        }
    )*};
}

forward_owned!(Polynomial, Add::add, Mul::mul);
forward_owned!(BivariatePolynomial, Add::add, Mul::mul);

impl Sub<Polynomial> for Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: Polynomial) -> Polynomial {
        &self - &rhs
    }
}

impl Sub<f64> for Polynomial {
    type Output = Polynomial;

    fn sub(self, rhs: f64) -> Polynomial {
        &self - rhs
    }
}

impl Sub<BivariatePolynomial> for BivariatePolynomial {
    type Output = BivariatePolynomial;

    fn sub(self, rhs: BivariatePolynomial) -> BivariatePolynomial {
        &self - &rhs
    }
}

impl Sub<f64> for BivariatePolynomial {
    type Output = BivariatePolynomial;

    fn sub(self, rhs: f64) -> BivariatePolynomial {
        &self - rhs
    }
}

/// The bivariate polynomial `p1(x1) p2(x2)`.
pub fn outer_bivar(p1: &Polynomial, p2: &Polynomial) -> BivariatePolynomial {
    let (a, b) = (p1.coef(), p2.coef());
    BivariatePolynomial::new(Matrix::from_fn(a.len(), b.len(), |i, j| a[i] * b[j]))
}
