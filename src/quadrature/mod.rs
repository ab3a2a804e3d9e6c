//! Gaussian quadrature rules and Gaussian expectations.
//!
//! ```
//! use bsutils::quadrature::GaussianExpectation;
//!
//! let ge = GaussianExpectation::new(8).unwrap();
//! let m4 = ge.expect(|z| z.powi(4));
//! assert!((m4 - 3.0).abs() < 1e-10);
//! ```


use core::f64::consts::PI;

use thiserror::Error;
use tracing::debug;

/// `π^{-1/4}`.
const PIM4: f64 = 0.751_125_544_464_942_5;
const HERMITE_TOL: f64 = 1e-14;
const HERMITE_MAXIT: usize = 10;
const LEGENDRE_TOL: f64 = 3e-11;
const LEGENDRE_MAXIT: usize = 100;

/// Default number of nodes of [`GaussianExpectation::new`].
pub const DEFAULT_NODES: usize = 16;

/// Errors from building quadrature rules.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum QuadratureError {
    /// Newton's method did not converge for a root.
    #[error("Newton iteration did not converge for root {root} of {n}")]
    ConvergenceFailure { root: usize, n: usize },
    /// Nodes and weights differ in length.
    #[error("{nodes} nodes but {weights} weights")]
    LengthMismatch { nodes: usize, weights: usize },
}

/// Nodes (ascending) and weights of the `n`-point Gauss-Hermite rule for
/// `∫ f(x) e^{-x²} dx`.
///
/// Roots are found by Newton's method on the orthonormal Hermite
/// recurrence, starting from the usual asymptotic guesses.
pub fn gauss_hermite(n: usize) -> Result<(Vec<f64>, Vec<f64>), QuadratureError> {
    let mut x = vec![0.0; n];
    let mut w = vec![0.0; n];
    let m = n.div_ceil(2);
    let nf = n as f64;
    let mut z = 0.0_f64;

    // x[i] for i < m holds the i-th largest root
    for i in 0..m {
        z = match i {
            0 => {
                let n2 = 2.0 * nf + 1.0;
                n2.sqrt() - 1.85575 * n2.powf(-0.16667)
            }
            1 => z - 1.14 * nf.powf(0.426) / z,
            2 => 1.86 * z - 0.86 * x[0],
            3 => 1.91 * z - 0.91 * x[1],
            _ => 2.0 * z - x[i - 2],
        };
        let mut pp = 0.0;
        let mut converged = false;
        for _ in 0..HERMITE_MAXIT {
            let (mut p1, mut p2) = (PIM4, 0.0);
            for j in 0..n {
                let p3 = p2;
                p2 = p1;
                let jf = j as f64;
                p1 = z * (2.0 / (jf + 1.0)).sqrt() * p2 - (jf / (jf + 1.0)).sqrt() * p3;
            }
            pp = (2.0 * nf).sqrt() * p2;
            let z1 = z;
            z = z1 - p1 / pp;
            if (z - z1).abs() <= HERMITE_TOL {
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(QuadratureError::ConvergenceFailure { root: i, n });
        }
        x[i] = z;
        x[n - 1 - i] = -z;
        w[i] = 2.0 / (pp * pp);
        w[n - 1 - i] = w[i];
    }
    x.reverse();
    debug!(n, "Gauss-Hermite rule");
    Ok((x, w))
}

/// Legendre polynomial `P_n(z)` and its derivative.
fn legendre_with_deriv(n: usize, z: f64) -> (f64, f64) {
    let (mut p1, mut p2) = (1.0, 0.0);
    for j in 0..n {
        let p3 = p2;
        p2 = p1;
        let jf = j as f64;
        p1 = ((2.0 * jf + 1.0) * z * p2 - jf * p3) / (jf + 1.0);
    }
    (p1, n as f64 * (z * p1 - p2) / (z * z - 1.0))
}

/// Nodes (ascending) and weights of the `n`-point Gauss-Legendre rule for
/// `∫_{-1}^{1} f(x) dx`.
pub fn gauss_legendre(n: usize) -> Result<(Vec<f64>, Vec<f64>), QuadratureError> {
    let mut x = vec![0.0; n];
    let mut w = vec![0.0; n];
    let m = n.div_ceil(2);
    let nf = n as f64;
    for i in 0..m {
        let mut z = (PI * (i as f64 + 0.75) / (nf + 0.5)).cos();
        let mut converged = false;
        for _ in 0..LEGENDRE_MAXIT {
            let (p1, pp) = legendre_with_deriv(n, z);
            let z1 = z;
            z = z1 - p1 / pp;
            if (z - z1).abs() <= LEGENDRE_TOL {
                converged = true;
                break;
            }
        }
        if !converged {
            return Err(QuadratureError::ConvergenceFailure { root: i, n });
        }
        // derivative at the converged root
        let (_, pp) = legendre_with_deriv(n, z);
        // roots come out in decreasing order
        x[n - 1 - i] = z;
        x[i] = -z;
        w[i] = 2.0 / ((1.0 - z * z) * pp * pp);
        w[n - 1 - i] = w[i];
    }
    Ok((x, w))
}

/// Quadrature rule for `E[f(Z)]` with `Z ~ N(0, 1)`.
///
/// Gauss-Hermite nodes are scaled by `√2` and weights by `1/√π`, so the
/// weights sum to one. Extra parameters of `f` are captured by the closure.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GaussianExpectation {
    nodes: Vec<f64>,
    weights: Vec<f64>,
}

impl GaussianExpectation {
    /// Rule with `n` Gauss-Hermite nodes.
    pub fn new(n: usize) -> Result<Self, QuadratureError> {
        let (x, w) = gauss_hermite(n)?;
        Self::from_nodes(&x, &w)
    }

    /// Rule from precomputed Gauss-Hermite nodes and weights (for the
    /// `e^{-x²}` weight function).
    pub fn from_nodes(x: &[f64], w: &[f64]) -> Result<Self, QuadratureError> {
        if x.len() != w.len() {
            return Err(QuadratureError::LengthMismatch {
                nodes: x.len(),
                weights: w.len(),
            });
        }
        let sqrt_pi = PI.sqrt();
        Ok(Self {
            nodes: x.iter().map(|&xi| xi * core::f64::consts::SQRT_2).collect(),
            weights: w.iter().map(|&wi| wi / sqrt_pi).collect(),
        })
    }

    /// Points at which `f` is evaluated.
    pub fn nodes(&self) -> &[f64] {
        &self.nodes
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// `E[f(Z)]` for a scalar `f`.
    pub fn expect(&self, f: impl Fn(f64) -> f64) -> f64 {
        self.nodes
            .iter()
            .zip(&self.weights)
            .map(|(&x, &w)| w * f(x))
            .sum()
    }

    /// `E[f(Z)]` for a vector-valued `f`; every call must return a vector of
    /// the same length.
    pub fn expect_vec(&self, f: impl Fn(f64) -> Vec<f64>) -> Vec<f64> {
        let mut acc: Vec<f64> = Vec::new();
        for (&x, &w) in self.nodes.iter().zip(&self.weights) {
            let fx = f(x);
            if acc.is_empty() {
                acc = vec![0.0; fx.len()];
            }
            assert_eq!(fx.len(), acc.len(), "f returned vectors of different lengths");
            for (a, v) in acc.iter_mut().zip(fx) {
                *a += w * v;
            }
        }
        acc
    }

    /// `E[f(Z)]` for an `f` that maps all the nodes at once.
    pub fn expect_vectorized(&self, f: impl Fn(&[f64]) -> Vec<f64>) -> f64 {
        let fx = f(&self.nodes);
        assert_eq!(fx.len(), self.nodes.len(), "f should return one value per node");
        fx.iter().zip(&self.weights).map(|(&v, &w)| v * w).sum()
    }
}
