//! Smooth, everywhere-finite versions of `ln`, `exp` and `x ln x`, and
//! powers with their derivatives.
//!
//! Each function acts element-wise on a slice and can return first and
//! second derivatives alongside the value. Outside its safe range a function
//! is replaced by its second-order Taylor expansion at the boundary, so the
//! result stays `C²` and finite for any finite input.
//!
//! ```
//! use bsutils::transforms::{smooth_log, DerivOrder};
//!
//! let d = smooth_log(&[1.0, 0.0], 1e-30, DerivOrder::First);
//! assert_eq!(d.value[0], 0.0);
//! assert!(d.value[1].is_finite());
//! assert_eq!(d.first.unwrap()[0], 1.0);
//! ```

#[cfg(test)]
mod tests;

use thiserror::Error;
use tracing::debug;

/// Default threshold below which [`smooth_log`] and [`smooth_xlogx`] switch
/// to their quadratic extension.
pub const DEFAULT_EPS: f64 = 1e-30;
/// Default upper bound of the exact range of [`smooth_exp`].
pub const DEFAULT_BIGX: f64 = 50.0;
/// Default lower bound of the exact range of [`smooth_exp`].
pub const DEFAULT_LOWX: f64 = -50.0;

/// Errors from [`pow_derivs`].
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum TransformError {
    /// A non-integer power of a negative number was requested.
    #[error("non-integer exponent {exponent} with negative base {base}")]
    NegativeBase { base: f64, exponent: f64 },
    /// Base and exponent slices differ in length.
    #[error("exponent has length {got}, base has length {expected}")]
    LengthMismatch { expected: usize, got: usize },
}

/// How many derivatives to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum DerivOrder {
    #[default]
    Value,
    First,
    Second,
}

/// Values and, depending on the [`DerivOrder`], derivatives of a
/// one-argument transform.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Derivatives {
    pub value: Vec<f64>,
    pub first: Option<Vec<f64>>,
    pub second: Option<Vec<f64>>,
}

impl Derivatives {
    fn build(
        a: &[f64],
        order: DerivOrder,
        value: impl Fn(f64) -> f64,
        first: impl Fn(f64) -> f64,
        second: impl Fn(f64) -> f64,
    ) -> Self {
        Self {
            value: a.iter().map(|&x| value(x)).collect(),
            first: (order >= DerivOrder::First).then(|| a.iter().map(|&x| first(x)).collect()),
            second: (order >= DerivOrder::Second).then(|| a.iter().map(|&x| second(x)).collect()),
        }
    }
}

/// Arguments outside `[lo, hi]`: how many fall on each side and the most
/// extreme one on that side.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ClampSummary {
    below: usize,
    min: f64,
    above: usize,
    max: f64,
}

impl ClampSummary {
    fn new(a: &[f64], lo: f64, hi: f64) -> Self {
        let mut out = Self {
            below: 0,
            min: f64::INFINITY,
            above: 0,
            max: f64::NEG_INFINITY,
        };
        for &x in a {
            if x < lo {
                out.below += 1;
                out.min = out.min.min(x);
            } else if x > hi {
                out.above += 1;
                out.max = out.max.max(x);
            }
        }
        out
    }
}

fn log_clamped(a: &[f64], lo: f64, hi: f64, what: &str) {
    let s = ClampSummary::new(a, lo, hi);
    if s.below > 0 {
        debug!(count = s.below, min = s.min, bound = lo, "{what}: arguments below the exact range");
    }
    if s.above > 0 {
        debug!(count = s.above, max = s.max, bound = hi, "{what}: arguments above the exact range");
    }
}

/// `C²` extension of `ln a` to the whole real line.
///
/// Exact for `a > eps`; below, `ln eps + (a - eps)/eps - (a - eps)²/(2 eps²)`.
pub fn smooth_log(a: &[f64], eps: f64, order: DerivOrder) -> Derivatives {
    log_clamped(a, eps, f64::INFINITY, "smooth_log");
    let log_eps = eps.ln();
    Derivatives::build(
        a,
        order,
        |x| {
            if x > eps {
                x.ln()
            } else {
                let d = (x - eps) / eps;
                log_eps + d - 0.5 * d * d
            }
        },
        |x| if x > eps { 1.0 / x } else { (2.0 - x / eps) / eps },
        |x| if x > eps { -1.0 / (x * x) } else { -1.0 / (eps * eps) },
    )
}

/// `C²` extension of `exp a` beyond `[lowx, bigx]`.
///
/// Above `bigx` returns `e^{bigx} (1 + d + d²/2)` with `d = a - bigx`; below
/// `lowx` returns `e^{lowx} (1 - d + d²/2)` with `d = lowx - a`.
pub fn smooth_exp(a: &[f64], bigx: f64, lowx: f64, order: DerivOrder) -> Derivatives {
    log_clamped(a, lowx, bigx, "smooth_exp");
    let (exp_big, exp_low) = (bigx.exp(), lowx.exp());
    Derivatives::build(
        a,
        order,
        |x| {
            if x > bigx {
                let d = x - bigx;
                exp_big * (1.0 + d * (1.0 + 0.5 * d))
            } else if x < lowx {
                let d = lowx - x;
                exp_low * (1.0 - d * (1.0 - 0.5 * d))
            } else {
                x.exp()
            }
        },
        |x| {
            if x > bigx {
                exp_big * (1.0 + x - bigx)
            } else if x < lowx {
                exp_low * (1.0 - (lowx - x))
            } else {
                x.exp()
            }
        },
        |x| {
            if x > bigx {
                exp_big
            } else if x < lowx {
                exp_low
            } else {
                x.exp()
            }
        },
    )
}

/// `C²` extension of `a ln a`.
///
/// Exact for `a > eps`; below, `a ln eps + a²/(2 eps) - eps/2`, which
/// matches value, slope and curvature at `eps`.
pub fn smooth_xlogx(a: &[f64], eps: f64, order: DerivOrder) -> Derivatives {
    log_clamped(a, eps, f64::INFINITY, "smooth_xlogx");
    let log_eps = eps.ln();
    Derivatives::build(
        a,
        order,
        |x| {
            if x > eps {
                x * x.ln()
            } else {
                x * log_eps + x * x / (2.0 * eps) - 0.5 * eps
            }
        },
        |x| if x > eps { 1.0 + x.ln() } else { log_eps + x / eps },
        |x| 1.0 / x.max(eps),
    )
}

/// Exponent of [`pow_derivs`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Exponent<'a> {
    /// The same power for every element.
    Scalar(f64),
    /// One power per element of the base.
    Elementwise(&'a [f64]),
}

/// `a^b` with derivatives with respect to both `a` and `b`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PowDerivatives {
    pub value: Vec<f64>,
    pub da: Option<Vec<f64>>,
    pub db: Option<Vec<f64>>,
    pub daa: Option<Vec<f64>>,
    pub dab: Option<Vec<f64>>,
    pub dbb: Option<Vec<f64>>,
}

/// Element-wise `a^b` and its derivatives.
///
/// With an element-wise exponent, `ln a` is taken through [`smooth_log`] so
/// the `b` derivatives stay finite at zero.
///
/// ```
/// use bsutils::transforms::{pow_derivs, DerivOrder, Exponent};
///
/// let p = pow_derivs(&[1.0, 2.0, 3.0], Exponent::Scalar(2.0), DerivOrder::First).unwrap();
/// assert_eq!(p.value, vec![1.0, 4.0, 9.0]);
/// assert_eq!(p.da.unwrap(), vec![2.0, 4.0, 6.0]);
/// ```
pub fn pow_derivs(
    a: &[f64],
    b: Exponent<'_>,
    order: DerivOrder,
) -> Result<PowDerivatives, TransformError> {
    let (bvec, log_a) = match b {
        Exponent::Scalar(e) => {
            if e.fract() != 0.0 {
                if let Some(&neg) = a.iter().find(|&&x| x < 0.0) {
                    return Err(TransformError::NegativeBase { base: neg, exponent: e });
                }
            }
            let log_a = if order > DerivOrder::Value {
                a.iter().map(|x| x.ln()).collect()
            } else {
                Vec::new()
            };
            (vec![e; a.len()], log_a)
        }
        Exponent::Elementwise(e) => {
            if e.len() != a.len() {
                return Err(TransformError::LengthMismatch {
                    expected: a.len(),
                    got: e.len(),
                });
            }
            let log_a = if order > DerivOrder::Value {
                smooth_log(a, DEFAULT_EPS, DerivOrder::Value).value
            } else {
                Vec::new()
            };
            (e.to_vec(), log_a)
        }
    };

    let value: Vec<f64> = a.iter().zip(&bvec).map(|(&x, &e)| x.powf(e)).collect();
    let mut out = PowDerivatives {
        value,
        ..Default::default()
    };
    if order == DerivOrder::Value {
        return Ok(out);
    }

    let n = a.len();
    let v = &out.value;
    out.da = Some((0..n).map(|i| bvec[i] * v[i] / a[i]).collect());
    out.db = Some((0..n).map(|i| v[i] * log_a[i]).collect());
    if order == DerivOrder::Second {
        // a^(b-1)
        let v1: Vec<f64> = (0..n).map(|i| v[i] / a[i]).collect();
        out.daa = Some((0..n).map(|i| bvec[i] * (bvec[i] - 1.0) * v1[i] / a[i]).collect());
        out.dab = Some((0..n).map(|i| v1[i] * (1.0 + bvec[i] * log_a[i])).collect());
        out.dbb = Some((0..n).map(|i| v[i] * log_a[i] * log_a[i]).collect());
    }
    Ok(out)
}
