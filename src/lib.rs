//! # bsutils
//!
//! Numerical and statistical utilities for empirical work: array helpers,
//! smooth transforms, quadrature, regression and density estimation,
//! distance covariance, optimization, logging and timing.
//!
//! ## Quick start
//!
//! ```
//! use bsutils::stats::{describe, quantile};
//! use bsutils::stats::regression::proj_z;
//! use bsutils::Matrix;
//!
//! let v = [3.0, 1.0, 4.0, 1.0, 5.0, 9.0, 2.0, 6.0];
//! let d = describe(&v).unwrap();
//! assert_eq!(d.min, 1.0);
//! assert_eq!(quantile(&v, 0.5).unwrap(), 3.5);
//!
//! // project a variable on a quadratic in z
//! let z: Vec<f64> = (0..20).map(|i| i as f64 / 10.0).collect();
//! let w: Vec<f64> = z.iter().map(|zi| 1.0 + zi * zi).collect();
//! let proj = proj_z(&Matrix::from_column(&w), &Matrix::from_column(&z), 2).unwrap();
//! assert!(proj.r2[0] > 0.999_999);
//! ```
//!
//! ## Modules
//!
//! ### General utilities
//!
//! - [`matrix`]: column-major [`Matrix<T>`] and array helpers (padding,
//!   grids, repeats, shape checks)
//! - [`random`]: seeded generators, independent streams, normal draws
//! - [`timer`]: start/stop [`timer::Timer`] and [`timer::timed`]
//! - `logging`: `init_logger` for a `tracing` subscriber (feature
//!   `subscriber`, on by default)
//!
//! ### Scientific
//!
//! - [`linalg`]: LU, QR and least squares, Cholesky, symmetric eigenvalues,
//!   square roots of positive definite matrices
//! - [`transforms`]: `log`, `exp`, `x log x` and powers extended smoothly
//!   outside their domains, with derivatives
//! - [`polynomial`]: univariate and bivariate polynomials
//! - [`quadrature`]: Gauss-Hermite and Gauss-Legendre nodes, Gaussian
//!   expectations
//! - [`stats`]: empirical cdf and quantiles, local noise estimates,
//!   descriptive statistics; [`stats::regression`] for projections, TSLS and
//!   flexible regression; [`stats::density`] for normal and kernel densities
//! - [`spline`]: smoothing splines and spline regression
//! - [`dcov`]: distance covariance and partial distance covariance tests
//! - [`optim`]: step sizes, gradient checks, accelerated gradient descent,
//!   bounded quasi-Newton minimization
//!
//! ## Errors
//!
//! Each module returns its own error enum; [`Error`] collects them for
//! callers that mix modules behind one `?`.
//!
//! ## Cargo features
//!
//! | Feature      | Default | Description |
//! |--------------|---------|-------------|
//! | `subscriber` | yes     | `logging::init_logger` via `tracing-subscriber` |
//! | `serde`      | no      | `Serialize`/`Deserialize` on matrices, settings and results |

pub mod dcov;
mod error;
pub mod linalg;
#[cfg(feature = "subscriber")]
pub mod logging;
pub mod matrix;
pub mod optim;
pub mod polynomial;
pub mod quadrature;
pub mod random;
pub mod spline;
pub mod stats;
pub mod timer;
pub mod traits;
pub mod transforms;

pub use error::{Error, Result};
pub use matrix::Matrix;
pub use traits::{FloatScalar, MatrixMut, MatrixRef, Scalar};
