use thiserror::Error;

use crate::dcov::DcovError;
use crate::linalg::LinalgError;
use crate::matrix::ShapeError;
use crate::optim::OptimError;
use crate::quadrature::QuadratureError;
use crate::spline::SplineError;
use crate::stats::StatsError;
use crate::timer::TimerError;
use crate::transforms::TransformError;

/// Any error raised by this crate.
///
/// Each module returns its own error type; this enum lets callers mix them
/// behind a single `?`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Shape(#[from] ShapeError),
    #[error(transparent)]
    Linalg(#[from] LinalgError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Quadrature(#[from] QuadratureError),
    #[error(transparent)]
    Stats(#[from] StatsError),
    #[error(transparent)]
    Spline(#[from] SplineError),
    #[error(transparent)]
    Dcov(#[from] DcovError),
    #[error(transparent)]
    Optim(#[from] OptimError),
    #[error(transparent)]
    Timer(#[from] TimerError),
}

pub type Result<T> = core::result::Result<T, Error>;
