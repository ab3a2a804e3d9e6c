//! End-to-end flows through the public API, on seeded simulated data.

use std::time::Duration;

use bsutils::dcov::{dcov_dcor, pvalue_dcov, DEFAULT_NDRAWS};
use bsutils::optim::{minimize_quasi_newton, minimize_some_fixed, FixedVariables, QuasiNewtonSettings};
use bsutils::quadrature::{GaussianExpectation, DEFAULT_NODES};
use bsutils::random::{normal_vec, rng_streams, seeded_rng, DEFAULT_SEED};
use bsutils::stats::density::estimate_densities_at_quantiles;
use bsutils::stats::regression::{flexible_reg, tsls, RegressionMode};
use bsutils::stats::{describe, quantile};
use bsutils::timer::{timed, Timer};
use bsutils::transforms::{smooth_exp, DerivOrder, DEFAULT_BIGX, DEFAULT_LOWX};
use bsutils::Matrix;

fn assert_near(a: f64, b: f64, tol: f64, msg: &str) {
    assert!((a - b).abs() < tol, "{}: {} vs {}", msg, a, b);
}

fn mse(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>() / a.len() as f64
}

#[test]
fn iv_recovers_structural_slope() -> bsutils::Result<()> {
    let n = 2000;
    let mut streams = rng_streams(3, DEFAULT_SEED);
    let z = normal_vec(&mut streams[0], n);
    let v = normal_vec(&mut streams[1], n);
    let u = normal_vec(&mut streams[2], n);
    let x: Vec<f64> = z.iter().zip(&v).map(|(zi, vi)| zi + vi).collect();
    // the error is correlated with x through v
    let y: Vec<f64> = x
        .iter()
        .zip(v.iter().zip(&u))
        .map(|(xi, (vi, ui))| 1.0 + 2.0 * xi + 0.8 * vi + ui)
        .collect();

    let mut timer = Timer::new();
    let res = {
        let _guard = timer.scope()?;
        tsls(&y, &Matrix::from_column(&x), &Matrix::from_column(&z))?
    };
    assert!(timer.elapsed() > Duration::ZERO);

    assert_near(res.iv_estimates[0], 1.0, 0.15, "constant");
    assert_near(res.iv_estimates[1], 2.0, 0.15, "slope");
    assert!(res.r2_first_iv[0] > 0.3 && res.r2_first_iv[0] < 0.7);

    // OLS through the same projection machinery is biased upwards
    let ols = flexible_reg(
        &Matrix::from_column(&y),
        &Matrix::from_column(&x),
        RegressionMode::Polynomial(1),
    )?;
    let fitted_slope = (ols[(1, 0)] - ols[(0, 0)]) / (x[1] - x[0]);
    assert!(fitted_slope > 2.2, "OLS slope {fitted_slope}");
    Ok(())
}

#[test]
fn spline_and_polynomial_regressions_agree() -> bsutils::Result<()> {
    let n = 400;
    let mut rng = seeded_rng(21);
    let x: Vec<f64> = (0..n).map(|i| (i as f64 + 0.5) / n as f64).collect();
    let e = normal_vec(&mut rng, n);
    let truth: Vec<f64> = x.iter().map(|xi| (3.0 * xi).sin()).collect();
    let y: Vec<f64> = truth.iter().zip(&e).map(|(t, ei)| t + 0.2 * ei).collect();
    let (ym, xm) = (Matrix::from_column(&y), Matrix::from_column(&x));

    let spline = flexible_reg(&ym, &xm, RegressionMode::Spline)?;
    let poly = flexible_reg(&ym, &xm, RegressionMode::Polynomial(5))?;
    assert!(mse(spline.col(0), &truth) < 0.02);
    assert!(mse(poly.col(0), &truth) < 0.01);

    let d = describe(spline.col(0))?;
    assert!(d.max < 1.3 && d.min > -0.3, "{d:?}");
    Ok(())
}

#[test]
fn gaussian_expectations_of_transforms() -> bsutils::Result<()> {
    let rule = GaussianExpectation::new(DEFAULT_NODES)?;
    let lognormal_mean = 0.5_f64.exp();
    assert_near(rule.expect(f64::exp), lognormal_mean, 1e-9, "E[exp Z]");
    let smoothed = rule.expect_vectorized(|z| smooth_exp(z, DEFAULT_BIGX, DEFAULT_LOWX, DerivOrder::Value).value);
    assert_near(smoothed, lognormal_mean, 1e-9, "E[smooth_exp Z]");

    // compare with a Monte Carlo estimate
    let draws = normal_vec(&mut seeded_rng(3), 200_000);
    let mc = draws.iter().map(|z| z.exp()).sum::<f64>() / draws.len() as f64;
    assert_near(mc, lognormal_mean, 0.02, "Monte Carlo");
    Ok(())
}

#[test]
fn distance_covariance_detects_nonlinear_dependence() -> bsutils::Result<()> {
    let n = 200;
    let mut rng = seeded_rng(4);
    let x = normal_vec(&mut rng, n);
    let e = normal_vec(&mut rng, n);
    let other = normal_vec(&mut rng, n);
    // uncorrelated with x, but dependent
    let y: Vec<f64> = x.iter().zip(&e).map(|(xi, ei)| xi * xi + 0.5 * ei).collect();

    let xm = Matrix::from_column(&x);
    let dep = dcov_dcor(&xm, &Matrix::from_column(&y), false)?;
    let indep = dcov_dcor(&xm, &Matrix::from_column(&other), false)?;
    assert!(dep.dcor > 0.2, "dependent dCor² {}", dep.dcor);
    assert!(indep.dcor < 0.1, "independent dCor² {}", indep.dcor);

    let p = pvalue_dcov(&dep, DEFAULT_NDRAWS, &mut seeded_rng(5));
    assert!(p > 0.0 && p <= 1.0);
    Ok(())
}

#[test]
fn normal_maximum_likelihood() -> bsutils::Result<()> {
    let n = 500;
    let sample: Vec<f64> = normal_vec(&mut seeded_rng(6), n)
        .into_iter()
        .map(|z| 1.0 + 2.0 * z)
        .collect();

    // parameters (mu, log sigma)
    let nll = |p: &[f64]| {
        let s2 = (2.0 * p[1]).exp();
        n as f64 * p[1] + sample.iter().map(|x| (x - p[0]).powi(2)).sum::<f64>() / (2.0 * s2)
    };
    let grad = |p: &[f64]| {
        let s2 = (2.0 * p[1]).exp();
        vec![
            -sample.iter().map(|x| x - p[0]).sum::<f64>() / s2,
            n as f64 - sample.iter().map(|x| (x - p[0]).powi(2)).sum::<f64>() / s2,
        ]
    };
    let bounds = [(-10.0, 10.0), (-5.0, 5.0)];
    let settings = QuasiNewtonSettings::default();

    let res = timed("normal mle", || {
        minimize_quasi_newton(nll, grad, &[0.0, 0.0], Some(&bounds[..]), &settings)
    })?;
    assert!(res.converged, "{res}");

    let d = describe(&sample)?;
    let sigma_mle = (d.variance * (n - 1) as f64 / n as f64).sqrt();
    assert_near(res.x[0], d.mean, 1e-5, "mu");
    assert_near(res.x[1].exp(), sigma_mle, 1e-5, "sigma");

    // with sigma fixed at 1 the mean is unchanged
    let fixed = FixedVariables::new(vec![1], vec![0.0]);
    let res_fixed = minimize_some_fixed(nll, grad, &[0.0, 0.0], Some(&fixed), Some(&bounds[..]), &settings)?;
    assert_near(res_fixed.x[0], d.mean, 1e-5, "mu with fixed sigma");
    assert_eq!(res_fixed.x[1], 0.0);

    let median = quantile(&sample, 0.5)?;
    assert_near(median, 1.0, 0.3, "median");
    Ok(())
}

#[test]
fn density_at_the_median() -> bsutils::Result<()> {
    let x = normal_vec(&mut seeded_rng(7), 1000);
    let dens = estimate_densities_at_quantiles(&Matrix::from_column(&x), &[0.25, 0.5, 0.75])?;
    let phi0 = 1.0 / (2.0 * std::f64::consts::PI).sqrt();
    assert_near(dens.joint[1], phi0, 0.05, "density at the median");
    assert!(dens.joint[1] > dens.joint[0] && dens.joint[1] > dens.joint[2]);
    Ok(())
}
