use super::*;
use crate::random::{normal_vec, seeded_rng};
use crate::Matrix;

fn assert_near(a: f64, b: f64, tol: f64, msg: &str) {
    assert!(
        (a - b).abs() < tol,
        "{}: {} vs {} (diff {})",
        msg,
        a,
        b,
        (a - b).abs()
    );
}

fn sq_dist(x: &[f64], target: &[f64]) -> f64 {
    x.iter().zip(target).map(|(a, b)| (a - b) * (a - b)).sum()
}

fn sq_dist_grad(x: &[f64], target: &[f64]) -> Vec<f64> {
    x.iter().zip(target).map(|(a, b)| 2.0 * (a - b)).collect()
}

fn rosenbrock(x: &[f64]) -> f64 {
    (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
}

fn rosenbrock_grad(x: &[f64]) -> Vec<f64> {
    vec![
        -2.0 * (1.0 - x[0]) - 400.0 * x[0] * (x[1] - x[0] * x[0]),
        200.0 * (x[1] - x[0] * x[0]),
    ]
}

// ═══════════════════════════════════════════════════════════════════
// Step sizes
// ═══════════════════════════════════════════════════════════════════

#[test]
fn armijo_halves_until_decrease() {
    let target = [0.0, 1.0, 2.0, 3.0, 4.0];
    let x = [0.5; 5];
    let g = sq_dist_grad(&x, &target);
    let d: Vec<f64> = g.iter().map(|v| -v).collect();
    let alpha = armijo_alpha(|v: &[f64]| sq_dist(v, &target), &x, &d, &ArmijoSettings::default()).unwrap();
    // alpha = 1 overshoots to the mirror image; 0.5 lands on the target
    assert_eq!(alpha, 0.5);
}

#[test]
fn armijo_failures() {
    let settings = ArmijoSettings {
        max_iter: 5,
        ..ArmijoSettings::default()
    };
    // uphill direction never decreases
    let r = armijo_alpha(|v: &[f64]| v[0] * v[0], &[1.0], &[1.0], &settings);
    assert_eq!(r.unwrap_err(), OptimError::LineSearchFailed);
    let r = armijo_alpha(|v: &[f64]| v[0], &[1.0], &[1.0, 2.0], &settings);
    assert_eq!(r.unwrap_err(), OptimError::LengthMismatch { expected: 1, got: 2 });
}

#[test]
fn barzilai_borwein_on_quadratic() {
    // f = Σ c_i x_i², the BB step lies between the extreme inverse curvatures
    let c = [1.0, 4.0];
    let grad = |x: &[f64]| vec![2.0 * c[0] * x[0], 2.0 * c[1] * x[1]];
    let (alpha, g) = barzilai_borwein_alpha(grad, &[1.0, 1.0]).unwrap();
    assert_eq!(g, vec![2.0, 8.0]);
    assert!((1.0 / 8.0..=1.0 / 2.0).contains(&alpha), "alpha {alpha}");

    // isotropic: exact Newton step
    let (alpha, _) = barzilai_borwein_alpha(|x: &[f64]| vec![6.0 * x[0], 6.0 * x[1]], &[1.0, -2.0]).unwrap();
    assert_near(alpha, 1.0 / 6.0, 1e-12, "isotropic BB");

    let r = barzilai_borwein_alpha(|_: &[f64]| vec![0.0, 0.0], &[1.0, 1.0]);
    assert_eq!(r.unwrap_err(), OptimError::NotFinite);
}

// ═══════════════════════════════════════════════════════════════════
// Gradients
// ═══════════════════════════════════════════════════════════════════

#[test]
fn gradient_check_agrees() {
    let p = [-1.2, 1.0];
    for mode in [FiniteDiff::Central, FiniteDiff::Forward] {
        let (analytic, numeric) = check_gradient(rosenbrock, rosenbrock_grad, &p, mode, DEFAULT_FD_STEP);
        let tol = if mode == FiniteDiff::Central { 1e-5 } else { 1e-3 };
        for i in 0..2 {
            assert_near(analytic[i], numeric[i], tol, "gradient");
        }
    }
}

#[test]
fn gradient_check_spots_a_wrong_gradient() {
    let (analytic, numeric) = check_gradient(
        |x: &[f64]| x[0] * x[0] * x[1],
        |x: &[f64]| vec![x[0] * x[1], x[0] * x[0]],
        &[2.0, 3.0],
        FiniteDiff::default(),
        DEFAULT_FD_STEP,
    );
    assert_near(numeric[0], 12.0, 1e-5, "numeric");
    assert_near(analytic[0], 6.0, 1e-15, "analytic");
    assert_near(numeric[1], analytic[1], 1e-5, "second component");
}

// ═══════════════════════════════════════════════════════════════════
// Accelerated gradient descent
// ═══════════════════════════════════════════════════════════════════

#[test]
fn agd_quartic() {
    // ∇f = 4 (x - 1)³, as in a sum of quartics
    let mut rng = seeded_rng(11);
    let x_init = normal_vec(&mut rng, 200);
    let grad = |x: &[f64]| -> Vec<f64> { x.iter().map(|xi| 4.0 * (xi - 1.0).powi(3)).collect() };
    let settings = AgdSettings {
        tol: 1e-10,
        ..AgdSettings::default()
    };
    let res = acc_grad_descent(grad, &x_init, None, &settings).unwrap();
    assert!(res.converged, "grad_err {}", res.grad_err);
    assert!(res.grad_err < 1e-10);
    for xi in &res.x {
        // |x - 1|³ < 2.5e-11
        assert!((xi - 1.0).abs() < 1e-3);
    }
}

#[test]
fn agd_with_nonnegativity_prox() {
    // min Σ (x - a)² subject to x ≥ 0: projection is the prox of the indicator
    let a = [1.0, -2.0, 3.0, -0.5];
    let grad = |x: &[f64]| sq_dist_grad(x, &a);
    let prox: &dyn Fn(&[f64], f64) -> Vec<f64> = &|v: &[f64], _t: f64| -> Vec<f64> { v.iter().map(|vi| vi.max(0.0)).collect() };
    let settings = AgdSettings {
        max_iter: 2000,
        ..AgdSettings::default()
    };
    let res = acc_grad_descent(grad, &[1.0; 4], Some(prox), &settings).unwrap();
    // the gradient does not vanish at the constrained optimum
    assert!(!res.converged);
    assert_eq!(res.iterations, 2000);
    let expected = [1.0, 0.0, 3.0, 0.0];
    for i in 0..4 {
        assert_near(res.x[i], expected[i], 1e-6, "constrained minimizer");
    }
}

#[test]
fn agd_already_optimal() {
    let res = acc_grad_descent(|x: &[f64]| x.to_vec(), &[0.0, 0.0], None, &AgdSettings::default()).unwrap();
    assert!(res.converged);
    assert_eq!(res.iterations, 0);
}

// ═══════════════════════════════════════════════════════════════════
// Inverse Hessian updates
// ═══════════════════════════════════════════════════════════════════

#[test]
fn updates_satisfy_secant_and_symmetry() {
    let h = Matrix::from_rows(3, 3, &[2.0, 0.3, 0.1, 0.3, 1.0, 0.2, 0.1, 0.2, 1.5]);
    let dg = [0.4, -0.2, 1.0];
    let dx = [0.3, 0.1, 0.5];
    for h_new in [dfp_update(&h, &dg, &dx), bfgs_update(&h, &dg, &dx)] {
        let hg = h_new.vecmul(&dg);
        for i in 0..3 {
            assert_near(hg[i], dx[i], 1e-12, "secant");
            for j in 0..3 {
                assert_near(h_new[(i, j)], h_new[(j, i)], 1e-12, "symmetry");
            }
        }
    }
}

#[test]
fn bfgs_update_recovers_quadratic_hessian() {
    // n independent steps on a quadratic give H = A⁻¹ exactly
    let a = Matrix::from_rows(2, 2, &[3.0, 1.0, 1.0, 2.0]);
    let a_inv = Matrix::from_rows(2, 2, &[0.4, -0.2, -0.2, 0.6]);
    let mut h = Matrix::<f64>::eye(2);
    // conjugate directions: s2ᵀ A s1 = 0
    for s in [[1.0, 0.0], [-1.0, 3.0]] {
        let y = a.vecmul(&s);
        h = bfgs_update(&h, &y, &s);
    }
    for i in 0..2 {
        for j in 0..2 {
            assert_near(h[(i, j)], a_inv[(i, j)], 1e-12, "H = A⁻¹");
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Quasi-Newton minimization
// ═══════════════════════════════════════════════════════════════════

#[test]
fn quasi_newton_rosenbrock() {
    let r = minimize_quasi_newton(
        rosenbrock,
        rosenbrock_grad,
        &[-1.2, 1.0],
        None,
        &QuasiNewtonSettings::default(),
    )
    .unwrap();
    assert!(r.converged, "{}", r.message);
    assert_near(r.x[0], 1.0, 1e-4, "x0");
    assert_near(r.x[1], 1.0, 1e-4, "x1");
    assert!(r.f_evals >= r.iterations);
    assert_eq!(r.grad.len(), 2);
}

#[test]
fn quasi_newton_quadratic_both_updates() {
    // f = ½ xᵀ A x - bᵀ x, minimizer A⁻¹ b = (0.2, 0.4)
    let a = Matrix::from_rows(2, 2, &[3.0, 1.0, 1.0, 2.0]);
    let b = [1.0, 1.0];
    let f = |x: &[f64]| 0.5 * crate::matrix::dot(x, &a.vecmul(x)) - crate::matrix::dot(&b, x);
    let g = |x: &[f64]| -> Vec<f64> { a.vecmul(x).iter().zip(&b).map(|(ax, bi)| ax - bi).collect() };
    for update in [HessianUpdate::Bfgs, HessianUpdate::Dfp] {
        let settings = QuasiNewtonSettings {
            update,
            ..QuasiNewtonSettings::default()
        };
        let r = minimize_quasi_newton(f, g, &[2.0, -3.0], None, &settings).unwrap();
        assert!(r.converged, "{update:?}: {}", r.message);
        assert_near(r.x[0], 0.2, 1e-6, "x0");
        assert_near(r.x[1], 0.4, 1e-6, "x1");
    }
}

#[test]
fn quasi_newton_respects_bounds() {
    let target = [0.0, 1.0, 2.0, 3.0, 4.0];
    let bounds = vec![(-10.0, 10.0), (1.5, 10.0), (-10.0, 10.0), (-10.0, 2.5), (-10.0, 10.0)];
    let r = minimize_quasi_newton(
        |x: &[f64]| sq_dist(x, &target),
        |x: &[f64]| sq_dist_grad(x, &target),
        &[0.5; 5],
        Some(bounds.as_slice()),
        &QuasiNewtonSettings::default(),
    )
    .unwrap();
    assert!(r.converged, "{}", r.message);
    let expected = [0.0, 1.5, 2.0, 2.5, 4.0];
    for i in 0..5 {
        assert_near(r.x[i], expected[i], 1e-6, "bounded minimizer");
    }
    // the gradient is nonzero on active bounds, the projected gradient is not
    assert_near(r.grad[1], 1.0, 1e-6, "active lower bound");
    assert!(r.grad_norm < 1e-6);
}

#[test]
fn quasi_newton_errors() {
    let s = QuasiNewtonSettings::default();
    let r = minimize_quasi_newton(|x: &[f64]| x[0], |_: &[f64]| vec![1.0], &[0.0], Some(&[(1.0, 0.0)][..]), &s);
    assert_eq!(r.unwrap_err(), OptimError::InvalidBounds { index: 0, lower: 1.0, upper: 0.0 });
    let r = minimize_quasi_newton(|x: &[f64]| x[0], |_: &[f64]| vec![1.0], &[0.0], Some(&[][..]), &s);
    assert_eq!(r.unwrap_err(), OptimError::LengthMismatch { expected: 1, got: 0 });
    let r = minimize_quasi_newton(|_: &[f64]| f64::NAN, |_: &[f64]| vec![1.0], &[0.0], None, &s);
    assert_eq!(r.unwrap_err(), OptimError::NotFinite);
}

#[test]
fn quasi_newton_reports_iteration_limit() {
    let settings = QuasiNewtonSettings {
        max_iter: 3,
        ..QuasiNewtonSettings::default()
    };
    let r = minimize_quasi_newton(rosenbrock, rosenbrock_grad, &[-1.2, 1.0], None, &settings).unwrap();
    assert!(!r.converged);
    assert_eq!(r.iterations, 3);
    assert_eq!(r.message, "maximum iterations reached");
    let report = r.to_string();
    assert!(report.contains("Minimization failed after 3 iterations"));
    log_optimization_results(&r, "rosenbrock");
}

// ═══════════════════════════════════════════════════════════════════
// Fixed variables
// ═══════════════════════════════════════════════════════════════════

#[test]
fn some_fixed_keeps_fixed_values() {
    let target = [0.0, 1.0, 2.0, 3.0, 4.0];
    let bounds = vec![(-10.0, 10.0); 5];
    let fixed = FixedVariables::new(vec![1, 3], vec![-1.0, -1.0]);
    let r = minimize_some_fixed(
        |x: &[f64]| sq_dist(x, &target),
        |x: &[f64]| sq_dist_grad(x, &target),
        &[0.5; 5],
        Some(&fixed),
        Some(bounds.as_slice()),
        &QuasiNewtonSettings::default(),
    )
    .unwrap();
    assert!(r.converged, "{}", r.message);
    let expected = [0.0, -1.0, 2.0, -1.0, 4.0];
    for i in 0..5 {
        assert_near(r.x[i], expected[i], 1e-6, "x");
    }
    // full gradient, nonzero on the fixed variables
    assert_eq!(r.grad.len(), 5);
    assert_near(r.grad[1], -4.0, 1e-6, "grad at fixed 1");
    assert_near(r.grad[3], -8.0, 1e-6, "grad at fixed 3");
    assert_near(r.grad[0], 0.0, 1e-6, "grad at free 0");
    log_optimization_results(&r, "some fixed");
}

#[test]
fn some_fixed_without_fixed_is_plain_minimization() {
    let target = [1.0, -1.0];
    let params = OptimizeParams::new(vec![0.0, 0.0]).with_bounds(vec![(-5.0, 5.0); 2]);
    let init = params.init.clone().unwrap_or_default();
    let r = minimize_some_fixed(
        |x: &[f64]| sq_dist(x, &target),
        |x: &[f64]| sq_dist_grad(x, &target),
        &init,
        None,
        params.bounds(),
        &QuasiNewtonSettings::default(),
    )
    .unwrap();
    assert_near(r.x[0], 1.0, 1e-6, "x0");
    assert_near(r.x[1], -1.0, 1e-6, "x1");
}

#[test]
fn some_fixed_errors() {
    let s = QuasiNewtonSettings::default();
    let f = |x: &[f64]| x.iter().sum::<f64>();
    let g = |x: &[f64]| vec![1.0; x.len()];
    let bad_len = FixedVariables::new(vec![0, 1], vec![1.0]);
    assert_eq!(
        minimize_some_fixed(f, g, &[0.0; 3], Some(&bad_len), None, &s).unwrap_err(),
        OptimError::LengthMismatch { expected: 2, got: 1 }
    );
    let out_of_range = FixedVariables::new(vec![3], vec![1.0]);
    assert_eq!(
        minimize_some_fixed(f, g, &[0.0; 3], Some(&out_of_range), None, &s).unwrap_err(),
        OptimError::FixedIndexOutOfRange { index: 3, n: 3 }
    );
}
