use super::*;

fn assert_near(a: f64, b: f64, tol: f64, msg: &str) {
    let scale = 1.0_f64.max(b.abs());
    assert!((a - b).abs() < tol * scale, "{}: {} vs {}", msg, a, b);
}

/// Value, first and second derivative are continuous across `cut`.
fn assert_c2(d: &Derivatives, msg: &str) {
    let first = d.first.as_ref().unwrap();
    let second = d.second.as_ref().unwrap();
    assert_near(d.value[0], d.value[1], 1e-6, msg);
    assert_near(first[0], first[1], 1e-5, msg);
    assert_near(second[0], second[1], 1e-3, msg);
}

#[test]
fn smooth_log_exact_above_eps() {
    let a = [2.0, 3.0, 4.0];
    let d = smooth_log(&a, DEFAULT_EPS, DerivOrder::Second);
    for (i, &x) in a.iter().enumerate() {
        assert_near(d.value[i], x.ln(), 1e-15, "ln");
        assert_near(d.first.as_ref().unwrap()[i], 1.0 / x, 1e-15, "1/x");
        assert_near(d.second.as_ref().unwrap()[i], -1.0 / (x * x), 1e-15, "-1/x²");
    }
}

#[test]
fn smooth_log_below_eps() {
    let eps = DEFAULT_EPS;
    let a0 = (-100.0_f64).exp();
    let d = smooth_log(&[a0], eps, DerivOrder::Second);
    let dd = (a0 - eps) / eps;
    assert_near(d.value[0], eps.ln() + dd - 0.5 * dd * dd, 1e-12, "value");
    assert_near(d.first.unwrap()[0], (2.0 - a0 / eps) / eps, 1e-12, "first");
    assert_near(d.second.unwrap()[0], -1.0 / (eps * eps), 1e-12, "second");

    // finite even for negative arguments
    let neg = smooth_log(&[-1.0], eps, DerivOrder::Value);
    assert!(neg.value[0].is_finite());
}

#[test]
fn smooth_log_is_c2_at_eps() {
    let eps = 0.1;
    let d = smooth_log(&[eps * (1.0 - 1e-9), eps * (1.0 + 1e-9)], eps, DerivOrder::Second);
    assert_c2(&d, "smooth_log at eps");
}

#[test]
fn derivative_order_controls_output() {
    let d = smooth_log(&[1.0], DEFAULT_EPS, DerivOrder::Value);
    assert!(d.first.is_none() && d.second.is_none());
    let d = smooth_log(&[1.0], DEFAULT_EPS, DerivOrder::First);
    assert!(d.first.is_some() && d.second.is_none());
}

#[test]
fn smooth_exp_extensions() {
    let a = [-70.0, 2.0, 3.0, 60.0];
    let d = smooth_exp(&a, DEFAULT_BIGX, DEFAULT_LOWX, DerivOrder::Second);
    let (el, eb) = (DEFAULT_LOWX.exp(), DEFAULT_BIGX.exp());
    // below: d = 20
    assert_near(d.value[0], el * (1.0 - 20.0 + 200.0), 1e-12, "low value");
    assert_near(d.value[1], 2.0_f64.exp(), 1e-15, "exact");
    assert_near(d.value[3], eb * (1.0 + 10.0 + 50.0), 1e-12, "high value");

    let first = d.first.unwrap();
    assert_near(first[0], el * (1.0 - 20.0), 1e-12, "low slope");
    assert_near(first[2], 3.0_f64.exp(), 1e-15, "exact slope");
    assert_near(first[3], eb * 11.0, 1e-12, "high slope");

    let second = d.second.unwrap();
    assert_near(second[0], el, 1e-15, "low curvature");
    assert_near(second[3], eb, 1e-15, "high curvature");
}

#[test]
fn smooth_exp_is_c2_at_bounds() {
    let (lo, hi) = (-2.0, 2.0);
    let d = smooth_exp(&[hi - 1e-9, hi + 1e-9], hi, lo, DerivOrder::Second);
    assert_c2(&d, "smooth_exp at bigx");
    let d = smooth_exp(&[lo - 1e-9, lo + 1e-9], hi, lo, DerivOrder::Second);
    assert_c2(&d, "smooth_exp at lowx");
}

#[test]
fn smooth_xlogx_values() {
    let d = smooth_xlogx(&[2.0, 0.0], DEFAULT_EPS, DerivOrder::Second);
    assert_near(d.value[0], 2.0 * 2.0_f64.ln(), 1e-15, "2 ln 2");
    assert!(d.value[1].abs() < 1e-29, "0 ln 0 -> {}", d.value[1]);
    let first = d.first.unwrap();
    assert_near(first[0], 1.0 + 2.0_f64.ln(), 1e-15, "slope");
    assert_near(d.second.unwrap()[0], 0.5, 1e-15, "curvature");
}

#[test]
fn smooth_xlogx_is_c2_at_eps() {
    let eps = 0.1;
    let d = smooth_xlogx(&[eps * (1.0 - 1e-9), eps * (1.0 + 1e-9)], eps, DerivOrder::Second);
    assert_c2(&d, "smooth_xlogx at eps");
}

#[test]
fn pow_scalar_integer_exponent() {
    let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let p = pow_derivs(&a, Exponent::Scalar(2.0), DerivOrder::Second).unwrap();
    for (i, &x) in a.iter().enumerate() {
        let l = x.ln();
        assert_near(p.value[i], x * x, 1e-14, "a^2");
        assert_near(p.da.as_ref().unwrap()[i], 2.0 * x, 1e-14, "da");
        assert_near(p.db.as_ref().unwrap()[i], x * x * l, 1e-14, "db");
        assert_near(p.daa.as_ref().unwrap()[i], 2.0, 1e-14, "daa");
        assert_near(p.dab.as_ref().unwrap()[i], x * (1.0 + 2.0 * l), 1e-14, "dab");
        assert_near(p.dbb.as_ref().unwrap()[i], x * x * l * l, 1e-14, "dbb");
    }
}

#[test]
fn pow_negative_base() {
    let err = pow_derivs(&[1.0, -2.0], Exponent::Scalar(0.5), DerivOrder::Value).unwrap_err();
    assert_eq!(err, TransformError::NegativeBase { base: -2.0, exponent: 0.5 });
    // integer powers of negative numbers are fine
    let p = pow_derivs(&[-2.0], Exponent::Scalar(3.0), DerivOrder::Value).unwrap();
    assert_eq!(p.value, vec![-8.0]);
}

#[test]
fn pow_elementwise() {
    let a = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let b = [2.0, 1.0, 0.5, 2.0, 3.0, 1.5];
    let p = pow_derivs(&a, Exponent::Elementwise(&b), DerivOrder::Second).unwrap();
    for i in 0..a.len() {
        let (x, e, l) = (a[i], b[i], a[i].ln());
        let v = x.powf(e);
        assert_near(p.value[i], v, 1e-14, "a^b");
        assert_near(p.da.as_ref().unwrap()[i], e * v / x, 1e-14, "da");
        assert_near(p.db.as_ref().unwrap()[i], v * l, 1e-14, "db");
        assert_near(p.daa.as_ref().unwrap()[i], e * (e - 1.0) * v / (x * x), 1e-14, "daa");
        assert_near(p.dab.as_ref().unwrap()[i], v / x * (1.0 + e * l), 1e-14, "dab");
        assert_near(p.dbb.as_ref().unwrap()[i], v * l * l, 1e-14, "dbb");
    }
}

#[test]
fn pow_elementwise_length_mismatch() {
    let err = pow_derivs(&[1.0, 2.0], Exponent::Elementwise(&[1.0]), DerivOrder::Value).unwrap_err();
    assert_eq!(err, TransformError::LengthMismatch { expected: 2, got: 1 });
}

#[test]
fn clamp_summary_reports_each_side() {
    let s = ClampSummary::new(&[-70.0, -60.0, 0.0, 55.0, 80.0, 60.0], DEFAULT_LOWX, DEFAULT_BIGX);
    assert_eq!((s.below, s.min), (2, -70.0));
    assert_eq!((s.above, s.max), (3, 80.0));

    let one_sided = ClampSummary::new(&[1e-40, 1.0, 2e-35], DEFAULT_EPS, f64::INFINITY);
    assert_eq!((one_sided.below, one_sided.min), (2, 1e-40));
    assert_eq!(one_sided.above, 0);
}
