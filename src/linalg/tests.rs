use super::*;
use crate::Matrix;

fn assert_near(a: f64, b: f64, tol: f64, msg: &str) {
    assert!((a - b).abs() < tol, "{}: {} vs {} (diff {})", msg, a, b, (a - b).abs());
}

fn spd_4() -> Matrix<f64> {
    let a = Matrix::from_fn(4, 4, |i, j| ((i + 1) * (j + 1)) as f64 + if i == j { 10.0 } else { 0.0 });
    &a * &a.transpose()
}

// ── LU ──────────────────────────────────────────────────────────────

#[test]
fn lu_solve_3x3() {
    let a = Matrix::from_rows(3, 3, &[2.0, 1.0, -1.0, -3.0, -1.0, 2.0, -2.0, 1.0, 2.0]);
    let x = Lu::new(&a).unwrap().solve(&[8.0, -11.0, -3.0]);
    assert_near(x[0], 2.0, 1e-12, "x0");
    assert_near(x[1], 3.0, 1e-12, "x1");
    assert_near(x[2], -1.0, 1e-12, "x2");
}

#[test]
fn lu_det_with_pivoting() {
    let a = Matrix::from_rows(3, 3, &[0.0, 2.0, 1.0, 1.0, 1.0, 0.0, 3.0, 0.0, 1.0]);
    // det = 0*(1) - 2*(1 - 0) + 1*(0 - 3) = -5
    assert_near(Lu::new(&a).unwrap().det(), -5.0, 1e-12, "det");
}

#[test]
fn lu_singular() {
    let a = Matrix::from_rows(2, 2, &[1.0, 2.0, 2.0, 4.0]);
    assert_eq!(Lu::new(&a).unwrap_err(), LinalgError::Singular);
}

#[test]
fn lu_not_square() {
    let a = Matrix::<f64>::zeros(2, 3);
    assert_eq!(Lu::new(&a).unwrap_err(), LinalgError::NotSquare { rows: 2, cols: 3 });
}

// ── QR / least squares ──────────────────────────────────────────────

#[test]
fn qr_r_is_upper_triangular() {
    let a = Matrix::from_rows(3, 3, &[12.0, -51.0, 4.0, 6.0, 167.0, -68.0, -4.0, 24.0, -41.0]);
    let r = Qr::new(&a).unwrap().r();
    assert_near(r[(1, 0)], 0.0, 1e-14, "r10");
    assert_near(r[(2, 1)], 0.0, 1e-14, "r21");
    // |R_00| is the norm of the first column
    assert_near(r[(0, 0)].abs(), 14.0, 1e-12, "r00");
}

#[test]
fn lstsq_recovers_exact_coefficients() {
    // y = 1 - 2 x1 + 0.5 x2, no noise
    let n = 20;
    let x1: Vec<f64> = (0..n).map(|i| i as f64 / 3.0).collect();
    let x2: Vec<f64> = (0..n).map(|i| ((i * 7) % 5) as f64).collect();
    let ones = vec![1.0; n];
    let design = Matrix::from_columns(&[&ones[..], &x1[..], &x2[..]]);
    let y: Vec<f64> = (0..n).map(|i| 1.0 - 2.0 * x1[i] + 0.5 * x2[i]).collect();
    let b = lstsq(&design, &Matrix::from_column(&y)).unwrap();
    assert_near(b[(0, 0)], 1.0, 1e-10, "b0");
    assert_near(b[(1, 0)], -2.0, 1e-10, "b1");
    assert_near(b[(2, 0)], 0.5, 1e-10, "b2");
}

#[test]
fn lstsq_rank_deficient() {
    let design = Matrix::from_rows(3, 2, &[1.0, 2.0, 2.0, 4.0, 3.0, 6.0]);
    let y = Matrix::from_column(&[1.0, 2.0, 3.0]);
    assert_eq!(lstsq(&design, &y).unwrap_err(), LinalgError::Singular);
}

#[test]
fn qr_underdetermined() {
    let a = Matrix::<f64>::zeros(2, 3);
    assert_eq!(
        Qr::new(&a).unwrap_err(),
        LinalgError::Underdetermined { rows: 2, cols: 3 }
    );
}

// ── Cholesky ────────────────────────────────────────────────────────

#[test]
fn cholesky_reconstructs() {
    let a = spd_4();
    let chol = Cholesky::new(&a).unwrap();
    let l = chol.l();
    let llt = l * &l.transpose();
    for i in 0..4 {
        for j in 0..4 {
            assert_near(llt[(i, j)], a[(i, j)], 1e-9, "LLᵀ");
        }
    }
    let ln_det = Lu::new(&a).unwrap().det().ln();
    assert_near(chol.ln_det(), ln_det, 1e-9, "ln det");

    let b = [1.0, -1.0, 2.0, 0.5];
    let x = chol.solve(&b);
    let ax = a.vecmul(&x);
    for i in 0..4 {
        assert_near(ax[i], b[i], 1e-9, "Ax = b");
    }
}

#[test]
fn cholesky_not_pd() {
    let a = Matrix::from_rows(2, 2, &[1.0, 5.0, 5.0, 1.0]);
    assert_eq!(Cholesky::new(&a).unwrap_err(), LinalgError::NotPositiveDefinite);
}

// ── Symmetric eigen ─────────────────────────────────────────────────

#[test]
fn symmetric_eigen_2x2() {
    let a = Matrix::from_rows(2, 2, &[3.0, 2.0, 2.0, 3.0]);
    let eig = SymmetricEigen::new(&a).unwrap();
    assert_near(eig.values[0], 1.0, 1e-12, "λ0");
    assert_near(eig.values[1], 5.0, 1e-12, "λ1");
}

#[test]
fn symmetric_eigen_reconstructs_4x4() {
    let a = spd_4();
    let eig = SymmetricEigen::new(&a).unwrap();
    assert!(eig.values.windows(2).all(|w| w[0] <= w[1]), "ascending");
    let back = eig.recompose(|l| l);
    for i in 0..4 {
        for j in 0..4 {
            assert_near(back[(i, j)], a[(i, j)], 1e-8, "V Λ Vᵀ");
        }
    }
    let vtv = eig.vectors.tr_mul(&eig.vectors);
    for i in 0..4 {
        for j in 0..4 {
            assert_near(vtv[(i, j)], if i == j { 1.0 } else { 0.0 }, 1e-10, "VᵀV");
        }
    }
}

#[test]
fn sqrt_pd_matrix_squares_back() {
    let a = Matrix::from_rows(2, 2, &[3.0, 2.0, 2.0, 3.0]);
    let b = sqrt_pd_matrix(&a).unwrap();
    assert_near(b[(0, 1)], b[(1, 0)], 1e-12, "symmetric");
    let bb = &b * &b;
    for i in 0..2 {
        for j in 0..2 {
            assert_near(bb[(i, j)], a[(i, j)], 1e-10, "b²");
        }
    }
}

#[test]
fn sqrt_pd_matrix_clips_negative_rounding() {
    // rank-one PSD matrix: one eigenvalue is zero up to rounding
    let a = Matrix::<f64>::from_rows(2, 2, &[1.0, 1.0, 1.0, 1.0]);
    let b = sqrt_pd_matrix(&a).unwrap();
    assert!(b.as_slice().iter().all(|x| x.is_finite()));
    let bb = &b * &b;
    assert_near(bb[(0, 1)], 1.0, 1e-8, "rank one");
}
