use super::*;
use proptest::prelude::*;

fn assert_matrix_eq(a: &Matrix<f64>, b: &Matrix<f64>) {
    assert_eq!(a.shape(), b.shape(), "shapes differ");
    for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
        assert!((x - y).abs() < 1e-12, "{:?} vs {:?}", a, b);
    }
}

// ── Construction and access ─────────────────────────────────────────

#[test]
fn from_rows_is_row_major() {
    let m = Matrix::from_rows(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    assert_eq!(m[(0, 0)], 1.0);
    assert_eq!(m[(0, 2)], 3.0);
    assert_eq!(m[(1, 0)], 4.0);
    assert_eq!(m.col(1), &[2.0, 5.0]);
    assert_eq!(m.row(1), vec![4.0, 5.0, 6.0]);
}

#[test]
fn from_columns_stacks() {
    let m = Matrix::from_columns(&[&[1.0, 2.0][..], &[3.0, 4.0], &[5.0, 6.0]]);
    assert_eq!(m.shape(), (2, 3));
    assert_eq!(m.row(0), vec![1.0, 3.0, 5.0]);
}

#[test]
#[should_panic]
fn from_columns_ragged_panics() {
    let _ = Matrix::from_columns(&[&[1.0, 2.0][..], &[3.0]]);
}

#[test]
fn transpose_and_select() {
    let m = Matrix::from_rows(2, 3, &[1, 2, 3, 4, 5, 6]);
    let t = m.transpose();
    assert_eq!(t.shape(), (3, 2));
    assert_eq!(t[(2, 1)], 6);
    let s = m.select(&[1, 1], &[2, 0]);
    assert_eq!(s, Matrix::from_rows(2, 2, &[6, 4, 6, 4]));
}

// ── Arithmetic ──────────────────────────────────────────────────────

#[test]
fn matmul_matches_hand_computation() {
    let a = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    let b = Matrix::from_rows(2, 2, &[5.0, 6.0, 7.0, 8.0]);
    let c = &a * &b;
    assert_matrix_eq(&c, &Matrix::from_rows(2, 2, &[19.0, 22.0, 43.0, 50.0]));
    assert_matrix_eq(&a.tr_mul(&b), &(&a.transpose() * &b));
    assert_eq!(a.vecmul(&[1.0, 1.0]), vec![3.0, 7.0]);
}

#[test]
fn elementwise_ops() {
    let a = Matrix::from_rows(2, 2, &[1.0, 2.0, 3.0, 4.0]);
    let b = Matrix::fill(2, 2, 1.0);
    assert_matrix_eq(&(&a + &b), &Matrix::from_rows(2, 2, &[2.0, 3.0, 4.0, 5.0]));
    assert_matrix_eq(&(&a - &b), &Matrix::from_rows(2, 2, &[0.0, 1.0, 2.0, 3.0]));
    assert_matrix_eq(&(&a * 2.0), &Matrix::from_rows(2, 2, &[2.0, 4.0, 6.0, 8.0]));
    assert_matrix_eq(&a.hadamard(&a), &Matrix::from_rows(2, 2, &[1.0, 4.0, 9.0, 16.0]));
    assert_eq!(a.sum(), 10.0);
    assert_eq!(a.col_sums(), vec![4.0, 6.0]);
    assert_eq!(a.row_sums(), vec![3.0, 7.0]);
}

#[test]
#[should_panic]
fn add_shape_mismatch_panics() {
    let _ = Matrix::<f64>::zeros(2, 2) + Matrix::<f64>::zeros(2, 3);
}

// ── Array helpers ───────────────────────────────────────────────────

#[test]
fn repeat_row_and_col() {
    let vm = repeat_row(&[0, 1, 2], 2);
    assert_eq!(vm, Matrix::from_rows(2, 3, &[0, 1, 2, 0, 1, 2]));
    let vn = repeat_col(&[0, 1, 2], 4);
    assert_eq!(
        vn,
        Matrix::from_rows(3, 4, &[0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2])
    );
}

#[test]
fn max_abs_picks_negative() {
    assert_eq!(max_abs(&[1.0, -7.5, 3.0]).unwrap(), 7.5);
    assert_eq!(max_abs::<f64>(&[]).unwrap_err(), ShapeError::Empty);
}

#[test]
fn padding() {
    assert_eq!(pad_beg_zeros(&[1, 2, 3, 4], 8), vec![0, 0, 0, 0, 1, 2, 3, 4]);
    assert_eq!(pad_end_zeros(&[1, 2, 3, 4], 8), vec![1, 2, 3, 4, 0, 0, 0, 0]);
    assert_eq!(pad_end_zeros(&[1, 2, 3], 2), vec![1, 2, 3]);

    let mat = Matrix::from_rows(2, 2, &[0, 1, 2, 3]);
    let mp = pad2_end_zeros(&mat, 3, 4);
    assert_eq!(mp, Matrix::from_rows(3, 4, &[0, 1, 0, 0, 2, 3, 0, 0, 0, 0, 0, 0]));
    // only one dimension needs padding
    let mr = pad2_end_zeros(&mat, 3, 1);
    assert_eq!(mr, Matrix::from_rows(3, 2, &[0, 1, 2, 3, 0, 0]));
    assert_eq!(pad2_end_zeros(&mat, 1, 1), mat);
}

#[test]
fn grid_all_pairs() {
    let g = grid(&[0, 1, 2], &[0, 1, 2, 3]);
    let expected = Matrix::from_rows(
        12,
        2,
        &[
            0, 0, 0, 1, 0, 2, 0, 3, 1, 0, 1, 1, 1, 2, 1, 3, 2, 0, 2, 1, 2, 2, 2, 3,
        ],
    );
    assert_eq!(g, expected);
}

#[test]
fn lexico_grid_cases() {
    let arr = Matrix::from_rows(2, 3, &[0, 1, 2, 3, 4, 5]);
    let first = Matrix::from_column(arr.col(0));
    assert_eq!(lexico_grid(&first).unwrap(), first);

    let two = Matrix::from_columns(&[arr.col(0), arr.col(1)]);
    assert_eq!(
        lexico_grid(&two).unwrap(),
        Matrix::from_rows(4, 2, &[0, 1, 0, 4, 3, 1, 3, 4])
    );

    let expected = Matrix::from_rows(
        8,
        3,
        &[
            0, 1, 2, 0, 1, 5, 0, 4, 2, 0, 4, 5, 3, 1, 2, 3, 1, 5, 3, 4, 2, 3, 4, 5,
        ],
    );
    assert_eq!(lexico_grid(&arr).unwrap(), expected);
}

#[test]
fn lexico_grid_overflow_is_an_error() {
    let wide = Matrix::<f64>::zeros(3, 64);
    assert_eq!(
        lexico_grid(&wide).unwrap_err(),
        ShapeError::GridTooLarge { base: 3, exponent: 64 }
    );
}

#[test]
fn shape_checks() {
    assert_eq!(check_square(&Matrix::<f64>::zeros(3, 3)).unwrap(), 3);
    assert_eq!(
        check_square(&Matrix::<f64>::zeros(2, 3)).unwrap_err(),
        ShapeError::NotSquare { rows: 2, cols: 3 }
    );
    assert_eq!(check_same_len(&[1, 2], &[3, 4]).unwrap(), 2);
    assert!(check_same_len(&[1, 2], &[3]).is_err());
    assert!(check_rows(&Matrix::<f64>::zeros(4, 2), 4).is_ok());
    assert!(check_rows(&Matrix::<f64>::zeros(4, 2), 5).is_err());
}

proptest! {
    #[test]
    fn padding_preserves_content(v in prop::collection::vec(-100i64..100, 0..20), n in 0usize..30) {
        let beg = pad_beg_zeros(&v, n);
        let end = pad_end_zeros(&v, n);
        prop_assert_eq!(beg.len(), v.len().max(n));
        prop_assert_eq!(&end[..v.len()], &v[..]);
        prop_assert_eq!(&beg[beg.len() - v.len()..], &v[..]);
    }

    #[test]
    fn grid_row_count(v in prop::collection::vec(0i32..10, 1..6), w in prop::collection::vec(0i32..10, 1..6)) {
        let g = grid(&v, &w);
        prop_assert_eq!(g.nrows(), v.len() * w.len());
        prop_assert_eq!(g.row(g.nrows() - 1), vec![*v.last().unwrap(), *w.last().unwrap()]);
    }
}
