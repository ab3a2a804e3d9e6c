/// Cholesky factor of a symmetric positive-definite pentadiagonal matrix,
/// stored by bands.
#[derive(Debug, Clone)]
pub(super) struct PentaCholesky {
    d: Vec<f64>,
    e: Vec<f64>,
    f: Vec<f64>,
}

impl PentaCholesky {
    /// Factor the matrix with diagonal `a0`, first superdiagonal `a1` and
    /// second superdiagonal `a2` (entries past the end are ignored). `None`
    /// if a pivot is not positive.
    pub(super) fn new(a0: &[f64], a1: &[f64], a2: &[f64]) -> Option<Self> {
        let m = a0.len();
        let mut d = vec![0.0; m];
        let mut e = vec![0.0; m];
        let mut f = vec![0.0; m];
        for i in 0..m {
            let mut piv = a0[i];
            if i >= 1 {
                piv -= e[i - 1] * e[i - 1];
            }
            if i >= 2 {
                piv -= f[i - 2] * f[i - 2];
            }
            if !(piv > 0.0) {
                return None;
            }
            d[i] = piv.sqrt();
            if i + 1 < m {
                let mut v = a1[i];
                if i >= 1 {
                    v -= f[i - 1] * e[i - 1];
                }
                e[i] = v / d[i];
            }
            if i + 2 < m {
                f[i] = a2[i] / d[i];
            }
        }
        Some(Self { d, e, f })
    }

    /// Solve `A x = b`.
    pub(super) fn solve(&self, b: &[f64]) -> Vec<f64> {
        let m = self.d.len();
        let mut z = vec![0.0; m];
        for i in 0..m {
            let mut v = b[i];
            if i >= 1 {
                v -= self.e[i - 1] * z[i - 1];
            }
            if i >= 2 {
                v -= self.f[i - 2] * z[i - 2];
            }
            z[i] = v / self.d[i];
        }
        let mut x = vec![0.0; m];
        for i in (0..m).rev() {
            let mut v = z[i];
            if i + 1 < m {
                v -= self.e[i] * x[i + 1];
            }
            if i + 2 < m {
                v -= self.f[i] * x[i + 2];
            }
            x[i] = v / self.d[i];
        }
        x
    }
}
