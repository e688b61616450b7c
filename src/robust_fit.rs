//! Robust affine fit `v ≈ a + b·t` via Huber-loss ADMM (§4.5).
//!
//! The design matrix here is always `M×2` (an intercept column and a
//! slope column), so a hand-rolled 2×2 Cholesky solve is simpler and
//! avoids pulling in a general linear-algebra crate just for this.

const RHO: f64 = 1.0;
const ITERS: usize = 1000;

/// Cholesky factor of a symmetric positive-definite 2x2 matrix `[[a,b],[b,c]]`.
struct Chol2 {
    l11: f64,
    l21: f64,
    l22: f64,
}

impl Chol2 {
    fn factor(a00: f64, a01: f64, a11: f64) -> Chol2 {
        let l11 = a00.sqrt();
        let l21 = if l11 > 0.0 { a01 / l11 } else { 0.0 };
        let l22 = (a11 - l21 * l21).max(0.0).sqrt();
        Chol2 { l11, l21, l22 }
    }

    /// Solves `(L L^T) x = rhs` for a 2-vector `rhs`.
    fn solve(&self, rhs0: f64, rhs1: f64) -> (f64, f64) {
        // Forward: L y = rhs
        let y0 = if self.l11 > 0.0 { rhs0 / self.l11 } else { 0.0 };
        let y1 = if self.l22 > 0.0 {
            (rhs1 - self.l21 * y0) / self.l22
        } else {
            0.0
        };
        // Back: L^T x = y
        let x1 = if self.l22 > 0.0 { y1 / self.l22 } else { 0.0 };
        let x0 = if self.l11 > 0.0 {
            (y0 - self.l21 * x1) / self.l11
        } else {
            0.0
        };
        (x0, x1)
    }
}

/// Solves the robust affine fit for pre-scaled `t` (design column) against
/// pre-scaled `v` (target), returning `[a, b]` such that `v ≈ a + b·t`.
///
/// `t` and `v` must already be divided by the winsor threshold `w`, per
/// §4.4 step 5 — and so must `ones`, the constant value of the design's
/// intercept column (`1/w`, not `1`): the source builds the whole design
/// matrix `[ones, clock_times]/w` before fitting, not just its `t` column,
/// which is what lets the returned `(a, b)` apply directly to unscaled
/// timestamps. Passing `ones = 1.0` recovers the unscaled fit.
pub(crate) fn robust_fit(ones: f64, t: &[f64], v: &[f64]) -> (f64, f64) {
    debug_assert_eq!(t.len(), v.len());
    let m = t.len();
    if m == 0 {
        return (0.0, 0.0);
    }
    if m == 1 {
        return (v[0] / ones, 0.0);
    }

    // AtA = [[m*ones^2, ones*sum(t)], [ones*sum(t), sum(t^2)]];
    // Aty = [ones*sum(v), sum(t*v)].
    let sum_t: f64 = t.iter().sum();
    let sum_t2: f64 = t.iter().map(|x| x * x).sum();
    let aty0: f64 = ones * v.iter().sum::<f64>();
    let aty1: f64 = t.iter().zip(v).map(|(ti, vi)| ti * vi).sum();

    let chol = Chol2::factor(m as f64 * ones * ones, ones * sum_t, sum_t2);

    let mut z = vec![0.0; m];
    let mut u = vec![0.0; m];
    let mut x = (0.0, 0.0);

    for _ in 0..ITERS {
        let rhs0 = aty0 + sum_zu(t, &z, &u, ones, false);
        let rhs1 = aty1 + sum_zu(t, &z, &u, ones, true);
        x = chol.solve(rhs0, rhs1);

        for i in 0..m {
            let ax = x.0 * ones + x.1 * t[i];
            let d = ax - v[i] + u[i];
            let tmp = if d == 0.0 {
                0.0
            } else {
                (1.0 - (1.0 + 1.0 / RHO) / d.abs()).max(0.0)
            };
            let zi = (RHO / (1.0 + RHO)) * d + (1.0 / (1.0 + RHO)) * tmp * d;
            u[i] = d - zi;
            z[i] = zi;
        }
    }

    x
}

/// Computes `A^T (z - u)` for either the intercept column (`weight_t =
/// false`, i.e. the constant `ones`) or the slope column (`weight_t = true`,
/// i.e. `t`).
fn sum_zu(t: &[f64], z: &[f64], u: &[f64], ones: f64, weight_t: bool) -> f64 {
    z.iter()
        .zip(u)
        .zip(t)
        .map(|((zi, ui), ti)| {
            let diff = zi - ui;
            if weight_t {
                diff * ti
            } else {
                diff * ones
            }
        })
        .sum()
}
