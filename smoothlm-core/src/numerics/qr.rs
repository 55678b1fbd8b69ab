//! Column-pivoted Householder QR and the damped least-squares solve built on it.
//!
//! For `J` (m x n) the factorization is `J P = Q R` with `|R_00| >= |R_11| >= ...`.
//! The damped problem
//!
//! ```text
//! minimize  ‖J x + r‖² + ‖D x‖²
//! ```
//!
//! is solved without forming `JᵀJ`: the permuted diagonal `Pᵀ D P` is stacked
//! under `R` and eliminated with Givens rotations, leaving an upper-triangular
//! `S` with `SᵀS = RᵀR + PᵀD²P`.
//!
//! Everything is generic over `nalgebra::Dim`. Static and dynamic inputs go
//! through the same loops in the same order, so their results agree bit for bit.

use nalgebra::{allocator::Allocator, Const, DefaultAllocator, Dim, OMatrix, OVector};

/// Pivoted QR of a Jacobian, reused across damping values.
#[derive(Clone, Debug)]
pub struct PivotedQr<M: Dim, N: Dim>
where
    DefaultAllocator: Allocator<M, N> + Allocator<N>,
{
    // R on and above the diagonal, Householder vectors (implicit unit head) below
    qr: OMatrix<f64, M, N>,
    tau: OVector<f64, N>,
    perm: OVector<usize, N>,
    rank: usize,
}

/// Result of [`PivotedQr::solve_damped`].
#[derive(Clone, Debug)]
pub struct DampedSolution<N: Dim>
where
    DefaultAllocator: Allocator<N> + Allocator<N, N>,
{
    /// Minimizer of `‖J x + r‖² + ‖D x‖²`, in the original column order.
    pub x: OVector<f64, N>,
    /// Diagonal of `S`.
    pub s_diag: OVector<f64, N>,
    /// Upper-triangular `S` in pivoted order.
    pub s: OMatrix<f64, N, N>,
}

impl<M: Dim, N: Dim> PivotedQr<M, N>
where
    DefaultAllocator: Allocator<M, N> + Allocator<M> + Allocator<N> + Allocator<N, N>,
{
    pub fn new(j: &OMatrix<f64, M, N>) -> Self {
        let (_, ncols) = j.shape_generic();
        let (m, n) = j.shape();
        let k = m.min(n);

        let mut qr = j.clone_owned();
        let mut tau = OVector::<f64, N>::zeros_generic(ncols, Const::<1>);
        let mut perm = OVector::<usize, N>::from_fn_generic(ncols, Const::<1>, |i, _| i);

        for i in 0..k {
            // largest remaining column norm, first one wins on ties
            let mut best = i;
            let mut best_norm = tail_norm(&qr, i, i);
            for c in i + 1..n {
                let cn = tail_norm(&qr, c, i);
                if cn > best_norm {
                    best = c;
                    best_norm = cn;
                }
            }
            if best != i {
                qr.swap_columns(i, best);
                perm.swap_rows(i, best);
            }

            if best_norm == 0.0 {
                tau[i] = 0.0;
                continue;
            }

            let x0 = qr[(i, i)];
            let beta = -x0.signum() * best_norm;
            let t = (beta - x0) / beta;
            let scale = 1.0 / (x0 - beta);
            for row in i + 1..m {
                qr[(row, i)] *= scale;
            }
            qr[(i, i)] = beta;
            tau[i] = t;

            for c in i + 1..n {
                let mut s = qr[(i, c)];
                for row in i + 1..m {
                    s += qr[(row, i)] * qr[(row, c)];
                }
                s *= t;
                qr[(i, c)] -= s;
                for row in i + 1..m {
                    let v = qr[(row, i)];
                    qr[(row, c)] -= s * v;
                }
            }
        }

        let rank = if k == 0 {
            0
        } else {
            let threshold = f64::EPSILON * (m.max(n) as f64) * qr[(0, 0)].abs();
            (0..k)
                .take_while(|&i| {
                    let rii = qr[(i, i)].abs();
                    rii > threshold && rii > 0.0
                })
                .count()
        };

        Self {
            qr,
            tau,
            perm,
            rank,
        }
    }

    /// Number of pivots of `R` that are not negligible.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn nrows(&self) -> usize {
        self.qr.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.qr.ncols()
    }

    /// `perm[j]` is the original column placed at pivoted position `j`.
    pub fn permutation(&self) -> &OVector<usize, N> {
        &self.perm
    }

    /// Diagonal of `R`, zero past `min(m, n)`.
    pub fn r_diagonal(&self) -> OVector<f64, N> {
        let (_, ncols) = self.qr.shape_generic();
        OVector::from_fn_generic(ncols, Const::<1>, |j, _| self.r_at(j, j))
    }

    /// Entry `(i, j)` of the upper-triangular factor `R`.
    pub fn r_at(&self, i: usize, j: usize) -> f64 {
        if i <= j && i < self.qr.nrows() {
            self.qr[(i, j)]
        } else {
            0.0
        }
    }

    /// Leading `min(m, n)` entries of `Qᵀ r`, zeroed past the rank.
    pub fn qtr(&self, r: &OVector<f64, M>) -> OVector<f64, N> {
        let (m, n) = self.qr.shape();
        let k = m.min(n);
        let mut w = r.clone_owned();
        for i in 0..k {
            let t = self.tau[i];
            if t == 0.0 {
                continue;
            }
            let mut s = w[i];
            for row in i + 1..m {
                s += self.qr[(row, i)] * w[row];
            }
            s *= t;
            w[i] -= s;
            for row in i + 1..m {
                w[row] -= s * self.qr[(row, i)];
            }
        }

        let (_, ncols) = self.qr.shape_generic();
        OVector::from_fn_generic(ncols, Const::<1>, |j, _| {
            if j < self.rank {
                w[j]
            } else {
                0.0
            }
        })
    }

    /// Solve `minimize ‖J x + r‖² + ‖D x‖²` given `qtr = self.qtr(r)`.
    ///
    /// Components behind a vanishing diagonal of `S` are set to zero.
    pub fn solve_damped(&self, diag: &OVector<f64, N>, qtr: &OVector<f64, N>) -> DampedSolution<N> {
        let (_, ncols) = self.qr.shape_generic();
        let n = self.qr.ncols();

        let mut s = OMatrix::<f64, N, N>::zeros_generic(ncols, ncols);
        for i in 0..self.rank {
            for j in i..n {
                s[(i, j)] = self.qr[(i, j)];
            }
        }
        let mut z = qtr.clone_owned();
        let mut sdiag = OVector::<f64, N>::zeros_generic(ncols, Const::<1>);

        for j in 0..n {
            let dj = diag[self.perm[j]];
            if dj == 0.0 {
                continue;
            }
            for v in sdiag.iter_mut().skip(j) {
                *v = 0.0;
            }
            sdiag[j] = dj;

            // rotate the row `dj e_j` into S, one pivot at a time
            let mut qtbpj = 0.0;
            for k in j..n {
                if sdiag[k] == 0.0 {
                    continue;
                }
                let (cos, sin) = if s[(k, k)].abs() < sdiag[k].abs() {
                    let cotan = s[(k, k)] / sdiag[k];
                    let sin = 0.5 / (0.25 + 0.25 * cotan * cotan).sqrt();
                    (sin * cotan, sin)
                } else {
                    let tan = sdiag[k] / s[(k, k)];
                    let cos = 0.5 / (0.25 + 0.25 * tan * tan).sqrt();
                    (cos, cos * tan)
                };

                s[(k, k)] = cos * s[(k, k)] + sin * sdiag[k];
                let temp = cos * z[k] + sin * qtbpj;
                qtbpj = -sin * z[k] + cos * qtbpj;
                z[k] = temp;

                for i in k + 1..n {
                    let temp = cos * s[(k, i)] + sin * sdiag[i];
                    sdiag[i] = -sin * s[(k, i)] + cos * sdiag[i];
                    s[(k, i)] = temp;
                }
            }
        }

        let nsing = (0..n).find(|&j| s[(j, j)] == 0.0).unwrap_or(n);
        for v in z.iter_mut().skip(nsing) {
            *v = 0.0;
        }
        for j in (0..nsing).rev() {
            let mut sum = 0.0;
            for i in j + 1..nsing {
                sum += s[(j, i)] * z[i];
            }
            z[j] = (z[j] - sum) / s[(j, j)];
        }

        let mut x = OVector::<f64, N>::zeros_generic(ncols, Const::<1>);
        for j in 0..n {
            x[self.perm[j]] = -z[j];
        }
        let s_diag = OVector::from_fn_generic(ncols, Const::<1>, |j, _| s[(j, j)]);

        DampedSolution { x, s_diag, s }
    }
}

/// Solve `minimize ‖J x + r‖² + ‖D x‖²` for a factored `J`.
pub fn solve_ls<M, N>(qr: &PivotedQr<M, N>, d: &OVector<f64, N>, r: &OVector<f64, M>) -> OVector<f64, N>
where
    M: Dim,
    N: Dim,
    DefaultAllocator: Allocator<M, N> + Allocator<M> + Allocator<N> + Allocator<N, N>,
{
    let qtr = qr.qtr(r);
    qr.solve_damped(d, &qtr).x
}

fn tail_norm<M, N>(a: &OMatrix<f64, M, N>, col: usize, from: usize) -> f64
where
    M: Dim,
    N: Dim,
    DefaultAllocator: Allocator<M, N>,
{
    let mut sum = 0.0;
    for row in from..a.nrows() {
        let v = a[(row, col)];
        sum += v * v;
    }
    sum.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DMatrix, DVector, Matrix2, Matrix3, Matrix3x2, Vector2, Vector3};

    #[test]
    fn reconstructs_permuted_columns() {
        let j = Matrix3::new(1.0, 4.0, 0.5, 2.0, -1.0, 0.0, 0.0, 3.0, 1.0);
        let qr = PivotedQr::new(&j);
        assert_eq!(qr.rank(), 3);
        // the second column has the largest norm and is pivoted first
        assert_eq!(qr.permutation()[0], 1);

        let d = qr.r_diagonal();
        assert!(d[0].abs() >= d[1].abs() && d[1].abs() >= d[2].abs());
        assert!((d[0].abs() - 26.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn undamped_solve_matches_inverse() {
        let j = Matrix2::new(2.0, 1.0, 1.0, 3.0);
        let r = Vector2::new(1.0, -2.0);
        let qr = PivotedQr::new(&j);
        let x = solve_ls(&qr, &Vector2::zeros(), &r);

        let inv = j.try_inverse().expect("matrix is invertible");
        let expected = -(inv * r);
        assert!((x - expected).norm() < 1e-12, "x = {x}, expected = {expected}");
    }

    #[test]
    fn overdetermined_solve_satisfies_normal_equations() {
        let j = Matrix3x2::new(1.0, 0.0, 1.0, 1.0, 1.0, 2.0);
        let r = Vector3::new(-1.0, 0.5, 2.0);
        let x = solve_ls(&PivotedQr::new(&j), &Vector2::zeros(), &r);

        let grad = j.transpose() * (j * x + r);
        assert!(grad.norm() < 1e-12, "gradient = {grad}");
    }

    #[test]
    fn zero_column_gets_zero_component() {
        let j = Matrix3x2::new(1.0, 0.0, 2.0, 0.0, -1.0, 0.0);
        let r = Vector3::new(1.0, 1.0, 1.0);
        let qr = PivotedQr::new(&j);
        assert_eq!(qr.rank(), 1);

        let x = solve_ls(&qr, &Vector2::zeros(), &r);
        assert_eq!(x[1], 0.0);
        assert!((x[0] + 2.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn empty_problem_gives_empty_step() {
        let j = DMatrix::<f64>::zeros(3, 0);
        let r = DVector::from_element(3, 1.0);
        let qr = PivotedQr::new(&j);
        let x = solve_ls(&qr, &DVector::zeros(0), &r);
        assert_eq!(x.len(), 0);
        assert_eq!(qr.rank(), 0);
    }

    #[test]
    fn zero_jacobian_without_damping_gives_zero_step() {
        let j = DMatrix::<f64>::zeros(2, 3);
        let r = DVector::from_element(2, 1.0);
        let x = solve_ls(&PivotedQr::new(&j), &DVector::zeros(3), &r);
        assert!(x.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn damping_matches_stacked_system() {
        let j = Matrix2::new(1.0, 2.0, 3.0, 4.0);
        let r = Vector2::new(0.5, -1.0);
        let d = Vector2::new(0.7, 1.3);
        let x = solve_ls(&PivotedQr::new(&j), &d, &r);

        // (JᵀJ + D²) x = -Jᵀ r
        let lhs = j.transpose() * j + Matrix2::from_diagonal(&d.component_mul(&d));
        let residual = lhs * x + j.transpose() * r;
        assert!(residual.norm() < 1e-12, "residual = {residual}");
    }
}
