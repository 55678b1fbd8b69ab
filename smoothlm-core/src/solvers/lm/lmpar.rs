//! Damping parameter search (Moré, "The Levenberg-Marquardt algorithm:
//! implementation and theory", 1978).
//!
//! Finds `λ >= 0` such that `x(λ) = argmin ‖J x + r‖² + λ‖D x‖²` satisfies
//! either `λ == 0` and `‖D x‖ <= 1.1 Δ`, or `λ > 0` and `|‖D x‖ - Δ| <= 0.1 Δ`.
//!
//! For a rank-deficient `J` the undamped step is the basic solution, while
//! `x(λ)` tends to the least-squares solution of minimal `‖D x‖` as `λ -> 0+`.
//! When that limit is already short enough no damping can reach the band, and
//! the limit itself is returned with `λ = 0`.

use nalgebra::{allocator::Allocator, Const, DefaultAllocator, Dim, OMatrix, OVector};

use crate::numerics::linalg::scaled_norm;
use crate::numerics::qr::PivotedQr;

const MAX_ITERATIONS: usize = 10;

/// Accepted relative deviation of `‖D x‖` from `Δ`.
const RADIUS_SLACK: f64 = 0.1;

/// Outcome of the damping search.
#[derive(Clone, Debug)]
pub struct DampingStep<N: Dim>
where
    DefaultAllocator: Allocator<N>,
{
    pub lambda: f64,
    pub x: OVector<f64, N>,
    /// `‖D x‖`
    pub scaled_norm: f64,
}

/// Factor `j` and run the damping search from `λ = 0`.
pub fn lmpar<M, N>(
    j: &OMatrix<f64, M, N>,
    d: &OVector<f64, N>,
    r: &OVector<f64, M>,
    delta: f64,
) -> (f64, OVector<f64, N>)
where
    M: Dim,
    N: Dim,
    DefaultAllocator: Allocator<M, N> + Allocator<M> + Allocator<N> + Allocator<N, N>,
{
    let qr = PivotedQr::new(j);
    let step = lmpar_with_qr(&qr, d, r, delta, 0.0);
    (step.lambda, step.x)
}

/// Damping search on an existing factorization, warm-started from `lambda0`.
pub fn lmpar_with_qr<M, N>(
    qr: &PivotedQr<M, N>,
    d: &OVector<f64, N>,
    r: &OVector<f64, M>,
    delta: f64,
    lambda0: f64,
) -> DampingStep<N>
where
    M: Dim,
    N: Dim,
    DefaultAllocator: Allocator<M, N> + Allocator<M> + Allocator<N> + Allocator<N, N>,
{
    let dwarf = f64::MIN_POSITIVE;
    let n = qr.ncols();
    let (ncols, _) = d.shape_generic();
    let perm = qr.permutation();
    let qtr = qr.qtr(r);

    // Gauss-Newton step
    let zero = OVector::<f64, N>::zeros_generic(ncols, Const::<1>);
    let gn = qr.solve_damped(&zero, &qtr);
    let dxnorm = scaled_norm(d, &gn.x);
    let mut fp = dxnorm - delta;
    if fp <= RADIUS_SLACK * delta {
        return DampingStep {
            lambda: 0.0,
            x: gn.x,
            scaled_norm: dxnorm,
        };
    }

    if qr.rank() < n {
        let limit = damped_limit(qr, d, &qtr);
        if limit.scaled_norm <= (1.0 + RADIUS_SLACK) * delta {
            return limit;
        }
    }

    // lower bound from the Newton step at λ = 0, only for full column rank
    let mut parl = 0.0;
    if qr.rank() == n && dxnorm > 0.0 {
        let mut wa = OVector::<f64, N>::zeros_generic(ncols, Const::<1>);
        for jj in 0..n {
            let l = perm[jj];
            wa[jj] = d[l] * (d[l] * gn.x[l] / dxnorm);
        }
        for jj in 0..n {
            let mut sum = 0.0;
            for i in 0..jj {
                sum += qr.r_at(i, jj) * wa[i];
            }
            wa[jj] = (wa[jj] - sum) / qr.r_at(jj, jj);
        }
        let temp = wa.norm();
        parl = ((fp / delta) / temp) / temp;
        if !parl.is_finite() {
            parl = 0.0;
        }
    }

    // upper bound ‖(J D⁻¹)ᵀ r‖ / Δ
    let mut gsum = 0.0;
    for jj in 0..n {
        let l = perm[jj];
        if d[l] == 0.0 {
            continue;
        }
        let mut sum = 0.0;
        for i in 0..=jj {
            sum += qr.r_at(i, jj) * qtr[i];
        }
        let g = sum / d[l];
        gsum += g * g;
    }
    let gnorm = gsum.sqrt();
    let mut paru = gnorm / delta;
    if paru == 0.0 {
        paru = dwarf / delta.min(RADIUS_SLACK);
    }

    let mut par = lambda0.max(parl).min(paru);
    if par == 0.0 {
        par = gnorm / dxnorm;
    }

    let mut best = DampingStep {
        lambda: 0.0,
        x: gn.x,
        scaled_norm: dxnorm,
    };

    for iter in 1..=MAX_ITERATIONS {
        if par == 0.0 {
            par = dwarf.max(0.001 * paru);
        }

        let damping = d * par.sqrt();
        let sol = qr.solve_damped(&damping, &qtr);
        let dxnorm = scaled_norm(d, &sol.x);
        fp = dxnorm - delta;

        best = DampingStep {
            lambda: par,
            x: sol.x,
            scaled_norm: dxnorm,
        };

        if fp.abs() <= RADIUS_SLACK * delta || iter == MAX_ITERATIONS || dxnorm == 0.0 {
            break;
        }

        // Newton correction: solve Sᵀ w = P D x / ‖D x‖
        let mut wa = OVector::<f64, N>::zeros_generic(ncols, Const::<1>);
        for jj in 0..n {
            let l = perm[jj];
            wa[jj] = d[l] * (d[l] * best.x[l] / dxnorm);
        }
        for jj in 0..n {
            let sjj = sol.s_diag[jj];
            if sjj == 0.0 {
                wa[jj] = 0.0;
                continue;
            }
            wa[jj] /= sjj;
            let w = wa[jj];
            for i in jj + 1..n {
                wa[i] -= sol.s[(jj, i)] * w;
            }
        }
        let temp = wa.norm();
        let parc = ((fp / delta) / temp) / temp;

        if fp > 0.0 {
            parl = parl.max(par);
        }
        if fp < 0.0 {
            paru = paru.min(par);
        }
        par = parl.max(par + parc);
        if !par.is_finite() {
            break;
        }
    }

    best
}

/// `x(λ)` for a damping small enough to act only on the null space of `R`.
fn damped_limit<M, N>(
    qr: &PivotedQr<M, N>,
    d: &OVector<f64, N>,
    qtr: &OVector<f64, N>,
) -> DampingStep<N>
where
    M: Dim,
    N: Dim,
    DefaultAllocator: Allocator<M, N> + Allocator<M> + Allocator<N> + Allocator<N, N>,
{
    let dmax = d.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let scale = if dmax > 0.0 {
        f64::EPSILON.sqrt() * qr.r_at(0, 0).abs() / dmax
    } else {
        0.0
    };
    let sol = qr.solve_damped(&(d * scale), qtr);
    let dxnorm = scaled_norm(d, &sol.x);
    DampingStep {
        lambda: 0.0,
        x: sol.x,
        scaled_norm: dxnorm,
    }
}
