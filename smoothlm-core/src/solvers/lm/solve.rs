use std::time::Instant;

use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, Dyn, OMatrix, OVector};

use crate::error::MinimizeError;
use crate::manifolds::{Manifold, VariablePack};
use crate::numerics::diff::central_jacobian;
use crate::numerics::linalg::{product_norm, scaled_tangent_norm};
use crate::numerics::qr::PivotedQr;
use crate::problems::least_squares::LeastSquaresProblem;
use crate::solvers::common::trace::{SolverTracer, TraceRow};

use super::lmpar::lmpar_with_qr;
use super::types::{LevenbergMarquardt, LevenbergMarquardtResult, Status};
use super::workspace::LmWorkspace;

/// A trial residual blown up by this factor is treated as a failed step.
const BLOWUP_FACTOR: f64 = 10.0;

fn check_linearization<P, M, N>(
    pack: &VariablePack<'_, P>,
    r: &OVector<f64, M>,
    jac: &OMatrix<f64, M, N>,
    rows: Option<usize>,
) -> Result<(), MinimizeError>
where
    P: Manifold,
    M: Dim,
    N: Dim,
    DefaultAllocator: Allocator<M, N> + Allocator<M>,
{
    if let Some(expected) = rows {
        if r.len() != expected {
            return Err(MinimizeError::RaggedResidual {
                expected,
                got: r.len(),
            });
        }
    }
    if jac.nrows() != r.len() {
        return Err(MinimizeError::JacobianRows {
            residual: r.len(),
            jacobian: jac.nrows(),
        });
    }
    pack.check_jacobian(jac.ncols())
}

fn step_segment_norms(parts: &[&[f64]]) -> Vec<f64> {
    parts
        .iter()
        .map(|s| s.iter().map(|v| v * v).sum::<f64>().sqrt())
        .collect()
}

impl LevenbergMarquardt {
    /// Minimize `0.5 ‖r(x)‖²` over the manifold-valued `vars`.
    ///
    /// `f` returns the residual and its Jacobian with respect to the tangent
    /// space of `vars`, with columns in tangent-layout order. The variables
    /// are updated in place only when a step is accepted.
    pub fn minimize<P, M, N, F>(
        &self,
        mut f: F,
        vars: &mut P,
    ) -> Result<LevenbergMarquardtResult, MinimizeError>
    where
        P: Manifold,
        M: Dim,
        N: Dim,
        F: FnMut(&P) -> (OVector<f64, M>, OMatrix<f64, M, N>),
        DefaultAllocator: Allocator<M, N> + Allocator<M> + Allocator<N> + Allocator<N, N>,
    {
        self.run(|x| Ok(f(x)), vars)
    }

    /// Solve using a problem object.
    pub fn solve<P, Q>(
        &self,
        problem: &Q,
        vars: &mut P,
    ) -> Result<LevenbergMarquardtResult, MinimizeError>
    where
        P: Manifold,
        Q: LeastSquaresProblem<P>,
    {
        let m = problem.residual_dim();
        self.run(
            |x| {
                let r = problem.residual(x);
                if r.len() != m {
                    return Err(MinimizeError::RaggedResidual {
                        expected: m,
                        got: r.len(),
                    });
                }
                Ok((r, problem.jacobian(x)))
            },
            vars,
        )
    }

    pub(crate) fn run<P, M, N, F>(
        &self,
        mut f: F,
        vars: &mut P,
    ) -> Result<LevenbergMarquardtResult, MinimizeError>
    where
        P: Manifold,
        M: Dim,
        N: Dim,
        F: FnMut(&P) -> Result<(OVector<f64, M>, OMatrix<f64, M, N>), MinimizeError>,
        DefaultAllocator: Allocator<M, N> + Allocator<M> + Allocator<N> + Allocator<N, N>,
    {
        let start = Instant::now();
        let policy = self.trust_region;
        let tracer = if self.collect_trace {
            SolverTracer::lm_with_history(self.verbose)
        } else {
            SolverTracer::lm(self.verbose)
        };

        let mut pack = VariablePack::new(vars);
        let origin = pack.values().clone();

        let (r, jac) = f(pack.values())?;
        check_linearization(&pack, &r, &jac, None)?;
        let m = r.len();
        let mut ws = LmWorkspace::new(r, jac);

        let mut evaluations = 1;
        let mut iterations = 0;
        let mut delta = self.initial_trust_region_radius;
        let mut par = 0.0;
        let mut pnorm = 0.0;

        tracer.emit(
            TraceRow::iter(0)
                .cost(ws.cost())
                .r_norm(ws.fnorm)
                .grad_norm(ws.gnorm)
                .radius(delta)
                .note("initial"),
        );

        let status = 'outer: loop {
            if ws.fnorm == 0.0 {
                // an exact fit reached by a step has a zero gradient
                break if iterations == 0 {
                    Status::ZeroResidual
                } else {
                    Status::GradientTolerance
                };
            }
            if ws.gnorm <= self.gradient_tolerance {
                break Status::GradientTolerance;
            }

            // one factorization per linearization, shared by all proposals
            let qr = PivotedQr::new(&ws.jac);

            loop {
                if iterations >= self.max_iterations {
                    break 'outer Status::IterationLimit;
                }
                if let Some(limit) = self.max_time {
                    if start.elapsed() >= limit {
                        break 'outer Status::TimeLimit;
                    }
                }

                let step = lmpar_with_qr(&qr, &ws.diag, &ws.r, delta, par);
                par = step.lambda;
                pnorm = step.scaled_norm;
                if iterations == 0 && pnorm > 0.0 {
                    delta = delta.min(pnorm);
                }
                iterations += 1;

                if log::log_enabled!(log::Level::Trace) {
                    let parts = pack.split(step.x.as_slice())?;
                    log::trace!(
                        "[lm] iter {:>6} | step per variable {:?}",
                        iterations,
                        step_segment_norms(&parts)
                    );
                }

                let proposal = pack.propose(step.x.as_slice())?;
                let (r1, jac1) = f(proposal.value())?;
                evaluations += 1;
                check_linearization(&pack, &r1, &jac1, Some(m))?;
                let fnorm1 = r1.norm();

                let blown_up = !fnorm1.is_finite() || fnorm1 >= BLOWUP_FACTOR * ws.fnorm;
                let actred = if blown_up {
                    -1.0
                } else {
                    1.0 - (fnorm1 / ws.fnorm).powi(2)
                };
                let t1 = product_norm(&ws.jac, &step.x) / ws.fnorm;
                let t2 = par.sqrt() * pnorm / ws.fnorm;
                let prered = t1 * t1 + 2.0 * t2 * t2;
                let dirder = -(t1 * t1 + t2 * t2);
                let ratio = if prered != 0.0 { actred / prered } else { 0.0 };

                if ratio <= policy.shrink_ratio {
                    let mut t = if actred >= 0.0 {
                        policy.shrink_factor
                    } else {
                        policy.shrink_factor * dirder / (dirder + 0.5 * actred)
                    };
                    if blown_up || !t.is_finite() || t < policy.min_shrink_factor {
                        t = policy.min_shrink_factor;
                    }
                    t = t.min(policy.shrink_factor);
                    delta = t * delta.min(10.0 * pnorm);
                    par /= t;
                } else if par == 0.0 || ratio >= policy.expand_ratio {
                    delta = policy.expand_factor * pnorm;
                    par *= 0.5;
                }
                delta = delta.max(f64::MIN_POSITIVE);

                let accepted = ratio >= policy.accept_ratio;
                // scaled tangent step and scaled displacement from the start
                let moved = if accepted {
                    let step_norm =
                        scaled_tangent_norm(&ws.diag, &pack.values().local(proposal.value()));
                    let from_origin =
                        scaled_tangent_norm(&ws.diag, &origin.local(proposal.value()));
                    pack.commit(proposal);
                    ws.relinearize(r1, jac1);
                    Some((step_norm, from_origin))
                } else {
                    None
                };

                tracer.emit(
                    TraceRow::iter(iterations)
                        .cost(ws.cost())
                        .r_norm(ws.fnorm)
                        .grad_norm(ws.gnorm)
                        .step_norm(pnorm)
                        .radius(delta)
                        .lambda(par)
                        .ratio(ratio)
                        .note(if accepted { "accepted" } else { "rejected" }),
                );

                if actred.abs() <= self.cost_tolerance
                    && prered <= self.cost_tolerance
                    && 0.5 * ratio <= 1.0
                {
                    break 'outer Status::CostTolerance;
                }
                if pnorm <= self.step_tolerance {
                    break 'outer Status::StepTolerance;
                }
                if let Some((step_norm, from_origin)) = moved {
                    let tol = self.parameter_tolerance;
                    if step_norm <= tol * (from_origin + tol) {
                        break 'outer Status::ParameterTolerance;
                    }
                    break;
                }
            }
        };

        log::debug!(
            "[lm] stopped: {:?} after {} iterations, {} evaluations, cost {:.6e}",
            status,
            iterations,
            evaluations,
            ws.cost()
        );

        Ok(LevenbergMarquardtResult {
            status,
            iterations,
            evaluations,
            cost: ws.cost(),
            r_norm: ws.fnorm,
            grad_norm: ws.gnorm,
            step_norm: pnorm,
            radius: delta,
            lambda: par,
            trace: tracer.into_history(),
        })
    }

    /// Like [`minimize`](Self::minimize) with a residual-only function; the
    /// Jacobian is formed by central differences through `retract`.
    pub fn minimize_numeric<P, M, F>(
        &self,
        mut f: F,
        vars: &mut P,
    ) -> Result<LevenbergMarquardtResult, MinimizeError>
    where
        P: Manifold,
        M: Dim,
        F: FnMut(&P) -> OVector<f64, M>,
        DefaultAllocator: Allocator<M, Dyn> + Allocator<M>,
    {
        self.run::<P, M, Dyn, _>(|x| central_jacobian(&mut f, x), vars)
    }
}
