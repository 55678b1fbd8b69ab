//! Free-function entry points with the usual defaults.

use nalgebra::{allocator::Allocator, DefaultAllocator, Dim, Dyn, OMatrix, OVector};

use crate::error::MinimizeError;
use crate::manifolds::Manifold;
use crate::solvers::lm::{LevenbergMarquardt, LevenbergMarquardtResult};

/// Minimize `0.5 ‖r(x)‖²` with default solver options.
///
/// `f` returns the residual and its Jacobian in the tangent layout of `vars`.
pub fn minimize<P, M, N, F>(f: F, vars: &mut P) -> Result<LevenbergMarquardtResult, MinimizeError>
where
    P: Manifold,
    M: Dim,
    N: Dim,
    F: FnMut(&P) -> (OVector<f64, M>, OMatrix<f64, M, N>),
    DefaultAllocator: Allocator<M, N> + Allocator<M> + Allocator<N> + Allocator<N, N>,
{
    LevenbergMarquardt::default().minimize(f, vars)
}

/// Minimize a residual-only function; the Jacobian is formed by central
/// differences on the manifold.
pub fn minimize_numeric<P, M, F>(
    f: F,
    vars: &mut P,
    options: &LevenbergMarquardt,
) -> Result<LevenbergMarquardtResult, MinimizeError>
where
    P: Manifold,
    M: Dim,
    F: FnMut(&P) -> OVector<f64, M>,
    DefaultAllocator: Allocator<M, Dyn> + Allocator<M>,
{
    options.minimize_numeric(f, vars)
}
