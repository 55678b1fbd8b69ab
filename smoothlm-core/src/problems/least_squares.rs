use nalgebra::{DMatrix, DVector};

use crate::manifolds::space::Manifold;

/// Problem definition for nonlinear least squares over manifold-valued
/// variables `P`.
///
/// All derivatives are with respect to the tangent vector consumed by
/// `Manifold::retract`, with columns in `tangent_layout` order.
pub trait LeastSquaresProblem<P: Manifold> {
    /// Residual dimension m.
    fn residual_dim(&self) -> usize;

    /// Residual r(x), len = m.
    fn residual(&self, x: &P) -> DVector<f64>;

    /// Jacobian dr/dx, shape m x dof(x).
    fn jacobian(&self, x: &P) -> DMatrix<f64>;
}
