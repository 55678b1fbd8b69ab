use thiserror::Error;

/// Contract violations detected while minimizing.
///
/// Only dimension bookkeeping is reported here. Numerical trouble (rank
/// deficiency, non-finite trial residuals, stagnation) never surfaces as an
/// error; it is absorbed by the trust region and shows up in the returned
/// [`Status`](crate::solvers::lm::Status).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum MinimizeError {
    /// The Jacobian column count does not match the variables' degrees of freedom.
    #[error("jacobian has {got} columns, but the variables have {expected} degrees of freedom")]
    JacobianColumns { expected: usize, got: usize },
    /// The Jacobian row count does not match the residual length.
    #[error("jacobian has {jacobian} rows, but the residual has length {residual}")]
    JacobianRows { residual: usize, jacobian: usize },
    /// The residual length changed between two evaluations of one problem.
    #[error("residual length changed from {expected} to {got} during minimization")]
    RaggedResidual { expected: usize, got: usize },
    /// A tangent vector does not match the variables' degrees of freedom.
    #[error("tangent vector has length {got}, expected {expected}")]
    TangentLength { expected: usize, got: usize },
}
