//! smoothlm: Levenberg-Marquardt least squares on smooth manifolds
//!
//! - `Manifold`: the capability contract for optimization variables
//!   (`dof`, `retract`, `local`)
//! - concrete manifolds: `f64`, `OVector<f64, D>`, `So3`, tuples, `Vec<M>`
//! - `PivotedQr` / `lmpar`: the damped linear subproblem and Moré's damping search
//! - `LevenbergMarquardt`: the trust-region loop
//!
//! Residuals and Jacobians are `nalgebra` matrices, statically or dynamically
//! sized; both go through the same code.

pub mod error;
pub mod manifolds;
pub mod nls;
pub mod numerics;
pub mod problems;
pub mod solvers;

pub use error::MinimizeError;
pub use manifolds::{Manifold, So3, VariablePack};
pub use problems::LeastSquaresProblem;
pub use solvers::lm::{LevenbergMarquardt, LevenbergMarquardtResult, Status, TrustRegionPolicy};
pub use solvers::SolverTraceRecord;
