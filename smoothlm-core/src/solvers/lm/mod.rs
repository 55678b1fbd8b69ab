mod lmpar;
mod solve;
mod types;
mod workspace;

pub use lmpar::{lmpar, lmpar_with_qr, DampingStep};
pub use types::{LevenbergMarquardt, LevenbergMarquardtResult, Status, TrustRegionPolicy};
