pub(crate) mod common;
pub mod lm;

pub use common::trace::SolverTraceRecord;
