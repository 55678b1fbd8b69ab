pub mod diff;
pub mod linalg;
pub mod qr;

pub use qr::{solve_ls, DampedSolution, PivotedQr};
