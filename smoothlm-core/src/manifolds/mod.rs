pub mod euclidean;
pub mod pack;
pub mod product;
pub mod so3;
pub mod space;

pub use pack::{Proposal, VariablePack};
pub use so3::So3;
pub use space::Manifold;
