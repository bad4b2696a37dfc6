//! Linear operators, preconditioners and the conjugate gradient method used to solve the
//! assembled miniapp systems.
pub mod cg;

pub use nalgebra_sparse::CsrMatrix;
