//! Functionality for assembling global matrices and vectors from forms.
mod global;
mod sparsity;

pub use global::*;
pub use sparsity::*;
