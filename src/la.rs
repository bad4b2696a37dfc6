//! Linear algebra backends for assembled systems.
//!
//! [`csr`] stores owned rows of a matrix in compressed sparse row format with global column
//! indices and is filled through local-index insertion callbacks. [`crs`] follows the
//! distributed row-map model, where every insertion addresses rows and columns by global index.
pub mod crs;
pub mod csr;
