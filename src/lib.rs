//! Finite element assembly and solution of a 2D Poisson problem with P1 Lagrange elements.
//!
//! The same bilinear and linear forms are assembled through two linear algebra backends: a
//! CSR matrix addressed by local indices, and a CRS matrix addressed by global indices. The
//! latter is used to cross-validate the former.
pub mod assembly;
pub mod bc;
pub mod config;
pub mod connectivity;
pub mod element;
pub mod error;
pub mod form;
pub mod function;
pub mod graph;
pub mod index_map;
pub mod io;
pub mod la;
pub mod mesh;
pub mod problem;
pub mod quadrature;
pub mod space;
pub mod timer;

pub extern crate fem_miniapp_sparse;
pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
pub extern crate vtkio;
