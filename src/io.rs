pub mod msh;
pub mod vtk;
