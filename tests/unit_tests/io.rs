mod vtk;
