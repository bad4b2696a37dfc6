//! Linear Lagrange elements on triangles and line segments.
use itertools::Itertools;
use nalgebra::{distance, Matrix1x2, Matrix1x3, Matrix2, Matrix2x3, Point1, Point2, Vector2};

/// A finite element representing linear basis functions on a triangle, in two dimensions.
///
/// The reference element is chosen to be the triangle defined by the corners
/// (-1, -1), (1, -1), (-1, 1), which matches the reference domain of the triangle
/// quadrature rules in [`crate::quadrature`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tri3d2Element {
    vertices: [Point2<f64>; 3],
}

impl Tri3d2Element {
    pub fn from_vertices(vertices: [Point2<f64>; 3]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<f64>; 3] {
        &self.vertices
    }

    pub fn reference() -> Self {
        Self::from_vertices([Point2::new(-1.0, -1.0), Point2::new(1.0, -1.0), Point2::new(-1.0, 1.0)])
    }

    #[rustfmt::skip]
    pub fn evaluate_basis(&self, xi: &Point2<f64>) -> Matrix1x3<f64> {
        Matrix1x3::from_row_slice(&[
            -0.5 * xi.x - 0.5 * xi.y,
            0.5 * xi.x + 0.5,
            0.5 * xi.y + 0.5
        ])
    }

    /// Reference gradients of the basis functions, one column per node.
    pub fn gradients(&self, _xi: &Point2<f64>) -> Matrix2x3<f64> {
        Matrix2x3::from_columns(&[Vector2::new(-0.5, -0.5), Vector2::new(0.5, 0.0), Vector2::new(0.0, 0.5)])
    }

    #[allow(non_snake_case)]
    pub fn reference_jacobian(&self, xi: &Point2<f64>) -> Matrix2<f64> {
        let X: Matrix2x3<f64> = Matrix2x3::from_fn(|i, j| self.vertices[j][i]);
        let G = self.gradients(xi);
        X * G.transpose()
    }

    #[allow(non_snake_case)]
    pub fn map_reference_coords(&self, xi: &Point2<f64>) -> Point2<f64> {
        let X: Matrix2x3<f64> = Matrix2x3::from_fn(|i, j| self.vertices[j][i]);
        let N = self.evaluate_basis(xi);
        Point2::from(X * N.transpose())
    }

    /// Gradients of the basis functions with respect to physical coordinates.
    ///
    /// Since the element is affine, the gradients are constant over the element.
    /// Returns `None` if the triangle is degenerate.
    pub fn physical_gradients(&self) -> Option<Matrix2x3<f64>> {
        let xi = Point2::origin();
        let j_inv_t = self.reference_jacobian(&xi).try_inverse()?.transpose();
        Some(j_inv_t * self.gradients(&xi))
    }

    pub fn diameter(&self) -> f64 {
        self.vertices
            .iter()
            .tuple_combinations()
            .map(|(x, y)| distance(x, y))
            .fold(0.0, f64::max)
    }
}

/// A linear segment element embedded in two dimensions, with reference domain [-1, 1].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Segment2d2Element {
    vertices: [Point2<f64>; 2],
}

impl Segment2d2Element {
    pub fn from_vertices(vertices: [Point2<f64>; 2]) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[Point2<f64>; 2] {
        &self.vertices
    }

    pub fn evaluate_basis(&self, xi: &Point1<f64>) -> Matrix1x2<f64> {
        let xi = xi[0];
        Matrix1x2::new((1.0 - xi) / 2.0, (1.0 + xi) / 2.0)
    }

    pub fn map_reference_coords(&self, xi: &Point1<f64>) -> Point2<f64> {
        let a = &self.vertices[0].coords;
        let b = &self.vertices[1].coords;
        let phi = self.evaluate_basis(xi);
        Point2::from(a * phi[0] + b * phi[1])
    }

    /// The norm of the reference Jacobian, i.e. the ratio between physical and reference length.
    pub fn jacobian_norm(&self) -> f64 {
        (self.vertices[1] - self.vertices[0]).norm() / 2.0
    }

    pub fn diameter(&self) -> f64 {
        (self.vertices[1] - self.vertices[0]).norm()
    }
}
