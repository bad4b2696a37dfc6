//! Quadrature rules on the reference triangle and the reference interval.
//!
//! The reference triangle is the one with corners (-1, -1), (1, -1), (-1, 1), so the weights of
//! every triangle rule sum to its area, 2. The reference interval is [-1, 1].
use nalgebra::{Point1, Point2};
use thiserror::Error;

pub type QuadraturePair1d = (Vec<f64>, Vec<Point1<f64>>);
pub type QuadraturePair2d = (Vec<f64>, Vec<Point2<f64>>);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuadratureError {
    #[error("no triangle quadrature rule of strength {0} is available")]
    UnsupportedTriangleStrength(usize),
    #[error("no Gauss-Legendre rule with {0} points is available")]
    UnsupportedGaussPoints(usize),
}

/// Builds a triangle rule from barycentric points and weights normalized to sum to one.
fn from_barycentric(barycentric: &[([f64; 3], f64)]) -> QuadraturePair2d {
    barycentric
        .iter()
        .map(|&([_, l1, l2], w)| (2.0 * w, Point2::new(2.0 * l1 - 1.0, 2.0 * l2 - 1.0)))
        .unzip()
}

/// Expands `(a, b, b)` into its three distinct permutations.
fn permutations_abb(a: f64, b: f64, w: f64) -> [([f64; 3], f64); 3] {
    [([a, b, b], w), ([b, a, b], w), ([b, b, a], w)]
}

/// One-point centroid rule, exact for polynomials of degree 1.
pub fn tri_quadrature_strength_1() -> QuadraturePair2d {
    from_barycentric(&[([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], 1.0)])
}

/// Three-point interior rule, exact for polynomials of degree 2.
pub fn tri_quadrature_strength_2() -> QuadraturePair2d {
    from_barycentric(&permutations_abb(2.0 / 3.0, 1.0 / 6.0, 1.0 / 3.0))
}

/// The seven-point Dunavant rule, exact for polynomials of degree 5.
pub fn tri_quadrature_strength_5() -> QuadraturePair2d {
    let mut barycentric = vec![([1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0], 0.225)];
    barycentric.extend(permutations_abb(0.059715871789770, 0.470142064105115, 0.132394152788506));
    barycentric.extend(permutations_abb(0.797426985353087, 0.101286507323456, 0.125939180544827));
    from_barycentric(&barycentric)
}

/// Returns the cheapest available triangle rule that integrates polynomials of the given
/// total degree exactly.
pub fn triangle(strength: usize) -> Result<QuadraturePair2d, QuadratureError> {
    match strength {
        0 | 1 => Ok(tri_quadrature_strength_1()),
        2 => Ok(tri_quadrature_strength_2()),
        3..=5 => Ok(tri_quadrature_strength_5()),
        _ => Err(QuadratureError::UnsupportedTriangleStrength(strength)),
    }
}

/// Two-point Gauss-Legendre rule, exact for polynomials of degree 3.
pub fn segment_quadrature_strength_3() -> QuadraturePair1d {
    let p = 1.0 / 3.0f64.sqrt();
    (vec![1.0, 1.0], vec![Point1::new(-p), Point1::new(p)])
}

/// Gauss-Legendre quadrature on [-1, 1] with the given number of points.
pub fn gauss(num_points: usize) -> Result<QuadraturePair1d, QuadratureError> {
    let (weights, points): (Vec<f64>, Vec<f64>) = match num_points {
        1 => (vec![2.0], vec![0.0]),
        2 => return Ok(segment_quadrature_strength_3()),
        3 => {
            let p = (3.0f64 / 5.0).sqrt();
            (vec![5.0 / 9.0, 8.0 / 9.0, 5.0 / 9.0], vec![-p, 0.0, p])
        }
        4 => {
            let (p_inner, w_inner) = (0.3399810435848563, 0.6521451548625461);
            let (p_outer, w_outer) = (0.8611363115940526, 0.3478548451374538);
            (
                vec![w_outer, w_inner, w_inner, w_outer],
                vec![-p_outer, -p_inner, p_inner, p_outer],
            )
        }
        _ => return Err(QuadratureError::UnsupportedGaussPoints(num_points)),
    };
    Ok((weights, points.into_iter().map(Point1::new).collect()))
}

/// Approximates the integral of `f` over the reference triangle.
pub fn integrate_2d(quadrature: &QuadraturePair2d, f: impl Fn(&Point2<f64>) -> f64) -> f64 {
    let (weights, points) = quadrature;
    weights.iter().zip(points).map(|(w, p)| w * f(p)).sum()
}

/// Approximates the integral of `f` over the reference interval.
pub fn integrate_1d(quadrature: &QuadraturePair1d, f: impl Fn(&Point1<f64>) -> f64) -> f64 {
    let (weights, points) = quadrature;
    weights.iter().zip(points).map(|(w, p)| w * f(p)).sum()
}
