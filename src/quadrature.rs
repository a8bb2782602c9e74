//! Quadrature rules for the reference domains of the supported elements.
//!
//! All points are stored with three coordinates; coordinates beyond the reference dimension
//! are zero. Weights sum to the measure of the reference domain.

/// A quadrature rule given as a pair of weights and reference points.
pub type Rule = (Vec<f64>, Vec<[f64; 3]>);

/// Gauss-Legendre rule for `[-1, 1]` with 2 or 3 points.
///
/// # Panics
///
/// Panics for any other number of points.
pub fn gauss(num_points: usize) -> (Vec<f64>, Vec<f64>) {
    match num_points {
        2 => {
            let a = 1.0 / 3.0f64.sqrt();
            (vec![1.0, 1.0], vec![-a, a])
        }
        3 => {
            let a = 0.6f64.sqrt();
            (vec![5.0 / 9.0, 8.0 / 9.0, 5.0 / 9.0], vec![-a, 0.0, a])
        }
        _ => panic!("Gauss rule with {} points is not available", num_points),
    }
}

/// Gauss-Legendre rule for the reference segment `[-1, 1]`.
pub fn segment_gauss(num_points: usize) -> Rule {
    let (weights, points) = gauss(num_points);
    (weights, points.into_iter().map(|x| [x, 0.0, 0.0]).collect())
}

/// Tensor-product Gauss rule for the reference quadrilateral `[-1, 1]^2`.
pub fn quadrilateral_gauss(num_points_per_dim: usize) -> Rule {
    let (weights1d, points1d) = gauss(num_points_per_dim);
    let rule1d_iter = || weights1d.iter().zip(&points1d);

    let mut weights = Vec::new();
    let mut points = Vec::new();
    for (&wx, &x) in rule1d_iter() {
        for (&wy, &y) in rule1d_iter() {
            weights.push(wx * wy);
            points.push([x, y, 0.0]);
        }
    }
    (weights, points)
}

/// Tensor-product Gauss rule for the reference hexahedron `[-1, 1]^3`.
pub fn hexahedron_gauss(num_points_per_dim: usize) -> Rule {
    let (weights1d, points1d) = gauss(num_points_per_dim);
    let rule1d_iter = || weights1d.iter().zip(&points1d);

    let mut weights = Vec::new();
    let mut points = Vec::new();
    for (&wx, &x) in rule1d_iter() {
        for (&wy, &y) in rule1d_iter() {
            for (&wz, &z) in rule1d_iter() {
                weights.push(wx * wy * wz);
                points.push([x, y, z]);
            }
        }
    }
    (weights, points)
}

/// Edge-midpoint rule for the reference triangle with vertices `(-1, -1)`, `(1, -1)`, `(-1, 1)`.
///
/// Exact for polynomials of degree 2.
pub fn triangle_midpoints() -> Rule {
    let w = 2.0 / 3.0;
    (
        vec![w, w, w],
        vec![[0.0, -1.0, 0.0], [0.0, 0.0, 0.0], [-1.0, 0.0, 0.0]],
    )
}

/// Symmetric 4-point rule for the reference tetrahedron with vertices `(-1, -1, -1)`,
/// `(1, -1, -1)`, `(-1, 1, -1)` and `(-1, -1, 1)`.
///
/// Exact for polynomials of degree 2.
pub fn tetrahedron_degree2() -> Rule {
    let a = 0.585_410_196_624_968_5;
    let b = 0.138_196_601_125_010_5;
    let to_reference = |l1: f64, l2: f64, l3: f64| [-1.0 + 2.0 * l1, -1.0 + 2.0 * l2, -1.0 + 2.0 * l3];
    let w = 1.0 / 3.0;
    (
        vec![w, w, w, w],
        vec![
            to_reference(b, b, b),
            to_reference(a, b, b),
            to_reference(b, a, b),
            to_reference(b, b, a),
        ],
    )
}
