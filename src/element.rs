//! Element-type descriptors.
//!
//! An [`ElementType`] bundles everything the assembly needs to know about an element family:
//! its arity, degrees of freedom per node, quadrature rule, the polynomial basis of its shape
//! functions and the reference-to-physical map used for integration.
//!
//! Reference domains follow the usual conventions: `[-1, 1]^d` for segments, quadrilaterals
//! and hexahedra, and the simplices spanned by `-1`/`1` vertices for triangles and tetrahedra.
//! The reference map only uses the corner vertices, so quadratic elements are straight-sided.
use crate::dense::{determinant, gauss_solve};
use crate::error::FemError;
use crate::quadrature;
use crate::quadrature::Rule;
use crate::shape::{Exponents, Frame, Shape};
use nalgebra::{DMatrix, DVector};
use std::fmt;
use std::fmt::{Display, Formatter};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ElementType {
    Segment2,
    Tri3,
    Quad4,
    Tri6,
    Tet4,
    Hex8,
    Tet10,
}

/// Mesh type codes of plate and shell elements, which are recognised but not supported.
const PLATE_SHELL_CODES: [u32; 6] = [123, 124, 125, 223, 224, 225];

impl ElementType {
    pub const ALL: [ElementType; 7] = [
        ElementType::Segment2,
        ElementType::Tri3,
        ElementType::Quad4,
        ElementType::Tri6,
        ElementType::Tet4,
        ElementType::Hex8,
        ElementType::Tet10,
    ];

    /// Looks up the element type of a mesh type code.
    pub fn from_code(code: u32) -> Result<Self, FemError> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.code() == code)
            .ok_or_else(|| {
                if PLATE_SHELL_CODES.contains(&code) {
                    FemError::IncorrectFE
                } else {
                    FemError::MeshFormat
                }
            })
    }

    pub fn code(&self) -> u32 {
        use ElementType::*;
        match self {
            Segment2 => 34,
            Tri3 => 3,
            Quad4 => 24,
            Tri6 => 6,
            Tet4 => 4,
            Hex8 => 8,
            Tet10 => 10,
        }
    }

    /// Number of nodes.
    pub fn size(&self) -> usize {
        use ElementType::*;
        match self {
            Segment2 => 2,
            Tri3 => 3,
            Quad4 => 4,
            Tri6 => 6,
            Tet4 => 4,
            Hex8 => 8,
            Tet10 => 10,
        }
    }

    /// Degrees of freedom per node.
    pub fn freedom(&self) -> usize {
        self.dim()
    }

    /// Spatial dimension, which is also the number of coordinates per node.
    pub fn dim(&self) -> usize {
        use ElementType::*;
        match self {
            Segment2 => 1,
            Tri3 | Quad4 | Tri6 => 2,
            Tet4 | Hex8 | Tet10 => 3,
        }
    }

    /// Number of nodes per boundary face in the mesh format.
    pub fn face_arity(&self) -> usize {
        use ElementType::*;
        match self {
            Segment2 => 1,
            Tri3 | Quad4 => 2,
            Tri6 | Tet4 => 3,
            Hex8 => 4,
            Tet10 => 6,
        }
    }

    /// Whether the mesh format requires at least one boundary face for this type.
    pub fn requires_boundary(&self) -> bool {
        use ElementType::*;
        matches!(self, Tri3 | Quad4 | Tet4 | Hex8)
    }

    /// Number of corner vertices, i.e. the nodes spanning the reference map.
    pub fn corner_count(&self) -> usize {
        use ElementType::*;
        match self {
            Segment2 => 2,
            Tri3 | Tri6 => 3,
            Quad4 | Tet4 | Tet10 => 4,
            Hex8 => 8,
        }
    }

    pub fn quadrature(&self) -> Rule {
        use ElementType::*;
        match self {
            Segment2 => quadrature::segment_gauss(3),
            Tri3 | Tri6 => quadrature::triangle_midpoints(),
            Quad4 => quadrature::quadrilateral_gauss(2),
            Tet4 | Tet10 => quadrature::tetrahedron_degree2(),
            Hex8 => quadrature::hexahedron_gauss(2),
        }
    }

    /// Number of quadrature points.
    pub fn quadrature_degree(&self) -> usize {
        self.quadrature().0.len()
    }

    /// Monomials spanning the shape functions, one per node.
    pub fn basis_terms(&self) -> &'static [Exponents] {
        use ElementType::*;
        match self {
            Segment2 => &[[0, 0, 0], [1, 0, 0]],
            Tri3 => &[[0, 0, 0], [1, 0, 0], [0, 1, 0]],
            Quad4 => &[[0, 0, 0], [1, 0, 0], [0, 1, 0], [1, 1, 0]],
            Tri6 => &[[0, 0, 0], [1, 0, 0], [0, 1, 0], [2, 0, 0], [1, 1, 0], [0, 2, 0]],
            Tet4 => &[[0, 0, 0], [1, 0, 0], [0, 1, 0], [0, 0, 1]],
            Hex8 => &[
                [0, 0, 0],
                [1, 0, 0],
                [0, 1, 0],
                [0, 0, 1],
                [1, 1, 0],
                [0, 1, 1],
                [1, 0, 1],
                [1, 1, 1],
            ],
            Tet10 => &[
                [0, 0, 0],
                [1, 0, 0],
                [0, 1, 0],
                [0, 0, 1],
                [2, 0, 0],
                [0, 2, 0],
                [0, 0, 2],
                [1, 1, 0],
                [0, 1, 1],
                [1, 0, 1],
            ],
        }
    }

    /// Basis term `j` evaluated at node `i` of the element with the given coordinates.
    ///
    /// `coords` holds one row of coordinates per node.
    pub fn coeff(&self, coords: &DMatrix<f64>, i: usize, j: usize) -> f64 {
        let e = self.basis_terms()[j];
        (0..self.dim())
            .map(|axis| coords[(i, axis)].powi(e[axis] as i32))
            .product()
    }

    /// Solves for the interpolation coefficients and returns one shape function per node.
    ///
    /// Fails with [`FemError::InvalidFE`] for degenerate element geometry.
    pub fn shape_functions(&self, coords: &DMatrix<f64>, pivot_tolerance: f64) -> Result<Vec<Shape>, FemError> {
        let n = self.size();
        if coords.nrows() != n || coords.ncols() != self.dim() {
            return Err(FemError::InternalError);
        }
        let terms = self.basis_terms();
        let frame = local_frame(coords).ok_or(FemError::InvalidFE)?;
        let local = DMatrix::from_fn(n, self.dim(), |i, axis| (coords[(i, axis)] - frame.origin[axis]) / frame.scale);
        let m = DMatrix::from_fn(n, n, |j, k| self.coeff(&local, j, k));

        (0..n)
            .map(|i| {
                let e_i = DVector::from_fn(n, |j, _| if i == j { 1.0 } else { 0.0 });
                let c = gauss_solve(&m, &e_i, pivot_tolerance).ok_or(FemError::InvalidFE)?;
                Ok(Shape::from_local_terms(c.iter().copied().zip(terms.iter().copied()), frame))
            })
            .collect()
    }

    /// Linear reference basis of the corner vertices and its gradient at a reference point.
    ///
    /// Returns the values and a `corners x dim` matrix of reference gradients.
    fn corner_basis(&self, xi: &[f64; 3]) -> (Vec<f64>, DMatrix<f64>) {
        use ElementType::*;
        let [x, y, z] = *xi;
        match self {
            Segment2 => (
                vec![0.5 * (1.0 - x), 0.5 * (1.0 + x)],
                DMatrix::from_row_slice(2, 1, &[-0.5, 0.5]),
            ),
            #[rustfmt::skip]
            Tri3 | Tri6 => (
                vec![-0.5 * (x + y), 0.5 * (1.0 + x), 0.5 * (1.0 + y)],
                DMatrix::from_row_slice(3, 2, &[
                    -0.5, -0.5,
                     0.5,  0.0,
                     0.0,  0.5,
                ]),
            ),
            #[rustfmt::skip]
            Tet4 | Tet10 => (
                vec![-0.5 * (1.0 + x + y + z), 0.5 * (1.0 + x), 0.5 * (1.0 + y), 0.5 * (1.0 + z)],
                DMatrix::from_row_slice(4, 3, &[
                    -0.5, -0.5, -0.5,
                     0.5,  0.0,  0.0,
                     0.0,  0.5,  0.0,
                     0.0,  0.0,  0.5,
                ]),
            ),
            Quad4 => {
                let signs = [[-1.0, -1.0], [1.0, -1.0], [1.0, 1.0], [-1.0, 1.0]];
                let values = signs
                    .iter()
                    .map(|[a, b]| 0.25 * (1.0 + a * x) * (1.0 + b * y))
                    .collect();
                let gradients = DMatrix::from_fn(4, 2, |k, c| {
                    let [a, b] = signs[k];
                    match c {
                        0 => 0.25 * a * (1.0 + b * y),
                        _ => 0.25 * b * (1.0 + a * x),
                    }
                });
                (values, gradients)
            }
            Hex8 => {
                let signs = [
                    [-1.0, -1.0, -1.0],
                    [1.0, -1.0, -1.0],
                    [1.0, 1.0, -1.0],
                    [-1.0, 1.0, -1.0],
                    [-1.0, -1.0, 1.0],
                    [1.0, -1.0, 1.0],
                    [1.0, 1.0, 1.0],
                    [-1.0, 1.0, 1.0],
                ];
                let values = signs
                    .iter()
                    .map(|[a, b, c]| 0.125 * (1.0 + a * x) * (1.0 + b * y) * (1.0 + c * z))
                    .collect();
                let gradients = DMatrix::from_fn(8, 3, |k, axis| {
                    let [a, b, c] = signs[k];
                    match axis {
                        0 => 0.125 * a * (1.0 + b * y) * (1.0 + c * z),
                        1 => 0.125 * b * (1.0 + a * x) * (1.0 + c * z),
                        _ => 0.125 * c * (1.0 + a * x) * (1.0 + b * y),
                    }
                });
                (values, gradients)
            }
        }
    }

    /// Jacobian `J[r][c] = ∂x_r/∂ξ_c` of the reference map at quadrature point `i`.
    pub fn jacobi(&self, i: usize, coords: &DMatrix<f64>) -> DMatrix<f64> {
        let (_, points) = self.quadrature();
        self.jacobian_at(&points[i], coords)
    }

    /// Jacobian of the reference map at an arbitrary reference point.
    pub fn jacobian_at(&self, xi: &[f64; 3], coords: &DMatrix<f64>) -> DMatrix<f64> {
        let corners = self.corner_count();
        let (_, gradients) = self.corner_basis(xi);
        let corner_coords = coords.rows(0, corners);
        corner_coords.transpose() * gradients
    }

    /// Physical coordinates of quadrature point `i`.
    pub fn map_reference(&self, i: usize, coords: &DMatrix<f64>) -> [f64; 3] {
        let (_, points) = self.quadrature();
        self.map_point(&points[i], coords)
    }

    /// Physical coordinates of an arbitrary reference point.
    pub fn map_point(&self, xi: &[f64; 3], coords: &DMatrix<f64>) -> [f64; 3] {
        let (values, _) = self.corner_basis(xi);
        let mut x = [0.0; 3];
        for (k, n_k) in values.iter().enumerate() {
            for axis in 0..self.dim() {
                x[axis] += n_k * coords[(k, axis)];
            }
        }
        x
    }

    /// Measure (length, area or volume) of the element with the given coordinates.
    pub fn measure(&self, coords: &DMatrix<f64>) -> Result<f64, FemError> {
        let (weights, points) = self.quadrature();
        let mut measure = 0.0;
        for (w, xi) in weights.iter().zip(&points) {
            measure += w * determinant(&self.jacobian_at(xi, coords))?.abs();
        }
        Ok(measure)
    }
}

/// Frame centred at the node centroid and scaled by the largest node distance from it.
///
/// Returns `None` if all nodes coincide.
fn local_frame(coords: &DMatrix<f64>) -> Option<Frame> {
    let n = coords.nrows() as f64;
    let mut origin = [0.0; 3];
    for (axis, x) in origin.iter_mut().enumerate().take(coords.ncols()) {
        *x = coords.column(axis).sum() / n;
    }
    let scale = coords
        .row_iter()
        .map(|row| {
            row.iter()
                .zip(&origin)
                .map(|(x, o)| (x - o).powi(2))
                .sum::<f64>()
                .sqrt()
        })
        .fold(0.0, f64::max);
    (scale > 0.0 && scale.is_finite()).then(|| Frame::new(origin, scale))
}

impl Display for ElementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        use ElementType::*;
        let name = match self {
            Segment2 => "Segment2",
            Tri3 => "Tri3",
            Quad4 => "Quad4",
            Tri6 => "Tri6",
            Tet4 => "Tet4",
            Hex8 => "Hex8",
            Tet10 => "Tet10",
        };
        write!(f, "{}", name)
    }
}
