//! Integration of the functional on a single element.
use crate::element::ElementType;
use crate::error::FemError;
use crate::mesh::Mesh;
use crate::program::ast::Expr;
use crate::shape::Shape;
use crate::value::{EvalContext, Value};
use log::trace;
use nalgebra::DMatrix;

/// Source of element blocks for global assembly.
pub trait ElementBlockAssembler {
    /// Degrees of freedom per node.
    fn solution_dim(&self) -> usize;

    fn num_elements(&self) -> usize;

    fn num_nodes(&self) -> usize;

    /// Global node indices of an element.
    fn element_nodes(&self, element_index: usize) -> &[usize];

    /// Computes the element block: the element matrix with the element load vector appended
    /// as last column.
    fn assemble_element_block(&self, element_index: usize) -> Result<DMatrix<f64>, FemError>;
}

/// Binds RESULT number `k` to the symbolic vector of length `n * freedom` whose entry
/// `node * freedom + k` is the shape function of `node`, all other entries being zero.
///
/// Fails with [`FemError::IncorrectFE`] if there are more RESULT symbols than degrees of
/// freedom per node.
pub fn result_bindings(shapes: &[Shape], freedom: usize, result_count: usize) -> Result<Vec<Value>, FemError> {
    if result_count > freedom {
        return Err(FemError::IncorrectFE);
    }
    let n = shapes.len() * freedom;
    Ok((0..result_count)
        .map(|k| {
            Value::Symbolic(
                (0..n)
                    .map(|j| {
                        if j % freedom == k {
                            shapes[j / freedom].clone()
                        } else {
                            Shape::zero()
                        }
                    })
                    .collect(),
            )
        })
        .collect())
}

/// Evaluates `expr` on one element with the RESULT symbols bound to the element's shape
/// functions.
pub fn evaluate_on_element(
    expr: &Expr,
    element_type: ElementType,
    coords: &DMatrix<f64>,
    result_count: usize,
    pivot_tolerance: f64,
    point: [f64; 3],
) -> Result<Value, FemError> {
    let shapes = element_type.shape_functions(coords, pivot_tolerance)?;
    let results = result_bindings(&shapes, element_type.freedom(), result_count)?;
    let ctx = EvalContext::new()
        .with_results(&results)
        .with_element(element_type, coords)
        .with_point(point);
    expr.evaluate(&ctx)
}

/// Assembles element blocks by evaluating a compiled functional.
#[derive(Debug, Clone)]
pub struct FunctionalAssembler<'a> {
    mesh: &'a Mesh,
    functional: &'a Expr,
    result_count: usize,
    pivot_tolerance: f64,
}

impl<'a> FunctionalAssembler<'a> {
    pub fn new(mesh: &'a Mesh, functional: &'a Expr, result_count: usize, pivot_tolerance: f64) -> Self {
        Self {
            mesh,
            functional,
            result_count,
            pivot_tolerance,
        }
    }
}

impl<'a> ElementBlockAssembler for FunctionalAssembler<'a> {
    fn solution_dim(&self) -> usize {
        self.mesh.freedom_per_node()
    }

    fn num_elements(&self) -> usize {
        self.mesh.element_count()
    }

    fn num_nodes(&self) -> usize {
        self.mesh.node_count()
    }

    fn element_nodes(&self, element_index: usize) -> &[usize] {
        &self.mesh.connectivity()[element_index]
    }

    fn assemble_element_block(&self, element_index: usize) -> Result<DMatrix<f64>, FemError> {
        let element_type = self.mesh.element_type();
        let coords = self.mesh.node_coordinates_of_element(element_index);
        let block = evaluate_on_element(
            self.functional,
            element_type,
            &coords,
            self.result_count,
            self.pivot_tolerance,
            [0.0; 3],
        )?;

        let ndof = element_type.size() * element_type.freedom();
        let block = match block {
            Value::Matrix(m) => m,
            _ => return Err(FemError::AsMatrix),
        };
        if block.shape() != (ndof, ndof + 1) {
            return Err(FemError::InternalError);
        }
        trace!("Assembled block of element {}", element_index);
        Ok(block)
    }
}
