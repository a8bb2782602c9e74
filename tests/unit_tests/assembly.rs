use crate::{bar_mesh, unit_square_tri3, BAR_PROGRAM};
use fems::assembly::boundary::{apply_conditions, evaluate_conditions, ActiveConditions};
use fems::assembly::global::{
    element_global_dofs, AssemblyProgress, GlobalSystem, ParSystemAssembler, SystemAssembler,
};
use fems::assembly::local::{result_bindings, ElementBlockAssembler, FunctionalAssembler};
use fems::element::ElementType;
use fems::error::FemError;
use fems::mesh::Mesh;
use fems::program::ast::Expr;
use fems::program::{BcKind, BoundaryCondition, Program};
use fems::shape::Shape;
use fems::value::Value;
use matrixcompare::assert_matrix_eq;
use nalgebra::{DMatrix, DVector};
use std::sync::Mutex;

const PLANE_PROGRAM: &str = "\
ARGUMENT x, y
RESULT U, V
LOAD q = 2
FUNCTIONAL W
W = INTEGRAL(DIFF(U, x) var DIFF(U, x) + DIFF(U, y) var DIFF(U, y) + DIFF(V, x) var DIFF(V, x) + DIFF(V, y) var DIFF(V, y) + q var V)
U(x == 0) = 0
V(x == 0) = 0
";

#[derive(Default)]
struct RecordProgress {
    calls: Mutex<Vec<(usize, usize)>>,
}

impl AssemblyProgress for RecordProgress {
    fn elements_assembled(&self, done: usize, total: usize) {
        self.calls.lock().unwrap().push((done, total));
    }
}

fn dense(system: &GlobalSystem) -> DMatrix<f64> {
    DMatrix::from(&system.matrix)
}

#[test]
fn bar_element_stiffness() {
    let program = Program::compile_text(BAR_PROGRAM).unwrap();
    let mesh = bar_mesh(2.0, 1);
    let assembler = FunctionalAssembler::new(&mesh, program.functional().unwrap(), 1, 1e-12);
    assert_eq!(assembler.solution_dim(), 1);
    assert_eq!(assembler.num_elements(), 1);
    assert_eq!(assembler.num_nodes(), 2);
    assert_eq!(assembler.element_nodes(0), &[0, 1]);

    let block = assembler.assemble_element_block(0).unwrap();
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(2, 3, &[
         50.0, -50.0, 0.0,
        -50.0,  50.0, 0.0,
    ]);
    assert_matrix_eq!(block, expected, comp = abs, tol = 1e-10);
}

#[test]
fn distributed_load_fills_load_column() {
    let text = "ARGUMENT x\nRESULT U\nLOAD q = 3\nFUNCTIONAL W\nW = INTEGRAL(q var U)";
    let program = Program::compile_text(text).unwrap();
    let mesh = bar_mesh(2.0, 1);
    let assembler = FunctionalAssembler::new(&mesh, program.functional().unwrap(), 1, 1e-12);
    let block = assembler.assemble_element_block(0).unwrap();
    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(2, 3, &[
        0.0, 0.0, 3.0,
        0.0, 0.0, 3.0,
    ]);
    assert_matrix_eq!(block, expected, comp = abs, tol = 1e-12);
}

#[test]
fn non_matrix_functional_is_rejected() {
    let program = Program::compile_text("RESULT U\nFUNCTIONAL W = U").unwrap();
    let mesh = bar_mesh(2.0, 1);
    let assembler = FunctionalAssembler::new(&mesh, program.functional().unwrap(), 1, 1e-12);
    assert_eq!(assembler.assemble_element_block(0), Err(FemError::AsMatrix));
}

#[test]
fn result_bindings_interleave_components() {
    let shapes = vec![Shape::constant(1.0), Shape::constant(2.0)];
    let bindings = result_bindings(&shapes, 2, 2).unwrap();
    assert_eq!(bindings.len(), 2);
    assert_eq!(
        bindings[1],
        Value::Symbolic(vec![Shape::zero(), Shape::constant(1.0), Shape::zero(), Shape::constant(2.0)])
    );
    assert_eq!(result_bindings(&shapes, 1, 2), Err(FemError::IncorrectFE));
}

#[test]
fn too_many_results_for_element_type() {
    let text = "ARGUMENT x\nRESULT U, V\nFUNCTIONAL W\nW = INTEGRAL(DIFF(U, x) var DIFF(V, x))";
    let program = Program::compile_text(text).unwrap();
    let mesh = bar_mesh(2.0, 1);
    let assembler = FunctionalAssembler::new(&mesh, program.functional().unwrap(), 2, 1e-12);
    assert_eq!(assembler.assemble_element_block(0), Err(FemError::IncorrectFE));
}

#[test]
fn global_dofs_of_element() {
    let mut dofs = vec![42];
    element_global_dofs(&[3, 5], 2, &mut dofs);
    assert_eq!(dofs, vec![6, 7, 10, 11]);
}

#[test]
fn scatter_element_checks_block_shape() {
    let mut system = GlobalSystem::zeros(&[vec![1], vec![0]], 1);
    assert_eq!(system.dim(), 2);
    let block = DMatrix::zeros(2, 2);
    assert_eq!(system.scatter_element(&[0, 1], &block), Err(FemError::InternalError));
}

#[test]
fn scatter_element_mirrors_upper_triangle() {
    let mut system = GlobalSystem::zeros(&[vec![1], vec![0]], 1);
    // The lower triangle is ignored
    let block = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 5.0, 99.0, 3.0, 6.0]);
    system.scatter_element(&[1, 0], &block).unwrap();
    assert_eq!(dense(&system), DMatrix::from_row_slice(2, 2, &[3.0, 2.0, 2.0, 1.0]));
    assert_eq!(system.rhs, DVector::from_column_slice(&[6.0, 5.0]));
}

#[test]
fn assemble_bar_with_two_elements() {
    let program = Program::compile_text(BAR_PROGRAM).unwrap();
    let mesh = bar_mesh(4.0, 2);
    let element_assembler = FunctionalAssembler::new(&mesh, program.functional().unwrap(), 1, 1e-12);
    let progress = RecordProgress::default();
    let system = SystemAssembler::default()
        .assemble(&element_assembler, mesh.adjacency(), &progress)
        .unwrap();

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
         50.0, -50.0,   0.0,
        -50.0, 100.0, -50.0,
          0.0, -50.0,  50.0,
    ]);
    assert_matrix_eq!(dense(&system), expected, comp = abs, tol = 1e-10);
    assert_eq!(system.rhs, DVector::zeros(3));
    assert_eq!(*progress.calls.lock().unwrap(), vec![(1, 2), (2, 2)]);
}

#[test]
fn parallel_assembly_matches_sequential_assembly() {
    let program = Program::compile_text(PLANE_PROGRAM).unwrap();
    let mesh = unit_square_tri3(6);
    let element_assembler = FunctionalAssembler::new(&mesh, program.functional().unwrap(), 2, 1e-12);

    let sequential = SystemAssembler::default()
        .assemble(&element_assembler, mesh.adjacency(), &())
        .unwrap();
    let progress = RecordProgress::default();
    let parallel = ParSystemAssembler::default()
        .assemble(&element_assembler, mesh.adjacency(), &progress)
        .unwrap();

    assert_eq!(sequential.dim(), mesh.dof_count());
    assert_matrix_eq!(dense(&parallel), dense(&sequential), comp = abs, tol = 1e-12);
    assert_matrix_eq!(parallel.rhs, sequential.rhs, comp = abs, tol = 1e-12);

    // The load acts on the V components only and sums to q times the area
    let total_load: f64 = sequential.rhs.iter().skip(1).step_by(2).sum();
    assert!((total_load - 2.0).abs() < 1e-12);
    assert!(sequential.rhs.iter().step_by(2).all(|&f| f == 0.0));

    let calls = progress.calls.lock().unwrap();
    assert!(calls.contains(&(72, 72)));
}

#[test]
fn laplace_stiffness_is_independent_of_element_size() {
    let program = Program::compile_text(PLANE_PROGRAM).unwrap();
    let functional = program.functional().unwrap();
    let mesh = unit_square_tri3(2);
    let small_mesh = Mesh::new(
        mesh.element_type(),
        mesh.vertices()
            .iter()
            .map(|v| [1e3 + 1e-6 * v[0], -1e3 + 1e-6 * v[1], 0.0])
            .collect(),
        mesh.connectivity().to_vec(),
        mesh.boundary_faces().to_vec(),
    )
    .unwrap();

    let assemble = |mesh: &Mesh| {
        let element_assembler = FunctionalAssembler::new(mesh, functional, 2, 1e-12);
        SystemAssembler::default()
            .assemble(&element_assembler, mesh.adjacency(), &())
            .unwrap()
    };
    let reference = dense(&assemble(&mesh));
    let small = dense(&assemble(&small_mesh));
    assert_matrix_eq!(small, reference, comp = abs, tol = 1e-6);
}

#[test]
fn evaluate_bar_conditions() {
    let program = Program::compile_text(BAR_PROGRAM).unwrap();
    let mesh = bar_mesh(4.0, 2);
    let active = evaluate_conditions(&mesh, program.boundary_conditions(), 1).unwrap();
    assert_eq!(
        active,
        ActiveConditions {
            dirichlet: vec![(0, 0.0)],
            loads: vec![(1, 1.0)],
        }
    );
}

#[test]
fn last_dirichlet_condition_wins() {
    let text = "ARGUMENT x\nRESULT U\nU(x == 0) = 1\nU(x < 1) = 3";
    let program = Program::compile_text(text).unwrap();
    let mesh = bar_mesh(2.0, 1);
    let active = evaluate_conditions(&mesh, program.boundary_conditions(), 1).unwrap();
    assert_eq!(active.dirichlet, vec![(0, 3.0)]);
}

#[test]
fn arguments_beyond_mesh_dimension_are_zero() {
    let text = "ARGUMENT x, y\nRESULT U\nU(x == 2 AND y == 0) = 5";
    let program = Program::compile_text(text).unwrap();
    let mesh = bar_mesh(2.0, 1);
    let active = evaluate_conditions(&mesh, program.boundary_conditions(), 2).unwrap();
    assert_eq!(active.dirichlet, vec![(1, 5.0)]);
}

#[test]
fn condition_beyond_node_freedom_is_incorrect() {
    let bc = BoundaryCondition {
        target: "V".to_string(),
        kind: BcKind::Dirichlet,
        index: 1,
        predicate: Expr::Number(1.0),
        value: Expr::Number(0.0),
    };
    let mesh = bar_mesh(2.0, 1);
    assert_eq!(evaluate_conditions(&mesh, &[bc], 1), Err(FemError::IncorrectFE));
    assert_eq!(mesh.element_type(), ElementType::Segment2);
}

#[test]
fn apply_loads_and_dirichlet_conditions() {
    let program = Program::compile_text(BAR_PROGRAM).unwrap();
    let mesh = bar_mesh(4.0, 2);
    let element_assembler = FunctionalAssembler::new(&mesh, program.functional().unwrap(), 1, 1e-12);
    let mut system = SystemAssembler::default()
        .assemble(&element_assembler, mesh.adjacency(), &())
        .unwrap();
    let active = ActiveConditions {
        dirichlet: vec![(0, 0.0)],
        loads: vec![(1, 1.0), (1, 0.5)],
    };
    apply_conditions(&mut system, &active).unwrap();

    #[rustfmt::skip]
    let expected = DMatrix::from_row_slice(3, 3, &[
        50.0,   0.0,   0.0,
         0.0, 100.0, -50.0,
         0.0, -50.0,  50.0,
    ]);
    assert_matrix_eq!(dense(&system), expected, comp = abs, tol = 1e-10);
    assert_matrix_eq!(system.rhs, DVector::from_column_slice(&[0.0, 1.5, 0.0]), comp = abs, tol = 1e-14);

    let out_of_range = ActiveConditions {
        dirichlet: vec![],
        loads: vec![(3, 1.0)],
    };
    assert_eq!(apply_conditions(&mut system, &out_of_range), Err(FemError::InternalError));
}
