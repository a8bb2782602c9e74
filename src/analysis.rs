//! Running a complete analysis: assembly, boundary conditions, solve and result extraction.
use crate::assembly::boundary::{apply_conditions, evaluate_conditions};
use crate::assembly::global::{AssemblyProgress, GlobalSystem, ParSystemAssembler, SystemAssembler};
use crate::assembly::local::{evaluate_on_element, FunctionalAssembler};
use crate::error::FemError;
use crate::io::mesh_file::load_mesh_from_file;
use crate::io::results::ResultList;
use crate::mesh::Mesh;
use crate::program::ast::Expr;
use crate::program::{preprocess, Program};
use crate::solver::{CholeskySolver, ConjugateGradientSolver, LinearSolver};
use eyre::WrapErr;
use log::info;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Linear solver used for the assembled system.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum SolverKind {
    /// Sparse Cholesky factorization.
    #[default]
    Cholesky,
    /// Diagonally preconditioned conjugate gradient.
    ConjugateGradient { tolerance: f64, max_iterations: usize },
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Assemble element blocks in parallel.
    pub parallel: bool,
    pub solver: SolverKind,
    /// Relative pivot threshold used when solving for shape-function coefficients.
    pub pivot_tolerance: f64,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            parallel: false,
            solver: SolverKind::default(),
            pivot_tolerance: 1e-12,
        }
    }
}

/// Stages of [`Analysis::run`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Stage {
    Assembly,
    BoundaryConditions,
    Solve,
    Results,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Assembly => "assembly",
            Stage::BoundaryConditions => "boundary conditions",
            Stage::Solve => "solve",
            Stage::Results => "results",
        };
        write!(f, "{}", name)
    }
}

/// Observer of the progress of an analysis.
pub trait ProgressObserver: AssemblyProgress {
    fn stage_started(&self, stage: Stage);
}

/// Ignores all progress.
#[derive(Debug, Copy, Clone, Default)]
pub struct NoProgress;

impl AssemblyProgress for NoProgress {
    fn elements_assembled(&self, _done: usize, _total: usize) {}
}

impl ProgressObserver for NoProgress {
    fn stage_started(&self, _stage: Stage) {}
}

/// Reports progress through the `log` facade.
#[derive(Debug, Copy, Clone, Default)]
pub struct LogProgress;

impl AssemblyProgress for LogProgress {
    fn elements_assembled(&self, done: usize, total: usize) {
        info!("Assembled {}/{} elements ({}%)", done, total, 100 * done / total.max(1));
    }
}

impl ProgressObserver for LogProgress {
    fn stage_started(&self, stage: Stage) {
        info!("Starting {}", stage);
    }
}

/// Results of a successful analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOutput {
    /// Solution vector, `freedom` entries per node.
    pub solution: DVector<f64>,
    pub results: ResultList,
}

/// A compiled program together with the mesh it is solved on.
#[derive(Debug, Clone)]
pub struct Analysis {
    program: Program,
    mesh: Mesh,
    settings: AnalysisSettings,
}

impl Analysis {
    pub fn new(program: Program, mesh: Mesh, settings: AnalysisSettings) -> Self {
        Self {
            program,
            mesh,
            settings,
        }
    }

    /// Compiles program text and loads the mesh selected by its `#mesh` directive.
    ///
    /// The mesh file name is used as given if it exists, and is otherwise resolved relative
    /// to `directory`. Fails with [`FemError::NotMesh`] if the program has no mesh directive.
    pub fn from_text<P: AsRef<Path>>(text: &str, directory: P, settings: AnalysisSettings) -> eyre::Result<Self> {
        let source = preprocess(text).wrap_err("failed to preprocess program")?;
        let program = Program::compile(&source.lines).wrap_err("failed to compile program")?;
        info!("Compiled program with {} statements", source.lines.len());

        let mesh_file = source.mesh_file.ok_or(FemError::NotMesh)?;
        let mesh_path = if Path::new(&mesh_file).exists() {
            Path::new(&mesh_file).to_path_buf()
        } else {
            directory.as_ref().join(&mesh_file)
        };
        let mesh = load_mesh_from_file(&mesh_path)
            .wrap_err_with(|| format!("failed to load mesh from {}", mesh_path.display()))?;
        info!(
            "Loaded {} mesh with {} nodes and {} elements",
            mesh.element_type(),
            mesh.node_count(),
            mesh.element_count()
        );

        Ok(Self::new(program, mesh, settings))
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    pub fn settings(&self) -> &AnalysisSettings {
        &self.settings
    }

    fn element_assembler(&self) -> Result<FunctionalAssembler<'_>, FemError> {
        Ok(FunctionalAssembler::new(
            &self.mesh,
            self.program.functional()?,
            self.program.result_names().len(),
            self.settings.pivot_tolerance,
        ))
    }

    /// Assembles the global system, without boundary conditions.
    pub fn assemble(&self, progress: &dyn AssemblyProgress) -> Result<GlobalSystem, FemError> {
        let element_assembler = self.element_assembler()?;
        let adjacency = self.mesh.adjacency();
        if self.settings.parallel {
            ParSystemAssembler::default().assemble(&element_assembler, adjacency, progress)
        } else {
            SystemAssembler::default().assemble(&element_assembler, adjacency, progress)
        }
    }

    pub fn run(&self) -> eyre::Result<AnalysisOutput> {
        self.run_with_observer(&NoProgress)
    }

    pub fn run_with_observer<O: ProgressObserver>(&self, observer: &O) -> eyre::Result<AnalysisOutput> {
        self.program
            .functional()
            .wrap_err("program does not define a functional")?;

        observer.stage_started(Stage::Assembly);
        let mut system = self.assemble(observer).wrap_err("failed to assemble system")?;
        info!(
            "Assembled system with {} unknowns and {} non-zeros",
            system.dim(),
            system.matrix.nnz()
        );

        observer.stage_started(Stage::BoundaryConditions);
        let active = evaluate_conditions(
            &self.mesh,
            self.program.boundary_conditions(),
            self.program.argument_names().len(),
        )
        .wrap_err("failed to evaluate boundary conditions")?;
        apply_conditions(&mut system, &active)?;

        observer.stage_started(Stage::Solve);
        let solution = match self.settings.solver {
            SolverKind::Cholesky => CholeskySolver.solve(&system.matrix, &system.rhs),
            SolverKind::ConjugateGradient {
                tolerance,
                max_iterations,
            } => ConjugateGradientSolver {
                tolerance,
                max_iterations,
            }
            .solve(&system.matrix, &system.rhs),
        }
        .wrap_err("failed to solve system")?;
        info!("Solved system");

        observer.stage_started(Stage::Results);
        let results = self
            .collect_results(&solution)
            .wrap_err("failed to compute results")?;

        Ok(AnalysisOutput { solution, results })
    }

    /// Builds one series per RESULT with the solution at every node, and one per FUNCTION
    /// with the function evaluated at every node.
    pub fn collect_results(&self, solution: &DVector<f64>) -> Result<ResultList, FemError> {
        if solution.len() != self.mesh.dof_count() {
            return Err(FemError::InternalError);
        }
        let freedom = self.mesh.freedom_per_node();
        let mut results = ResultList::new();
        results.stamp_current_time();

        for (k, name) in self.program.result_names().into_iter().enumerate() {
            let values = (0..self.mesh.node_count())
                .map(|node| solution[node * freedom + k])
                .collect();
            results.set_series(name, values, 0.0);
        }
        for (name, expr) in self.program.functions() {
            let values = self.nodal_function_values(expr, solution)?;
            results.set_series(name, values, 0.0);
        }
        Ok(results)
    }

    /// Evaluates a FUNCTION at every node inside the lowest-index element containing the node,
    /// and contracts it with the solution of that element. Nodes outside every element are zero.
    fn nodal_function_values(&self, expr: &Expr, solution: &DVector<f64>) -> Result<Vec<f64>, FemError> {
        let mesh = &self.mesh;
        let freedom = mesh.freedom_per_node();
        let result_count = self.program.result_names().len();

        mesh.first_element_of_nodes()
            .into_iter()
            .enumerate()
            .map(|(node, element)| {
                let Some(element) = element else {
                    return Ok(0.0);
                };
                let point = mesh.vertices()[node];
                let coords = mesh.node_coordinates_of_element(element);
                let value = evaluate_on_element(
                    expr,
                    mesh.element_type(),
                    &coords,
                    result_count,
                    self.settings.pivot_tolerance,
                    point,
                )?;
                let phi = value.as_vector(&point)?;
                let nodes = &mesh.connectivity()[element];
                if phi.len() != nodes.len() * freedom {
                    return Err(FemError::InternalError);
                }
                let u_element = DVector::from_fn(phi.len(), |l, _| solution[nodes[l / freedom] * freedom + l % freedom]);
                Ok(phi.dot(&u_element))
            })
            .collect()
    }
}
