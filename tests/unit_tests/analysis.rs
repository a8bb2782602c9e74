use crate::{bar_mesh, temp_path, unit_square_tri3, BAR_PROGRAM};
use fems::analysis::{
    Analysis, AnalysisSettings, LogProgress, ProgressObserver, SolverKind, Stage,
};
use fems::assembly::global::AssemblyProgress;
use fems::error::{CompileError, FemError};
use fems::io::mesh_file::save_mesh_to_file;
use fems::program::Program;
use matrixcompare::assert_matrix_eq;
use nalgebra::DVector;
use std::sync::Mutex;

const LOADED_BAR_PROGRAM: &str = "\
ARGUMENT x
RESULT U
CONSTANT EA = 100
LOAD q = 3
FUNCTIONAL W
W = INTEGRAL(EA / 2 * (DIFF(U, x) var DIFF(U, x)) + (q var U))
U(x == 0) = 0
";

const PLANE_PROGRAM: &str = "\
ARGUMENT x, y
RESULT U, V
LOAD q = 1
FUNCTIONAL W
W = INTEGRAL(DIFF(U, x) var DIFF(U, x) + DIFF(U, y) var DIFF(U, y) + DIFF(V, x) var DIFF(V, x) + DIFF(V, y) var DIFF(V, y) + q var V)
U(x == 0) = 0
V(x == 0) = 0
";

fn all_settings() -> Vec<AnalysisSettings> {
    let cg = SolverKind::ConjugateGradient {
        tolerance: 1e-12,
        max_iterations: 1000,
    };
    let mut settings = Vec::new();
    for parallel in [false, true] {
        for solver in [SolverKind::Cholesky, cg] {
            settings.push(AnalysisSettings {
                parallel,
                solver,
                ..AnalysisSettings::default()
            });
        }
    }
    settings
}

fn bar_analysis(text: &str, num_elements: usize, settings: AnalysisSettings) -> Analysis {
    let program = Program::compile_text(text).unwrap();
    Analysis::new(program, bar_mesh(2.0, num_elements), settings)
}

#[derive(Default)]
struct RecordObserver {
    stages: Mutex<Vec<Stage>>,
    last_progress: Mutex<Option<(usize, usize)>>,
}

impl AssemblyProgress for RecordObserver {
    fn elements_assembled(&self, done: usize, total: usize) {
        *self.last_progress.lock().unwrap() = Some((done, total));
    }
}

impl ProgressObserver for RecordObserver {
    fn stage_started(&self, stage: Stage) {
        self.stages.lock().unwrap().push(stage);
    }
}

#[test]
fn default_settings() {
    let settings = AnalysisSettings::default();
    assert!(!settings.parallel);
    assert_eq!(settings.solver, SolverKind::Cholesky);
    assert_eq!(settings.pivot_tolerance, 1e-12);
}

#[test]
fn bar_with_tip_load() {
    for settings in all_settings() {
        let output = bar_analysis(BAR_PROGRAM, 1, settings).run().unwrap();
        assert_matrix_eq!(output.solution, DVector::from_column_slice(&[0.0, 0.02]), comp = abs, tol = 1e-10);
    }
}

#[test]
fn refined_bar_has_linear_displacement() {
    for settings in all_settings() {
        let output = bar_analysis(BAR_PROGRAM, 4, settings).run().unwrap();
        let expected = [0.0, 0.005, 0.01, 0.015, 0.02];
        assert_matrix_eq!(output.solution, DVector::from_column_slice(&expected), comp = abs, tol = 1e-10);

        let u = output.results.get("U").unwrap();
        assert_eq!(u.time, 0.0);
        assert_eq!(u.values.len(), 5);
        for (value, expected) in u.values.iter().zip(expected) {
            assert!((value - expected).abs() < 1e-10);
        }
    }
}

#[test]
fn bar_with_distributed_load() {
    let output = bar_analysis(LOADED_BAR_PROGRAM, 1, AnalysisSettings::default())
        .run()
        .unwrap();
    assert_matrix_eq!(output.solution, DVector::from_column_slice(&[0.0, 0.06]), comp = abs, tol = 1e-10);
}

#[test]
fn function_series_is_evaluated_at_nodes() {
    let text = format!("{}FUNCTION S = EA * DIFF(U, x)\n", BAR_PROGRAM);
    let output = bar_analysis(&text, 4, AnalysisSettings::default()).run().unwrap();

    let series: Vec<_> = output.results.series.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(series, vec!["U", "S"]);
    let s = output.results.get("S").unwrap();
    assert_eq!(s.values.len(), 5);
    for value in &s.values {
        assert!((value - 1.0).abs() < 1e-9, "axial force {}", value);
    }
    assert!(output.results.solution_time > 0);
}

#[test]
fn plane_problem_is_independent_of_settings() {
    let program = Program::compile_text(PLANE_PROGRAM).unwrap();
    let mesh = unit_square_tri3(4);
    let reference = Analysis::new(program.clone(), mesh.clone(), AnalysisSettings::default())
        .run()
        .unwrap();

    let u = reference.results.get("U").unwrap();
    let v = reference.results.get("V").unwrap();
    assert!(u.values.iter().all(|x| x.abs() < 1e-12));
    for (vertex, value) in mesh.vertices().iter().zip(&v.values) {
        if vertex[0] == 0.0 {
            assert_eq!(*value, 0.0);
        } else {
            assert!(*value > 0.0);
        }
    }

    for settings in all_settings() {
        let output = Analysis::new(program.clone(), mesh.clone(), settings).run().unwrap();
        assert_matrix_eq!(output.solution, reference.solution, comp = abs, tol = 1e-8);
    }
}

#[test]
fn observer_sees_every_stage() {
    let observer = RecordObserver::default();
    bar_analysis(BAR_PROGRAM, 4, AnalysisSettings::default())
        .run_with_observer(&observer)
        .unwrap();
    assert_eq!(
        *observer.stages.lock().unwrap(),
        vec![Stage::Assembly, Stage::BoundaryConditions, Stage::Solve, Stage::Results]
    );
    assert_eq!(*observer.last_progress.lock().unwrap(), Some((4, 4)));

    // Logging observer only writes to the log facade
    bar_analysis(BAR_PROGRAM, 2, AnalysisSettings::default())
        .run_with_observer(&LogProgress)
        .unwrap();
}

#[test]
fn missing_functional_is_reported() {
    let err = bar_analysis("ARGUMENT x\nRESULT U\nU(x == 0) = 0", 1, AnalysisSettings::default())
        .run()
        .unwrap_err();
    assert_eq!(err.downcast_ref::<FemError>(), Some(&FemError::InternalError));
}

#[test]
fn collect_results_checks_solution_length() {
    let analysis = bar_analysis(BAR_PROGRAM, 2, AnalysisSettings::default());
    assert_eq!(
        analysis.collect_results(&DVector::zeros(2)),
        Err(FemError::InternalError)
    );
}

#[test]
fn analysis_from_text_loads_mesh_directive() {
    let mesh_path = temp_path("from_text_bar.mesh");
    save_mesh_to_file(&bar_mesh(2.0, 4), &mesh_path).unwrap();
    let file_name = mesh_path.file_name().unwrap().to_str().unwrap();
    let directory = mesh_path.parent().unwrap();

    let text = format!("#mesh {}\n{}", file_name, BAR_PROGRAM);
    let analysis = Analysis::from_text(&text, directory, AnalysisSettings::default());
    std::fs::remove_file(&mesh_path).unwrap();

    let analysis = analysis.unwrap();
    assert_eq!(analysis.mesh().element_count(), 4);
    assert_eq!(analysis.program().result_names(), vec!["U"]);
    assert_eq!(analysis.settings(), &AnalysisSettings::default());
    let output = analysis.run().unwrap();
    assert!((output.solution[4] - 0.02).abs() < 1e-10);
}

#[test]
fn analysis_from_text_without_mesh_directive() {
    let err = Analysis::from_text(BAR_PROGRAM, std::env::temp_dir(), AnalysisSettings::default()).unwrap_err();
    assert_eq!(err.downcast_ref::<FemError>(), Some(&FemError::NotMesh));
}

#[test]
fn analysis_from_text_with_missing_mesh_file() {
    let text = format!("#mesh fems-no-such-file.mesh\n{}", BAR_PROGRAM);
    let err = Analysis::from_text(&text, std::env::temp_dir(), AnalysisSettings::default()).unwrap_err();
    assert_eq!(err.downcast_ref::<FemError>(), Some(&FemError::ReadFile));
}

#[test]
fn analysis_from_text_reports_compile_errors() {
    let text = "#mesh bar.mesh\nARGUMENT x\nRESULT U\nFUNCTIONAL W\nW = INTEGRAL(DIFF(U, y))";
    let err = Analysis::from_text(text, std::env::temp_dir(), AnalysisSettings::default()).unwrap_err();
    let compile_error = err.downcast_ref::<CompileError>().unwrap();
    assert_eq!(compile_error.kind(), FemError::Syntax);
}
