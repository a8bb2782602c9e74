use crate::{bar_mesh, temp_path, unit_square_tri3};
use fems::element::ElementType;
use fems::error::FemError;
use fems::io::mesh_file::{load_mesh_from_file, load_mesh_from_str, mesh_to_string, save_mesh_to_file};
use fems::io::results::ResultList;

const TRIANGLE_MESH: &str = "\
3
4
0 0
1 0
1 1
0 1
2
0 1 2
0 2 3
1
0 1
";

#[test]
fn parse_triangle_mesh() {
    let mesh = load_mesh_from_str(TRIANGLE_MESH).unwrap();
    assert_eq!(mesh.element_type(), ElementType::Tri3);
    assert_eq!(mesh.node_count(), 4);
    assert_eq!(mesh.element_count(), 2);
    assert_eq!(mesh.vertices()[2], [1.0, 1.0, 0.0]);
    assert_eq!(mesh.connectivity(), &[vec![0, 1, 2], vec![0, 2, 3]]);
    assert_eq!(mesh.boundary_faces(), &[vec![0, 1]]);
}

#[test]
fn mesh_text_round_trip() {
    for mesh in [bar_mesh(1.0, 3), unit_square_tri3(3)] {
        let text = mesh_to_string(&mesh);
        assert_eq!(load_mesh_from_str(&text), Ok(mesh));
    }
}

#[test]
fn mesh_file_round_trip() {
    let path = temp_path("round_trip.mesh");
    let mesh = unit_square_tri3(2);
    save_mesh_to_file(&mesh, &path).unwrap();
    let loaded = load_mesh_from_file(&path);
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, Ok(mesh));
}

#[test]
fn segment_mesh_without_boundary_is_accepted() {
    let mesh = load_mesh_from_str("34 2 0 1 1 0 1 0").unwrap();
    assert_eq!(mesh.element_type(), ElementType::Segment2);
    assert!(mesh.boundary_faces().is_empty());
}

#[test]
fn malformed_meshes() {
    let cases = [
        // Truncated connectivity
        ("3 3 0 0 1 0 0 1 1 0 1", FemError::ReadFile),
        ("3 3 0 0 1 0 zero 1 1 0 1 2 1 0 1", FemError::ReadFile),
        ("3 0 1 0 1 2 1 0 1", FemError::MeshFormat),
        ("3 3 0 0 1 0 0 1 0 1 0 1", FemError::MeshFormat),
        ("3 3 0 0 1 0 0 1 1 0 1 3 1 0 1", FemError::MeshFormat),
        ("3 3 0 0 1 0 0 1 1 0 -1 2 1 0 1", FemError::MeshFormat),
        ("3 3 0 0 1 0 0 1 1 0 1 2 0", FemError::MeshFormat),
        ("34 2 0 1 1 0 1 -1", FemError::MeshFormat),
        ("123 3 0 0 1 0 0 1 1 0 1 2 1 0 1", FemError::IncorrectFE),
        ("77 3 0 0 1 0 0 1 1 0 1 2 1 0 1", FemError::MeshFormat),
        ("-3 3 0 0 1 0 0 1 1 0 1 2 1 0 1", FemError::MeshFormat),
        ("", FemError::ReadFile),
    ];
    for (text, expected) in cases {
        assert_eq!(load_mesh_from_str(text), Err(expected), "mesh text: {:?}", text);
    }
}

#[test]
fn missing_mesh_file() {
    let path = temp_path("does_not_exist.mesh");
    assert_eq!(load_mesh_from_file(path), Err(FemError::ReadFile));
}

#[test]
fn results_round_trip() {
    let mut results = ResultList::new();
    results.solution_time = 1_700_000_000;
    results.set_series("U", vec![0.0, 0.1, 1.0 / 3.0], 0.0);
    results.set_series("S", vec![-2.5e-7, 4.0, 1e20], 1.5);

    let text = results.to_text();
    assert!(text.starts_with("Results\n1700000000\n2\nU\n"));
    assert_eq!(ResultList::from_text(&text), Ok(results.clone()));

    let path = temp_path("round_trip.results");
    results.save_to_file(&path).unwrap();
    let loaded = ResultList::load_from_file(&path);
    std::fs::remove_file(&path).unwrap();
    assert_eq!(loaded, Ok(results));
}

#[test]
fn set_series_replaces_series_of_same_name() {
    let mut results = ResultList::new();
    results.set_series("U", vec![1.0], 0.0);
    results.set_series("V", vec![2.0], 0.0);
    results.set_series("U", vec![3.0, -1.0], 2.0);

    assert_eq!(results.series.len(), 2);
    assert_eq!(results.series[0].name, "U");
    let u = results.get("U").unwrap();
    assert_eq!(u.values, vec![3.0, -1.0]);
    assert_eq!(u.time, 2.0);
    assert_eq!(u.min(), Some(-1.0));
    assert_eq!(u.max(), Some(3.0));
    assert!(results.get("W").is_none());
}

#[test]
fn malformed_results() {
    assert_eq!(ResultList::from_text("Result 0 0"), Err(FemError::ReadFile));
    assert_eq!(ResultList::from_text("Results 0 1 U 0.0 2 1.0"), Err(FemError::ReadFile));
    assert_eq!(ResultList::from_text("Results 0 1 U 0.0 1 one"), Err(FemError::ReadFile));
    assert_eq!(ResultList::from_text("Results 0 0"), Ok(ResultList::new()));
}
