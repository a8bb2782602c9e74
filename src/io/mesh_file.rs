//! Reading and writing meshes in the whitespace-separated mesh text format.
//!
//! The format is a sequence of numbers:
//!
//! ```text
//! <type code>
//! <node count>
//! <node coordinates, dim per node>
//! <element count>
//! <element connectivity, one line per element>
//! <boundary face count>
//! <boundary faces, one line per face>
//! ```
use crate::element::ElementType;
use crate::error::FemError;
use crate::io::{read_file, Tokens};
use crate::mesh::Mesh;
use eyre::Context;
use itertools::Itertools;
use std::fmt::Write;
use std::path::Path;

/// Loads a [`Mesh`] from a mesh file at the given path.
pub fn load_mesh_from_file<P: AsRef<Path>>(file_path: P) -> Result<Mesh, FemError> {
    load_mesh_from_str(&read_file(file_path.as_ref())?)
}

/// Parses a [`Mesh`] from mesh text.
///
/// Fails with [`FemError::ReadFile`] for truncated or non-numeric data and with
/// [`FemError::MeshFormat`] for an unknown type code, empty node or element tables, a missing
/// boundary table for element types that need one, or an out-of-range node index. Plate and
/// shell type codes are [`FemError::IncorrectFE`].
pub fn load_mesh_from_str(text: &str) -> Result<Mesh, FemError> {
    let mut tokens = Tokens::new(text);
    let code: i64 = tokens.parse()?;
    let element_type = ElementType::from_code(u32::try_from(code).map_err(|_| FemError::MeshFormat)?)?;
    let dim = element_type.dim();

    let node_count = positive_count(&mut tokens)?;
    let mut vertices = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        let mut vertex = [0.0; 3];
        for x in vertex.iter_mut().take(dim) {
            *x = tokens.parse()?;
        }
        vertices.push(vertex);
    }

    let element_count = positive_count(&mut tokens)?;
    let connectivity = read_index_table(&mut tokens, element_count, element_type.size(), node_count)?;

    let face_count: i64 = tokens.parse()?;
    let face_count = usize::try_from(face_count).map_err(|_| FemError::MeshFormat)?;
    if face_count == 0 && element_type.requires_boundary() {
        return Err(FemError::MeshFormat);
    }
    let boundary_faces = read_index_table(&mut tokens, face_count, element_type.face_arity(), node_count)?;

    Mesh::new(element_type, vertices, connectivity, boundary_faces)
}

fn positive_count(tokens: &mut Tokens) -> Result<usize, FemError> {
    let count: i64 = tokens.parse()?;
    if count <= 0 {
        return Err(FemError::MeshFormat);
    }
    usize::try_from(count).map_err(|_| FemError::MeshFormat)
}

fn read_index_table(
    tokens: &mut Tokens,
    rows: usize,
    arity: usize,
    node_count: usize,
) -> Result<Vec<Vec<usize>>, FemError> {
    (0..rows)
        .map(|_| {
            (0..arity)
                .map(|_| {
                    let index: i64 = tokens.parse()?;
                    usize::try_from(index)
                        .ok()
                        .filter(|&i| i < node_count)
                        .ok_or(FemError::MeshFormat)
                })
                .collect()
        })
        .collect()
}

/// Formats a mesh as mesh text.
///
/// Coordinates are written with the shortest representation that parses back to the same
/// value.
pub fn mesh_to_string(mesh: &Mesh) -> String {
    let dim = mesh.dim();
    let mut out = String::new();
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{}", mesh.element_type().code());
    let _ = writeln!(out, "{}", mesh.node_count());
    for vertex in mesh.vertices() {
        let _ = writeln!(out, "{}", vertex[..dim].iter().map(|x| format!("{:?}", x)).join(" "));
    }
    for table in [mesh.connectivity(), mesh.boundary_faces()] {
        let _ = writeln!(out, "{}", table.len());
        for nodes in table {
            let _ = writeln!(out, "{}", nodes.iter().join(" "));
        }
    }
    out
}

/// Writes a mesh to a file in mesh text format.
pub fn save_mesh_to_file<P: AsRef<Path>>(mesh: &Mesh, file_path: P) -> eyre::Result<()> {
    let file_path = file_path.as_ref();
    std::fs::write(file_path, mesh_to_string(mesh))
        .wrap_err_with(|| format!("failed to write mesh to {}", file_path.display()))
}
