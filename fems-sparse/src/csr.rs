//! CSR storage for the global system.
use log::trace;
use nalgebra::{DVector, RealField};
use nalgebra_sparse::pattern::SparsityPattern;
use nalgebra_sparse::CsrMatrix;
use std::error::Error;
use std::fmt;

/// Attempt to write into a CSR entry that is not part of the sparsity pattern.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MissingEntry {
    pub row: usize,
    pub col: usize,
}

impl fmt::Display for MissingEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entry ({}, {}) is not part of the sparsity pattern", self.row, self.col)
    }
}

impl Error for MissingEntry {}

/// Builds the sparsity pattern of a system with `dofs_per_node` unknowns per node.
///
/// `adjacency[i]` lists the nodes that share at least one element with node `i`. The node itself
/// need not be part of the list. Every dof of node `i` couples with every dof of node `i` and
/// of its neighbors.
///
/// # Panics
///
/// Panics if the adjacency references a node index out of bounds.
pub fn pattern_from_adjacency(adjacency: &[Vec<usize>], dofs_per_node: usize) -> SparsityPattern {
    let num_nodes = adjacency.len();
    let num_rows = num_nodes * dofs_per_node;
    let mut offsets = Vec::with_capacity(num_rows + 1);
    let mut column_indices = Vec::new();
    let mut coupled_nodes = Vec::new();

    offsets.push(0);
    for (node, neighbors) in adjacency.iter().enumerate() {
        coupled_nodes.clear();
        coupled_nodes.extend_from_slice(neighbors);
        coupled_nodes.push(node);
        coupled_nodes.sort_unstable();
        coupled_nodes.dedup();
        assert!(
            coupled_nodes.iter().all(|&j| j < num_nodes),
            "Adjacency must only reference nodes in bounds"
        );

        for _ in 0..dofs_per_node {
            for &other in &coupled_nodes {
                column_indices.extend((0..dofs_per_node).map(|k| dofs_per_node * other + k));
            }
            offsets.push(column_indices.len());
        }
    }

    SparsityPattern::try_from_offsets_and_indices(num_rows, num_rows, offsets, column_indices)
        .expect("Sorted, deduplicated in-bounds column indices always form a valid pattern")
}

/// Creates a CSR matrix with the given pattern and all explicitly stored entries set to zero.
pub fn zeros_with_pattern<T: RealField>(pattern: SparsityPattern) -> CsrMatrix<T> {
    let values = vec![T::zero(); pattern.nnz()];
    CsrMatrix::try_from_pattern_and_values(pattern, values)
        .expect("Number of values always matches the number of pattern entries")
}

/// Adds `value` to the entry `(row, col)` of the matrix.
pub fn add_to_entry<T: RealField>(matrix: &mut CsrMatrix<T>, row: usize, col: usize, value: T) -> Result<(), MissingEntry> {
    if row >= matrix.nrows() {
        return Err(MissingEntry { row, col });
    }
    let mut csr_row = matrix.row_mut(row);
    let (cols, values) = csr_row.cols_and_values_mut();
    let idx = cols
        .binary_search(&col)
        .map_err(|_| MissingEntry { row, col })?;
    values[idx] += value;
    Ok(())
}

/// Returns the value stored at `(row, col)`, or zero if the entry is not explicitly stored.
pub fn entry<T: RealField>(matrix: &CsrMatrix<T>, row: usize, col: usize) -> T {
    let csr_row = matrix.row(row);
    csr_row
        .col_indices()
        .binary_search(&col)
        .map(|idx| csr_row.values()[idx].clone())
        .unwrap_or_else(|_| T::zero())
}

/// Enforces `x[dof] = value` for each `(dof, value)` pair by elimination.
///
/// The known values are moved to the right-hand side, the rows and columns of the constrained
/// dofs are zeroed and their diagonal entries are replaced by a representative scale of the
/// matrix, so that the system stays symmetric. The matrix is assumed to be structurally
/// symmetric with explicitly stored diagonal entries.
///
/// If the same dof appears more than once, the last value wins.
pub fn apply_dirichlet_csr<T: RealField>(matrix: &mut CsrMatrix<T>, rhs: &mut DVector<T>, constraints: &[(usize, T)]) {
    let n = matrix.nrows();
    assert_eq!(rhs.len(), n, "Right-hand side must match the matrix dimensions");

    let mut prescribed: Vec<Option<T>> = vec![None; n];
    for (dof, value) in constraints {
        prescribed[*dof] = Some(value.clone());
    }

    // Using 1 on the diagonal would ignore the scaling of the matrix entries, so take
    // the first non-zero diagonal entry as a representative scale instead
    let scale = (0..n)
        .map(|i| entry(matrix, i, i))
        .find(|d| *d != T::zero())
        .map(|d| d.abs())
        .unwrap_or_else(T::one);

    // Move known values to the right-hand side. By symmetry, column `dof` can be read
    // from row `dof`.
    for (dof, value) in prescribed.iter().enumerate() {
        if let Some(value) = value {
            let row = matrix.row(dof);
            for (&col, a) in row.col_indices().iter().zip(row.values()) {
                if prescribed[col].is_none() {
                    rhs[col] -= a.clone() * value.clone();
                }
            }
        }
    }

    // Zeroing row r requires zeroing column r too, which we do by visiting the rows of the
    // columns that were touched
    let mut rows_to_visit = vec![false; n];
    for (dof, value) in prescribed.iter().enumerate() {
        if let Some(value) = value {
            let mut row = matrix.row_mut(dof);
            let (cols, values) = row.cols_and_values_mut();
            for (&col, a) in cols.iter().zip(values.iter_mut()) {
                if col == dof {
                    *a = scale.clone();
                } else {
                    *a = T::zero();
                    rows_to_visit[col] = true;
                }
            }
            rhs[dof] = scale.clone() * value.clone();
        }
    }

    for row_index in (0..n).filter(|&i| rows_to_visit[i] && prescribed[i].is_none()) {
        let mut row = matrix.row_mut(row_index);
        let (cols, values) = row.cols_and_values_mut();
        for (&col, a) in cols.iter().zip(values.iter_mut()) {
            if prescribed[col].is_some() {
                *a = T::zero();
            }
        }
    }

    trace!("Eliminated {} constrained dofs", prescribed.iter().filter(|v| v.is_some()).count());
}
