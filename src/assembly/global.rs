//! Assembly of element blocks into the global sparse system.
use crate::assembly::local::ElementBlockAssembler;
use crate::error::FemError;
use fems_sparse::csr::{add_to_entry, pattern_from_adjacency, zeros_with_pattern};
use fems_sparse::CsrMatrix;
use log::{debug, trace};
use nalgebra::{DMatrix, DVector};
use parking_lot::Mutex;
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use thread_local::ThreadLocal;

/// Receives coarse progress of element assembly.
pub trait AssemblyProgress: Sync {
    /// Called after `done` of `total` elements have been assembled, at most once per
    /// tenth of the elements.
    fn elements_assembled(&self, done: usize, total: usize);
}

impl AssemblyProgress for () {
    fn elements_assembled(&self, _done: usize, _total: usize) {}
}

/// Symmetric sparse matrix and load vector of the whole mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSystem {
    pub matrix: CsrMatrix<f64>,
    pub rhs: DVector<f64>,
}

impl GlobalSystem {
    /// Creates an all-zero system whose sparsity pattern couples the dofs of adjacent nodes.
    pub fn zeros(adjacency: &[Vec<usize>], dofs_per_node: usize) -> Self {
        let pattern = pattern_from_adjacency(adjacency, dofs_per_node);
        let dim = pattern.major_dim();
        Self {
            matrix: zeros_with_pattern(pattern),
            rhs: DVector::zeros(dim),
        }
    }

    /// Number of unknowns.
    pub fn dim(&self) -> usize {
        self.rhs.len()
    }

    /// Adds an element block to the system.
    ///
    /// `global_dofs[l]` is the global index of local dof `l`. Only the upper triangle of the
    /// element matrix is read, and mirrored; the last column of the block is added to the load
    /// vector.
    pub fn scatter_element(&mut self, global_dofs: &[usize], block: &DMatrix<f64>) -> Result<(), FemError> {
        let ndof = global_dofs.len();
        if block.shape() != (ndof, ndof + 1) {
            return Err(FemError::InternalError);
        }

        for l in 0..ndof {
            let row = global_dofs[l];
            for k in l..ndof {
                let col = global_dofs[k];
                let value = block[(l, k)];
                add_to_entry(&mut self.matrix, row, col, value).map_err(|_| FemError::InternalError)?;
                if l != k {
                    add_to_entry(&mut self.matrix, col, row, value).map_err(|_| FemError::InternalError)?;
                }
            }
            self.rhs[row] += block[(l, ndof)];
        }
        Ok(())
    }
}

/// Computes the global dof index of every local dof of an element.
pub fn element_global_dofs(nodes: &[usize], dofs_per_node: usize, output: &mut Vec<usize>) {
    output.clear();
    output.extend(
        nodes
            .iter()
            .flat_map(|node| (0..dofs_per_node).map(move |i| node * dofs_per_node + i)),
    );
}

#[derive(Debug, Clone, Default)]
struct AssemblerWorkspace {
    global_dofs: Vec<usize>,
}

fn report_progress(progress: &dyn AssemblyProgress, done: usize, total: usize) {
    let step = (total / 10).max(1);
    if done % step == 0 || done == total {
        progress.elements_assembled(done, total);
    }
}

/// Assembles the global system one element at a time, in element order.
#[derive(Debug, Default)]
pub struct SystemAssembler {
    workspace: RefCell<AssemblerWorkspace>,
}

impl SystemAssembler {
    pub fn assemble(
        &self,
        element_assembler: &dyn ElementBlockAssembler,
        adjacency: &[Vec<usize>],
        progress: &dyn AssemblyProgress,
    ) -> Result<GlobalSystem, FemError> {
        let sdim = element_assembler.solution_dim();
        let mut system = GlobalSystem::zeros(adjacency, sdim);
        let ws = &mut *self.workspace.borrow_mut();

        let total = element_assembler.num_elements();
        for element_index in 0..total {
            let block = element_assembler.assemble_element_block(element_index)?;
            element_global_dofs(
                element_assembler.element_nodes(element_index),
                sdim,
                &mut ws.global_dofs,
            );
            system.scatter_element(&ws.global_dofs, &block)?;
            report_progress(progress, element_index + 1, total);
        }

        debug!("Assembled {} elements into system with {} nnz", total, system.matrix.nnz());
        Ok(system)
    }
}

/// Assembles the global system with element blocks computed in parallel.
///
/// Element blocks are computed independently on the rayon thread pool; adding them to the
/// global system is serialized by a lock. The result equals the sequential result up to
/// floating-point rounding.
#[derive(Debug, Default)]
pub struct ParSystemAssembler {
    workspace: ThreadLocal<RefCell<AssemblerWorkspace>>,
}

impl ParSystemAssembler {
    pub fn assemble(
        &self,
        element_assembler: &(dyn Sync + ElementBlockAssembler),
        adjacency: &[Vec<usize>],
        progress: &dyn AssemblyProgress,
    ) -> Result<GlobalSystem, FemError> {
        let sdim = element_assembler.solution_dim();
        let system = Mutex::new(GlobalSystem::zeros(adjacency, sdim));
        let total = element_assembler.num_elements();
        let done = AtomicUsize::new(0);

        (0..total)
            .into_par_iter()
            .with_min_len(16)
            .try_for_each(|element_index| {
                let ws = &mut *self.workspace.get_or_default().borrow_mut();
                let block = element_assembler.assemble_element_block(element_index)?;
                element_global_dofs(
                    element_assembler.element_nodes(element_index),
                    sdim,
                    &mut ws.global_dofs,
                );
                system.lock().scatter_element(&ws.global_dofs, &block)?;

                let done = done.fetch_add(1, Ordering::Relaxed) + 1;
                trace!("Assembled element {} ({}/{})", element_index, done, total);
                report_progress(progress, done, total);
                Ok::<(), FemError>(())
            })?;

        let system = system.into_inner();
        debug!("Assembled {} elements into system with {} nnz", total, system.matrix.nnz());
        Ok(system)
    }
}
