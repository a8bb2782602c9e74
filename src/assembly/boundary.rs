//! Evaluation and application of boundary conditions.
use crate::assembly::global::GlobalSystem;
use crate::error::FemError;
use crate::mesh::Mesh;
use crate::program::{BcKind, BoundaryCondition};
use fems_sparse::csr::apply_dirichlet_csr;
use log::{debug, warn};
use rustc_hash::FxHashMap;

/// Boundary conditions activated at the nodes of a mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActiveConditions {
    /// Prescribed values by global dof, in order of first activation.
    pub dirichlet: Vec<(usize, f64)>,
    /// Concentrated loads by global dof, one entry per activation.
    pub loads: Vec<(usize, f64)>,
}

/// Evaluates every boundary condition at every node of the mesh.
///
/// The ARGUMENT symbols are bound to the node coordinates, the first to x and so on. Arguments
/// beyond the mesh dimension evaluate to zero. When several Dirichlet conditions constrain the
/// same dof, the one declared last wins.
///
/// Fails with [`FemError::IncorrectFE`] if a condition targets a component beyond the number
/// of dofs per node.
pub fn evaluate_conditions(
    mesh: &Mesh,
    conditions: &[BoundaryCondition],
    argument_count: usize,
) -> Result<ActiveConditions, FemError> {
    let freedom = mesh.freedom_per_node();
    if conditions.iter().any(|bc| bc.index >= freedom) {
        return Err(FemError::IncorrectFE);
    }
    if argument_count > mesh.dim() {
        warn!(
            "{} arguments declared for a mesh of dimension {}; the remaining arguments are zero",
            argument_count,
            mesh.dim()
        );
    }

    let bound = argument_count.min(mesh.dim());
    let mut active = ActiveConditions::default();
    let mut dirichlet_slots: FxHashMap<usize, usize> = FxHashMap::default();

    for (node, coords) in mesh.vertices().iter().enumerate() {
        for bc in conditions {
            let Some(value) = bc.evaluate(&coords[..bound])? else {
                continue;
            };
            let dof = node * freedom + bc.index;
            match bc.kind {
                BcKind::Load => active.loads.push((dof, value)),
                BcKind::Dirichlet => {
                    if let Some(&slot) = dirichlet_slots.get(&dof) {
                        warn!("Dof {} of node {} is constrained more than once", bc.index, node);
                        active.dirichlet[slot].1 = value;
                    } else {
                        dirichlet_slots.insert(dof, active.dirichlet.len());
                        active.dirichlet.push((dof, value));
                    }
                }
            }
        }
    }

    debug!(
        "Activated {} Dirichlet conditions and {} loads",
        active.dirichlet.len(),
        active.loads.len()
    );
    Ok(active)
}

/// Adds the loads to the load vector, then eliminates the Dirichlet dofs from the system.
pub fn apply_conditions(system: &mut GlobalSystem, active: &ActiveConditions) -> Result<(), FemError> {
    let dim = system.dim();
    if active
        .loads
        .iter()
        .chain(&active.dirichlet)
        .any(|&(dof, _)| dof >= dim)
    {
        return Err(FemError::InternalError);
    }

    for &(dof, value) in &active.loads {
        system.rhs[dof] += value;
    }
    apply_dirichlet_csr(&mut system.matrix, &mut system.rhs, &active.dirichlet);
    Ok(())
}
