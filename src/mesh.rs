//! Node set, element connectivity and node adjacency.
use crate::element::ElementType;
use crate::error::FemError;
use log::debug;
use nalgebra::DMatrix;

/// Index-based mesh of a single element type.
///
/// Nodes are stored with three coordinates; coordinates beyond the dimension of the element
/// type are zero. Connectivity and boundary faces are validated on construction, so every
/// stored node index is in bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    element_type: ElementType,
    vertices: Vec<[f64; 3]>,
    connectivity: Vec<Vec<usize>>,
    boundary_faces: Vec<Vec<usize>>,
    adjacency: Vec<Vec<usize>>,
}

impl Mesh {
    /// Constructs a mesh and builds its node-adjacency map.
    ///
    /// Fails with [`FemError::MeshFormat`] if the mesh has no nodes or elements, if an element
    /// or face has the wrong number of nodes, or if a node index is out of bounds.
    pub fn new(
        element_type: ElementType,
        vertices: Vec<[f64; 3]>,
        connectivity: Vec<Vec<usize>>,
        boundary_faces: Vec<Vec<usize>>,
    ) -> Result<Self, FemError> {
        let n = vertices.len();
        if n == 0 || connectivity.is_empty() {
            return Err(FemError::MeshFormat);
        }
        let valid = |nodes: &Vec<usize>, arity: usize| nodes.len() == arity && nodes.iter().all(|&i| i < n);
        if !connectivity.iter().all(|e| valid(e, element_type.size()))
            || !boundary_faces.iter().all(|f| valid(f, element_type.face_arity()))
        {
            return Err(FemError::MeshFormat);
        }

        let adjacency = build_adjacency(n, &connectivity);
        debug!(
            "Created {} mesh with {} nodes and {} elements",
            element_type,
            n,
            connectivity.len()
        );
        Ok(Self {
            element_type,
            vertices,
            connectivity,
            boundary_faces,
            adjacency,
        })
    }

    pub fn element_type(&self) -> ElementType {
        self.element_type
    }

    pub fn dim(&self) -> usize {
        self.element_type.dim()
    }

    pub fn freedom_per_node(&self) -> usize {
        self.element_type.freedom()
    }

    pub fn node_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn element_count(&self) -> usize {
        self.connectivity.len()
    }

    /// Total number of unknowns of the global system.
    pub fn dof_count(&self) -> usize {
        self.node_count() * self.freedom_per_node()
    }

    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vertices
    }

    pub fn connectivity(&self) -> &[Vec<usize>] {
        &self.connectivity
    }

    pub fn boundary_faces(&self) -> &[Vec<usize>] {
        &self.boundary_faces
    }

    /// For each node, the sorted list of other nodes sharing at least one element with it.
    pub fn adjacency(&self) -> &[Vec<usize>] {
        &self.adjacency
    }

    /// Coordinates of the nodes of element `i`, one row per node and one column per dimension.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of bounds.
    pub fn node_coordinates_of_element(&self, i: usize) -> DMatrix<f64> {
        let nodes = &self.connectivity[i];
        DMatrix::from_fn(nodes.len(), self.dim(), |k, axis| self.vertices[nodes[k]][axis])
    }

    /// For each node, the lowest index of an element containing it, if any.
    pub fn first_element_of_nodes(&self) -> Vec<Option<usize>> {
        let mut first = vec![None; self.node_count()];
        for (element_index, nodes) in self.connectivity.iter().enumerate() {
            for &node in nodes {
                first[node].get_or_insert(element_index);
            }
        }
        first
    }
}

fn build_adjacency(num_nodes: usize, connectivity: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); num_nodes];
    for nodes in connectivity {
        for &i in nodes {
            adjacency[i].extend(nodes.iter().copied().filter(|&j| j != i));
        }
    }
    for neighbors in &mut adjacency {
        neighbors.sort_unstable();
        neighbors.dedup();
    }
    adjacency
}
