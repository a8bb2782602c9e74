//! Sparse linear algebra used by `fems`.
//!
//! The global system of a finite element analysis is stored as a CSR matrix whose sparsity
//! pattern is known up front from the node adjacency of the mesh. This crate builds that
//! pattern, provides scatter-add access into it, applies Dirichlet constraints by elimination
//! and offers a preconditioned conjugate gradient solver for the resulting symmetric system.

pub mod cg;
pub mod csr;

pub use nalgebra_sparse::pattern::SparsityPattern;
pub use nalgebra_sparse::CsrMatrix;
