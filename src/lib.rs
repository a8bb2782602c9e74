//! A finite element engine driven by a small language for weak forms.
//!
//! A [`program::Program`] declares the unknowns, constants, loads and the functional of a
//! problem together with its boundary conditions. An [`analysis::Analysis`] integrates the
//! functional over every element of a [`mesh::Mesh`], assembles the global sparse system,
//! applies the boundary conditions and solves it.
pub mod analysis;
pub mod assembly;
pub mod dense;
pub mod element;
pub mod error;
pub mod io;
pub mod mesh;
pub mod program;
pub mod quadrature;
pub mod shape;
pub mod solver;
pub mod value;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
