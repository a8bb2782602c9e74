//! Element integration, global assembly and boundary conditions.
//!
//! Assembly runs in three stages. [`local::FunctionalAssembler`] evaluates the functional on
//! each element and produces an element block, [`global::SystemAssembler`] (or its parallel
//! counterpart) scatters the blocks into a [`global::GlobalSystem`], and [`boundary`] finally
//! activates the boundary conditions at the mesh nodes and applies them to the system.
pub mod boundary;
pub mod global;
pub mod local;
