// src/space.rs
//! Lattice geometry and fields defined over it.

pub mod lattice;
pub mod layout;
pub mod space_trait;

pub use space_trait::Space;
