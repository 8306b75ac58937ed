// src/solver.rs
//! Conjugate-gradient inversion against an abstract fermion operator.

pub mod conjugate_gradient;
pub mod linear_algebra;
pub mod operator;
pub mod solution;
