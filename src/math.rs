// src/math.rs
//! Element types and the lazy array engine.

pub mod array;
pub mod colour;
pub mod element;
pub mod expr;
pub mod scalar;
