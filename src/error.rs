// src/error.rs
/*!
Recoverable errors for layout lookups, fixed-length assignment and configuration.

Programming errors (operand length mismatches, lattices with different volumes,
operands bound to different layouts) are **not** represented here: they stop the
program with an assertion.
*/

use thiserror::Error;

/// Errors raised at the boundary of the lattice core.
#[derive(Debug, Error)]
pub enum LatticeError {
    /// A lattice shape with no axes or a zero extent.
    #[error("lattice shape must have at least one axis and positive extents; got {0:?}")]
    InvalidShape(Vec<usize>),

    /// Even-odd ordering needs as many even sites as odd sites.
    #[error("shape {shape:?} has {even} even and {odd} odd sites; even-odd ordering needs equal counts")]
    UnbalancedParity { shape: Vec<usize>, even: usize, odd: usize },

    /// Coordinate with the wrong number of components.
    #[error("coordinate rank mismatch: expected {expected} components, got {got}")]
    RankMismatch { expected: usize, got: usize },

    /// Coordinate component outside `[0, extent)` on an unsanitised lookup.
    #[error("coordinate {value} on axis {axis} is outside [0, {extent})")]
    CoordinateOutOfRange { axis: usize, value: isize, extent: usize },

    /// Site or array index outside `[0, volume)`.
    #[error("index {index} is outside [0, {volume})")]
    IndexOutOfRange { index: usize, volume: usize },

    /// Expression length differs from a fixed-length destination.
    #[error("expression of length {got} cannot be assigned to a destination of length {expected}")]
    SizeMismatch { expected: usize, got: usize },

    /// A lattice was built from an expression whose operands carry no layout.
    #[error("expression carries no layout; at least one operand must be a full lattice")]
    MissingLayout,

    /// Expression length is not a positive multiple of the layout volume.
    #[error("expression of length {len} does not fit a layout of volume {volume}")]
    IncompatibleLength { len: usize, volume: usize },

    /// Rejected solver or layout parameter.
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, LatticeError>;
