// src/solver/operator.rs
//! The fermion-matrix contract the solver is written against.
//!
//! The operator `A` is seen as a 2×2 block system over the checkerboard halves
//! of an even-odd layout:
//!
//! ```text
//!     | A_ee  A_eo |
//! A = |            |      even sites: array indices [0, V/2)
//!     | A_oe  A_oo |      odd sites:  array indices [V/2, V)
//! ```
//!
//! with `A_ee` cheap to invert exactly. All methods take full lattices; the
//! block methods read only the half they act on and zero the other half of
//! `out`.

use crate::math::element::SiteElement;
use crate::space::lattice::Lattice;

/// A linear operator on lattice fields.
///
/// Implementations are read-only during a solve and may be shared between
/// threads solving independent systems.
pub trait LinearOperator<T: SiteElement>: Sync {
    /// Degrees of freedom per lattice site.
    fn site_size(&self) -> usize;

    /// `out = A · input`.
    fn apply_full(&self, out: &mut Lattice<T>, input: &Lattice<T>);

    /// `x ← H x`, where `H` is a fixed invertible transform making
    /// `H A H⁻¹` Hermitian positive definite.
    fn apply_hermiticity(&self, x: &mut Lattice<T>);

    /// `x ← H⁻¹ x`; exact inverse of [`Self::apply_hermiticity`].
    fn remove_hermiticity(&self, x: &mut Lattice<T>);

    /// Schur complement on the odd sites:
    /// `out_o = (A_oo − A_oe A_ee⁻¹ A_eo) input_o`, `out_e = 0`.
    fn apply_eoprec(&self, out: &mut Lattice<T>, input: &Lattice<T>);

    /// `out_e = A_ee⁻¹ input_e`, `out_o = 0`.
    fn apply_even_even_inv(&self, out: &mut Lattice<T>, input: &Lattice<T>);

    /// `out_o = A_oe input_e`, `out_e = 0`.
    fn apply_odd_even(&self, out: &mut Lattice<T>, input: &Lattice<T>);

    /// `out_e = A_eo input_o`, `out_o = 0`.
    fn apply_even_odd(&self, out: &mut Lattice<T>, input: &Lattice<T>);
}
