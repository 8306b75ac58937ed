// src/solver/linear_algebra.rs
//! Reductions over field storage.
//!
//! Accumulation is sequential and in index order, so a solve gives bitwise
//! identical results regardless of the rayon pool size.

use num_complex::Complex;
use num_traits::Zero;

use crate::math::element::SiteElement;

/// Full complex inner product `Σ conj(a_i) · b_i`.
///
/// # Panics
/// Panics if the lengths differ.
#[inline]
pub fn dot_fields<T: SiteElement>(a: &[T], b: &[T]) -> Complex<T::Real> {
    assert_eq!(a.len(), b.len(), "dot_fields: length mismatch");
    a.iter()
        .zip(b.iter())
        .fold(Complex::zero(), |acc, (x, y)| acc + x.inner(y))
}

/// `Re⟨a, a⟩`.
#[inline]
pub fn norm_sqr<T: SiteElement>(a: &[T]) -> T::Real {
    dot_fields(a, a).re
}
