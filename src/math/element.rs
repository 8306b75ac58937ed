// src/math/element.rs
//! Per-site element types a solver can work on.
//!
//! A `SiteElement` is one degree of freedom of a fermion-like field: a complex
//! number, or a small colour vector of complex numbers. The solver only needs
//! vector-space arithmetic, scaling by complex numbers and the inner product.

use core::fmt::Debug;
use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use num_complex::Complex;
use num_traits::Zero;

use super::scalar::Real;

/// Vector-space element stored at each degree of freedom of a lattice field.
pub trait SiteElement:
    Copy
    + Send
    + Sync
    + Debug
    + PartialEq
    + 'static
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + Mul<Complex<Self::Real>, Output = Self>
    + MulAssign<Complex<Self::Real>>
{
    /// Floating type of the components.
    type Real: Real;

    /// Additive identity.
    fn zeroed() -> Self;

    /// Inner product `Σ conj(self_k) · other_k`.
    fn inner(&self, other: &Self) -> Complex<Self::Real>;
}

impl<R: Real> SiteElement for Complex<R> {
    type Real = R;

    #[inline]
    fn zeroed() -> Self {
        Complex::zero()
    }

    #[inline]
    fn inner(&self, other: &Self) -> Complex<R> {
        self.conj() * *other
    }
}
