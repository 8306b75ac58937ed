// src/math/colour.rs
/*!
Fixed-size colour-space elements.

- `ColourVector<R, N>`: `N` complex components; the element of a fermion field.
- `ColourMatrix<R, N>`: `N×N` complex matrix; the element of a gauge field
  (one link variable per site and direction).

Both are `Copy` and sized at compile time, so a `Lattice` of them is one flat
allocation and expression evaluation never touches the heap.
*/

use core::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};
use num_complex::Complex;
use num_traits::{One, Zero};

use super::element::SiteElement;
use super::scalar::Real;

// ======================================================================================
// ------------------------------------ ColourVector ------------------------------------
// ======================================================================================

/// `N` complex colour components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColourVector<R: Real, const N: usize> {
    pub c: [Complex<R>; N],
}

impl<R: Real, const N: usize> ColourVector<R, N> {
    #[inline]
    pub fn new(c: [Complex<R>; N]) -> Self {
        Self { c }
    }

    #[inline]
    pub fn zero() -> Self {
        Self { c: [Complex::zero(); N] }
    }

    /// Unit vector along colour `k`.
    #[inline]
    pub fn unit(k: usize) -> Self {
        assert!(k < N, "colour index {k} out of range (N={N})");
        let mut v = Self::zero();
        v.c[k] = Complex::one();
        v
    }

    /// `Σ |c_k|^2`.
    #[inline]
    pub fn norm_sqr(&self) -> R {
        self.c.iter().fold(R::zero(), |acc, z| acc + z.norm_sqr())
    }
}

impl<R: Real, const N: usize> Default for ColourVector<R, N> {
    #[inline]
    fn default() -> Self {
        Self::zero()
    }
}

impl<R: Real, const N: usize> SiteElement for ColourVector<R, N> {
    type Real = R;

    #[inline]
    fn zeroed() -> Self {
        Self::zero()
    }

    #[inline]
    fn inner(&self, other: &Self) -> Complex<R> {
        self.c
            .iter()
            .zip(other.c.iter())
            .fold(Complex::zero(), |acc, (a, b)| acc + a.conj() * *b)
    }
}

// ======================================================================================
// ------------------------------------ ColourMatrix ------------------------------------
// ======================================================================================

/// `N×N` complex matrix, row-major.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColourMatrix<R: Real, const N: usize> {
    pub m: [[Complex<R>; N]; N],
}

impl<R: Real, const N: usize> ColourMatrix<R, N> {
    #[inline]
    pub fn new(m: [[Complex<R>; N]; N]) -> Self {
        Self { m }
    }

    #[inline]
    pub fn zero() -> Self {
        Self { m: [[Complex::zero(); N]; N] }
    }

    #[inline]
    pub fn identity() -> Self {
        let mut out = Self::zero();
        for i in 0..N {
            out.m[i][i] = Complex::one();
        }
        out
    }

    /// Conjugate transpose.
    #[inline]
    pub fn adjoint(&self) -> Self {
        let mut out = Self::zero();
        for i in 0..N {
            for j in 0..N {
                out.m[i][j] = self.m[j][i].conj();
            }
        }
        out
    }

    #[inline]
    pub fn trace(&self) -> Complex<R> {
        (0..N).fold(Complex::zero(), |acc, i| acc + self.m[i][i])
    }
}

impl<R: Real, const N: usize> Default for ColourMatrix<R, N> {
    #[inline]
    fn default() -> Self {
        Self::zero()
    }
}

// ======================================================================================
// ------------------------------------ Arithmetic --------------------------------------
// ======================================================================================

// Componentwise ops shared by both element types, over their flat component slice.
macro_rules! impl_componentwise {
    ($ty:ident) => {
        impl<R: Real, const N: usize> Add for $ty<R, N> {
            type Output = Self;
            #[inline]
            fn add(mut self, rhs: Self) -> Self {
                self += rhs;
                self
            }
        }

        impl<R: Real, const N: usize> Sub for $ty<R, N> {
            type Output = Self;
            #[inline]
            fn sub(mut self, rhs: Self) -> Self {
                self -= rhs;
                self
            }
        }

        impl<R: Real, const N: usize> Neg for $ty<R, N> {
            type Output = Self;
            #[inline]
            fn neg(mut self) -> Self {
                for a in self.components_mut() {
                    *a = -*a;
                }
                self
            }
        }

        impl<R: Real, const N: usize> AddAssign for $ty<R, N> {
            #[inline]
            fn add_assign(&mut self, rhs: Self) {
                for (a, b) in self.components_mut().iter_mut().zip(rhs.components()) {
                    *a += *b;
                }
            }
        }

        impl<R: Real, const N: usize> SubAssign for $ty<R, N> {
            #[inline]
            fn sub_assign(&mut self, rhs: Self) {
                for (a, b) in self.components_mut().iter_mut().zip(rhs.components()) {
                    *a -= *b;
                }
            }
        }

        impl<R: Real, const N: usize> MulAssign<Complex<R>> for $ty<R, N> {
            #[inline]
            fn mul_assign(&mut self, s: Complex<R>) {
                for a in self.components_mut() {
                    *a *= s;
                }
            }
        }

        impl<R: Real, const N: usize> MulAssign<R> for $ty<R, N> {
            #[inline]
            fn mul_assign(&mut self, s: R) {
                for a in self.components_mut() {
                    *a = a.scale(s);
                }
            }
        }

        impl<R: Real, const N: usize> Mul<Complex<R>> for $ty<R, N> {
            type Output = Self;
            #[inline]
            fn mul(mut self, s: Complex<R>) -> Self {
                self *= s;
                self
            }
        }

        impl<R: Real, const N: usize> Mul<R> for $ty<R, N> {
            type Output = Self;
            #[inline]
            fn mul(mut self, s: R) -> Self {
                self *= s;
                self
            }
        }

        impl<R: Real, const N: usize> Mul<$ty<R, N>> for Complex<R> {
            type Output = $ty<R, N>;
            #[inline]
            fn mul(self, v: $ty<R, N>) -> $ty<R, N> {
                v * self
            }
        }
    };
}

impl<R: Real, const N: usize> ColourVector<R, N> {
    #[inline]
    fn components(&self) -> &[Complex<R>] {
        &self.c
    }

    #[inline]
    fn components_mut(&mut self) -> &mut [Complex<R>] {
        &mut self.c
    }
}

impl<R: Real, const N: usize> ColourMatrix<R, N> {
    #[inline]
    fn components(&self) -> &[Complex<R>] {
        self.m.as_flattened()
    }

    #[inline]
    fn components_mut(&mut self) -> &mut [Complex<R>] {
        self.m.as_flattened_mut()
    }
}

impl_componentwise!(ColourVector);
impl_componentwise!(ColourMatrix);

impl<R: Real, const N: usize> Mul for ColourMatrix<R, N> {
    type Output = Self;

    /// Matrix product.
    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let mut out = Self::zero();
        for i in 0..N {
            for k in 0..N {
                let a = self.m[i][k];
                for j in 0..N {
                    out.m[i][j] += a * rhs.m[k][j];
                }
            }
        }
        out
    }
}

impl<R: Real, const N: usize> Mul<ColourVector<R, N>> for ColourMatrix<R, N> {
    type Output = ColourVector<R, N>;

    #[inline]
    fn mul(self, v: ColourVector<R, N>) -> ColourVector<R, N> {
        let mut out = ColourVector::zero();
        for i in 0..N {
            for j in 0..N {
                out.c[i] += self.m[i][j] * v.c[j];
            }
        }
        out
    }
}
