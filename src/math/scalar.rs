// src/math/scalar.rs
//! Floating types a field can be measured in.
//!
//! Every site element is built from `Complex<R>` components with `R: Real`.
//! Residuals, tolerances and norms of a solve are `R` as well, so `Real`
//! carries everything the solver prints or compares.

use core::fmt::{Debug, Display};
use core::iter::Sum;
use num_traits::{Float, NumAssign, NumCast};

// ==============================================================================
// ------------------- Sealing: keep impl surface controlled --------------------
// ==============================================================================

mod sealed {
    pub trait Sealed {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

// ==============================================================================
// --------------------------------- Trait Def ----------------------------------
// ==============================================================================

/// `f32` or `f64`.
pub trait Real:
    Float
    + NumAssign
    + NumCast
    + Default
    + Debug
    + Display
    + Sum<Self>
    + Send
    + Sync
    + 'static
    + sealed::Sealed
{
}

impl Real for f32 {}
impl Real for f64 {}
