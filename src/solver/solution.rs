// src/solver/solution.rs
use crate::math::element::SiteElement;
use crate::space::lattice::Lattice;

/// Result of a linear solve.
///
/// `residual` keeps the historical contract: the achieved residual norm on
/// convergence, the requested tolerance when the iteration budget ran out.
/// `achieved_residual` is always the true final `sqrt(Re⟨r, r⟩)` and
/// `converged` tells the two cases apart.
#[derive(Debug, Clone)]
pub struct SolutionWrapper<T: SiteElement> {
    field: Lattice<T>,
    residual: T::Real,
    iterations: usize,
    achieved_residual: T::Real,
    converged: bool,
}

impl<T: SiteElement> SolutionWrapper<T> {
    #[inline]
    pub(crate) fn new(
        field: Lattice<T>,
        residual: T::Real,
        iterations: usize,
        achieved_residual: T::Real,
        converged: bool,
    ) -> Self {
        Self { field, residual, iterations, achieved_residual, converged }
    }

    /// The solved field.
    #[inline]
    pub fn solution(&self) -> &Lattice<T> {
        &self.field
    }

    #[inline]
    pub fn into_solution(self) -> Lattice<T> {
        self.field
    }

    #[inline]
    pub fn residual(&self) -> T::Real {
        self.residual
    }

    #[inline]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    #[inline]
    pub fn achieved_residual(&self) -> T::Real {
        self.achieved_residual
    }

    #[inline]
    pub fn converged(&self) -> bool {
        self.converged
    }
}
