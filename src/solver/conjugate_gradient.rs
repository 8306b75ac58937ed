// src/solver/conjugate_gradient.rs
/*!
Conjugate-gradient inversion of a fermion matrix.

CG needs a Hermitian positive-definite operator. The fermion matrix `A` is not
Hermitian, but `H A H⁻¹` is for the operator's Hermiticity transform `H`, so
both variants iterate on `H A H⁻¹` with source `H b` and map the result back
with `H⁻¹` at the end.

# Variants

- [`conjugate_gradient_unprec`]: CG over the whole lattice.
- [`conjugate_gradient_eoprec`]: CG over the odd sites only, on the Schur
  complement `S = A_oo − A_oe A_ee⁻¹ A_eo`; even sites follow exactly from
  `x_e = A_ee⁻¹ (b_e − A_eo x_o)`. Needs an even-odd layout.
- [`solve`]: validates [`SolverParams`] and dispatches on the preconditioning.

# Termination

On `sqrt(Re⟨r, r⟩) < τ` at iteration `i` the result records `i + 1`
iterations and the achieved residual. When the budget `M` runs out, the result
records `iterations = M` and `residual = τ`; `achieved_residual` and
`converged` carry the real outcome. A right-hand side already within tolerance
returns after 0 iterations.
*/

use num_complex::Complex;
use num_traits::{Float, NumCast, Zero};

use super::linear_algebra::{dot_fields, norm_sqr};
use super::operator::LinearOperator;
use super::solution::SolutionWrapper;
use crate::config::{Preconditioning, SolverParams};
use crate::error::{LatticeError, Result};
use crate::math::element::SiteElement;
use crate::space::lattice::Lattice;
use crate::space::layout::SiteOrdering;

// ======================================================================================
// ------------------------------------- Helpers ----------------------------------------
// ======================================================================================

/// `out = H · apply(H⁻¹ · input)`, using `work` as scratch.
#[inline]
fn apply_hermitian<T, Op, F>(op: &Op, apply: F, out: &mut Lattice<T>, input: &Lattice<T>, work: &mut Lattice<T>)
where
    T: SiteElement,
    Op: LinearOperator<T> + ?Sized,
    F: Fn(&Op, &mut Lattice<T>, &Lattice<T>),
{
    work.copy_from(input);
    op.remove_hermiticity(work);
    apply(op, out, work);
    op.apply_hermiticity(out);
}

#[inline]
fn check_site_size<T, Op>(op: &Op, rhs: &Lattice<T>)
where
    T: SiteElement,
    Op: LinearOperator<T> + ?Sized,
{
    assert_eq!(
        op.site_size(),
        rhs.site_size(),
        "operator site size {} does not match right-hand side site size {}",
        op.site_size(),
        rhs.site_size()
    );
}

/// Outcome of the shared CG loop.
struct CgOutcome<R> {
    iterations: usize,
    residual: R,
    achieved_residual: R,
    converged: bool,
}

impl<R: Float> CgOutcome<R> {
    #[inline]
    fn into_solution<T: SiteElement<Real = R>>(self, field: Lattice<T>) -> SolutionWrapper<T> {
        SolutionWrapper::new(field, self.residual, self.iterations, self.achieved_residual, self.converged)
    }
}

fn report<R: Float + core::fmt::Debug>(outcome: &CgOutcome<R>, max_iterations: usize, tolerance: R) {
    if outcome.converged {
        tracing::debug!(
            iterations = outcome.iterations,
            residual = ?outcome.achieved_residual,
            "conjugate gradient converged"
        );
    } else {
        tracing::warn!(
            max_iterations,
            tolerance = ?tolerance,
            achieved_residual = ?outcome.achieved_residual,
            "conjugate gradient hit the iteration limit without converging"
        );
    }
}

// ======================================================================================
// ----------------------------------- Unpreconditioned ---------------------------------
// ======================================================================================

/// Solve `A x = rhs` with CG on `H A H⁻¹`.
///
/// # Panics
/// Panics if `op.site_size() != rhs.site_size()`.
#[tracing::instrument(
    level = "debug",
    skip(op, rhs),
    fields(volume = rhs.volume(), site_size = rhs.site_size())
)]
pub fn conjugate_gradient_unprec<T, Op>(
    op: &Op,
    rhs: &Lattice<T>,
    max_iterations: usize,
    tolerance: T::Real,
) -> SolutionWrapper<T>
where
    T: SiteElement,
    Op: LinearOperator<T> + ?Sized,
{
    check_site_size(op, rhs);

    let mut hermitian_rhs = rhs.clone();
    op.apply_hermiticity(&mut hermitian_rhs);

    let mut solution = Lattice::zeros_like(rhs);
    let mut ap = Lattice::zeros_like(rhs);
    let mut work = Lattice::zeros_like(rhs);

    // r = H b − H A H⁻¹ x
    apply_hermitian(op, |op, out, x| op.apply_full(out, x), &mut ap, &solution, &mut work);
    let mut r = hermitian_rhs;
    r -= &ap;
    let mut p = r.clone();

    let mut prev_residual = norm_sqr(r.as_slice());
    let mut outcome = CgOutcome {
        iterations: max_iterations,
        residual: tolerance,
        achieved_residual: prev_residual.sqrt(),
        converged: false,
    };

    if outcome.achieved_residual < tolerance {
        outcome = CgOutcome {
            iterations: 0,
            residual: outcome.achieved_residual,
            achieved_residual: outcome.achieved_residual,
            converged: true,
        };
    } else {
        for i in 0..max_iterations {
            apply_hermitian(op, |op, out, x| op.apply_full(out, x), &mut ap, &p, &mut work);
            let alpha = Complex::new(prev_residual, T::Real::zero()) / dot_fields(p.as_slice(), ap.as_slice());

            solution += &p * alpha;
            r -= &ap * alpha;

            let current_residual = norm_sqr(r.as_slice());
            debug_assert!(
                current_residual >= T::Real::zero(),
                "Re<r, r> must be non-negative for a Hermitian positive operator"
            );
            let norm = current_residual.sqrt();
            outcome.achieved_residual = norm;
            tracing::trace!(iteration = i + 1, residual = ?norm, "cg step");

            if norm < tolerance {
                outcome.iterations = i + 1;
                outcome.residual = norm;
                outcome.converged = true;
                break;
            }

            let beta = current_residual / prev_residual;
            p *= Complex::new(beta, T::Real::zero());
            p += &r;
            prev_residual = current_residual;
        }
    }

    op.remove_hermiticity(&mut solution);
    report(&outcome, max_iterations, tolerance);
    outcome.into_solution(solution)
}

// ======================================================================================
// ------------------------------ Even-odd preconditioned -------------------------------
// ======================================================================================

/// Solve `A x = rhs` with CG on the odd-site Schur complement.
///
/// # Panics
/// Panics if the layout of `rhs` is not even-odd ordered, or on a site-size
/// mismatch.
#[tracing::instrument(
    level = "debug",
    skip(op, rhs),
    fields(volume = rhs.volume(), site_size = rhs.site_size())
)]
pub fn conjugate_gradient_eoprec<T, Op>(
    op: &Op,
    rhs: &Lattice<T>,
    max_iterations: usize,
    tolerance: T::Real,
) -> SolutionWrapper<T>
where
    T: SiteElement,
    Op: LinearOperator<T> + ?Sized,
{
    check_site_size(op, rhs);
    assert_eq!(
        rhs.layout().ordering(),
        SiteOrdering::EvenOdd,
        "even-odd preconditioning needs an even-odd ordered layout"
    );

    // A_ee⁻¹ b_e, kept for the even-site reconstruction.
    let mut even_inv_rhs = Lattice::zeros_like(rhs);
    op.apply_even_even_inv(&mut even_inv_rhs, rhs);

    // b'_o = b_o − A_oe A_ee⁻¹ b_e, then H b'.
    let mut hermitian_rhs = Lattice::zeros_like(rhs);
    {
        let mut coupled = Lattice::zeros_like(rhs);
        op.apply_odd_even(&mut coupled, &even_inv_rhs);
        hermitian_rhs
            .odd_sites_mut()
            .assign(rhs.odd_sites() - coupled.odd_sites());
    }
    op.apply_hermiticity(&mut hermitian_rhs);

    let mut solution = Lattice::zeros_like(rhs);
    let mut ap = Lattice::zeros_like(rhs);
    let mut work = Lattice::zeros_like(rhs);

    // r_o = b'_o − H S H⁻¹ x_o
    apply_hermitian(op, |op, out, x| op.apply_eoprec(out, x), &mut ap, &solution, &mut work);
    let mut r = hermitian_rhs;
    {
        let mut r_odd = r.odd_sites_mut();
        r_odd -= ap.odd_sites();
    }
    let mut p = r.clone();

    let mut prev_residual = norm_sqr(r.odd_sites().as_slice());
    let mut outcome = CgOutcome {
        iterations: max_iterations,
        residual: tolerance,
        achieved_residual: prev_residual.sqrt(),
        converged: false,
    };

    if outcome.achieved_residual < tolerance {
        outcome = CgOutcome {
            iterations: 0,
            residual: outcome.achieved_residual,
            achieved_residual: outcome.achieved_residual,
            converged: true,
        };
    } else {
        for i in 0..max_iterations {
            apply_hermitian(op, |op, out, x| op.apply_eoprec(out, x), &mut ap, &p, &mut work);
            let alpha = Complex::new(prev_residual, T::Real::zero())
                / dot_fields(p.odd_sites().as_slice(), ap.odd_sites().as_slice());

            let mut solution_odd = solution.odd_sites_mut();
            solution_odd += p.odd_sites() * alpha;
            let mut r_odd = r.odd_sites_mut();
            r_odd -= ap.odd_sites() * alpha;

            let current_residual = norm_sqr(r.odd_sites().as_slice());
            debug_assert!(
                current_residual >= T::Real::zero(),
                "Re<r, r> must be non-negative for a Hermitian positive operator"
            );
            let norm = current_residual.sqrt();
            outcome.achieved_residual = norm;
            tracing::trace!(iteration = i + 1, residual = ?norm, "cg step");

            if norm < tolerance {
                outcome.iterations = i + 1;
                outcome.residual = norm;
                outcome.converged = true;
                break;
            }

            let beta = current_residual / prev_residual;
            let mut p_odd = p.odd_sites_mut();
            p_odd *= Complex::new(beta, T::Real::zero());
            p_odd += r.odd_sites();
            prev_residual = current_residual;
        }
    }

    // Odd solution back out of the Hermitian frame; the even half is still zero.
    op.remove_hermiticity(&mut solution);

    // x_e = A_ee⁻¹ b_e − A_ee⁻¹ A_eo x_o
    {
        let mut coupled = Lattice::zeros_like(rhs);
        op.apply_even_odd(&mut coupled, &solution);
        op.apply_even_even_inv(&mut work, &coupled);
        solution
            .even_sites_mut()
            .assign(even_inv_rhs.even_sites() - work.even_sites());
    }

    report(&outcome, max_iterations, tolerance);
    outcome.into_solution(solution)
}

// ======================================================================================
// -------------------------------------- Dispatch --------------------------------------
// ======================================================================================

/// Validate `params` and run the requested CG variant.
///
/// # Errors
/// - `InvalidParameter` for rejected parameters, a tolerance that is not a
///   positive finite `T::Real` after conversion, or even-odd preconditioning on a layout that is not
///   even-odd ordered.
pub fn solve<T, Op>(op: &Op, rhs: &Lattice<T>, params: &SolverParams) -> Result<SolutionWrapper<T>>
where
    T: SiteElement,
    Op: LinearOperator<T> + ?Sized,
{
    params.validate()?;
    // Underflow to zero would make the stopping test unreachable.
    let tolerance = <T::Real as NumCast>::from(params.tolerance)
        .filter(|t| *t > T::Real::zero() && t.is_finite())
        .ok_or_else(|| LatticeError::InvalidParameter {
            name: "tolerance",
            reason: format!("{} is not representable in the field precision", params.tolerance),
        })?;

    match params.preconditioning {
        Preconditioning::None => Ok(conjugate_gradient_unprec(op, rhs, params.max_iterations, tolerance)),
        Preconditioning::EvenOdd => {
            let ordering = rhs.layout().ordering();
            if ordering != SiteOrdering::EvenOdd {
                return Err(LatticeError::InvalidParameter {
                    name: "preconditioning",
                    reason: format!("even_odd needs an even-odd layout; got {ordering:?}"),
                });
            }
            Ok(conjugate_gradient_eoprec(op, rhs, params.max_iterations, tolerance))
        }
    }
}
