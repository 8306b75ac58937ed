// src/lib.rs
/*!
Numerical core of a lattice-field toolkit.

- `space::layout`: coordinate ↔ storage bijection, lexicographic or even-odd.
- `math::array` / `math::expr`: flat arrays with lazy elementwise arithmetic.
- `space::lattice`: fields bound to a shared layout, with aliasing site views.
- `solver`: conjugate gradient, plain and even-odd preconditioned, against the
  `LinearOperator` contract.
*/

pub mod config;
pub mod error;
pub mod logging;
pub mod math;
pub mod solver;
pub mod space;

pub use config::{Preconditioning, SolverParams};
pub use error::{LatticeError, Result};
pub use math::array::Array;
pub use math::colour::{ColourMatrix, ColourVector};
pub use math::element::SiteElement;
pub use math::expr::{ArrayExpr, Expr};
pub use math::scalar::Real;
pub use solver::conjugate_gradient::{conjugate_gradient_eoprec, conjugate_gradient_unprec, solve};
pub use solver::linear_algebra::{dot_fields, norm_sqr};
pub use solver::operator::LinearOperator;
pub use solver::solution::SolutionWrapper;
pub use space::lattice::{Lattice, LatticeView, LatticeViewMut};
pub use space::layout::{Layout, LayoutSpec, Parity, Site, SiteOrdering};
pub use space::Space;

/// A lattice of `N×N` link matrices; add a trailing direction axis to the
/// layout shape for one link per site and direction.
pub type GaugeField<R, const N: usize> = Lattice<ColourMatrix<R, N>>;

/// A lattice of colour vectors; spin components are the site size.
pub type LatticeColourVector<R, const N: usize> = Lattice<ColourVector<R, N>>;
