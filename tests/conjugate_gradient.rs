// tests/conjugate_gradient.rs
mod common;

use std::sync::Arc;

use common::{direct_solve, max_abs_diff, random_hpd, random_vector, MatrixOperator};
use lattice_core::{
    conjugate_gradient_eoprec, conjugate_gradient_unprec, logging, solve, ColourVector,
    Lattice, LatticeColourVector, LatticeError, Layout, LinearOperator, Preconditioning,
    SolverParams,
};
use num_complex::{Complex32, Complex64};

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn field(layout: &Arc<Layout>, site_size: usize, values: Vec<Complex64>) -> Lattice<Complex64> {
    Lattice::from_vec(layout.clone(), site_size, values).unwrap()
}

fn residual_of(op: &MatrixOperator, x: &Lattice<Complex64>, b: &Lattice<Complex64>) -> f64 {
    let mut ax = Lattice::zeros_like(x);
    op.apply_full(&mut ax, x);
    max_abs_diff(ax.as_slice(), b.as_slice())
}

#[test]
fn eoprec_matches_direct_solve() {
    let _ = logging::init_tracing("lattice_core=debug");

    let layout = Arc::new(Layout::even_odd(&[4]).unwrap());
    let op = MatrixOperator::alternating(&random_hpd(4, 7), 1);
    let b = field(&layout, 1, random_vector(4, 11));

    let result = conjugate_gradient_eoprec(&op, &b, 100, 1e-10);
    assert!(result.converged());
    assert!(result.iterations() >= 1 && result.iterations() <= 4);
    assert!(result.residual() < 1e-10);
    assert_eq!(result.residual(), result.achieved_residual());

    let expected = direct_solve(&op.a, b.as_slice());
    assert!(max_abs_diff(result.solution().as_slice(), &expected) < 1e-8);
    assert!(residual_of(&op, result.solution(), &b) < 1e-8);
}

#[test]
fn unprec_and_eoprec_agree() {
    let layout = Arc::new(Layout::even_odd(&[2, 2]).unwrap());
    let op = MatrixOperator::alternating(&random_hpd(8, 3), 2);
    let b = field(&layout, 2, random_vector(8, 5));

    let full = conjugate_gradient_unprec(&op, &b, 200, 1e-11);
    let schur = conjugate_gradient_eoprec(&op, &b, 200, 1e-11);
    assert!(full.converged() && schur.converged());

    let expected = direct_solve(&op.a, b.as_slice());
    assert!(max_abs_diff(full.solution().as_slice(), &expected) < 1e-8);
    assert!(max_abs_diff(schur.solution().as_slice(), &expected) < 1e-8);
    assert!(max_abs_diff(full.solution().as_slice(), schur.solution().as_slice()) < 1e-8);
}

#[test]
fn unprec_works_on_lexicographic_layouts() {
    let layout = Arc::new(Layout::lexicographic(&[3, 2]).unwrap());
    let op = MatrixOperator::alternating(&random_hpd(6, 21), 1);
    let b = field(&layout, 1, random_vector(6, 22));

    let result = conjugate_gradient_unprec(&op, &b, 100, 1e-12);
    assert!(result.converged());
    assert!(residual_of(&op, result.solution(), &b) < 1e-9);
    assert!(Arc::ptr_eq(result.solution().layout(), &layout));
}

#[test]
fn exhausted_budget_reports_tolerance() {
    let layout = Arc::new(Layout::even_odd(&[8]).unwrap());
    let op = MatrixOperator::alternating(&random_hpd(8, 1), 1);
    let b = field(&layout, 1, random_vector(8, 2));
    let tol = 1e-12;

    for result in [
        conjugate_gradient_unprec(&op, &b, 1, tol),
        conjugate_gradient_eoprec(&op, &b, 1, tol),
    ] {
        assert!(!result.converged());
        assert_eq!(result.iterations(), 1);
        assert_eq!(result.residual(), tol);
        assert!(result.achieved_residual() > tol);
        assert!(result.achieved_residual().is_finite());
    }
}

#[test]
fn unprec_matches_direct_solve_within_dimension() {
    let layout = Arc::new(Layout::lexicographic(&[4]).unwrap());
    for seed in 0..8 {
        let op = MatrixOperator::alternating(&random_hpd(4, 40 + seed), 1);
        let b = field(&layout, 1, random_vector(4, 60 + seed));

        let result = conjugate_gradient_unprec(&op, &b, 100, 1e-10);
        assert!(result.converged());
        assert!(result.iterations() >= 1 && result.iterations() <= 4, "seed {seed}: {}", result.iterations());
        assert_eq!(result.residual(), result.achieved_residual());

        let expected = direct_solve(&op.a, b.as_slice());
        assert!(max_abs_diff(result.solution().as_slice(), &expected) < 1e-8);
    }
}

#[test]
fn identity_solves_in_one_step() {
    let values = vec![c(1.0, 2.0), c(-3.0, 0.5)];
    let op = MatrixOperator::alternating(&common::identity(2), 1);

    let eo = Arc::new(Layout::even_odd(&[2]).unwrap());
    let lex = Arc::new(Layout::lexicographic(&[2]).unwrap());
    let b_eo = field(&eo, 1, values.clone());
    let b_lex = field(&lex, 1, values);

    for (result, b) in [
        (conjugate_gradient_eoprec(&op, &b_eo, 10, 1e-10), &b_eo),
        (conjugate_gradient_unprec(&op, &b_lex, 10, 1e-10), &b_lex),
    ] {
        assert!(result.converged());
        assert_eq!(result.iterations(), 1);
        assert_eq!(result.residual(), 0.0);
        assert_eq!(result.solution().as_slice(), b.as_slice());
    }
}

#[test]
fn zero_rhs_returns_immediately() {
    let layout = Arc::new(Layout::even_odd(&[4]).unwrap());
    let op = MatrixOperator::alternating(&random_hpd(4, 9), 1);
    let b: Lattice<Complex64> = Lattice::zeros(layout, 1);

    for result in [
        conjugate_gradient_unprec(&op, &b, 10, 1e-10),
        conjugate_gradient_eoprec(&op, &b, 10, 1e-10),
    ] {
        assert!(result.converged());
        assert_eq!(result.iterations(), 0);
        assert_eq!(result.residual(), 0.0);
        assert!(result.solution().as_slice().iter().all(|&z| z == c(0.0, 0.0)));
    }
}

#[test]
fn hermiticity_transform_is_undone() {
    // With H ≠ I, a missing H⁻¹ on the result would flip the sign of every
    // odd storage entry.
    let layout = Arc::new(Layout::even_odd(&[4]).unwrap());
    let op = MatrixOperator::new(&random_hpd(4, 13), vec![1.0, -1.0, -1.0, 1.0], 1);
    let b = field(&layout, 1, random_vector(4, 14));

    let mut x = b.clone();
    op.apply_hermiticity(&mut x);
    assert_ne!(x, b);
    op.remove_hermiticity(&mut x);
    assert_eq!(x, b);

    let result = conjugate_gradient_unprec(&op, &b, 50, 1e-12);
    assert!(residual_of(&op, result.solution(), &b) < 1e-9);
    let result = conjugate_gradient_eoprec(&op, &b, 50, 1e-12);
    assert!(residual_of(&op, result.solution(), &b) < 1e-9);
}

#[test]
fn solve_dispatches_and_validates() {
    let eo = Arc::new(Layout::even_odd(&[4]).unwrap());
    let lex = Arc::new(Layout::lexicographic(&[4]).unwrap());
    let op = MatrixOperator::alternating(&random_hpd(4, 17), 1);
    let values = random_vector(4, 18);
    let b_eo = field(&eo, 1, values.clone());
    let b_lex = field(&lex, 1, values);

    let defaults = SolverParams::default();
    let result = solve(&op, &b_eo, &defaults).unwrap();
    assert!(result.converged());
    assert!(residual_of(&op, result.solution(), &b_eo) < 1e-8);

    assert!(matches!(
        solve(&op, &b_lex, &defaults),
        Err(LatticeError::InvalidParameter { name: "preconditioning", .. })
    ));

    let plain = SolverParams { preconditioning: Preconditioning::None, ..defaults };
    let result = solve(&op, &b_lex, &plain).unwrap();
    assert!(result.converged());

    let zero_budget = SolverParams { max_iterations: 0, ..defaults };
    assert!(matches!(
        solve(&op, &b_eo, &zero_budget),
        Err(LatticeError::InvalidParameter { name: "max_iterations", .. })
    ));
    let bad_tol = SolverParams { tolerance: -1.0, ..defaults };
    assert!(matches!(
        solve(&op, &b_eo, &bad_tol),
        Err(LatticeError::InvalidParameter { name: "tolerance", .. })
    ));
}

#[test]
#[should_panic(expected = "even-odd")]
fn eoprec_rejects_lexicographic_layout() {
    let layout = Arc::new(Layout::lexicographic(&[4]).unwrap());
    let op = MatrixOperator::alternating(&random_hpd(4, 1), 1);
    let b = field(&layout, 1, random_vector(4, 1));
    let _ = conjugate_gradient_eoprec(&op, &b, 10, 1e-10);
}

#[test]
fn one_operator_serves_parallel_solves() {
    let layout = Arc::new(Layout::even_odd(&[4]).unwrap());
    let op = MatrixOperator::alternating(&random_hpd(4, 31), 1);
    let sources: Vec<_> = (0..4).map(|seed| field(&layout, 1, random_vector(4, seed))).collect();

    let shared = &op;
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = sources
            .iter()
            .map(|b| s.spawn(move || conjugate_gradient_eoprec(shared, b, 100, 1e-11)))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (b, result) in sources.iter().zip(&results) {
        let serial = conjugate_gradient_eoprec(&op, b, 100, 1e-11);
        assert_eq!(result.solution(), serial.solution());
        assert_eq!(result.iterations(), serial.iterations());
    }
}

// ======================================================================================
// ------------------------------ Colour-vector operator --------------------------------
// ======================================================================================

type Colour = ColourVector<f64, 3>;

/// `A = diag(d)` per stored site, `H = I`.
struct Diagonal {
    d: Vec<f64>,
}

impl Diagonal {
    fn scale(&self, out: &mut Lattice<Colour>, input: &Lattice<Colour>, range: std::ops::Range<usize>, inverse: bool) {
        for (i, v) in out.as_mut_slice().iter_mut().enumerate() {
            *v = if range.contains(&i) {
                let d = if inverse { 1.0 / self.d[i] } else { self.d[i] };
                input[i] * d
            } else {
                Colour::zero()
            };
        }
    }

    fn half(&self) -> usize {
        self.d.len() / 2
    }
}

impl LinearOperator<Colour> for Diagonal {
    fn site_size(&self) -> usize {
        1
    }

    fn apply_full(&self, out: &mut Lattice<Colour>, input: &Lattice<Colour>) {
        self.scale(out, input, 0..self.d.len(), false);
    }

    fn apply_hermiticity(&self, _x: &mut Lattice<Colour>) {}

    fn remove_hermiticity(&self, _x: &mut Lattice<Colour>) {}

    fn apply_eoprec(&self, out: &mut Lattice<Colour>, input: &Lattice<Colour>) {
        self.scale(out, input, self.half()..self.d.len(), false);
    }

    fn apply_even_even_inv(&self, out: &mut Lattice<Colour>, input: &Lattice<Colour>) {
        self.scale(out, input, 0..self.half(), true);
    }

    fn apply_odd_even(&self, out: &mut Lattice<Colour>, _input: &Lattice<Colour>) {
        out.par_fill(Colour::zero());
    }

    fn apply_even_odd(&self, out: &mut Lattice<Colour>, _input: &Lattice<Colour>) {
        out.par_fill(Colour::zero());
    }
}

#[test]
fn colour_vector_fields_solve() {
    let layout = Arc::new(Layout::even_odd(&[4, 2]).unwrap());
    let op = Diagonal { d: (0..8).map(|i| 1.0 + i as f64 * 0.5).collect() };
    let values: Vec<Colour> = (0..8)
        .map(|i| Colour::new([c(i as f64, 1.0), c(-1.0, i as f64), c(0.5, -0.5)]))
        .collect();
    let b: LatticeColourVector<f64, 3> = Lattice::from_vec(layout, 1, values).unwrap();

    let params = SolverParams { tolerance: 1e-12, ..SolverParams::default() };
    let result = solve(&op, &b, &params).unwrap();
    assert!(result.converged());
    assert!(result.iterations() <= 6);
    for (i, x) in result.solution().as_slice().iter().enumerate() {
        let diff = (*x * op.d[i] - b[i]).norm_sqr();
        assert!(diff < 1e-20, "site {i}: {diff}");
    }
}

// ======================================================================================
// -------------------------------- Single precision ------------------------------------
// ======================================================================================

/// `A = I`, `H = I` on single-precision complex fields.
struct Identity32;

impl Identity32 {
    fn copy_range(out: &mut Lattice<Complex32>, input: &Lattice<Complex32>, range: std::ops::Range<usize>) {
        for (i, v) in out.as_mut_slice().iter_mut().enumerate() {
            *v = if range.contains(&i) { input[i] } else { Complex32::new(0.0, 0.0) };
        }
    }
}

impl LinearOperator<Complex32> for Identity32 {
    fn site_size(&self) -> usize {
        1
    }

    fn apply_full(&self, out: &mut Lattice<Complex32>, input: &Lattice<Complex32>) {
        out.copy_from(input);
    }

    fn apply_hermiticity(&self, _x: &mut Lattice<Complex32>) {}

    fn remove_hermiticity(&self, _x: &mut Lattice<Complex32>) {}

    fn apply_eoprec(&self, out: &mut Lattice<Complex32>, input: &Lattice<Complex32>) {
        let half = input.len() / 2;
        Self::copy_range(out, input, half..input.len());
    }

    fn apply_even_even_inv(&self, out: &mut Lattice<Complex32>, input: &Lattice<Complex32>) {
        Self::copy_range(out, input, 0..input.len() / 2);
    }

    fn apply_odd_even(&self, out: &mut Lattice<Complex32>, _input: &Lattice<Complex32>) {
        out.par_fill(Complex32::new(0.0, 0.0));
    }

    fn apply_even_odd(&self, out: &mut Lattice<Complex32>, _input: &Lattice<Complex32>) {
        out.par_fill(Complex32::new(0.0, 0.0));
    }
}

#[test]
fn tolerance_must_survive_precision_conversion() {
    let layout = Arc::new(Layout::even_odd(&[4]).unwrap());
    let b = Lattice::new(layout, Complex32::new(1.0, -1.0));

    let params = SolverParams { tolerance: 1e-5, ..SolverParams::default() };
    let result = solve(&Identity32, &b, &params).unwrap();
    assert!(result.converged());
    assert_eq!(result.solution(), &b);

    // Valid as f64, zero once narrowed to f32.
    let underflow = SolverParams { tolerance: 1e-50, ..SolverParams::default() };
    assert!(underflow.validate().is_ok());
    assert!(matches!(
        solve(&Identity32, &b, &underflow),
        Err(LatticeError::InvalidParameter { name: "tolerance", .. })
    ));
}
