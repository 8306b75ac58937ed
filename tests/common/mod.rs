// tests/common/mod.rs
//! Reference operators for the solver tests.
#![allow(dead_code)]

use lattice_core::{Lattice, LinearOperator, SiteElement};
use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub type Matrix = Vec<Vec<Complex64>>;

// ======================================================================================
// --------------------------------- Dense linear algebra -------------------------------
// ======================================================================================

pub fn identity(n: usize) -> Matrix {
    let mut m = vec![vec![Complex64::new(0.0, 0.0); n]; n];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = Complex64::new(1.0, 0.0);
    }
    m
}

pub fn mat_vec(a: &Matrix, x: &[Complex64]) -> Vec<Complex64> {
    a.iter()
        .map(|row| row.iter().zip(x).map(|(aij, xj)| aij * xj).sum())
        .collect()
}

/// Random Hermitian positive-definite matrix `BᴴB + n·I`.
pub fn random_hpd(n: usize, seed: u64) -> Matrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let b: Matrix = (0..n)
        .map(|_| {
            (0..n)
                .map(|_| Complex64::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)))
                .collect()
        })
        .collect();
    let mut m = vec![vec![Complex64::new(0.0, 0.0); n]; n];
    for i in 0..n {
        for j in 0..n {
            let mut acc = Complex64::new(0.0, 0.0);
            for k in 0..n {
                acc += b[k][i].conj() * b[k][j];
            }
            m[i][j] = acc;
        }
        m[i][i] += Complex64::new(n as f64, 0.0);
    }
    m
}

pub fn random_vector(n: usize, seed: u64) -> Vec<Complex64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| Complex64::new(rng.random_range(-1.0..1.0), rng.random_range(-1.0..1.0)))
        .collect()
}

/// Gauss-Jordan inverse with partial pivoting.
pub fn invert(a: &Matrix) -> Matrix {
    let n = a.len();
    let mut m = a.clone();
    let mut inv = identity(n);
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| m[i][col].norm().total_cmp(&m[j][col].norm()))
            .unwrap();
        m.swap(col, pivot);
        inv.swap(col, pivot);
        let d = m[col][col];
        assert!(d.norm() > 1e-14, "singular matrix");
        for k in 0..n {
            m[col][k] /= d;
            inv[col][k] /= d;
        }
        for row in 0..n {
            if row != col {
                let f = m[row][col];
                if f != Complex64::new(0.0, 0.0) {
                    for k in 0..n {
                        let mk = m[col][k];
                        let ik = inv[col][k];
                        m[row][k] -= f * mk;
                        inv[row][k] -= f * ik;
                    }
                }
            }
        }
    }
    inv
}

/// `x = A⁻¹ b`.
pub fn direct_solve(a: &Matrix, b: &[Complex64]) -> Vec<Complex64> {
    mat_vec(&invert(a), b)
}

fn block(a: &Matrix, rows: std::ops::Range<usize>, cols: std::ops::Range<usize>) -> Matrix {
    a[rows].iter().map(|row| row[cols.clone()].to_vec()).collect()
}

// ======================================================================================
// ------------------------------------ MatrixOperator ----------------------------------
// ======================================================================================

/// Dense operator on the flat storage vector of a lattice.
///
/// `A = H M H` with `H = diag(signs)`, `signs[i] = ±1`; with `M` Hermitian
/// positive definite, `H A H⁻¹ = M` is too. Even/odd blocks are the first and
/// second halves of the storage vector.
pub struct MatrixOperator {
    pub a: Matrix,
    pub signs: Vec<f64>,
    pub site_size: usize,
    half: usize,
    a_ee_inv: Matrix,
    a_eo: Matrix,
    a_oe: Matrix,
    a_oo: Matrix,
}

impl MatrixOperator {
    pub fn new(m: &Matrix, signs: Vec<f64>, site_size: usize) -> Self {
        let n = m.len();
        assert_eq!(signs.len(), n);
        let a: Matrix = (0..n)
            .map(|i| (0..n).map(|j| m[i][j] * signs[i] * signs[j]).collect())
            .collect();
        let half = n / 2;
        Self {
            a_ee_inv: invert(&block(&a, 0..half, 0..half)),
            a_eo: block(&a, 0..half, half..n),
            a_oe: block(&a, half..n, 0..half),
            a_oo: block(&a, half..n, half..n),
            a,
            signs,
            site_size,
            half,
        }
    }

    /// Alternating `+1, -1, ...` signs.
    pub fn alternating(m: &Matrix, site_size: usize) -> Self {
        let signs = (0..m.len()).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        Self::new(m, signs, site_size)
    }

    fn write(out: &mut Lattice<Complex64>, even: Option<Vec<Complex64>>, odd: Option<Vec<Complex64>>) {
        let half = out.len() / 2;
        let data = out.as_mut_slice();
        let zero = Complex64::zeroed();
        match even {
            Some(v) => data[..half].copy_from_slice(&v),
            None => data[..half].fill(zero),
        }
        match odd {
            Some(v) => data[half..].copy_from_slice(&v),
            None => data[half..].fill(zero),
        }
    }
}

impl LinearOperator<Complex64> for MatrixOperator {
    fn site_size(&self) -> usize {
        self.site_size
    }

    fn apply_full(&self, out: &mut Lattice<Complex64>, input: &Lattice<Complex64>) {
        let y = mat_vec(&self.a, input.as_slice());
        out.as_mut_slice().copy_from_slice(&y);
    }

    fn apply_hermiticity(&self, x: &mut Lattice<Complex64>) {
        for (v, s) in x.as_mut_slice().iter_mut().zip(&self.signs) {
            *v *= *s;
        }
    }

    fn remove_hermiticity(&self, x: &mut Lattice<Complex64>) {
        self.apply_hermiticity(x);
    }

    fn apply_eoprec(&self, out: &mut Lattice<Complex64>, input: &Lattice<Complex64>) {
        let x_o = &input.as_slice()[self.half..];
        let coupled = mat_vec(&self.a_oe, &mat_vec(&self.a_ee_inv, &mat_vec(&self.a_eo, x_o)));
        let diag = mat_vec(&self.a_oo, x_o);
        let y: Vec<Complex64> = diag.iter().zip(&coupled).map(|(d, c)| d - c).collect();
        Self::write(out, None, Some(y));
    }

    fn apply_even_even_inv(&self, out: &mut Lattice<Complex64>, input: &Lattice<Complex64>) {
        let y = mat_vec(&self.a_ee_inv, &input.as_slice()[..self.half]);
        Self::write(out, Some(y), None);
    }

    fn apply_odd_even(&self, out: &mut Lattice<Complex64>, input: &Lattice<Complex64>) {
        let y = mat_vec(&self.a_oe, &input.as_slice()[..self.half]);
        Self::write(out, None, Some(y));
    }

    fn apply_even_odd(&self, out: &mut Lattice<Complex64>, input: &Lattice<Complex64>) {
        let y = mat_vec(&self.a_eo, &input.as_slice()[self.half..]);
        Self::write(out, Some(y), None);
    }
}

pub fn max_abs_diff(a: &[Complex64], b: &[Complex64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x - y).norm()).fold(0.0, f64::max)
}
