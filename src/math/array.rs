// src/math/array.rs
/*!
A resizable, homogeneous array backed by a flat `Vec<T>`: the storage underneath
every `Lattice`.

- Arithmetic on `&Array<T>` is lazy (see `math::expr`); nothing is computed until
  `assign` or `from_expr`.
- `assign` resizes the destination to the expression length, then writes every
  element once.
- Compound assignment (`+= -= *= /=`) runs in place, element by element.
- All whole-array loops are data-parallel (`rayon`).
*/

use core::ops::{Index, IndexMut};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::expr::{
    impl_compound_assign, impl_expr_operators, materialize, par_write, ArrayExpr, AssignTarget,
};
use crate::space::layout::Layout;

//===================================================================
// -------------------------- Basic Struct --------------------------
//===================================================================

/// Flat element storage with lazy arithmetic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Array<T> {
    data: Vec<T>,
}

impl<T> Array<T> {
    /// Empty array.
    #[inline]
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    #[inline]
    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.data.iter()
    }
}

impl<T: Copy + Send + Sync> Array<T> {
    /// `len` copies of `value`.
    #[inline]
    pub fn filled(len: usize, value: T) -> Self {
        Self { data: vec![value; len] }
    }

    #[inline]
    pub fn from_vec(data: Vec<T>) -> Self {
        Self { data }
    }

    /// Materialize an expression into a new array.
    #[inline]
    pub fn from_expr<E: ArrayExpr<Elem = T>>(expr: E) -> Self {
        Self { data: materialize(&expr) }
    }

    /// Grow (with `value`) or shrink to `len`.
    #[inline]
    pub fn resize(&mut self, len: usize, value: T) {
        self.data.resize(len, value);
    }

    /// `self = expr`, resizing to the expression length.
    ///
    /// Equal lengths write in place; otherwise the storage is replaced by a
    /// freshly materialized buffer.
    pub fn assign<E: ArrayExpr<Elem = T>>(&mut self, expr: E) {
        if self.data.len() == expr.size() {
            par_write(&mut self.data, &expr);
        } else {
            self.data = materialize(&expr);
        }
    }

    /// Parallel fill with a constant value.
    #[inline]
    pub fn par_fill(&mut self, value: T) {
        self.data.par_iter_mut().for_each(|x| *x = value);
    }

    /// Parallel in-place map with a pure function.
    #[inline]
    pub fn par_map_in_place<F>(&mut self, f: F)
    where
        F: Fn(T) -> T + Sync + Send,
    {
        self.data.par_iter_mut().for_each(|x| *x = f(*x));
    }
}

//===================================================================
// ----------------------------- Indexing ---------------------------
//===================================================================

impl<T> Index<usize> for Array<T> {
    type Output = T;

    #[inline(always)]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T> IndexMut<usize> for Array<T> {
    #[inline(always)]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

impl<T: Copy + Send + Sync> From<Vec<T>> for Array<T> {
    #[inline]
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

//===================================================================
// ---------------------------- Arithmetic --------------------------
//===================================================================

impl<'a, T: Copy + Send + Sync> ArrayExpr for &'a Array<T> {
    type Elem = T;

    #[inline(always)]
    fn size(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    fn eval(&self, i: usize) -> T {
        self.data[i]
    }

    #[inline(always)]
    fn layout(&self) -> Option<&Arc<Layout>> {
        None
    }
}

impl_expr_operators!(['a, T] &'a Array<T>);
impl_compound_assign!([T] Array<T>, T);

impl<T> AssignTarget for Array<T> {
    type Elem = T;

    #[inline(always)]
    fn target_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}
