// src/space/lattice.rs
/*!
A field over a lattice: an [`Array`] bound to a shared [`Layout`].

# Storage

- `site_size` values per site (spin/colour components), contiguous.
- Site at array index `a` occupies `[a * site_size, (a + 1) * site_size)`.
- `len() == volume() * site_size()` always.

# Assignment

- `assign(expr)` writes an expression of the same length. When the expression
  is bound to a *different* layout of the same geometry, values are matched by
  physical site, not by storage position: destination array index `j` receives
  the source's value for site `layout.get_site_index(j)`.
- `copy_from(&other)` is the lattice-to-lattice form of the same rule.
- Arithmetic on `&Lattice<T>` is lazy and carries the layout, so
  `Lattice::from_expr(&a + &b)` recovers it without being told.

# Views

`segment`, `even_sites`, `odd_sites` (and their `_mut` forms) borrow a
contiguous range of *sites* of the same storage. A mutable view writes straight
into the parent. With an even-odd layout the first half is the even checkerboard
and the second half the odd one.
*/

use core::ops::{Index, IndexMut};
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{LatticeError, Result};
use crate::math::array::Array;
use crate::math::element::SiteElement;
use crate::math::expr::{
    impl_compound_assign, impl_expr_operators, materialize, par_write, ArrayExpr,
    AssignTarget,
};
use crate::space::layout::Layout;
use crate::space::space_trait::Space;

// ======================================================================================
// ------------------------------------- Lattice ----------------------------------------
// ======================================================================================

/// A field of `T` values over a shared layout.
///
/// # Invariants
/// - `data.len() == layout.volume() * site_size`, `site_size > 0`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lattice<T> {
    layout: Arc<Layout>,
    site_size: usize,
    data: Array<T>,
}

impl<T: Copy + Send + Sync> Lattice<T> {
    /// Every value set to `value`.
    ///
    /// # Panics
    /// Panics if `site_size == 0`.
    #[inline]
    pub fn filled(layout: Arc<Layout>, value: T, site_size: usize) -> Self {
        assert!(site_size > 0, "site_size must be > 0");
        let len = layout.volume() * site_size;
        Self { layout, site_size, data: Array::filled(len, value) }
    }

    /// One value per site, set to `value`.
    #[inline]
    pub fn new(layout: Arc<Layout>, value: T) -> Self {
        Self::filled(layout, value, 1)
    }

    /// Wrap existing storage (array order).
    ///
    /// # Errors
    /// `SizeMismatch` if `data.len() != volume * site_size`;
    /// `InvalidParameter` if `site_size == 0`.
    pub fn from_vec(layout: Arc<Layout>, site_size: usize, data: Vec<T>) -> Result<Self> {
        if site_size == 0 {
            return Err(LatticeError::InvalidParameter {
                name: "site_size",
                reason: "must be > 0".into(),
            });
        }
        let expected = layout.volume() * site_size;
        if data.len() != expected {
            return Err(LatticeError::SizeMismatch { expected, got: data.len() });
        }
        Ok(Self { layout, site_size, data: Array::from_vec(data) })
    }

    /// Materialize an expression, recovering the layout from its lattice operands.
    ///
    /// The site size is `expr.size() / volume`.
    ///
    /// # Errors
    /// - `MissingLayout` if no operand is a full lattice.
    /// - `IncompatibleLength` if the length is not a positive multiple of the volume.
    pub fn from_expr<E: ArrayExpr<Elem = T>>(expr: E) -> Result<Self> {
        let layout = expr.layout().cloned().ok_or(LatticeError::MissingLayout)?;
        let len = expr.size();
        let volume = layout.volume();
        if len == 0 || len % volume != 0 {
            return Err(LatticeError::IncompatibleLength { len, volume });
        }
        Ok(Self {
            layout,
            site_size: len / volume,
            data: Array::from_vec(materialize(&expr)),
        })
    }

    // --- Assignment ----------------------------------------------------------

    /// `self = expr`.
    ///
    /// # Errors
    /// `SizeMismatch` if `expr.size() != len()`.
    ///
    /// # Panics
    /// Panics if the expression is bound to a layout of a different geometry.
    pub fn try_assign<E: ArrayExpr<Elem = T>>(&mut self, expr: E) -> Result<()> {
        if expr.size() != self.len() {
            return Err(LatticeError::SizeMismatch { expected: self.len(), got: expr.size() });
        }
        match expr.layout() {
            Some(src) if !Arc::ptr_eq(src, &self.layout) && **src != *self.layout => {
                let src = Arc::clone(src);
                self.write_remapped(&expr, &src);
            }
            _ => par_write(self.data.as_mut_slice(), &expr),
        }
        Ok(())
    }

    /// `self = expr`; a length mismatch is fatal.
    #[inline]
    pub fn assign<E: ArrayExpr<Elem = T>>(&mut self, expr: E) {
        if let Err(e) = self.try_assign(expr) {
            panic!("lattice assignment failed: {e}");
        }
    }

    /// Site-by-site copy from a lattice that may use a different ordering.
    ///
    /// # Panics
    /// Panics if volumes or site sizes differ.
    pub fn copy_from(&mut self, other: &Lattice<T>) {
        assert_eq!(
            self.volume(),
            other.volume(),
            "copy_from: volume mismatch ({} vs {})",
            self.volume(),
            other.volume()
        );
        assert_eq!(
            self.site_size, other.site_size,
            "copy_from: site size mismatch"
        );
        if Arc::ptr_eq(&self.layout, &other.layout) || *self.layout == *other.layout {
            self.data.as_mut_slice().copy_from_slice(other.as_slice());
        } else {
            let src = Arc::clone(&other.layout);
            self.write_remapped(&other, &src);
        }
    }

    /// Destination array index `j` takes the source value of site `get_site_index(j)`.
    fn write_remapped<E: ArrayExpr<Elem = T>>(&mut self, expr: &E, src: &Layout) {
        assert_eq!(
            self.layout.volume(),
            src.volume(),
            "cannot re-index between layouts of different volume"
        );
        let dst = &self.layout;
        let site_size = self.site_size;
        self.data
            .as_mut_slice()
            .par_chunks_mut(site_size)
            .enumerate()
            .for_each(|(j, chunk)| {
                let site = dst.site_index_unchecked(j);
                let base = src.array_index_unchecked(site) * site_size;
                for (k, x) in chunk.iter_mut().enumerate() {
                    *x = expr.eval(base + k);
                }
            });
    }

    /// Parallel fill with a constant value.
    #[inline]
    pub fn par_fill(&mut self, value: T) {
        self.data.par_fill(value);
    }
}

impl<T: SiteElement> Lattice<T> {
    /// Zero field with `site_size` values per site.
    #[inline]
    pub fn zeros(layout: Arc<Layout>, site_size: usize) -> Self {
        Self::filled(layout, T::zeroed(), site_size)
    }

    /// A zero field on the same layout with the same site size.
    #[inline]
    pub fn zeros_like(other: &Lattice<T>) -> Self {
        Self::zeros(Arc::clone(&other.layout), other.site_size)
    }
}

impl<T> Lattice<T> {
    #[inline(always)]
    pub fn volume(&self) -> usize {
        self.layout.volume()
    }

    #[inline(always)]
    pub fn num_dims(&self) -> usize {
        self.layout.num_dims()
    }

    /// Shared geometry.
    #[inline(always)]
    pub fn layout(&self) -> &Arc<Layout> {
        &self.layout
    }

    #[inline(always)]
    pub fn site_size(&self) -> usize {
        self.site_size
    }

    /// Number of stored values (`volume * site_size`).
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
        self.data.as_slice()
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data.as_mut_slice()
    }

    #[inline]
    pub fn into_array(self) -> Array<T> {
        self.data
    }

    // --- Site access ---------------------------------------------------------

    #[inline(always)]
    fn site_range(&self, array_index: usize) -> core::ops::Range<usize> {
        array_index * self.site_size..(array_index + 1) * self.site_size
    }

    /// Values of the site at lexicographic index `site_index`.
    #[inline]
    pub fn site_by_index(&self, site_index: usize) -> Result<&[T]> {
        let a = self.layout.get_array_index(site_index)?;
        let r = self.site_range(a);
        Ok(&self.data.as_slice()[r])
    }

    #[inline]
    pub fn site_by_index_mut(&mut self, site_index: usize) -> Result<&mut [T]> {
        let a = self.layout.get_array_index(site_index)?;
        let r = self.site_range(a);
        Ok(&mut self.data.as_mut_slice()[r])
    }

    // --- Views ---------------------------------------------------------------

    #[inline(always)]
    fn check_segment(&self, start: usize, num_sites: usize) {
        assert!(
            start + num_sites <= self.volume(),
            "segment [{start}, {}) exceeds volume {}",
            start + num_sites,
            self.volume()
        );
    }

    /// Read-only view of sites (array order) `[start, start + num_sites)`.
    ///
    /// # Panics
    /// Panics if the range exceeds the volume.
    #[inline]
    pub fn segment(&self, start: usize, num_sites: usize) -> LatticeView<'_, T> {
        self.check_segment(start, num_sites);
        let ss = self.site_size;
        LatticeView {
            data: &self.data.as_slice()[start * ss..(start + num_sites) * ss],
            site_offset: start,
            site_size: ss,
        }
    }

    /// Mutable view of sites (array order) `[start, start + num_sites)`.
    #[inline]
    pub fn segment_mut(&mut self, start: usize, num_sites: usize) -> LatticeViewMut<'_, T> {
        self.check_segment(start, num_sites);
        let ss = self.site_size;
        LatticeViewMut {
            data: &mut self.data.as_mut_slice()[start * ss..(start + num_sites) * ss],
            site_offset: start,
            site_size: ss,
        }
    }

    /// Sites `[0, volume/2)`.
    #[inline]
    pub fn even_sites(&self) -> LatticeView<'_, T> {
        self.segment(0, self.layout.half_volume())
    }

    /// Sites `[volume/2, volume)`.
    #[inline]
    pub fn odd_sites(&self) -> LatticeView<'_, T> {
        let half = self.layout.half_volume();
        self.segment(half, self.volume() - half)
    }

    #[inline]
    pub fn even_sites_mut(&mut self) -> LatticeViewMut<'_, T> {
        let half = self.layout.half_volume();
        self.segment_mut(0, half)
    }

    #[inline]
    pub fn odd_sites_mut(&mut self) -> LatticeViewMut<'_, T> {
        let half = self.layout.half_volume();
        let n = self.volume() - half;
        self.segment_mut(half, n)
    }

    /// Both checkerboard halves at once.
    #[inline]
    pub fn split_even_odd_mut(&mut self) -> (LatticeViewMut<'_, T>, LatticeViewMut<'_, T>) {
        let half = self.layout.half_volume();
        let ss = self.site_size;
        let (even, odd) = self.data.as_mut_slice().split_at_mut(half * ss);
        (
            LatticeViewMut { data: even, site_offset: 0, site_size: ss },
            LatticeViewMut { data: odd, site_offset: half, site_size: ss },
        )
    }
}

impl<T> Index<usize> for Lattice<T> {
    type Output = T;

    /// Raw storage position.
    #[inline(always)]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T> IndexMut<usize> for Lattice<T> {
    #[inline(always)]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

// ======================================================================================
// -------------------------------------- Space -----------------------------------------
// ======================================================================================

impl<T: Copy + Send + Sync> Space<T> for Lattice<T> {
    #[inline]
    fn data(&self) -> &[T] {
        self.as_slice()
    }

    #[inline]
    fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    #[inline]
    fn volume(&self) -> usize {
        self.layout.volume()
    }

    #[inline]
    fn site(&self, coord: &[isize]) -> Result<&[T]> {
        let a = self.layout.get_array_index_of(coord)?;
        let r = self.site_range(a);
        Ok(&self.data.as_slice()[r])
    }

    #[inline]
    fn site_mut(&mut self, coord: &[isize]) -> Result<&mut [T]> {
        let a = self.layout.get_array_index_of(coord)?;
        let r = self.site_range(a);
        Ok(&mut self.data.as_mut_slice()[r])
    }

    fn set_site(&mut self, coord: &[isize], vals: &[T]) -> Result<()> {
        let site_size = self.site_size;
        if vals.len() != site_size {
            return Err(LatticeError::SizeMismatch { expected: site_size, got: vals.len() });
        }
        self.site_mut(coord)?.copy_from_slice(vals);
        Ok(())
    }

    #[inline]
    fn set_all(&mut self, val: T) {
        self.data.par_fill(val);
    }
}

// ======================================================================================
// -------------------------------------- Views -----------------------------------------
// ======================================================================================

/// Read-only window over a contiguous range of sites of a lattice.
#[derive(Debug)]
pub struct LatticeView<'a, T> {
    data: &'a [T],
    site_offset: usize,
    site_size: usize,
}

impl<T> Clone for LatticeView<'_, T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for LatticeView<'_, T> {}

impl<'a, T> LatticeView<'a, T> {
    /// Number of values in the view.
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline(always)]
    pub fn num_sites(&self) -> usize {
        self.data.len() / self.site_size
    }

    /// First parent array index covered by the view.
    #[inline(always)]
    pub fn site_offset(&self) -> usize {
        self.site_offset
    }

    #[inline(always)]
    pub fn site_size(&self) -> usize {
        self.site_size
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }
}

impl<T> Index<usize> for LatticeView<'_, T> {
    type Output = T;

    #[inline(always)]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

/// Mutable window over a contiguous range of sites; writes land in the parent.
#[derive(Debug)]
pub struct LatticeViewMut<'a, T> {
    data: &'a mut [T],
    site_offset: usize,
    site_size: usize,
}

impl<'a, T> LatticeViewMut<'a, T> {
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline(always)]
    pub fn num_sites(&self) -> usize {
        self.data.len() / self.site_size
    }

    #[inline(always)]
    pub fn site_offset(&self) -> usize {
        self.site_offset
    }

    #[inline(always)]
    pub fn site_size(&self) -> usize {
        self.site_size
    }

    #[inline(always)]
    pub fn as_slice(&self) -> &[T] {
        &*self.data
    }

    #[inline(always)]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut *self.data
    }

    /// Reborrow as a read-only view.
    #[inline]
    pub fn as_view(&self) -> LatticeView<'_, T> {
        LatticeView { data: &*self.data, site_offset: self.site_offset, site_size: self.site_size }
    }
}

impl<T: Copy + Send + Sync> LatticeViewMut<'_, T> {
    /// `view = expr`, positional.
    ///
    /// # Errors
    /// `SizeMismatch` if `expr.size() != len()`.
    pub fn try_assign<E: ArrayExpr<Elem = T>>(&mut self, expr: E) -> Result<()> {
        if expr.size() != self.data.len() {
            return Err(LatticeError::SizeMismatch { expected: self.data.len(), got: expr.size() });
        }
        par_write(&mut *self.data, &expr);
        Ok(())
    }

    /// `view = expr`; a length mismatch is fatal.
    #[inline]
    pub fn assign<E: ArrayExpr<Elem = T>>(&mut self, expr: E) {
        if let Err(e) = self.try_assign(expr) {
            panic!("view assignment failed: {e}");
        }
    }

    #[inline]
    pub fn par_fill(&mut self, value: T) {
        self.data.par_iter_mut().for_each(|x| *x = value);
    }
}

impl<T> Index<usize> for LatticeViewMut<'_, T> {
    type Output = T;

    #[inline(always)]
    fn index(&self, i: usize) -> &T {
        &self.data[i]
    }
}

impl<T> IndexMut<usize> for LatticeViewMut<'_, T> {
    #[inline(always)]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.data[i]
    }
}

// ======================================================================================
// ------------------------------- Expression Leaves ------------------------------------
// ======================================================================================

impl<'a, T: Copy + Send + Sync> ArrayExpr for &'a Lattice<T> {
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
        Some(&self.layout)
    }
}

impl<'a, T: Copy + Send + Sync> ArrayExpr for LatticeView<'a, T> {
    type Elem = T;

    #[inline(always)]
    fn size(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    fn eval(&self, i: usize) -> T {
        self.data[i]
    }
}

impl<'b, 'a, T: Copy + Send + Sync> ArrayExpr for &'b LatticeViewMut<'a, T> {
    type Elem = T;

    #[inline(always)]
    fn size(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    fn eval(&self, i: usize) -> T {
        self.data[i]
    }
}

impl_expr_operators!(['a, T] &'a Lattice<T>);
impl_expr_operators!(['a, T] LatticeView<'a, T>);
impl_expr_operators!(['b, 'a, T] &'b LatticeViewMut<'a, T>);

impl<T> AssignTarget for Lattice<T> {
    type Elem = T;

    #[inline(always)]
    fn target_layout(&self) -> Option<&Arc<Layout>> {
        Some(&self.layout)
    }

    #[inline(always)]
    fn target_slice(&mut self) -> &mut [T] {
        self.data.as_mut_slice()
    }
}

impl<T> AssignTarget for LatticeViewMut<'_, T> {
    type Elem = T;

    #[inline(always)]
    fn target_slice(&mut self) -> &mut [T] {
        &mut *self.data
    }
}

impl_compound_assign!([T] Lattice<T>, T);
impl_compound_assign!(['a, T] LatticeViewMut<'a, T>, T);
