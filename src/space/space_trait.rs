// src/space/space_trait.rs
use crate::error::Result;

// ======================================================================================
/*                                   Space Trait                                       */
// ======================================================================================
/*
Coordinate-addressed storage shared by every lattice-shaped container.

- A site holds `site_size()` contiguous values.
- Coordinates are `isize`; out-of-range components are errors. Call
  `Layout::sanitise_site_coords` first for periodic wrap.
*/
pub trait Space<T> {
    /// Borrow the backing slice (array order).
    fn data(&self) -> &[T];
    /// Extents per axis.
    fn shape(&self) -> &[usize];
    /// Number of sites.
    fn volume(&self) -> usize;

    /// Values of the site at `coord`.
    fn site(&self, coord: &[isize]) -> Result<&[T]>;
    /// Mutable values of the site at `coord`.
    fn site_mut(&mut self, coord: &[isize]) -> Result<&mut [T]>;
    /// Overwrite the site at `coord`; `vals.len()` must equal the site size.
    fn set_site(&mut self, coord: &[isize], vals: &[T]) -> Result<()>;

    /// Fill every value (parallel).
    fn set_all(&mut self, val: T);
}
