// src/space/layout.rs
/*!
Lattice geometry: the bijection between site coordinates and storage positions.

Three index spaces are involved:

- **coordinates** (`Site`): one `isize` per axis, valid range `[0, extent)`;
- **lexicographic site index**: row-major position of a coordinate
  (last axis fastest), `((c0 * n1 + c1) * n2 + c2) ...`;
- **array index**: where the site actually lives in a field's storage.

The mapping between the last two is fixed by a [`SiteOrdering`]:

- `Lexicographic`: array index == site index.
- `EvenOdd`: every even-parity site (sum of coordinates even) comes first, in
  lexicographic order, then every odd-parity site. Array indices `[0, V/2)` are
  the even sites and `[V/2, V)` the odd sites, which is the split the even-odd
  preconditioned solver works on.

Both directions are precomputed tables, so every lookup is O(1) (plus O(rank)
for coordinates). A `Layout` is immutable once built and is shared between
lattices as `Arc<Layout>`.

Lookups never wrap silently: a coordinate outside `[0, extent)` is an error
unless it was passed through [`Layout::sanitise_site_coords`] first, which
applies the periodic boundary (Euclidean modulo per axis).
*/

use serde::{Deserialize, Serialize};

use crate::error::{LatticeError, Result};

/// A lattice coordinate, one component per axis.
pub type Site = Vec<isize>;

// ======================================================================================
// ------------------------------------ Orderings ---------------------------------------
// ======================================================================================

/// Storage order of sites within a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiteOrdering {
    /// Array index equals the lexicographic site index.
    #[default]
    Lexicographic,
    /// Even-parity sites first, then odd-parity sites; each half lexicographic.
    EvenOdd,
}

/// Checkerboard colour of a site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parity {
    Even,
    Odd,
}

// ======================================================================================
// ------------------------------------- Layout -----------------------------------------
// ======================================================================================

/**
Immutable lattice geometry with precomputed site ↔ array tables.

# Invariants
- `shape` is non-empty with positive extents; `volume = Π shape`.
- `array_indices` and `site_indices` are mutually inverse permutations of `[0, volume)`.
- `EvenOdd`: equal even and odd site counts.
*/
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "LayoutSpec", into = "LayoutSpec")]
pub struct Layout {
    shape: Vec<usize>,
    ordering: SiteOrdering,
    volume: usize,
    /// site index -> array index
    array_indices: Vec<usize>,
    /// array index -> site index
    site_indices: Vec<usize>,
}

impl Layout {
    /// Build a layout for `shape` with the given ordering.
    ///
    /// # Errors
    /// - [`LatticeError::InvalidShape`]: no axes, a zero extent, or an overflowing volume.
    /// - [`LatticeError::UnbalancedParity`]: `EvenOdd` with unequal even/odd counts.
    pub fn new(shape: &[usize], ordering: SiteOrdering) -> Result<Self> {
        if shape.is_empty() || shape.iter().any(|&n| n == 0) {
            return Err(LatticeError::InvalidShape(shape.to_vec()));
        }
        let volume = shape
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| LatticeError::InvalidShape(shape.to_vec()))?;

        let site_indices: Vec<usize> = match ordering {
            SiteOrdering::Lexicographic => (0..volume).collect(),
            SiteOrdering::EvenOdd => {
                let (even, odd): (Vec<usize>, Vec<usize>) =
                    (0..volume).partition(|&s| lexicographic_parity(shape, s) == Parity::Even);
                if even.len() != odd.len() {
                    return Err(LatticeError::UnbalancedParity {
                        shape: shape.to_vec(),
                        even: even.len(),
                        odd: odd.len(),
                    });
                }
                even.into_iter().chain(odd).collect()
            }
        };

        let mut array_indices = vec![0usize; volume];
        for (array, &site) in site_indices.iter().enumerate() {
            array_indices[site] = array;
        }

        tracing::debug!(?shape, ?ordering, volume, "layout constructed");

        Ok(Self {
            shape: shape.to_vec(),
            ordering,
            volume,
            array_indices,
            site_indices,
        })
    }

    /// Row-major layout.
    #[inline]
    pub fn lexicographic(shape: &[usize]) -> Result<Self> {
        Self::new(shape, SiteOrdering::Lexicographic)
    }

    /// Checkerboard layout: even sites in `[0, V/2)`, odd sites in `[V/2, V)`.
    #[inline]
    pub fn even_odd(shape: &[usize]) -> Result<Self> {
        Self::new(shape, SiteOrdering::EvenOdd)
    }

    // --- Metadata ------------------------------------------------------------

    /// Total number of sites.
    #[inline(always)]
    pub fn volume(&self) -> usize {
        self.volume
    }

    /// Number of axes.
    #[inline(always)]
    pub fn num_dims(&self) -> usize {
        self.shape.len()
    }

    #[inline(always)]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline(always)]
    pub fn ordering(&self) -> SiteOrdering {
        self.ordering
    }

    /// Number of sites in each checkerboard half (`volume / 2`).
    #[inline(always)]
    pub fn half_volume(&self) -> usize {
        self.volume / 2
    }

    // --- Coordinates <-> site index ------------------------------------------

    /// Lexicographic site index of an in-range coordinate.
    ///
    /// # Errors
    /// `RankMismatch` or `CoordinateOutOfRange`; nothing is wrapped.
    pub fn site_index(&self, coords: &[isize]) -> Result<usize> {
        self.check_rank(coords.len())?;
        let mut flat = 0usize;
        for (axis, (&c, &n)) in coords.iter().zip(self.shape.iter()).enumerate() {
            if c < 0 || c as usize >= n {
                return Err(LatticeError::CoordinateOutOfRange { axis, value: c, extent: n });
            }
            flat = flat * n + c as usize;
        }
        Ok(flat)
    }

    /// Coordinate of a lexicographic site index.
    pub fn compute_site_coords(&self, site_index: usize) -> Result<Site> {
        self.check_index(site_index)?;
        let mut coords = vec![0isize; self.shape.len()];
        let mut rem = site_index;
        for axis in (0..self.shape.len()).rev() {
            let n = self.shape[axis];
            coords[axis] = (rem % n) as isize;
            rem /= n;
        }
        Ok(coords)
    }

    // --- Site index <-> array index ------------------------------------------

    /// Storage position of a site.
    #[inline]
    pub fn get_array_index(&self, site_index: usize) -> Result<usize> {
        self.check_index(site_index)?;
        Ok(self.array_indices[site_index])
    }

    /// Storage position of an in-range coordinate.
    #[inline]
    pub fn get_array_index_of(&self, coords: &[isize]) -> Result<usize> {
        let site = self.site_index(coords)?;
        Ok(self.array_indices[site])
    }

    /// Site stored at an array position (inverse of [`Self::get_array_index`]).
    #[inline]
    pub fn get_site_index(&self, array_index: usize) -> Result<usize> {
        self.check_index(array_index)?;
        Ok(self.site_indices[array_index])
    }

    /// Table lookups without the range check; callers iterate over `[0, volume)`.
    #[inline(always)]
    pub(crate) fn array_index_unchecked(&self, site_index: usize) -> usize {
        self.array_indices[site_index]
    }

    #[inline(always)]
    pub(crate) fn site_index_unchecked(&self, array_index: usize) -> usize {
        self.site_indices[array_index]
    }

    // --- Boundary handling ---------------------------------------------------

    /// Fold every component into `[0, extent)` with periodic wrap.
    ///
    /// # Panics
    /// Panics if `coords.len() != num_dims()`.
    #[inline]
    pub fn sanitise_site_coords(&self, coords: &mut [isize]) {
        assert_eq!(
            coords.len(),
            self.shape.len(),
            "rank mismatch: coords={coords:?}, shape={:?}",
            self.shape
        );
        for (c, &n) in coords.iter_mut().zip(self.shape.iter()) {
            *c = c.rem_euclid(n as isize);
        }
    }

    /// Neighbour of `coords` displaced by `offset` along `axis`, wrapped periodically.
    ///
    /// # Panics
    /// Panics on rank mismatch or `axis >= num_dims()`.
    pub fn shifted(&self, coords: &[isize], axis: usize, offset: isize) -> Site {
        assert!(axis < self.shape.len(), "axis {axis} out of range for rank {}", self.shape.len());
        let mut out = coords.to_vec();
        out[axis] += offset;
        self.sanitise_site_coords(&mut out);
        out
    }

    /// Checkerboard parity of a site.
    #[inline]
    pub fn site_parity(&self, site_index: usize) -> Result<Parity> {
        self.check_index(site_index)?;
        Ok(lexicographic_parity(&self.shape, site_index))
    }

    // --- Private helpers -----------------------------------------------------

    #[inline(always)]
    fn check_rank(&self, got: usize) -> Result<()> {
        if got != self.shape.len() {
            return Err(LatticeError::RankMismatch { expected: self.shape.len(), got });
        }
        Ok(())
    }

    #[inline(always)]
    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.volume {
            return Err(LatticeError::IndexOutOfRange { index, volume: self.volume });
        }
        Ok(())
    }
}

/// Parity of the coordinate sum of a lexicographic site index.
#[inline]
fn lexicographic_parity(shape: &[usize], site_index: usize) -> Parity {
    let mut rem = site_index;
    let mut sum = 0usize;
    for &n in shape.iter().rev() {
        sum += rem % n;
        rem /= n;
    }
    if sum % 2 == 0 { Parity::Even } else { Parity::Odd }
}

/// Two layouts are equal when they describe the same geometry and ordering.
impl PartialEq for Layout {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.ordering == other.ordering
    }
}

impl Eq for Layout {}

// ======================================================================================
// ----------------------------------- Serialization ------------------------------------
// ======================================================================================

/// Serialized form of a [`Layout`]; the index tables are rebuilt on load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutSpec {
    pub shape: Vec<usize>,
    #[serde(default)]
    pub ordering: SiteOrdering,
}

impl TryFrom<LayoutSpec> for Layout {
    type Error = LatticeError;

    #[inline]
    fn try_from(spec: LayoutSpec) -> Result<Self> {
        Layout::new(&spec.shape, spec.ordering)
    }
}

impl From<Layout> for LayoutSpec {
    #[inline]
    fn from(layout: Layout) -> Self {
        LayoutSpec { shape: layout.shape, ordering: layout.ordering }
    }
}
