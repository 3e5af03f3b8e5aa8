//! N-dimensional extents with an optional rectangular selection.

use hdfobj_engine::library;

use crate::error::{EngineResultExt, Error, Result};
use crate::handle::{Handle, ResourceKind};

/// A sub-rectangle of an extent: `offset[i]..offset[i] + count[i]` on each
/// axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection<const N: usize> {
    pub offset: [u64; N],
    pub count: [u64; N],
}

/// An extent of rank `N`, optionally with a selection inside it.
///
/// Construction never fails; a selection that does not fit is reported as
/// [`Error::InvalidSelection`] when the slab is used for I/O.
///
/// ```
/// use hdfobj::Slab;
///
/// let grid = Slab::new([4, 6]);
/// assert_eq!(grid.element_count(), 24);
///
/// let block = grid.select([1, 2], [2, 3]);
/// assert_eq!(block.element_count(), 6);
/// assert!(block.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slab<const N: usize> {
    dims: [u64; N],
    selection: Option<Selection<N>>,
}

impl<const N: usize> Slab<N> {
    /// Full extent, no selection.
    pub const fn new(dims: [u64; N]) -> Self {
        Self {
            dims,
            selection: None,
        }
    }

    pub const fn with_selection(dims: [u64; N], offset: [u64; N], count: [u64; N]) -> Self {
        Self {
            dims,
            selection: Some(Selection { offset, count }),
        }
    }

    /// Same extent with a new selection.
    pub const fn select(self, offset: [u64; N], count: [u64; N]) -> Self {
        Self::with_selection(self.dims, offset, count)
    }

    /// Extent from a runtime shape, checking its rank against `N`.
    pub fn from_dims(dims: &[u64]) -> Result<Self> {
        let dims: [u64; N] = dims.try_into().map_err(|_| Error::RankMismatch {
            expected: N,
            actual: dims.len(),
        })?;
        Ok(Self::new(dims))
    }

    pub const fn rank(&self) -> usize {
        N
    }

    pub fn dims(&self) -> &[u64; N] {
        &self.dims
    }

    pub fn selection(&self) -> Option<&Selection<N>> {
        self.selection.as_ref()
    }

    /// Number of elements in the full extent, saturating at `u64::MAX`.
    ///
    /// Creating a dataset or attribute over an extent that large fails.
    pub fn extent_count(&self) -> u64 {
        saturating_product(&self.dims)
    }

    /// Number of selected elements; the full extent when nothing is
    /// selected.
    pub fn element_count(&self) -> u64 {
        match &self.selection {
            Some(sel) => saturating_product(&sel.count),
            None => self.extent_count(),
        }
    }

    /// Check that the selection, if any, lies inside the extent.
    pub fn validate(&self) -> Result<()> {
        let Some(sel) = &self.selection else {
            return Ok(());
        };
        let fits = (0..N).all(|i| {
            sel.offset[i]
                .checked_add(sel.count[i])
                .is_some_and(|end| end <= self.dims[i])
        });
        if fits {
            Ok(())
        } else {
            Err(Error::InvalidSelection {
                dims: self.dims.to_vec(),
                offset: sel.offset.to_vec(),
                count: sel.count.to_vec(),
            })
        }
    }

    /// Engine dataspace for this slab, with the selection applied.
    pub(crate) fn to_space(&self) -> Result<Handle> {
        self.validate()?;
        let lib = library();
        let id = lib.space_create(&self.dims).engine("space_create")?;
        let space = Handle::new(id, ResourceKind::Dataspace, None);
        if let Some(sel) = &self.selection {
            lib.space_select_hyperslab(id, &sel.offset, &sel.count)
                .engine("space_select_hyperslab")?;
        }
        Ok(space)
    }
}

fn saturating_product(values: &[u64]) -> u64 {
    values.iter().fold(1, |acc, &v| acc.saturating_mul(v))
}
