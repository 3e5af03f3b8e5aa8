//! Typed, shaped datasets.
//!
//! Every count a dataset reports is in atomic elements. A record type with
//! K fields occupies K elements, so a dataset of M such records reports
//! `element_count() == M * K` and `read` returns M records.

use hdfobj_engine::library;
use tracing::trace;

use crate::attribute::{AttributeOwner, HasAttributes};
use crate::descriptor::Record;
use crate::element::ElementKind;
use crate::error::{EngineResultExt, Error, Result};
use crate::handle::{Handle, ResourceKind};
use crate::io::{check_fill, decode_records, encode_records, records_in};
use crate::slab::Slab;

/// An open dataset.
///
/// Cloning shares the underlying handle; opening the same path again gives
/// an independent handle to the same data.
#[derive(Debug, Clone)]
pub struct Dataset {
    handle: Handle,
    kind: ElementKind,
    dims: Vec<u64>,
    path: String,
}

impl Dataset {
    pub(crate) fn from_parts(handle: Handle, kind: ElementKind, dims: Vec<u64>, path: String) -> Self {
        Self {
            handle,
            kind,
            dims,
            path,
        }
    }

    /// Wrap a freshly opened dataset identifier, reading back its stored
    /// element kind and extent.
    pub(crate) fn open(handle: Handle, path: String) -> Result<Self> {
        let lib = library();
        let datatype = lib.dataset_type(handle.id()).engine("dataset_type")?;
        let kind = ElementKind::from_datatype(datatype)?;
        let space = lib.dataset_space(handle.id()).engine("dataset_space")?;
        let space = Handle::new(space, ResourceKind::Dataspace, None);
        let dims = lib.space_dims(space.id()).engine("space_dims")?;
        Ok(Self::from_parts(handle, kind, dims, path))
    }

    /// Absolute path the dataset was opened at.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn shape(&self) -> &[u64] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Stored atomic element count (product of the extent).
    pub fn element_count(&self) -> u64 {
        self.dims.iter().product()
    }

    pub fn element_kind(&self) -> ElementKind {
        self.kind
    }

    /// The extent as a rank-`N` slab.
    pub fn slab<const N: usize>(&self) -> Result<Slab<N>> {
        Slab::from_dims(&self.dims)
    }

    /// Number of `T` records the dataset holds.
    pub fn record_count<T: Record>(&self) -> Result<u64> {
        records_in(self.element_count(), &T::descriptor()?)
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Overwrite the whole dataset. `records` must fill the extent exactly.
    pub fn write<T: Record>(&self, records: &[T]) -> Result<()> {
        let desc = T::descriptor()?;
        check_fill(records.len(), self.element_count(), &desc)?;
        let bytes = encode_records(records, &desc)?;
        library()
            .dataset_write(self.handle.id(), desc.storage_kind().datatype(), None, &bytes)
            .engine("dataset_write")?;
        trace!(path = %self.path, records = records.len(), "wrote dataset");
        Ok(())
    }

    pub fn write_scalar<T: Record>(&self, value: T) -> Result<()> {
        self.write(std::slice::from_ref(&value))
    }

    /// Read the whole dataset as `T` records.
    pub fn read<T: Record>(&self) -> Result<Vec<T>> {
        let desc = T::descriptor()?;
        records_in(self.element_count(), &desc)?;
        let bytes = library()
            .dataset_read(self.handle.id(), desc.storage_kind().datatype(), None)
            .engine("dataset_read")?;
        decode_records(&bytes, &desc)
    }

    /// Replace the contents of `out` with the whole dataset.
    pub fn read_into<T: Record>(&self, out: &mut Vec<T>) -> Result<()> {
        *out = self.read()?;
        Ok(())
    }

    /// Read a dataset that holds exactly one record.
    pub fn read_scalar<T: Record>(&self) -> Result<T> {
        let arity = T::descriptor()?.arity() as u64;
        single(self.read()?, arity, self.element_count())
    }

    /// Write `records` into the selection of `slab`, in row-major order.
    pub fn write_slab<T: Record, const N: usize>(&self, slab: &Slab<N>, records: &[T]) -> Result<()> {
        self.check_extent(slab)?;
        let desc = T::descriptor()?;
        check_fill(records.len(), slab.element_count(), &desc)?;
        let bytes = encode_records(records, &desc)?;
        let space = slab.to_space()?;
        library()
            .dataset_write(
                self.handle.id(),
                desc.storage_kind().datatype(),
                Some(space.id()),
                &bytes,
            )
            .engine("dataset_write")
    }

    /// Read the selection of `slab` as `T` records, in row-major order.
    pub fn read_slab<T: Record, const N: usize>(&self, slab: &Slab<N>) -> Result<Vec<T>> {
        self.check_extent(slab)?;
        let desc = T::descriptor()?;
        records_in(slab.element_count(), &desc)?;
        let space = slab.to_space()?;
        let bytes = library()
            .dataset_read(self.handle.id(), desc.storage_kind().datatype(), Some(space.id()))
            .engine("dataset_read")?;
        decode_records(&bytes, &desc)
    }

    /// The slab must describe this dataset's extent.
    fn check_extent<const N: usize>(&self, slab: &Slab<N>) -> Result<()> {
        if N != self.rank() {
            return Err(Error::RankMismatch {
                expected: self.rank(),
                actual: N,
            });
        }
        if slab.dims()[..] != self.dims[..] {
            let (offset, count) = match slab.selection() {
                Some(sel) => (sel.offset.to_vec(), sel.count.to_vec()),
                None => (vec![0; N], slab.dims().to_vec()),
            };
            return Err(Error::InvalidSelection {
                dims: self.dims.clone(),
                offset,
                count,
            });
        }
        slab.validate()
    }

    /// Release this owner of the dataset, reporting any engine failure.
    pub fn close(self) -> Result<()> {
        self.handle.close()
    }
}

impl AttributeOwner for Dataset {
    fn attribute_owner(&self) -> &Handle {
        &self.handle
    }
}

impl HasAttributes for Dataset {}

/// The only record of `records`; `arity` is the element count of one
/// record, `elements` the stored count.
pub(crate) fn single<T>(records: Vec<T>, arity: u64, elements: u64) -> Result<T> {
    let [value]: [T; 1] = records.try_into().map_err(|_| Error::ShapeMismatch {
        expected: arity,
        actual: elements,
    })?;
    Ok(value)
}
