//! Small typed values attached to files, groups and datasets.

use hdfobj_engine::library;
use tracing::debug;

use crate::dataset::single;
use crate::descriptor::{Record, TypeDescriptor};
use crate::element::ElementKind;
use crate::error::{EngineResultExt, Error, Result};
use crate::handle::{Handle, ResourceKind};
use crate::io::{check_fill, decode_records, encode_records, records_in};
use crate::path::check_name;
use crate::slab::Slab;

/// An open attribute.
#[derive(Debug, Clone)]
pub struct Attribute {
    handle: Handle,
    name: String,
    kind: ElementKind,
    dims: Vec<u64>,
}

impl Attribute {
    fn open(handle: Handle, name: &str) -> Result<Self> {
        let lib = library();
        let kind = ElementKind::from_datatype(lib.attr_type(handle.id()).engine("attr_type")?)?;
        let space = lib.attr_space(handle.id()).engine("attr_space")?;
        let space = Handle::new(space, ResourceKind::Dataspace, None);
        let dims = lib.space_dims(space.id()).engine("space_dims")?;
        Ok(Self {
            handle,
            name: name.to_string(),
            kind,
            dims,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Extent of the value; empty for a scalar.
    pub fn shape(&self) -> &[u64] {
        &self.dims
    }

    pub fn element_count(&self) -> u64 {
        self.dims.iter().product()
    }

    pub fn element_kind(&self) -> ElementKind {
        self.kind
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Replace the whole value. `records` must fill the extent exactly.
    pub fn write<T: Record>(&self, records: &[T]) -> Result<()> {
        let desc = T::descriptor()?;
        check_fill(records.len(), self.element_count(), &desc)?;
        let bytes = encode_records(records, &desc)?;
        library()
            .attr_write(self.handle.id(), desc.storage_kind().datatype(), &bytes)
            .engine("attr_write")
    }

    pub fn write_scalar<T: Record>(&self, value: T) -> Result<()> {
        self.write(std::slice::from_ref(&value))
    }

    pub fn read<T: Record>(&self) -> Result<Vec<T>> {
        let desc = T::descriptor()?;
        records_in(self.element_count(), &desc)?;
        let bytes = library()
            .attr_read(self.handle.id(), desc.storage_kind().datatype())
            .engine("attr_read")?;
        decode_records(&bytes, &desc)
    }

    pub fn read_into<T: Record>(&self, out: &mut Vec<T>) -> Result<()> {
        *out = self.read()?;
        Ok(())
    }

    pub fn read_scalar<T: Record>(&self) -> Result<T> {
        let arity = T::descriptor()?.arity() as u64;
        single(self.read()?, arity, self.element_count())
    }

    pub fn close(self) -> Result<()> {
        self.handle.close()
    }
}

mod private {
    pub trait Sealed {
        fn attribute_owner(&self) -> &crate::handle::Handle;
    }
}

pub(crate) use private::Sealed as AttributeOwner;

/// Attribute operations on files, groups and datasets. A file's attributes
/// live on its root group.
pub trait HasAttributes: private::Sealed {
    /// Create a zero-filled attribute for `T` records over `slab`'s extent.
    fn create_attribute<T: Record, const N: usize>(&self, name: &str, slab: &Slab<N>) -> Result<Attribute> {
        let desc = T::descriptor()?;
        create(self.attribute_owner(), name, slab.dims(), &desc)
    }

    fn open_attribute(&self, name: &str) -> Result<Attribute> {
        let owner = self.attribute_owner();
        if !library().attr_exists(owner.id(), name).engine("attr_exists")? {
            return Err(Error::NotFound(name.to_string()));
        }
        let id = library().attr_open(owner.id(), name).engine("attr_open")?;
        Attribute::open(
            Handle::new(id, ResourceKind::Attribute, Some(owner.clone())),
            name,
        )
    }

    /// Store `values` as the attribute `name`, replacing any existing one.
    ///
    /// The extent is `[M]` for atomic records and `[M, K]` for aggregates.
    fn write_attribute<T: Record>(&self, name: &str, values: &[T]) -> Result<Attribute> {
        let desc = T::descriptor()?;
        let count = values.len() as u64;
        let dims = if desc.is_aggregate() {
            vec![count, desc.arity() as u64]
        } else {
            vec![count]
        };
        replace(self.attribute_owner(), name, &dims, &desc, values)
    }

    /// Store one record as the attribute `name`, replacing any existing
    /// one. An atomic record gets a scalar extent, an aggregate `[K]`.
    fn write_attribute_scalar<T: Record>(&self, name: &str, value: T) -> Result<Attribute> {
        let desc = T::descriptor()?;
        let dims = if desc.is_aggregate() {
            vec![desc.arity() as u64]
        } else {
            Vec::new()
        };
        replace(
            self.attribute_owner(),
            name,
            &dims,
            &desc,
            std::slice::from_ref(&value),
        )
    }

    /// Attribute names in creation order.
    fn attribute_names(&self) -> Result<Vec<String>> {
        library()
            .attr_names(self.attribute_owner().id())
            .engine("attr_names")
    }

    fn has_attribute(&self, name: &str) -> Result<bool> {
        library()
            .attr_exists(self.attribute_owner().id(), name)
            .engine("attr_exists")
    }

    fn remove_attribute(&self, name: &str) -> Result<()> {
        let owner = self.attribute_owner().id();
        if !library().attr_exists(owner, name).engine("attr_exists")? {
            return Err(Error::NotFound(name.to_string()));
        }
        library().attr_delete(owner, name).engine("attr_delete")
    }
}

fn create(owner: &Handle, name: &str, dims: &[u64], desc: &TypeDescriptor) -> Result<Attribute> {
    check_name(name)?;
    let lib = library();
    let space = lib.space_create(dims).engine("space_create")?;
    let space = Handle::new(space, ResourceKind::Dataspace, None);
    let elements = lib
        .space_selected_count(space.id())
        .engine("space_selected_count")?;
    records_in(elements, desc)?;
    if lib.attr_exists(owner.id(), name).engine("attr_exists")? {
        return Err(Error::AlreadyExists(name.to_string()));
    }
    let kind = desc.storage_kind();
    let id = lib
        .attr_create(owner.id(), name, kind.datatype(), space.id())
        .engine("attr_create")?;
    debug!(attribute = name, %kind, ?dims, "created attribute");
    Ok(Attribute {
        handle: Handle::new(id, ResourceKind::Attribute, Some(owner.clone())),
        name: name.to_string(),
        kind,
        dims: dims.to_vec(),
    })
}

fn replace<T: Record>(
    owner: &Handle,
    name: &str,
    dims: &[u64],
    desc: &TypeDescriptor,
    values: &[T],
) -> Result<Attribute> {
    check_name(name)?;
    let bytes = encode_records(values, desc)?;
    let lib = library();
    if lib.attr_exists(owner.id(), name).engine("attr_exists")? {
        lib.attr_delete(owner.id(), name).engine("attr_delete")?;
    }
    let attribute = create(owner, name, dims, desc)?;
    lib.attr_write(attribute.handle.id(), desc.storage_kind().datatype(), &bytes)
        .engine("attr_write")?;
    Ok(attribute)
}
