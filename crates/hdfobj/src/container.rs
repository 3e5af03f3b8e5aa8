//! Path resolution and the namespace operations shared by files and groups.

use hdfobj_engine::{library, DatasetCreate, ObjectType};
use tracing::debug;

use crate::dataset::Dataset;
use crate::descriptor::{Record, TypeDescriptor};
use crate::error::{EngineResultExt, Error, Result};
use crate::group::Group;
use crate::handle::{Handle, ResourceKind};
use crate::io::{encode_records, records_in};
use crate::path::{join, ObjectPath};
use crate::slab::Slab;

/// Collision policy when creating an object at a path that is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateMode {
    /// Fail with [`Error::AlreadyExists`].
    #[default]
    Fail,
    /// Replace an existing dataset.
    Overwrite,
}

/// An open group together with the root group of its file.
#[derive(Debug, Clone)]
pub struct Location {
    pub(crate) handle: Handle,
    pub(crate) root: Handle,
    pub(crate) path: String,
}

impl Location {
    pub(crate) fn new_root(root: Handle) -> Self {
        Self {
            handle: root.clone(),
            root,
            path: "/".to_string(),
        }
    }

    fn root(&self) -> Location {
        Location::new_root(self.root.clone())
    }

    /// Open (or with `create`, make) the group `name` directly below this
    /// one.
    fn child_group(&self, name: &str, create: bool, original: &str) -> Result<Location> {
        let lib = library();
        let at = self.handle.id();
        let id = match lib.object_type(at, name).engine("object_type")? {
            Some(ObjectType::Group) => lib.group_open(at, name).engine("group_open")?,
            Some(_) => return Err(Error::InvalidPath(original.to_string())),
            None if create => {
                debug!(path = %join(&self.path, name), "creating group");
                lib.group_create(at, name).engine("group_create")?
            }
            None => return Err(Error::NotFound(original.to_string())),
        };
        Ok(Location {
            handle: Handle::new(id, ResourceKind::Group, Some(self.handle.clone())),
            root: self.root.clone(),
            path: join(&self.path, name),
        })
    }

    /// Walk `segments` starting here, or at the root for absolute paths.
    fn descend(&self, path: &ObjectPath<'_>, segments: &[&str], create: bool, original: &str) -> Result<Location> {
        let mut at = if path.absolute { self.root() } else { self.clone() };
        for segment in segments {
            at = at.child_group(segment, create, original)?;
        }
        Ok(at)
    }

    fn object_type(&self, name: &str) -> Result<Option<ObjectType>> {
        library()
            .object_type(self.handle.id(), name)
            .engine("object_type")
    }

    /// Create a dataset of `desc` with extent `dims` at `path`, holding
    /// `data` (storage-kind elements) or zeros.
    pub(crate) fn create_dataset(
        &self,
        path: &str,
        dims: &[u64],
        desc: &TypeDescriptor,
        mode: CreateMode,
        data: Option<&[u8]>,
    ) -> Result<Dataset> {
        let lib = library();
        let space = lib.space_create(dims).engine("space_create")?;
        let space = Handle::new(space, ResourceKind::Dataspace, None);
        let elements = lib
            .space_selected_count(space.id())
            .engine("space_selected_count")?;
        records_in(elements, desc)?;

        let parsed = ObjectPath::parse(path)?;
        let (parents, name) = parsed.split_last(path)?;
        let parent = self.descend(&parsed, parents, true, path)?;
        let replace = match (parent.object_type(name)?, mode) {
            (None, _) => false,
            (Some(_), CreateMode::Fail) => return Err(Error::AlreadyExists(path.to_string())),
            (Some(ObjectType::Dataset), CreateMode::Overwrite) => {
                debug!(path, "overwriting dataset");
                true
            }
            (Some(_), CreateMode::Overwrite) => return Err(Error::InvalidPath(path.to_string())),
        };

        let kind = desc.storage_kind();
        let options = DatasetCreate {
            data: data.map(|bytes| (kind.datatype(), bytes)),
            replace,
        };
        let id = lib
            .dataset_create_with(parent.handle.id(), name, kind.datatype(), space.id(), options)
            .engine("dataset_create")?;
        debug!(path = %join(&parent.path, name), %kind, ?dims, "created dataset");
        let handle = Handle::new(id, ResourceKind::Dataset, Some(parent.handle.clone()));
        Ok(Dataset::from_parts(handle, kind, dims.to_vec(), join(&parent.path, name)))
    }
}

mod private {
    pub trait Sealed {
        fn location(&self) -> &super::Location;
    }
}

pub(crate) use private::Sealed;

/// Namespace operations on anything that holds links: a [`File`] (through
/// its root group) or a [`Group`].
///
/// Paths are `/`-separated. A leading `/` starts at the file's root group;
/// otherwise the path is relative to this container.
///
/// [`File`]: crate::File
pub trait Container: private::Sealed {
    /// Absolute path of this container.
    fn path(&self) -> &str {
        &self.location().path
    }

    /// Create the group at `path`, creating missing intermediate groups.
    ///
    /// Fails with `AlreadyExists` if something is already at `path`.
    fn create_group(&self, path: &str) -> Result<Group> {
        let here = self.location();
        let parsed = ObjectPath::parse(path)?;
        let (parents, name) = parsed.split_last(path)?;
        let parent = here.descend(&parsed, parents, true, path)?;
        if parent.object_type(name)?.is_some() {
            return Err(Error::AlreadyExists(path.to_string()));
        }
        Ok(Group::new(parent.child_group(name, true, path)?))
    }

    /// Open the group at `path`, creating it and any missing parents.
    fn require_group(&self, path: &str) -> Result<Group> {
        let parsed = ObjectPath::parse(path)?;
        let loc = self
            .location()
            .descend(&parsed, &parsed.segments, true, path)?;
        Ok(Group::new(loc))
    }

    /// Open an existing group. An empty path opens this container.
    fn open_group(&self, path: &str) -> Result<Group> {
        let parsed = ObjectPath::parse(path)?;
        let loc = self
            .location()
            .descend(&parsed, &parsed.segments, false, path)?;
        Ok(Group::new(loc))
    }

    /// Create a zero-filled dataset for records of `T` over `slab`'s extent.
    ///
    /// The extent counts atomic elements; for an aggregate `T` with K
    /// fields its element count must be a multiple of K.
    fn create_dataset<T: Record, const N: usize>(&self, path: &str, slab: &Slab<N>) -> Result<Dataset> {
        self.create_dataset_with::<T, N>(path, slab, CreateMode::Fail)
    }

    fn create_dataset_with<T: Record, const N: usize>(
        &self,
        path: &str,
        slab: &Slab<N>,
        mode: CreateMode,
    ) -> Result<Dataset> {
        let desc = T::descriptor()?;
        self.location()
            .create_dataset(path, slab.dims(), &desc, mode, None)
    }

    /// Open an existing dataset, recovering its extent and element kind.
    fn open_dataset(&self, path: &str) -> Result<Dataset> {
        let parsed = ObjectPath::parse(path)?;
        let (parents, name) = parsed.split_last(path)?;
        let parent = self.location().descend(&parsed, parents, false, path)?;
        match parent.object_type(name)? {
            Some(ObjectType::Dataset) => {}
            Some(_) => return Err(Error::InvalidPath(path.to_string())),
            None => return Err(Error::NotFound(path.to_string())),
        }
        let id = library()
            .dataset_open(parent.handle.id(), name)
            .engine("dataset_open")?;
        let handle = Handle::new(id, ResourceKind::Dataset, Some(parent.handle.clone()));
        Dataset::open(handle, join(&parent.path, name))
    }

    /// Create a dataset sized to hold `records` and write them.
    ///
    /// The extent is `[M]` for atomic records and `[M, K]` for aggregates
    /// of K fields. The dataset is created with its contents in one step:
    /// if anything fails, nothing is linked at `path` and a dataset being
    /// overwritten keeps its data.
    fn write_dataset<T: Record>(&self, path: &str, records: &[T]) -> Result<Dataset> {
        self.write_dataset_with(path, records, CreateMode::Fail)
    }

    fn write_dataset_with<T: Record>(&self, path: &str, records: &[T], mode: CreateMode) -> Result<Dataset> {
        let desc = T::descriptor()?;
        let count = records.len() as u64;
        let dims = if desc.is_aggregate() {
            vec![count, desc.arity() as u64]
        } else {
            vec![count]
        };
        let bytes = encode_records(records, &desc)?;
        self.location()
            .create_dataset(path, &dims, &desc, mode, Some(&bytes))
    }

    /// Whether anything is linked at `path`.
    fn exists(&self, path: &str) -> Result<bool> {
        let parsed = ObjectPath::parse(path)?;
        let Some((name, parents)) = parsed.segments.split_last() else {
            return Ok(true);
        };
        match self.location().descend(&parsed, parents, false, path) {
            Ok(parent) => Ok(parent.object_type(name)?.is_some()),
            Err(Error::NotFound(_) | Error::InvalidPath(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Names of every link in this container, sorted.
    fn member_names(&self) -> Result<Vec<String>> {
        library()
            .link_names(self.location().handle.id())
            .engine("link_names")
    }

    fn group_names(&self) -> Result<Vec<String>> {
        self.location().names_of(ObjectType::Group)
    }

    fn dataset_names(&self) -> Result<Vec<String>> {
        self.location().names_of(ObjectType::Dataset)
    }

    /// Unlink the object at `path`. Open handles to it stay usable.
    fn remove(&self, path: &str) -> Result<()> {
        self.location().remove(path)
    }
}

impl Location {
    fn names_of(&self, kind: ObjectType) -> Result<Vec<String>> {
        let names = library()
            .link_names(self.handle.id())
            .engine("link_names")?;
        let mut keep = Vec::with_capacity(names.len());
        for name in names {
            if self.object_type(&name)? == Some(kind) {
                keep.push(name);
            }
        }
        Ok(keep)
    }

    fn remove(&self, path: &str) -> Result<()> {
        let parsed = ObjectPath::parse(path)?;
        let (parents, name) = parsed.split_last(path)?;
        let parent = self.descend(&parsed, parents, false, path)?;
        if parent.object_type(name)?.is_none() {
            return Err(Error::NotFound(path.to_string()));
        }
        library()
            .link_delete(parent.handle.id(), name)
            .engine("link_delete")?;
        debug!(path, "removed link");
        Ok(())
    }
}
