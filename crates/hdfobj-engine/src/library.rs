//! The process-wide identifier table and the operations on it.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use hdfobj_format::attribute::AttributeMessage;
use hdfobj_format::dataspace::Dataspace;
use hdfobj_format::datatype::Datatype;
use hdfobj_format::{FileImage, Node, NodeData, NodeId};
use memmap2::Mmap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::convert::convert;
use crate::error::EngineError;
use crate::hyperslab::Hyperslab;
use crate::id::{DatasetCreate, FileAccess, FileCreate, ObjectId, ObjectType};

type Result<T> = std::result::Result<T, EngineError>;

/// Key of an open file image inside the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct FileKey(u64);

struct OpenFile {
    path: PathBuf,
    image: FileImage,
    writable: bool,
    dirty: bool,
    /// Number of open identifiers that keep this image alive.
    refs: usize,
    /// Something was unlinked since unreachable nodes were last reclaimed.
    garbage: bool,
    /// Serial of every attribute an identifier has been handed out for.
    /// A replaced attribute gets a new serial, so identifiers of the old
    /// one stop resolving.
    attr_serials: HashMap<(NodeId, String), u64>,
    next_serial: u64,
}

impl OpenFile {
    fn flush(&mut self) -> Result<()> {
        if !self.writable {
            return Err(EngineError::ReadOnly);
        }
        fs::write(&self.path, self.image.to_bytes())?;
        self.dirty = false;
        debug!(path = %self.path.display(), "flushed file");
        Ok(())
    }

    fn new_attr_serial(&mut self, node: NodeId, name: &str) -> u64 {
        self.next_serial += 1;
        self.attr_serials
            .insert((node, name.to_string()), self.next_serial);
        self.next_serial
    }

    /// Serial of an existing attribute; attributes loaded from disk get
    /// theirs when first opened.
    fn attr_serial(&mut self, node: NodeId, name: &str) -> u64 {
        match self.attr_serials.get(&(node, name.to_string())) {
            Some(&serial) => serial,
            None => self.new_attr_serial(node, name),
        }
    }
}

/// An object inside an open file.
#[derive(Debug, Clone, Copy)]
struct Located {
    file: FileKey,
    node: NodeId,
    writable: bool,
}

#[derive(Debug, Clone)]
struct SpaceState {
    dims: Vec<u64>,
    selection: Option<Hyperslab>,
}

impl SpaceState {
    fn selected_count(&self) -> u64 {
        match &self.selection {
            Some(slab) => slab.num_elements(),
            None => Dataspace::simple(&self.dims).num_elements(),
        }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    File(Located),
    Group(Located),
    Dataset(Located),
    Attribute {
        owner: Located,
        name: String,
        serial: u64,
    },
    Dataspace(SpaceState),
}

impl Entry {
    fn object_type(&self) -> ObjectType {
        match self {
            Entry::File(_) => ObjectType::File,
            Entry::Group(_) => ObjectType::Group,
            Entry::Dataset(_) => ObjectType::Dataset,
            Entry::Attribute { .. } => ObjectType::Attribute,
            Entry::Dataspace(_) => ObjectType::Dataspace,
        }
    }

    fn file(&self) -> Option<FileKey> {
        match self {
            Entry::File(loc) | Entry::Group(loc) | Entry::Dataset(loc) => Some(loc.file),
            Entry::Attribute { owner, .. } => Some(owner.file),
            Entry::Dataspace(_) => None,
        }
    }

    /// Node of file `key` that this entry keeps alive.
    fn pinned_node(&self, key: FileKey) -> Option<NodeId> {
        match self {
            Entry::File(loc) | Entry::Group(loc) | Entry::Dataset(loc) => {
                (loc.file == key).then_some(loc.node)
            }
            Entry::Attribute { owner, .. } => (owner.file == key).then_some(owner.node),
            Entry::Dataspace(_) => None,
        }
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    next_file: u64,
    files: HashMap<FileKey, OpenFile>,
    entries: HashMap<ObjectId, Entry>,
}

impl Registry {
    fn insert(&mut self, entry: Entry) -> ObjectId {
        self.next_id += 1;
        let id = ObjectId(self.next_id);
        if let Some(key) = entry.file() {
            if let Some(file) = self.files.get_mut(&key) {
                file.refs += 1;
            }
        }
        trace!(%id, kind = %entry.object_type(), "registered identifier");
        self.entries.insert(id, entry);
        id
    }

    fn entry(&self, id: ObjectId) -> Result<&Entry> {
        self.entries.get(&id).ok_or(EngineError::InvalidId(id))
    }

    fn wrong_type(&self, id: ObjectId, expected: ObjectType) -> EngineError {
        match self.entries.get(&id) {
            Some(entry) => EngineError::WrongType {
                id,
                expected,
                actual: entry.object_type(),
            },
            None => EngineError::InvalidId(id),
        }
    }

    /// A file, group or dataset: anything that can carry attributes.
    fn object(&self, id: ObjectId) -> Result<Located> {
        match self.entry(id)? {
            Entry::File(loc) | Entry::Group(loc) | Entry::Dataset(loc) => Ok(*loc),
            _ => Err(self.wrong_type(id, ObjectType::Group)),
        }
    }

    /// A file or group: anything that holds links.
    fn container(&self, id: ObjectId) -> Result<Located> {
        match self.entry(id)? {
            Entry::File(loc) | Entry::Group(loc) => Ok(*loc),
            _ => Err(self.wrong_type(id, ObjectType::Group)),
        }
    }

    fn dataset(&self, id: ObjectId) -> Result<Located> {
        match self.entry(id)? {
            Entry::Dataset(loc) => Ok(*loc),
            _ => Err(self.wrong_type(id, ObjectType::Dataset)),
        }
    }

    fn attribute(&self, id: ObjectId) -> Result<(Located, String, u64)> {
        match self.entry(id)? {
            Entry::Attribute {
                owner,
                name,
                serial,
            } => Ok((*owner, name.clone(), *serial)),
            _ => Err(self.wrong_type(id, ObjectType::Attribute)),
        }
    }

    fn space(&self, id: ObjectId) -> Result<&SpaceState> {
        match self.entry(id)? {
            Entry::Dataspace(space) => Ok(space),
            _ => Err(self.wrong_type(id, ObjectType::Dataspace)),
        }
    }

    fn space_mut(&mut self, id: ObjectId) -> Result<&mut SpaceState> {
        let actual = self.entry(id)?.object_type();
        match self.entries.get_mut(&id) {
            Some(Entry::Dataspace(space)) => Ok(space),
            _ => Err(EngineError::WrongType {
                id,
                expected: ObjectType::Dataspace,
                actual,
            }),
        }
    }

    fn file(&self, key: FileKey) -> Result<&OpenFile> {
        self.files.get(&key).ok_or(EngineError::FileClosed)
    }

    fn file_mut(&mut self, key: FileKey) -> Result<&mut OpenFile> {
        self.files.get_mut(&key).ok_or(EngineError::FileClosed)
    }

    fn image(&self, loc: Located) -> Result<&FileImage> {
        Ok(&self.file(loc.file)?.image)
    }

    /// Mutable image of a location opened for writing; marks the file dirty.
    fn image_mut(&mut self, loc: Located) -> Result<&mut FileImage> {
        if !loc.writable {
            return Err(EngineError::ReadOnly);
        }
        let file = self.file_mut(loc.file)?;
        file.dirty = true;
        Ok(&mut file.image)
    }

    fn file_by_path(&self, path: &Path) -> Option<FileKey> {
        self.files
            .iter()
            .find(|(_, f)| f.path == path)
            .map(|(key, _)| *key)
    }

    fn add_file(&mut self, path: PathBuf, image: FileImage, writable: bool) -> FileKey {
        self.next_file += 1;
        let key = FileKey(self.next_file);
        self.files.insert(
            key,
            OpenFile {
                path,
                image,
                writable,
                dirty: false,
                refs: 0,
                garbage: false,
                attr_serials: HashMap::new(),
                next_serial: 0,
            },
        );
        key
    }

    fn open_file_id(&mut self, key: FileKey, writable: bool) -> Result<ObjectId> {
        let node = self.file(key)?.image.root();
        Ok(self.insert(Entry::File(Located {
            file: key,
            node,
            writable,
        })))
    }

    fn release(&mut self, id: ObjectId) -> Result<()> {
        let entry = self.entries.remove(&id).ok_or(EngineError::InvalidId(id))?;
        trace!(%id, kind = %entry.object_type(), "released identifier");
        let Some(key) = entry.file() else {
            return Ok(());
        };
        let file = self.file_mut(key)?;
        file.refs -= 1;
        if file.refs > 0 {
            self.reclaim(key);
            return Ok(());
        }
        let Some(mut file) = self.files.remove(&key) else {
            return Ok(());
        };
        debug!(path = %file.path.display(), "closing file");
        if file.writable && file.dirty {
            file.flush()?;
        }
        Ok(())
    }

    /// Free the unlinked objects of file `key` that no open identifier
    /// still uses.
    fn reclaim(&mut self, key: FileKey) {
        if !self.files.get(&key).is_some_and(|f| f.garbage) {
            return;
        }
        let pinned: Vec<NodeId> = self
            .entries
            .values()
            .filter_map(|entry| entry.pinned_node(key))
            .collect();
        let Some(file) = self.files.get_mut(&key) else {
            return;
        };
        let outcome = file.image.reclaim(pinned);
        file.garbage = outcome.pinned_detached;
        if outcome.released.is_empty() {
            return;
        }
        let released: HashSet<NodeId> = outcome.released.into_iter().collect();
        file.attr_serials
            .retain(|(node, _), _| !released.contains(node));
        trace!(path = %file.path.display(), count = released.len(), "reclaimed unlinked objects");
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(EngineError::InvalidName(name.to_string()));
    }
    Ok(())
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn load_image(path: &Path) -> Result<FileImage> {
    let file = fs::File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => EngineError::FileNotFound(path.to_path_buf()),
        _ => EngineError::Io(e),
    })?;
    if file.metadata()?.len() == 0 {
        return Ok(FileImage::from_bytes(&[])?);
    }
    // SAFETY: read-only mapping that is parsed into an owned image before
    // it is dropped; this process does not write the file while mapped.
    let map = unsafe { Mmap::map(&file)? };
    Ok(FileImage::from_bytes(&map)?)
}

/// The storage library: every open file, object and dataspace.
///
/// All operations lock one mutex, run to completion and unlock.
pub struct Library {
    registry: Mutex<Registry>,
}

impl Default for Library {
    fn default() -> Self {
        Self::new()
    }
}

impl Library {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry::default()),
        }
    }

    // ---- identifiers ------------------------------------------------------

    /// Release an identifier. A file image is flushed and dropped when the
    /// last identifier that refers to it is released.
    pub fn close(&self, id: ObjectId) -> Result<()> {
        self.registry.lock().release(id)
    }

    pub fn is_valid(&self, id: ObjectId) -> bool {
        self.registry.lock().entries.contains_key(&id)
    }

    pub fn id_type(&self, id: ObjectId) -> Result<ObjectType> {
        Ok(self.registry.lock().entry(id)?.object_type())
    }

    /// Number of open identifiers.
    pub fn open_count(&self) -> usize {
        self.registry.lock().entries.len()
    }

    /// Release every open identifier, flushing writable files.
    ///
    /// All identifiers are released even if some flushes fail; the first
    /// failure is returned.
    pub fn close_all(&self) -> Result<()> {
        let mut registry = self.registry.lock();
        let mut ids: Vec<ObjectId> = registry.entries.keys().copied().collect();
        ids.sort();
        debug!(count = ids.len(), "closing all identifiers");
        let mut first_error = None;
        for id in ids {
            if let Err(e) = registry.release(id) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // ---- files -----------------------------------------------------------

    /// Create a file holding an empty root group and open it read-write.
    pub fn file_create(&self, path: impl AsRef<Path>, mode: FileCreate) -> Result<ObjectId> {
        let path = path.as_ref();
        let mut registry = self.registry.lock();
        if registry.file_by_path(&canonical(path)).is_some() {
            return Err(EngineError::FileAlreadyOpen(path.to_path_buf()));
        }

        let image = FileImage::new();
        let mut options = fs::OpenOptions::new();
        options.write(true);
        match mode {
            FileCreate::Truncate => options.create(true).truncate(true),
            FileCreate::Exclusive => options.create_new(true),
        };
        options.open(path)?.write_all(&image.to_bytes())?;
        debug!(path = %path.display(), ?mode, "created file");

        let key = registry.add_file(canonical(path), image, true);
        registry.open_file_id(key, true)
    }

    /// Open an existing file. A file already open in this process shares
    /// its in-memory image.
    pub fn file_open(&self, path: impl AsRef<Path>, access: FileAccess) -> Result<ObjectId> {
        let path = path.as_ref();
        let writable = access == FileAccess::ReadWrite;
        let mut registry = self.registry.lock();

        let canonical_path = canonical(path);
        let key = match registry.file_by_path(&canonical_path) {
            Some(key) => {
                if writable && !registry.file(key)?.writable {
                    return Err(EngineError::FileAlreadyOpen(path.to_path_buf()));
                }
                key
            }
            None => {
                let image = load_image(path)?;
                if writable {
                    // Fail now rather than at the deferred flush.
                    fs::OpenOptions::new().append(true).open(path)?;
                }
                debug!(path = %path.display(), ?access, "opened file");
                registry.add_file(canonical_path, image, writable)
            }
        };
        registry.open_file_id(key, writable)
    }

    /// Write the file image of any identifier in the file to disk now.
    pub fn file_flush(&self, id: ObjectId) -> Result<()> {
        let mut registry = self.registry.lock();
        let key = registry
            .entry(id)?
            .file()
            .ok_or_else(|| registry.wrong_type(id, ObjectType::File))?;
        registry.file_mut(key)?.flush()
    }

    /// Number of objects the file of `id` holds in memory, linked or not.
    pub fn file_object_count(&self, id: ObjectId) -> Result<usize> {
        let registry = self.registry.lock();
        let key = registry
            .entry(id)?
            .file()
            .ok_or_else(|| registry.wrong_type(id, ObjectType::File))?;
        Ok(registry.file(key)?.image.live_nodes())
    }

    /// Path of the file an identifier belongs to.
    pub fn file_path(&self, id: ObjectId) -> Result<PathBuf> {
        let registry = self.registry.lock();
        let key = registry
            .entry(id)?
            .file()
            .ok_or_else(|| registry.wrong_type(id, ObjectType::File))?;
        Ok(registry.file(key)?.path.clone())
    }

    // ---- links -----------------------------------------------------------

    /// Open a group by link name; `"/"` opens the file's root group.
    pub fn group_open(&self, loc: ObjectId, name: &str) -> Result<ObjectId> {
        let mut registry = self.registry.lock();
        let at = registry.container(loc)?;
        let node = if name == "/" {
            registry.image(at)?.root()
        } else {
            check_name(name)?;
            let node = registry
                .image(at)?
                .lookup(at.node, name)
                .ok_or_else(|| EngineError::LinkNotFound(name.to_string()))?;
            if registry.image(at)?.node(node).links().is_none() {
                return Err(EngineError::NotAGroup(name.to_string()));
            }
            node
        };
        Ok(registry.insert(Entry::Group(Located { node, ..at })))
    }

    pub fn group_create(&self, loc: ObjectId, name: &str) -> Result<ObjectId> {
        check_name(name)?;
        let mut registry = self.registry.lock();
        let at = registry.container(loc)?;
        let node = link_new(registry.image_mut(at)?, at.node, name, Node::group())?;
        debug!(link = name, "created group");
        Ok(registry.insert(Entry::Group(Located { node, ..at })))
    }

    /// Kind of object a link points at, or `None` if there is no such link.
    pub fn object_type(&self, loc: ObjectId, name: &str) -> Result<Option<ObjectType>> {
        let registry = self.registry.lock();
        let at = registry.container(loc)?;
        let image = registry.image(at)?;
        Ok(image.lookup(at.node, name).map(|node| match image.node(node).data {
            NodeData::Group { .. } => ObjectType::Group,
            NodeData::Dataset { .. } => ObjectType::Dataset,
        }))
    }

    pub fn link_exists(&self, loc: ObjectId, name: &str) -> Result<bool> {
        Ok(self.object_type(loc, name)?.is_some())
    }

    /// Link names under a group, in name order.
    pub fn link_names(&self, loc: ObjectId) -> Result<Vec<String>> {
        let registry = self.registry.lock();
        let at = registry.container(loc)?;
        let links = registry.image(at)?.node(at.node).links();
        Ok(links.map(|l| l.keys().cloned().collect()).unwrap_or_default())
    }

    /// Remove a link. Open identifiers of the target stay usable.
    pub fn link_delete(&self, loc: ObjectId, name: &str) -> Result<()> {
        let mut registry = self.registry.lock();
        let at = registry.container(loc)?;
        registry
            .image_mut(at)?
            .unlink(at.node, name)
            .ok_or_else(|| EngineError::LinkNotFound(name.to_string()))?;
        debug!(link = name, "deleted link");
        registry.file_mut(at.file)?.garbage = true;
        registry.reclaim(at.file);
        Ok(())
    }

    // ---- datasets --------------------------------------------------------

    /// Create a zero-filled dataset with the extent of dataspace `space`.
    pub fn dataset_create(
        &self,
        loc: ObjectId,
        name: &str,
        datatype: Datatype,
        space: ObjectId,
    ) -> Result<ObjectId> {
        self.dataset_create_with(loc, name, datatype, space, DatasetCreate::default())
    }

    /// Create a dataset with the extent of dataspace `space`.
    ///
    /// The new dataset, initial data included, is built before any link
    /// changes, so a failure leaves the file as it was.
    pub fn dataset_create_with(
        &self,
        loc: ObjectId,
        name: &str,
        datatype: Datatype,
        space: ObjectId,
        options: DatasetCreate<'_>,
    ) -> Result<ObjectId> {
        check_name(name)?;
        let mut registry = self.registry.lock();
        let at = registry.container(loc)?;
        let dataspace = Dataspace::simple(&registry.space(space)?.dims);
        let node = match options.data {
            Some((mem_type, buf)) => {
                check_size(dataspace.checked_elements()?, mem_type, buf)?;
                let data = convert(buf, mem_type, datatype)?;
                Node::dataset_with(datatype, dataspace, data)
            }
            None => Node::dataset(datatype, dataspace)?,
        };

        let image = registry.image_mut(at)?;
        let replaced = match image.lookup(at.node, name) {
            Some(existing) if options.replace => {
                if image.node(existing).links().is_some() {
                    return Err(EngineError::NotADataset(name.to_string()));
                }
                image.unlink(at.node, name);
                true
            }
            _ => false,
        };
        let node = link_new(image, at.node, name, node)?;
        debug!(link = name, %datatype, replaced, "created dataset");
        if replaced {
            registry.file_mut(at.file)?.garbage = true;
            registry.reclaim(at.file);
        }
        Ok(registry.insert(Entry::Dataset(Located { node, ..at })))
    }

    pub fn dataset_open(&self, loc: ObjectId, name: &str) -> Result<ObjectId> {
        check_name(name)?;
        let mut registry = self.registry.lock();
        let at = registry.container(loc)?;
        let node = registry
            .image(at)?
            .lookup(at.node, name)
            .ok_or_else(|| EngineError::LinkNotFound(name.to_string()))?;
        if registry.image(at)?.node(node).links().is_some() {
            return Err(EngineError::NotADataset(name.to_string()));
        }
        Ok(registry.insert(Entry::Dataset(Located { node, ..at })))
    }

    /// A new dataspace identifier describing the dataset's extent.
    pub fn dataset_space(&self, id: ObjectId) -> Result<ObjectId> {
        let mut registry = self.registry.lock();
        let loc = registry.dataset(id)?;
        let (_, dataspace) = dataset_meta(registry.image(loc)?, loc.node)?;
        let dims = dataspace.dimensions.clone();
        Ok(registry.insert(Entry::Dataspace(SpaceState {
            dims,
            selection: None,
        })))
    }

    pub fn dataset_type(&self, id: ObjectId) -> Result<Datatype> {
        let registry = self.registry.lock();
        let loc = registry.dataset(id)?;
        Ok(dataset_meta(registry.image(loc)?, loc.node)?.0)
    }

    /// Write elements of `mem_type` into the dataset.
    ///
    /// With `file_space`, only its selected elements are written, in
    /// row-major order; otherwise the whole dataset is.
    pub fn dataset_write(
        &self,
        id: ObjectId,
        mem_type: Datatype,
        file_space: Option<ObjectId>,
        buf: &[u8],
    ) -> Result<()> {
        let mut registry = self.registry.lock();
        let loc = registry.dataset(id)?;
        if !loc.writable {
            return Err(EngineError::ReadOnly);
        }
        let (datatype, dataspace) = dataset_meta(registry.image(loc)?, loc.node)?;
        let dims = dataspace.dimensions.clone();
        let selection = selection_for(&registry, file_space, &dims)?;
        let count = match &selection {
            Some(slab) => slab.num_elements(),
            None => dataspace.num_elements(),
        };
        check_size(count, mem_type, buf)?;
        let converted = convert(buf, mem_type, datatype)?;

        let image = registry.image_mut(loc)?;
        if let NodeData::Dataset { data, .. } = &mut image.node_mut(loc.node).data {
            match selection {
                Some(slab) => slab.scatter(data, &dims, datatype.size() as usize, &converted),
                None => *data = converted,
            }
        }
        trace!(%id, elements = count, "wrote dataset");
        Ok(())
    }

    /// Read elements of the dataset converted to `mem_type`.
    pub fn dataset_read(
        &self,
        id: ObjectId,
        mem_type: Datatype,
        file_space: Option<ObjectId>,
    ) -> Result<Vec<u8>> {
        let registry = self.registry.lock();
        let loc = registry.dataset(id)?;
        let image = registry.image(loc)?;
        let NodeData::Dataset {
            datatype,
            dataspace,
            data,
        } = &image.node(loc.node).data
        else {
            return Err(registry.wrong_type(id, ObjectType::Dataset));
        };
        let stored = match selection_for(&registry, file_space, &dataspace.dimensions)? {
            Some(slab) => slab.gather(data, &dataspace.dimensions, datatype.size() as usize),
            None => data.clone(),
        };
        convert(&stored, *datatype, mem_type)
    }

    // ---- attributes ------------------------------------------------------

    pub fn attr_create(
        &self,
        loc: ObjectId,
        name: &str,
        datatype: Datatype,
        space: ObjectId,
    ) -> Result<ObjectId> {
        check_name(name)?;
        let mut registry = self.registry.lock();
        let owner = registry.object(loc)?;
        let dataspace = Dataspace::simple(&registry.space(space)?.dims);
        let node = registry.image_mut(owner)?.node_mut(owner.node);
        if node.attribute(name).is_some() {
            return Err(EngineError::AttributeExists(name.to_string()));
        }
        node.attributes
            .push(AttributeMessage::zeroed(name, datatype, dataspace)?);
        let serial = registry
            .file_mut(owner.file)?
            .new_attr_serial(owner.node, name);
        debug!(link = name, %datatype, serial, "created attribute");
        Ok(registry.insert(Entry::Attribute {
            owner,
            name: name.to_string(),
            serial,
        }))
    }

    pub fn attr_open(&self, loc: ObjectId, name: &str) -> Result<ObjectId> {
        let mut registry = self.registry.lock();
        let owner = registry.object(loc)?;
        if registry.image(owner)?.node(owner.node).attribute(name).is_none() {
            return Err(EngineError::AttributeNotFound(name.to_string()));
        }
        let serial = registry.file_mut(owner.file)?.attr_serial(owner.node, name);
        Ok(registry.insert(Entry::Attribute {
            owner,
            name: name.to_string(),
            serial,
        }))
    }

    pub fn attr_exists(&self, loc: ObjectId, name: &str) -> Result<bool> {
        let registry = self.registry.lock();
        let owner = registry.object(loc)?;
        Ok(registry.image(owner)?.node(owner.node).attribute(name).is_some())
    }

    /// Attribute names in creation order.
    pub fn attr_names(&self, loc: ObjectId) -> Result<Vec<String>> {
        let registry = self.registry.lock();
        let owner = registry.object(loc)?;
        let node = registry.image(owner)?.node(owner.node);
        Ok(node.attributes.iter().map(|a| a.name.clone()).collect())
    }

    pub fn attr_delete(&self, loc: ObjectId, name: &str) -> Result<()> {
        let mut registry = self.registry.lock();
        let owner = registry.object(loc)?;
        let node = registry.image_mut(owner)?.node_mut(owner.node);
        let before = node.attributes.len();
        node.attributes.retain(|a| a.name != name);
        if node.attributes.len() == before {
            return Err(EngineError::AttributeNotFound(name.to_string()));
        }
        registry
            .file_mut(owner.file)?
            .attr_serials
            .remove(&(owner.node, name.to_string()));
        Ok(())
    }

    pub fn attr_name(&self, id: ObjectId) -> Result<String> {
        Ok(self.registry.lock().attribute(id)?.1)
    }

    pub fn attr_space(&self, id: ObjectId) -> Result<ObjectId> {
        let mut registry = self.registry.lock();
        let dims = with_attribute(&registry, id, |a| a.dataspace.dimensions.clone())?;
        Ok(registry.insert(Entry::Dataspace(SpaceState {
            dims,
            selection: None,
        })))
    }

    pub fn attr_type(&self, id: ObjectId) -> Result<Datatype> {
        with_attribute(&self.registry.lock(), id, |a| a.datatype)
    }

    /// Replace the whole attribute value.
    pub fn attr_write(&self, id: ObjectId, mem_type: Datatype, buf: &[u8]) -> Result<()> {
        let mut registry = self.registry.lock();
        let (owner, name, _) = registry.attribute(id)?;
        let (datatype, count) = with_attribute(&registry, id, |a| {
            (a.datatype, a.dataspace.num_elements())
        })?;
        check_size(count, mem_type, buf)?;
        let converted = convert(buf, mem_type, datatype)?;
        let node = registry.image_mut(owner)?.node_mut(owner.node);
        if let Some(attr) = node.attribute_mut(&name) {
            attr.data = converted;
        }
        Ok(())
    }

    pub fn attr_read(&self, id: ObjectId, mem_type: Datatype) -> Result<Vec<u8>> {
        let registry = self.registry.lock();
        let (datatype, data) = with_attribute(&registry, id, |a| (a.datatype, a.data.clone()))?;
        convert(&data, datatype, mem_type)
    }

    // ---- dataspaces ------------------------------------------------------

    /// A simple dataspace; empty `dims` is a scalar.
    ///
    /// Fails when the rank or the element count is too large to address.
    pub fn space_create(&self, dims: &[u64]) -> Result<ObjectId> {
        Dataspace::simple(dims).checked_elements()?;
        Ok(self.registry.lock().insert(Entry::Dataspace(SpaceState {
            dims: dims.to_vec(),
            selection: None,
        })))
    }

    pub fn space_dims(&self, id: ObjectId) -> Result<Vec<u64>> {
        Ok(self.registry.lock().space(id)?.dims.clone())
    }

    /// Select the block `start`/`count`; replaces any previous selection.
    pub fn space_select_hyperslab(&self, id: ObjectId, start: &[u64], count: &[u64]) -> Result<()> {
        let mut registry = self.registry.lock();
        let space = registry.space_mut(id)?;
        let slab = Hyperslab {
            start: start.to_vec(),
            count: count.to_vec(),
        };
        slab.validate(&space.dims)?;
        space.selection = Some(slab);
        Ok(())
    }

    pub fn space_select_all(&self, id: ObjectId) -> Result<()> {
        self.registry.lock().space_mut(id)?.selection = None;
        Ok(())
    }

    pub fn space_selected_count(&self, id: ObjectId) -> Result<u64> {
        Ok(self.registry.lock().space(id)?.selected_count())
    }
}

fn link_new(image: &mut FileImage, parent: NodeId, name: &str, node: Node) -> Result<NodeId> {
    if image.lookup(parent, name).is_some() {
        return Err(EngineError::LinkExists(name.to_string()));
    }
    let id = image.add_node(node);
    if !image.link(parent, name, id) {
        return Err(EngineError::LinkExists(name.to_string()));
    }
    Ok(id)
}

fn dataset_meta(image: &FileImage, node: NodeId) -> Result<(Datatype, &Dataspace)> {
    match &image.node(node).data {
        NodeData::Dataset {
            datatype,
            dataspace,
            ..
        } => Ok((*datatype, dataspace)),
        NodeData::Group { .. } => Err(EngineError::NotADataset(format!("{node:?}"))),
    }
}

fn with_attribute<T>(
    registry: &Registry,
    id: ObjectId,
    f: impl FnOnce(&AttributeMessage) -> T,
) -> Result<T> {
    let (owner, name, serial) = registry.attribute(id)?;
    let file = registry.file(owner.file)?;
    if file.attr_serials.get(&(owner.node, name.clone())) != Some(&serial) {
        return Err(EngineError::AttributeNotFound(name));
    }
    file.image
        .node(owner.node)
        .attribute(&name)
        .map(f)
        .ok_or(EngineError::AttributeNotFound(name))
}

/// The hyperslab of `file_space` for an object of extent `dims`, or `None`
/// when every element is selected.
fn selection_for(
    registry: &Registry,
    file_space: Option<ObjectId>,
    dims: &[u64],
) -> Result<Option<Hyperslab>> {
    let Some(space_id) = file_space else {
        return Ok(None);
    };
    let space = registry.space(space_id)?;
    if space.dims != dims {
        return Err(EngineError::ExtentMismatch {
            expected: dims.to_vec(),
            actual: space.dims.clone(),
        });
    }
    Ok(space.selection.clone())
}

fn check_size(count: u64, mem_type: Datatype, buf: &[u8]) -> Result<()> {
    let expected = count
        .checked_mul(u64::from(mem_type.size()))
        .and_then(|bytes| usize::try_from(bytes).ok());
    if expected != Some(buf.len()) {
        return Err(EngineError::SizeMismatch {
            expected: expected.unwrap_or(usize::MAX),
            actual: buf.len(),
        });
    }
    Ok(())
}
