//! Files: the entry point to a container's namespace.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use hdfobj_engine::{library, EngineError, FileAccess, FileCreate};
use tracing::debug;

use crate::attribute::{AttributeOwner, HasAttributes};
use crate::container::{Container, Location, Sealed};
use crate::dataset::Dataset;
use crate::error::{EngineResultExt, Error, Result};
use crate::group::Group;
use crate::handle::{Handle, ResourceKind};

/// How [`File::open_with`] reaches an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Create the file, discarding any existing contents.
    Truncate,
    /// Create the file; fail with `AlreadyExists` if it is present.
    CreateNew,
    /// Open an existing file for reading and writing.
    ReadWrite,
    /// Open an existing file for reading.
    ReadOnly,
}

impl FileMode {
    pub fn is_writable(self) -> bool {
        self != FileMode::ReadOnly
    }
}

/// An open file.
///
/// Datasets, groups and attributes opened from a file keep it open. The
/// file is written to disk when the last of them, and the `File` itself,
/// is dropped or closed.
///
/// ```no_run
/// use hdfobj::{Container, File, Slab};
///
/// let file = File::create("points.hob")?;
/// let ds = file.create_dataset::<f64, 2>("grid/values", &Slab::new([2, 3]))?;
/// ds.write(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])?;
/// # Ok::<(), hdfobj::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct File {
    handle: Handle,
    root: Location,
    mode: FileMode,
    path: PathBuf,
}

impl File {
    /// Create a new file, truncating any existing one.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, FileMode::Truncate)
    }

    /// Open an existing file for reading and writing.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(path, FileMode::ReadWrite)
    }

    pub fn open_with(path: impl AsRef<Path>, mode: FileMode) -> Result<Self> {
        let path = path.as_ref();
        let lib = library();
        let opened = match mode {
            FileMode::Truncate => lib.file_create(path, FileCreate::Truncate),
            FileMode::CreateNew => lib.file_create(path, FileCreate::Exclusive),
            FileMode::ReadWrite => lib.file_open(path, FileAccess::ReadWrite),
            FileMode::ReadOnly => lib.file_open(path, FileAccess::ReadOnly),
        };
        let id = opened.map_err(|e| file_error(path, e))?;
        let handle = Handle::new(id, ResourceKind::File, None);
        let root = lib.group_open(id, "/").engine("group_open")?;
        let root = Handle::new(root, ResourceKind::Group, Some(handle.clone()));
        debug!(path = %path.display(), ?mode, "opened file");
        Ok(Self {
            handle,
            root: Location::new_root(root),
            mode,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> FileMode {
        self.mode
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Write the file to disk now.
    pub fn flush(&self) -> Result<()> {
        library()
            .file_flush(self.handle.id())
            .engine("file_flush")
    }

    /// The root group.
    pub fn root(&self) -> Group {
        Group::new(self.root.clone())
    }

    /// Shorthand for [`Container::open_dataset`].
    pub fn dataset(&self, path: &str) -> Result<Dataset> {
        self.open_dataset(path)
    }

    /// Release this owner of the file, reporting any engine failure.
    ///
    /// Objects opened from the file keep it open until they go away too.
    pub fn close(self) -> Result<()> {
        let Self { handle, root, .. } = self;
        drop(root);
        handle.close()
    }
}

fn file_error(path: &Path, e: EngineError) -> Error {
    let shown = path.display().to_string();
    match e {
        EngineError::FileNotFound(_) => Error::NotFound(shown),
        EngineError::Io(io) if io.kind() == ErrorKind::AlreadyExists => Error::AlreadyExists(shown),
        EngineError::Io(io) if io.kind() == ErrorKind::NotFound => Error::NotFound(shown),
        source => Error::NativeEngineError {
            op: "file_open",
            source,
        },
    }
}

impl Sealed for File {
    fn location(&self) -> &Location {
        &self.root
    }
}

impl Container for File {}

impl AttributeOwner for File {
    fn attribute_owner(&self) -> &Handle {
        &self.root.handle
    }
}

impl HasAttributes for File {}
