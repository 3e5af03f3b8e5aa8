//! Object identifiers.

use std::fmt;

use hdfobj_format::datatype::Datatype;

/// Identifier of one open resource.
///
/// Identifiers are handed out in increasing order and never reused, so a
/// closed identifier can never alias a resource opened later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub(crate) u64);

impl ObjectId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of resource an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    File,
    Group,
    Dataset,
    Attribute,
    Dataspace,
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectType::File => "file",
            ObjectType::Group => "group",
            ObjectType::Dataset => "dataset",
            ObjectType::Attribute => "attribute",
            ObjectType::Dataspace => "dataspace",
        };
        f.write_str(name)
    }
}

/// How an existing file is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAccess {
    ReadOnly,
    ReadWrite,
}

/// How a new file is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileCreate {
    /// Discard any existing file at the path.
    Truncate,
    /// Fail if a file already exists at the path.
    Exclusive,
}

/// Options for [`Library::dataset_create_with`](crate::Library::dataset_create_with).
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetCreate<'a> {
    /// Initial contents as elements of the given memory type. The dataset
    /// is zero-filled without them.
    pub data: Option<(Datatype, &'a [u8])>,
    /// Replace a dataset already linked under the name.
    pub replace: bool,
}
