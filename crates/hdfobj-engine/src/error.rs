//! Error type for engine operations.

use std::path::PathBuf;

use hdfobj_format::datatype::Datatype;
use hdfobj_format::FormatError;
use thiserror::Error;

use crate::id::{ObjectId, ObjectType};

/// Failure reported by a storage engine call.
#[derive(Debug, Error)]
pub enum EngineError {
    /// I/O error from the filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The file contents could not be parsed.
    #[error("format error: {0}")]
    Format(#[from] FormatError),
    /// The identifier is unknown or already closed.
    #[error("invalid identifier {0}")]
    InvalidId(ObjectId),
    /// The identifier refers to a different kind of resource.
    #[error("identifier {id} is a {actual}, expected {expected}")]
    WrongType {
        id: ObjectId,
        expected: ObjectType,
        actual: ObjectType,
    },
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    /// The file is already open in a conflicting mode.
    #[error("file already open: {}", .0.display())]
    FileAlreadyOpen(PathBuf),
    #[error("file is open read-only")]
    ReadOnly,
    /// The file an identifier belongs to is no longer open.
    #[error("file is closed")]
    FileClosed,
    #[error("link not found: {0}")]
    LinkNotFound(String),
    #[error("link already exists: {0}")]
    LinkExists(String),
    #[error("not a group: {0}")]
    NotAGroup(String),
    #[error("not a dataset: {0}")]
    NotADataset(String),
    #[error("attribute not found: {0}")]
    AttributeNotFound(String),
    #[error("attribute already exists: {0}")]
    AttributeExists(String),
    #[error("invalid link name: {0:?}")]
    InvalidName(String),
    /// A raw buffer does not hold exactly the selected elements.
    #[error("buffer size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    /// A dataspace passed for I/O does not describe the object's extent.
    #[error("dataspace extent {actual:?} does not match {expected:?}")]
    ExtentMismatch { expected: Vec<u64>, actual: Vec<u64> },
    #[error("hyperslab start {start:?} count {count:?} exceeds extent {dims:?}")]
    SelectionOutOfBounds {
        start: Vec<u64>,
        count: Vec<u64>,
        dims: Vec<u64>,
    },
    /// A value cannot be represented in the destination type.
    #[error("cannot convert {from} to {to}: value out of range")]
    ConversionOverflow { from: Datatype, to: Datatype },
}

impl EngineError {
    /// Stable numeric diagnostic code for this failure.
    pub fn code(&self) -> i32 {
        match self {
            EngineError::Io(_) => 1,
            EngineError::Format(_) => 2,
            EngineError::InvalidId(_) => 10,
            EngineError::WrongType { .. } => 11,
            EngineError::FileNotFound(_) => 20,
            EngineError::FileAlreadyOpen(_) => 21,
            EngineError::ReadOnly => 22,
            EngineError::FileClosed => 23,
            EngineError::LinkNotFound(_) => 30,
            EngineError::LinkExists(_) => 31,
            EngineError::NotAGroup(_) => 32,
            EngineError::NotADataset(_) => 33,
            EngineError::AttributeNotFound(_) => 34,
            EngineError::AttributeExists(_) => 35,
            EngineError::InvalidName(_) => 36,
            EngineError::SizeMismatch { .. } => 40,
            EngineError::ExtentMismatch { .. } => 41,
            EngineError::SelectionOutOfBounds { .. } => 42,
            EngineError::ConversionOverflow { .. } => 43,
        }
    }
}
