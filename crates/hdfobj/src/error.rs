//! Error types for the object layer.

use hdfobj_engine::EngineError;
use thiserror::Error;

use crate::element::ElementKind;

/// Errors returned by files, groups, datasets and attributes.
#[derive(Debug, Error)]
pub enum Error {
    /// No object exists at the path.
    #[error("not found: {0}")]
    NotFound(String),
    /// An object already exists at the path and overwrite was not requested.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// The path is malformed, or one of its segments names an object of
    /// the wrong kind.
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// A slab selection does not fit inside its extent.
    #[error("selection offset {offset:?} count {count:?} exceeds extent {dims:?}")]
    InvalidSelection {
        dims: Vec<u64>,
        offset: Vec<u64>,
        count: Vec<u64>,
    },
    /// A buffer's element count disagrees with the declared extent.
    #[error("shape mismatch: expected {expected} elements, got {actual}")]
    ShapeMismatch { expected: u64, actual: u64 },
    /// A record type or field kind has no storage mapping.
    #[error("unsupported element type: {0}")]
    UnsupportedElementType(String),
    /// A runtime rank does not match the static rank asked for.
    #[error("rank mismatch: expected {expected}, got {actual}")]
    RankMismatch { expected: usize, actual: usize },
    /// A stored value cannot be represented in the requested field kind.
    #[error("value {value} does not fit in {kind}")]
    ValueOutOfRange { kind: ElementKind, value: String },
    /// The storage engine reported a failure.
    #[error("{op} failed: {source}")]
    NativeEngineError {
        op: &'static str,
        #[source]
        source: EngineError,
    },
}

impl Error {
    /// Diagnostic code of the underlying engine failure, if any.
    pub fn engine_code(&self) -> Option<i32> {
        match self {
            Error::NativeEngineError { source, .. } => Some(source.code()),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Tag an engine result with the operation that produced it.
pub(crate) trait EngineResultExt<T> {
    fn engine(self, op: &'static str) -> Result<T>;
}

impl<T> EngineResultExt<T> for std::result::Result<T, EngineError> {
    fn engine(self, op: &'static str) -> Result<T> {
        self.map_err(|source| Error::NativeEngineError { op, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_diagnostic_is_preserved() {
        let failed: std::result::Result<(), EngineError> = Err(EngineError::ReadOnly);
        let err = failed.engine("dataset_write").unwrap_err();
        assert_eq!(err.engine_code(), Some(22));
        assert_eq!(err.to_string(), "dataset_write failed: file is open read-only");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn other_errors_have_no_engine_code() {
        assert_eq!(Error::NotFound("/a".into()).engine_code(), None);
    }
}
