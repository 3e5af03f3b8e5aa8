//! Storage engine behind the hdfobj object layer.
//!
//! The engine works like a native container library: every open file,
//! group, dataset, attribute and dataspace is an integer [`ObjectId`] in a
//! process-wide table, and every operation takes and returns identifiers.
//!
//! A file's object tree is held in memory while any identifier that
//! belongs to it is open. Releasing the last such identifier writes a
//! modified tree back to disk.
//!
//! ```no_run
//! use hdfobj_engine::{library, FileCreate};
//! use hdfobj_format::datatype::Datatype;
//!
//! let lib = library();
//! let file = lib.file_create("data.hob", FileCreate::Truncate)?;
//! let space = lib.space_create(&[3])?;
//! let dset = lib.dataset_create(file, "values", Datatype::integer(4, true), space)?;
//! let bytes: Vec<u8> = [1i32, 2, 3].iter().flat_map(|v| v.to_le_bytes()).collect();
//! lib.dataset_write(dset, Datatype::integer(4, true), None, &bytes)?;
//! for id in [dset, space, file] {
//!     lib.close(id)?;
//! }
//! # Ok::<(), hdfobj_engine::EngineError>(())
//! ```

pub mod convert;
pub mod error;
pub mod hyperslab;
pub mod id;
pub mod library;

use std::sync::OnceLock;

pub use error::EngineError;
pub use id::{DatasetCreate, FileAccess, FileCreate, ObjectId, ObjectType};
pub use library::Library;

static LIBRARY: OnceLock<Library> = OnceLock::new();

/// The process-wide library, initialized on first use.
pub fn library() -> &'static Library {
    LIBRARY.get_or_init(|| {
        tracing::debug!("initializing storage library");
        Library::new()
    })
}
