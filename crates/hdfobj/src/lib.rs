//! Object-oriented access to hierarchical scientific data files.
//!
//! A file holds a tree of groups, typed multidimensional datasets and small
//! attributes. This crate wraps the identifier-based storage engine in
//! reference-counted handles and maps Rust record types onto stored
//! elements:
//!
//! - primitive numbers (`i8`..`u64`, `f32`, `f64`) are stored as one
//!   element each;
//! - pairs `(A, B)`, arrays `[T; N]` and structs deriving [`Record`] are
//!   flattened into K consecutive elements of one storage kind.
//!
//! Every extent and element count is in atomic elements, so a dataset of
//! M three-field records reports `element_count() == 3 * M` and reads
//! back as M records.
//!
//! ```no_run
//! use hdfobj::{Container, File, HasAttributes, Record};
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Record)]
//! struct Point {
//!     x: f64,
//!     y: f64,
//!     z: f64,
//! }
//!
//! let file = File::create("points.hob")?;
//! let points = [Point { x: 0.0, y: 1.0, z: 2.0 }; 4];
//! let ds = file.write_dataset("scan/points", &points)?;
//! assert_eq!(ds.element_count(), 12);
//! assert_eq!(ds.read::<Point>()?.len(), 4);
//!
//! ds.write_attribute_scalar("version", 10i32)?;
//! # Ok::<(), hdfobj::Error>(())
//! ```

extern crate self as hdfobj;

mod attribute;
mod container;
mod dataset;
pub mod descriptor;
pub mod element;
pub mod error;
mod file;
mod group;
pub mod handle;
mod io;
mod path;
pub mod slab;

pub use attribute::{Attribute, HasAttributes};
pub use container::{Container, CreateMode};
pub use dataset::Dataset;
pub use descriptor::{common_kind, FieldDescriptor, Record, TypeDescriptor};
pub use element::{Element, ElementKind, Value};
pub use error::{Error, Result};
pub use file::{File, FileMode};
pub use group::Group;
pub use handle::{Handle, ResourceKind};
pub use slab::{Selection, Slab};

pub use hdfobj_engine::{library, EngineError, Library};

#[cfg(feature = "derive")]
pub use hdfobj_derive::Record;
