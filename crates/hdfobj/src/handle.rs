//! Shared ownership of engine identifiers.
//!
//! A [`Handle`] owns one engine identifier. Clones share it; the identifier
//! is released exactly once, when the last clone goes away or when
//! [`Handle::release`] is called. A handle also holds its parent handle, so
//! a group or dataset keeps the objects it was opened through alive.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use hdfobj_engine::{library, ObjectId};
use tracing::{trace, warn};

use crate::error::{EngineResultExt, Result};

/// Kind of resource a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    File,
    Group,
    Dataset,
    Attribute,
    Dataspace,
}

struct HandleInner {
    id: ObjectId,
    kind: ResourceKind,
    open: Cell<bool>,
    parent: Option<Handle>,
}

impl HandleInner {
    fn release(&self) -> Result<()> {
        if !self.open.replace(false) {
            return Ok(());
        }
        trace!(id = %self.id, kind = ?self.kind, "releasing handle");
        library().close(self.id).engine("close")
    }
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(id = %self.id, kind = ?self.kind, error = %e, "failed to release handle");
        }
    }
}

/// Reference-counted owner of one engine identifier.
#[derive(Clone)]
pub struct Handle {
    inner: Rc<HandleInner>,
}

impl Handle {
    /// Take ownership of a freshly opened identifier.
    pub(crate) fn new(id: ObjectId, kind: ResourceKind, parent: Option<Handle>) -> Self {
        Self {
            inner: Rc::new(HandleInner {
                id,
                kind,
                open: Cell::new(true),
                parent,
            }),
        }
    }

    /// The engine identifier, even after release.
    ///
    /// Engine calls on a released identifier fail with an invalid
    /// identifier error.
    pub fn id(&self) -> ObjectId {
        self.inner.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.inner.kind
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.get()
    }

    /// Number of owners sharing this identifier.
    pub fn owner_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    /// Handle this one was opened through, if any.
    pub fn parent(&self) -> Option<&Handle> {
        self.inner.parent.as_ref()
    }

    /// Release the identifier now, for every owner.
    ///
    /// Releasing an already released handle does nothing.
    pub fn release(&self) -> Result<()> {
        self.inner.release()
    }

    /// Give up this owner. When it is the last one, the identifier is
    /// released and any engine failure is returned instead of logged.
    pub fn close(self) -> Result<()> {
        match Rc::try_unwrap(self.inner) {
            Ok(inner) => inner.release(),
            Err(_shared) => Ok(()),
        }
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("open", &self.inner.open.get())
            .field("owners", &self.owner_count())
            .finish()
    }
}
