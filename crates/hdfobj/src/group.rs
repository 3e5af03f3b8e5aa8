//! Groups: named containers of datasets and other groups.

use crate::attribute::{AttributeOwner, HasAttributes};
use crate::container::{Container, Location, Sealed};
use crate::error::Result;
use crate::handle::Handle;

/// An open group.
///
/// Cloning shares the underlying handle. The group keeps the groups it was
/// opened through, and so its file, open.
#[derive(Debug, Clone)]
pub struct Group {
    loc: Location,
}

impl Group {
    pub(crate) fn new(loc: Location) -> Self {
        Self { loc }
    }

    /// Name of the group within its parent; `/` for the root group.
    pub fn name(&self) -> &str {
        match self.loc.path.rsplit_once('/') {
            Some((_, "")) | None => "/",
            Some((_, name)) => name,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.loc.handle
    }

    /// Release this owner of the group, reporting any engine failure.
    pub fn close(self) -> Result<()> {
        self.loc.handle.close()
    }
}

impl Sealed for Group {
    fn location(&self) -> &Location {
        &self.loc
    }
}

impl Container for Group {}

impl AttributeOwner for Group {
    fn attribute_owner(&self) -> &Handle {
        &self.loc.handle
    }
}

impl HasAttributes for Group {}
