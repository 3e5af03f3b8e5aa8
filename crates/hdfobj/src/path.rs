//! Path parsing.
//!
//! Paths use `/` separators; a leading `/` starts at the file's root group.
//! Empty and `.` segments are skipped. `..` is rejected.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ObjectPath<'a> {
    pub absolute: bool,
    pub segments: Vec<&'a str>,
}

impl<'a> ObjectPath<'a> {
    pub fn parse(path: &'a str) -> Result<Self> {
        let mut segments = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => return Err(Error::InvalidPath(path.to_string())),
                s => segments.push(s),
            }
        }
        Ok(Self {
            absolute: path.starts_with('/'),
            segments,
        })
    }

    /// Split off the final name; the path must name something.
    pub fn split_last(&self, original: &str) -> Result<(&[&'a str], &'a str)> {
        match self.segments.split_last() {
            Some((last, parents)) => Ok((parents, last)),
            None => Err(Error::InvalidPath(original.to_string())),
        }
    }
}

/// Absolute path of `name` under the group at `base`.
pub(crate) fn join(base: &str, name: &str) -> String {
    if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Check a single attribute or link name.
pub(crate) fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name == "." || name == ".." {
        return Err(Error::InvalidPath(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_and_relative() {
        let p = ObjectPath::parse("/a/b/c").unwrap();
        assert!(p.absolute);
        assert_eq!(p.segments, vec!["a", "b", "c"]);
        let p = ObjectPath::parse("a/b").unwrap();
        assert!(!p.absolute);
    }

    #[test]
    fn empty_and_dot_segments_are_skipped() {
        let p = ObjectPath::parse("//a/./b/").unwrap();
        assert_eq!(p.segments, vec!["a", "b"]);
    }

    #[test]
    fn parent_segments_are_rejected() {
        assert!(matches!(
            ObjectPath::parse("a/../b"),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn final_name_required() {
        let p = ObjectPath::parse("/").unwrap();
        assert!(p.segments.is_empty());
        assert!(p.split_last("/").is_err());

        let p = ObjectPath::parse("g/d").unwrap();
        let (parents, name) = p.split_last("g/d").unwrap();
        assert_eq!(parents, &["g"]);
        assert_eq!(name, "d");
    }

    #[test]
    fn joining() {
        assert_eq!(join("/", "a"), "/a");
        assert_eq!(join("/a", "b"), "/a/b");
    }

    #[test]
    fn names() {
        assert!(check_name("units").is_ok());
        assert!(check_name("").is_err());
        assert!(check_name("a/b").is_err());
    }
}
