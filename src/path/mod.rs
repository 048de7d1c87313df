//! Telemetry paths.
//!
//! A [`Path`] is an ordered sequence of named elements, each with an
//! optional set of keys, plus an origin and a target. Paths compare, hash
//! and order by their rendered string form (`/a/b[k=v]/c`), which is also
//! the key used by the cache.

mod descriptor;
mod resolver;

pub use descriptor::*;
pub use resolver::*;


use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::hash::Hasher;

use crate::proto::gnmi;
use crate::ProtocolError;

/// One element of a [`Path`]. Keys are kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PathElem {
    pub name: String,
    pub keys: BTreeMap<String, String>,
}

impl PathElem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: BTreeMap::new(),
        }
    }

    pub fn with_key(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.keys.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for PathElem {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for c in self.name.chars() {
            if c == '/' || c == '\\' {
                write!(f, "\\")?;
            }
            write!(f, "{c}")?;
        }
        for (k, v) in &self.keys {
            write!(f, "[{k}=")?;
            for c in v.chars() {
                if c == ']' || c == '\\' {
                    write!(f, "\\")?;
                }
                write!(f, "{c}")?;
            }
            write!(f, "]")?;
        }
        Ok(())
    }
}

/// Immutable telemetry path.
#[derive(Debug, Clone, Default)]
pub struct Path {
    origin: String,
    elems: Vec<PathElem>,
    target: String,
}

impl Path {
    pub fn new(elems: Vec<PathElem>) -> Self {
        Self {
            origin: String::new(),
            elems,
            target: String::new(),
        }
    }

    /// Builds a path from plain element names (no keys).
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(PathElem::new).collect())
    }

    pub fn with_origin(
        mut self,
        origin: impl Into<String>,
    ) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_target(
        mut self,
        target: impl Into<String>,
    ) -> Self {
        self.target = target.into();
        self
    }

    /// Same path with the target removed. Data points never carry a target.
    pub fn without_target(mut self) -> Self {
        self.target.clear();
        self
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn elems(&self) -> &[PathElem] {
        &self.elems
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    /// First `len` elements, keeping origin and target.
    pub fn prefix(
        &self,
        len: usize,
    ) -> Path {
        Path {
            origin: self.origin.clone(),
            elems: self.elems.iter().take(len).cloned().collect(),
            target: self.target.clone(),
        }
    }

    /// Joins a notification prefix with a path relative to it.
    ///
    /// The origin comes from whichever side sets it; both set and different
    /// is a protocol violation. The target comes from the prefix.
    pub fn join(
        prefix: Option<&gnmi::Path>,
        relative: &gnmi::Path,
    ) -> std::result::Result<Path, ProtocolError> {
        let Some(prefix) = prefix else {
            return Ok(Path::from(relative));
        };
        if !prefix.origin.is_empty() && !relative.origin.is_empty() && prefix.origin != relative.origin {
            return Err(ProtocolError::OriginConflict {
                prefix: prefix.origin.clone(),
                path: relative.origin.clone(),
            });
        }
        let origin = if prefix.origin.is_empty() {
            relative.origin.clone()
        } else {
            prefix.origin.clone()
        };
        let elems = prefix
            .elem
            .iter()
            .chain(relative.elem.iter())
            .map(PathElem::from)
            .collect();
        Ok(Path {
            origin,
            elems,
            target: prefix.target.clone(),
        })
    }

    pub fn to_proto(&self) -> gnmi::Path {
        gnmi::Path {
            origin: self.origin.clone(),
            elem: self.elems.iter().map(gnmi::PathElem::from).collect(),
            target: self.target.clone(),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.elems.is_empty() {
            return write!(f, "/");
        }
        for e in &self.elems {
            write!(f, "/{e}")?;
        }
        Ok(())
    }
}

impl PartialEq for Path {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        self.to_string() == other.to_string()
    }
}

impl Eq for Path {}

impl Hash for Path {
    fn hash<H: Hasher>(
        &self,
        state: &mut H,
    ) {
        self.to_string().hash(state);
    }
}

impl PartialOrd for Path {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Path {
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl From<&gnmi::PathElem> for PathElem {
    fn from(e: &gnmi::PathElem) -> Self {
        Self {
            name: e.name.clone(),
            keys: e.key.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

impl From<&PathElem> for gnmi::PathElem {
    fn from(e: &PathElem) -> Self {
        Self {
            name: e.name.clone(),
            key: e.keys.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        }
    }
}

impl From<&gnmi::Path> for Path {
    fn from(p: &gnmi::Path) -> Self {
        Self {
            origin: p.origin.clone(),
            elems: p.elem.iter().map(PathElem::from).collect(),
            target: p.target.clone(),
        }
    }
}
