//! Module `version` implements the append-only registry of named snapshots
//! (spec.md §4.E).

use crate::error::{Error, Result};
use crate::node::NodeId;

/// A single named snapshot: just the root it was taken at (spec.md data
/// model, "Version").
#[derive(Clone, Copy)]
pub struct Version {
    pub root: NodeId,
}

/// Ordered, append-only list of [Version]s, indexed zero-based.
#[derive(Clone, Default)]
pub struct Registry {
    versions: Vec<Version>,
}

impl Registry {
    pub fn new() -> Registry {
        Registry {
            versions: Vec::new(),
        }
    }

    /// Append `root` as a new version, returning its zero-based index —
    /// always `len() - 1` after the push (spec.md §9, snapshot numbering
    /// resolution).
    pub fn snapshot(&mut self, root: NodeId) -> usize {
        self.versions.push(Version { root });
        self.versions.len() - 1
    }

    /// Look up the root for version `v`.
    pub fn get(&self, v: usize) -> Result<NodeId> {
        self.versions
            .get(v)
            .map(|version| version.root)
            .ok_or_else(|| Error::Semantic(
                "version".to_string(),
                format!("invalid version {}", v),
            ))
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<Version> {
        self.versions.iter()
    }

    pub fn push_loaded(&mut self, root: NodeId) {
        self.versions.push(Version { root });
    }
}

#[cfg(test)]
#[path = "version_test.rs"]
mod version_test;
