//! Module `store` ties the arenas, the persistent map and the version
//! registry together into the single piece of state the event loop drives
//! mutations against. There is exactly one [Store] per running server
//! (spec.md §5, "single-owner and unsynchronized").

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::{rngs::SmallRng, SeedableRng};

use crate::arena::Arena;
use crate::codec;
use crate::error::{Error, Result};
use crate::node::{Node, NodeId, NULL};
use crate::treap::{self, Inserted, Removed};
use crate::version::Registry;

/// Result of a mutating command, used by the protocol layer both to pick a
/// response line and to decide whether to fire a watch notification.
pub enum Outcome {
    Ok,
    AlreadyExists,
    NotFound,
}

pub struct Store {
    nodes: Arena<Node>,
    values: Arena<Vec<u8>>,
    versions: Registry,
    root: NodeId,
    rng: SmallRng,
}

impl Store {
    /// Fresh, empty store. The priority RNG is seeded once from the
    /// monotonic clock, exactly as spec.md §4.D / §9 require: deterministic
    /// replay across runs is explicitly not a requirement, only per-run
    /// stability of a node's own priority once chosen.
    pub fn new() -> Store {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);
        Store {
            nodes: crate::node::new_arena(),
            values: Arena::new(),
            versions: Registry::new(),
            root: NULL,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        treap::find(&self.nodes, &self.values, self.root, key)
    }

    pub fn set(&mut self, key: &str, value: &[u8]) -> Outcome {
        match treap::insert(&mut self.nodes, &mut self.values, &mut self.rng, self.root, key, value) {
            Inserted::New(root) => {
                self.root = root;
                Outcome::Ok
            }
            Inserted::SameValue(root) => {
                self.root = root;
                Outcome::Ok
            }
            Inserted::Conflict(_) => Outcome::AlreadyExists,
        }
    }

    pub fn del(&mut self, key: &str) -> Outcome {
        match treap::remove(&mut self.nodes, &self.values, self.root, key) {
            Removed::Gone(root) => {
                self.root = root;
                Outcome::Ok
            }
            Removed::Absent(_) => Outcome::NotFound,
        }
    }

    pub fn edit(&mut self, key: &str, value: &[u8]) -> Outcome {
        if self.get(key).is_none() {
            return Outcome::NotFound;
        }
        self.root = treap::edit(&mut self.nodes, &mut self.values, &mut self.rng, self.root, key, value);
        Outcome::Ok
    }

    /// `SNAPSHOT`: append the live root, return its zero-based version
    /// index.
    pub fn snapshot(&mut self) -> usize {
        self.versions.snapshot(self.root)
    }

    /// `VGET v key`: read through a historical root without touching the
    /// live root.
    pub fn vget(&self, v: usize, key: &str) -> Result<Option<Vec<u8>>> {
        let root = self.versions.get(v)?;
        Ok(treap::find(&self.nodes, &self.values, root, key))
    }

    /// `CHANGE v`: promote version `v` into the live root.
    pub fn change(&mut self, v: usize) -> Result<()> {
        self.root = self.versions.get(v)?;
        Ok(())
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// `STORE file`: serialize the full image to `save_dir/file`.
    pub fn store_image(&self, save_dir: &Path, file: &str) -> Result<()> {
        let text = codec::encode_full_image(&self.nodes, &self.values, &self.versions, self.root);
        write_save_file(save_dir, file, &text)
    }

    /// `LOAD file`: atomically replace arenas, versions and live root.
    pub fn load_image(&mut self, save_dir: &Path, file: &str) -> Result<()> {
        let text = read_save_file(save_dir, file)?;
        let (nodes, values, versions, root) = codec::decode_full_image(&text)?;
        self.nodes = nodes;
        self.values = values;
        self.versions = versions;
        self.root = root;
        Ok(())
    }

    /// `VSTORE file`: serialize only the live tree, without history.
    pub fn vstore_image(&self, save_dir: &Path, file: &str) -> Result<()> {
        let text = codec::encode_vstore_image(&self.nodes, &self.values, self.root);
        write_save_file(save_dir, file, &text)
    }

    /// `VLOAD file`: decode a single-tree image onto the live store,
    /// appending onto the existing arenas so prior versions stay valid
    /// (SPEC_FULL.md §4.F).
    pub fn vload_image(&mut self, save_dir: &Path, file: &str) -> Result<()> {
        let text = read_save_file(save_dir, file)?;
        self.root = codec::decode_vstore_image(&mut self.nodes, &mut self.values, &text)?;
        Ok(())
    }
}

impl Default for Store {
    fn default() -> Store {
        Store::new()
    }
}

fn write_save_file(save_dir: &Path, file: &str, text: &str) -> Result<()> {
    fs::create_dir_all(save_dir)?;
    fs::write(save_dir.join(file), text)?;
    Ok(())
}

fn read_save_file(save_dir: &Path, file: &str) -> Result<String> {
    let path = save_dir.join(file);
    fs::read_to_string(&path).map_err(|err| {
        Error::Codec(
            "<image>".to_string(),
            format!("in opening {}: {}", path.display(), err),
        )
    })
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
