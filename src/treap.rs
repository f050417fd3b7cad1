//! Module `treap` implements the persistent, copy-on-write ordered map.
//!
//! The public contract mirrors `llrb`'s `set`/`insert`/`remove` family in
//! the teacher crate, but every mutation returns a *new* root id instead of
//! mutating `self` in place (spec.md invariant 3): the node and value
//! arenas are append-only, so an old root remains a perfectly valid handle
//! on the prior state for as long as the arenas live.
//!
//! `merge`/`split` are the textbook treap primitives with one change: every
//! recursion level that would mutate a node in place instead clones it into
//! a fresh arena slot first (spec.md §4.D).

use rand::RngCore;

use crate::arena::Arena;
use crate::hash::fnv1a;
use crate::node::{Node, NodeId, NULL};

/// Outcome of [insert], distinguishing a fresh insert from the two no-op
/// cases the protocol layer needs to tell apart.
pub enum Inserted {
    /// Key was absent; `root` is the new tree containing it.
    New(NodeId),
    /// Key already held this exact value; root is unchanged.
    SameValue(NodeId),
    /// Key already held a different value; insert is rejected, root is
    /// unchanged (spec.md §4.D: "duplicate-insert is an error, not an
    /// overwrite").
    Conflict(NodeId),
}

impl Inserted {
    pub fn root(&self) -> NodeId {
        match self {
            Inserted::New(r) | Inserted::SameValue(r) | Inserted::Conflict(r) => *r,
        }
    }
}

/// Outcome of [remove].
pub enum Removed {
    Gone(NodeId),
    /// Key was already absent; root is unchanged (idempotent, spec.md §8
    /// property 3).
    Absent(NodeId),
}

impl Removed {
    pub fn root(&self) -> NodeId {
        match self {
            Removed::Gone(r) | Removed::Absent(r) => *r,
        }
    }
}

/// Read the value stored for `key` under `root`, or `None` if absent.
pub fn find(nodes: &Arena<Node>, values: &Arena<Vec<u8>>, root: NodeId, key: &str) -> Option<Vec<u8>> {
    let hkey = fnv1a(key.as_bytes());
    find_by_hash(nodes, values, root, key, hkey)
}

fn find_by_hash(
    nodes: &Arena<Node>,
    values: &Arena<Vec<u8>>,
    root: NodeId,
    key: &str,
    hkey: u64,
) -> Option<Vec<u8>> {
    if root == NULL {
        return None;
    }
    let node = nodes.get(root);
    let probe = (hkey, key);
    match probe.cmp(&node.order_key()) {
        std::cmp::Ordering::Equal => Some(values.get(node.vid).clone()),
        std::cmp::Ordering::Less => find_by_hash(nodes, values, node.left, key, hkey),
        std::cmp::Ordering::Greater => find_by_hash(nodes, values, node.right, key, hkey),
    }
}

/// In-order predecessor key of `key` under `root`: the largest key that
/// sorts strictly before `(hkey, key)`. Used by [remove] to isolate the
/// node being deleted via two splits. Returns the *key*, not a value —
/// spec.md §9 flags a draft that returned the wrong type here.
fn find_less_than(nodes: &Arena<Node>, root: NodeId, key: &str, hkey: u64) -> Option<String> {
    if root == NULL {
        return None;
    }
    let node = nodes.get(root);
    let probe = (hkey, key);
    if probe.cmp(&node.order_key()) == std::cmp::Ordering::Greater {
        match find_less_than(nodes, node.right, key, hkey) {
            Some(found) => Some(found),
            None => Some(node.key.clone()),
        }
    } else {
        find_less_than(nodes, node.left, key, hkey)
    }
}

/// Merge two trees where every key in `left` sorts before every key in
/// `right` (the caller guarantees this through `split`). Clones every node
/// on the merge spine into a fresh id; shared subtrees are referenced by
/// the old id and never touched.
fn merge(nodes: &mut Arena<Node>, left: NodeId, right: NodeId) -> NodeId {
    if left == NULL {
        return right;
    }
    if right == NULL {
        return left;
    }
    let (ly, ry) = (nodes.get(left).y, nodes.get(right).y);
    if ly > ry {
        let mut clone = nodes.get(left).clone();
        let merged_right = merge(nodes, clone.right, right);
        clone.right = merged_right;
        nodes.add(clone)
    } else {
        let mut clone = nodes.get(right).clone();
        let merged_left = merge(nodes, left, clone.left);
        clone.left = merged_left;
        nodes.add(clone)
    }
}

/// Split `root` on the composite order `(hkey, key)`: the left output holds
/// every key less-or-equal to `(hkey, key)`, the right output holds every
/// key strictly greater.
fn split(nodes: &mut Arena<Node>, root: NodeId, key: &str, hkey: u64) -> (NodeId, NodeId) {
    if root == NULL {
        return (NULL, NULL);
    }
    let mut clone = nodes.get(root).clone();
    let probe = (hkey, key);
    if probe.cmp(&clone.order_key()) == std::cmp::Ordering::Less {
        let (l, r) = split(nodes, clone.left, key, hkey);
        clone.left = r;
        let id = nodes.add(clone);
        (l, id)
    } else {
        let (l, r) = split(nodes, clone.right, key, hkey);
        clone.right = l;
        let id = nodes.add(clone);
        (id, r)
    }
}

/// Insert `key -> value` under `root`. Allocates a fresh leaf (new
/// [ValueId], new random priority) only when the key is genuinely new.
pub fn insert(
    nodes: &mut Arena<Node>,
    values: &mut Arena<Vec<u8>>,
    rng: &mut dyn RngCore,
    root: NodeId,
    key: &str,
    value: &[u8],
) -> Inserted {
    let hkey = fnv1a(key.as_bytes());
    if let Some(existing) = find_by_hash(nodes, values, root, key, hkey) {
        return if existing.as_slice() == value {
            Inserted::SameValue(root)
        } else {
            Inserted::Conflict(root)
        };
    }

    let (left, right) = split(nodes, root, key, hkey);
    let vid = values.add(value.to_vec());
    let leaf = nodes.add(Node::leaf(key.to_string(), hkey, vid, rng.next_u32()));
    let merged_right = merge(nodes, leaf, right);
    Inserted::New(merge(nodes, left, merged_right))
}

/// Remove `key` from under `root`, isolating it with two splits (around
/// `key`, then around its in-order predecessor) and discarding the middle
/// segment.
pub fn remove(nodes: &mut Arena<Node>, values: &Arena<Vec<u8>>, root: NodeId, key: &str) -> Removed {
    let hkey = fnv1a(key.as_bytes());
    if find_by_hash(nodes, values, root, key, hkey).is_none() {
        return Removed::Absent(root);
    }

    let lt = find_less_than(nodes, root, key, hkey);
    let (left_of_key, right_of_key) = split(nodes, root, key, hkey);
    let new_root = match lt {
        Some(lt_key) => {
            let lt_hkey = fnv1a(lt_key.as_bytes());
            let (outer_left, _middle) = split(nodes, left_of_key, &lt_key, lt_hkey);
            merge(nodes, outer_left, right_of_key)
        }
        None => right_of_key,
    };
    Removed::Gone(new_root)
}

/// `edit` as the original implements it: an unconditional
/// remove-then-insert. The protocol layer is responsible for rejecting an
/// `EDIT` of an absent key before calling this (spec.md §4.D supplemental
/// note in SPEC_FULL.md).
pub fn edit(
    nodes: &mut Arena<Node>,
    values: &mut Arena<Vec<u8>>,
    rng: &mut dyn RngCore,
    root: NodeId,
    key: &str,
    value: &[u8],
) -> NodeId {
    let removed = remove(nodes, values, root, key).root();
    insert(nodes, values, rng, removed, key, value).root()
}

/// Number of entries reachable from `root`.
pub fn size(nodes: &Arena<Node>, root: NodeId) -> usize {
    if root == NULL {
        return 0;
    }
    let node = nodes.get(root);
    1 + size(nodes, node.left) + size(nodes, node.right)
}

/// In-order traversal, yielding `(key, value)` pairs in strictly ascending
/// `(hkey, key)` order (spec.md §8 property 5).
pub fn in_order(nodes: &Arena<Node>, values: &Arena<Vec<u8>>, root: NodeId, out: &mut Vec<(String, Vec<u8>)>) {
    if root == NULL {
        return;
    }
    let node = nodes.get(root);
    in_order(nodes, values, node.left, out);
    out.push((node.key.clone(), values.get(node.vid).clone()));
    in_order(nodes, values, node.right, out);
}

#[cfg(test)]
#[path = "treap_test.rs"]
mod treap_test;
