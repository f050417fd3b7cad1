//! Module `node` defines the treap's node record and the two id types that
//! index into the node and value arenas.

use crate::arena::{Arena, Id};

pub type NodeId = Id<Node>;
pub type ValueId = Id<Vec<u8>>;

/// Sentinel identifying an absent child or an empty tree. Index 0 of the
/// node arena is always this dummy record, established by [new_arena].
pub const NULL: NodeId = Id::new(0);

/// A single treap node. `left`/`right` are [NodeId]s, never raw pointers —
/// keeping them as plain integers is what lets a prior root stay valid
/// after newer nodes are appended (spec.md invariant 3, "persistence").
#[derive(Clone)]
pub struct Node {
    pub key: String,
    pub hkey: u64,
    pub vid: ValueId,
    /// Heap priority, drawn once at creation and never changed by a
    /// path-copy (spec.md §9, "randomized priorities").
    pub y: u32,
    pub left: NodeId,
    pub right: NodeId,
}

impl Node {
    pub fn leaf(key: String, hkey: u64, vid: ValueId, y: u32) -> Node {
        Node {
            key,
            hkey,
            vid,
            y,
            left: NULL,
            right: NULL,
        }
    }

    /// Composite order key used everywhere a node is compared: hash first,
    /// original key as the tie-break (spec.md invariant 1).
    #[inline]
    pub fn order_key(&self) -> (u64, &str) {
        (self.hkey, self.key.as_str())
    }
}

/// Construct a fresh node arena with the mandatory index-0 sentinel
/// already pushed (spec.md §4.B).
pub fn new_arena() -> Arena<Node> {
    let mut arena = Arena::new();
    let sentinel = arena.add(Node {
        key: String::new(),
        hkey: 0,
        vid: Id::new(0),
        y: 0,
        left: NULL,
        right: NULL,
    });
    debug_assert_eq!(sentinel, NULL);
    arena
}
