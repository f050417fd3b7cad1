//! Module `codec` implements the two on-disk image formats (spec.md §4.F):
//!
//! * the **full image** — `STORE`/`LOAD` — a whitespace-delimited dump of
//!   every arena plus the version list plus the live root. This is the
//!   canonical, round-trippable format (SPEC_FULL.md §4.F).
//! * the **VSTORE image** — `VSTORE`/`VLOAD` — an in-order* export of a
//!   single tree, renumbered so the file is root-rooted. It carries no
//!   version history and is not interchangeable with the full image.
//!
//! (*the original renumbers in post-order so that a node's children are
//! always written, hence already assigned an id, before the node itself;
//! we keep that numbering.)
//!
//! `VLOAD` appends the decoded tree onto the *existing* node/value arenas
//! rather than wiping them, so any already-taken snapshots keep pointing at
//! valid ids — a deliberate departure from the original's global-arena wipe,
//! recorded as an Open Question resolution in SPEC_FULL.md §9 / DESIGN.md.

use crate::arena::{Arena, Id};
use crate::error::{Error, Result};
use crate::node::{Node, NodeId, ValueId, NULL};
use crate::version::Registry;

fn codec_err(msg: impl Into<String>) -> Error {
    Error::Codec("<image>".to_string(), msg.into())
}

struct Tokens<'a> {
    rest: std::str::SplitWhitespace<'a>,
}

impl<'a> Tokens<'a> {
    fn new(text: &'a str) -> Tokens<'a> {
        Tokens {
            rest: text.split_whitespace(),
        }
    }

    fn next(&mut self) -> Result<&'a str> {
        self.rest.next().ok_or_else(|| codec_err("unexpected end of input"))
    }

    fn next_u32(&mut self) -> Result<u32> {
        let tok = self.next()?;
        tok.parse::<u32>()
            .map_err(|_| codec_err(format!("expected integer, got {:?}", tok)))
    }

    fn next_usize(&mut self) -> Result<usize> {
        let tok = self.next()?;
        tok.parse::<usize>()
            .map_err(|_| codec_err(format!("expected integer, got {:?}", tok)))
    }
}

/// Encode the full image: live root, every node, every value, every
/// version's root — in exactly the order [decode_full_image] expects.
pub fn encode_full_image(nodes: &Arena<Node>, values: &Arena<Vec<u8>>, versions: &Registry, root: NodeId) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", root));

    let n_nodes = nodes.len().saturating_sub(1); // exclude the index-0 sentinel
    out.push_str(&format!("{}\n", n_nodes));
    for node in nodes.iter().skip(1) {
        out.push_str(&format!(
            "{} {} {} {} {} {}\n",
            node.key, node.hkey, node.vid, node.y, node.left, node.right
        ));
    }

    out.push_str(&format!("{}\n", values.len()));
    for value in values.iter() {
        out.push_str(&format!("{}\n", String::from_utf8_lossy(value)));
    }

    out.push_str(&format!("{}\n", versions.len()));
    for version in versions.iter() {
        out.push_str(&format!("{}\n", version.root));
    }

    out
}

/// Decode a full image, replacing arenas/versions/root wholesale. Reports
/// one error and returns it without touching any `&mut` state — callers
/// must only commit the returned tuple on `Ok` (spec.md §4.F, "abort the
/// load without partial state changes").
pub fn decode_full_image(text: &str) -> Result<(Arena<Node>, Arena<Vec<u8>>, Registry, NodeId)> {
    let mut tok = Tokens::new(text);

    let root_raw = tok.next_u32()?;

    let mut nodes = crate::node::new_arena();
    let n_nodes = tok.next_usize()?;
    for _ in 0..n_nodes {
        let key = tok.next()?.to_string();
        let hkey = tok.next()?.parse::<u64>().map_err(|_| codec_err("bad hkey"))?;
        let vid = Id::new(tok.next_u32()?);
        let y = tok.next_u32()?;
        let left = Id::new(tok.next_u32()?);
        let right = Id::new(tok.next_u32()?);
        validate_ref(left, n_nodes)?;
        validate_ref(right, n_nodes)?;
        nodes.add(Node {
            key,
            hkey,
            vid,
            y,
            left,
            right,
        });
    }

    let mut values: Arena<Vec<u8>> = Arena::new();
    let n_values = tok.next_usize()?;
    for _ in 0..n_values {
        values.add(tok.next()?.as_bytes().to_vec());
    }

    let mut versions = Registry::new();
    let n_versions = tok.next_usize()?;
    for _ in 0..n_versions {
        let vroot = Id::new(tok.next_u32()?);
        validate_ref(vroot, n_nodes)?;
        versions.push_loaded(vroot);
    }

    let root: NodeId = Id::new(root_raw);
    validate_ref(root, n_nodes)?;

    Ok((nodes, values, versions, root))
}

fn validate_ref(id: NodeId, n_nodes: usize) -> Result<()> {
    if id == NULL || (id.as_u32() as usize) <= n_nodes {
        Ok(())
    } else {
        Err(codec_err(format!(
            "node id {} outside [1, {}]",
            id, n_nodes
        )))
    }
}

/// Encode a single tree rooted at `root` as a renumbered, root-rooted
/// in-order* export. Serial numbers start at 1 and are assigned in
/// post-order, so `left`/`right` references in a record always name an
/// already-written serial.
pub fn encode_vstore_image(nodes: &Arena<Node>, values: &Arena<Vec<u8>>, root: NodeId) -> String {
    let mut out = String::new();
    let total = crate::treap::size(nodes, root);
    out.push_str(&format!("{}\n", total));

    let mut serial = 1u32;
    let assigned_root = write_vstore_node(nodes, values, root, &mut serial, &mut out);
    out.push_str(&format!("{}\n", assigned_root));
    out
}

fn write_vstore_node(
    nodes: &Arena<Node>,
    values: &Arena<Vec<u8>>,
    id: NodeId,
    serial: &mut u32,
    out: &mut String,
) -> u32 {
    if id == NULL {
        return 0;
    }
    let node = nodes.get(id);
    let left = write_vstore_node(nodes, values, node.left, serial, out);
    let right = write_vstore_node(nodes, values, node.right, serial, out);

    let my_serial = *serial;
    *serial += 1;
    out.push_str(&format!(
        "{} {} {} {} {} {}\n",
        my_serial,
        node.key,
        node.y,
        left,
        right,
        String::from_utf8_lossy(values.get(node.vid))
    ));
    my_serial
}

/// Decode a VSTORE image, appending the reconstructed tree onto the
/// existing arenas (see module docs) and returning the new root.
pub fn decode_vstore_image(nodes: &mut Arena<Node>, values: &mut Arena<Vec<u8>>, text: &str) -> Result<NodeId> {
    let mut tok = Tokens::new(text);
    let n = tok.next_usize()?;

    // serial -> freshly allocated NodeId, 0 maps to NULL.
    let mut serial_to_id: Vec<NodeId> = vec![NULL];
    for _ in 0..n {
        let serial = tok.next_u32()?;
        let key = tok.next()?.to_string();
        let y = tok.next_u32()?;
        let left_serial = tok.next_usize()?;
        let right_serial = tok.next_usize()?;
        let value = tok.next()?.as_bytes().to_vec();

        if left_serial >= serial_to_id.len() || right_serial >= serial_to_id.len() {
            return Err(codec_err(format!(
                "vstore record {} references an unassigned serial",
                serial
            )));
        }
        let left = serial_to_id[left_serial];
        let right = serial_to_id[right_serial];

        let hkey = crate::hash::fnv1a(key.as_bytes());
        let vid: ValueId = values.add(value);
        let id = nodes.add(Node {
            key,
            hkey,
            vid,
            y,
            left,
            right,
        });

        if serial_to_id.len() != (serial as usize) {
            return Err(codec_err(format!(
                "vstore serials must be contiguous from 1, got {} after {} records",
                serial,
                serial_to_id.len() - 1
            )));
        }
        serial_to_id.push(id);
    }

    let root_serial = tok.next_usize()?;
    if root_serial >= serial_to_id.len() {
        return Err(codec_err("vstore root references an unassigned serial"));
    }
    Ok(serial_to_id[root_serial])
}

#[cfg(test)]
#[path = "codec_test.rs"]
mod codec_test;
