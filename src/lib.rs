//! `vertree` is a networked in-memory key/value store backed by a
//! persistent (copy-on-write) treap: every mutation produces an immutable
//! logical snapshot reachable by integer version, and any snapshot can be
//! read through or promoted back to become the live store.
//!
//! The persistent map's nodes and values live in append-only arenas
//! addressed by integer id ([arena::Id]) rather than an owning pointer
//! graph, so a historical root stays a valid O(1) handle for as long as the
//! arenas live. A single event-loop thread ([server::Server]) owns the
//! store and drives all client I/O; a second thread ([watch::WatchManager])
//! owns asynchronous change-notification delivery.

pub mod arena;
pub mod codec;
pub mod config;
pub mod error;
pub mod hash;
pub mod node;
pub mod protocol;
pub mod server;
pub mod store;
pub mod treap;
pub mod version;
pub mod watch;

pub use crate::config::Config;
pub use crate::error::{Error, Result};
pub use crate::server::Server;
pub use crate::store::{Outcome, Store};
