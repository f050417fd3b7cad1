//! Module `hash` implements the 64-bit FNV-1a hash used as the treap's
//! primary ordering key.
//!
//! Refer to [fnv1a] for details. The hash is deliberately not used as a
//! standard library [std::hash::Hasher] implementation: treap nodes need
//! the raw `u64` digest stored alongside the key, not an opaque finisher.

const OFFSET_BASIS: u64 = 14_695_981_039_346_656_037;
const PRIME: u64 = 1_099_511_628_211;

/// Compute the 64-bit FNV-1a digest of `bytes`.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = OFFSET_BASIS;
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
#[path = "hash_test.rs"]
mod hash_test;
