//! Prelude module with the shared collection and pointer types.
//!
//! The rest of the crate imports maps and shared pointers from here so the
//! hashing strategy is decided in one place.

// ═══════════════════════════════════════════════════════════════════════════════
// Core types
// ═══════════════════════════════════════════════════════════════════════════════

pub use std::{
    cell::{Cell, Ref, RefCell},
    collections::VecDeque,
    fmt,
    rc::{Rc, Weak},
};

// ═══════════════════════════════════════════════════════════════════════════════
// Hash maps - FxHash everywhere, property names are short and trusted
// ═══════════════════════════════════════════════════════════════════════════════

pub use rustc_hash::{FxHashMap, FxHashSet};

// ═══════════════════════════════════════════════════════════════════════════════
// IndexMap - insertion ordered, used for object property storage
// ═══════════════════════════════════════════════════════════════════════════════

pub type IndexMap<K, V> =
    indexmap::IndexMap<K, V, core::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

/// Create an empty IndexMap
#[inline]
pub fn index_map_new<K, V>() -> IndexMap<K, V>
where
    K: core::hash::Hash + Eq,
{
    indexmap::IndexMap::with_hasher(Default::default())
}

/// Create an IndexMap with the given capacity
#[inline]
pub fn index_map_with_capacity<K, V>(capacity: usize) -> IndexMap<K, V>
where
    K: core::hash::Hash + Eq,
{
    indexmap::IndexMap::with_capacity_and_hasher(capacity, Default::default())
}
