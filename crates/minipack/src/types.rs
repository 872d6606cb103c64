//! Shared type aliases used across the bundler.

use std::hash::BuildHasherDefault;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;

/// Insertion-ordered map with the fast FxHasher.
pub type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Insertion-ordered set with the fast FxHasher.
pub type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;
