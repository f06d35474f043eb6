//! Trousse - The shared kit for nuance.
//!
//! A trousse is the roll-up case a painter carries brushes and knives in.
//! This crate holds the small set of collection types and helpers every other
//! nuance crate reaches for, so the whole workspace agrees on one string type,
//! one hash map and one ordered map.
//!
//! # Modules
//!
//! - **text_range**: Byte ranges into authored stylesheet text

pub mod text_range;

pub use text_range::TextRange;

// Re-export compact_str::CompactString for convenience
pub use compact_str::CompactString;

// Re-export smallvec for stack-optimized collections
pub use smallvec::SmallVec;

// Re-export rustc-hash for fast hash maps/sets
pub use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet};

// Re-export phf for compile-time perfect hash functions
pub use phf::{phf_map, Map as PhfMap};

/// Insertion-ordered map keyed with the Fx hasher.
///
/// Scope bindings and analysis output keep the order in which the resolver
/// (or the engines) produced them, so enumeration stays deterministic.
pub type FxIndexMap<K, V> = indexmap::IndexMap<K, V, FxBuildHasher>;
