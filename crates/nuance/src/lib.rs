//! # Nuance
//!
//! Editor intelligence for LESS and SCSS stylesheets, written in Rust.
//!
//! This crate re-exports all Nuance sub-crates for unified documentation.
//!
//! ## Crates
//!
//! - [`trousse`] - Shared toolbox: hash maps, compact strings, text ranges
//! - [`toile`] - Source and resolved stylesheet trees, the analyzer's input
//! - [`teinte`] - Expression evaluator for variable and property values
//! - [`calque`] - The analyzer: references, completions, suggestions, computed values

/// Shared toolbox.
pub use nuance_trousse as trousse;

/// Stylesheet trees.
pub use nuance_toile as toile;

/// Expression evaluator.
pub use nuance_teinte as teinte;

/// Analyzer.
pub use nuance_calque as calque;
