//! # nuance_toile
//!
//! Toile - The input canvas for nuance.
//!
//! ## Name Origin
//!
//! **Toile** (/twal/) is the French word for the canvas a painting is made on.
//! Everything nuance knows about a stylesheet is painted onto two of them: the
//! authored *source* tree and the *result* tree an external LESS/SCSS resolver
//! produced by substituting variables, expanding mixins and flattening nesting.
//!
//! ## Model
//!
//! Both trees are arenas. Nodes and scopes are addressed by [`NodeId`] and
//! [`ScopeId`] indices, so parent links, origin links (result → source) and
//! mixin descriptors never form a reference cycle.
//!
//! ```text
//!  resolver (external)
//!        ↓
//!  ResolvedStylesheet { dialect, source, result, pruned }   ← This crate
//!        ↓
//!  nuance_calque (analysis)
//! ```

mod ast;
mod builder;
mod error;

pub use ast::*;
pub use builder::TreeBuilder;
pub use error::TreeError;
