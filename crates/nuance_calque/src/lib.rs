//! # nuance_calque
//!
//! Calque - The editor-intelligence layer for nuance.
//!
//! ## Name Origin
//!
//! A **calque** (/kalk/) is a tracing: a sheet of translucent paper laid over a
//! drawing so its lines can be copied onto something new. This crate lays a
//! tracing over the two trees an external resolver produced, the authored
//! *source* and the expanded *result*, and copies back onto the source
//! everything an editor wants to show about it.
//!
//! ## Purpose
//!
//! For every source node, an analysis reports:
//!
//! - **References**: which result nodes it produced
//! - **Selectors**: the fully resolved selector of each rule
//! - **Completions**: variables and mixins visible at that point
//! - **Mixin calls**: which definitions a call matched and what they expanded to
//! - **Variable suggestions**: variables that could replace a literal value
//! - **Computed values**: the evaluated literal of properties and variables
//!
//! ## Architecture
//!
//! ```text
//!  nuance_toile (ResolvedStylesheet)
//!        ↓
//!  RepresentationTree ×2 (source, result)
//!        ↓
//!  ReferenceIndex
//!        ↓
//!  selectors / completions / mixin calls / suggestions / computed values
//!        ↓
//!  Analysis                                  ← This crate
//! ```
//!
//! ## Usage
//!
//! ```
//! use nuance_calque::Analyzer;
//! use nuance_toile::{Dialect, ResolvedStylesheet, TreeBuilder};
//!
//! let mut source = TreeBuilder::new();
//! let foo = source.section(source.root(), ".foo");
//! let padding = source.property(foo, "padding", "2px");
//! let source = source.finish();
//!
//! let mut result = TreeBuilder::new();
//! let rfoo = result.section(result.root(), ".foo");
//! let rpadding = result.property(rfoo, "padding", "2px");
//! result.set_origin(rfoo, foo);
//! result.set_origin(rpadding, padding);
//! let result = result.finish();
//!
//! let stylesheet = ResolvedStylesheet::new(Dialect::Less, source, result);
//! let analysis = Analyzer::new().analyze(&stylesheet);
//!
//! let foo_id = analysis.source_id(foo).unwrap();
//! let padding_id = analysis.source_id(padding).unwrap();
//! assert_eq!(analysis.selectors[&foo_id], ".foo");
//! assert_eq!(analysis.computed_values[&padding_id].as_deref(), Some("2px"));
//! assert!(!analysis.variable_suggestions.contains_key(&padding_id));
//! ```

mod analyzer;
pub mod completions;
pub mod computed;
pub mod dialect;
pub mod mixin_call;
pub mod references;
pub mod representation;
pub mod selectors;
pub mod suggest;


pub use analyzer::{Analysis, AnalysisContext, AnalysisStats, Analyzer, AnalyzerOptions};
pub use completions::{CompletionRecord, MixinCompletion, VariableCompletion};
pub use dialect::{DialectExt, DialectStrategy};
pub use mixin_call::{MixinInvocation, OutputEntry, OutputValue};
pub use references::ReferenceIndex;
pub use representation::{NodeRecord, Repr, RepresentationTree, TreeRole, WrapperId};
pub use suggest::{color_distance, Suggestion};
