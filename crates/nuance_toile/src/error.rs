//! Input contract violations.

use thiserror::Error;

use crate::{NodeId, ScopeId};

/// Raised when a resolved stylesheet does not honor the input contract.
///
/// The analyzer itself never produces these; they come from loading and
/// validating a tree handed over by the resolver.
#[derive(Debug, Error)]
pub enum TreeError {
    /// The JSON dump could not be decoded
    #[error("Failed to decode resolved stylesheet: {0}")]
    Decode(#[from] serde_json::Error),

    /// A node id points outside its arena
    #[error("{tree} tree: node {node} is out of range ({len} nodes)")]
    DanglingNode {
        tree: &'static str,
        node: NodeId,
        len: usize,
    },

    /// A scope id points outside its arena
    #[error("{tree} tree: scope {scope} is out of range ({len} scopes)")]
    DanglingScope {
        tree: &'static str,
        scope: ScopeId,
        len: usize,
    },

    /// The root node is not of kind `root`
    #[error("{tree} tree: node {node} is used as root but is not a root node")]
    InvalidRoot { tree: &'static str, node: NodeId },

    /// A child does not point back at the node listing it
    #[error("{tree} tree: node {child} is listed under {parent} but its parent link disagrees")]
    InconsistentParent {
        tree: &'static str,
        parent: NodeId,
        child: NodeId,
    },

    /// Scope parents loop back on themselves
    #[error("{tree} tree: scope {scope} has a cyclic parent chain")]
    CyclicScope { tree: &'static str, scope: ScopeId },
}
