//! Mixin call tracing.
//!
//! The resolver leaves, on every source node where a mixin call was expanded,
//! the list of definitions the call matched and the result nodes each one
//! spliced in. This module only restructures that data.

use nuance_toile::{NodeId, StyleTree};
use nuance_trousse::{CompactString, FxIndexMap};
use serde::Serialize;

use crate::{AnalysisContext, WrapperId};

/// Value side of an [`OutputEntry`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OutputValue {
    /// Property value
    Literal(CompactString),
    /// Children of a nested rule
    Nested(Vec<OutputEntry>),
}

/// `[name, value]` for a property, `[name, [children…]]` for a rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputEntry(pub CompactString, pub OutputValue);

impl OutputEntry {
    fn flatten(tree: &StyleTree, id: NodeId) -> Self {
        let node = tree.node(id);
        let value = if node.is_property() {
            OutputValue::Literal(node.value.clone().unwrap_or_default())
        } else {
            OutputValue::Nested(
                node.children
                    .iter()
                    .map(|&child| Self::flatten(tree, child))
                    .collect(),
            )
        };
        Self(node.name.clone(), value)
    }
}

/// One matched definition at a call site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixinInvocation {
    pub name: CompactString,
    /// `(parameter, supplied value)` pairs in call order
    pub arguments: Vec<(CompactString, Option<CompactString>)>,
    /// The expanded body as it was spliced into the result tree
    pub output: Vec<OutputEntry>,
    /// Wrapper of the defining source node
    pub origin: Option<WrapperId>,
}

/// Invocations for every source node with resolved mixin calls
pub fn trace(cx: &AnalysisContext<'_>) -> FxIndexMap<WrapperId, Vec<MixinInvocation>> {
    let result_tree = cx.result.tree();
    let mut out = FxIndexMap::default();

    for node in cx.source.root().list() {
        let Some(calls) = node.raw().resolved_mixins() else {
            continue;
        };
        let invocations = calls
            .iter()
            .map(|call| MixinInvocation {
                name: call.mixin.name.clone(),
                arguments: call
                    .mixin
                    .args
                    .iter()
                    .map(|arg| (arg.name.clone(), arg.value.clone()))
                    .collect(),
                output: call
                    .output
                    .iter()
                    .map(|&id| OutputEntry::flatten(result_tree, id))
                    .collect(),
                origin: cx.source.get_by_node(call.mixin.node).map(|r| r.id()),
            })
            .collect();
        out.insert(node.id(), invocations);
    }

    out
}
