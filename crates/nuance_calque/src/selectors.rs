//! Resolved selector text per source rule.

use nuance_toile::NodeKind;
use nuance_trousse::{CompactString, FxIndexMap};

use crate::{AnalysisContext, WrapperId};

/// Selector of the authoritative result node of every emitted source section.
/// Sections that never reached the output (mixin-only definitions) are absent.
pub fn resolve(cx: &AnalysisContext<'_>) -> FxIndexMap<WrapperId, CompactString> {
    cx.source
        .root()
        .list()
        .filter(|node| node.kind() == NodeKind::Section)
        .filter_map(|node| {
            let result = cx.lookup(node)?;
            Some((node.id(), CompactString::from(result.name())))
        })
        .collect()
}
