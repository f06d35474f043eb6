//! Computed property values.

use nuance_teinte::Context;
use nuance_trousse::{FxHashMap, FxIndexMap};

use crate::{AnalysisContext, WrapperId};

/// Pseudo-property holding an import directive
const IMPORT_DIRECTIVE: &str = "@import";

/// Evaluated value of every source property, `None` where evaluation failed.
///
/// Properties whose own result node is gone (merged into another rule) are
/// evaluated in the scope of their rule's result node instead.
pub fn compute(cx: &AnalysisContext<'_>) -> FxIndexMap<WrapperId, Option<String>> {
    let mut contexts: FxHashMap<WrapperId, Context> = FxHashMap::default();
    let mut out = FxIndexMap::default();

    for node in cx.source.root().list() {
        if !node.is_property() || node.name() == IMPORT_DIRECTIVE {
            continue;
        }
        let Some(raw) = node.value().filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let Some(result) = cx
            .lookup(node)
            .or_else(|| node.parent().and_then(|parent| cx.lookup(parent)))
        else {
            continue;
        };

        let ctx = contexts
            .entry(result.id())
            .or_insert_with(|| Context::new(result.tree().variables_at(result.node())));
        ctx.set_division_mode(cx.strategy.division_mode(node.name()));

        let value = match ctx.evaluate(raw) {
            Ok(value) => Some(value.to_string()),
            Err(err) => {
                tracing::trace!(node = %node.id(), raw, %err, "value not computed");
                None
            }
        };
        out.insert(node.id(), value);
    }

    out
}
