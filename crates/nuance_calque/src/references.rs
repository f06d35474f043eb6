//! Source → result correspondence.
//!
//! Every result node the resolver generated carries an origin link to the
//! source node that produced it. Inverting those links gives, for each source
//! wrapper, the ordered list of result wrappers it became: empty when the node
//! was never emitted, several when a mixin body or a media query duplicated it.
//!
//! Result nodes removed by optimization are indexed separately so completions
//! can still reach their scope data.

use nuance_toile::NodeId;
use nuance_trousse::{FxHashMap, FxIndexMap, SmallVec};

use crate::{Repr, RepresentationTree, WrapperId};

/// Forward map plus pruned-node fallback
#[derive(Debug, Clone)]
pub struct ReferenceIndex<'t> {
    forward: FxIndexMap<WrapperId, Vec<WrapperId>>,
    pruned: RepresentationTree<'t>,
    /// Source node → pruned wrapper indices, by origin link
    fallback: FxHashMap<NodeId, SmallVec<[WrapperId; 1]>>,
}

impl<'t> ReferenceIndex<'t> {
    pub fn build(
        source: &RepresentationTree<'t>,
        result: &RepresentationTree<'t>,
        pruned: &[NodeId],
    ) -> Self {
        let mut by_source: FxHashMap<WrapperId, Vec<WrapperId>> = FxHashMap::default();
        by_source
            .entry(source.root().id())
            .or_default()
            .push(result.root().id());

        for wrapper in result.root().list() {
            let Some(origin) = wrapper.raw().origin else {
                continue;
            };
            match source.get_by_node(origin) {
                Some(source_wrapper) => by_source
                    .entry(source_wrapper.id())
                    .or_default()
                    .push(wrapper.id()),
                None => tracing::warn!(
                    result = %wrapper.id(),
                    origin = %origin,
                    "origin link does not point at a source node"
                ),
            }
        }

        // Re-key in source document order
        let mut forward = FxIndexMap::default();
        for wrapper in source.iter() {
            if let Some(ids) = by_source.remove(&wrapper.id()) {
                forward.insert(wrapper.id(), ids);
            }
        }

        let pruned = RepresentationTree::pruned(result.tree(), pruned);
        let mut fallback: FxHashMap<NodeId, SmallVec<[WrapperId; 1]>> = FxHashMap::default();
        for wrapper in pruned.iter() {
            if let Some(origin) = wrapper.raw().origin {
                fallback.entry(origin).or_default().push(wrapper.id());
            }
        }

        tracing::debug!(
            mapped = forward.len(),
            pruned = pruned.len(),
            "reference index built"
        );

        Self {
            forward,
            pruned,
            fallback,
        }
    }

    /// Source id → result ids, in source document order
    #[inline]
    pub fn forward(&self) -> &FxIndexMap<WrapperId, Vec<WrapperId>> {
        &self.forward
    }

    /// Every result wrapper generated from `source`
    pub fn references(&self, source: WrapperId) -> &[WrapperId] {
        self.forward.get(&source).map_or(&[], Vec::as_slice)
    }

    /// Wrappers of pruned result nodes
    #[inline]
    pub fn pruned(&self) -> &RepresentationTree<'t> {
        &self.pruned
    }

    /// The authoritative result node for `source`: the first emitted
    /// counterpart, else the first pruned one.
    pub fn lookup<'s>(
        &'s self,
        source: Repr<'_>,
        result: &'s RepresentationTree<'t>,
    ) -> Option<Repr<'s>> {
        if let Some(&first) = self.references(source.id()).first() {
            return result.get_by_id(first);
        }
        self.fallback
            .get(&source.node())
            .and_then(|ids| ids.first())
            .and_then(|&id| self.pruned.get_by_id(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nuance_toile::TreeBuilder;

    #[test]
    fn test_forward_map_and_lookup() {
        let mut s = TreeBuilder::new();
        let foo = s.section(s.root(), ".foo");
        let padding = s.property(foo, "padding", "2px");
        let mixin = s.section(s.root(), ".mx()");
        let source = s.finish();

        let mut r = TreeBuilder::new();
        let media_a = r.section(r.root(), "@media a");
        let foo_a = r.section(media_a, ".foo");
        let padding_a = r.property(foo_a, "padding", "2px");
        let foo_b = r.section(r.root(), ".foo");
        r.set_origin(foo_a, foo);
        r.set_origin(padding_a, padding);
        r.set_origin(foo_b, foo);
        let result = r.finish();

        let source_model = RepresentationTree::source(&source);
        let result_model = RepresentationTree::result(&result);
        let index = ReferenceIndex::build(&source_model, &result_model, &[]);

        let rendered: Vec<String> = index
            .forward()
            .iter()
            .map(|(k, v)| {
                let ids: Vec<String> = v.iter().map(ToString::to_string).collect();
                format!("{k}->{}", ids.join(","))
            })
            .collect();
        assert_eq!(rendered, ["s0->r0", "s1->r2,r4", "s2->r3"]);

        let foo_wrapper = source_model.get_by_node(foo).unwrap();
        let found = index.lookup(foo_wrapper, &result_model).unwrap();
        assert_eq!(found.node(), foo_a);

        let mixin_wrapper = source_model.get_by_node(mixin).unwrap();
        assert!(index.lookup(mixin_wrapper, &result_model).is_none());
        assert!(index.references(mixin_wrapper.id()).is_empty());
    }

    #[test]
    fn test_pruned_fallback() {
        let mut s = TreeBuilder::new();
        let empty = s.section(s.root(), ".empty");
        let source = s.finish();

        let mut r = TreeBuilder::new();
        let gone = r.detached_section(r.root(), ".empty");
        r.set_origin(gone, empty);
        let result = r.finish();

        let source_model = RepresentationTree::source(&source);
        let result_model = RepresentationTree::result(&result);
        let index = ReferenceIndex::build(&source_model, &result_model, &[gone]);

        let wrapper = source_model.get_by_node(empty).unwrap();
        assert!(index.references(wrapper.id()).is_empty());
        let found = index.lookup(wrapper, &result_model).unwrap();
        assert_eq!(found.id().to_string(), "p0");
        assert_eq!(found.node(), gone);
    }
}
