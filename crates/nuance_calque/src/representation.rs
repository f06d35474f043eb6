//! Wrapper trees with stable, role-namespaced ids.
//!
//! A [`RepresentationTree`] mirrors one stylesheet tree (or, for pruned
//! nodes, a set of detached subtrees) in a single depth-first pass. Each
//! wrapper gets a [`WrapperId`] such as `s3` or `r12` that stays valid for the
//! lifetime of the analysis and is what every output map is keyed by.
//!
//! Wrappers are stored in pre-order, so the descendants of a wrapper always
//! occupy the contiguous index range right after it.

use std::fmt;

use nuance_toile::{NodeId, NodeKind, StyleTree, TreeNode};
use nuance_trousse::{FxHashMap, SmallVec, TextRange};
use serde::{Serialize, Serializer};

/// Which tree a wrapper belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TreeRole {
    /// Authored tree
    Source,
    /// Resolved tree
    Result,
    /// Result nodes removed by optimization
    Pruned,
}

impl TreeRole {
    #[inline]
    pub const fn prefix(self) -> char {
        match self {
            Self::Source => 's',
            Self::Result => 'r',
            Self::Pruned => 'p',
        }
    }
}

/// Identifier of a wrapper, unique within one analysis call
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WrapperId {
    role: TreeRole,
    index: u32,
}

impl WrapperId {
    #[inline]
    pub const fn new(role: TreeRole, index: u32) -> Self {
        Self { role, index }
    }

    #[inline]
    pub const fn role(self) -> TreeRole {
        self.role
    }

    #[inline]
    pub const fn index(self) -> u32 {
        self.index
    }
}

impl fmt::Display for WrapperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.role.prefix(), self.index)
    }
}

impl Serialize for WrapperId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone)]
struct Wrapper {
    node: NodeId,
    parent: Option<u32>,
    children: SmallVec<[u32; 4]>,
    /// One past the last descendant
    end: u32,
}

/// Wrapper tree over a [`StyleTree`]
#[derive(Debug, Clone)]
pub struct RepresentationTree<'t> {
    tree: &'t StyleTree,
    role: TreeRole,
    wrappers: Vec<Wrapper>,
    roots: SmallVec<[u32; 1]>,
    by_node: FxHashMap<NodeId, u32>,
}

impl<'t> RepresentationTree<'t> {
    fn empty(tree: &'t StyleTree, role: TreeRole) -> Self {
        Self {
            tree,
            role,
            wrappers: Vec::with_capacity(tree.len()),
            roots: SmallVec::new(),
            by_node: FxHashMap::default(),
        }
    }

    /// Wrap an authored tree; ids are `s0`, `s1`, …
    pub fn source(tree: &'t StyleTree) -> Self {
        let mut model = Self::empty(tree, TreeRole::Source);
        let root = model.wrap(tree.root(), None, false);
        model.roots.push(root);
        model
    }

    /// Wrap a resolved tree; ids are `r0`, `r1`, …
    pub fn result(tree: &'t StyleTree) -> Self {
        let mut model = Self::empty(tree, TreeRole::Result);
        let root = model.wrap(tree.root(), None, false);
        model.roots.push(root);
        model
    }

    /// Wrap pruned result nodes as childless roots; ids are `p0`, `p1`, …
    pub fn pruned(tree: &'t StyleTree, pruned: &[NodeId]) -> Self {
        let mut model = Self::empty(tree, TreeRole::Pruned);
        for &node in pruned {
            if model.by_node.contains_key(&node) || tree.get(node).is_none() {
                continue;
            }
            let root = model.wrap(node, None, true);
            model.roots.push(root);
        }
        model
    }

    fn wrap(&mut self, node: NodeId, parent: Option<u32>, skip_children: bool) -> u32 {
        let index = self.wrappers.len() as u32;
        self.wrappers.push(Wrapper {
            node,
            parent,
            children: SmallVec::new(),
            end: index + 1,
        });
        self.by_node.insert(node, index);

        if !skip_children {
            let tree = self.tree;
            for &child in &tree.node(node).children {
                let child_index = self.wrap(child, Some(index), false);
                self.wrappers[index as usize].children.push(child_index);
            }
        }

        self.wrappers[index as usize].end = self.wrappers.len() as u32;
        index
    }

    #[inline]
    pub fn role(&self) -> TreeRole {
        self.role
    }

    /// The wrapped stylesheet tree
    #[inline]
    pub fn tree(&self) -> &'t StyleTree {
        self.tree
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.wrappers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.wrappers.is_empty()
    }

    /// The tree root. Pruned models have no single root, use [`Self::roots`].
    pub fn root(&self) -> Repr<'_> {
        self.handle(self.roots.first().copied().unwrap_or_default())
    }

    pub fn roots(&self) -> impl Iterator<Item = Repr<'_>> + '_ {
        self.roots.iter().map(move |&index| self.handle(index))
    }

    /// Every wrapper in document order, roots included
    pub fn iter(&self) -> impl Iterator<Item = Repr<'_>> + '_ {
        (0..self.wrappers.len() as u32).map(move |index| self.handle(index))
    }

    /// Wrapper for `id`, if it was issued by this model
    pub fn get_by_id(&self, id: WrapperId) -> Option<Repr<'_>> {
        (id.role == self.role && (id.index as usize) < self.wrappers.len())
            .then(|| self.handle(id.index))
    }

    /// Wrapper of an underlying tree node
    pub fn get_by_node(&self, node: NodeId) -> Option<Repr<'_>> {
        self.by_node.get(&node).map(|&index| self.handle(index))
    }

    #[inline]
    fn handle(&self, index: u32) -> Repr<'_> {
        Repr { model: self, index }
    }
}

impl Serialize for RepresentationTree<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.root().record(false).serialize(serializer)
    }
}

/// Handle to one wrapper of a [`RepresentationTree`]
#[derive(Clone, Copy)]
pub struct Repr<'a> {
    model: &'a RepresentationTree<'a>,
    index: u32,
}

impl<'a> Repr<'a> {
    #[inline]
    fn wrapper(&self) -> &'a Wrapper {
        &self.model.wrappers[self.index as usize]
    }

    #[inline]
    pub fn id(&self) -> WrapperId {
        WrapperId::new(self.model.role, self.index)
    }

    /// Underlying tree node id
    #[inline]
    pub fn node(&self) -> NodeId {
        self.wrapper().node
    }

    /// Underlying tree node
    #[inline]
    pub fn raw(&self) -> &'a TreeNode {
        self.model.tree.node(self.wrapper().node)
    }

    #[inline]
    pub fn tree(&self) -> &'a StyleTree {
        self.model.tree
    }

    #[inline]
    pub fn model(&self) -> &'a RepresentationTree<'a> {
        self.model
    }

    #[inline]
    pub fn name(&self) -> &'a str {
        &self.raw().name
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.raw().kind
    }

    #[inline]
    pub fn is_property(&self) -> bool {
        self.raw().is_property()
    }

    /// Literal value, properties only
    #[inline]
    pub fn value(&self) -> Option<&'a str> {
        self.raw().value()
    }

    pub fn parent(&self) -> Option<Repr<'a>> {
        self.wrapper().parent.map(|index| self.model.handle(index))
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = Repr<'a>> + 'a {
        let model = self.model;
        self.wrapper()
            .children
            .iter()
            .map(move |&index| model.handle(index))
    }

    /// All descendants in document order, excluding this wrapper
    pub fn list(&self) -> impl Iterator<Item = Repr<'a>> + 'a {
        let model = self.model;
        (self.index + 1..self.wrapper().end).map(move |index| model.handle(index))
    }

    /// Text ranges are only known for non-root source nodes
    fn ranges(&self) -> Option<&'a nuance_toile::NodeRanges> {
        if self.model.role != TreeRole::Source || self.raw().kind == NodeKind::Root {
            return None;
        }
        self.raw().ranges.as_ref()
    }

    pub fn range(&self) -> Option<TextRange> {
        self.ranges().map(|r| r.full)
    }

    pub fn name_range(&self) -> Option<TextRange> {
        self.ranges().map(|r| r.name)
    }

    pub fn value_range(&self) -> Option<TextRange> {
        self.ranges().map(|r| r.value)
    }

    /// Serializable snapshot of this wrapper
    pub fn record(&self, skip_children: bool) -> NodeRecord<'a> {
        NodeRecord {
            id: self.id(),
            name: self.name(),
            kind: self.kind(),
            children: (!skip_children && !self.is_property())
                .then(|| self.children().map(|c| c.record(false)).collect()),
            value: self.value(),
            range: self.range(),
            name_range: self.name_range(),
            value_range: self.value_range(),
        }
    }
}

impl fmt::Debug for Repr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repr")
            .field("id", &self.id())
            .field("name", &self.name())
            .finish()
    }
}

impl PartialEq for Repr<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.model, other.model) && self.index == other.index
    }
}

/// Serialized form of a wrapper
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord<'a> {
    pub id: WrapperId,
    pub name: &'a str,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<NodeRecord<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<TextRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_range: Option<TextRange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_range: Option<TextRange>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use nuance_toile::TreeBuilder;
    use nuance_trousse::FxHashSet;

    fn sample() -> (StyleTree, [NodeId; 4]) {
        let mut b = TreeBuilder::new();
        let root = b.root();
        let foo = b.section(root, ".foo");
        let padding = b.property(foo, "padding", "2px");
        let bar = b.section(foo, ".bar");
        let color = b.property(bar, "color", "red");
        b.set_ranges(
            foo,
            TextRange::new(0, 40),
            TextRange::new(0, 4),
            TextRange::new(5, 40),
        );
        b.set_ranges(
            padding,
            TextRange::new(7, 20),
            TextRange::new(7, 14),
            TextRange::new(16, 19),
        );
        (b.finish(), [foo, padding, bar, color])
    }

    #[test]
    fn test_ids_follow_document_order() {
        let (tree, [foo, padding, bar, color]) = sample();
        let model = RepresentationTree::source(&tree);

        let ids: Vec<String> = model.iter().map(|r| r.id().to_string()).collect();
        assert_eq!(ids, ["s0", "s1", "s2", "s3", "s4"]);
        assert_eq!(model.get_by_node(foo).unwrap().id().to_string(), "s1");
        assert_eq!(model.get_by_node(padding).unwrap().name(), "padding");
        assert_eq!(model.get_by_node(bar).unwrap().parent().unwrap().node(), foo);
        assert_eq!(model.get_by_node(color).unwrap().value(), Some("red"));

        let names: Vec<&str> = model.root().list().map(|r| r.name()).collect();
        assert_eq!(names, [".foo", "padding", ".bar", "color"]);
        let under_foo: Vec<&str> = model.get_by_node(foo).unwrap().list().map(|r| r.name()).collect();
        assert_eq!(under_foo, ["padding", ".bar", "color"]);
    }

    #[test]
    fn test_get_by_id_checks_role() {
        let (tree, _) = sample();
        let source = RepresentationTree::source(&tree);
        let result = RepresentationTree::result(&tree);

        let id = WrapperId::new(TreeRole::Source, 2);
        assert_eq!(source.get_by_id(id).unwrap().id(), id);
        assert!(result.get_by_id(id).is_none());
        assert!(source.get_by_id(WrapperId::new(TreeRole::Source, 99)).is_none());
    }

    #[test]
    fn test_pruned_nodes_are_leaves() {
        let mut b = TreeBuilder::new();
        let root = b.root();
        let gone = b.detached_section(root, ".gone");
        b.detached_property(gone, "color", "red");
        let tree = b.finish();

        let pruned = RepresentationTree::pruned(&tree, &[gone, gone]);
        assert_eq!(pruned.len(), 1);
        let wrapper = pruned.roots().next().unwrap();
        assert_eq!(wrapper.id().to_string(), "p0");
        assert_eq!(wrapper.children().count(), 0);
        assert_eq!(wrapper.list().count(), 0);
    }

    #[test]
    fn test_record_serialization() {
        let (tree, [foo, ..]) = sample();
        let model = RepresentationTree::source(&tree);
        let json = serde_json::to_string(&model.get_by_node(foo).unwrap().record(true)).unwrap();
        insta::assert_snapshot!(
            json,
            @r#"{"id":"s1","name":".foo","kind":"section","range":{"start":0,"end":40},"nameRange":{"start":0,"end":4},"valueRange":{"start":5,"end":40}}"#
        );

        // the root never carries ranges, result trees never do
        let root = serde_json::to_value(model.root().record(true)).unwrap();
        assert!(root.get("range").is_none());
        let result = RepresentationTree::result(&tree);
        let padding = serde_json::to_value(result.iter().nth(2).unwrap().record(true)).unwrap();
        assert_eq!(padding["value"], "2px");
        assert!(padding.get("range").is_none());
    }

    proptest::proptest! {
        #[test]
        fn prop_ids_are_unique(widths in proptest::collection::vec(0usize..4, 1..12)) {
            let mut b = TreeBuilder::new();
            let mut parent = b.root();
            for (depth, width) in widths.iter().enumerate() {
                let section = b.section(parent, format!(".s{depth}"));
                for i in 0..*width {
                    b.property(section, format!("p{i}"), "1px");
                }
                parent = section;
            }
            let tree = b.finish();
            let model = RepresentationTree::source(&tree);

            let mut seen = FxHashSet::default();
            for wrapper in model.iter() {
                proptest::prop_assert!(seen.insert(wrapper.id()));
                proptest::prop_assert_eq!(model.get_by_id(wrapper.id()), Some(wrapper));
                proptest::prop_assert_eq!(model.get_by_node(wrapper.node()), Some(wrapper));
            }
            proptest::prop_assert_eq!(seen.len(), tree.len());
        }
    }
}
