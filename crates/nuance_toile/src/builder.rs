//! Programmatic construction of stylesheet trees.
//!
//! Resolvers that live in-process (and every test in the workspace) build
//! trees through [`TreeBuilder`] instead of hand-assembling arenas.
//!
//! New nodes inherit the scope their parent has *at creation time*; call
//! [`TreeBuilder::open_scope`] on a section before adding its children if the
//! section introduces bindings of its own.

use nuance_trousse::{CompactString, TextRange};

use crate::{
    ExternalMixins, MixinDefinition, NodeId, NodeKind, NodeRanges, ResolvedMixinCall,
    Scope, ScopeId, StyleTree, TreeNode,
};

/// Builder for a single [`StyleTree`]
#[derive(Debug)]
pub struct TreeBuilder {
    tree: StyleTree,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    /// Start a tree with a root node owning the outermost scope
    pub fn new() -> Self {
        let mut root = TreeNode::new(NodeKind::Root, "");
        root.scope = Some(ScopeId::new(0));
        Self {
            tree: StyleTree {
                uri: None,
                root: NodeId::new(0),
                nodes: vec![root],
                scopes: vec![Scope::new(None)],
            },
        }
    }

    pub fn with_uri(mut self, uri: impl Into<CompactString>) -> Self {
        self.tree.uri = Some(uri.into());
        self
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.tree.root
    }

    /// Read access while building, e.g. to look up a node's scope
    #[inline]
    pub fn tree(&self) -> &StyleTree {
        &self.tree
    }

    /// Append a section (rule, at-rule, mixin body) under `parent`
    pub fn section(&mut self, parent: NodeId, name: impl Into<CompactString>) -> NodeId {
        let node = TreeNode::new(NodeKind::Section, name);
        self.attach(parent, node)
    }

    /// Append a property under `parent`
    pub fn property(
        &mut self,
        parent: NodeId,
        name: impl Into<CompactString>,
        value: impl Into<CompactString>,
    ) -> NodeId {
        let mut node = TreeNode::new(NodeKind::Property, name);
        node.value = Some(value.into());
        self.attach(parent, node)
    }

    /// Add a section that is not linked into the tree, such as a node the
    /// resolver pruned during optimization. It shares the scope of `scope_of`.
    pub fn detached_section(
        &mut self,
        scope_of: NodeId,
        name: impl Into<CompactString>,
    ) -> NodeId {
        let mut node = TreeNode::new(NodeKind::Section, name);
        node.scope = self.tree.node(scope_of).scope;
        self.push(node)
    }

    /// Append a child under a detached node
    pub fn detached_property(
        &mut self,
        parent: NodeId,
        name: impl Into<CompactString>,
        value: impl Into<CompactString>,
    ) -> NodeId {
        self.property(parent, name, value)
    }

    /// Give `node` a fresh scope nested in the one it currently uses
    pub fn open_scope(&mut self, node: NodeId) -> ScopeId {
        let parent = self.tree.node(node).scope;
        let id = ScopeId::new(self.tree.scopes.len() as u32);
        self.tree.scopes.push(Scope::new(parent));
        self.node_mut(node).scope = Some(id);
        id
    }

    /// Bind a variable in the scope `node` currently uses
    pub fn define_variable(
        &mut self,
        node: NodeId,
        name: impl Into<CompactString>,
        raw: impl Into<CompactString>,
    ) {
        let scope = self.scope_mut(node);
        scope.variables.insert(name.into(), raw.into());
    }

    /// Register a mixin in the scope `node` currently uses
    pub fn define_mixin(&mut self, node: NodeId, mixin: MixinDefinition) {
        let scope = self.scope_mut(node);
        for name in mixin.names.clone() {
            scope.mixins.insert(name, mixin.clone());
        }
    }

    /// Merge mixins imported from another stylesheet into `node`'s scope
    pub fn import_mixins(&mut self, node: NodeId, external: ExternalMixins) {
        self.scope_mut(node).external_mixins.push(external);
    }

    /// Attach a mixin-definition descriptor to `node`
    pub fn mark_mixin(&mut self, node: NodeId, mut mixin: MixinDefinition) {
        if mixin.node.is_none() {
            mixin.node = Some(node);
        }
        self.node_mut(node).data.mixin_definition = Some(mixin);
    }

    /// Record a matched definition for the call site `node`
    pub fn record_mixin_call(&mut self, node: NodeId, call: ResolvedMixinCall) {
        self.node_mut(node)
            .data
            .resolved_mixins
            .get_or_insert_with(Vec::new)
            .push(call);
    }

    /// Set the origin link of a result node
    pub fn set_origin(&mut self, node: NodeId, origin: NodeId) {
        self.node_mut(node).origin = Some(origin);
    }

    /// Set the text ranges of a source node
    pub fn set_ranges(&mut self, node: NodeId, full: TextRange, name: TextRange, value: TextRange) {
        self.node_mut(node).ranges = Some(NodeRanges { full, name, value });
    }

    pub fn finish(self) -> StyleTree {
        self.tree
    }

    fn attach(&mut self, parent: NodeId, mut node: TreeNode) -> NodeId {
        node.parent = Some(parent);
        node.scope = self.tree.node(parent).scope;
        let id = self.push(node);
        self.node_mut(parent).children.push(id);
        id
    }

    fn push(&mut self, node: TreeNode) -> NodeId {
        let id = NodeId::new(self.tree.nodes.len() as u32);
        self.tree.nodes.push(node);
        id
    }

    fn node_mut(&mut self, id: NodeId) -> &mut TreeNode {
        &mut self.tree.nodes[id.index()]
    }

    fn scope_mut(&mut self, node: NodeId) -> &mut Scope {
        let existing = self.tree.node(node).scope;
        let scope = match existing {
            Some(scope) => scope,
            None => self.open_scope(node),
        };
        &mut self.tree.scopes[scope.index()]
    }
}
