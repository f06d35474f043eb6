//! Stylesheet tree node types.
//!
//! Both the authored (source) tree and the resolved (result) tree use the same
//! arena representation. A result node may carry an `origin` pointing at the
//! source node that produced it; source nodes may carry mixin descriptors left
//! behind by the resolver in their [`NodeData`].

use std::fmt;

use nuance_trousse::{CompactString, FxIndexMap, TextRange};
use serde::{Deserialize, Serialize};

use crate::TreeError;

/// Index of a node inside its [`StyleTree`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct NodeId(u32);

impl NodeId {
    #[inline(always)]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline(always)]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Index of a scope inside its [`StyleTree`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct ScopeId(u32);

impl ScopeId {
    #[inline(always)]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline(always)]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    #[inline(always)]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// Node kind discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum NodeKind {
    /// Stylesheet root
    Root = 0,
    /// Rule, at-rule or mixin body (anything with children)
    Section = 1,
    /// `name: value` declaration, including variable declarations
    Property = 2,
}

impl NodeKind {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Section => "section",
            Self::Property => "property",
        }
    }
}

/// Stylesheet authoring dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Dialect {
    /// LESS: `@var`, every class/id rule doubles as a mixin
    Less,
    /// SCSS: `$var`, explicit `@mixin` definitions
    Scss,
    /// Any tag the resolver reported that nuance does not model
    #[default]
    Unknown,
}

impl Dialect {
    #[inline]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Less => "less",
            Self::Scss => "scss",
            Self::Unknown => "unknown",
        }
    }

    /// Variable sigil, if the dialect has a single one
    #[inline]
    pub const fn sigil(&self) -> Option<char> {
        match self {
            Self::Less => Some('@'),
            Self::Scss => Some('$'),
            Self::Unknown => None,
        }
    }

    /// Map a resolver syntax tag onto a dialect
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "less" => Self::Less,
            "scss" | "sass" => Self::Scss,
            _ => Self::Unknown,
        }
    }
}

impl From<String> for Dialect {
    fn from(tag: String) -> Self {
        Self::from_tag(&tag)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source text ranges of a non-root source node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeRanges {
    /// Whole node, from name to closing brace or semicolon
    pub full: TextRange,
    /// Selector or property name
    pub name: TextRange,
    /// Property value, or the block body of a section
    pub value: TextRange,
}

/// Parameter of a mixin definition, or an argument supplied at a call site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixinParam {
    pub name: CompactString,
    /// Default value (definitions) or supplied value (calls)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CompactString>,
}

impl MixinParam {
    pub fn new(name: impl Into<CompactString>, value: Option<&str>) -> Self {
        Self {
            name: name.into(),
            value: value.map(CompactString::from),
        }
    }
}

/// Descriptor the resolver attaches to a node that defines a mixin.
///
/// A LESS selector list such as `.a, .b { ... }` binds several names to
/// the same body, hence `names`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixinDefinition {
    pub names: Vec<CompactString>,
    #[serde(default)]
    pub args: Vec<MixinParam>,
    /// Defining node in the source tree
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
}

impl MixinDefinition {
    pub fn new(name: impl Into<CompactString>) -> Self {
        Self {
            names: vec![name.into()],
            args: Vec::new(),
            node: None,
        }
    }

    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<CompactString>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            args: Vec::new(),
            node: None,
        }
    }

    pub fn with_arg(mut self, name: impl Into<CompactString>, default: Option<&str>) -> Self {
        self.args.push(MixinParam::new(name, default));
        self
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    /// Primary name (the first one bound)
    #[inline]
    pub fn name(&self) -> &str {
        self.names.first().map(CompactString::as_str).unwrap_or("")
    }
}

/// The matched definition of a single resolved call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixinSignature {
    pub name: CompactString,
    /// Supplied arguments in call order
    #[serde(default)]
    pub args: Vec<MixinParam>,
    /// Defining node in the source tree
    pub node: NodeId,
}

/// One matched definition at a call site, with what it expanded to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedMixinCall {
    pub mixin: MixinSignature,
    /// Expanded nodes in the result arena, in splice order
    #[serde(default)]
    pub output: Vec<NodeId>,
}

/// Custom data bag the resolver leaves on nodes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixin_definition: Option<MixinDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_mixins: Option<Vec<ResolvedMixinCall>>,
}

impl NodeData {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mixin_definition.is_none() && self.resolved_mixins.is_none()
    }
}

/// A node in either tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub kind: NodeKind,
    pub name: CompactString,
    /// Raw literal value (properties only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<CompactString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(default)]
    pub children: Vec<NodeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<ScopeId>,
    /// Result trees only: source node this node was generated from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<NodeId>,
    /// Source trees only, non-root nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ranges: Option<NodeRanges>,
    #[serde(default, skip_serializing_if = "NodeData::is_empty")]
    pub data: NodeData,
}

impl TreeNode {
    pub fn new(kind: NodeKind, name: impl Into<CompactString>) -> Self {
        Self {
            kind,
            name: name.into(),
            value: None,
            parent: None,
            children: Vec::new(),
            scope: None,
            origin: None,
            ranges: None,
            data: NodeData::default(),
        }
    }

    #[inline]
    pub fn is_property(&self) -> bool {
        self.kind == NodeKind::Property
    }

    /// Literal value, only defined for properties
    #[inline]
    pub fn value(&self) -> Option<&str> {
        match self.kind {
            NodeKind::Property => self.value.as_deref(),
            _ => None,
        }
    }

    #[inline]
    pub fn mixin_definition(&self) -> Option<&MixinDefinition> {
        self.data.mixin_definition.as_ref()
    }

    #[inline]
    pub fn resolved_mixins(&self) -> Option<&[ResolvedMixinCall]> {
        self.data.resolved_mixins.as_deref()
    }
}

/// Mixins merged in from another stylesheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalMixins {
    /// Stylesheet the mixins were defined in
    pub uri: CompactString,
    #[serde(default)]
    pub mixins: Vec<MixinDefinition>,
}

/// Bindings introduced at one level of the scope chain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ScopeId>,
    /// Variable name (with sigil) → raw expression text
    #[serde(default)]
    pub variables: FxIndexMap<CompactString, CompactString>,
    /// Mixin name → definition
    #[serde(default)]
    pub mixins: FxIndexMap<CompactString, MixinDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_mixins: Vec<ExternalMixins>,
}

impl Scope {
    pub fn new(parent: Option<ScopeId>) -> Self {
        Self {
            parent,
            ..Default::default()
        }
    }
}

/// Arena-backed stylesheet tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleTree {
    /// Stylesheet location, used to tell local mixins from imported ones
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<CompactString>,
    pub root: NodeId,
    pub nodes: Vec<TreeNode>,
    #[serde(default)]
    pub scopes: Vec<Scope>,
}

impl StyleTree {
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.index())
    }

    #[inline]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    /// Scope chain starting at `scope`, innermost first
    pub fn scope_chain(&self, scope: ScopeId) -> ScopeChainIter<'_> {
        ScopeChainIter {
            tree: self,
            next: Some(scope),
            remaining: self.scopes.len(),
        }
    }

    /// Scope chain of `node`, innermost first; empty when the node has no scope
    pub fn scopes_of(&self, node: NodeId) -> ScopeChainIter<'_> {
        ScopeChainIter {
            tree: self,
            next: self.node(node).scope,
            remaining: self.scopes.len(),
        }
    }

    /// Every variable visible from `node`, inner bindings shadowing outer
    /// ones in place, outermost scope enumerated first.
    pub fn variables_at(&self, node: NodeId) -> FxIndexMap<CompactString, CompactString> {
        let chain: Vec<&Scope> = self.scopes_of(node).collect();
        let mut out = FxIndexMap::default();
        for scope in chain.iter().rev() {
            for (name, raw) in &scope.variables {
                out.insert(name.clone(), raw.clone());
            }
        }
        out
    }

    /// Every mixin visible from `node`, outermost scope enumerated first.
    pub fn mixins_at(&self, node: NodeId) -> FxIndexMap<CompactString, MixinDefinition> {
        let chain: Vec<&Scope> = self.scopes_of(node).collect();
        let mut out = FxIndexMap::default();
        for scope in chain.iter().rev() {
            for (name, mixin) in &scope.mixins {
                out.insert(name.clone(), mixin.clone());
            }
        }
        out
    }

    /// External mixin sets merged into the scope chain of `node`, innermost first
    pub fn external_mixins_at(&self, node: NodeId) -> impl Iterator<Item = &ExternalMixins> {
        self.scopes_of(node)
            .flat_map(|scope| scope.external_mixins.iter())
    }

    /// Ancestors of `node`, nearest first, excluding the node itself
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(node).parent, move |id| self.node(*id).parent)
    }

    fn validate(&self, tree: &'static str) -> Result<(), TreeError> {
        let len = self.nodes.len();
        let check_node = |node: NodeId| {
            if node.index() < len {
                Ok(())
            } else {
                Err(TreeError::DanglingNode { tree, node, len })
            }
        };
        let check_scope = |scope: ScopeId| {
            if scope.index() < self.scopes.len() {
                Ok(())
            } else {
                Err(TreeError::DanglingScope {
                    tree,
                    scope,
                    len: self.scopes.len(),
                })
            }
        };

        check_node(self.root)?;
        if self.node(self.root).kind != NodeKind::Root {
            return Err(TreeError::InvalidRoot {
                tree,
                node: self.root,
            });
        }

        for (index, node) in self.nodes.iter().enumerate() {
            let id = NodeId::new(index as u32);
            if let Some(parent) = node.parent {
                check_node(parent)?;
            }
            if let Some(scope) = node.scope {
                check_scope(scope)?;
            }
            for &child in &node.children {
                check_node(child)?;
                if self.node(child).parent != Some(id) {
                    return Err(TreeError::InconsistentParent {
                        tree,
                        parent: id,
                        child,
                    });
                }
            }
        }

        for (index, scope) in self.scopes.iter().enumerate() {
            if let Some(parent) = scope.parent {
                check_scope(parent)?;
            }
            // A chain longer than the arena can only come from a loop
            let mut next = scope.parent;
            let mut steps = 0;
            while let Some(parent) = next {
                steps += 1;
                if steps > self.scopes.len() {
                    return Err(TreeError::CyclicScope {
                        tree,
                        scope: ScopeId::new(index as u32),
                    });
                }
                next = self.scopes.get(parent.index()).and_then(|s| s.parent);
            }
        }

        Ok(())
    }
}

/// Iterator over a scope chain, innermost first
pub struct ScopeChainIter<'a> {
    tree: &'a StyleTree,
    next: Option<ScopeId>,
    // bounds iteration on malformed (cyclic) chains
    remaining: usize,
}

impl<'a> Iterator for ScopeChainIter<'a> {
    type Item = &'a Scope;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        if self.remaining == 0 {
            self.next = None;
            return None;
        }
        self.remaining -= 1;
        let scope = self.tree.scopes.get(id.index())?;
        self.next = scope.parent;
        Some(scope)
    }
}

/// Everything the resolver hands over for one analysis call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedStylesheet {
    #[serde(default)]
    pub dialect: Dialect,
    /// Authored tree
    pub source: StyleTree,
    /// Resolved tree; `origin` links point into `source`
    pub result: StyleTree,
    /// Result-arena nodes removed by optimization, kept for their scopes
    #[serde(default)]
    pub pruned: Vec<NodeId>,
}

impl ResolvedStylesheet {
    pub fn new(dialect: Dialect, source: StyleTree, result: StyleTree) -> Self {
        Self {
            dialect,
            source,
            result,
            pruned: Vec::new(),
        }
    }

    pub fn with_pruned(mut self, pruned: Vec<NodeId>) -> Self {
        self.pruned = pruned;
        self
    }

    /// Decode and validate a JSON dump produced by the resolver
    pub fn from_json(json: &str) -> Result<Self, TreeError> {
        let stylesheet: Self = serde_json::from_str(json)?;
        stylesheet.validate()?;
        Ok(stylesheet)
    }

    /// Check the input contract: ids in range, parent links consistent,
    /// origin links into the source arena
    pub fn validate(&self) -> Result<(), TreeError> {
        self.source.validate("source")?;
        self.result.validate("result")?;

        let source_len = self.source.len();
        let result_len = self.result.len();

        for node in &self.result.nodes {
            if let Some(origin) = node.origin {
                if origin.index() >= source_len {
                    return Err(TreeError::DanglingNode {
                        tree: "source",
                        node: origin,
                        len: source_len,
                    });
                }
            }
        }

        for &pruned in &self.pruned {
            if pruned.index() >= result_len {
                return Err(TreeError::DanglingNode {
                    tree: "result",
                    node: pruned,
                    len: result_len,
                });
            }
        }

        for node in &self.source.nodes {
            for call in node.resolved_mixins().unwrap_or_default() {
                if call.mixin.node.index() >= source_len {
                    return Err(TreeError::DanglingNode {
                        tree: "source",
                        node: call.mixin.node,
                        len: source_len,
                    });
                }
                if let Some(&bad) = call.output.iter().find(|id| id.index() >= result_len) {
                    return Err(TreeError::DanglingNode {
                        tree: "result",
                        node: bad,
                        len: result_len,
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TreeBuilder;

    #[test]
    fn test_dialect_tags() {
        assert_eq!(Dialect::from_tag("LESS"), Dialect::Less);
        assert_eq!(Dialect::from_tag("scss"), Dialect::Scss);
        assert_eq!(Dialect::from_tag("stylus"), Dialect::Unknown);
        assert_eq!(Dialect::Less.sigil(), Some('@'));
        assert_eq!(Dialect::Unknown.sigil(), None);

        for (json, dialect) in [
            (r#""stylus""#, Dialect::Unknown),
            (r#""LESS""#, Dialect::Less),
            (r#""sass""#, Dialect::Scss),
        ] {
            let parsed: Dialect = serde_json::from_str(json).unwrap();
            assert_eq!(parsed, dialect);
        }
        assert_eq!(serde_json::to_string(&Dialect::Scss).unwrap(), r#""scss""#);
    }

    #[test]
    fn test_variables_shadow_in_place() {
        let mut b = TreeBuilder::new();
        let root = b.root();
        b.define_variable(root, "$a", "1px");
        b.define_variable(root, "$b", "2px");
        let foo = b.section(root, ".foo");
        b.open_scope(foo);
        b.define_variable(foo, "$a", "3px");
        b.define_variable(foo, "$c", "4px");
        let tree = b.finish();

        let vars = tree.variables_at(foo);
        let pairs: Vec<_> = vars.iter().map(|(k, v)| format!("{k}={v}")).collect();
        assert_eq!(pairs, ["$a=3px", "$b=2px", "$c=4px"]);
    }

    #[test]
    fn test_scope_chain_terminates_on_cycle() {
        let b = TreeBuilder::new();
        let root = b.root();
        let mut tree = b.finish();
        let scope = tree.node(root).scope.unwrap();
        tree.scopes[scope.index()].parent = Some(scope);

        assert_eq!(tree.scope_chain(scope).count(), 1);
        let stylesheet = ResolvedStylesheet::new(Dialect::Less, tree.clone(), tree);
        assert!(matches!(
            stylesheet.validate(),
            Err(TreeError::CyclicScope { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_dangling_origin() {
        let source = TreeBuilder::new().finish();
        let mut b = TreeBuilder::new();
        let root = b.root();
        let foo = b.section(root, ".foo");
        b.set_origin(foo, NodeId::new(42));
        let stylesheet = ResolvedStylesheet::new(Dialect::Less, source, b.finish());

        let err = stylesheet.validate().unwrap_err();
        insta::assert_snapshot!(err.to_string(), @"source tree: node #42 is out of range (1 nodes)");
    }

    #[test]
    fn test_validate_rejects_inconsistent_parent() {
        let mut b = TreeBuilder::new();
        let root = b.root();
        let foo = b.section(root, ".foo");
        let mut tree = b.finish();
        tree.nodes[foo.index()].parent = None;
        let stylesheet = ResolvedStylesheet::new(Dialect::Scss, tree.clone(), tree);
        assert!(matches!(
            stylesheet.validate(),
            Err(TreeError::InconsistentParent { .. })
        ));
    }

    #[test]
    fn test_json_round_trip_validates() {
        let mut b = TreeBuilder::new();
        let root = b.root();
        b.define_variable(root, "@a", "1px");
        let foo = b.section(root, ".foo");
        b.property(foo, "padding", "@a");
        let source = b.finish();
        let stylesheet = ResolvedStylesheet::new(Dialect::Less, source.clone(), source);

        let json = serde_json::to_string(&stylesheet).unwrap();
        let decoded = ResolvedStylesheet::from_json(&json).unwrap();
        assert_eq!(decoded, stylesheet);
    }

    #[test]
    fn test_from_json_reports_decode_error() {
        let err = ResolvedStylesheet::from_json("{").unwrap_err();
        assert!(matches!(err, TreeError::Decode(_)));
    }
}
