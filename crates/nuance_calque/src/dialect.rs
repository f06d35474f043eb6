//! Dialect strategies.
//!
//! LESS and SCSS disagree on where variables are read from, in which order
//! they are listed and what counts as a mixin. Engines ask a
//! [`DialectStrategy`] picked once per analysis instead of branching on the
//! dialect tag themselves.

use nuance_teinte::DivisionMode;
use nuance_toile::{Dialect, MixinDefinition, StyleTree};
use nuance_trousse::{CompactString, FxIndexMap};

use crate::{MixinCompletion, Repr};

/// Dialect-specific scoping rules
pub trait DialectStrategy: Sync {
    fn dialect(&self) -> Dialect;

    /// Variable sigil; `None` accepts both `@` and `$`
    fn sigil(&self) -> Option<char> {
        self.dialect().sigil()
    }

    fn is_variable(&self, name: &str) -> bool {
        match self.sigil() {
            Some(sigil) => name.starts_with(sigil),
            None => name.starts_with(['@', '$']),
        }
    }

    /// Variables visible at a result node, name → raw text, in the order
    /// completions list them
    fn variables_at(&self, result: Repr<'_>) -> FxIndexMap<CompactString, CompactString> {
        result.tree().variables_at(result.node())
    }

    /// Mixins callable at `source`, whose resolved counterpart is `result`
    fn mixins_visible_at(&self, source: Repr<'_>, result: Repr<'_>) -> Vec<MixinCompletion>;

    /// Whether `source` is the body of a mixin definition
    fn is_mixin_body(&self, source: Repr<'_>) -> bool {
        source.raw().mixin_definition().is_some()
    }

    /// How `/` is read in the value of `property`
    fn division_mode(&self, property: &str) -> DivisionMode;
}

/// Picks the strategy for a dialect tag
pub trait DialectExt {
    fn strategy(self) -> &'static dyn DialectStrategy;
}

impl DialectExt for Dialect {
    fn strategy(self) -> &'static dyn DialectStrategy {
        match self {
            Dialect::Less => &Less,
            Dialect::Scss => &Scss,
            Dialect::Unknown => &Unknown,
        }
    }
}

/// LESS: every class or id rule is also a mixin, mixins nest
#[derive(Debug, Clone, Copy)]
pub struct Less;

impl Less {
    /// Mixins defined directly under `context`, each followed by the mixins
    /// nested inside it under a chained name (`.outer.inner`)
    fn collect(context: Repr<'_>, prefix: &str, out: &mut Vec<MixinCompletion>) {
        for child in context.children() {
            if child.is_property() {
                continue;
            }
            let Some(mixin) = child.raw().mixin_definition() else {
                continue;
            };
            for name in &mixin.names {
                let qualified = format!("{prefix}{name}");
                out.push(MixinCompletion::from_definition(&qualified, mixin));
                Self::collect(child, &qualified, out);
            }
        }
    }

    /// Source stylesheets may import their own mixins back through a cycle
    fn external(source_tree: &StyleTree, result: Repr<'_>, out: &mut Vec<MixinCompletion>) {
        let own_uri = source_tree.uri.as_deref();
        for external in result.tree().external_mixins_at(result.node()) {
            if own_uri == Some(external.uri.as_str()) {
                continue;
            }
            for mixin in &external.mixins {
                push_all_names(mixin, out);
            }
        }
    }
}

impl DialectStrategy for Less {
    fn dialect(&self) -> Dialect {
        Dialect::Less
    }

    /// Reads the scope of the rule's last child, so variables declared
    /// anywhere inside the rule are listed. Innermost scope first.
    fn variables_at(&self, result: Repr<'_>) -> FxIndexMap<CompactString, CompactString> {
        let target = result.children().next_back().unwrap_or(result);
        let mut out = FxIndexMap::default();
        for scope in target.tree().scopes_of(target.node()) {
            for (name, raw) in &scope.variables {
                if !out.contains_key(name) {
                    out.insert(name.clone(), raw.clone());
                }
            }
        }
        out
    }

    fn mixins_visible_at(&self, source: Repr<'_>, result: Repr<'_>) -> Vec<MixinCompletion> {
        let mut out = Vec::new();
        Self::collect(source, "", &mut out);
        let mut ancestor = source.parent();
        while let Some(node) = ancestor {
            Self::collect(node, "", &mut out);
            ancestor = node.parent();
        }
        Self::external(source.tree(), result, &mut out);
        out
    }

    /// Plain `.foo` rules carry a definition too; only the parameterized
    /// form `.foo()` / `.foo(@a)` is a body that never renders on its own.
    /// Parentheses of pseudo-classes such as `:not(.b)` do not count.
    fn is_mixin_body(&self, source: Repr<'_>) -> bool {
        let Some(mixin) = source.raw().mixin_definition() else {
            return false;
        };
        let selector = source.name();
        mixin.names.iter().filter(|name| !name.is_empty()).any(|name| {
            selector.match_indices(name.as_str()).any(|(at, _)| {
                selector[at + name.len()..].trim_start().starts_with('(')
            })
        })
    }

    fn division_mode(&self, property: &str) -> DivisionMode {
        if property == "font" {
            DivisionMode::Never
        } else {
            DivisionMode::Always
        }
    }
}

/// SCSS: flat `@mixin` table on the scope chain
#[derive(Debug, Clone, Copy)]
pub struct Scss;

impl DialectStrategy for Scss {
    fn dialect(&self) -> Dialect {
        Dialect::Scss
    }

    fn mixins_visible_at(&self, _source: Repr<'_>, result: Repr<'_>) -> Vec<MixinCompletion> {
        result
            .tree()
            .mixins_at(result.node())
            .iter()
            .map(|(name, mixin)| MixinCompletion::from_definition(name, mixin))
            .collect()
    }

    fn division_mode(&self, _property: &str) -> DivisionMode {
        DivisionMode::Sass
    }
}

/// Unrecognized tag: variables under either sigil, no mixins
#[derive(Debug, Clone, Copy)]
pub struct Unknown;

impl DialectStrategy for Unknown {
    fn dialect(&self) -> Dialect {
        Dialect::Unknown
    }

    fn mixins_visible_at(&self, _source: Repr<'_>, _result: Repr<'_>) -> Vec<MixinCompletion> {
        Vec::new()
    }

    fn division_mode(&self, _property: &str) -> DivisionMode {
        DivisionMode::Always
    }
}

fn push_all_names(mixin: &MixinDefinition, out: &mut Vec<MixinCompletion>) {
    for name in &mixin.names {
        out.push(MixinCompletion::from_definition(name, mixin));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RepresentationTree;
    use nuance_toile::{ExternalMixins, TreeBuilder};

    fn names(mixins: &[MixinCompletion]) -> Vec<String> {
        mixins.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_less_variables_innermost_first() {
        let mut b = TreeBuilder::new();
        let root = b.root();
        b.define_variable(root, "@a", "1px");
        b.define_variable(root, "@b", "2px");
        let foo = b.section(root, ".foo");
        b.open_scope(foo);
        b.define_variable(foo, "@b", "3px");
        b.define_variable(foo, "@c", "4px");
        b.property(foo, "padding", "@b");
        let tree = b.finish();
        let model = RepresentationTree::result(&tree);
        let foo = model.get_by_node(foo).unwrap();

        let less = Less.variables_at(foo);
        let less: Vec<(&str, &str)> = less.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(less, [("@b", "3px"), ("@c", "4px"), ("@a", "1px")]);

        let scss: Vec<_> = Scss.variables_at(foo).into_keys().collect();
        assert_eq!(scss, ["@a", "@b", "@c"]);
    }

    #[test]
    fn test_less_mixins_walk_ancestors() {
        let mut b = TreeBuilder::new().with_uri("/style.less");
        let root = b.root();
        let mx = b.section(root, ".mx");
        b.mark_mixin(mx, MixinDefinition::new(".mx"));
        let inner = b.section(mx, ".inner");
        b.mark_mixin(inner, MixinDefinition::new(".inner"));
        let deep = b.section(inner, ".deep");
        b.mark_mixin(deep, MixinDefinition::new(".deep").with_arg("@x", None));
        let foo = b.section(root, ".foo");
        b.mark_mixin(foo, MixinDefinition::new(".foo"));
        let pair = b.section(foo, "&.a, &.b");
        b.mark_mixin(pair, MixinDefinition::with_names([".a", ".b"]));
        b.import_mixins(
            root,
            ExternalMixins {
                uri: "/lib.less".into(),
                mixins: vec![MixinDefinition::new(".ext")],
            },
        );
        b.import_mixins(
            root,
            ExternalMixins {
                uri: "/style.less".into(),
                mixins: vec![MixinDefinition::new(".self")],
            },
        );
        let tree = b.finish();
        let model = RepresentationTree::source(&tree);
        let foo = model.get_by_node(foo).unwrap();

        let mixins = Less.mixins_visible_at(foo, foo);
        assert_eq!(
            names(&mixins),
            [
                ".a",
                ".b",
                ".mx",
                ".mx.inner",
                ".mx.inner.deep(@x)",
                ".foo",
                ".foo.a",
                ".foo.b",
                ".ext"
            ]
        );
    }

    #[test]
    fn test_mixin_bodies_and_division() {
        let mut b = TreeBuilder::new();
        let root = b.root();
        let plain = b.section(root, ".plain");
        b.mark_mixin(plain, MixinDefinition::new(".plain"));
        let call = b.section(root, ".call(@a: 1)");
        b.mark_mixin(call, MixinDefinition::new(".call").with_arg("@a", Some("1")));
        let empty_args = b.section(root, ".reset ()");
        b.mark_mixin(empty_args, MixinDefinition::new(".reset"));
        let negated = b.section(root, ".a:not(.b)");
        b.mark_mixin(negated, MixinDefinition::new(".a"));
        let nth = b.section(root, "li.item:nth-child(2n)");
        b.mark_mixin(nth, MixinDefinition::new(".item"));
        let tree = b.finish();
        let model = RepresentationTree::source(&tree);

        let plain = model.get_by_node(plain).unwrap();
        let call = model.get_by_node(call).unwrap();
        assert!(!Less.is_mixin_body(plain));
        assert!(Less.is_mixin_body(call));
        assert!(Less.is_mixin_body(model.get_by_node(empty_args).unwrap()));
        assert!(!Less.is_mixin_body(model.get_by_node(negated).unwrap()));
        assert!(!Less.is_mixin_body(model.get_by_node(nth).unwrap()));
        assert!(Scss.is_mixin_body(plain));

        assert_eq!(Less.division_mode("font"), DivisionMode::Never);
        assert_eq!(Less.division_mode("line-height"), DivisionMode::Always);
        assert_eq!(Scss.division_mode("font"), DivisionMode::Sass);
        assert_eq!(Dialect::Unknown.strategy().division_mode("font"), DivisionMode::Always);

        assert!(Dialect::Less.strategy().is_variable("@a"));
        assert!(!Dialect::Less.strategy().is_variable("$a"));
        assert!(Dialect::Unknown.strategy().is_variable("$a"));
        assert!(Dialect::Unknown.strategy().mixins_visible_at(call, call).is_empty());
    }
}
