//! Scope-aware completions.
//!
//! Every non-property source node whose resolved counterpart is known gets a
//! [`CompletionRecord`]: the variables visible there (raw text and evaluated
//! value) and the mixins that can be called. Mixin bodies have no counterpart
//! of their own, so they inherit the record of their enclosing rule with the
//! mixin parameters layered on top.

use std::fmt;

use nuance_toile::MixinDefinition;
use nuance_trousse::{CompactString, FxHashMap, FxIndexMap};
use serde::Serialize;

use crate::{AnalysisContext, Repr, WrapperId};

/// A variable offered at some location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableCompletion {
    /// Expression text as written
    pub raw: CompactString,
    /// Evaluated literal, `None` when evaluation failed
    pub computed: Option<String>,
}

/// A callable mixin
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MixinCompletion {
    pub name: CompactString,
    /// `(parameter, default)` pairs
    pub arguments: Vec<(CompactString, Option<CompactString>)>,
}

impl MixinCompletion {
    pub fn from_definition(name: &str, mixin: &MixinDefinition) -> Self {
        Self {
            name: name.into(),
            arguments: mixin
                .args
                .iter()
                .map(|arg| (arg.name.clone(), arg.value.clone()))
                .collect(),
        }
    }
}

/// `name(@a, @b)`, or just `name` without parameters
impl fmt::Display for MixinCompletion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.arguments.is_empty() {
            f.write_str("(")?;
            for (i, (name, _)) in self.arguments.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(name)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Completions at one source location
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletionRecord {
    pub variables: FxIndexMap<CompactString, VariableCompletion>,
    pub mixins: Vec<MixinCompletion>,
}

impl CompletionRecord {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty() && self.mixins.is_empty()
    }
}

/// Completion records for every source node that has one, root included
pub fn compute(cx: &AnalysisContext<'_>) -> FxIndexMap<WrapperId, CompletionRecord> {
    let mut engine = CompletionEngine {
        cx,
        memo: FxHashMap::default(),
    };
    let mut out = FxIndexMap::default();
    for node in cx.source.iter() {
        if node.is_property() {
            continue;
        }
        if let Some(record) = engine.record(node) {
            out.insert(node.id(), record);
        }
    }
    out
}

struct CompletionEngine<'c, 'a> {
    cx: &'c AnalysisContext<'a>,
    /// Per-call memo; `None` records "no completions here"
    memo: FxHashMap<WrapperId, Option<CompletionRecord>>,
}

impl<'a> CompletionEngine<'_, 'a> {
    fn record(&mut self, node: Repr<'a>) -> Option<CompletionRecord> {
        if let Some(done) = self.memo.get(&node.id()) {
            return done.clone();
        }

        let record = if node.is_property() {
            None
        } else if self.cx.strategy.is_mixin_body(node) {
            Some(self.overlay(node))
        } else {
            self.resolved(node)
        };
        let record = record.filter(|r| !r.is_empty());

        self.memo.insert(node.id(), record.clone());
        record
    }

    /// Rule or root: read the scope of its resolved counterpart
    fn resolved(&self, node: Repr<'a>) -> Option<CompletionRecord> {
        let result = self.cx.lookup(node)?;
        let (ctx, listed) = self.cx.visible_variables(result);

        let variables = listed
            .into_iter()
            .map(|(name, raw)| {
                let computed = match ctx.evaluate_variable(&name) {
                    Ok(value) => Some(value.to_string()),
                    Err(err) => {
                        tracing::trace!(node = %node.id(), variable = %name, %err, "completion value not computed");
                        None
                    }
                };
                (name, VariableCompletion { raw, computed })
            })
            .collect();
        let mixins = self.cx.strategy.mixins_visible_at(node, result);

        Some(CompletionRecord { variables, mixins })
    }

    /// Mixin body: the enclosing record plus the mixin's own parameters
    fn overlay(&mut self, node: Repr<'a>) -> CompletionRecord {
        let mut record = node
            .parent()
            .and_then(|parent| self.record(parent))
            .unwrap_or_default();

        let Some(mixin) = node.raw().mixin_definition() else {
            return record;
        };

        let ctx = nuance_teinte::Context::new(
            record
                .variables
                .iter()
                .map(|(name, v)| (name.clone(), v.raw.clone())),
        );
        for param in &mixin.args {
            if !self.cx.is_candidate(&param.name) {
                continue;
            }
            let computed = param
                .value
                .as_deref()
                .and_then(|raw| ctx.evaluate(raw).ok())
                .map(|value| value.to_string());
            record.variables.insert(
                param.name.clone(),
                VariableCompletion {
                    raw: param.value.clone().unwrap_or_default(),
                    computed,
                },
            );
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixin_display() {
        let mixin = MixinDefinition::new(".mx")
            .with_arg("@a", Some("1"))
            .with_arg("@b", None);
        assert_eq!(
            MixinCompletion::from_definition(".mx", &mixin).to_string(),
            ".mx(@a, @b)"
        );
        assert_eq!(
            MixinCompletion::from_definition(".plain", &MixinDefinition::new(".plain")).to_string(),
            ".plain"
        );
    }

    #[test]
    fn test_record_serialization() {
        let mut record = CompletionRecord::default();
        record.variables.insert(
            "@a".into(),
            VariableCompletion {
                raw: "1px + 1".into(),
                computed: Some("2px".into()),
            },
        );
        record.mixins.push(MixinCompletion::from_definition(
            ".mx",
            &MixinDefinition::new(".mx").with_arg("@aa", Some("2")),
        ));
        insta::assert_snapshot!(
            serde_json::to_string(&record).unwrap(),
            @r#"{"variables":{"@a":{"raw":"1px + 1","computed":"2px"}},"mixins":[{"name":".mx","arguments":[["@aa","2"]]}]}"#
        );
    }
}
