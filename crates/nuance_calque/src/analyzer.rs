//! Analysis orchestration.
//!
//! [`Analyzer::analyze`] wraps both trees, builds the reference index and
//! runs every engine over them. Nothing survives the call except the returned
//! [`Analysis`]; evaluation caches live inside the engines.

use std::fmt;

use nuance_teinte::Context;
use nuance_toile::{Dialect, NodeId, ResolvedStylesheet};
use nuance_trousse::{CompactString, FxIndexMap};
use serde::{Deserialize, Serialize};

use crate::{
    completions, computed, dialect::DialectExt, mixin_call, selectors, suggest, CompletionRecord,
    DialectStrategy, MixinInvocation, ReferenceIndex, Repr, RepresentationTree, Suggestion,
    WrapperId,
};

/// Tunables of an analysis, read from the `analysis` section of
/// `nuance.config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyzerOptions {
    /// Largest color distance still suggested (inclusive)
    pub max_color_distance: f64,
    /// Pseudo-variables (without sigil) never offered to the user
    pub excluded_variables: Vec<CompactString>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            max_color_distance: 60.0,
            excluded_variables: vec!["arguments".into(), "import".into()],
        }
    }
}

impl AnalyzerOptions {
    /// Whether `variable` (sigil included) is a pseudo-variable
    pub fn is_excluded(&self, variable: &str) -> bool {
        let bare = variable.trim_start_matches(['@', '$']);
        self.excluded_variables.iter().any(|e| e.as_str() == bare)
    }
}

/// What every engine receives: both models, the index, the dialect strategy
/// and the options of the current call
#[derive(Clone, Copy)]
pub struct AnalysisContext<'a> {
    pub source: &'a RepresentationTree<'a>,
    pub result: &'a RepresentationTree<'a>,
    pub index: &'a ReferenceIndex<'a>,
    pub strategy: &'static dyn DialectStrategy,
    pub options: &'a AnalyzerOptions,
}

impl<'a> AnalysisContext<'a> {
    /// Authoritative result (or pruned) wrapper of a source wrapper
    #[inline]
    pub fn lookup(&self, source: Repr<'_>) -> Option<Repr<'a>> {
        self.index.lookup(source, self.result)
    }

    /// Whether `name` is a variable the user should be offered
    pub fn is_candidate(&self, name: &str) -> bool {
        self.strategy.is_variable(name) && !self.options.is_excluded(name)
    }

    /// Evaluation context over every variable visible at `result`, plus the
    /// user-facing subset in listing order
    pub fn visible_variables(
        &self,
        result: Repr<'_>,
    ) -> (Context, Vec<(CompactString, CompactString)>) {
        let all = self.strategy.variables_at(result);
        let listed = all
            .iter()
            .filter(|(name, _)| self.is_candidate(name))
            .map(|(name, raw)| (name.clone(), raw.clone()))
            .collect();
        let mut ctx = Context::new(all);
        ctx.set_division_mode(self.strategy.division_mode(""));
        (ctx, listed)
    }
}

/// Entry point
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    options: AnalyzerOptions,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: AnalyzerOptions) -> Self {
        self.options = options;
        self
    }

    #[inline]
    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Analyze one resolved stylesheet
    pub fn analyze<'t>(&self, stylesheet: &'t ResolvedStylesheet) -> Analysis<'t> {
        let dialect = stylesheet.dialect;
        let _span = tracing::debug_span!(
            "analyze",
            %dialect,
            source_nodes = stylesheet.source.len(),
            result_nodes = stylesheet.result.len(),
        )
        .entered();

        if dialect == Dialect::Unknown {
            tracing::warn!("unknown stylesheet dialect, mixin completions are skipped");
        }

        let source = RepresentationTree::source(&stylesheet.source);
        let result = RepresentationTree::result(&stylesheet.result);
        let index = ReferenceIndex::build(&source, &result, &stylesheet.pruned);

        let cx = AnalysisContext {
            source: &source,
            result: &result,
            index: &index,
            strategy: dialect.strategy(),
            options: &self.options,
        };

        let selectors = selectors::resolve(&cx);
        let completions = completions::compute(&cx);
        let mixin_calls = mixin_call::trace(&cx);
        let variable_suggestions = suggest::suggest(&cx);
        let computed_values = computed::compute(&cx);
        let references = index.forward().clone();

        tracing::debug!(
            selectors = selectors.len(),
            completions = completions.len(),
            mixin_calls = mixin_calls.len(),
            suggestions = variable_suggestions.len(),
            computed = computed_values.len(),
            "analysis finished"
        );

        Analysis {
            source,
            result,
            index,
            dialect,
            references,
            selectors,
            completions,
            mixin_calls,
            variable_suggestions,
            computed_values,
        }
    }
}

/// Output of one analysis call, keyed by source wrapper ids
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis<'t> {
    source: RepresentationTree<'t>,
    result: RepresentationTree<'t>,
    #[serde(skip)]
    index: ReferenceIndex<'t>,
    pub dialect: Dialect,
    pub references: FxIndexMap<WrapperId, Vec<WrapperId>>,
    pub selectors: FxIndexMap<WrapperId, CompactString>,
    pub completions: FxIndexMap<WrapperId, CompletionRecord>,
    pub mixin_calls: FxIndexMap<WrapperId, Vec<MixinInvocation>>,
    pub variable_suggestions: FxIndexMap<WrapperId, Vec<Suggestion>>,
    pub computed_values: FxIndexMap<WrapperId, Option<String>>,
}

impl<'t> Analysis<'t> {
    #[inline]
    pub fn source_model(&self) -> &RepresentationTree<'t> {
        &self.source
    }

    #[inline]
    pub fn result_model(&self) -> &RepresentationTree<'t> {
        &self.result
    }

    #[inline]
    pub fn reference_index(&self) -> &ReferenceIndex<'t> {
        &self.index
    }

    /// Wrapper id of a source arena node
    pub fn source_id(&self, node: NodeId) -> Option<WrapperId> {
        self.source.get_by_node(node).map(|r| r.id())
    }

    /// Authoritative result wrapper of a source arena node
    pub fn lookup(&self, node: NodeId) -> Option<Repr<'_>> {
        let source = self.source.get_by_node(node)?;
        self.index.lookup(source, &self.result)
    }

    pub fn stats(&self) -> AnalysisStats {
        AnalysisStats {
            source_nodes: self.source.len(),
            result_nodes: self.result.len(),
            pruned_nodes: self.index.pruned().len(),
            references: self.references.len(),
            selectors: self.selectors.len(),
            completions: self.completions.len(),
            mixin_calls: self.mixin_calls.values().map(Vec::len).sum(),
            variable_suggestions: self.variable_suggestions.len(),
            computed_values: self.computed_values.len(),
            failed_values: self.computed_values.values().filter(|v| v.is_none()).count(),
        }
    }
}

/// Entry counts of an [`Analysis`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    pub source_nodes: usize,
    pub result_nodes: usize,
    pub pruned_nodes: usize,
    pub references: usize,
    pub selectors: usize,
    pub completions: usize,
    pub mixin_calls: usize,
    pub variable_suggestions: usize,
    pub computed_values: usize,
    /// Computed values that failed to evaluate
    pub failed_values: usize,
}

impl fmt::Display for AnalysisStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "nodes:       {} source, {} result, {} pruned",
            self.source_nodes, self.result_nodes, self.pruned_nodes
        )?;
        writeln!(f, "references:  {}", self.references)?;
        writeln!(f, "selectors:   {}", self.selectors)?;
        writeln!(f, "completions: {}", self.completions)?;
        writeln!(f, "mixin calls: {}", self.mixin_calls)?;
        writeln!(f, "suggestions: {}", self.variable_suggestions)?;
        write!(
            f,
            "computed:    {} ({} failed)",
            self.computed_values, self.failed_values
        )
    }
}
