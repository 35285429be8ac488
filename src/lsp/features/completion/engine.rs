//! Completion request handling
//!
//! A request runs `classify → resolve scope → produce → rank`:
//!
//! ```text
//! Start → Classify → { NewForm | ParamVecDecl | InsideParamVec | DefName
//!                    | NamespaceClause | Keyword | Argument/Expression }
//!       → ResolveScope (only where locals can appear) → Rank → Emit
//! ```
//!
//! Every request produces a list. Errors and panics inside a request are
//! logged and replaced by the fallback set from
//! [`indexing::add_fallback`](super::indexing::add_fallback).

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::Arc;

use lsp_types::{CompletionItem, Position};
use ropey::Rope;
use tracing::{debug, trace, warn};

use crate::config::CompletionConfig;
use crate::errors::{CompletionError, CompletionResult};
use crate::ir::inert;
use crate::ir::reader;
use crate::ir::symbol_resolution::{
    LexicalScopeResolver, ProjectDefinitionResolver, ResolvedScope, ScopeResolver,
    SiblingDefinitionResolver,
};
use crate::ir::syntax::{Node, SyntaxKind};
use crate::lsp::features::node_finder::{insert_placeholder, position_to_offset};
use crate::workspace::{FileSummary, ProjectSources};

use super::cache::CompletionCache;
use super::context::{CompletionContext, CursorPosition, PositionClassifier, PositionKind};
use super::dictionary::{self, ApiGroup, Candidate};
use super::indexing::{self, CandidateSink};
use super::namespace::add_namespace_candidates;
use super::ranking::{Priority, RankingContext, RankingCriteria, rank};

/// Context-aware completion for Phel source.
///
/// The engine is `Send + Sync`; one instance serves every request of a host.
///
/// # Example Usage
///
/// ```ignore
/// let engine = CompletionEngine::new(CompletionConfig::default())
///     .with_project(Arc::new(WorkspaceDirectory::new("/path/to/project")?));
/// let candidates = engine.complete_source("(filter ", 8)?;
/// ```
pub struct CompletionEngine {
    config: CompletionConfig,
    cache: Arc<CompletionCache>,
    project: Option<Arc<dyn ProjectSources>>,
    criteria: RankingCriteria,
}

impl CompletionEngine {
    pub fn new(config: CompletionConfig) -> Self {
        let criteria = RankingCriteria {
            max_results: config.max_results,
            ..RankingCriteria::default()
        };
        Self {
            config,
            cache: Arc::new(CompletionCache::default()),
            project: None,
            criteria,
        }
    }

    /// Share a cache with other engines (e.g. one per open document).
    pub fn with_cache(mut self, cache: Arc<CompletionCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Enable cross-file definitions and project namespaces.
    pub fn with_project(mut self, project: Arc<dyn ProjectSources>) -> Self {
        self.project = Some(project);
        self
    }

    pub fn with_criteria(mut self, criteria: RankingCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CompletionCache> {
        &self.cache
    }

    /// Ranked candidates for `cursor`.
    pub fn get_completions(&self, cursor: &CursorPosition<'_>) -> Vec<Candidate> {
        self.get_completions_in(cursor, None)
    }

    /// Ranked candidates for `cursor` in the file at `current_file`, which is
    /// left out of project scans.
    pub fn get_completions_in(
        &self,
        cursor: &CursorPosition<'_>,
        current_file: Option<&Path>,
    ) -> Vec<Candidate> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.complete(cursor, current_file)));
        match outcome {
            Ok(Ok(candidates)) => candidates,
            Ok(Err(err)) => {
                warn!("Completion at {} degraded: {}", cursor.offset, err);
                self.fallback_candidates()
            }
            Err(_) => {
                warn!("Completion at {} panicked; returning fallback set", cursor.offset);
                self.fallback_candidates()
            }
        }
    }

    /// Complete `source` at byte `offset`.
    ///
    /// The host placeholder is inserted at `offset` before reading, so an
    /// empty slot still yields a cursor node of its own.
    pub fn complete_source(&self, source: &str, offset: usize) -> CompletionResult<Vec<Candidate>> {
        self.complete_source_in(source, offset, None)
    }

    pub fn complete_source_in(
        &self,
        source: &str,
        offset: usize,
        current_file: Option<&Path>,
    ) -> CompletionResult<Vec<Candidate>> {
        let text = insert_placeholder(source, offset, &self.config.placeholder)?;
        let tree = reader::read(&text);
        let cursor = CursorPosition::locate(&tree, offset, &self.config)?;
        Ok(self.get_completions_in(&cursor, current_file))
    }

    /// Complete a document at an LSP position.
    ///
    /// # Returns
    /// Completion items whose sort text preserves the ranked order
    pub fn complete_at(&self, text: &str, position: Position) -> CompletionResult<Vec<CompletionItem>> {
        let rope = Rope::from_str(text);
        let offset = position_to_offset(&rope, &position).ok_or(CompletionError::PositionOutOfBounds {
            line: position.line,
            character: position.character,
        })?;
        let candidates = self.complete_source(text, offset)?;
        Ok(completion_items(&candidates))
    }

    /// Whether `node` is deactivated by a `#_` marker.
    pub fn is_inert(&self, node: Node<'_>) -> bool {
        inert::is_inert(node)
    }

    /// Drop memoized lookups and project summaries after sources changed.
    pub fn clear_caches(&self) {
        self.cache.clear();
    }

    /// Report that the user accepted `name`.
    ///
    /// # Returns
    /// The new usage count
    pub fn record_usage(&self, name: &str) -> usize {
        self.cache.record_usage(name)
    }

    /// The minimal set returned when a request cannot be completed normally,
    /// ranked like any other result.
    pub fn fallback_candidates(&self) -> Vec<Candidate> {
        let mut sink = CandidateSink::new("");
        indexing::add_fallback(&mut sink);
        rank(sink.into_candidates(), &RankingContext::default(), &self.criteria)
    }

    fn complete(
        &self,
        cursor: &CursorPosition<'_>,
        current_file: Option<&Path>,
    ) -> CompletionResult<Vec<Candidate>> {
        // The cursor node must belong to the tree it claims to.
        cursor.tree().node(cursor.node.id())?;

        let context = PositionClassifier::new(&self.config).context(cursor);
        debug!("Completing {:?} with prefix {:?}", context.position, context.prefix);

        let in_literal = matches!(
            cursor.node.kind(),
            SyntaxKind::String | SyntaxKind::LineComment
        );
        if in_literal && !matches!(context.position, PositionKind::NamespaceClausePosition(_)) {
            trace!("Cursor inside a string or comment; nothing to complete");
            return Ok(Vec::new());
        }

        let mut sink = CandidateSink::new(&context.prefix);
        self.produce(cursor, &context, current_file, &mut sink);
        trace!("Produced {} candidate(s)", sink.len());

        let candidates = self.annotate_usage(sink.into_candidates());
        let ranking = RankingContext::new(context.enclosing_head.clone());
        Ok(rank(candidates, &ranking, &self.criteria))
    }

    fn produce(
        &self,
        cursor: &CursorPosition<'_>,
        context: &CompletionContext,
        current_file: Option<&Path>,
        sink: &mut CandidateSink,
    ) {
        match &context.position {
            PositionKind::TopLevelNewForm => {
                indexing::add_new_form(Priority::CurrentScopeLocals, sink);
                indexing::add_templates(sink);
            }
            PositionKind::ParameterVectorDeclaration => indexing::add_parameter_vector_opener(sink),
            PositionKind::InsideParameterVector { closed } => {
                indexing::add_parameter_names(*closed, sink);
            }
            PositionKind::DefinitionNamePosition => indexing::add_definition_name_hint(sink),
            PositionKind::NamespaceClausePosition(clause) => {
                let summaries = self.project_summaries(current_file);
                let namespaces: Vec<String> = summaries
                    .iter()
                    .filter_map(|summary| summary.namespace.clone())
                    .collect();
                add_namespace_candidates(
                    *clause,
                    context.namespace_text.as_deref().unwrap_or(""),
                    &context.prefix,
                    &namespaces,
                    sink,
                );
            }
            PositionKind::KeywordPosition { namespaced } => {
                let placeholder = &self.config.placeholder;
                let file_keywords = cursor
                    .tree()
                    .nodes()
                    .filter(|node| node.kind() == SyntaxKind::Keyword && *node != cursor.node)
                    .filter(|node| !inert::is_inert(*node))
                    .map(|node| node.text())
                    .filter(|text| !text.contains(placeholder.as_str()));
                indexing::add_keywords(*namespaced, file_keywords, sink);
            }
            PositionKind::FunctionNamePosition => {
                let summaries = self.project_summaries(current_file);
                let scope = self.resolve_scope(cursor, &summaries);
                indexing::add_bindings(&scope, sink);
                indexing::add_value_literals(Priority::CommonBuiltins, sink);
                indexing::add_catalog(sink, |entry| {
                    matches!(entry.group, ApiGroup::SpecialForm | ApiGroup::ControlFlow)
                });
                indexing::add_catalog(sink, |entry| entry.group == ApiGroup::Macro);
                indexing::add_catalog(sink, |entry| entry.group.is_argument_api());
                indexing::add_catalog(sink, |entry| {
                    entry.group.is_namespaced() && entry.group != ApiGroup::PhpInterop
                });
                indexing::add_catalog(sink, |entry| entry.group == ApiGroup::PhpInterop);
            }
            PositionKind::ArgumentPosition { function, index } => {
                let summaries = self.project_summaries(current_file);
                let scope = self.resolve_scope(cursor, &summaries);
                indexing::add_bindings(&scope, sink);
                indexing::add_value_literals(Priority::CommonBuiltins, sink);
                if let Some(signature) = self.signature_of(function, &scope, &summaries) {
                    indexing::add_parameter_hint(function, *index, &signature, sink);
                }
                indexing::add_catalog(sink, |entry| entry.group.is_argument_api());
                indexing::add_new_form(Priority::CommonBuiltins, sink);
            }
            PositionKind::ExpressionPosition => {
                let summaries = self.project_summaries(current_file);
                let scope = self.resolve_scope(cursor, &summaries);
                indexing::add_bindings(&scope, sink);
                indexing::add_value_literals(Priority::CommonBuiltins, sink);
                let suppress_api = context.enclosing_form.is_some_and(|form| form.suppresses_api());
                if !suppress_api {
                    indexing::add_catalog(sink, |entry| entry.group != ApiGroup::SpecialForm);
                }
                indexing::add_new_form(Priority::CurrentScopeLocals, sink);
                indexing::add_templates(sink);
            }
        }
    }

    fn project_summaries(&self, current_file: Option<&Path>) -> Vec<Arc<FileSummary>> {
        match &self.project {
            Some(project) => self
                .cache
                .project_summaries(project.as_ref(), &self.config, current_file),
            None => Vec::new(),
        }
    }

    fn resolve_scope(
        &self,
        cursor: &CursorPosition<'_>,
        summaries: &[Arc<FileSummary>],
    ) -> ResolvedScope {
        ScopeResolver::new(self.config.max_bindings)
            .with(LexicalScopeResolver::new(self.config.max_traversal_depth))
            .with(SiblingDefinitionResolver::new(self.config.max_sibling_definitions))
            .with(ProjectDefinitionResolver::new(
                summaries,
                self.config.max_project_files,
                self.config.max_definitions_per_file,
            ))
            .resolve_visible(cursor.node, cursor.offset)
    }

    /// Call shape of `function`: a visible definition first, then the catalog
    /// and project definitions (memoized).
    fn signature_of(
        &self,
        function: &str,
        scope: &ResolvedScope,
        summaries: &[Arc<FileSummary>],
    ) -> Option<String> {
        if let Some(binding) = scope.get(function) {
            return binding.signature.clone();
        }
        let project_signature = || {
            summaries
                .iter()
                .flat_map(|summary| summary.definitions.iter())
                .find(|definition| definition.name == function)
                .and_then(|definition| definition.signature.clone())
        };
        let known = self.cache.symbol_exists(function, || {
            dictionary::lookup(function).is_some() || project_signature().is_some()
        });
        if !known {
            return None;
        }
        self.cache.signature(function, || {
            dictionary::lookup(function)
                .map(|entry| entry.signature)
                .filter(|signature| !signature.is_empty())
                .map(str::to_string)
                .or_else(project_signature)
        })
    }

    fn annotate_usage(&self, mut candidates: Vec<Candidate>) -> Vec<Candidate> {
        for candidate in candidates.iter_mut().filter(|c| !c.is_informational()) {
            let count = self.cache.usage_count(&candidate.text);
            if count == 0 {
                continue;
            }
            candidate.type_hint = Some(match candidate.type_hint.take() {
                Some(hint) => format!("{} (used {}x)", hint, count),
                None => format!("used {}x", count),
            });
        }
        candidates
    }
}

impl Default for CompletionEngine {
    fn default() -> Self {
        Self::new(CompletionConfig::default())
    }
}

/// LSP items for ranked candidates, in order.
pub fn completion_items(candidates: &[Candidate]) -> Vec<CompletionItem> {
    candidates
        .iter()
        .enumerate()
        .map(|(sort_order, candidate)| candidate.to_completion_item(sort_order))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lsp::features::completion::dictionary::InsertionBehavior;
    use crate::workspace::InMemoryProject;

    fn complete(engine: &CompletionEngine, marked: &str) -> Vec<Candidate> {
        let offset = marked.find('¦').unwrap();
        let source = marked.replacen('¦', "", 1);
        engine.complete_source(&source, offset).unwrap()
    }

    fn texts(candidates: &[Candidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_top_level_offers_only_new_form_and_templates() {
        let engine = CompletionEngine::default();
        let candidates = complete(&engine, "(def a 1)\n¦");
        assert_eq!(candidates[0].insertion, InsertionBehavior::BalancedParens);
        assert!(candidates[1..]
            .iter()
            .all(|c| matches!(c.insertion, InsertionBehavior::Template(_))));
        assert_eq!(candidates.len(), 7);
    }

    #[test]
    fn test_definition_name_offers_no_existing_names() {
        let engine = CompletionEngine::default();
        let candidates = complete(&engine, "(defn helper [] 1)\n(defn ¦");
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_informational());
        assert!(!texts(&candidates).contains(&"helper"));
    }

    #[test]
    fn test_filter_argument_ranks_predicates_first() {
        let engine = CompletionEngine::default();
        let candidates = complete(&engine, "(filter ¦)");
        let position = |name: &str| candidates.iter().position(|c| c.text == name).unwrap();
        assert!(position("nil?") < position("first"));
        assert!(position("even?") < position("count"));
        // Parameter hint comes from the catalog signature.
        assert_eq!(candidates[0].display_text, "pred (argument 1 of filter)");
        // No templates or definition forms at argument positions.
        assert!(!candidates.iter().any(|c| matches!(c.insertion, InsertionBehavior::Template(_))));
        assert!(!texts(&candidates).contains(&"defn"));
    }

    #[test]
    fn test_parameter_vector_declaration_offers_only_bracket() {
        let engine = CompletionEngine::default();
        let candidates = complete(&engine, "(defn foo ¦)");
        assert_eq!(texts(&candidates), vec!["["]);
    }

    #[test]
    fn test_locals_come_first() {
        let engine = CompletionEngine::default();
        let candidates = complete(&engine, "(defn f [coll] (let [total 0] (+ ¦)))");
        let named: Vec<&Candidate> = candidates.iter().filter(|c| !c.is_informational()).collect();
        let first: Vec<&str> = named.iter().take(3).map(|c| c.text.as_str()).collect();
        assert_eq!(first, vec!["total", "coll", "f"]);
        assert_eq!(named[2].priority, Priority::CurrentFunctionRecursive);
    }

    #[test]
    fn test_prefix_filters_candidates() {
        let engine = CompletionEngine::default();
        let candidates = complete(&engine, "(defn f [] (str/jo¦))");
        assert!(texts(&candidates).contains(&"str/join"));
        assert!(candidates.iter().all(|c| c.text.starts_with("str/jo")));
    }

    #[test]
    fn test_no_completion_inside_strings() {
        let engine = CompletionEngine::default();
        assert!(complete(&engine, "(println \"hel¦lo\")").is_empty());
    }

    #[test]
    fn test_project_definitions_and_namespaces() {
        let project = InMemoryProject::new()
            .with_file("src/utils.phel", "(ns app\\utils)\n(defn helper [x y] x)")
            .with_file("src/main.phel", "(ns app\\main)");
        let engine = CompletionEngine::default().with_project(Arc::new(project));

        let candidates = complete(&engine, "(defn run [] (hel¦))");
        let helper = candidates.iter().find(|c| c.text == "helper").unwrap();
        assert_eq!(helper.type_hint.as_deref(), Some("Public Function (utils)"));
        assert_eq!(helper.signature.as_deref(), Some("(helper x y)"));

        let candidates = complete(&engine, "(helper 1 ¦)");
        assert_eq!(candidates[0].display_text, "y (argument 2 of helper)");

        let candidates = complete(&engine, "(ns app\\main (:require app¦))");
        assert_eq!(texts(&candidates), vec!["app\\utils", "app\\main"]);
    }

    #[test]
    fn test_usage_is_shown_in_type_hint() {
        let engine = CompletionEngine::default();
        engine.record_usage("map");
        engine.record_usage("map");
        let candidates = complete(&engine, "(ma¦)");
        let map = candidates.iter().find(|c| c.text == "map").unwrap();
        assert!(map.type_hint.as_deref().unwrap().ends_with("(used 2x)"));

        engine.clear_caches();
        assert_eq!(engine.cache().usage_count("map"), 2);
    }

    #[test]
    fn test_max_results() {
        let config = CompletionConfig {
            max_results: Some(5),
            ..CompletionConfig::default()
        };
        let engine = CompletionEngine::new(config);
        assert_eq!(complete(&engine, "(¦)").len(), 5);
    }

    #[test]
    fn test_fallback_set() {
        let engine = CompletionEngine::default();
        let fallback = engine.fallback_candidates();
        assert_eq!(fallback[0].text, "(");
        assert!(fallback.windows(2).all(|w| w[0].priority <= w[1].priority));
        for literal in ["nil", "true", "false"] {
            assert!(texts(&fallback).contains(&literal));
        }
        assert!(fallback.last().is_some_and(Candidate::is_informational));
    }

    #[test]
    fn test_keywords_in_deactivated_forms_are_not_offered() {
        let engine = CompletionEngine::default();
        let found = complete(&engine, "#_(def secret {:secret-key 1})\n(def user {:seen 1})\n(get m :se¦)");
        assert!(!texts(&found).contains(&":secret-key"));
        assert!(texts(&found).contains(&":seen"));
    }

    #[test]
    fn test_complete_at_lsp_position() {
        let engine = CompletionEngine::default();
        let items = engine
            .complete_at("(ns app)\n(defn ", Position { line: 1, character: 6 })
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sort_text.as_deref(), Some("0000"));

        assert!(matches!(
            engine.complete_at("x", Position { line: 4, character: 0 }),
            Err(CompletionError::PositionOutOfBounds { line: 4, .. })
        ));
    }

    #[test]
    fn test_offset_out_of_bounds() {
        let engine = CompletionEngine::default();
        assert!(matches!(
            engine.complete_source("(a)", 10),
            Err(CompletionError::OffsetOutOfBounds { offset: 10, len: 3 })
        ));
    }

    #[test]
    fn test_engine_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompletionEngine>();
    }
}
