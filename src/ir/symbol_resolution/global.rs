//! File- and project-level definitions
//!
//! [`SiblingDefinitionResolver`] scans the top-level forms of the cursor's own
//! file; [`ProjectDefinitionResolver`] serves public definitions from other
//! project files, pre-scanned into [`FileSummary`] values by the caller.

use std::sync::Arc;

use tracing::trace;

use crate::ir::inert;
use crate::ir::syntax::{Node, SyntaxKind};
use crate::workspace::{FileSummary, call_signature};

use super::lexical_scope::head_form;
use super::{Binding, BindingCollector, BindingKind, GLOBAL_DEPTH, ResolvedScope};

/// Top-level definitions of the file containing the cursor.
pub struct SiblingDefinitionResolver {
    /// Maximum top-level forms inspected
    max_forms: usize,
}

impl SiblingDefinitionResolver {
    pub fn new(max_forms: usize) -> Self {
        Self { max_forms }
    }
}

/// Name of the innermost definition form enclosing `cursor`.
pub fn enclosing_definition_name(cursor: Node<'_>) -> Option<&str> {
    cursor
        .ancestors()
        .filter(|list| list.kind().is_call())
        .find(|list| head_form(*list).is_some_and(|kind| kind.is_definition()))
        .and_then(|list| list.nth_form(1).ok())
        .filter(|name| name.kind() == SyntaxKind::Symbol && !name.is_or_contains(cursor))
        .map(|name| name.text())
}

impl BindingCollector for SiblingDefinitionResolver {
    fn collect(&self, cursor: Node<'_>, _offset: usize, scope: &mut ResolvedScope) {
        let own_name = enclosing_definition_name(cursor);

        for form in cursor.tree().root().forms().take(self.max_forms) {
            if scope.is_full() {
                break;
            }
            if !form.kind().is_call() || inert::is_deactivated(form) {
                continue;
            }
            let Some(definition_kind) = head_form(form).and_then(|kind| kind.definition_kind())
            else {
                continue;
            };
            let Ok(name) = form.nth_form(1) else {
                continue;
            };
            if name.kind() != SyntaxKind::Symbol || name.is_or_contains(cursor) {
                continue;
            }

            let kind = if own_name == Some(name.text()) {
                BindingKind::SelfReference(definition_kind)
            } else {
                BindingKind::LocalDefinition(definition_kind)
            };
            trace!("Sibling definition {} ({:?})", name.text(), kind);
            scope.insert(Binding {
                signature: call_signature(form, name.text()),
                ..Binding::local(name.text(), kind, GLOBAL_DEPTH)
            });
        }
    }

    fn name(&self) -> &'static str {
        "SiblingDefinitionResolver"
    }
}

/// Public definitions of other project files.
pub struct ProjectDefinitionResolver<'a> {
    summaries: &'a [Arc<FileSummary>],
    max_files: usize,
    max_definitions_per_file: usize,
}

impl<'a> ProjectDefinitionResolver<'a> {
    pub fn new(
        summaries: &'a [Arc<FileSummary>],
        max_files: usize,
        max_definitions_per_file: usize,
    ) -> Self {
        Self {
            summaries,
            max_files,
            max_definitions_per_file,
        }
    }
}

impl BindingCollector for ProjectDefinitionResolver<'_> {
    fn collect(&self, _cursor: Node<'_>, _offset: usize, scope: &mut ResolvedScope) {
        for summary in self.summaries.iter().take(self.max_files) {
            let stem = summary.stem();
            for definition in summary.definitions.iter().take(self.max_definitions_per_file) {
                if scope.is_full() {
                    return;
                }
                scope.insert(Binding {
                    name: definition.name.clone(),
                    kind: BindingKind::ProjectDefinition(definition.kind),
                    source_file: Some(stem.clone()),
                    scope_depth: GLOBAL_DEPTH,
                    signature: definition.signature.clone(),
                });
            }
        }
    }

    fn name(&self) -> &'static str {
        "ProjectDefinitionResolver"
    }
}
