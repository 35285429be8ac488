//! Syntax position classification for code completion
//!
//! Phel has no grammar table to consult at the cursor: definitions, bindings
//! and calls are all lists and vectors. The classifier therefore decides what
//! may be typed from structure alone, walking up from the cursor and trying a
//! fixed sequence of rules. The most constrained positions come first because
//! they admit a single legal token:
//!
//! 0. Keyword being typed
//! 1. File scope with nothing typed
//! 2. Where a parameter vector must start (`(defn name |`)
//! 3. Inside a binding or parameter vector
//! 4. Where a new definition is named (`(defn |`)
//! 5. Inside an `(ns ...)` declaration
//! 6. Operator, argument or body slot of the nearest call
//! 7. Anything else is an expression position
//!
//! A rule that hits a malformed tree does not match; the next rule is tried.

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::CompletionConfig;
use crate::errors::{CompletionError, MalformedTree};
use crate::ir::forms::FormKind;
use crate::ir::inert;
use crate::ir::symbol_resolution::lexical_scope::{binding_vector, head_form, parameter_vector};
use crate::ir::syntax::{Node, SyntaxKind, SyntaxTree};
use crate::lsp::features::node_finder::find_node_at_offset;

use super::namespace::{NamespaceClause, clause_at};

/// Grammatical role of the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum PositionKind {
    /// File scope; only a new form can start here
    TopLevelNewForm,
    /// Operator slot of a list
    FunctionNamePosition,
    /// Plain argument `index` (zero-based) of a call to `function`
    ArgumentPosition { function: String, index: usize },
    /// Value or body slot where a nested form may start
    ExpressionPosition,
    /// The slot where a `fn`/`defn` parameter vector must start
    ParameterVectorDeclaration,
    /// Inside a parameter or binding-name vector
    InsideParameterVector { closed: bool },
    /// Name slot of a definition form
    DefinitionNamePosition,
    NamespaceClausePosition(NamespaceClause),
    /// A keyword is being typed; `namespaced` for `::` keywords
    KeywordPosition { namespaced: bool },
}

/// The cursor: the node it belongs to, its offset and the typed prefix.
#[derive(Debug, Clone)]
pub struct CursorPosition<'t> {
    pub node: Node<'t>,
    pub offset: usize,
    /// Text typed so far, with the host placeholder removed
    pub prefix: String,
}

fn is_word(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::Symbol | SyntaxKind::Keyword | SyntaxKind::Number
    )
}

impl<'t> CursorPosition<'t> {
    /// Find the cursor node for `offset` in `tree`.
    pub fn locate(
        tree: &'t SyntaxTree,
        offset: usize,
        config: &CompletionConfig,
    ) -> Result<Self, CompletionError> {
        let out_of_bounds = CompletionError::OffsetOutOfBounds {
            offset,
            len: tree.source().len(),
        };
        if !tree.source().is_char_boundary(offset) {
            return Err(out_of_bounds);
        }
        let node = find_node_at_offset(tree, offset).ok_or(out_of_bounds)?;
        Ok(Self::from_node(node, offset, config))
    }

    /// Build a cursor for a node the host already resolved.
    ///
    /// The prefix is the placeholder-stripped text of a symbol, keyword or
    /// number node; without a placeholder it is the node text up to `offset`.
    /// Any other node gives an empty prefix.
    pub fn from_node(node: Node<'t>, offset: usize, config: &CompletionConfig) -> Self {
        let prefix = if is_word(node.kind()) {
            let text = node.text();
            if config.contains_placeholder(text) {
                config.strip_placeholder(text)
            } else {
                let typed = offset.saturating_sub(node.offset()).min(text.len());
                text.get(..typed).unwrap_or(text).to_string()
            }
        } else {
            String::new()
        };
        Self {
            node,
            offset,
            prefix,
        }
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.node.tree()
    }
}

/// Ordinal of the cursor among `list`'s active forms.
///
/// The index of the form containing the cursor node, or, when the cursor sits
/// between forms, the number of forms ending at or before the cursor. Forms
/// deactivated by `#_` take no slot.
pub fn cursor_ordinal(list: Node<'_>, cursor: &CursorPosition<'_>) -> usize {
    let mut before = 0;
    for (index, form) in inert::active_forms(list).enumerate() {
        if form.is_or_contains(cursor.node) {
            return index;
        }
        if form.range().end <= cursor.offset {
            before += 1;
        }
    }
    before
}

/// Text of an `ns` declaration from the start of the analysis window up to
/// the cursor.
///
/// The window is the whole declaration when it is at most `window` bytes long,
/// else the `window / 2` bytes before the cursor.
pub fn namespace_window<'t>(ns: Node<'t>, offset: usize, window: usize) -> &'t str {
    let source = ns.tree().source();
    let end = offset.min(source.len());
    let mut start = if ns.text().len() <= window {
        ns.offset()
    } else {
        offset.saturating_sub(window / 2)
    }
    .min(end);
    while !source.is_char_boundary(start) {
        start -= 1;
    }
    source.get(start..end).unwrap_or("")
}

/// Classifier output plus what the producers and ranking need from the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionContext {
    pub position: PositionKind,
    /// Head symbol of the call the cursor contributes a value to
    pub enclosing_head: Option<String>,
    pub enclosing_form: Option<FormKind>,
    pub prefix: String,
    /// Declaration text up to the cursor, for namespace clause positions
    pub namespace_text: Option<String>,
}

/// Nodes enclosing the cursor, innermost first.
struct Scan<'a, 't> {
    cursor: &'a CursorPosition<'t>,
    chain: Vec<Node<'t>>,
}

impl<'a, 't> Scan<'a, 't> {
    fn new(cursor: &'a CursorPosition<'t>, max_depth: usize) -> Self {
        let node = cursor.node;
        let own = (node.kind().is_collection() || node.kind() == SyntaxKind::Root).then_some(node);
        let chain = own
            .into_iter()
            .chain(node.ancestors())
            .take(max_depth)
            .collect();
        Self { cursor, chain }
    }

    fn calls(&self) -> impl Iterator<Item = Node<'t>> + '_ {
        self.chain.iter().copied().filter(|node| node.kind().is_call())
    }

    fn namespace_list(&self) -> Option<Node<'t>> {
        self.calls().find(|list| head_form(*list) == Some(FormKind::Ns))
    }
}

/// Syntax position classifier.
///
/// # Example Usage
///
/// ```ignore
/// let classifier = PositionClassifier::new(&config);
/// let context = classifier.context(&cursor);
/// match context.position { ... }
/// ```
pub struct PositionClassifier<'c> {
    config: &'c CompletionConfig,
}

impl<'c> PositionClassifier<'c> {
    pub fn new(config: &'c CompletionConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, cursor: &CursorPosition<'_>) -> PositionKind {
        let scan = Scan::new(cursor, self.config.max_traversal_depth);
        self.classify_scan(&scan)
    }

    /// Classify the cursor and collect the surrounding context.
    pub fn context(&self, cursor: &CursorPosition<'_>) -> CompletionContext {
        let scan = Scan::new(cursor, self.config.max_traversal_depth);
        let position = self.classify_scan(&scan);

        let namespace_text = match position {
            PositionKind::NamespaceClausePosition(clause) if clause != NamespaceClause::Name => scan
                .namespace_list()
                .map(|ns| namespace_window(ns, cursor.offset, self.config.namespace_window).to_string()),
            _ => None,
        };
        let enclosing_head = self.enclosing_head(&scan);
        let enclosing_form = enclosing_head.as_deref().and_then(FormKind::lookup);

        CompletionContext {
            position,
            enclosing_head,
            enclosing_form,
            prefix: cursor.prefix.clone(),
            namespace_text,
        }
    }

    fn classify_scan(&self, scan: &Scan<'_, '_>) -> PositionKind {
        type Rule<'r> =
            fn(&PositionClassifier<'r>, &Scan<'_, '_>) -> Result<Option<PositionKind>, MalformedTree>;
        let rules: [(&str, Rule<'c>); 7] = [
            ("keyword", Self::keyword),
            ("top level", Self::top_level),
            ("parameter declaration", Self::parameter_declaration),
            ("binding vector", Self::binding_vector_position),
            ("definition name", Self::definition_name),
            ("namespace", Self::namespace_clause),
            ("call slot", Self::call_slot),
        ];

        for (name, rule) in rules {
            match rule(self, scan) {
                Ok(Some(position)) => {
                    debug!("Cursor at {} classified by {} rule: {:?}", scan.cursor.offset, name, position);
                    return position;
                }
                Ok(None) => {}
                Err(err) => trace!("{} rule did not match: {}", name, err),
            }
        }
        debug!("Cursor at {} defaults to expression position", scan.cursor.offset);
        PositionKind::ExpressionPosition
    }

    /// Head symbol of the innermost call the cursor is an argument of.
    fn enclosing_head(&self, scan: &Scan<'_, '_>) -> Option<String> {
        scan.calls()
            .find(|list| cursor_ordinal(*list, scan.cursor) > 0)
            .and_then(|list| inert::active_forms(list).next())
            .filter(|head| head.kind() == SyntaxKind::Symbol)
            .map(|head| self.config.strip_placeholder(head.text()))
    }

    fn keyword(&self, scan: &Scan<'_, '_>) -> Result<Option<PositionKind>, MalformedTree> {
        if scan.cursor.node.kind() != SyntaxKind::Keyword {
            return Ok(None);
        }
        Ok(Some(PositionKind::KeywordPosition {
            namespaced: scan.cursor.prefix.starts_with("::"),
        }))
    }

    fn top_level(&self, scan: &Scan<'_, '_>) -> Result<Option<PositionKind>, MalformedTree> {
        let top_level = scan.calls().next().is_none() && scan.cursor.prefix.is_empty();
        Ok(top_level.then_some(PositionKind::TopLevelNewForm))
    }

    fn parameter_declaration(
        &self,
        scan: &Scan<'_, '_>,
    ) -> Result<Option<PositionKind>, MalformedTree> {
        let Some((list, slot)) = scan
            .calls()
            .find_map(|list| head_form(list)?.parameter_slot().map(|slot| (list, slot)))
        else {
            return Ok(None);
        };
        if cursor_ordinal(list, scan.cursor) != slot {
            return Ok(None);
        }
        match inert::active_forms(list).nth(slot) {
            Some(occupant) if occupant != scan.cursor.node => Ok(None),
            _ => Ok(Some(PositionKind::ParameterVectorDeclaration)),
        }
    }

    fn binding_vector_position(
        &self,
        scan: &Scan<'_, '_>,
    ) -> Result<Option<PositionKind>, MalformedTree> {
        // Vectors and destructuring maps between the cursor and the first list.
        let patterns: Vec<Node<'_>> = scan
            .chain
            .iter()
            .copied()
            .take_while(|node| matches!(node.kind(), SyntaxKind::Vector | SyntaxKind::Map))
            .collect();
        let Some(outermost) = patterns.last().copied() else {
            return Ok(None);
        };
        let outermost = outermost.expect_kind(SyntaxKind::Vector)?;
        let list = outermost
            .parent()
            .ok_or(MalformedTree::MissingNode(outermost.id()))?
            .expect_kind(SyntaxKind::List)?;

        if outermost.text().len() > self.config.max_vector_text {
            debug!(
                "Ignoring {} byte vector at {}",
                outermost.text().len(),
                outermost.offset()
            );
            return Ok(None);
        }

        let kind = head_form(list);
        let is_binding_vector = match kind {
            Some(kind) if kind.parameter_slot().is_some() => parameter_vector(list) == Some(outermost),
            Some(kind) if kind.has_alternating_bindings() => binding_vector(list) == Some(outermost),
            _ => false,
        };
        let is_arity_vector = inert::active_forms(list).next() == Some(outermost)
            && list
                .parent()
                .filter(|parent| parent.kind() == SyntaxKind::List)
                .and_then(head_form)
                .is_some_and(|kind| kind.parameter_slot().is_some());
        if !is_binding_vector && !is_arity_vector {
            return Ok(None);
        }

        if let Some(kind) = kind.filter(|kind| kind.has_alternating_bindings()) {
            let slot = cursor_ordinal(outermost, scan.cursor);
            let is_value = if kind == FormKind::For {
                slot > 0
                    && inert::active_forms(outermost)
                        .nth(slot - 1)
                        .is_some_and(|previous| previous.kind() == SyntaxKind::Keyword)
            } else {
                slot % 2 == 1
            };
            if is_value {
                return Ok(Some(PositionKind::ExpressionPosition));
            }
        }

        let innermost = patterns
            .iter()
            .copied()
            .find(|node| node.kind() == SyntaxKind::Vector)
            .unwrap_or(outermost);
        Ok(Some(PositionKind::InsideParameterVector {
            closed: innermost.is_closed(),
        }))
    }

    fn definition_name(&self, scan: &Scan<'_, '_>) -> Result<Option<PositionKind>, MalformedTree> {
        let Some(list) = scan.calls().next() else {
            return Ok(None);
        };
        let is_definition = head_form(list).is_some_and(|kind| kind.is_definition());
        let at_name = is_definition && cursor_ordinal(list, scan.cursor) == 1;
        Ok(at_name.then_some(PositionKind::DefinitionNamePosition))
    }

    fn namespace_clause(&self, scan: &Scan<'_, '_>) -> Result<Option<PositionKind>, MalformedTree> {
        let Some(ns) = scan.namespace_list() else {
            return Ok(None);
        };
        let clause = match cursor_ordinal(ns, scan.cursor) {
            0 => return Ok(None),
            1 => NamespaceClause::Name,
            _ => clause_at(namespace_window(
                ns,
                scan.cursor.offset,
                self.config.namespace_window,
            )),
        };
        Ok(Some(PositionKind::NamespaceClausePosition(clause)))
    }

    fn call_slot(&self, scan: &Scan<'_, '_>) -> Result<Option<PositionKind>, MalformedTree> {
        for list in scan.calls() {
            let ordinal = cursor_ordinal(list, scan.cursor);
            if ordinal == 0 {
                return Ok(Some(PositionKind::FunctionNamePosition));
            }
            let Some(head) = inert::active_forms(list).next() else {
                continue;
            };
            match head.kind() {
                SyntaxKind::Symbol => {
                    let function = self.config.strip_placeholder(head.text());
                    let body_offset = FormKind::lookup(&function).and_then(|kind| kind.body_offset());
                    let position = match body_offset {
                        Some(body) if ordinal >= body => PositionKind::ExpressionPosition,
                        _ => PositionKind::ArgumentPosition {
                            function,
                            index: ordinal - 1,
                        },
                    };
                    return Ok(Some(position));
                }
                // The body of one arity of a multi-arity definition.
                SyntaxKind::Vector => return Ok(Some(PositionKind::ExpressionPosition)),
                _ => trace!("Non-symbol head at {}, looking further out", head.offset()),
            }
        }
        Ok(None)
    }
}
