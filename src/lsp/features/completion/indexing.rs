//! Candidate producers
//!
//! Each `add_*` function appends one family of candidates to a
//! [`CandidateSink`]. The engine picks the producers for a cursor position and
//! calls them in precedence order; the sink drops a candidate whose text was
//! already emitted, so the earliest producer decides a name's tier.

use rustc_hash::FxHashSet;
use tracing::trace;

use crate::ir::symbol_resolution::ResolvedScope;

use super::dictionary::{
    CATALOG, Candidate, CatalogEntry, InsertionBehavior, TemplateKind, parameter_at,
};
use super::ranking::{Priority, binding_priority, catalog_priority};

/// Parameter names offered inside a parameter vector.
pub const COMMON_PARAMETER_NAMES: &[&str] = &[
    "x", "y", "z", "n", "m", "i", "j", "coll", "xs", "ys", "f", "pred", "key", "val", "kv", "a",
    "b", "c", "item", "elem", "acc", "result",
];

/// Keywords offered at any keyword position.
pub const COMMON_KEYWORDS: &[&str] = &[
    ":require",
    ":require-file",
    ":use",
    ":refer",
    ":as",
    ":private",
    ":doc",
    ":test",
    ":deprecated",
    ":see-also",
    ":example",
    ":keys",
    ":let",
    ":when",
    ":while",
    ":in",
    ":range",
    ":pairs",
    ":reduce",
];

const VALUE_LITERALS: &[&str] = &["nil", "true", "false"];

const FALLBACK_FORMS: &[&str] = &[
    "defn", "fn", "let", "if", "when", "map", "filter", "reduce", "get", "count",
];

/// Collects candidates in production order, keeping the first emission of
/// every text and dropping candidates that do not match the typed prefix.
///
/// Informational candidates and balanced-delimiter affordances carry no name
/// to match and are always kept.
#[derive(Debug, Default)]
pub struct CandidateSink {
    prefix: String,
    seen: FxHashSet<String>,
    candidates: Vec<Candidate>,
}

impl CandidateSink {
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_lowercase(),
            seen: FxHashSet::default(),
            candidates: Vec::new(),
        }
    }

    fn key(candidate: &Candidate) -> &str {
        match candidate.insertion {
            InsertionBehavior::Plain => &candidate.text,
            _ => &candidate.display_text,
        }
    }

    fn matches_prefix(&self, candidate: &Candidate) -> bool {
        if self.prefix.is_empty() {
            return true;
        }
        match candidate.insertion {
            InsertionBehavior::None
            | InsertionBehavior::BalancedParens
            | InsertionBehavior::BalancedBrackets => true,
            InsertionBehavior::Plain | InsertionBehavior::Template(_) => {
                candidate.text.to_lowercase().starts_with(&self.prefix)
            }
        }
    }

    /// Add `candidate` unless it was already emitted or does not match.
    ///
    /// # Returns
    /// `true` if the candidate was added
    pub fn push(&mut self, candidate: Candidate) -> bool {
        if !self.matches_prefix(&candidate) {
            return false;
        }
        if !self.seen.insert(Self::key(&candidate).to_string()) {
            return false;
        }
        self.candidates.push(candidate);
        true
    }

    pub fn contains(&self, text: &str) -> bool {
        self.seen.contains(text)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        self.candidates
    }
}

pub fn add_value_literals(priority: Priority, sink: &mut CandidateSink) {
    for literal in VALUE_LITERALS {
        sink.push(Candidate::new(*literal, priority).with_type_hint("Value"));
    }
}

/// The "open a new form" affordance.
pub fn add_new_form(priority: Priority, sink: &mut CandidateSink) {
    sink.push(
        Candidate::new("()", priority)
            .with_type_hint("Start new expression")
            .with_insertion(InsertionBehavior::BalancedParens),
    );
}

pub fn add_templates(sink: &mut CandidateSink) {
    for kind in TemplateKind::ALL {
        sink.push(Candidate::template(kind, Priority::ApiFunctions));
    }
}

/// Visible bindings, in resolver order.
pub fn add_bindings(scope: &ResolvedScope, sink: &mut CandidateSink) {
    for binding in scope.iter() {
        let mut candidate =
            Candidate::new(binding.name.as_str(), binding_priority(binding)).with_type_hint(binding.type_hint());
        if let Some(signature) = &binding.signature {
            candidate = candidate.with_signature(signature.as_str());
        }
        sink.push(candidate);
    }
}

/// Catalog entries accepted by `filter`, in catalog order.
///
/// # Returns
/// Number of candidates added
pub fn add_catalog(sink: &mut CandidateSink, filter: impl Fn(&CatalogEntry) -> bool) -> usize {
    let mut added = 0;
    for entry in CATALOG.iter().filter(|entry| filter(entry)) {
        if sink.push(Candidate::from_catalog(entry, catalog_priority(entry))) {
            added += 1;
        }
    }
    trace!("Added {} catalog candidate(s)", added);
    added
}

/// The only legal token where a parameter vector must start.
pub fn add_parameter_vector_opener(sink: &mut CandidateSink) {
    sink.push(
        Candidate::new("[", Priority::SpecialForms)
            .with_display("[]")
            .with_type_hint("Parameter vector")
            .with_insertion(InsertionBehavior::BalancedBrackets),
    );
}

/// Conventional parameter names, preceded by the closing `]` while the vector
/// is still open.
pub fn add_parameter_names(closed: bool, sink: &mut CandidateSink) {
    if !closed {
        sink.push(Candidate::new("]", Priority::SpecialForms).with_type_hint("Close parameter vector"));
    }
    for name in COMMON_PARAMETER_NAMES {
        sink.push(Candidate::new(*name, Priority::ProjectSymbols).with_type_hint("Parameter name"));
    }
}

/// A new definition needs a fresh name; nothing existing is suggested.
pub fn add_definition_name_hint(sink: &mut CandidateSink) {
    sink.push(Candidate::informational(
        "Type a unique name...",
        "New definition",
        Priority::CurrentScopeLocals,
    ));
}

/// Describe the parameter that argument `index` of `function` binds to.
///
/// # Arguments
/// * `function` - Head symbol of the call
/// * `index` - Zero-based argument index
/// * `signature` - Call shape of `function`, e.g. `(map f & colls)`
pub fn add_parameter_hint(
    function: &str,
    index: usize,
    signature: &str,
    sink: &mut CandidateSink,
) -> bool {
    let Some(param) = parameter_at(signature, index) else {
        return false;
    };
    sink.push(
        Candidate::informational(
            format!("{} (argument {} of {})", param, index + 1, function),
            "Parameter hint",
            Priority::CurrentScopeLocals,
        )
        .with_signature(signature),
    )
}

/// Keywords at a keyword position.
///
/// # Arguments
/// * `namespaced` - The cursor keyword starts with `::`; only `::` keywords apply
/// * `file_keywords` - Keywords already used in the file
pub fn add_keywords<'a>(
    namespaced: bool,
    file_keywords: impl IntoIterator<Item = &'a str>,
    sink: &mut CandidateSink,
) {
    for keyword in file_keywords {
        if keyword.starts_with("::") == namespaced {
            sink.push(Candidate::new(keyword, Priority::RecentDefinitions).with_type_hint("Keyword"));
        }
    }
    if namespaced {
        return;
    }
    for keyword in COMMON_KEYWORDS {
        sink.push(Candidate::new(*keyword, Priority::SpecialForms).with_type_hint("Keyword"));
    }
}

/// Minimal set returned when a request degrades.
pub fn add_fallback(sink: &mut CandidateSink) {
    add_value_literals(Priority::CommonBuiltins, sink);
    sink.push(
        Candidate::new("(", Priority::CurrentScopeLocals)
            .with_type_hint("Start expression")
            .with_insertion(InsertionBehavior::BalancedParens),
    );
    for name in FALLBACK_FORMS {
        sink.push(Candidate::new(*name, Priority::SpecialForms));
    }
    sink.push(Candidate::informational(
        "⚠ Malformed syntax",
        "Completion is limited until the form is fixed",
        Priority::PhpInterop,
    ));
}
