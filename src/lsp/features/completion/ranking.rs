//! Ranking and sorting of completion results
//!
//! Every candidate carries a [`Priority`]; the enum's declaration order is the
//! total order of the result list. Ranking proceeds in two steps:
//!
//! 1. Context bump: inside a call to a predicate-, collection- or
//!    numeric-consuming function, candidates from that function's relevant set
//!    are promoted to the matching context tier. A bump never lowers a
//!    priority.
//! 2. Stable sort by priority. Ties keep insertion order (scope bindings are
//!    produced before catalog entries) or, with [`TieBreak::Alphabetical`],
//!    fall back to the display text.
//!
//! [`rank`] is pure: ranking an already ranked list with the same context
//! returns it unchanged.

use once_cell::sync::Lazy;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;
use tracing::trace;

use super::dictionary::{ApiGroup, Candidate, CatalogEntry};
use crate::ir::symbol_resolution::{Binding, BindingKind};

/// Completion tiers, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Priority {
    /// Parameters and bindings of the innermost function
    CurrentScopeLocals,
    /// Bindings of enclosing functions, `catch`, `if-let` and `when-let`
    NestedScopeLocals,
    /// The function being defined
    CurrentFunctionRecursive,
    /// Definitions of the current file
    RecentDefinitions,
    ContextPredicates,
    ContextCollections,
    ContextNumeric,
    CommonBuiltins,
    SpecialForms,
    ControlFlow,
    ApiFunctions,
    CollectionFunctions,
    StringFunctions,
    /// Definitions of other project files
    ProjectSymbols,
    /// Functions written with a namespace alias, e.g. `json/encode`
    NamespaceFunctions,
    Macros,
    PhpInterop,
}

const COMMON_BUILTINS: &[&str] = &[
    "map", "filter", "reduce", "get", "put", "count", "first", "rest", "+", "-", "*", "/", "=",
    "<", ">", "<=", ">=", "str", "print", "println", "nil?", "empty?", "some", "cons", "conj",
];

const SPECIAL_FORMS: &[&str] = &[
    "def", "defn", "defn-", "defmacro", "defmacro-", "defstruct", "let", "fn", "quote", "var",
    "ns",
];

const CONTROL_FLOW: &[&str] = &[
    "if", "when", "when-not", "when-let", "if-let", "cond", "case", "do", "loop", "recur", "try",
    "catch", "finally", "throw",
];

const COLLECTION_FUNCTIONS: &[&str] = &[
    "conj", "cons", "concat", "reverse", "sort", "sort-by", "group-by", "partition", "take",
    "drop", "take-while", "drop-while", "take-last", "take-nth", "assoc", "dissoc", "keys",
    "values", "merge", "select-keys", "zipmap", "zipcoll", "shuffle", "frequencies", "invert",
    "split-at", "split-with", "partition-by",
];

const STRING_FUNCTIONS: &[&str] = &[
    "str", "subs", "format", "split", "join", "trim", "replace", "name", "namespace", "full-name",
    "print-str",
];

const PREDICATE_CONTEXT: &[&str] = &[
    "nil?", "empty?", "even?", "odd?", "pos?", "neg?", "zero?", "true?", "false?", "some?",
    "every?", "string?", "number?",
];

const COLLECTION_CONTEXT: &[&str] = &["inc", "dec", "str", "count", "first", "rest", "get", "identity"];

const NUMERIC_CONTEXT: &[&str] = &["inc", "dec", "abs", "max", "min", "mod", "quot", "rem"];

/// Enclosing head symbol -> (relevant names, tier they are promoted to).
static CONTEXT_TABLE: Lazy<FxHashMap<&'static str, (FxHashSet<&'static str>, Priority)>> =
    Lazy::new(|| {
        let mut table = FxHashMap::default();
        let groups: [(&[&'static str], &[&'static str], Priority); 3] = [
            (
                &["filter", "remove", "every?", "some"],
                PREDICATE_CONTEXT,
                Priority::ContextPredicates,
            ),
            (
                &["map", "reduce", "apply"],
                COLLECTION_CONTEXT,
                Priority::ContextCollections,
            ),
            (&["+", "-", "*", "/"], NUMERIC_CONTEXT, Priority::ContextNumeric),
        ];
        for (heads, names, tier) in groups {
            let set: FxHashSet<&'static str> = names.iter().copied().collect();
            for head in heads {
                table.insert(*head, (set.clone(), tier));
            }
        }
        table
    });

/// Priority of a name from its spelling alone.
pub fn base_priority(name: &str) -> Priority {
    if name.starts_with("php/") {
        Priority::PhpInterop
    } else if COMMON_BUILTINS.contains(&name) {
        Priority::CommonBuiltins
    } else if SPECIAL_FORMS.contains(&name) {
        Priority::SpecialForms
    } else if CONTROL_FLOW.contains(&name) {
        Priority::ControlFlow
    } else if name.ends_with('?') {
        Priority::ApiFunctions
    } else if COLLECTION_FUNCTIONS.contains(&name) {
        Priority::CollectionFunctions
    } else if name.starts_with("str/") || STRING_FUNCTIONS.contains(&name) {
        Priority::StringFunctions
    } else if name.contains('/') && name != "/" {
        Priority::NamespaceFunctions
    } else {
        Priority::ApiFunctions
    }
}

/// Priority of a catalog entry: its name, except that macros without a
/// more specific tier rank as [`Priority::Macros`].
pub fn catalog_priority(entry: &CatalogEntry) -> Priority {
    let base = base_priority(entry.name);
    if entry.group == ApiGroup::Macro && base == Priority::ApiFunctions {
        Priority::Macros
    } else {
        base
    }
}

/// Priority of a binding visible at the cursor.
pub fn binding_priority(binding: &Binding) -> Priority {
    match binding.kind {
        BindingKind::Parameter
        | BindingKind::LetBinding
        | BindingKind::LoopBinding
        | BindingKind::ForBinding => {
            if binding.scope_depth == 0 {
                Priority::CurrentScopeLocals
            } else {
                Priority::NestedScopeLocals
            }
        }
        BindingKind::CatchBinding | BindingKind::IfLetBinding | BindingKind::WhenLetBinding => {
            Priority::NestedScopeLocals
        }
        BindingKind::SelfReference(_) => Priority::CurrentFunctionRecursive,
        BindingKind::LocalDefinition(_) => Priority::RecentDefinitions,
        BindingKind::ProjectDefinition(_) => Priority::ProjectSymbols,
    }
}

/// What the ranker knows about the cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankingContext {
    /// Head symbol of the innermost call enclosing the cursor
    pub enclosing_head: Option<String>,
}

impl RankingContext {
    pub fn new(enclosing_head: Option<String>) -> Self {
        Self { enclosing_head }
    }

    /// Context tier `name` is promoted to, if any.
    pub fn context_tier(&self, name: &str) -> Option<Priority> {
        let head = self.enclosing_head.as_deref()?;
        let (names, tier) = CONTEXT_TABLE.get(head)?;
        names.contains(name).then_some(*tier)
    }

    /// `priority` after the context bump for `name`.
    pub fn adjust(&self, name: &str, priority: Priority) -> Priority {
        match self.context_tier(name) {
            Some(tier) => priority.min(tier),
            None => priority,
        }
    }
}

/// How equal priorities are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    InsertionOrder,
    Alphabetical,
}

/// Criteria for ranking completion results
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankingCriteria {
    pub tie_break: TieBreak,
    /// Maximum results to return (`None` = all)
    pub max_results: Option<usize>,
}

impl Default for RankingCriteria {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::InsertionOrder,
            max_results: None,
        }
    }
}

impl RankingCriteria {
    /// Ties ordered by display text
    pub fn alphabetical() -> Self {
        Self {
            tie_break: TieBreak::Alphabetical,
            ..Self::default()
        }
    }

    /// Default ordering, truncated to `max_results`
    pub fn limited(max_results: usize) -> Self {
        Self {
            max_results: Some(max_results),
            ..Self::default()
        }
    }
}

/// Rank completion candidates
///
/// # Arguments
/// * `candidates` - Candidates in production order
/// * `context` - Cursor context used for the context bump
/// * `criteria` - Tie-break and truncation settings
///
/// # Returns
/// Candidates sorted best first, each carrying its effective priority
pub fn rank(
    candidates: Vec<Candidate>,
    context: &RankingContext,
    criteria: &RankingCriteria,
) -> Vec<Candidate> {
    let mut ranked: Vec<Candidate> = candidates
        .into_iter()
        .map(|mut candidate| {
            if !candidate.is_informational() {
                candidate.priority = context.adjust(&candidate.text, candidate.priority);
            }
            candidate
        })
        .collect();

    // `sort_by` is stable, so equal keys keep insertion order.
    match criteria.tie_break {
        TieBreak::InsertionOrder => ranked.sort_by_key(|c| c.priority),
        TieBreak::Alphabetical => ranked.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.display_text.cmp(&b.display_text))
        }),
    }

    if let Some(max) = criteria.max_results {
        ranked.truncate(max);
    }
    trace!("Ranked {} candidate(s) for {:?}", ranked.len(), context.enclosing_head);
    ranked
}
