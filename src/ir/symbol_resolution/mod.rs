//! Resolution of the identifiers visible at a cursor
//!
//! Visible names come from several independent sources, each implemented as a
//! [`BindingCollector`]:
//!
//! 1. [`LexicalScopeResolver`]: parameters and local bindings on the path from
//!    the cursor up through enclosing binder forms
//! 2. [`SiblingDefinitionResolver`]: top-level definitions of the same file
//! 3. [`ProjectDefinitionResolver`]: public definitions of other project files
//!
//! [`ScopeResolver`] runs them in that order into one [`ResolvedScope`]. The
//! scope keeps the first binding seen for every name, so collector order and
//! the innermost-first walk inside the lexical collector together implement
//! shadowing.
//!
//! # Example Usage
//!
//! ```ignore
//! let resolver = ScopeResolver::new(config.max_bindings)
//!     .with(LexicalScopeResolver::new(config.max_traversal_depth))
//!     .with(SiblingDefinitionResolver::new(config.max_sibling_definitions));
//! let scope = resolver.resolve_visible(cursor_node, offset);
//! ```

use rustc_hash::FxHashSet;
use serde::Serialize;
use tracing::{debug, trace};

use crate::ir::syntax::Node;

pub mod global;
pub mod lexical_scope;

pub use global::{ProjectDefinitionResolver, SiblingDefinitionResolver};
pub use lexical_scope::LexicalScopeResolver;

/// Kind of a named top-level definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DefinitionKind {
    Function,
    Macro,
    Variable,
    /// `defstruct`, `defexception` and `definterface`
    Struct,
}

impl DefinitionKind {
    pub fn label(self) -> &'static str {
        match self {
            DefinitionKind::Function => "Function",
            DefinitionKind::Macro => "Macro",
            DefinitionKind::Variable => "Variable",
            DefinitionKind::Struct => "Struct",
        }
    }
}

/// How a visible name was introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BindingKind {
    Parameter,
    LetBinding,
    LoopBinding,
    ForBinding,
    CatchBinding,
    IfLetBinding,
    WhenLetBinding,
    LocalDefinition(DefinitionKind),
    /// The definition the cursor is inside of; completing it means recursion
    SelfReference(DefinitionKind),
    ProjectDefinition(DefinitionKind),
}

impl BindingKind {
    /// Human-readable label shown next to the candidate.
    pub fn label(self) -> String {
        match self {
            BindingKind::Parameter => "Parameter".to_string(),
            BindingKind::LetBinding => "Let Binding".to_string(),
            BindingKind::LoopBinding => "Loop Binding".to_string(),
            BindingKind::ForBinding => "For Binding".to_string(),
            BindingKind::CatchBinding => "Catch Binding".to_string(),
            BindingKind::IfLetBinding => "If-Let Binding".to_string(),
            BindingKind::WhenLetBinding => "When-Let Binding".to_string(),
            BindingKind::LocalDefinition(kind) => format!("Local {}", kind.label()),
            BindingKind::SelfReference(kind) => format!("Recursive {}", kind.label()),
            BindingKind::ProjectDefinition(kind) => format!("Public {}", kind.label()),
        }
    }

    /// Bindings introduced inside a function body rather than at file level.
    pub fn is_local(self) -> bool {
        !matches!(
            self,
            BindingKind::LocalDefinition(_)
                | BindingKind::SelfReference(_)
                | BindingKind::ProjectDefinition(_)
        )
    }
}

/// Scope depth used for file- and project-level bindings.
pub const GLOBAL_DEPTH: usize = usize::MAX;

/// One identifier visible at the cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    /// File stem of the defining file, for cross-file definitions
    pub source_file: Option<String>,
    /// Number of scope roots between the cursor and the binder
    /// (0 = nearest scope root, [`GLOBAL_DEPTH`] = file or project level)
    pub scope_depth: usize,
    /// Call shape such as `(name a b)`, when known
    pub signature: Option<String>,
}

impl Binding {
    pub fn local(name: impl Into<String>, kind: BindingKind, scope_depth: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            source_file: None,
            scope_depth,
            signature: None,
        }
    }

    /// Type hint text shown in the completion popup.
    pub fn type_hint(&self) -> String {
        match &self.source_file {
            Some(file) => format!("{} ({})", self.kind.label(), file),
            None => self.kind.label(),
        }
    }
}

/// Ordered set of visible bindings, deduplicated by name (first wins).
#[derive(Debug, Clone)]
pub struct ResolvedScope {
    bindings: Vec<Binding>,
    seen: FxHashSet<String>,
    limit: usize,
}

impl ResolvedScope {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            bindings: Vec::new(),
            seen: FxHashSet::default(),
            limit,
        }
    }

    /// Add a binding unless its name is already bound or the scope is full.
    ///
    /// # Returns
    /// `true` if the binding was added
    pub fn insert(&mut self, binding: Binding) -> bool {
        if self.is_full() || self.seen.contains(&binding.name) {
            return false;
        }
        self.seen.insert(binding.name.clone());
        self.bindings.push(binding);
        true
    }

    pub fn is_full(&self) -> bool {
        self.bindings.len() >= self.limit
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn into_vec(self) -> Vec<Binding> {
        self.bindings
    }
}

impl Default for ResolvedScope {
    fn default() -> Self {
        Self::with_limit(usize::MAX)
    }
}

/// A source of bindings visible at a cursor.
pub trait BindingCollector {
    /// Add the bindings this source makes visible at `cursor` to `scope`.
    ///
    /// # Arguments
    /// * `cursor` - Node under the cursor
    /// * `offset` - Cursor offset in the source; bindings must end at or before it
    /// * `scope` - Output set; implementations stop once it is full
    fn collect(&self, cursor: Node<'_>, offset: usize, scope: &mut ResolvedScope);

    /// Name for logging
    fn name(&self) -> &'static str;
}

/// Runs collectors in precedence order into one deduplicated scope.
pub struct ScopeResolver<'a> {
    collectors: Vec<Box<dyn BindingCollector + 'a>>,
    limit: usize,
}

impl<'a> ScopeResolver<'a> {
    pub fn new(limit: usize) -> Self {
        Self {
            collectors: Vec::new(),
            limit,
        }
    }

    /// Append a collector; earlier collectors shadow later ones.
    pub fn with(mut self, collector: impl BindingCollector + 'a) -> Self {
        self.collectors.push(Box::new(collector));
        self
    }

    pub fn resolve_visible(&self, cursor: Node<'_>, offset: usize) -> ResolvedScope {
        let mut scope = ResolvedScope::with_limit(self.limit);
        for collector in &self.collectors {
            if scope.is_full() {
                debug!("Binding limit {} reached before {}", self.limit, collector.name());
                break;
            }
            let before = scope.len();
            collector.collect(cursor, offset, &mut scope);
            trace!("{} added {} binding(s)", collector.name(), scope.len() - before);
        }
        scope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_binding_wins() {
        let mut scope = ResolvedScope::default();
        assert!(scope.insert(Binding::local("x", BindingKind::LetBinding, 0)));
        assert!(!scope.insert(Binding::local("x", BindingKind::Parameter, 1)));
        assert_eq!(scope.len(), 1);
        assert_eq!(scope.get("x").unwrap().kind, BindingKind::LetBinding);
    }

    #[test]
    fn test_limit_stops_insertion() {
        let mut scope = ResolvedScope::with_limit(2);
        assert!(scope.insert(Binding::local("a", BindingKind::Parameter, 0)));
        assert!(scope.insert(Binding::local("b", BindingKind::Parameter, 0)));
        assert!(scope.is_full());
        assert!(!scope.insert(Binding::local("c", BindingKind::Parameter, 0)));
        assert!(!scope.contains("c"));
    }

    #[test]
    fn test_labels() {
        assert_eq!(BindingKind::LetBinding.label(), "Let Binding");
        assert_eq!(
            BindingKind::ProjectDefinition(DefinitionKind::Function).label(),
            "Public Function"
        );
        let binding = Binding {
            source_file: Some("utils".to_string()),
            ..Binding::local("helper", BindingKind::ProjectDefinition(DefinitionKind::Macro), GLOBAL_DEPTH)
        };
        assert_eq!(binding.type_hint(), "Public Macro (utils)");
        assert!(!binding.kind.is_local());
        assert!(BindingKind::CatchBinding.is_local());
    }
}
