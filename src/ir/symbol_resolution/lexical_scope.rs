//! Local bindings on the path from the cursor to the file root
//!
//! Only the ancestor chain is inspected, never whole subtrees: a binding is
//! visible at the cursor exactly when one of the cursor's enclosing lists
//! introduces it. Lists are visited innermost first so that an inner `let`
//! shadows an outer binding of the same name.

use tracing::trace;

use crate::ir::forms::FormKind;
use crate::ir::inert;
use crate::ir::syntax::{Node, SyntaxKind};

use super::{Binding, BindingCollector, BindingKind, ResolvedScope};

/// Collector for parameters and `let`-style bindings.
pub struct LexicalScopeResolver {
    /// Maximum ancestors walked from the cursor
    max_depth: usize,
}

impl LexicalScopeResolver {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }
}

/// Names bound by one clause of a binding form, and where they become visible.
struct Clause<'t> {
    pattern: Node<'t>,
    /// Offset from which the names are in scope
    visible_from: usize,
}

/// Form kind of a list's head symbol.
pub fn head_form(list: Node<'_>) -> Option<FormKind> {
    let head = inert::active_forms(list).next()?;
    if head.kind() != SyntaxKind::Symbol {
        return None;
    }
    FormKind::lookup(head.text())
}

/// Symbols bound by a binding pattern, including nested destructuring.
///
/// `&` and `...` markers, keywords, literals and deactivated forms bind nothing.
pub fn destructured_names<'t>(pattern: Node<'t>, out: &mut Vec<Node<'t>>) {
    match pattern.kind() {
        SyntaxKind::Symbol => {
            if !matches!(pattern.text(), "&" | "...") {
                out.push(pattern);
            }
        }
        SyntaxKind::Vector | SyntaxKind::Map => {
            for form in inert::active_forms(pattern) {
                destructured_names(form, out);
            }
        }
        _ => {}
    }
}

/// The parameter vector of a `fn`/`defn`-style list: the first vector after
/// the head (and after the name, docstring or attribute map) that comes before
/// any body list. Multi-arity definitions have none.
pub fn parameter_vector(list: Node<'_>) -> Option<Node<'_>> {
    inert::active_forms(list)
        .skip(1)
        .take_while(|form| !form.kind().is_call())
        .find(|form| form.kind() == SyntaxKind::Vector)
}

/// First vector after the head, for `let`-style forms.
pub fn binding_vector(list: Node<'_>) -> Option<Node<'_>> {
    inert::active_forms(list)
        .nth(1)
        .filter(|form| form.kind() == SyntaxKind::Vector)
}

/// `[name value name value ...]`
fn alternating_clauses<'t>(vector: Node<'t>, out: &mut Vec<Clause<'t>>) {
    let forms: Vec<Node<'t>> = inert::active_forms(vector).collect();
    for pair in forms.chunks(2) {
        let pattern = pair[0];
        let visible_from = pair.get(1).unwrap_or(&pattern).range().end;
        out.push(Clause {
            pattern,
            visible_from,
        });
    }
}

/// Phel `for`/`dofor` bindings: `pattern :verb expr` triples plus `:let`,
/// `:when` and `:while` modifiers, and `:reduce [acc init]`.
fn for_clauses<'t>(vector: Node<'t>, out: &mut Vec<Clause<'t>>) {
    let forms: Vec<Node<'t>> = inert::active_forms(vector).collect();
    let mut i = 0;
    while i < forms.len() {
        let form = forms[i];
        if form.kind() == SyntaxKind::Keyword {
            let value = forms.get(i + 1).copied();
            match (form.text(), value) {
                (":let", Some(bindings)) if bindings.kind() == SyntaxKind::Vector => {
                    alternating_clauses(bindings, out);
                }
                (":reduce", Some(acc)) if acc.kind() == SyntaxKind::Vector => {
                    if let Some(name) = inert::active_forms(acc).next() {
                        out.push(Clause {
                            pattern: name,
                            visible_from: acc.range().end,
                        });
                    }
                }
                _ => {}
            }
            i += 2;
            continue;
        }
        // pattern :verb expr
        let expr_end = forms
            .get(i + 2)
            .or_else(|| forms.get(i + 1))
            .unwrap_or(&form)
            .range()
            .end;
        out.push(Clause {
            pattern: form,
            visible_from: expr_end,
        });
        i += 3;
    }
}

/// `(foreach [v coll] ...)` or `(foreach [k v coll] ...)`
fn foreach_clauses<'t>(vector: Node<'t>, out: &mut Vec<Clause<'t>>) {
    let forms: Vec<Node<'t>> = inert::active_forms(vector).collect();
    let Some((coll, names)) = forms.split_last() else {
        return;
    };
    for &pattern in names {
        out.push(Clause {
            pattern,
            visible_from: coll.range().end,
        });
    }
}

impl LexicalScopeResolver {
    /// Bindings a single list makes visible at the cursor.
    fn clauses_of<'t>(&self, list: Node<'t>) -> Vec<(BindingKind, Clause<'t>)> {
        let mut clauses = Vec::new();

        // An arity list `([x y] body)` inside a multi-arity `fn`/`defn`.
        if let Some(params) = inert::active_forms(list)
            .next()
            .filter(|h| h.kind() == SyntaxKind::Vector)
        {
            let in_multi_arity = list
                .parent()
                .and_then(head_form)
                .is_some_and(|kind| kind.parameter_slot().is_some());
            if in_multi_arity {
                clauses.push((
                    BindingKind::Parameter,
                    Clause {
                        pattern: params,
                        visible_from: params.range().end,
                    },
                ));
            }
            return clauses;
        }

        let Some(kind) = head_form(list) else {
            return clauses;
        };

        let mut raw = Vec::new();
        let binding_kind = match kind {
            FormKind::Fn
            | FormKind::Defn
            | FormKind::DefnPrivate
            | FormKind::Defmacro
            | FormKind::DefmacroPrivate => {
                if let Some(params) = parameter_vector(list) {
                    raw.push(Clause {
                        pattern: params,
                        visible_from: params.range().end,
                    });
                }
                BindingKind::Parameter
            }
            FormKind::Let | FormKind::Binding => {
                if let Some(vector) = binding_vector(list) {
                    alternating_clauses(vector, &mut raw);
                }
                BindingKind::LetBinding
            }
            FormKind::Loop => {
                if let Some(vector) = binding_vector(list) {
                    alternating_clauses(vector, &mut raw);
                }
                BindingKind::LoopBinding
            }
            FormKind::For | FormKind::Dofor => {
                if let Some(vector) = binding_vector(list) {
                    for_clauses(vector, &mut raw);
                }
                BindingKind::ForBinding
            }
            FormKind::Foreach => {
                if let Some(vector) = binding_vector(list) {
                    foreach_clauses(vector, &mut raw);
                }
                BindingKind::ForBinding
            }
            FormKind::IfLet | FormKind::WhenLet => {
                if let Some(vector) = binding_vector(list) {
                    alternating_clauses(vector, &mut raw);
                    raw.truncate(1);
                }
                if kind == FormKind::IfLet {
                    BindingKind::IfLetBinding
                } else {
                    BindingKind::WhenLetBinding
                }
            }
            FormKind::Catch => {
                // (catch ExceptionType name body...)
                if let Some(name) = inert::active_forms(list).nth(2) {
                    raw.push(Clause {
                        pattern: name,
                        visible_from: name.range().end,
                    });
                }
                BindingKind::CatchBinding
            }
            _ => return clauses,
        };

        clauses.extend(raw.into_iter().map(|clause| (binding_kind, clause)));
        clauses
    }
}

impl BindingCollector for LexicalScopeResolver {
    fn collect(&self, cursor: Node<'_>, offset: usize, scope: &mut ResolvedScope) {
        let mut depth = 0;

        for list in cursor.ancestors().take(self.max_depth) {
            if scope.is_full() {
                break;
            }
            if !list.kind().is_call() {
                continue;
            }
            if inert::is_inert(list) {
                trace!("Skipping bindings of inert {:?}", list);
                continue;
            }

            for (kind, clause) in self.clauses_of(list) {
                if clause.visible_from > offset || clause.pattern.is_or_contains(cursor) {
                    continue;
                }
                let mut names = Vec::new();
                destructured_names(clause.pattern, &mut names);
                for name in names {
                    if name.range().end > offset {
                        continue;
                    }
                    scope.insert(Binding::local(name.text(), kind, depth));
                }
            }

            if head_form(list).is_some_and(FormKind::is_scope_root) {
                depth += 1;
            }
        }
    }

    fn name(&self) -> &'static str {
        "LexicalScopeResolver"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::reader::read;
    use crate::ir::syntax::SyntaxTree;

    /// Resolve at the `|` marker, which is removed from the source.
    fn resolve_at(source_with_cursor: &str) -> (SyntaxTree, usize) {
        let offset = source_with_cursor.find('|').unwrap();
        let source = source_with_cursor.replacen('|', "CURSOR", 1);
        (read(&source), offset)
    }

    fn names(source_with_cursor: &str) -> Vec<(String, BindingKind, usize)> {
        let (tree, offset) = resolve_at(source_with_cursor);
        let cursor = tree
            .nodes()
            .find(|n| n.kind() == SyntaxKind::Symbol && n.text().contains("CURSOR"))
            .unwrap();
        let mut scope = ResolvedScope::default();
        LexicalScopeResolver::new(20).collect(cursor, offset, &mut scope);
        scope
            .into_vec()
            .into_iter()
            .map(|b| (b.name, b.kind, b.scope_depth))
            .collect()
    }

    #[test]
    fn test_function_parameters() {
        let found = names("(defn f [a b & rest] |)");
        assert_eq!(
            found,
            vec![
                ("a".to_string(), BindingKind::Parameter, 0),
                ("b".to_string(), BindingKind::Parameter, 0),
                ("rest".to_string(), BindingKind::Parameter, 0),
            ]
        );
    }

    #[test]
    fn test_let_takes_even_slots_only() {
        let found = names("(let [a 1 b 2] |)");
        let found: Vec<_> = found.into_iter().map(|(n, k, _)| (n, k)).collect();
        assert_eq!(
            found,
            vec![
                ("a".to_string(), BindingKind::LetBinding),
                ("b".to_string(), BindingKind::LetBinding),
            ]
        );
    }

    #[test]
    fn test_binding_not_visible_in_own_value() {
        let found = names("(let [a 1 b (inc |)] b)");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "a");
    }

    #[test]
    fn test_inner_let_shadows_outer() {
        let found = names("(defn f [x] (let [x 1] (loop [x 2] |)))");
        let xs: Vec<_> = found.iter().filter(|(n, _, _)| n == "x").collect();
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].1, BindingKind::LoopBinding);
    }

    #[test]
    fn test_outer_scope_root_has_greater_depth() {
        let found = names("(defn f [outer] (fn [inner] |))");
        assert_eq!(found[0], ("inner".to_string(), BindingKind::Parameter, 0));
        assert_eq!(found[1], ("outer".to_string(), BindingKind::Parameter, 1));
    }

    #[test]
    fn test_destructuring() {
        let found = names("(let [[a [b c]] xs {:keys [d] e :e} m] |)");
        let found: Vec<_> = found.into_iter().map(|(n, _, _)| n).collect();
        assert_eq!(found, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_catch_if_let_and_for() {
        let found = names("(try (x) (catch Exception e |))");
        assert_eq!(found[0].0, "e");
        assert_eq!(found[0].1, BindingKind::CatchBinding);

        let found = names("(if-let [v (get m :k) w 2] |)");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].1, BindingKind::IfLetBinding);

        let found = names("(for [x :in xs :let [y (inc x)]] |)");
        let found: Vec<_> = found.into_iter().map(|(n, k, _)| (n, k)).collect();
        assert_eq!(
            found,
            vec![
                ("x".to_string(), BindingKind::ForBinding),
                ("y".to_string(), BindingKind::ForBinding),
            ]
        );
    }

    #[test]
    fn test_multi_arity_parameters() {
        let found = names("(defn f ([a] a) ([a b] |))");
        let found: Vec<_> = found.into_iter().map(|(n, _, _)| n).collect();
        assert_eq!(found, vec!["a", "b"]);
    }

    #[test]
    fn test_inert_binder_is_ignored() {
        let found = names("(defn f [a] #_(let [hidden 1] |))");
        let found: Vec<_> = found.into_iter().map(|(n, _, _)| n).collect();
        assert_eq!(found, vec!["a"]);
    }

    #[test]
    fn test_deactivated_parameter_is_not_bound() {
        let found = names("(defn f [a #_b c] |)");
        let found: Vec<_> = found.into_iter().map(|(n, _, _)| n).collect();
        assert_eq!(found, vec!["a", "c"]);

        let found = names("(fn [[x #_y] {:keys [#_k v]}] |)");
        let found: Vec<_> = found.into_iter().map(|(n, _, _)| n).collect();
        assert_eq!(found, vec!["x", "v"]);
    }

    #[test]
    fn test_deactivated_binding_keeps_pairs_aligned() {
        let found = names("(let [#_ x a 1] |)");
        let found: Vec<_> = found.into_iter().map(|(n, _, _)| n).collect();
        assert_eq!(found, vec!["a"]);

        let found = names("(loop [a 1 #_#_ b 2 c 3] |)");
        let found: Vec<_> = found.into_iter().map(|(n, _, _)| n).collect();
        assert_eq!(found, vec!["a", "c"]);

        let found = names("(for [#_y x :in xs] |)");
        let found: Vec<_> = found.into_iter().map(|(n, _, _)| n).collect();
        assert_eq!(found, vec!["x"]);
    }

    #[test]
    fn test_deactivated_binding_vector_is_skipped() {
        let found = names("(defn f #_[old] [new] |)");
        let found: Vec<_> = found.into_iter().map(|(n, _, _)| n).collect();
        assert_eq!(found, vec!["new"]);
    }

    #[test]
    fn test_depth_cap() {
        let (tree, offset) = resolve_at("(let [a 1] (do (do (do |))))");
        let cursor = tree
            .nodes()
            .find(|n| n.text() == "CURSOR")
            .unwrap();
        let mut scope = ResolvedScope::default();
        LexicalScopeResolver::new(2).collect(cursor, offset, &mut scope);
        assert!(scope.is_empty());
    }
}
