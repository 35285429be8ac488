//! Completion inside `(ns ...)` declarations
//!
//! The clause the cursor is in is found by scanning the text before the
//! cursor for the innermost `(` that is still open and checking which clause
//! keyword follows it. Text is used instead of the tree because the clause the
//! user is typing is usually unbalanced and the reader's recovery may attach
//! it to the wrong parent.

use serde::Serialize;
use tracing::trace;

use super::dictionary::{Candidate, InsertionBehavior};
use super::indexing::CandidateSink;
use super::ranking::Priority;

/// Sub-position inside a namespace declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NamespaceClause {
    /// The namespace name right after `ns`
    Name,
    /// Between clauses
    TopLevel,
    /// Inside `(:require ...)`
    Require,
    /// Inside `(:require-file ...)`
    RequireFile,
    /// Inside `(:use ...)`
    Use,
}

/// Namespaces shipped with Phel.
pub const COMMON_NAMESPACES: &[&str] = &[
    "phel\\test",
    "phel\\json",
    "phel\\http",
    "phel\\str",
    "phel\\html",
    "phel\\core",
    "phel\\base64",
    "phel\\local",
    "phel\\repl",
    "phel\\trace",
];

pub const COMMON_REQUIRE_FILES: &[&str] = &[
    "\"vendor/autoload.php\"",
    "\"bootstrap.php\"",
    "\"config.php\"",
    "\"functions.php\"",
];

pub const COMMON_PHP_CLASSES: &[&str] = &["Exception", "DateTime", "PDO", "stdClass"];

/// Clause keywords, longest first so `:require-file` is not read as `:require`.
const CLAUSE_KEYWORDS: &[(&str, NamespaceClause)] = &[
    (":require-file", NamespaceClause::RequireFile),
    (":require", NamespaceClause::Require),
    (":use", NamespaceClause::Use),
];

/// Innermost clause still open at the end of `before`.
///
/// # Returns
/// The clause kind and the clause text after its keyword, or `None` when the
/// cursor is not inside any clause.
pub fn open_clause(before: &str) -> Option<(NamespaceClause, &str)> {
    let mut open: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for (i, ch) in before.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '(' => open.push(i),
            ')' => {
                open.pop();
            }
            _ => {}
        }
    }

    open.iter().rev().find_map(|&paren| {
        let rest = &before[paren + 1..];
        CLAUSE_KEYWORDS.iter().find_map(|(keyword, clause)| {
            let body = rest.strip_prefix(keyword)?;
            // `:requirex` is not a clause keyword
            let boundary = body
                .chars()
                .next()
                .is_none_or(|c| c.is_whitespace() || c == '(' || c == '[' || c == '"');
            boundary.then_some((*clause, body))
        })
    })
}

/// Clause of a cursor inside a namespace declaration, past the name slot.
pub fn clause_at(before: &str) -> NamespaceClause {
    open_clause(before).map_or(NamespaceClause::TopLevel, |(clause, _)| clause)
}

/// A namespace name such as `phel\str` or `app\domain\user`.
fn is_namespace_name(token: &str) -> bool {
    token.contains('\\')
        && token
            .split('\\')
            .all(|part| !part.is_empty() && !part.starts_with(':'))
}

/// Tokens of a clause body typed before the cursor, excluding the typed prefix.
fn completed_tokens<'a>(body: &'a str, prefix: &str) -> Vec<&'a str> {
    let body = body.strip_suffix(prefix).unwrap_or(body);
    body.split(|c: char| c.is_whitespace() || c == '[' || c == ']')
        .filter(|token| !token.is_empty())
        .collect()
}

/// Add the candidates for `clause`
///
/// # Arguments
/// * `clause` - Sub-position of the cursor
/// * `before` - Declaration text from the window start up to the cursor
/// * `prefix` - Text typed at the cursor
/// * `project_namespaces` - Namespaces declared by project files
/// * `sink` - Output
pub fn add_namespace_candidates(
    clause: NamespaceClause,
    before: &str,
    prefix: &str,
    project_namespaces: &[String],
    sink: &mut CandidateSink,
) {
    let body = open_clause(before).map_or("", |(_, body)| body);
    trace!("Namespace clause {:?}, body {:?}", clause, body);
    match clause {
        NamespaceClause::Name => {}
        NamespaceClause::TopLevel => {
            sink.push(
                Candidate::new("(:require )", Priority::SpecialForms)
                    .with_type_hint("Require a Phel namespace"),
            );
            sink.push(
                Candidate::new("(:require-file )", Priority::SpecialForms)
                    .with_type_hint("Require a PHP file"),
            );
            sink.push(
                Candidate::new("(:use )", Priority::Macros).with_type_hint("Import a PHP class"),
            );
        }
        NamespaceClause::Require => {
            add_require_candidates(body, prefix, project_namespaces, sink);
        }
        NamespaceClause::RequireFile => {
            if body.contains('"') && prefix.is_empty() {
                sink.push(alias_keyword());
            } else {
                for file in COMMON_REQUIRE_FILES {
                    sink.push(Candidate::new(*file, Priority::ApiFunctions).with_type_hint("PHP file"));
                }
            }
        }
        NamespaceClause::Use => {
            let tokens = completed_tokens(body, prefix);
            if !tokens.is_empty() && prefix.is_empty() {
                sink.push(alias_keyword());
                return;
            }
            if tokens.is_empty() && prefix.is_empty() {
                sink.push(Candidate::new("\\DateTime", Priority::ApiFunctions).with_type_hint("PHP class"));
            }
            for class in COMMON_PHP_CLASSES {
                sink.push(Candidate::new(*class, Priority::PhpInterop).with_type_hint("PHP class"));
            }
        }
    }
}

fn alias_keyword() -> Candidate {
    Candidate::new(":as", Priority::SpecialForms).with_type_hint("Alias")
}

fn add_require_candidates(
    body: &str,
    prefix: &str,
    project_namespaces: &[String],
    sink: &mut CandidateSink,
) {
    if !prefix.is_empty() {
        add_namespaces(prefix, project_namespaces, sink);
        return;
    }
    match completed_tokens(body, prefix).last() {
        None => add_namespaces("", project_namespaces, sink),
        Some(&":refer") => {
            sink.push(
                Candidate::new("[", Priority::SpecialForms)
                    .with_display("[]")
                    .with_type_hint("Referred names")
                    .with_insertion(InsertionBehavior::BalancedBrackets),
            );
        }
        Some(&":as") => {}
        Some(token) if is_namespace_name(token) => {
            sink.push(alias_keyword());
            sink.push(
                Candidate::new(":refer []", Priority::SpecialForms)
                    .with_type_hint("Refer names into this namespace"),
            );
        }
        Some(_) => {}
    }
}

fn add_namespaces(prefix: &str, project_namespaces: &[String], sink: &mut CandidateSink) {
    let wanted = prefix.to_lowercase();
    let matches = |name: &str| name.to_lowercase().starts_with(&wanted);
    for namespace in COMMON_NAMESPACES.iter().filter(|ns| matches(ns)) {
        sink.push(Candidate::new(*namespace, Priority::ApiFunctions).with_type_hint("Phel namespace"));
    }
    for namespace in project_namespaces.iter().filter(|ns| matches(ns)) {
        sink.push(
            Candidate::new(namespace.as_str(), Priority::ProjectSymbols)
                .with_type_hint("Project namespace"),
        );
    }
}
