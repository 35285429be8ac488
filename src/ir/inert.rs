//! Detection of forms deactivated by `#_` markers
//!
//! A run of `N` adjacent `#_` markers deactivates the next `N` forms of the
//! sequence that follows it, where a sequence is a maximal run of sibling forms
//! separated only by whitespace. Inertness is inherited: everything inside an
//! inert form is inert too.
//!
//! Trees from some producers lose the marker tokens inside vectors while still
//! covering their text. [`text_fallback`] recovers the answer from the raw
//! vector text in that case; it is consulted only when the tree shows no marker
//! where the text has one.

use tracing::trace;

use super::syntax::{Node, SyntaxKind};

/// Whether `node` sits inside a form deactivated by a `#_` marker.
///
/// # Arguments
/// * `node` - Any node of the tree; non-form tokens are judged by their enclosing form
///
/// # Returns
/// `true` if the node's own form or any ancestor form is inert
pub fn is_inert(node: Node<'_>) -> bool {
    let Some(form) = enclosing_form(node) else {
        return false;
    };

    if std::iter::once(form)
        .chain(form.ancestors())
        .filter(|n| n.kind().is_form())
        .any(is_deactivated)
    {
        return true;
    }

    text_fallback::marks_inert(form)
}

/// Smallest form containing `node` (the node itself when it is a form).
fn enclosing_form(node: Node<'_>) -> Option<Node<'_>> {
    std::iter::once(node)
        .chain(node.ancestors())
        .find(|n| n.kind().is_form())
}

/// Whether `form` itself is one of the forms its preceding marker run covers.
pub fn is_deactivated(form: Node<'_>) -> bool {
    let Some(parent) = form.parent() else {
        return false;
    };
    let siblings: Vec<Node<'_>> = parent.children().collect();
    let Some(index) = siblings.iter().position(|s| *s == form) else {
        return false;
    };

    let mut start = index;
    for (i, sibling) in siblings[..index].iter().enumerate().rev() {
        match sibling.kind() {
            SyntaxKind::Whitespace => continue,
            kind if kind.is_form() => start = i,
            _ => break,
        }
    }

    let markers = siblings[..start]
        .iter()
        .rev()
        .filter(|s| s.kind() != SyntaxKind::Whitespace)
        .take_while(|s| s.kind() == SyntaxKind::FormComment)
        .count();
    if markers == 0 {
        return false;
    }

    let ordinal = siblings[start..=index]
        .iter()
        .filter(|s| s.kind().is_form())
        .count();
    trace!(
        "Form {:?} is #{} of a sequence after {} marker(s)",
        form, ordinal, markers
    );
    ordinal <= markers
}

/// Forms of `node` that no marker deactivates, in order.
///
/// Ordinals, binding pairs and heads are counted over these: `(let [#_x a 1])`
/// binds `a`.
pub fn active_forms<'t>(node: Node<'t>) -> impl Iterator<Item = Node<'t>> {
    node.forms().filter(|form| !is_deactivated(*form))
}

/// Text-scan recovery for vectors whose `#_` markers are missing from the tree.
///
/// Works around producers that drop marker tokens inside vectors. The scan
/// walks the vector text up to the form, counting pending markers; every
/// identifier or keyword token consumes one pending marker. The form is inert
/// when a marker is still pending when the scan reaches it.
pub mod text_fallback {
    use once_cell::sync::Lazy;
    use regex::Regex;
    use tracing::debug;

    use crate::ir::syntax::{Node, SyntaxKind};

    static TOKEN: Lazy<Option<Regex>> =
        Lazy::new(|| Regex::new(r"#_|:[\w-]+|[a-zA-Z][\w-]*").ok());

    /// Applies only to forms directly inside a vector whose text carries a
    /// marker the tree does not show.
    pub fn marks_inert(form: Node<'_>) -> bool {
        let Some(vector) = form.parent().filter(|p| p.kind() == SyntaxKind::Vector) else {
            return false;
        };
        if vector.children().any(|c| c.kind() == SyntaxKind::FormComment) {
            return false;
        }
        let text = blank_literals(vector);
        if !text.contains("#_") {
            return false;
        }
        let Some(relative) = form.offset().checked_sub(vector.offset()) else {
            return false;
        };
        let inert = pending_marker_at(&text, relative);
        if inert {
            debug!("Marker recovered from vector text for {:?}", form);
        }
        inert
    }

    /// Vector text with strings and comments replaced by spaces, offsets preserved.
    fn blank_literals(vector: Node<'_>) -> String {
        let mut bytes = vector.text().as_bytes().to_vec();
        let base = vector.offset();
        for child in vector.children() {
            if matches!(child.kind(), SyntaxKind::String | SyntaxKind::LineComment) {
                let range = child.range();
                let start = range.start.saturating_sub(base).min(bytes.len());
                let end = range.end.saturating_sub(base).min(bytes.len());
                if start < end {
                    bytes[start..end].fill(b' ');
                }
            }
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Whether a `#_` marker is still unconsumed when the scan reaches `offset`.
    pub fn pending_marker_at(text: &str, offset: usize) -> bool {
        let Some(token_re) = TOKEN.as_ref() else {
            return false;
        };
        let mut pending = 0usize;
        for token in token_re.find_iter(text) {
            if token.as_str() == "#_" {
                if token.start() < offset {
                    pending += 1;
                }
                continue;
            }
            if token.start() >= offset {
                return token.start() == offset && pending > 0;
            }
            pending = pending.saturating_sub(1);
        }
        false
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_pending_marker_counting() {
            let text = "[#_ a b #_ c d]";
            assert!(pending_marker_at(text, text.find('a').unwrap()));
            assert!(!pending_marker_at(text, text.find('b').unwrap()));
            assert!(pending_marker_at(text, text.find('c').unwrap()));
            assert!(!pending_marker_at(text, text.find('d').unwrap()));
        }

        #[test]
        fn test_stacked_markers() {
            let text = "[#_#_:one :two :three]";
            assert!(pending_marker_at(text, text.find(":one").unwrap()));
            assert!(pending_marker_at(text, text.find(":two").unwrap()));
            assert!(!pending_marker_at(text, text.find(":three").unwrap()));
        }

        #[test]
        fn test_marker_inside_string_is_ignored() {
            let tree = crate::ir::reader::read(r##"["#_" a]"##);
            let a = tree.nodes().find(|n| n.text() == "a").unwrap();
            assert!(!marks_inert(a));
        }

        #[test]
        fn test_offset_not_at_token() {
            assert!(!pending_marker_at("[#_ a]", 0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::reader::read;
    use crate::ir::syntax::{SyntaxTree, TextRange, TreeBuilder};

    fn find<'t>(tree: &'t SyntaxTree, text: &str) -> Node<'t> {
        tree.nodes()
            .find(|n| n.kind().is_form() && n.text() == text)
            .unwrap()
    }

    #[test]
    fn test_single_marker_in_vector() {
        let tree = read("[#_:one :two]");
        assert!(is_inert(find(&tree, ":one")));
        assert!(!is_inert(find(&tree, ":two")));
    }

    #[test]
    fn test_two_markers_three_forms() {
        let tree = read("(do #_ #_ a b c)");
        assert!(is_inert(find(&tree, "a")));
        assert!(is_inert(find(&tree, "b")));
        assert!(!is_inert(find(&tree, "c")));
    }

    #[test]
    fn test_no_markers_all_active() {
        let tree = read("(do a b c)");
        for name in ["a", "b", "c", "do"] {
            assert!(!is_inert(find(&tree, name)));
        }
    }

    #[test]
    fn test_excess_markers_cover_whole_sequence() {
        let tree = read("[#_#_#_ a b]");
        assert!(is_inert(find(&tree, "a")));
        assert!(is_inert(find(&tree, "b")));
    }

    #[test]
    fn test_inertness_cascades_into_children() {
        let tree = read("[#_ [x [y]] z]");
        assert!(is_inert(find(&tree, "x")));
        assert!(is_inert(find(&tree, "y")));
        assert!(!is_inert(find(&tree, "z")));
    }

    #[test]
    fn test_non_form_tokens_use_enclosing_form() {
        let tree = read("#_ (a  b) c");
        let whitespace = tree
            .nodes()
            .find(|n| n.kind() == SyntaxKind::Whitespace && n.text() == "  ")
            .unwrap();
        assert!(is_inert(whitespace));
        assert!(!is_inert(tree.root()));
    }

    #[test]
    fn test_comment_breaks_sequence() {
        let tree = read("#_ a ; note\n b");
        assert!(is_inert(find(&tree, "a")));
        assert!(!is_inert(find(&tree, "b")));
    }

    /// `[#_ a b #_ c d]` with the marker tokens missing from the vector.
    fn vector_without_markers() -> SyntaxTree {
        let source = "[#_ a b #_ c d]";
        let mut b = TreeBuilder::new(source);
        b.start_node(SyntaxKind::Vector, 0);
        b.token(SyntaxKind::OpenDelim, TextRange::new(0, 1));
        for name in ["a", "b", "c", "d"] {
            let at = source.find(name).unwrap();
            b.token(SyntaxKind::Symbol, TextRange::new(at, at + 1));
        }
        b.token(SyntaxKind::CloseDelim, TextRange::new(14, 15));
        b.finish_node(15);
        b.finish()
    }

    #[test]
    fn test_text_fallback_recovers_missing_markers() {
        let tree = vector_without_markers();
        assert!(is_inert(find(&tree, "a")));
        assert!(!is_inert(find(&tree, "b")));
        assert!(is_inert(find(&tree, "c")));
        assert!(!is_inert(find(&tree, "d")));
    }

    #[test]
    fn test_tree_and_text_paths_agree() {
        let source = "[#_ a b #_ c d]";
        let with_markers = read(source);
        let without_markers = vector_without_markers();
        for name in ["a", "b", "c", "d"] {
            assert_eq!(
                is_inert(find(&with_markers, name)),
                is_inert(find(&without_markers, name)),
                "paths disagree on {}",
                name
            );
        }
    }
}
