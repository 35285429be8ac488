//! Node lookup by source offset and LSP position conversion
//!
//! Completion is requested at an offset that usually sits between tokens or
//! right after a partially typed symbol, so lookup favours the atom the
//! cursor touches and otherwise returns the innermost node strictly
//! containing the offset.

use lsp_types::Position;
use ropey::Rope;
use tracing::trace;

use crate::errors::CompletionError;
use crate::ir::syntax::{Node, SyntaxKind, SyntaxTree};

/// Atoms whose text the user may still be typing.
fn is_word(kind: SyntaxKind) -> bool {
    matches!(
        kind,
        SyntaxKind::Symbol | SyntaxKind::Keyword | SyntaxKind::Number
    )
}

/// Find the node the cursor at `offset` belongs to
///
/// # Arguments
/// * `tree` - Syntax tree to search
/// * `offset` - Byte offset of the cursor
///
/// # Returns
/// The symbol, keyword or number the cursor is inside of or directly after,
/// else the innermost node whose range contains `offset`. A collection that
/// starts exactly at `offset` is not entered: the cursor sits before it.
/// Offsets past the end of the source yield `None`.
///
/// # Algorithm
/// 1. Start at the root
/// 2. Among the children, prefer a word atom touching the offset
/// 3. Otherwise descend into the child containing the offset, or into an
///    unclosed collection ending exactly at the offset
/// 4. Stop when no child qualifies
pub fn find_node_at_offset(tree: &SyntaxTree, offset: usize) -> Option<Node<'_>> {
    if offset > tree.source().len() {
        return None;
    }
    let mut node = tree.root();
    while let Some(child) = child_at(node, offset) {
        trace!("Descending into {:?} for offset {}", child, offset);
        node = child;
        if !child.kind().is_collection() && child.kind() != SyntaxKind::Quoted {
            break;
        }
    }
    Some(node)
}

fn child_at(node: Node<'_>, offset: usize) -> Option<Node<'_>> {
    let mut containing = None;
    for child in node.children() {
        let range = child.range();
        if is_word(child.kind()) && range.touches(offset) {
            return Some(child);
        }
        let enters = if child.kind().is_collection() || child.kind() == SyntaxKind::Quoted {
            child.offset() < offset
                && (range.contains(offset) || (!child.is_closed() && range.end == offset))
        } else {
            range.contains(offset)
        };
        if enters && containing.is_none() {
            containing = Some(child);
        }
    }
    containing
}

/// Insert the host placeholder at `offset`.
///
/// The placeholder turns the cursor into a symbol token, so that an empty
/// slot (`(defn |)`) still has a node of its own.
pub fn insert_placeholder(
    source: &str,
    offset: usize,
    placeholder: &str,
) -> Result<String, CompletionError> {
    if offset > source.len() || !source.is_char_boundary(offset) {
        return Err(CompletionError::OffsetOutOfBounds {
            offset,
            len: source.len(),
        });
    }
    let mut text = String::with_capacity(source.len() + placeholder.len());
    text.push_str(&source[..offset]);
    text.push_str(placeholder);
    text.push_str(&source[offset..]);
    Ok(text)
}

/// Convert an LSP position (line, UTF-16 column) to a byte offset.
///
/// Columns past the end of a line are clamped to the line end; positions past
/// the last line yield `None`.
pub fn position_to_offset(text: &Rope, position: &Position) -> Option<usize> {
    let line = position.line as usize;
    let line_start = text.try_line_to_char(line).ok()?;
    let line_len = match text.get_line(line) {
        Some(slice) => {
            let chars = slice.len_chars();
            // The terminator is not addressable by column.
            let trailing = slice
                .chars_at(chars)
                .reversed()
                .take_while(|c| *c == '\n' || *c == '\r')
                .count();
            chars - trailing
        }
        None => 0,
    };
    let line_start_cu = text.char_to_utf16_cu(line_start);
    let line_end_cu = text.char_to_utf16_cu(line_start + line_len);
    let target_cu = (line_start_cu + position.character as usize).min(line_end_cu);
    let char_idx = text.try_utf16_cu_to_char(target_cu).ok()?;
    text.try_char_to_byte(char_idx).ok()
}

/// Convert a byte offset to an LSP position.
pub fn offset_to_position(text: &Rope, offset: usize) -> Option<Position> {
    let char_idx = text.try_byte_to_char(offset).ok()?;
    let line = text.try_char_to_line(char_idx).ok()?;
    let line_start = text.try_line_to_char(line).ok()?;
    let column = text.char_to_utf16_cu(char_idx) - text.char_to_utf16_cu(line_start);
    Some(Position {
        line: line as u32,
        character: column as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::reader::read;

    #[test]
    fn test_word_touching_cursor_wins() {
        let tree = read("(map inc xs)");
        assert_eq!(find_node_at_offset(&tree, 4).unwrap().text(), "map");
        assert_eq!(find_node_at_offset(&tree, 5).unwrap().text(), "inc");
        assert_eq!(find_node_at_offset(&tree, 2).unwrap().text(), "map");
    }

    #[test]
    fn test_cursor_before_collection_stays_outside() {
        let tree = read("(a (b))");
        let node = find_node_at_offset(&tree, 3).unwrap();
        assert_eq!(node.kind(), SyntaxKind::List);
        assert_eq!(node.text(), "(a (b))");
    }

    #[test]
    fn test_cursor_in_unclosed_list_at_eof() {
        let tree = read("(defn ");
        let node = find_node_at_offset(&tree, 6).unwrap();
        assert_eq!(node.kind(), SyntaxKind::List);
    }

    #[test]
    fn test_cursor_on_close_delim() {
        let tree = read("(defn )");
        let node = find_node_at_offset(&tree, 6).unwrap();
        assert_eq!(node.kind(), SyntaxKind::CloseDelim);
    }

    #[test]
    fn test_offset_past_end() {
        let tree = read("(a)");
        assert!(find_node_at_offset(&tree, 10).is_none());
        assert_eq!(find_node_at_offset(&tree, 3).unwrap().kind(), SyntaxKind::Root);
    }

    #[test]
    fn test_insert_placeholder() {
        assert_eq!(insert_placeholder("(defn )", 6, "X").unwrap(), "(defn X)");
        assert!(matches!(
            insert_placeholder("ab", 5, "X"),
            Err(CompletionError::OffsetOutOfBounds { offset: 5, len: 2 })
        ));
    }

    #[test]
    fn test_position_round_trip() {
        let rope = Rope::from_str("(ns app)\n(defn f [x]\n  (str \"é\" x))\n");
        let position = Position {
            line: 2,
            character: 11,
        };
        let offset = position_to_offset(&rope, &position).unwrap();
        assert_eq!(&rope.to_string()[offset..offset + 1], "x");
        assert_eq!(offset_to_position(&rope, offset), Some(position));
    }

    #[test]
    fn test_position_clamped_to_line_end() {
        let rope = Rope::from_str("ab\ncd");
        let offset = position_to_offset(&rope, &Position { line: 0, character: 40 }).unwrap();
        assert_eq!(offset, 2);
        assert!(position_to_offset(&rope, &Position { line: 9, character: 0 }).is_none());
    }
}
