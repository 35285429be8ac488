//! Arena-backed concrete syntax tree for Phel source
//!
//! The tree keeps every byte of the input: whitespace, comments, delimiters and
//! `#_` markers are all child tokens of the collection they appear in. Nodes are
//! stored in a flat arena and addressed by [`NodeId`]; [`Node`] is a cheap
//! borrowed handle that exposes the read-only accessors the completion engine
//! works with (`kind`, `children`, `parent`, `text`, `range`, `offset`).
//!
//! Trees are produced by [`crate::ir::reader::read`] or assembled by hand with
//! [`TreeBuilder`]. Once built, a tree is never mutated.

use std::fmt;
use std::ptr;

use serde::Serialize;

use crate::errors::MalformedTree;

/// Index of a node inside its [`SyntaxTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Build an id from a raw arena index. Ids that do not belong to a tree are
    /// rejected by [`SyntaxTree::node`].
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Half-open byte range `start..end` into the tree's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub const fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(self) -> bool {
        self.len() == 0
    }

    /// `start <= offset < end`
    pub fn contains(self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// `start <= offset <= end`; a cursor sitting right after a token touches it.
    pub fn touches(self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn contains_range(self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Kind tag of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SyntaxKind {
    Root,
    /// `( ... )`
    List,
    /// `[ ... ]`
    Vector,
    /// `{ ... }`
    Map,
    /// `#{ ... }`
    Set,
    /// `|( ... )`, the short anonymous function form
    ShortFn,
    /// A reader prefix (`'`, `` ` ``, `,`, `,@`, `@`, `^`) together with the form it applies to
    Quoted,
    Symbol,
    Keyword,
    String,
    Number,
    Whitespace,
    /// `#` or `;` line comments and `#| ... |#` block comments
    LineComment,
    /// The `#_` marker; deactivates the next form, stacks with adjacent markers
    FormComment,
    OpenDelim,
    CloseDelim,
    /// Reader prefix token inside a [`SyntaxKind::Quoted`] node
    Prefix,
    /// Stray closing delimiter or other unreadable input
    Error,
}

impl SyntaxKind {
    /// Nodes that count as forms when computing ordinals and sequences.
    pub fn is_form(self) -> bool {
        matches!(
            self,
            SyntaxKind::List
                | SyntaxKind::Vector
                | SyntaxKind::Map
                | SyntaxKind::Set
                | SyntaxKind::ShortFn
                | SyntaxKind::Quoted
                | SyntaxKind::Symbol
                | SyntaxKind::Keyword
                | SyntaxKind::String
                | SyntaxKind::Number
        )
    }

    pub fn is_collection(self) -> bool {
        matches!(
            self,
            SyntaxKind::List
                | SyntaxKind::Vector
                | SyntaxKind::Map
                | SyntaxKind::Set
                | SyntaxKind::ShortFn
        )
    }

    /// Collections whose first form is evaluated as an operator.
    pub fn is_call(self) -> bool {
        matches!(self, SyntaxKind::List | SyntaxKind::ShortFn)
    }

    pub fn is_trivia(self) -> bool {
        matches!(self, SyntaxKind::Whitespace | SyntaxKind::LineComment)
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: SyntaxKind,
    range: TextRange,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An immutable syntax tree together with the source it was built from.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: String,
    nodes: Vec<NodeData>,
}

impl SyntaxTree {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Node<'_> {
        Node {
            tree: self,
            id: NodeId(0),
        }
    }

    /// Resolve an id to a node handle.
    pub fn node(&self, id: NodeId) -> Result<Node<'_>, MalformedTree> {
        if id.index() < self.nodes.len() {
            Ok(Node { tree: self, id })
        } else {
            Err(MalformedTree::MissingNode(id))
        }
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// All nodes in creation order (pre-order for reader output).
    pub fn nodes(&self) -> impl Iterator<Item = Node<'_>> {
        (0..self.nodes.len()).map(move |i| Node {
            tree: self,
            id: NodeId(i as u32),
        })
    }

    /// Indented one-node-per-line rendering, used by tests and `--dump-tree`.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        dump_node(self.root(), 0, &mut out);
        out
    }
}

fn dump_node(node: Node<'_>, depth: usize, out: &mut String) {
    out.push_str(&"  ".repeat(depth));
    out.push_str(&format!("{:?}@{}", node.kind(), node.range()));
    if node.child_count() == 0 {
        out.push_str(&format!(" {:?}", node.text()));
    }
    out.push('\n');
    for child in node.children() {
        dump_node(child, depth + 1, out);
    }
}

/// Borrowed handle to one node of a [`SyntaxTree`].
///
/// Handles are only minted for ids that exist in the tree, so the accessors
/// below are infallible. Structural expectations (a form at index `n`, a node
/// of a given kind) are checked by the `Result`-returning helpers.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl<'t> Node<'t> {
    fn data(self) -> &'t NodeData {
        &self.tree.nodes[self.id.index()]
    }

    fn wrap(self, id: NodeId) -> Node<'t> {
        Node {
            tree: self.tree,
            id,
        }
    }

    pub fn id(self) -> NodeId {
        self.id
    }

    pub fn tree(self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn kind(self) -> SyntaxKind {
        self.data().kind
    }

    pub fn range(self) -> TextRange {
        self.data().range
    }

    /// Start offset of the node in the source.
    pub fn offset(self) -> usize {
        self.data().range.start
    }

    /// Source text covered by the node. Ranges that do not fall on character
    /// boundaries (possible only in hand-built trees) yield an empty string.
    pub fn text(self) -> &'t str {
        let range = self.range();
        self.tree.source.get(range.start..range.end).unwrap_or("")
    }

    pub fn parent(self) -> Option<Node<'t>> {
        self.data().parent.map(|id| self.wrap(id))
    }

    pub fn ancestors(self) -> impl Iterator<Item = Node<'t>> {
        std::iter::successors(self.parent(), |node| node.parent())
    }

    pub fn children(self) -> impl DoubleEndedIterator<Item = Node<'t>> + ExactSizeIterator {
        let tree = self.tree;
        self.data()
            .children
            .iter()
            .map(move |&id| Node { tree, id })
    }

    pub fn child_count(self) -> usize {
        self.data().children.len()
    }

    /// Children that are forms, skipping trivia, delimiters and markers.
    pub fn forms(self) -> impl DoubleEndedIterator<Item = Node<'t>> {
        self.children().filter(|child| child.kind().is_form())
    }

    pub fn nth_form(self, index: usize) -> Result<Node<'t>, MalformedTree> {
        let mut len = 0;
        for form in self.forms() {
            if len == index {
                return Ok(form);
            }
            len += 1;
        }
        Err(MalformedTree::ChildOutOfRange {
            parent: self.id,
            index,
            len,
        })
    }

    /// First form child; the operator position of a list.
    pub fn head(self) -> Option<Node<'t>> {
        self.forms().next()
    }

    /// Ordinal of this node among its parent's forms.
    pub fn form_index(self) -> Option<usize> {
        if !self.kind().is_form() {
            return None;
        }
        self.parent()?.forms().position(|form| form == self)
    }

    /// A collection is closed when its last child is a closing delimiter.
    pub fn is_closed(self) -> bool {
        self.children()
            .next_back()
            .is_some_and(|last| last.kind() == SyntaxKind::CloseDelim)
    }

    pub fn expect_kind(self, expected: SyntaxKind) -> Result<Node<'t>, MalformedTree> {
        let found = self.kind();
        if found == expected {
            Ok(self)
        } else {
            Err(MalformedTree::UnexpectedKind {
                node: self.id,
                expected,
                found,
            })
        }
    }

    pub fn is_ancestor_of(self, other: Node<'t>) -> bool {
        other.ancestors().any(|ancestor| ancestor == self)
    }

    /// `self` or one of its ancestors.
    pub fn is_or_contains(self, other: Node<'t>) -> bool {
        self == other || self.is_ancestor_of(other)
    }
}

impl PartialEq for Node<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for Node<'_> {}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{}", self.kind(), self.range())
    }
}

/// Incremental construction of a [`SyntaxTree`].
///
/// The builder keeps a stack of open nodes; tokens and nested nodes are attached
/// to the innermost open one. Nodes still open when [`TreeBuilder::finish`] is
/// called are closed at the end of the source, which is how unterminated
/// collections extend to end of file.
#[derive(Debug)]
pub struct TreeBuilder {
    source: String,
    nodes: Vec<NodeData>,
    open: Vec<NodeId>,
}

impl TreeBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let root = NodeData {
            kind: SyntaxKind::Root,
            range: TextRange::new(0, source.len()),
            parent: None,
            children: Vec::new(),
        };
        Self {
            source,
            nodes: vec![root],
            open: vec![NodeId(0)],
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Innermost open node.
    pub fn current(&self) -> NodeId {
        self.open.last().copied().unwrap_or(NodeId(0))
    }

    pub fn current_kind(&self) -> SyntaxKind {
        self.nodes[self.current().index()].kind
    }

    /// Number of open nodes, not counting the root.
    pub fn depth(&self) -> usize {
        self.open.len().saturating_sub(1)
    }

    fn push(&mut self, kind: SyntaxKind, range: TextRange) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let parent = self.current();
        self.nodes.push(NodeData {
            kind,
            range,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Open a composite node starting at `start`.
    pub fn start_node(&mut self, kind: SyntaxKind, start: usize) -> NodeId {
        let id = self.push(kind, TextRange::empty(start));
        self.open.push(id);
        id
    }

    /// Close the innermost open node at `end`. The root is never closed here.
    pub fn finish_node(&mut self, end: usize) -> NodeId {
        if self.open.len() <= 1 {
            return NodeId(0);
        }
        let id = self.current();
        self.open.pop();
        self.nodes[id.index()].range.end = end;
        id
    }

    /// Attach a leaf token to the innermost open node.
    pub fn token(&mut self, kind: SyntaxKind, range: TextRange) -> NodeId {
        self.push(kind, range)
    }

    pub fn finish(mut self) -> SyntaxTree {
        let end = self.source.len();
        while self.open.len() > 1 {
            self.finish_node(end);
        }
        SyntaxTree {
            source: self.source,
            nodes: self.nodes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `(f [a])` built by hand
    fn sample() -> SyntaxTree {
        let mut b = TreeBuilder::new("(f [a])");
        b.start_node(SyntaxKind::List, 0);
        b.token(SyntaxKind::OpenDelim, TextRange::new(0, 1));
        b.token(SyntaxKind::Symbol, TextRange::new(1, 2));
        b.token(SyntaxKind::Whitespace, TextRange::new(2, 3));
        b.start_node(SyntaxKind::Vector, 3);
        b.token(SyntaxKind::OpenDelim, TextRange::new(3, 4));
        b.token(SyntaxKind::Symbol, TextRange::new(4, 5));
        b.token(SyntaxKind::CloseDelim, TextRange::new(5, 6));
        b.finish_node(6);
        b.token(SyntaxKind::CloseDelim, TextRange::new(6, 7));
        b.finish_node(7);
        b.finish()
    }

    #[test]
    fn test_accessors() {
        let tree = sample();
        let list = tree.root().head().unwrap();
        assert_eq!(list.kind(), SyntaxKind::List);
        assert_eq!(list.text(), "(f [a])");
        assert_eq!(list.child_count(), 5);
        assert!(list.is_closed());

        let head = list.head().unwrap();
        assert_eq!(head.text(), "f");
        assert_eq!(head.offset(), 1);
        assert_eq!(head.form_index(), Some(0));

        let vector = list.nth_form(1).unwrap();
        assert_eq!(vector.kind(), SyntaxKind::Vector);
        assert_eq!(vector.parent(), Some(list));
        assert!(list.is_ancestor_of(vector.head().unwrap()));
        assert_eq!(vector.head().unwrap().ancestors().count(), 3);
    }

    #[test]
    fn test_structural_errors() {
        let tree = sample();
        let list = tree.root().head().unwrap();

        assert_eq!(
            list.nth_form(5),
            Err(MalformedTree::ChildOutOfRange {
                parent: list.id(),
                index: 5,
                len: 2,
            })
        );
        assert!(matches!(
            list.expect_kind(SyntaxKind::Vector),
            Err(MalformedTree::UnexpectedKind { found: SyntaxKind::List, .. })
        ));
        assert_eq!(
            tree.node(NodeId::from_raw(999)).unwrap_err(),
            MalformedTree::MissingNode(NodeId::from_raw(999))
        );
    }

    #[test]
    fn test_unfinished_nodes_extend_to_end() {
        let mut b = TreeBuilder::new("(let [a");
        b.start_node(SyntaxKind::List, 0);
        b.token(SyntaxKind::OpenDelim, TextRange::new(0, 1));
        b.token(SyntaxKind::Symbol, TextRange::new(1, 4));
        b.token(SyntaxKind::Whitespace, TextRange::new(4, 5));
        b.start_node(SyntaxKind::Vector, 5);
        b.token(SyntaxKind::OpenDelim, TextRange::new(5, 6));
        b.token(SyntaxKind::Symbol, TextRange::new(6, 7));
        let tree = b.finish();

        let list = tree.root().head().unwrap();
        let vector = list.nth_form(1).unwrap();
        assert_eq!(list.range(), TextRange::new(0, 7));
        assert_eq!(vector.range(), TextRange::new(5, 7));
        assert!(!vector.is_closed());
        assert!(!list.is_closed());
    }

    #[test]
    fn test_text_range() {
        let range = TextRange::new(2, 5);
        assert!(range.contains(2));
        assert!(!range.contains(5));
        assert!(range.touches(5));
        assert!(range.contains_range(TextRange::new(3, 5)));
        assert!(TextRange::empty(4).is_empty());
    }
}
