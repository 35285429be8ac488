//! Error-tolerant reader for Phel source
//!
//! [`read`] never fails. Every byte of the input ends up in exactly one leaf
//! token, so concatenating the leaves reproduces the source. Recovery rules:
//!
//! - an unterminated collection, string or block comment extends to end of file
//! - a closing delimiter that matches an enclosing collection implicitly ends
//!   every collection opened inside it (those stay unclosed)
//! - a closing delimiter that matches nothing becomes an [`SyntaxKind::Error`] leaf
//! - a reader prefix with no following form is ended where its parent ends

use tracing::trace;

use super::syntax::{SyntaxKind, SyntaxTree, TextRange, TreeBuilder};

/// Read `source` into a syntax tree.
pub fn read(source: &str) -> SyntaxTree {
    Reader::new(source).run()
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Collection { closer: char },
    Prefix,
}

struct Reader<'s> {
    src: &'s str,
    pos: usize,
    builder: TreeBuilder,
    frames: Vec<Frame>,
}

fn is_terminator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '{' | '}' | '"' | ';' | ',')
}

impl<'s> Reader<'s> {
    fn new(src: &'s str) -> Self {
        Self {
            src,
            pos: 0,
            builder: TreeBuilder::new(src),
            frames: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Byte offset of the first char at or after `pos` satisfying `stop`, or end of input.
    fn scan_until(&self, from: usize, stop: impl Fn(char) -> bool) -> usize {
        self.src[from..]
            .char_indices()
            .find(|&(_, c)| stop(c))
            .map_or(self.src.len(), |(i, _)| from + i)
    }

    fn leaf(&mut self, kind: SyntaxKind, end: usize) {
        self.builder.token(kind, TextRange::new(self.pos, end));
        self.pos = end;
    }

    fn run(mut self) -> SyntaxTree {
        while let Some(c) = self.peek() {
            match c {
                c if c.is_whitespace() => {
                    let end = self.scan_until(self.pos, |c| !c.is_whitespace());
                    self.leaf(SyntaxKind::Whitespace, end);
                }
                ';' => self.line_comment(),
                '#' => match self.peek_second() {
                    Some('_') => {
                        let end = self.pos + 2;
                        self.leaf(SyntaxKind::FormComment, end);
                    }
                    Some('{') => self.open(SyntaxKind::Set, 2, '}'),
                    Some('|') => self.block_comment(),
                    _ => self.line_comment(),
                },
                '|' if self.peek_second() == Some('(') => self.open(SyntaxKind::ShortFn, 2, ')'),
                '(' => self.open(SyntaxKind::List, 1, ')'),
                '[' => self.open(SyntaxKind::Vector, 1, ']'),
                '{' => self.open(SyntaxKind::Map, 1, '}'),
                ')' | ']' | '}' => self.close(c),
                '"' => self.string(),
                '\'' | '`' | '@' | '^' => self.prefix(1),
                ',' => {
                    let width = if self.peek_second() == Some('@') { 2 } else { 1 };
                    self.prefix(width);
                }
                _ => self.atom(),
            }
        }
        self.builder.finish()
    }

    fn line_comment(&mut self) {
        let end = self.scan_until(self.pos, |c| c == '\n');
        self.leaf(SyntaxKind::LineComment, end);
    }

    fn block_comment(&mut self) {
        let body = self.pos + 2;
        let end = self.src[body..]
            .find("|#")
            .map_or(self.src.len(), |i| body + i + 2);
        self.leaf(SyntaxKind::LineComment, end);
    }

    fn open(&mut self, kind: SyntaxKind, width: usize, closer: char) {
        self.builder.start_node(kind, self.pos);
        let end = self.pos + width;
        self.leaf(SyntaxKind::OpenDelim, end);
        self.frames.push(Frame::Collection { closer });
    }

    fn close(&mut self, c: char) {
        let matching = self
            .frames
            .iter()
            .rposition(|frame| matches!(frame, Frame::Collection { closer } if *closer == c));

        let Some(index) = matching else {
            trace!("Stray closing delimiter {:?} at {}", c, self.pos);
            let end = self.pos + 1;
            self.leaf(SyntaxKind::Error, end);
            return;
        };

        while self.frames.len() > index + 1 {
            self.frames.pop();
            self.builder.finish_node(self.pos);
        }
        let end = self.pos + 1;
        self.leaf(SyntaxKind::CloseDelim, end);
        self.frames.pop();
        self.builder.finish_node(self.pos);
        self.form_done();
    }

    fn string(&mut self) {
        let mut escaped = false;
        let body = self.pos + 1;
        let end = self.src[body..]
            .char_indices()
            .find(|&(_, c)| {
                if escaped {
                    escaped = false;
                    false
                } else if c == '\\' {
                    escaped = true;
                    false
                } else {
                    c == '"'
                }
            })
            .map_or(self.src.len(), |(i, _)| body + i + 1);
        self.leaf(SyntaxKind::String, end);
        self.form_done();
    }

    fn prefix(&mut self, width: usize) {
        self.builder.start_node(SyntaxKind::Quoted, self.pos);
        let end = self.pos + width;
        self.leaf(SyntaxKind::Prefix, end);
        self.frames.push(Frame::Prefix);
    }

    fn atom(&mut self) {
        let end = self.scan_until(self.pos, is_terminator);
        // The scan always consumes at least the current char, which is not a terminator.
        let end = end.max(self.pos + self.peek().map_or(1, char::len_utf8));
        let text = &self.src[self.pos..end];
        let kind = classify_atom(text);
        self.leaf(kind, end);
        self.form_done();
    }

    /// A form just ended: close any reader prefixes waiting for it.
    fn form_done(&mut self) {
        while matches!(self.frames.last(), Some(Frame::Prefix)) {
            self.frames.pop();
            self.builder.finish_node(self.pos);
        }
    }
}

fn classify_atom(text: &str) -> SyntaxKind {
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(':'), _) => SyntaxKind::Keyword,
        (Some(c), _) if c.is_ascii_digit() => SyntaxKind::Number,
        (Some('+' | '-'), Some(c)) if c.is_ascii_digit() => SyntaxKind::Number,
        _ => SyntaxKind::Symbol,
    }
}
