use quickcheck::QuickCheck;

use phel_completion::ir::reader::read;
use phel_completion::ir::syntax::{Node, SyntaxKind};
use test_utils::ir::generator::{PhelProgram, TruncatedSource};

fn leaves(node: Node<'_>, out: &mut String) {
    let mut children = node.children().peekable();
    if children.peek().is_none() {
        out.push_str(node.text());
        return;
    }
    for child in children {
        leaves(child, out);
    }
}

fn covers(source: &str) -> bool {
    let tree = read(source);
    let root = tree.root();
    if root.range().start != 0 || root.range().end != source.len() {
        return false;
    }
    let mut out = String::new();
    for child in root.children() {
        leaves(child, &mut out);
    }
    out == source
}

#[test]
fn test_leaves_cover_arbitrary_text() {
    fn property(source: String) -> bool {
        covers(&source)
    }
    QuickCheck::new()
        .tests(500)
        .quickcheck(property as fn(String) -> bool);
}

#[test]
fn test_leaves_cover_lisp_heavy_text() {
    for source in [
        "(((",
        ")))]]}",
        "#_#_#_",
        "\"unterminated (string",
        "#| open block comment (",
        "'`,@,@^@",
        "|(|(|(",
        "#{#{#{",
    ] {
        assert!(covers(source), "{source:?}");
    }
}

#[test]
fn test_leaves_cover_partial_programs() {
    fn property(source: TruncatedSource) -> bool {
        covers(&source.0)
    }
    QuickCheck::new()
        .tests(300)
        .quickcheck(property as fn(TruncatedSource) -> bool);
}

#[test]
fn test_generated_programs_read_without_errors() {
    fn property(program: PhelProgram) -> bool {
        let source = program.to_string();
        let tree = read(&source);
        tree.nodes().all(|n| n.kind() != SyntaxKind::Error)
            && tree.root().forms().count() == program.forms.len() + 1
    }
    QuickCheck::new()
        .tests(200)
        .quickcheck(property as fn(PhelProgram) -> bool);
}
