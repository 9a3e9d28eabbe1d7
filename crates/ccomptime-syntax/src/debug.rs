use std::fmt::Write;

use tree_sitter::Node;

use crate::keywords;
use crate::SyntaxTree;

/// Renders the tree one node per line as `kind [start-end] text`.
///
/// Leaf text is shown, and leaves spelling a comptime keyword are flagged.
pub fn dump_tree(tree: &SyntaxTree, max_depth: usize) -> String {
    let mut out = String::new();
    dump_node(tree, tree.root(), 0, max_depth, &mut out);
    out
}

fn dump_node(tree: &SyntaxTree, node: Node<'_>, depth: usize, max_depth: usize, out: &mut String) {
    if depth >= max_depth {
        return;
    }

    let indent = " ".repeat(depth * 2);
    let text = if node.child_count() == 0 {
        let text = tree.text(node);
        if keywords::is_comptime_keyword(text) {
            format!(" {text} <comptime>")
        } else {
            format!(" {text}")
        }
    } else {
        String::new()
    };

    let _ = writeln!(
        out,
        "{}{} [{}-{}]{}",
        indent,
        node.kind(),
        node.start_byte(),
        node.end_byte(),
        text
    );

    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            dump_node(tree, cursor.node(), depth + 1, max_depth, out);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}
