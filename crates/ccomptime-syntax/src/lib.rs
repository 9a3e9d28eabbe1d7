//! C parsing for ccomptime.
//!
//! Wraps the tree-sitter C grammar. One [`CParser`] is created per
//! pipeline run and lent to every stage that needs to (re)parse a buffer.

mod debug;
mod error;
pub mod keywords;
mod kind;
mod tree;

pub use debug::dump_tree;
pub use error::SyntaxError;
pub use kind::NodeKind;
pub use tree::{create_span, declared_names, declarator_name, item_names, top_level_item, SyntaxTree};
pub use tree_sitter::Node;

use ccomptime_source::SourceBuffer;
use tree_sitter::Parser;

/// The C parser handle.
pub struct CParser {
    parser: Parser,
}

impl CParser {
    /// Create a new C parser
    pub fn new() -> Result<Self, SyntaxError> {
        let mut parser = Parser::new();
        let language = tree_sitter_c::LANGUAGE;
        parser
            .set_language(&language.into())
            .map_err(|e| SyntaxError::ParserInitError(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Parse a buffer and return a tree bound to it
    pub fn parse(&mut self, buffer: &SourceBuffer) -> Result<SyntaxTree, SyntaxError> {
        let tree = self
            .parser
            .parse(buffer.text(), None)
            .ok_or_else(|| SyntaxError::ParseError {
                message: format!("Failed to parse {} ({})", buffer.name(), buffer.stage()),
                span: None,
            })?;

        let tree = SyntaxTree::new(tree, buffer.id(), buffer.shared_text());
        if tree.has_errors() {
            log::debug!(
                "{} ({}) parsed with {} error node(s)",
                buffer.name(),
                buffer.stage(),
                collect_parse_errors(&tree).len()
            );
        }
        Ok(tree)
    }
}

/// Collects ERROR and MISSING nodes as diagnostics.
///
/// The pipeline tolerates these: the grammar does not know the comptime
/// forms and often recovers around them. They are reported for logging.
pub fn collect_parse_errors(tree: &SyntaxTree) -> Vec<SyntaxError> {
    let mut errors = Vec::new();
    collect_node_errors(tree, tree.root(), &mut errors);
    errors
}

fn collect_node_errors(tree: &SyntaxTree, node: Node<'_>, errors: &mut Vec<SyntaxError>) {
    if node.is_error() {
        errors.push(SyntaxError::ParseError {
            message: format!("unexpected `{}`", tree.text(node).trim()),
            span: Some(create_span(&node)),
        });
        return;
    }
    if node.is_missing() {
        errors.push(SyntaxError::ParseError {
            message: format!("missing `{}`", node.kind()),
            span: Some(create_span(&node)),
        });
        return;
    }
    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_node_errors(tree, child, errors);
    }
}
