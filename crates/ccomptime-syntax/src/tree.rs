use std::sync::Arc;

use ccomptime_source::{BufferId, Slice};
use miette::SourceSpan;
use tree_sitter::{Node, Tree};

use crate::NodeKind;

/// A parsed tree together with the buffer text it was parsed from.
///
/// Node text can only be read through the tree, so a node is never
/// interpreted against the wrong buffer.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    tree: Tree,
    buffer: BufferId,
    text: Arc<str>,
}

impl SyntaxTree {
    pub(crate) fn new(tree: Tree, buffer: BufferId, text: Arc<str>) -> Self {
        Self { tree, buffer, text }
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn buffer(&self) -> BufferId {
        self.buffer
    }

    pub fn source(&self) -> &str {
        &self.text
    }

    /// Text covered by `node`, empty for ranges outside the buffer.
    pub fn text(&self, node: Node<'_>) -> &str {
        self.text.get(node.byte_range()).unwrap_or("")
    }

    /// Text of `node` when it is an identifier token of any alias.
    pub fn identifier_text(&self, node: Node<'_>) -> Option<&str> {
        NodeKind::of(&node).is_identifier().then(|| self.text(node))
    }

    pub fn slice(&self, node: Node<'_>) -> Slice {
        Slice::new(self.buffer, node.byte_range())
    }

    pub fn has_errors(&self) -> bool {
        self.root().has_error()
    }
}

/// Creates a SourceSpan from a Node's byte range
pub fn create_span(node: &Node<'_>) -> SourceSpan {
    SourceSpan::new(node.start_byte().into(), node.end_byte() - node.start_byte())
}

/// Follows `declarator` fields down to the declared identifier.
///
/// Handles pointer, array, function, parenthesized and init declarators.
pub fn declarator_name(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node;
    loop {
        if NodeKind::of(&current).is_identifier() {
            return Some(current);
        }
        current = match current.child_by_field_name("declarator") {
            Some(next) => next,
            None => {
                // parenthesized_declarator has no field for its inner declarator
                let mut cursor = current.walk();
                let inner = current.named_children(&mut cursor).next()?;
                inner
            }
        };
    }
}

/// Names declared by a declaration, function definition or typedef.
pub fn declared_names(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children_by_field_name("declarator", &mut cursor)
        .filter_map(declarator_name)
        .collect()
}

/// Names an item introduces: its declarators, plus the tag and enumerators
/// of a `struct`, `union` or `enum` it defines.
pub fn item_names(node: Node<'_>) -> Vec<Node<'_>> {
    let mut names = declared_names(node);
    let specifier = match NodeKind::of(&node) {
        NodeKind::TagSpecifier => Some(node),
        _ => node
            .child_by_field_name("type")
            .filter(|ty| NodeKind::of(ty) == NodeKind::TagSpecifier),
    };
    if let Some(specifier) = specifier {
        names.extend(specifier.child_by_field_name("name"));
        if let Some(body) = specifier.child_by_field_name("body") {
            let mut cursor = body.walk();
            names.extend(
                body.named_children(&mut cursor)
                    .filter(|child| NodeKind::of(child) == NodeKind::Enumerator)
                    .filter_map(|enumerator| enumerator.child_by_field_name("name")),
            );
        }
    }
    names
}

/// The file-scope item containing `node`, looking through `#if` blocks.
///
/// `None` for nodes in a directive or its condition, and for ERROR items.
pub fn top_level_item(node: Node<'_>) -> Option<Node<'_>> {
    let mut ancestors = vec![node];
    while let Some(parent) = ancestors.last().and_then(Node::parent) {
        ancestors.push(parent);
    }

    let mut path = ancestors.into_iter().rev();
    let mut container = path
        .next()
        .filter(|root| NodeKind::of(root) == NodeKind::TranslationUnit)?;
    for next in path {
        let tested = ["condition", "name"]
            .iter()
            .any(|field| container.child_by_field_name(field) == Some(next));
        if tested {
            return None;
        }
        let kind = NodeKind::of(&next);
        if kind.is_conditional() {
            container = next;
            continue;
        }
        if kind == NodeKind::Error || next.kind().starts_with("preproc_") {
            return None;
        }
        return Some(next);
    }
    None
}
