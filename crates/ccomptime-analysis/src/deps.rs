use std::cmp::Reverse;

use ccomptime_source::{Slice, SourceMap};
use ccomptime_syntax::{
    create_span, declared_names, item_names, keywords, top_level_item, Node, NodeKind, SyntaxTree,
};
use rustc_hash::FxHashSet;

use crate::correct::{span_of, PlaceholderTable};
use crate::form::form_after;
use crate::AnalysisError;

/// The top-level unit a comptime statement was found in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribution {
    Function(Vec<String>),
    Declaration(Vec<String>),
    TypeDefinition(Vec<String>),
    /// Any other file-scope item, such as `struct S { ... };`.
    Item(Vec<String>),
    TopLevel,
}

impl Attribution {
    /// Names this attribution made comptime-dependent.
    pub fn names(&self) -> &[String] {
        match self {
            Attribution::Function(names)
            | Attribution::Declaration(names)
            | Attribution::TypeDefinition(names)
            | Attribution::Item(names) => names,
            Attribution::TopLevel => &[],
        }
    }
}

/// A `_Comptime` call or `_ComptimeType` placeholder, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComptimeStatement {
    /// Position among all statements of the file, starting at 0.
    pub index: usize,
    /// The trimmed code to run.
    pub body: Slice,
    /// Set for statements that came from a `_ComptimeType` placeholder.
    pub placeholder: Option<usize>,
    pub attribution: Attribution,
    /// Where the statement appears in the corrected buffer.
    pub origin: Slice,
}

/// Names whose use makes code depend on comptime output.
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    names: FxHashSet<String>,
}

impl DependencySet {
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn sorted(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Ranges of the corrected buffer to erase from the comptime-safe source.
#[derive(Debug, Clone, Default)]
pub struct RemovalList {
    ranges: Vec<Slice>,
}

impl RemovalList {
    pub fn push(&mut self, slice: Slice) {
        self.ranges.push(slice);
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Sorted, deduplicated ranges with contained entries dropped.
    pub fn normalized(&self) -> Result<Vec<Slice>, AnalysisError> {
        let mut ranges = self.ranges.clone();
        ranges.sort_by_key(|slice| (slice.start(), Reverse(slice.len())));

        let mut kept: Vec<Slice> = Vec::with_capacity(ranges.len());
        for slice in ranges {
            match kept.last() {
                Some(last) if last.contains(&slice) => continue,
                Some(last) if slice.start() < last.end() => {
                    return Err(AnalysisError::OverlappingRemoval {
                        first: last.range(),
                        second: slice.range(),
                    });
                }
                _ => kept.push(slice),
            }
        }
        Ok(kept)
    }
}

/// Everything the runner generator needs from one file.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub statements: Vec<ComptimeStatement>,
    pub dependencies: DependencySet,
    pub removals: RemovalList,
}

/// Enclosing nodes seen on the way down to the current node.
#[derive(Debug, Clone, Copy, Default)]
struct Context<'t> {
    function_definition: Option<Node<'t>>,
    declaration: Option<Node<'t>>,
    type_definition: Option<Node<'t>>,
    call_expression: Option<Node<'t>>,
    macro_definition: Option<Node<'t>>,
    /// Start of a misparsed statement that must not count as its own unit.
    statement_start: Option<usize>,
    /// Index of the current node among its parent's children.
    child_index: usize,
}

impl<'t> Context<'t> {
    /// Context for the children of `node`.
    fn enter(mut self, node: Node<'t>) -> Self {
        match NodeKind::of(&node) {
            NodeKind::FunctionDefinition => self.function_definition = Some(node),
            NodeKind::Declaration => self.declaration = Some(node),
            NodeKind::TypeDefinition => self.type_definition = Some(node),
            NodeKind::CallExpression => self.call_expression = Some(node),
            NodeKind::PreprocDef | NodeKind::PreprocFunctionDef => self.macro_definition = Some(node),
            _ => {}
        }
        self
    }

    fn at(mut self, child_index: usize) -> Self {
        self.child_index = child_index;
        self
    }

    /// Drops enclosing units that start at `start`.
    ///
    /// A statement like `_Comptime(f(x));` can be read by the grammar as a
    /// declaration of `f` with type `_Comptime`. That declaration is the
    /// statement itself, not the unit it lives in.
    fn outside(mut self, start: usize) -> Self {
        let elsewhere = |node: Option<Node<'t>>| node.filter(|n| n.start_byte() != start);
        self.function_definition = elsewhere(self.function_definition);
        self.declaration = elsewhere(self.declaration);
        self.type_definition = elsewhere(self.type_definition);
        self.statement_start = Some(start);
        self
    }

    /// The file-scope item around `node` when no named unit encloses it.
    fn item(&self, node: Node<'t>) -> Option<Node<'t>> {
        top_level_item(node).filter(|item| Some(item.start_byte()) != self.statement_start)
    }

    fn attribution(&self, tree: &SyntaxTree, node: Node<'t>) -> Attribution {
        let names = |found: Vec<Node<'_>>| -> Vec<String> {
            let mut names: Vec<String> = Vec::with_capacity(found.len());
            for name in found {
                let name = tree.text(name);
                if !names.iter().any(|known| known == name) {
                    names.push(name.to_string());
                }
            }
            names
        };
        if let Some(function) = self.function_definition {
            Attribution::Function(names(declared_names(function)))
        } else if let Some(declaration) = self.declaration {
            Attribution::Declaration(names(item_names(declaration)))
        } else if let Some(definition) = self.type_definition {
            Attribution::TypeDefinition(names(item_names(definition)))
        } else if let Some(item) = self.item(node) {
            Attribution::Item(names(item_names(item)))
        } else {
            Attribution::TopLevel
        }
    }

    fn removal_unit(&self, tree: &SyntaxTree, node: Node<'t>) -> Option<Slice> {
        match self
            .function_definition
            .or(self.declaration)
            .or(self.type_definition)
            .or(self.call_expression)
        {
            Some(unit) => Some(tree.slice(unit)),
            None => self.item(node).map(|item| item_slice(tree, item)),
        }
    }
}

/// An item with the `;` that closes a bare `struct`, `union` or `enum`.
fn item_slice(tree: &SyntaxTree, item: Node<'_>) -> Slice {
    let end = item
        .next_sibling()
        .filter(|next| next.kind() == ";")
        .map_or(item.end_byte(), |semicolon| semicolon.end_byte());
    Slice::new(tree.buffer(), item.start_byte()..end)
}

/// Finds comptime statements and everything that depends on their output.
///
/// Pass one records statements and marks the names of their enclosing units.
/// Pass two collects every unit that mentions a marked name.
pub fn analyze(
    sources: &SourceMap,
    tree: &SyntaxTree,
    placeholders: &PlaceholderTable,
) -> Result<Analysis, AnalysisError> {
    let mut analyzer = DependencyAnalyzer {
        sources,
        tree,
        placeholders,
        statements: Vec::new(),
        dependencies: DependencySet::default(),
        removals: RemovalList::default(),
        covered_until: 0,
    };
    analyzer.register(tree.root(), Context::default())?;
    log::debug!(
        "dependency analysis: {} statement(s), dependent names {:?}",
        analyzer.statements.len(),
        analyzer.dependencies.sorted()
    );
    analyzer.strip(tree.root(), Context::default());
    log::debug!("dependency analysis: {} removal range(s)", analyzer.removals.len());

    Ok(Analysis {
        statements: analyzer.statements,
        dependencies: analyzer.dependencies,
        removals: analyzer.removals,
    })
}

struct DependencyAnalyzer<'a> {
    sources: &'a SourceMap,
    tree: &'a SyntaxTree,
    placeholders: &'a PlaceholderTable,
    statements: Vec<ComptimeStatement>,
    dependencies: DependencySet,
    removals: RemovalList,
    covered_until: usize,
}

impl<'a> DependencyAnalyzer<'a> {
    fn register(&mut self, node: Node<'a>, ctx: Context<'a>) -> Result<(), AnalysisError> {
        if node.end_byte() <= self.covered_until {
            return Ok(());
        }

        match NodeKind::of(&node) {
            NodeKind::CallExpression => {
                if let Some(callee) = node.child_by_field_name("function") {
                    if self.tree.text(callee) == keywords::COMPTIME {
                        return self.comptime_call(callee, ctx.outside(callee.start_byte()));
                    }
                }
            }
            kind if kind.is_identifier() => return self.identifier(node, ctx),
            _ => {}
        }

        let inner = ctx.enter(node);
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        for (index, child) in children.into_iter().enumerate() {
            self.register(child, inner.at(index))?;
        }
        Ok(())
    }

    fn identifier(&mut self, node: Node<'a>, ctx: Context<'a>) -> Result<(), AnalysisError> {
        let text = self.tree.text(node);

        if keywords::is_comptime_keyword(text) {
            // child 1 of a #define is the macro name
            if ctx.macro_definition.is_some() && ctx.child_index == 1 {
                return Err(AnalysisError::ComptimeRedefinition {
                    keyword: text.to_string(),
                    src: self.named_source()?,
                    span: create_span(&node),
                });
            }
            if text == keywords::COMPTIME_TYPE {
                return Err(AnalysisError::UncorrectedComptimeType {
                    src: self.named_source()?,
                    span: create_span(&node),
                });
            }
            // `_Comptime` that the grammar did not read as a call
            return self.comptime_call(node, ctx.outside(node.start_byte()));
        }

        if let Some(index) = keywords::placeholder_index(text) {
            let Some(placeholder) = self.placeholders.get(index) else {
                return Err(AnalysisError::PlaceholderOutOfRange {
                    index,
                    count: self.placeholders.len(),
                    src: self.named_source()?,
                    span: create_span(&node),
                });
            };
            let body = placeholder.body;
            self.capture(body, Some(index), self.tree.slice(node), node, ctx);
        }
        Ok(())
    }

    fn comptime_call(&mut self, keyword: Node<'a>, ctx: Context<'a>) -> Result<(), AnalysisError> {
        let Some(form) = form_after(self.tree.source(), keyword.byte_range()) else {
            return Err(AnalysisError::InvalidComptimeUse {
                src: self.named_source()?,
                span: create_span(&keyword),
            });
        };
        if form.body.is_empty() {
            return Err(AnalysisError::EmptyComptime {
                keyword: keywords::COMPTIME.to_string(),
                src: self.named_source()?,
                span: span_of(&form.occurrence),
            });
        }

        self.covered_until = form.occurrence.end;
        let body = Slice::new(self.tree.buffer(), form.body);
        let origin = Slice::new(self.tree.buffer(), form.occurrence);
        self.capture(body, None, origin, keyword, ctx);
        Ok(())
    }

    fn capture(
        &mut self,
        body: Slice,
        placeholder: Option<usize>,
        origin: Slice,
        site: Node<'a>,
        ctx: Context<'a>,
    ) {
        let attribution = ctx.attribution(self.tree, site);
        for name in attribution.names() {
            self.dependencies.insert(name.as_str());
        }
        // an anonymous item introduces no names but still uses the output
        if let (Attribution::Item(_), Some(item)) = (&attribution, ctx.item(site)) {
            self.removals.push(item_slice(self.tree, item));
        }
        let index = self.statements.len();
        log::trace!("comptime statement #{} attributed to {:?}", index, attribution);
        self.statements.push(ComptimeStatement {
            index,
            body,
            placeholder,
            attribution,
            origin,
        });
    }

    fn strip(&mut self, node: Node<'a>, ctx: Context<'a>) {
        if matches!(NodeKind::of(&node), NodeKind::Identifier | NodeKind::TypeIdentifier)
            && self.dependencies.contains(self.tree.text(node))
        {
            match ctx.removal_unit(self.tree, node) {
                Some(unit) => self.removals.push(unit),
                None => log::trace!(
                    "dependent name `{}` outside any removable unit",
                    self.tree.text(node)
                ),
            }
            return;
        }

        let inner = ctx.enter(node);
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        for (index, child) in children.into_iter().enumerate() {
            self.strip(child, inner.at(index));
        }
    }

    fn named_source(&self) -> Result<miette::NamedSource<String>, AnalysisError> {
        Ok(self.sources.get(self.tree.buffer())?.named_source())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccomptime_source::BufferId;

    fn slice(start: usize, end: usize) -> Slice {
        let mut sources = SourceMap::new();
        let id: BufferId = sources.add(ccomptime_source::Stage::Corrected, "t.c", "");
        Slice::new(id, start..end)
    }

    #[test]
    fn test_removals_sorted_and_contained_dropped() {
        let mut list = RemovalList::default();
        list.push(slice(30, 40));
        list.push(slice(0, 20));
        list.push(slice(5, 10));
        list.push(slice(0, 20));
        let ranges: Vec<_> = list.normalized().unwrap().iter().map(Slice::range).collect();
        assert_eq!(ranges, [0..20, 30..40]);
    }

    #[test]
    fn test_partial_overlap_is_rejected() {
        let mut list = RemovalList::default();
        list.push(slice(0, 20));
        list.push(slice(10, 30));
        assert!(matches!(
            list.normalized(),
            Err(AnalysisError::OverlappingRemoval { .. })
        ));
    }

    #[test]
    fn test_dependency_set_sorted() {
        let mut set = DependencySet::default();
        set.insert("main");
        set.insert("answer");
        assert!(!set.insert("main"));
        assert_eq!(set.sorted(), ["answer", "main"]);
    }
}
