use std::ops::Range;

use ccomptime_source::{BufferId, Slice, SourceMap, Splicer, Stage};
use ccomptime_syntax::{create_span, keywords, CParser, Node, NodeKind, SyntaxTree};

use crate::form::{form_after, Form};
use crate::AnalysisError;

/// Where the grammar put a `_ComptimeType` occurrence.
///
/// Only used for logging; every shape is rewritten the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OccurrenceShape {
    CallExpression,
    MacroTypeSpecifier,
    TypeDescriptor,
    /// The grammar hit an error inside the occurrence.
    ErrorRecovery,
    Bare,
}

/// One `_ComptimeType(...)` occurrence replaced by `_COMPTIMETYPE_<index>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub index: usize,
    pub shape: OccurrenceShape,
    /// The whole `_ComptimeType(...)` text in the macro-expanded buffer.
    pub occurrence: Slice,
    /// The code inside the parentheses, trimmed.
    pub body: Slice,
}

/// Placeholders in index order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderTable {
    entries: Vec<Placeholder>,
}

impl PlaceholderTable {
    pub fn get(&self, index: usize) -> Option<&Placeholder> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Placeholder> {
        self.entries.iter()
    }
}

/// Output of the correction pass.
#[derive(Debug)]
pub struct Correction {
    /// The corrected buffer. Same as the input buffer when nothing was rewritten.
    pub buffer: BufferId,
    pub tree: SyntaxTree,
    pub placeholders: PlaceholderTable,
}

/// Rewrites `_ComptimeType(...)` occurrences into placeholder identifiers so
/// the file parses as ordinary C.
pub struct CorrectionPass<'p> {
    parser: &'p mut CParser,
}

struct Found {
    shape: OccurrenceShape,
    form: Form,
}

impl<'p> CorrectionPass<'p> {
    pub fn new(parser: &'p mut CParser) -> Self {
        Self { parser }
    }

    pub fn run(&mut self, sources: &mut SourceMap, tree: &SyntaxTree) -> Result<Correction, AnalysisError> {
        let mut found = Vec::new();
        let mut covered_until = 0;
        collect(sources, tree, tree.root(), &mut found, &mut covered_until)?;
        log::debug!("type correction: {} occurrence(s)", found.len());

        if found.is_empty() {
            return Ok(Correction {
                buffer: tree.buffer(),
                tree: tree.clone(),
                placeholders: PlaceholderTable::default(),
            });
        }

        let mut splicer = Splicer::new(tree.source());
        let mut entries = Vec::with_capacity(found.len());
        for (index, Found { shape, form }) in found.into_iter().enumerate() {
            log::trace!("placeholder {} from {:?} at {:?}", index, shape, form.occurrence);
            splicer.replace(form.occurrence.clone(), &keywords::placeholder(index))?;
            entries.push(Placeholder {
                index,
                shape,
                occurrence: Slice::new(tree.buffer(), form.occurrence),
                body: Slice::new(tree.buffer(), form.body),
            });
        }

        let name = sources.get(tree.buffer())?.name().to_string();
        let buffer = sources.add(Stage::Corrected, name, splicer.finish());
        let corrected = self.parser.parse(sources.get(buffer)?)?;
        Ok(Correction {
            buffer,
            tree: corrected,
            placeholders: PlaceholderTable { entries },
        })
    }
}

fn collect(
    sources: &SourceMap,
    tree: &SyntaxTree,
    node: Node<'_>,
    found: &mut Vec<Found>,
    covered_until: &mut usize,
) -> Result<(), AnalysisError> {
    if node.end_byte() <= *covered_until {
        return Ok(());
    }

    let kind = NodeKind::of(&node);
    let keyword = match kind {
        // the macro's own name, never an occurrence
        NodeKind::PreprocDef | NodeKind::PreprocFunctionDef => return Ok(()),
        NodeKind::CallExpression => node
            .child_by_field_name("function")
            .map(|callee| (callee, OccurrenceShape::CallExpression)),
        NodeKind::MacroTypeSpecifier => node
            .child_by_field_name("name")
            .map(|name| (name, OccurrenceShape::MacroTypeSpecifier)),
        NodeKind::TypeDescriptor => node
            .child_by_field_name("type")
            .map(|ty| (ty, OccurrenceShape::TypeDescriptor)),
        kind if kind.is_identifier() => Some((node, OccurrenceShape::Bare)),
        _ => None,
    };

    if let Some((keyword, shape)) = keyword {
        if keyword.start_byte() >= *covered_until && tree.text(keyword) == keywords::COMPTIME_TYPE {
            let form = occurrence(sources, tree, keyword)?;
            *covered_until = form.occurrence.end;
            let shape = if recovered(tree.root(), &form.occurrence) {
                OccurrenceShape::ErrorRecovery
            } else {
                shape
            };
            found.push(Found { shape, form });
            return Ok(());
        }
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    for child in children {
        collect(sources, tree, child, found, covered_until)?;
    }
    Ok(())
}

/// Whether an ERROR or MISSING node overlaps `range`.
fn recovered(node: Node<'_>, range: &Range<usize>) -> bool {
    if !node.has_error() || node.end_byte() <= range.start || node.start_byte() >= range.end {
        return false;
    }
    if node.is_error() || node.is_missing() {
        return true;
    }
    let mut cursor = node.walk();
    let overlapping = node.children(&mut cursor).any(|child| recovered(child, range));
    overlapping
}

fn occurrence(sources: &SourceMap, tree: &SyntaxTree, keyword: Node<'_>) -> Result<Form, AnalysisError> {
    let source = tree.source();
    let Some(form) = form_after(source, keyword.byte_range()) else {
        return Err(AnalysisError::MalformedComptimeType {
            src: sources.get(tree.buffer())?.named_source(),
            span: create_span(&keyword),
        });
    };
    if form.body.is_empty() {
        return Err(AnalysisError::EmptyComptime {
            keyword: keywords::COMPTIME_TYPE.to_string(),
            src: sources.get(tree.buffer())?.named_source(),
            span: span_of(&form.occurrence),
        });
    }
    Ok(form)
}

pub(crate) fn span_of(range: &Range<usize>) -> miette::SourceSpan {
    (range.start, range.end - range.start).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correct(source: &str) -> (SourceMap, Correction) {
        let mut parser = CParser::new().unwrap();
        let mut sources = SourceMap::new();
        let id = sources.add(Stage::MacroExpanded, "test.c", source);
        let tree = parser.parse(sources.get(id).unwrap()).unwrap();
        let correction = CorrectionPass::new(&mut parser).run(&mut sources, &tree).unwrap();
        (sources, correction)
    }

    #[test]
    fn test_function_return_type() {
        let (sources, correction) = correct("_ComptimeType(fn(_ComptimeCtx)) make(void) { return 0; }\n");
        assert_eq!(correction.tree.source(), "_COMPTIMETYPE_0 make(void) { return 0; }\n");
        assert_eq!(correction.placeholders.len(), 1);

        let placeholder = correction.placeholders.get(0).unwrap();
        assert_eq!(sources.resolve(placeholder.body).unwrap(), "fn(_ComptimeCtx)");
        assert_eq!(
            sources.resolve(placeholder.occurrence).unwrap(),
            "_ComptimeType(fn(_ComptimeCtx))"
        );
        assert_eq!(sources.get(correction.buffer).unwrap().stage(), Stage::Corrected);
    }

    #[test]
    fn test_placeholders_numbered_in_order() {
        let (sources, correction) = correct(
            "typedef _ComptimeType(a(_ComptimeCtx)) A;\n\
             int f(void) { return sizeof(_ComptimeType({ b(_ComptimeCtx); })); }\n",
        );
        assert_eq!(
            correction.tree.source(),
            "typedef _COMPTIMETYPE_0 A;\nint f(void) { return sizeof(_COMPTIMETYPE_1); }\n"
        );
        let bodies: Vec<_> = correction
            .placeholders
            .iter()
            .map(|p| sources.resolve(p.body).unwrap())
            .collect();
        assert_eq!(bodies, ["a(_ComptimeCtx)", "b(_ComptimeCtx)"]);
    }

    #[test]
    fn test_no_occurrences_keeps_buffer() {
        let source = "int main(void) { return 0; }\n";
        let (_, correction) = correct(source);
        assert!(correction.placeholders.is_empty());
        assert_eq!(correction.tree.source(), source);
        assert_eq!(correction.buffer, correction.tree.buffer());
    }

    fn shapes(source: &str) -> Vec<OccurrenceShape> {
        let (_, correction) = correct(source);
        correction.placeholders.iter().map(|p| p.shape).collect()
    }

    #[test]
    fn test_shape_in_expression() {
        assert_eq!(
            shapes("int size = _ComptimeType(make(_ComptimeCtx));\n"),
            [OccurrenceShape::CallExpression]
        );
    }

    #[test]
    fn test_shape_in_typedef() {
        assert_eq!(
            shapes("typedef _ComptimeType(make(_ComptimeCtx)) Made;\n"),
            [OccurrenceShape::MacroTypeSpecifier]
        );
    }

    #[test]
    fn test_shape_in_cast() {
        let found = shapes("int v = (_ComptimeType(make(_ComptimeCtx)))0;\n");
        assert!(
            matches!(
                found[..],
                [OccurrenceShape::TypeDescriptor | OccurrenceShape::MacroTypeSpecifier]
            ),
            "{found:?}"
        );
    }

    #[test]
    fn test_shape_as_field_name() {
        let (_, correction) = correct("int v = obj._ComptimeType(make(_ComptimeCtx));\n");
        assert_eq!(correction.tree.source(), "int v = obj._COMPTIMETYPE_0;\n");
        assert_eq!(correction.placeholders.get(0).unwrap().shape, OccurrenceShape::Bare);
    }

    #[test]
    fn test_statements_inside_type_form_are_recovered() {
        let source = "typedef _ComptimeType(first(_ComptimeCtx); second(_ComptimeCtx)) Pair;\n";
        let (sources, correction) = correct(source);

        let placeholder = correction.placeholders.get(0).unwrap();
        assert_eq!(placeholder.shape, OccurrenceShape::ErrorRecovery);
        assert_eq!(
            sources.resolve(placeholder.body).unwrap(),
            "first(_ComptimeCtx); second(_ComptimeCtx)"
        );
        assert_eq!(correction.tree.source(), "typedef _COMPTIMETYPE_0 Pair;\n");
        assert!(!correction.tree.has_errors());
    }

    #[test]
    fn test_macro_name_is_not_an_occurrence() {
        let source = "#define _ComptimeType int\n";
        let (_, correction) = correct(source);
        assert!(correction.placeholders.is_empty());
    }
}
