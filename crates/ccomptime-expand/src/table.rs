use std::ops::Range;
use std::sync::Arc;

use ccomptime_source::{Slice, SourceMap, Splicer, Stage};
use ccomptime_syntax::{create_span, keywords, CParser, Node, NodeKind, SyntaxTree};
use rustc_hash::FxHashMap;

use crate::ExpandError;

/// How a macro is invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroShape {
    /// `#define NAME body`
    ObjectLike,
    /// `#define NAME(a, b) body`, possibly with no parameters.
    FunctionLike { params: Vec<String> },
}

/// A comptime-relevant `#define`.
#[derive(Debug, Clone)]
pub struct MacroDefinition {
    name: String,
    shape: MacroShape,
    body: SyntaxTree,
    defined_at: Slice,
}

impl MacroDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &MacroShape {
        &self.shape
    }

    pub fn params(&self) -> &[String] {
        match &self.shape {
            MacroShape::ObjectLike => &[],
            MacroShape::FunctionLike { params } => params,
        }
    }

    pub fn is_function_like(&self) -> bool {
        matches!(self.shape, MacroShape::FunctionLike { .. })
    }

    /// The replacement text, parsed on its own.
    pub fn body(&self) -> &SyntaxTree {
        &self.body
    }

    /// The `#define` this definition came from.
    pub fn defined_at(&self) -> Slice {
        self.defined_at
    }

    /// Substitutes `arguments` into the body.
    ///
    /// Returns the number of replacement sites found along with the text, so
    /// the caller can enforce one site per argument.
    pub fn substitute(&self, arguments: &[&str]) -> Result<(usize, String), ExpandError> {
        let mut sites = Vec::new();
        self.collect_parameter_sites(self.body.root(), arguments, &mut sites);
        sites.sort_by_key(|(range, _)| range.start);

        let source = self.body.source();
        let mut splicer = Splicer::new(source);
        for (range, replacement) in &sites {
            splicer.replace(range.clone(), replacement)?;
        }
        Ok((sites.len(), splicer.finish()))
    }

    fn param_index(&self, name: &str) -> Option<usize> {
        self.params().iter().position(|param| param == name)
    }

    fn collect_parameter_sites(&self, node: Node<'_>, arguments: &[&str], sites: &mut Vec<(Range<usize>, String)>) {
        let kind = NodeKind::of(&node);
        if kind == NodeKind::PreprocDirective {
            // `#param` lexed as a directive token
            let text = self.body.text(node);
            let name = text.trim_start_matches('#').trim_start();
            if let Some(arg) = self.param_index(name).and_then(|i| arguments.get(i)) {
                sites.push((node.byte_range(), stringify(arg)));
            }
            return;
        }

        if kind.is_identifier() {
            if let Some(arg) = self.param_index(self.body.text(node)).and_then(|i| arguments.get(i)) {
                match stringify_operator(self.body.source(), node.start_byte()) {
                    Some(hash) => sites.push((hash..node.end_byte(), stringify(arg))),
                    None => sites.push((node.byte_range(), arg.to_string())),
                }
            }
            return;
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.collect_parameter_sites(child, arguments, sites);
        }
    }
}

/// Offset of a lone `#` directly before `start`, ignoring blanks.
fn stringify_operator(source: &str, start: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut pos = start;
    while pos > 0 && matches!(bytes[pos - 1], b' ' | b'\t') {
        pos -= 1;
    }
    if pos == 0 || bytes[pos - 1] != b'#' {
        return None;
    }
    if pos >= 2 && bytes[pos - 2] == b'#' {
        return None;
    }
    Some(pos - 1)
}

fn stringify(argument: &str) -> String {
    let mut out = String::with_capacity(argument.len() + 2);
    out.push('"');
    for c in argument.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Comptime-relevant macros known so far in the current file.
#[derive(Debug, Default)]
pub struct MacroTable {
    macros: FxHashMap<String, Arc<MacroDefinition>>,
}

impl MacroTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<MacroDefinition>> {
        self.macros.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<MacroDefinition>> {
        self.macros.remove(name)
    }

    pub fn len(&self) -> usize {
        self.macros.len()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Registers the `#define` at `node` if its body is comptime-relevant.
    ///
    /// An irrelevant redefinition of a known name removes the old entry.
    pub fn define(
        &mut self,
        parser: &mut CParser,
        sources: &mut SourceMap,
        tree: &SyntaxTree,
        node: Node<'_>,
    ) -> Result<Option<Arc<MacroDefinition>>, ExpandError> {
        let Some(name_node) = node.child_by_field_name("name") else {
            return Ok(None);
        };
        let name = tree.text(name_node).to_string();

        let mut variadic = false;
        let shape = match node.child_by_field_name("parameters") {
            Some(params) if NodeKind::of(&node) == NodeKind::PreprocFunctionDef => {
                let mut names = Vec::new();
                let mut cursor = params.walk();
                for param in params.children(&mut cursor) {
                    if NodeKind::of(&param) == NodeKind::Identifier {
                        names.push(tree.text(param).to_string());
                    } else if param.kind() == "..." {
                        variadic = true;
                    }
                }
                MacroShape::FunctionLike { params: names }
            }
            _ => MacroShape::ObjectLike,
        };

        let body_text = node
            .child_by_field_name("value")
            .map(|value| tree.text(value).trim_end())
            .unwrap_or("");
        if body_text.is_empty() {
            return Ok(self.forget(&name));
        }

        let id = sources.add(Stage::MacroBody, format!("#define {name}"), body_text);
        let body = parser.parse(sources.get(id)?)?;
        let params = match &shape {
            MacroShape::ObjectLike => &[][..],
            MacroShape::FunctionLike { params } => &params[..],
        };
        if !self.mentions_comptime(&body, body.root(), params) {
            return Ok(self.forget(&name));
        }
        if variadic {
            return Err(ExpandError::UnsupportedVariadic {
                name,
                src: sources.get(tree.buffer())?.named_source(),
                span: create_span(&node),
            });
        }

        let definition = Arc::new(MacroDefinition {
            name: name.clone(),
            shape,
            body,
            defined_at: tree.slice(node),
        });
        log::debug!("registered comptime macro `{}` ({} params)", name, definition.params().len());
        self.macros.insert(name, Arc::clone(&definition));
        Ok(Some(definition))
    }

    fn forget(&mut self, name: &str) -> Option<Arc<MacroDefinition>> {
        if self.macros.remove(name).is_some() {
            log::debug!("`{}` redefined without comptime forms, dropped", name);
        }
        None
    }

    /// Whether the body uses a comptime keyword or a known comptime macro.
    fn mentions_comptime(&self, body: &SyntaxTree, node: Node<'_>, params: &[String]) -> bool {
        if let Some(text) = body.identifier_text(node) {
            return keywords::is_comptime_keyword(text)
                || (self.macros.contains_key(text) && !params.iter().any(|p| p == text));
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        children
            .into_iter()
            .any(|child| self.mentions_comptime(body, child, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defines(source: &str) -> (MacroTable, SourceMap) {
        let mut parser = CParser::new().unwrap();
        let mut sources = SourceMap::new();
        let id = sources.add(Stage::Raw, "test.c", source);
        let tree = parser.parse(sources.get(id).unwrap()).unwrap();
        let mut table = MacroTable::new();

        let mut cursor = tree.root().walk();
        let nodes: Vec<_> = tree.root().children(&mut cursor).collect();
        for node in nodes {
            if NodeKind::of(&node).is_macro_definition() {
                table.define(&mut parser, &mut sources, &tree, node).unwrap();
            }
        }
        (table, sources)
    }

    #[test]
    fn test_only_comptime_macros_are_registered() {
        let (table, _) = defines(
            "#define PLAIN(x) ((x) + 1)\n\
             #define CT(x) _Comptime(x)\n\
             #define TY _ComptimeType(make(_ComptimeCtx))\n\
             #define EMPTY\n",
        );
        assert!(table.contains("CT"));
        assert!(table.contains("TY"));
        assert!(!table.contains("PLAIN"));
        assert!(!table.contains("EMPTY"));
        assert_eq!(table.get("CT").unwrap().params(), ["x".to_string()]);
        assert_eq!(*table.get("TY").unwrap().shape(), MacroShape::ObjectLike);
    }

    #[test]
    fn test_transitively_relevant_macro() {
        let (table, _) = defines(
            "#define CT(x) _Comptime(x)\n\
             #define WRAP(y) CT(y)\n\
             #define LATER(z) NOT_YET(z)\n\
             #define NOT_YET(x) _Comptime(x)\n",
        );
        assert!(table.contains("WRAP"));
        assert!(!table.contains("LATER"));
        assert!(table.contains("NOT_YET"));
    }

    #[test]
    fn test_irrelevant_redefinition_drops_macro() {
        let (table, _) = defines(
            "#define CT(x) _Comptime(x)\n\
             #define CT(x) (x)\n",
        );
        assert!(table.is_empty());
    }

    #[test]
    fn test_substitute_raw_and_stringified() {
        let (table, _) = defines("#define show(v, label) _Comptime(print(_ComptimeCtx, v, #label))\n");
        let show = table.get("show").unwrap();
        let (sites, text) = show.substitute(&["1 + 2", "sum"]).unwrap();
        assert_eq!(sites, 2);
        assert_eq!(text, "_Comptime(print(_ComptimeCtx, 1 + 2, \"sum\"))");
    }

    #[test]
    fn test_substitute_counts_repeated_parameters() {
        let (table, _) = defines("#define M(p) _Comptime(p + p)\n");
        let (sites, _) = table.get("M").unwrap().substitute(&["5"]).unwrap();
        assert_eq!(sites, 2);
    }

    #[test]
    fn test_stringify_escapes_quotes() {
        assert_eq!(stringify("\"hi\""), "\"\\\"hi\\\"\"");
        assert_eq!(stringify_operator("a ## b", 5), None);
        assert_eq!(stringify_operator("f(# b)", 4), Some(2));
    }
}
