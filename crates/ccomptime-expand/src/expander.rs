use std::ops::Range;
use std::sync::Arc;

use ccomptime_source::{scan, BufferId, SourceMap, Splicer, Stage};
use ccomptime_syntax::{create_span, CParser, Node, NodeKind, SyntaxTree};

use crate::{ExpandError, MacroDefinition, MacroTable};

/// Nesting limit for expansions that keep producing further invocations.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Result of expanding one file.
#[derive(Debug)]
pub struct Expansion {
    /// The expanded buffer. Same as the input buffer when nothing expanded.
    pub buffer: BufferId,
    pub tree: SyntaxTree,
    /// Invocations replaced at the top level of the file.
    pub expanded_sites: usize,
}

#[derive(Debug)]
struct Site {
    range: Range<usize>,
    replacement: String,
}

/// Per-tree walk state.
struct Walk {
    sites: Vec<Site>,
    covered_until: usize,
    depth: usize,
    /// Macros currently being expanded, which must not expand again.
    masked: Vec<String>,
}

/// Expands comptime-relevant macros by rewriting parsed trees.
pub struct MacroExpander<'p> {
    parser: &'p mut CParser,
    table: MacroTable,
    max_depth: usize,
}

impl<'p> MacroExpander<'p> {
    pub fn new(parser: &'p mut CParser) -> Self {
        Self {
            parser,
            table: MacroTable::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Expands every relevant invocation in `tree` into a new buffer.
    pub fn expand(&mut self, sources: &mut SourceMap, tree: &SyntaxTree) -> Result<Expansion, ExpandError> {
        let mut walk = Walk {
            sites: Vec::new(),
            covered_until: 0,
            depth: 0,
            masked: Vec::new(),
        };
        self.collect(sources, tree, tree.root(), &mut walk)?;
        log::debug!(
            "macro expansion: {} comptime macro(s), {} site(s)",
            self.table.len(),
            walk.sites.len()
        );

        if walk.sites.is_empty() {
            return Ok(Expansion {
                buffer: tree.buffer(),
                tree: tree.clone(),
                expanded_sites: 0,
            });
        }

        let expanded_sites = walk.sites.len();
        let text = splice_sites(tree.source(), &walk.sites)?;
        let name = sources.get(tree.buffer())?.name().to_string();
        let buffer = sources.add(Stage::MacroExpanded, name, text);
        let tree = self.parser.parse(sources.get(buffer)?)?;
        Ok(Expansion {
            buffer,
            tree,
            expanded_sites,
        })
    }

    fn collect(
        &mut self,
        sources: &mut SourceMap,
        tree: &SyntaxTree,
        node: Node<'_>,
        walk: &mut Walk,
    ) -> Result<(), ExpandError> {
        if node.end_byte() <= walk.covered_until && node.start_byte() < walk.covered_until {
            return Ok(());
        }
        // A node straddling a recovered site only has its later children visited.
        let straddles = node.start_byte() < walk.covered_until;

        if !straddles {
            match NodeKind::of(&node) {
                NodeKind::PreprocDef | NodeKind::PreprocFunctionDef => {
                    self.table.define(self.parser, sources, tree, node)?;
                    return Ok(());
                }
                NodeKind::PreprocCall => {
                    self.undefine(tree, node);
                    return Ok(());
                }
                // the preprocessor never expands `defined(NAME)`
                NodeKind::PreprocDefined => return Ok(()),
                NodeKind::CallExpression => {
                    if self.expand_call(sources, tree, node, walk)? {
                        return Ok(());
                    }
                }
                kind if kind.is_identifier() => {
                    self.expand_identifier(sources, tree, node, walk)?;
                    return Ok(());
                }
                _ => {}
            }
        }

        // nor the name tested by `#ifdef`, `#ifndef` and `#elifdef`
        let tested_name = match NodeKind::of(&node) {
            NodeKind::PreprocIfdef => node.child_by_field_name("name").map(|name| name.id()),
            _ => None,
        };
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        for child in children {
            if Some(child.id()) == tested_name {
                continue;
            }
            self.collect(sources, tree, child, walk)?;
        }
        Ok(())
    }

    fn undefine(&mut self, tree: &SyntaxTree, node: Node<'_>) {
        let directive = node.child_by_field_name("directive").map(|d| tree.text(d).trim());
        let is_undef = directive
            .and_then(|d| d.strip_prefix('#'))
            .is_some_and(|d| d.trim_start() == "undef");
        if !is_undef {
            return;
        }
        if let Some(argument) = node.child_by_field_name("argument") {
            let name = tree.text(argument).trim();
            if self.table.remove(name).is_some() {
                log::debug!("#undef {}", name);
            }
        }
    }

    fn lookup(&self, name: &str, walk: &Walk) -> Option<Arc<MacroDefinition>> {
        if walk.masked.iter().any(|masked| masked == name) {
            return None;
        }
        self.table.get(name).cloned()
    }

    /// `NAME(args)` parsed as a call expression.
    fn expand_call(
        &mut self,
        sources: &mut SourceMap,
        tree: &SyntaxTree,
        node: Node<'_>,
        walk: &mut Walk,
    ) -> Result<bool, ExpandError> {
        let (Some(callee), Some(arguments)) = (
            node.child_by_field_name("function"),
            node.child_by_field_name("arguments"),
        ) else {
            return Ok(false);
        };
        let Some(definition) = tree.identifier_text(callee).and_then(|name| self.lookup(name, walk)) else {
            return Ok(false);
        };
        if !definition.is_function_like() || arguments.has_error() {
            // object-like names and damaged argument lists go through the identifier path
            return Ok(false);
        }

        let list = tree.text(arguments);
        let inner = list
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .unwrap_or("");
        let args: Vec<&str> = scan::split_arguments(inner)
            .into_iter()
            .map(|range| &inner[range])
            .collect();
        self.expand_site(sources, tree, &definition, node.byte_range(), &args, walk)?;
        Ok(true)
    }

    /// A macro name outside a call expression.
    ///
    /// Object-like macros expand in place. Function-like macros only expand
    /// when followed by `(`, and the argument list is recovered from text.
    fn expand_identifier(
        &mut self,
        sources: &mut SourceMap,
        tree: &SyntaxTree,
        node: Node<'_>,
        walk: &mut Walk,
    ) -> Result<(), ExpandError> {
        let Some(definition) = self.lookup(tree.text(node), walk) else {
            return Ok(());
        };
        if !definition.is_function_like() {
            return self.expand_site(sources, tree, &definition, node.byte_range(), &[], walk);
        }

        let source = tree.source();
        let open = scan::skip_blanks(source, node.end_byte());
        if source.as_bytes().get(open) != Some(&b'(') {
            return Ok(());
        }
        let Some(close) = scan::matching_close(source, open) else {
            return Err(ExpandError::UnbalancedInvocation {
                name: definition.name().to_string(),
                src: sources.get(tree.buffer())?.named_source(),
                span: create_span(&node),
            });
        };

        let inner = &source[open + 1..close];
        let args: Vec<&str> = scan::split_arguments(inner)
            .into_iter()
            .map(|range| &inner[range])
            .collect();
        self.expand_site(sources, tree, &definition, node.start_byte()..close + 1, &args, walk)
    }

    fn expand_site(
        &mut self,
        sources: &mut SourceMap,
        tree: &SyntaxTree,
        definition: &MacroDefinition,
        range: Range<usize>,
        args: &[&str],
        walk: &mut Walk,
    ) -> Result<(), ExpandError> {
        let name = definition.name();
        let span = (range.start, range.end - range.start);

        if definition.is_function_like() && args.len() != definition.params().len() {
            return Err(ExpandError::ArityMismatch {
                name: name.to_string(),
                expected: definition.params().len(),
                found: args.len(),
                src: sources.get(tree.buffer())?.named_source(),
                span: span.into(),
            });
        }

        let (sites, substituted) = definition.substitute(args)?;
        if sites != args.len() {
            return Err(ExpandError::ReplacementCountMismatch {
                name: name.to_string(),
                sites,
                arguments: args.len(),
                src: sources.get(tree.buffer())?.named_source(),
                span: span.into(),
            });
        }

        let depth = walk.depth + 1;
        if depth > self.max_depth {
            return Err(ExpandError::RecursionLimit {
                name: name.to_string(),
                limit: self.max_depth,
            });
        }
        log::trace!("expanding `{}` at {:?} (depth {})", name, range, depth);

        // the substituted text may itself contain relevant invocations
        let buffer = sources.add(Stage::MacroExpansion, format!("{name}!"), substituted);
        let expansion = self.parser.parse(sources.get(buffer)?)?;
        let mut masked = walk.masked.clone();
        masked.push(name.to_string());
        let mut inner = Walk {
            sites: Vec::new(),
            covered_until: 0,
            depth,
            masked,
        };
        self.collect(sources, &expansion, expansion.root(), &mut inner)?;
        let replacement = splice_sites(expansion.source(), &inner.sites)?;

        walk.covered_until = range.end;
        walk.sites.push(Site { range, replacement });
        Ok(())
    }
}

fn splice_sites(source: &str, sites: &[Site]) -> Result<String, ExpandError> {
    let mut splicer = Splicer::new(source);
    for site in sites {
        splicer.replace(site.range.clone(), &site.replacement)?;
    }
    Ok(splicer.finish())
}
