use ccomptime_analysis::{analyze, Analysis, ComptimeStatement, CorrectionPass, DependencySet, PlaceholderTable};
use ccomptime_codegen::{generate, RunnerArtifacts};
use ccomptime_expand::{MacroExpander, DEFAULT_MAX_DEPTH};
use ccomptime_source::{BufferId, SourceMap, Stage};
use ccomptime_syntax::{dump_tree, CParser, SyntaxTree};

use crate::PipelineError;

/// Everything produced while transforming one file.
#[derive(Debug)]
pub struct Transformation {
    /// Every buffer created along the way, intermediate ones included.
    pub sources: SourceMap,
    pub raw: BufferId,
    pub expanded: BufferId,
    pub corrected: BufferId,
    pub placeholders: PlaceholderTable,
    pub analysis: Analysis,
    pub artifacts: RunnerArtifacts,
}

impl Transformation {
    pub fn statements(&self) -> &[ComptimeStatement] {
        &self.analysis.statements
    }

    pub fn dependencies(&self) -> &DependencySet {
        &self.analysis.dependencies
    }

    pub fn artifacts(&self) -> &RunnerArtifacts {
        &self.artifacts
    }
}

/// The per-file source-to-source pipeline.
///
/// parse -> expand macros -> correct `_ComptimeType` -> analyze -> generate
pub struct Pipeline<'p> {
    parser: &'p mut CParser,
    emit_stages: bool,
    max_depth: usize,
}

impl<'p> Pipeline<'p> {
    pub fn new(parser: &'p mut CParser) -> Self {
        Self {
            parser,
            emit_stages: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Log the text of each stage's buffer at info level.
    pub fn with_emit_stages(mut self, emit_stages: bool) -> Self {
        self.emit_stages = emit_stages;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn run(&mut self, name: &str, text: &str) -> Result<Transformation, PipelineError> {
        let mut sources = SourceMap::new();
        let raw = sources.add(Stage::Raw, name, text);
        let tree = self.parser.parse(sources.get(raw)?)?;
        trace_tree(&tree, Stage::Raw);

        log::debug!("{}: expanding macros", name);
        let expansion = MacroExpander::new(self.parser)
            .with_max_depth(self.max_depth)
            .expand(&mut sources, &tree)?;
        trace_tree(&expansion.tree, Stage::MacroExpanded);

        log::debug!("{}: correcting comptime types", name);
        let correction = CorrectionPass::new(self.parser).run(&mut sources, &expansion.tree)?;
        trace_tree(&correction.tree, Stage::Corrected);

        log::debug!("{}: analyzing dependencies", name);
        let analysis = analyze(&sources, &correction.tree, &correction.placeholders)?;

        log::debug!("{}: generating runner", name);
        let artifacts = generate(&mut sources, correction.buffer, &analysis)?;

        if self.emit_stages {
            for buffer in [raw, expansion.buffer, correction.buffer, artifacts.comptime_safe_buffer] {
                let buffer = sources.get(buffer)?;
                log::info!("--- {} ({}) ---\n{}", buffer.name(), buffer.stage(), buffer.text());
            }
        }
        log::info!(
            "{}: {} comptime statement(s), {} placeholder(s)",
            name,
            analysis.statements.len(),
            correction.placeholders.len()
        );

        Ok(Transformation {
            sources,
            raw,
            expanded: expansion.buffer,
            corrected: correction.buffer,
            placeholders: correction.placeholders,
            analysis,
            artifacts,
        })
    }
}

fn trace_tree(tree: &SyntaxTree, stage: Stage) {
    if log::log_enabled!(log::Level::Trace) {
        log::trace!("{} tree:\n{}", stage, dump_tree(tree, usize::MAX));
    }
}
