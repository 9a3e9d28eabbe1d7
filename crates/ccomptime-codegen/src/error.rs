use ccomptime_analysis::AnalysisError;
use ccomptime_source::SourceError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CodegenError {
    #[error("comptime statement #{index} has no code to run")]
    #[diagnostic(code(ccomptime::codegen::empty_statement))]
    EmptyStatement { index: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),
}
