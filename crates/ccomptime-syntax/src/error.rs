use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("Failed to load the C grammar: {0}")]
    #[diagnostic(
        code(ccomptime::syntax::grammar),
        help("The linked tree-sitter-c grammar is incompatible with the tree-sitter runtime")
    )]
    ParserInitError(String),

    #[error("C parse error: {message}")]
    #[diagnostic(code(ccomptime::syntax::parse_error))]
    ParseError {
        message: String,
        #[label("here")]
        span: Option<SourceSpan>,
    },
}
