use ccomptime_source::SourceError;
use ccomptime_syntax::SyntaxError;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ExpandError {
    #[error("macro `{name}` has {sites} parameter occurrence(s) but was given {arguments} argument(s)")]
    #[diagnostic(
        code(ccomptime::expand::replacement_count),
        help("each parameter of a comptime macro must appear exactly once in its body")
    )]
    ReplacementCountMismatch {
        name: String,
        sites: usize,
        arguments: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("expanded here")]
        span: SourceSpan,
    },

    #[error("macro `{name}` takes {expected} argument(s) but {found} were supplied")]
    #[diagnostic(code(ccomptime::expand::arity))]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("in this invocation")]
        span: SourceSpan,
    },

    #[error("unbalanced parentheses in invocation of macro `{name}`")]
    #[diagnostic(code(ccomptime::expand::unbalanced))]
    UnbalancedInvocation {
        name: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("no matching `)` for this invocation")]
        span: SourceSpan,
    },

    #[error("variadic macro `{name}` contains comptime forms")]
    #[diagnostic(
        code(ccomptime::expand::variadic),
        help("comptime macros only support positional parameters")
    )]
    UnsupportedVariadic {
        name: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("defined here")]
        span: SourceSpan,
    },

    #[error("expansion of macro `{name}` exceeded the nesting limit of {limit}")]
    #[diagnostic(code(ccomptime::expand::recursion_limit))]
    RecursionLimit { name: String, limit: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),
}
