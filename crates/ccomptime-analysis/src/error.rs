use std::ops::Range;

use ccomptime_source::SourceError;
use ccomptime_syntax::SyntaxError;
use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AnalysisError {
    #[error("Invalid use of `_Comptime`")]
    #[diagnostic(
        code(ccomptime::analysis::invalid_use),
        help("`_Comptime` must be invoked with its code in parentheses: `_Comptime(code)`")
    )]
    InvalidComptimeUse {
        #[source_code]
        src: NamedSource<String>,
        #[label("not followed by a parenthesised body")]
        span: SourceSpan,
    },

    #[error("Redefining `{keyword}` macro is not supported")]
    #[diagnostic(code(ccomptime::analysis::redefinition))]
    ComptimeRedefinition {
        keyword: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("redefined here")]
        span: SourceSpan,
    },

    #[error("Empty `{keyword}` blocks are not allowed")]
    #[diagnostic(code(ccomptime::analysis::empty_body))]
    EmptyComptime {
        keyword: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("this block has no code")]
        span: SourceSpan,
    },

    #[error("`_ComptimeType` must be followed by a balanced, parenthesised body")]
    #[diagnostic(code(ccomptime::analysis::malformed_comptime_type))]
    MalformedComptimeType {
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error("`_ComptimeType` survived placeholder correction")]
    #[diagnostic(code(ccomptime::analysis::uncorrected_comptime_type))]
    UncorrectedComptimeType {
        #[source_code]
        src: NamedSource<String>,
        #[label("expected a placeholder here")]
        span: SourceSpan,
    },

    #[error("placeholder index {index} is out of range ({count} placeholder(s) recorded)")]
    #[diagnostic(code(ccomptime::analysis::placeholder_range))]
    PlaceholderOutOfRange {
        index: usize,
        count: usize,
        #[source_code]
        src: NamedSource<String>,
        #[label("unknown placeholder")]
        span: SourceSpan,
    },

    #[error("removal ranges {first:?} and {second:?} partially overlap")]
    #[diagnostic(code(ccomptime::analysis::overlapping_removal))]
    OverlappingRemoval {
        first: Range<usize>,
        second: Range<usize>,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Source(#[from] SourceError),
}
