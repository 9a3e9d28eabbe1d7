use std::fmt::Write;

use ccomptime_analysis::{Analysis, ComptimeStatement};
use ccomptime_source::{BufferId, SourceMap, Splicer, Stage};

use crate::CodegenError;

/// Defined ahead of the comptime-safe source so both keywords expand to nothing.
pub const COMPILING_PREFIX: &str = "\n#define _COMPILING\n";

/// The four texts the runner is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerArtifacts {
    /// One `_Comptime_exec_<n>` function per statement.
    pub definitions: String,
    /// One registration line per statement, included inside the runner's `main`.
    pub registrations: String,
    /// The corrected file with comptime-dependent units erased.
    pub comptime_safe: String,
    /// The `ComptimeSafe` buffer holding `comptime_safe`.
    pub comptime_safe_buffer: BufferId,
    /// The generated header before the runner appends to it.
    pub header: String,
}

/// Renders the runner artifacts for one analyzed file.
///
/// `corrected` is the buffer the analysis ran on; removal ranges refer to it.
pub fn generate(
    sources: &mut SourceMap,
    corrected: BufferId,
    analysis: &Analysis,
) -> Result<RunnerArtifacts, CodegenError> {
    let mut definitions = String::new();
    let mut registrations = String::new();
    for statement in &analysis.statements {
        let body = sources.resolve(statement.body)?;
        if body.trim().is_empty() {
            return Err(CodegenError::EmptyStatement { index: statement.index });
        }
        write_definition(&mut definitions, statement.index, body);
        write_registration(&mut registrations, statement);
    }

    let comptime_safe = comptime_safe_source(sources, corrected, analysis)?;
    let name = sources.get(corrected)?.name().to_string();
    let comptime_safe_buffer = sources.add(Stage::ComptimeSafe, name, comptime_safe.as_str());
    log::debug!(
        "runner: {} statement(s), {} byte(s) of comptime-safe source",
        analysis.statements.len(),
        comptime_safe.len()
    );

    Ok(RunnerArtifacts {
        definitions,
        registrations,
        comptime_safe,
        comptime_safe_buffer,
        header: header_prelude(),
    })
}

fn write_definition(out: &mut String, index: usize, body: &str) {
    let _ = write!(
        out,
        "/* comptime statement #{index} */\n\
         static void _Comptime_exec_{index}(_ComptimeCtx _ComptimeCtx) {{\n\
         (void)_ComptimeCtx;\n\
         {body};\n\
         }}\n\n"
    );
}

fn write_registration(out: &mut String, statement: &ComptimeStatement) {
    let index = statement.index;
    let _ = match statement.placeholder {
        Some(placeholder) => writeln!(
            out,
            "__Comptime_Register_Type_Exec({index}, {placeholder}); // execute comptime statement #{index}"
        ),
        None => writeln!(
            out,
            "__Comptime_Register_Main_Exec({index}); // execute comptime statement #{index}"
        ),
    };
}

/// The corrected text behind [`COMPILING_PREFIX`], with every removal erased.
pub fn comptime_safe_source(
    sources: &SourceMap,
    corrected: BufferId,
    analysis: &Analysis,
) -> Result<String, CodegenError> {
    let buffer = sources.get(corrected)?;
    let mut splicer = Splicer::with_prefix(buffer.text(), COMPILING_PREFIX);
    for removal in analysis.removals.normalized()? {
        // foreign or out-of-range removals fail here
        buffer.text_of(removal)?;
        splicer.erase(removal.range())?;
    }
    Ok(splicer.finish())
}

/// The header the final compile includes ahead of the user's source.
///
/// The runner appends `_COMPTIME_X<n>` definitions to it and then rebinds
/// `_COMPTIME_X` so each call site dispatches to its own value.
pub fn header_prelude() -> String {
    format!(
        "/* @generated by ccomptime v{version} */\n\
         #pragma once\n\
         #ifdef _COMPILING\n\
         #undef _Comptime\n\
         #undef _ComptimeType\n\
         #define _Comptime(...) /* stripped comptime */\n\
         #define _ComptimeType(...) /* stripped comptime type */\n\
         #else\n\
         #undef _Comptime\n\
         #undef _ComptimeType\n\
         #define _CONCAT_(x, y) x##y\n\
         #define CONCAT(x, y) _CONCAT_(x, y)\n\
         #define _Comptime(...) _COMPTIME_X(__COUNTER__, __VA_ARGS__)\n\
         #define _ComptimeType(...) _COMPTIME_X(__COUNTER__, __VA_ARGS__)\n\
         #define _COMPTIME_X(n, ...) CONCAT(_PLACEHOLDER_COMPTIME_X, n)(__VA_ARGS__)\n\
         #endif\n",
        version = env!("CARGO_PKG_VERSION"),
    )
}
