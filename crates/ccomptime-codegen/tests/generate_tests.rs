use ccomptime_analysis::{analyze, CorrectionPass};
use ccomptime_codegen::{generate, header_prelude, RunnerArtifacts, COMPILING_PREFIX};
use ccomptime_source::{SourceMap, Stage};
use ccomptime_syntax::CParser;
use expect_test::expect;

fn render(source: &str) -> (SourceMap, RunnerArtifacts) {
    let mut parser = CParser::new().unwrap();
    let mut sources = SourceMap::new();
    let id = sources.add(Stage::Raw, "input.c", source);
    let tree = parser.parse(sources.get(id).unwrap()).unwrap();
    let correction = CorrectionPass::new(&mut parser).run(&mut sources, &tree).unwrap();
    let analysis = analyze(&sources, &correction.tree, &correction.placeholders).unwrap();
    let artifacts = generate(&mut sources, correction.buffer, &analysis).unwrap();
    (sources, artifacts)
}

#[test]
fn test_inline_value_statement() {
    let (sources, artifacts) = render(
        "int a = _Comptime(_ComptimeCtx.Inline.appendf(\"42\"));\n\
         int main(void) { return a; }\n",
    );

    assert_eq!(
        artifacts.definitions,
        "/* comptime statement #0 */\n\
         static void _Comptime_exec_0(_ComptimeCtx _ComptimeCtx) {\n\
         (void)_ComptimeCtx;\n\
         _ComptimeCtx.Inline.appendf(\"42\");\n\
         }\n\n"
    );
    assert_eq!(
        artifacts.registrations,
        "__Comptime_Register_Main_Exec(0); // execute comptime statement #0\n"
    );
    assert_eq!(artifacts.comptime_safe, format!("{COMPILING_PREFIX}\n\n"));

    let safe = sources.get(artifacts.comptime_safe_buffer).unwrap();
    assert_eq!(safe.stage(), Stage::ComptimeSafe);
    assert_eq!(safe.text(), artifacts.comptime_safe);
}

#[test]
fn test_type_statement_keeps_unrelated_code() {
    let (_, artifacts) = render(
        "_ComptimeType(fn(_ComptimeCtx)) make(void) { return 0; }\n\
         int keep(void) { return 1; }\n",
    );

    assert_eq!(
        artifacts.registrations,
        "__Comptime_Register_Type_Exec(0, 0); // execute comptime statement #0\n"
    );
    assert!(artifacts.definitions.contains("\nfn(_ComptimeCtx);\n"));
    assert_eq!(
        artifacts.comptime_safe,
        "\n#define _COMPILING\n\nint keep(void) { return 1; }\n"
    );
}

#[test]
fn test_mixed_registrations() {
    let (_, artifacts) = render(
        "int a = _Comptime(one(_ComptimeCtx));\n\
         typedef _ComptimeType(two(_ComptimeCtx)) T;\n\
         int b = _Comptime(three(_ComptimeCtx));\n",
    );

    expect![[r#"
        __Comptime_Register_Main_Exec(0); // execute comptime statement #0
        __Comptime_Register_Type_Exec(1, 0); // execute comptime statement #1
        __Comptime_Register_Main_Exec(2); // execute comptime statement #2
    "#]]
    .assert_eq(&artifacts.registrations);
}

#[test]
fn test_plain_file_has_no_statements() {
    let source = "int main(void) { return 0; }\n";
    let (_, artifacts) = render(source);
    assert!(artifacts.definitions.is_empty());
    assert!(artifacts.registrations.is_empty());
    assert_eq!(artifacts.comptime_safe, format!("{COMPILING_PREFIX}{source}"));
}

#[test]
fn test_header_prelude() {
    let prelude = header_prelude();
    let (marker, rest) = prelude.split_once('\n').unwrap();
    assert_eq!(
        marker,
        format!("/* @generated by ccomptime v{} */", env!("CARGO_PKG_VERSION"))
    );

    expect![[r#"
        #pragma once
        #ifdef _COMPILING
        #undef _Comptime
        #undef _ComptimeType
        #define _Comptime(...) /* stripped comptime */
        #define _ComptimeType(...) /* stripped comptime type */
        #else
        #undef _Comptime
        #undef _ComptimeType
        #define _CONCAT_(x, y) x##y
        #define CONCAT(x, y) _CONCAT_(x, y)
        #define _Comptime(...) _COMPTIME_X(__COUNTER__, __VA_ARGS__)
        #define _ComptimeType(...) _COMPTIME_X(__COUNTER__, __VA_ARGS__)
        #define _COMPTIME_X(n, ...) CONCAT(_PLACEHOLDER_COMPTIME_X, n)(__VA_ARGS__)
        #endif
    "#]]
    .assert_eq(rest);
}
