use ccomptime_source::{SourceMap, Stage};
use ccomptime_syntax::{collect_parse_errors, dump_tree, CParser};

fn main() {
    // Create a parser instance
    let mut parser = CParser::new().expect("Failed to create parser");

    let sample_code = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path).expect("Failed to read input file"),
        None => r#"
#define add(T, a, b) _Comptime(poly_add(_ComptimeCtx, #T, #a, #b))

_ComptimeType(make_type(_ComptimeCtx)) build(void) { return 0; }

int main(void) {
    int m = add(int, 5, 10);
    return m;
}
"#
        .to_string(),
    };

    let mut map = SourceMap::new();
    let id = map.add(Stage::Raw, "sample.c", sample_code);
    let tree = parser.parse(map.get(id).expect("buffer just added")).expect("Failed to parse code");

    println!("{}", dump_tree(&tree, 64));
    for error in collect_parse_errors(&tree) {
        println!("{error:?}");
    }
}
