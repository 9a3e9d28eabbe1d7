use ccomptime_source::{SourceMap, Stage};
use ccomptime_syntax::{declared_names, dump_tree, keywords, CParser, Node, NodeKind, SyntaxTree};

fn parse(source: &str) -> SyntaxTree {
    let mut map = SourceMap::new();
    let id = map.add(Stage::Raw, "test.c", source);
    let mut parser = CParser::new().expect("Failed to create parser");
    parser.parse(map.get(id).unwrap()).expect("Failed to parse code")
}

fn find_first<'t>(node: Node<'t>, kind: NodeKind) -> Option<Node<'t>> {
    if NodeKind::of(&node) == kind {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(|child| find_first(child, kind))
}

fn names(tree: &SyntaxTree, node: Node<'_>) -> Vec<String> {
    declared_names(node)
        .into_iter()
        .map(|name| tree.text(name).to_string())
        .collect()
}

#[test]
fn test_comptime_call_is_a_call_expression() {
    let tree = parse("int a = _Comptime(_ComptimeCtx.Inline.appendf(\"42\"));\n");
    assert_eq!(NodeKind::of(&tree.root()), NodeKind::TranslationUnit);

    let call = find_first(tree.root(), NodeKind::CallExpression).expect("no call expression");
    let callee = call.child_by_field_name("function").unwrap();
    assert_eq!(tree.identifier_text(callee), Some(keywords::COMPTIME));

    let declaration = find_first(tree.root(), NodeKind::Declaration).unwrap();
    assert_eq!(names(&tree, declaration), vec!["a"]);
}

#[test]
fn test_declared_names_follow_declarators() {
    let tree = parse("int a = 1, *b;\n");
    let declaration = find_first(tree.root(), NodeKind::Declaration).unwrap();
    assert_eq!(names(&tree, declaration), vec!["a", "b"]);

    let tree = parse("static int *make(void) { return 0; }\n");
    let function = find_first(tree.root(), NodeKind::FunctionDefinition).unwrap();
    assert_eq!(names(&tree, function), vec!["make"]);

    let tree = parse("typedef struct { int x; } Point;\n");
    let typedef = find_first(tree.root(), NodeKind::TypeDefinition).unwrap();
    assert_eq!(names(&tree, typedef), vec!["Point"]);
}

#[test]
fn test_function_like_define_fields() {
    let tree = parse("#define twice(x) _Comptime(x)\n");
    let define = find_first(tree.root(), NodeKind::PreprocFunctionDef).unwrap();
    assert_eq!(tree.text(define.child_by_field_name("name").unwrap()), "twice");
    assert_eq!(
        NodeKind::of(&define.child_by_field_name("parameters").unwrap()),
        NodeKind::PreprocParams
    );
    let value = define.child_by_field_name("value").unwrap();
    assert_eq!(NodeKind::of(&value), NodeKind::PreprocArg);
    assert!(tree.text(value).starts_with("_Comptime(x)"));
}

#[test]
fn test_slices_are_bound_to_the_parsed_buffer() {
    let mut map = SourceMap::new();
    let id = map.add(Stage::Corrected, "main.c", "int value;\n");
    let mut parser = CParser::new().unwrap();
    let tree = parser.parse(map.get(id).unwrap()).unwrap();

    let declaration = find_first(tree.root(), NodeKind::Declaration).unwrap();
    let slice = tree.slice(declaration);
    assert_eq!(slice.buffer(), id);
    assert_eq!(map.resolve(slice).unwrap(), "int value;");
}

#[test]
fn test_dump_tree_marks_keywords() {
    let tree = parse("int a = _Comptime(1);\n");
    let dump = dump_tree(&tree, 32);
    assert!(dump.starts_with("translation_unit [0-"));
    assert!(dump.contains("identifier ["));
    assert!(dump.contains(" _Comptime <comptime>"));
}
