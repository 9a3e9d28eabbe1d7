use tree_sitter::Node;

/// The node kinds of the C grammar that the pipeline dispatches on.
///
/// Everything else maps to [`NodeKind::Other`] and is walked through
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    TranslationUnit,
    Identifier,
    TypeIdentifier,
    FieldIdentifier,
    StatementIdentifier,
    CallExpression,
    ArgumentList,
    Declaration,
    InitDeclarator,
    FunctionDefinition,
    FunctionDeclarator,
    TypeDefinition,
    TagSpecifier,
    Enumerator,
    MacroTypeSpecifier,
    TypeDescriptor,
    PreprocDef,
    PreprocFunctionDef,
    PreprocParams,
    PreprocArg,
    PreprocDirective,
    PreprocCall,
    PreprocIf,
    PreprocIfdef,
    PreprocDefined,
    Error,
    Other,
}

impl NodeKind {
    pub fn of(node: &Node<'_>) -> Self {
        if node.is_error() {
            return NodeKind::Error;
        }
        match node.kind() {
            "translation_unit" => NodeKind::TranslationUnit,
            "identifier" => NodeKind::Identifier,
            "type_identifier" => NodeKind::TypeIdentifier,
            "field_identifier" => NodeKind::FieldIdentifier,
            "statement_identifier" => NodeKind::StatementIdentifier,
            "call_expression" => NodeKind::CallExpression,
            "argument_list" => NodeKind::ArgumentList,
            "declaration" => NodeKind::Declaration,
            "init_declarator" => NodeKind::InitDeclarator,
            "function_definition" => NodeKind::FunctionDefinition,
            "function_declarator" => NodeKind::FunctionDeclarator,
            "type_definition" => NodeKind::TypeDefinition,
            "struct_specifier" | "union_specifier" | "enum_specifier" => NodeKind::TagSpecifier,
            "enumerator" => NodeKind::Enumerator,
            "macro_type_specifier" => NodeKind::MacroTypeSpecifier,
            "type_descriptor" => NodeKind::TypeDescriptor,
            "preproc_def" => NodeKind::PreprocDef,
            "preproc_function_def" => NodeKind::PreprocFunctionDef,
            "preproc_params" => NodeKind::PreprocParams,
            "preproc_arg" => NodeKind::PreprocArg,
            "preproc_directive" => NodeKind::PreprocDirective,
            "preproc_call" => NodeKind::PreprocCall,
            "preproc_if" | "preproc_elif" | "preproc_else" => NodeKind::PreprocIf,
            "preproc_ifdef" | "preproc_elifdef" => NodeKind::PreprocIfdef,
            "preproc_defined" => NodeKind::PreprocDefined,
            _ => NodeKind::Other,
        }
    }

    /// Every alias the grammar uses for a plain C identifier token.
    pub fn is_identifier(self) -> bool {
        matches!(
            self,
            NodeKind::Identifier
                | NodeKind::TypeIdentifier
                | NodeKind::FieldIdentifier
                | NodeKind::StatementIdentifier
        )
    }

    /// `#if`, `#ifdef` and their `#elif`/`#else` branches.
    pub fn is_conditional(self) -> bool {
        matches!(self, NodeKind::PreprocIf | NodeKind::PreprocIfdef)
    }

    /// `#define NAME ...` or `#define NAME(...) ...`.
    pub fn is_macro_definition(self) -> bool {
        matches!(self, NodeKind::PreprocDef | NodeKind::PreprocFunctionDef)
    }
}
