//! Parser-backed tagging.
//!
//! Walks a tree-sitter syntax tree and maps node kinds to tag names. A
//! fresh parser is created per call, so the tagger itself stays immutable
//! and can be shared across threads.

use tree_sitter::{Language, Node, Parser};
use tracing::warn;

use crate::{CharIndex, SyntaxError, SyntaxResult, TagSpans, Tagger};

pub struct TreeSitterTagger {
    name: &'static str,
    language: Language,
}

impl TreeSitterTagger {
    /// Creates a tagger for a language name or file extension.
    pub fn new(lang: &str) -> SyntaxResult<Self> {
        let (name, language) = get_language(lang)?;
        // Fail early if the grammar ABI does not match the runtime.
        Parser::new()
            .set_language(&language)
            .map_err(|_| SyntaxError::ParseError)?;
        Ok(Self { name, language })
    }

    fn collect(node: Node, index: &CharIndex, spans: &mut TagSpans) {
        if let Some(tag) = tag_for_node(node) {
            spans.push(tag, index.span(node.start_byte()..node.end_byte()));
            // Leaves of a tagged literal (string_content, escapes) add nothing.
            if is_literal(tag) {
                return;
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            Self::collect(child, index, spans);
        }
    }
}

impl Tagger for TreeSitterTagger {
    fn name(&self) -> &str {
        self.name
    }

    fn apply(&self, text: &str) -> TagSpans {
        let mut spans = TagSpans::new();
        let mut parser = Parser::new();
        if parser.set_language(&self.language).is_err() {
            warn!("Failed to load {} grammar", self.name);
            return spans;
        }
        let Some(tree) = parser.parse(text, None) else {
            warn!("Parsing with {} grammar was cancelled", self.name);
            return spans;
        };

        let index = CharIndex::new(text);
        Self::collect(tree.root_node(), &index, &mut spans);
        spans
    }
}

fn is_literal(tag: &str) -> bool {
    matches!(tag, "string" | "comment" | "number")
}

/// Maps a node to a tag name using common node kinds.
fn tag_for_node(node: Node) -> Option<&'static str> {
    let tag = match node.kind() {
        "fn" | "let" | "mut" | "const" | "static" | "pub" | "use" | "mod" | "struct"
        | "enum" | "impl" | "trait" | "type" | "where" | "if" | "else" | "match" | "for"
        | "while" | "loop" | "break" | "continue" | "return" | "async" | "await"
        | "unsafe" | "extern" | "crate" | "as" | "in" | "ref" | "move" | "dyn" | "class"
        | "def" | "import" | "from" | "try" | "except" | "finally" | "with" | "yield"
        | "lambda" | "pass" | "raise" | "elif" | "and" | "or" | "not" | "is" | "global"
        | "nonlocal" | "del" | "assert" => "keyword",

        "true" | "false" | "none" | "True" | "False" | "None" => "constant.builtin",

        "self" | "super" => "variable.builtin",

        "string_literal" | "raw_string_literal" | "char_literal" | "string" => "string",

        "integer_literal" | "float_literal" | "integer" | "float" => "number",

        "line_comment" | "block_comment" | "comment" => "comment",

        "type_identifier" | "primitive_type" => "type",

        "attribute_item" | "decorator" => "attribute",

        "field_identifier" => "property",

        "(" | ")" | "[" | "]" | "{" | "}" => "punctuation.bracket",

        "," | ";" | "." | "::" => "punctuation.delimiter",

        "=" | "==" | "!=" | "+" | "-" | "*" | "/" | "<" | ">" | "<=" | ">=" | "->" | "=>"
        | "&&" | "||" | "!" => "operator",

        "identifier" => return identifier_tag(node),

        _ => return None,
    };
    Some(tag)
}

/// Identifiers are tagged by role: definition names and call targets.
fn identifier_tag(node: Node) -> Option<&'static str> {
    let parent = node.parent()?;
    match parent.kind() {
        "function_item" | "function_definition" => {
            (parent.child_by_field_name("name") == Some(node)).then_some("function")
        }
        "call_expression" | "call" => {
            (parent.child_by_field_name("function") == Some(node)).then_some("function")
        }
        "macro_invocation" => Some("function.builtin"),
        "parameter" | "parameters" => Some("variable.parameter"),
        "use_declaration" | "scoped_identifier" | "import_statement" | "dotted_name" => {
            Some("module")
        }
        _ => None,
    }
}

/// Gets the tree-sitter language.
fn get_language(lang: &str) -> SyntaxResult<(&'static str, Language)> {
    match lang {
        "rust" | "rs" => Ok(("rust", tree_sitter_rust::LANGUAGE.into())),
        "python" | "py" | "pyw" => Ok(("python", tree_sitter_python::LANGUAGE.into())),
        _ => Err(SyntaxError::UnknownLanguage(lang.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;

    #[test]
    fn test_rust_tagging() {
        let tagger = TreeSitterTagger::new("rust").unwrap();
        let source = "fn main() {\n    let x = 42; // hi\n}\n";
        let spans = tagger.apply(source);

        assert!(spans.get("keyword").contains(&Span::new(0, 2)));
        assert_eq!(spans.get("function"), &[Span::new(3, 7)]);
        assert_eq!(spans.get("number"), &[Span::new(24, 26)]);
        assert_eq!(spans.get("comment")[0].start, 28);
    }

    #[test]
    fn test_python_string_tagged_once() {
        let tagger = TreeSitterTagger::new("py").unwrap();
        let spans = tagger.apply("x = \"abc\"\n");
        assert_eq!(spans.get("string"), &[Span::new(4, 9)]);
    }

    #[test]
    fn test_unknown_language() {
        assert!(TreeSitterTagger::new("unknown_lang").is_err());
    }
}
