//! Built-in tag grammars and the per-extension tagger registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::{RegexTagger, SyntaxResult, TagDef, Tagger};

// ==================== Shared fragments ====================

const NUMBER: &str = r"\b(?P<number>((0x|0b|0o|#)[\da-fA-F]+)|((\d*\.)?\d+))\b";
const BRACKETS: &str = r"(?P<brackets>[\(\)\[\]\{\}])";
const SYMBOLS: &str = r"(?P<symbols>[-*$£&|~?/+%^!:.=])";
const DOUBLE_QUOTED: &str = r#"(?P<string>"[^"\\\n]*(\\.[^"\\\n]*)*"?)"#;
const LINKS: &str = r"\b(?P<links>(?:file://|https?://)[^\s]*)\b";

// ==================== Python ====================

const PY_CLASSDEF: &str = r"\b(?P<keyword__class>class)[ \t]+(?P<classdef>\w+)[ \t]*[:\(]";
const PY_KEYWORD: &str = r"\b(?P<keyword>False|None|True|and|as|assert|async|await|break|class|continue|def|del|elif|else|except|finally|for|from|global|if|import|in|is|lambda|nonlocal|not|or|pass|raise|return|try|while|with|yield)\b";
const PY_BUILTIN: &str = r#"([^.'"\\#]\b|^)(?P<builtin>abs|all|any|ascii|bin|breakpoint|callable|chr|classmethod|compile|complex|copyright|credits|delattr|dir|divmod|enumerate|eval|exec|exit|filter|format|frozenset|getattr|globals|hasattr|hash|help|hex|id|input|isinstance|issubclass|iter|len|license|locals|map|max|memoryview|min|next|oct|open|ord|pow|print|quit|range|repr|reversed|round|set|setattr|slice|sorted|staticmethod|sum|type|vars|zip)\b"#;
const PY_EXCEPTION: &str = r#"([^.'"\\#]\b|^)(?P<exception>ArithmeticError|AssertionError|AttributeError|BaseException|BlockingIOError|BrokenPipeError|BufferError|BytesWarning|ChildProcessError|ConnectionAbortedError|ConnectionError|ConnectionRefusedError|ConnectionResetError|DeprecationWarning|EOFError|Ellipsis|EnvironmentError|Exception|FileExistsError|FileNotFoundError|FloatingPointError|FutureWarning|GeneratorExit|IOError|ImportError|ImportWarning|IndentationError|IndexError|InterruptedError|IsADirectoryError|KeyError|KeyboardInterrupt|LookupError|MemoryError|ModuleNotFoundError|NameError|NotADirectoryError|NotImplemented|NotImplementedError|OSError|OverflowError|PendingDeprecationWarning|PermissionError|ProcessLookupError|RecursionError|ReferenceError|ResourceWarning|RuntimeError|RuntimeWarning|StopAsyncIteration|StopIteration|SyntaxError|SyntaxWarning|SystemError|SystemExit|TabError|TimeoutError|TypeError|UnboundLocalError|UnicodeDecodeError|UnicodeEncodeError|UnicodeError|UnicodeTranslateError|UnicodeWarning|UserWarning|ValueError|Warning|WindowsError|ZeroDivisionError)\b"#;
const PY_TYPES: &str = r"\b(?P<types>bool|bytearray|bytes|dict|float|int|list|str|tuple|object)\b";
const PY_COMMENT: &str = r"(?P<comment>#[^\n]*)";
// Closing delimiters are optional so an unterminated literal still tags to
// the end of the scanned range.
const PY_DOCSTRING: &str = r#"(?P<docstring>(?i:r|u|f|fr|rf|b|br|rb)?'''(?:[^'\\]|\\.|''?(?:[^'\\]|\\.))*(?:''')?|(?i:r|u|f|fr|rf|b|br|rb)?"""(?:[^"\\]|\\.|""?(?:[^"\\]|\\.))*(?:""")?)"#;
const PY_STRING: &str = r#"(?P<string>(?i:r|u|f|fr|rf|b|br|rb)?'[^'\\\n]*(\\.[^'\\\n]*)*'?|(?i:r|u|f|fr|rf|b|br|rb)?"[^"\\\n]*(\\.[^"\\\n]*)*"?)"#;
const PY_SYNC: &str = r"(?P<sync>\n)";
const PY_INSTANCE: &str = r"\b(?P<instance>super|self|cls)\b";
const PY_DECORATOR: &str = r"(^[ \t]*(?P<decorator>@[\w\d\.]+))";

// ==================== Markup ====================

const XML_TAG: &str = r"(?P<brackets></?(?P<xmltag>\w+)|>)";

/// Python grammar, in priority order.
pub fn python_grammar() -> Vec<TagDef> {
    vec![
        TagDef::new("classdef", PY_CLASSDEF),
        TagDef::new("keyword", PY_KEYWORD),
        TagDef::new("builtin", PY_BUILTIN),
        TagDef::new("exception", PY_EXCEPTION),
        TagDef::new("types", PY_TYPES),
        TagDef::new("comment", PY_COMMENT),
        TagDef::new("docstring", PY_DOCSTRING),
        TagDef::new("string", PY_STRING),
        TagDef::new("sync", PY_SYNC),
        TagDef::new("instance", PY_INSTANCE),
        TagDef::new("decorator", PY_DECORATOR),
        TagDef::new("number", NUMBER),
    ]
}

/// Grammar for files without a dedicated one.
pub fn generic_grammar() -> Vec<TagDef> {
    vec![
        TagDef::new("string", DOUBLE_QUOTED),
        TagDef::new("brackets", BRACKETS),
        TagDef::new("symbols", SYMBOLS),
        TagDef::new("number", NUMBER),
    ]
}

/// XML-like markup.
pub fn markup_grammar() -> Vec<TagDef> {
    vec![
        TagDef::new("string", DOUBLE_QUOTED),
        TagDef::new("symbols", SYMBOLS),
        TagDef::new("number", NUMBER),
        TagDef::new("brackets", XML_TAG),
    ]
}

/// Links layer, applied on top of every language.
pub fn link_grammar() -> Vec<TagDef> {
    vec![TagDef::new("links", LINKS)]
}

// ==================== Registry ====================

/// Picks taggers by file extension.
///
/// Regex grammars are compiled once and shared. Parser-backed taggers are
/// only used when enabled and available for the extension.
pub struct LanguageRegistry {
    by_extension: HashMap<&'static str, Arc<dyn Tagger>>,
    generic: Arc<dyn Tagger>,
    links: Arc<dyn Tagger>,
    tree_sitter: bool,
}

impl LanguageRegistry {
    /// Compiles the built-in grammars.
    pub fn new() -> SyntaxResult<Self> {
        let python: Arc<dyn Tagger> = Arc::new(RegexTagger::compile("python", &python_grammar())?);
        let markup: Arc<dyn Tagger> = Arc::new(RegexTagger::compile("markup", &markup_grammar())?);
        let generic: Arc<dyn Tagger> =
            Arc::new(RegexTagger::compile("generic", &generic_grammar())?);
        let links: Arc<dyn Tagger> = Arc::new(RegexTagger::compile("links", &link_grammar())?);

        let mut by_extension = HashMap::new();
        for ext in ["py", "pyw"] {
            by_extension.insert(ext, python.clone());
        }
        for ext in ["xml", "meta", "html", "htm"] {
            by_extension.insert(ext, markup.clone());
        }

        Ok(Self {
            by_extension,
            generic,
            links,
            tree_sitter: false,
        })
    }

    /// Prefer parser-backed taggers where one exists.
    pub fn with_tree_sitter(mut self, enabled: bool) -> Self {
        self.tree_sitter = enabled;
        self
    }

    /// Language tagger for a file extension (without the dot, any case).
    pub fn tagger_for(&self, ext: &str) -> Arc<dyn Tagger> {
        let ext = ext.trim_start_matches('.').to_lowercase();

        if self.tree_sitter {
            if let Some(tagger) = self.parser_tagger(&ext) {
                return tagger;
            }
        }

        match self.by_extension.get(ext.as_str()) {
            Some(tagger) => tagger.clone(),
            None => {
                debug!("No grammar for '.{}', using generic", ext);
                self.generic.clone()
            }
        }
    }

    /// The links layer.
    pub fn links(&self) -> Arc<dyn Tagger> {
        self.links.clone()
    }

    #[cfg(feature = "tree-sitter")]
    fn parser_tagger(&self, ext: &str) -> Option<Arc<dyn Tagger>> {
        match crate::TreeSitterTagger::new(ext) {
            Ok(tagger) => Some(Arc::new(tagger)),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }

    #[cfg(not(feature = "tree-sitter"))]
    fn parser_tagger(&self, ext: &str) -> Option<Arc<dyn Tagger>> {
        tracing::warn!("Parser tagging for '.{}' requested but not built in", ext);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Span;

    fn python() -> RegexTagger {
        RegexTagger::compile("python", &python_grammar()).unwrap()
    }

    #[test]
    fn test_builtin_grammars_compile() {
        assert!(LanguageRegistry::new().is_ok());
    }

    #[test]
    fn test_python_keywords_and_numbers() {
        let spans = python().apply("if x == 10:\n    return None\n");
        assert_eq!(
            spans.get("keyword"),
            &[Span::new(0, 2), Span::new(16, 22), Span::new(23, 27)]
        );
        assert_eq!(spans.get("number"), &[Span::new(8, 10)]);
    }

    #[test]
    fn test_python_unterminated_string_runs_to_line_end() {
        let spans = python().apply("x = \"abc\ny = 1\n");
        assert_eq!(spans.get("string"), &[Span::new(4, 8)]);
        assert_eq!(spans.get("number"), &[Span::new(13, 14)]);
    }

    #[test]
    fn test_python_unterminated_docstring_runs_to_end() {
        let text = "a = '''doc\nmore\n";
        let spans = python().apply(text);
        assert_eq!(spans.get("docstring"), &[Span::new(4, text.len())]);
    }

    #[test]
    fn test_python_docstring_with_inner_quotes() {
        let text = r#""""say "hi" ""now"" """ + 1"#;
        let spans = python().apply(text);
        assert_eq!(spans.get("docstring"), &[Span::new(0, 23)]);
        assert_eq!(spans.get("number"), &[Span::new(26, 27)]);
    }

    #[test]
    fn test_python_classdef_tags_keyword_and_name() {
        let spans = python().apply("class Foo(Base):\n    pass\n");
        assert_eq!(spans.get("classdef"), &[Span::new(6, 9)]);
        assert!(spans.get("keyword").contains(&Span::new(0, 5)));
    }

    #[test]
    fn test_python_comment_and_decorator() {
        let spans = python().apply("@cache\ndef f(): # note\n");
        assert_eq!(spans.get("decorator"), &[Span::new(0, 6)]);
        assert_eq!(spans.get("comment"), &[Span::new(16, 22)]);
    }

    #[test]
    fn test_links_stop_at_word_boundary() {
        let links = RegexTagger::compile("links", &link_grammar()).unwrap();
        let text = "file:///tmp/a.py:12:3: hit\nsee https://example.com/x.";
        let spans = links.apply(text);
        assert_eq!(
            spans.get("links"),
            &[Span::new(0, 21), Span::new(31, 52)]
        );
    }

    #[test]
    fn test_registry_selects_by_extension() {
        let registry = LanguageRegistry::new().unwrap();
        assert_eq!(registry.tagger_for("PY").name(), "python");
        assert_eq!(registry.tagger_for(".xml").name(), "markup");
        assert_eq!(registry.tagger_for("txt").name(), "generic");
    }
}
