//! Ad-hoc syntax highlighting for fenced code blocks.
//!
//! This is a pattern-matching token classifier, not a grammar: line
//! comments, string literals, numbers, and a keyword table per language
//! tag. Input is trusted (the model's own output), so a best-effort
//! single pass per line is all that is needed. Unknown tags produce no
//! spans and the renderer falls back to uniform code styling.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Comment,
    String,
    Number,
    Keyword,
}

/// A classified byte range within one line of code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpan {
    pub range: Range<usize>,
    pub kind: TokenKind,
}

struct LangProfile {
    line_comment: &'static str,
    quotes: &'static [char],
    keywords: &'static [&'static str],
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern",
    "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "type",
    "unsafe", "use", "where", "while",
];

const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "False", "finally", "for", "from", "global", "if", "import", "in", "is",
    "lambda", "None", "nonlocal", "not", "or", "pass", "raise", "return", "True", "try", "while",
    "with", "yield",
];

const JS_KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "default", "delete",
    "do", "else", "export", "extends", "false", "finally", "for", "function", "if", "import",
    "in", "instanceof", "interface", "let", "new", "null", "of", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "type", "typeof", "undefined", "var", "void",
    "while", "yield",
];

const GO_KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "false", "for", "func", "go", "goto", "if", "import", "interface", "map", "nil", "package",
    "range", "return", "select", "struct", "switch", "true", "type", "var",
];

const SHELL_KEYWORDS: &[&str] = &[
    "case", "do", "done", "elif", "else", "esac", "exit", "export", "fi", "for", "function", "if",
    "in", "local", "return", "then", "until", "while",
];

fn profile_for(lang: &str) -> Option<LangProfile> {
    match lang.to_lowercase().as_str() {
        "rust" | "rs" => Some(LangProfile {
            line_comment: "//",
            quotes: &['"'],
            keywords: RUST_KEYWORDS,
        }),
        "python" | "py" => Some(LangProfile {
            line_comment: "#",
            quotes: &['"', '\''],
            keywords: PYTHON_KEYWORDS,
        }),
        "javascript" | "js" | "typescript" | "ts" | "jsx" | "tsx" => Some(LangProfile {
            line_comment: "//",
            quotes: &['"', '\'', '`'],
            keywords: JS_KEYWORDS,
        }),
        "go" | "golang" => Some(LangProfile {
            line_comment: "//",
            quotes: &['"', '`'],
            keywords: GO_KEYWORDS,
        }),
        "sh" | "bash" | "shell" | "zsh" => Some(LangProfile {
            line_comment: "#",
            quotes: &['"', '\''],
            keywords: SHELL_KEYWORDS,
        }),
        _ => None,
    }
}

/// Classify one line of code for the given language tag.
pub fn highlight_line(line: &str, lang: &str) -> Vec<HighlightSpan> {
    let Some(profile) = profile_for(lang) else {
        return Vec::new();
    };

    let mut spans = Vec::new();
    let bytes = line.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let rest = &line[i..];

        if rest.starts_with(profile.line_comment) {
            spans.push(HighlightSpan {
                range: i..bytes.len(),
                kind: TokenKind::Comment,
            });
            break;
        }

        let ch = rest.chars().next().expect("rest is non-empty");

        if profile.quotes.contains(&ch) {
            let end = scan_string(line, i, ch);
            spans.push(HighlightSpan {
                range: i..end,
                kind: TokenKind::String,
            });
            i = end;
            continue;
        }

        if ch.is_ascii_digit() && !prev_is_word(bytes, i) {
            let end = scan_number(line, i);
            spans.push(HighlightSpan {
                range: i..end,
                kind: TokenKind::Number,
            });
            i = end;
            continue;
        }

        if is_word_start(ch) && !prev_is_word(bytes, i) {
            let end = scan_word(line, i);
            if profile.keywords.contains(&&line[i..end]) {
                spans.push(HighlightSpan {
                    range: i..end,
                    kind: TokenKind::Keyword,
                });
            }
            i = end;
            continue;
        }

        i += ch.len_utf8();
    }

    spans
}

fn is_word_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn prev_is_word(bytes: &[u8], i: usize) -> bool {
    i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_')
}

/// Scan a string literal starting at `start` (which holds the opening
/// quote). Handles backslash escapes; an unterminated literal runs to the
/// end of the line.
fn scan_string(line: &str, start: usize, quote: char) -> usize {
    let mut iter = line[start..].char_indices().skip(1);
    let mut escaped = false;
    for (off, ch) in &mut iter {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            c if c == quote => return start + off + c.len_utf8(),
            _ => {}
        }
    }
    line.len()
}

fn scan_number(line: &str, start: usize) -> usize {
    let mut end = start;
    for (off, ch) in line[start..].char_indices() {
        if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' {
            end = start + off + ch.len_utf8();
        } else {
            break;
        }
    }
    end
}

fn scan_word(line: &str, start: usize) -> usize {
    let mut end = start;
    for (off, ch) in line[start..].char_indices() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            end = start + off + ch.len_utf8();
        } else {
            break;
        }
    }
    end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_at(line: &str, lang: &str) -> Vec<(String, TokenKind)> {
        highlight_line(line, lang)
            .into_iter()
            .map(|s| (line[s.range.clone()].to_string(), s.kind))
            .collect()
    }

    #[test]
    fn test_unknown_language_produces_no_spans() {
        assert!(highlight_line("fn main() {}", "brainfuck").is_empty());
        assert!(highlight_line("anything", "").is_empty());
    }

    #[test]
    fn test_rust_keywords_and_numbers() {
        let spans = kinds_at("let x = 42;", "rust");
        assert_eq!(
            spans,
            vec![
                ("let".to_string(), TokenKind::Keyword),
                ("42".to_string(), TokenKind::Number),
            ]
        );
    }

    #[test]
    fn test_line_comment_consumes_rest() {
        let spans = kinds_at("foo(); // call foo", "rust");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0], ("// call foo".to_string(), TokenKind::Comment));
    }

    #[test]
    fn test_python_hash_comment() {
        let spans = kinds_at("x = 1  # note", "python");
        assert!(spans.contains(&("# note".to_string(), TokenKind::Comment)));
        assert!(spans.contains(&("1".to_string(), TokenKind::Number)));
    }

    #[test]
    fn test_string_with_escape() {
        let spans = kinds_at(r#"print("a \" b") # done"#, "python");
        assert_eq!(
            spans,
            vec![
                (r#""a \" b""#.to_string(), TokenKind::String),
                ("# done".to_string(), TokenKind::Comment),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_runs_to_end_of_line() {
        let spans = highlight_line(r#"let s = "oops;"#, "rust");
        assert_eq!(spans.last().unwrap().kind, TokenKind::String);
        assert_eq!(spans.last().unwrap().range.end, r#"let s = "oops;"#.len());
    }

    #[test]
    fn test_keyword_inside_identifier_is_not_highlighted() {
        let spans = kinds_at("format(x)", "rust");
        // "for" inside "format" must not match
        assert!(spans.is_empty());
    }

    #[test]
    fn test_comment_marker_inside_string_is_string() {
        let spans = highlight_line(r#"s = "http://x" "#, "python");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].kind, TokenKind::String);
    }

    #[test]
    fn test_js_template_strings_and_keywords() {
        let spans = kinds_at("const s = `hi`;", "js");
        assert_eq!(
            spans,
            vec![
                ("const".to_string(), TokenKind::Keyword),
                ("`hi`".to_string(), TokenKind::String),
            ]
        );
    }
}
