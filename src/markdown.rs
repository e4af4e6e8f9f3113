//! Markdown-subset rendering for the chat transcript.
//!
//! Block constructs are recognized line-by-line in a single left-to-right
//! pass with no backtracking across blocks: fenced code (with optional
//! language tag), bullet and numbered lists, `#`/`##`/`###` headers,
//! blockquotes, horizontal rules, and blank-line paragraph breaks.
//! Inline constructs are recognized by ordered first-match-wins scanning
//! within a line: `code` first, then bold, italic, and links; unmatched
//! delimiters fall back to literal text. An unterminated code fence
//! consumes the remainder of the message as one code block.

use crate::highlight::{highlight_line, TokenKind};
use crate::view::theme::Theme;
use once_cell::sync::Lazy;
use ratatui::style::{Modifier, Style};
use regex::Regex;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// A styled run of text. `link_url` is set for spans that came from a
/// `[text](url)` construct.
#[derive(Debug, Clone, PartialEq)]
pub struct StyledSpan {
    pub text: String,
    pub style: Style,
    pub link_url: Option<String>,
}

/// One rendered line of styled spans.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    pub fn new() -> Self {
        Self { spans: Vec::new() }
    }

    pub fn push(&mut self, text: String, style: Style) {
        self.push_with_link(text, style, None);
    }

    pub fn push_with_link(&mut self, text: String, style: Style, link_url: Option<String>) {
        self.spans.push(StyledSpan {
            text,
            style,
            link_url,
        });
    }

    /// Display width of the whole line.
    pub fn width(&self) -> usize {
        self.spans
            .iter()
            .map(|s| UnicodeWidthStr::width(s.text.as_str()))
            .sum()
    }
}

static NUMBERED_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)\.\s+(.*)$").expect("numbered item pattern is valid"));

const RULE_WIDTH: usize = 40;

/// Render an assistant message into styled lines.
pub fn render_message(text: &str, theme: &Theme) -> Vec<StyledLine> {
    let mut r = Renderer {
        theme,
        lines: Vec::new(),
        code_lang: None,
        code_lines: Vec::new(),
        list_items: Vec::new(),
    };

    for line in text.lines() {
        r.push_line(line);
    }
    r.finish()
}

/// Render plain text (user messages) into unstyled lines.
pub fn plain_lines(text: &str, style: Style) -> Vec<StyledLine> {
    text.lines()
        .map(|line| {
            let mut styled = StyledLine::new();
            if !line.is_empty() {
                styled.push(line.to_string(), style);
            }
            styled
        })
        .collect()
}

struct Renderer<'a> {
    theme: &'a Theme,
    lines: Vec<StyledLine>,
    /// Language tag while inside a fence; None outside.
    code_lang: Option<String>,
    code_lines: Vec<String>,
    list_items: Vec<String>,
}

impl Renderer<'_> {
    fn push_line(&mut self, line: &str) {
        let trimmed = line.trim();

        // Fences toggle code collection and are checked before anything else.
        if trimmed.starts_with("```") {
            if self.code_lang.is_some() {
                self.flush_code();
            } else {
                self.flush_list();
                self.code_lang = Some(trimmed[3..].trim().to_string());
            }
            return;
        }

        if self.code_lang.is_some() {
            self.code_lines.push(line.to_string());
            return;
        }

        if !self.list_items.is_empty() && !is_bullet(trimmed) {
            self.flush_list();
        }

        if is_bullet(trimmed) {
            self.list_items.push(trimmed[2..].to_string());
            return;
        }

        // Headers test the raw line so indented hashes stay literal text.
        for (marker, _level) in [("### ", 3usize), ("## ", 2), ("# ", 1)] {
            if line.starts_with(marker) {
                let style = Style::default()
                    .fg(self.theme.heading_fg)
                    .add_modifier(Modifier::BOLD);
                let mut styled = StyledLine::new();
                styled.push(line[marker.len()..].to_string(), style);
                self.lines.push(styled);
                return;
            }
        }

        if let Some(caps) = NUMBERED_ITEM.captures(trimmed) {
            let mut styled = StyledLine::new();
            styled.push(
                format!("{}. ", &caps[1]),
                Style::default()
                    .fg(self.theme.bullet_fg)
                    .add_modifier(Modifier::BOLD),
            );
            parse_inline(&caps[2], Style::default(), self.theme, &mut styled);
            self.lines.push(styled);
            return;
        }

        if let Some(rest) = trimmed.strip_prefix("> ") {
            let mut styled = StyledLine::new();
            styled.push("▌ ".to_string(), Style::default().fg(self.theme.quote_fg));
            let base = Style::default()
                .fg(self.theme.quote_fg)
                .add_modifier(Modifier::ITALIC);
            parse_inline(rest, base, self.theme, &mut styled);
            self.lines.push(styled);
            return;
        }

        if trimmed == "---" || trimmed == "***" {
            let mut styled = StyledLine::new();
            styled.push(
                "─".repeat(RULE_WIDTH),
                Style::default().fg(self.theme.rule_fg),
            );
            self.lines.push(styled);
            return;
        }

        if trimmed.is_empty() {
            self.lines.push(StyledLine::new());
            return;
        }

        let mut styled = StyledLine::new();
        parse_inline(line, Style::default(), self.theme, &mut styled);
        self.lines.push(styled);
    }

    fn flush_list(&mut self) {
        for item in std::mem::take(&mut self.list_items) {
            let mut styled = StyledLine::new();
            styled.push("• ".to_string(), Style::default().fg(self.theme.bullet_fg));
            parse_inline(&item, Style::default(), self.theme, &mut styled);
            self.lines.push(styled);
        }
    }

    fn flush_code(&mut self) {
        let lang = self.code_lang.take().unwrap_or_default();
        let label = if lang.is_empty() { "code" } else { lang.as_str() };
        let code_bg = self.theme.code_bg;

        let mut header = StyledLine::new();
        header.push(
            format!(" {label} "),
            Style::default().fg(self.theme.code_header_fg).bg(code_bg),
        );
        self.lines.push(header);

        for line in std::mem::take(&mut self.code_lines) {
            let mut styled = StyledLine::new();
            let spans = highlight_line(&line, &lang);
            if spans.is_empty() {
                if !line.is_empty() {
                    styled.push(
                        line.clone(),
                        Style::default().fg(self.theme.code_fg).bg(code_bg),
                    );
                }
            } else {
                let mut pos = 0;
                for span in &spans {
                    if span.range.start > pos {
                        styled.push(
                            line[pos..span.range.start].to_string(),
                            Style::default().fg(self.theme.code_fg).bg(code_bg),
                        );
                    }
                    styled.push(
                        line[span.range.clone()].to_string(),
                        Style::default().fg(self.token_color(span.kind)).bg(code_bg),
                    );
                    pos = span.range.end;
                }
                if pos < line.len() {
                    styled.push(
                        line[pos..].to_string(),
                        Style::default().fg(self.theme.code_fg).bg(code_bg),
                    );
                }
            }
            self.lines.push(styled);
        }
    }

    fn token_color(&self, kind: TokenKind) -> ratatui::style::Color {
        match kind {
            TokenKind::Keyword => self.theme.syntax_keyword_fg,
            TokenKind::String => self.theme.syntax_string_fg,
            TokenKind::Comment => self.theme.syntax_comment_fg,
            TokenKind::Number => self.theme.syntax_number_fg,
        }
    }

    fn finish(mut self) -> Vec<StyledLine> {
        // An unterminated fence consumes the rest of the message as a
        // single code block.
        if self.code_lang.is_some() {
            self.flush_code();
        }
        self.flush_list();

        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

fn is_bullet(trimmed: &str) -> bool {
    trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("• ")
}

/// Inline scan of one line. At each position the candidates are tried in
/// precedence order: inline code, bold, italic, link. Delimiters without
/// a matching close are emitted as literal text.
fn parse_inline(text: &str, base: Style, theme: &Theme, out: &mut StyledLine) {
    let mut literal = String::new();
    let mut i = 0;

    while i < text.len() {
        let rest = &text[i..];
        let ch = rest.chars().next().expect("rest is non-empty");

        if ch == '`' {
            if let Some(close) = rest[1..].find('`') {
                flush_literal(&mut literal, base, out);
                out.push(
                    rest[1..1 + close].to_string(),
                    Style::default().fg(theme.code_fg).bg(theme.code_bg),
                );
                i += close + 2;
                continue;
            }
        } else if rest.starts_with("**") || rest.starts_with("__") {
            let delim = &rest[..2];
            if let Some(close) = rest[2..].find(delim).filter(|&c| c > 0) {
                flush_literal(&mut literal, base, out);
                out.push(
                    rest[2..2 + close].to_string(),
                    base.add_modifier(Modifier::BOLD),
                );
                i += close + 4;
                continue;
            }
            // No closing delimiter: both marker chars are literal.
            literal.push_str(delim);
            i += 2;
            continue;
        } else if ch == '*' {
            if let Some(close) = rest[1..].find('*').filter(|&c| c > 0) {
                flush_literal(&mut literal, base, out);
                out.push(
                    rest[1..1 + close].to_string(),
                    base.add_modifier(Modifier::ITALIC),
                );
                i += close + 2;
                continue;
            }
        } else if ch == '[' {
            if let Some((label, url, consumed)) = match_link(rest) {
                flush_literal(&mut literal, base, out);
                out.push_with_link(
                    label,
                    base.fg(theme.link_fg).add_modifier(Modifier::UNDERLINED),
                    Some(url),
                );
                i += consumed;
                continue;
            }
        }

        literal.push(ch);
        i += ch.len_utf8();
    }

    flush_literal(&mut literal, base, out);
}

fn flush_literal(literal: &mut String, style: Style, out: &mut StyledLine) {
    if !literal.is_empty() {
        out.push(std::mem::take(literal), style);
    }
}

/// Match `[text](url)` at the start of `rest`. Both the label and the
/// URL must be non-empty; the label may not contain `]`.
fn match_link(rest: &str) -> Option<(String, String, usize)> {
    let close_bracket = rest.find(']')?;
    let label = &rest[1..close_bracket];
    if label.is_empty() || !rest[close_bracket + 1..].starts_with('(') {
        return None;
    }
    let after_paren = &rest[close_bracket + 2..];
    let close_paren = after_paren.find(')')?;
    let url = &after_paren[..close_paren];
    if url.is_empty() {
        return None;
    }
    Some((
        label.to_string(),
        url.to_string(),
        close_bracket + 2 + close_paren + 1,
    ))
}

/// Word-wrap styled lines to fit a width, preserving span styles and
/// link URLs. Breaks at word boundaries when possible, mid-word only for
/// words longer than the width.
pub fn wrap_styled_lines(lines: &[StyledLine], max_width: usize) -> Vec<StyledLine> {
    if max_width == 0 {
        return lines.to_vec();
    }

    let mut result = Vec::new();
    for line in lines {
        if line.width() <= max_width {
            result.push(line.clone());
            continue;
        }
        wrap_one_line(line, max_width, &mut result);
    }
    result
}

fn wrap_one_line(line: &StyledLine, max_width: usize, result: &mut Vec<StyledLine>) {
    // Flatten spans into (segment, style, link) units: runs of spaces or
    // runs of non-spaces, each within one span.
    let mut segments: Vec<(String, Style, Option<String>)> = Vec::new();
    for span in &line.spans {
        let mut chars = span.text.chars().peekable();
        while chars.peek().is_some() {
            let mut segment = String::new();
            while let Some(&c) = chars.peek() {
                if c != ' ' {
                    break;
                }
                segment.push(c);
                chars.next();
            }
            while let Some(&c) = chars.peek() {
                if c == ' ' {
                    break;
                }
                segment.push(c);
                chars.next();
            }
            if !segment.is_empty() {
                segments.push((segment, span.style, span.link_url.clone()));
            }
        }
    }

    let mut current = StyledLine::new();
    let mut current_width = 0;

    for (mut segment, style, link) in segments {
        let seg_width = UnicodeWidthStr::width(segment.as_str());

        if current_width + seg_width <= max_width {
            current.push_with_link(segment, style, link);
            current_width += seg_width;
            continue;
        }

        if current_width > 0 {
            result.push(std::mem::take(&mut current));
            current_width = 0;
            segment = segment.trim_start().to_string();
        }

        // Hard-break anything still wider than the line.
        let mut remaining = segment.as_str();
        while !remaining.is_empty() {
            let (take, rest) = split_at_width(remaining, max_width);
            current.push_with_link(take.to_string(), style, link.clone());
            current_width = UnicodeWidthStr::width(take);
            remaining = rest;
            if !remaining.is_empty() {
                result.push(std::mem::take(&mut current));
                current_width = 0;
            }
        }
    }

    if !current.spans.is_empty() {
        result.push(current);
    }
}

/// Split a string so the first part fits in `max_width` columns (at
/// least one char).
fn split_at_width(s: &str, max_width: usize) -> (&str, &str) {
    let mut width = 0;
    let mut idx = 0;
    for (byte_idx, ch) in s.char_indices() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(1);
        if width + w > max_width && byte_idx > 0 {
            idx = byte_idx;
            break;
        }
        width += w;
        idx = byte_idx + ch.len_utf8();
    }
    s.split_at(idx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::theme::Theme;

    fn render(text: &str) -> Vec<StyledLine> {
        render_message(text, &Theme::dark())
    }

    fn line_text(line: &StyledLine) -> String {
        line.spans.iter().map(|s| s.text.as_str()).collect()
    }

    fn all_text(lines: &[StyledLine]) -> String {
        lines
            .iter()
            .map(line_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn has_modifier(line: &StyledLine, modifier: Modifier) -> bool {
        line.spans
            .iter()
            .any(|s| s.style.add_modifier.contains(modifier))
    }

    #[test]
    fn test_plain_text() {
        let lines = render("Hello world");
        assert_eq!(lines.len(), 1);
        assert_eq!(line_text(&lines[0]), "Hello world");
    }

    #[test]
    fn test_bold_text() {
        let lines = render("This is **bold** text");
        assert_eq!(line_text(&lines[0]), "This is bold text");
        let bold = lines[0].spans.iter().find(|s| s.text == "bold").unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_underscore_bold() {
        let lines = render("also __bold__ here");
        let bold = lines[0].spans.iter().find(|s| s.text == "bold").unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_italic_text() {
        let lines = render("This is *italic* text");
        assert_eq!(line_text(&lines[0]), "This is italic text");
        let italic = lines[0].spans.iter().find(|s| s.text == "italic").unwrap();
        assert!(italic.style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn test_single_underscore_stays_literal() {
        let lines = render("snake_case_name here");
        assert_eq!(line_text(&lines[0]), "snake_case_name here");
        assert!(!has_modifier(&lines[0], Modifier::ITALIC));
    }

    #[test]
    fn test_inline_code() {
        let lines = render("Use `println!` to print");
        assert_eq!(line_text(&lines[0]), "Use println! to print");
        let code = lines[0]
            .spans
            .iter()
            .find(|s| s.text.contains("println"))
            .unwrap();
        assert!(code.style.bg.is_some());
    }

    #[test]
    fn test_code_has_precedence_over_bold() {
        // The ** inside backticks must not be interpreted as bold.
        let lines = render("run `a ** b` now");
        assert_eq!(line_text(&lines[0]), "run a ** b now");
        assert!(!has_modifier(&lines[0], Modifier::BOLD));
    }

    #[test]
    fn test_unmatched_delimiters_fall_back_to_literal() {
        let lines = render("2 ** 3 and a * b and `tick");
        assert_eq!(line_text(&lines[0]), "2 ** 3 and a * b and `tick");
        assert!(!has_modifier(&lines[0], Modifier::BOLD));
    }

    #[test]
    fn test_link_text_and_url() {
        let lines = render("Click [here](https://example.com) for more");
        assert_eq!(line_text(&lines[0]), "Click here for more");
        let link = lines[0].spans.iter().find(|s| s.text == "here").unwrap();
        assert!(link.style.add_modifier.contains(Modifier::UNDERLINED));
        assert_eq!(link.link_url.as_deref(), Some("https://example.com"));
        let plain = lines[0].spans.iter().find(|s| s.text == "Click ").unwrap();
        assert_eq!(plain.link_url, None);
    }

    #[test]
    fn test_malformed_link_stays_literal() {
        let lines = render("see [broken](no-close and [empty]()");
        assert_eq!(line_text(&lines[0]), "see [broken](no-close and [empty]()");
    }

    #[test]
    fn test_headers() {
        let lines = render("# Title\n## Section\n### Sub");
        assert_eq!(line_text(&lines[0]), "Title");
        assert_eq!(line_text(&lines[1]), "Section");
        assert_eq!(line_text(&lines[2]), "Sub");
        for line in &lines {
            assert!(has_modifier(line, Modifier::BOLD));
        }
    }

    #[test]
    fn test_hash_without_space_is_not_a_header() {
        let lines = render("#hashtag");
        assert_eq!(line_text(&lines[0]), "#hashtag");
        assert!(!has_modifier(&lines[0], Modifier::BOLD));
    }

    #[test]
    fn test_bullet_lists_all_markers() {
        let lines = render("- one\n* two\n• three");
        assert_eq!(lines.len(), 3);
        assert_eq!(line_text(&lines[0]), "• one");
        assert_eq!(line_text(&lines[1]), "• two");
        assert_eq!(line_text(&lines[2]), "• three");
    }

    #[test]
    fn test_list_ends_at_non_list_line() {
        let lines = render("- a\n- b\nafter");
        assert_eq!(lines.len(), 3);
        assert_eq!(line_text(&lines[2]), "after");
    }

    #[test]
    fn test_numbered_items() {
        let lines = render("1. first\n2. second");
        assert_eq!(line_text(&lines[0]), "1. first");
        assert_eq!(line_text(&lines[1]), "2. second");
        let number = &lines[0].spans[0];
        assert_eq!(number.text, "1. ");
        assert!(number.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_blockquote() {
        let lines = render("> quoted wisdom");
        assert_eq!(line_text(&lines[0]), "▌ quoted wisdom");
        assert!(has_modifier(&lines[0], Modifier::ITALIC));
    }

    #[test]
    fn test_horizontal_rules() {
        let lines = render("above\n---\nbetween\n***\nbelow");
        assert!(line_text(&lines[1]).contains('─'));
        assert!(line_text(&lines[3]).contains('─'));
    }

    #[test]
    fn test_blank_line_is_paragraph_break() {
        let lines = render("First paragraph.\n\nSecond paragraph.");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].spans.is_empty());
    }

    #[test]
    fn test_code_fence_with_language() {
        let lines = render("```rust\nfn main() {}\n```");
        assert_eq!(line_text(&lines[0]), " rust ");
        assert!(line_text(&lines[1]).contains("fn main"));
        // Keyword coloring applied inside the block
        let fn_span = lines[1].spans.iter().find(|s| s.text == "fn").unwrap();
        assert_eq!(fn_span.style.fg, Some(Theme::dark().syntax_keyword_fg));
        // Everything in the block carries the code background
        assert!(lines[1].spans.iter().all(|s| s.style.bg.is_some()));
    }

    #[test]
    fn test_code_fence_without_tag_gets_default_label() {
        let lines = render("```\nsome code\n```");
        assert_eq!(line_text(&lines[0]), " code ");
        assert_eq!(line_text(&lines[1]), "some code");
        // No language: uniform styling, single span
        assert_eq!(lines[1].spans.len(), 1);
    }

    #[test]
    fn test_unterminated_fence_consumes_remainder() {
        let lines = render("intro\n```python\nx = 1\n# still code\nno closing fence");
        assert_eq!(line_text(&lines[0]), "intro");
        assert_eq!(line_text(&lines[1]), " python ");
        let rest = all_text(&lines[2..]);
        assert!(rest.contains("x = 1"));
        assert!(rest.contains("# still code"));
        assert!(rest.contains("no closing fence"));
        // The trailing text is code, not a paragraph: it keeps the code bg
        assert!(lines.last().unwrap().spans[0].style.bg.is_some());
    }

    #[test]
    fn test_markdown_inside_code_block_is_literal() {
        let lines = render("```\n**not bold**\n- not a list\n```");
        assert_eq!(line_text(&lines[1]), "**not bold**");
        assert_eq!(line_text(&lines[2]), "- not a list");
        assert!(!has_modifier(&lines[1], Modifier::BOLD));
    }

    #[test]
    fn test_inline_styles_inside_list_items() {
        let lines = render("- has **bold** inside");
        let bold = lines[0].spans.iter().find(|s| s.text == "bold").unwrap();
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(lines[0].spans[0].text, "• ");
    }

    #[test]
    fn test_trailing_blank_lines_are_trimmed() {
        let lines = render("content\n\n\n");
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_empty_input() {
        assert!(render("").is_empty());
    }

    #[test]
    fn test_plain_lines_split_on_newlines() {
        let lines = plain_lines("one\n\ntwo", Style::default());
        assert_eq!(lines.len(), 3);
        assert_eq!(line_text(&lines[0]), "one");
        assert!(lines[1].spans.is_empty());
        assert_eq!(line_text(&lines[2]), "two");
    }

    // ==================== Wrapping ====================

    #[test]
    fn test_wrap_breaks_at_word_boundaries() {
        let lines = render("Path represents a filesystem path but unlike PurePath also offers methods");
        let wrapped = wrap_styled_lines(&lines, 30);

        assert!(wrapped.len() > 1);
        for line in &wrapped {
            assert!(line.width() <= 30, "line too wide: {:?}", line_text(line));
            assert!(!line_text(line).starts_with(' '));
        }

        let original_words: Vec<String> = all_text(&lines)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        let wrapped_words: Vec<String> = wrapped
            .iter()
            .flat_map(|l| {
                line_text(l)
                    .split_whitespace()
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(original_words, wrapped_words);
    }

    #[test]
    fn test_wrap_breaks_long_word_mid_word() {
        let lines = render("supercalifragilisticexpialidocious");
        let wrapped = wrap_styled_lines(&lines, 10);
        assert!(wrapped.len() > 1);
        for line in &wrapped {
            assert!(line.width() <= 10);
        }
        let rejoined: String = wrapped.iter().map(line_text).collect();
        assert_eq!(rejoined, "supercalifragilisticexpialidocious");
    }

    #[test]
    fn test_wrap_preserves_styles_and_links() {
        let lines = render("**a rather long bold stretch of words** and [a link](https://x.y)");
        let wrapped = wrap_styled_lines(&lines, 12);
        for line in &wrapped {
            for span in &line.spans {
                if span.text.contains("bold") {
                    assert!(span.style.add_modifier.contains(Modifier::BOLD));
                }
                if span.text == "link" {
                    assert_eq!(span.link_url.as_deref(), Some("https://x.y"));
                }
            }
        }
    }

    #[test]
    fn test_wrap_keeps_short_lines_untouched() {
        let lines = render("short");
        let wrapped = wrap_styled_lines(&lines, 40);
        assert_eq!(wrapped, lines);
    }

    #[test]
    fn test_wrap_zero_width_is_identity() {
        let lines = render("whatever text");
        assert_eq!(wrap_styled_lines(&lines, 0), lines);
    }

    #[test]
    fn test_quote_color_applied() {
        let lines = render("> hello");
        let theme = Theme::dark();
        assert!(lines[0]
            .spans
            .iter()
            .all(|s| s.style.fg == Some(theme.quote_fg)));
    }
}
