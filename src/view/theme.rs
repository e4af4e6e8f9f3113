//! Built-in color themes for the UI and the markdown renderer.

use ratatui::style::Color;

pub const THEME_DARK: &str = "dark";
pub const THEME_LIGHT: &str = "light";

#[derive(Debug, Clone)]
pub struct Theme {
    pub name: &'static str,

    // General UI
    pub fg: Color,
    pub muted_fg: Color,
    pub border_fg: Color,
    pub title_fg: Color,
    pub error_fg: Color,
    pub warn_fg: Color,

    // Message accents
    pub user_fg: Color,
    pub assistant_fg: Color,

    // Markdown
    pub heading_fg: Color,
    pub bullet_fg: Color,
    pub quote_fg: Color,
    pub rule_fg: Color,
    pub link_fg: Color,
    pub code_fg: Color,
    pub code_bg: Color,
    pub code_header_fg: Color,

    // Code block syntax classes
    pub syntax_keyword_fg: Color,
    pub syntax_string_fg: Color,
    pub syntax_comment_fg: Color,
    pub syntax_number_fg: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: THEME_DARK,
            fg: Color::Reset,
            muted_fg: Color::DarkGray,
            border_fg: Color::DarkGray,
            title_fg: Color::Cyan,
            error_fg: Color::Red,
            warn_fg: Color::Yellow,
            user_fg: Color::Cyan,
            assistant_fg: Color::Magenta,
            heading_fg: Color::Yellow,
            bullet_fg: Color::Magenta,
            quote_fg: Color::Gray,
            rule_fg: Color::DarkGray,
            link_fg: Color::Cyan,
            code_fg: Color::White,
            code_bg: Color::Rgb(30, 30, 40),
            code_header_fg: Color::DarkGray,
            syntax_keyword_fg: Color::Magenta,
            syntax_string_fg: Color::Green,
            syntax_comment_fg: Color::DarkGray,
            syntax_number_fg: Color::Yellow,
        }
    }

    pub fn light() -> Self {
        Self {
            name: THEME_LIGHT,
            fg: Color::Black,
            muted_fg: Color::Gray,
            border_fg: Color::Gray,
            title_fg: Color::Blue,
            error_fg: Color::Red,
            warn_fg: Color::Rgb(180, 120, 0),
            user_fg: Color::Blue,
            assistant_fg: Color::Rgb(120, 40, 160),
            heading_fg: Color::Rgb(120, 40, 160),
            bullet_fg: Color::Rgb(120, 40, 160),
            quote_fg: Color::DarkGray,
            rule_fg: Color::Gray,
            link_fg: Color::Blue,
            code_fg: Color::Black,
            code_bg: Color::Rgb(235, 235, 240),
            code_header_fg: Color::DarkGray,
            syntax_keyword_fg: Color::Rgb(160, 30, 120),
            syntax_string_fg: Color::Rgb(20, 120, 40),
            syntax_comment_fg: Color::Gray,
            syntax_number_fg: Color::Rgb(160, 90, 0),
        }
    }

    /// Look up a built-in theme by name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            THEME_DARK => Some(Self::dark()),
            THEME_LIGHT => Some(Self::light()),
            _ => None,
        }
    }
}
