//! The chat window: header, transcript, input box, and key hints.

use crate::app::{App, Focus, Mode};
use crate::markdown::{plain_lines, render_message, wrap_styled_lines, StyledLine};
use crate::session::Role;
use crate::view::relative_time;
use crate::view::theme::Theme;
use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Wrap};
use ratatui::Frame;

pub fn draw(frame: &mut Frame, app: &mut App, theme: &Theme, area: Rect) {
    let [header_area, transcript_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(1),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    draw_header(frame, app, theme, header_area);
    draw_transcript(frame, app, theme, transcript_area);
    draw_input(frame, app, theme, input_area);
    draw_footer(frame, app, theme, footer_area);
}

fn draw_header(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let (title, count) = match app.session.active_chat() {
        Some(chat) => (chat.title.clone(), chat.messages.len()),
        None => ("No chat".to_string(), 0),
    };
    let lines = vec![
        Line::from(Span::styled(
            title,
            Style::default()
                .fg(theme.title_fg)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("{} · {} messages", app.config.model, count),
            Style::default().fg(theme.muted_fg),
        )),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn draw_transcript(frame: &mut Frame, app: &mut App, theme: &Theme, area: Rect) {
    let focused = app.focus == Focus::Chat;
    let border_style = if focused {
        Style::default().fg(theme.title_fg)
    } else {
        Style::default().fg(theme.border_fg)
    };
    let block = Block::bordered().border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let width = inner.width as usize;
    let height = inner.height as usize;
    let (lines, label_offsets) = transcript_lines(app, theme, width, Utc::now());

    let total = lines.len();
    let max_offset = total.saturating_sub(height);
    app.scroll_offset = app.scroll_offset.min(max_offset);
    let mut start = max_offset - app.scroll_offset;

    // Keep the browse selection in view.
    if app.mode == Mode::Browse {
        if let Some(label_line) = app
            .selected_message
            .and_then(|i| label_offsets.get(i).copied())
        {
            if label_line < start {
                start = label_line;
            } else if height > 0 && label_line >= start + height {
                start = label_line + 1 - height;
            }
            app.scroll_offset = max_offset - start.min(max_offset);
        }
    }

    frame.render_widget(
        Paragraph::new(lines).scroll((start as u16, 0)),
        inner,
    );
}

/// Build the transcript as terminal lines, pre-wrapped to `width`.
/// Also returns, per message, the line index of its label row so the
/// caller can scroll the selection into view.
fn transcript_lines(
    app: &App,
    theme: &Theme,
    width: usize,
    now: DateTime<Utc>,
) -> (Vec<Line<'static>>, Vec<usize>) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut label_offsets = Vec::new();

    let Some(chat) = app.session.active_chat() else {
        return (lines, label_offsets);
    };

    if chat.messages.is_empty() && app.pending.is_none() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "No messages yet. Type below and press Enter.",
            Style::default().fg(theme.muted_fg),
        )));
        return (lines, label_offsets);
    }

    let selected = match app.mode {
        Mode::Browse => app.selected_message,
        _ => None,
    };

    for (index, message) in chat.messages.iter().enumerate() {
        label_offsets.push(lines.len());

        let (name, accent) = match message.role {
            Role::User => ("You", theme.user_fg),
            Role::Assistant if message.error => ("Assistant", theme.error_fg),
            Role::Assistant => ("Assistant", theme.assistant_fg),
        };
        let mut name_style = Style::default().fg(accent).add_modifier(Modifier::BOLD);
        let mut time_style = Style::default().fg(theme.muted_fg);
        if selected == Some(index) {
            name_style = name_style.add_modifier(Modifier::REVERSED);
            time_style = time_style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::from(vec![
            Span::styled(name.to_string(), name_style),
            Span::styled(
                format!(" · {}", relative_time(message.timestamp, now)),
                time_style,
            ),
        ]));

        let styled: Vec<StyledLine> = if message.error {
            plain_lines(
                &message.content,
                Style::default()
                    .fg(theme.error_fg)
                    .add_modifier(Modifier::ITALIC),
            )
        } else if message.role == Role::User {
            plain_lines(&message.content, Style::default().fg(theme.fg))
        } else {
            render_message(&message.content, theme)
        };
        for line in wrap_styled_lines(&styled, width) {
            lines.push(to_line(line));
        }
        lines.push(Line::default());
    }

    if app.pending.is_some() && app.pending == app.session.active_chat_id {
        label_offsets.push(lines.len());
        lines.push(Line::from(Span::styled(
            "Assistant".to_string(),
            Style::default()
                .fg(theme.assistant_fg)
                .add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", app.typing_dots()),
            Style::default()
                .fg(theme.muted_fg)
                .add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::default());
    }

    // Drop the trailing spacer so the newest content sits on the bottom row.
    if lines.last().is_some_and(|l| l.spans.is_empty()) {
        lines.pop();
    }

    (lines, label_offsets)
}

fn to_line(styled: StyledLine) -> Line<'static> {
    Line::from(
        styled
            .spans
            .into_iter()
            .map(|s| Span::styled(s.text, s.style))
            .collect::<Vec<_>>(),
    )
}

fn draw_input(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let editing = app.editing_message.is_some();
    let typing = app.focus == Focus::Chat && app.mode == Mode::Insert;

    let border_style = if typing {
        Style::default().fg(theme.title_fg)
    } else {
        Style::default().fg(theme.border_fg)
    };
    let mut block = Block::bordered()
        .title(if editing { " Edit message " } else { " Message " })
        .border_style(border_style);

    let used = app.input.chars().count();
    let max = app.config.max_input_chars;
    if used * 10 >= max * 8 {
        let counter_style = if used >= max {
            Style::default().fg(theme.error_fg)
        } else {
            Style::default().fg(theme.warn_fg)
        };
        block = block.title_bottom(
            Line::from(Span::styled(format!(" {used}/{max} "), counter_style)).right_aligned(),
        );
    }

    let mut text = app.input.clone();
    if typing {
        text.push('▏');
    }
    frame.render_widget(
        Paragraph::new(text).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn draw_footer(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let (text, style) = match &app.status {
        Some(status) => (status.clone(), Style::default().fg(theme.warn_fg)),
        None => {
            let hints = match (app.focus, &app.mode) {
                (_, Mode::Rename) => "enter save · esc cancel",
                (_, Mode::ConfirmDeleteChat | Mode::ConfirmClearAll) => "y confirm · n cancel",
                (Focus::Sidebar, _) => "enter open · n new · r rename · d delete · tab chat",
                (Focus::Chat, Mode::Browse) => {
                    "j/k move · e edit · r resend · d delete · esc input"
                }
                (Focus::Chat, _) => "enter send · esc browse · tab chats · ctrl+c quit",
            };
            (hints.to_string(), Style::default().fg(theme.muted_fg))
        }
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(text, style))),
        area,
    );
}
