//! The chat list pane.

use crate::app::{App, Focus, Mode};
use crate::view::theme::Theme;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, List, ListItem, ListState, Paragraph};
use ratatui::Frame;

pub fn draw(frame: &mut Frame, app: &mut App, theme: &Theme, area: Rect) {
    let focused = app.focus == Focus::Sidebar;
    let border_style = if focused {
        Style::default().fg(theme.title_fg)
    } else {
        Style::default().fg(theme.border_fg)
    };
    let block = Block::bordered()
        .title(" Chats ")
        .border_style(border_style);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [list_area, footer_area] =
        Layout::vertical([Constraint::Min(1), Constraint::Length(1)]).areas(inner);

    let items: Vec<ListItem> = app
        .session
        .chats
        .iter()
        .map(|chat| {
            let active = app.session.active_chat_id == Some(chat.id);
            let title_style = if active {
                Style::default()
                    .fg(theme.title_fg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.fg)
            };
            let count = chat.messages.len();
            let detail = if count == 1 {
                "1 message".to_string()
            } else {
                format!("{count} messages")
            };
            ListItem::new(vec![
                Line::from(Span::styled(chat.title.clone(), title_style)),
                Line::from(Span::styled(detail, Style::default().fg(theme.muted_fg))),
            ])
        })
        .collect();

    let highlight = if focused {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };
    let list = List::new(items).highlight_style(highlight);
    let mut state = ListState::default().with_selected(Some(app.sidebar_index));
    frame.render_stateful_widget(list, list_area, &mut state);

    let footer = footer_line(app, theme);
    frame.render_widget(Paragraph::new(footer), footer_area);
}

fn footer_line(app: &App, theme: &Theme) -> Line<'static> {
    match app.mode {
        Mode::Rename => Line::from(Span::styled(
            format!("Rename: {}_", app.rename_buffer),
            Style::default().fg(theme.warn_fg),
        )),
        Mode::ConfirmDeleteChat => Line::from(Span::styled(
            "Delete this chat? y/n",
            Style::default().fg(theme.error_fg),
        )),
        Mode::ConfirmClearAll => Line::from(Span::styled(
            "Delete ALL chats? y/n",
            Style::default().fg(theme.error_fg),
        )),
        _ => {
            let count = app.session.chats.len();
            Line::from(Span::styled(
                format!("{count} chats · saved locally"),
                Style::default().fg(theme.muted_fg),
            ))
        }
    }
}
