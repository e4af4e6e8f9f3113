//! Terminal rendering: a sidebar of chats on the left, the chat window
//! on the right.

pub mod chat;
pub mod sidebar;
pub mod theme;

use crate::app::App;
use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Layout};
use ratatui::Frame;
use theme::Theme;

const SIDEBAR_WIDTH: u16 = 32;

pub fn draw(frame: &mut Frame, app: &mut App, theme: &Theme) {
    let [sidebar_area, chat_area] =
        Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(1)])
            .areas(frame.area());

    sidebar::draw(frame, app, theme, sidebar_area);
    chat::draw(frame, app, theme, chat_area);
}

/// Compact relative timestamp shown next to each message.
pub(crate) fn relative_time(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(timestamp);
    let minutes = elapsed.num_minutes();
    if minutes < 1 {
        return "Just now".to_string();
    }
    if minutes < 60 {
        return format!("{minutes}m ago");
    }
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{hours}h ago");
    }
    let days = elapsed.num_days();
    if days < 7 {
        return format!("{days}d ago");
    }
    timestamp.format("%b %-d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_relative_time_buckets() {
        let now = Utc::now();
        assert_eq!(relative_time(now, now), "Just now");
        assert_eq!(relative_time(now - Duration::seconds(30), now), "Just now");
        assert_eq!(relative_time(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(relative_time(now - Duration::hours(3), now), "3h ago");
        assert_eq!(relative_time(now - Duration::days(2), now), "2d ago");
    }

    #[test]
    fn test_relative_time_old_messages_show_date() {
        let now = Utc::now();
        let old = now - Duration::days(30);
        let label = relative_time(old, now);
        assert!(label.contains(' '));
        assert!(!label.contains("ago"));
    }
}
