//! Application state and key handling.
//!
//! The UI is a two-pane layout: a sidebar listing chats and the chat
//! window with the transcript and the input box. Keys route by focus and
//! mode; every mutation of the session is persisted immediately.

use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::session::{Role, Session};
use crate::store::SessionStore;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::mpsc::Sender;
use std::time::Instant;

/// Which pane receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Sidebar,
    Chat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Typing into the input box.
    Insert,
    /// Navigating the transcript message by message.
    Browse,
    /// Editing a chat title in the sidebar.
    Rename,
    ConfirmDeleteChat,
    ConfirmClearAll,
}

/// Events delivered from the request worker back to the main loop. Each
/// carries the chat it belongs to so a reply still lands in the right
/// place after the user switches chats.
#[derive(Debug)]
pub enum AppEvent {
    Reply { chat_id: u64, text: String },
    Failed { chat_id: u64, message: String },
}

pub struct App {
    pub session: Session,
    pub store: SessionStore,
    pub config: Config,

    pub focus: Focus,
    pub mode: Mode,

    /// Current contents of the input box.
    pub input: String,
    /// Message being edited, if the input box holds an existing message.
    pub editing_message: Option<u64>,
    /// Chat with a request in flight; at most one at a time.
    pub pending: Option<u64>,
    pub pending_since: Option<Instant>,

    /// Sidebar cursor, an index into `session.chats`.
    pub sidebar_index: usize,
    /// Transcript cursor in browse mode, an index into the active chat's
    /// messages.
    pub selected_message: Option<usize>,
    pub rename_buffer: String,

    /// Lines scrolled up from the bottom of the transcript. Zero means
    /// following the newest message.
    pub scroll_offset: usize,

    pub status: Option<String>,
    pub should_quit: bool,

    events: Sender<AppEvent>,
}

impl App {
    pub fn new(session: Session, store: SessionStore, config: Config, events: Sender<AppEvent>) -> Self {
        let mut app = Self {
            session,
            store,
            config,
            focus: Focus::Chat,
            mode: Mode::Insert,
            input: String::new(),
            editing_message: None,
            pending: None,
            pending_since: None,
            sidebar_index: 0,
            selected_message: None,
            rename_buffer: String::new(),
            scroll_offset: 0,
            status: None,
            should_quit: false,
            events,
        };
        app.sync_sidebar_to_active();
        app
    }

    fn sync_sidebar_to_active(&mut self) {
        self.sidebar_index = self
            .session
            .active_chat_id
            .and_then(|id| self.session.chats.iter().position(|c| c.id == id))
            .unwrap_or(0);
    }

    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.session) {
            tracing::error!("Failed to persist session: {e}");
            self.status = Some(format!("Save failed: {e}"));
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        self.status = None;

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if key.code == KeyCode::Char('l') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.mode = Mode::ConfirmClearAll;
            return;
        }

        match self.mode.clone() {
            Mode::Rename => self.handle_rename_key(key),
            Mode::ConfirmDeleteChat => self.handle_confirm_delete_key(key),
            Mode::ConfirmClearAll => self.handle_confirm_clear_key(key),
            Mode::Insert | Mode::Browse => {
                if key.code == KeyCode::Tab {
                    self.focus = match self.focus {
                        Focus::Sidebar => Focus::Chat,
                        Focus::Chat => Focus::Sidebar,
                    };
                    return;
                }
                match self.focus {
                    Focus::Sidebar => self.handle_sidebar_key(key),
                    Focus::Chat => match self.mode {
                        Mode::Insert => self.handle_insert_key(key),
                        _ => self.handle_browse_key(key),
                    },
                }
            }
        }
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.sidebar_index = self.sidebar_index.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if self.sidebar_index + 1 < self.session.chats.len() {
                    self.sidebar_index += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(chat) = self.session.chats.get(self.sidebar_index) {
                    let id = chat.id;
                    self.session.select_chat(id);
                    self.persist();
                    self.scroll_offset = 0;
                    self.selected_message = None;
                    self.focus = Focus::Chat;
                    self.mode = Mode::Insert;
                }
            }
            KeyCode::Char('n') => {
                self.session.new_chat();
                self.persist();
                self.sync_sidebar_to_active();
                self.scroll_offset = 0;
                self.selected_message = None;
                self.focus = Focus::Chat;
                self.mode = Mode::Insert;
            }
            KeyCode::Char('d') => {
                if !self.session.chats.is_empty() {
                    self.mode = Mode::ConfirmDeleteChat;
                }
            }
            KeyCode::Char('r') => {
                if let Some(chat) = self.session.chats.get(self.sidebar_index) {
                    self.rename_buffer = chat.title.clone();
                    self.mode = Mode::Rename;
                }
            }
            _ => {}
        }
    }

    fn handle_insert_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_input(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Esc => {
                if self.editing_message.take().is_some() {
                    self.input.clear();
                } else {
                    self.mode = Mode::Browse;
                    self.select_last_message();
                }
            }
            KeyCode::Up | KeyCode::PageUp => {
                self.scroll_offset = self.scroll_offset.saturating_add(1);
            }
            KeyCode::Down | KeyCode::PageDown => {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
            }
            KeyCode::Char(c) => {
                if self.input.chars().count() < self.config.max_input_chars {
                    self.input.push(c);
                } else {
                    self.status = Some(format!(
                        "Input limit reached ({} characters)",
                        self.config.max_input_chars
                    ));
                }
            }
            _ => {}
        }
    }

    fn handle_browse_key(&mut self, key: KeyEvent) {
        let message_count = self.session.active_chat().map_or(0, |c| c.messages.len());
        match key.code {
            KeyCode::Esc | KeyCode::Char('i') => {
                self.mode = Mode::Insert;
                self.selected_message = None;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_message = match self.selected_message {
                    Some(i) => Some(i.saturating_sub(1)),
                    None if message_count > 0 => Some(message_count - 1),
                    None => None,
                };
            }
            KeyCode::Down | KeyCode::Char('j') => {
                if let Some(i) = self.selected_message {
                    if i + 1 < message_count {
                        self.selected_message = Some(i + 1);
                    }
                }
            }
            KeyCode::Char('G') => {
                self.scroll_offset = 0;
                self.select_last_message();
            }
            KeyCode::Char('d') => self.delete_selected_message(),
            KeyCode::Char('e') => self.edit_selected_message(),
            KeyCode::Char('r') => self.resend_selected_message(),
            _ => {}
        }
    }

    fn handle_rename_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                let title = self.rename_buffer.trim().to_string();
                if !title.is_empty() {
                    if let Some(chat) = self.session.chats.get(self.sidebar_index) {
                        let id = chat.id;
                        self.session.rename_chat(id, &title);
                        self.persist();
                    }
                }
                self.rename_buffer.clear();
                self.mode = Mode::Insert;
            }
            KeyCode::Esc => {
                self.rename_buffer.clear();
                self.mode = Mode::Insert;
            }
            KeyCode::Backspace => {
                self.rename_buffer.pop();
            }
            KeyCode::Char(c) => self.rename_buffer.push(c),
            _ => {}
        }
    }

    fn handle_confirm_delete_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                if let Some(chat) = self.session.chats.get(self.sidebar_index) {
                    let id = chat.id;
                    self.session.delete_chat(id);
                    // The UI always shows at least one chat.
                    if self.session.chats.is_empty() {
                        self.session.new_chat();
                    }
                    self.persist();
                    self.sync_sidebar_to_active();
                    self.scroll_offset = 0;
                    self.selected_message = None;
                }
                self.mode = Mode::Insert;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.mode = Mode::Insert;
            }
            _ => {}
        }
    }

    fn handle_confirm_clear_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => {
                self.session.clear_all();
                self.persist();
                self.sync_sidebar_to_active();
                self.input.clear();
                self.editing_message = None;
                self.scroll_offset = 0;
                self.selected_message = None;
                self.mode = Mode::Insert;
                self.focus = Focus::Chat;
            }
            KeyCode::Char('n') | KeyCode::Esc => {
                self.mode = Mode::Insert;
            }
            _ => {}
        }
    }

    fn select_last_message(&mut self) {
        self.selected_message = self
            .session
            .active_chat()
            .filter(|c| !c.messages.is_empty())
            .map(|c| c.messages.len() - 1);
    }

    /// Submit the input box: either commit an in-place edit or send the
    /// text as a new prompt.
    fn submit_input(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }

        if let Some(message_id) = self.editing_message.take() {
            if let Some(chat_id) = self.session.active_chat_id {
                self.session.update_message(chat_id, message_id, &text);
                self.persist();
            }
            self.input.clear();
            return;
        }

        if self.pending.is_some() {
            self.status = Some("Still waiting for the previous reply".to_string());
            return;
        }

        let chat_id = match self.session.active_chat_id {
            Some(id) => id,
            None => self.session.new_chat(),
        };

        // Context is captured before the prompt is appended; the prompt
        // itself goes in the final contents entry.
        let history = self.session.context_window(self.config.history_window);
        self.session.add_message(chat_id, Role::User, &text);
        self.persist();
        self.input.clear();
        self.scroll_offset = 0;

        self.dispatch_request(chat_id, text, history);
    }

    fn delete_selected_message(&mut self) {
        let Some(index) = self.selected_message else {
            return;
        };
        let Some(chat_id) = self.session.active_chat_id else {
            return;
        };
        let Some(message_id) = self
            .session
            .chat(chat_id)
            .and_then(|c| c.messages.get(index))
            .map(|m| m.id)
        else {
            return;
        };
        self.session.delete_message(chat_id, message_id);
        self.persist();

        let remaining = self.session.chat(chat_id).map_or(0, |c| c.messages.len());
        self.selected_message = if remaining == 0 {
            None
        } else {
            Some(index.min(remaining - 1))
        };
    }

    fn edit_selected_message(&mut self) {
        let Some((id, content)) = self.selected_user_message() else {
            return;
        };
        self.input = content;
        self.editing_message = Some(id);
        self.mode = Mode::Insert;
        self.selected_message = None;
    }

    /// Resend a user message: the context is everything before it, the
    /// prompt is its content. This is the manual retry path after a
    /// failed request.
    fn resend_selected_message(&mut self) {
        if self.pending.is_some() {
            self.status = Some("Still waiting for the previous reply".to_string());
            return;
        }
        let Some(index) = self.selected_message else {
            return;
        };
        let Some(chat_id) = self.session.active_chat_id else {
            return;
        };
        let Some((prompt, history)) = self.session.chat(chat_id).and_then(|chat| {
            let message = chat.messages.get(index)?;
            if message.role != Role::User {
                return None;
            }
            let start = index.saturating_sub(self.config.history_window);
            Some((message.content.clone(), chat.messages[start..index].to_vec()))
        }) else {
            return;
        };

        self.mode = Mode::Insert;
        self.selected_message = None;
        self.scroll_offset = 0;
        self.dispatch_request(chat_id, prompt, history);
    }

    fn dispatch_request(
        &mut self,
        chat_id: u64,
        prompt: String,
        history: Vec<crate::session::Message>,
    ) {
        self.pending = Some(chat_id);
        self.pending_since = Some(Instant::now());

        let config = self.config.clone();
        let events = self.events.clone();
        std::thread::spawn(move || {
            let result = GeminiClient::from_config(&config)
                .and_then(|client| client.generate(&prompt, &history));
            let event = match result {
                Ok(text) => AppEvent::Reply { chat_id, text },
                Err(e) => {
                    tracing::warn!("Request failed: {e}");
                    AppEvent::Failed {
                        chat_id,
                        message: e.user_message(),
                    }
                }
            };
            // The receiver is gone only when the app is shutting down.
            let _ = events.send(event);
        });
    }

    /// Apply a worker event. Replies and failures both land in the
    /// transcript of the chat that issued the request.
    pub fn handle_event(&mut self, event: AppEvent) {
        let chat_id = match event {
            AppEvent::Reply { chat_id, text } => {
                self.session.add_message(chat_id, Role::Assistant, &text);
                chat_id
            }
            AppEvent::Failed { chat_id, message } => {
                self.session.add_error_message(chat_id, &message);
                chat_id
            }
        };
        self.persist();
        self.pending = None;
        self.pending_since = None;
        if self.session.active_chat_id == Some(chat_id) {
            self.scroll_offset = 0;
        }
    }

    fn selected_user_message(&self) -> Option<(u64, String)> {
        let index = self.selected_message?;
        let message = self.session.active_chat()?.messages.get(index)?;
        if message.role != Role::User {
            return None;
        }
        Some((message.id, message.content.clone()))
    }

    /// Animated suffix for the typing indicator.
    pub fn typing_dots(&self) -> &'static str {
        match self.pending_since {
            Some(since) => match (since.elapsed().as_millis() / 300) % 4 {
                0 => "",
                1 => ".",
                2 => "..",
                _ => "...",
            },
            None => "",
        }
    }
}
