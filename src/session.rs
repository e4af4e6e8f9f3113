//! Conversation threads, messages, and the operations the UI performs
//! on them. The whole `Session` is what gets persisted.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Marks failed-request notices that render in the error style.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: u64,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
}

/// The entire application state that gets serialized on every change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub chats: Vec<Chat>,
    pub active_chat_id: Option<u64>,
    pub chat_counter: u64,

    /// High-water mark for id generation. Not persisted; re-derived on load.
    #[serde(skip)]
    last_id: u64,
}

impl Default for Session {
    fn default() -> Self {
        let mut session = Session {
            chats: Vec::new(),
            active_chat_id: None,
            chat_counter: 1,
            last_id: 0,
        };
        session.new_chat();
        session
    }
}

impl Session {
    /// Ids are millisecond timestamps, forced monotonic so two mutations
    /// within the same millisecond cannot collide.
    fn next_id(&mut self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64;
        let id = now.max(self.last_id + 1);
        self.last_id = id;
        id
    }

    /// Re-derive the id high-water mark and make sure the active chat id
    /// points at an existing chat. Called after deserialization.
    pub fn normalize(&mut self) {
        self.last_id = self
            .chats
            .iter()
            .flat_map(|c| std::iter::once(c.id).chain(c.messages.iter().map(|m| m.id)))
            .max()
            .unwrap_or(0);

        let active_is_valid = self
            .active_chat_id
            .is_some_and(|id| self.chats.iter().any(|c| c.id == id));
        if !active_is_valid {
            self.active_chat_id = self.chats.first().map(|c| c.id);
        }
    }

    pub fn chat(&self, id: u64) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == id)
    }

    pub fn chat_mut(&mut self, id: u64) -> Option<&mut Chat> {
        self.chats.iter_mut().find(|c| c.id == id)
    }

    pub fn active_chat(&self) -> Option<&Chat> {
        self.active_chat_id.and_then(|id| self.chat(id))
    }

    pub fn active_chat_mut(&mut self) -> Option<&mut Chat> {
        match self.active_chat_id {
            Some(id) => self.chat_mut(id),
            None => None,
        }
    }

    /// Create a new empty chat, prepend it to the list, and make it active.
    /// Returns the new chat id.
    pub fn new_chat(&mut self) -> u64 {
        let id = self.next_id();
        let chat = Chat {
            id,
            title: format!("New Chat {}", self.chat_counter),
            created_at: Utc::now(),
            messages: Vec::new(),
        };
        self.chats.insert(0, chat);
        self.active_chat_id = Some(id);
        self.chat_counter += 1;
        id
    }

    pub fn select_chat(&mut self, id: u64) -> bool {
        if self.chats.iter().any(|c| c.id == id) {
            self.active_chat_id = Some(id);
            true
        } else {
            false
        }
    }

    /// Append a message to the given chat. The first user message of an
    /// empty chat also sets the chat title via the smart-title heuristic.
    /// Returns the new message id, or None when the chat does not exist.
    pub fn add_message(&mut self, chat_id: u64, role: Role, content: &str) -> Option<u64> {
        let id = self.next_id();
        let chat = self.chat_mut(chat_id)?;
        if chat.messages.is_empty() && role == Role::User {
            chat.title = smart_title(content);
        }
        chat.messages.push(Message {
            id,
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
            error: false,
        });
        Some(id)
    }

    /// Append a failed-request notice to the transcript. It reads like an
    /// assistant message but carries the error flag for styling.
    pub fn add_error_message(&mut self, chat_id: u64, content: &str) -> Option<u64> {
        let id = self.next_id();
        let chat = self.chat_mut(chat_id)?;
        chat.messages.push(Message {
            id,
            role: Role::Assistant,
            content: content.to_string(),
            timestamp: Utc::now(),
            error: true,
        });
        Some(id)
    }

    pub fn rename_chat(&mut self, id: u64, title: &str) -> bool {
        match self.chat_mut(id) {
            Some(chat) => {
                chat.title = title.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove a chat. Deleting the active chat activates the first
    /// remaining one.
    pub fn delete_chat(&mut self, id: u64) -> bool {
        let before = self.chats.len();
        self.chats.retain(|c| c.id != id);
        if self.chats.len() == before {
            return false;
        }
        if self.active_chat_id == Some(id) {
            self.active_chat_id = self.chats.first().map(|c| c.id);
        }
        true
    }

    pub fn delete_message(&mut self, chat_id: u64, message_id: u64) -> bool {
        match self.chat_mut(chat_id) {
            Some(chat) => {
                let before = chat.messages.len();
                chat.messages.retain(|m| m.id != message_id);
                chat.messages.len() != before
            }
            None => false,
        }
    }

    pub fn update_message(&mut self, chat_id: u64, message_id: u64, content: &str) -> bool {
        let Some(chat) = self.chat_mut(chat_id) else {
            return false;
        };
        match chat.messages.iter_mut().find(|m| m.id == message_id) {
            Some(msg) => {
                msg.content = content.to_string();
                true
            }
            None => false,
        }
    }

    /// Drop everything and start over with a single fresh chat.
    pub fn clear_all(&mut self) {
        self.chats.clear();
        self.chat_counter = 1;
        self.new_chat();
    }

    /// The trailing messages of the active chat, cloned for handing off to
    /// the request worker.
    pub fn context_window(&self, limit: usize) -> Vec<Message> {
        match self.active_chat() {
            Some(chat) => {
                let start = chat.messages.len().saturating_sub(limit);
                chat.messages[start..].to_vec()
            }
            None => Vec::new(),
        }
    }
}

static QUESTION_LEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(what|how|why|when|where|who|can|could|should|is|are|do|does|explain|tell|show|write|create|make|help)",
    )
    .expect("question lead pattern is valid")
});

/// Derive a chat title from the first user message.
///
/// Short messages are used verbatim. Longer ones prefer the first
/// sentence when it fits, then fall back to truncating at a word
/// boundary; question-shaped messages keep the full 40-char prefix when
/// no good boundary exists, everything else gets cut a little shorter.
pub fn smart_title(message: &str) -> String {
    const MAX_TITLE_CHARS: usize = 40;

    let cleaned = message.trim();
    if cleaned.chars().count() <= MAX_TITLE_CHARS {
        return cleaned.to_string();
    }

    let first_sentence = cleaned
        .split(['.', '!', '?'])
        .next()
        .unwrap_or("")
        .trim_end();
    if first_sentence.chars().count() <= MAX_TITLE_CHARS {
        return first_sentence.to_string();
    }

    let truncated: String = cleaned.chars().take(MAX_TITLE_CHARS).collect();
    // The boundary threshold is in characters, so multibyte text does
    // not shift where the cut lands.
    match truncated.rfind(' ') {
        Some(idx) if truncated[..idx].chars().count() > 20 => truncated[..idx].to_string(),
        _ if QUESTION_LEAD.is_match(cleaned) => truncated,
        _ => truncated.chars().take(37).collect(),
    }
}
