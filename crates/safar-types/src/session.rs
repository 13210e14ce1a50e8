use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::language::Language;
use crate::message::Message;

/// One user's conversation. Lives only as long as the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    messages: Vec<Message>,
    language: Language,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            messages: Vec::new(),
            language: Language::default(),
            created_at: Utc::now(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// Re-detect the response language from fresh user text. Text without
    /// letters (a bare ticket id, digits) keeps the current language.
    pub fn observe_language(&mut self, text: &str) -> Language {
        if let Some(detected) = Language::detect(text) {
            self.language = detected;
        }
        self.language
    }

    /// Drop everything appended after `checkpoint` (a previous `len()`).
    /// Used to undo a turn the model never completed.
    pub fn rollback_to(&mut self, checkpoint: usize) {
        self.messages.truncate(checkpoint);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
