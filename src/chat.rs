//! Transcript entries, attachments, and the persisted lesson history.

use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tutor::StructuredTutorResponse;

/// Fallback assistant reply when the model call fails for any reason.
/// Transport, parse, and schema errors all collapse to this one message.
pub const FALLBACK_REPLY: &str =
    "I encountered a problem processing your request. Please try again.";

/// Echoed user content when a message carries only attachments.
pub const ATTACHMENT_ONLY_PLACEHOLDER: &str = "Analyzed content request";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// An immutable binary payload attached to a message. Referenced by the
/// carrying message, never copied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Base64-encoded payload, possibly with a data-URL prefix when it came
    /// from an earlier record.
    pub data: String,
    pub mime_type: String,
    pub name: String,
}

impl Attachment {
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: mime_type.into(),
            name: name.into(),
        }
    }

    /// One-shot encode-and-attach step at the end of an audio capture.
    pub fn voice_note(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes, "audio/webm", "Voice Question")
    }

    /// The raw base64 payload with any `data:...,` prefix stripped.
    pub fn payload(&self) -> &str {
        self.data
            .split_once(',')
            .map(|(_, rest)| rest)
            .unwrap_or(&self.data)
    }
}

/// Accumulates audio chunks pushed by the capture device until stopped.
///
/// Acquiring the microphone is the embedding surface's job; a denied
/// device means this recorder is simply never constructed.
#[derive(Debug, Default)]
pub struct VoiceRecorder {
    chunks: Vec<u8>,
}

impl VoiceRecorder {
    pub fn start() -> Self {
        Self::default()
    }

    pub fn push_chunk(&mut self, bytes: &[u8]) {
        self.chunks.extend_from_slice(bytes);
    }

    pub fn finish(self) -> Attachment {
        Attachment::voice_note(&self.chunks)
    }
}

/// One transcript entry. Either `content` is the whole message, or a
/// structured payload is present and `content` is its short summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured: Option<StructuredTutorResponse>,
    #[serde(default)]
    pub bookmarked: bool,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        let content = content.into();
        let content = if content.trim().is_empty() && !attachments.is_empty() {
            ATTACHMENT_ONLY_PLACEHOLDER.to_string()
        } else {
            content
        };
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content,
            timestamp: Utc::now(),
            attachments: if attachments.is_empty() {
                None
            } else {
                Some(attachments)
            },
            structured: None,
            bookmarked: false,
        }
    }

    pub fn assistant(reply: StructuredTutorResponse) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: reply.summary.clone(),
            timestamp: Utc::now(),
            attachments: None,
            structured: Some(reply),
            bookmarked: false,
        }
    }

    /// Plain-content apology appended when a model call fails.
    pub fn fallback() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: FALLBACK_REPLY.to_string(),
            timestamp: Utc::now(),
            attachments: None,
            structured: None,
            bookmarked: false,
        }
    }
}

/// Append-only, reverse-chronological lesson history. Entries are never
/// mutated except for the bookmark flag, and never deleted individually.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    messages: Vec<ChatMessage>,
}

impl History {
    pub fn from_messages(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    /// Newest entries first.
    pub fn record(&mut self, message: ChatMessage) {
        self.messages.insert(0, message);
    }

    /// Flip the bookmark on one message; other messages are untouched.
    /// Returns false when no message has the given id.
    pub fn toggle_bookmark(&mut self, id: &str) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.bookmarked = !message.bookmarked;
                true
            }
            None => false,
        }
    }

    /// Assistant lessons, for the history tab.
    pub fn lessons(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter().filter(|m| m.role == Role::Assistant)
    }

    /// Bookmarked lessons, for the revision tab.
    pub fn bookmarked(&self) -> impl Iterator<Item = &ChatMessage> {
        self.lessons().filter(|m| m.bookmarked)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
