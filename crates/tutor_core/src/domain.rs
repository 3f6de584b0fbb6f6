//! crates/tutor_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or web framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A titled work the student can chat about. Reference data, never mutated here.
#[derive(Debug, Clone)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,
}

/// A bounded slice of a book's text used as retrieval context for the model.
#[derive(Debug, Clone)]
pub struct BookChunk {
    pub id: String,
    pub book_id: String,
    pub content: String,
    pub page_number: i64,
}

// Only used internally for login/registration - contains sensitive data.
// Guests never appear here: they have no email and no password.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: String,
    pub email: String,
    pub password_hash: String,
}

/// Which side of the conversation wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// Structured teaching feedback attached to an assistant reply.
///
/// All three fields are always present, possibly as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    #[serde(default)]
    pub grammar: String,
    #[serde(default)]
    pub vocabulary: String,
    #[serde(default)]
    pub encouragement: String,
}

/// A single message within a conversation. Feedback is only ever present on
/// assistant messages.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    pub feedback: Option<Feedback>,
    pub created_at: DateTime<Utc>,
}

/// The normalized result of one model invocation: the in-character reply plus
/// structured feedback and the rewrite flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorReply {
    pub reply: String,
    pub feedback: Feedback,
    pub require_rewrite: bool,
}
