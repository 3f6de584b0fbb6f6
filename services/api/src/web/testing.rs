//! services/api/src/web/testing.rs
//!
//! In-memory fakes for the service ports, shared by the handler tests. The
//! fake database keeps just enough state to observe what the orchestrator
//! persisted; the fake model replays a scripted reply.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tracing::Level;
use tutor_core::domain::{
    Book, BookChunk, Feedback, Message, MessageRole, TutorReply, UserCredentials,
};
use tutor_core::ports::{DatabaseService, PortError, PortResult, TutorModelService};

use crate::config::Config;
use crate::web::state::AppState;

pub(crate) const TEST_SECRET: &str = "test-secret";

#[derive(Debug, Clone)]
pub(crate) struct StoredMessage {
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    pub feedback: Option<Feedback>,
    pub seq: u64,
}

#[derive(Default)]
pub(crate) struct MockDb {
    /// email -> (user_id, password_hash)
    pub users: Mutex<HashMap<String, (String, String)>>,
    pub guest_rows: Mutex<HashSet<String>>,
    /// (conversation_id, user_id, book_id)
    pub conversations: Mutex<Vec<(String, String, String)>>,
    pub messages: Mutex<Vec<StoredMessage>>,
    pub books: Vec<Book>,
    pub chunks: Vec<BookChunk>,
    pub fail_chunks: bool,
    pub next_id: AtomicU64,
}

impl MockDb {
    pub fn with_chunks(chunks: Vec<BookChunk>) -> Self {
        Self {
            chunks,
            ..Self::default()
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    pub fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

fn timestamp_for(seq: u64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seq as i64, 0).unwrap()
}

#[async_trait]
impl DatabaseService for MockDb {
    async fn get_books(&self) -> PortResult<Vec<Book>> {
        Ok(self.books.clone())
    }

    async fn get_book_chunks(&self, book_id: &str) -> PortResult<Vec<BookChunk>> {
        if self.fail_chunks {
            return Err(PortError::Unexpected("chunk store unavailable".to_string()));
        }
        Ok(self
            .chunks
            .iter()
            .filter(|c| c.book_id == book_id)
            .take(5)
            .cloned()
            .collect())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        Ok(self.users.lock().unwrap().get(email).map(|(id, hash)| {
            UserCredentials {
                user_id: id.clone(),
                email: email.to_string(),
                password_hash: hash.clone(),
            }
        }))
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> PortResult<String> {
        let mut users = self.users.lock().unwrap();
        if users.contains_key(email) {
            return Err(PortError::Conflict(format!(
                "Email {} is already registered",
                email
            )));
        }
        let id = format!("user-{}", self.next_id());
        users.insert(email.to_string(), (id.clone(), password_hash.to_string()));
        Ok(id)
    }

    async fn get_guest_message_count(&self, guest_id: &str) -> PortResult<i64> {
        if !self.guest_rows.lock().unwrap().contains(guest_id) {
            return Ok(0);
        }
        let conversation_ids: HashSet<String> = self
            .conversations
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, user_id, _)| user_id == guest_id)
            .map(|(id, _, _)| id.clone())
            .collect();
        let count = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| {
                m.role == MessageRole::User && conversation_ids.contains(&m.conversation_id)
            })
            .count();
        Ok(count as i64)
    }

    async fn create_conversation(
        &self,
        user_id: &str,
        book_id: &str,
        is_guest: bool,
    ) -> PortResult<String> {
        if is_guest {
            self.guest_rows
                .lock()
                .unwrap()
                .insert(user_id.to_string());
        }
        let id = format!("conv-{}", self.next_id());
        self.conversations.lock().unwrap().push((
            id.clone(),
            user_id.to_string(),
            book_id.to_string(),
        ));
        Ok(id)
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
        feedback: Option<&Feedback>,
    ) -> PortResult<()> {
        let seq = self.next_id();
        self.messages.lock().unwrap().push(StoredMessage {
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            feedback: feedback.cloned(),
            seq,
        });
        Ok(())
    }

    async fn get_conversation_history(&self, conversation_id: &str) -> PortResult<Vec<Message>> {
        let mut stored: Vec<StoredMessage> = self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        stored.sort_by_key(|m| m.seq);
        Ok(stored
            .into_iter()
            .map(|m| Message {
                id: format!("msg-{}", m.seq),
                conversation_id: m.conversation_id,
                role: m.role,
                content: m.content,
                feedback: m.feedback,
                created_at: timestamp_for(m.seq),
            })
            .collect())
    }
}

/// A model fake that replays a fixed reply and records nothing.
pub(crate) struct ScriptedModel {
    pub reply: TutorReply,
}

impl ScriptedModel {
    pub fn saying(reply: &str) -> Self {
        Self {
            reply: TutorReply {
                reply: reply.to_string(),
                feedback: Feedback {
                    grammar: "Perfect!".to_string(),
                    vocabulary: "Good usage!".to_string(),
                    encouragement: "Keep it up!".to_string(),
                },
                require_rewrite: false,
            },
        }
    }
}

#[async_trait]
impl TutorModelService for ScriptedModel {
    async fn complete(&self, _prompt: &str) -> TutorReply {
        self.reply.clone()
    }
}

pub(crate) fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse::<SocketAddr>().unwrap(),
        database_url: String::new(),
        log_level: Level::INFO,
        allowed_origin: "http://localhost:3000".to_string(),
        openai_api_key: None,
        chat_model: "test-model".to_string(),
        model_timeout: Duration::from_secs(1),
        token_secret: TEST_SECRET.to_string(),
        max_guest_messages: 5,
    }
}

pub(crate) fn test_state(db: Arc<MockDb>, model: Arc<ScriptedModel>) -> Arc<AppState> {
    Arc::new(AppState {
        db,
        model,
        config: Arc::new(test_config()),
    })
}

/// Reads a response body back into JSON for assertions.
pub(crate) async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
