//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the SQLite database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tutor_core::domain::{Book, BookChunk, Feedback, Message, MessageRole, UserCredentials};
use tutor_core::ports::{DatabaseService, PortError, PortResult};
use uuid::Uuid;

/// The fixed number of chunks returned as model context for a book.
/// Storage order, no relevance ranking.
const CONTEXT_CHUNK_LIMIT: i64 = 5;

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct BookRecord {
    id: String,
    title: String,
    author: Option<String>,
    description: Option<String>,
}
impl BookRecord {
    fn to_domain(self) -> Book {
        Book {
            id: self.id,
            title: self.title,
            author: self.author,
            description: self.description,
        }
    }
}

#[derive(FromRow)]
struct BookChunkRecord {
    id: String,
    book_id: String,
    content: String,
    page_number: i64,
}
impl BookChunkRecord {
    fn to_domain(self) -> BookChunk {
        BookChunk {
            id: self.id,
            book_id: self.book_id,
            content: self.content,
            page_number: self.page_number,
        }
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: String,
    email: String,
    password_hash: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> UserCredentials {
        UserCredentials {
            user_id: self.id,
            email: self.email,
            password_hash: self.password_hash,
        }
    }
}

#[derive(FromRow)]
struct MessageRecord {
    id: String,
    conversation_id: String,
    role: String,
    content: String,
    feedback_json: Option<String>,
    created_at: DateTime<Utc>,
}
impl MessageRecord {
    fn to_domain(self) -> Message {
        let role = match self.role.as_str() {
            "assistant" => MessageRole::Assistant,
            _ => MessageRole::User,
        };
        // A row that predates the current feedback shape deserializes to None
        // rather than failing the whole history read.
        let feedback = self
            .feedback_json
            .as_deref()
            .and_then(|raw| serde_json::from_str::<Feedback>(raw).ok());
        Message {
            id: self.id,
            conversation_id: self.conversation_id,
            role,
            content: self.content,
            feedback,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn get_books(&self) -> PortResult<Vec<Book>> {
        let records = sqlx::query_as::<_, BookRecord>(
            "SELECT id, title, author, description FROM books ORDER BY title",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_book_chunks(&self, book_id: &str) -> PortResult<Vec<BookChunk>> {
        let records = sqlx::query_as::<_, BookChunkRecord>(
            "SELECT id, book_id, content, page_number FROM book_chunks WHERE book_id = ? LIMIT ?",
        )
        .bind(book_id)
        .bind(CONTEXT_CHUNK_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn get_user_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, email, password_hash FROM users WHERE email = ? AND is_guest = 0",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(record.map(|r| r.to_domain()))
    }

    async fn create_user(&self, email: &str, password_hash: &str) -> PortResult<String> {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, is_guest, created_at) \
             VALUES (?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(email)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                PortError::Conflict(format!("Email {} is already registered", email))
            }
            _ => unexpected(e),
        })?;

        Ok(id)
    }

    async fn get_guest_message_count(&self, guest_id: &str) -> PortResult<i64> {
        // Only user-role messages count against the quota, so the observable
        // count equals the guest's completed turns.
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages m \
             JOIN conversations c ON m.conversation_id = c.id \
             JOIN users u ON c.user_id = u.id \
             WHERE u.guest_id = ? AND u.is_guest = 1 AND m.role = 'user'",
        )
        .bind(guest_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(count)
    }

    async fn create_conversation(
        &self,
        user_id: &str,
        book_id: &str,
        is_guest: bool,
    ) -> PortResult<String> {
        // The guest row must exist before the conversation insert. The
        // insert-or-ignore upsert avoids a race between an existence check
        // and the insert.
        if is_guest {
            sqlx::query(
                "INSERT OR IGNORE INTO users (id, email, password_hash, is_guest, guest_id, created_at) \
                 VALUES (?, NULL, NULL, 1, ?, ?)",
            )
            .bind(user_id)
            .bind(user_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        }

        let id = Uuid::new_v4().to_string();
        sqlx::query("INSERT INTO conversations (id, user_id, book_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(&id)
            .bind(user_id)
            .bind(book_id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;

        Ok(id)
    }

    async fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
        feedback: Option<&Feedback>,
    ) -> PortResult<()> {
        let feedback_json = feedback
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        sqlx::query(
            "INSERT INTO messages (id, conversation_id, role, content, feedback_json, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(conversation_id)
        .bind(role.as_str())
        .bind(content)
        .bind(feedback_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(())
    }

    async fn get_conversation_history(&self, conversation_id: &str) -> PortResult<Vec<Message>> {
        // rowid breaks ties when two messages land on the same timestamp,
        // keeping the user-then-assistant turn order stable.
        let records = sqlx::query_as::<_, MessageRecord>(
            "SELECT id, conversation_id, role, content, feedback_json, created_at \
             FROM messages WHERE conversation_id = ? ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}
