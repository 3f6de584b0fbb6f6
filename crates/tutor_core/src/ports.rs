//! crates/tutor_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;

use crate::domain::{Book, BookChunk, Feedback, Message, MessageRole, TutorReply, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Book Catalog ---
    async fn get_books(&self) -> PortResult<Vec<Book>>;

    /// Returns at most a small fixed number of chunks for the book, in storage
    /// order. There is no relevance ranking.
    async fn get_book_chunks(&self, book_id: &str) -> PortResult<Vec<BookChunk>>;

    // --- User Management ---
    /// Looks up a registered (non-guest) user's credentials by email.
    async fn get_user_by_email(&self, email: &str) -> PortResult<Option<UserCredentials>>;

    async fn create_user(&self, email: &str, password_hash: &str) -> PortResult<String>;

    /// Counts the user-role messages across every conversation owned by the
    /// guest user with this guest identifier, i.e. the guest's completed turns.
    async fn get_guest_message_count(&self, guest_id: &str) -> PortResult<i64>;

    // --- Conversations & Messages ---
    /// Creates a conversation, first upserting the guest user row when
    /// `is_guest` is true so the owning user is guaranteed to exist.
    async fn create_conversation(
        &self,
        user_id: &str,
        book_id: &str,
        is_guest: bool,
    ) -> PortResult<String>;

    async fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
        feedback: Option<&Feedback>,
    ) -> PortResult<()>;

    /// Returns the conversation's messages ascending by creation time, with
    /// feedback deserialized from its stored textual form.
    async fn get_conversation_history(&self, conversation_id: &str) -> PortResult<Vec<Message>>;
}

#[async_trait]
pub trait TutorModelService: Send + Sync {
    /// Produces the teacher's reply for an assembled prompt.
    ///
    /// This never fails from the caller's perspective: call failures and
    /// malformed model output are normalized to a fixed fallback reply so the
    /// orchestrator always receives a well-shaped result.
    async fn complete(&self, prompt: &str) -> TutorReply;
}
