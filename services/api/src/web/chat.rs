//! services/api/src/web/chat.rs
//!
//! The chat-turn orchestrator and its supporting read-only endpoints.
//!
//! One chat request walks a fixed sequence: resolve the caller, check the
//! guest quota, resolve the conversation, persist the student's message,
//! gather book context and history, assemble the prompt, invoke the model,
//! persist the reply, respond. Context retrieval and the model call degrade
//! locally; everything else surfaces as a 500.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};
use tutor_core::domain::{Feedback, MessageRole};
use tutor_core::ports::PortError;
use tutor_core::prompt::assemble_prompt;
use tutor_core::quota::remaining_messages;
use utoipa::ToSchema;

use crate::auth::token;
use crate::web::state::AppState;

/// The conversational reply returned when a guest has used up their quota.
/// The UI renders it as a normal turn, not an error state.
const GUEST_LIMIT_REPLY: &str =
    "You've used all of your free messages for now. Create an account to keep practicing with me!";

const EMPTY_CONTEXT_PLACEHOLDER: &str = "No specific book context found.";
const CONTEXT_FAILURE_PLACEHOLDER: &str = "Context retrieval failed.";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct BookSummary {
    pub id: String,
    pub title: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageQuery {
    pub guest_id: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub remaining_messages: u32,
    pub max_messages: u32,
}

/// Required fields are optional at the type level so their absence surfaces
/// as a 400 validation error rather than a framework rejection.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub book_id: Option<String>,
    pub message: Option<String>,
    pub conversation_id: Option<String>,
    pub guest_id: Option<String>,
}

/// The wire form of the structured feedback.
#[derive(Serialize, ToSchema)]
pub struct FeedbackBody {
    pub grammar: String,
    pub vocabulary: String,
    pub encouragement: String,
}

impl From<Feedback> for FeedbackBody {
    fn from(f: Feedback) -> Self {
        Self {
            grammar: f.grammar,
            vocabulary: f.vocabulary,
            encouragement: f.encouragement,
        }
    }
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub reply: String,
    pub feedback: FeedbackBody,
    pub require_rewrite: bool,
    pub conversation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_messages: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_messages: Option<u32>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuotaBlockedResponse {
    pub error: String,
    pub reply: String,
    pub limit_reached: bool,
    pub remaining_messages: u32,
    pub max_messages: u32,
}

//=========================================================================================
// Caller Resolution
//=========================================================================================

enum Caller {
    Authenticated { user_id: String },
    Guest { guest_id: String },
}

/// Resolves the caller from a bearer token when one verifies, else from the
/// client-supplied guest identifier. A request with neither is invalid.
fn resolve_caller(
    headers: &HeaderMap,
    guest_id: Option<&str>,
    secret: &str,
) -> Result<Caller, (StatusCode, String)> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if let Some(raw) = bearer {
        if let Some(claims) = token::verify(raw, secret) {
            return Ok(Caller::Authenticated {
                user_id: claims.sub,
            });
        }
    }

    match guest_id {
        Some(id) if !id.is_empty() => Ok(Caller::Guest {
            guest_id: id.to_string(),
        }),
        _ => Err((
            StatusCode::BAD_REQUEST,
            "guestId is required for unauthenticated requests".to_string(),
        )),
    }
}

fn storage_error(e: PortError) -> (StatusCode, String) {
    error!("Storage operation failed: {:?}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// GET /api/books - List the available books
#[utoipa::path(
    get,
    path = "/api/books",
    responses(
        (status = 200, description = "The book catalog", body = [BookSummary]),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn books_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BookSummary>>, (StatusCode, String)> {
    let books = state.db.get_books().await.map_err(storage_error)?;
    Ok(Json(
        books
            .into_iter()
            .map(|b| BookSummary {
                id: b.id,
                title: b.title,
            })
            .collect(),
    ))
}

/// GET /api/usage - Lightweight guest quota check; inserts nothing
#[utoipa::path(
    get,
    path = "/api/usage",
    params(("guestId" = String, Query, description = "The guest's client-generated identifier")),
    responses(
        (status = 200, description = "Remaining allowance", body = UsageResponse),
        (status = 400, description = "Missing guestId"),
        (status = 500, description = "Storage failure")
    )
)]
pub async fn usage_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<UsageResponse>, (StatusCode, String)> {
    let Some(guest_id) = query.guest_id.filter(|id| !id.is_empty()) else {
        return Err((StatusCode::BAD_REQUEST, "guestId is required".to_string()));
    };

    let used = state
        .db
        .get_guest_message_count(&guest_id)
        .await
        .map_err(storage_error)?;
    let max = state.config.max_guest_messages;

    Ok(Json(UsageResponse {
        remaining_messages: remaining_messages(used, max),
        max_messages: max,
    }))
}

/// POST /api/chat - Run one tutoring turn
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The teacher's reply", body = ChatResponse),
        (status = 400, description = "Missing required fields"),
        (status = 403, description = "Guest quota exhausted", body = QuotaBlockedResponse),
        (status = 500, description = "Unhandled failure")
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Response, (StatusCode, String)> {
    // --- AuthResolve / validation ---
    let (Some(book_id), Some(message)) = (req.book_id, req.message) else {
        return Err((
            StatusCode::BAD_REQUEST,
            "bookId and message are required".to_string(),
        ));
    };
    if book_id.is_empty() || message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "bookId and message are required".to_string(),
        ));
    }
    let caller = resolve_caller(&headers, req.guest_id.as_deref(), &state.config.token_secret)?;
    let max = state.config.max_guest_messages;

    // --- QuotaCheck (guests only): block before anything is persisted ---
    if let Caller::Guest { guest_id } = &caller {
        let used = state
            .db
            .get_guest_message_count(guest_id)
            .await
            .map_err(storage_error)?;
        if used >= i64::from(max) {
            let blocked = QuotaBlockedResponse {
                error: "Guest message limit reached".to_string(),
                reply: GUEST_LIMIT_REPLY.to_string(),
                limit_reached: true,
                remaining_messages: 0,
                max_messages: max,
            };
            return Ok((StatusCode::FORBIDDEN, Json(blocked)).into_response());
        }
    }

    let (user_id, is_guest) = match &caller {
        Caller::Authenticated { user_id } => (user_id.clone(), false),
        Caller::Guest { guest_id } => (guest_id.clone(), true),
    };

    // --- ConversationResolve ---
    let conversation_id = match req.conversation_id {
        Some(id) => id,
        None => state
            .db
            .create_conversation(&user_id, &book_id, is_guest)
            .await
            .map_err(storage_error)?,
    };

    // --- PersistUserMessage: before any retrieval, so a crash mid-turn
    // still leaves the student's message recorded ---
    state
        .db
        .add_message(&conversation_id, MessageRole::User, &message, None)
        .await
        .map_err(storage_error)?;

    // --- ContextRetrieve: degrades to a placeholder rather than aborting ---
    let book_context = match state.db.get_book_chunks(&book_id).await {
        Ok(chunks) if !chunks.is_empty() => chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n"),
        Ok(_) => EMPTY_CONTEXT_PLACEHOLDER.to_string(),
        Err(e) => {
            warn!("Context retrieval failed: {:?}", e);
            CONTEXT_FAILURE_PLACEHOLDER.to_string()
        }
    };

    // --- HistoryFetch ---
    let history: Vec<String> = state
        .db
        .get_conversation_history(&conversation_id)
        .await
        .map_err(storage_error)?
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str().to_uppercase(), m.content))
        .collect();

    // --- PromptAssemble / ModelInvoke (the adapter never fails) ---
    let prompt = assemble_prompt(&book_context, &history, &message);
    let turn = state.model.complete(&prompt).await;

    // --- PersistAssistantMessage: always, including fallback content, so
    // history stays consistent with what the student saw ---
    state
        .db
        .add_message(
            &conversation_id,
            MessageRole::Assistant,
            &turn.reply,
            Some(&turn.feedback),
        )
        .await
        .map_err(storage_error)?;

    // --- RespondSuccess: guest counts reflect the just-persisted turn ---
    let (remaining, max_messages) = match &caller {
        Caller::Guest { guest_id } => {
            let used = state
                .db
                .get_guest_message_count(guest_id)
                .await
                .map_err(storage_error)?;
            (Some(remaining_messages(used, max)), Some(max))
        }
        Caller::Authenticated { .. } => (None, None),
    };

    let response = ChatResponse {
        reply: turn.reply,
        feedback: turn.feedback.into(),
        require_rewrite: turn.require_rewrite,
        conversation_id,
        remaining_messages: remaining,
        max_messages,
    };
    Ok(Json(response).into_response())
}
