pub mod auth;
pub mod chat;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

use utoipa::OpenApi;

pub use auth::{login_handler, register_handler};
pub use chat::{books_handler, chat_handler, usage_handler};

/// The master definition for the OpenAPI specification.
#[derive(OpenApi)]
#[openapi(
    paths(
        chat::books_handler,
        chat::usage_handler,
        chat::chat_handler,
        auth::register_handler,
        auth::login_handler,
    ),
    components(schemas(
        chat::BookSummary,
        chat::UsageResponse,
        chat::ChatRequest,
        chat::ChatResponse,
        chat::FeedbackBody,
        chat::QuotaBlockedResponse,
        auth::RegisterRequest,
        auth::RegisterResponse,
        auth::LoginRequest,
        auth::LoginResponse,
    )),
    tags(
        (name = "Book Tutor API", description = "API endpoints for the conversational book tutor.")
    )
)]
pub struct ApiDoc;
