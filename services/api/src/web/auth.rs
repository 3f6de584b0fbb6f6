//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user registration and login.

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use tutor_core::ports::PortError;
use utoipa::ToSchema;

use crate::auth::{password, token, Claims};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

/// Both fields are optional at the type level so a missing field surfaces as a
/// 400 validation error rather than a framework rejection.
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub user_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user_id: String,
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User created successfully", body = RegisterResponse),
        (status = 400, description = "Missing fields or email already registered"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, (StatusCode, String)> {
    let (Some(email), Some(pw)) = (req.email, req.password) else {
        return Err((
            StatusCode::BAD_REQUEST,
            "Email and password are required".to_string(),
        ));
    };
    if email.is_empty() || pw.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Email and password are required".to_string(),
        ));
    }

    let existing = state.db.get_user_by_email(&email).await.map_err(|e| {
        error!("Failed to look up user: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    if existing.is_some() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Email is already registered".to_string(),
        ));
    }

    let password_hash = password::hash(&pw);
    let user_id = state
        .db
        .create_user(&email, &password_hash)
        .await
        .map_err(|e| match e {
            // Covers the race where the same email registers twice between
            // the lookup above and this insert.
            PortError::Conflict(msg) => (StatusCode::BAD_REQUEST, msg),
            other => {
                error!("Failed to create user: {:?}", other);
                (StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
            }
        })?;

    Ok(Json(RegisterResponse {
        success: true,
        user_id,
    }))
}

/// POST /api/auth/login - Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, String)> {
    let invalid = || {
        (
            StatusCode::UNAUTHORIZED,
            "Invalid email or password".to_string(),
        )
    };

    let (Some(email), Some(pw)) = (req.email, req.password) else {
        return Err(invalid());
    };

    let creds = state
        .db
        .get_user_by_email(&email)
        .await
        .map_err(|e| {
            error!("Failed to look up user: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or_else(invalid)?;

    if !password::verify(&pw, &creds.password_hash) {
        return Err(invalid());
    }

    let claims = Claims {
        sub: creds.user_id.clone(),
        iat: Utc::now().timestamp(),
    };
    let token = token::sign(&claims, &state.config.token_secret);

    Ok(Json(LoginResponse {
        token,
        user_id: creds.user_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::testing::{test_state, MockDb, ScriptedModel, TEST_SECRET};

    fn register_request(email: &str, pw: &str) -> Json<RegisterRequest> {
        Json(RegisterRequest {
            email: Some(email.to_string()),
            password: Some(pw.to_string()),
        })
    }

    #[tokio::test]
    async fn register_rejects_missing_fields_and_duplicates() {
        let state = test_state(
            Arc::new(MockDb::default()),
            Arc::new(ScriptedModel::saying("unused")),
        );

        let missing = register_handler(
            State(state.clone()),
            Json(RegisterRequest {
                email: Some("alice@example.com".to_string()),
                password: None,
            }),
        )
        .await;
        assert_eq!(missing.unwrap_err().0, StatusCode::BAD_REQUEST);

        let first = register_handler(State(state.clone()), register_request("alice@example.com", "pw123"))
            .await
            .unwrap();
        assert!(first.0.success);

        let duplicate =
            register_handler(State(state), register_request("alice@example.com", "other")).await;
        assert_eq!(duplicate.unwrap_err().0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_issues_a_verifiable_token() {
        let state = test_state(
            Arc::new(MockDb::default()),
            Arc::new(ScriptedModel::saying("unused")),
        );
        let registered = register_handler(State(state.clone()), register_request("a@b.com", "pw123"))
            .await
            .unwrap();

        let login = login_handler(
            State(state),
            Json(LoginRequest {
                email: Some("a@b.com".to_string()),
                password: Some("pw123".to_string()),
            }),
        )
        .await
        .unwrap();

        let claims = token::verify(&login.0.token, TEST_SECRET).expect("token verifies");
        assert_eq!(claims.sub, registered.0.user_id);
    }

    #[tokio::test]
    async fn login_rejects_bad_credentials() {
        let state = test_state(
            Arc::new(MockDb::default()),
            Arc::new(ScriptedModel::saying("unused")),
        );
        register_handler(State(state.clone()), register_request("a@b.com", "pw123"))
            .await
            .unwrap();

        let wrong_password = login_handler(
            State(state.clone()),
            Json(LoginRequest {
                email: Some("a@b.com".to_string()),
                password: Some("nope".to_string()),
            }),
        )
        .await;
        assert_eq!(wrong_password.unwrap_err().0, StatusCode::UNAUTHORIZED);

        let unknown_user = login_handler(
            State(state),
            Json(LoginRequest {
                email: Some("nobody@b.com".to_string()),
                password: Some("pw123".to_string()),
            }),
        )
        .await;
        assert_eq!(unknown_user.unwrap_err().0, StatusCode::UNAUTHORIZED);
    }
}
