use std::collections::BTreeMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use link_auth::TokenError;

/// Application-level error for HTTP handlers. Every foreseeable failure is
/// classified into one of these before a response is written, and every
/// error branch is terminal.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Field-level validation failures: `{"error": {<field>: <message>}}`.
    #[error("validation failed")]
    Validation(BTreeMap<&'static str, String>),

    /// Authenticated-stage failures (wrong password).
    #[error("{0}")]
    Unauthorized(String),

    /// Access-token state. Expired is a signal to run the refresh step
    /// (401); invalid fails closed (403).
    #[error("token is {0}")]
    Token(TokenError),

    /// Authenticated but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// Resource or relationship absence.
    #[error("{0}")]
    NotFound(String),

    /// Malformed or rejected input with a single message.
    #[error("{0}")]
    BadRequest(String),

    /// Anything unexpected from the storage or collaborator layers.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn validation<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, S)>,
        S: Into<String>,
    {
        Self::Validation(fields.into_iter().map(|(k, v)| (k, v.into())).collect())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    /// A blocking storage task failed to join.
    pub fn join(e: tokio::task::JoinError) -> Self {
        Self::Internal(anyhow::anyhow!("spawn_blocking join error: {e}"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": false, "error": fields }),
            ),
            ApiError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                json!({ "status": false, "error": { "result": msg } }),
            ),
            ApiError::Token(state) => {
                let status = match state {
                    TokenError::Expired => StatusCode::UNAUTHORIZED,
                    TokenError::Invalid => StatusCode::FORBIDDEN,
                };
                (
                    status,
                    json!({
                        "status": false,
                        "token": state.to_string(),
                        "error": { "result": format!("Token is {state}.") },
                    }),
                )
            }
            ApiError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                json!({ "status": false, "error": { "result": msg } }),
            ),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                json!({ "status": false, "error": { "result": msg } }),
            ),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                json!({ "status": false, "error": { "result": msg } }),
            ),
            ApiError::Internal(e) => {
                tracing::error!("internal error: {e:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "status": false, "error": { "result": "Something went wrong." } }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_states_map_to_distinct_statuses() {
        let expired = ApiError::Token(TokenError::Expired).into_response();
        assert_eq!(expired.status(), StatusCode::UNAUTHORIZED);

        let invalid = ApiError::Token(TokenError::Invalid).into_response();
        assert_eq!(invalid.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn validation_uses_bad_request() {
        let err = ApiError::validation([("email", "Email cannot be empty.")]);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
