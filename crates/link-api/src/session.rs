use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use uuid::Uuid;

use link_auth::{AccessClaims, TokenError, TokenKind};

use crate::error::ApiError;
use crate::state::AppState;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Verified caller identity attached by the session gate.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: Uuid,
}

/// What the gate learned about the caller. An expired access token does
/// not fail the request at the gate — the marker flows on so the caller
/// can be steered into the refresh step.
#[derive(Debug, Clone, Copy)]
pub enum CallerSession {
    Authenticated(Identity),
    RefreshNeeded,
}

/// Session gate middleware for every protected route.
///
/// Missing credential fails closed; a valid token attaches the caller's
/// identity; an expired token attaches the refresh-required marker; any
/// other failure is terminal with 403.
pub async fn session_gate(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(cookie) = jar.get(ACCESS_COOKIE) else {
        return Err(ApiError::forbidden("Please log in."));
    };

    match state.keys.validate::<AccessClaims>(TokenKind::Access, cookie.value()) {
        Ok(claims) => {
            req.extensions_mut()
                .insert(CallerSession::Authenticated(Identity { user_id: claims.sub }));
        }
        Err(TokenError::Expired) => {
            req.extensions_mut().insert(CallerSession::RefreshNeeded);
        }
        Err(TokenError::Invalid) => {
            return Err(ApiError::Token(TokenError::Invalid));
        }
    }

    Ok(next.run(req).await)
}

/// Extractor for handlers that demand a verified identity. Converts the
/// refresh-required marker into the terminal 401 `token: "expired"`
/// response that sends the client to `/auth/refresh`.
impl<S: Send + Sync> FromRequestParts<S> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<CallerSession>() {
            Some(CallerSession::Authenticated(identity)) => Ok(*identity),
            Some(CallerSession::RefreshNeeded) => Err(ApiError::Token(TokenError::Expired)),
            // Route was not wired through the session gate.
            None => Err(ApiError::forbidden("Please log in.")),
        }
    }
}

// Both credentials are HttpOnly cookies scoped to the whole site; the
// browser is the "persistent client-side store" of the session design.

pub fn credential_cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

pub fn removal_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = Cookie::build((name, "")).path("/").build();
    cookie.make_removal();
    cookie
}
