use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use uuid::Uuid;

use axum_extra::extract::cookie::CookieJar;

use link_auth::{
    AccessClaims, EmailClaims, RefreshClaims, ResetClaims, TokenKind, hash_password,
    verify_password,
};
use link_types::api::{
    Ack, LoginRequest, LoginResponse, RefreshResponse, RegisterRequest, ResetPasswordRequest,
    SessionStatusResponse, VerifyEmailRequest, VerifyResetPasswordRequest,
};

use crate::error::{ApiError, ApiResult};
use crate::session::{
    ACCESS_COOKIE, Identity, REFRESH_COOKIE, credential_cookie, removal_cookie,
};
use crate::state::AppState;

/// Storage format for persisted token expiries, comparable against
/// SQLite's `datetime('now')`.
const EXPIRY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<Ack>> {
    let mut errors: Vec<(&'static str, String)> = Vec::new();

    let first_name = req.first_name.trim().to_string();
    if first_name.is_empty() || first_name.len() > 50 {
        errors.push(("first_name", "First name must be within 1 to 50 characters".into()));
    }
    let last_name = req.last_name.trim().to_string();
    if last_name.is_empty() || last_name.len() > 50 {
        errors.push(("last_name", "Last name must be within 1 to 50 characters".into()));
    }
    let email = req.email.trim().to_string();
    if !is_valid_email(&email) {
        errors.push(("email", "Invalid email body.".into()));
    }
    if req.password.len() < 8 || req.password.len() > 128 {
        errors.push(("password", "Password must be within 8 to 128 characters".into()));
    }
    if req.repassword != req.password {
        errors.push(("repassword", "Password confirmation does not match.".into()));
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let db = state.db.clone();
    let lookup = email.clone();
    let existing = tokio::task::spawn_blocking(move || db.get_user_by_email(&lookup))
        .await
        .map_err(ApiError::join)??;
    if existing.is_some() {
        return Err(ApiError::validation([("email", "Email already exist.")]));
    }

    // The pending registration travels inside the email token; the user
    // row only appears once the link is followed.
    let password_hash = hash_password(&req.password)?;
    let claims = EmailClaims::new(email.clone(), password_hash, first_name, last_name);
    let token = state.keys.issue(TokenKind::EmailVerify, &claims)?;

    let link = format!("{}/verify-email?token={}", state.client_url, token);
    let body = format!("Click the link below to verify your email.\n{link}");
    if !state.mailer.send(&email, "Verify your email on Link", &body).await {
        return Err(ApiError::bad_request("Something went wrong, please try again later."));
    }

    Ok(Json(Ack::ok()))
}

pub async fn verify_email(
    State(state): State<AppState>,
    Json(req): Json<VerifyEmailRequest>,
) -> ApiResult<Json<Ack>> {
    let claims: EmailClaims = state
        .keys
        .validate(TokenKind::EmailVerify, &req.token)
        .map_err(ApiError::Token)?;

    let db = state.db.clone();
    let lookup = claims.email.clone();
    let existing = tokio::task::spawn_blocking(move || db.get_user_by_email(&lookup))
        .await
        .map_err(ApiError::join)??;
    if existing.is_some() {
        return Err(ApiError::validation([("email", "Email already exist.")]));
    }

    let db = state.db.clone();
    let id = Uuid::new_v4().to_string();
    tokio::task::spawn_blocking(move || {
        db.create_user(
            &id,
            &claims.email,
            &claims.password_hash,
            &claims.first_name,
            &claims.last_name,
        )
    })
    .await
    .map_err(ApiError::join)??;

    Ok(Json(Ack::message("Email verified.")))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut errors: Vec<(&'static str, String)> = Vec::new();
    if req.email.trim().is_empty() {
        errors.push(("email", "Email cannot be empty.".into()));
    }
    if req.password.is_empty() {
        errors.push(("password", "Password cannot be empty.".into()));
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let db = state.db.clone();
    let email = req.email.trim().to_string();
    let user = tokio::task::spawn_blocking(move || db.get_user_by_email(&email))
        .await
        .map_err(ApiError::join)??
        .ok_or_else(|| ApiError::not_found("Email not found."))?;

    if !verify_password(&req.password, &user.password) {
        return Err(ApiError::Unauthorized("Password does not match.".into()));
    }

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {e}", user.id))?;

    let access = state.keys.issue(TokenKind::Access, &AccessClaims::new(user_id))?;
    let refresh = state.keys.issue(TokenKind::Refresh, &RefreshClaims::new(user_id))?;

    // The refresh token is revocable, so it gets a persisted record.
    let db = state.db.clone();
    let record = refresh.clone();
    let owner = user.id.clone();
    let expires_at = TokenKind::Refresh.expires_at().format(EXPIRY_FORMAT).to_string();
    tokio::task::spawn_blocking(move || db.insert_token(&record, "refresh", &owner, &expires_at))
        .await
        .map_err(ApiError::join)??;

    let jar = jar
        .add(credential_cookie(ACCESS_COOKIE, access.clone()))
        .add(credential_cookie(REFRESH_COOKIE, refresh.clone()));

    Ok((
        jar,
        Json(LoginResponse {
            userid: user_id,
            access_token: access,
            refresh_token: refresh,
        }),
    ))
}

/// Mint a fresh access token against the persisted refresh record. The
/// refresh token itself is only reissued at login or password change.
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> ApiResult<impl IntoResponse> {
    let Some(cookie) = jar.get(REFRESH_COOKIE) else {
        return Err(ApiError::forbidden("Refresh token is invalid."));
    };
    let token = cookie.value().to_string();

    let claims: RefreshClaims = state
        .keys
        .validate(TokenKind::Refresh, &token)
        .map_err(|_| ApiError::forbidden("Refresh token is invalid."))?;

    // Cryptographically valid is not enough: a revoked record means a
    // logged-out or password-changed session.
    let db = state.db.clone();
    let lookup = token.clone();
    let live = tokio::task::spawn_blocking(move || db.token_is_live(&lookup, "refresh"))
        .await
        .map_err(ApiError::join)??;
    if !live {
        return Err(ApiError::not_found("Refresh token is invalid."));
    }

    let access = state.keys.issue(TokenKind::Access, &AccessClaims::new(claims.sub))?;
    let jar = jar.add(credential_cookie(ACCESS_COOKIE, access.clone()));

    Ok((
        jar,
        Json(RefreshResponse {
            userid: claims.sub,
            access_token: access,
        }),
    ))
}

/// Deleting the persisted record is the only way to invalidate a
/// still-unexpired refresh token.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> ApiResult<impl IntoResponse> {
    if let Some(cookie) = jar.get(REFRESH_COOKIE) {
        let db = state.db.clone();
        let token = cookie.value().to_string();
        tokio::task::spawn_blocking(move || db.delete_token(&token))
            .await
            .map_err(ApiError::join)??;
    }

    let jar = jar
        .add(removal_cookie(ACCESS_COOKIE))
        .add(removal_cookie(REFRESH_COOKIE));

    Ok((jar, Json(Ack::ok())))
}

pub async fn get_status(identity: Identity) -> Json<SessionStatusResponse> {
    Json(SessionStatusResponse {
        status: true,
        userid: identity.user_id,
    })
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<Json<Ack>> {
    let email = req.email.trim().to_string();
    if email.is_empty() {
        return Err(ApiError::validation([("email", "Email cannot be empty.")]));
    }

    let db = state.db.clone();
    let lookup = email.clone();
    let user = tokio::task::spawn_blocking(move || db.get_user_by_email(&lookup))
        .await
        .map_err(ApiError::join)??
        .ok_or_else(|| ApiError::not_found("Email not found."))?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| anyhow::anyhow!("corrupt user id '{}': {e}", user.id))?;

    let token = state.keys.issue(TokenKind::PasswordReset, &ResetClaims::new(user_id))?;

    let db = state.db.clone();
    let record = token.clone();
    let owner = user.id.clone();
    let expires_at = TokenKind::PasswordReset.expires_at().format(EXPIRY_FORMAT).to_string();
    tokio::task::spawn_blocking(move || db.insert_token(&record, "password", &owner, &expires_at))
        .await
        .map_err(ApiError::join)??;

    let link = format!("{}/reset-password?token={}", state.client_url, token);
    let body = format!("Click the link below to reset your password.\n{link}");
    if !state.mailer.send(&email, "Reset your password on Link", &body).await {
        return Err(ApiError::bad_request("Something went wrong, please try again later."));
    }

    Ok(Json(Ack::ok()))
}

/// Consume a reset token: rewrite the hash, burn the single-use record,
/// and revoke every session the user had. Any credentials the caller
/// still holds are cleared with it.
pub async fn verify_reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<VerifyResetPasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    let mut errors: Vec<(&'static str, String)> = Vec::new();
    if req.new_password.len() < 8 || req.new_password.len() > 128 {
        errors.push(("new_password", "New password must be within 8 and 128 characters.".into()));
    }
    if req.new_repassword != req.new_password {
        errors.push(("new_repassword", "Confirmation password does not match.".into()));
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let claims: ResetClaims = state
        .keys
        .validate(TokenKind::PasswordReset, &req.token)
        .map_err(ApiError::Token)?;

    let db = state.db.clone();
    let lookup = req.token.clone();
    let live = tokio::task::spawn_blocking(move || db.token_is_live(&lookup, "password"))
        .await
        .map_err(ApiError::join)??;
    if !live {
        return Err(ApiError::not_found("Reset token is invalid."));
    }

    let password_hash = hash_password(&req.new_password)?;

    let db = state.db.clone();
    let owner = claims.sub.to_string();
    let token = req.token.clone();
    let changed = tokio::task::spawn_blocking(move || {
        let changed = db.update_password(&owner, &password_hash)?;
        db.delete_token(&token)?;
        // "revoke all sessions": every refresh token dies with the reset
        db.delete_tokens_for_owner(&owner)?;
        Ok::<_, anyhow::Error>(changed)
    })
    .await
    .map_err(ApiError::join)??;

    if !changed {
        return Err(ApiError::not_found("User not found."));
    }

    let jar = jar
        .add(removal_cookie(ACCESS_COOKIE))
        .add(removal_cookie(REFRESH_COOKIE));

    Ok((jar, Json(Ack::message("Password changed."))))
}

fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.starts_with('.'),
        None => false,
    }
}
