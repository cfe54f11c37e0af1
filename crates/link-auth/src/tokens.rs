use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

/// The four token kinds. Each signs with an independent secret and has a
/// fixed expiry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
    EmailVerify,
    PasswordReset,
}

impl TokenKind {
    pub fn ttl(self) -> Duration {
        match self {
            TokenKind::Access => Duration::hours(1),
            TokenKind::Refresh => Duration::days(30),
            TokenKind::EmailVerify | TokenKind::PasswordReset => Duration::minutes(20),
        }
    }

    pub fn expires_at(self) -> DateTime<Utc> {
        Utc::now() + self.ttl()
    }
}

/// Signature failure and expiry are distinguished outcomes: the session
/// layer refreshes on `Expired` and fails closed on `Invalid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("expired")]
    Expired,
    #[error("invalid")]
    Invalid,
}

// Access, refresh and reset tokens carry the owner's id; the email-verify
// token carries the whole pending registration, so no user row exists
// until verification succeeds.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub exp: usize,
}

impl AccessClaims {
    pub fn new(sub: Uuid) -> Self {
        Self { sub, exp: TokenKind::Access.expires_at().timestamp() as usize }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub exp: usize,
}

impl RefreshClaims {
    pub fn new(sub: Uuid) -> Self {
        Self { sub, exp: TokenKind::Refresh.expires_at().timestamp() as usize }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetClaims {
    pub sub: Uuid,
    pub exp: usize,
}

impl ResetClaims {
    pub fn new(sub: Uuid) -> Self {
        Self { sub, exp: TokenKind::PasswordReset.expires_at().timestamp() as usize }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailClaims {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub exp: usize,
}

impl EmailClaims {
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password_hash: password_hash.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            exp: TokenKind::EmailVerify.expires_at().timestamp() as usize,
        }
    }
}

/// One signing secret per token kind.
#[derive(Clone)]
pub struct TokenKeys {
    access: String,
    refresh: String,
    email: String,
    reset: String,
}

impl TokenKeys {
    pub fn new(
        access: impl Into<String>,
        refresh: impl Into<String>,
        email: impl Into<String>,
        reset: impl Into<String>,
    ) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
            email: email.into(),
            reset: reset.into(),
        }
    }

    pub fn from_env() -> Self {
        fn var(name: &str, default: &str) -> String {
            std::env::var(name).unwrap_or_else(|_| default.into())
        }
        Self {
            access: var("LINK_ACCESS_SECRET", "dev-access-secret-change-me"),
            refresh: var("LINK_REFRESH_SECRET", "dev-refresh-secret-change-me"),
            email: var("LINK_EMAIL_SECRET", "dev-email-secret-change-me"),
            reset: var("LINK_PASSWORD_SECRET", "dev-password-secret-change-me"),
        }
    }

    fn secret(&self, kind: TokenKind) -> &str {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
            TokenKind::EmailVerify => &self.email,
            TokenKind::PasswordReset => &self.reset,
        }
    }

    pub fn issue<T: Serialize>(&self, kind: TokenKind, claims: &T) -> anyhow::Result<String> {
        let token = encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(self.secret(kind).as_bytes()),
        )?;
        Ok(token)
    }

    pub fn validate<T: DeserializeOwned>(
        &self,
        kind: TokenKind,
        token: &str,
    ) -> Result<T, TokenError> {
        decode::<T>(
            token,
            &DecodingKey::from_secret(self.secret(kind).as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn keys() -> TokenKeys {
        TokenKeys::new("s1", "s2", "s3", "s4")
    }

    #[test]
    fn round_trip_preserves_payload() {
        let keys = keys();
        let sub = Uuid::new_v4();
        let token = keys.issue(TokenKind::Access, &AccessClaims::new(sub)).unwrap();
        let claims: AccessClaims = keys.validate(TokenKind::Access, &token).unwrap();
        assert_eq!(claims.sub, sub);
    }

    #[test]
    fn expired_token_is_distinguished_from_invalid() {
        let keys = keys();
        let stale = AccessClaims {
            sub: Uuid::new_v4(),
            exp: (Utc::now() - Duration::hours(2)).timestamp() as usize,
        };
        let token = keys.issue(TokenKind::Access, &stale).unwrap();
        let err = keys.validate::<AccessClaims>(TokenKind::Access, &token).unwrap_err();
        assert_matches!(err, TokenError::Expired);
    }

    #[test]
    fn tampered_signature_is_invalid() {
        let keys = keys();
        let mut token = keys
            .issue(TokenKind::Access, &AccessClaims::new(Uuid::new_v4()))
            .unwrap();
        let last = token.pop().unwrap();
        token.push(if last == 'A' { 'B' } else { 'A' });
        let err = keys.validate::<AccessClaims>(TokenKind::Access, &token).unwrap_err();
        assert_matches!(err, TokenError::Invalid);
    }

    #[test]
    fn kinds_do_not_cross_validate() {
        let keys = keys();
        let token = keys
            .issue(TokenKind::Refresh, &RefreshClaims::new(Uuid::new_v4()))
            .unwrap();
        let err = keys.validate::<RefreshClaims>(TokenKind::Access, &token).unwrap_err();
        assert_matches!(err, TokenError::Invalid);
    }

    #[test]
    fn email_claims_carry_the_pending_registration() {
        let keys = keys();
        let claims = EmailClaims::new("a@test.com", "hash", "Ada", "Lovelace");
        let token = keys.issue(TokenKind::EmailVerify, &claims).unwrap();
        let decoded: EmailClaims = keys.validate(TokenKind::EmailVerify, &token).unwrap();
        assert_eq!(decoded.email, "a@test.com");
        assert_eq!(decoded.first_name, "Ada");
    }
}
