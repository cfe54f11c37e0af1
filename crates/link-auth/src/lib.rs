//! Credential primitives: typed signed tokens and password hashing.
//!
//! Every token kind signs with its own secret and carries its own expiry
//! policy, so a token issued for one purpose can never validate as
//! another.

pub mod password;
pub mod tokens;

pub use password::{hash_password, verify_password};
pub use tokens::{
    AccessClaims, EmailClaims, RefreshClaims, ResetClaims, TokenError, TokenKeys, TokenKind,
};
