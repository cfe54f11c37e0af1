use crate::Database;
use anyhow::Result;

impl Database {
    /// Persist a revocable token. Expired rows are reaped here, keeping
    /// the time-to-live sweep inside the storage layer.
    pub fn insert_token(
        &self,
        token: &str,
        token_type: &str,
        user_id: &str,
        expires_at: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM tokens WHERE expires_at <= datetime('now')", [])?;
            conn.execute(
                "INSERT INTO tokens (token, token_type, user_id, expires_at) VALUES (?1, ?2, ?3, ?4)",
                (token, token_type, user_id, expires_at),
            )?;
            Ok(())
        })
    }

    /// A token is live exactly when its record exists and has not passed
    /// its expiry; a reaped or revoked token is indistinguishable from one
    /// that never existed.
    pub fn token_is_live(&self, token: &str, token_type: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM tokens
                 WHERE token = ?1 AND token_type = ?2 AND expires_at > datetime('now')",
                (token, token_type),
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Revoke a single token. Returns false when no record existed.
    pub fn delete_token(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM tokens WHERE token = ?1", [token])?;
            Ok(changed > 0)
        })
    }

    /// Revoke every persisted token belonging to a user — the
    /// "log out everywhere" effect of password change/reset.
    pub fn delete_tokens_for_owner(&self, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM tokens WHERE user_id = ?1", [user_id])?;
            Ok(changed)
        })
    }
}
