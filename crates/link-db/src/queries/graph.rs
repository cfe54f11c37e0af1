use std::collections::HashSet;

use crate::Database;
use anyhow::Result;

impl Database {
    // -- Reads --

    /// Ids of everyone `user_id` is friends with.
    pub fn friend_ids(&self, user_id: &str) -> Result<HashSet<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT friend_id FROM friends WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;
            Ok(ids)
        })
    }

    /// Ids of everyone with a pending request TO `user_id` (incoming).
    pub fn request_ids(&self, user_id: &str) -> Result<HashSet<String>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT sender_id FROM friend_requests WHERE recipient_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<HashSet<_>, _>>()?;
            Ok(ids)
        })
    }

    pub fn are_friends(&self, user_id: &str, friend_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM friends WHERE user_id = ?1 AND friend_id = ?2",
                (user_id, friend_id),
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    pub fn has_request(&self, recipient_id: &str, sender_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM friend_requests WHERE recipient_id = ?1 AND sender_id = ?2",
                (recipient_id, sender_id),
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Every friendship edge, for whole-directory classification.
    pub fn all_friend_edges(&self) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT user_id, friend_id FROM friends")?;
            let edges = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(edges)
        })
    }

    /// Every pending request edge as (recipient, sender).
    pub fn all_request_edges(&self) -> Result<Vec<(String, String)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT recipient_id, sender_id FROM friend_requests")?;
            let edges = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(edges)
        })
    }

    // -- Mutations --

    /// Record a pending request from `sender_id` to `recipient_id`.
    /// Idempotent: an existing identical request is left untouched.
    pub fn add_friend_request(&self, recipient_id: &str, sender_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO friend_requests (recipient_id, sender_id) VALUES (?1, ?2)",
                (recipient_id, sender_id),
            )?;
            Ok(())
        })
    }

    /// Returns false when no such request existed.
    pub fn remove_friend_request(&self, recipient_id: &str, sender_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "DELETE FROM friend_requests WHERE recipient_id = ?1 AND sender_id = ?2",
                (recipient_id, sender_id),
            )?;
            Ok(changed > 0)
        })
    }

    /// Consume the pending request and write both direction rows of the
    /// friendship in a single transaction, keeping the symmetry invariant.
    pub fn accept_friend_request(&self, recipient_id: &str, sender_id: &str) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM friend_requests WHERE recipient_id = ?1 AND sender_id = ?2",
                (recipient_id, sender_id),
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO friends (user_id, friend_id) VALUES (?1, ?2)",
                (recipient_id, sender_id),
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO friends (user_id, friend_id) VALUES (?1, ?2)",
                (sender_id, recipient_id),
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// Symmetric removal. Returns false when the pair was not friends.
    pub fn remove_friendship(&self, user_id: &str, friend_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let a = tx.execute(
                "DELETE FROM friends WHERE user_id = ?1 AND friend_id = ?2",
                (user_id, friend_id),
            )?;
            let b = tx.execute(
                "DELETE FROM friends WHERE user_id = ?1 AND friend_id = ?2",
                (friend_id, user_id),
            )?;
            tx.commit()?;
            Ok(a > 0 || b > 0)
        })
    }
}
