use crate::Database;
use crate::OptionalExt;
use crate::models::{CommentRow, LikeRow, PostRow};
use anyhow::Result;

// JOIN users so author summaries come back in a single query
const POST_SELECT: &str = "SELECT p.id, p.author_id, u.first_name, u.last_name, u.image,
        p.content, p.markdown, p.math, p.image, p.created_at
     FROM posts p
     LEFT JOIN users u ON p.author_id = u.id";

const COMMENT_SELECT: &str = "SELECT c.id, c.post_id, c.author_id, u.first_name, u.last_name, u.image,
        c.content, c.markdown, c.math, c.created_at
     FROM comments c
     LEFT JOIN users u ON c.author_id = u.id";

impl Database {
    // -- Posts --

    pub fn insert_post(
        &self,
        id: &str,
        author_id: &str,
        content: &str,
        markdown: bool,
        math: bool,
        image: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author_id, content, markdown, math, image) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (id, author_id, content, markdown, math, image),
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{POST_SELECT} WHERE p.id = ?1"))?;
            let row = stmt.query_row([id], post_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn update_post(
        &self,
        id: &str,
        content: &str,
        markdown: bool,
        math: bool,
        image: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET content = ?2, markdown = ?3, math = ?4, image = ?5 WHERE id = ?1",
                (id, content, markdown, math, image),
            )?;
            Ok(changed > 0)
        })
    }

    /// Remove a post together with its likes and comments.
    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM post_likes WHERE post_id = ?1", [id])?;
            tx.execute("DELETE FROM comments WHERE post_id = ?1", [id])?;
            let changed = tx.execute("DELETE FROM posts WHERE id = ?1", [id])?;
            tx.commit()?;
            Ok(changed > 0)
        })
    }

    pub fn posts_by_author(&self, author_id: &str) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{POST_SELECT} WHERE p.author_id = ?1 ORDER BY p.created_at ASC, p.rowid ASC"
            ))?;
            let rows = stmt
                .query_map([author_id], post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Posts by any of `author_ids`, oldest first.
    pub fn feed_posts(&self, author_ids: &[String]) -> Result<Vec<PostRow>> {
        if author_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=author_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "{POST_SELECT} WHERE p.author_id IN ({}) ORDER BY p.created_at ASC, p.rowid ASC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = author_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), post_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Likes --

    /// Idempotent: liking twice leaves a single row.
    pub fn add_like(&self, post_id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO post_likes (post_id, user_id) VALUES (?1, ?2)",
                (post_id, user_id),
            )?;
            Ok(())
        })
    }

    /// Idempotent: unliking an unliked post is a no-op.
    pub fn remove_like(&self, post_id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                (post_id, user_id),
            )?;
            Ok(())
        })
    }

    pub fn likes_for_posts(&self, post_ids: &[String]) -> Result<Vec<LikeRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT post_id, user_id FROM post_likes WHERE post_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(LikeRow { post_id: row.get(0)?, user_id: row.get(1)? })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        id: &str,
        post_id: &str,
        author_id: &str,
        content: &str,
        markdown: bool,
        math: bool,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, author_id, content, markdown, math) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (id, post_id, author_id, content, markdown, math),
            )?;
            Ok(())
        })
    }

    pub fn get_comment(&self, id: &str) -> Result<Option<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{COMMENT_SELECT} WHERE c.id = ?1"))?;
            let row = stmt.query_row([id], comment_from_row).optional()?;
            Ok(row)
        })
    }

    pub fn update_comment(&self, id: &str, content: &str, markdown: bool, math: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET content = ?2, markdown = ?3, math = ?4 WHERE id = ?1",
                (id, content, markdown, math),
            )?;
            Ok(changed > 0)
        })
    }

    pub fn delete_comment(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Comments for a set of posts in insertion order.
    pub fn comments_for_posts(&self, post_ids: &[String]) -> Result<Vec<CommentRow>> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> =
                (1..=post_ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "{COMMENT_SELECT} WHERE c.post_id IN ({}) ORDER BY c.rowid ASC",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let params: Vec<&dyn rusqlite::types::ToSql> = post_ids
                .iter()
                .map(|id| id as &dyn rusqlite::types::ToSql)
                .collect();

            let rows = stmt
                .query_map(params.as_slice(), comment_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn post_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<PostRow, rusqlite::Error> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_first_name: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        author_last_name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        author_image: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        content: row.get(5)?,
        markdown: row.get(6)?,
        math: row.get(7)?,
        image: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn comment_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<CommentRow, rusqlite::Error> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_first_name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        author_last_name: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        author_image: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        content: row.get(6)?,
        markdown: row.get(7)?,
        math: row.get(8)?,
        created_at: row.get(9)?,
    })
}
