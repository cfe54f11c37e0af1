use crate::Database;
use crate::models::{ChatSummaryRow, MessageRow};
use anyhow::Result;

const MESSAGE_SELECT: &str = "SELECT m.id, m.room, m.author_id, u.first_name, u.last_name, u.image,
        m.content, m.markdown, m.math, m.created_at
     FROM messages m
     LEFT JOIN users u ON m.author_id = u.id";

impl Database {
    /// Append a message to a room, creating the room record on first use.
    /// `user_a` must be the larger id of the canonical pair.
    pub fn insert_chat_message(
        &self,
        id: &str,
        room: &str,
        user_a: &str,
        user_b: &str,
        author_id: &str,
        content: &str,
        markdown: bool,
        math: bool,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT OR IGNORE INTO chats (room, user_a, user_b) VALUES (?1, ?2, ?3)",
                (room, user_a, user_b),
            )?;
            tx.execute(
                "INSERT INTO messages (id, room, author_id, content, markdown, math) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (id, room, author_id, content, markdown, math),
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    /// A room's messages in strict append order.
    pub fn messages_for_room(&self, room: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("{MESSAGE_SELECT} WHERE m.room = ?1 ORDER BY m.rowid ASC"))?;
            let rows = stmt
                .query_map([room], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Rooms containing `user_id` that have at least one message, most
    /// recent first.
    pub fn chat_summaries(&self, user_id: &str) -> Result<Vec<ChatSummaryRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.room, c.user_a, c.user_b, m.created_at
                 FROM chats c
                 JOIN messages m ON m.rowid = (
                     SELECT MAX(m2.rowid) FROM messages m2 WHERE m2.room = c.room
                 )
                 WHERE c.user_a = ?1 OR c.user_b = ?1
                 ORDER BY m.rowid DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(ChatSummaryRow {
                        room: row.get(0)?,
                        user_a: row.get(1)?,
                        user_b: row.get(2)?,
                        last_message_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn message_from_row(row: &rusqlite::Row<'_>) -> std::result::Result<MessageRow, rusqlite::Error> {
    Ok(MessageRow {
        id: row.get(0)?,
        room: row.get(1)?,
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
