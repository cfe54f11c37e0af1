use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            email       TEXT NOT NULL UNIQUE,
            password    TEXT NOT NULL,
            first_name  TEXT NOT NULL,
            last_name   TEXT NOT NULL,
            image       TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Symmetric friendship: both direction rows are written in one
        -- transaction, so a row exists iff its mirror exists.
        CREATE TABLE IF NOT EXISTS friends (
            user_id     TEXT NOT NULL REFERENCES users(id),
            friend_id   TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (user_id, friend_id)
        );

        -- Incoming pending requests, keyed by the recipient.
        CREATE TABLE IF NOT EXISTS friend_requests (
            recipient_id TEXT NOT NULL REFERENCES users(id),
            sender_id    TEXT NOT NULL REFERENCES users(id),
            created_at   TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (recipient_id, sender_id)
        );

        -- Only revocable token kinds are persisted; access and
        -- email-verify tokens are stateless.
        CREATE TABLE IF NOT EXISTS tokens (
            token       TEXT PRIMARY KEY,
            token_type  TEXT NOT NULL CHECK (token_type IN ('refresh', 'password')),
            user_id     TEXT NOT NULL REFERENCES users(id),
            expires_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tokens_user
            ON tokens(user_id);

        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            markdown    INTEGER NOT NULL,
            math        INTEGER NOT NULL,
            image       TEXT NOT NULL DEFAULT '',
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_author
            ON posts(author_id, created_at);

        CREATE TABLE IF NOT EXISTS post_likes (
            post_id     TEXT NOT NULL REFERENCES posts(id),
            user_id     TEXT NOT NULL REFERENCES users(id),
            PRIMARY KEY (post_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS comments (
            id          TEXT PRIMARY KEY,
            post_id     TEXT NOT NULL REFERENCES posts(id),
            author_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            markdown    INTEGER NOT NULL,
            math        INTEGER NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_comments_post
            ON comments(post_id);

        -- room is the canonical pair key; user_a holds the larger id.
        CREATE TABLE IF NOT EXISTS chats (
            room        TEXT PRIMARY KEY,
            user_a      TEXT NOT NULL REFERENCES users(id),
            user_b      TEXT NOT NULL REFERENCES users(id)
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            room        TEXT NOT NULL REFERENCES chats(room),
            author_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            markdown    INTEGER NOT NULL,
            math        INTEGER NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_messages_room
            ON messages(room);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
