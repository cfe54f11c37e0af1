/// Database row types — these map directly to SQLite rows.
/// Distinct from the link-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub image: String,
    pub created_at: String,
}

pub struct TokenRow {
    pub token: String,
    pub token_type: String,
    pub user_id: String,
    pub expires_at: String,
}

pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub author_image: String,
    pub content: String,
    pub markdown: bool,
    pub math: bool,
    pub image: String,
    pub created_at: String,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub author_id: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub author_image: String,
    pub content: String,
    pub markdown: bool,
    pub math: bool,
    pub created_at: String,
}

pub struct LikeRow {
    pub post_id: String,
    pub user_id: String,
}

pub struct MessageRow {
    pub id: String,
    pub room: String,
    pub author_id: String,
    pub author_first_name: String,
    pub author_last_name: String,
    pub author_image: String,
    pub content: String,
    pub markdown: bool,
    pub math: bool,
    pub created_at: String,
}

/// One row of the conversation list: a room the user participates in and
/// the timestamp of its most recent message.
pub struct ChatSummaryRow {
    pub room: String,
    pub user_a: String,
    pub user_b: String,
    pub last_message_at: String,
}
