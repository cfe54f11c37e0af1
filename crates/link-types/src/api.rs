use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Relationship, UserSummary};

// -- Generic --

/// Plain success acknowledgement: `{"status": true, "message": "..."}`.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub status: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self { status: true, message: None }
    }

    pub fn message(msg: impl Into<String>) -> Self {
        Self { status: true, message: Some(msg.into()) }
    }
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub repassword: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyEmailRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub userid: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub userid: Uuid,
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub status: bool,
    pub userid: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifyResetPasswordRequest {
    pub token: String,
    pub new_password: String,
    pub new_repassword: String,
}

// -- Users --

/// A directory entry: public user fields plus the caller's relationship.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub image: String,
    #[serde(rename = "type")]
    pub relationship: Relationship,
}

#[derive(Debug, Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserView>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub status: bool,
    pub users: Vec<UserView>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
}

/// Full profile view. `friend_requests` is only present when the profile
/// belongs to the caller.
#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub image: String,
    #[serde(rename = "type")]
    pub relationship: Relationship,
    pub posts: Vec<PostView>,
    pub friends: Vec<UserView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friend_requests: Option<Vec<UserView>>,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserProfile,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub delete_image: bool,
    /// Base64-encoded replacement profile image.
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_repassword: String,
}

// -- Posts --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostRequest {
    pub content: String,
    pub markdown: bool,
    pub math: bool,
    #[serde(default)]
    pub delete_image: bool,
    /// Base64-encoded image attachment.
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommentRequest {
    pub content: String,
    pub markdown: bool,
    pub math: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: Uuid,
    pub author: UserSummary,
    pub content: String,
    pub markdown: bool,
    pub math: bool,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: Uuid,
    pub author: UserSummary,
    pub content: String,
    pub markdown: bool,
    pub math: bool,
    pub date: DateTime<Utc>,
    pub image: String,
    pub likes: Vec<Uuid>,
    pub comments: Vec<CommentView>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub status: bool,
    pub posts: Vec<PostView>,
}

// -- Chat --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    pub id: Uuid,
    pub author: UserSummary,
    pub content: String,
    pub markdown: bool,
    pub math: bool,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ChatHistoryResponse {
    pub status: bool,
    pub messages: Vec<MessageView>,
}

/// One entry of the conversation list: who the chat is with and when it
/// last saw a message.
#[derive(Debug, Serialize)]
pub struct ChatSummary {
    pub user: UserSummary,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ChatsResponse {
    pub status: bool,
    pub chats: Vec<ChatSummary>,
}
