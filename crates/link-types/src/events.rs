use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::MessageView;

/// Commands sent FROM client TO server over the chat socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Subscribe to the canonical room for a pair of users.
    Join { users: [Uuid; 2] },

    /// Publish a message into a room. The server drops the command
    /// silently unless the connection identity is one of `users` and
    /// matches `author`.
    Send {
        users: [Uuid; 2],
        author: Uuid,
        message: MessagePayload,
    },
}

/// Client-supplied message body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessagePayload {
    pub content: String,
    pub markdown: bool,
    pub math: bool,
}

/// Events sent from server to clients over the chat socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server confirms the authenticated connection.
    Ready { userid: Uuid },

    /// A message was published into a room this connection has joined.
    Receive { message: MessageView },
}
