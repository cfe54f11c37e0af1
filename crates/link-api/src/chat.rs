use std::collections::HashMap;

use axum::Json;
use axum::extract::{Path, State};
use tracing::debug;

use link_types::api::{ChatHistoryResponse, ChatSummary, ChatsResponse};
use link_types::models::RoomKey;

use crate::error::{ApiError, ApiResult};
use crate::session::Identity;
use crate::state::AppState;
use crate::views::{message_view, parse_date, user_summary};

/// GET /chat — the caller's conversations, most recent first. Rooms that
/// never saw a message are not conversations yet.
pub async fn get_chats(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<ChatsResponse>> {
    let self_id = identity.user_id.to_string();

    let db = state.db.clone();
    let lookup = self_id.clone();
    let (summaries, others) = tokio::task::spawn_blocking(move || {
        let summaries = db.chat_summaries(&lookup)?;
        let other_ids: Vec<String> = summaries
            .iter()
            .map(|s| if s.user_a == lookup { s.user_b.clone() } else { s.user_a.clone() })
            .collect();
        let others = db.users_by_ids(&other_ids)?;
        Ok::<_, anyhow::Error>((summaries, others))
    })
    .await
    .map_err(ApiError::join)??;

    let others: HashMap<&str, _> =
        others.iter().map(|row| (row.id.as_str(), user_summary(row))).collect();

    let chats = summaries
        .iter()
        .filter_map(|row| {
            let other_id = if row.user_a == self_id { &row.user_b } else { &row.user_a };
            let user = others.get(other_id.as_str())?.clone();
            Some(ChatSummary {
                user,
                last_message_at: parse_date(&row.last_message_at),
            })
        })
        .collect();

    Ok(Json(ChatsResponse { status: true, chats }))
}

/// GET /chat/{pairkey} — a room's history in append order, readable only
/// by its two participants.
pub async fn get_chat(
    State(state): State<AppState>,
    identity: Identity,
    Path(pairkey): Path<String>,
) -> ApiResult<Json<ChatHistoryResponse>> {
    let Some(room) = RoomKey::parse(&pairkey) else {
        debug!("Room ID provided is invalid.");
        return Err(ApiError::not_found("Room not found."));
    };

    if !room.contains(identity.user_id) {
        return Err(ApiError::forbidden("No permission."));
    }

    let (user_a, user_b) = room.participants();

    let db = state.db.clone();
    let key = room.to_string();
    let messages = tokio::task::spawn_blocking(move || {
        if db.get_user_by_id(&user_a.to_string())?.is_none()
            || db.get_user_by_id(&user_b.to_string())?.is_none()
        {
            return Ok(None);
        }
        // no room record yet simply means an empty history
        Ok::<_, anyhow::Error>(Some(db.messages_for_room(&key)?))
    })
    .await
    .map_err(ApiError::join)??
    .ok_or_else(|| ApiError::not_found("User not found."))?;

    Ok(Json(ChatHistoryResponse {
        status: true,
        messages: messages.iter().map(message_view).collect(),
    }))
}
