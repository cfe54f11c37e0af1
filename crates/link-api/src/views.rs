//! Row-to-wire conversion helpers shared by the user, post and chat
//! handlers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use link_db::models::{CommentRow, LikeRow, MessageRow, PostRow, UserRow};
use link_types::api::{CommentView, MessageView, PostView};
use link_types::models::UserSummary;

pub(crate) fn parse_id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("Corrupt id '{}': {}", raw, e);
        Uuid::default()
    })
}

pub(crate) fn parse_date(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub(crate) fn user_summary(row: &UserRow) -> UserSummary {
    UserSummary {
        id: parse_id(&row.id),
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        image: row.image.clone(),
    }
}

fn post_author(row: &PostRow) -> UserSummary {
    UserSummary {
        id: parse_id(&row.author_id),
        first_name: row.author_first_name.clone(),
        last_name: row.author_last_name.clone(),
        image: row.author_image.clone(),
    }
}

pub(crate) fn comment_view(row: &CommentRow) -> CommentView {
    CommentView {
        id: parse_id(&row.id),
        author: UserSummary {
            id: parse_id(&row.author_id),
            first_name: row.author_first_name.clone(),
            last_name: row.author_last_name.clone(),
            image: row.author_image.clone(),
        },
        content: row.content.clone(),
        markdown: row.markdown,
        math: row.math,
        date: parse_date(&row.created_at),
    }
}

pub(crate) fn message_view(row: &MessageRow) -> MessageView {
    MessageView {
        id: parse_id(&row.id),
        author: UserSummary {
            id: parse_id(&row.author_id),
            first_name: row.author_first_name.clone(),
            last_name: row.author_last_name.clone(),
            image: row.author_image.clone(),
        },
        content: row.content.clone(),
        markdown: row.markdown,
        math: row.math,
        date: parse_date(&row.created_at),
    }
}

/// Assemble full post views from a post page plus its likes and comments,
/// preserving the posts' incoming order.
pub(crate) fn build_post_views(
    posts: &[PostRow],
    likes: &[LikeRow],
    comments: &[CommentRow],
) -> Vec<PostView> {
    let mut like_map: HashMap<&str, Vec<Uuid>> = HashMap::new();
    for like in likes {
        like_map
            .entry(like.post_id.as_str())
            .or_default()
            .push(parse_id(&like.user_id));
    }

    let mut comment_map: HashMap<&str, Vec<CommentView>> = HashMap::new();
    for comment in comments {
        comment_map
            .entry(comment.post_id.as_str())
            .or_default()
            .push(comment_view(comment));
    }

    posts
        .iter()
        .map(|row| PostView {
            id: parse_id(&row.id),
            author: post_author(row),
            content: row.content.clone(),
            markdown: row.markdown,
            math: row.math,
            date: parse_date(&row.created_at),
            image: row.image.clone(),
            likes: like_map.remove(row.id.as_str()).unwrap_or_default(),
            comments: comment_map.remove(row.id.as_str()).unwrap_or_default(),
        })
        .collect()
}
