use axum::Json;
use axum::extract::{Path, State};
use tracing::debug;
use uuid::Uuid;

use link_db::models::PostRow;
use link_types::api::{Ack, CommentRequest, FeedResponse, PostRequest};

use crate::error::{ApiError, ApiResult};
use crate::images::decode_image;
use crate::session::Identity;
use crate::state::AppState;
use crate::views::build_post_views;

const CONTENT_MIN: usize = 1;
const CONTENT_MAX: usize = 30_000;

fn validate_content(content: &str) -> ApiResult<String> {
    let content = content.trim().to_string();
    if content.len() < CONTENT_MIN || content.len() > CONTENT_MAX {
        return Err(ApiError::validation([(
            "content",
            "Content length should be within 1 to 30000 characters",
        )]));
    }
    Ok(content)
}

fn decode_attachment(image: Option<&str>) -> ApiResult<Option<Vec<u8>>> {
    match image {
        Some(data) => decode_image(data)
            .map(Some)
            .ok_or_else(|| ApiError::validation([("image", "Invalid image payload.")])),
        None => Ok(None),
    }
}

/// A post is visible exactly to its author and the author's friends; the
/// same set may like and comment on it.
async fn ensure_viewer(state: &AppState, viewer: &str, post: &PostRow) -> ApiResult<()> {
    if post.author_id == viewer {
        return Ok(());
    }

    let db = state.db.clone();
    let viewer = viewer.to_string();
    let author = post.author_id.clone();
    let friends = tokio::task::spawn_blocking(move || db.are_friends(&viewer, &author))
        .await
        .map_err(ApiError::join)??;

    if friends {
        Ok(())
    } else {
        Err(ApiError::forbidden("No permission."))
    }
}

async fn load_post(state: &AppState, postid: &str) -> ApiResult<PostRow> {
    if postid.parse::<Uuid>().is_err() {
        return Err(ApiError::not_found("Post not found."));
    }

    let db = state.db.clone();
    let lookup = postid.to_string();
    tokio::task::spawn_blocking(move || db.get_post(&lookup))
        .await
        .map_err(ApiError::join)??
        .ok_or_else(|| ApiError::not_found("Post not found."))
}

/// POST /post
pub async fn create_post(
    State(state): State<AppState>,
    identity: Identity,
    Json(req): Json<PostRequest>,
) -> ApiResult<Json<Ack>> {
    let content = validate_content(&req.content)?;
    let attachment = decode_attachment(req.image.as_deref())?;

    let author = identity.user_id.to_string();
    let db = state.db.clone();
    let lookup = author.clone();
    let exists = tokio::task::spawn_blocking(move || db.get_user_by_id(&lookup))
        .await
        .map_err(ApiError::join)??
        .is_some();
    if !exists {
        return Err(ApiError::not_found("User not found."));
    }

    let post_id = Uuid::new_v4().to_string();
    let image = state
        .images
        .apply_update(&post_id, "", req.delete_image, attachment.as_deref())
        .await?;

    let db = state.db.clone();
    let id = post_id.clone();
    tokio::task::spawn_blocking(move || {
        db.insert_post(&id, &author, &content, req.markdown, req.math, &image)
    })
    .await
    .map_err(ApiError::join)??;

    debug!("Post is created.");
    Ok(Json(Ack::message("Post is created.")))
}

/// GET /post — the caller's own posts plus all friends' posts, oldest
/// first.
pub async fn feed(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<FeedResponse>> {
    let self_id = identity.user_id.to_string();

    let db = state.db.clone();
    let (posts, likes, comments) = tokio::task::spawn_blocking(move || {
        let mut author_ids: Vec<String> = db.friend_ids(&self_id)?.into_iter().collect();
        author_ids.push(self_id);

        let posts = db.feed_posts(&author_ids)?;
        let post_ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
        let likes = db.likes_for_posts(&post_ids)?;
        let comments = db.comments_for_posts(&post_ids)?;
        Ok::<_, anyhow::Error>((posts, likes, comments))
    })
    .await
    .map_err(ApiError::join)??;

    Ok(Json(FeedResponse {
        status: true,
        posts: build_post_views(&posts, &likes, &comments),
    }))
}

/// PUT /post/{postid} — author-only; rewrites content, flags and image
/// under the same rules as create.
pub async fn update_post(
    State(state): State<AppState>,
    identity: Identity,
    Path(postid): Path<String>,
    Json(req): Json<PostRequest>,
) -> ApiResult<Json<Ack>> {
    let post = load_post(&state, &postid).await?;
    if post.author_id != identity.user_id.to_string() {
        return Err(ApiError::forbidden("No permission."));
    }

    let content = validate_content(&req.content)?;
    let attachment = decode_attachment(req.image.as_deref())?;

    let image = state
        .images
        .apply_update(&postid, &post.image, req.delete_image, attachment.as_deref())
        .await?;

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        db.update_post(&postid, &content, req.markdown, req.math, &image)
    })
    .await
    .map_err(ApiError::join)??;

    Ok(Json(Ack::message("Post is updated.")))
}

/// DELETE /post/{postid} — author-only; removes the post, its comments,
/// its likes, and its stored image.
pub async fn delete_post(
    State(state): State<AppState>,
    identity: Identity,
    Path(postid): Path<String>,
) -> ApiResult<Json<Ack>> {
    let post = load_post(&state, &postid).await?;
    if post.author_id != identity.user_id.to_string() {
        return Err(ApiError::forbidden("No permission."));
    }

    state.images.delete(&post.image).await;

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || db.delete_post(&postid))
        .await
        .map_err(ApiError::join)??;

    Ok(Json(Ack::message("Post is removed.")))
}

/// POST /post/{postid}/like — idempotent set membership.
pub async fn like_post(
    State(state): State<AppState>,
    identity: Identity,
    Path(postid): Path<String>,
) -> ApiResult<Json<Ack>> {
    let post = load_post(&state, &postid).await?;
    let viewer = identity.user_id.to_string();
    ensure_viewer(&state, &viewer, &post).await?;

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || db.add_like(&postid, &viewer))
        .await
        .map_err(ApiError::join)??;

    Ok(Json(Ack::message("Post is liked.")))
}

/// DELETE /post/{postid}/like — repeated unlikes are no-ops that still
/// succeed.
pub async fn unlike_post(
    State(state): State<AppState>,
    identity: Identity,
    Path(postid): Path<String>,
) -> ApiResult<Json<Ack>> {
    let post = load_post(&state, &postid).await?;
    let viewer = identity.user_id.to_string();
    ensure_viewer(&state, &viewer, &post).await?;

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || db.remove_like(&postid, &viewer))
        .await
        .map_err(ApiError::join)??;

    Ok(Json(Ack::message("Post is unliked.")))
}

/// POST /post/{postid}/comment — open to any permitted viewer.
pub async fn comment_post(
    State(state): State<AppState>,
    identity: Identity,
    Path(postid): Path<String>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<Ack>> {
    let post = load_post(&state, &postid).await?;
    let viewer = identity.user_id.to_string();
    ensure_viewer(&state, &viewer, &post).await?;

    let content = validate_content(&req.content)?;

    let db = state.db.clone();
    let id = Uuid::new_v4().to_string();
    tokio::task::spawn_blocking(move || {
        db.insert_comment(&id, &postid, &viewer, &content, req.markdown, req.math)
    })
    .await
    .map_err(ApiError::join)??;

    Ok(Json(Ack::message("Comment is created.")))
}

async fn load_own_comment(
    state: &AppState,
    identity: Identity,
    postid: &str,
    commentid: &str,
) -> ApiResult<()> {
    // the parent post must exist and still own this comment
    load_post(state, postid).await?;

    if commentid.parse::<Uuid>().is_err() {
        return Err(ApiError::not_found("Comment not found."));
    }

    let db = state.db.clone();
    let lookup = commentid.to_string();
    let comment = tokio::task::spawn_blocking(move || db.get_comment(&lookup))
        .await
        .map_err(ApiError::join)??
        .ok_or_else(|| ApiError::not_found("Comment not found."))?;

    if comment.post_id != postid {
        return Err(ApiError::not_found("Comment not found."));
    }
    if comment.author_id != identity.user_id.to_string() {
        return Err(ApiError::forbidden("No permission."));
    }

    Ok(())
}

/// PUT /post/{postid}/comment/{commentid} — comment-author-only.
pub async fn update_comment(
    State(state): State<AppState>,
    identity: Identity,
    Path((postid, commentid)): Path<(String, String)>,
    Json(req): Json<CommentRequest>,
) -> ApiResult<Json<Ack>> {
    load_own_comment(&state, identity, &postid, &commentid).await?;

    let content = validate_content(&req.content)?;

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        db.update_comment(&commentid, &content, req.markdown, req.math)
    })
    .await
    .map_err(ApiError::join)??;

    Ok(Json(Ack::message("Comment is updated.")))
}

/// DELETE /post/{postid}/comment/{commentid} — comment-author-only. The
/// delete removes the comment from its post's list and the record in one
/// step.
pub async fn delete_comment(
    State(state): State<AppState>,
    identity: Identity,
    Path((postid, commentid)): Path<(String, String)>,
) -> ApiResult<Json<Ack>> {
    load_own_comment(&state, identity, &postid, &commentid).await?;

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || db.delete_comment(&commentid))
        .await
        .map_err(ApiError::join)??;

    Ok(Json(Ack::message("Comment is removed.")))
}
