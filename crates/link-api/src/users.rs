use std::collections::{HashMap, HashSet};

use axum::Json;
use axum::extract::{Path, Query, State};
use tracing::debug;
use uuid::Uuid;

use link_auth::{hash_password, verify_password};
use link_db::models::UserRow;
use link_types::api::{
    Ack, ChangePasswordRequest, ProfileResponse, SearchQuery, SearchResponse, UpdateUserRequest,
    UserProfile, UserView, UsersResponse,
};

use crate::error::{ApiError, ApiResult};
use crate::images::decode_image;
use crate::relationship::classify;
use crate::session::Identity;
use crate::state::AppState;
use crate::views::{build_post_views, parse_id};

/// A match is kept when the edit distance is at most this share of the
/// longer string, in percent.
const SEARCH_DISTANCE_CUTOFF: usize = 65;

type EdgeSets = HashMap<String, HashSet<String>>;

/// Everything needed to classify any pair of users in one pass.
struct Directory {
    users: Vec<UserRow>,
    friends_of: EdgeSets,
    requests_of: EdgeSets,
}

impl Directory {
    fn classify(&self, self_id: &str, other_id: &str) -> link_types::models::Relationship {
        static EMPTY: std::sync::LazyLock<HashSet<String>> =
            std::sync::LazyLock::new(HashSet::new);
        let self_friends = self.friends_of.get(self_id).unwrap_or(&EMPTY);
        let self_requests = self.requests_of.get(self_id).unwrap_or(&EMPTY);
        let other_requests = self.requests_of.get(other_id).unwrap_or(&EMPTY);
        classify(self_id, other_id, self_friends, self_requests, other_requests)
    }
}

async fn load_directory(state: &AppState) -> ApiResult<Directory> {
    let db = state.db.clone();
    let (users, friend_edges, request_edges) = tokio::task::spawn_blocking(move || {
        let users = db.list_users()?;
        let friend_edges = db.all_friend_edges()?;
        let request_edges = db.all_request_edges()?;
        Ok::<_, anyhow::Error>((users, friend_edges, request_edges))
    })
    .await
    .map_err(ApiError::join)??;

    let mut friends_of: EdgeSets = HashMap::new();
    for (user, friend) in friend_edges {
        friends_of.entry(user).or_default().insert(friend);
    }
    let mut requests_of: EdgeSets = HashMap::new();
    for (recipient, sender) in request_edges {
        requests_of.entry(recipient).or_default().insert(sender);
    }

    Ok(Directory { users, friends_of, requests_of })
}

fn directory_views(directory: &Directory, self_id: &str) -> Vec<UserView> {
    directory
        .users
        .iter()
        .map(|row| UserView {
            id: parse_id(&row.id),
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
            image: row.image.clone(),
            relationship: directory.classify(self_id, &row.id),
        })
        .collect()
}

/// GET /user — every registered user with the caller's classification,
/// sorted by lowercase full name.
pub async fn get_users(
    State(state): State<AppState>,
    identity: Identity,
) -> ApiResult<Json<UsersResponse>> {
    let directory = load_directory(&state).await?;
    let mut users = directory_views(&directory, &identity.user_id.to_string());

    users.sort_by_key(|u| format!("{} {}", u.first_name, u.last_name).to_lowercase());

    debug!("User list is returned to client.");
    Ok(Json(UsersResponse { users }))
}

/// GET /user/search?keyword= — fuzzy directory search by normalized edit
/// distance against concatenated full names.
pub async fn search_users(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let keyword = query
        .keyword
        .as_deref()
        .map(clean_name)
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::bad_request("No keyword found."))?;

    let directory = load_directory(&state).await?;
    let views = directory_views(&directory, &identity.user_id.to_string());

    let mut scored: Vec<(usize, UserView)> = views
        .into_iter()
        .filter_map(|user| {
            let full_name = clean_name(&format!("{}{}", user.first_name, user.last_name));
            let longest = keyword.chars().count().max(full_name.chars().count());
            if longest == 0 {
                return None;
            }
            let pct = edit_distance(&keyword, &full_name) * 100 / longest;
            (pct <= SEARCH_DISTANCE_CUTOFF).then_some((pct, user))
        })
        .collect();

    scored.sort_by_key(|(pct, _)| *pct);

    Ok(Json(SearchResponse {
        status: true,
        users: scored.into_iter().map(|(_, user)| user).collect(),
    }))
}

struct ProfileData {
    target: UserRow,
    friends: Vec<UserRow>,
    requesters: Vec<UserRow>,
    posts: Vec<link_db::models::PostRow>,
    likes: Vec<link_db::models::LikeRow>,
    comments: Vec<link_db::models::CommentRow>,
    directory_edges: (Vec<(String, String)>, Vec<(String, String)>),
}

/// GET /user/{userid} — profile with posts, friends, and (for the owner
/// only) the pending request queue.
pub async fn get_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(userid): Path<String>,
) -> ApiResult<Json<ProfileResponse>> {
    if userid.parse::<Uuid>().is_err() {
        return Err(ApiError::not_found("User not found."));
    }

    let self_id = identity.user_id.to_string();
    let is_self = self_id == userid;

    let db = state.db.clone();
    let target_id = userid.clone();
    let data = tokio::task::spawn_blocking(move || {
        let Some(target) = db.get_user_by_id(&target_id)? else {
            return Ok(None);
        };

        let friend_ids: Vec<String> = db.friend_ids(&target_id)?.into_iter().collect();
        let friends = db.users_by_ids(&friend_ids)?;

        let requesters = if is_self {
            let request_ids: Vec<String> = db.request_ids(&target_id)?.into_iter().collect();
            db.users_by_ids(&request_ids)?
        } else {
            Vec::new()
        };

        let posts = db.posts_by_author(&target_id)?;
        let post_ids: Vec<String> = posts.iter().map(|p| p.id.clone()).collect();
        let likes = db.likes_for_posts(&post_ids)?;
        let comments = db.comments_for_posts(&post_ids)?;

        let directory_edges = (db.all_friend_edges()?, db.all_request_edges()?);

        Ok::<_, anyhow::Error>(Some(ProfileData {
            target,
            friends,
            requesters,
            posts,
            likes,
            comments,
            directory_edges,
        }))
    })
    .await
    .map_err(ApiError::join)??
    .ok_or_else(|| ApiError::not_found("User not found."))?;

    let mut friends_of: EdgeSets = HashMap::new();
    for (user, friend) in data.directory_edges.0 {
        friends_of.entry(user).or_default().insert(friend);
    }
    let mut requests_of: EdgeSets = HashMap::new();
    for (recipient, sender) in data.directory_edges.1 {
        requests_of.entry(recipient).or_default().insert(sender);
    }
    let directory = Directory { users: Vec::new(), friends_of, requests_of };

    let friend_views = data
        .friends
        .iter()
        .map(|row| UserView {
            id: parse_id(&row.id),
            first_name: row.first_name.clone(),
            last_name: row.last_name.clone(),
            image: row.image.clone(),
            relationship: directory.classify(&self_id, &row.id),
        })
        .collect();

    let request_views = is_self.then(|| {
        data.requesters
            .iter()
            .map(|row| UserView {
                id: parse_id(&row.id),
                first_name: row.first_name.clone(),
                last_name: row.last_name.clone(),
                image: row.image.clone(),
                relationship: directory.classify(&self_id, &row.id),
            })
            .collect::<Vec<_>>()
    });

    let user = UserProfile {
        id: parse_id(&data.target.id),
        first_name: data.target.first_name.clone(),
        last_name: data.target.last_name.clone(),
        image: data.target.image.clone(),
        relationship: directory.classify(&self_id, &userid),
        posts: build_post_views(&data.posts, &data.likes, &data.comments),
        friends: friend_views,
        friend_requests: request_views,
    };

    debug!("User information is returned to client.");
    Ok(Json(ProfileResponse { user }))
}

enum SendOutcome {
    TargetMissing,
    AlreadyFriends,
    Requested,
}

/// POST /user/{userid}/friend-request
pub async fn send_friend_request(
    State(state): State<AppState>,
    identity: Identity,
    Path(userid): Path<String>,
) -> ApiResult<Json<Ack>> {
    let self_id = identity.user_id.to_string();
    if userid == self_id {
        return Err(ApiError::bad_request("You cannot send yourself a friend request."));
    }
    if userid.parse::<Uuid>().is_err() {
        return Err(ApiError::not_found("Target user not found."));
    }

    let db = state.db.clone();
    let target_id = userid.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        if db.get_user_by_id(&target_id)?.is_none() {
            return Ok(SendOutcome::TargetMissing);
        }
        if db.are_friends(&self_id, &target_id)? {
            return Ok(SendOutcome::AlreadyFriends);
        }
        // A reciprocal pending request (they already asked us) is treated
        // as already-sent rather than creating a duplicate state; the
        // insert itself is idempotent for the plain already-sent case.
        if !db.has_request(&self_id, &target_id)? {
            db.add_friend_request(&target_id, &self_id)?;
        }
        Ok::<_, anyhow::Error>(SendOutcome::Requested)
    })
    .await
    .map_err(ApiError::join)??;

    match outcome {
        SendOutcome::TargetMissing => Err(ApiError::not_found("User not found.")),
        SendOutcome::AlreadyFriends => Err(ApiError::bad_request("User is already friend.")),
        SendOutcome::Requested => Ok(Json(Ack::message("Friend request sent."))),
    }
}

enum AcceptOutcome {
    FriendMissing,
    AlreadyFriends,
    RequestMissing,
    Accepted,
}

/// POST /user/{userid}/friend-request/{friendid} — only the recipient may
/// accept.
pub async fn accept_friend_request(
    State(state): State<AppState>,
    identity: Identity,
    Path((userid, friendid)): Path<(String, String)>,
) -> ApiResult<Json<Ack>> {
    if identity.user_id.to_string() != userid {
        return Err(ApiError::forbidden("Not allowed."));
    }
    if friendid.parse::<Uuid>().is_err() {
        return Err(ApiError::not_found("Friend not found."));
    }

    let db = state.db.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        if db.get_user_by_id(&friendid)?.is_none() {
            return Ok(AcceptOutcome::FriendMissing);
        }
        if db.are_friends(&userid, &friendid)? {
            return Ok(AcceptOutcome::AlreadyFriends);
        }
        if !db.has_request(&userid, &friendid)? {
            return Ok(AcceptOutcome::RequestMissing);
        }
        db.accept_friend_request(&userid, &friendid)?;
        debug!("{} and {} have become friends.", friendid, userid);
        Ok::<_, anyhow::Error>(AcceptOutcome::Accepted)
    })
    .await
    .map_err(ApiError::join)??;

    match outcome {
        AcceptOutcome::FriendMissing => Err(ApiError::not_found("Friend not found.")),
        AcceptOutcome::AlreadyFriends => Ok(Json(Ack::message("Users are already friend."))),
        AcceptOutcome::RequestMissing => Err(ApiError::not_found("Not found.")),
        AcceptOutcome::Accepted => Ok(Json(Ack::message("Accepted."))),
    }
}

/// DELETE /user/{userid}/friend-request/{friendid} — either the sender or
/// the holder of the pending request may cancel it.
pub async fn delete_friend_request(
    State(state): State<AppState>,
    identity: Identity,
    Path((userid, friendid)): Path<(String, String)>,
) -> ApiResult<Json<Ack>> {
    let self_id = identity.user_id.to_string();
    if self_id != userid && self_id != friendid {
        return Err(ApiError::forbidden("No permission."));
    }
    if userid.parse::<Uuid>().is_err() {
        return Err(ApiError::not_found("User not found."));
    }
    if friendid.parse::<Uuid>().is_err() {
        return Err(ApiError::not_found("Friend not found."));
    }

    let db = state.db.clone();
    let removed = tokio::task::spawn_blocking(move || {
        if db.get_user_by_id(&userid)?.is_none() {
            return Ok(None);
        }
        Ok::<_, anyhow::Error>(Some(db.remove_friend_request(&userid, &friendid)?))
    })
    .await
    .map_err(ApiError::join)??;

    match removed {
        None => Err(ApiError::not_found("User not found.")),
        Some(false) => Err(ApiError::not_found("Friend request not found.")),
        Some(true) => Ok(Json(Ack::message("Friend request is removed."))),
    }
}

/// DELETE /user/{userid}/friend/{friendid} — either party may unfriend.
pub async fn delete_friend(
    State(state): State<AppState>,
    identity: Identity,
    Path((userid, friendid)): Path<(String, String)>,
) -> ApiResult<Json<Ack>> {
    let self_id = identity.user_id.to_string();
    if self_id != userid && self_id != friendid {
        return Err(ApiError::forbidden("No permission."));
    }
    if userid.parse::<Uuid>().is_err() {
        return Err(ApiError::not_found("User not found."));
    }
    if friendid.parse::<Uuid>().is_err() {
        return Err(ApiError::not_found("Friend not found."));
    }

    let db = state.db.clone();
    let removed = tokio::task::spawn_blocking(move || {
        if db.get_user_by_id(&userid)?.is_none() || db.get_user_by_id(&friendid)?.is_none() {
            return Ok(None);
        }
        Ok::<_, anyhow::Error>(Some(db.remove_friendship(&userid, &friendid)?))
    })
    .await
    .map_err(ApiError::join)??;

    match removed {
        None => Err(ApiError::not_found("User not found.")),
        Some(false) => Err(ApiError::not_found("Friend not found.")),
        Some(true) => Ok(Json(Ack::message("Friend is removed."))),
    }
}

/// PUT /user/{userid}/password — self-only; revokes every session.
pub async fn change_password(
    State(state): State<AppState>,
    identity: Identity,
    Path(userid): Path<String>,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Json<Ack>> {
    if identity.user_id.to_string() != userid {
        return Err(ApiError::forbidden("No permission."));
    }

    let mut errors: Vec<(&'static str, String)> = Vec::new();
    if req.old_password.is_empty() {
        errors.push(("old_password", "Old password cannot be empty.".into()));
    }
    if req.new_password.len() < 8 || req.new_password.len() > 128 {
        errors.push(("new_password", "New password must be within 8 and 128 characters.".into()));
    }
    if req.new_repassword != req.new_password {
        errors.push(("new_repassword", "Confirmation password does not match.".into()));
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let db = state.db.clone();
    let lookup = userid.clone();
    let user = tokio::task::spawn_blocking(move || db.get_user_by_id(&lookup))
        .await
        .map_err(ApiError::join)??
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    if !verify_password(&req.old_password, &user.password) {
        return Err(ApiError::forbidden("Old password does not match."));
    }

    let password_hash = hash_password(&req.new_password)?;
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || {
        db.update_password(&userid, &password_hash)?;
        // force re-login everywhere
        db.delete_tokens_for_owner(&userid)?;
        Ok::<_, anyhow::Error>(())
    })
    .await
    .map_err(ApiError::join)??;

    Ok(Json(Ack::message("Password changed.")))
}

/// PUT /user/{userid} — self-only profile update.
pub async fn update_user(
    State(state): State<AppState>,
    identity: Identity,
    Path(userid): Path<String>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Json<Ack>> {
    let mut errors: Vec<(&'static str, String)> = Vec::new();
    let first_name = req.first_name.trim().to_string();
    if first_name.is_empty() || first_name.len() > 50 {
        errors.push(("first_name", "First name must be within 1 to 50 characters".into()));
    }
    let last_name = req.last_name.trim().to_string();
    if last_name.is_empty() || last_name.len() > 50 {
        errors.push(("last_name", "Last name must be within 1 to 50 characters".into()));
    }
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    if identity.user_id.to_string() != userid {
        return Err(ApiError::forbidden("No permission."));
    }

    let db = state.db.clone();
    let lookup = userid.clone();
    let user = tokio::task::spawn_blocking(move || db.get_user_by_id(&lookup))
        .await
        .map_err(ApiError::join)??
        .ok_or_else(|| ApiError::not_found("User not found."))?;

    let attachment = match req.image.as_deref() {
        Some(data) => Some(
            decode_image(data)
                .ok_or_else(|| ApiError::validation([("image", "Invalid image payload.")]))?,
        ),
        None => None,
    };

    let image = state
        .images
        .apply_update(&userid, &user.image, req.delete_image, attachment.as_deref())
        .await?;

    let db = state.db.clone();
    tokio::task::spawn_blocking(move || db.update_profile(&userid, &first_name, &last_name, &image))
        .await
        .map_err(ApiError::join)??;

    debug!("User information is updated.");
    Ok(Json(Ack::message("User information is updated.")))
}

fn clean_name(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Levenshtein distance over characters.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
