use axum::{
    Router, middleware,
    routing::{delete, get, post, put},
};

use crate::session::session_gate;
use crate::state::AppState;
use crate::{auth, chat, posts, users};

/// The REST surface: public auth routes plus everything behind the
/// session gate. The WebSocket gateway route is wired by the server
/// binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/verify-email", post(auth::verify_email))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/auth/verify-reset-password", post(auth::verify_reset_password))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/get-status", get(auth::get_status))
        .route("/user", get(users::get_users))
        .route("/user/search", get(users::search_users))
        .route("/user/{userid}", get(users::get_user).put(users::update_user))
        .route("/user/{userid}/password", put(users::change_password))
        .route("/user/{userid}/friend-request", post(users::send_friend_request))
        .route(
            "/user/{userid}/friend-request/{friendid}",
            post(users::accept_friend_request).delete(users::delete_friend_request),
        )
        .route("/user/{userid}/friend/{friendid}", delete(users::delete_friend))
        .route("/post", get(posts::feed).post(posts::create_post))
        .route("/post/{postid}", put(posts::update_post).delete(posts::delete_post))
        .route("/post/{postid}/like", post(posts::like_post).delete(posts::unlike_post))
        .route("/post/{postid}/comment", post(posts::comment_post))
        .route(
            "/post/{postid}/comment/{commentid}",
            put(posts::update_comment).delete(posts::delete_comment),
        )
        .route("/chat", get(chat::get_chats))
        .route("/chat/{pairkey}", get(chat::get_chat))
        .layer(middleware::from_fn_with_state(state.clone(), session_gate))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}
