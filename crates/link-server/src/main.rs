use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::{IntoResponse, Response},
    routing::get,
};
use axum_extra::extract::cookie::CookieJar;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use link_api::email::Mailer;
use link_api::error::ApiError;
use link_api::images::ImageStore;
use link_api::session::ACCESS_COOKIE;
use link_api::state::{AppState, AppStateInner};
use link_auth::{AccessClaims, TokenKeys, TokenKind};
use link_db::Database;
use link_gateway::connection;
use link_gateway::dispatcher::Dispatcher;

#[derive(Clone)]
struct ServerState {
    db: Arc<Database>,
    dispatcher: Dispatcher,
    keys: TokenKeys,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "link=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let keys = TokenKeys::from_env();
    let db_path = std::env::var("LINK_DB_PATH").unwrap_or_else(|_| "link.db".into());
    let host = std::env::var("LINK_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("LINK_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let client_url =
        std::env::var("LINK_CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".into());
    let image_dir = std::env::var("LINK_IMAGE_DIR").unwrap_or_else(|_| "public/images".into());

    // Init database and collaborators
    let db = Arc::new(Database::open(&PathBuf::from(&db_path))?);
    let images = ImageStore::new(&image_dir);
    images.ensure_dir().await?;
    let mailer = Mailer::from_env();

    // Shared state
    let dispatcher = Dispatcher::new();
    let app_state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        keys: keys.clone(),
        mailer,
        images,
        client_url,
    });

    let server_state = ServerState {
        db,
        dispatcher,
        keys,
    };

    // Routes
    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(server_state);

    let app = link_api::router::router(app_state)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Link server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// The chat gateway authenticates at the HTTP upgrade with the same
/// access-token cookie the session gate reads; an expired token sends the
/// client through the refresh step before reconnecting.
async fn ws_upgrade(
    State(state): State<ServerState>,
    jar: CookieJar,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(cookie) = jar.get(ACCESS_COOKIE) else {
        return ApiError::forbidden("Please log in.").into_response();
    };

    let claims: AccessClaims = match state.keys.validate(TokenKind::Access, cookie.value()) {
        Ok(claims) => claims,
        Err(e) => return ApiError::Token(e).into_response(),
    };

    ws.on_upgrade(move |socket| {
        connection::handle_connection(socket, state.dispatcher, state.db, claims.sub)
    })
    .into_response()
}
