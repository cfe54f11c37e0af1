use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{error, info, trace, warn};
use uuid::Uuid;

use link_db::Database;
use link_types::api::MessageView;
use link_types::events::{GatewayCommand, GatewayEvent};
use link_types::models::{RoomKey, UserSummary};

use crate::dispatcher::Dispatcher;

/// Heartbeat interval: server sends a Ping every 15 seconds.
/// If 2 consecutive Pongs are missed (~30s), the connection is dropped.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Rooms this connection has joined, plus the forwarder tasks feeding its
/// outgoing queue. Joining and leaving (disconnect) are the lifecycle.
struct ConnectionRooms {
    joined: HashSet<RoomKey>,
    forwarders: Vec<AbortHandle>,
}

/// Handle a pre-authenticated WebSocket connection. The access token was
/// validated at the HTTP upgrade layer, so the loop starts at Ready.
pub async fn handle_connection(
    socket: WebSocket,
    dispatcher: Dispatcher,
    db: Arc<Database>,
    user_id: Uuid,
) {
    // Resolve the author summary once; it is stamped on every message
    // this connection publishes.
    let author = {
        let db = db.clone();
        let uid = user_id.to_string();
        let row = tokio::task::spawn_blocking(move || db.get_user_by_id(&uid)).await;
        match row {
            Ok(Ok(Some(row))) => UserSummary {
                id: user_id,
                first_name: row.first_name,
                last_name: row.last_name,
                image: row.image,
            },
            Ok(Ok(None)) => {
                warn!("{} connected to gateway but has no user record, closing", user_id);
                return;
            }
            Ok(Err(e)) => {
                error!("gateway user lookup failed: {}", e);
                return;
            }
            Err(e) => {
                error!("spawn_blocking join error: {}", e);
                return;
            }
        }
    };

    let conn_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    info!("{} connected to gateway", user_id);

    let ready = GatewayEvent::Ready { userid: user_id };
    let Ok(ready_text) = serde_json::to_string(&ready) else {
        return;
    };
    if sender.send(Message::Text(ready_text.into())).await.is_err() {
        return;
    }

    // Room forwarder tasks feed this queue; the send task drains it.
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<GatewayEvent>();

    let rooms = Arc::new(Mutex::new(ConnectionRooms {
        joined: HashSet::new(),
        forwarders: Vec::new(),
    }));

    // Shared flag for heartbeat
    let pong_received = Arc::new(AtomicBool::new(true));
    let pong_flag_send = pong_received.clone();
    let pong_flag_recv = pong_received.clone();

    // Forward queued events -> client, with heartbeat
    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;
        let mut missed_heartbeats: u8 = 0;

        loop {
            tokio::select! {
                result = out_rx.recv() => {
                    let event = match result {
                        Some(event) => event,
                        None => break,
                    };
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            error!("failed to encode gateway event: {}", e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                _ = heartbeat.tick() => {
                    if pong_flag_send.swap(false, Ordering::Acquire) {
                        missed_heartbeats = 0;
                    } else {
                        missed_heartbeats += 1;
                        if missed_heartbeats >= 2 {
                            warn!("Heartbeat timeout (missed {} pongs), dropping connection", missed_heartbeats);
                            break;
                        }
                    }
                    if sender.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Read commands from client
    let rooms_recv = rooms.clone();
    let dispatcher_recv = dispatcher.clone();
    let db_recv = db.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => {
                        handle_command(
                            &dispatcher_recv,
                            &db_recv,
                            conn_id,
                            user_id,
                            &author,
                            &out_tx,
                            &rooms_recv,
                            cmd,
                        )
                        .await;
                    }
                    Err(e) => {
                        warn!(
                            "{} bad command: {} -- raw: {}",
                            user_id,
                            e,
                            &text[..text.len().min(200)]
                        );
                    }
                },
                Message::Pong(_) => {
                    pong_flag_recv.store(true, Ordering::Release);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Wait for either task to finish
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    // Leave every room: the forwarder tasks die with the connection.
    let forwarders = match rooms.lock() {
        Ok(mut state) => std::mem::take(&mut state.forwarders),
        Err(_) => Vec::new(),
    };
    for handle in forwarders {
        handle.abort();
    }

    info!("{} disconnected from gateway", user_id);
}

#[allow(clippy::too_many_arguments)]
async fn handle_command(
    dispatcher: &Dispatcher,
    db: &Arc<Database>,
    conn_id: Uuid,
    user_id: Uuid,
    author: &UserSummary,
    out_tx: &mpsc::UnboundedSender<GatewayEvent>,
    rooms: &Arc<Mutex<ConnectionRooms>>,
    cmd: GatewayCommand,
) {
    match cmd {
        GatewayCommand::Join { users } => {
            let room = RoomKey::new(users[0], users[1]);

            // Same trust boundary as Send: outsiders are ignored silently.
            if !room.contains(user_id) {
                trace!("{} ignored join for room {}", user_id, room);
                return;
            }

            let already_joined = {
                let Ok(mut state) = rooms.lock() else { return };
                !state.joined.insert(room)
            };
            if already_joined {
                return;
            }

            info!("{} joined room {}", user_id, room);

            let mut room_rx = dispatcher.join(room).await;
            let tx = out_tx.clone();
            let handle = tokio::spawn(async move {
                loop {
                    match room_rx.recv().await {
                        Ok(msg) => {
                            // Delivery excludes the sending connection.
                            if msg.origin == conn_id {
                                continue;
                            }
                            if tx.send(msg.event).is_err() {
                                break;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            warn!("Room receiver lagged by {} messages", n);
                        }
                        Err(_) => break,
                    }
                }
            });

            if let Ok(mut state) = rooms.lock() {
                state.forwarders.push(handle.abort_handle());
            }
        }

        GatewayCommand::Send { users, author: claimed, message } => {
            let room = RoomKey::new(users[0], users[1]);

            // Fire-and-forget trust boundary: a sender outside the pair,
            // or one claiming someone else's authorship, gets no error —
            // the message simply goes nowhere.
            if !room.contains(user_id) || claimed != user_id {
                trace!("{} dropped unauthorized message for room {}", user_id, room);
                return;
            }

            let view = MessageView {
                id: Uuid::new_v4(),
                author: author.clone(),
                content: message.content,
                markdown: message.markdown,
                math: message.math,
                date: Utc::now(),
            };

            // Volatile fan-out to whoever is in the room right now.
            dispatcher
                .publish(room, conn_id, GatewayEvent::Receive { message: view.clone() })
                .await;

            // Durable write, independent of delivery.
            let db = db.clone();
            tokio::spawn(async move {
                let (user_a, user_b) = room.participants();
                let result = tokio::task::spawn_blocking(move || {
                    db.insert_chat_message(
                        &view.id.to_string(),
                        &room.to_string(),
                        &user_a.to_string(),
                        &user_b.to_string(),
                        &user_id.to_string(),
                        &view.content,
                        view.markdown,
                        view.math,
                    )
                })
                .await;

                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => error!("failed to persist chat message: {}", e),
                    Err(e) => error!("spawn_blocking join error: {}", e),
                }
            });
        }
    }
}
