use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{RwLock, broadcast};
use uuid::Uuid;

use link_types::events::GatewayEvent;
use link_types::models::RoomKey;

/// Per-room broadcast capacity. A receiver that falls this far behind
/// starts losing events; delivery is best-effort by design.
const ROOM_CHANNEL_CAPACITY: usize = 256;

/// A room event tagged with the connection that produced it, so the
/// sender's own connection can skip the echo.
#[derive(Debug, Clone)]
pub struct RoomMessage {
    pub origin: Uuid,
    pub event: GatewayEvent,
}

/// Per-room subscriber registry. Each room gets its own broadcast channel,
/// created lazily on the first join and kept for the process lifetime —
/// the volatile delivery path is fully independent of the durable store.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    rooms: RwLock<HashMap<RoomKey, broadcast::Sender<RoomMessage>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                rooms: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Subscribe to a room channel, creating it lazily.
    pub async fn join(&self, room: RoomKey) -> broadcast::Receiver<RoomMessage> {
        let mut rooms = self.inner.rooms.write().await;
        rooms
            .entry(room)
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to a room's current subscribers. Fire-and-forget:
    /// a room nobody has joined simply swallows the event.
    pub async fn publish(&self, room: RoomKey, origin: Uuid, event: GatewayEvent) {
        let rooms = self.inner.rooms.read().await;
        if let Some(tx) = rooms.get(&room) {
            let _ = tx.send(RoomMessage { origin, event });
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use link_types::api::MessageView;
    use link_types::models::UserSummary;

    fn receive_event(author: Uuid, content: &str) -> GatewayEvent {
        GatewayEvent::Receive {
            message: MessageView {
                id: Uuid::new_v4(),
                author: UserSummary {
                    id: author,
                    first_name: "A".into(),
                    last_name: "B".into(),
                    image: String::new(),
                },
                content: content.into(),
                markdown: false,
                math: false,
                date: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn both_pair_orderings_share_one_channel() {
        let dispatcher = Dispatcher::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let mut rx = dispatcher.join(RoomKey::new(a, b)).await;

        let origin = Uuid::new_v4();
        dispatcher
            .publish(RoomKey::new(b, a), origin, receive_event(a, "hello"))
            .await;

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.origin, origin);
        assert!(matches!(msg.event, GatewayEvent::Receive { .. }));
    }

    #[tokio::test]
    async fn all_subscribers_see_the_event_with_its_origin() {
        let dispatcher = Dispatcher::new();
        let room = RoomKey::new(Uuid::new_v4(), Uuid::new_v4());

        let mut rx1 = dispatcher.join(room).await;
        let mut rx2 = dispatcher.join(room).await;

        let origin = Uuid::new_v4();
        dispatcher.publish(room, origin, receive_event(origin, "x")).await;

        assert_eq!(rx1.recv().await.unwrap().origin, origin);
        assert_eq!(rx2.recv().await.unwrap().origin, origin);
    }

    #[tokio::test]
    async fn publishing_into_an_unjoined_room_is_a_no_op() {
        let dispatcher = Dispatcher::new();
        let room = RoomKey::new(Uuid::new_v4(), Uuid::new_v4());
        // nothing to assert beyond "does not panic / does not block"
        dispatcher.publish(room, Uuid::new_v4(), receive_event(Uuid::new_v4(), "x")).await;
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let dispatcher = Dispatcher::new();
        let room_ab = RoomKey::new(Uuid::new_v4(), Uuid::new_v4());
        let room_cd = RoomKey::new(Uuid::new_v4(), Uuid::new_v4());

        let mut rx_ab = dispatcher.join(room_ab).await;
        let mut rx_cd = dispatcher.join(room_cd).await;

        dispatcher
            .publish(room_ab, Uuid::new_v4(), receive_event(Uuid::new_v4(), "ab only"))
            .await;

        assert!(rx_ab.recv().await.is_ok());
        assert!(rx_cd.try_recv().is_err());
    }
}
