use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Social-graph classification between the caller and another user.
///
/// Derived at query time, never stored. Checked in precedence order:
/// self > friend > accept > sent > stranger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relationship {
    /// Same identity on both sides.
    #[serde(rename = "self")]
    Oneself,
    /// Mutual presence in each other's friend sets.
    Friend,
    /// The other user sent the caller a request awaiting the caller's decision.
    Accept,
    /// The caller sent the other user a request awaiting their decision.
    Sent,
    /// No relationship.
    Stranger,
}

/// Canonical key for a two-party chat room: the larger id always comes
/// first, so both participants resolve to the same room regardless of
/// call order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoomKey {
    first: Uuid,
    second: Uuid,
}

impl RoomKey {
    pub fn new(a: Uuid, b: Uuid) -> Self {
        if a > b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Parse a `"{id},{id}"` pair key as it appears in request paths.
    /// Accepts either ordering; the result is canonical.
    pub fn parse(raw: &str) -> Option<Self> {
        let (a, b) = raw.split_once(',')?;
        if b.contains(',') {
            return None;
        }
        let a: Uuid = a.parse().ok()?;
        let b: Uuid = b.parse().ok()?;
        Some(Self::new(a, b))
    }

    pub fn participants(&self) -> (Uuid, Uuid) {
        (self.first, self.second)
    }

    pub fn contains(&self, user: Uuid) -> bool {
        self.first == user || self.second == user
    }

    /// The participant that is not `user`, if `user` is in the room.
    pub fn other(&self, user: Uuid) -> Option<Uuid> {
        if self.first == user {
            Some(self.second)
        } else if self.second == user {
            Some(self.first)
        } else {
            None
        }
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.first, self.second)
    }
}

/// The public slice of a user embedded in other responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub image: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_key_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(RoomKey::new(a, b), RoomKey::new(b, a));
        assert_eq!(RoomKey::new(a, b).to_string(), RoomKey::new(b, a).to_string());
    }

    #[test]
    fn room_key_puts_larger_id_first() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let (first, second) = RoomKey::new(a, b).participants();
        assert!(first > second);
    }

    #[test]
    fn parse_round_trips() {
        let key = RoomKey::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(RoomKey::parse(&key.to_string()), Some(key));
    }

    #[test]
    fn parse_rejects_malformed_keys() {
        assert_eq!(RoomKey::parse("not-a-pair"), None);
        assert_eq!(RoomKey::parse("a,b"), None);
        let id = Uuid::new_v4();
        assert_eq!(RoomKey::parse(&format!("{id}")), None);
        assert_eq!(RoomKey::parse(&format!("{id},{id},{id}")), None);
    }

    #[test]
    fn other_participant() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let key = RoomKey::new(a, b);
        assert_eq!(key.other(a), Some(b));
        assert_eq!(key.other(b), Some(a));
        assert_eq!(key.other(Uuid::new_v4()), None);
    }
}
