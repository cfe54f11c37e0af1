use std::collections::HashSet;

use link_types::models::Relationship;

/// Classify the social-graph state between `self_id` and `other_id`.
///
/// The checks run in a fixed precedence order (self > friend > accept >
/// sent > stranger). Under the symmetry invariants ties cannot occur, but
/// the order still decides the answer on inconsistent data, so it must
/// not be rearranged.
pub fn classify(
    self_id: &str,
    other_id: &str,
    self_friends: &HashSet<String>,
    self_requests: &HashSet<String>,
    other_requests: &HashSet<String>,
) -> Relationship {
    if self_id == other_id {
        return Relationship::Oneself;
    }

    if self_friends.contains(other_id) {
        return Relationship::Friend;
    }

    // `other` asked us: ours to accept.
    if self_requests.contains(other_id) {
        return Relationship::Accept;
    }

    // We asked `other`: waiting on their decision.
    if other_requests.contains(self_id) {
        return Relationship::Sent;
    }

    Relationship::Stranger
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn same_identity_is_self() {
        assert_eq!(
            classify("a", "a", &set(&[]), &set(&[]), &set(&[])),
            Relationship::Oneself
        );
    }

    #[test]
    fn mutual_friend_sets_classify_as_friend() {
        assert_eq!(
            classify("a", "b", &set(&["b"]), &set(&[]), &set(&[])),
            Relationship::Friend
        );
    }

    #[test]
    fn incoming_request_is_accept_outgoing_is_sent() {
        // b asked a: a sees "accept", b sees "sent"
        let a_requests = set(&["b"]);
        assert_eq!(
            classify("a", "b", &set(&[]), &a_requests, &set(&[])),
            Relationship::Accept
        );
        assert_eq!(
            classify("b", "a", &set(&[]), &set(&[]), &a_requests),
            Relationship::Sent
        );
    }

    #[test]
    fn no_edges_means_stranger() {
        assert_eq!(
            classify("a", "b", &set(&[]), &set(&[]), &set(&[])),
            Relationship::Stranger
        );
    }

    #[test]
    fn precedence_on_inconsistent_data() {
        // friendship outranks a stale pending request in both directions
        assert_eq!(
            classify("a", "b", &set(&["b"]), &set(&["b"]), &set(&["a"])),
            Relationship::Friend
        );
        // an incoming request outranks an outgoing one
        assert_eq!(
            classify("a", "b", &set(&[]), &set(&["b"]), &set(&["a"])),
            Relationship::Accept
        );
        // self outranks everything
        assert_eq!(
            classify("a", "a", &set(&["a"]), &set(&["a"]), &set(&["a"])),
            Relationship::Oneself
        );
    }
}
