/// Integration tests for the SQLite store: friend-graph symmetry, token
/// revocation, chat append order, feed ordering.
use link_db::Database;
use uuid::Uuid;

fn user(db: &Database, first: &str, last: &str) -> String {
    let id = Uuid::new_v4().to_string();
    let email = format!("{}@test.com", Uuid::new_v4());
    db.create_user(&id, &email, "hash", first, last).unwrap();
    id
}

fn room_key(a: &str, b: &str) -> (String, String, String) {
    // larger id first, matching the canonical pair key
    let (big, small) = if a > b { (a, b) } else { (b, a) };
    (format!("{big},{small}"), big.to_string(), small.to_string())
}

#[test]
fn open_creates_schema_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::open(&dir.path().join("link.db")).unwrap();
    let id = user(&db, "Ada", "Lovelace");
    assert!(db.get_user_by_id(&id).unwrap().is_some());
}

#[test]
fn duplicate_email_is_rejected() {
    let db = Database::open_in_memory().unwrap();
    let id1 = Uuid::new_v4().to_string();
    let id2 = Uuid::new_v4().to_string();
    db.create_user(&id1, "dup@test.com", "h", "A", "B").unwrap();
    assert!(db.create_user(&id2, "dup@test.com", "h", "C", "D").is_err());
}

#[test]
fn friend_request_is_idempotent() {
    let db = Database::open_in_memory().unwrap();
    let a = user(&db, "A", "A");
    let b = user(&db, "B", "B");

    db.add_friend_request(&b, &a).unwrap();
    db.add_friend_request(&b, &a).unwrap();

    let requests = db.request_ids(&b).unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests.contains(&a));
}

#[test]
fn accept_produces_symmetric_friendship_and_consumes_request() {
    let db = Database::open_in_memory().unwrap();
    let a = user(&db, "A", "A");
    let b = user(&db, "B", "B");

    db.add_friend_request(&b, &a).unwrap();
    db.accept_friend_request(&b, &a).unwrap();

    assert!(db.are_friends(&a, &b).unwrap());
    assert!(db.are_friends(&b, &a).unwrap());
    assert!(db.request_ids(&b).unwrap().is_empty());
}

#[test]
fn remove_friendship_clears_both_directions() {
    let db = Database::open_in_memory().unwrap();
    let a = user(&db, "A", "A");
    let b = user(&db, "B", "B");

    db.add_friend_request(&b, &a).unwrap();
    db.accept_friend_request(&b, &a).unwrap();

    assert!(db.remove_friendship(&a, &b).unwrap());
    assert!(!db.are_friends(&a, &b).unwrap());
    assert!(!db.are_friends(&b, &a).unwrap());

    // second removal reports nothing to remove
    assert!(!db.remove_friendship(&a, &b).unwrap());
}

#[test]
fn deleted_token_is_no_longer_live() {
    let db = Database::open_in_memory().unwrap();
    let owner = user(&db, "A", "A");

    db.insert_token("tok-1", "refresh", &owner, "2999-01-01 00:00:00").unwrap();
    assert!(db.token_is_live("tok-1", "refresh").unwrap());

    assert!(db.delete_token("tok-1").unwrap());
    assert!(!db.token_is_live("tok-1", "refresh").unwrap());
}

#[test]
fn expired_token_is_not_live_and_gets_reaped() {
    let db = Database::open_in_memory().unwrap();
    let owner = user(&db, "A", "A");

    db.insert_token("tok-old", "refresh", &owner, "2000-01-01 00:00:00").unwrap();
    assert!(!db.token_is_live("tok-old", "refresh").unwrap());

    // the sweep on the next insert removes the expired row entirely
    db.insert_token("tok-new", "refresh", &owner, "2999-01-01 00:00:00").unwrap();
    assert!(!db.delete_token("tok-old").unwrap());
}

#[test]
fn token_kind_must_match() {
    let db = Database::open_in_memory().unwrap();
    let owner = user(&db, "A", "A");

    db.insert_token("tok-reset", "password", &owner, "2999-01-01 00:00:00").unwrap();
    assert!(db.token_is_live("tok-reset", "password").unwrap());
    assert!(!db.token_is_live("tok-reset", "refresh").unwrap());
}

#[test]
fn owner_bulk_delete_revokes_every_session() {
    let db = Database::open_in_memory().unwrap();
    let owner = user(&db, "A", "A");
    let other = user(&db, "B", "B");

    db.insert_token("tok-1", "refresh", &owner, "2999-01-01 00:00:00").unwrap();
    db.insert_token("tok-2", "refresh", &owner, "2999-01-01 00:00:00").unwrap();
    db.insert_token("tok-3", "refresh", &other, "2999-01-01 00:00:00").unwrap();

    assert_eq!(db.delete_tokens_for_owner(&owner).unwrap(), 2);
    assert!(!db.token_is_live("tok-1", "refresh").unwrap());
    assert!(!db.token_is_live("tok-2", "refresh").unwrap());
    assert!(db.token_is_live("tok-3", "refresh").unwrap());
}

#[test]
fn messages_come_back_in_append_order() {
    let db = Database::open_in_memory().unwrap();
    let a = user(&db, "A", "A");
    let b = user(&db, "B", "B");
    let (room, big, small) = room_key(&a, &b);

    let m1 = Uuid::new_v4().to_string();
    let m2 = Uuid::new_v4().to_string();
    db.insert_chat_message(&m1, &room, &big, &small, &a, "first", false, false).unwrap();
    db.insert_chat_message(&m2, &room, &big, &small, &b, "second", true, false).unwrap();

    let messages = db.messages_for_room(&room).unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "first");
    assert_eq!(messages[1].content, "second");
    assert_eq!(messages[1].author_first_name, "B");
    assert!(messages[1].markdown);
}

#[test]
fn chat_summaries_exclude_empty_rooms_and_sort_by_recency() {
    let db = Database::open_in_memory().unwrap();
    let a = user(&db, "A", "A");
    let b = user(&db, "B", "B");
    let c = user(&db, "C", "C");

    let (room_ab, big_ab, small_ab) = room_key(&a, &b);
    let (room_ac, big_ac, small_ac) = room_key(&a, &c);

    db.insert_chat_message(
        &Uuid::new_v4().to_string(), &room_ab, &big_ab, &small_ab, &a, "hey b", false, false,
    )
    .unwrap();
    db.insert_chat_message(
        &Uuid::new_v4().to_string(), &room_ac, &big_ac, &small_ac, &c, "hey a", false, false,
    )
    .unwrap();

    // a room that exists but never saw a message must not be listed
    let (room_bc, big_bc, small_bc) = room_key(&b, &c);
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO chats (room, user_a, user_b) VALUES (?1, ?2, ?3)",
            (&room_bc, &big_bc, &small_bc),
        )?;
        Ok(())
    })
    .unwrap();

    let summaries = db.chat_summaries(&a).unwrap();
    assert_eq!(summaries.len(), 2);
    // room_ac saw the most recent message
    assert_eq!(summaries[0].room, room_ac);
    assert_eq!(summaries[1].room, room_ab);

    // b and c each have one real conversation; the empty b-c room stays
    // hidden from both
    assert_eq!(db.chat_summaries(&b).unwrap().len(), 1);
    assert_eq!(db.chat_summaries(&c).unwrap().len(), 1);
}

#[test]
fn feed_is_oldest_first_across_authors() {
    let db = Database::open_in_memory().unwrap();
    let a = user(&db, "A", "A");
    let b = user(&db, "B", "B");

    let p1 = Uuid::new_v4().to_string();
    let p2 = Uuid::new_v4().to_string();
    let p3 = Uuid::new_v4().to_string();
    db.insert_post(&p1, &a, "one", false, false, "").unwrap();
    db.insert_post(&p2, &b, "two", false, false, "").unwrap();
    db.insert_post(&p3, &a, "three", false, false, "").unwrap();

    let feed = db.feed_posts(&[a.clone(), b.clone()]).unwrap();
    let contents: Vec<_> = feed.iter().map(|p| p.content.as_str()).collect();
    assert_eq!(contents, ["one", "two", "three"]);

    let own = db.feed_posts(&[a.clone()]).unwrap();
    let contents: Vec<_> = own.iter().map(|p| p.content.as_str()).collect();
    assert_eq!(contents, ["one", "three"]);
}

#[test]
fn likes_are_a_set() {
    let db = Database::open_in_memory().unwrap();
    let a = user(&db, "A", "A");
    let post = Uuid::new_v4().to_string();
    db.insert_post(&post, &a, "p", false, false, "").unwrap();

    db.add_like(&post, &a).unwrap();
    db.add_like(&post, &a).unwrap();
    assert_eq!(db.likes_for_posts(&[post.clone()]).unwrap().len(), 1);

    db.remove_like(&post, &a).unwrap();
    db.remove_like(&post, &a).unwrap();
    assert!(db.likes_for_posts(&[post.clone()]).unwrap().is_empty());
}

#[test]
fn deleting_a_post_takes_comments_and_likes_with_it() {
    let db = Database::open_in_memory().unwrap();
    let a = user(&db, "A", "A");
    let post = Uuid::new_v4().to_string();
    let comment = Uuid::new_v4().to_string();

    db.insert_post(&post, &a, "p", false, false, "").unwrap();
    db.insert_comment(&comment, &post, &a, "c", false, false).unwrap();
    db.add_like(&post, &a).unwrap();

    assert!(db.delete_post(&post).unwrap());
    assert!(db.get_post(&post).unwrap().is_none());
    assert!(db.get_comment(&comment).unwrap().is_none());
    assert!(db.likes_for_posts(&[post.clone()]).unwrap().is_empty());
}
