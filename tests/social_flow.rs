use mingle::auth::{password, session};
use mingle::db;
use mingle::feed;
use mingle::social;
use tempfile::TempDir;

fn test_db() -> (TempDir, db::DbPool) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let pool = db::create_pool(&db_path).expect("Failed to create test database");
    db::run_migrations(&pool).expect("Failed to run migrations");
    (temp_dir, pool)
}

fn create_user(pool: &db::DbPool, username: &str) -> String {
    let conn = pool.get().unwrap();
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash) VALUES (?1, ?2, ?3, 'x')",
        rusqlite::params![id, username, format!("{}@example.com", username)],
    )
    .unwrap();
    id
}

fn create_post(pool: &db::DbPool, user_id: &str, body: &str, created_at: &str) -> String {
    let conn = pool.get().unwrap();
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO posts (id, user_id, body, created_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![id, user_id, body, created_at],
    )
    .unwrap();
    id
}

fn notification_count(pool: &db::DbPool, user_id: &str, kind: &str) -> i64 {
    let conn = pool.get().unwrap();
    conn.query_row(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND kind = ?2",
        rusqlite::params![user_id, kind],
        |row| row.get(0),
    )
    .unwrap()
}

#[test]
fn friendship_flow_controls_feed_visibility() {
    let (_tmp, pool) = test_db();
    let alice = create_user(&pool, "alice");
    let bob = create_user(&pool, "bob");
    create_post(&pool, &alice, "hello from alice", "2026-01-01 10:00:00");

    let conn = pool.get().unwrap();

    // Not friends yet: bob sees only his own posts, i.e. nothing
    let page = feed::home_feed(&conn, Some(bob.as_str()), 1).unwrap();
    assert!(page.items.is_empty(), "feed should be empty before friendship");

    // Request and accept
    social::add_friend(&conn, &alice, &bob).unwrap();
    assert_eq!(notification_count(&pool, &bob, "friend_request"), 1);

    social::accept_friend(&conn, &bob, &alice).unwrap();
    assert_eq!(notification_count(&pool, &alice, "friend_accepted"), 1);

    // Accepted: alice's post shows up for bob
    let page = feed::home_feed(&conn, Some(bob.as_str()), 1).unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].post().body, "hello from alice");

    // Duplicate request in either direction is rejected
    assert!(social::add_friend(&conn, &bob, &alice).is_err());
    assert!(social::add_friend(&conn, &alice, &bob).is_err());
}

#[test]
fn rejected_request_can_be_sent_again() {
    let (_tmp, pool) = test_db();
    let alice = create_user(&pool, "alice");
    let bob = create_user(&pool, "bob");

    let conn = pool.get().unwrap();
    social::add_friend(&conn, &alice, &bob).unwrap();
    social::reject_friend(&conn, &bob, &alice).unwrap();
    assert_eq!(notification_count(&pool, &alice, "friend_rejected"), 1);

    // The rejected row is gone, so a fresh request is allowed
    social::add_friend(&conn, &alice, &bob).unwrap();
    social::accept_friend(&conn, &bob, &alice).unwrap();

    let friendship = social::friendship_between(&conn, &alice, &bob)
        .unwrap()
        .expect("friendship row should exist");
    assert_eq!(friendship.status, "accepted");
}

#[test]
fn share_appears_in_feed_at_share_time() {
    let (_tmp, pool) = test_db();
    let alice = create_user(&pool, "alice");
    let bob = create_user(&pool, "bob");
    let carol = create_user(&pool, "carol");

    let conn = pool.get().unwrap();
    social::add_friend(&conn, &alice, &carol).unwrap();
    social::accept_friend(&conn, &carol, &alice).unwrap();
    social::add_friend(&conn, &bob, &carol).unwrap();
    social::accept_friend(&conn, &carol, &bob).unwrap();

    // Alice posts early; bob shares it later. Bob and carol are friends,
    // alice and carol are friends, but alice and bob are not.
    let post_id = create_post(&pool, &alice, "original", "2026-01-01 10:00:00");
    create_post(&pool, &carol, "carol's own post", "2026-01-02 10:00:00");
    social::toggle_share(&conn, &bob, &post_id, Some("look at this")).unwrap();

    let page = feed::home_feed(&conn, Some(carol.as_str()), 1).unwrap();
    assert_eq!(page.items.len(), 3);

    // The share is newest (share time, not post time) and carries commentary
    match &page.items[0] {
        feed::FeedEntry::Shared { post, .. } => {
            assert_eq!(post.id, post_id);
            assert_eq!(page.items[0].effective_body(), "look at this");
        }
        other => panic!("expected a shared entry first, got {:?}", other),
    }
    assert_eq!(page.items[1].post().body, "carol's own post");
    assert_eq!(page.items[2].post().body, "original");
}

#[test]
fn unlike_retracts_the_notification() {
    let (_tmp, pool) = test_db();
    let alice = create_user(&pool, "alice");
    let bob = create_user(&pool, "bob");
    let post_id = create_post(&pool, &alice, "post", "2026-01-01 10:00:00");

    let conn = pool.get().unwrap();
    let outcome = social::toggle_like(&conn, &bob, &post_id).unwrap();
    assert!(outcome.liked);
    assert_eq!(notification_count(&pool, &alice, "like"), 1);

    let outcome = social::toggle_like(&conn, &bob, &post_id).unwrap();
    assert!(!outcome.liked);
    assert_eq!(outcome.like_count, 0);
    assert_eq!(notification_count(&pool, &alice, "like"), 0);
}

#[test]
fn feed_paginates_five_per_page() {
    let (_tmp, pool) = test_db();
    let alice = create_user(&pool, "alice");
    for i in 0..7 {
        create_post(
            &pool,
            &alice,
            &format!("post {}", i),
            &format!("2026-01-01 10:00:0{}", i),
        );
    }

    let conn = pool.get().unwrap();
    let first = feed::profile_feed(&conn, &alice, 1).unwrap();
    assert_eq!(first.items.len(), 5);
    assert_eq!(first.pages, 2);
    assert!(!first.has_prev);
    assert!(first.has_next);
    assert_eq!(first.items[0].post().body, "post 6");

    let second = feed::profile_feed(&conn, &alice, 2).unwrap();
    assert_eq!(second.items.len(), 2);
    assert!(second.has_prev);
    assert!(!second.has_next);
    assert_eq!(second.items[1].post().body, "post 0");
}

#[test]
fn password_and_session_round_trip() {
    let (_tmp, pool) = test_db();
    let alice = create_user(&pool, "alice");

    let hash = password::hash_password("s3cret").unwrap();
    assert!(password::verify_password("s3cret", &hash));
    assert!(!password::verify_password("wrong", &hash));

    let token = session::create_session(&pool, &alice, 24).unwrap();
    let conn = pool.get().unwrap();
    let found: String = conn
        .query_row(
            "SELECT u.username FROM sessions s JOIN users u ON u.id = s.user_id
             WHERE s.token = ?1 AND s.expires_at > datetime('now')",
            rusqlite::params![token],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(found, "alice");

    session::delete_session(&pool, &token).unwrap();
    let remaining: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sessions WHERE token = ?1",
            rusqlite::params![token],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(remaining, 0);
}
