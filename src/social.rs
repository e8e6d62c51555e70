//! Social-interaction service: likes, shares, comments, reactions,
//! friendships, messages, and the notifications they emit.
//!
//! Every function takes an explicit connection and acting user id; nothing
//! here reads ambient state. Interactions that notify another user record
//! the actor, kind, and subject on the notification row, so undoing the
//! interaction can retract exactly that notification.

use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{Friendship, FriendshipStatus, NotificationKind, ReactionKind};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareOutcome {
    pub shared: bool,
    pub share_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionAction {
    Added,
    Removed,
}

impl ReactionAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionAction::Added => "added",
            ReactionAction::Removed => "removed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReactionOutcome {
    pub action: ReactionAction,
    pub counts: BTreeMap<&'static str, i64>,
}

fn new_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

fn user_name(conn: &Connection, user_id: &str) -> AppResult<String> {
    conn.query_row(
        "SELECT COALESCE(display_name, username) FROM users WHERE id = ?1",
        params![user_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

fn post_author(conn: &Connection, post_id: &str) -> AppResult<String> {
    conn.query_row(
        "SELECT user_id FROM posts WHERE id = ?1",
        params![post_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

fn user_exists(conn: &Connection, user_id: &str) -> AppResult<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE id = ?1",
        params![user_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn notify(
    conn: &Connection,
    recipient: &str,
    actor: &str,
    kind: NotificationKind,
    post_id: Option<&str>,
    comment_id: Option<&str>,
    body: &str,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO notifications (id, user_id, actor_id, kind, post_id, comment_id, body)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![new_id(), recipient, actor, kind.as_str(), post_id, comment_id, body],
    )?;
    Ok(())
}

/// Delete the notification produced by a specific interaction, matched by
/// its identity, not by body text.
fn retract_notification(
    conn: &Connection,
    recipient: &str,
    actor: &str,
    kind: NotificationKind,
    post_id: Option<&str>,
    comment_id: Option<&str>,
) -> AppResult<()> {
    conn.execute(
        "DELETE FROM notifications
         WHERE user_id = ?1 AND actor_id = ?2 AND kind = ?3
           AND post_id IS ?4 AND comment_id IS ?5",
        params![recipient, actor, kind.as_str(), post_id, comment_id],
    )?;
    Ok(())
}

pub fn like_count(conn: &Connection, post_id: &str) -> AppResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM post_likes WHERE post_id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn share_count(conn: &Connection, post_id: &str) -> AppResult<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM post_shares WHERE post_id = ?1",
        params![post_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Like a post, or undo an existing like. Notifies the author on like
/// (unless self-liking) and retracts that notification on unlike.
pub fn toggle_like(conn: &Connection, actor: &str, post_id: &str) -> AppResult<LikeOutcome> {
    let author = post_author(conn, post_id)?;

    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM post_likes WHERE user_id = ?1 AND post_id = ?2",
            params![actor, post_id],
            |row| row.get(0),
        )
        .optional()?;

    let liked = match existing {
        Some(like_id) => {
            conn.execute("DELETE FROM post_likes WHERE id = ?1", params![like_id])?;
            retract_notification(conn, &author, actor, NotificationKind::Like, Some(post_id), None)?;
            false
        }
        None => {
            conn.execute(
                "INSERT INTO post_likes (id, post_id, user_id) VALUES (?1, ?2, ?3)",
                params![new_id(), post_id, actor],
            )?;
            if author != actor {
                let body = format!("{} liked your post", user_name(conn, actor)?);
                notify(conn, &author, actor, NotificationKind::Like, Some(post_id), None, &body)?;
            }
            true
        }
    };

    Ok(LikeOutcome {
        liked,
        like_count: like_count(conn, post_id)?,
    })
}

/// Share a post (optionally with commentary), or undo an existing share.
pub fn toggle_share(
    conn: &Connection,
    actor: &str,
    post_id: &str,
    body: Option<&str>,
) -> AppResult<ShareOutcome> {
    let author = post_author(conn, post_id)?;

    let existing: Option<String> = conn
        .query_row(
            "SELECT id FROM post_shares WHERE user_id = ?1 AND post_id = ?2",
            params![actor, post_id],
            |row| row.get(0),
        )
        .optional()?;

    let shared = match existing {
        Some(share_id) => {
            conn.execute("DELETE FROM post_shares WHERE id = ?1", params![share_id])?;
            retract_notification(conn, &author, actor, NotificationKind::Share, Some(post_id), None)?;
            false
        }
        None => {
            conn.execute(
                "INSERT INTO post_shares (id, post_id, user_id, body) VALUES (?1, ?2, ?3, ?4)",
                params![new_id(), post_id, actor, body],
            )?;
            if author != actor {
                let text = format!("{} shared your post", user_name(conn, actor)?);
                notify(conn, &author, actor, NotificationKind::Share, Some(post_id), None, &text)?;
            }
            true
        }
    };

    Ok(ShareOutcome {
        shared,
        share_count: share_count(conn, post_id)?,
    })
}

/// Add a comment (or a reply when `parent_id` is given). Returns the new
/// comment id. Notifies the post author, or the parent comment's author
/// for replies.
pub fn add_comment(
    conn: &Connection,
    actor: &str,
    post_id: &str,
    body: &str,
    parent_id: Option<&str>,
) -> AppResult<String> {
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("Comment content is required".into()));
    }

    let post_author_id = post_author(conn, post_id)?;

    let notify_target = match parent_id {
        Some(parent) => {
            let parent_author: Option<String> = conn
                .query_row(
                    "SELECT user_id FROM comments WHERE id = ?1 AND post_id = ?2",
                    params![parent, post_id],
                    |row| row.get(0),
                )
                .optional()?;
            parent_author.ok_or(AppError::NotFound)?
        }
        None => post_author_id,
    };

    let comment_id = new_id();
    conn.execute(
        "INSERT INTO comments (id, post_id, user_id, parent_id, body) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![comment_id, post_id, actor, parent_id, body],
    )?;

    if notify_target != actor {
        let (kind, text) = if parent_id.is_some() {
            (
                NotificationKind::CommentReply,
                format!("{} replied to your comment", user_name(conn, actor)?),
            )
        } else {
            (
                NotificationKind::Comment,
                format!("{} commented on your post", user_name(conn, actor)?),
            )
        };
        notify(conn, &notify_target, actor, kind, Some(post_id), Some(&comment_id), &text)?;
    }

    Ok(comment_id)
}

/// Per-kind reaction counts for a comment, with zeros for absent kinds.
pub fn reaction_counts(
    conn: &Connection,
    comment_id: &str,
) -> AppResult<BTreeMap<&'static str, i64>> {
    let mut counts: BTreeMap<&'static str, i64> =
        ReactionKind::ALL.iter().map(|k| (k.as_str(), 0)).collect();

    let mut stmt =
        conn.prepare("SELECT kind, COUNT(*) FROM comment_reactions WHERE comment_id = ?1 GROUP BY kind")?;
    let rows = stmt
        .query_map(params![comment_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (kind, count) in rows {
        if let Some(k) = ReactionKind::parse(&kind) {
            counts.insert(k.as_str(), count);
        }
    }
    Ok(counts)
}

/// React to a comment. Same kind again removes the reaction; a different
/// kind replaces it — a user never holds two reactions on one comment.
pub fn toggle_reaction(
    conn: &Connection,
    actor: &str,
    comment_id: &str,
    kind: ReactionKind,
) -> AppResult<ReactionOutcome> {
    let comment_author: Option<String> = conn
        .query_row(
            "SELECT user_id FROM comments WHERE id = ?1",
            params![comment_id],
            |row| row.get(0),
        )
        .optional()?;
    let comment_author = comment_author.ok_or(AppError::NotFound)?;

    let existing: Option<(String, String)> = conn
        .query_row(
            "SELECT id, kind FROM comment_reactions WHERE user_id = ?1 AND comment_id = ?2",
            params![actor, comment_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let action = match existing {
        Some((reaction_id, existing_kind)) if existing_kind == kind.as_str() => {
            conn.execute("DELETE FROM comment_reactions WHERE id = ?1", params![reaction_id])?;
            retract_notification(
                conn,
                &comment_author,
                actor,
                NotificationKind::CommentReaction,
                None,
                Some(comment_id),
            )?;
            ReactionAction::Removed
        }
        Some((reaction_id, _)) => {
            // Replace, never stack. The existing notification stays valid.
            conn.execute("DELETE FROM comment_reactions WHERE id = ?1", params![reaction_id])?;
            conn.execute(
                "INSERT INTO comment_reactions (id, comment_id, user_id, kind) VALUES (?1, ?2, ?3, ?4)",
                params![new_id(), comment_id, actor, kind.as_str()],
            )?;
            ReactionAction::Added
        }
        None => {
            conn.execute(
                "INSERT INTO comment_reactions (id, comment_id, user_id, kind) VALUES (?1, ?2, ?3, ?4)",
                params![new_id(), comment_id, actor, kind.as_str()],
            )?;
            if comment_author != actor {
                let body = format!("{} reacted to your comment", user_name(conn, actor)?);
                notify(
                    conn,
                    &comment_author,
                    actor,
                    NotificationKind::CommentReaction,
                    None,
                    Some(comment_id),
                    &body,
                )?;
            }
            ReactionAction::Added
        }
    };

    Ok(ReactionOutcome {
        action,
        counts: reaction_counts(conn, comment_id)?,
    })
}

/// The friendship row between two users, in either direction.
pub fn friendship_between(
    conn: &Connection,
    a: &str,
    b: &str,
) -> AppResult<Option<Friendship>> {
    let row = conn
        .query_row(
            "SELECT id, user_id, friend_id, status, created_at FROM friendships
             WHERE (user_id = ?1 AND friend_id = ?2) OR (user_id = ?2 AND friend_id = ?1)",
            params![a, b],
            |row| {
                Ok(Friendship {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    friend_id: row.get(2)?,
                    status: row.get(3)?,
                    created_at: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// Send a friend request. A row between the pair in any state is a
/// conflict.
pub fn add_friend(conn: &Connection, actor: &str, other: &str) -> AppResult<()> {
    if !user_exists(conn, other)? {
        return Err(AppError::NotFound);
    }
    if actor == other {
        return Err(AppError::BadRequest("Cannot befriend yourself".into()));
    }
    if friendship_between(conn, actor, other)?.is_some() {
        return Err(AppError::BadRequest(
            "Friendship request already sent or exists".into(),
        ));
    }

    conn.execute(
        "INSERT INTO friendships (id, user_id, friend_id, status) VALUES (?1, ?2, ?3, ?4)",
        params![new_id(), actor, other, FriendshipStatus::Pending.as_str()],
    )?;

    let body = format!("{} wants to be your friend", user_name(conn, actor)?);
    notify(conn, other, actor, NotificationKind::FriendRequest, None, None, &body)?;
    Ok(())
}

/// A pending request aimed at `actor`, or 404.
fn pending_request(conn: &Connection, actor: &str, requester: &str) -> AppResult<String> {
    conn.query_row(
        "SELECT id FROM friendships
         WHERE user_id = ?1 AND friend_id = ?2 AND status = ?3",
        params![requester, actor, FriendshipStatus::Pending.as_str()],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(AppError::NotFound)
}

/// Accept a pending friend request. Only the recipient can accept.
pub fn accept_friend(conn: &Connection, actor: &str, requester: &str) -> AppResult<()> {
    let friendship_id = pending_request(conn, actor, requester)?;
    conn.execute(
        "UPDATE friendships SET status = ?1 WHERE id = ?2",
        params![FriendshipStatus::Accepted.as_str(), friendship_id],
    )?;

    let body = format!("{} accepted your friend request", user_name(conn, actor)?);
    notify(conn, requester, actor, NotificationKind::FriendAccepted, None, None, &body)?;
    Ok(())
}

/// Reject a pending friend request. The row is deleted; no rejected state
/// persists, so a new request can be sent later.
pub fn reject_friend(conn: &Connection, actor: &str, requester: &str) -> AppResult<()> {
    let friendship_id = pending_request(conn, actor, requester)?;
    conn.execute("DELETE FROM friendships WHERE id = ?1", params![friendship_id])?;

    let body = format!("{} rejected your friend request", user_name(conn, actor)?);
    notify(conn, requester, actor, NotificationKind::FriendRejected, None, None, &body)?;
    Ok(())
}

/// Send a direct message. The recipient is always notified.
pub fn send_message(
    conn: &Connection,
    actor: &str,
    recipient: &str,
    body: &str,
) -> AppResult<String> {
    if body.trim().is_empty() {
        return Err(AppError::BadRequest("Message content is required".into()));
    }
    if !user_exists(conn, recipient)? {
        return Err(AppError::NotFound);
    }

    let message_id = new_id();
    conn.execute(
        "INSERT INTO messages (id, sender_id, recipient_id, body) VALUES (?1, ?2, ?3, ?4)",
        params![message_id, actor, recipient, body],
    )?;

    let text = format!("{} sent you a message", user_name(conn, actor)?);
    notify(conn, recipient, actor, NotificationKind::Message, None, None, &text)?;
    Ok(message_id)
}

/// Mark everything the actor has received from `partner` as read. Returns
/// how many messages were newly marked.
pub fn mark_conversation_read(
    conn: &Connection,
    actor: &str,
    partner: &str,
) -> AppResult<usize> {
    let marked = conn.execute(
        "UPDATE messages SET is_read = 1
         WHERE sender_id = ?1 AND recipient_id = ?2 AND is_read = 0",
        params![partner, actor],
    )?;
    Ok(marked)
}

/// Mark all of a user's notifications as read. Returns how many were
/// newly marked.
pub fn mark_notifications_read(conn: &Connection, user_id: &str) -> AppResult<usize> {
    let marked = conn.execute(
        "UPDATE notifications SET is_read = 1 WHERE user_id = ?1 AND is_read = 0",
        params![user_id],
    )?;
    Ok(marked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::{insert_post, insert_user, test_pool};
    use crate::state::DbPool;

    fn setup() -> (DbPool, String, String, String) {
        let pool = test_pool();
        let alice = insert_user(&pool, "alice");
        let bob = insert_user(&pool, "bob");
        let post = insert_post(&pool, &bob, "bob's post", "2026-01-01 10:00:00");
        (pool, alice, bob, post)
    }

    fn notification_count(conn: &Connection, user: &str, kind: &str) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND kind = ?2",
            params![user, kind],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn like_toggle_is_idempotent_over_two_applications() {
        let (pool, alice, bob, post) = setup();
        let conn = pool.get().unwrap();

        let first = toggle_like(&conn, &alice, &post).unwrap();
        assert!(first.liked);
        assert_eq!(first.like_count, 1);
        assert_eq!(notification_count(&conn, &bob, "like"), 1);

        let second = toggle_like(&conn, &alice, &post).unwrap();
        assert!(!second.liked);
        assert_eq!(second.like_count, 0);
        assert_eq!(notification_count(&conn, &bob, "like"), 0);
    }

    #[test]
    fn liking_own_post_creates_no_notification() {
        let (pool, _alice, bob, post) = setup();
        let conn = pool.get().unwrap();

        let outcome = toggle_like(&conn, &bob, &post).unwrap();
        assert!(outcome.liked);
        assert_eq!(notification_count(&conn, &bob, "like"), 0);
    }

    #[test]
    fn unlike_retracts_only_the_matching_notification() {
        let (pool, alice, bob, post) = setup();
        let carol = insert_user(&pool, "carol");
        let conn = pool.get().unwrap();

        toggle_like(&conn, &alice, &post).unwrap();
        toggle_like(&conn, &carol, &post).unwrap();
        assert_eq!(notification_count(&conn, &bob, "like"), 2);

        // Alice unlikes; carol's notification must survive.
        toggle_like(&conn, &alice, &post).unwrap();
        assert_eq!(notification_count(&conn, &bob, "like"), 1);
        let remaining_actor: String = conn
            .query_row(
                "SELECT actor_id FROM notifications WHERE user_id = ?1 AND kind = 'like'",
                params![bob],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining_actor, carol);
    }

    #[test]
    fn like_on_missing_post_is_not_found() {
        let (pool, alice, _bob, _post) = setup();
        let conn = pool.get().unwrap();
        let err = toggle_like(&conn, &alice, "no-such-post").unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[test]
    fn share_toggle_round_trip() {
        let (pool, alice, bob, post) = setup();
        let conn = pool.get().unwrap();

        let first = toggle_share(&conn, &alice, &post, Some("look at this")).unwrap();
        assert!(first.shared);
        assert_eq!(first.share_count, 1);
        assert_eq!(notification_count(&conn, &bob, "share"), 1);

        let second = toggle_share(&conn, &alice, &post, None).unwrap();
        assert!(!second.shared);
        assert_eq!(second.share_count, 0);
        assert_eq!(notification_count(&conn, &bob, "share"), 0);
    }

    #[test]
    fn comment_notifies_post_author() {
        let (pool, alice, bob, post) = setup();
        let conn = pool.get().unwrap();

        add_comment(&conn, &alice, &post, "nice one", None).unwrap();
        assert_eq!(notification_count(&conn, &bob, "comment"), 1);
    }

    #[test]
    fn reply_notifies_parent_comment_author() {
        let (pool, alice, bob, post) = setup();
        let conn = pool.get().unwrap();

        let parent = add_comment(&conn, &alice, &post, "nice one", None).unwrap();
        add_comment(&conn, &bob, &post, "thanks!", Some(&parent)).unwrap();

        assert_eq!(notification_count(&conn, &alice, "comment_reply"), 1);
        // Bob replying on his own post must not notify himself as author.
        assert_eq!(notification_count(&conn, &bob, "comment"), 1);
    }

    #[test]
    fn empty_comment_is_rejected() {
        let (pool, alice, _bob, post) = setup();
        let conn = pool.get().unwrap();
        let err = add_comment(&conn, &alice, &post, "   ", None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn same_reaction_twice_removes_it() {
        let (pool, alice, bob, post) = setup();
        let conn = pool.get().unwrap();
        let comment = add_comment(&conn, &bob, &post, "a comment", None).unwrap();

        let first = toggle_reaction(&conn, &alice, &comment, ReactionKind::Heart).unwrap();
        assert_eq!(first.action, ReactionAction::Added);
        assert_eq!(first.counts["heart"], 1);
        assert_eq!(notification_count(&conn, &bob, "comment_reaction"), 1);

        let second = toggle_reaction(&conn, &alice, &comment, ReactionKind::Heart).unwrap();
        assert_eq!(second.action, ReactionAction::Removed);
        assert_eq!(second.counts["heart"], 0);
        assert_eq!(notification_count(&conn, &bob, "comment_reaction"), 0);
    }

    #[test]
    fn different_reaction_replaces_not_duplicates() {
        let (pool, alice, bob, post) = setup();
        let conn = pool.get().unwrap();
        let comment = add_comment(&conn, &bob, &post, "a comment", None).unwrap();

        toggle_reaction(&conn, &alice, &comment, ReactionKind::Heart).unwrap();
        let outcome = toggle_reaction(&conn, &alice, &comment, ReactionKind::Wow).unwrap();
        assert_eq!(outcome.action, ReactionAction::Added);
        assert_eq!(outcome.counts["heart"], 0);
        assert_eq!(outcome.counts["wow"], 1);

        let total: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM comment_reactions WHERE comment_id = ?1",
                params![comment],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn friend_request_lifecycle_accept() {
        let (pool, alice, bob, _post) = setup();
        let conn = pool.get().unwrap();

        add_friend(&conn, &alice, &bob).unwrap();
        assert_eq!(notification_count(&conn, &bob, "friend_request"), 1);

        accept_friend(&conn, &bob, &alice).unwrap();
        assert_eq!(notification_count(&conn, &alice, "friend_accepted"), 1);

        let friendship = friendship_between(&conn, &alice, &bob).unwrap().unwrap();
        assert_eq!(friendship.status, "accepted");
    }

    #[test]
    fn friend_request_lifecycle_reject_deletes_row() {
        let (pool, alice, bob, _post) = setup();
        let conn = pool.get().unwrap();

        add_friend(&conn, &alice, &bob).unwrap();
        reject_friend(&conn, &bob, &alice).unwrap();

        assert!(friendship_between(&conn, &alice, &bob).unwrap().is_none());
        assert_eq!(notification_count(&conn, &alice, "friend_rejected"), 1);

        // Rejection leaves no terminal state: a new request is allowed.
        add_friend(&conn, &alice, &bob).unwrap();
    }

    #[test]
    fn duplicate_friend_request_conflicts_in_both_directions() {
        let (pool, alice, bob, _post) = setup();
        let conn = pool.get().unwrap();

        add_friend(&conn, &alice, &bob).unwrap();
        assert!(matches!(
            add_friend(&conn, &alice, &bob).unwrap_err(),
            AppError::BadRequest(_)
        ));
        assert!(matches!(
            add_friend(&conn, &bob, &alice).unwrap_err(),
            AppError::BadRequest(_)
        ));
    }

    #[test]
    fn accept_without_pending_request_is_not_found() {
        let (pool, alice, bob, _post) = setup();
        let conn = pool.get().unwrap();

        assert!(matches!(
            accept_friend(&conn, &bob, &alice).unwrap_err(),
            AppError::NotFound
        ));

        // The requester cannot accept their own request.
        add_friend(&conn, &alice, &bob).unwrap();
        assert!(matches!(
            accept_friend(&conn, &alice, &bob).unwrap_err(),
            AppError::NotFound
        ));
    }

    #[test]
    fn self_friend_request_is_rejected() {
        let (pool, alice, _bob, _post) = setup();
        let conn = pool.get().unwrap();
        assert!(matches!(
            add_friend(&conn, &alice, &alice).unwrap_err(),
            AppError::BadRequest(_)
        ));
    }

    #[test]
    fn opening_a_conversation_marks_only_received_messages_read() {
        let (pool, alice, bob, _post) = setup();
        let carol = insert_user(&pool, "carol");
        let conn = pool.get().unwrap();

        send_message(&conn, &alice, &bob, "one").unwrap();
        send_message(&conn, &alice, &bob, "two").unwrap();
        send_message(&conn, &bob, &alice, "reply").unwrap();
        send_message(&conn, &carol, &bob, "other thread").unwrap();

        let marked = mark_conversation_read(&conn, &bob, &alice).unwrap();
        assert_eq!(marked, 2);

        // Carol's thread with bob stays unread, as does alice's inbox.
        let unread_for_bob: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM messages WHERE recipient_id = ?1 AND is_read = 0",
                params![bob],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(unread_for_bob, 1);
        let unread_for_alice: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM messages WHERE recipient_id = ?1 AND is_read = 0",
                params![alice],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(unread_for_alice, 1);

        // A second view finds nothing left to mark.
        assert_eq!(mark_conversation_read(&conn, &bob, &alice).unwrap(), 0);
    }

    #[test]
    fn viewing_notifications_marks_them_all_read() {
        let (pool, alice, bob, post) = setup();
        let conn = pool.get().unwrap();

        toggle_like(&conn, &alice, &post).unwrap();
        add_comment(&conn, &alice, &post, "nice", None).unwrap();
        add_friend(&conn, &bob, &alice).unwrap();

        let unread = |user: &str| -> i64 {
            conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE user_id = ?1 AND is_read = 0",
                params![user],
                |row| row.get(0),
            )
            .unwrap()
        };
        assert_eq!(unread(&bob), 2);
        assert_eq!(unread(&alice), 1);

        assert_eq!(mark_notifications_read(&conn, &bob).unwrap(), 2);
        assert_eq!(unread(&bob), 0);
        // Alice's friend-request notification is untouched.
        assert_eq!(unread(&alice), 1);

        assert_eq!(mark_notifications_read(&conn, &bob).unwrap(), 0);
    }

    #[test]
    fn message_notifies_recipient() {
        let (pool, alice, bob, _post) = setup();
        let conn = pool.get().unwrap();

        send_message(&conn, &alice, &bob, "hello there").unwrap();
        assert_eq!(notification_count(&conn, &bob, "message"), 1);

        let unread: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM messages WHERE recipient_id = ?1 AND is_read = 0",
                params![bob],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(unread, 1);
    }
}
