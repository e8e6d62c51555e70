use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Friendship {
    pub id: String,
    pub user_id: String,
    pub friend_id: String,
    pub status: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendshipStatus {
    Pending,
    Accepted,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "pending",
            FriendshipStatus::Accepted => "accepted",
        }
    }
}

/// The fixed set of emotive responses a user can attach to a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
    Heart,
    Wow,
    Angry,
    Hahaha,
    Sad,
}

impl ReactionKind {
    pub const ALL: [ReactionKind; 5] = [
        ReactionKind::Heart,
        ReactionKind::Wow,
        ReactionKind::Angry,
        ReactionKind::Hahaha,
        ReactionKind::Sad,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionKind::Heart => "heart",
            ReactionKind::Wow => "wow",
            ReactionKind::Angry => "angry",
            ReactionKind::Hahaha => "hahaha",
            ReactionKind::Sad => "sad",
        }
    }

    pub fn parse(s: &str) -> Option<ReactionKind> {
        match s {
            "heart" => Some(ReactionKind::Heart),
            "wow" => Some(ReactionKind::Wow),
            "angry" => Some(ReactionKind::Angry),
            "hahaha" => Some(ReactionKind::Hahaha),
            "sad" => Some(ReactionKind::Sad),
            _ => None,
        }
    }
}

/// What kind of interaction produced a notification. Together with the actor
/// and the subject row this identifies the notification for retraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Like,
    Share,
    Comment,
    CommentReply,
    CommentReaction,
    FriendRequest,
    FriendAccepted,
    FriendRejected,
    Message,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Share => "share",
            NotificationKind::Comment => "comment",
            NotificationKind::CommentReply => "comment_reply",
            NotificationKind::CommentReaction => "comment_reaction",
            NotificationKind::FriendRequest => "friend_request",
            NotificationKind::FriendAccepted => "friend_accepted",
            NotificationKind::FriendRejected => "friend_rejected",
            NotificationKind::Message => "message",
        }
    }
}
