//! Feed aggregation: merges original posts and shared posts into one
//! timeline, sorted by effective timestamp and paginated in memory.
//!
//! Pagination runs over the fully materialized list, so cost is O(total
//! visible posts) per request. Fine at the data volumes this app serves.

use rusqlite::{params, params_from_iter, Connection};
use serde::Serialize;

use crate::error::AppResult;

pub const PER_PAGE: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct MediaView {
    pub file_path: String,
    pub media_type: String,
}

/// A post as rendered in a feed, with author info and counts resolved.
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: String,
    pub author_id: String,
    pub author_username: String,
    pub author_name: String,
    pub body: String,
    pub created_at: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub share_count: i64,
    pub media: Vec<MediaView>,
}

/// One timeline entry: either an original post or somebody's share of one.
/// A share overrides the displayed body (when it has commentary) and the
/// timestamp (the share time, not the original post time).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeedEntry {
    Original(PostView),
    Shared {
        share_id: String,
        sharer_id: String,
        sharer_username: String,
        sharer_name: String,
        body: Option<String>,
        shared_at: String,
        post: PostView,
    },
}

impl FeedEntry {
    pub fn post(&self) -> &PostView {
        match self {
            FeedEntry::Original(post) => post,
            FeedEntry::Shared { post, .. } => post,
        }
    }

    /// Share commentary when present and non-empty, else the post body.
    pub fn effective_body(&self) -> &str {
        match self {
            FeedEntry::Original(post) => &post.body,
            FeedEntry::Shared { body, post, .. } => match body.as_deref() {
                Some(b) if !b.is_empty() => b,
                _ => &post.body,
            },
        }
    }

    /// Share time for shares, post time otherwise.
    pub fn effective_timestamp(&self) -> &str {
        match self {
            FeedEntry::Original(post) => &post.created_at,
            FeedEntry::Shared { shared_at, .. } => shared_at,
        }
    }

    /// Tiebreaker for entries with identical timestamps.
    fn sort_id(&self) -> &str {
        match self {
            FeedEntry::Original(post) => &post.id,
            FeedEntry::Shared { share_id, .. } => share_id,
        }
    }
}

/// Offset/limit pagination over an in-memory list.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub pages: usize,
    pub total: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_num: Option<usize>,
    pub next_num: Option<usize>,
}

impl<T> Page<T> {
    pub fn paginate(all: Vec<T>, page: usize, per_page: usize) -> Page<T> {
        let page = page.max(1);
        let total = all.len();
        let pages = total.div_ceil(per_page);
        let has_prev = page > 1;
        let has_next = page < pages;

        let start = (page - 1) * per_page;
        let items: Vec<T> = all
            .into_iter()
            .skip(start)
            .take(per_page)
            .collect();

        Page {
            items,
            page,
            pages,
            total,
            has_prev,
            has_next,
            prev_num: has_prev.then(|| page - 1),
            next_num: has_next.then(|| page + 1),
        }
    }
}

/// IDs of users with an accepted friendship with `user_id`, in either
/// direction.
pub fn friend_ids(conn: &Connection, user_id: &str) -> AppResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT user_id, friend_id FROM friendships
         WHERE status = 'accepted' AND (user_id = ?1 OR friend_id = ?1)",
    )?;
    let ids = stmt
        .query_map(params![user_id], |row| {
            let a: String = row.get(0)?;
            let b: String = row.get(1)?;
            Ok(if a == user_id { b } else { a })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

/// Home feed. Anonymous viewers see every original post and no shares;
/// authenticated viewers see original and shared posts from accepted
/// friends and themselves.
pub fn home_feed(
    conn: &Connection,
    viewer: Option<&str>,
    page: usize,
) -> AppResult<Page<FeedEntry>> {
    let mut entries = match viewer {
        None => load_posts(conn, None)?,
        Some(user_id) => {
            let mut authors = friend_ids(conn, user_id)?;
            authors.push(user_id.to_string());

            let mut entries = load_posts(conn, Some(&authors))?;
            entries.extend(load_shares(conn, &authors)?);
            entries
        }
    };

    sort_entries(&mut entries);
    Ok(Page::paginate(entries, page, PER_PAGE))
}

/// Profile feed: the same merge, restricted to one user's original and
/// shared posts.
pub fn profile_feed(conn: &Connection, user_id: &str, page: usize) -> AppResult<Page<FeedEntry>> {
    let authors = vec![user_id.to_string()];
    let mut entries = load_posts(conn, Some(&authors))?;
    entries.extend(load_shares(conn, &authors)?);

    sort_entries(&mut entries);
    Ok(Page::paginate(entries, page, PER_PAGE))
}

/// Load a single post as a view, if it exists.
pub fn post_view(conn: &Connection, post_id: &str) -> AppResult<Option<PostView>> {
    let mut stmt = conn.prepare(&format!("{} WHERE p.id = ?1", POST_SELECT))?;
    let mut rows = stmt
        .query_map(params![post_id], map_post_row)?
        .collect::<Result<Vec<_>, _>>()?;
    match rows.pop() {
        Some(mut post) => {
            post.media = post_media(conn, &post.id)?;
            Ok(Some(post))
        }
        None => Ok(None),
    }
}

fn sort_entries(entries: &mut [FeedEntry]) {
    // Newest first; ties broken by id so the order is deterministic.
    entries.sort_by(|a, b| {
        b.effective_timestamp()
            .cmp(a.effective_timestamp())
            .then_with(|| b.sort_id().cmp(a.sort_id()))
    });
}

const POST_SELECT: &str = "SELECT p.id, p.user_id, u.username, \
     COALESCE(u.display_name, u.username), p.body, p.created_at, \
     (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id), \
     (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id), \
     (SELECT COUNT(*) FROM post_shares s WHERE s.post_id = p.id) \
     FROM posts p JOIN users u ON u.id = p.user_id";

fn map_post_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostView> {
    Ok(PostView {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row.get(2)?,
        author_name: row.get(3)?,
        body: row.get(4)?,
        created_at: row.get(5)?,
        like_count: row.get(6)?,
        comment_count: row.get(7)?,
        share_count: row.get(8)?,
        media: Vec::new(),
    })
}

fn post_media(conn: &Connection, post_id: &str) -> AppResult<Vec<MediaView>> {
    let mut stmt = conn
        .prepare("SELECT file_path, media_type FROM media WHERE post_id = ?1 ORDER BY created_at")?;
    let media = stmt
        .query_map(params![post_id], |row| {
            Ok(MediaView {
                file_path: row.get(0)?,
                media_type: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(media)
}

fn placeholders(n: usize) -> String {
    std::iter::repeat("?")
        .take(n)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Original posts, optionally restricted to a set of authors.
fn load_posts(conn: &Connection, authors: Option<&[String]>) -> AppResult<Vec<FeedEntry>> {
    let mut posts = match authors {
        None => {
            let mut stmt = conn.prepare(POST_SELECT)?;
            let rows = stmt
                .query_map([], map_post_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        Some(ids) if ids.is_empty() => Vec::new(),
        Some(ids) => {
            let sql = format!("{} WHERE p.user_id IN ({})", POST_SELECT, placeholders(ids.len()));
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter()), map_post_row)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };

    for post in &mut posts {
        post.media = post_media(conn, &post.id)?;
    }

    Ok(posts.into_iter().map(FeedEntry::Original).collect())
}

/// Shares by the given users, each materialized as a feed entry wrapping
/// the underlying post.
fn load_shares(conn: &Connection, sharers: &[String]) -> AppResult<Vec<FeedEntry>> {
    if sharers.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        "SELECT s.id, s.user_id, su.username, COALESCE(su.display_name, su.username), \
         s.body, s.created_at, \
         p.id, p.user_id, u.username, COALESCE(u.display_name, u.username), p.body, p.created_at, \
         (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id), \
         (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id), \
         (SELECT COUNT(*) FROM post_shares s2 WHERE s2.post_id = p.id) \
         FROM post_shares s \
         JOIN posts p ON p.id = s.post_id \
         JOIN users su ON su.id = s.user_id \
         JOIN users u ON u.id = p.user_id \
         WHERE s.user_id IN ({})",
        placeholders(sharers.len())
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut entries = stmt
        .query_map(params_from_iter(sharers.iter()), |row| {
            Ok(FeedEntry::Shared {
                share_id: row.get(0)?,
                sharer_id: row.get(1)?,
                sharer_username: row.get(2)?,
                sharer_name: row.get(3)?,
                body: row.get(4)?,
                shared_at: row.get(5)?,
                post: PostView {
                    id: row.get(6)?,
                    author_id: row.get(7)?,
                    author_username: row.get(8)?,
                    author_name: row.get(9)?,
                    body: row.get(10)?,
                    created_at: row.get(11)?,
                    like_count: row.get(12)?,
                    comment_count: row.get(13)?,
                    share_count: row.get(14)?,
                    media: Vec::new(),
                },
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for entry in &mut entries {
        if let FeedEntry::Shared { post, .. } = entry {
            post.media = post_media(conn, &post.id)?;
        }
    }

    Ok(entries)
}
