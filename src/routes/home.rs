use askama::Template;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rusqlite::params;
use serde::Deserialize;

use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::feed::{self, FeedEntry};
use crate::state::AppState;

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// Flattened feed entry for template rendering.
pub struct FeedItemView {
    pub post_id: String,
    pub author_username: String,
    pub author_name: String,
    pub body: String,
    pub timestamp: String,
    pub like_count: i64,
    pub comment_count: i64,
    pub share_count: i64,
    pub is_shared: bool,
    pub sharer_username: String,
    pub sharer_name: String,
    pub original_author_name: String,
    pub media: Vec<MediaItemView>,
}

pub struct MediaItemView {
    pub url: String,
    pub is_image: bool,
}

pub fn feed_item_view(entry: &FeedEntry) -> FeedItemView {
    let post = entry.post();
    let media = post
        .media
        .iter()
        .map(|m| MediaItemView {
            url: format!("/uploads/{}", m.file_path),
            is_image: m.media_type == "image",
        })
        .collect();

    match entry {
        FeedEntry::Original(post) => FeedItemView {
            post_id: post.id.clone(),
            author_username: post.author_username.clone(),
            author_name: post.author_name.clone(),
            body: post.body.clone(),
            timestamp: post.created_at.clone(),
            like_count: post.like_count,
            comment_count: post.comment_count,
            share_count: post.share_count,
            is_shared: false,
            sharer_username: String::new(),
            sharer_name: String::new(),
            original_author_name: String::new(),
            media,
        },
        FeedEntry::Shared {
            sharer_username,
            sharer_name,
            shared_at,
            ..
        } => FeedItemView {
            post_id: post.id.clone(),
            author_username: sharer_username.clone(),
            author_name: sharer_name.clone(),
            body: entry.effective_body().to_string(),
            timestamp: shared_at.clone(),
            like_count: post.like_count,
            comment_count: post.comment_count,
            share_count: post.share_count,
            is_shared: true,
            sharer_username: sharer_username.clone(),
            sharer_name: sharer_name.clone(),
            original_author_name: post.author_name.clone(),
            media,
        },
    }
}

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub logged_in: bool,
    pub username: String,
    pub items: Vec<FeedItemView>,
    pub page: usize,
    pub pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: usize,
    pub next_page: usize,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
}

pub async fn index(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let page = query.page.unwrap_or(1);
    let conn = state.db.get()?;

    let viewer = maybe_user.0.as_ref().map(|u| u.id.as_str());
    let feed = feed::home_feed(&conn, viewer, page)?;

    let items = feed.items.iter().map(feed_item_view).collect();

    Ok(Html(HomeTemplate {
        logged_in: maybe_user.0.is_some(),
        username: maybe_user
            .0
            .map(|u| u.username)
            .unwrap_or_default(),
        items,
        page: feed.page,
        pages: feed.pages,
        has_prev: feed.has_prev,
        has_next: feed.has_next,
        prev_page: feed.prev_num.unwrap_or(1),
        next_page: feed.next_num.unwrap_or(1),
    })
    .into_response())
}

pub struct UserResultView {
    pub username: String,
    pub name: String,
}

pub struct PostResultView {
    pub id: String,
    pub author_name: String,
    pub body: String,
    pub created_at: String,
}

#[derive(Template)]
#[template(path = "pages/search.html")]
pub struct SearchTemplate {
    pub query: String,
    pub users: Vec<UserResultView>,
    pub posts: Vec<PostResultView>,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Response> {
    let q = query.q.unwrap_or_default();
    let conn = state.db.get()?;

    let (users, posts) = if q.is_empty() {
        (Vec::new(), Vec::new())
    } else {
        let pattern = format!("%{}%", q);

        let mut stmt = conn.prepare(
            "SELECT username, COALESCE(display_name, username) FROM users
             WHERE username LIKE ?1 OR display_name LIKE ?1 ORDER BY username",
        )?;
        let users = stmt
            .query_map(params![pattern], |row| {
                Ok(UserResultView {
                    username: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT p.id, COALESCE(u.display_name, u.username), p.body, p.created_at
             FROM posts p JOIN users u ON u.id = p.user_id
             WHERE p.body LIKE ?1 ORDER BY p.created_at DESC",
        )?;
        let posts = stmt
            .query_map(params![pattern], |row| {
                Ok(PostResultView {
                    id: row.get(0)?,
                    author_name: row.get(1)?,
                    body: row.get(2)?,
                    created_at: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        (users, posts)
    };

    Ok(Html(SearchTemplate {
        query: q,
        users,
        posts,
    })
    .into_response())
}
