use askama::Template;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use rusqlite::{params, OptionalExtension};

use crate::error::{AppError, AppResult};
use crate::extractors::{MaybeUser, PageUser};
use crate::feed;
use crate::media;
use crate::routes::home::{feed_item_view, FeedItemView, Html, PageQuery};
use crate::social;
use crate::state::AppState;

struct ProfileUser {
    id: String,
    username: String,
    name: String,
    location: String,
    bio: String,
    avatar_url: String,
    joined: String,
}

#[derive(Template)]
#[template(path = "pages/profile.html")]
pub struct ProfileTemplate {
    pub logged_in: bool,
    pub user_id: String,
    pub username: String,
    pub name: String,
    pub location: String,
    pub bio: String,
    pub avatar_url: String,
    pub joined: String,
    /// One of: self, none, pending_sent, pending_received, accepted.
    pub friendship: String,
    pub items: Vec<FeedItemView>,
    pub page: usize,
    pub pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub prev_page: usize,
    pub next_page: usize,
}

#[derive(Template)]
#[template(path = "pages/edit_profile.html")]
pub struct EditProfileTemplate {
    pub name: String,
    pub location: String,
    pub bio: String,
    pub error: String,
}

fn load_profile(
    conn: &rusqlite::Connection,
    username: &str,
) -> AppResult<Option<ProfileUser>> {
    let row = conn
        .query_row(
            "SELECT id, username, COALESCE(display_name, username),
                    COALESCE(location, ''), COALESCE(bio, ''),
                    COALESCE(avatar_path, ''), created_at
             FROM users WHERE username = ?1",
            params![username],
            |row| {
                let avatar_path: String = row.get(5)?;
                Ok(ProfileUser {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    name: row.get(2)?,
                    location: row.get(3)?,
                    bio: row.get(4)?,
                    avatar_url: if avatar_path.is_empty() {
                        String::new()
                    } else {
                        format!("/uploads/{}", avatar_path)
                    },
                    joined: row.get(6)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

/// How the viewer relates to the profile owner, as a template-friendly tag.
fn friendship_tag(
    conn: &rusqlite::Connection,
    viewer: Option<&str>,
    owner: &str,
) -> AppResult<String> {
    let viewer = match viewer {
        Some(v) => v,
        None => return Ok("none".to_string()),
    };
    if viewer == owner {
        return Ok("self".to_string());
    }
    let tag = match social::friendship_between(conn, viewer, owner)? {
        None => "none",
        Some(f) if f.status == "accepted" => "accepted",
        Some(f) if f.user_id == viewer => "pending_sent",
        Some(_) => "pending_received",
    };
    Ok(tag.to_string())
}

pub async fn show(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    let profile = load_profile(&conn, &username)?.ok_or(AppError::NotFound)?;

    let viewer = maybe_user.0.as_ref().map(|u| u.id.as_str());
    let friendship = friendship_tag(&conn, viewer, &profile.id)?;

    let page = query.page.unwrap_or(1);
    let feed = feed::profile_feed(&conn, &profile.id, page)?;
    let items = feed.items.iter().map(feed_item_view).collect();

    Ok(Html(ProfileTemplate {
        logged_in: maybe_user.0.is_some(),
        user_id: profile.id,
        username: profile.username,
        name: profile.name,
        location: profile.location,
        bio: profile.bio,
        avatar_url: profile.avatar_url,
        joined: profile.joined,
        friendship,
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

pub async fn edit_page(
    State(state): State<AppState>,
    PageUser(user): PageUser,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let (name, location, bio): (String, String, String) = conn.query_row(
        "SELECT COALESCE(display_name, ''), COALESCE(location, ''), COALESCE(bio, '')
         FROM users WHERE id = ?1",
        params![user.id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    Ok(Html(EditProfileTemplate {
        name,
        location,
        bio,
        error: String::new(),
    })
    .into_response())
}

pub async fn edit(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut display_name = None;
    let mut location = None;
    let mut bio = None;
    let mut avatar: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "display_name" | "location" | "bio" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?;
                let value = value.trim().to_string();
                let value = if value.is_empty() { None } else { Some(value) };
                match name.as_str() {
                    "display_name" => display_name = value,
                    "location" => location = value,
                    _ => bio = value,
                }
            }
            "avatar" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                if filename.is_empty() {
                    continue;
                }
                let content_type = field.content_type().map(|ct| ct.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?;
                avatar = Some((filename, content_type, data.to_vec()));
            }
            _ => {}
        }
    }

    let conn = state.db.get()?;
    conn.execute(
        "UPDATE users SET display_name = ?1, location = ?2, bio = ?3 WHERE id = ?4",
        params![display_name, location, bio, user.id],
    )?;

    if let Some((filename, content_type, data)) = avatar {
        if media::classify(content_type.as_deref(), &filename) != "image" {
            return Err(AppError::BadRequest("Avatar must be an image".to_string()));
        }
        let rel_path =
            media::store_upload(state.config.uploads_path(), &user.id, &filename, &data)?;
        conn.execute(
            "UPDATE users SET avatar_path = ?1 WHERE id = ?2",
            params![rel_path, user.id],
        )?;
    }

    tracing::info!("User {} updated their profile", user.username);
    Ok(Redirect::to(&format!("/profile/{}", user.username)).into_response())
}
