use askama::Template;
use axum::extract::{Multipart, Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::json;

use crate::db::models::ReactionKind;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser, PageUser};
use crate::feed;
use crate::media;
use crate::routes::home::{feed_item_view, FeedItemView, Html, MediaItemView};
use crate::social;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/new_post.html")]
pub struct NewPostTemplate {
    pub error: String,
}

pub struct ReactionCountView {
    pub kind: String,
    pub count: i64,
}

pub struct ReplyView {
    pub author_name: String,
    pub body: String,
    pub created_at: String,
}

pub struct CommentView {
    pub id: String,
    pub author_name: String,
    pub body: String,
    pub created_at: String,
    pub reactions: Vec<ReactionCountView>,
    pub replies: Vec<ReplyView>,
    pub media: Vec<MediaItemView>,
}

#[derive(Template)]
#[template(path = "pages/post.html")]
pub struct PostTemplate {
    pub logged_in: bool,
    pub item: FeedItemView,
    pub comments: Vec<CommentView>,
    pub viewer_liked: bool,
    pub viewer_shared: bool,
}

// -- Multipart helpers --

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// Pull the text body plus any media files out of a multipart form.
async fn read_post_form(mut multipart: Multipart) -> AppResult<(String, Vec<UploadedFile>)> {
    let mut content = String::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "content" => {
                content = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?;
            }
            "media" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                if filename.is_empty() {
                    continue;
                }
                let content_type = field.content_type().map(|ct| ct.to_string());
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Invalid form data: {}", e)))?;
                files.push(UploadedFile {
                    filename,
                    content_type,
                    data: data.to_vec(),
                });
            }
            _ => {}
        }
    }

    Ok((content, files))
}

fn store_media(
    state: &AppState,
    conn: &Connection,
    user_id: &str,
    post_id: Option<&str>,
    comment_id: Option<&str>,
    files: &[UploadedFile],
) -> AppResult<()> {
    for file in files {
        let rel_path = media::store_upload(
            state.config.uploads_path(),
            user_id,
            &file.filename,
            &file.data,
        )?;
        let media_type = media::classify(file.content_type.as_deref(), &file.filename);
        conn.execute(
            "INSERT INTO media (id, post_id, comment_id, file_path, media_type)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                uuid::Uuid::now_v7().to_string(),
                post_id,
                comment_id,
                rel_path,
                media_type
            ],
        )?;
    }
    Ok(())
}

// -- Post creation --

pub async fn new_post_page(PageUser(_user): PageUser) -> AppResult<Response> {
    Ok(Html(NewPostTemplate {
        error: String::new(),
    })
    .into_response())
}

pub async fn create_post(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let (content, files) = read_post_form(multipart).await?;

    if content.trim().is_empty() {
        return Ok(Html(NewPostTemplate {
            error: "Post content is required".to_string(),
        })
        .into_response());
    }

    let conn = state.db.get()?;
    let post_id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO posts (id, user_id, body) VALUES (?1, ?2, ?3)",
        params![post_id, user.id, content],
    )?;
    store_media(&state, &conn, &user.id, Some(&post_id), None, &files)?;

    tracing::info!("User {} created post {}", user.username, post_id);
    Ok(Redirect::to("/home").into_response())
}

// -- Post detail --

fn comment_media(conn: &Connection, comment_id: &str) -> AppResult<Vec<MediaItemView>> {
    let mut stmt =
        conn.prepare("SELECT file_path, media_type FROM media WHERE comment_id = ?1")?;
    let media = stmt
        .query_map(params![comment_id], |row| {
            let path: String = row.get(0)?;
            let media_type: String = row.get(1)?;
            Ok(MediaItemView {
                url: format!("/uploads/{}", path),
                is_image: media_type == "image",
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(media)
}

fn load_comments(conn: &Connection, post_id: &str) -> AppResult<Vec<CommentView>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, COALESCE(u.display_name, u.username), c.body, c.created_at
         FROM comments c JOIN users u ON u.id = c.user_id
         WHERE c.post_id = ?1 AND c.parent_id IS NULL
         ORDER BY c.created_at DESC",
    )?;
    let tops = stmt
        .query_map(params![post_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut comments = Vec::with_capacity(tops.len());
    for (id, author_name, body, created_at) in tops {
        let mut stmt = conn.prepare(
            "SELECT COALESCE(u.display_name, u.username), c.body, c.created_at
             FROM comments c JOIN users u ON u.id = c.user_id
             WHERE c.parent_id = ?1 ORDER BY c.created_at ASC",
        )?;
        let replies = stmt
            .query_map(params![id], |row| {
                Ok(ReplyView {
                    author_name: row.get(0)?,
                    body: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let reactions = social::reaction_counts(conn, &id)?
            .into_iter()
            .map(|(kind, count)| ReactionCountView {
                kind: kind.to_string(),
                count,
            })
            .collect();

        let media = comment_media(conn, &id)?;

        comments.push(CommentView {
            id,
            author_name,
            body,
            created_at,
            reactions,
            replies,
            media,
        });
    }
    Ok(comments)
}

pub async fn post_page(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Path(post_id): Path<String>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    let post = feed::post_view(&conn, &post_id)?.ok_or(AppError::NotFound)?;
    let comments = load_comments(&conn, &post_id)?;

    let (viewer_liked, viewer_shared) = match &maybe_user.0 {
        Some(user) => {
            let liked: i64 = conn.query_row(
                "SELECT COUNT(*) FROM post_likes WHERE user_id = ?1 AND post_id = ?2",
                params![user.id, post_id],
                |row| row.get(0),
            )?;
            let shared: i64 = conn.query_row(
                "SELECT COUNT(*) FROM post_shares WHERE user_id = ?1 AND post_id = ?2",
                params![user.id, post_id],
                |row| row.get(0),
            )?;
            (liked > 0, shared > 0)
        }
        None => (false, false),
    };

    let entry = feed::FeedEntry::Original(post);
    Ok(Html(PostTemplate {
        logged_in: maybe_user.0.is_some(),
        item: feed_item_view(&entry),
        comments,
        viewer_liked,
        viewer_shared,
    })
    .into_response())
}

// -- Interactions --

pub async fn comment(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(post_id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let (content, files) = read_post_form(multipart).await?;

    let conn = state.db.get()?;
    let comment_id = social::add_comment(&conn, &user.id, &post_id, &content, None)?;
    store_media(&state, &conn, &user.id, None, Some(&comment_id), &files)?;

    Ok(Redirect::to(&format!("/post/{}", post_id)).into_response())
}

pub async fn like(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let outcome = social::toggle_like(&conn, &user.id, &post_id)?;
    Ok(Json(json!({ "likes": outcome.like_count, "liked": outcome.liked })))
}

#[derive(Deserialize)]
pub struct ShareForm {
    pub share_content: Option<String>,
}

pub async fn share(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(post_id): Path<String>,
    Form(form): Form<ShareForm>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let outcome = social::toggle_share(&conn, &user.id, &post_id, form.share_content.as_deref())?;
    Ok(Json(json!({ "shares": outcome.share_count, "shared": outcome.shared })))
}

#[derive(Deserialize)]
pub struct ReplyForm {
    pub content: String,
}

pub async fn reply(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(comment_id): Path<String>,
    Form(form): Form<ReplyForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    let post_id: Option<String> = conn
        .query_row(
            "SELECT post_id FROM comments WHERE id = ?1",
            params![comment_id],
            |row| row.get(0),
        )
        .optional()?;
    let post_id = post_id.ok_or(AppError::NotFound)?;

    social::add_comment(&conn, &user.id, &post_id, &form.content, Some(&comment_id))?;
    Ok(Redirect::to(&format!("/post/{}", post_id)).into_response())
}

#[derive(Deserialize)]
pub struct ReactForm {
    pub reaction_type: String,
}

pub async fn react(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(comment_id): Path<String>,
    Form(form): Form<ReactForm>,
) -> AppResult<Json<serde_json::Value>> {
    let kind = ReactionKind::parse(&form.reaction_type)
        .ok_or_else(|| AppError::BadRequest("Invalid reaction type".to_string()))?;

    let conn = state.db.get()?;
    let outcome = social::toggle_reaction(&conn, &user.id, &comment_id, kind)?;

    Ok(Json(json!({
        "action": outcome.action.as_str(),
        "reaction_counts": outcome.counts,
    })))
}
