//! JSON API mirroring the HTML pages, with permissive CORS so external
//! clients can consume it.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::{params, OptionalExtension};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::feed;
use crate::routes::home::PageQuery;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/posts", get(list_posts))
        .route("/api/posts/{id}", get(get_post))
        .route("/api/users/{id}", get(get_user))
        .route("/api/users/{id}/posts", get(list_user_posts))
        .route("/api/notifications", get(list_notifications))
        .route("/api/messages/{user_id}", get(list_messages))
        .layer(cors)
}

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let page = feed::home_feed(&conn, None, query.page.unwrap_or(1))?;
    Ok(Json(json!({
        "posts": page.items,
        "page": page.page,
        "pages": page.pages,
        "total": page.total,
    })))
}

async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let post = feed::post_view(&conn, &id)?.ok_or(AppError::NotFound)?;
    Ok(Json(json!({ "post": post })))
}

async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let user = conn
        .query_row(
            "SELECT id, username, display_name, location, bio, created_at
             FROM users WHERE id = ?1",
            params![id],
            |row| {
                Ok(json!({
                    "id": row.get::<_, String>(0)?,
                    "username": row.get::<_, String>(1)?,
                    "display_name": row.get::<_, Option<String>>(2)?,
                    "location": row.get::<_, Option<String>>(3)?,
                    "bio": row.get::<_, Option<String>>(4)?,
                    "created_at": row.get::<_, String>(5)?,
                }))
            },
        )
        .optional()?
        .ok_or(AppError::NotFound)?;
    Ok(Json(json!({ "user": user })))
}

async fn list_user_posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let page = feed::profile_feed(&conn, &id, query.page.unwrap_or(1))?;
    Ok(Json(json!({
        "posts": page.items,
        "page": page.page,
        "pages": page.pages,
        "total": page.total,
    })))
}

async fn list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, actor_id, kind, post_id, comment_id, body, is_read, created_at
         FROM notifications WHERE user_id = ?1
         ORDER BY created_at DESC, id DESC",
    )?;
    let notifications = stmt
        .query_map(params![user.id], |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "actor_id": row.get::<_, String>(1)?,
                "kind": row.get::<_, String>(2)?,
                "post_id": row.get::<_, Option<String>>(3)?,
                "comment_id": row.get::<_, Option<String>>(4)?,
                "body": row.get::<_, String>(5)?,
                "is_read": row.get::<_, i64>(6)? != 0,
                "created_at": row.get::<_, String>(7)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(json!({ "notifications": notifications })))
}

async fn list_messages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(partner_id): Path<String>,
) -> AppResult<Json<Value>> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, sender_id, recipient_id, body, is_read, created_at
         FROM messages
         WHERE (sender_id = ?1 AND recipient_id = ?2)
            OR (sender_id = ?2 AND recipient_id = ?1)
         ORDER BY created_at ASC, id ASC",
    )?;
    let messages = stmt
        .query_map(params![user.id, partner_id], |row| {
            Ok(json!({
                "id": row.get::<_, String>(0)?,
                "sender_id": row.get::<_, String>(1)?,
                "recipient_id": row.get::<_, String>(2)?,
                "body": row.get::<_, String>(3)?,
                "is_read": row.get::<_, i64>(4)? != 0,
                "created_at": row.get::<_, String>(5)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(json!({ "messages": messages })))
}
