use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use rusqlite::params;

use crate::error::AppResult;
use crate::extractors::PageUser;
use crate::routes::home::Html;
use crate::social;
use crate::state::AppState;

pub struct NotificationView {
    pub body: String,
    pub kind: String,
    pub created_at: String,
    pub is_read: bool,
    pub actor_username: String,
    pub post_id: String,
}

#[derive(Template)]
#[template(path = "pages/notifications.html")]
pub struct NotificationsTemplate {
    pub notifications: Vec<NotificationView>,
}

pub async fn index(State(state): State<AppState>, PageUser(user): PageUser) -> AppResult<Response> {
    let conn = state.db.get()?;

    let mut stmt = conn.prepare(
        "SELECT n.body, n.kind, n.created_at, n.is_read, u.username,
                COALESCE(n.post_id, '')
         FROM notifications n JOIN users u ON u.id = n.actor_id
         WHERE n.user_id = ?1
         ORDER BY n.created_at DESC, n.id DESC",
    )?;
    let notifications = stmt
        .query_map(params![user.id], |row| {
            let is_read: i64 = row.get(3)?;
            Ok(NotificationView {
                body: row.get(0)?,
                kind: row.get(1)?,
                created_at: row.get(2)?,
                is_read: is_read != 0,
                actor_username: row.get(4)?,
                post_id: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    // Viewing the list marks everything as read.
    social::mark_notifications_read(&conn, &user.id)?;

    Ok(Html(NotificationsTemplate { notifications }).into_response())
}
