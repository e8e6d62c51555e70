use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use rusqlite::params;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extractors::PageUser;
use crate::routes::home::Html;
use crate::social;
use crate::state::AppState;

pub struct PartnerView {
    pub user_id: String,
    pub username: String,
    pub name: String,
    pub last_message: String,
    pub last_at: String,
    pub unread: i64,
}

#[derive(Template)]
#[template(path = "pages/messages.html")]
pub struct InboxTemplate {
    pub partners: Vec<PartnerView>,
}

pub struct MessageView {
    pub body: String,
    pub created_at: String,
    pub mine: bool,
}

#[derive(Template)]
#[template(path = "pages/conversation.html")]
pub struct ConversationTemplate {
    pub partner_id: String,
    pub partner_name: String,
    pub messages: Vec<MessageView>,
}

/// Conversation partners with their latest message and unread count,
/// most recent conversation first.
pub async fn inbox(State(state): State<AppState>, PageUser(user): PageUser) -> AppResult<Response> {
    let conn = state.db.get()?;

    let mut stmt = conn.prepare(
        "SELECT u.id, u.username, COALESCE(u.display_name, u.username),
                m.body, m.created_at,
                (SELECT COUNT(*) FROM messages
                 WHERE sender_id = u.id AND recipient_id = ?1 AND is_read = 0)
         FROM messages m
         JOIN users u ON u.id = CASE WHEN m.sender_id = ?1 THEN m.recipient_id ELSE m.sender_id END
         WHERE (m.sender_id = ?1 OR m.recipient_id = ?1)
           AND m.created_at = (
               SELECT MAX(m2.created_at) FROM messages m2
               WHERE (m2.sender_id = m.sender_id AND m2.recipient_id = m.recipient_id)
                  OR (m2.sender_id = m.recipient_id AND m2.recipient_id = m.sender_id)
           )
         GROUP BY u.id
         ORDER BY m.created_at DESC",
    )?;
    let partners = stmt
        .query_map(params![user.id], |row| {
            Ok(PartnerView {
                user_id: row.get(0)?,
                username: row.get(1)?,
                name: row.get(2)?,
                last_message: row.get(3)?,
                last_at: row.get(4)?,
                unread: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Html(InboxTemplate { partners }).into_response())
}

pub async fn conversation(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(partner_id): Path<String>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    let partner_name: String = conn
        .query_row(
            "SELECT COALESCE(display_name, username) FROM users WHERE id = ?1",
            params![partner_id],
            |row| row.get(0),
        )
        .map_err(|_| AppError::NotFound)?;

    let mut stmt = conn.prepare(
        "SELECT sender_id, body, created_at FROM messages
         WHERE (sender_id = ?1 AND recipient_id = ?2)
            OR (sender_id = ?2 AND recipient_id = ?1)
         ORDER BY created_at ASC, id ASC",
    )?;
    let messages = stmt
        .query_map(params![user.id, partner_id], |row| {
            let sender_id: String = row.get(0)?;
            Ok(MessageView {
                mine: sender_id == user.id,
                body: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    // Opening the conversation marks everything received in it as read.
    social::mark_conversation_read(&conn, &user.id, &partner_id)?;

    Ok(Html(ConversationTemplate {
        partner_id,
        partner_name,
        messages,
    })
    .into_response())
}

#[derive(Deserialize)]
pub struct MessageForm {
    pub content: String,
}

pub async fn send(
    State(state): State<AppState>,
    PageUser(user): PageUser,
    Path(partner_id): Path<String>,
    Form(form): Form<MessageForm>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    social::send_message(&conn, &user.id, &partner_id, &form.content)?;
    Ok(Redirect::to(&format!("/messages/{}", partner_id)).into_response())
}
