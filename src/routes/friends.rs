use axum::extract::{Path, State};
use axum::Json;
use serde_json::json;

use crate::error::AppResult;
use crate::extractors::CurrentUser;
use crate::social;
use crate::state::AppState;

pub async fn add(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(other): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    social::add_friend(&conn, &user.id, &other)?;
    Ok(Json(json!({ "message": "Friend request sent successfully" })))
}

pub async fn accept(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(requester): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    social::accept_friend(&conn, &user.id, &requester)?;
    Ok(Json(json!({ "message": "Friend request accepted" })))
}

pub async fn reject(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(requester): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    social::reject_friend(&conn, &user.id, &requester)?;
    Ok(Json(json!({ "message": "Friend request rejected" })))
}
