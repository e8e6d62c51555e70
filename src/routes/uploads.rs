use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Serve an uploaded file from the per-user uploads directory.
pub async fn serve(
    State(state): State<AppState>,
    Path((user_id, file)): Path<(String, String)>,
) -> AppResult<Response> {
    // Path segments never contain separators once routed, but reject
    // anything that smells like traversal anyway.
    if user_id.contains(['/', '\\']) || file.contains(['/', '\\']) {
        return Err(AppError::NotFound);
    }
    if user_id.contains("..") || file.contains("..") {
        return Err(AppError::NotFound);
    }

    let path = state.config.uploads_path().join(&user_id).join(&file);
    let data = tokio::fs::read(&path).await.map_err(|_| AppError::NotFound)?;

    let mime = mime_guess::from_path(&file).first_or_octet_stream();
    Ok((
        [(header::CONTENT_TYPE, mime.essence_str().to_string())],
        data,
    )
        .into_response())
}
