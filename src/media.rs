//! Storage of uploaded media files. Files land in a per-user directory
//! under the uploads root; the database keeps the relative path.

use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Strip path components and suspicious characters from a client-supplied
/// filename.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches(['_', '.']).is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Classify a media row from the upload's content type, falling back to a
/// guess from the filename.
pub fn classify(content_type: Option<&str>, filename: &str) -> &'static str {
    let mime = match content_type {
        Some(ct) => ct.to_string(),
        None => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    };
    if mime.starts_with("image/") {
        "image"
    } else if mime.starts_with("video/") {
        "video"
    } else {
        "other"
    }
}

/// Write uploaded bytes under `<uploads>/<user_id>/<uuid>_<name>`.
/// Returns the relative path stored in the database.
pub fn store_upload(
    uploads_root: &Path,
    user_id: &str,
    filename: &str,
    data: &[u8],
) -> AppResult<String> {
    let name = format!("{}_{}", uuid::Uuid::now_v7(), sanitize_filename(filename));
    let user_dir: PathBuf = uploads_root.join(user_id);
    std::fs::create_dir_all(&user_dir)
        .map_err(|e| AppError::Internal(format!("create upload dir: {}", e)))?;
    std::fs::write(user_dir.join(&name), data)
        .map_err(|e| AppError::Internal(format!("write upload: {}", e)))?;

    Ok(format!("{}/{}", user_id, name))
}
