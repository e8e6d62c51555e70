use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use rusqlite::{params, OptionalExtension};
use serde::Deserialize;

use crate::auth::{password, session};
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::routes::home::Html;
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub error: String,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub error: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    let max_age_secs = max_age_hours * 3600;
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name, token, max_age_secs
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

fn session_token(parts_headers: &axum::http::HeaderMap, name: &str) -> Option<String> {
    parts_headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == name {
                Some(val.to_string())
            } else {
                None
            }
        })
}

// -- Registration --

#[derive(Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub display_name: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub password: String,
    pub confirm_password: String,
}

pub async fn register_page(maybe_user: MaybeUser) -> AppResult<Response> {
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/home").into_response());
    }
    Ok(Html(RegisterTemplate {
        error: String::new(),
    })
    .into_response())
}

pub async fn register(
    State(state): State<AppState>,
    maybe_user: MaybeUser,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/home").into_response());
    }

    let username = form.username.trim().to_string();
    let email = form.email.trim().to_lowercase();

    let error = if username.is_empty() || email.is_empty() || form.password.is_empty() {
        Some("Username, email and password are required".to_string())
    } else if form.password.len() < 6 {
        Some("Password must be at least 6 characters".to_string())
    } else if form.password != form.confirm_password {
        Some("Passwords do not match".to_string())
    } else {
        None
    };
    if let Some(error) = error {
        return Ok(Html(RegisterTemplate { error }).into_response());
    }

    let conn = state.db.get()?;
    if credentials_taken(&conn, &username, &email)? {
        return Ok(Html(RegisterTemplate {
            error: "Username or email already registered. Please login.".to_string(),
        })
        .into_response());
    }

    let password_hash = password::hash_password(&form.password)?;
    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO users (id, username, email, password_hash, display_name, location, bio)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            username,
            email,
            password_hash,
            none_if_blank(form.display_name),
            none_if_blank(form.location),
            none_if_blank(form.bio),
        ],
    )?;

    tracing::info!("Registered user {}", username);
    Ok(Redirect::to("/login").into_response())
}

fn none_if_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// A registration is rejected if either the username or the email is
/// already taken; the form re-renders with an error instead of letting
/// the INSERT hit the UNIQUE constraints.
fn credentials_taken(conn: &rusqlite::Connection, username: &str, email: &str) -> AppResult<bool> {
    let taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1 OR email = ?2",
        params![username, email],
        |row| row.get(0),
    )?;
    Ok(taken > 0)
}

// -- Login / logout --

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub async fn login_page(maybe_user: MaybeUser) -> AppResult<Response> {
    if maybe_user.0.is_some() {
        return Ok(Redirect::to("/home").into_response());
    }
    Ok(Html(LoginTemplate {
        error: String::new(),
    })
    .into_response())
}

pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let email = form.email.trim().to_lowercase();

    let found: Option<(String, String)> = {
        let conn = state.db.get()?;
        conn.query_row(
            "SELECT id, password_hash FROM users WHERE email = ?1",
            params![email],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?
    };

    let user_id = match found {
        Some((id, hash)) if password::verify_password(&form.password, &hash) => id,
        _ => {
            return Ok(Html(LoginTemplate {
                error: "Login unsuccessful. Please check email and password".to_string(),
            })
            .into_response());
        }
    };

    let token = session::create_session(&state.db, &user_id, state.config.auth.session_hours)?;
    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/home".to_string()),
            (header::SET_COOKIE, cookie),
        ],
        "",
    )
        .into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
) -> AppResult<Response> {
    let (parts, _body) = request.into_parts();

    if let Some(token) = session_token(&parts.headers, &state.config.auth.cookie_name) {
        let _ = session::delete_session(&state.db, &token);
    }

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/".to_string()),
            (
                header::SET_COOKIE,
                clear_session_cookie(&state.config.auth.cookie_name),
            ),
        ],
        "",
    )
        .into_response())
}
