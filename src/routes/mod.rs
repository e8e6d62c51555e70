pub mod api;
pub mod auth;
pub mod friends;
pub mod home;
pub mod messages;
pub mod notifications;
pub mod posts;
pub mod profile;
pub mod uploads;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home::index))
        .route("/home", get(home::index))
        .route("/search", get(home::search))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/post/new", get(posts::new_post_page).post(posts::create_post))
        .route("/post/{id}", get(posts::post_page))
        .route("/post/{id}/comment", post(posts::comment))
        .route("/post/{id}/like", post(posts::like))
        .route("/post/{id}/share", post(posts::share))
        .route("/comment/{id}/reply", post(posts::reply))
        .route("/comment/{id}/react", post(posts::react))
        .route("/user/{id}/add_friend", post(friends::add))
        .route("/user/{id}/accept_friend", post(friends::accept))
        .route("/user/{id}/reject_friend", post(friends::reject))
        .route("/profile/edit", get(profile::edit_page).post(profile::edit))
        .route("/profile/{username}", get(profile::show))
        .route("/messages", get(messages::inbox))
        .route(
            "/messages/{user_id}",
            get(messages::conversation).post(messages::send),
        )
        .route("/notifications", get(notifications::index))
        .route("/uploads/{user_id}/{file}", get(uploads::serve))
        .merge(api::router())
}
