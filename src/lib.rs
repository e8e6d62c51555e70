// Library exports so integration tests can use the application modules.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod feed;
pub mod media;
pub mod routes;
pub mod social;
pub mod state;
