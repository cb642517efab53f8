//! A minimal URL redirection service over `SQLite`.
//!
//! Clients register a key with `POST /redirections`, follow it with
//! `GET /{key}` and remove it with `DELETE /redirections/{key}`. Handlers
//! take their timestamps from an injected [`Clock`] so behaviour tests can
//! freeze time.

mod app;
mod cli;
mod clock;
mod config;
mod db;
mod error;
mod routes;

pub use app::{router, setup};
pub use cli::Cli;
pub use clock::{Clock, SystemClock};
pub use config::{Config, ENV_PREFIX};
pub use db::Database;
pub use error::ApiError;
pub use routes::{AppState, Dependencies};
