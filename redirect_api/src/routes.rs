//! HTTP handlers for creating, following and deleting redirections.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use serde::Deserialize;

use crate::clock::Clock;
use crate::db::Database;

/// Collaborators shared by every handler.
pub struct Dependencies {
    /// Redirection storage.
    pub database: Database,
    /// Source of creation timestamps.
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependencies")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

/// Handler state.
pub type AppState = Arc<Dependencies>;

const MISSING_FIELDS: &str = r#"{"error": "key and url are required"}"#;

#[derive(Debug, Deserialize)]
struct CreateRequest {
    #[serde(default)]
    key: String,
    #[serde(default)]
    url: String,
}

/// Liveness probe: `200` while the database answers, `503` otherwise.
pub fn health() -> Router<AppState> {
    Router::new().route(
        "/health",
        get(|State(deps): State<AppState>| async move {
            match deps.database.ping() {
                Ok(()) => StatusCode::OK,
                Err(err) => {
                    tracing::warn!(error = %err, "health check failed");
                    StatusCode::SERVICE_UNAVAILABLE
                }
            }
        }),
    )
}

/// Create, follow and delete routes.
pub fn redirections() -> Router<AppState> {
    Router::new()
        .route("/redirections", post(create))
        .route("/redirections/{key}", delete(remove))
        .route("/{key}", get(follow))
}

async fn create(State(deps): State<AppState>, body: Bytes) -> Response {
    let Ok(request) = serde_json::from_slice::<CreateRequest>(&body) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    tracing::debug!(key = %request.key, url = %request.url, "creating redirection");

    if request.key.is_empty() || request.url.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            [(header::CONTENT_TYPE, "application/json")],
            MISSING_FIELDS,
        )
            .into_response();
    }

    let now = deps.clock.now();
    if let Err(err) = deps
        .database
        .insert_redirection(&request.key, &request.url, now)
    {
        tracing::error!(key = %request.key, error = %err, "failed to create redirection");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    tracing::info!(key = %request.key, url = %request.url, "created redirection");
    StatusCode::OK.into_response()
}

async fn follow(State(deps): State<AppState>, Path(key): Path<String>) -> Response {
    match deps.database.find_url(&key) {
        Ok(Some(url)) => {
            let target = serde_json::Value::String(url.clone());
            let body = format!(r#"<script type="text/javascript">window.location = {target};</script>"#);
            (
                StatusCode::FOUND,
                [(header::LOCATION, url), (header::CONTENT_TYPE, "text/html".to_owned())],
                body,
            )
                .into_response()
        }
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            tracing::error!(key = %key, error = %err, "failed to query redirection");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn remove(State(deps): State<AppState>, Path(key): Path<String>) -> Response {
    match deps.database.delete_redirection(&key) {
        Ok(removed) => {
            tracing::info!(key = %key, removed, "deleted redirection");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => {
            tracing::error!(key = %key, error = %err, "failed to delete redirection");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
