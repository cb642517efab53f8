//! Dependency setup and router assembly.

use std::sync::Arc;

use axum::Router;

use crate::clock::Clock;
use crate::config::Config;
use crate::db::Database;
use crate::error::ApiError;
use crate::routes::{self, Dependencies};

/// Opens and migrates the configured database.
///
/// # Errors
///
/// Returns an [`ApiError`] when the database cannot be opened or migrated.
pub fn setup(config: &Config, clock: Arc<dyn Clock>) -> Result<Dependencies, ApiError> {
    let database = Database::open(&config.dsn)?;
    database.migrate()?;
    Ok(Dependencies { database, clock })
}

/// Combines the health probe and every route group into one router.
#[must_use]
pub fn router(deps: Dependencies) -> Router {
    Router::new()
        .merge(routes::health())
        .merge(routes::redirections())
        .with_state(Arc::new(deps))
}
