//! Errors raised while starting or running the service.

use thiserror::Error;

/// Failures surfaced by the redirection service.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    /// The database could not be opened or queried.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A schema migration failed to apply.
    #[error("failed to apply migration {version}: {source}")]
    Migration {
        /// Schema version the migration would have produced.
        version: usize,
        /// Underlying driver failure.
        #[source]
        source: rusqlite::Error,
    },

    /// Configuration could not be assembled.
    #[error("configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// The listener could not be bound or the server stopped abnormally.
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    /// The log filter directive did not parse.
    #[error("invalid log filter '{filter}': {message}")]
    LogFilter {
        /// Directive as configured.
        filter: String,
        /// Parser message.
        message: String,
    },
}
