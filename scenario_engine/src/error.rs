//! Error types produced while loading fixtures, dispatching requests and
//! verifying expectations.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Convenience alias for engine results.
pub type ScenarioResult<T> = Result<T, ScenarioError>;

/// Failure reported by a [`Store`](crate::Store) implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Error raised by the `SQLite` driver.
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Error raised by any other backend.
    #[error("{0}")]
    Backend(String),
}

/// Errors that terminate a scenario.
///
/// Every variant carries enough context (table, column, key, expected and
/// actual values) to diagnose the failure without re-running the scenario.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScenarioError {
    /// The store rejected a fixture row.
    #[error("failed to insert fixture into '{table}': {source}")]
    Fixture {
        /// Table the fixture targeted.
        table: String,
        /// Underlying store failure.
        #[source]
        source: StoreError,
    },

    /// A fixture table was malformed.
    #[error("malformed fixture for '{table}': {message}")]
    FixtureShape {
        /// Table the fixture targeted.
        table: String,
        /// Description of the shape problem.
        message: String,
    },

    /// The table exposes no primary key, so rows cannot be looked up.
    #[error("no primary key found for table {table}")]
    MissingPrimaryKey {
        /// Table without a primary key.
        table: String,
    },

    /// An expectation omitted one of the table's primary-key columns.
    #[error("expectation for table {table} is missing primary key column {column:?}")]
    MissingKeyColumn {
        /// Table being verified.
        table: String,
        /// Primary-key column absent from the expectation.
        column: String,
    },

    /// No row matched the primary-key lookup.
    #[error("no record found for table {table} with primary keys {keys}")]
    RecordNotFound {
        /// Table being verified.
        table: String,
        /// Rendered `column = value` pairs used for the lookup.
        keys: String,
    },

    /// A store operation failed outside fixture loading.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A stored column differs from its expectation.
    #[error("column {column:?} mismatched (-want +got):\n{diff}")]
    ColumnMismatch {
        /// Column whose value differs.
        column: String,
        /// Structural difference between wanted and stored values.
        diff: String,
    },

    /// Rows exist where none were expected.
    #[error("expected no record in {table} with id {id:?}, got {count}")]
    UnexpectedRecords {
        /// Table being checked.
        table: String,
        /// Identifier that should be absent.
        id: String,
        /// Number of matching rows observed.
        count: i64,
    },

    /// Neither an injected handler nor an application router is available.
    #[error("no handler was set")]
    NoHandler,

    /// A response assertion ran before any request was dispatched.
    #[error("no request was made")]
    NoRequest,

    /// The handler panicked with something other than the abort signal.
    #[error("handler panicked: {message}")]
    HandlerPanicked {
        /// Panic payload rendered as text.
        message: String,
    },

    /// The synthetic request could not be built.
    #[error("invalid request: {reason}")]
    InvalidRequest {
        /// Why the request was rejected.
        reason: String,
    },

    /// The dispatch runtime could not be started.
    #[error("failed to start dispatch runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The response status differs from the expected status.
    #[error("expected status {expected}, got {actual} (body: {body})")]
    StatusMismatch {
        /// Expected status code.
        expected: u16,
        /// Status code captured from the handler.
        actual: u16,
        /// Trimmed response body.
        body: String,
    },

    /// A response header differs from its expected value.
    #[error("expected header {name:?} to be {expected:?}, got {actual:?}")]
    HeaderMismatch {
        /// Header name.
        name: String,
        /// Expected header value.
        expected: String,
        /// Captured header value.
        actual: String,
    },

    /// A header expected to be absent was present.
    #[error("expected header {name:?} to be not set, got {value:?}")]
    HeaderPresent {
        /// Header name.
        name: String,
        /// Captured header value.
        value: String,
    },

    /// The response content type differs from the expected one.
    #[error("expected content type {expected:?}, got {actual:?} ({body})")]
    ContentTypeMismatch {
        /// Expected content type.
        expected: String,
        /// Captured content type.
        actual: String,
        /// Trimmed response body.
        body: String,
    },

    /// The response body differs from the expected body.
    #[error("body mismatch (-want +got):\n{diff}")]
    BodyMismatch {
        /// Structural difference between wanted and captured bodies.
        diff: String,
    },

    /// The response body was expected to be empty.
    #[error("expected empty body, got {body:?}")]
    BodyNotEmpty {
        /// Captured response body.
        body: String,
    },

    /// No registered pattern matches a step.
    #[error("undefined step: {text:?}")]
    UndefinedStep {
        /// Step text as written in the scenario.
        text: String,
    },

    /// A step pattern failed to compile.
    #[error("invalid step pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// Pattern source text.
        pattern: String,
        /// Regex compilation failure.
        #[source]
        source: regex::Error,
    },

    /// A step requires a data table but none was attached.
    #[error("step {text:?} requires a data table")]
    MissingTable {
        /// Step text.
        text: String,
    },

    /// A step requires a docstring but none was attached.
    #[error("step {text:?} requires a docstring")]
    MissingDocstring {
        /// Step text.
        text: String,
    },

    /// A step capture could not be interpreted.
    #[error("invalid argument for step {text:?}: {message}")]
    InvalidArgument {
        /// Step text.
        text: String,
        /// What was wrong with the argument.
        message: String,
    },

    /// A feature file could not be read or parsed.
    #[error("failed to parse feature file '{path}': {message}")]
    FeatureParse {
        /// Feature file path.
        path: Utf8PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// Runner configuration could not be assembled.
    #[error("failed to load runner configuration: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl ScenarioError {
    /// Builds a [`ScenarioError::Fixture`] for `table`.
    pub(crate) fn fixture(table: &str, source: impl Into<StoreError>) -> Self {
        Self::Fixture {
            table: table.to_owned(),
            source: source.into(),
        }
    }

    /// Builds a [`ScenarioError::InvalidArgument`] for the step `text`.
    pub(crate) fn invalid_argument(text: &str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            text: text.to_owned(),
            message: message.into(),
        }
    }
}
