//! Declarative behavioural tests for HTTP services backed by SQL.
//!
//! Scenarios are written as plain sentences. A [`StepRegistry`] maps each
//! sentence onto one of three capabilities: seeding database fixtures,
//! simulating an HTTP exchange against an in-process handler, and verifying
//! the resulting database records. [`FeatureRunner`] feeds Gherkin feature
//! files through a registry, building a fresh [`ScenarioContext`] for every
//! scenario.
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use camino::Utf8Path;
//! # use scenario_engine::{
//! #     FeatureRunner, FrozenClock, ScenarioContext, ScenarioError, SqliteStore, StepRegistry,
//! # };
//! # fn main() -> Result<(), ScenarioError> {
//! let runner = FeatureRunner::new(StepRegistry::standard()?);
//! let summary = runner.run_path(Utf8Path::new("tests/features"), || {
//!     let store = SqliteStore::open_in_memory()?;
//!     let clock = FrozenClock::at(chrono::DateTime::UNIX_EPOCH);
//!     Ok(ScenarioContext::new(Arc::new(store), clock))
//! })?;
//! assert!(summary.is_success(), "{summary}");
//! # Ok(())
//! # }
//! ```

mod clock;
mod config;
mod context;
mod diff;
mod error;
mod fixture;
pub mod http;
mod record;
mod runner;
mod schema;
mod steps;
mod store;
mod value;

pub use clock::FrozenClock;
pub use config::{ENV_PREFIX, RunnerConfig};
pub use context::ScenarioContext;
pub use diff::semantic_diff;
pub use error::{ScenarioError, ScenarioResult, StoreError};
pub use fixture::{insert_many, insert_one};
pub use http::{
    ApplicationFactory, CapturedResponse, Exchange, HttpSimulator, RecordedRequest, abort_request,
};
pub use record::{verify_absence, verify_record};
pub use runner::{
    FeatureRunner, RunSummary, ScenarioOutcome, StepFailure, normalise_docstring,
};
pub use schema::primary_keys;
pub use steps::{FORWARDED_FOR, Step, StepArgs, StepRegistry};
pub use store::{ColumnInfo, SqlParam, SqliteStore, Store, quote_identifier};
pub use value::{ColumnKind, ColumnValue, NIL_SENTINEL, NetworkPrefix, parse_timestamp};
