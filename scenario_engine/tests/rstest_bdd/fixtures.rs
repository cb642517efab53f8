//! Shared fixtures for the behavioural scenarios.

use std::sync::Arc;

use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use scenario_engine::{CapturedResponse, HttpSimulator, ScenarioResult, SqliteStore};

/// State shared by the record verification steps.
#[derive(Debug, Default, ScenarioState)]
pub struct VerificationContext {
    /// Store seeded by the `Given` steps.
    pub store: Slot<Arc<SqliteStore>>,
    /// Result of the last verification.
    pub outcome: Slot<ScenarioResult<()>>,
}

/// State shared by the HTTP simulation steps.
#[derive(Debug, Default, ScenarioState)]
pub struct HttpContext {
    /// Simulator under test.
    pub simulator: Slot<HttpSimulator>,
    /// Result of the last dispatch.
    pub outcome: Slot<ScenarioResult<CapturedResponse>>,
}

/// Creates an empty verification context.
#[fixture]
pub fn verification_context() -> VerificationContext {
    VerificationContext::default()
}

/// Creates an empty HTTP context.
#[fixture]
pub fn http_context() -> HttpContext {
    HttpContext::default()
}
