//! Steps driving the HTTP simulator against a small in-process router.

use crate::fixtures::HttpContext;
use anyhow::{Result, anyhow, ensure};
use axum::Router;
use axum::routing::get;
use rstest_bdd_macros::{given, then, when};
use scenario_engine::{CapturedResponse, HttpSimulator, ScenarioError, abort_request};

fn captured(http_context: &HttpContext) -> Result<CapturedResponse> {
    http_context
        .outcome
        .with_ref(|result| result.as_ref().map(Clone::clone).map_err(ToString::to_string))
        .ok_or_else(|| anyhow!("nothing was dispatched"))?
        .map_err(|err| anyhow!("dispatch failed: {err}"))
}

async fn aborting() -> &'static str {
    abort_request()
}

#[given("an echo handler")]
fn echo_handler(http_context: &HttpContext) {
    let mut simulator = HttpSimulator::new();
    simulator.set_handler(
        Router::new()
            .route("/echo", get(|body: String| async move { body }))
            .route("/abort", get(aborting)),
    );
    http_context.simulator.set(simulator);
}

#[given("no handler")]
fn no_handler(http_context: &HttpContext) {
    http_context.simulator.set(HttpSimulator::new());
}

#[when("the client sends {method} {path:string} with body {body:string}")]
#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd step macros require owned capture values"
)]
fn send(http_context: &HttpContext, method: String, path: String, body: String) -> Result<()> {
    let mut simulator = http_context
        .simulator
        .take()
        .ok_or_else(|| anyhow!("no simulator was configured"))?;
    let payload = (!body.is_empty()).then_some(body.as_str());
    let result = simulator.dispatch(&method, &path, &[], payload).cloned();
    http_context.outcome.set(result);
    http_context.simulator.set(simulator);
    Ok(())
}

#[then("the captured status is {status:u16}")]
fn status_is(http_context: &HttpContext, status: u16) -> Result<()> {
    let response = captured(http_context)?;
    ensure!(response.status() == status, "status was {}", response.status());
    Ok(())
}

#[then("the captured body is {expected:string}")]
#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd step macros require owned capture values"
)]
fn body_is(http_context: &HttpContext, expected: String) -> Result<()> {
    let response = captured(http_context)?;
    ensure!(response.body() == expected, "body was {:?}", response.body());
    Ok(())
}

#[then("dispatch fails because no handler was set")]
fn fails_without_handler(http_context: &HttpContext) -> Result<()> {
    let result = http_context
        .outcome
        .take()
        .ok_or_else(|| anyhow!("nothing was dispatched"))?;
    ensure!(
        matches!(result, Err(ScenarioError::NoHandler)),
        "unexpected outcome: {result:?}"
    );
    Ok(())
}
