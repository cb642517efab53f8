//! Steps seeding a store and checking record verification outcomes.

use std::sync::Arc;

use crate::fixtures::VerificationContext;
use anyhow::{Context, Result, anyhow, ensure};
use rstest_bdd_macros::{given, then, when};
use scenario_engine::{ScenarioError, SqliteStore, insert_one, verify_absence, verify_record};

fn store(verification_context: &VerificationContext) -> Result<Arc<SqliteStore>> {
    verification_context
        .store
        .with_ref(Arc::clone)
        .ok_or_else(|| anyhow!("no store was created"))
}

fn outcome(verification_context: &VerificationContext) -> Result<ScenarioError> {
    verification_context
        .outcome
        .take()
        .ok_or_else(|| anyhow!("nothing was verified"))?
        .err()
        .ok_or_else(|| anyhow!("verification unexpectedly succeeded"))
}

#[given("a store with a keyless table {table:string}")]
#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd step macros require owned capture values"
)]
fn keyless_store(verification_context: &VerificationContext, table: String) -> Result<()> {
    let store = SqliteStore::open_in_memory()?;
    store.execute_batch(&format!("CREATE TABLE {table} (id INTEGER, name TEXT);"))?;
    verification_context.store.set(Arc::new(store));
    Ok(())
}

#[given("a store with a widget table")]
fn widget_store(verification_context: &VerificationContext) -> Result<()> {
    let store = SqliteStore::open_in_memory()?;
    store.execute_batch("CREATE TABLE widget (id INTEGER PRIMARY KEY, name TEXT NOT NULL);")?;
    verification_context.store.set(Arc::new(store));
    Ok(())
}

#[given("a widget with id {id:u32} named {name:string} is seeded")]
#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd step macros require owned capture values"
)]
fn seed_widget(verification_context: &VerificationContext, id: u32, name: String) -> Result<()> {
    let store = store(verification_context)?;
    let key = id.to_string();
    insert_one(store.as_ref(), "widget", &[("id", key.as_str()), ("name", name.as_str())])
        .context("seed widget")?;
    Ok(())
}

#[when("the record with id {id:u32} named {name:string} is verified in {table:string}")]
#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd step macros require owned capture values"
)]
fn verify_named(
    verification_context: &VerificationContext,
    id: u32,
    name: String,
    table: String,
) -> Result<()> {
    let store = store(verification_context)?;
    let key = id.to_string();
    let result = verify_record(
        store.as_ref(),
        &table,
        &[("id", key.as_str()), ("name", name.as_str())],
    );
    verification_context.outcome.set(result);
    Ok(())
}

#[when("the absence of id {id:u32} is checked in {table:string}")]
#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd step macros require owned capture values"
)]
fn check_absence(verification_context: &VerificationContext, id: u32, table: String) -> Result<()> {
    let store = store(verification_context)?;
    let result = verify_absence(store.as_ref(), &table, &id.to_string());
    verification_context.outcome.set(result);
    Ok(())
}

#[then("verification succeeds")]
fn succeeds(verification_context: &VerificationContext) -> Result<()> {
    let result = verification_context
        .outcome
        .take()
        .ok_or_else(|| anyhow!("nothing was verified"))?;
    ensure!(result.is_ok(), "verification failed: {result:?}");
    Ok(())
}

#[then("verification fails because the table has no primary key")]
fn fails_without_key(verification_context: &VerificationContext) -> Result<()> {
    let err = outcome(verification_context)?;
    ensure!(
        matches!(err, ScenarioError::MissingPrimaryKey { .. }),
        "unexpected error variant: {err:?}"
    );
    Ok(())
}

#[then("verification fails on column {expected:string}")]
#[expect(
    clippy::needless_pass_by_value,
    reason = "rstest-bdd step macros require owned capture values"
)]
fn fails_on_column(verification_context: &VerificationContext, expected: String) -> Result<()> {
    let err = outcome(verification_context)?;
    match err {
        ScenarioError::ColumnMismatch { column, .. } => {
            ensure!(column == expected, "mismatch reported on {column}");
            Ok(())
        }
        other => Err(anyhow!("unexpected error variant: {other:?}")),
    }
}

#[then("verification fails because no record matches")]
fn fails_without_record(verification_context: &VerificationContext) -> Result<()> {
    let err = outcome(verification_context)?;
    ensure!(
        matches!(err, ScenarioError::RecordNotFound { .. }),
        "unexpected error variant: {err:?}"
    );
    ensure!(err.to_string().contains("id=4"), "key missing from: {err}");
    Ok(())
}

#[then("verification fails with {count:i64} unexpected record")]
fn fails_with_count(verification_context: &VerificationContext, count: i64) -> Result<()> {
    let err = outcome(verification_context)?;
    match err {
        ScenarioError::UnexpectedRecords { count: actual, .. } => {
            ensure!(actual == count, "counted {actual} records");
            Ok(())
        }
        other => Err(anyhow!("unexpected error variant: {other:?}")),
    }
}
