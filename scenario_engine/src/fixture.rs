//! Loads declarative fixture rows into a store ahead of a scenario.

use crate::error::{ScenarioError, ScenarioResult};
use crate::store::{SqlParam, Store, quote_identifier};
use crate::value::NIL_SENTINEL;

/// Inserts one row built from ordered `(column, value)` pairs.
///
/// Columns appear in the statement in input order and values are bound
/// positionally. The literal `<nil>` is bound as SQL `NULL`.
///
/// # Errors
///
/// Returns [`ScenarioError::FixtureShape`] when `row` is empty and
/// [`ScenarioError::Fixture`] when the store rejects the insert.
pub fn insert_one<K, V>(store: &dyn Store, table: &str, row: &[(K, V)]) -> ScenarioResult<()>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if row.is_empty() {
        return Err(ScenarioError::FixtureShape {
            table: table.to_owned(),
            message: "a fixture row needs at least one column".to_owned(),
        });
    }
    let columns: Vec<String> = row
        .iter()
        .map(|(column, _)| quote_identifier(column.as_ref()))
        .collect();
    let placeholders: Vec<String> = (1..=row.len()).map(|index| format!("?{index}")).collect();
    let params: Vec<SqlParam> = row.iter().map(|(_, value)| fixture_param(value.as_ref())).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        columns.join(", "),
        placeholders.join(", ")
    );
    store
        .execute(&sql, &params)
        .map_err(|source| ScenarioError::fixture(table, source))?;
    tracing::debug!(table, columns = row.len(), "inserted fixture row");
    Ok(())
}

/// Inserts every data row of a table whose first row is the column header.
///
/// Rows are inserted in order and loading stops at the first failure; rows
/// already inserted stay in the store.
///
/// # Errors
///
/// Returns [`ScenarioError::FixtureShape`] when the header is missing or a
/// row's width differs from it, and [`ScenarioError::Fixture`] when the
/// store rejects a row.
pub fn insert_many<S>(store: &dyn Store, table: &str, rows: &[Vec<S>]) -> ScenarioResult<()>
where
    S: AsRef<str>,
{
    let Some((header, data)) = rows.split_first() else {
        return Err(ScenarioError::FixtureShape {
            table: table.to_owned(),
            message: "missing header row".to_owned(),
        });
    };
    for (index, cells) in data.iter().enumerate() {
        if cells.len() != header.len() {
            return Err(ScenarioError::FixtureShape {
                table: table.to_owned(),
                message: format!(
                    "row {} has {} cells but the header has {}",
                    index + 1,
                    cells.len(),
                    header.len()
                ),
            });
        }
        let row: Vec<(&str, &str)> = header
            .iter()
            .zip(cells)
            .map(|(column, value)| (column.as_ref(), value.as_ref()))
            .collect();
        insert_one(store, table, &row)?;
    }
    Ok(())
}

fn fixture_param(value: &str) -> SqlParam {
    if value == NIL_SENTINEL {
        SqlParam::Null
    } else {
        SqlParam::Text(value.to_owned())
    }
}
