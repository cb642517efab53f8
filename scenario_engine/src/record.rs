//! Verifies stored records against expectation tables.

use crate::diff::semantic_diff;
use crate::error::{ScenarioError, ScenarioResult};
use crate::schema::primary_keys;
use crate::store::{SqlParam, Store, quote_identifier};
use crate::value::ColumnValue;

/// Asserts that `table` holds a row matching `expected`.
///
/// The row is located through the table's primary key: every key column must
/// appear in `expected`, and its value is bound as an integer when it parses
/// as one. Every listed column, keys included, is then normalised and
/// compared semantically against its expected text. The first mismatch is
/// reported.
///
/// # Errors
///
/// - [`ScenarioError::MissingPrimaryKey`] when the table has no primary key.
/// - [`ScenarioError::MissingKeyColumn`] when `expected` omits a key column.
/// - [`ScenarioError::RecordNotFound`] when no row matches the key.
/// - [`ScenarioError::ColumnMismatch`] when a column differs.
/// - [`ScenarioError::Store`] for any other store failure.
pub fn verify_record<K, V>(store: &dyn Store, table: &str, expected: &[(K, V)]) -> ScenarioResult<()>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let keys = primary_keys(store, table)?;
    if keys.is_empty() {
        return Err(ScenarioError::MissingPrimaryKey {
            table: table.to_owned(),
        });
    }

    let mut key_values: Vec<Option<&str>> = vec![None; keys.len()];
    for (column, value) in expected {
        if let Ok(index) = keys.binary_search_by(|key| key.as_str().cmp(column.as_ref())) {
            if let Some(slot) = key_values.get_mut(index) {
                *slot = Some(value.as_ref());
            }
        }
    }
    let mut params = Vec::with_capacity(keys.len());
    for (key, slot) in keys.iter().zip(&key_values) {
        let value = slot.ok_or_else(|| ScenarioError::MissingKeyColumn {
            table: table.to_owned(),
            column: key.clone(),
        })?;
        params.push(SqlParam::integer_or_text(value));
    }

    let columns: Vec<String> = expected
        .iter()
        .map(|(column, _)| quote_identifier(column.as_ref()))
        .collect();
    let mut sql = format!(
        "SELECT {} FROM {} WHERE 1=1",
        columns.join(", "),
        quote_identifier(table)
    );
    for (index, key) in keys.iter().enumerate() {
        sql.push_str(&format!(" AND {} = ?{}", quote_identifier(key), index + 1));
    }

    let row = store
        .query_row(&sql, &params)?
        .ok_or_else(|| ScenarioError::RecordNotFound {
            table: table.to_owned(),
            keys: render_keys(&keys, &key_values),
        })?;

    for ((column, want), got) in expected.iter().zip(row.iter()) {
        if let Some(diff) = semantic_diff(want.as_ref(), &got.normalise()) {
            return Err(ScenarioError::ColumnMismatch {
                column: column.as_ref().to_owned(),
                diff,
            });
        }
    }
    tracing::debug!(table, columns = expected.len(), "verified record");
    Ok(())
}

/// Asserts that no row of `table` has the given `id`.
///
/// # Errors
///
/// Returns [`ScenarioError::UnexpectedRecords`] with the observed count when
/// any row matches, and [`ScenarioError::Store`] when the count fails.
pub fn verify_absence(store: &dyn Store, table: &str, id: &str) -> ScenarioResult<()> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE \"id\" = ?1",
        quote_identifier(table)
    );
    let row = store.query_row(&sql, &[SqlParam::Text(id.to_owned())])?;
    let count = match row.as_deref() {
        Some([ColumnValue::Integer(count)]) => *count,
        other => {
            return Err(ScenarioError::Store(crate::error::StoreError::Backend(format!(
                "unexpected COUNT(*) result {other:?}"
            ))));
        }
    };
    if count != 0 {
        return Err(ScenarioError::UnexpectedRecords {
            table: table.to_owned(),
            id: id.to_owned(),
            count,
        });
    }
    Ok(())
}

fn render_keys(keys: &[String], values: &[Option<&str>]) -> String {
    let pairs: Vec<String> = keys
        .iter()
        .zip(values)
        .map(|(key, value)| format!("{key}={}", value.unwrap_or_default()))
        .collect();
    format!("[{}]", pairs.join(", "))
}
