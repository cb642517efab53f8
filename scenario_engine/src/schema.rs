//! Primary-key discovery.

use crate::error::StoreError;
use crate::store::Store;

/// Returns the sorted, deduplicated primary-key column names of `table`.
///
/// The result is recomputed on every call so it always reflects the current
/// schema. A table without a primary key yields an empty list; callers that
/// need a key must treat that as fatal.
///
/// # Errors
///
/// Returns a [`StoreError`] when the column metadata cannot be read.
pub fn primary_keys(store: &dyn Store, table: &str) -> Result<Vec<String>, StoreError> {
    let mut keys: Vec<String> = store
        .table_columns(table)?
        .into_iter()
        .filter(|column| column.primary_key)
        .map(|column| column.name)
        .collect();
    keys.sort();
    keys.dedup();
    Ok(keys)
}
