//! In-memory table store for tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use pollstar_common::{AppError, AppResult};
use serde_json::Value as JsonValue;

use super::{BatchOperation, TableClient, TableRow, matches_filter};

/// An in-memory [`TableClient`] with the same batch semantics as the real
/// store: batches are validated against a snapshot before any row is
/// touched, so a failing operation leaves the partition unchanged.
#[derive(Debug, Default)]
pub struct MemoryTableStore {
    // Keyed by (partition_key, row_key); BTreeMap keeps row-key order.
    rows: Mutex<BTreeMap<(String, String), TableRow>>,
}

impl MemoryTableStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in a partition.
    pub fn partition_len(&self, partition_key: &str) -> AppResult<usize> {
        let rows = self.lock()?;
        Ok(rows
            .keys()
            .filter(|(pk, _)| pk == partition_key)
            .count())
    }

    fn lock(&self) -> AppResult<std::sync::MutexGuard<'_, BTreeMap<(String, String), TableRow>>> {
        self.rows
            .lock()
            .map_err(|_| AppError::Internal("table store lock poisoned".to_string()))
    }
}

#[async_trait]
impl TableClient for MemoryTableStore {
    async fn get_row(&self, partition_key: &str, row_key: &str) -> AppResult<Option<TableRow>> {
        let rows = self.lock()?;
        Ok(rows
            .get(&(partition_key.to_string(), row_key.to_string()))
            .cloned())
    }

    async fn query_rows(
        &self,
        partition_key: &str,
        filter: &JsonValue,
    ) -> AppResult<Vec<TableRow>> {
        let rows = self.lock()?;
        Ok(rows
            .iter()
            .filter(|((pk, _), row)| pk == partition_key && matches_filter(&row.data, filter))
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn submit_batch(&self, partition_key: &str, ops: Vec<BatchOperation>) -> AppResult<()> {
        let mut rows = self.lock()?;

        // Validate the whole batch before applying anything.
        for op in &ops {
            match op {
                BatchOperation::Insert(row) => {
                    if row.partition_key != partition_key {
                        return Err(AppError::PersistenceFailed(format!(
                            "batch operation outside partition {partition_key}"
                        )));
                    }
                    let key = (row.partition_key.clone(), row.row_key.clone());
                    if rows.contains_key(&key) {
                        return Err(AppError::PersistenceFailed(format!(
                            "row {} already exists in partition {partition_key}",
                            row.row_key
                        )));
                    }
                }
                BatchOperation::Replace { row, if_etag } => {
                    if row.partition_key != partition_key {
                        return Err(AppError::PersistenceFailed(format!(
                            "batch operation outside partition {partition_key}"
                        )));
                    }
                    let key = (row.partition_key.clone(), row.row_key.clone());
                    let Some(existing) = rows.get(&key) else {
                        return Err(AppError::PersistenceFailed(format!(
                            "row {} not found in partition {partition_key}",
                            row.row_key
                        )));
                    };
                    if let Some(expected) = if_etag
                        && existing.etag != *expected
                    {
                        return Err(AppError::Conflict(format!(
                            "etag mismatch on row {} (expected {expected}, found {})",
                            row.row_key, existing.etag
                        )));
                    }
                }
                BatchOperation::Delete { row_key } => {
                    let key = (partition_key.to_string(), row_key.clone());
                    if !rows.contains_key(&key) {
                        return Err(AppError::PersistenceFailed(format!(
                            "row {row_key} not found in partition {partition_key}"
                        )));
                    }
                }
            }
        }

        for op in ops {
            match op {
                BatchOperation::Insert(mut row) => {
                    row.etag = 0;
                    row.updated_at = Utc::now();
                    let key = (row.partition_key.clone(), row.row_key.clone());
                    rows.insert(key, row);
                }
                BatchOperation::Replace { mut row, .. } => {
                    let key = (row.partition_key.clone(), row.row_key.clone());
                    // Validated above.
                    let prior_etag = rows.get(&key).map_or(0, |r| r.etag);
                    row.etag = prior_etag + 1;
                    row.updated_at = Utc::now();
                    rows.insert(key, row);
                }
                BatchOperation::Delete { row_key } => {
                    rows.remove(&(partition_key.to_string(), row_key));
                }
            }
        }

        Ok(())
    }

    async fn delete_row(&self, partition_key: &str, row_key: &str) -> AppResult<bool> {
        let mut rows = self.lock()?;
        Ok(rows
            .remove(&(partition_key.to_string(), row_key.to_string()))
            .is_some())
    }
}
