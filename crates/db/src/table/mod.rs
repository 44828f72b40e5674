//! Partitioned table store abstraction.
//!
//! Rows are addressed by `(partition_key, row_key)` and carry their fields
//! as a JSON property bag. Batches submitted through
//! [`TableClient::submit_batch`] are atomic within a single partition; there
//! is no atomicity across partitions.

mod memory;
mod postgres;

pub use memory::MemoryTableStore;
pub use postgres::PgTableStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pollstar_common::AppResult;
use serde_json::Value as JsonValue;
use std::sync::Arc;

/// A single row in the table store.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Partition key; the atomic-transaction scope boundary.
    pub partition_key: String,
    /// Row key; unique within the partition.
    pub row_key: String,
    /// Row fields as a JSON object.
    pub data: JsonValue,
    /// Concurrency token, incremented on every replace.
    pub etag: i64,
    /// Last-write timestamp, maintained by the store.
    pub updated_at: DateTime<Utc>,
}

impl TableRow {
    /// Create a row that has not been persisted yet.
    #[must_use]
    pub fn new(
        partition_key: impl Into<String>,
        row_key: impl Into<String>,
        data: JsonValue,
    ) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            data,
            etag: 0,
            updated_at: Utc::now(),
        }
    }
}

/// One operation of a per-partition batch.
#[derive(Debug, Clone)]
pub enum BatchOperation {
    /// Insert a new row; fails if the row key already exists.
    Insert(TableRow),
    /// Replace an existing row; fails if the row key does not exist.
    ///
    /// With `if_etag` set, the replace only succeeds when the stored
    /// concurrency token matches and fails with a conflict otherwise. With
    /// `None` the replace is unconditional (last writer wins).
    Replace {
        /// The replacement row.
        row: TableRow,
        /// Required concurrency token, if the caller enforces one.
        if_etag: Option<i64>,
    },
    /// Delete an existing row; fails if the row key does not exist.
    Delete {
        /// Key of the row to remove.
        row_key: String,
    },
}

/// Client boundary of the table store.
///
/// Implementations are injected as an [`Arc<dyn TableClient>`]; connection
/// management, retries and timeouts are the implementation's concern.
#[async_trait]
pub trait TableClient: Send + Sync {
    /// Fetch a single row by identity.
    async fn get_row(&self, partition_key: &str, row_key: &str) -> AppResult<Option<TableRow>>;

    /// Query a partition for rows whose data contains every field of
    /// `filter` with an equal value. An empty filter object matches the
    /// whole partition. Results are ordered by row key.
    async fn query_rows(&self, partition_key: &str, filter: &JsonValue)
    -> AppResult<Vec<TableRow>>;

    /// Submit a batch of operations scoped to one partition.
    ///
    /// The batch is all-or-nothing: if any operation cannot be applied, no
    /// operation is applied and the whole batch fails.
    async fn submit_batch(&self, partition_key: &str, ops: Vec<BatchOperation>) -> AppResult<()>;

    /// Delete a single row by identity, outside any batch.
    ///
    /// Returns whether the row existed.
    async fn delete_row(&self, partition_key: &str, row_key: &str) -> AppResult<bool>;
}

/// Shared handle to a table store client.
pub type TableStoreHandle = Arc<dyn TableClient>;

/// Returns whether `data` contains every key of the `filter` object with an
/// equal value. Non-object filters match nothing.
#[must_use]
pub fn matches_filter(data: &JsonValue, filter: &JsonValue) -> bool {
    match (data.as_object(), filter.as_object()) {
        (Some(fields), Some(wanted)) => wanted.iter().all(|(k, v)| fields.get(k) == Some(v)),
        _ => false,
    }
}
