//! `PostgreSQL`-backed table store.
//!
//! Rows live in a single `polls` table keyed by `(partition_key, row_key)`
//! with the property bag in a `jsonb` column. A batch maps to one SQL
//! transaction, which gives the per-partition all-or-nothing guarantee.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use pollstar_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait, sea_query::Expr,
};
use serde_json::Value as JsonValue;

use super::{BatchOperation, TableClient, TableRow};
use crate::entities::row;

/// A [`TableClient`] over a `PostgreSQL` connection.
#[derive(Clone)]
pub struct PgTableStore {
    db: Arc<DatabaseConnection>,
}

impl PgTableStore {
    /// Create a new store over an established connection.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl From<row::Model> for TableRow {
    fn from(model: row::Model) -> Self {
        Self {
            partition_key: model.partition_key,
            row_key: model.row_key,
            data: model.data,
            etag: model.etag,
            updated_at: model.updated_at.to_utc(),
        }
    }
}

fn unwrap_txn_err(err: TransactionError<AppError>) -> AppError {
    match err {
        TransactionError::Connection(db) => AppError::Database(db.to_string()),
        TransactionError::Transaction(app) => app,
    }
}

#[async_trait]
impl TableClient for PgTableStore {
    async fn get_row(&self, partition_key: &str, row_key: &str) -> AppResult<Option<TableRow>> {
        row::Entity::find_by_id((partition_key.to_string(), row_key.to_string()))
            .one(self.db.as_ref())
            .await
            .map(|found| found.map(TableRow::from))
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn query_rows(
        &self,
        partition_key: &str,
        filter: &JsonValue,
    ) -> AppResult<Vec<TableRow>> {
        let mut query = row::Entity::find()
            .filter(row::Column::PartitionKey.eq(partition_key))
            .order_by_asc(row::Column::RowKey);

        // Empty filter object means the whole partition; anything else is a
        // jsonb containment check.
        if filter.as_object().is_some_and(|fields| !fields.is_empty()) {
            query = query.filter(Expr::cust_with_values("data @> $1", [filter.clone()]));
        }

        query
            .all(self.db.as_ref())
            .await
            .map(|models| models.into_iter().map(TableRow::from).collect())
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn submit_batch(&self, partition_key: &str, ops: Vec<BatchOperation>) -> AppResult<()> {
        let partition = partition_key.to_string();

        self.db
            .transaction::<_, (), AppError>(move |txn| {
                Box::pin(async move {
                    for op in ops {
                        match op {
                            BatchOperation::Insert(table_row) => {
                                if table_row.partition_key != partition {
                                    return Err(AppError::PersistenceFailed(format!(
                                        "batch operation outside partition {partition}"
                                    )));
                                }
                                let active = row::ActiveModel {
                                    partition_key: Set(table_row.partition_key),
                                    row_key: Set(table_row.row_key),
                                    data: Set(table_row.data),
                                    etag: Set(0),
                                    updated_at: Set(Utc::now().into()),
                                };
                                active.insert(txn).await.map_err(|e| {
                                    AppError::PersistenceFailed(format!(
                                        "insert in partition {partition} failed: {e}"
                                    ))
                                })?;
                            }
                            BatchOperation::Replace { row: table_row, if_etag } => {
                                if table_row.partition_key != partition {
                                    return Err(AppError::PersistenceFailed(format!(
                                        "batch operation outside partition {partition}"
                                    )));
                                }
                                let existing = row::Entity::find_by_id((
                                    table_row.partition_key.clone(),
                                    table_row.row_key.clone(),
                                ))
                                .one(txn)
                                .await
                                .map_err(|e| AppError::Database(e.to_string()))?
                                .ok_or_else(|| {
                                    AppError::PersistenceFailed(format!(
                                        "row {} not found in partition {partition}",
                                        table_row.row_key
                                    ))
                                })?;

                                if let Some(expected) = if_etag
                                    && existing.etag != expected
                                {
                                    return Err(AppError::Conflict(format!(
                                        "etag mismatch on row {} (expected {expected}, found {})",
                                        table_row.row_key, existing.etag
                                    )));
                                }

                                let next_etag = existing.etag + 1;
                                let mut active: row::ActiveModel = existing.into();
                                active.data = Set(table_row.data);
                                active.etag = Set(next_etag);
                                active.updated_at = Set(Utc::now().into());
                                active.update(txn).await.map_err(|e| {
                                    AppError::PersistenceFailed(format!(
                                        "replace in partition {partition} failed: {e}"
                                    ))
                                })?;
                            }
                            BatchOperation::Delete { row_key } => {
                                let result = row::Entity::delete_by_id((
                                    partition.clone(),
                                    row_key.clone(),
                                ))
                                .exec(txn)
                                .await
                                .map_err(|e| AppError::Database(e.to_string()))?;

                                if result.rows_affected == 0 {
                                    return Err(AppError::PersistenceFailed(format!(
                                        "row {row_key} not found in partition {partition}"
                                    )));
                                }
                            }
                        }
                    }
                    Ok(())
                })
            })
            .await
            .map_err(unwrap_txn_err)
    }

    async fn delete_row(&self, partition_key: &str, row_key: &str) -> AppResult<bool> {
        let result =
            row::Entity::delete_by_id((partition_key.to_string(), row_key.to_string()))
                .exec(self.db.as_ref())
                .await
                .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }
}
