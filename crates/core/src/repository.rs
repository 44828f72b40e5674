//! Poll repository: the reconciliation engine.
//!
//! Translates an aggregate's in-memory delta (its tracking states) into the
//! minimal set of table-store operations, submitted as one atomic batch per
//! partition. The poll row lives in the fixed `"poll"` partition; a poll's
//! option rows live in a partition named after the poll id, so the poll row
//! and its options are separate atomic scopes.

use pollstar_common::{AppError, AppResult};
use pollstar_db::table::TableStoreHandle;
use pollstar_db::{BatchOperation, TableRow};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Poll, PollOption};
use crate::tracking::TrackingState;

/// Partition holding every poll row.
pub const POLL_PARTITION: &str = "poll";

/// Persisted shape of a poll row's property bag.
#[derive(Debug, Serialize, Deserialize)]
struct PollRow {
    session_id: Uuid,
    name: String,
    description: Option<String>,
    display_order: i32,
    is_active: bool,
}

/// Persisted shape of an option row's property bag.
#[derive(Debug, Serialize, Deserialize)]
struct PollOptionRow {
    name: String,
    description: Option<String>,
    display_order: i32,
}

/// Repository over the partitioned table store.
#[derive(Clone)]
pub struct PollRepository {
    store: TableStoreHandle,
}

impl PollRepository {
    /// Create a new repository over an injected store client.
    #[must_use]
    pub fn new(store: TableStoreHandle) -> Self {
        Self { store }
    }

    /// List a session's polls, ordered by display order ascending with
    /// stable ties. Options are not populated for list views.
    pub async fn get_list(&self, session_id: Uuid) -> AppResult<Vec<Poll>> {
        let rows = self
            .store
            .query_rows(POLL_PARTITION, &json!({ "session_id": session_id }))
            .await?;

        let mut polls = rows
            .iter()
            .map(|row| parse_poll(row, Vec::new()))
            .collect::<AppResult<Vec<_>>>()?;
        polls.sort_by_key(Poll::display_order);
        Ok(polls)
    }

    /// Load the session's active poll with its options, if any.
    pub async fn get_active(&self, session_id: Uuid) -> AppResult<Option<Poll>> {
        let rows = self
            .store
            .query_rows(
                POLL_PARTITION,
                &json!({ "session_id": session_id, "is_active": true }),
            )
            .await?;

        let Some(row) = rows.first() else {
            return Ok(None);
        };
        let options = self.load_options(&row.row_key).await?;
        parse_poll(row, options).map(Some)
    }

    /// Load one poll with its options.
    pub async fn get(&self, poll_id: Uuid) -> AppResult<Poll> {
        let options = self.load_options(&poll_id.to_string()).await?;

        let row = self
            .store
            .get_row(POLL_PARTITION, &poll_id.to_string())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Poll not found: {poll_id}")))?;

        parse_poll(&row, options)
    }

    /// Create path: persist a `New` aggregate as one poll-row insert plus
    /// one insert per option, the option inserts as a single atomic batch.
    pub async fn create(&self, poll: &Poll) -> AppResult<()> {
        if poll.state() != TrackingState::New {
            return Err(AppError::PersistenceFailed(format!(
                "create requires a new aggregate, poll {} is {:?}",
                poll.id(),
                poll.state()
            )));
        }

        self.store
            .submit_batch(
                POLL_PARTITION,
                vec![BatchOperation::Insert(poll_row(poll)?)],
            )
            .await?;

        // Every option of a new aggregate is implicitly new, whatever its
        // own state says.
        let partition = poll.id().to_string();
        let ops: Vec<BatchOperation> = poll
            .options()
            .iter()
            .map(|option| Ok(BatchOperation::Insert(option_row(&partition, option)?)))
            .collect::<AppResult<_>>()?;

        debug!(poll_id = %poll.id(), options = ops.len(), "Creating poll");
        if !ops.is_empty() {
            self.store.submit_batch(&partition, ops).await?;
        }
        Ok(())
    }

    /// Update path: replace the poll row only when the poll itself is
    /// `Modified`, then queue insert/replace/delete per option by tracking
    /// state. An empty option queue is still a success.
    pub async fn update(&self, poll: &Poll) -> AppResult<()> {
        if !matches!(
            poll.state(),
            TrackingState::Touched | TrackingState::Modified
        ) {
            return Err(AppError::PersistenceFailed(format!(
                "update requires a touched or modified aggregate, poll {} is {:?}",
                poll.id(),
                poll.state()
            )));
        }

        if poll.state() == TrackingState::Modified {
            // Unconditional replace: last writer wins.
            self.store
                .submit_batch(
                    POLL_PARTITION,
                    vec![BatchOperation::Replace {
                        row: poll_row(poll)?,
                        if_etag: None,
                    }],
                )
                .await?;
        }

        let partition = poll.id().to_string();
        let mut ops = Vec::new();
        for option in poll.options() {
            match option.state() {
                TrackingState::New => {
                    ops.push(BatchOperation::Insert(option_row(&partition, option)?));
                }
                TrackingState::Modified => {
                    ops.push(BatchOperation::Replace {
                        row: option_row(&partition, option)?,
                        if_etag: None,
                    });
                }
                TrackingState::Deleted => {
                    ops.push(BatchOperation::Delete {
                        row_key: option.id().to_string(),
                    });
                }
                TrackingState::Pristine | TrackingState::Touched => {}
            }
        }

        debug!(poll_id = %poll.id(), ops = ops.len(), "Updating poll");
        if !ops.is_empty() {
            self.store.submit_batch(&partition, ops).await?;
        }
        Ok(())
    }

    /// Delete path: unconditional row delete by identity. Returns whether
    /// the row existed. Option rows are not touched, matching the store's
    /// single-row delete semantics; orphaned option partitions are a known
    /// cleanup concern.
    pub async fn delete(&self, poll_id: Uuid) -> AppResult<bool> {
        self.store
            .delete_row(POLL_PARTITION, &poll_id.to_string())
            .await
    }

    /// Flip every active poll of the session to inactive as one batch.
    /// Zero matches is a successful no-op. `except` keeps the poll about to
    /// be activated out of the batch, so re-activating the already-active
    /// poll is a zero-entry no-op instead of a flip it would then have to
    /// undo.
    pub async fn deactivate_all(&self, session_id: Uuid, except: Option<Uuid>) -> AppResult<()> {
        let rows = self
            .store
            .query_rows(
                POLL_PARTITION,
                &json!({ "session_id": session_id, "is_active": true }),
            )
            .await?;

        let keep = except.map(|id| id.to_string());
        let ops: Vec<BatchOperation> = rows
            .into_iter()
            .filter(|row| keep.as_deref() != Some(row.row_key.as_str()))
            .map(|mut row| {
                row.data["is_active"] = json!(false);
                BatchOperation::Replace { row, if_etag: None }
            })
            .collect();

        debug!(%session_id, deactivated = ops.len(), "Deactivating session polls");
        if !ops.is_empty() {
            self.store.submit_batch(POLL_PARTITION, ops).await?;
        }
        Ok(())
    }

    async fn load_options(&self, poll_partition: &str) -> AppResult<Vec<PollOption>> {
        let rows = self.store.query_rows(poll_partition, &json!({})).await?;
        rows.iter().map(parse_option).collect()
    }
}

fn poll_row(poll: &Poll) -> AppResult<TableRow> {
    let fields = PollRow {
        session_id: poll.session_id(),
        name: poll.name().to_string(),
        description: poll.description().map(ToString::to_string),
        display_order: poll.display_order(),
        is_active: poll.is_active(),
    };
    let data = serde_json::to_value(&fields)
        .map_err(|e| AppError::Internal(format!("poll row serialization failed: {e}")))?;
    Ok(TableRow::new(POLL_PARTITION, poll.id().to_string(), data))
}

fn option_row(partition: &str, option: &PollOption) -> AppResult<TableRow> {
    let fields = PollOptionRow {
        name: option.name().to_string(),
        description: option.description().map(ToString::to_string),
        display_order: option.display_order(),
    };
    let data = serde_json::to_value(&fields)
        .map_err(|e| AppError::Internal(format!("option row serialization failed: {e}")))?;
    Ok(TableRow::new(partition, option.id().to_string(), data))
}

fn parse_poll(row: &TableRow, options: Vec<PollOption>) -> AppResult<Poll> {
    let id = Uuid::parse_str(&row.row_key)
        .map_err(|e| AppError::Database(format!("invalid poll row key {}: {e}", row.row_key)))?;
    let fields: PollRow = serde_json::from_value(row.data.clone())
        .map_err(|e| AppError::Database(format!("malformed poll row {}: {e}", row.row_key)))?;
    Ok(Poll::hydrate(
        id,
        fields.session_id,
        fields.name,
        fields.description,
        fields.display_order,
        options,
        fields.is_active,
    ))
}

fn parse_option(row: &TableRow) -> AppResult<PollOption> {
    let id = Uuid::parse_str(&row.row_key)
        .map_err(|e| AppError::Database(format!("invalid option row key {}: {e}", row.row_key)))?;
    let fields: PollOptionRow = serde_json::from_value(row.data.clone())
        .map_err(|e| AppError::Database(format!("malformed option row {}: {e}", row.row_key)))?;
    Ok(PollOption::hydrate(
        id,
        fields.name,
        fields.description,
        fields.display_order,
    ))
}
