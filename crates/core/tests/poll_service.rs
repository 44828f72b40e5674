//! End-to-end service tests over the in-memory table store.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pollstar_common::{AppError, AppResult};
use pollstar_core::repository::{POLL_PARTITION, PollRepository};
use pollstar_core::services::{
    CreateOptionInput, CreatePollInput, EventPublisher, PollDetail, PollService, UpdateOptionInput,
    UpdatePollInput,
};
use pollstar_db::table::TableStoreHandle;
use pollstar_db::{BatchOperation, MemoryTableStore, TableClient, TableRow};
use serde_json::{Value as JsonValue, json};
use uuid::Uuid;

/// Compact description of one batch operation, for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Insert(String),
    Replace(String),
    Delete(String),
}

/// A store wrapper that records every submitted batch.
struct RecordingStore {
    inner: MemoryTableStore,
    batches: Mutex<Vec<(String, Vec<Op>)>>,
}

impl RecordingStore {
    fn new() -> Self {
        Self {
            inner: MemoryTableStore::new(),
            batches: Mutex::new(Vec::new()),
        }
    }

    fn batches(&self) -> Vec<(String, Vec<Op>)> {
        self.batches.lock().unwrap().clone()
    }

    fn batches_for(&self, partition: &str) -> Vec<Vec<Op>> {
        self.batches()
            .into_iter()
            .filter(|(pk, _)| pk == partition)
            .map(|(_, ops)| ops)
            .collect()
    }

    fn clear(&self) {
        self.batches.lock().unwrap().clear();
    }
}

#[async_trait]
impl TableClient for RecordingStore {
    async fn get_row(&self, partition_key: &str, row_key: &str) -> AppResult<Option<TableRow>> {
        self.inner.get_row(partition_key, row_key).await
    }

    async fn query_rows(
        &self,
        partition_key: &str,
        filter: &JsonValue,
    ) -> AppResult<Vec<TableRow>> {
        self.inner.query_rows(partition_key, filter).await
    }

    async fn submit_batch(&self, partition_key: &str, ops: Vec<BatchOperation>) -> AppResult<()> {
        let recorded = ops
            .iter()
            .map(|op| match op {
                BatchOperation::Insert(row) => Op::Insert(row.row_key.clone()),
                BatchOperation::Replace { row, .. } => Op::Replace(row.row_key.clone()),
                BatchOperation::Delete { row_key } => Op::Delete(row_key.clone()),
            })
            .collect();
        self.batches
            .lock()
            .unwrap()
            .push((partition_key.to_string(), recorded));
        self.inner.submit_batch(partition_key, ops).await
    }

    async fn delete_row(&self, partition_key: &str, row_key: &str) -> AppResult<bool> {
        self.inner.delete_row(partition_key, row_key).await
    }
}

/// A publisher that captures every emitted event.
#[derive(Default)]
struct CapturingPublisher {
    events: Mutex<Vec<(Uuid, PollDetail)>>,
}

#[async_trait]
impl EventPublisher for CapturingPublisher {
    async fn publish_poll_activated(&self, session_id: Uuid, poll: &PollDetail) -> AppResult<()> {
        self.events.lock().unwrap().push((session_id, poll.clone()));
        Ok(())
    }
}

fn service(
    store: Arc<RecordingStore>,
    publisher: Arc<CapturingPublisher>,
) -> PollService {
    let handle: TableStoreHandle = store;
    PollService::new(PollRepository::new(handle), publisher)
}

fn create_input(session_id: Uuid, name: &str, options: &[&str]) -> CreatePollInput {
    CreatePollInput {
        session_id,
        name: name.to_string(),
        description: None,
        options: options
            .iter()
            .map(|o| CreateOptionInput {
                name: (*o).to_string(),
                description: None,
            })
            .collect(),
    }
}

#[tokio::test]
async fn create_submits_one_poll_insert_and_n_option_inserts() {
    let store = Arc::new(RecordingStore::new());
    let svc = service(store.clone(), Arc::new(CapturingPublisher::default()));
    let session_id = Uuid::new_v4();

    let detail = svc
        .create_poll(create_input(session_id, "Lunch?", &["Pizza", "Sushi"]))
        .await
        .unwrap();

    let poll_batches = store.batches_for(POLL_PARTITION);
    assert_eq!(poll_batches.len(), 1);
    assert_eq!(poll_batches[0], vec![Op::Insert(detail.id.to_string())]);

    let option_batches = store.batches_for(&detail.id.to_string());
    assert_eq!(option_batches.len(), 1);
    assert_eq!(option_batches[0].len(), 2);
    assert!(option_batches[0].iter().all(|op| matches!(op, Op::Insert(_))));

    assert_eq!(detail.options.len(), 2);
    assert_eq!(detail.options[0].name, "Pizza");
    assert_eq!(detail.options[0].display_order, 0);
    assert_eq!(detail.options[1].display_order, 1);
}

#[tokio::test]
async fn create_with_zero_options_succeeds() {
    let store = Arc::new(RecordingStore::new());
    let svc = service(store.clone(), Arc::new(CapturingPublisher::default()));

    let detail = svc
        .create_poll(create_input(Uuid::new_v4(), "Empty?", &[]))
        .await
        .unwrap();

    assert!(detail.options.is_empty());
    // Only the poll-row batch; no empty option batch was submitted.
    assert_eq!(store.batches().len(), 1);

    let fetched = svc.get_poll(detail.id).await.unwrap();
    assert!(fetched.options.is_empty());
}

#[tokio::test]
async fn create_with_empty_name_fails_before_any_write() {
    let store = Arc::new(RecordingStore::new());
    let svc = service(store.clone(), Arc::new(CapturingPublisher::default()));

    let err = svc
        .create_poll(create_input(Uuid::new_v4(), "  ", &["A"]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(store.batches().is_empty());
}

#[tokio::test]
async fn update_renaming_one_option_and_omitting_another_replaces_and_deletes() {
    let store = Arc::new(RecordingStore::new());
    let svc = service(store.clone(), Arc::new(CapturingPublisher::default()));
    let session_id = Uuid::new_v4();

    let created = svc
        .create_poll(create_input(session_id, "Q", &["A", "B"]))
        .await
        .unwrap();
    let option_a = created.options[0].id;
    let option_b = created.options[1].id;
    store.clear();

    let updated = svc
        .update_poll(
            created.id,
            UpdatePollInput {
                name: "Q".to_string(),
                description: None,
                options: vec![UpdateOptionInput {
                    id: Some(option_a),
                    name: "A renamed".to_string(),
                    description: None,
                }],
            },
        )
        .await
        .unwrap();

    // Exactly one option batch: one replace (A) and one delete (B), no
    // inserts. The poll itself was only touched, so no poll-row batch.
    let batches = store.batches();
    assert_eq!(batches.len(), 1);
    let (partition, ops) = &batches[0];
    assert_eq!(partition, &created.id.to_string());
    assert_eq!(ops.len(), 2);
    assert!(ops.contains(&Op::Replace(option_a.to_string())));
    assert!(ops.contains(&Op::Delete(option_b.to_string())));

    assert_eq!(updated.options.len(), 1);
    assert_eq!(updated.options[0].name, "A renamed");

    let fetched = svc.get_poll(created.id).await.unwrap();
    assert_eq!(fetched.options.len(), 1);
    assert_eq!(fetched.options[0].name, "A renamed");
}

#[tokio::test]
async fn update_with_addition_keeps_referenced_option_and_inserts_new() {
    let store = Arc::new(RecordingStore::new());
    let svc = service(store.clone(), Arc::new(CapturingPublisher::default()));

    let created = svc
        .create_poll(create_input(Uuid::new_v4(), "Q", &["A"]))
        .await
        .unwrap();
    let option_a = created.options[0].id;
    store.clear();

    let updated = svc
        .update_poll(
            created.id,
            UpdatePollInput {
                name: "Q".to_string(),
                description: None,
                options: vec![
                    // A unchanged, but referenced by id: touched, not deleted.
                    UpdateOptionInput {
                        id: Some(option_a),
                        name: "A".to_string(),
                        description: None,
                    },
                    UpdateOptionInput {
                        id: None,
                        name: "C".to_string(),
                        description: None,
                    },
                ],
            },
        )
        .await
        .unwrap();

    let batches = store.batches_for(&created.id.to_string());
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 1, "zero ops for A, one insert for C");
    assert!(matches!(&batches[0][0], Op::Insert(key) if *key != option_a.to_string()));

    let names: Vec<&str> = updated.options.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["A", "C"]);
}

#[tokio::test]
async fn update_omitting_every_loaded_option_deletes_them_all() {
    // The documented, possibly surprising behavior: loaded options the
    // payload never references are removed.
    let store = Arc::new(RecordingStore::new());
    let svc = service(store.clone(), Arc::new(CapturingPublisher::default()));

    let created = svc
        .create_poll(create_input(Uuid::new_v4(), "Q", &["A", "B"]))
        .await
        .unwrap();
    store.clear();

    let updated = svc
        .update_poll(
            created.id,
            UpdatePollInput {
                name: "Q".to_string(),
                description: None,
                options: vec![UpdateOptionInput {
                    id: None,
                    name: "C".to_string(),
                    description: None,
                }],
            },
        )
        .await
        .unwrap();

    let batches = store.batches_for(&created.id.to_string());
    assert_eq!(batches.len(), 1);
    let deletes = batches[0].iter().filter(|op| matches!(op, Op::Delete(_))).count();
    let inserts = batches[0].iter().filter(|op| matches!(op, Op::Insert(_))).count();
    assert_eq!(deletes, 2);
    assert_eq!(inserts, 1);

    let names: Vec<&str> = updated.options.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["C"]);
}

#[tokio::test]
async fn update_missing_poll_is_not_found() {
    let store = Arc::new(RecordingStore::new());
    let svc = service(store, Arc::new(CapturingPublisher::default()));

    let err = svc
        .update_poll(
            Uuid::new_v4(),
            UpdatePollInput {
                name: "Q".to_string(),
                description: None,
                options: vec![],
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn activation_deactivates_previous_and_notifies_once() {
    let store = Arc::new(RecordingStore::new());
    let publisher = Arc::new(CapturingPublisher::default());
    let svc = service(store.clone(), publisher.clone());
    let session_id = Uuid::new_v4();

    let p1 = svc
        .create_poll(create_input(session_id, "First", &["A"]))
        .await
        .unwrap();
    let p2 = svc
        .create_poll(create_input(session_id, "Second", &["B"]))
        .await
        .unwrap();

    svc.activate_poll(p1.id).await.unwrap();
    store.clear();
    publisher.events.lock().unwrap().clear();

    let activated = svc.activate_poll(p2.id).await.unwrap();
    assert!(activated.is_active);

    // One deactivate batch with exactly one entry (P1), then P2's replace.
    let poll_batches = store.batches_for(POLL_PARTITION);
    assert_eq!(poll_batches.len(), 2);
    assert_eq!(poll_batches[0], vec![Op::Replace(p1.id.to_string())]);
    assert_eq!(poll_batches[1], vec![Op::Replace(p2.id.to_string())]);

    let events = publisher.events.lock().unwrap().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, session_id);
    assert_eq!(events[0].1.id, p2.id);
    assert!(events[0].1.is_active);

    let active = svc.get_active_poll(session_id).await.unwrap().unwrap();
    assert_eq!(active.id, p2.id);
}

#[tokio::test]
async fn activating_already_active_poll_is_a_harmless_no_op() {
    let store = Arc::new(RecordingStore::new());
    let publisher = Arc::new(CapturingPublisher::default());
    let svc = service(store.clone(), publisher.clone());
    let session_id = Uuid::new_v4();

    let poll = svc
        .create_poll(create_input(session_id, "Only", &["A"]))
        .await
        .unwrap();
    svc.activate_poll(poll.id).await.unwrap();
    store.clear();

    let again = svc.activate_poll(poll.id).await.unwrap();
    assert!(again.is_active);

    // Zero-entry deactivate batch (not submitted) and a redundant update
    // that queued no operations: no poll-partition batches at all.
    assert!(store.batches_for(POLL_PARTITION).is_empty());

    let active = svc.get_active_poll(session_id).await.unwrap().unwrap();
    assert_eq!(active.id, poll.id);
}

#[tokio::test]
async fn activating_missing_poll_is_not_found() {
    let store = Arc::new(RecordingStore::new());
    let publisher = Arc::new(CapturingPublisher::default());
    let svc = service(store, publisher.clone());

    let err = svc.activate_poll(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(publisher.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn listing_orders_by_display_order_with_stable_ties() {
    let store = Arc::new(RecordingStore::new());
    let svc = service(store.clone(), Arc::new(CapturingPublisher::default()));
    let session_id = Uuid::new_v4();

    // Seed rows with explicit display orders [3, 1, 2] directly.
    let mut ops = Vec::new();
    for (name, order) in [("third", 3), ("first", 1), ("second", 2)] {
        ops.push(BatchOperation::Insert(TableRow::new(
            POLL_PARTITION,
            Uuid::new_v4().to_string(),
            json!({
                "session_id": session_id,
                "name": name,
                "description": null,
                "display_order": order,
                "is_active": false,
            }),
        )));
    }
    store.submit_batch(POLL_PARTITION, ops).await.unwrap();

    let listed = svc.list_polls(session_id).await.unwrap();
    let names: Vec<&str> = listed.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn listing_does_not_leak_other_sessions() {
    let store = Arc::new(RecordingStore::new());
    let svc = service(store, Arc::new(CapturingPublisher::default()));
    let session_a = Uuid::new_v4();
    let session_b = Uuid::new_v4();

    svc.create_poll(create_input(session_a, "A", &[])).await.unwrap();
    svc.create_poll(create_input(session_b, "B", &[])).await.unwrap();

    let listed = svc.list_polls(session_a).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "A");
}

#[tokio::test]
async fn get_active_is_none_without_activation() {
    let store = Arc::new(RecordingStore::new());
    let svc = service(store, Arc::new(CapturingPublisher::default()));
    let session_id = Uuid::new_v4();

    svc.create_poll(create_input(session_id, "Q", &["A"]))
        .await
        .unwrap();
    assert!(svc.get_active_poll(session_id).await.unwrap().is_none());
}

#[tokio::test]
async fn deleting_missing_poll_returns_false_repeatedly() {
    let store = Arc::new(RecordingStore::new());
    let svc = service(store, Arc::new(CapturingPublisher::default()));
    let poll_id = Uuid::new_v4();

    assert!(!svc.delete_poll(poll_id).await.unwrap());
    assert!(!svc.delete_poll(poll_id).await.unwrap());
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let store = Arc::new(RecordingStore::new());
    let svc = service(store, Arc::new(CapturingPublisher::default()));

    let created = svc
        .create_poll(create_input(Uuid::new_v4(), "Q", &["A"]))
        .await
        .unwrap();
    assert!(svc.delete_poll(created.id).await.unwrap());

    let err = svc.get_poll(created.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
