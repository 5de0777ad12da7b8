//! Integration tests for full sync cycles over injected stores and transports.

use inventory_client::{
    Error, InventoryService, KeyedStore, MemoryStore, SqliteStore, StoreError, SyncCoordinator,
    SyncFailure, Transport, SYNC_STATE_KEY,
};
use inventory_engine::{CollectionKind, PullRequest, PullResponse, SyncPhase, SyncState};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

// ============================================================================
// Test doubles
// ============================================================================

/// Memory store whose writes to one key fail while armed.
struct FailingStore {
    inner: MemoryStore,
    fail_key: &'static str,
    armed: AtomicBool,
}

impl FailingStore {
    fn failing_on(fail_key: &'static str) -> Self {
        Self {
            inner: MemoryStore::new(),
            fail_key,
            armed: AtomicBool::new(true),
        }
    }

    fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }
}

impl KeyedStore for FailingStore {
    async fn get(&self, name: &str) -> Result<Vec<Value>, StoreError> {
        self.inner.get(name).await
    }

    async fn set(&self, name: &str, records: Vec<Value>) -> Result<(), StoreError> {
        if name == self.fail_key && self.armed.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("write to {name} refused")));
        }
        self.inner.set(name, records).await
    }
}

/// Memory store whose reads of one key wait until released.
struct StallingStore {
    inner: MemoryStore,
    stall_key: &'static str,
    gate: Arc<Notify>,
}

impl StallingStore {
    fn stalling_on(stall_key: &'static str) -> Self {
        Self {
            inner: MemoryStore::new(),
            stall_key,
            gate: Arc::new(Notify::new()),
        }
    }
}

impl KeyedStore for StallingStore {
    async fn get(&self, name: &str) -> Result<Vec<Value>, StoreError> {
        if name == self.stall_key {
            self.gate.notified().await;
        }
        self.inner.get(name).await
    }

    async fn set(&self, name: &str, records: Vec<Value>) -> Result<(), StoreError> {
        self.inner.set(name, records).await
    }
}

/// Transport that answers a fixed body once released.
struct GatedTransport {
    body: Value,
    gate: Arc<Notify>,
    gated: bool,
}

impl GatedTransport {
    fn open(body: Value) -> Self {
        Self {
            body,
            gate: Arc::new(Notify::new()),
            gated: false,
        }
    }

    fn closed(body: Value) -> Self {
        Self {
            gated: true,
            ..Self::open(body)
        }
    }
}

impl Transport for GatedTransport {
    async fn pull(&self, _request: &PullRequest) -> Result<PullResponse, SyncFailure> {
        if self.gated {
            self.gate.notified().await;
        }
        PullResponse::from_value(self.body.clone()).map_err(SyncFailure::Protocol)
    }

    async fn push(&self, _collection: CollectionKind, records: Vec<Value>) -> Result<usize, SyncFailure> {
        Ok(records.len())
    }
}

fn server_body() -> Value {
    json!({
        "warehouseItems": [
            {"id": "i1", "name": "Drill", "count": 8, "reserved": ["p1"]},
            {"id": "i2", "name": "Saw", "count": 2}
        ],
        "projects": [
            {"id": "p1", "name": "Deck", "reserved": [{"itemId": "i1", "count": 2}]}
        ],
        "spots": [{"spotId": "s1", "description": "Shelf A", "reservedItems": ["i2"]}],
        "updatedTimestamps": {
            "warehouseItems": "1706745600000",
            "projects": "1706745600001",
            "spots": "1706745600002"
        }
    })
}

async fn wait_for(phases: &mut tokio::sync::watch::Receiver<SyncPhase>, wanted: SyncPhase) {
    phases
        .wait_for(|phase| *phase == wanted)
        .await
        .expect("coordinator dropped");
}

// ============================================================================
// Failure and retry
// ============================================================================

#[tokio::test]
async fn failure_before_token_write_keeps_state_and_retry_does_not_duplicate() {
    let store = FailingStore::failing_on(SYNC_STATE_KEY);
    let service = InventoryService::new(store);
    let sync = SyncCoordinator::new(
        service.clone(),
        GatedTransport::open(server_body()),
        Duration::from_secs(5),
    );

    let err = sync.sync().await.unwrap_err();
    assert!(matches!(err, Error::Sync(SyncFailure::Persist(_))));
    assert_eq!(sync.phase(), SyncPhase::Failed);
    assert_eq!(service.sync_state().await.unwrap(), SyncState::new());

    // Collections were written before the failure.
    let items = service.collection(CollectionKind::WarehouseItems).await.unwrap();
    assert_eq!(items.len(), 2);

    service.store().disarm();
    let report = sync.sync().await.unwrap();

    assert_eq!(sync.phase(), SyncPhase::Idle);
    assert_eq!(report.merged[&CollectionKind::WarehouseItems].updated, 2);
    assert_eq!(report.merged[&CollectionKind::WarehouseItems].inserted, 0);

    let items = service.collection(CollectionKind::WarehouseItems).await.unwrap();
    let projects = service.collection(CollectionKind::Projects).await.unwrap();
    let spots = service.collection(CollectionKind::Spots).await.unwrap();
    assert_eq!((items.len(), projects.len(), spots.len()), (2, 1, 1));

    let state = service.sync_state().await.unwrap();
    assert_eq!(state.token(CollectionKind::Projects), &json!("1706745600001"));
    assert_eq!(state.token(CollectionKind::History), &Value::Null);
    assert!(report.inconsistencies.is_empty());
}

#[tokio::test]
async fn failed_collection_write_aborts_cycle() {
    let store = FailingStore::failing_on("projects");
    let service = InventoryService::new(store);
    let sync = SyncCoordinator::new(
        service.clone(),
        GatedTransport::open(server_body()),
        Duration::from_secs(5),
    );

    assert!(sync.sync().await.is_err());
    assert_eq!(service.sync_state().await.unwrap(), SyncState::new());
    assert!(service.collection(CollectionKind::Spots).await.unwrap().is_empty());
}

// ============================================================================
// In-flight behaviour
// ============================================================================

#[tokio::test]
async fn second_trigger_is_rejected_while_requesting() {
    let transport = GatedTransport::closed(server_body());
    let gate = Arc::clone(&transport.gate);
    let sync = Arc::new(SyncCoordinator::new(
        InventoryService::new(MemoryStore::new()),
        transport,
        Duration::from_secs(5),
    ));
    let mut phases = sync.subscribe();

    let running = tokio::spawn({
        let sync = Arc::clone(&sync);
        async move { sync.sync().await }
    });
    wait_for(&mut phases, SyncPhase::Requesting).await;

    assert!(matches!(sync.sync().await, Err(Error::SyncInProgress)));

    gate.notify_one();
    let report = running.await.unwrap().unwrap();
    assert_eq!(report.merged.len(), 3);
    assert_eq!(sync.phase(), SyncPhase::Idle);
}

#[tokio::test]
async fn local_edits_proceed_during_request_and_survive_merge() {
    let transport = GatedTransport::closed(server_body());
    let gate = Arc::clone(&transport.gate);
    let service = InventoryService::new(MemoryStore::new());
    let sync = Arc::new(SyncCoordinator::new(
        service.clone(),
        transport,
        Duration::from_secs(5),
    ));
    let mut phases = sync.subscribe();

    let running = tokio::spawn({
        let sync = Arc::clone(&sync);
        async move { sync.sync().await }
    });
    wait_for(&mut phases, SyncPhase::Requesting).await;

    let local = service.create_item("Ladder", 4).await.unwrap();

    gate.notify_one();
    running.await.unwrap().unwrap();

    let items = service.collection(CollectionKind::WarehouseItems).await.unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["id"], json!(local.id));
}

#[tokio::test]
async fn cancel_fails_cycle_without_touching_state() {
    let transport = GatedTransport::closed(server_body());
    let service = InventoryService::new(MemoryStore::new());
    let sync = Arc::new(SyncCoordinator::new(
        service.clone(),
        transport,
        Duration::from_secs(5),
    ));
    let mut phases = sync.subscribe();

    let running = tokio::spawn({
        let sync = Arc::clone(&sync);
        async move { sync.sync().await }
    });
    wait_for(&mut phases, SyncPhase::Requesting).await;

    sync.cancel();
    let err = running.await.unwrap().unwrap_err();

    assert!(matches!(err, Error::Sync(SyncFailure::Cancelled)));
    assert_eq!(sync.phase(), SyncPhase::Failed);
    assert!(service.collection(CollectionKind::WarehouseItems).await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_before_request_is_sent_still_aborts() {
    let store = StallingStore::stalling_on(SYNC_STATE_KEY);
    let gate = Arc::clone(&store.gate);
    let service = InventoryService::new(store);
    let sync = Arc::new(SyncCoordinator::new(
        service.clone(),
        GatedTransport::open(server_body()),
        Duration::from_secs(5),
    ));
    let mut phases = sync.subscribe();

    let running = tokio::spawn({
        let sync = Arc::clone(&sync);
        async move { sync.sync().await }
    });
    wait_for(&mut phases, SyncPhase::Requesting).await;

    // The cycle is still reading its tokens; nothing waits on the network yet.
    sync.cancel();
    gate.notify_one();
    let err = running.await.unwrap().unwrap_err();

    assert!(matches!(err, Error::Sync(SyncFailure::Cancelled)));
    assert_eq!(sync.phase(), SyncPhase::Failed);
    assert!(service.store().inner.get("warehouseItems").await.unwrap().is_empty());
}

#[tokio::test]
async fn request_timeout_fails_cycle() {
    let sync = SyncCoordinator::new(
        InventoryService::new(MemoryStore::new()),
        GatedTransport::closed(server_body()),
        Duration::from_millis(20),
    );

    let err = sync.sync().await.unwrap_err();

    assert!(matches!(err, Error::Sync(SyncFailure::Timeout(_))));
    assert_eq!(sync.phase(), SyncPhase::Failed);
}

// ============================================================================
// Mistyped server records
// ============================================================================

#[tokio::test]
async fn mistyped_server_record_does_not_block_local_ledger() {
    let service = InventoryService::new(MemoryStore::new());
    let local = service.create_item("Ladder", 4).await.unwrap();
    let project = service.create_project("Deck").await.unwrap();
    let sync = SyncCoordinator::new(
        service.clone(),
        GatedTransport::open(json!({
            "warehouseItems": [
                {"id": "other", "description": null, "count": 3},
                {"id": "counted", "count": "5"},
                {"id": "i2", "name": "Saw", "count": 2}
            ],
            "updatedTimestamps": {"warehouseItems": "12"}
        })),
        Duration::from_secs(5),
    );

    let report = sync.sync().await.unwrap();

    let merged = &report.merged[&CollectionKind::WarehouseItems];
    assert_eq!(merged.inserted, 1);
    assert_eq!(merged.skipped.len(), 2);
    assert!(report.check_error.is_none());
    assert_eq!(
        service.sync_state().await.unwrap().token(CollectionKind::WarehouseItems),
        &json!("12")
    );

    let entry = service.reserve(&local.id, &project.id, 1).await.unwrap();
    assert_eq!(entry.count, 1);
    assert_eq!(service.capacity("i2").await.unwrap(), 2);
}

// ============================================================================
// SQLite-backed cycle
// ============================================================================

#[tokio::test]
async fn cycle_over_sqlite_then_local_reserve() {
    let store = SqliteStore::in_memory().await.unwrap();
    let service = InventoryService::new(store);
    let sync = SyncCoordinator::new(
        service.clone(),
        GatedTransport::open(server_body()),
        Duration::from_secs(5),
    );

    sync.sync().await.unwrap();

    service.reserve("i1", "p1", 3).await.unwrap();
    assert_eq!(service.capacity("i1").await.unwrap(), 10);

    let snapshot = service.snapshot().await.unwrap();
    assert_eq!(snapshot.items().unwrap()[0].count, 5);
    assert_eq!(snapshot.sync_state.token(CollectionKind::Spots), &json!("1706745600002"));
}
