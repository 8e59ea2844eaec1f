//! Shared fakes and helpers for controller integration tests.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use arbor_controller::{
    AppStorage, Controller, MemoryAppStorage, MemoryEventBus, ReadOnlyClient, Reconciler,
};
use arbor_core::error::{AppError, ErrorKind};
use arbor_core::result::AppResult;
use arbor_core::types::DirectoryId;
use arbor_entity::directory::{
    Directory, DirectoryEvent, DirectoryFetch, DirectoryList, DirectoryMetadata, EventType,
};

/// In-memory stand-in for the authoritative directory service.
#[derive(Debug, Default)]
pub struct FakeDirectoryService {
    directories: DashMap<DirectoryId, Directory>,
}

impl FakeDirectoryService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create a root directory.
    pub fn create_root(&self, name: &str) -> Directory {
        self.insert_new(name, None)
    }

    /// Create a directory under a parent.
    pub fn create_directory(&self, name: &str, parent: DirectoryId) -> Directory {
        self.insert_new(name, Some(parent))
    }

    /// Soft-delete a directory, returning its updated state.
    pub fn delete_directory(&self, id: DirectoryId) -> Directory {
        let mut entry = self
            .directories
            .get_mut(&id)
            .expect("directory exists in fake service");
        entry.deleted_at = Some(Utc::now());
        entry.clone()
    }

    /// Insert a directory verbatim, replacing any previous state.
    pub fn insert(&self, directory: Directory) {
        self.directories.insert(directory.id, directory);
    }

    fn insert_new(&self, name: &str, parent_id: Option<DirectoryId>) -> Directory {
        let now = Utc::now();
        let directory = Directory {
            id: DirectoryId::new(),
            name: name.to_string(),
            metadata: DirectoryMetadata::new(),
            parent_id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.directories.insert(directory.id, directory.clone());
        directory
    }
}

#[async_trait]
impl ReadOnlyClient for FakeDirectoryService {
    async fn get_directory(&self, id: DirectoryId) -> AppResult<DirectoryFetch> {
        self.directories
            .get(&id)
            .map(|d| DirectoryFetch::new(d.clone()))
            .ok_or_else(|| AppError::directory_not_found(format!("directory {id} not found")))
    }

    async fn get_children(&self, id: DirectoryId) -> AppResult<DirectoryList> {
        let children = self
            .directories
            .iter()
            .filter(|entry| entry.parent_id == Some(id) && entry.deleted_at.is_none())
            .map(|entry| entry.id)
            .collect();
        Ok(DirectoryList::new(children))
    }
}

/// Reconciler that records every event it is handed.
#[derive(Debug, Default)]
pub struct RecordingReconciler {
    calls: AtomicU32,
    events: Mutex<Vec<DirectoryEvent>>,
}

impl RecordingReconciler {
    pub fn reconcile_calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Drain and return the recorded events.
    pub fn pop_events(&self) -> Vec<DirectoryEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }

    /// Wait until at least `count` reconcile calls have happened.
    pub async fn wait_for_calls(&self, count: u32) {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if self.reconcile_calls() >= count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("timed out waiting for reconcile calls");
    }
}

#[async_trait]
impl Reconciler for RecordingReconciler {
    async fn reconcile(&self, event: DirectoryEvent) -> AppResult<()> {
        self.events.lock().unwrap().push(event);
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A running controller plus handles to everything around it.
pub struct TestApp {
    pub bus: MemoryEventBus,
    pub store: Arc<MemoryAppStorage>,
    pub reconciler: Arc<RecordingReconciler>,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<AppResult<()>>,
}

impl TestApp {
    /// Start a controller over `base_dir` with the given full-reconcile
    /// interval parameters.
    pub async fn start(
        service: Arc<FakeDirectoryService>,
        base_dir: DirectoryId,
        min: u32,
        max: u32,
        unit: Duration,
    ) -> Self {
        let bus = MemoryEventBus::new(64);
        let store = Arc::new(MemoryAppStorage::new());
        let reconciler = Arc::new(RecordingReconciler::default());

        let controller = Controller::builder(base_dir)
            .with_client(service)
            .with_watcher(Arc::new(bus.watcher()))
            .with_storage(Arc::clone(&store) as Arc<dyn AppStorage>)
            .with_reconciler(Arc::clone(&reconciler) as Arc<dyn Reconciler>)
            .with_full_reconcile_interval(min, max, unit)
            .build()
            .expect("controller builds");

        let (cancel, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { controller.run(cancel_rx).await });

        Self {
            bus,
            store,
            reconciler,
            cancel,
            handle,
        }
    }

    /// Start with intervals long enough that no tick fires during a test.
    pub async fn start_without_ticks(
        service: Arc<FakeDirectoryService>,
        base_dir: DirectoryId,
    ) -> Self {
        Self::start(service, base_dir, 5, 10, Duration::from_secs(60)).await
    }

    /// Publish an event as the notifier would.
    pub fn publish(&self, event_type: EventType, directory: Directory) {
        self.bus.publish(DirectoryEvent::new(event_type, directory));
    }

    /// Whether the controller's mirror tracks the given directory.
    pub async fn is_tracked(&self, id: DirectoryId) -> bool {
        self.store
            .is_directory_tracked(id)
            .await
            .expect("memory storage is infallible")
    }

    /// Wait for the controller task to finish on its own and return its
    /// result.
    pub async fn into_result(self) -> AppResult<()> {
        self.handle.await.expect("controller task joins")
    }

    /// Stop the controller and assert it exited with the cancellation
    /// cause.
    pub async fn shutdown(self) {
        self.cancel.send(true).expect("controller still running");
        let result = self.handle.await.expect("controller task joins");
        let err = result.expect_err("run returns the cancellation cause");
        assert_eq!(err.kind, ErrorKind::Cancelled);
    }
}
