//! End-to-end controller scenarios against in-memory collaborators.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use arbor_controller::{Controller, Reconciler, Watcher};
use arbor_core::error::{AppError, ErrorKind};
use arbor_core::result::AppResult;
use arbor_core::types::DirectoryId;
use arbor_entity::directory::{Directory, DirectoryEvent, EventType};

use crate::helpers::{FakeDirectoryService, RecordingReconciler, TestApp};

#[tokio::test]
async fn root_is_reconciled_on_startup() {
    let service = FakeDirectoryService::new();
    let root = service.create_root("root");

    let app = TestApp::start_without_ticks(Arc::clone(&service), root.id).await;
    app.reconciler.wait_for_calls(1).await;

    let events = app.reconciler.pop_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Create);
    assert_eq!(events[0].directory.id, root.id);
    assert_eq!(app.reconciler.reconcile_calls(), 1);

    app.shutdown().await;
}

#[tokio::test]
async fn new_child_event_is_reconciled() {
    let service = FakeDirectoryService::new();
    let root = service.create_root("root");

    let app = TestApp::start_without_ticks(Arc::clone(&service), root.id).await;
    app.reconciler.wait_for_calls(1).await;
    app.reconciler.pop_events();

    let child = service.create_directory("test", root.id);
    app.publish(EventType::Create, child.clone());
    app.reconciler.wait_for_calls(2).await;

    let events = app.reconciler.pop_events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, EventType::Create);
    assert_eq!(events[0].directory.name, "test");
    assert_eq!(app.reconciler.reconcile_calls(), 2);
    assert!(app.is_tracked(child.id).await);

    app.shutdown().await;
}

#[tokio::test]
async fn full_scan_does_not_reconcile_current_directories() {
    let service = FakeDirectoryService::new();
    let root = service.create_root("root");

    // First tick fires two seconds in; everything below it happens within
    // milliseconds of startup.
    let app = TestApp::start(Arc::clone(&service), root.id, 2, 1, Duration::from_secs(1)).await;
    app.reconciler.wait_for_calls(1).await;

    let child = service.create_directory("test", root.id);
    app.publish(EventType::Create, child);
    app.reconciler.wait_for_calls(2).await;

    // Sit through at least one full scan.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(app.reconciler.reconcile_calls(), 2);

    app.shutdown().await;
}

#[tokio::test]
async fn untracked_sibling_root_is_ignored() {
    let service = FakeDirectoryService::new();
    let root = service.create_root("root");

    let app = TestApp::start_without_ticks(Arc::clone(&service), root.id).await;
    app.reconciler.wait_for_calls(1).await;

    let other = service.create_root("other");
    app.publish(EventType::Create, other.clone());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(app.reconciler.reconcile_calls(), 1);
    assert!(!app.is_tracked(other.id).await);

    app.shutdown().await;
}

#[tokio::test]
async fn delete_event_for_untracked_root_is_ignored() {
    let service = FakeDirectoryService::new();
    let root = service.create_root("root");

    let app = TestApp::start_without_ticks(Arc::clone(&service), root.id).await;
    app.reconciler.wait_for_calls(1).await;

    let other = service.create_root("other");
    let deleted = service.delete_directory(other.id);
    app.publish(EventType::Delete, deleted);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(app.reconciler.reconcile_calls(), 1);
    assert!(!app.is_tracked(other.id).await);
    assert_eq!(app.store.len(), 1);

    app.shutdown().await;
}

#[tokio::test]
async fn replayed_event_reconciles_at_most_once_more() {
    let service = FakeDirectoryService::new();
    let root = service.create_root("root");

    let app = TestApp::start_without_ticks(Arc::clone(&service), root.id).await;
    app.reconciler.wait_for_calls(1).await;

    let child = service.create_directory("test", root.id);
    app.publish(EventType::Create, child.clone());
    app.reconciler.wait_for_calls(2).await;

    // The replay is relevant (the directory is tracked) and hands the same
    // state to the idempotent reconciler exactly once more.
    app.publish(EventType::Create, child);
    app.reconciler.wait_for_calls(3).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(app.reconciler.reconcile_calls(), 3);

    app.shutdown().await;
}

#[tokio::test]
async fn deleted_directory_stays_quiet_until_recreated() {
    let service = FakeDirectoryService::new();
    let root = service.create_root("root");

    let app = TestApp::start_without_ticks(Arc::clone(&service), root.id).await;
    app.reconciler.wait_for_calls(1).await;

    let child = service.create_directory("doomed", root.id);
    app.publish(EventType::Create, child.clone());
    app.reconciler.wait_for_calls(2).await;

    let deleted = service.delete_directory(child.id);
    app.publish(EventType::Delete, deleted.clone());
    app.reconciler.wait_for_calls(3).await;

    let events = app.reconciler.pop_events();
    assert_eq!(events.last().map(|e| e.event_type), Some(EventType::Delete));
    assert!(!app.is_tracked(child.id).await);

    // Further events for the untracked id are dropped.
    app.publish(EventType::Delete, deleted.clone());
    app.publish(EventType::Update, deleted);
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(app.reconciler.reconcile_calls(), 3);

    // A fresh create of the same id under a tracked parent rejoins.
    let revived = {
        let now = chrono::Utc::now();
        Directory {
            created_at: now,
            updated_at: now,
            deleted_at: None,
            ..child
        }
    };
    service.insert(revived.clone());
    app.publish(EventType::Create, revived.clone());
    app.reconciler.wait_for_calls(4).await;
    assert!(app.is_tracked(revived.id).await);

    app.shutdown().await;
}

#[tokio::test]
async fn base_directory_fetch_failure_is_fatal() {
    let service = FakeDirectoryService::new();
    let missing = DirectoryId::new();

    let app = TestApp::start_without_ticks(service, missing).await;
    let err = app
        .into_result()
        .await
        .expect_err("run fails when the base directory cannot be fetched");
    assert_eq!(err.kind, ErrorKind::DirectoryNotFound);
}

/// Watcher whose error channel reports a fatal failure shortly after the
/// stream starts.
struct FailingWatcher;

#[async_trait]
impl Watcher for FailingWatcher {
    async fn watch(
        &self,
        _cancel: watch::Receiver<bool>,
    ) -> AppResult<(mpsc::Receiver<DirectoryEvent>, mpsc::Receiver<AppError>)> {
        let (_event_tx, event_rx) = mpsc::channel(1);
        let (error_tx, error_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let _ = error_tx
                .send(AppError::watch("subscription lost"))
                .await;
            // Keep the event channel open until the error is delivered.
            drop(_event_tx);
        });

        Ok((event_rx, error_rx))
    }
}

#[tokio::test]
async fn watcher_error_terminates_the_run() {
    let service = FakeDirectoryService::new();
    let root = service.create_root("root");
    let reconciler = Arc::new(RecordingReconciler::default());

    let controller = Controller::builder(root.id)
        .with_client(service)
        .with_watcher(Arc::new(FailingWatcher))
        .with_storage(Arc::new(arbor_controller::MemoryAppStorage::new()))
        .with_reconciler(Arc::clone(&reconciler) as Arc<dyn Reconciler>)
        .build()
        .expect("controller builds");

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let err = controller
        .run(cancel_rx)
        .await
        .expect_err("watcher failure is fatal");
    assert_eq!(err.kind, ErrorKind::Watch);
    assert_eq!(reconciler.reconcile_calls(), 1);
}

#[tokio::test]
async fn builder_requires_a_reconciler() {
    let service = FakeDirectoryService::new();
    let root = service.create_root("root");
    let bus = arbor_controller::MemoryEventBus::new(8);

    let err = Controller::builder(root.id)
        .with_client(service)
        .with_watcher(Arc::new(bus.watcher()))
        .with_storage(Arc::new(arbor_controller::MemoryAppStorage::new()))
        .build()
        .expect_err("missing reconciler");
    assert_eq!(err.kind, ErrorKind::NoReconciler);
}

#[tokio::test]
async fn builder_requires_the_remaining_collaborators() {
    let reconciler = Arc::new(RecordingReconciler::default());

    let err = Controller::builder(DirectoryId::new())
        .with_reconciler(reconciler as Arc<dyn Reconciler>)
        .build()
        .expect_err("missing client");
    assert_eq!(err.kind, ErrorKind::Configuration);
}
