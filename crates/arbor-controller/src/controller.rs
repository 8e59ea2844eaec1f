//! The subtree reconcile controller.
//!
//! The run loop is single-threaded cooperative: one select point whose
//! arms run to completion before the next is considered, so the
//! [`AppStorage`] and [`Reconciler`] see a strict serial call history.
//! The controller does not retry internally; any collaborator error ends
//! the run and the caller chooses whether to restart it.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::time::{self, Instant};
use tracing::debug;

use arbor_core::config::ControllerConfig;
use arbor_core::error::AppError;
use arbor_core::result::AppResult;
use arbor_core::types::DirectoryId;
use arbor_entity::directory::{Directory, DirectoryEvent, EventType};

use crate::traits::{AppStorage, ReadOnlyClient, Reconciler, Watcher};

/// Default minimum number of interval units between full reconciles.
const DEFAULT_MIN_INTERVAL: u32 = 5;
/// Default exclusive bound on the random units added on top of the minimum.
const DEFAULT_MAX_INTERVAL: u32 = 10;
/// Default length of one interval unit.
const DEFAULT_INTERVAL_UNIT: Duration = Duration::from_secs(60);

/// Reconcile controller for the subtree rooted at a base directory.
///
/// Built with [`Controller::builder`]. Owns its collaborators behind the
/// seam traits and never widens them.
pub struct Controller {
    base_dir: DirectoryId,
    client: Arc<dyn ReadOnlyClient>,
    watcher: Arc<dyn Watcher>,
    store: Arc<dyn AppStorage>,
    reconciler: Arc<dyn Reconciler>,
    min_interval: u32,
    max_interval: u32,
    interval_unit: Duration,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("base_dir", &self.base_dir)
            .field("min_interval", &self.min_interval)
            .field("max_interval", &self.max_interval)
            .field("interval_unit", &self.interval_unit)
            .finish_non_exhaustive()
    }
}

impl Controller {
    /// Start building a controller anchored at `base_dir`.
    pub fn builder(base_dir: DirectoryId) -> ControllerBuilder {
        ControllerBuilder::new(base_dir)
    }

    /// Run the controller until cancellation or a fatal error.
    ///
    /// Performs an initial full-subtree reconcile, then multiplexes
    /// cancellation, the randomized full-scan tick, watcher errors, and
    /// incoming events. Returns the cancellation cause as a `Cancelled`
    /// error when `cancel` flips to true.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) -> AppResult<()> {
        let mut tick = Box::pin(time::sleep(self.random_tick_interval()));

        self.initialize_directories().await?;

        let (mut events, mut errors) = self.watcher.watch(cancel.clone()).await?;

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        return Err(AppError::cancelled("controller run cancelled"));
                    }
                }
                () = tick.as_mut() => {
                    self.initialize_directories().await?;
                    tick.as_mut().reset(Instant::now() + self.random_tick_interval());
                }
                error = errors.recv() => {
                    match error {
                        Some(error) => return Err(error),
                        None => return Err(stream_closed(&cancel)),
                    }
                }
                event = events.recv() => {
                    match event {
                        Some(event) => self.process_incoming_event(event).await?,
                        None => return Err(stream_closed(&cancel)),
                    }
                }
            }
        }
    }

    /// Full-subtree reconcile: the base directory and one level of
    /// children. Deep descendants arrive via events and are caught by
    /// later ticks once tracked.
    async fn initialize_directories(&self) -> AppResult<()> {
        self.persist_if_up_to_date(self.base_dir).await?;

        let subdirs = self.client.get_children(self.base_dir).await?;
        for subdir in subdirs.directories {
            self.persist_if_up_to_date(subdir).await?;
        }

        Ok(())
    }

    /// Fetch authoritative state and persist it unless the mirror is
    /// already current.
    async fn persist_if_up_to_date(&self, id: DirectoryId) -> AppResult<()> {
        let fetched = self.client.get_directory(id).await?;
        let directory = fetched.directory;

        if self.store.is_directory_info_updated(&directory).await? {
            return Ok(());
        }

        self.persist_directory(&directory).await
    }

    /// Persist the directory in the mirror and hand a synthesized event to
    /// the reconciler. Updates are modeled as creates on this boundary;
    /// the reconciler is expected to be idempotent for directories it
    /// already knows.
    async fn persist_directory(&self, directory: &Directory) -> AppResult<()> {
        if directory.is_deleted() {
            self.store.delete_directory(directory.id).await?;
            debug!(directory_id = %directory.id, "Reconciling directory deletion");
            return self
                .reconciler
                .reconcile(DirectoryEvent::new(EventType::Delete, directory.clone()))
                .await;
        }

        self.store.create_directory(directory).await?;
        debug!(directory_id = %directory.id, "Reconciling directory");
        self.reconciler
            .reconcile(DirectoryEvent::new(EventType::Create, directory.clone()))
            .await
    }

    async fn process_incoming_event(&self, event: DirectoryEvent) -> AppResult<()> {
        if !self.is_relevant_event(&event).await? {
            return Ok(());
        }

        self.persist_directory(&event.directory).await
    }

    /// An event is relevant when the directory is already tracked, or when
    /// it is a create whose parent is tracked. Everything else is dropped,
    /// which confines the controller to its subtree without knowing the
    /// subtree's shape in advance.
    async fn is_relevant_event(&self, event: &DirectoryEvent) -> AppResult<bool> {
        let directory = &event.directory;

        if self.store.is_directory_tracked(directory.id).await? {
            return Ok(true);
        }

        if event.event_type != EventType::Create {
            return Ok(false);
        }

        // A new root; not ours to track.
        let Some(parent_id) = directory.parent_id else {
            return Ok(false);
        };

        self.store.is_directory_tracked(parent_id).await
    }

    fn random_tick_interval(&self) -> Duration {
        random_tick_interval(self.min_interval, self.max_interval, self.interval_unit)
    }
}

/// A random duration of `(min + rand[0, max)) * unit`.
///
/// The randomizer is non-cryptographic; its only purpose is to spread
/// full scans of independent controllers over time.
fn random_tick_interval(min: u32, max: u32, unit: Duration) -> Duration {
    let spread = if max == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..max)
    };

    unit * (min + spread)
}

fn stream_closed(cancel: &watch::Receiver<bool>) -> AppError {
    if *cancel.borrow() {
        AppError::cancelled("controller run cancelled")
    } else {
        AppError::watch("watcher channels closed unexpectedly")
    }
}

/// Builder for [`Controller`].
///
/// The reconciler is the only collaborator with a dedicated error kind on
/// build; a controller without one has no reason to exist.
pub struct ControllerBuilder {
    base_dir: DirectoryId,
    client: Option<Arc<dyn ReadOnlyClient>>,
    watcher: Option<Arc<dyn Watcher>>,
    store: Option<Arc<dyn AppStorage>>,
    reconciler: Option<Arc<dyn Reconciler>>,
    min_interval: u32,
    max_interval: u32,
    interval_unit: Duration,
}

impl ControllerBuilder {
    fn new(base_dir: DirectoryId) -> Self {
        Self {
            base_dir,
            client: None,
            watcher: None,
            store: None,
            reconciler: None,
            min_interval: DEFAULT_MIN_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            interval_unit: DEFAULT_INTERVAL_UNIT,
        }
    }

    /// Set the authoritative read client.
    pub fn with_client(mut self, client: Arc<dyn ReadOnlyClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the event watcher.
    pub fn with_watcher(mut self, watcher: Arc<dyn Watcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Set the local mirror.
    pub fn with_storage(mut self, store: Arc<dyn AppStorage>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the reconciler.
    pub fn with_reconciler(mut self, reconciler: Arc<dyn Reconciler>) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    /// Set the full-reconcile interval parameters.
    pub fn with_full_reconcile_interval(mut self, min: u32, max: u32, unit: Duration) -> Self {
        self.min_interval = min;
        self.max_interval = max;
        self.interval_unit = unit;
        self
    }

    /// Pull the interval parameters from configuration.
    pub fn with_config(self, config: &ControllerConfig) -> Self {
        self.with_full_reconcile_interval(
            config.full_reconcile_min_interval,
            config.full_reconcile_max_interval,
            Duration::from_secs(config.full_reconcile_interval_unit_seconds),
        )
    }

    /// Build the controller.
    pub fn build(self) -> AppResult<Controller> {
        let reconciler = self
            .reconciler
            .ok_or_else(|| AppError::no_reconciler("controller requires a reconciler"))?;
        let client = self
            .client
            .ok_or_else(|| AppError::configuration("controller requires a read-only client"))?;
        let watcher = self
            .watcher
            .ok_or_else(|| AppError::configuration("controller requires a watcher"))?;
        let store = self
            .store
            .ok_or_else(|| AppError::configuration("controller requires an app storage"))?;

        Ok(Controller {
            base_dir: self.base_dir,
            client,
            watcher,
            store,
            reconciler,
            min_interval: self.min_interval,
            max_interval: self.max_interval,
            interval_unit: self.interval_unit,
        })
    }
}
