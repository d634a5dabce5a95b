//! Debounced, at-most-one-in-flight persistence of the workspace document.
//!
//! [`PersistenceController`] subscribes to the store and decides *when*
//! the document is written, independent of what changed. The state machine
//! is `clean -> dirty -> (debounce elapses) -> saving -> clean`, with one
//! re-entrant branch: a relevant mutation arriving while a save is in
//! flight marks the controller `queued`, and the moment the in-flight save
//! resolves successfully another save starts immediately, bypassing the
//! debounce. Rapid edits are therefore coalesced, intermediate states may
//! never be individually persisted, and the *last* dirty state always is.
//!
//! The save payload is read fresh from the store when the save starts, not
//! captured when it was scheduled, so a retry after failure picks up the
//! latest document.
//!
//! A transition is relevant when its persist intent is
//! [`Persist::Commit`](crate::store::Persist) *and* the nodes, connections,
//! or UI overlay actually differ between the two snapshots. Overlay
//! mutations flagged [`Persist::Skip`](crate::store::Persist) never arm the
//! timer.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowcanvas::persistence::{PersistenceConfig, PersistenceController};
//! use flowcanvas::services::InMemoryWorkspaceBackend;
//! use flowcanvas::store::WorkspaceStore;
//! use flowcanvas::workspace::Workspace;
//!
//! # async fn example() -> Result<(), flowcanvas::persistence::SaveError> {
//! let store = Arc::new(WorkspaceStore::new(Workspace::new("demo")));
//! let backend = Arc::new(InMemoryWorkspaceBackend::new());
//! let controller =
//!     PersistenceController::spawn(store, backend, PersistenceConfig::default());
//!
//! // ... mutate the store; the controller saves after the quiet period ...
//!
//! controller.flush("navigation").await?;
//! controller.dispose().await;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use miette::Diagnostic;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};

use crate::services::{ServiceError, WorkspaceBackend};
use crate::store::{StoreEvent, WorkspaceStore};

/// Timing configuration for the controller.
#[derive(Clone, Debug)]
pub struct PersistenceConfig {
    /// Quiet period after the last relevant mutation before a save starts.
    pub debounce: Duration,
}

impl PersistenceConfig {
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1500);

    /// Override the debounce interval.
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    fn resolve_debounce() -> Duration {
        dotenvy::dotenv().ok();
        std::env::var("FLOWCANVAS_SAVE_DEBOUNCE_MS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(Self::DEFAULT_DEBOUNCE)
    }
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce: Self::resolve_debounce(),
        }
    }
}

/// A forced save attempt failed or the controller is gone.
#[derive(Clone, Debug, Error, Diagnostic)]
pub enum SaveError {
    #[error("workspace save failed: {0}")]
    #[diagnostic(
        code(flowcanvas::persistence::backend),
        help("The document stays dirty; a later debounce tick or flush retries with the latest snapshot.")
    )]
    Backend(String),

    #[error("persistence controller disposed")]
    #[diagnostic(code(flowcanvas::persistence::disposed))]
    Disposed,
}

enum Command {
    Flush {
        reason: String,
        ack: oneshot::Sender<Result<(), SaveError>>,
    },
    Dispose {
        ack: oneshot::Sender<()>,
    },
}

/// Handle to the controller task for one workspace.
pub struct PersistenceController {
    commands: mpsc::UnboundedSender<Command>,
    dirty: Arc<AtomicBool>,
    store: Arc<WorkspaceStore>,
    backend: Arc<dyn WorkspaceBackend>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PersistenceController {
    /// Subscribe to the store and start the controller task.
    #[must_use]
    pub fn spawn(
        store: Arc<WorkspaceStore>,
        backend: Arc<dyn WorkspaceBackend>,
        config: PersistenceConfig,
    ) -> Self {
        let changes = store.subscribe();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let dirty = Arc::new(AtomicBool::new(false));
        // The dirty flag is raised synchronously, inside the mutation, so
        // `is_dirty` and the unload path never lag behind the store. The
        // worker only ever clears it, after a confirmed save.
        {
            let flag = Arc::downgrade(&dirty);
            store.observe(move |event| match flag.upgrade() {
                Some(flag) => {
                    if is_relevant(event) {
                        flag.store(true, Ordering::SeqCst);
                    }
                    true
                }
                None => false,
            });
        }
        let worker = tokio::spawn(run(
            store.clone(),
            backend.clone(),
            changes,
            command_rx,
            config.debounce,
            dirty.clone(),
        ));
        Self {
            commands: command_tx,
            dirty,
            store,
            backend,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Whether the document has changes not yet confirmed persisted.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Force an immediate save attempt, bypassing the debounce timer.
    ///
    /// No-op when the document is clean. Resolves once the save (and any
    /// queued follow-up) has landed; a backend failure propagates and
    /// leaves the document dirty for a later retry.
    pub async fn flush(&self, reason: &str) -> Result<(), SaveError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Flush {
                reason: reason.to_string(),
                ack: tx,
            })
            .map_err(|_| SaveError::Disposed)?;
        rx.await.map_err(|_| SaveError::Disposed)?
    }

    /// Hand the current snapshot to the best-effort transport if dirty.
    ///
    /// For contexts that cannot await a round-trip (page unload). There is
    /// no success signal; the dirty flag is left set.
    pub fn flush_best_effort(&self, reason: &str) {
        if !self.is_dirty() {
            return;
        }
        tracing::debug!(reason, "best-effort workspace flush");
        self.backend.save_best_effort(self.store.snapshot());
    }

    /// Unload-time hook: best-effort flush when dirty, and report whether
    /// the embedder should prompt the user about unsaved changes.
    pub fn handle_unload(&self) -> bool {
        let dirty = self.is_dirty();
        if dirty {
            self.flush_best_effort("unload");
        }
        dirty
    }

    /// Stop the controller: clears the pending timer, unsubscribes, and
    /// attempts no further saves. Pending `flush` callers receive
    /// [`SaveError::Disposed`].
    pub async fn dispose(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Dispose { ack: tx }).is_ok() {
            let _ = rx.await;
        }
        let handle = self
            .worker
            .lock()
            .expect("controller worker lock poisoned")
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Drop for PersistenceController {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.worker.lock()
            && let Some(handle) = guard.take()
        {
            handle.abort();
        }
    }
}

fn is_relevant(event: &StoreEvent) -> bool {
    event.persist.is_commit()
        && (event.previous.nodes != event.next.nodes
            || event.previous.connections != event.next.connections
            || event.previous.ui != event.next.ui)
}

fn start_save(
    store: &Arc<WorkspaceStore>,
    backend: &Arc<dyn WorkspaceBackend>,
    done: &mpsc::UnboundedSender<Result<(), ServiceError>>,
) {
    // Read the payload now, not at schedule time.
    let snapshot = store.snapshot();
    tracing::debug!(workspace = %snapshot.id, "saving workspace");
    let backend = Arc::clone(backend);
    let done = done.clone();
    tokio::spawn(async move {
        let _ = done.send(backend.save(snapshot).await);
    });
}

async fn sleep_until_deadline(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Fold one transition into the timer/queue state.
fn apply_change(
    event: &StoreEvent,
    saving: bool,
    queued: &mut bool,
    deadline: &mut Option<Instant>,
    debounce: Duration,
) {
    if !is_relevant(event) {
        return;
    }
    if saving {
        *queued = true;
    } else {
        *deadline = Some(Instant::now() + debounce);
    }
}

/// Fold every already-delivered transition before making a save decision,
/// so a mutation committed just before a flush or completion is never
/// mistaken for future work.
fn drain_changes(
    changes: &flume::Receiver<StoreEvent>,
    saving: bool,
    queued: &mut bool,
    deadline: &mut Option<Instant>,
    debounce: Duration,
) {
    while let Ok(event) = changes.try_recv() {
        apply_change(&event, saving, queued, deadline, debounce);
    }
}

async fn run(
    store: Arc<WorkspaceStore>,
    backend: Arc<dyn WorkspaceBackend>,
    changes: flume::Receiver<StoreEvent>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    debounce: Duration,
    dirty_flag: Arc<AtomicBool>,
) {
    let (save_done_tx, mut save_done_rx) = mpsc::unbounded_channel::<Result<(), ServiceError>>();

    let mut saving = false;
    let mut queued = false;
    let mut deadline: Option<Instant> = None;
    let mut waiters: Vec<oneshot::Sender<Result<(), SaveError>>> = Vec::new();

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => match command {
                None => break,
                Some(Command::Dispose { ack }) => {
                    deadline = None;
                    for waiter in waiters.drain(..) {
                        let _ = waiter.send(Err(SaveError::Disposed));
                    }
                    let _ = ack.send(());
                    break;
                }
                Some(Command::Flush { reason, ack }) => {
                    drain_changes(&changes, saving, &mut queued, &mut deadline, debounce);
                    if saving {
                        // The in-flight save (or its queued follow-up)
                        // carries the current state; answer when it lands.
                        waiters.push(ack);
                    } else if dirty_flag.load(Ordering::SeqCst) {
                        tracing::debug!(%reason, "flushing workspace ahead of the debounce timer");
                        deadline = None;
                        saving = true;
                        start_save(&store, &backend, &save_done_tx);
                        waiters.push(ack);
                    } else {
                        let _ = ack.send(Ok(()));
                    }
                }
            },

            result = save_done_rx.recv() => {
                let Some(result) = result else { break };
                saving = false;
                // Transitions delivered while the save ran count as
                // mutations during the save.
                drain_changes(&changes, true, &mut queued, &mut deadline, debounce);
                match result {
                    Ok(()) => {
                        if queued {
                            queued = false;
                            saving = true;
                            start_save(&store, &backend, &save_done_tx);
                        } else {
                            dirty_flag.store(false, Ordering::SeqCst);
                            for waiter in waiters.drain(..) {
                                let _ = waiter.send(Ok(()));
                            }
                        }
                    }
                    Err(error) => {
                        tracing::warn!(%error, "workspace save failed; document remains dirty");
                        let message = error.to_string();
                        for waiter in waiters.drain(..) {
                            let _ = waiter.send(Err(SaveError::Backend(message.clone())));
                        }
                        if queued {
                            // The mutation that queued would have restarted
                            // the debounce had no save been in flight.
                            queued = false;
                            deadline = Some(Instant::now() + debounce);
                        }
                    }
                }
            },

            event = changes.recv_async() => match event {
                Err(_) => break,
                Ok(event) => apply_change(&event, saving, &mut queued, &mut deadline, debounce),
            },

            _ = sleep_until_deadline(deadline) => {
                // A transition may have been delivered in the same tick;
                // it restarts the quiet period instead of saving early.
                drain_changes(&changes, saving, &mut queued, &mut deadline, debounce);
                if let Some(due) = deadline
                    && due <= Instant::now()
                {
                    deadline = None;
                    saving = true;
                    start_save(&store, &backend, &save_done_tx);
                }
            }
        }
    }
}
