//! Reconciliation of the remote App record with local reachability.
//!
//! Whenever the graph mutates in a way that could change the entry-to-end
//! path, the usecase layer pings [`AppConnectionSync`]. Each ping is a
//! request to *reconcile if needed*, not a hard requirement to write: the
//! worker derives the desired state from current reachability, compares it
//! against the last written fingerprint, and only then performs the remote
//! fetch-merge-save cycle.
//!
//! # Concurrency discipline
//!
//! All requests for a workspace drain through one worker task consuming a
//! FIFO channel, so reconciliations execute strictly one at a time and in
//! submission order even though pings originate from many unrelated
//! mutation sites. Two overlapping fetch-merge-save cycles would race a
//! classic read-modify-write hazard against the remote record; the queue
//! makes that impossible. A failed reconciliation is logged and never
//! blocks later requests.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use flowcanvas::app_sync::AppConnectionSync;
//! use flowcanvas::services::InMemoryAppService;
//! use flowcanvas::store::WorkspaceStore;
//! use flowcanvas::workspace::Workspace;
//!
//! # async fn example() {
//! let store = Arc::new(WorkspaceStore::new(Workspace::new("demo")));
//! let apps = Arc::new(InMemoryAppService::new());
//! let sync = AppConnectionSync::spawn(store, apps);
//!
//! sync.request_sync();      // fire and forget
//! sync.sync_now().await;    // enqueue and wait for the queue to reach it
//! sync.shutdown().await;
//! # }
//! ```

use std::sync::{Arc, Mutex};

use chrono::Utc;
use miette::Diagnostic;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::app::{AppState, AppValidationError};
use crate::node::NodeContent;
use crate::reachability;
use crate::services::{AppService, ServiceError};
use crate::store::WorkspaceStore;
use crate::types::{AppId, NodeId, WorkspaceId};

/// A reconciliation attempt failed before or during the remote write.
#[derive(Debug, Error, Diagnostic)]
pub enum AppSyncError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Validation(#[from] AppValidationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Service(#[from] ServiceError),
}

/// The last state written to the remote record. A reconciliation whose
/// derived fingerprint matches is skipped without any remote call.
#[derive(Clone, Debug, PartialEq, Eq)]
struct SyncFingerprint {
    app_id: AppId,
    workspace_id: WorkspaceId,
    entry_node_id: NodeId,
    state: AppState,
    end_node_id: Option<NodeId>,
}

enum SyncCommand {
    Reconcile(Option<oneshot::Sender<()>>),
    Shutdown,
}

/// Handle to the per-workspace reconciliation queue.
#[derive(Clone)]
pub struct AppConnectionSync {
    commands: mpsc::UnboundedSender<SyncCommand>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl AppConnectionSync {
    /// Spawn the worker task for a workspace.
    #[must_use]
    pub fn spawn(store: Arc<WorkspaceStore>, apps: Arc<dyn AppService>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_queue(store, apps, rx));
        Self {
            commands: tx,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// Enqueue a reconciliation and return immediately.
    pub fn request_sync(&self) {
        let _ = self.commands.send(SyncCommand::Reconcile(None));
    }

    /// Enqueue a reconciliation and wait until the queue has processed it
    /// (and everything enqueued before it).
    pub async fn sync_now(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(SyncCommand::Reconcile(Some(tx))).is_ok() {
            let _ = rx.await;
        }
    }

    /// Stop the worker after draining commands enqueued so far.
    pub async fn shutdown(&self) {
        let _ = self.commands.send(SyncCommand::Shutdown);
        let handle = self
            .worker
            .lock()
            .expect("app sync worker lock poisoned")
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

async fn run_queue(
    store: Arc<WorkspaceStore>,
    apps: Arc<dyn AppService>,
    mut commands: mpsc::UnboundedReceiver<SyncCommand>,
) {
    let mut last_written: Option<SyncFingerprint> = None;
    while let Some(command) = commands.recv().await {
        match command {
            SyncCommand::Shutdown => break,
            SyncCommand::Reconcile(ack) => {
                if let Err(error) = reconcile(&store, apps.as_ref(), &mut last_written).await {
                    tracing::warn!(%error, "app connection sync failed");
                }
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
        }
    }
}

async fn reconcile(
    store: &WorkspaceStore,
    apps: &dyn AppService,
    last_written: &mut Option<SyncFingerprint>,
) -> Result<(), AppSyncError> {
    let ws = store.snapshot();
    let Some(entry) = ws.app_entry() else {
        return Ok(());
    };
    let NodeContent::AppEntry {
        app_id: Some(app_id),
    } = &entry.content
    else {
        // Unconfigured entry: there is no remote record to reconcile yet.
        return Ok(());
    };

    let reachable_end = reachability::find_reachable_end(&ws.nodes, &ws.connections, entry.id);
    let (state, end_node_id) = match reachable_end {
        Some(end) => (AppState::Connected, Some(end)),
        None => (AppState::Disconnected, None),
    };

    let fingerprint = SyncFingerprint {
        app_id: *app_id,
        workspace_id: ws.id,
        entry_node_id: entry.id,
        state,
        end_node_id,
    };
    if last_written.as_ref() == Some(&fingerprint) {
        tracing::debug!(app_id = %fingerprint.app_id, "app state unchanged, skipping sync");
        return Ok(());
    }

    let mut app = apps.get_app(*app_id).await?;
    app.workspace_id = ws.id;
    app.entry_node_id = entry.id;
    app.state = state;
    app.end_node_id = end_node_id;
    app.updated_at = Utc::now();
    app.validate()?;
    apps.save_app(app).await?;

    tracing::debug!(
        app_id = %fingerprint.app_id,
        state = ?fingerprint.state,
        "app connection state persisted"
    );
    *last_written = Some(fingerprint);
    Ok(())
}
