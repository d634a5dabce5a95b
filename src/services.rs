//! Abstract collaborators: workspace persistence and the App record
//! service.
//!
//! The core never talks to a concrete backend. Durable workspace saves,
//! beacon-style best-effort saves, and App record reads/writes all go
//! through the traits here, and the storage technology behind them is out
//! of scope. In-memory reference implementations are provided in the same
//! spirit as an in-memory checkpointer: they back the test suite and make
//! the crate embeddable without wiring a real backend.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::time::Duration;

use crate::app::App;
use crate::types::AppId;
use crate::workspace::Workspace;

/// Failure of a remote collaborator call.
#[derive(Debug, Error, Diagnostic)]
pub enum ServiceError {
    #[error("remote service unavailable: {0}")]
    #[diagnostic(
        code(flowcanvas::services::unavailable),
        help("The call may be retried once connectivity is restored.")
    )]
    Unavailable(String),

    #[error("record not found: {0}")]
    #[diagnostic(code(flowcanvas::services::not_found))]
    NotFound(String),

    #[error("payload serialization failed: {source}")]
    #[diagnostic(code(flowcanvas::services::serde))]
    Serde {
        #[from]
        source: serde_json::Error,
    },
}

/// Durable persistence for the workspace document.
#[async_trait]
pub trait WorkspaceBackend: Send + Sync {
    /// Awaitable, durable save of the full document. Failure propagates to
    /// the caller; the persistence controller keeps the document dirty and
    /// retries on the next tick or explicit flush.
    async fn save(&self, workspace: Arc<Workspace>) -> Result<(), ServiceError>;

    /// Fire-and-forget save for contexts that cannot await (page unload).
    /// Expected to use a transport that survives teardown; there is no
    /// success signal and no recovery path.
    fn save_best_effort(&self, workspace: Arc<Workspace>);
}

/// Remote storage for App records.
#[async_trait]
pub trait AppService: Send + Sync {
    async fn get_app(&self, id: AppId) -> Result<App, ServiceError>;
    async fn save_app(&self, app: App) -> Result<(), ServiceError>;
    async fn delete_app(&self, id: AppId) -> Result<(), ServiceError>;
}

/// Volatile [`WorkspaceBackend`] that records every save it receives.
///
/// Supports an injectable per-save delay (to exercise the in-flight /
/// queued save path) and a one-shot failure (to exercise retry-on-dirty).
#[derive(Default)]
pub struct InMemoryWorkspaceBackend {
    saves: Mutex<Vec<Workspace>>,
    best_effort: Mutex<Vec<Workspace>>,
    save_delay: Mutex<Duration>,
    fail_next: AtomicBool,
}

impl InMemoryWorkspaceBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every subsequent awaited save by `delay`.
    pub fn set_save_delay(&self, delay: Duration) {
        *self.save_delay.lock().expect("backend lock poisoned") = delay;
    }

    /// Make the next awaited save fail with [`ServiceError::Unavailable`].
    pub fn fail_next_save(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Snapshots persisted through the awaited path, in order.
    #[must_use]
    pub fn saved(&self) -> Vec<Workspace> {
        self.saves.lock().expect("backend lock poisoned").clone()
    }

    /// Number of awaited saves.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.lock().expect("backend lock poisoned").len()
    }

    /// Snapshots received through the best-effort path, in order.
    #[must_use]
    pub fn best_effort_saves(&self) -> Vec<Workspace> {
        self.best_effort
            .lock()
            .expect("backend lock poisoned")
            .clone()
    }
}

#[async_trait]
impl WorkspaceBackend for InMemoryWorkspaceBackend {
    async fn save(&self, workspace: Arc<Workspace>) -> Result<(), ServiceError> {
        let delay = *self.save_delay.lock().expect("backend lock poisoned");
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(ServiceError::Unavailable("injected save failure".into()));
        }
        self.saves
            .lock()
            .expect("backend lock poisoned")
            .push(Workspace::clone(&workspace));
        Ok(())
    }

    fn save_best_effort(&self, workspace: Arc<Workspace>) {
        self.best_effort
            .lock()
            .expect("backend lock poisoned")
            .push(Workspace::clone(&workspace));
    }
}

/// Volatile [`AppService`] with save/delete logs for assertions.
#[derive(Default)]
pub struct InMemoryAppService {
    apps: Mutex<FxHashMap<AppId, App>>,
    save_log: Mutex<Vec<App>>,
    deleted: Mutex<Vec<AppId>>,
}

impl InMemoryAppService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored record, if any.
    #[must_use]
    pub fn app(&self, id: AppId) -> Option<App> {
        self.apps
            .lock()
            .expect("app service lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Every record passed to `save_app`, in order.
    #[must_use]
    pub fn save_log(&self) -> Vec<App> {
        self.save_log
            .lock()
            .expect("app service lock poisoned")
            .clone()
    }

    /// Ids passed to `delete_app`, in order.
    #[must_use]
    pub fn deleted(&self) -> Vec<AppId> {
        self.deleted
            .lock()
            .expect("app service lock poisoned")
            .clone()
    }
}

#[async_trait]
impl AppService for InMemoryAppService {
    async fn get_app(&self, id: AppId) -> Result<App, ServiceError> {
        self.apps
            .lock()
            .expect("app service lock poisoned")
            .get(&id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))
    }

    async fn save_app(&self, app: App) -> Result<(), ServiceError> {
        let mut apps = self.apps.lock().expect("app service lock poisoned");
        apps.insert(app.id, app.clone());
        drop(apps);
        self.save_log
            .lock()
            .expect("app service lock poisoned")
            .push(app);
        Ok(())
    }

    async fn delete_app(&self, id: AppId) -> Result<(), ServiceError> {
        self.apps
            .lock()
            .expect("app service lock poisoned")
            .remove(&id);
        self.deleted
            .lock()
            .expect("app service lock poisoned")
            .push(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{NodeId, WorkspaceId};

    #[tokio::test]
    async fn in_memory_backend_records_saves() {
        let backend = InMemoryWorkspaceBackend::new();
        let ws = Arc::new(Workspace::new("a"));
        backend.save(ws.clone()).await.unwrap();
        backend.save_best_effort(ws);
        assert_eq!(backend.save_count(), 1);
        assert_eq!(backend.best_effort_saves().len(), 1);
    }

    #[tokio::test]
    async fn in_memory_backend_injected_failure_is_one_shot() {
        let backend = InMemoryWorkspaceBackend::new();
        let ws = Arc::new(Workspace::new("a"));
        backend.fail_next_save();
        assert!(backend.save(ws.clone()).await.is_err());
        assert!(backend.save(ws).await.is_ok());
        assert_eq!(backend.save_count(), 1);
    }

    #[tokio::test]
    async fn in_memory_app_service_round_trip() {
        let service = InMemoryAppService::new();
        let app = App::new(WorkspaceId::new(), NodeId::new(), "demo");
        let id = app.id;

        assert!(service.get_app(id).await.is_err());
        service.save_app(app.clone()).await.unwrap();
        assert_eq!(service.get_app(id).await.unwrap(), app);

        service.delete_app(id).await.unwrap();
        assert!(service.get_app(id).await.is_err());
        assert_eq!(service.deleted(), vec![id]);
    }
}
