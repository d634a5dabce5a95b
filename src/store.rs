//! The workspace store: single source of truth for the document.
//!
//! [`WorkspaceStore`] owns the canonical [`Workspace`] and exposes
//! primitive, synchronous mutators. It is deliberately a dumb container:
//! domain invariants (singleton node kinds, connection endpoint
//! compatibility) are checked by the usecase layer
//! ([`WorkflowEditor`](crate::editor::WorkflowEditor)) *before* a mutation
//! reaches the store, and cascading deletes are computed by
//! [`cascade`](crate::cascade) and committed here as one transition.
//!
//! Every committed transition is delivered as a [`StoreEvent`] carrying
//! the previous and next document snapshots plus the mutation's
//! [`Persist`] intent, in two forms: synchronous observers
//! ([`observe`](WorkspaceStore::observe)), which run inside the mutation
//! and see the transition before the mutator returns, and channel
//! subscribers ([`subscribe`](WorkspaceStore::subscribe)) for async
//! consumers. The persistence controller uses both, each side applying
//! its own diff predicate to decide whether a transition concerns it.
//!
//! Snapshots are `Arc<Workspace>` clones taken copy-on-write: mutators
//! clone the current document, apply the change, and swap the Arc, so
//! readers never observe a half-applied mutation and subscribers get cheap
//! handles to both sides of the transition.

use std::sync::{Arc, Mutex};

use crate::cascade::DeleteOutcome;
use crate::connection::Connection;
use crate::node::{Node, NodeKind};
use crate::reachability;
use crate::types::{ConnectionId, NodeId};
use crate::workspace::{NodeUiState, Viewport, Workspace};

/// Whether a mutation should be picked up by the persistence controller.
///
/// Overlay mutations that the caller explicitly opts out of persisting
/// (e.g. a transient viewport pan) carry [`Persist::Skip`]; everything
/// else carries [`Persist::Commit`]. The intent travels with the mutation
/// itself, so two skip-intent mutations can never race over a shared
/// reset-me-later flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Persist {
    Commit,
    Skip,
}

impl Persist {
    #[must_use]
    pub fn is_commit(&self) -> bool {
        matches!(self, Persist::Commit)
    }
}

/// A committed store transition, delivered to every subscriber.
#[derive(Clone, Debug)]
pub struct StoreEvent {
    pub previous: Arc<Workspace>,
    pub next: Arc<Workspace>,
    pub persist: Persist,
}

type Observer = Box<dyn Fn(&StoreEvent) -> bool + Send + Sync>;

struct Inner {
    current: Arc<Workspace>,
    subscribers: Vec<flume::Sender<StoreEvent>>,
    observers: Vec<Observer>,
}

/// Thread-safe container for the canonical workspace document.
pub struct WorkspaceStore {
    inner: Mutex<Inner>,
}

impl WorkspaceStore {
    /// Wrap an existing document.
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        Self {
            inner: Mutex::new(Inner {
                current: Arc::new(workspace),
                subscribers: Vec::new(),
                observers: Vec::new(),
            }),
        }
    }

    /// The current document snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Workspace> {
        self.lock().current.clone()
    }

    /// Register a subscriber. Every committed mutation is delivered as a
    /// [`StoreEvent`]; dropping the receiver unsubscribes.
    #[must_use]
    pub fn subscribe(&self) -> flume::Receiver<StoreEvent> {
        let (tx, rx) = flume::unbounded();
        self.lock().subscribers.push(tx);
        rx
    }

    /// Register a synchronous observer, invoked inside every committed
    /// mutation before the mutator returns.
    ///
    /// The observer returns `true` to stay registered and `false` to
    /// unregister itself. Observers run under the store lock and must not
    /// call back into the store.
    pub fn observe(&self, observer: impl Fn(&StoreEvent) -> bool + Send + Sync + 'static) {
        self.lock().observers.push(Box::new(observer));
    }

    /// Append a node, recording overlay state when supplied.
    pub fn add_node(&self, node: Node, ui: Option<NodeUiState>) {
        self.mutate(Persist::Commit, |ws| {
            if let Some(ui) = ui {
                ws.ui.node_state.insert(node.id, ui);
            }
            ws.nodes.push(node);
            Some(())
        });
    }

    /// Apply a closure to the node with the given id. Returns `false`
    /// (and commits nothing) when the node does not exist.
    pub fn update_node(&self, id: NodeId, mutate: impl FnOnce(&mut Node)) -> bool {
        self.mutate(Persist::Commit, |ws| {
            let node = ws.nodes.iter_mut().find(|n| n.id == id)?;
            mutate(node);
            Some(())
        })
        .is_some()
    }

    /// Remove a node and its overlay entry. No cascade: connections that
    /// referenced the node are left in place (callers go through the
    /// cascade engine for consistent deletes).
    pub fn remove_node(&self, id: NodeId) -> bool {
        self.mutate(Persist::Commit, |ws| {
            let index = ws.nodes.iter().position(|n| n.id == id)?;
            ws.nodes.remove(index);
            ws.ui.node_state.remove(&id);
            Some(())
        })
        .is_some()
    }

    /// Append a connection. No endpoint validation happens here.
    pub fn add_connection(&self, connection: Connection) {
        self.mutate(Persist::Commit, |ws| {
            ws.connections.push(connection);
            Some(())
        });
    }

    /// Remove a connection by id.
    pub fn remove_connection(&self, id: ConnectionId) -> bool {
        self.mutate(Persist::Commit, |ws| {
            let index = ws.connections.iter().position(|c| c.id == id)?;
            ws.connections.remove(index);
            ws.ui.selected_connection_ids.retain(|c| *c != id);
            Some(())
        })
        .is_some()
    }

    /// Commit a cascading-delete result as one atomic transition.
    pub fn commit_delete(&self, outcome: DeleteOutcome) {
        self.mutate(Persist::Commit, |ws| {
            ws.nodes = outcome.nodes;
            ws.connections = outcome.connections;
            ws.ui = outcome.ui;
            Some(())
        });
    }

    /// Set a node's overlay state with the given persist intent.
    pub fn set_node_ui(&self, id: NodeId, ui: NodeUiState, persist: Persist) {
        self.mutate(persist, |ws| {
            ws.ui.node_state.insert(id, ui);
            Some(())
        });
    }

    /// Set the viewport with the given persist intent.
    pub fn set_viewport(&self, viewport: Viewport, persist: Persist) {
        self.mutate(persist, |ws| {
            ws.ui.viewport = viewport;
            Some(())
        });
    }

    /// Replace the connection selection with the given persist intent.
    pub fn set_selected_connections(&self, ids: Vec<ConnectionId>, persist: Persist) {
        self.mutate(persist, |ws| {
            ws.ui.selected_connection_ids = ids;
            Some(())
        });
    }

    /// Rename the workspace.
    pub fn set_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.mutate(Persist::Commit, |ws| {
            ws.name = name;
            Some(())
        });
    }

    /// Whether the workspace has an App entry node.
    #[must_use]
    pub fn has_start_node(&self) -> bool {
        self.snapshot().app_entry().is_some()
    }

    /// Whether the workspace has an end node.
    #[must_use]
    pub fn has_end_node(&self) -> bool {
        self.snapshot().end_node().is_some()
    }

    /// Whether any end node is reachable from any App entry node.
    ///
    /// Recomputed from the current nodes and connections on each call; the
    /// search is seeded from every entry node at once.
    #[must_use]
    pub fn is_start_connected_to_end(&self) -> bool {
        let ws = self.snapshot();
        let starts: Vec<NodeId> = ws
            .nodes_of_kind(NodeKind::AppEntry)
            .map(|n| n.id)
            .collect();
        reachability::any_end_reachable(&ws.nodes, &ws.connections, &starts)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("workspace store lock poisoned")
    }

    /// Copy-on-write mutation primitive. The closure returns `None` to
    /// abort without committing or notifying.
    fn mutate<R>(
        &self,
        persist: Persist,
        mutate: impl FnOnce(&mut Workspace) -> Option<R>,
    ) -> Option<R> {
        let mut inner = self.lock();
        let mut next = Workspace::clone(&inner.current);
        let result = mutate(&mut next)?;
        let next = Arc::new(next);
        let previous = std::mem::replace(&mut inner.current, next.clone());
        let event = StoreEvent {
            previous,
            next,
            persist,
        };
        inner.observers.retain(|observer| observer(&event));
        inner.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        Some(result)
    }
}
