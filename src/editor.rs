//! The mutation API consumed by the canvas interaction layer.
//!
//! [`WorkflowEditor`] wraps the store and enforces every domain invariant
//! *before* a mutation reaches it: singleton node kinds, connection
//! endpoint validity, fixed-schema input rules. It also sequences the side
//! effects a bare store mutation cannot know about: widening deletes
//! through the cascade engine, cleaning up remote App records, minting App
//! records on first entry configuration, and pinging the app-connection
//! synchronizer after every mutation that can change the entry-to-end
//! path.
//!
//! Invariant violations are returned as [`EditorError`] with nothing
//! applied; they are never silently swallowed.

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use crate::app::App;
use crate::app_sync::AppConnectionSync;
use crate::cascade::{self, DeletePlan};
use crate::connection::Connection;
use crate::node::{Input, Node, NodeContent, NodeKind};
use crate::services::{AppService, ServiceError};
use crate::store::{Persist, WorkspaceStore};
use crate::types::{AppId, ConnectionId, InputId, NodeId, OutputId};
use crate::workspace::{NodeUiState, Viewport};

/// A mutation was rejected before reaching the store.
#[derive(Debug, Error, Diagnostic)]
pub enum EditorError {
    #[error("a {kind} node already exists in this workspace")]
    #[diagnostic(
        code(flowcanvas::editor::singleton_exists),
        help("appEntry and end nodes are singletons; delete the existing one first.")
    )]
    SingletonExists { kind: NodeKind },

    #[error("unknown node: {0}")]
    #[diagnostic(code(flowcanvas::editor::unknown_node))]
    UnknownNode(NodeId),

    #[error("unknown connection: {0}")]
    #[diagnostic(code(flowcanvas::editor::unknown_connection))]
    UnknownConnection(ConnectionId),

    #[error("node {node} has no output port {output}")]
    #[diagnostic(code(flowcanvas::editor::unknown_output))]
    UnknownOutput { node: NodeId, output: OutputId },

    #[error("node {node} has no input port {input}")]
    #[diagnostic(code(flowcanvas::editor::unknown_input))]
    UnknownInput { node: NodeId, input: InputId },

    #[error("a node cannot be connected to itself")]
    #[diagnostic(code(flowcanvas::editor::self_connection))]
    SelfConnection,

    #[error("these ports are already connected")]
    #[diagnostic(code(flowcanvas::editor::duplicate_connection))]
    DuplicateConnection,

    #[error("{kind} nodes have a fixed input schema; inputs cannot be added")]
    #[diagnostic(
        code(flowcanvas::editor::fixed_schema_input),
        help("Connect to one of the node's declared inputs instead.")
    )]
    FixedSchemaInput { kind: NodeKind },

    #[error("node {node} is a {kind} node, not an appEntry")]
    #[diagnostic(code(flowcanvas::editor::not_an_app_entry))]
    NotAnAppEntry { node: NodeId, kind: NodeKind },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Service(#[from] ServiceError),
}

/// Invariant-checked mutation facade over one workspace.
pub struct WorkflowEditor {
    store: Arc<WorkspaceStore>,
    apps: Arc<dyn AppService>,
    sync: AppConnectionSync,
}

impl WorkflowEditor {
    /// Create an editor over `store`, spawning its app-connection
    /// synchronization queue.
    #[must_use]
    pub fn new(store: Arc<WorkspaceStore>, apps: Arc<dyn AppService>) -> Self {
        let sync = AppConnectionSync::spawn(store.clone(), apps.clone());
        Self { store, apps, sync }
    }

    /// The underlying store (read access and subscriptions).
    #[must_use]
    pub fn store(&self) -> &Arc<WorkspaceStore> {
        &self.store
    }

    /// The workspace's reconciliation queue.
    #[must_use]
    pub fn sync(&self) -> &AppConnectionSync {
        &self.sync
    }

    /// Add a node, rejecting a second instance of a singleton kind.
    pub fn add_node(
        &self,
        node: Node,
        ui: Option<NodeUiState>,
    ) -> Result<NodeId, EditorError> {
        let kind = node.content.kind();
        if kind.is_singleton() && self.has_node_of_kind(kind) {
            return Err(EditorError::SingletonExists { kind });
        }
        let id = node.id;
        self.store.add_node(node, ui);
        self.sync.request_sync();
        Ok(id)
    }

    /// Duplicate a node with fresh identities. Singleton kinds cannot be
    /// duplicated: the original already occupies the slot.
    pub fn duplicate_node(&self, id: NodeId) -> Result<NodeId, EditorError> {
        let ws = self.store.snapshot();
        let node = ws.node(id).ok_or(EditorError::UnknownNode(id))?;
        let kind = node.content.kind();
        if kind.is_singleton() {
            return Err(EditorError::SingletonExists { kind });
        }
        let copy = node.duplicated();
        let copy_id = copy.id;
        self.store.add_node(copy, None);
        self.sync.request_sync();
        Ok(copy_id)
    }

    /// Paste a batch of nodes, assigning fresh identities.
    ///
    /// Singleton-kind nodes are skipped when the workspace (or an earlier
    /// node in the batch) already holds one; everything else is inserted.
    /// Returns the ids actually inserted, in batch order.
    pub fn paste_nodes(&self, batch: Vec<Node>) -> Vec<NodeId> {
        let mut inserted = Vec::new();
        for node in batch {
            let kind = node.content.kind();
            if kind.is_singleton() && self.has_node_of_kind(kind) {
                tracing::debug!(%kind, "skipping pasted singleton node; one already exists");
                continue;
            }
            let copy = node.duplicated();
            inserted.push(copy.id);
            self.store.add_node(copy, None);
        }
        if !inserted.is_empty() {
            self.sync.request_sync();
        }
        inserted
    }

    /// Apply a closure to a node's content or ports.
    pub fn update_node(
        &self,
        id: NodeId,
        mutate: impl FnOnce(&mut Node),
    ) -> Result<(), EditorError> {
        if self.store.update_node(id, mutate) {
            Ok(())
        } else {
            Err(EditorError::UnknownNode(id))
        }
    }

    /// Connect an output port to an existing input port.
    pub fn connect(
        &self,
        output_node: NodeId,
        output_id: OutputId,
        input_node: NodeId,
        input_id: InputId,
    ) -> Result<ConnectionId, EditorError> {
        let ws = self.store.snapshot();
        self.validate_output(&ws, output_node, output_id)?;
        if output_node == input_node {
            return Err(EditorError::SelfConnection);
        }
        let target = ws
            .node(input_node)
            .ok_or(EditorError::UnknownNode(input_node))?;
        if target.input(input_id).is_none() {
            return Err(EditorError::UnknownInput {
                node: input_node,
                input: input_id,
            });
        }
        if ws.connections.iter().any(|c| {
            c.output_node == output_node
                && c.output_id == output_id
                && c.input_node == input_node
                && c.input_id == input_id
        }) {
            return Err(EditorError::DuplicateConnection);
        }

        let connection = Connection::new(output_node, output_id, input_node, input_id);
        let connection_id = connection.id;
        self.store.add_connection(connection);
        self.sync.request_sync();
        Ok(connection_id)
    }

    /// Connect an output port to a free-form node, growing a new input.
    ///
    /// Fixed-schema kinds reject this; their inputs come from the action
    /// definition, not from connections.
    pub fn connect_with_new_input(
        &self,
        output_node: NodeId,
        output_id: OutputId,
        input_node: NodeId,
        label: &str,
    ) -> Result<ConnectionId, EditorError> {
        let ws = self.store.snapshot();
        self.validate_output(&ws, output_node, output_id)?;
        if output_node == input_node {
            return Err(EditorError::SelfConnection);
        }
        let target = ws
            .node(input_node)
            .ok_or(EditorError::UnknownNode(input_node))?;
        let kind = target.content.kind();
        if kind.has_fixed_inputs() {
            return Err(EditorError::FixedSchemaInput { kind });
        }

        let input = Input::new(label);
        let input_id = input.id;
        self.store.update_node(input_node, |node| {
            node.inputs.push(input);
        });
        let connection = Connection::new(output_node, output_id, input_node, input_id);
        let connection_id = connection.id;
        self.store.add_connection(connection);
        self.sync.request_sync();
        Ok(connection_id)
    }

    /// Remove a connection. A free-form target also sheds the input entry
    /// when no other connection still feeds it.
    pub fn disconnect(&self, connection_id: ConnectionId) -> Result<(), EditorError> {
        let ws = self.store.snapshot();
        let connection = ws
            .connection(connection_id)
            .ok_or(EditorError::UnknownConnection(connection_id))?
            .clone();
        self.store.remove_connection(connection_id);

        let target_kind = ws
            .node(connection.input_node)
            .map(|n| n.content.kind());
        let still_fed = ws.connections.iter().any(|c| {
            c.id != connection_id
                && c.input_node == connection.input_node
                && c.input_id == connection.input_id
        });
        if let Some(kind) = target_kind
            && !kind.has_fixed_inputs()
            && !still_fed
        {
            self.store.update_node(connection.input_node, |node| {
                node.inputs.retain(|input| input.id != connection.input_id);
            });
        }

        self.sync.request_sync();
        Ok(())
    }

    /// Compute the widened delete set for the requested nodes.
    ///
    /// When the plan `requires_confirmation`, the embedder must confirm
    /// with the user before calling [`apply_delete`](Self::apply_delete);
    /// declining simply means never applying the plan.
    #[must_use]
    pub fn plan_delete(&self, requested: impl IntoIterator<Item = NodeId>) -> DeletePlan {
        let ws = self.store.snapshot();
        cascade::expand_delete_set(requested, &ws.nodes)
    }

    /// Apply a delete plan: commit the cascaded graph change atomically,
    /// then best-effort delete the App records that backed removed entry
    /// nodes. A failed remote delete is logged and never rolls back the
    /// local graph.
    pub async fn apply_delete(&self, plan: &DeletePlan) {
        if plan.node_ids.is_empty() {
            return;
        }
        let ws = self.store.snapshot();
        let app_ids = cascade::apps_backing_deleted_entries(&plan.node_ids, &ws.nodes);
        let outcome =
            cascade::compute_graph_after_delete(&plan.node_ids, &ws.nodes, &ws.connections, &ws.ui);
        self.store.commit_delete(outcome);

        for app_id in app_ids {
            if let Err(error) = self.apps.delete_app(app_id).await {
                tracing::warn!(%app_id, %error, "failed to delete app record for removed entry node");
            }
        }
        self.sync.request_sync();
    }

    /// Configure an entry node, lazily creating its backing App record on
    /// first use. Idempotent: an already configured entry returns its
    /// existing App id.
    pub async fn configure_app_entry(
        &self,
        node_id: NodeId,
        name: &str,
    ) -> Result<AppId, EditorError> {
        let ws = self.store.snapshot();
        let node = ws.node(node_id).ok_or(EditorError::UnknownNode(node_id))?;
        let NodeContent::AppEntry { app_id } = &node.content else {
            return Err(EditorError::NotAnAppEntry {
                node: node_id,
                kind: node.content.kind(),
            });
        };
        if let Some(existing) = app_id {
            return Ok(*existing);
        }

        let app = App::new(ws.id, node_id, name);
        let app_id = app.id;
        self.apps.save_app(app).await?;
        self.store.update_node(node_id, |node| {
            if let NodeContent::AppEntry { app_id: slot } = &mut node.content {
                *slot = Some(app_id);
            }
        });
        tracing::debug!(%app_id, %node_id, "created app record for entry node");
        self.sync.request_sync();
        Ok(app_id)
    }

    /// Set a node's overlay state, with explicit persist intent.
    pub fn set_node_ui(&self, id: NodeId, ui: NodeUiState, persist: Persist) {
        self.store.set_node_ui(id, ui, persist);
    }

    /// Set the viewport, with explicit persist intent.
    pub fn set_viewport(&self, viewport: Viewport, persist: Persist) {
        self.store.set_viewport(viewport, persist);
    }

    /// Replace the connection selection, with explicit persist intent.
    pub fn set_selected_connections(&self, ids: Vec<ConnectionId>, persist: Persist) {
        self.store.set_selected_connections(ids, persist);
    }

    /// Rename the workspace.
    pub fn rename_workspace(&self, name: impl Into<String>) {
        self.store.set_name(name);
    }

    fn has_node_of_kind(&self, kind: NodeKind) -> bool {
        self.store
            .snapshot()
            .nodes
            .iter()
            .any(|n| n.content.kind() == kind)
    }

    fn validate_output(
        &self,
        ws: &crate::workspace::Workspace,
        node_id: NodeId,
        output_id: OutputId,
    ) -> Result<(), EditorError> {
        let node = ws.node(node_id).ok_or(EditorError::UnknownNode(node_id))?;
        if node.output(output_id).is_none() {
            return Err(EditorError::UnknownOutput {
                node: node_id,
                output: output_id,
            });
        }
        Ok(())
    }
}
