//! The workspace document: the unit of persistence.
//!
//! A [`Workspace`] bundles the graph topology (nodes and connections) with
//! the UI overlay (per-node presentation state, viewport, connection
//! selection) under a single id and schema version. The overlay is part of
//! the persisted document but logically separate from topology; overlay
//! mutations can opt out of persistence per call (see
//! [`Persist`](crate::store::Persist)).
//!
//! The serialized layout mirrors what the canvas frontend reads and
//! writes:
//!
//! ```json
//! {
//!   "id": "…",
//!   "schemaVersion": 2,
//!   "name": "Untitled workflow",
//!   "nodes": [...],
//!   "connections": [...],
//!   "ui": { "nodeState": {...}, "viewport": {...}, "selectedConnectionIds": [...] }
//! }
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::node::{Node, NodeKind};
use crate::types::{ConnectionId, NodeId, WorkspaceId};

/// Schema version stamped on newly created documents.
pub const SCHEMA_VERSION: u32 = 2;

/// The canonical workspace document.
///
/// Invariant (maintained by the store's mutators): node ids and connection
/// ids are unique within the document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: WorkspaceId,
    pub schema_version: u32,
    pub name: String,
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub ui: UiState,
}

impl Workspace {
    /// Create an empty workspace with a fresh id and the current schema
    /// version.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: WorkspaceId::new(),
            schema_version: SCHEMA_VERSION,
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
            ui: UiState::default(),
        }
    }

    /// Look up a node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Look up a connection by id.
    #[must_use]
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    /// All nodes of the given kind.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.content.kind() == kind)
    }

    /// The workspace's App entry node, if one exists.
    #[must_use]
    pub fn app_entry(&self) -> Option<&Node> {
        self.nodes_of_kind(NodeKind::AppEntry).next()
    }

    /// The workspace's end node, if one exists.
    #[must_use]
    pub fn end_node(&self) -> Option<&Node> {
        self.nodes_of_kind(NodeKind::End).next()
    }
}

/// Per-workspace UI overlay: presentation state keyed by node id plus the
/// current connection selection and viewport.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    #[serde(default)]
    pub node_state: FxHashMap<NodeId, NodeUiState>,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default)]
    pub selected_connection_ids: Vec<ConnectionId>,
}

/// Transient presentation data for a single node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUiState {
    pub position: Position,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measured_size: Option<Size>,
}

impl NodeUiState {
    /// Overlay state at the given canvas position, unselected.
    #[must_use]
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            position: Position { x, y },
            selected: false,
            measured_size: None,
        }
    }
}

/// A canvas-space coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A measured node size in canvas units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// The canvas viewport: pan offset and zoom level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            zoom: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeContent;

    #[test]
    fn new_workspace_is_empty_and_versioned() {
        let ws = Workspace::new("Untitled workflow");
        assert_eq!(ws.schema_version, SCHEMA_VERSION);
        assert!(ws.nodes.is_empty());
        assert!(ws.connections.is_empty());
        assert!(ws.app_entry().is_none());
        assert!(ws.end_node().is_none());
    }

    #[test]
    fn document_round_trips_through_json() {
        let mut ws = Workspace::new("demo");
        let node = Node::new(NodeContent::End);
        ws.ui.node_state.insert(node.id, NodeUiState::at(10.0, 20.0));
        ws.nodes.push(node);

        let json = serde_json::to_string(&ws).unwrap();
        let back: Workspace = serde_json::from_str(&json).unwrap();
        assert_eq!(ws, back);
        // Field casing matches the frontend document format.
        assert!(json.contains("schemaVersion"));
        assert!(json.contains("nodeState"));
        assert!(json.contains("selectedConnectionIds"));
    }
}
