//! Directed connections between node ports.
//!
//! A [`Connection`] is an edge from one node's output port to another
//! node's input port. Connections carry no payload; they are pure topology
//! and are only meaningful while both endpoints and the referenced ports
//! exist. Endpoint validation is the usecase layer's job
//! ([`WorkflowEditor::connect`](crate::editor::WorkflowEditor::connect));
//! the store treats connections as opaque edges.

use serde::{Deserialize, Serialize};

use crate::types::{ConnectionId, InputId, NodeId, OutputId};

/// A directed edge from `(output_node, output_id)` to
/// `(input_node, input_id)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub output_node: NodeId,
    pub output_id: OutputId,
    pub input_node: NodeId,
    pub input_id: InputId,
}

impl Connection {
    /// Create a connection with a fresh id.
    #[must_use]
    pub fn new(
        output_node: NodeId,
        output_id: OutputId,
        input_node: NodeId,
        input_id: InputId,
    ) -> Self {
        Self {
            id: ConnectionId::new(),
            output_node,
            output_id,
            input_node,
            input_id,
        }
    }

    /// Whether either endpoint of this connection is the given node.
    #[must_use]
    pub fn touches(&self, node: NodeId) -> bool {
        self.output_node == node || self.input_node == node
    }
}
