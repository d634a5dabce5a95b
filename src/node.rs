//! Node types for the workflow graph.
//!
//! A [`Node`] is a typed unit of the workflow canvas: a content variant
//! describing what the node does, plus the ordered input and output ports
//! that connections attach to. The content variant is a tagged union so
//! every call site that branches on node kind matches exhaustively; adding
//! a new kind without handling it everywhere is a compile error.
//!
//! Two kinds are *singletons*: a workspace holds at most one
//! [`NodeContent::AppEntry`] and at most one [`NodeContent::End`] node.
//! That invariant is enforced by the usecase layer
//! ([`WorkflowEditor`](crate::editor::WorkflowEditor)), not here; this
//! module only exposes the [`NodeKind::is_singleton`] predicate.
//!
//! # Examples
//!
//! ```rust
//! use flowcanvas::node::{Node, NodeContent, NodeKind};
//!
//! let node = Node::new(NodeContent::TextGeneration {
//!     prompt: "Summarize the attached file".into(),
//! });
//! assert_eq!(node.content.kind(), NodeKind::TextGeneration);
//! // Generators expose a default output port out of the box.
//! assert_eq!(node.outputs.len(), 1);
//! assert!(node.inputs.is_empty());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{AppId, InputId, NodeId, OutputId};

/// A typed unit of the workflow graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub content: NodeContent,
    /// Ordered, named input ports. For free-form kinds these are created by
    /// connecting an upstream output; for [`NodeContent::Action`] they are
    /// part of the action's schema and never user-added.
    #[serde(default)]
    pub inputs: Vec<Input>,
    /// Ordered, named output ports.
    #[serde(default)]
    pub outputs: Vec<Output>,
}

/// The content variant of a node, discriminated by kind.
///
/// Serialized with an explicit `type` tag so the document format matches
/// what the canvas frontend produces.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NodeContent {
    /// A language-model prompt node.
    TextGeneration { prompt: String },
    /// An uploaded file made available to downstream nodes.
    File {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        file_name: Option<String>,
    },
    /// A fetched web page made available to downstream nodes.
    WebPage {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
    },
    /// An event source that starts a run.
    Trigger { event: String },
    /// A fixed-schema action invocation; its inputs are structural.
    Action { command: String },
    /// The published entry point of the workspace's App sub-graph.
    ///
    /// `app_id` is `None` until the node is configured; the backing App
    /// record is created lazily on first configuration.
    AppEntry {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        app_id: Option<AppId>,
    },
    /// The exit of the App sub-graph.
    End,
    /// A vector-store lookup node.
    VectorStore {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        store_id: Option<String>,
    },
}

/// Discriminant of [`NodeContent`], used for display, errors, and
/// kind-level predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    TextGeneration,
    File,
    WebPage,
    Trigger,
    Action,
    AppEntry,
    End,
    VectorStore,
}

impl NodeKind {
    /// Kinds of which at most one instance may exist per workspace.
    #[must_use]
    pub fn is_singleton(&self) -> bool {
        matches!(self, NodeKind::AppEntry | NodeKind::End)
    }

    /// Kinds whose input list is part of a fixed schema rather than
    /// user-added. Cascading deletion never prunes these inputs; the slot
    /// stays declared-but-unconnected when its upstream disappears.
    #[must_use]
    pub fn has_fixed_inputs(&self) -> bool {
        matches!(self, NodeKind::Action)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::TextGeneration => "textGeneration",
            NodeKind::File => "file",
            NodeKind::WebPage => "webPage",
            NodeKind::Trigger => "trigger",
            NodeKind::Action => "action",
            NodeKind::AppEntry => "appEntry",
            NodeKind::End => "end",
            NodeKind::VectorStore => "vectorStore",
        };
        write!(f, "{name}")
    }
}

impl NodeContent {
    /// The kind discriminant of this content variant.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeContent::TextGeneration { .. } => NodeKind::TextGeneration,
            NodeContent::File { .. } => NodeKind::File,
            NodeContent::WebPage { .. } => NodeKind::WebPage,
            NodeContent::Trigger { .. } => NodeKind::Trigger,
            NodeContent::Action { .. } => NodeKind::Action,
            NodeContent::AppEntry { .. } => NodeKind::AppEntry,
            NodeContent::End => NodeKind::End,
            NodeContent::VectorStore { .. } => NodeKind::VectorStore,
        }
    }
}

/// A named input port on a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Input {
    pub id: InputId,
    pub label: String,
    /// Stable key downstream consumers use to address this input's value.
    pub accessor: String,
}

impl Input {
    /// Create an input with a fresh id and an accessor derived from the
    /// label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let accessor = slugify(&label);
        Self {
            id: InputId::new(),
            label,
            accessor,
        }
    }
}

/// A named output port on a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Output {
    pub id: OutputId,
    pub label: String,
    pub accessor: String,
}

impl Output {
    /// Create an output with a fresh id and an accessor derived from the
    /// label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        let accessor = slugify(&label);
        Self {
            id: OutputId::new(),
            label,
            accessor,
        }
    }
}

fn slugify(label: &str) -> String {
    label
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

impl Node {
    /// Create a node with a fresh id and the default port set for its kind.
    ///
    /// Source-like kinds get their canonical output; [`NodeContent::End`]
    /// gets its single result input. [`NodeContent::Action`] starts with no
    /// ports because its schema comes from the action definition; supply it
    /// via [`with_inputs`](Self::with_inputs).
    #[must_use]
    pub fn new(content: NodeContent) -> Self {
        let (inputs, outputs) = default_ports(&content);
        Self {
            id: NodeId::new(),
            content,
            inputs,
            outputs,
        }
    }

    /// Replace the input ports.
    #[must_use]
    pub fn with_inputs(mut self, inputs: Vec<Input>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Replace the output ports.
    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<Output>) -> Self {
        self.outputs = outputs;
        self
    }

    /// A structural copy with fresh node and port identities.
    ///
    /// Used by duplicate/paste: connections referencing the original's
    /// ports must not resolve against the copy.
    #[must_use]
    pub fn duplicated(&self) -> Self {
        Self {
            id: NodeId::new(),
            content: self.content.clone(),
            inputs: self
                .inputs
                .iter()
                .map(|i| Input {
                    id: InputId::new(),
                    label: i.label.clone(),
                    accessor: i.accessor.clone(),
                })
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|o| Output {
                    id: OutputId::new(),
                    label: o.label.clone(),
                    accessor: o.accessor.clone(),
                })
                .collect(),
        }
    }

    /// Look up an output port by id.
    #[must_use]
    pub fn output(&self, id: OutputId) -> Option<&Output> {
        self.outputs.iter().find(|o| o.id == id)
    }

    /// Look up an input port by id.
    #[must_use]
    pub fn input(&self, id: InputId) -> Option<&Input> {
        self.inputs.iter().find(|i| i.id == id)
    }
}

fn default_ports(content: &NodeContent) -> (Vec<Input>, Vec<Output>) {
    match content {
        NodeContent::TextGeneration { .. } => (vec![], vec![Output::new("Generated text")]),
        NodeContent::File { .. } => (vec![], vec![Output::new("File")]),
        NodeContent::WebPage { .. } => (vec![], vec![Output::new("Page content")]),
        NodeContent::Trigger { .. } => (vec![], vec![Output::new("On trigger")]),
        NodeContent::Action { .. } => (vec![], vec![]),
        NodeContent::AppEntry { .. } => (vec![], vec![Output::new("Entry")]),
        NodeContent::End => (vec![Input::new("Result")], vec![]),
        NodeContent::VectorStore { .. } => (vec![Input::new("Query")], vec![Output::new("Results")]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_predicates() {
        assert!(NodeKind::AppEntry.is_singleton());
        assert!(NodeKind::End.is_singleton());
        assert!(!NodeKind::TextGeneration.is_singleton());
        assert!(NodeKind::Action.has_fixed_inputs());
        assert!(!NodeKind::End.has_fixed_inputs());
    }

    #[test]
    fn default_ports_per_kind() {
        let end = Node::new(NodeContent::End);
        assert_eq!(end.inputs.len(), 1);
        assert!(end.outputs.is_empty());

        let entry = Node::new(NodeContent::AppEntry { app_id: None });
        assert!(entry.inputs.is_empty());
        assert_eq!(entry.outputs.len(), 1);

        let action = Node::new(NodeContent::Action {
            command: "send-mail".into(),
        });
        assert!(action.inputs.is_empty() && action.outputs.is_empty());
    }

    #[test]
    fn duplicated_gets_fresh_identities() {
        let node = Node::new(NodeContent::TextGeneration {
            prompt: "hi".into(),
        });
        let copy = node.duplicated();
        assert_ne!(node.id, copy.id);
        assert_ne!(node.outputs[0].id, copy.outputs[0].id);
        assert_eq!(node.outputs[0].accessor, copy.outputs[0].accessor);
        assert_eq!(node.content, copy.content);
    }

    #[test]
    fn content_serializes_with_type_tag() {
        let node = Node::new(NodeContent::AppEntry { app_id: None });
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["content"]["type"], "appEntry");
    }
}
