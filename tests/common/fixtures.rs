#![allow(dead_code)]

use std::sync::Arc;

use flowcanvas::editor::WorkflowEditor;
use flowcanvas::node::{Input, Node, NodeContent};
use flowcanvas::services::{InMemoryAppService, InMemoryWorkspaceBackend};
use flowcanvas::store::WorkspaceStore;
use flowcanvas::types::{InputId, NodeId, OutputId};
use flowcanvas::workspace::Workspace;

pub fn entry_node() -> Node {
    Node::new(NodeContent::AppEntry { app_id: None })
}

pub fn end_node() -> Node {
    Node::new(NodeContent::End)
}

pub fn text_node() -> Node {
    Node::new(NodeContent::TextGeneration {
        prompt: "Summarize the input".into(),
    })
}

pub fn action_node() -> Node {
    Node::new(NodeContent::Action {
        command: "send-mail".into(),
    })
    .with_inputs(vec![Input::new("Body")])
}

/// First output port of the node, looked up in the current snapshot.
pub fn output_of(store: &WorkspaceStore, node: NodeId) -> OutputId {
    store.snapshot().node(node).expect("node exists").outputs[0].id
}

/// First input port of the node, looked up in the current snapshot.
pub fn input_of(store: &WorkspaceStore, node: NodeId) -> InputId {
    store.snapshot().node(node).expect("node exists").inputs[0].id
}

/// An editor over a fresh workspace with in-memory services.
pub fn editor_fixture() -> (WorkflowEditor, Arc<WorkspaceStore>, Arc<InMemoryAppService>) {
    let store = Arc::new(WorkspaceStore::new(Workspace::new("test workspace")));
    let apps = Arc::new(InMemoryAppService::new());
    let editor = WorkflowEditor::new(store.clone(), apps.clone());
    (editor, store, apps)
}

/// A fresh store plus recording backend for persistence tests.
pub fn store_fixture() -> (Arc<WorkspaceStore>, Arc<InMemoryWorkspaceBackend>) {
    let store = Arc::new(WorkspaceStore::new(Workspace::new("test workspace")));
    let backend = Arc::new(InMemoryWorkspaceBackend::new());
    (store, backend)
}
