//! # Flowcanvas: Workspace Graph State & Persistence Engine
//!
//! Flowcanvas is the state engine behind a visual workflow designer: users
//! compose a directed graph of typed nodes (prompts, files, web pages,
//! triggers, actions, vector-store lookups, an App entry/end pair)
//! connected by typed input/output edges, and the graph is persisted as a
//! versioned workspace document.
//!
//! ## Core Concepts
//!
//! - **Workspace document**: nodes, connections, and the UI overlay under
//!   one id and schema version; the unit of persistence
//! - **Store**: the single source of truth, with primitive mutators and
//!   observable transitions
//! - **Editor**: the invariant-checked mutation API the canvas layer calls
//! - **Reachability**: pure BFS deriving whether the App entry reaches an
//!   end node
//! - **Cascade**: consistent delete planning (paired singletons, orphaned
//!   inputs, dangling connections, remote App cleanup)
//! - **App sync**: a per-workspace queue reconciling the remote App record
//!   with local reachability
//! - **Persistence**: debounced autosave with an at-most-one-in-flight,
//!   queued-retry save loop and a best-effort unload path
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use flowcanvas::editor::WorkflowEditor;
//! use flowcanvas::node::{Node, NodeContent};
//! use flowcanvas::services::InMemoryAppService;
//! use flowcanvas::store::WorkspaceStore;
//! use flowcanvas::workspace::Workspace;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(WorkspaceStore::new(Workspace::new("My workflow")));
//! let editor = WorkflowEditor::new(store.clone(), Arc::new(InMemoryAppService::new()));
//!
//! let entry = editor
//!     .add_node(Node::new(NodeContent::AppEntry { app_id: None }), None)
//!     .unwrap();
//! let end = editor.add_node(Node::new(NodeContent::End), None).unwrap();
//!
//! let ws = store.snapshot();
//! let entry_out = ws.node(entry).unwrap().outputs[0].id;
//! let end_in = ws.node(end).unwrap().inputs[0].id;
//! editor.connect(entry, entry_out, end, end_in).unwrap();
//!
//! assert!(store.is_start_connected_to_end());
//! # }
//! ```
//!
//! ## Module Guide
//!
//! - [`types`] - Identifier newtypes
//! - [`node`] / [`connection`] / [`workspace`] - The document model
//! - [`app`] - The remotely persisted App record
//! - [`store`] - Canonical document container with observable transitions
//! - [`reachability`] - Entry-to-end reachability analysis
//! - [`cascade`] - Cascading-delete planning
//! - [`editor`] - Invariant-checked mutation usecases
//! - [`app_sync`] - Serialized App record reconciliation
//! - [`persistence`] - Debounced save controller
//! - [`services`] - Abstract backend and App-service collaborators
//! - [`telemetry`] - Tracing setup helper

pub mod app;
pub mod app_sync;
pub mod cascade;
pub mod connection;
pub mod editor;
pub mod node;
pub mod persistence;
pub mod reachability;
pub mod services;
pub mod store;
pub mod telemetry;
pub mod types;
pub mod workspace;
