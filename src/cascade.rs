//! Cascading-delete planning for consistent graph removal.
//!
//! Deleting nodes is never a single-row operation: connections touching a
//! deleted node dangle, free-form inputs fed by a deleted output become
//! orphans, overlay entries leak, and the App entry / end pair must go
//! together. This module computes the *actual* change set for a requested
//! deletion, as pure data, before anything reaches the store:
//!
//! 1. [`expand_delete_set`] widens the requested ids to the paired
//!    singleton nodes and flags when the caller must confirm with the
//!    user first.
//! 2. [`compute_graph_after_delete`] produces the post-delete document
//!    parts, committed atomically via
//!    [`WorkspaceStore::commit_delete`](crate::store::WorkspaceStore::commit_delete).
//! 3. [`apps_backing_deleted_entries`] lists the remote App records to
//!    clean up afterwards (best effort; a failed remote delete never
//!    rolls back the local graph).
//!
//! Everything here is synchronous and side-effect free; the usecase layer
//! sequences confirmation, commit, and remote cleanup.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::connection::Connection;
use crate::node::{Node, NodeContent, NodeKind};
use crate::types::{AppId, ConnectionId, InputId, NodeId};
use crate::workspace::UiState;

/// The widened delete set for a requested node deletion.
#[derive(Clone, Debug)]
pub struct DeletePlan {
    /// Every node that will be removed, including paired singletons.
    pub node_ids: FxHashSet<NodeId>,
    /// The request touched the App entry / end pair, which is a
    /// destructive, non-obvious widening; the caller must obtain explicit
    /// user confirmation before applying the plan.
    pub requires_confirmation: bool,
}

/// The document parts after a delete, ready for an atomic commit.
#[derive(Clone, Debug)]
pub struct DeleteOutcome {
    pub nodes: Vec<Node>,
    pub connections: Vec<Connection>,
    pub ui: UiState,
}

/// Widen the requested ids to a consistent delete set.
///
/// The App entry and end nodes form a conceptually paired singleton pair:
/// when either is requested, both (as far as they exist) are deleted, and
/// the plan demands confirmation. Ids not present in the workspace are
/// dropped from the plan.
#[must_use]
pub fn expand_delete_set(
    requested: impl IntoIterator<Item = NodeId>,
    nodes: &[Node],
) -> DeletePlan {
    let known: FxHashSet<NodeId> = nodes.iter().map(|n| n.id).collect();
    let mut node_ids: FxHashSet<NodeId> = requested
        .into_iter()
        .filter(|id| known.contains(id))
        .collect();

    let entry = nodes
        .iter()
        .find(|n| n.content.kind() == NodeKind::AppEntry)
        .map(|n| n.id);
    let end = nodes
        .iter()
        .find(|n| n.content.kind() == NodeKind::End)
        .map(|n| n.id);

    let touches_pair = entry.is_some_and(|id| node_ids.contains(&id))
        || end.is_some_and(|id| node_ids.contains(&id));
    if touches_pair {
        node_ids.extend(entry);
        node_ids.extend(end);
    }

    DeletePlan {
        node_ids,
        requires_confirmation: touches_pair,
    }
}

/// Compute the post-delete document parts.
///
/// Removes every connection with an endpoint in the delete set, prunes the
/// specific inputs of surviving free-form nodes that were fed by a deleted
/// output (fixed-schema kinds keep their slots declared-but-unconnected),
/// drops overlay entries for deleted nodes, and strips deleted connection
/// ids from the selection.
#[must_use]
pub fn compute_graph_after_delete(
    delete: &FxHashSet<NodeId>,
    nodes: &[Node],
    connections: &[Connection],
    ui: &UiState,
) -> DeleteOutcome {
    let (removed, kept): (Vec<&Connection>, Vec<&Connection>) = connections
        .iter()
        .partition(|c| delete.iter().any(|id| c.touches(*id)));

    // Inputs on surviving nodes whose upstream output node is going away.
    let mut orphaned: FxHashMap<NodeId, FxHashSet<InputId>> = FxHashMap::default();
    for connection in &removed {
        if delete.contains(&connection.output_node) && !delete.contains(&connection.input_node) {
            orphaned
                .entry(connection.input_node)
                .or_default()
                .insert(connection.input_id);
        }
    }

    let mut kept_nodes: Vec<Node> = nodes
        .iter()
        .filter(|n| !delete.contains(&n.id))
        .cloned()
        .collect();
    for node in &mut kept_nodes {
        if node.content.kind().has_fixed_inputs() {
            continue;
        }
        if let Some(gone) = orphaned.get(&node.id) {
            node.inputs.retain(|input| !gone.contains(&input.id));
        }
    }

    let removed_ids: FxHashSet<ConnectionId> = removed.iter().map(|c| c.id).collect();
    let mut ui = ui.clone();
    ui.node_state.retain(|id, _| !delete.contains(id));
    ui.selected_connection_ids
        .retain(|id| !removed_ids.contains(id));

    DeleteOutcome {
        nodes: kept_nodes,
        connections: kept.into_iter().cloned().collect(),
        ui,
    }
}

/// App ids backing deleted, configured entry nodes.
///
/// Collected before the graph mutation; the caller requests remote
/// deletion of each after the local commit.
#[must_use]
pub fn apps_backing_deleted_entries(delete: &FxHashSet<NodeId>, nodes: &[Node]) -> Vec<AppId> {
    nodes
        .iter()
        .filter(|n| delete.contains(&n.id))
        .filter_map(|n| match &n.content {
            NodeContent::AppEntry { app_id } => *app_id,
            _ => None,
        })
        .collect()
}
