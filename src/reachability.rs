//! Reachability analysis over directed connection edges.
//!
//! Pure functions answering one question: starting from one or more nodes,
//! does any end-kind node lie on a directed path? Breadth-first search over
//! an adjacency list built from the connection set; nodes are marked
//! visited the moment they are enqueued so shared descendants are expanded
//! once and self-loops or duplicate edges cannot loop forever. The search
//! short-circuits on the first end node dequeued; no path is reconstructed.
//!
//! Cost is O(V+E) per call. Callers invoke this on every mutation that can
//! change connectivity (node add/remove, connection add/remove); the
//! persistence layer's relevance predicate keeps UI-only transitions from
//! reaching here.
//!
//! # Examples
//!
//! ```rust
//! use flowcanvas::connection::Connection;
//! use flowcanvas::node::{Node, NodeContent};
//! use flowcanvas::reachability::find_reachable_end;
//!
//! let entry = Node::new(NodeContent::AppEntry { app_id: None });
//! let end = Node::new(NodeContent::End);
//! let edge = Connection::new(
//!     entry.id,
//!     entry.outputs[0].id,
//!     end.id,
//!     end.inputs[0].id,
//! );
//!
//! let nodes = vec![entry.clone(), end.clone()];
//! assert_eq!(
//!     find_reachable_end(&nodes, &[edge], entry.id),
//!     Some(end.id),
//! );
//! assert_eq!(find_reachable_end(&nodes, &[], entry.id), None);
//! ```

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

use crate::connection::Connection;
use crate::node::{Node, NodeKind};
use crate::types::NodeId;

/// First end-kind node reachable from `start`, if any.
#[must_use]
pub fn find_reachable_end(
    nodes: &[Node],
    connections: &[Connection],
    start: NodeId,
) -> Option<NodeId> {
    first_reachable_end(nodes, connections, std::iter::once(start))
}

/// Whether any end-kind node is reachable from any of `starts`.
#[must_use]
pub fn any_end_reachable(nodes: &[Node], connections: &[Connection], starts: &[NodeId]) -> bool {
    first_reachable_end(nodes, connections, starts.iter().copied()).is_some()
}

fn first_reachable_end(
    nodes: &[Node],
    connections: &[Connection],
    starts: impl IntoIterator<Item = NodeId>,
) -> Option<NodeId> {
    let sinks: FxHashSet<NodeId> = nodes
        .iter()
        .filter(|n| n.content.kind() == NodeKind::End)
        .map(|n| n.id)
        .collect();
    if sinks.is_empty() {
        return None;
    }

    let mut adjacency: FxHashMap<NodeId, Vec<NodeId>> = FxHashMap::default();
    for connection in connections {
        adjacency
            .entry(connection.output_node)
            .or_default()
            .push(connection.input_node);
    }

    let mut visited = FxHashSet::default();
    let mut queue = VecDeque::new();
    for start in starts {
        if visited.insert(start) {
            queue.push_back(start);
        }
    }

    while let Some(current) = queue.pop_front() {
        if sinks.contains(&current) {
            return Some(current);
        }
        let Some(successors) = adjacency.get(&current) else {
            continue;
        };
        for &next in successors {
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeContent;
    use crate::types::{InputId, OutputId};

    fn entry() -> Node {
        Node::new(NodeContent::AppEntry { app_id: None })
    }

    fn text() -> Node {
        Node::new(NodeContent::TextGeneration {
            prompt: "p".into(),
        })
    }

    fn end() -> Node {
        Node::new(NodeContent::End)
    }

    fn edge(from: &Node, to: &Node) -> Connection {
        Connection::new(from.id, OutputId::new(), to.id, InputId::new())
    }

    #[test]
    fn direct_and_transitive_paths() {
        let a = entry();
        let b = text();
        let c = end();
        let nodes = vec![a.clone(), b.clone(), c.clone()];
        let connections = vec![edge(&a, &b), edge(&b, &c)];

        assert_eq!(find_reachable_end(&nodes, &connections, a.id), Some(c.id));
        assert!(any_end_reachable(&nodes, &connections, &[a.id]));
    }

    #[test]
    fn removing_the_bridge_breaks_reachability() {
        let a = entry();
        let b = text();
        let c = end();
        let nodes = vec![a.clone(), b.clone(), c.clone()];

        let connections = vec![edge(&a, &b)];
        assert_eq!(find_reachable_end(&nodes, &connections, a.id), None);
    }

    #[test]
    fn unrelated_components_do_not_affect_the_answer() {
        let a = entry();
        let b = text();
        let c = end();
        let stray_end = end();
        let stray_text = text();
        let nodes = vec![
            a.clone(),
            b.clone(),
            c.clone(),
            stray_end.clone(),
            stray_text.clone(),
        ];
        // stray_text -> stray_end is a separate component; the answer from
        // `a` must be `c`, not the stray end.
        let connections = vec![edge(&a, &b), edge(&b, &c), edge(&stray_text, &stray_end)];
        assert_eq!(find_reachable_end(&nodes, &connections, a.id), Some(c.id));
    }

    #[test]
    fn empty_sink_set_returns_immediately() {
        let a = entry();
        let b = text();
        let nodes = vec![a.clone(), b.clone()];
        let connections = vec![edge(&a, &b)];
        assert_eq!(find_reachable_end(&nodes, &connections, a.id), None);
        assert!(!any_end_reachable(&nodes, &connections, &[a.id]));
    }

    #[test]
    fn self_loops_and_duplicate_edges_terminate() {
        let a = entry();
        let b = text();
        let nodes = vec![a.clone(), b.clone()];
        let connections = vec![
            edge(&a, &b),
            edge(&a, &b),
            edge(&b, &b),
            edge(&b, &a),
        ];
        assert_eq!(find_reachable_end(&nodes, &connections, a.id), None);
    }

    #[test]
    fn multi_start_hits_any_component() {
        let a = entry();
        let b = text();
        let c = end();
        let nodes = vec![a.clone(), b.clone(), c.clone()];
        let connections = vec![edge(&b, &c)];

        assert!(!any_end_reachable(&nodes, &connections, &[a.id]));
        assert!(any_end_reachable(&nodes, &connections, &[a.id, b.id]));
        assert!(!any_end_reachable(&nodes, &connections, &[]));
    }
}
