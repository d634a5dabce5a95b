//! The remotely persisted App record.
//!
//! An [`App`] is the publishable face of a workspace: it points at the
//! workspace's entry node and records whether the entry currently reaches
//! an end node. The record lives in a remote service (see
//! [`AppService`](crate::services::AppService)); this module only defines
//! its shape and the validation applied before every remote write.
//!
//! Shape invariant: `end_node_id` is present if and only if the record is
//! [`AppState::Connected`]. [`App::validate`] enforces this and the
//! synchronizer refuses to persist a record that fails it.

use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{AppId, NodeId, WorkspaceId};

/// Whether the App's entry node currently reaches an end node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    Connected,
    Disconnected,
}

/// A publishable entry point into a workspace, persisted separately from
/// the workspace document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub id: AppId,
    pub workspace_id: WorkspaceId,
    pub entry_node_id: NodeId,
    /// Present exactly when `state == Connected`; never carries a stale
    /// value while disconnected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_node_id: Option<NodeId>,
    pub state: AppState,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl App {
    /// A fresh, disconnected record for a newly configured entry node.
    #[must_use]
    pub fn new(workspace_id: WorkspaceId, entry_node_id: NodeId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: AppId::new(),
            workspace_id,
            entry_node_id,
            end_node_id: None,
            state: AppState::Disconnected,
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the state/end coupling invariant.
    pub fn validate(&self) -> Result<(), AppValidationError> {
        match (self.state, self.end_node_id) {
            (AppState::Connected, None) => Err(AppValidationError::ConnectedWithoutEnd {
                app_id: self.id.to_string(),
            }),
            (AppState::Disconnected, Some(end)) => Err(AppValidationError::DisconnectedWithEnd {
                app_id: self.id.to_string(),
                end_node_id: end.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

/// An App record failed shape validation before a remote write.
#[derive(Debug, Error, Diagnostic)]
pub enum AppValidationError {
    #[error("app {app_id} is connected but has no end node id")]
    #[diagnostic(
        code(flowcanvas::app::connected_without_end),
        help("Set end_node_id to the reachable end node before saving.")
    )]
    ConnectedWithoutEnd { app_id: String },

    #[error("app {app_id} is disconnected but still references end node {end_node_id}")]
    #[diagnostic(
        code(flowcanvas::app::disconnected_with_end),
        help("Clear end_node_id when the entry no longer reaches an end node.")
    )]
    DisconnectedWithEnd { app_id: String, end_node_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_app_is_disconnected_and_valid() {
        let app = App::new(WorkspaceId::new(), NodeId::new(), "demo");
        assert_eq!(app.state, AppState::Disconnected);
        assert!(app.end_node_id.is_none());
        assert!(app.validate().is_ok());
    }

    #[test]
    fn validate_rejects_mismatched_state() {
        let mut app = App::new(WorkspaceId::new(), NodeId::new(), "demo");
        app.state = AppState::Connected;
        assert!(app.validate().is_err());

        app.end_node_id = Some(NodeId::new());
        assert!(app.validate().is_ok());

        app.state = AppState::Disconnected;
        assert!(app.validate().is_err());
    }
}
