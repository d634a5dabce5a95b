//! Core identifier types for the flowcanvas workspace engine.
//!
//! Every entity in a workspace document carries an opaque, process-unique
//! identity. These are UUID-backed newtypes so that a node id can never be
//! confused with a connection id at a call site, and so the persisted
//! document round-trips ids as plain strings.
//!
//! # Key Types
//!
//! - [`NodeId`] / [`ConnectionId`]: graph topology identities
//! - [`InputId`] / [`OutputId`]: port identities referenced by connections
//! - [`WorkspaceId`]: identity of the persisted document
//! - [`AppId`]: identity of a remotely persisted App record
//!
//! # Examples
//!
//! ```rust
//! use flowcanvas::types::NodeId;
//!
//! let a = NodeId::new();
//! let b = NodeId::new();
//! assert_ne!(a, b);
//!
//! // Ids serialize as bare strings inside the document.
//! let json = serde_json::to_string(&a).unwrap();
//! assert!(json.starts_with('"'));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! id_type {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a fresh, process-unique identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// The underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type! {
    /// Identity of a node within a workspace graph.
    NodeId
}

id_type! {
    /// Identity of a directed connection between two node ports.
    ConnectionId
}

id_type! {
    /// Identity of a named input port on a node.
    InputId
}

id_type! {
    /// Identity of a named output port on a node.
    OutputId
}

id_type! {
    /// Identity of a workspace document (the unit of persistence).
    WorkspaceId
}

id_type! {
    /// Identity of a remotely persisted App record backing an entry node.
    AppId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let ids: Vec<NodeId> = (0..64).map(|_| NodeId::new()).collect();
        for (i, a) in ids.iter().enumerate() {
            for b in &ids[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn ids_round_trip_as_strings() {
        let id = ConnectionId::new();
        let json = serde_json::to_string(&id).unwrap();
        let back: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
