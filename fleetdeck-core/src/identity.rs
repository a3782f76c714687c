//! Identity types for fleet entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Common interface for typed entity identifiers.
///
/// Every entity carries a UUID identifier wrapped in a distinct newtype so
/// that an `AgentId` can never be passed where a `TaskId` is expected. The
/// cache uses the raw UUID as its patch key.
pub trait EntityIdType: Copy + Eq + std::hash::Hash {
    /// Wrap an existing UUID.
    fn new(id: Uuid) -> Self;

    /// Get the raw UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh UUIDv7 identifier (timestamp-sortable).
    fn generate() -> Self
    where
        Self: Sized,
    {
        Self::new(Uuid::now_v7())
    }
}

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            fn new(id: Uuid) -> Self {
                Self(id)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// Identifier for a fleet agent.
    AgentId
);
entity_id!(
    /// Identifier for a task assigned to an agent.
    TaskId
);
entity_id!(
    /// Identifier for an access role.
    RoleId
);
entity_id!(
    /// Identifier for a system log entry.
    LogId
);
entity_id!(
    /// Identifier for an administrator account.
    AdminId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip_through_serde() {
        let id = TaskId::generate();
        let json = serde_json::to_string(&id).expect("serialize");
        let back: TaskId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(id, back);
        // Transparent representation: plain UUID string on the wire.
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
    }

    #[test]
    fn test_generated_ids_are_distinct() {
        let a = AgentId::generate();
        let b = AgentId::generate();
        assert_ne!(a, b);
    }
}
