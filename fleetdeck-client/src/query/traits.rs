//! Capability traits connecting records and fetchers to the query cache.

use crate::error::ClientError;
use async_trait::async_trait;
use fleetdeck_core::{Agent, Collection, EntityIdType, LogEntry, Role, Task};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

/// Marker trait for record types that can live in cached result sets.
///
/// The cache is generic over record shape; this trait supplies the two
/// facts it needs: which collection a record belongs to, and the unique
/// identifier used as the patch key.
pub trait CacheableRecord: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The collection this record type belongs to.
    fn collection() -> Collection;

    /// The unique identifier used when patching cached rows.
    fn record_id(&self) -> Uuid;
}

/// Asynchronous source of a collection read, invoked on cache miss.
#[async_trait]
pub trait RecordFetcher<T: CacheableRecord>: Send + Sync + 'static {
    async fn fetch(&self) -> Result<Vec<T>, ClientError>;
}

// ============================================================================
// CACHEABLE RECORD IMPLEMENTATIONS FOR FLEET ENTITIES
// ============================================================================

impl CacheableRecord for Agent {
    fn collection() -> Collection {
        Collection::Agents
    }

    fn record_id(&self) -> Uuid {
        self.agent_id.as_uuid()
    }
}

impl CacheableRecord for Task {
    fn collection() -> Collection {
        Collection::Tasks
    }

    fn record_id(&self) -> Uuid {
        self.task_id.as_uuid()
    }
}

impl CacheableRecord for Role {
    fn collection() -> Collection {
        Collection::Roles
    }

    fn record_id(&self) -> Uuid {
        self.role_id.as_uuid()
    }
}

impl CacheableRecord for LogEntry {
    fn collection() -> Collection {
        Collection::Logs
    }

    fn record_id(&self) -> Uuid {
        self.log_id.as_uuid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use fleetdeck_core::{AgentId, AgentStatus};

    #[test]
    fn test_record_collections() {
        assert_eq!(Agent::collection(), Collection::Agents);
        assert_eq!(Task::collection(), Collection::Tasks);
        assert_eq!(Role::collection(), Collection::Roles);
        assert_eq!(LogEntry::collection(), Collection::Logs);
    }

    #[test]
    fn test_agent_record_id_matches_entity_id() {
        let agent = Agent {
            agent_id: AgentId::generate(),
            hostname: "worker-01".to_string(),
            mac_hash: "3b2f".to_string(),
            nickname: None,
            role: None,
            status: AgentStatus::Active,
            last_seen: Utc::now(),
            created_at: Utc::now(),
            updated_at: None,
        };
        assert_eq!(agent.record_id(), agent.agent_id.as_uuid());
    }
}
