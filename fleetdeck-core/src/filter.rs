//! Filter parameter sets for collection list requests.
//!
//! Unset fields are skipped during serialization, so they never reach the
//! query string and never contribute to cache-key equality.

use crate::{AgentId, AgentStatus, TaskStatus, TaskType, Timestamp};
use serde::{Deserialize, Serialize};

/// Filters accepted by the agents list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AgentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Substring match over hostname and nickname.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl AgentFilters {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.role.is_none() && self.search.is_none()
    }
}

/// Filters accepted by the tasks list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_type: Option<TaskType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Timestamp>,
}

impl TaskFilters {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.agent_id.is_none()
            && self.task_type.is_none()
            && self.from.is_none()
            && self.to.is_none()
    }
}

/// Filters accepted by the system-log list endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<AgentId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Timestamp>,
}

impl LogFilters {
    pub fn is_empty(&self) -> bool {
        self.agent_id.is_none()
            && self.endpoint.is_none()
            && self.status.is_none()
            && self.from.is_none()
            && self.to.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_fields_are_skipped() {
        let filters = TaskFilters {
            status: Some(TaskStatus::Running),
            ..Default::default()
        };
        let json = serde_json::to_value(&filters).expect("serialize");
        assert_eq!(json, serde_json::json!({"status": "running"}));
    }

    #[test]
    fn test_default_filters_serialize_empty() {
        let json = serde_json::to_value(AgentFilters::default()).expect("serialize");
        assert_eq!(json, serde_json::json!({}));
        assert!(AgentFilters::default().is_empty());
    }
}
