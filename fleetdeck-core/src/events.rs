//! Change events pushed over the invalidation channel.
//!
//! The backend broadcasts a named event whenever server-side state changes.
//! `agent:update` carries no payload beyond the signal itself; `task:update`
//! carries the full updated task record so the client can patch cached rows
//! in place.

use crate::Task;
use serde::{Deserialize, Serialize};

/// A server push notification about changed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum ChangeEvent {
    /// Some agent changed; clients re-fetch agents on demand.
    #[serde(rename = "agent:update")]
    AgentUpdate,

    /// One task changed; the full updated record is attached.
    #[serde(rename = "task:update")]
    TaskUpdate(Task),
}

impl ChangeEvent {
    /// Get the wire name of the event for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            ChangeEvent::AgentUpdate => "agent:update",
            ChangeEvent::TaskUpdate(_) => "task:update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AgentId, EntityIdType, TaskId, TaskStatus, TaskType};
    use chrono::Utc;

    fn sample_task() -> Task {
        Task {
            task_id: TaskId::generate(),
            agent_id: AgentId::generate(),
            task_type: TaskType::FileOperation,
            parameters: serde_json::json!({"path": "/tmp/report.txt"}),
            status: TaskStatus::Completed,
            output: None,
            timeout_secs: None,
            started_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_agent_update_wire_form() {
        let json = serde_json::to_value(&ChangeEvent::AgentUpdate).expect("serialize");
        assert_eq!(json, serde_json::json!({"event": "agent:update"}));

        let back: ChangeEvent =
            serde_json::from_str(r#"{"event": "agent:update"}"#).expect("deserialize");
        assert_eq!(back, ChangeEvent::AgentUpdate);
    }

    #[test]
    fn test_task_update_roundtrip() {
        let event = ChangeEvent::TaskUpdate(sample_task());
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"task:update\""));

        let back: ChangeEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(event, back);
    }

    #[test]
    fn test_event_type_names() {
        assert_eq!(ChangeEvent::AgentUpdate.event_type(), "agent:update");
        assert_eq!(
            ChangeEvent::TaskUpdate(sample_task()).event_type(),
            "task:update"
        );
    }
}
