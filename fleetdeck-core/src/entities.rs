//! Core entity structures.

use crate::{
    AdminId, AgentId, AgentStatus, LogId, RoleId, TaskId, TaskStatus, TaskType, Timestamp,
};
use serde::{Deserialize, Serialize};

/// A remote agent process enrolled in the fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: AgentId,
    pub hostname: String,
    /// Hashed hardware address used for enrollment dedup.
    pub mac_hash: String,
    pub nickname: Option<String>,
    /// Name of the role governing which tasks the agent may run.
    pub role: Option<String>,
    pub status: AgentStatus,
    pub last_seen: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

/// A unit of work assigned to one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub agent_id: AgentId,
    pub task_type: TaskType,
    /// Free-form parameters interpreted by the agent per task type.
    pub parameters: serde_json::Value,
    pub status: TaskStatus,
    pub output: Option<TaskOutput>,
    pub timeout_secs: Option<u64>,
    pub started_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Captured result of a task run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub logs: Option<String>,
    pub error: Option<String>,
}

/// An access role: which applications a fleet member may use and which
/// tasks it receives by default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub role_id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub applications: Vec<String>,
    pub default_tasks: Vec<String>,
    pub created_at: Timestamp,
    pub updated_at: Option<Timestamp>,
}

/// One request recorded by the backend's audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub log_id: LogId,
    pub timestamp: Timestamp,
    pub endpoint: String,
    pub agent_id: Option<AgentId>,
    pub status: String,
    pub details: Option<String>,
}

/// Administrator account as returned by the login endpoint. Credentials
/// never cross the client boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    pub admin_id: AdminId,
    pub username: String,
    pub email: Option<String>,
    pub created_at: Timestamp,
}
