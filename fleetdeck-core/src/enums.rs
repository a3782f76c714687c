//! Status and type discriminators for fleet entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity collection discriminator.
///
/// Names the four server-side collections the dashboard reads. The cache
/// keys every query by collection, and collection-wide invalidation matches
/// on this value alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Agents,
    Tasks,
    Roles,
    Logs,
}

impl Collection {
    /// Wire/path name of the collection.
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Agents => "agents",
            Collection::Tasks => "tasks",
            Collection::Roles => "roles",
            Collection::Logs => "logs",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Collection {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "agents" => Ok(Collection::Agents),
            "tasks" => Ok(Collection::Tasks),
            "roles" => Ok(Collection::Roles),
            "logs" => Ok(Collection::Logs),
            _ => Err(EnumParseError::new("Collection", s)),
        }
    }
}

/// Connectivity status reported for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Active,
    Inactive,
    Disconnected,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
            AgentStatus::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AgentStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AgentStatus::Active),
            "inactive" => Ok(AgentStatus::Inactive),
            "disconnected" => Ok(AgentStatus::Disconnected),
            _ => Err(EnumParseError::new("AgentStatus", s)),
        }
    }
}

/// Execution status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Timeout => "timeout",
        }
    }

    /// A terminal task never changes status again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Queued | TaskStatus::Running)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(TaskStatus::Queued),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            "timeout" => Ok(TaskStatus::Timeout),
            _ => Err(EnumParseError::new("TaskStatus", s)),
        }
    }
}

/// Kind of work a task asks an agent to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    CommandShell,
    FileOperation,
    UiAutomation,
    BrowserAutomation,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::CommandShell => "command_shell",
            TaskType::FileOperation => "file_operation",
            TaskType::UiAutomation => "ui_automation",
            TaskType::BrowserAutomation => "browser_automation",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "command_shell" => Ok(TaskType::CommandShell),
            "file_operation" => Ok(TaskType::FileOperation),
            "ui_automation" => Ok(TaskType::UiAutomation),
            "browser_automation" => Ok(TaskType::BrowserAutomation),
            _ => Err(EnumParseError::new("TaskType", s)),
        }
    }
}

/// Error returned when a string does not name a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct EnumParseError {
    kind: &'static str,
    value: String,
}

impl EnumParseError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_roundtrip() {
        for collection in [
            Collection::Agents,
            Collection::Tasks,
            Collection::Roles,
            Collection::Logs,
        ] {
            let parsed: Collection = collection.as_str().parse().expect("parse");
            assert_eq!(parsed, collection);
        }
        assert!("widgets".parse::<Collection>().is_err());
    }

    #[test]
    fn test_task_status_wire_form_is_snake_case() {
        let json = serde_json::to_string(&TaskStatus::Queued).expect("serialize");
        assert_eq!(json, "\"queued\"");
        let back: TaskStatus = serde_json::from_str("\"timeout\"").expect("deserialize");
        assert_eq!(back, TaskStatus::Timeout);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(TaskStatus::Timeout.is_terminal());
    }
}
