//! Fleetdeck Core - Entity Types
//!
//! Pure data structures with no behavior. The client crate depends on this.

pub mod entities;
pub mod enums;
pub mod events;
pub mod filter;
pub mod identity;
pub mod types;

pub use entities::{AdminUser, Agent, LogEntry, Role, Task, TaskOutput};
pub use enums::{AgentStatus, Collection, EnumParseError, TaskStatus, TaskType};
pub use events::ChangeEvent;
pub use filter::{AgentFilters, LogFilters, TaskFilters};
pub use identity::{AdminId, AgentId, EntityIdType, LogId, RoleId, TaskId, Timestamp};
pub use types::{
    ApiErrorBody, CreateAgentRequest, CreateRoleRequest, CreateTaskRequest, LoginRequest,
    LoginResponse, UpdateAgentRequest, UpdateRoleRequest,
};
