//! Client facade tying REST, cache, and realtime channel together.
//!
//! `FleetClient` is an explicitly constructed context object with explicit
//! lifecycle: build it from a validated config, optionally connect the
//! realtime channel, and tear everything down with `shutdown`. All
//! consumers share one cache and one channel through it.

use crate::config::ClientConfig;
use crate::error::{ClientError, QueryError};
use crate::query::{QueryCache, QueryKey, QueryResult, RecordFetcher, RetainGuard};
use crate::realtime::{spawn_channel, ChannelHandle, WsChannel};
use crate::rest::RestClient;
use async_trait::async_trait;
use fleetdeck_core::{
    Agent, AgentFilters, AgentId, ChangeEvent, Collection, CreateAgentRequest, CreateRoleRequest,
    CreateTaskRequest, LogEntry, LogFilters, LoginRequest, LoginResponse, Role, RoleId, Task,
    TaskFilters, TaskId, UpdateAgentRequest, UpdateRoleRequest,
};
use tokio::sync::mpsc;

pub struct FleetClient {
    config: ClientConfig,
    rest: RestClient,
    cache: QueryCache,
    channel: Option<ChannelHandle>,
}

impl FleetClient {
    /// Build a client from a validated configuration. The realtime channel
    /// is not connected until [`connect_realtime`](Self::connect_realtime).
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let rest = RestClient::new(&config)?;
        let cache = QueryCache::new(config.retry.clone(), config.stale_after_ms);
        Ok(Self {
            config,
            rest,
            cache,
            channel: None,
        })
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn channel(&self) -> Option<&ChannelHandle> {
        self.channel.as_ref()
    }

    /// Spawn the invalidation channel wired to this client's cache.
    /// Idempotent: an already-running channel is left alone.
    pub fn connect_realtime(&mut self) {
        self.spawn_realtime(None);
    }

    /// Like [`connect_realtime`](Self::connect_realtime), additionally
    /// forwarding decoded events to `events`.
    pub fn connect_realtime_with_events(&mut self, events: mpsc::Sender<ChangeEvent>) {
        self.spawn_realtime(Some(events));
    }

    fn spawn_realtime(&mut self, events: Option<mpsc::Sender<ChangeEvent>>) {
        if self.channel.is_none() {
            let ws = WsChannel::new(&self.config, self.rest.token().clone());
            self.channel = Some(spawn_channel(ws, self.cache.clone(), events));
        }
    }

    /// Stop the realtime channel and discard all cached data.
    pub fn shutdown(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.shutdown();
        }
        self.cache.clear();
    }

    // ------------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------------

    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ClientError> {
        self.rest.login(req).await
    }

    /// End the session: the bearer token is dropped and the cache is
    /// cleared (cancelling in-flight fetches) even when the logout request
    /// itself fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.rest.logout().await;
        self.cache.clear();
        result
    }

    // ------------------------------------------------------------------------
    // Cached collection reads
    // ------------------------------------------------------------------------

    pub async fn agents(&self, filters: &AgentFilters) -> Result<QueryResult<Agent>, QueryError> {
        let key = QueryKey::filtered(Collection::Agents, filters)?;
        self.cache
            .query(
                key,
                AgentListFetcher {
                    rest: self.rest.clone(),
                    filters: filters.clone(),
                },
            )
            .await
    }

    pub async fn tasks(&self, filters: &TaskFilters) -> Result<QueryResult<Task>, QueryError> {
        let key = QueryKey::filtered(Collection::Tasks, filters)?;
        self.cache
            .query(
                key,
                TaskListFetcher {
                    rest: self.rest.clone(),
                    filters: filters.clone(),
                },
            )
            .await
    }

    pub async fn roles(&self) -> Result<QueryResult<Role>, QueryError> {
        let key = QueryKey::collection(Collection::Roles);
        self.cache
            .query(
                key,
                RoleListFetcher {
                    rest: self.rest.clone(),
                },
            )
            .await
    }

    pub async fn logs(&self, filters: &LogFilters) -> Result<QueryResult<LogEntry>, QueryError> {
        let key = QueryKey::filtered(Collection::Logs, filters)?;
        self.cache
            .query(
                key,
                LogListFetcher {
                    rest: self.rest.clone(),
                    filters: filters.clone(),
                },
            )
            .await
    }

    /// Hold a reference to `key` for eviction accounting while a view is
    /// mounted.
    pub fn retain(&self, key: QueryKey) -> RetainGuard {
        self.cache.retain(key)
    }

    // ------------------------------------------------------------------------
    // Single-entity reads (not cached)
    // ------------------------------------------------------------------------

    pub async fn agent(&self, agent_id: AgentId) -> Result<Agent, ClientError> {
        self.rest.get_agent(agent_id).await
    }

    pub async fn task(&self, task_id: TaskId) -> Result<Task, ClientError> {
        self.rest.get_task(task_id).await
    }

    pub async fn role(&self, role_id: RoleId) -> Result<Role, ClientError> {
        self.rest.get_role(role_id).await
    }

    // ------------------------------------------------------------------------
    // Mutations: REST call, then invalidate the affected collection
    // ------------------------------------------------------------------------

    pub async fn create_agent(&self, req: &CreateAgentRequest) -> Result<Agent, ClientError> {
        let agent = self.rest.create_agent(req).await?;
        self.cache.invalidate_collection(Collection::Agents);
        Ok(agent)
    }

    pub async fn update_agent(
        &self,
        agent_id: AgentId,
        req: &UpdateAgentRequest,
    ) -> Result<Agent, ClientError> {
        let agent = self.rest.update_agent(agent_id, req).await?;
        self.cache.invalidate_collection(Collection::Agents);
        Ok(agent)
    }

    pub async fn create_task(&self, req: &CreateTaskRequest) -> Result<Task, ClientError> {
        let task = self.rest.create_task(req).await?;
        self.cache.invalidate_collection(Collection::Tasks);
        Ok(task)
    }

    pub async fn cancel_task(&self, task_id: TaskId) -> Result<Task, ClientError> {
        let task = self.rest.cancel_task(task_id).await?;
        self.cache.invalidate_collection(Collection::Tasks);
        Ok(task)
    }

    pub async fn create_role(&self, req: &CreateRoleRequest) -> Result<Role, ClientError> {
        let role = self.rest.create_role(req).await?;
        self.cache.invalidate_collection(Collection::Roles);
        Ok(role)
    }

    pub async fn update_role(
        &self,
        role_id: RoleId,
        req: &UpdateRoleRequest,
    ) -> Result<Role, ClientError> {
        let role = self.rest.update_role(role_id, req).await?;
        self.cache.invalidate_collection(Collection::Roles);
        Ok(role)
    }
}

// ============================================================================
// RECORD FETCHERS FOR EACH COLLECTION
// ============================================================================

struct AgentListFetcher {
    rest: RestClient,
    filters: AgentFilters,
}

#[async_trait]
impl RecordFetcher<Agent> for AgentListFetcher {
    async fn fetch(&self) -> Result<Vec<Agent>, ClientError> {
        self.rest.list_agents(&self.filters).await
    }
}

struct TaskListFetcher {
    rest: RestClient,
    filters: TaskFilters,
}

#[async_trait]
impl RecordFetcher<Task> for TaskListFetcher {
    async fn fetch(&self) -> Result<Vec<Task>, ClientError> {
        self.rest.list_tasks(&self.filters).await
    }
}

struct RoleListFetcher {
    rest: RestClient,
}

#[async_trait]
impl RecordFetcher<Role> for RoleListFetcher {
    async fn fetch(&self) -> Result<Vec<Role>, ClientError> {
        self.rest.list_roles().await
    }
}

struct LogListFetcher {
    rest: RestClient,
    filters: LogFilters,
}

#[async_trait]
impl RecordFetcher<LogEntry> for LogListFetcher {
    async fn fetch(&self) -> Result<Vec<LogEntry>, ClientError> {
        self.rest.list_logs(&self.filters).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HeartbeatConfig, ReconnectConfig, RetryConfig};

    fn base_config() -> ClientConfig {
        ClientConfig {
            api_base_url: "http://localhost:8080".to_string(),
            ws_endpoint: "ws://localhost:8080/ws".to_string(),
            request_timeout_ms: 5_000,
            stale_after_ms: 5_000,
            heartbeat: HeartbeatConfig {
                interval_ms: 10_000,
                timeout_ms: 30_000,
            },
            reconnect: ReconnectConfig {
                initial_ms: 250,
                max_ms: 5_000,
                multiplier: 1.5,
                jitter_ms: 100,
            },
            retry: RetryConfig {
                max_attempts: 3,
                initial_ms: 1_000,
                max_ms: 30_000,
                multiplier: 2.0,
            },
        }
    }

    #[test]
    fn test_new_validates_config() {
        let mut config = base_config();
        config.api_base_url = String::new();
        assert!(FleetClient::new(config).is_err());
        assert!(FleetClient::new(base_config()).is_ok());
    }

    #[test]
    fn test_channel_absent_until_connected() {
        let client = FleetClient::new(base_config()).expect("client");
        assert!(client.channel().is_none());
    }
}
