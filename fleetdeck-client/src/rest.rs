//! REST client for the dashboard backend.

use crate::config::ClientConfig;
use crate::error::ClientError;
use fleetdeck_core::{
    Agent, AgentFilters, AgentId, ApiErrorBody, CreateAgentRequest, CreateRoleRequest,
    CreateTaskRequest, EntityIdType, LogEntry, LogFilters, LoginRequest, LoginResponse, Role,
    RoleId, Task, TaskFilters, TaskId, UpdateAgentRequest, UpdateRoleRequest,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Shared bearer-token cell.
///
/// Written by `login`/`logout`, read by every REST request and the
/// WebSocket handshake. Cloning shares the same slot.
#[derive(Clone, Default)]
pub struct TokenSlot {
    inner: Arc<RwLock<Option<String>>>,
}

impl TokenSlot {
    pub fn set(&self, token: String) {
        *self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn clear(&self) {
        *self
            .inner
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn get(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    token: TokenSlot,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let timeout = Duration::from_millis(config.request_timeout_ms);
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: TokenSlot::default(),
        })
    }

    /// The bearer-token slot shared with the realtime channel.
    pub fn token(&self) -> &TokenSlot {
        &self.token
    }

    // ------------------------------------------------------------------------
    // Auth endpoints
    // ------------------------------------------------------------------------

    /// Log in and store the issued bearer token for subsequent requests.
    pub async fn login(&self, req: &LoginRequest) -> Result<LoginResponse, ClientError> {
        let response: LoginResponse = self.post_json("/api/auth/login", req).await?;
        self.token.set(response.token.clone());
        Ok(response)
    }

    /// Log out. The local token is dropped even when the request fails.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.post_no_content("/api/auth/logout").await;
        self.token.clear();
        result
    }

    // ------------------------------------------------------------------------
    // Agent endpoints
    // ------------------------------------------------------------------------

    pub async fn list_agents(&self, filters: &AgentFilters) -> Result<Vec<Agent>, ClientError> {
        self.get_json("/api/agents", Some(filters)).await
    }

    pub async fn get_agent(&self, agent_id: AgentId) -> Result<Agent, ClientError> {
        let path = format!("/api/agents/{}", agent_id.as_uuid());
        self.get_json::<Agent, ()>(&path, None).await
    }

    pub async fn create_agent(&self, req: &CreateAgentRequest) -> Result<Agent, ClientError> {
        self.post_json("/api/agents", req).await
    }

    pub async fn update_agent(
        &self,
        agent_id: AgentId,
        req: &UpdateAgentRequest,
    ) -> Result<Agent, ClientError> {
        let path = format!("/api/agents/{}", agent_id.as_uuid());
        self.put_json(&path, req).await
    }

    // ------------------------------------------------------------------------
    // Task endpoints
    // ------------------------------------------------------------------------

    pub async fn list_tasks(&self, filters: &TaskFilters) -> Result<Vec<Task>, ClientError> {
        self.get_json("/api/tasks", Some(filters)).await
    }

    pub async fn get_task(&self, task_id: TaskId) -> Result<Task, ClientError> {
        let path = format!("/api/tasks/{}", task_id.as_uuid());
        self.get_json::<Task, ()>(&path, None).await
    }

    pub async fn create_task(&self, req: &CreateTaskRequest) -> Result<Task, ClientError> {
        self.post_json("/api/tasks", req).await
    }

    pub async fn cancel_task(&self, task_id: TaskId) -> Result<Task, ClientError> {
        let path = format!("/api/tasks/{}/cancel", task_id.as_uuid());
        self.post_empty(&path).await
    }

    // ------------------------------------------------------------------------
    // Role endpoints
    // ------------------------------------------------------------------------

    pub async fn list_roles(&self) -> Result<Vec<Role>, ClientError> {
        self.get_json::<Vec<Role>, ()>("/api/roles", None).await
    }

    pub async fn get_role(&self, role_id: RoleId) -> Result<Role, ClientError> {
        let path = format!("/api/roles/{}", role_id.as_uuid());
        self.get_json::<Role, ()>(&path, None).await
    }

    pub async fn create_role(&self, req: &CreateRoleRequest) -> Result<Role, ClientError> {
        self.post_json("/api/roles", req).await
    }

    pub async fn update_role(
        &self,
        role_id: RoleId,
        req: &UpdateRoleRequest,
    ) -> Result<Role, ClientError> {
        let path = format!("/api/roles/{}", role_id.as_uuid());
        self.put_json(&path, req).await
    }

    // ------------------------------------------------------------------------
    // Log endpoints
    // ------------------------------------------------------------------------

    pub async fn list_logs(&self, filters: &LogFilters) -> Result<Vec<LogEntry>, ClientError> {
        self.get_json("/api/logs", Some(filters)).await
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.token.get() {
            let value = format!("Bearer {}", token);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("")),
            );
        }
        headers
    }

    async fn get_json<T, Q>(&self, path: &str, query: Option<&Q>) -> Result<T, ClientError>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(url).headers(self.auth_headers());
        if let Some(query) = query {
            request = request.query(query);
        }
        let response = request.send().await?;
        self.parse_response(response).await
    }

    async fn post_json<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(url)
            .headers(self.auth_headers())
            .json(body)
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn put_json<T, B>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .put(url)
            .headers(self.auth_headers())
            .json(body)
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn post_empty<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(url)
            .headers(self.auth_headers())
            .send()
            .await?;
        self.parse_response(response).await
    }

    async fn post_no_content(&self, path: &str) -> Result<(), ClientError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(url)
            .headers(self.auth_headers())
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.error_from_response(status, response).await)
        }
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            Ok(response.json::<T>().await?)
        } else {
            Err(self.error_from_response(status, response).await)
        }
    }

    async fn error_from_response(
        &self,
        status: StatusCode,
        response: reqwest::Response,
    ) -> ClientError {
        if status == StatusCode::UNAUTHORIZED {
            return ClientError::Unauthorized;
        }
        let text = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiErrorBody>(&text) {
            Ok(body) => ClientError::Api {
                status: status.as_u16(),
                code: body.code,
                message: body.message,
            },
            Err(_) => ClientError::Api {
                status: status.as_u16(),
                code: None,
                message: text,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_slot_is_shared_across_clones() {
        let slot = TokenSlot::default();
        let clone = slot.clone();
        assert!(!clone.is_set());

        slot.set("abc".to_string());
        assert_eq!(clone.get().as_deref(), Some("abc"));

        clone.clear();
        assert!(!slot.is_set());
    }
}
