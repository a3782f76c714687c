//! REST client and facade tests against a mock HTTP server.

use chrono::Utc;
use fleetdeck_client::{
    ClientConfig, ClientError, FleetClient, HeartbeatConfig, ReconnectConfig, RestClient,
    RetryConfig,
};
use fleetdeck_core::{
    AdminId, AdminUser, Agent, AgentFilters, AgentId, AgentStatus, CreateAgentRequest,
    CreateTaskRequest, EntityIdType, LoginRequest, LoginResponse, Task, TaskFilters, TaskId,
    TaskStatus, TaskType,
};

fn config_for(base_url: &str) -> ClientConfig {
    ClientConfig {
        api_base_url: base_url.to_string(),
        ws_endpoint: "ws://localhost:9/ws".to_string(),
        request_timeout_ms: 5_000,
        stale_after_ms: 0,
        heartbeat: HeartbeatConfig {
            interval_ms: 10_000,
            timeout_ms: 30_000,
        },
        reconnect: ReconnectConfig {
            initial_ms: 10,
            max_ms: 100,
            multiplier: 1.5,
            jitter_ms: 0,
        },
        retry: RetryConfig {
            max_attempts: 1,
            initial_ms: 1,
            max_ms: 1,
            multiplier: 1.0,
        },
    }
}

fn make_agent(hostname: &str) -> Agent {
    Agent {
        agent_id: AgentId::generate(),
        hostname: hostname.to_string(),
        mac_hash: "ab12".to_string(),
        nickname: None,
        role: Some("kiosk".to_string()),
        status: AgentStatus::Active,
        last_seen: Utc::now(),
        created_at: Utc::now(),
        updated_at: None,
    }
}

fn make_task(status: TaskStatus) -> Task {
    Task {
        task_id: TaskId::generate(),
        agent_id: AgentId::generate(),
        task_type: TaskType::CommandShell,
        parameters: serde_json::json!({"command": "uptime"}),
        status,
        output: None,
        timeout_secs: None,
        started_at: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn json_body<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).expect("serialize body")
}

#[tokio::test]
async fn login_stores_token_and_attaches_bearer_header() {
    let mut server = mockito::Server::new_async().await;
    let login_response = LoginResponse {
        token: "tok-123".to_string(),
        user: AdminUser {
            admin_id: AdminId::generate(),
            username: "ops".to_string(),
            email: None,
            created_at: Utc::now(),
        },
    };
    let login_mock = server
        .mock("POST", "/api/auth/login")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json_body(&login_response))
        .create_async()
        .await;
    let roles_mock = server
        .mock("GET", "/api/roles")
        .match_header("authorization", "Bearer tok-123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("[]")
        .create_async()
        .await;

    let rest = RestClient::new(&config_for(&server.url())).expect("rest client");
    assert!(!rest.token().is_set());

    let response = rest
        .login(&LoginRequest {
            username: "ops".to_string(),
            password: "hunter2".to_string(),
        })
        .await
        .expect("login");
    assert_eq!(response.token, "tok-123");
    assert!(rest.token().is_set());

    let roles = rest.list_roles().await.expect("roles");
    assert!(roles.is_empty());

    login_mock.assert_async().await;
    roles_mock.assert_async().await;
}

#[tokio::test]
async fn list_agents_serializes_filters_as_query_params() {
    let mut server = mockito::Server::new_async().await;
    let agent = make_agent("worker-01");
    let mock = server
        .mock("GET", "/api/agents")
        .match_query(mockito::Matcher::AllOf(vec![
            mockito::Matcher::UrlEncoded("status".into(), "active".into()),
            mockito::Matcher::UrlEncoded("role".into(), "kiosk".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json_body(&vec![agent.clone()]))
        .create_async()
        .await;

    let rest = RestClient::new(&config_for(&server.url())).expect("rest client");
    let agents = rest
        .list_agents(&AgentFilters {
            status: Some(AgentStatus::Active),
            role: Some("kiosk".to_string()),
            search: None,
        })
        .await
        .expect("list agents");

    assert_eq!(agents, vec![agent]);
    mock.assert_async().await;
}

#[tokio::test]
async fn validation_error_body_is_decoded() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/api/agents")
        .with_status(422)
        .with_header("content-type", "application/json")
        .with_body(r#"{"code": "validation_failed", "message": "hostname is required"}"#)
        .create_async()
        .await;

    let rest = RestClient::new(&config_for(&server.url())).expect("rest client");
    let err = rest
        .create_agent(&CreateAgentRequest {
            hostname: String::new(),
            mac_hash: "ab12".to_string(),
            nickname: None,
            role: None,
        })
        .await
        .expect_err("validation should fail");

    match err {
        ClientError::Api {
            status,
            code,
            message,
        } => {
            assert_eq!(status, 422);
            assert_eq!(code.as_deref(), Some("validation_failed"));
            assert_eq!(message, "hostname is required");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!rest.token().is_set());
    mock.assert_async().await;
}

#[tokio::test]
async fn unauthorized_maps_to_dedicated_error() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/tasks")
        .with_status(401)
        .with_body(r#"{"message": "token expired"}"#)
        .create_async()
        .await;

    let rest = RestClient::new(&config_for(&server.url())).expect("rest client");
    let err = rest
        .list_tasks(&TaskFilters::default())
        .await
        .expect_err("should be unauthorized");
    assert!(matches!(err, ClientError::Unauthorized));
}

#[tokio::test]
async fn cancel_task_posts_to_cancel_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let mut task = make_task(TaskStatus::Running);
    task.status = TaskStatus::Cancelled;
    let path = format!("/api/tasks/{}/cancel", task.task_id.as_uuid());
    let mock = server
        .mock("POST", path.as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json_body(&task))
        .create_async()
        .await;

    let rest = RestClient::new(&config_for(&server.url())).expect("rest client");
    let cancelled = rest.cancel_task(task.task_id).await.expect("cancel");
    assert_eq!(cancelled.status, TaskStatus::Cancelled);
    mock.assert_async().await;
}

#[tokio::test]
async fn logout_clears_token_even_when_request_fails() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/api/auth/logout")
        .with_status(500)
        .with_body(r#"{"message": "backend exploded"}"#)
        .create_async()
        .await;

    let rest = RestClient::new(&config_for(&server.url())).expect("rest client");
    rest.token().set("tok-123".to_string());

    let result = rest.logout().await;
    assert!(result.is_err());
    assert!(!rest.token().is_set());
}

#[tokio::test]
async fn create_task_invalidates_cached_tasks_collection() {
    let mut server = mockito::Server::new_async().await;
    let existing = make_task(TaskStatus::Running);
    let list_mock = server
        .mock("GET", "/api/tasks")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json_body(&vec![existing.clone()]))
        .expect(2)
        .create_async()
        .await;
    let created = make_task(TaskStatus::Queued);
    let create_mock = server
        .mock("POST", "/api/tasks")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(json_body(&created))
        .create_async()
        .await;

    let client = FleetClient::new(config_for(&server.url())).expect("client");
    let filters = TaskFilters::default();

    let first = client.tasks(&filters).await.expect("first read");
    assert!(!first.served_from_cache());

    let second = client.tasks(&filters).await.expect("cached read");
    assert!(second.served_from_cache());

    let task = client
        .create_task(&CreateTaskRequest {
            agent_id: created.agent_id,
            task_type: created.task_type,
            parameters: created.parameters.clone(),
            timeout_secs: None,
        })
        .await
        .expect("create task");
    assert_eq!(task.status, TaskStatus::Queued);

    let third = client.tasks(&filters).await.expect("refetched read");
    assert!(!third.served_from_cache());

    list_mock.assert_async().await;
    create_mock.assert_async().await;
}
