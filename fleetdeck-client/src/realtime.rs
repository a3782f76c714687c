//! WebSocket invalidation channel with reconnect backoff.
//!
//! Maintains the long-lived connection to the backend and translates push
//! events into cache operations. Events are dispatched only while
//! Connected. Missed events are not replayed after a reconnect; consumers
//! reconcile by re-fetching on demand. Channel errors are logged, never
//! surfaced to consumers.

use crate::config::{ClientConfig, HeartbeatConfig, ReconnectConfig};
use crate::error::ClientError;
use crate::query::QueryCache;
use crate::rest::TokenSlot;
use crate::retry::{jittered_backoff, next_delay};
use fleetdeck_core::{ChangeEvent, Collection};
use futures_util::{SinkExt, StreamExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection state of the invalidation channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
        };
        write!(f, "{}", name)
    }
}

/// WebSocket connector holding endpoint, credentials, and timing policy.
#[derive(Clone)]
pub struct WsChannel {
    endpoint: String,
    token: TokenSlot,
    reconnect: ReconnectConfig,
    heartbeat: HeartbeatConfig,
}

impl WsChannel {
    pub fn new(config: &ClientConfig, token: TokenSlot) -> Self {
        Self {
            endpoint: config.ws_endpoint.clone(),
            token,
            reconnect: config.reconnect.clone(),
            heartbeat: config.heartbeat.clone(),
        }
    }

    pub async fn connect(&self) -> Result<WsStream, ClientError> {
        let mut request = self.endpoint.as_str().into_client_request()?;
        if let Some(token) = self.token.get() {
            let value = format!("Bearer {}", token);
            if let Ok(value) = HeaderValue::from_str(&value) {
                request.headers_mut().insert(AUTHORIZATION, value);
            }
        }
        let (stream, _) = tokio_tungstenite::connect_async(request).await?;
        Ok(stream)
    }
}

/// Handle to a spawned channel task.
///
/// Dropping the handle shuts the channel down.
pub struct ChannelHandle {
    state_tx: Arc<watch::Sender<ChannelState>>,
    state_rx: watch::Receiver<ChannelState>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    pub fn state(&self) -> ChannelState {
        *self.state_rx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Connected
    }

    /// Subscribe to state transitions.
    pub fn state_changes(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    /// Stop the channel task. Idempotent.
    pub fn shutdown(&self) {
        self.task.abort();
        let _ = self.state_tx.send(ChannelState::Disconnected);
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawn the channel task: connect, dispatch events into the cache, and
/// reconnect forever with jittered exponential backoff. Decoded events are
/// additionally forwarded to `events` when a sender is supplied.
pub fn spawn_channel(
    ws: WsChannel,
    cache: QueryCache,
    events: Option<mpsc::Sender<ChangeEvent>>,
) -> ChannelHandle {
    let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
    let state_tx = Arc::new(state_tx);
    let task_state = Arc::clone(&state_tx);
    let task = tokio::spawn(async move {
        run_channel(ws, cache, events, task_state).await;
    });
    ChannelHandle {
        state_tx,
        state_rx,
        task,
    }
}

async fn run_channel(
    ws: WsChannel,
    cache: QueryCache,
    events: Option<mpsc::Sender<ChangeEvent>>,
    state: Arc<watch::Sender<ChannelState>>,
) {
    let mut backoff = ws.reconnect.initial_ms;
    loop {
        let _ = state.send(ChannelState::Connecting);
        match ws.connect().await {
            Ok(stream) => {
                let _ = state.send(ChannelState::Connected);
                tracing::info!(endpoint = %ws.endpoint, "invalidation channel connected");
                backoff = ws.reconnect.initial_ms;

                let reason =
                    drive_connection(stream, &cache, events.as_ref(), &ws.heartbeat).await;
                tracing::warn!(reason, "invalidation channel disconnected");
            }
            Err(err) => {
                tracing::warn!(error = %err, "invalidation channel connect failed");
            }
        }
        let _ = state.send(ChannelState::Disconnected);

        let delay = jittered_backoff(backoff, ws.reconnect.jitter_ms);
        tokio::time::sleep(Duration::from_millis(delay)).await;
        backoff = next_delay(backoff, ws.reconnect.multiplier, ws.reconnect.max_ms);
    }
}

/// Pump one live connection until it drops. Returns the disconnect reason.
async fn drive_connection(
    stream: WsStream,
    cache: &QueryCache,
    events: Option<&mpsc::Sender<ChangeEvent>>,
    heartbeat: &HeartbeatConfig,
) -> &'static str {
    let (mut sink, mut stream) = stream.split();
    let mut ping = tokio::time::interval(Duration::from_millis(heartbeat.interval_ms));
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let timeout = Duration::from_millis(heartbeat.timeout_ms);
    let mut last_inbound = Instant::now();

    loop {
        tokio::select! {
            _ = ping.tick() => {
                if last_inbound.elapsed() > timeout {
                    return "heartbeat timeout";
                }
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    return "ping failed";
                }
            }
            message = stream.next() => {
                match message {
                    Some(Ok(Message::Text(text))) => {
                        last_inbound = Instant::now();
                        match serde_json::from_str::<ChangeEvent>(&text) {
                            Ok(event) => {
                                apply_change_event(cache, &event);
                                if let Some(sender) = events {
                                    let _ = sender.send(event).await;
                                }
                            }
                            Err(err) => {
                                tracing::debug!(error = %err, "ignoring undecodable channel frame");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => return "connection closed",
                    Some(Ok(_)) => {
                        // Pings, pongs, and binary frames all count as liveness.
                        last_inbound = Instant::now();
                    }
                    Some(Err(err)) => {
                        tracing::debug!(error = %err, "transport error");
                        return "transport error";
                    }
                    None => return "stream ended",
                }
            }
        }
    }
}

/// Translate one change event into cache operations.
///
/// `agent:update` carries no payload, so every agents query is invalidated.
/// `task:update` patches the updated record into every tasks entry holding
/// it; filter-membership changes are not reconciled, so a patched row stays
/// in place even when the entry's filter would now exclude it.
pub fn apply_change_event(cache: &QueryCache, event: &ChangeEvent) {
    match event {
        ChangeEvent::AgentUpdate => {
            cache.invalidate_collection(Collection::Agents);
        }
        ChangeEvent::TaskUpdate(task) => match cache.patch(task) {
            Ok(patched) => {
                tracing::debug!(task_id = %task.task_id, patched, "applied task update");
            }
            Err(err) => {
                tracing::warn!(task_id = %task.task_id, error = %err, "failed to apply task update");
            }
        },
    }
}
