//! Fleetdeck client library.
//!
//! A REST/WebSocket client for the fleet administration backend: typed
//! collection reads served through a shared query cache, kept eventually
//! consistent by a push-based invalidation channel.

pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod realtime;
pub mod rest;
pub mod retry;

pub use client::FleetClient;
pub use config::{ClientConfig, ConfigError, HeartbeatConfig, ReconnectConfig, RetryConfig};
pub use error::{ClientError, QueryError};
pub use query::{
    CacheStats, CacheableRecord, QueryCache, QueryKey, QueryResult, RecordFetcher, RetainGuard,
};
pub use realtime::{apply_change_event, spawn_channel, ChannelHandle, ChannelState, WsChannel};
pub use rest::{RestClient, TokenSlot};
