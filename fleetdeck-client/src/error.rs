//! Error types for the fleetdeck client.

use crate::config::ConfigError;
use std::sync::Arc;

/// Errors produced by the REST client, the query cache, and the realtime
/// channel.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("API error {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("authentication required")]
    Unauthorized,
    #[error("request cancelled")]
    Cancelled,
    #[error("Invalid filter parameters: {0}")]
    InvalidFilter(String),
    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl ClientError {
    /// Whether a retry with backoff may succeed.
    ///
    /// Transport-level failures and server errors are transient; everything
    /// else (auth, validation, decoding) fails the same way on every
    /// attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(err) => err.is_timeout() || err.is_connect(),
            ClientError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Clonable error shared by every consumer of one in-flight query.
///
/// Concurrent `query` calls for the same key await a single shared fetch;
/// when that fetch fails, each awaiter receives the same underlying error
/// through this wrapper.
#[derive(Debug, Clone, thiserror::Error)]
#[error(transparent)]
pub struct QueryError(Arc<ClientError>);

impl QueryError {
    /// Get the underlying client error.
    pub fn inner(&self) -> &ClientError {
        &self.0
    }

    /// Whether the query was cancelled by `clear()`.
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.0, ClientError::Cancelled)
    }
}

impl From<ClientError> for QueryError {
    fn from(err: ClientError) -> Self {
        Self(Arc::new(err))
    }
}
