//! Cached entries and the read wrapper returned to consumers.

use crate::error::{ClientError, QueryError};
use crate::query::traits::CacheableRecord;
use chrono::Utc;
use fleetdeck_core::Timestamp;
use std::time::Duration;
use uuid::Uuid;

/// One row of a cached result set: the record's identifier plus its
/// serialized form. Keeping rows serialized makes the cache generic over
/// record shape while preserving typed access at the edges.
#[derive(Debug, Clone)]
pub(crate) struct CachedRow {
    pub id: Uuid,
    pub value: serde_json::Value,
}

impl CachedRow {
    pub fn from_record<T: CacheableRecord>(record: &T) -> Result<Self, ClientError> {
        Ok(Self {
            id: record.record_id(),
            value: serde_json::to_value(record)?,
        })
    }
}

/// The stored result set plus freshness metadata for one query key.
#[derive(Debug, Clone)]
pub(crate) struct CachedEntry {
    /// Ordered rows, ordering defined by the backend response.
    pub rows: Vec<CachedRow>,
    pub fetched_at: Timestamp,
    /// Monotonic within one cache lifetime: set by invalidation, cleared
    /// only by a completed fetch.
    pub stale: bool,
}

impl CachedEntry {
    pub fn new(rows: Vec<CachedRow>, fetched_at: Timestamp) -> Self {
        Self {
            rows,
            fetched_at,
            stale: false,
        }
    }

    /// Fresh entries are served without a fetch. An entry is stale once
    /// flagged, or once older than the freshness window (when one is set).
    pub fn is_fresh(&self, stale_after: Option<Duration>) -> bool {
        if self.stale {
            return false;
        }
        match stale_after {
            Some(window) => {
                let age = Utc::now()
                    .signed_duration_since(self.fetched_at)
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                age <= window
            }
            None => true,
        }
    }

    pub fn decode<T: CacheableRecord>(&self) -> Result<Vec<T>, QueryError> {
        decode_rows(&self.rows)
    }
}

pub(crate) fn decode_rows<T: CacheableRecord>(rows: &[CachedRow]) -> Result<Vec<T>, QueryError> {
    rows.iter()
        .map(|row| serde_json::from_value(row.value.clone()).map_err(ClientError::from))
        .collect::<Result<Vec<T>, ClientError>>()
        .map_err(QueryError::from)
}

/// Result of a cached query, carrying freshness metadata.
///
/// Degraded reads (a fetch failed but stale-but-valid data exists) resolve
/// successfully with the last-known-good rows and the error attached —
/// the UI is never blanked by a transient failure.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    rows: Vec<T>,
    fetched_at: Timestamp,
    served_from_cache: bool,
    error: Option<QueryError>,
}

impl<T> QueryResult<T> {
    pub(crate) fn from_cache(rows: Vec<T>, fetched_at: Timestamp) -> Self {
        Self {
            rows,
            fetched_at,
            served_from_cache: true,
            error: None,
        }
    }

    pub(crate) fn from_fetch(rows: Vec<T>, fetched_at: Timestamp) -> Self {
        Self {
            rows,
            fetched_at,
            served_from_cache: false,
            error: None,
        }
    }

    pub(crate) fn degraded(rows: Vec<T>, fetched_at: Timestamp, error: QueryError) -> Self {
        Self {
            rows,
            fetched_at,
            served_from_cache: true,
            error: Some(error),
        }
    }

    /// Borrow the rows.
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Consume the wrapper and return the rows.
    pub fn into_rows(self) -> Vec<T> {
        self.rows
    }

    /// When the underlying data was fetched from the backend.
    pub fn fetched_at(&self) -> Timestamp {
        self.fetched_at
    }

    /// Whether this read was served from the cache rather than a fetch.
    pub fn served_from_cache(&self) -> bool {
        self.served_from_cache
    }

    /// Whether this is stale-but-valid data served because a fetch failed.
    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// The fetch error attached to a degraded read.
    pub fn error(&self) -> Option<&QueryError> {
        self.error.as_ref()
    }
}
