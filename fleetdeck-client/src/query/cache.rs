//! Process-wide query cache with single-flight fetches.
//!
//! Consumers read entity collections through [`QueryCache::query`]; the
//! invalidation channel keeps the cache eventually consistent by marking
//! entries stale or patching rows in place. All state lives behind one
//! non-async mutex that is never held across an await point.

use crate::config::RetryConfig;
use crate::error::{ClientError, QueryError};
use crate::query::entry::{decode_rows, CachedEntry, CachedRow, QueryResult};
use crate::query::key::QueryKey;
use crate::query::traits::{CacheableRecord, RecordFetcher};
use crate::retry::retry_fetch;
use chrono::Utc;
use fleetdeck_core::{Collection, Timestamp};
use futures_util::future::{AbortHandle, BoxFuture, Shared};
use futures_util::FutureExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type FetchOutcome = (Arc<Vec<CachedRow>>, Timestamp);
type SharedFetch = Shared<BoxFuture<'static, Result<FetchOutcome, QueryError>>>;

struct InflightFetch {
    shared: SharedFetch,
    abort: AbortHandle,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<QueryKey, CachedEntry>,
    inflight: HashMap<QueryKey, InflightFetch>,
    refs: HashMap<QueryKey, usize>,
    /// Bumped by `clear()`; a fetch started under an older epoch must not
    /// repopulate the wiped cache.
    epoch: u64,
    stats: CacheStats,
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Reads served from a fresh cached entry.
    pub hits: u64,
    /// Reads that started a fetch.
    pub misses: u64,
    /// Entries currently cached.
    pub entry_count: u64,
    /// Entries discarded by reference-counted eviction.
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Shared query cache keyed by [`QueryKey`].
///
/// Cloning is cheap; clones share the same entry table. The cache is the
/// only mutator of entry data: entries change via a completed fetch for
/// their exact key or a matching [`patch`](QueryCache::patch).
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Mutex<CacheInner>>,
    retry: RetryConfig,
    stale_after: Option<Duration>,
}

impl QueryCache {
    pub fn new(retry: RetryConfig, stale_after_ms: u64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner::default())),
            retry,
            stale_after: (stale_after_ms > 0).then(|| Duration::from_millis(stale_after_ms)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        lock_inner(&self.inner)
    }

    /// Read a collection for `key`, serving the cached entry when fresh.
    ///
    /// On a miss (or stale entry) the fetcher runs with bounded retry;
    /// concurrent calls for the same key share the single in-flight fetch,
    /// so exactly one fetcher invocation occurs no matter how many
    /// consumers ask. A failed fetch never replaces existing entry data:
    /// if a previous entry exists the call resolves with that data and the
    /// error attached; otherwise the error surfaces.
    pub async fn query<T, F>(&self, key: QueryKey, fetcher: F) -> Result<QueryResult<T>, QueryError>
    where
        T: CacheableRecord,
        F: RecordFetcher<T>,
    {
        let shared = {
            let mut inner = self.lock();
            let cached = inner
                .entries
                .get(&key)
                .filter(|entry| entry.is_fresh(self.stale_after))
                .map(|entry| (entry.decode::<T>(), entry.fetched_at));
            if let Some((rows, fetched_at)) = cached {
                inner.stats.hits += 1;
                return Ok(QueryResult::from_cache(rows?, fetched_at));
            }

            let existing = inner.inflight.get(&key).map(|inflight| inflight.shared.clone());
            match existing {
                Some(shared) => shared,
                None => {
                    inner.stats.misses += 1;
                    self.start_fetch::<T, F>(&mut inner, key.clone(), fetcher)
                }
            }
        };

        match shared.await {
            Ok((rows, fetched_at)) => Ok(QueryResult::from_fetch(decode_rows(&rows)?, fetched_at)),
            Err(err) => {
                let degraded = {
                    let inner = self.lock();
                    inner
                        .entries
                        .get(&key)
                        .map(|entry| (entry.decode::<T>(), entry.fetched_at))
                };
                match degraded {
                    Some((rows, fetched_at)) => {
                        tracing::debug!(key = %key, error = %err, "serving stale data after failed fetch");
                        Ok(QueryResult::degraded(rows?, fetched_at, err))
                    }
                    None => Err(err),
                }
            }
        }
    }

    fn start_fetch<T, F>(&self, inner: &mut CacheInner, key: QueryKey, fetcher: F) -> SharedFetch
    where
        T: CacheableRecord,
        F: RecordFetcher<T>,
    {
        let cache = Arc::clone(&self.inner);
        let retry = self.retry.clone();
        let epoch = inner.epoch;
        let fetch_key = key.clone();

        let fut = async move {
            let outcome = retry_fetch(&retry, || fetcher.fetch()).await.and_then(|records| {
                let rows = records
                    .iter()
                    .map(CachedRow::from_record)
                    .collect::<Result<Vec<_>, ClientError>>()?;
                Ok((rows, Utc::now()))
            });

            let mut inner = lock_inner(&cache);
            let current = inner.epoch == epoch;
            if current {
                inner.inflight.remove(&fetch_key);
            }
            match outcome {
                Ok((rows, fetched_at)) => {
                    let rows = Arc::new(rows);
                    if current {
                        inner.entries.insert(
                            fetch_key,
                            CachedEntry::new(rows.as_ref().clone(), fetched_at),
                        );
                    }
                    Ok((rows, fetched_at))
                }
                Err(err) => Err(QueryError::from(err)),
            }
        };

        let (abortable, abort) = futures_util::future::abortable(fut);
        let shared = abortable
            .map(|result| match result {
                Ok(outcome) => outcome,
                Err(_aborted) => Err(QueryError::from(ClientError::Cancelled)),
            })
            .boxed()
            .shared();

        inner.inflight.insert(
            key,
            InflightFetch {
                shared: shared.clone(),
                abort,
            },
        );
        shared
    }

    /// Mark one exact key stale. The next read for that key re-fetches.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut inner = self.lock();
        if let Some(entry) = inner.entries.get_mut(key) {
            entry.stale = true;
            tracing::debug!(key = %key, "invalidated cached query");
        }
    }

    /// Mark every entry of `collection` stale, regardless of filters.
    pub fn invalidate_collection(&self, collection: Collection) {
        let mut inner = self.lock();
        let mut invalidated = 0usize;
        for (key, entry) in inner.entries.iter_mut() {
            if key.collection_name() == collection {
                entry.stale = true;
                invalidated += 1;
            }
        }
        if invalidated > 0 {
            tracing::debug!(%collection, invalidated, "invalidated cached queries");
        }
    }

    /// Replace the cached row matching `record`'s identifier in every entry
    /// of the record's collection. Entries without a matching row are left
    /// unchanged: a record absent from a filtered result set is never
    /// appended, because its filter membership cannot be verified
    /// client-side. Returns how many rows were replaced.
    ///
    /// Patching rewrites row data only; it does not advance the entry's
    /// fetch timestamp or clear staleness.
    pub fn patch<T: CacheableRecord>(&self, record: &T) -> Result<usize, ClientError> {
        let row = CachedRow::from_record(record)?;
        let mut inner = self.lock();
        let mut patched = 0usize;
        for (key, entry) in inner.entries.iter_mut() {
            if key.collection_name() != T::collection() {
                continue;
            }
            if let Some(existing) = entry.rows.iter_mut().find(|r| r.id == row.id) {
                existing.value = row.value.clone();
                patched += 1;
            }
        }
        Ok(patched)
    }

    /// Discard all entries and abort all in-flight fetches. Consumers
    /// awaiting an aborted fetch observe a cancellation error. Used on
    /// session termination.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.epoch += 1;
        for (_, inflight) in inner.inflight.drain() {
            inflight.abort.abort();
        }
        inner.entries.clear();
        tracing::debug!("cleared query cache");
    }

    /// Acquire a reference to `key` for eviction accounting. The entry for
    /// a key is discarded when its last guard drops. Dropping a guard does
    /// NOT abort a shared in-flight fetch; other consumers may still be
    /// awaiting it.
    pub fn retain(&self, key: QueryKey) -> RetainGuard {
        let mut inner = self.lock();
        *inner.refs.entry(key.clone()).or_insert(0) += 1;
        RetainGuard {
            inner: Arc::clone(&self.inner),
            key,
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            entry_count: inner.entries.len() as u64,
            ..inner.stats.clone()
        }
    }
}

fn lock_inner(inner: &Mutex<CacheInner>) -> MutexGuard<'_, CacheInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// RAII reference to a cached key. See [`QueryCache::retain`].
pub struct RetainGuard {
    inner: Arc<Mutex<CacheInner>>,
    key: QueryKey,
}

impl RetainGuard {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for RetainGuard {
    fn drop(&mut self) {
        let mut inner = lock_inner(&self.inner);
        let remaining = match inner.refs.get_mut(&self.key) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => return,
        };
        if remaining == 0 {
            inner.refs.remove(&self.key);
            if inner.entries.remove(&self.key).is_some() {
                inner.stats.evictions += 1;
            }
        }
    }
}
