//! Time-bounded index of recently processed transactions.
//!
//! The window is a content-addressed multi-map from `(merchant, amount)` to
//! the ordered list of observations recorded for that pair. Two rules read
//! it: doubled-transaction looks up a single key, high-frequency counts
//! observations across all keys within a horizon.
//!
//! Expiry is layered:
//!
//! 1. a write-based TTL reclaims whole entries once no rule horizon can
//!    reach them anymore — the cache expiration clamped to the longest
//!    configured horizon — with the distinct-key count bounded by
//!    `max_window_keys`;
//! 2. the background evictor trims individual observations whose
//!    processing timestamp has aged past the eviction interval.
//!
//! The cache TTL only bounds memory held by idle keys; it never hides
//! observations that a rule could still read.
//!
//! All horizons are measured against processing time. Transaction time is
//! producer-supplied, may be arbitrary, and is only carried through.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::config::Config;
use crate::model::{ProcessingTime, TransactionTime};

/// Current wall clock in epoch milliseconds.
pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// One observed transaction under a window key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub transaction_time: TransactionTime,
    pub processing_time: ProcessingTime,
}

#[derive(Debug)]
struct WindowEntry {
    /// Observations in insertion order.
    observations: Vec<Observation>,
    /// Processing time of the last write; drives whole-entry reclamation.
    refreshed_at: ProcessingTime,
}

/// Shared index of recent transactions.
///
/// Thread-safe via an internal lock; the dispatcher and the evictor contend
/// only on short critical sections around the map, so an authorization in
/// progress never blocks eviction across its whole run.
#[derive(Debug)]
pub struct TransactionWindow {
    /// Idle-entry reclamation bound: the cache expiration, but never
    /// shorter than any rule horizon that reads the window.
    entry_ttl: Duration,
    max_keys: usize,
    entries: RwLock<HashMap<(String, i64), WindowEntry>>,
}

impl TransactionWindow {
    pub fn new(config: &Config) -> Self {
        let entry_ttl = config
            .cache_expiration
            .max(config.eviction_interval)
            .max(config.high_frequency_interval);
        Self {
            entry_ttl,
            max_keys: config.max_window_keys,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Append an observation under `(merchant, amount)`, creating the entry
    /// if absent. Never fails; when the key count is at its bound, the entry
    /// with the oldest write is dropped to make room.
    pub async fn put(
        &self,
        merchant: &str,
        amount: i64,
        transaction_time: TransactionTime,
        processing_time: ProcessingTime,
    ) {
        let key = (merchant.to_owned(), amount);
        let mut entries = self.entries.write().await;

        if !entries.contains_key(&key) && entries.len() >= self.max_keys {
            let stalest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.refreshed_at)
                .map(|(key, _)| key.clone());
            if let Some(stalest) = stalest {
                entries.remove(&stalest);
                debug!(
                    merchant = %stalest.0,
                    amount = stalest.1,
                    "window at key capacity, dropped stalest entry"
                );
            }
        }

        let entry = entries.entry(key).or_insert_with(|| WindowEntry {
            observations: Vec::new(),
            refreshed_at: processing_time,
        });
        entry.observations.push(Observation {
            transaction_time,
            processing_time,
        });
        entry.refreshed_at = processing_time;

        trace!(merchant, amount, processing_time, "recorded transaction in window");
    }

    /// Snapshot of the observations recorded for `(merchant, amount)`, in
    /// insertion order. Age filtering is the callers' concern; everything
    /// the sweep has not reclaimed is visible.
    pub async fn get(&self, merchant: &str, amount: i64) -> Option<Vec<Observation>> {
        let key = (merchant.to_owned(), amount);
        let entries = self.entries.read().await;
        entries.get(&key).map(|entry| entry.observations.clone())
    }

    /// Total observation count across all entries.
    pub async fn size(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().map(|entry| entry.observations.len()).sum()
    }

    /// Observations whose processing time falls within `horizon` of `now_ms`,
    /// across all entries.
    pub async fn count_recent(&self, now_ms: i64, horizon: Duration) -> usize {
        let horizon_ms = duration_ms(horizon);
        let entries = self.entries.read().await;
        entries
            .values()
            .flat_map(|entry| &entry.observations)
            .filter(|obs| now_ms.saturating_sub(obs.processing_time) <= horizon_ms)
            .count()
    }

    /// Drop observations older than `interval` and reclaim entries whose
    /// last write has aged past every horizon. Returns the number of
    /// observations removed.
    ///
    /// An entry whose observation list becomes empty but whose last write
    /// is still reachable by some horizon is left in place.
    pub async fn evict_expired(&self, now_ms: i64, interval: Duration) -> usize {
        let interval_ms = duration_ms(interval);
        let entry_ttl_ms = duration_ms(self.entry_ttl).max(interval_ms);

        let mut entries = self.entries.write().await;
        let before: usize = entries.values().map(|entry| entry.observations.len()).sum();

        for entry in entries.values_mut() {
            entry
                .observations
                .retain(|obs| now_ms.saturating_sub(obs.processing_time) <= interval_ms);
        }
        entries.retain(|_, entry| now_ms.saturating_sub(entry.refreshed_at) <= entry_ttl_ms);

        let after: usize = entries.values().map(|entry| entry.observations.len()).sum();
        before - after
    }
}

/// Spawn the background eviction task.
///
/// The task trims the window every `tick` using the per-observation
/// `interval`. It holds no resources across ticks and is aborted (or torn
/// down with the runtime) at shutdown.
pub fn spawn_evictor(
    window: Arc<TransactionWindow>,
    tick: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = window.evict_expired(now_ms(), interval).await;
            if evicted > 0 {
                debug!(evicted, "evicted expired window observations");
            }
        }
    })
}

pub(crate) fn duration_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
