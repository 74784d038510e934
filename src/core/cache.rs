use super::quote::{Provenance, QuoteTable, RatesPayload, format_last_updated};
use chrono::{DateTime, Local};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// A marked-up quote table together with where and when it was obtained.
#[derive(Debug, Clone)]
pub struct CachedRates {
    pub rates: QuoteTable,
    pub provenance: Provenance,
    pub fetched_at: DateTime<Local>,
}

impl CachedRates {
    pub fn new(rates: QuoteTable, provenance: Provenance) -> Self {
        Self {
            rates,
            provenance,
            fetched_at: Local::now(),
        }
    }

    pub fn last_updated(&self) -> String {
        format_last_updated(&self.fetched_at, self.provenance)
    }

    pub fn into_payload(self) -> RatesPayload {
        RatesPayload {
            last_updated: self.last_updated(),
            rates: self.rates,
            provenance: self.provenance,
        }
    }
}

struct CacheEntry {
    value: CachedRates,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

/// Single-slot store for the last successful quote table.
#[derive(Clone, Default)]
pub struct RateCache {
    inner: Arc<Mutex<Option<CacheEntry>>>,
}

impl RateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached rates unless the slot is empty or expired.
    pub async fn get(&self) -> Option<CachedRates> {
        let mut slot = self.inner.lock().await;
        if slot.as_ref().is_some_and(CacheEntry::is_expired) {
            debug!("Cache entry expired");
            *slot = None;
            return None;
        }
        match slot.as_ref() {
            Some(entry) => {
                debug!(provenance = %entry.value.provenance, "Cache HIT");
                Some(entry.value.clone())
            }
            None => {
                debug!("Cache MISS");
                None
            }
        }
    }

    /// Replaces whatever the slot held.
    pub async fn put(&self, value: CachedRates, ttl: Duration) {
        let mut slot = self.inner.lock().await;
        debug!(provenance = %value.provenance, ttl = ?ttl, "Cache PUT");
        *slot = Some(CacheEntry {
            value,
            created_at: Instant::now(),
            ttl,
        });
    }

    pub async fn clear(&self) {
        let mut slot = self.inner.lock().await;
        *slot = None;
        debug!("Cache CLEAR");
    }
}
