//! Process-wide read caches for analytics queries.
//!
//! Entries expire after a fixed TTL and are dropped explicitly when a write
//! touches the same key. A miss hands out a `Ticket`; a fill carrying a ticket
//! issued before the key's last invalidation is discarded, so a read that
//! raced a write cannot put its older snapshot back. Backed by `DashMap`;
//! values are cloned out on hit.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::model::MetricResponse;

/// Cache behavior chosen at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { enabled: true, ttl: Duration::from_secs(300) }
    }
}

impl CacheSettings {
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }
}

/// Issued on a miss and handed back to `insert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
    generation: u64,
}

/// Result of a cache lookup.
#[derive(Debug)]
pub enum Lookup<V> {
    Hit(V),
    Miss(Ticket),
}

impl<V> Lookup<V> {
    pub fn hit(self) -> Option<V> {
        match self {
            Lookup::Hit(v) => Some(v),
            Lookup::Miss(_) => None,
        }
    }
}

struct Entry<V> {
    stored_at: Instant,
    value: V,
}

/// Per-key state. `generation` survives eviction and only resets on `clear`,
/// which bumps the cache epoch instead.
struct Slot<V> {
    generation: u64,
    entry: Option<Entry<V>>,
}

impl<V> Slot<V> {
    fn empty() -> Self {
        Self { generation: 0, entry: None }
    }
}

/// A TTL map keyed by device or OEM identifier.
pub struct ReadCache<V> {
    name: &'static str,
    settings: CacheSettings,
    slots: DashMap<String, Slot<V>>,
    epoch: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> ReadCache<V> {
    pub fn new(name: &'static str, settings: CacheSettings) -> Self {
        Self {
            name,
            settings,
            slots: DashMap::new(),
            epoch: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn lookup(&self, key: &str) -> Lookup<V> {
        // Read the epoch before the slot so a concurrent `clear` always
        // invalidates the ticket.
        let epoch = self.epoch.load(Ordering::SeqCst);
        if !self.settings.enabled {
            return Lookup::Miss(Ticket { epoch, generation: 0 });
        }

        let ttl = self.settings.ttl;
        let (fresh, generation) = match self.slots.get(key) {
            Some(slot) => (
                slot.entry
                    .as_ref()
                    .filter(|e| e.stored_at.elapsed() < ttl)
                    .map(|e| e.value.clone()),
                slot.generation,
            ),
            None => (None, 0),
        };

        match fresh {
            Some(v) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(cache = self.name, key, "cache hit");
                Lookup::Hit(v)
            }
            None => {
                // Expired entries are dropped lazily on the next lookup.
                if let Some(mut slot) = self.slots.get_mut(key) {
                    if slot.entry.as_ref().is_some_and(|e| e.stored_at.elapsed() >= ttl) {
                        slot.entry = None;
                    }
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                Lookup::Miss(Ticket { epoch, generation })
            }
        }
    }

    /// Store `value` unless the key was invalidated after `ticket` was issued.
    /// Returns whether the value was stored.
    pub fn insert(&self, key: &str, ticket: Ticket, value: V) -> bool {
        if !self.settings.enabled {
            return false;
        }

        let mut slot = self.slots.entry(key.to_string()).or_insert_with(Slot::empty);
        if slot.generation != ticket.generation || self.epoch.load(Ordering::SeqCst) != ticket.epoch {
            tracing::debug!(cache = self.name, key, "stale fill discarded");
            return false;
        }
        slot.entry = Some(Entry { stored_at: Instant::now(), value });
        true
    }

    pub fn invalidate(&self, key: &str) {
        let mut slot = self.slots.entry(key.to_string()).or_insert_with(Slot::empty);
        slot.generation = slot.generation.wrapping_add(1);
        if slot.entry.take().is_some() {
            tracing::debug!(cache = self.name, key, "cache entry invalidated");
        }
    }

    pub fn clear(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.slots.clear();
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

/// Point-in-time counters for one cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub name: &'static str,
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// The three analytics read caches, shared by both services.
pub struct AnalyticsCache {
    pub device_metrics: ReadCache<Vec<MetricResponse>>,
    pub oem_analytics: ReadCache<Vec<MetricResponse>>,
    pub performance: ReadCache<MetricResponse>,
}

impl AnalyticsCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self {
            device_metrics: ReadCache::new("device_metrics", settings),
            oem_analytics: ReadCache::new("oem_analytics", settings),
            performance: ReadCache::new("performance", settings),
        }
    }

    /// A new metric changes the device's list, its summary, and whichever OEM
    /// list the device belongs to. Metric rows carry no OEM, so every OEM
    /// entry is dropped.
    pub fn on_metric_recorded(&self, device_id: &str) {
        self.device_metrics.invalidate(device_id);
        self.performance.invalidate(device_id);
        self.oem_analytics.clear();
    }

    /// A newly registered device may already have metrics, which now join the
    /// OEM's list.
    pub fn on_device_configured(&self, oem_id: &str) {
        self.oem_analytics.invalidate(oem_id);
    }

    pub fn stats(&self) -> Vec<CacheStats> {
        vec![
            stats_of(&self.device_metrics),
            stats_of(&self.oem_analytics),
            stats_of(&self.performance),
        ]
    }
}

fn stats_of<V: Clone>(c: &ReadCache<V>) -> CacheStats {
    CacheStats { name: c.name(), hits: c.hits(), misses: c.misses(), entries: c.len() }
}
