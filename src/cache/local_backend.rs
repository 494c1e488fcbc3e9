use super::{CacheStats, ChainCache};
use crate::graph::ChainReport;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
struct CachedReport {
    report: ChainReport,
    expires_at: Instant,
}

/// In-memory report cache with lazy expiry
pub struct LocalChainCache {
    entries: Arc<DashMap<String, CachedReport>>,
    stats: Arc<CacheStats>,
}

impl LocalChainCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            stats: Arc::new(CacheStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        self.stats.clone()
    }

    /// Drop every expired entry now rather than on the next lookup
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            debug!("Evicted {} expired reports from local cache", evicted);
        }
        evicted
    }
}

impl Default for LocalChainCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChainCache for LocalChainCache {
    async fn get(&self, domain: &str) -> Option<ChainReport> {
        let expired = match self.entries.get(domain) {
            Some(entry) if entry.expires_at > Instant::now() => {
                trace!("Cache hit for {}", domain);
                self.stats.record_hit();
                return Some(entry.report.clone());
            }
            Some(_) => true,
            None => false,
        };

        // The read guard is released before removing.
        if expired {
            self.entries.remove(domain);
            self.stats.record_expired();
            debug!("Cached report for {} expired", domain);
        }
        self.stats.record_miss();
        None
    }

    async fn set(&self, domain: &str, report: ChainReport, ttl: Duration) {
        let Some(expires_at) = Instant::now().checked_add(ttl) else {
            return;
        };
        self.entries.insert(
            domain.to_string(),
            CachedReport { report, expires_at },
        );
        trace!("Cached report for {} ({:?})", domain, ttl);
    }

    async fn remove(&self, domain: &str) {
        self.entries.remove(domain);
    }

    async fn len(&self) -> usize {
        self.entries.len()
    }
}
