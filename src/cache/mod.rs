pub mod local_backend;

pub use local_backend::LocalChainCache;

use crate::graph::ChainReport;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Storage for finished reports, keyed by normalized domain name.
///
/// Expired entries must read as absent. Concurrent writers for the same key
/// simply overwrite each other.
#[async_trait]
pub trait ChainCache: Send + Sync {
    async fn get(&self, domain: &str) -> Option<ChainReport>;

    async fn set(&self, domain: &str, report: ChainReport, ttl: Duration);

    async fn remove(&self, domain: &str);

    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    expired: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_expired(&self) {
        self.expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn expired(&self) -> u64 {
        self.expired.load(Ordering::Relaxed)
    }
}
