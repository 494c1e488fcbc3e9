//! Cache-first request handling with event logging.

use std::time::{Duration, Instant};

use tracing::info;

use crate::analyzer::{AnalysisResponse, ChainAnalyzer};
use crate::cache::ChainCache;
use crate::event_log::EventLog;
use crate::hierarchy::{ZoneName, normalize};

/// Who asked for an analysis, recorded in the event log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub user_id: Option<String>,
    pub date: Option<String>,
}

/// Cache-first analysis entry point.
pub struct ChainService {
    analyzer: ChainAnalyzer,
    cache: Box<dyn ChainCache>,
    events: Box<dyn EventLog>,
    cache_ttl: Duration,
}

impl ChainService {
    pub fn new(
        analyzer: ChainAnalyzer,
        cache: Box<dyn ChainCache>,
        events: Box<dyn EventLog>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            analyzer,
            cache,
            events,
            cache_ttl,
        }
    }

    /// Serve a report from the cache, or analyze and cache it. Failed analyses
    /// are returned but never cached.
    pub async fn chain(&self, domain: &str, context: &RequestContext) -> AnalysisResponse {
        let started = Instant::now();
        let key = ZoneName::parse(domain)
            .map(|zone| zone.to_string())
            .unwrap_or_else(|_| normalize(domain));

        let (response, cache_hit) = match self.cache.get(&key).await {
            Some(report) => (AnalysisResponse::Success(Box::new(report)), true),
            None => {
                let response = self.analyzer.analyze_response(&key).await;
                if let AnalysisResponse::Success(report) = &response {
                    self.cache
                        .set(&key, report.as_ref().clone(), self.cache_ttl)
                        .await;
                }
                (response, false)
            }
        };

        self.events.append(
            "chain",
            context.user_id.as_deref(),
            &key,
            context.date.as_deref(),
        );
        info!(
            "Chain request for {} served in {:?} (cache_hit={}, success={})",
            key,
            started.elapsed(),
            cache_hit,
            response.is_success()
        );
        response
    }
}
