//! Whole-chain analysis of one domain under a single deadline.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use tracing::{error, info};

use crate::config::AnalyzerConfig;
use crate::dnssec::RootKeyTable;
use crate::error::{ChainError, ConfigError};
use crate::fetcher::ZoneFetcher;
use crate::graph::{ChainReport, assemble_report};
use crate::hierarchy::{ZoneName, decompose, normalize};
use crate::records::ZoneRecords;
use crate::resolver::{DnsQuerier, UpstreamResolver};

/// Body returned when an analysis cannot produce a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisFailure {
    pub success: bool,
    pub error: String,
    pub domain: String,
}

impl AnalysisFailure {
    pub fn new(domain: &str, error: &ChainError) -> Self {
        Self {
            success: false,
            error: error.to_string(),
            domain: normalize(domain),
        }
    }
}

/// What an analysis request answers with; serializes to either the report
/// or the failure body, both carrying `success`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnalysisResponse {
    Success(Box<ChainReport>),
    Failure(AnalysisFailure),
}

impl AnalysisResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResponse::Success(_))
    }

    pub fn report(&self) -> Option<&ChainReport> {
        match self {
            AnalysisResponse::Success(report) => Some(report),
            AnalysisResponse::Failure(_) => None,
        }
    }
}

pub struct ChainAnalyzer {
    fetcher: ZoneFetcher,
    analysis_deadline: Duration,
}

impl ChainAnalyzer {
    pub fn new(querier: Arc<dyn DnsQuerier>, root_keys: Arc<RootKeyTable>, config: &AnalyzerConfig) -> Self {
        Self {
            fetcher: ZoneFetcher::new(querier, root_keys, config),
            analysis_deadline: config.analysis_deadline,
        }
    }

    /// Analyzer that queries the configured upstreams.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let root_keys = RootKeyTable::load(config.root_keys_file.as_deref())?;
        let resolver = UpstreamResolver::new(config);
        Ok(Self::new(Arc::new(resolver), Arc::new(root_keys), config))
    }

    /// Fetch each zone from the root down, one after another.
    pub async fn build_chain(&self, zone: &ZoneName) -> Vec<ZoneRecords> {
        let mut chain = Vec::new();
        for level in decompose(zone) {
            chain.push(self.fetcher.fetch_zone(&level).await);
        }
        chain
    }

    /// `decompose` always yields at least the root, and assembly does not
    /// fail on any fetched input, so only parsing and the deadline error out.
    pub async fn analyze(&self, domain: &str) -> Result<ChainReport, ChainError> {
        let zone = ZoneName::parse(domain)?;
        info!("Starting DNSSEC chain analysis for {}", zone);

        let chain = timeout(self.analysis_deadline, self.build_chain(&zone))
            .await
            .map_err(|_| ChainError::DeadlineExceeded(self.analysis_deadline))?;

        let report = assemble_report(zone.as_str(), &chain, Utc::now());
        info!(
            "Analyzed {} levels for {}: {} ({}/{} signed)",
            report.metadata.chain_length,
            zone,
            report.metadata.chain_status,
            report.metadata.signed_levels,
            report.metadata.chain_length
        );
        Ok(report)
    }

    /// Like [`ChainAnalyzer::analyze`], but never fails: errors become a
    /// `success: false` body.
    pub async fn analyze_response(&self, domain: &str) -> AnalysisResponse {
        match self.analyze(domain).await {
            Ok(report) => AnalysisResponse::Success(Box::new(report)),
            Err(e) => {
                error!("Analysis of {} failed: {}", domain, e);
                AnalysisResponse::Failure(AnalysisFailure::new(domain, &e))
            }
        }
    }
}
