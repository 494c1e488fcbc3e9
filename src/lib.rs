//! DNSSEC chain-of-trust analysis.
//!
//! A domain is decomposed into its zones from the root down, each zone's
//! DS, DNSKEY, NS, SOA and NSEC/NSEC3 records are fetched from recursive
//! upstreams, and the result is assembled into a per-level report with a
//! node/edge graph.
//!
//! Every status in a report is derived from which records are *present*.
//! Signatures and DS digests are never verified, so "signed" and "valid"
//! mean "the expected DNSSEC records exist", not "cryptographically proven".

pub mod analyzer;
pub mod cache;
pub mod config;
pub mod dns;
pub mod dnssec;
pub mod error;
pub mod event_log;
pub mod fetcher;
pub mod graph;
pub mod hierarchy;
pub mod records;
pub mod report;
pub mod resolver;
pub mod service;
pub mod status;

pub use analyzer::{AnalysisResponse, ChainAnalyzer};
pub use config::AnalyzerConfig;
pub use dns::DNSPacket;
pub use graph::ChainReport;
pub use service::{ChainService, RequestContext};
