use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single record-type lookup.
///
/// The analysis collapses these into "absent" when a level is rendered, but
/// they are kept around so a lookup that failed can still be told apart from
/// one that returned nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Upstream {upstream} timed out")]
    Timeout { upstream: SocketAddr },

    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Response ID mismatch: expected {expected}, got {got}")]
    IdMismatch { expected: u16, got: u16 },

    #[error("No upstream servers configured")]
    NoUpstreams,

    #[error("All {attempts} upstream servers failed, last error: {last}")]
    AllUpstreamsFailed { attempts: usize, last: Box<FetchError> },

    #[error("Zone deadline exceeded")]
    DeadlineExceeded,
}

impl From<std::io::Error> for FetchError {
    fn from(err: std::io::Error) -> Self {
        FetchError::Io(err.to_string())
    }
}

impl From<crate::dns::ParseError> for FetchError {
    fn from(err: crate::dns::ParseError) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// Reasons a domain name cannot be decomposed into zones.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HierarchyError {
    #[error("Empty label in domain name: {0}")]
    EmptyLabel(String),

    #[error("Label exceeds 63 octets: {0}")]
    LabelTooLong(String),

    #[error("Domain name exceeds 253 octets ({0} octets)")]
    NameTooLong(usize),

    #[error("Invalid character {0:?} in domain name")]
    InvalidCharacter(char),

    #[error("Invalid internationalized label: {0}")]
    InvalidIdn(String),
}

/// Request-level failures, surfaced as `success: false`.
#[derive(Error, Debug, Clone)]
pub enum ChainError {
    #[error("Invalid domain name: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("Analysis exceeded deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Invalid upstream server: {0}")]
    InvalidUpstreamServer(String),

    #[error("Invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("Invalid EDNS payload size: {0}")]
    InvalidPayloadSize(String),

    #[error("Failed to read root key file {path}: {reason}")]
    RootKeyFile { path: String, reason: String },

    #[error("Configuration parse error: {0}")]
    ParseError(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;
