//! Analyzer settings and their `DNSCAP_*` environment overrides.

use crate::dnssec::constants::DNSSEC_UDP_SIZE;
use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Longest accepted timeout or deadline.
pub const MAX_DEADLINE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Recursive resolvers, tried in order
    pub upstream_servers: Vec<SocketAddr>,
    /// Timeout for a single query attempt against one upstream
    pub query_timeout: Duration,
    /// Upper bound on fetching every record type of one zone
    pub zone_deadline: Duration,
    /// Upper bound on a whole analysis
    pub analysis_deadline: Duration,
    pub edns_payload_size: u16,
    /// Fetch the record types of a zone concurrently
    pub parallel_record_fetch: bool,
    /// Also fetch A/AAAA/MX/TXT for every zone
    pub fetch_informational: bool,
    /// Retry over TCP when a UDP response has TC set
    pub tcp_on_truncation: bool,
    pub cache_ttl: Duration,
    /// Replacement for the embedded root fallback key table
    pub root_keys_file: Option<PathBuf>,
    /// Append events to this file instead of the tracing log
    pub event_log_path: Option<PathBuf>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            upstream_servers: vec![
                SocketAddr::from(([8, 8, 8, 8], 53)),
                SocketAddr::from(([1, 1, 1, 1], 53)),
                SocketAddr::from(([9, 9, 9, 9], 53)),
            ],
            query_timeout: Duration::from_secs(5),
            zone_deadline: Duration::from_secs(60),
            analysis_deadline: Duration::from_secs(300),
            edns_payload_size: DNSSEC_UDP_SIZE,
            parallel_record_fetch: false,
            fetch_informational: true,
            tcp_on_truncation: false,
            cache_ttl: Duration::from_secs(3600),
            root_keys_file: None,
            event_log_path: None,
        }
    }
}

impl AnalyzerConfig {
    /// Defaults overridden by `DNSCAP_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `DNSCAP_*` key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(upstream_servers) = lookup("DNSCAP_UPSTREAM_SERVERS") {
            config.upstream_servers = parse_upstreams(&upstream_servers)?;
        }

        if let Some(timeout_ms) = lookup("DNSCAP_QUERY_TIMEOUT_MS") {
            config.query_timeout = Duration::from_millis(parse_nonzero(&timeout_ms)?);
        }

        if let Some(deadline) = lookup("DNSCAP_ZONE_DEADLINE_SECS") {
            config.zone_deadline = Duration::from_secs(parse_nonzero(&deadline)?);
        }

        if let Some(deadline) = lookup("DNSCAP_ANALYSIS_DEADLINE_SECS") {
            config.analysis_deadline = Duration::from_secs(parse_nonzero(&deadline)?);
        }

        if let Some(payload_size) = lookup("DNSCAP_EDNS_PAYLOAD_SIZE") {
            let size = payload_size
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPayloadSize(payload_size.clone()))?;
            if size < 512 {
                return Err(ConfigError::InvalidPayloadSize(format!(
                    "{} is below the 512 octet minimum",
                    size
                )));
            }
            config.edns_payload_size = size;
        }

        if let Some(parallel) = lookup("DNSCAP_PARALLEL_FETCH") {
            config.parallel_record_fetch = parse_bool(&parallel, false);
        }

        if let Some(informational) = lookup("DNSCAP_FETCH_INFORMATIONAL") {
            config.fetch_informational = parse_bool(&informational, true);
        }

        if let Some(tcp) = lookup("DNSCAP_TCP_ON_TRUNCATION") {
            config.tcp_on_truncation = parse_bool(&tcp, false);
        }

        if let Some(ttl) = lookup("DNSCAP_CACHE_TTL_SECS") {
            let secs = ttl
                .parse::<u64>()
                .map_err(|_| ConfigError::ParseError(format!("Invalid cache TTL: {}", ttl)))?;
            config.cache_ttl = Duration::from_secs(secs);
        }

        if let Some(path) = lookup("DNSCAP_ROOT_KEYS_FILE").filter(|p| !p.trim().is_empty()) {
            config.root_keys_file = Some(PathBuf::from(path));
        }

        if let Some(path) = lookup("DNSCAP_EVENT_LOG").filter(|p| !p.trim().is_empty()) {
            config.event_log_path = Some(PathBuf::from(path));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream_servers.is_empty() {
            return Err(ConfigError::InvalidUpstreamServer(
                "No upstream servers configured".to_string(),
            ));
        }
        if self.query_timeout.is_zero()
            || self.zone_deadline.is_zero()
            || self.analysis_deadline.is_zero()
        {
            return Err(ConfigError::InvalidTimeout(
                "Timeouts and deadlines must be greater than 0".to_string(),
            ));
        }
        if [self.query_timeout, self.zone_deadline, self.analysis_deadline]
            .iter()
            .any(|d| *d > MAX_DEADLINE)
        {
            return Err(ConfigError::InvalidTimeout(format!(
                "Timeouts and deadlines must not exceed {}s",
                MAX_DEADLINE.as_secs()
            )));
        }
        Ok(())
    }
}

/// Comma-separated `ip:port` list; a bare IP gets port 53.
pub fn parse_upstreams(list: &str) -> Result<Vec<SocketAddr>, ConfigError> {
    let servers = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_upstream)
        .collect::<Result<Vec<_>, _>>()?;
    if servers.is_empty() {
        return Err(ConfigError::InvalidUpstreamServer(
            "No valid upstream servers provided".to_string(),
        ));
    }
    Ok(servers)
}

pub fn parse_upstream(s: &str) -> Result<SocketAddr, ConfigError> {
    s.parse::<SocketAddr>()
        .or_else(|_| s.parse::<std::net::IpAddr>().map(|ip| SocketAddr::new(ip, 53)))
        .map_err(|_| ConfigError::InvalidUpstreamServer(s.to_string()))
}

fn parse_nonzero(s: &str) -> Result<u64, ConfigError> {
    let value = s
        .parse::<u64>()
        .map_err(|_| ConfigError::InvalidTimeout(s.to_string()))?;
    if value == 0 {
        return Err(ConfigError::InvalidTimeout(
            "Timeout must be greater than 0".to_string(),
        ));
    }
    Ok(value)
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AnalyzerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AnalyzerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalyzerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.upstream_servers.len(), 3);
        assert_eq!(config.upstream_servers[0].to_string(), "8.8.8.8:53");
        assert_eq!(config.query_timeout, Duration::from_secs(5));
        assert!(!config.parallel_record_fetch);
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn test_env_overrides() {
        let config = config_from(&[
            ("DNSCAP_UPSTREAM_SERVERS", "127.0.0.1:5353, 10.0.0.1"),
            ("DNSCAP_QUERY_TIMEOUT_MS", "250"),
            ("DNSCAP_PARALLEL_FETCH", "yes"),
            ("DNSCAP_FETCH_INFORMATIONAL", "off"),
            ("DNSCAP_EVENT_LOG", "/tmp/events.log"),
        ])
        .unwrap();

        assert_eq!(config.upstream_servers[0].to_string(), "127.0.0.1:5353");
        assert_eq!(config.upstream_servers[1].to_string(), "10.0.0.1:53");
        assert_eq!(config.query_timeout, Duration::from_millis(250));
        assert!(config.parallel_record_fetch);
        assert!(!config.fetch_informational);
        assert_eq!(config.event_log_path, Some(PathBuf::from("/tmp/events.log")));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            config_from(&[("DNSCAP_QUERY_TIMEOUT_MS", "0")]),
            Err(ConfigError::InvalidTimeout(_))
        ));
        assert!(matches!(
            config_from(&[("DNSCAP_UPSTREAM_SERVERS", "not-an-address")]),
            Err(ConfigError::InvalidUpstreamServer(_))
        ));
        assert!(matches!(
            config_from(&[("DNSCAP_UPSTREAM_SERVERS", " , ")]),
            Err(ConfigError::InvalidUpstreamServer(_))
        ));
        assert!(matches!(
            config_from(&[("DNSCAP_EDNS_PAYLOAD_SIZE", "100")]),
            Err(ConfigError::InvalidPayloadSize(_))
        ));
    }

    #[test]
    fn test_oversized_deadlines_rejected() {
        let max = u64::MAX.to_string();
        for key in [
            "DNSCAP_QUERY_TIMEOUT_MS",
            "DNSCAP_ZONE_DEADLINE_SECS",
            "DNSCAP_ANALYSIS_DEADLINE_SECS",
        ] {
            assert!(
                matches!(
                    config_from(&[(key, max.as_str())]),
                    Err(ConfigError::InvalidTimeout(_))
                ),
                "{} accepted an unbounded value",
                key
            );
        }
        assert!(config_from(&[("DNSCAP_ZONE_DEADLINE_SECS", "86400")]).is_ok());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE", false));
        assert!(!parse_bool("0", true));
        assert!(parse_bool("maybe", true));
    }
}
