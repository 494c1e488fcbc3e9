//! Upstream resolver access for DNSSEC-enabled queries.

use crate::config::AnalyzerConfig;
use crate::dns::DNSPacket;
use crate::dns::enums::DNSResourceType;
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};
use tokio::time::timeout;
use tracing::{debug, trace, warn};

/// Issues one DNSSEC-enabled query and returns the parsed response.
///
/// The zone fetcher only talks to this trait, so tests can swap in canned
/// responses without touching the network.
#[async_trait]
pub trait DnsQuerier: Send + Sync {
    async fn query(&self, name: &str, qtype: DNSResourceType) -> Result<DNSPacket>;
}

/// Queries a fixed, ordered list of recursive resolvers over UDP. The first
/// upstream that returns a parseable response with a matching ID wins,
/// whatever its RCODE.
#[derive(Debug, Clone)]
pub struct UpstreamResolver {
    upstreams: Vec<SocketAddr>,
    query_timeout: Duration,
    payload_size: u16,
    tcp_on_truncation: bool,
}

impl UpstreamResolver {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            upstreams: config.upstream_servers.clone(),
            query_timeout: config.query_timeout,
            payload_size: config.edns_payload_size,
            tcp_on_truncation: config.tcp_on_truncation,
        }
    }

    async fn query_upstream(
        &self,
        query_bytes: &[u8],
        query_id: u16,
        upstream_addr: SocketAddr,
    ) -> Result<DNSPacket> {
        let exchange = async {
            let response = self.send_udp_query(query_bytes, upstream_addr).await?;
            if response.header.id != query_id {
                return Err(FetchError::IdMismatch {
                    expected: query_id,
                    got: response.header.id,
                });
            }
            if response.header.tc && self.tcp_on_truncation {
                debug!("UDP response truncated, retrying with TCP");
                let response = self.send_tcp_query(query_bytes, upstream_addr).await?;
                if response.header.id != query_id {
                    return Err(FetchError::IdMismatch {
                        expected: query_id,
                        got: response.header.id,
                    });
                }
                return Ok(response);
            }
            Ok(response)
        };

        timeout(self.query_timeout, exchange)
            .await
            .map_err(|_| FetchError::Timeout {
                upstream: upstream_addr,
            })?
    }

    async fn send_udp_query(&self, query_bytes: &[u8], upstream_addr: SocketAddr) -> Result<DNSPacket> {
        let bind_addr = if upstream_addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(upstream_addr).await?;
        socket.send(query_bytes).await?;

        let mut response_buf = vec![0u8; 65535];
        let response_len = socket.recv(&mut response_buf).await?;

        trace!(
            "Raw UDP response data ({} bytes): {:02x?}",
            response_len,
            &response_buf[..response_len.min(64)]
        );

        let response = DNSPacket::parse(&response_buf[..response_len]).map_err(|e| {
            debug!("Failed to parse UDP response from {}: {}", upstream_addr, e);
            FetchError::from(e)
        })?;
        log_response_details(&response, response_len, "UDP");
        Ok(response)
    }

    async fn send_tcp_query(&self, query_bytes: &[u8], upstream_addr: SocketAddr) -> Result<DNSPacket> {
        let mut stream = TcpStream::connect(upstream_addr).await?;

        let query_length = query_bytes.len() as u16;
        stream.write_all(&query_length.to_be_bytes()).await?;
        stream.write_all(query_bytes).await?;
        stream.flush().await?;

        let mut length_buf = [0u8; 2];
        stream.read_exact(&mut length_buf).await?;
        let response_length = u16::from_be_bytes(length_buf) as usize;

        let mut response_buf = vec![0; response_length];
        stream.read_exact(&mut response_buf).await?;

        let response = DNSPacket::parse(&response_buf).map_err(|e| {
            debug!("Failed to parse TCP response from {}: {}", upstream_addr, e);
            FetchError::from(e)
        })?;
        log_response_details(&response, response_length, "TCP");
        Ok(response)
    }
}

#[async_trait]
impl DnsQuerier for UpstreamResolver {
    async fn query(&self, name: &str, qtype: DNSResourceType) -> Result<DNSPacket> {
        if self.upstreams.is_empty() {
            return Err(FetchError::NoUpstreams);
        }

        let mut last_error = None;
        for &upstream in &self.upstreams {
            let id: u16 = rand::random();
            let query = DNSPacket::query(id, name, qtype, self.payload_size, true);
            let query_bytes = query.serialize()?;

            debug!("Querying {} {} via {} (id={})", name, qtype, upstream, id);
            match self.query_upstream(&query_bytes, id, upstream).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    warn!("Upstream {} failed for {} {}: {}", upstream, name, qtype, e);
                    last_error = Some(e);
                }
            }
        }

        Err(FetchError::AllUpstreamsFailed {
            attempts: self.upstreams.len(),
            last: Box::new(last_error.unwrap_or(FetchError::NoUpstreams)),
        })
    }
}

fn log_response_details(response: &DNSPacket, response_len: usize, protocol: &str) {
    debug!(
        "Parsed {} response: rcode={}, answers={}, authorities={}, additional={}",
        protocol,
        response.header.rcode,
        response.answers.len(),
        response.authorities.len(),
        response.resources.len()
    );
    trace!("Received {} response: {} bytes", protocol, response_len);
}
