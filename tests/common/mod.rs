//! Shared builders for integration tests: canned DNS records, response
//! packets and a querier that serves them without touching the network.

#![allow(dead_code)] // Not every test file uses every helper

use async_trait::async_trait;
use dnscap::config::AnalyzerConfig;
use dnscap::dns::{
    DNSPacket,
    common::name_to_labels,
    enums::DNSResourceType,
    header::DNSHeader,
    question::DNSQuestion,
    resource::DNSResource,
};
use dnscap::error::{FetchError, Result};
use dnscap::resolver::DnsQuerier;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

/// Uncompressed wire encoding of `name`.
pub fn wire_name(name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    for label in name_to_labels(name) {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out
}

/// NSEC/NSEC3 type bitmap for types in window 0.
pub fn type_bitmap(types: &[DNSResourceType]) -> Vec<u8> {
    let mut bits = [0u8; 32];
    let mut highest = 0;
    for &rtype in types {
        let code: u16 = rtype.into();
        assert!(code < 256, "window 0 only");
        let index = usize::from(code / 8);
        bits[index] |= 0x80 >> (code % 8);
        highest = highest.max(index);
    }
    let mut out = vec![0, (highest + 1) as u8];
    out.extend_from_slice(&bits[..=highest]);
    out
}

pub fn record(owner: &str, rtype: DNSResourceType, ttl: u32, rdata: Vec<u8>) -> DNSResource {
    DNSResource::new(name_to_labels(owner), rtype, ttl, rdata).unwrap()
}

pub fn ds_rr(owner: &str, key_tag: u16, algorithm: u8) -> DNSResource {
    let mut rdata = key_tag.to_be_bytes().to_vec();
    rdata.extend_from_slice(&[algorithm, 2]);
    rdata.extend_from_slice(&[0xAB; 32]);
    record(owner, DNSResourceType::DS, 86400, rdata)
}

pub fn dnskey_rr(owner: &str, flags: u16, algorithm: u8, key: &[u8]) -> DNSResource {
    let mut rdata = flags.to_be_bytes().to_vec();
    rdata.extend_from_slice(&[3, algorithm]);
    rdata.extend_from_slice(key);
    record(owner, DNSResourceType::DNSKEY, 3600, rdata)
}

pub fn ns_rr(owner: &str, target: &str) -> DNSResource {
    record(owner, DNSResourceType::NS, 172800, wire_name(target))
}

pub fn soa_rr(owner: &str, serial: u32) -> DNSResource {
    let mut rdata = wire_name(&format!("ns1.{}", owner));
    rdata.extend(wire_name(&format!("hostmaster.{}", owner)));
    for value in [serial, 7200, 3600, 1209600, 300] {
        rdata.extend_from_slice(&value.to_be_bytes());
    }
    record(owner, DNSResourceType::SOA, 3600, rdata)
}

pub fn rrsig_rr(owner: &str, covered: DNSResourceType) -> DNSResource {
    let covered: u16 = covered.into();
    let mut rdata = covered.to_be_bytes().to_vec();
    rdata.extend_from_slice(&[13, name_to_labels(owner).len() as u8]);
    for value in [3600u32, 1_800_000_000, 1_700_000_000] {
        rdata.extend_from_slice(&value.to_be_bytes());
    }
    rdata.extend_from_slice(&12345u16.to_be_bytes());
    rdata.extend(wire_name(owner));
    rdata.extend_from_slice(&[0x5A; 64]);
    record(owner, DNSResourceType::RRSIG, 3600, rdata)
}

pub fn nsec_rr(owner: &str, next: &str, types: &[DNSResourceType]) -> DNSResource {
    let mut rdata = wire_name(next);
    rdata.extend(type_bitmap(types));
    record(owner, DNSResourceType::NSEC, 300, rdata)
}

pub fn nsec3_rr(owner: &str, iterations: u16, types: &[DNSResourceType]) -> DNSResource {
    let mut rdata = vec![1, 0];
    rdata.extend_from_slice(&iterations.to_be_bytes());
    rdata.push(0); // unsalted
    rdata.push(20);
    rdata.extend_from_slice(&[0x11; 20]);
    rdata.extend(type_bitmap(types));
    record(owner, DNSResourceType::NSEC3, 300, rdata)
}

pub fn a_rr(owner: &str, octets: [u8; 4]) -> DNSResource {
    record(owner, DNSResourceType::A, 300, octets.to_vec())
}

/// A response to `name`/`qtype` carrying the given sections.
pub fn response(
    id: u16,
    name: &str,
    qtype: DNSResourceType,
    answers: Vec<DNSResource>,
    authorities: Vec<DNSResource>,
) -> DNSPacket {
    DNSPacket {
        header: DNSHeader {
            id,
            qr: true,
            rd: true,
            ra: true,
            ..Default::default()
        },
        questions: vec![DNSQuestion::new(name, qtype)],
        answers,
        authorities,
        ..Default::default()
    }
}

/// NXDOMAIN response with denial records in the authority section.
pub fn nxdomain(name: &str, authorities: Vec<DNSResource>) -> DNSPacket {
    let mut packet = response(0, name, DNSResourceType::A, Vec::new(), authorities);
    packet.header.rcode = 3;
    packet
}

/// Serves canned responses keyed by query name and type. Unknown queries get
/// an empty NOERROR response.
#[derive(Default)]
pub struct MockQuerier {
    responses: Mutex<HashMap<(String, DNSResourceType), Result<DNSPacket>>>,
    log: Mutex<Vec<(String, DNSResourceType)>>,
}

impl MockQuerier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(self, name: &str, qtype: DNSResourceType, records: Vec<DNSResource>) -> Self {
        let packet = response(0, name, qtype, records, Vec::new());
        self.respond(name, qtype, Ok(packet))
    }

    pub fn fail(self, name: &str, qtype: DNSResourceType, error: FetchError) -> Self {
        self.respond(name, qtype, Err(error))
    }

    pub fn respond(self, name: &str, qtype: DNSResourceType, result: Result<DNSPacket>) -> Self {
        self.responses.lock().insert((name.to_string(), qtype), result);
        self
    }

    pub fn queries(&self) -> Vec<(String, DNSResourceType)> {
        self.log.lock().clone()
    }
}

#[async_trait]
impl DnsQuerier for MockQuerier {
    async fn query(&self, name: &str, qtype: DNSResourceType) -> Result<DNSPacket> {
        self.log.lock().push((name.to_string(), qtype));
        match self.responses.lock().get(&(name.to_string(), qtype)) {
            Some(result) => result.clone(),
            None => Ok(response(0, name, qtype, Vec::new(), Vec::new())),
        }
    }
}

/// Configuration suited to fast tests: short deadlines, no informational
/// lookups.
pub fn test_config() -> AnalyzerConfig {
    AnalyzerConfig {
        query_timeout: Duration::from_millis(200),
        zone_deadline: Duration::from_secs(2),
        analysis_deadline: Duration::from_secs(5),
        fetch_informational: false,
        ..AnalyzerConfig::default()
    }
}

/// Populate `mock` with a chain for `example.com` where every level,
/// the root included, carries both DS and DNSKEY.
pub fn signed_example_com(mock: MockQuerier) -> MockQuerier {
    mock.answer(".", DNSResourceType::DS, vec![ds_rr(".", 20326, 8)])
    .answer(
        ".",
        DNSResourceType::DNSKEY,
        vec![dnskey_rr(".", 257, 8, &[0x03; 260]), dnskey_rr(".", 256, 8, &[0x04; 260])],
    )
    .answer("com.", DNSResourceType::DS, vec![ds_rr("com", 19718, 13)])
    .answer(
        "com.",
        DNSResourceType::DNSKEY,
        vec![dnskey_rr("com", 257, 13, &[0x05; 64]), dnskey_rr("com", 256, 13, &[0x06; 64])],
    )
    .answer("example.com.", DNSResourceType::DS, vec![ds_rr("example.com", 370, 13)])
    .answer(
        "example.com.",
        DNSResourceType::DNSKEY,
        vec![dnskey_rr("example.com", 257, 13, &[0x07; 64])],
    )
}
