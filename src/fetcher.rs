//! Zone record fetching.
//!
//! Each record type of a zone is looked up on its own and keeps its own
//! `Result`; one failing lookup never stops the others. All lookups of a
//! zone share one deadline.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::config::{AnalyzerConfig, MAX_DEADLINE};
use crate::dns::enums::DNSResourceType;
use crate::dns::rdata::RData;
use crate::dns::{DNSPacket, Section};
use crate::dnssec::RootKeyTable;
use crate::error::{FetchError, Result};
use crate::hierarchy::ZoneName;
use crate::records::{
    DenialRecord, DenialSource, DnskeyRecord, DsRecord, InformationalLookups,
    InformationalRecord, SoaRecord, ZoneRecords, dnskey_set, push_unique_denial,
};
use crate::resolver::DnsQuerier;

/// Label of the name queried to elicit an NXDOMAIN with denial proofs.
pub const NXDOMAIN_PROBE_LABEL: &str = "nonexistent";

pub struct ZoneFetcher {
    querier: Arc<dyn DnsQuerier>,
    root_keys: Arc<RootKeyTable>,
    zone_deadline: Duration,
    parallel: bool,
    fetch_informational: bool,
}

impl ZoneFetcher {
    pub fn new(querier: Arc<dyn DnsQuerier>, root_keys: Arc<RootKeyTable>, config: &AnalyzerConfig) -> Self {
        Self {
            querier,
            root_keys,
            zone_deadline: config.zone_deadline,
            parallel: config.parallel_record_fetch,
            fetch_informational: config.fetch_informational,
        }
    }

    /// Fetch every record type for `zone`.
    pub async fn fetch_zone(&self, zone: &ZoneName) -> ZoneRecords {
        let now = Instant::now();
        let deadline = now
            .checked_add(self.zone_deadline)
            .unwrap_or_else(|| now + MAX_DEADLINE);
        info!("Analyzing zone {}", zone.display_name());

        let mut records = if self.parallel {
            self.fetch_concurrently(zone, deadline).await
        } else {
            self.fetch_sequentially(zone, deadline).await
        };

        if zone.is_root() {
            self.apply_root_fallback(&mut records);
        }

        for failure in records.lookup_failures() {
            warn!(
                "{} lookup for {} degraded to absent: {}",
                failure.record_type,
                zone.display_name(),
                failure.error
            );
        }
        debug!(
            "Zone {}: ds={}, dnskey={}, ns={}, nsec={}",
            zone.display_name(),
            records.ds_records().len(),
            records.dnskey_records().len(),
            records.ns_records().len(),
            records.denial_records().len()
        );
        records
    }

    async fn fetch_sequentially(&self, zone: &ZoneName, deadline: Instant) -> ZoneRecords {
        let ds = self.fetch_ds(zone, deadline).await;
        let dnskey = self.fetch_dnskey(zone, deadline).await;
        let ns = self.fetch_ns(zone, deadline).await;
        let soa = self.fetch_soa(zone, deadline).await;
        let denial = self.fetch_denial(zone, deadline).await;
        let informational = if self.fetch_informational {
            Some(InformationalLookups {
                a: self.fetch_informational_type(zone, DNSResourceType::A, deadline).await,
                aaaa: self.fetch_informational_type(zone, DNSResourceType::AAAA, deadline).await,
                mx: self.fetch_informational_type(zone, DNSResourceType::MX, deadline).await,
                txt: self.fetch_informational_type(zone, DNSResourceType::TXT, deadline).await,
            })
        } else {
            None
        };

        ZoneRecords {
            zone: zone.clone(),
            ds,
            dnskey,
            ns,
            soa,
            denial,
            informational,
            dnskey_fallback: None,
        }
    }

    async fn fetch_concurrently(&self, zone: &ZoneName, deadline: Instant) -> ZoneRecords {
        let informational = async {
            if !self.fetch_informational {
                return None;
            }
            let types = [
                DNSResourceType::A,
                DNSResourceType::AAAA,
                DNSResourceType::MX,
                DNSResourceType::TXT,
            ];
            let mut results = join_all(
                types
                    .iter()
                    .map(|&rtype| self.fetch_informational_type(zone, rtype, deadline)),
            )
            .await
            .into_iter();
            let mut next = || results.next().unwrap_or(Err(FetchError::DeadlineExceeded));
            Some(InformationalLookups {
                a: next(),
                aaaa: next(),
                mx: next(),
                txt: next(),
            })
        };

        let (ds, dnskey, ns, soa, denial, informational) = tokio::join!(
            self.fetch_ds(zone, deadline),
            self.fetch_dnskey(zone, deadline),
            self.fetch_ns(zone, deadline),
            self.fetch_soa(zone, deadline),
            self.fetch_denial(zone, deadline),
            informational,
        );

        ZoneRecords {
            zone: zone.clone(),
            ds,
            dnskey,
            ns,
            soa,
            denial,
            informational,
            dnskey_fallback: None,
        }
    }

    async fn query(&self, name: &str, rtype: DNSResourceType, deadline: Instant) -> Result<DNSPacket> {
        match timeout_at(deadline, self.querier.query(name, rtype)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::DeadlineExceeded),
        }
    }

    pub async fn fetch_ds(&self, zone: &ZoneName, deadline: Instant) -> Result<Vec<DsRecord>> {
        let response = self.query(&zone.query_name(), DNSResourceType::DS, deadline).await?;
        Ok(response
            .records_of(Section::Answer, DNSResourceType::DS)
            .filter_map(DsRecord::from_resource)
            .collect())
    }

    pub async fn fetch_dnskey(&self, zone: &ZoneName, deadline: Instant) -> Result<Vec<DnskeyRecord>> {
        let response = self
            .query(&zone.query_name(), DNSResourceType::DNSKEY, deadline)
            .await?;
        Ok(dnskey_set(&response.answers))
    }

    pub async fn fetch_ns(&self, zone: &ZoneName, deadline: Instant) -> Result<Vec<String>> {
        let response = self.query(&zone.query_name(), DNSResourceType::NS, deadline).await?;
        Ok(response
            .records_of(Section::Answer, DNSResourceType::NS)
            .filter_map(|rr| match &rr.parsed_rdata {
                RData::NS(target) => Some(target.clone()),
                _ => None,
            })
            .collect())
    }

    pub async fn fetch_soa(&self, zone: &ZoneName, deadline: Instant) -> Result<Option<SoaRecord>> {
        let response = self.query(&zone.query_name(), DNSResourceType::SOA, deadline).await?;
        let signed = response.has_rrsig_covering(Section::Answer, DNSResourceType::SOA);
        Ok(response
            .records_of(Section::Answer, DNSResourceType::SOA)
            .find_map(|rr| match &rr.parsed_rdata {
                RData::SOA(soa) => Some(SoaRecord::from_rdata(soa, rr.ttl, signed)),
                _ => None,
            }))
    }

    /// NSEC and NSEC3 from direct queries plus the authority section of an
    /// NXDOMAIN probe, de-duplicated by content.
    ///
    /// Fails only when every one of the three lookups failed.
    pub async fn fetch_denial(&self, zone: &ZoneName, deadline: Instant) -> Result<Vec<DenialRecord>> {
        let name = zone.query_name();
        let probe = zone.child(NXDOMAIN_PROBE_LABEL);

        let mut records = Vec::new();
        let mut last_error = None;
        let mut succeeded = false;

        for rtype in [DNSResourceType::NSEC, DNSResourceType::NSEC3] {
            match self.query(&name, rtype, deadline).await {
                Ok(response) => {
                    succeeded = true;
                    for rr in response.records_of(Section::Answer, rtype) {
                        if let Some(record) = DenialRecord::from_resource(rr, DenialSource::Answer) {
                            push_unique_denial(&mut records, record);
                        }
                    }
                }
                Err(e) => last_error = Some(e),
            }
        }

        match self.query(&probe, DNSResourceType::A, deadline).await {
            Ok(response) => {
                succeeded = true;
                debug!(
                    "NXDOMAIN probe {} returned rcode {} with {} authority records",
                    probe,
                    response.header.rcode,
                    response.authorities.len()
                );
                for rr in &response.authorities {
                    if let Some(record) = DenialRecord::from_resource(rr, DenialSource::AuthoritySection) {
                        push_unique_denial(&mut records, record);
                    }
                }
            }
            Err(e) => last_error = Some(e),
        }

        match (succeeded, last_error) {
            (false, Some(e)) => Err(e),
            _ => Ok(records),
        }
    }

    pub async fn fetch_informational_type(
        &self,
        zone: &ZoneName,
        rtype: DNSResourceType,
        deadline: Instant,
    ) -> Result<Vec<InformationalRecord>> {
        let response = self.query(&zone.query_name(), rtype, deadline).await?;
        let signed = response.has_rrsig_covering(Section::Answer, rtype);
        Ok(response
            .records_of(Section::Answer, rtype)
            .map(|rr| InformationalRecord {
                value: rr.parsed_rdata.to_string(),
                ttl: rr.ttl,
                signed,
            })
            .collect())
    }

    /// Substitute the fallback table when the root DNSKEY set is missing.
    fn apply_root_fallback(&self, records: &mut ZoneRecords) {
        let cause = match &records.dnskey {
            Ok(keys) if !keys.is_empty() => return,
            Ok(_) => None,
            Err(e) => Some(e.clone()),
        };

        warn!(
            "Root DNSKEY unavailable, substituting {} fallback keys (table v{})",
            self.root_keys.keys.len(),
            self.root_keys.version
        );
        let keys = self
            .root_keys
            .keys
            .iter()
            .enumerate()
            .map(|(i, key)| DnskeyRecord::from_fallback(key, i + 1))
            .collect();
        records.dnskey = Ok(keys);
        records.dnskey_fallback = Some(cause);
    }
}
