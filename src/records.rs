//! Per-zone record model.
//!
//! Every record type fetched for a zone is kept as a `Result`, so a lookup
//! that failed is still distinguishable from one that came back empty. The
//! accessors used by classification collapse failures to "absent".

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::dns::enums::DNSResourceType;
use crate::dns::rdata::{DnskeyData, DsData, Nsec3Data, NsecData, RData, SoaData};
use crate::dns::resource::DNSResource;
use crate::dnssec::{
    FallbackKey, KeyRole, PrimaryRole, RoleAssignment, RoleConfidence, algorithm_name,
    classify_zone_keys, digest_type_name, estimate_key_size,
};
use crate::error::FetchError;
use crate::hierarchy::ZoneName;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DsRecord {
    pub key_tag: u16,
    pub algorithm: u8,
    pub algorithm_name: String,
    pub digest_type: u8,
    pub digest_type_name: String,
    /// Upper-case hex
    pub digest: String,
    pub ttl: u32,
}

impl DsRecord {
    pub fn from_rdata(ds: &DsData, ttl: u32) -> Self {
        Self {
            key_tag: ds.key_tag,
            algorithm: ds.algorithm,
            algorithm_name: algorithm_name(ds.algorithm),
            digest_type: ds.digest_type,
            digest_type_name: digest_type_name(ds.digest_type),
            digest: hex::encode_upper(&ds.digest),
            ttl,
        }
    }

    pub fn from_resource(rr: &DNSResource) -> Option<Self> {
        match &rr.parsed_rdata {
            RData::DS(ds) => Some(Self::from_rdata(ds, rr.ttl)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyHierarchyLevel {
    Primary,
    Signing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnskeyRecord {
    pub flags: u16,
    pub protocol: u8,
    pub algorithm: u8,
    pub algorithm_name: String,
    pub key_tag: u16,
    pub key_size: u32,
    pub key_data_b64: String,
    pub key_data_hex: String,
    pub is_sep: bool,
    pub ttl: u32,
    pub role: PrimaryRole,
    pub all_roles: Vec<KeyRole>,
    pub is_ksk: bool,
    pub is_zsk: bool,
    pub role_confidence: RoleConfidence,
    /// 1-based position in the response
    pub key_order: usize,
    pub key_hierarchy_level: KeyHierarchyLevel,
    /// Taken from the fallback table rather than observed
    pub synthetic: bool,
}

impl DnskeyRecord {
    fn with_role(
        key: &DnskeyData,
        ttl: u32,
        key_order: usize,
        role: RoleAssignment,
    ) -> Self {
        let is_ksk = role.is_ksk();
        let is_zsk = role.is_zsk();
        Self {
            flags: key.flags,
            protocol: key.protocol,
            algorithm: key.algorithm,
            algorithm_name: algorithm_name(key.algorithm),
            key_tag: key.key_tag(),
            key_size: estimate_key_size(key.algorithm, &key.public_key),
            key_data_b64: BASE64.encode(&key.public_key),
            key_data_hex: hex::encode_upper(&key.public_key),
            is_sep: role.is_sep,
            ttl,
            role: role.primary,
            all_roles: role.roles,
            is_ksk,
            is_zsk,
            role_confidence: role.confidence,
            key_order,
            key_hierarchy_level: hierarchy_level(is_ksk),
            synthetic: false,
        }
    }

    /// Placeholder key for a root zone whose DNSKEY set could not be fetched.
    pub fn from_fallback(key: &FallbackKey, key_order: usize) -> Self {
        let all_roles = match key.role {
            PrimaryRole::Ksk => vec![KeyRole::Ksk],
            PrimaryRole::Zsk => vec![KeyRole::Zsk],
            PrimaryRole::Combined => vec![KeyRole::Zsk, KeyRole::Ksk],
        };
        let is_ksk = all_roles.contains(&KeyRole::Ksk);
        let is_zsk = all_roles.contains(&KeyRole::Zsk);
        Self {
            flags: key.flags,
            protocol: key.protocol,
            algorithm: key.algorithm,
            algorithm_name: algorithm_name(key.algorithm),
            key_tag: key.key_tag,
            key_size: key.key_size,
            key_data_b64: String::new(),
            key_data_hex: String::new(),
            is_sep: key.is_sep(),
            ttl: 0,
            role: key.role,
            all_roles,
            is_ksk,
            is_zsk,
            role_confidence: RoleConfidence::Assumed,
            key_order,
            key_hierarchy_level: hierarchy_level(is_ksk),
            synthetic: true,
        }
    }
}

fn hierarchy_level(is_ksk: bool) -> KeyHierarchyLevel {
    if is_ksk {
        KeyHierarchyLevel::Primary
    } else {
        KeyHierarchyLevel::Signing
    }
}

/// Build the DNSKEY set of a zone from answer records, classifying roles over
/// the whole set.
pub fn dnskey_set<'a>(answers: impl IntoIterator<Item = &'a DNSResource>) -> Vec<DnskeyRecord> {
    let keys: Vec<(&DnskeyData, u32)> = answers
        .into_iter()
        .filter(|rr| rr.rtype == DNSResourceType::DNSKEY)
        .filter_map(|rr| match &rr.parsed_rdata {
            RData::DNSKEY(key) => Some((key, rr.ttl)),
            _ => None,
        })
        .collect();

    let sep_flags: Vec<bool> = keys.iter().map(|(key, _)| key.is_sep()).collect();
    keys.iter()
        .zip(classify_zone_keys(&sep_flags))
        .enumerate()
        .map(|(i, ((key, ttl), role))| DnskeyRecord::with_role(key, *ttl, i + 1, role))
        .collect()
}

/// Where a denial-of-existence record was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialSource {
    Answer,
    AuthoritySection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NsecRecord {
    pub owner: String,
    pub next_domain: String,
    pub types: Vec<String>,
    pub ttl: u32,
    pub source: DenialSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nsec3Record {
    pub owner: String,
    pub hash_algorithm: u8,
    pub flags: u8,
    pub iterations: u16,
    /// Upper-case hex, empty when unsalted
    pub salt: String,
    /// Upper-case hex
    pub next_hashed_owner: String,
    pub types: Vec<String>,
    pub ttl: u32,
    pub source: DenialSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DenialRecord {
    #[serde(rename = "NSEC")]
    Nsec(NsecRecord),
    #[serde(rename = "NSEC3")]
    Nsec3(Nsec3Record),
}

fn type_names(types: &[DNSResourceType]) -> Vec<String> {
    types.iter().map(ToString::to_string).collect()
}

impl DenialRecord {
    pub fn from_nsec(owner: String, nsec: &NsecData, ttl: u32, source: DenialSource) -> Self {
        DenialRecord::Nsec(NsecRecord {
            owner,
            next_domain: nsec.next_domain.clone(),
            types: type_names(&nsec.types),
            ttl,
            source,
        })
    }

    pub fn from_nsec3(owner: String, nsec3: &Nsec3Data, ttl: u32, source: DenialSource) -> Self {
        DenialRecord::Nsec3(Nsec3Record {
            owner,
            hash_algorithm: nsec3.hash_algorithm,
            flags: nsec3.flags,
            iterations: nsec3.iterations,
            salt: hex::encode_upper(&nsec3.salt),
            next_hashed_owner: hex::encode_upper(&nsec3.next_hashed_owner),
            types: type_names(&nsec3.types),
            ttl,
            source,
        })
    }

    pub fn from_resource(rr: &DNSResource, source: DenialSource) -> Option<Self> {
        match &rr.parsed_rdata {
            RData::NSEC(nsec) => Some(Self::from_nsec(rr.owner(), nsec, rr.ttl, source)),
            RData::NSEC3(nsec3) => Some(Self::from_nsec3(rr.owner(), nsec3, rr.ttl, source)),
            _ => None,
        }
    }

    pub fn source(&self) -> DenialSource {
        match self {
            DenialRecord::Nsec(r) => r.source,
            DenialRecord::Nsec3(r) => r.source,
        }
    }

    pub fn owner(&self) -> &str {
        match self {
            DenialRecord::Nsec(r) => &r.owner,
            DenialRecord::Nsec3(r) => &r.owner,
        }
    }

    /// Equality ignoring the section the record was found in.
    pub fn same_content(&self, other: &DenialRecord) -> bool {
        match (self, other) {
            (DenialRecord::Nsec(a), DenialRecord::Nsec(b)) => {
                a.owner == b.owner
                    && a.next_domain == b.next_domain
                    && a.types == b.types
                    && a.ttl == b.ttl
            }
            (DenialRecord::Nsec3(a), DenialRecord::Nsec3(b)) => {
                a.owner == b.owner
                    && a.hash_algorithm == b.hash_algorithm
                    && a.flags == b.flags
                    && a.iterations == b.iterations
                    && a.salt == b.salt
                    && a.next_hashed_owner == b.next_hashed_owner
                    && a.types == b.types
                    && a.ttl == b.ttl
            }
            _ => false,
        }
    }
}

/// Append `record` unless an identical one is already present.
pub fn push_unique_denial(records: &mut Vec<DenialRecord>, record: DenialRecord) {
    if !records.iter().any(|existing| existing.same_content(&record)) {
        records.push(record);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoaRecord {
    pub mname: String,
    pub rname: String,
    pub serial: u32,
    pub refresh: u32,
    pub retry: u32,
    pub expire: u32,
    pub minimum: u32,
    pub ttl: u32,
    /// An RRSIG covering SOA was present in the same response
    pub signed: bool,
}

impl SoaRecord {
    pub fn from_rdata(soa: &SoaData, ttl: u32, signed: bool) -> Self {
        Self {
            mname: soa.mname.clone(),
            rname: soa.rname.clone(),
            serial: soa.serial,
            refresh: soa.refresh,
            retry: soa.retry,
            expire: soa.expire,
            minimum: soa.minimum,
            ttl,
            signed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InformationalRecord {
    pub value: String,
    pub ttl: u32,
    pub signed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InformationalRecords {
    pub a: Vec<InformationalRecord>,
    pub aaaa: Vec<InformationalRecord>,
    pub mx: Vec<InformationalRecord>,
    pub txt: Vec<InformationalRecord>,
}

impl InformationalRecords {
    pub fn is_empty(&self) -> bool {
        self.a.is_empty() && self.aaaa.is_empty() && self.mx.is_empty() && self.txt.is_empty()
    }
}

/// Raw lookups behind [`InformationalRecords`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InformationalLookups {
    pub a: Result<Vec<InformationalRecord>, FetchError>,
    pub aaaa: Result<Vec<InformationalRecord>, FetchError>,
    pub mx: Result<Vec<InformationalRecord>, FetchError>,
    pub txt: Result<Vec<InformationalRecord>, FetchError>,
}

impl InformationalLookups {
    fn entries(&self) -> [(DNSResourceType, &Result<Vec<InformationalRecord>, FetchError>); 4] {
        [
            (DNSResourceType::A, &self.a),
            (DNSResourceType::AAAA, &self.aaaa),
            (DNSResourceType::MX, &self.mx),
            (DNSResourceType::TXT, &self.txt),
        ]
    }
}

/// Any record kept for a zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Ds(DsRecord),
    Dnskey(DnskeyRecord),
    Ns(String),
    Soa(SoaRecord),
    Denial(DenialRecord),
    Informational {
        rtype: DNSResourceType,
        record: InformationalRecord,
    },
}

impl Record {
    pub fn rtype(&self) -> DNSResourceType {
        match self {
            Record::Ds(_) => DNSResourceType::DS,
            Record::Dnskey(_) => DNSResourceType::DNSKEY,
            Record::Ns(_) => DNSResourceType::NS,
            Record::Soa(_) => DNSResourceType::SOA,
            Record::Denial(DenialRecord::Nsec(_)) => DNSResourceType::NSEC,
            Record::Denial(DenialRecord::Nsec3(_)) => DNSResourceType::NSEC3,
            Record::Informational { rtype, .. } => *rtype,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupFailure {
    pub record_type: String,
    pub error: String,
}

impl LookupFailure {
    pub fn new(rtype: DNSResourceType, error: &FetchError) -> Self {
        Self {
            record_type: rtype.to_string(),
            error: error.to_string(),
        }
    }
}

/// Everything fetched for one zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneRecords {
    pub zone: ZoneName,
    pub ds: Result<Vec<DsRecord>, FetchError>,
    pub dnskey: Result<Vec<DnskeyRecord>, FetchError>,
    pub ns: Result<Vec<String>, FetchError>,
    pub soa: Result<Option<SoaRecord>, FetchError>,
    pub denial: Result<Vec<DenialRecord>, FetchError>,
    pub informational: Option<InformationalLookups>,
    /// Set when the DNSKEY set came from the fallback table; holds the
    /// lookup error if there was one.
    pub dnskey_fallback: Option<Option<FetchError>>,
}

fn collapsed<T>(result: &Result<Vec<T>, FetchError>) -> &[T] {
    match result {
        Ok(records) => records,
        Err(_) => &[],
    }
}

impl ZoneRecords {
    /// A zone with every lookup succeeding and returning nothing.
    pub fn empty(zone: ZoneName) -> Self {
        Self {
            zone,
            ds: Ok(Vec::new()),
            dnskey: Ok(Vec::new()),
            ns: Ok(Vec::new()),
            soa: Ok(None),
            denial: Ok(Vec::new()),
            informational: None,
            dnskey_fallback: None,
        }
    }

    /// A zone whose every lookup failed with `error`.
    pub fn failed(zone: ZoneName, error: FetchError) -> Self {
        Self {
            zone,
            ds: Err(error.clone()),
            dnskey: Err(error.clone()),
            ns: Err(error.clone()),
            soa: Err(error.clone()),
            denial: Err(error),
            informational: None,
            dnskey_fallback: None,
        }
    }

    pub fn ds_records(&self) -> &[DsRecord] {
        collapsed(&self.ds)
    }

    pub fn dnskey_records(&self) -> &[DnskeyRecord] {
        collapsed(&self.dnskey)
    }

    pub fn ns_records(&self) -> &[String] {
        collapsed(&self.ns)
    }

    pub fn soa_record(&self) -> Option<&SoaRecord> {
        self.soa.as_ref().ok().and_then(Option::as_ref)
    }

    pub fn denial_records(&self) -> &[DenialRecord] {
        collapsed(&self.denial)
    }

    pub fn has_ds(&self) -> bool {
        !self.ds_records().is_empty()
    }

    pub fn has_dnskey(&self) -> bool {
        !self.dnskey_records().is_empty()
    }

    pub fn has_denial(&self) -> bool {
        !self.denial_records().is_empty()
    }

    pub fn uses_fallback_keys(&self) -> bool {
        self.dnskey_fallback.is_some()
    }

    pub fn informational_records(&self) -> Option<InformationalRecords> {
        self.informational.as_ref().map(|lookups| InformationalRecords {
            a: collapsed(&lookups.a).to_vec(),
            aaaa: collapsed(&lookups.aaaa).to_vec(),
            mx: collapsed(&lookups.mx).to_vec(),
            txt: collapsed(&lookups.txt).to_vec(),
        })
    }

    /// Lookups that failed and were rendered as "absent".
    pub fn lookup_failures(&self) -> Vec<LookupFailure> {
        let mut failures = Vec::new();
        if let Err(e) = &self.ds {
            failures.push(LookupFailure::new(DNSResourceType::DS, e));
        }
        if let Err(e) = &self.dnskey {
            failures.push(LookupFailure::new(DNSResourceType::DNSKEY, e));
        }
        if let Some(Some(e)) = &self.dnskey_fallback {
            failures.push(LookupFailure::new(DNSResourceType::DNSKEY, e));
        }
        if let Err(e) = &self.ns {
            failures.push(LookupFailure::new(DNSResourceType::NS, e));
        }
        if let Err(e) = &self.soa {
            failures.push(LookupFailure::new(DNSResourceType::SOA, e));
        }
        if let Err(e) = &self.denial {
            failures.push(LookupFailure::new(DNSResourceType::NSEC, e));
        }
        if let Some(lookups) = &self.informational {
            for (rtype, result) in lookups.entries() {
                if let Err(e) = result {
                    failures.push(LookupFailure::new(rtype, e));
                }
            }
        }
        failures
    }
}
