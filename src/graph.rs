//! Chain report assembly: per-level objects, delegation edges and the
//! node/edge projection consumed by visualizations.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::dns::enums::DNSResourceType;
use crate::records::{
    DenialRecord, DnskeyRecord, DsRecord, InformationalRecords, LookupFailure, Record,
    SoaRecord, ZoneRecords,
};
use crate::status::{
    ChainAnalysis, ChainBreak, ChainStatus, EdgeStatus, SigningStatus, StatusType,
};

pub const VALIDATION_NOTE: &str = "Statuses reflect the presence of DNSSEC records only; \
     signatures and DS digests are not cryptographically verified.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainType {
    Root,
    Tld,
    Subdomain,
    Target,
}

impl DomainType {
    pub fn for_level(is_root: bool, index: usize, chain_length: usize) -> Self {
        if is_root {
            DomainType::Root
        } else if index == 1 && chain_length > 2 {
            DomainType::Tld
        } else if index + 1 == chain_length && index > 0 {
            DomainType::Target
        } else {
            DomainType::Subdomain
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    Delegation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub target_domain: String,
    pub analysis_timestamp: String,
    pub chain_length: usize,
    pub signed_levels: usize,
    pub chain_status: ChainStatus,
    pub chain_message: String,
    pub validation_note: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityStatus {
    pub overall_status: ChainStatus,
    pub message: String,
    #[serde(rename = "type")]
    pub status_type: StatusType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSummary {
    pub total_levels: usize,
    pub signed_levels: usize,
    pub unsigned_levels: usize,
    pub chain_complete: bool,
    pub chain_breaks: Vec<ChainBreak>,
    pub security_status: SecurityStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnssecStatus {
    pub status: SigningStatus,
    pub message: String,
    #[serde(rename = "type")]
    pub status_type: StatusType,
    pub has_ds: bool,
    pub has_dnskey: bool,
    pub has_nsec: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHierarchy {
    pub ksk_count: usize,
    pub zsk_count: usize,
    pub total_keys: usize,
    pub ksk_keys: Vec<DnskeyRecord>,
    pub zsk_keys: Vec<DnskeyRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRecords {
    pub ds_records: Vec<DsRecord>,
    pub dnskey_records: Vec<DnskeyRecord>,
    pub ns_records: Vec<String>,
    pub soa_record: Option<SoaRecord>,
    pub nsec_records: Vec<DenialRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub informational: Option<InformationalRecords>,
}

impl LevelRecords {
    /// Every record of the level as one list, DS first.
    pub fn all(&self) -> Vec<Record> {
        let mut records: Vec<Record> = Vec::new();
        records.extend(self.ds_records.iter().cloned().map(Record::Ds));
        records.extend(self.dnskey_records.iter().cloned().map(Record::Dnskey));
        records.extend(self.ns_records.iter().cloned().map(Record::Ns));
        records.extend(self.soa_record.iter().cloned().map(Record::Soa));
        records.extend(self.nsec_records.iter().cloned().map(Record::Denial));
        if let Some(info) = &self.informational {
            for (rtype, set) in [
                (DNSResourceType::A, &info.a),
                (DNSResourceType::AAAA, &info.aaaa),
                (DNSResourceType::MX, &info.mx),
                (DNSResourceType::TXT, &info.txt),
            ] {
                records.extend(
                    set.iter()
                        .cloned()
                        .map(|record| Record::Informational { rtype, record }),
                );
            }
        }
        records
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    pub delegates_to: Option<String>,
    pub delegated_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreakInfo {
    pub has_chain_break: bool,
    pub break_reason: Option<String>,
    pub nsec_evidence: Option<Vec<DenialRecord>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelReport {
    pub id: String,
    pub index: usize,
    pub domain: String,
    pub display_name: String,
    pub domain_type: DomainType,
    pub dnssec_status: DnssecStatus,
    pub key_hierarchy: KeyHierarchy,
    pub records: LevelRecords,
    pub delegation: Delegation,
    pub chain_break_info: ChainBreakInfo,
    /// Lookups that failed and are shown as absent above
    pub lookup_failures: Vec<LookupFailure>,
    /// DNSKEY set came from the fallback table
    pub fallback_keys_used: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub from: String,
    pub to: String,
    pub from_domain: String,
    pub to_domain: String,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    pub status: EdgeStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub domain: String,
    #[serde(rename = "type")]
    pub domain_type: DomainType,
    pub status: SigningStatus,
    pub status_type: StatusType,
    pub has_ds: bool,
    pub has_dnskey: bool,
    pub has_nsec: bool,
    pub ds_count: usize,
    pub dnskey_count: usize,
    pub ns_count: usize,
    pub nsec_count: usize,
    pub ksk_count: usize,
    pub zsk_count: usize,
    pub has_chain_break: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub label: String,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
    pub status: EdgeStatus,
    pub animated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphData {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Full result of one successful analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainReport {
    pub metadata: ReportMetadata,
    pub chain_summary: ChainSummary,
    pub levels: Vec<LevelReport>,
    pub relationships: Vec<Relationship>,
    pub graph_data: GraphData,
    pub success: bool,
}

fn level_id(index: usize) -> String {
    format!("level_{}", index)
}

fn build_level(
    index: usize,
    zones: &[ZoneRecords],
    analysis: &ChainAnalysis,
) -> LevelReport {
    let zone = &zones[index];
    let presence = analysis.presence[index];
    let status = &analysis.level_status[index];
    let break_reason = analysis.level_breaks[index];

    let dnskeys = zone.dnskey_records().to_vec();
    let ksk_keys: Vec<DnskeyRecord> = dnskeys.iter().filter(|k| k.is_ksk).cloned().collect();
    let zsk_keys: Vec<DnskeyRecord> = dnskeys.iter().filter(|k| k.is_zsk).cloned().collect();
    let denial = zone.denial_records().to_vec();

    LevelReport {
        id: level_id(index),
        index,
        domain: zone.zone.to_string(),
        display_name: zone.zone.display_name().to_string(),
        domain_type: DomainType::for_level(presence.is_root, index, zones.len()),
        dnssec_status: DnssecStatus {
            status: status.status,
            message: status.message.clone(),
            status_type: status.status_type,
            has_ds: presence.has_ds,
            has_dnskey: presence.has_dnskey,
            has_nsec: presence.has_nsec,
        },
        key_hierarchy: KeyHierarchy {
            ksk_count: ksk_keys.len(),
            zsk_count: zsk_keys.len(),
            total_keys: dnskeys.len(),
            ksk_keys,
            zsk_keys,
        },
        records: LevelRecords {
            ds_records: zone.ds_records().to_vec(),
            dnskey_records: dnskeys,
            ns_records: zone.ns_records().to_vec(),
            soa_record: zone.soa_record().cloned(),
            nsec_records: denial.clone(),
            informational: zone.informational_records(),
        },
        delegation: Delegation {
            delegates_to: zones
                .get(index + 1)
                .map(|next| next.zone.display_name().to_string()),
            delegated_from: index
                .checked_sub(1)
                .map(|prev| zones[prev].zone.display_name().to_string()),
        },
        chain_break_info: ChainBreakInfo {
            has_chain_break: break_reason.is_some(),
            break_reason: break_reason.map(|r| r.to_string()),
            nsec_evidence: if denial.is_empty() { None } else { Some(denial) },
        },
        lookup_failures: zone.lookup_failures(),
        fallback_keys_used: zone.uses_fallback_keys(),
    }
}

fn node_for(level: &LevelReport) -> GraphNode {
    GraphNode {
        id: level.id.clone(),
        label: level.display_name.clone(),
        domain: level.domain.clone(),
        domain_type: level.domain_type,
        status: level.dnssec_status.status,
        status_type: level.dnssec_status.status_type,
        has_ds: level.dnssec_status.has_ds,
        has_dnskey: level.dnssec_status.has_dnskey,
        has_nsec: level.dnssec_status.has_nsec,
        ds_count: level.records.ds_records.len(),
        dnskey_count: level.records.dnskey_records.len(),
        ns_count: level.records.ns_records.len(),
        nsec_count: level.records.nsec_records.len(),
        ksk_count: level.key_hierarchy.ksk_count,
        zsk_count: level.key_hierarchy.zsk_count,
        has_chain_break: level.chain_break_info.has_chain_break,
    }
}

fn edge_for(relationship: &Relationship) -> GraphEdge {
    GraphEdge {
        id: relationship.id.clone(),
        source: relationship.from.clone(),
        target: relationship.to.clone(),
        label: format!("{} → {}", relationship.from_domain, relationship.to_domain),
        relationship_type: relationship.relationship_type,
        status: relationship.status,
        animated: relationship.status == EdgeStatus::Valid,
    }
}

/// Assemble the report for `zones`, which must run root first.
pub fn assemble_report(target_domain: &str, zones: &[ZoneRecords], analysed_at: DateTime<Utc>) -> ChainReport {
    let analysis = ChainAnalysis::evaluate(zones);

    let levels: Vec<LevelReport> = (0..zones.len())
        .map(|i| build_level(i, zones, &analysis))
        .collect();

    let relationships: Vec<Relationship> = analysis
        .edges
        .iter()
        .enumerate()
        .map(|(i, status)| Relationship {
            id: format!("rel_{}", i),
            from: levels[i].id.clone(),
            to: levels[i + 1].id.clone(),
            from_domain: levels[i].display_name.clone(),
            to_domain: levels[i + 1].display_name.clone(),
            relationship_type: RelationshipType::Delegation,
            status: *status,
        })
        .collect();

    let total_levels = zones.len();
    let graph_data = GraphData {
        nodes: levels.iter().map(node_for).collect(),
        edges: relationships.iter().map(edge_for).collect(),
    };

    ChainReport {
        metadata: ReportMetadata {
            target_domain: target_domain.to_string(),
            analysis_timestamp: analysed_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            chain_length: total_levels,
            signed_levels: analysis.signed_levels,
            chain_status: analysis.status,
            chain_message: analysis.message.clone(),
            validation_note: VALIDATION_NOTE.to_string(),
        },
        chain_summary: ChainSummary {
            total_levels,
            signed_levels: analysis.signed_levels,
            unsigned_levels: total_levels - analysis.signed_levels,
            chain_complete: analysis.status == ChainStatus::Complete,
            chain_breaks: analysis.breaks.clone(),
            security_status: SecurityStatus {
                overall_status: analysis.status,
                message: analysis.message.clone(),
                status_type: analysis.status.security_type(),
            },
        },
        levels,
        relationships,
        graph_data,
        success: true,
    }
}
