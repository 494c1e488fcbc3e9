use chrono::{TimeZone, Utc};
use dnscap::dnssec::{PrimaryRole, RoleConfidence, RootKeyTable};
use dnscap::graph::{DomainType, assemble_report};
use dnscap::hierarchy::{ZoneName, decompose};
use dnscap::records::{DnskeyRecord, DsRecord, ZoneRecords, dnskey_set};
use dnscap::status::{ChainAnalysis, ChainStatus, EdgeStatus, SigningStatus, StatusType};

mod common;
use common::dnskey_rr;

fn chain(domain: &str) -> Vec<ZoneRecords> {
    let zone = ZoneName::parse(domain).unwrap();
    decompose(&zone).into_iter().map(ZoneRecords::empty).collect()
}

fn ds(key_tag: u16) -> DsRecord {
    DsRecord {
        key_tag,
        algorithm: 13,
        algorithm_name: "ECDSAP256SHA256".to_string(),
        digest_type: 2,
        digest_type_name: "SHA-256".to_string(),
        digest: "AB".repeat(32),
        ttl: 86400,
    }
}

fn keys(owner: &str, flags: &[u16]) -> Vec<DnskeyRecord> {
    let answers: Vec<_> = flags
        .iter()
        .map(|&f| dnskey_rr(owner, f, 13, &[f as u8; 64]))
        .collect();
    dnskey_set(&answers)
}

fn sign(zone: &mut ZoneRecords, with_ds: bool) {
    let owner = zone.zone.to_string();
    zone.dnskey = Ok(keys(&owner, &[257, 256]));
    if with_ds {
        zone.ds = Ok(vec![ds(1000)]);
    }
}

fn fixed_time() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

#[test]
fn fully_signed_chain_is_complete() {
    let mut zones = chain("example.com");
    for zone in &mut zones {
        sign(zone, true);
    }

    let report = assemble_report("example.com", &zones, fixed_time());
    for level in &report.levels {
        assert_eq!(level.dnssec_status.status, SigningStatus::Signed);
        assert_eq!(level.dnssec_status.status_type, StatusType::Success);
        assert!(!level.chain_break_info.has_chain_break);
    }
    assert_eq!(report.metadata.chain_status, ChainStatus::Complete);
    assert_eq!(report.metadata.chain_message, "Full DNSSEC validation possible");
    assert!(report.chain_summary.chain_complete);
    assert!(report.chain_summary.chain_breaks.is_empty());
    assert_eq!(report.chain_summary.signed_levels, 3);
    assert_eq!(report.chain_summary.unsigned_levels, 0);
    assert!(report.relationships.iter().all(|r| r.status == EdgeStatus::Valid));
    assert!(report.graph_data.edges.iter().all(|e| e.animated));
}

#[test]
fn missing_tld_ds_breaks_at_target() {
    let mut zones = chain("example.com");
    sign(&mut zones[0], true);
    sign(&mut zones[1], false);
    sign(&mut zones[2], true);

    let report = assemble_report("example.com", &zones, fixed_time());
    let breaks = &report.chain_summary.chain_breaks;
    assert_eq!(breaks.len(), 1);
    assert_eq!(breaks[0].level, 2);
    assert_eq!(breaks[0].domain, "example.com");
    assert_eq!(breaks[0].reason, "Missing DS record in parent zone");

    assert_eq!(report.metadata.chain_status, ChainStatus::Broken);
    assert_eq!(report.metadata.chain_message, "Chain break detected at 1 level(s)");
    assert_eq!(report.chain_summary.security_status.status_type, StatusType::Error);

    let target = &report.levels[2];
    assert!(target.chain_break_info.has_chain_break);
    assert_eq!(
        target.chain_break_info.break_reason.as_deref(),
        Some("Missing DS record in parent zone")
    );
    assert_eq!(report.relationships[1].status, EdgeStatus::Unsigned);
    assert!(!report.graph_data.edges[1].animated);

    let tld = &report.levels[1];
    assert_eq!(tld.dnssec_status.status, SigningStatus::Partial);
    assert_eq!(
        tld.dnssec_status.message,
        "Has DNSKEY but no DS record (unsigned delegation)"
    );
}

#[test]
fn ds_without_dnskey_is_reported() {
    let mut zones = chain("example.com");
    sign(&mut zones[0], true);
    sign(&mut zones[1], true);
    zones[2].ds = Ok(vec![ds(370)]);

    let report = assemble_report("example.com", &zones, fixed_time());
    let target = &report.levels[2];
    assert_eq!(target.dnssec_status.status, SigningStatus::Partial);
    assert_eq!(target.dnssec_status.message, "Has DS record but no DNSKEY found");
    assert_eq!(
        target.chain_break_info.break_reason.as_deref(),
        Some("DS record exists but DNSKEY not found")
    );
    assert_eq!(report.relationships[1].status, EdgeStatus::Broken);
}

#[test]
fn fallback_root_keys_count_as_signed() {
    let table = RootKeyTable::embedded().unwrap();
    let mut zones = chain("example.com");
    zones[0].dnskey = Ok(table
        .keys
        .iter()
        .enumerate()
        .map(|(i, k)| DnskeyRecord::from_fallback(k, i + 1))
        .collect());
    zones[0].dnskey_fallback = Some(None);

    let report = assemble_report("example.com", &zones, fixed_time());
    let root = &report.levels[0];
    assert_eq!(root.dnssec_status.status, SigningStatus::Signed);
    assert_eq!(root.dnssec_status.message, "Root zone is signed (trust anchor)");
    assert!(root.fallback_keys_used);
    assert_eq!(root.key_hierarchy.total_keys, 4);
    assert_eq!(root.key_hierarchy.ksk_count, 1);
    assert_eq!(root.key_hierarchy.zsk_count, 3);
    assert!(root.records.dnskey_records.iter().all(|k| k.synthetic));
}

#[test]
fn single_sep_key_gets_combined_role() {
    let mut zones = chain("example.com");
    zones[2].dnskey = Ok(keys("example.com", &[257]));

    let report = assemble_report("example.com", &zones, fixed_time());
    let key = &report.levels[2].records.dnskey_records[0];
    assert_eq!(key.role, PrimaryRole::Combined);
    assert_eq!(key.role_confidence, RoleConfidence::Medium);
    assert!(key.is_ksk && key.is_zsk);
    assert_eq!(report.levels[2].key_hierarchy.ksk_count, 1);
    assert_eq!(report.levels[2].key_hierarchy.zsk_count, 1);

    let json = serde_json::to_value(key).unwrap();
    assert_eq!(json["role"], "ZSK/KSK");
}

#[test]
fn unsigned_domain_has_unsigned_levels() {
    let mut zones = chain("example.com");
    sign(&mut zones[0], false);

    let report = assemble_report("example.com", &zones, fixed_time());
    for level in &report.levels[1..] {
        assert_eq!(level.dnssec_status.status, SigningStatus::Unsigned);
        assert_eq!(level.dnssec_status.message, "No DNSSEC records found");
        assert_eq!(level.dnssec_status.status_type, StatusType::Error);
    }
    // The root carries no DS, so every level below it is a break.
    assert_eq!(report.metadata.chain_status, ChainStatus::Broken);
    assert_eq!(report.chain_summary.chain_breaks.len(), 2);
    assert_eq!(report.chain_summary.signed_levels, 1);
}

#[test]
fn analysis_is_idempotent() {
    let mut zones = chain("a.b.example.org");
    sign(&mut zones[0], true);
    sign(&mut zones[2], false);
    let first = ChainAnalysis::evaluate(&zones);
    let second = ChainAnalysis::evaluate(&zones);
    assert_eq!(first, second);

    let report_a = assemble_report("a.b.example.org", &zones, fixed_time());
    let report_b = assemble_report("a.b.example.org", &zones, fixed_time());
    assert_eq!(report_a, report_b);
}

#[test]
fn nsec_presence_is_appended_to_message() {
    use dnscap::dns::enums::DNSResourceType;
    use dnscap::records::{DenialRecord, DenialSource, push_unique_denial};

    let mut zones = chain("example.com");
    let rr = common::nsec_rr(
        "example.com",
        "a.example.com",
        &[DNSResourceType::NS, DNSResourceType::SOA],
    );
    let mut denial = Vec::new();
    push_unique_denial(
        &mut denial,
        DenialRecord::from_resource(&rr, DenialSource::Answer).unwrap(),
    );
    zones[2].denial = Ok(denial);

    let report = assemble_report("example.com", &zones, fixed_time());
    let target = &report.levels[2];
    assert!(target.dnssec_status.has_nsec);
    assert_eq!(
        target.dnssec_status.message,
        "No DNSSEC records found (NSEC records present)"
    );
    assert_eq!(target.chain_break_info.nsec_evidence.as_ref().map(Vec::len), Some(1));
    assert_eq!(report.graph_data.nodes[2].nsec_count, 1);
}

#[test]
fn report_json_shape() {
    let mut zones = chain("www.example.com");
    for zone in &mut zones {
        sign(zone, true);
    }
    zones[1].ns = Ok(vec!["a.gtld-servers.net.".to_string()]);

    let report = assemble_report("www.example.com", &zones, fixed_time());
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["success"], true);
    assert_eq!(json["metadata"]["target_domain"], "www.example.com");
    assert_eq!(json["metadata"]["analysis_timestamp"], "2024-05-01T12:00:00.000Z");
    assert_eq!(json["metadata"]["chain_length"], 4);
    assert_eq!(json["metadata"]["chain_status"], "complete");
    assert!(json["metadata"]["validation_note"].as_str().unwrap().contains("presence"));
    assert_eq!(json["chain_summary"]["security_status"]["type"], "success");

    let levels = json["levels"].as_array().unwrap();
    assert_eq!(levels.len(), 4);
    assert_eq!(levels[0]["id"], "level_0");
    assert_eq!(levels[0]["display_name"], "ROOT");
    assert_eq!(levels[0]["domain_type"], "root");
    assert_eq!(levels[1]["domain_type"], "tld");
    assert_eq!(levels[2]["domain_type"], "subdomain");
    assert_eq!(levels[3]["domain_type"], "target");
    assert_eq!(levels[1]["records"]["ns_records"][0], "a.gtld-servers.net.");
    assert_eq!(levels[1]["delegation"]["delegates_to"], "example.com");
    assert_eq!(levels[1]["delegation"]["delegated_from"], "ROOT");
    assert!(levels[0]["delegation"]["delegated_from"].is_null());
    assert_eq!(levels[0]["dnssec_status"]["type"], "success");
    assert!(levels[0]["records"].get("informational").is_none());

    let rels = json["relationships"].as_array().unwrap();
    assert_eq!(rels.len(), 3);
    assert_eq!(rels[0]["id"], "rel_0");
    assert_eq!(rels[0]["from"], "level_0");
    assert_eq!(rels[0]["to"], "level_1");
    assert_eq!(rels[0]["type"], "delegation");
    assert_eq!(rels[0]["status"], "valid");

    let nodes = json["graph_data"]["nodes"].as_array().unwrap();
    assert_eq!(nodes[1]["type"], "tld");
    assert_eq!(nodes[1]["ns_count"], 1);
    assert_eq!(nodes[1]["ksk_count"], 1);
    let edges = json["graph_data"]["edges"].as_array().unwrap();
    assert_eq!(edges[0]["label"], "ROOT → com");
    assert_eq!(edges[0]["animated"], true);
}

#[test]
fn domain_types_for_short_chains() {
    let report = assemble_report("com", &chain("com"), fixed_time());
    assert_eq!(report.levels[0].domain_type, DomainType::Root);
    assert_eq!(report.levels[1].domain_type, DomainType::Target);

    let report = assemble_report(".", &chain("."), fixed_time());
    assert_eq!(report.levels.len(), 1);
    assert!(report.relationships.is_empty());
    assert_eq!(report.metadata.chain_status, ChainStatus::Incomplete);
}
