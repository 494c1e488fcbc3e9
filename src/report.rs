//! Plain-text rendering of a chain report.

use std::fmt::Write;

use crate::graph::{ChainReport, DomainType, LevelReport};
use crate::records::{DenialRecord, Record};
use crate::status::{ChainStatus, StatusType};

const HEAVY_RULE: &str = "================================================================================";
const LIGHT_RULE: &str = "------------------------------------------------------------";

#[derive(Default)]
struct Sections {
    ns: Vec<String>,
    soa: Vec<String>,
    ds: Vec<String>,
    dnskey: Vec<String>,
    denial: Vec<String>,
    informational: Vec<String>,
}

fn sections_for(level: &LevelReport) -> Sections {
    let mut sections = Sections::default();
    for record in level.records.all() {
        let rtype = record.rtype().to_string();
        match record {
            Record::Ns(target) => sections.ns.push(format!("   • {}", target)),
            Record::Soa(soa) => sections.soa.push(format!(
                "   Master:     {}\n   Contact:    {}\n   Serial:     {}\n   Refresh:    {}s\n   \
                 Retry:      {}s\n   Expire:     {}s\n   Minimum:    {}s\n   TTL:        {}s\n   \
                 Signed:     {}",
                soa.mname,
                soa.rname,
                soa.serial,
                soa.refresh,
                soa.retry,
                soa.expire,
                soa.minimum,
                soa.ttl,
                if soa.signed { "yes" } else { "no" }
            )),
            Record::Ds(ds) => sections.ds.push(format!(
                "   DS Record #{}:\n     Key Tag:      {}\n     Algorithm:    {} ({})\n     \
                 Digest Type:  {} ({})\n     Digest:       {}\n     TTL:          {}s",
                sections.ds.len() + 1,
                ds.key_tag,
                ds.algorithm,
                ds.algorithm_name,
                ds.digest_type,
                ds.digest_type_name,
                ds.digest,
                ds.ttl
            )),
            Record::Dnskey(key) => sections.dnskey.push(format!(
                "   DNSKEY Record #{} - {}{}:\n     Key Tag:      {}\n     Flags:        {} ({})\n     \
                 Protocol:     {}\n     Algorithm:    {} ({})\n     Key Size:     ~{} bits\n     \
                 TTL:          {}s\n     Public Key:   {}",
                key.key_order,
                key.role,
                if key.synthetic { " [assumed]" } else { "" },
                key.key_tag,
                key.flags,
                if key.is_sep { "SEP" } else { "No SEP" },
                key.protocol,
                key.algorithm,
                key.algorithm_name,
                key.key_size,
                key.ttl,
                if key.key_data_b64.is_empty() { "-" } else { key.key_data_b64.as_str() }
            )),
            Record::Denial(DenialRecord::Nsec(nsec)) => sections.denial.push(format!(
                "   {:<5} {} -> {} [{}]",
                rtype,
                nsec.owner,
                nsec.next_domain,
                nsec.types.join(" ")
            )),
            Record::Denial(DenialRecord::Nsec3(nsec3)) => sections.denial.push(format!(
                "   {:<5} {} -> {} (alg {}, {} iterations) [{}]",
                rtype,
                nsec3.owner,
                nsec3.next_hashed_owner,
                nsec3.hash_algorithm,
                nsec3.iterations,
                nsec3.types.join(" ")
            )),
            Record::Informational { record, .. } => sections.informational.push(format!(
                "   {:<5} {}{}",
                rtype,
                record.value,
                if record.signed { " (signed)" } else { "" }
            )),
        }
    }
    sections
}

fn status_marker(status_type: StatusType) -> &'static str {
    match status_type {
        StatusType::Success => "[OK]",
        StatusType::Warning => "[WARN]",
        StatusType::Error => "[FAIL]",
    }
}

fn render_level(out: &mut String, level: &LevelReport) -> std::fmt::Result {
    let suffix = match level.domain_type {
        DomainType::Root => " (DNS Root Zone)",
        DomainType::Tld => " (Top Level Domain)",
        DomainType::Target => " (Target Domain)",
        DomainType::Subdomain => "",
    };
    writeln!(out)?;
    writeln!(out, "LEVEL {}: {}{}", level.index + 1, level.display_name.to_uppercase(), suffix)?;
    writeln!(out, "{}", LIGHT_RULE)?;

    let sections = sections_for(level);
    if !sections.ns.is_empty() {
        writeln!(out, "\nNAME SERVERS:\n{}", sections.ns.join("\n"))?;
    }
    if !sections.soa.is_empty() {
        writeln!(out, "\nSOA RECORD:\n{}", sections.soa.join("\n"))?;
    }
    if !sections.ds.is_empty() {
        writeln!(out, "\nDS RECORDS (Delegation Signer):\n{}", sections.ds.join("\n\n"))?;
    } else if level.domain_type != DomainType::Root {
        writeln!(out, "\nDS RECORDS: None found")?;
    }
    if !sections.dnskey.is_empty() {
        writeln!(out, "\nDNSKEY RECORDS:\n{}", sections.dnskey.join("\n\n"))?;
    } else {
        writeln!(out, "\nDNSKEY RECORDS: None found")?;
    }
    if !sections.denial.is_empty() {
        writeln!(out, "\nDENIAL OF EXISTENCE:\n{}", sections.denial.join("\n"))?;
    }
    if !sections.informational.is_empty() {
        writeln!(out, "\nOTHER RECORDS:\n{}", sections.informational.join("\n"))?;
    }
    if !level.lookup_failures.is_empty() {
        writeln!(out, "\nFAILED LOOKUPS:")?;
        for failure in &level.lookup_failures {
            writeln!(out, "   {}: {}", failure.record_type, failure.error)?;
        }
    }

    writeln!(out, "\nDNSSEC STATUS:")?;
    writeln!(
        out,
        "   {} {}",
        status_marker(level.dnssec_status.status_type),
        level.dnssec_status.message
    )?;
    if let Some(reason) = &level.chain_break_info.break_reason {
        writeln!(out, "   [BREAK] {}", reason)?;
    }
    if let Some(next) = &level.delegation.delegates_to {
        writeln!(out, "\nDELEGATION TO: {}", next)?;
    }
    Ok(())
}

fn render_into(out: &mut String, report: &ChainReport) -> std::fmt::Result {
    writeln!(out, "{}", HEAVY_RULE)?;
    writeln!(out, "DNSSEC CHAIN OF TRUST: {}", report.metadata.target_domain)?;
    writeln!(out, "{}", HEAVY_RULE)?;

    for level in &report.levels {
        render_level(out, level)?;
    }

    let summary = &report.chain_summary;
    writeln!(out, "\n{}", HEAVY_RULE)?;
    writeln!(out, "CHAIN OF TRUST SUMMARY")?;
    writeln!(out, "{}", HEAVY_RULE)?;
    writeln!(out, "Chain Length:    {} levels", summary.total_levels)?;
    writeln!(out, "Signed Levels:   {}/{}", summary.signed_levels, summary.total_levels)?;
    let label = match summary.security_status.overall_status {
        ChainStatus::Complete => "COMPLETE",
        ChainStatus::Broken => "BROKEN",
        ChainStatus::Incomplete => "INCOMPLETE",
    };
    writeln!(out, "Chain Status:    {} - {}", label, summary.security_status.message)?;
    for chain_break in &summary.chain_breaks {
        writeln!(
            out,
            "   level {} ({}): {}",
            chain_break.level, chain_break.domain, chain_break.reason
        )?;
    }
    writeln!(out, "\nNote: {}", report.metadata.validation_note)?;
    Ok(())
}

pub fn render_report(report: &ChainReport) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = render_into(&mut out, report);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::assemble_report;
    use crate::hierarchy::{ZoneName, decompose};
    use crate::records::{DsRecord, ZoneRecords};
    use chrono::Utc;

    #[test]
    fn test_text_report_sections() {
        let zone = ZoneName::parse("example.com").unwrap();
        let mut zones: Vec<ZoneRecords> = decompose(&zone).into_iter().map(ZoneRecords::empty).collect();
        zones[1].ns = Ok(vec!["a.gtld-servers.net.".to_string()]);
        zones[2].ds = Ok(vec![DsRecord {
            key_tag: 370,
            algorithm: 13,
            algorithm_name: "ECDSAP256SHA256".to_string(),
            digest_type: 2,
            digest_type_name: "SHA-256".to_string(),
            digest: "ABCD".to_string(),
            ttl: 86400,
        }]);

        let text = render_report(&assemble_report("example.com", &zones, Utc::now()));
        assert!(text.contains("LEVEL 1: ROOT (DNS Root Zone)"));
        assert!(text.contains("LEVEL 2: COM (Top Level Domain)"));
        assert!(text.contains("LEVEL 3: EXAMPLE.COM (Target Domain)"));
        assert!(text.contains("   • a.gtld-servers.net."));
        assert!(text.contains("Key Tag:      370"));
        assert!(text.contains("DELEGATION TO: com"));
        assert!(text.contains("CHAIN OF TRUST SUMMARY"));
        assert!(text.contains("Signed Levels:   0/3"));
        assert!(text.contains("not cryptographically verified"));
    }
}
