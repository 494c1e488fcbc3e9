//! Signing status of each level and breaks between adjacent levels.
//!
//! Everything here is a pure function of record presence. A `signed` level
//! has DNSSEC records; nobody checked that they validate.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::records::ZoneRecords;

/// The presence bits classification depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LevelPresence {
    pub is_root: bool,
    pub has_ds: bool,
    pub has_dnskey: bool,
    pub has_nsec: bool,
}

impl LevelPresence {
    pub fn of(records: &ZoneRecords) -> Self {
        Self {
            is_root: records.zone.is_root(),
            has_ds: records.has_ds(),
            has_dnskey: records.has_dnskey(),
            has_nsec: records.has_denial(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningStatus {
    Signed,
    Partial,
    Unsigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusType {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelStatus {
    pub status: SigningStatus,
    pub message: String,
    pub status_type: StatusType,
}

pub fn classify_level(presence: &LevelPresence) -> LevelStatus {
    let (status, message, status_type) = match (presence.is_root, presence.has_ds, presence.has_dnskey) {
        (true, _, true) => (
            SigningStatus::Signed,
            "Root zone is signed (trust anchor)",
            StatusType::Success,
        ),
        (true, _, false) => (
            SigningStatus::Unsigned,
            "Root zone DNSKEY not found",
            StatusType::Error,
        ),
        (false, true, true) => (
            SigningStatus::Signed,
            "Fully signed with DNSSEC",
            StatusType::Success,
        ),
        (false, false, true) => (
            SigningStatus::Partial,
            "Has DNSKEY but no DS record (unsigned delegation)",
            StatusType::Warning,
        ),
        (false, true, false) => (
            SigningStatus::Partial,
            "Has DS record but no DNSKEY found",
            StatusType::Warning,
        ),
        (false, false, false) => (
            SigningStatus::Unsigned,
            "No DNSSEC records found",
            StatusType::Error,
        ),
    };

    let mut message = message.to_string();
    if presence.has_nsec {
        message.push_str(" (NSEC records present)");
    }
    LevelStatus {
        status,
        message,
        status_type,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BreakReason {
    MissingParentDs,
    MissingDnskey,
}

impl fmt::Display for BreakReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParentDs => write!(f, "Missing DS record in parent zone"),
            Self::MissingDnskey => write!(f, "DS record exists but DNSKEY not found"),
        }
    }
}

/// Break between `parent` and the level directly below it.
pub fn detect_break(parent: &LevelPresence, current: &LevelPresence) -> Option<BreakReason> {
    if !parent.has_ds && !current.is_root {
        Some(BreakReason::MissingParentDs)
    } else if !current.has_dnskey && parent.has_ds {
        Some(BreakReason::MissingDnskey)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStatus {
    Valid,
    Broken,
    Unsigned,
}

/// Delegation status from `source` to the level directly below it.
pub fn edge_status(source: &LevelPresence, target: &LevelPresence) -> EdgeStatus {
    if source.has_ds || source.is_root {
        if target.has_dnskey {
            EdgeStatus::Valid
        } else {
            EdgeStatus::Broken
        }
    } else {
        EdgeStatus::Unsigned
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    Complete,
    Broken,
    Incomplete,
}

impl ChainStatus {
    pub fn security_type(&self) -> StatusType {
        match self {
            Self::Complete => StatusType::Success,
            Self::Incomplete => StatusType::Warning,
            Self::Broken => StatusType::Error,
        }
    }
}

impl fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Complete => write!(f, "complete"),
            Self::Broken => write!(f, "broken"),
            Self::Incomplete => write!(f, "incomplete"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainBreak {
    pub level: usize,
    pub domain: String,
    pub reason: String,
}

/// Classification of a whole chain, root first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainAnalysis {
    pub presence: Vec<LevelPresence>,
    pub level_status: Vec<LevelStatus>,
    /// `None` for the root and for levels without a break
    pub level_breaks: Vec<Option<BreakReason>>,
    pub edges: Vec<EdgeStatus>,
    pub breaks: Vec<ChainBreak>,
    pub signed_levels: usize,
    pub status: ChainStatus,
    pub message: String,
}

impl ChainAnalysis {
    pub fn evaluate(zones: &[ZoneRecords]) -> Self {
        let presence: Vec<LevelPresence> = zones.iter().map(LevelPresence::of).collect();
        let domains: Vec<String> = zones.iter().map(|z| z.zone.to_string()).collect();
        Self::from_presence(&presence, &domains)
    }

    /// `domains[i]` names the level described by `presence[i]`.
    pub fn from_presence(presence: &[LevelPresence], domains: &[String]) -> Self {
        let level_status = presence.iter().map(classify_level).collect();

        let level_breaks: Vec<Option<BreakReason>> = presence
            .iter()
            .enumerate()
            .map(|(i, current)| {
                if i == 0 {
                    None
                } else {
                    detect_break(&presence[i - 1], current)
                }
            })
            .collect();

        let breaks: Vec<ChainBreak> = level_breaks
            .iter()
            .enumerate()
            .filter_map(|(i, reason)| {
                reason.map(|reason| ChainBreak {
                    level: i,
                    domain: domains.get(i).cloned().unwrap_or_default(),
                    reason: reason.to_string(),
                })
            })
            .collect();

        let edges = presence
            .windows(2)
            .map(|pair| edge_status(&pair[0], &pair[1]))
            .collect();

        let signed_levels = presence.iter().filter(|p| p.has_dnskey).count();
        let (status, message) = if !breaks.is_empty() {
            (
                ChainStatus::Broken,
                format!("Chain break detected at {} level(s)", breaks.len()),
            )
        } else if signed_levels < presence.len() {
            (ChainStatus::Incomplete, "Some levels unsigned".to_string())
        } else {
            (ChainStatus::Complete, "Full DNSSEC validation possible".to_string())
        };

        Self {
            presence: presence.to_vec(),
            level_status,
            level_breaks,
            edges,
            breaks,
            signed_levels,
            status,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(is_root: bool, has_ds: bool, has_dnskey: bool) -> LevelPresence {
        LevelPresence {
            is_root,
            has_ds,
            has_dnskey,
            has_nsec: false,
        }
    }

    #[test]
    fn test_level_classification_table() {
        let cases = [
            (level(true, false, true), SigningStatus::Signed, StatusType::Success),
            (level(true, false, false), SigningStatus::Unsigned, StatusType::Error),
            (level(false, true, true), SigningStatus::Signed, StatusType::Success),
            (level(false, false, true), SigningStatus::Partial, StatusType::Warning),
            (level(false, true, false), SigningStatus::Partial, StatusType::Warning),
            (level(false, false, false), SigningStatus::Unsigned, StatusType::Error),
        ];
        for (presence, status, status_type) in cases {
            let result = classify_level(&presence);
            assert_eq!(result.status, status, "{:?}", presence);
            assert_eq!(result.status_type, status_type, "{:?}", presence);
        }
    }

    #[test]
    fn test_nsec_only_changes_message() {
        let mut presence = level(false, false, true);
        let without = classify_level(&presence);
        presence.has_nsec = true;
        let with = classify_level(&presence);
        assert_eq!(with.status, without.status);
        assert_eq!(
            with.message,
            "Has DNSKEY but no DS record (unsigned delegation) (NSEC records present)"
        );
    }

    #[test]
    fn test_break_rules() {
        assert_eq!(
            detect_break(&level(false, false, true), &level(false, true, true)),
            Some(BreakReason::MissingParentDs)
        );
        assert_eq!(
            detect_break(&level(false, true, true), &level(false, true, false)),
            Some(BreakReason::MissingDnskey)
        );
        assert_eq!(detect_break(&level(false, true, true), &level(false, false, true)), None);
    }

    #[test]
    fn test_edge_rules() {
        assert_eq!(edge_status(&level(true, false, true), &level(false, true, true)), EdgeStatus::Valid);
        assert_eq!(edge_status(&level(false, true, true), &level(false, false, false)), EdgeStatus::Broken);
        assert_eq!(edge_status(&level(false, false, true), &level(false, true, true)), EdgeStatus::Unsigned);
    }

    #[test]
    fn test_chain_verdicts() {
        let domains = vec![".".to_string(), "com".to_string(), "example.com".to_string()];

        let complete = ChainAnalysis::from_presence(
            &[level(true, true, true), level(false, true, true), level(false, true, true)],
            &domains,
        );
        assert_eq!(complete.status, ChainStatus::Complete);
        assert_eq!(complete.message, "Full DNSSEC validation possible");
        assert_eq!(complete.status.security_type(), StatusType::Success);

        let broken = ChainAnalysis::from_presence(
            &[level(true, true, true), level(false, false, true), level(false, false, true)],
            &domains,
        );
        assert_eq!(broken.status, ChainStatus::Broken);
        assert_eq!(broken.message, "Chain break detected at 1 level(s)");
        assert_eq!(broken.breaks[0].level, 2);
        assert_eq!(broken.breaks[0].domain, "example.com");

        let incomplete = ChainAnalysis::from_presence(
            &[level(true, true, false), level(false, true, true), level(false, true, true)],
            &domains,
        );
        assert_eq!(incomplete.status, ChainStatus::Incomplete);
        assert_eq!(incomplete.signed_levels, 2);
        assert_eq!(incomplete.status.security_type(), StatusType::Warning);
    }

    #[test]
    fn test_evaluation_is_idempotent() {
        let presence = [level(true, false, true), level(false, true, false), level(false, false, false)];
        let domains = vec![".".to_string(), "org".to_string(), "example.org".to_string()];
        assert_eq!(
            ChainAnalysis::from_presence(&presence, &domains),
            ChainAnalysis::from_presence(&presence, &domains)
        );
    }
}
