//! Key role classification from DNSKEY flags.
//!
//! Roles are inferred from the SEP bit and the size of the zone's key set.
//! Nothing here inspects signatures, so a role is a convention, not proof.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyRole {
    #[serde(rename = "KSK")]
    Ksk,
    #[serde(rename = "ZSK")]
    Zsk,
}

/// Role shown for a key. `Combined` is a lone SEP key assumed to sign both
/// the key set and the zone data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimaryRole {
    #[serde(rename = "KSK")]
    Ksk,
    #[serde(rename = "ZSK")]
    Zsk,
    #[serde(rename = "ZSK/KSK")]
    Combined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleConfidence {
    /// SEP bit read from a key set with several keys
    High,
    /// Single-key heuristic
    Medium,
    /// Not observed; taken from the fallback table
    Assumed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub primary: PrimaryRole,
    pub roles: Vec<KeyRole>,
    pub is_sep: bool,
    pub confidence: RoleConfidence,
}

impl RoleAssignment {
    pub fn is_ksk(&self) -> bool {
        self.roles.contains(&KeyRole::Ksk)
    }

    pub fn is_zsk(&self) -> bool {
        self.roles.contains(&KeyRole::Zsk)
    }
}

impl fmt::Display for PrimaryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ksk => write!(f, "KSK"),
            Self::Zsk => write!(f, "ZSK"),
            Self::Combined => write!(f, "ZSK/KSK"),
        }
    }
}

/// Classify one key given its SEP bit and the number of keys in its zone.
pub fn classify_key(is_sep: bool, zone_key_count: usize) -> RoleAssignment {
    if zone_key_count == 1 {
        let (primary, roles) = if is_sep {
            (PrimaryRole::Combined, vec![KeyRole::Zsk, KeyRole::Ksk])
        } else {
            (PrimaryRole::Zsk, vec![KeyRole::Zsk])
        };
        return RoleAssignment {
            primary,
            roles,
            is_sep,
            confidence: RoleConfidence::Medium,
        };
    }

    let (primary, role) = if is_sep {
        (PrimaryRole::Ksk, KeyRole::Ksk)
    } else {
        (PrimaryRole::Zsk, KeyRole::Zsk)
    };
    RoleAssignment {
        primary,
        roles: vec![role],
        is_sep,
        confidence: RoleConfidence::High,
    }
}

/// Classify a zone's whole key set, preserving order.
pub fn classify_zone_keys(sep_flags: &[bool]) -> Vec<RoleAssignment> {
    sep_flags
        .iter()
        .map(|&is_sep| classify_key(is_sep, sep_flags.len()))
        .collect()
}
