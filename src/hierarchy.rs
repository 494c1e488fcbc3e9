//! Zone names and the root-to-target decomposition of a domain.

use crate::error::HierarchyError;
use serde::{Deserialize, Serialize};
use std::fmt;

const MAX_LABEL_OCTETS: usize = 63;
const MAX_NAME_OCTETS: usize = 253;

/// A lower-case domain name without the trailing dot. The root zone is `"."`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneName(String);

impl ZoneName {
    pub fn root() -> Self {
        ZoneName(".".to_string())
    }

    /// Normalize and validate a user-supplied name.
    pub fn parse(input: &str) -> Result<Self, HierarchyError> {
        let name = normalize(input);
        if name == "." {
            return Ok(Self::root());
        }

        if let Some(c) = name.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(HierarchyError::InvalidCharacter(c));
        }
        let mut labels = Vec::new();
        for label in name.split('.') {
            if label.is_empty() {
                return Err(HierarchyError::EmptyLabel(name.clone()));
            }
            let label = to_a_label(label)?;
            if label.len() > MAX_LABEL_OCTETS {
                return Err(HierarchyError::LabelTooLong(label));
            }
            labels.push(label);
        }
        let name = labels.join(".");
        if name.len() > MAX_NAME_OCTETS {
            return Err(HierarchyError::NameTooLong(name.len()));
        }

        Ok(ZoneName(name))
    }

    pub fn is_root(&self) -> bool {
        self.0 == "."
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `ROOT` for the root zone, the name itself otherwise.
    pub fn display_name(&self) -> &str {
        if self.is_root() { "ROOT" } else { &self.0 }
    }

    pub fn label_count(&self) -> usize {
        if self.is_root() {
            0
        } else {
            self.0.split('.').count()
        }
    }

    /// Immediate parent zone, `None` for the root.
    pub fn parent(&self) -> Option<ZoneName> {
        if self.is_root() {
            return None;
        }
        match self.0.split_once('.') {
            Some((_, rest)) => Some(ZoneName(rest.to_string())),
            None => Some(Self::root()),
        }
    }

    /// Name to put on the wire in a query.
    pub fn query_name(&self) -> String {
        if self.is_root() {
            ".".to_string()
        } else {
            format!("{}.", self.0)
        }
    }

    /// `label.<zone>`; used for the NXDOMAIN probe.
    pub fn child(&self, label: &str) -> String {
        if self.is_root() {
            format!("{}.", label)
        } else {
            format!("{}.{}.", label, self.0)
        }
    }
}

impl fmt::Display for ZoneName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-case, trim, and drop the trailing dot. Empty input becomes `"."`.
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim().to_lowercase();
    let stripped = trimmed.strip_suffix('.').unwrap_or(&trimmed);
    if stripped.is_empty() {
        ".".to_string()
    } else {
        stripped.to_string()
    }
}

/// ASCII labels pass through; anything else becomes its `xn--` A-label.
fn to_a_label(label: &str) -> Result<String, HierarchyError> {
    if label.is_ascii() {
        return Ok(label.to_string());
    }
    idna::domain_to_ascii(label).map_err(|_| HierarchyError::InvalidIdn(label.to_string()))
}

/// Zones from the root down to `name`, each exactly once.
pub fn decompose(name: &ZoneName) -> Vec<ZoneName> {
    let mut zones = vec![name.clone()];
    let mut current = name.clone();
    while let Some(parent) = current.parent() {
        zones.push(parent.clone());
        current = parent;
    }
    zones.reverse();
    zones
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(zones: &[ZoneName]) -> Vec<&str> {
        zones.iter().map(ZoneName::as_str).collect()
    }

    #[test]
    fn test_decompose_two_labels() {
        let zone = ZoneName::parse("example.com").unwrap();
        assert_eq!(names(&decompose(&zone)), vec![".", "com", "example.com"]);
    }

    #[test]
    fn test_decompose_root() {
        assert_eq!(names(&decompose(&ZoneName::root())), vec!["."]);
        assert_eq!(names(&decompose(&ZoneName::parse(".").unwrap())), vec!["."]);
    }

    #[test]
    fn test_decompose_deep_name() {
        let zone = ZoneName::parse("a.b.example.co.uk").unwrap();
        let zones = decompose(&zone);
        assert_eq!(
            names(&zones),
            vec![".", "uk", "co.uk", "example.co.uk", "b.example.co.uk", "a.b.example.co.uk"]
        );
        for pair in zones.windows(2) {
            assert_eq!(pair[1].parent().as_ref(), Some(&pair[0]));
            assert_eq!(pair[1].label_count(), pair[0].label_count() + 1);
        }
    }

    #[test]
    fn test_normalization() {
        let zone = ZoneName::parse("  Example.COM. ").unwrap();
        assert_eq!(zone.as_str(), "example.com");
        assert_eq!(zone.query_name(), "example.com.");
        assert_eq!(zone.child("nonexistent"), "nonexistent.example.com.");
        assert_eq!(ZoneName::root().child("nonexistent"), "nonexistent.");
        assert_eq!(ZoneName::root().display_name(), "ROOT");
    }

    #[test]
    fn test_unicode_labels_become_a_labels() {
        let zone = ZoneName::parse("WWW.Bücher.DE.").unwrap();
        assert_eq!(zone.as_str(), "www.xn--bcher-kva.de");
        assert_eq!(ZoneName::parse("xn--bcher-kva.de").unwrap().as_str(), "xn--bcher-kva.de");
        assert_eq!(
            names(&decompose(&zone)),
            vec![".", "de", "xn--bcher-kva.de", "www.xn--bcher-kva.de"]
        );
    }

    #[test]
    fn test_invalid_names() {
        assert!(matches!(
            ZoneName::parse("foo..com"),
            Err(HierarchyError::EmptyLabel(_))
        ));
        assert!(matches!(
            ZoneName::parse(".com"),
            Err(HierarchyError::EmptyLabel(_))
        ));
        assert!(matches!(
            ZoneName::parse("exa mple.com"),
            Err(HierarchyError::InvalidCharacter(' '))
        ));
        let long_label = format!("{}.com", "a".repeat(64));
        assert!(matches!(
            ZoneName::parse(&long_label),
            Err(HierarchyError::LabelTooLong(_))
        ));
        let long_name = vec!["abcdefghi"; 26].join(".");
        assert!(matches!(
            ZoneName::parse(&long_name),
            Err(HierarchyError::NameTooLong(259))
        ));
    }
}
