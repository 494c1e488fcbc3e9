//! Root DNSKEY fallback table, embedded or loaded from a TOML file.

use super::constants::SEP_FLAG;
use super::roles::PrimaryRole;
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info};

const EMBEDDED_ROOT_KEYS: &str = include_str!("../../data/root_fallback_keys.toml");

/// One entry of the root fallback key table
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FallbackKey {
    pub flags: u16,
    #[serde(default = "default_protocol")]
    pub protocol: u8,
    pub algorithm: u8,
    pub key_tag: u16,
    pub key_size: u32,
    pub role: PrimaryRole,
}

fn default_protocol() -> u8 {
    3
}

impl FallbackKey {
    pub fn is_sep(&self) -> bool {
        self.flags & SEP_FLAG != 0
    }
}

/// Versioned table of root keys substituted when no root DNSKEY could be
/// retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RootKeyTable {
    pub version: u32,
    #[serde(default)]
    pub published: Option<String>,
    pub keys: Vec<FallbackKey>,
}

impl RootKeyTable {
    /// Table compiled into the binary
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml_str(EMBEDDED_ROOT_KEYS)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let table: RootKeyTable =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        if table.keys.is_empty() {
            return Err(ConfigError::ParseError(
                "root key table contains no keys".to_string(),
            ));
        }
        Ok(table)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::RootKeyFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let table = Self::from_toml_str(&contents).map_err(|e| ConfigError::RootKeyFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        info!(
            "Loaded root fallback keys v{} from {} ({} keys)",
            table.version,
            path.display(),
            table.keys.len()
        );
        Ok(table)
    }

    /// Load from `path` when given, otherwise use the embedded table.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let table = Self::embedded()?;
                debug!("Using embedded root fallback keys v{}", table.version);
                Ok(table)
            }
        }
    }
}
