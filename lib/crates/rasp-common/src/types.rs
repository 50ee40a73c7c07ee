use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::status_keys::identity_value;

/// Identity of a loaded probe: embedded version plus the verified checksum.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProbeIdentity {
    pub version: String,
    pub checksum: String,
}

impl ProbeIdentity {
    pub fn new(version: impl Into<String>, checksum: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            checksum: checksum.into(),
        }
    }
}

impl fmt::Display for ProbeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&identity_value(&self.version, &self.checksum))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityParseError {
    #[error("identity is empty")]
    Empty,
    #[error("identity '{0}' has no '-' separator")]
    MissingSeparator(String),
}

impl FromStr for ProbeIdentity {
    type Err = IdentityParseError;

    /// Parses `"<version>-<checksum>"`. The checksum is hex and never holds a
    /// `-`, so the split happens at the last separator; semver pre-release
    /// suffixes stay in the version.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(IdentityParseError::Empty);
        }
        let (version, checksum) = s
            .rsplit_once('-')
            .ok_or_else(|| IdentityParseError::MissingSeparator(s.to_string()))?;
        Ok(Self::new(version, checksum))
    }
}

/// Point-in-time copy of the status bulletin board.
///
/// Serialized with the registry key names so a mirror file reads the same as
/// the in-process registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    #[serde(default)]
    pub active_identity: String,
    #[serde(default)]
    pub transition_status: String,
    #[serde(default)]
    pub agent_marker: String,
}

impl StatusSnapshot {
    /// Parsed identity of the active probe, `None` when nothing is loaded.
    pub fn active_probe(&self) -> Option<ProbeIdentity> {
        self.active_identity.parse().ok()
    }
}
