//! Probe manifest embedded in every module container.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Path of the manifest inside the container archive.
pub const MANIFEST_FILE: &str = "probe-manifest.json";

/// Entry type names: a lowercase letter, then lowercase letters, digits,
/// `_`, `.` or `-`.
static ENTRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[a-z][a-z0-9_.-]*$").unwrap()
});

/// Metadata a module container carries about the probe inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeManifest {
    /// Human-readable probe name.
    #[serde(default)]
    pub name: String,
    /// Embedded probe version (semver).
    pub version: String,
    /// Entry type resolved inside the loading context.
    pub entry: String,
}

impl ProbeManifest {
    /// Parse and validate manifest JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a field is invalid.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let manifest: Self = serde_json::from_slice(bytes).context("parsing probe manifest")?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// # Errors
    ///
    /// Returns an error if `version` is not semver or `entry` is not a valid
    /// entry type name.
    pub fn validate(&self) -> Result<()> {
        semver::Version::parse(&self.version)
            .with_context(|| format!("invalid probe version '{}'", self.version))?;
        anyhow::ensure!(
            ENTRY_RE.is_match(&self.entry),
            "invalid entry type '{}': must match {}",
            self.entry,
            ENTRY_RE.as_str()
        );
        Ok(())
    }
}
