use serde::Deserialize;
use std::path::PathBuf;

/// Environment variable prefix for [`AgentConfig`] fields.
pub const ENV_PREFIX: &str = "RASP_AGENT_";

/// Agent configuration.
///
/// Each field maps to `RASP_AGENT_<FIELD>`:
///   - `RASP_AGENT_RUNTIME_VERSION` (default `""`)
///   - `RASP_AGENT_STATUS_FILE`     (optional, status mirror path)
///   - `RASP_AGENT_EXTRACT_ROOT`    (optional, parent dir for loading contexts)
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AgentConfig {
    /// Host runtime version stamped onto event envelopes.
    #[serde(default)]
    pub runtime_version: String,

    /// When set, every status write is mirrored to this JSON file.
    #[serde(default)]
    pub status_file: Option<PathBuf>,

    /// Parent directory for per-attach loading contexts. Defaults to the
    /// system temp dir.
    #[serde(default)]
    pub extract_root: Option<PathBuf>,
}
