//! Agent configuration from `RASP_AGENT_*` environment variables.

use anyhow::{Context, Result};
use rasp_common::{AgentConfig, ENV_PREFIX};

/// Load [`AgentConfig`] from the process environment.
///
/// Unset variables fall back to their defaults.
///
/// # Errors
///
/// Returns an error if a variable is set but cannot be parsed.
pub fn load_config() -> Result<AgentConfig> {
    envy::prefixed(ENV_PREFIX)
        .from_env()
        .with_context(|| format!("failed to load config from {ENV_PREFIX}* env vars"))
}

/// Like [`load_config`] but over an explicit set of variables.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed.
pub fn load_config_from<I>(vars: I) -> Result<AgentConfig>
where
    I: IntoIterator<Item = (String, String)>,
{
    envy::prefixed(ENV_PREFIX)
        .from_iter(vars)
        .with_context(|| format!("failed to load config from {ENV_PREFIX}* vars"))
}
