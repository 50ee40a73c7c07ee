//! `status`: read the status board mirrored by a running agent.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::infra::config::load_config;
use crate::infra::status::read_snapshot;
use crate::output::{OutputContext, json};

#[derive(Args)]
pub struct StatusArgs {
    /// Mirror file to read (default: `RASP_AGENT_STATUS_FILE`)
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// Run the status command.
///
/// # Errors
///
/// Returns an error if no mirror file is known or it cannot be read.
pub fn run(ctx: &OutputContext, args: &StatusArgs, as_json: bool) -> Result<()> {
    let path = match &args.file {
        Some(path) => path.clone(),
        None => load_config()?.status_file.ok_or_else(|| {
            anyhow::anyhow!("no status file: pass --file or set RASP_AGENT_STATUS_FILE")
        })?,
    };
    let snapshot = read_snapshot(&path)?;

    if as_json {
        return json::print(&snapshot);
    }
    let or_dash = |s: &str| if s.is_empty() { "-".to_string() } else { s.to_string() };
    ctx.kv("probe ", &or_dash(&snapshot.active_identity));
    ctx.kv("status", &or_dash(&snapshot.transition_status));
    ctx.kv("agent ", &or_dash(&snapshot.agent_marker));
    if snapshot.active_identity.is_empty() {
        ctx.warn("no probe attached");
    }
    Ok(())
}
