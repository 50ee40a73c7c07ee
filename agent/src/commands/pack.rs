//! `pack`: build a probe package from a manifest and a resources directory.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use crate::domain::ProbeManifest;
use crate::infra::package;
use crate::output::{OutputContext, json};

#[derive(Args)]
pub struct PackArgs {
    /// Where to write the package
    pub output: PathBuf,

    /// Probe version embedded in the manifest (semver)
    #[arg(long = "probe-version")]
    pub probe_version: String,

    /// Entry type the host resolves to instantiate the probe
    #[arg(long)]
    pub entry: String,

    /// Human-readable probe name
    #[arg(long, default_value = "")]
    pub name: String,

    /// Directory packed under `resources/`
    #[arg(long)]
    pub resources: Option<PathBuf>,
}

#[derive(Serialize)]
struct PackOutput<'a> {
    path: String,
    checksum: &'a str,
    version: &'a str,
    entry: &'a str,
}

/// Run the pack command.
///
/// # Errors
///
/// Returns an error if the manifest fields are invalid or the package cannot
/// be written.
pub fn run(ctx: &OutputContext, args: &PackArgs, as_json: bool) -> Result<()> {
    let manifest = ProbeManifest {
        name: args.name.clone(),
        version: args.probe_version.clone(),
        entry: args.entry.clone(),
    };
    let checksum = package::pack(&manifest, args.resources.as_deref(), &args.output)?;

    if as_json {
        return json::print(&PackOutput {
            path: args.output.display().to_string(),
            checksum: &checksum,
            version: &manifest.version,
            entry: &manifest.entry,
        });
    }
    ctx.success(&format!("packed {}", args.output.display()));
    ctx.kv("checksum", &checksum);
    ctx.kv("attach  ", &format!("attach;{checksum};{}", args.output.display()));
    Ok(())
}
