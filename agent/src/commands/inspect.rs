//! `inspect`: show a package's manifest and checksum without loading it.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use rasp_common::ProbeIdentity;
use serde::Serialize;

use crate::infra::fs::sha256_file;
use crate::infra::package::read_container_manifest;
use crate::output::{OutputContext, json};

#[derive(Args)]
pub struct InspectArgs {
    /// Probe package to inspect
    pub path: PathBuf,
}

#[derive(Serialize)]
struct InspectOutput {
    path: String,
    name: String,
    version: String,
    entry: String,
    checksum: String,
    identity: String,
}

/// Run the inspect command.
///
/// # Errors
///
/// Returns an error if the package cannot be read or its manifest is invalid.
pub fn run(ctx: &OutputContext, args: &InspectArgs, as_json: bool) -> Result<()> {
    let manifest = read_container_manifest(&args.path)?;
    let checksum = sha256_file(&args.path)?;
    let identity = ProbeIdentity::new(&manifest.version, &checksum).to_string();

    if as_json {
        return json::print(&InspectOutput {
            path: args.path.display().to_string(),
            name: manifest.name,
            version: manifest.version,
            entry: manifest.entry,
            checksum,
            identity,
        });
    }
    ctx.header(&args.path.display().to_string());
    if !manifest.name.is_empty() {
        ctx.kv("name    ", &manifest.name);
    }
    ctx.kv("version ", &manifest.version);
    ctx.kv("entry   ", &manifest.entry);
    ctx.kv("checksum", &checksum);
    ctx.kv("identity", &identity);
    Ok(())
}
