//! `verify`: run the integrity gate against a package.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use crate::application::ports::IntegrityVerifier;
use crate::infra::PackageSource;
use crate::output::{OutputContext, json};

#[derive(Args)]
pub struct VerifyArgs {
    /// Probe package to check
    pub path: PathBuf,

    /// Expected lowercase SHA-256 of the package
    pub checksum: String,
}

/// Run the verify command.
///
/// # Errors
///
/// Returns an error when the package does not pass verification.
pub fn run(ctx: &OutputContext, args: &VerifyArgs, as_json: bool) -> Result<()> {
    let verified = PackageSource.verify(&args.path, &args.checksum);
    let path = args.path.display().to_string();

    if !verified {
        anyhow::bail!("{path} check fail!");
    }
    if as_json {
        json::print(&serde_json::json!({ "path": path, "verified": true }))?;
    } else {
        ctx.success(&format!("{path} verified"));
    }
    Ok(())
}
