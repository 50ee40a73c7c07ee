//! `envelope`: wrap a JSON payload the way the agent wraps probe events.

use anyhow::{Context, Result};
use clap::Args;
use rasp_common::EnvelopeSerializer;

use crate::infra::config::load_config;

#[derive(Args)]
pub struct EnvelopeArgs {
    /// Event type written to `message_type`
    pub message_type: String,

    /// Event payload as JSON
    pub payload: String,

    /// Probe version to stamp (default: none)
    #[arg(long = "probe-version")]
    pub probe_version: Option<String>,

    /// Runtime version to stamp (default: `RASP_AGENT_RUNTIME_VERSION`)
    #[arg(long = "runtime-version")]
    pub runtime_version: Option<String>,

    /// Emission time as RFC 3339 (default: now)
    #[arg(long, value_parser = parse_time)]
    pub time: Option<i64>,
}

fn parse_time(s: &str) -> Result<i64, String> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|t| t.timestamp())
        .map_err(|e| format!("invalid RFC 3339 time '{s}': {e}"))
}

/// Run the envelope command. Prints one JSON envelope on stdout.
///
/// # Errors
///
/// Returns an error if the payload is not JSON or the config cannot be read.
pub fn run(args: &EnvelopeArgs) -> Result<()> {
    let payload: serde_json::Value =
        serde_json::from_str(&args.payload).context("payload is not valid JSON")?;
    let runtime_version = match &args.runtime_version {
        Some(v) => v.clone(),
        None => load_config()?.runtime_version,
    };

    let serializer = EnvelopeSerializer::new(std::process::id());
    serializer.init(&runtime_version, args.probe_version.as_deref());
    let envelope = match args.time {
        Some(time) => serializer.wrap_at(&args.message_type, payload, time),
        None => serializer.wrap(&args.message_type, payload),
    };
    println!("{}", envelope.to_json().context("serializing envelope")?);
    Ok(())
}
