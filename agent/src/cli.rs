//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::output::OutputContext;

/// Operator tooling for the RASP agent's probe packages
#[derive(Parser)]
#[command(
    name = "rasp-agent",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a probe package and print its checksum
    Pack(commands::pack::PackArgs),

    /// Show a package's manifest, checksum and identity
    Inspect(commands::inspect::InspectArgs),

    /// Check a package against an expected checksum
    Verify(commands::verify::VerifyArgs),

    /// Wrap a JSON payload in an event envelope
    Envelope(commands::envelope::EnvelopeArgs),

    /// Show the status board mirrored by a running agent
    Status(commands::status::StatusArgs),
}

impl Command {
    /// Stable code reported in the `--json` error object.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Pack(_) => "PACK_FAILED",
            Self::Inspect(_) => "INSPECT_FAILED",
            Self::Verify(_) => "VERIFY_FAILED",
            Self::Envelope(_) => "ENVELOPE_FAILED",
            Self::Status(_) => "STATUS_FAILED",
        }
    }
}

impl Cli {
    /// Execute the CLI command and report any failure.
    ///
    /// With `--json` a failure is printed to stdout as a JSON error object,
    /// otherwise to stderr.
    ///
    /// # Errors
    ///
    /// Returns the command's error after it has been reported.
    pub fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            command,
        } = self;
        let ctx = OutputContext::new(no_color, quiet);
        let code = command.error_code();
        let result = match command {
            Command::Pack(args) => commands::pack::run(&ctx, &args, json),
            Command::Inspect(args) => commands::inspect::run(&ctx, &args, json),
            Command::Verify(args) => commands::verify::run(&ctx, &args, json),
            Command::Envelope(args) => commands::envelope::run(&args),
            Command::Status(args) => commands::status::run(&ctx, &args, json),
        };
        if let Err(e) = &result {
            let message = format!("{e:#}");
            match json.then(|| crate::output::json::format_error(&message, code)) {
                Some(Ok(obj)) => println!("{obj}"),
                _ => ctx.error(&format!("Error: {message}")),
            }
        }
        result
    }
}
