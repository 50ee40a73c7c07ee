//! Agent command parsing.
//!
//! Commands arrive as a single opaque parameter string:
//!
//! ```text
//! attach;<checksum>;<module_path>
//! detach
//! ```
//!
//! Parsing is pure and never touches agent state.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::error::CommandError;

/// Field separator inside a command string.
pub const FIELD_SEPARATOR: char = ';';

/// The two supported lifecycle directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Attach,
    Detach,
}

impl Verb {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Attach => "attach",
            Self::Detach => "detach",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "attach" => Ok(Self::Attach),
            "detach" => Ok(Self::Detach),
            other => Err(CommandError::UnknownVerb(other.to_string())),
        }
    }
}

/// A parsed directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Verify, then load and start the probe at `module_path`.
    Attach {
        checksum: String,
        module_path: PathBuf,
    },
    /// Stop and release the active probe.
    Detach,
}

impl Command {
    pub fn verb(&self) -> Verb {
        match self {
            Self::Attach { .. } => Verb::Attach,
            Self::Detach => Verb::Detach,
        }
    }

    pub fn checksum(&self) -> Option<&str> {
        match self {
            Self::Attach { checksum, .. } => Some(checksum),
            Self::Detach => None,
        }
    }

    pub fn module_path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Attach { module_path, .. } => Some(module_path),
            Self::Detach => None,
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_command(s)
    }
}

/// Parse a raw command parameter string.
///
/// # Errors
///
/// Returns [`CommandError`] for empty input, an unknown verb, or an `attach`
/// missing its checksum or module path.
pub fn parse_command(params: &str) -> Result<Command, CommandError> {
    let params = params.trim();
    if params.is_empty() {
        return Err(CommandError::Empty);
    }

    let mut fields = params.split(FIELD_SEPARATOR);
    let verb: Verb = fields.next().unwrap_or_default().parse()?;

    match verb {
        Verb::Detach => Ok(Command::Detach),
        Verb::Attach => {
            let checksum = required_field(fields.next(), verb, "checksum")?;
            let module_path = required_field(fields.next(), verb, "module path")?;
            if fields.next().is_some() {
                return Err(CommandError::TrailingFields { verb });
            }
            Ok(Command::Attach {
                checksum: checksum.to_string(),
                module_path: PathBuf::from(module_path),
            })
        }
    }
}

fn required_field<'a>(
    field: Option<&'a str>,
    verb: Verb,
    name: &'static str,
) -> Result<&'a str, CommandError> {
    match field {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(CommandError::MissingField { verb, field: name }),
    }
}
