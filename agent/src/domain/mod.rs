//! Domain layer: command parsing, manifest schema, and the error taxonomy.
//!
//! This module has zero imports from `crate::infra` or `crate::application`.
//! All functions are synchronous and take data in, returning data out.

pub mod command;
pub mod error;
pub mod manifest;

pub use command::{Command, Verb, parse_command};
pub use error::{
    CommandError, LifecycleError, LoadError, LoadStage, UnloadError, UnloadStage,
};
pub use manifest::{MANIFEST_FILE, ProbeManifest};
