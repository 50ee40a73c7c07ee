//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra` or `crate::application`.
//! All error types implement `thiserror::Error`; lifecycle failures are
//! folded into [`LifecycleError`] at the manager boundary.

use std::fmt;

use thiserror::Error;

use crate::domain::command::Verb;

// ── Command errors ────────────────────────────────────────────────────────────

/// Malformed command parameter string. Never changes agent state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    UnknownVerb(String),

    #[error("{verb} command is missing its {field}")]
    MissingField { verb: Verb, field: &'static str },

    #[error("{verb} command has unexpected trailing fields")]
    TrailingFields { verb: Verb },
}

// ── Load errors ───────────────────────────────────────────────────────────────

/// Step of the load → setHost → init → start sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    /// Reading the manifest embedded in the module container.
    Manifest,
    /// Creating the isolated loading context (unpacking the container).
    Context,
    /// Looking up the manifest's entry type.
    Resolve,
    /// Obtaining the probe instance from the entry type.
    Instantiate,
    SetHost,
    Init,
    Start,
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Manifest => "manifest",
            Self::Context => "context",
            Self::Resolve => "resolve",
            Self::Instantiate => "instantiate",
            Self::SetHost => "setHost",
            Self::Init => "init",
            Self::Start => "start",
        })
    }
}

/// Failure while bringing a verified module up.
#[derive(Debug, Error)]
#[error("{stage} failed: {source:#}")]
pub struct LoadError {
    pub stage: LoadStage,
    #[source]
    pub source: anyhow::Error,
}

impl LoadError {
    pub fn new(stage: LoadStage, source: impl Into<anyhow::Error>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

// ── Unload errors ─────────────────────────────────────────────────────────────

/// Step of the stop → uninit sequence that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnloadStage {
    Stop,
    Uninit,
}

impl fmt::Display for UnloadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stop => "stop",
            Self::Uninit => "uninit",
        })
    }
}

/// `stop`/`uninit` failure. The probe has been released regardless.
#[derive(Debug, Error)]
#[error("{stage} failed: {source:#}")]
pub struct UnloadError {
    pub stage: UnloadStage,
    #[source]
    pub source: anyhow::Error,
}

impl UnloadError {
    pub fn new(stage: UnloadStage, source: impl Into<anyhow::Error>) -> Self {
        Self {
            stage,
            source: source.into(),
        }
    }
}

// ── Lifecycle errors ──────────────────────────────────────────────────────────

/// Everything an attach/detach command can report back to its caller.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("parse parameter fail: {0}")]
    Parse(#[from] CommandError),

    #[error("{path} check fail: checksum mismatch or unreadable module")]
    Integrity { path: String },

    #[error("{path} loading fail: {source}")]
    Load {
        path: String,
        #[source]
        source: LoadError,
    },

    #[error("prober unload fail: {0}")]
    Unload(#[from] UnloadError),
}

impl LifecycleError {
    /// Short classification used in logs and by the operator CLI.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Parse(_) => "parse",
            Self::Integrity { .. } => "integrity",
            Self::Load { .. } => "load",
            Self::Unload(_) => "unload",
        }
    }
}
