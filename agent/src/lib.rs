//! RASP agent control plane: verified probe attach/detach with status
//! publication, plus operator tooling for probe packages.

#![cfg_attr(test, allow(clippy::expect_used))]

pub mod app;
pub mod application;
pub mod cli;
pub mod commands;
pub mod domain;
pub mod infra;
pub mod logging;
pub mod output;

pub use app::{Agent, EntryPoint};
pub use application::ports::{HostHandle, ProbeLifecycle};
pub use application::services::Transition;
pub use infra::{ModuleContext, ProbeCatalog};
