//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: checksumming, container
//! reading and unpacking, per-attach loading contexts, the status board and
//! its mirror file, and environment configuration.
//!
//! Imports from `crate::domain` and `crate::application` are allowed.
//! Imports from `crate::app`, `crate::commands` or `crate::output` are forbidden.

pub mod config;
pub mod fs;
pub mod loader;
pub mod package;
pub mod status;

pub use loader::{EntryFactory, ModuleContext, PackageLoader, ProbeCatalog};
pub use package::PackageSource;
pub use status::ProcessStatusRegistry;
