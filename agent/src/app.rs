//! Agent state object and command entry points.
//!
//! `Agent` owns everything the control plane needs for the life of the host
//! process: the lifecycle manager (and with it the single probe slot), the
//! status board, and the envelope serializer. The host constructs it once at
//! process start, routes every command string through [`Agent::handle`], and
//! calls [`Agent::teardown`] at process exit.

use std::sync::Arc;

use rasp_common::{AgentConfig, EnvelopeSerializer, StatusSnapshot, keys, status};
use tracing::{debug, info, warn};

use crate::application::ports::{HostHandle, ModuleSource, ProbeLoader, StatusRegistry};
use crate::application::services::{LifecycleManager, Transition};
use crate::domain::{LifecycleError, parse_command};
use crate::infra::{PackageLoader, PackageSource, ProbeCatalog, ProcessStatusRegistry};

/// How the agent was brought into the process. Affects logging only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    /// Loaded together with the host process.
    Startup,
    /// Injected into an already running process.
    LateAttach,
}

impl std::fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Startup => "startup",
            Self::LateAttach => "late-attach",
        })
    }
}

/// The injected control-plane state.
pub struct Agent<M = PackageSource, L = PackageLoader> {
    manager: LifecycleManager<M, L>,
    status: Arc<dyn StatusRegistry>,
    envelopes: Arc<EnvelopeSerializer>,
}

impl Agent {
    /// Build the production agent from `config`, resolving probe entry types
    /// through `catalog`.
    ///
    /// Status goes to a registry mirrored to `config.status_file` when set,
    /// otherwise to the process-wide registry. Envelopes go through the
    /// process-wide serializer.
    pub fn from_config(config: &AgentConfig, catalog: ProbeCatalog) -> Self {
        let status: Arc<dyn StatusRegistry> = match &config.status_file {
            Some(path) => Arc::new(ProcessStatusRegistry::with_mirror(path)),
            None => ProcessStatusRegistry::global(),
        };
        let envelopes = EnvelopeSerializer::global();
        envelopes.init(&config.runtime_version, None);

        let loader = PackageLoader::new(catalog).with_extract_root(config.extract_root.clone());
        Self::new(PackageSource, loader, status, envelopes)
    }
}

impl<M, L> Agent<M, L> {
    pub fn new(
        source: M,
        loader: L,
        status: Arc<dyn StatusRegistry>,
        envelopes: Arc<EnvelopeSerializer>,
    ) -> Self {
        Self {
            manager: LifecycleManager::new(source, loader, Arc::clone(&status)),
            status,
            envelopes,
        }
    }

    pub fn manager(&self) -> &LifecycleManager<M, L> {
        &self.manager
    }

    pub fn envelopes(&self) -> &Arc<EnvelopeSerializer> {
        &self.envelopes
    }

    pub fn status_snapshot(&self) -> StatusSnapshot {
        self.status.snapshot()
    }

    /// Stop and release a probe that is still active at process exit.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Unload`] if the probe did not stop cleanly;
    /// it has been released regardless.
    pub fn teardown(&self) -> Result<(), LifecycleError> {
        if !self.manager.is_active() {
            debug!("teardown with no active probe");
            return Ok(());
        }
        info!("tearing down active probe");
        let result = self.manager.detach();
        self.envelopes.clear_probe_version();
        result.map(|_| ())
    }

    fn mark_running(&self) {
        match self.status.read(keys::AGENT_MARKER) {
            Some(marker) if !marker.is_empty() => info!(marker = %marker, "agent running"),
            _ => self.status.publish(keys::AGENT_MARKER, status::AGENT_MARKER),
        }
    }
}

impl<M: ModuleSource, L: ProbeLoader> Agent<M, L> {
    /// Entry point when the agent is loaded with the host process.
    ///
    /// # Errors
    ///
    /// See [`Self::handle`].
    pub fn on_startup(&self, params: &str, host: &HostHandle) -> Result<Transition, LifecycleError> {
        self.dispatch(EntryPoint::Startup, params, host)
    }

    /// Entry point when the agent is injected into a running process.
    ///
    /// # Errors
    ///
    /// See [`Self::handle`].
    pub fn on_attach(&self, params: &str, host: &HostHandle) -> Result<Transition, LifecycleError> {
        self.dispatch(EntryPoint::LateAttach, params, host)
    }

    /// Parse and run one command string.
    ///
    /// A malformed command changes nothing, not even status. Every other
    /// outcome is already reflected in the status board when this returns.
    /// The agent marker is set by any command that parses and gets past the
    /// integrity check.
    ///
    /// # Errors
    ///
    /// Returns the [`LifecycleError`] describing why the command did not take
    /// effect. Never panics on behalf of a probe.
    pub fn handle(&self, params: &str, host: &HostHandle) -> Result<Transition, LifecycleError> {
        let command = match parse_command(params) {
            Ok(command) => command,
            Err(e) => {
                warn!(params, error = %e, "command rejected");
                return Err(e.into());
            }
        };
        debug!(verb = %command.verb(), "command parsed");

        let result = self.manager.execute(&command, host);
        match &result {
            Ok(Transition::Attached(identity)) => {
                self.envelopes.set_probe_version(&identity.version);
            }
            Ok(Transition::Detached(_)) | Err(LifecycleError::Unload(_)) => {
                self.envelopes.clear_probe_version();
            }
            Ok(Transition::NothingLoaded) | Err(_) => {}
        }
        if matches!(result, Err(LifecycleError::Load { .. })) && !self.manager.is_active() {
            self.envelopes.clear_probe_version();
        }

        // A rejected attach returns before the agent counts as running.
        if !matches!(result, Err(LifecycleError::Integrity { .. })) {
            self.mark_running();
        }
        result
    }

    fn dispatch(
        &self,
        entry: EntryPoint,
        params: &str,
        host: &HostHandle,
    ) -> Result<Transition, LifecycleError> {
        info!(entry = %entry, "agent invoked");
        self.handle(params, host)
    }
}
