//! Probe lifecycle manager: the attach/detach state machine.
//!
//! Holds at most one active probe. Every transition runs start to finish
//! under a single lock, and the status registry is updated as the last step
//! inside that same critical section, so a concurrent caller or monitor never
//! observes a half-finished transition.
//!
//! Imports only from `crate::domain` and `crate::application`.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rasp_common::{ProbeIdentity, keys, status};
use tracing::{debug, info, warn};

use crate::application::ports::{
    HostHandle, LoaderContext, ModuleSource, ProbeLoader, StatusRegistry,
};
use crate::application::services::guard::call_guarded;
use crate::domain::{
    Command, LifecycleError, LoadError, LoadStage, UnloadError, UnloadStage,
};

/// Result of a command that changed (or deliberately did not change) state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A probe is now active. Any previously active probe was replaced.
    Attached(ProbeIdentity),
    /// The active probe was stopped and released.
    Detached(ProbeIdentity),
    /// `detach` with nothing loaded: no state or status change.
    NothingLoaded,
}

struct ActiveProbe {
    context: LoaderContext,
    identity: ProbeIdentity,
}

enum ProbeSlot {
    Empty,
    Active(ActiveProbe),
}

/// Owns the probe slot and serializes every transition on it.
pub struct LifecycleManager<M, L> {
    source: M,
    loader: L,
    status: Arc<dyn StatusRegistry>,
    slot: Mutex<ProbeSlot>,
}

impl<M, L> LifecycleManager<M, L> {
    pub fn new(source: M, loader: L, status: Arc<dyn StatusRegistry>) -> Self {
        Self {
            source,
            loader,
            status,
            slot: Mutex::new(ProbeSlot::Empty),
        }
    }

    /// Stop and release the active probe. A no-op when nothing is loaded.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Unload`] if `stop` or `uninit` failed. The
    /// probe is released and the slot cleared regardless.
    pub fn detach(&self) -> Result<Transition, LifecycleError> {
        let mut slot = self.lock_slot();

        let ProbeSlot::Active(active) = std::mem::replace(&mut *slot, ProbeSlot::Empty) else {
            warn!("no probe loaded, detach ignored");
            return Ok(Transition::NothingLoaded);
        };

        let identity = active.identity.clone();
        let result = release(active);
        self.status.publish(keys::ACTIVE_IDENTITY, "");
        match result {
            Ok(()) => {
                self.status.publish(keys::TRANSITION_STATUS, status::DETACH);
                info!(identity = %identity, "probe detached");
                Ok(Transition::Detached(identity))
            }
            Err(e) => {
                self.status
                    .publish(keys::TRANSITION_STATUS, status::UNLOAD_FAIL);
                warn!(identity = %identity, error = %e, "probe unload failed, references released");
                Err(e.into())
            }
        }
    }

    /// Identity of the active probe, if any.
    pub fn active_identity(&self) -> Option<ProbeIdentity> {
        match &*self.lock_slot() {
            ProbeSlot::Active(active) => Some(active.identity.clone()),
            ProbeSlot::Empty => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_identity().is_some()
    }

    fn lock_slot(&self) -> MutexGuard<'_, ProbeSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<M: ModuleSource, L: ProbeLoader> LifecycleManager<M, L> {
    /// Run a parsed command.
    ///
    /// # Errors
    ///
    /// See [`Self::attach`] and [`Self::detach`].
    pub fn execute(
        &self,
        command: &Command,
        host: &HostHandle,
    ) -> Result<Transition, LifecycleError> {
        match command {
            Command::Attach {
                checksum,
                module_path,
            } => self.attach(module_path, checksum, host),
            Command::Detach => self.detach(),
        }
    }

    /// Verify, replace any active probe, then load and start the new one.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::Integrity`] if verification fails; the active
    ///   probe (if any) is untouched.
    /// - [`LifecycleError::Load`] if the manifest cannot be read (active probe
    ///   untouched) or the new probe cannot be brought up (the previous probe
    ///   has already been released by then).
    pub fn attach(
        &self,
        module_path: &Path,
        checksum: &str,
        host: &HostHandle,
    ) -> Result<Transition, LifecycleError> {
        let mut slot = self.lock_slot();
        let path = module_path.display().to_string();

        if !self.source.verify(module_path, checksum) {
            warn!(path = %path, checksum, "probe integrity check failed");
            self.status
                .publish(keys::TRANSITION_STATUS, &status::check_failed(&path));
            return Err(LifecycleError::Integrity { path });
        }

        let manifest = match self.source.read_manifest(module_path) {
            Ok(manifest) => manifest,
            Err(e) => return Err(self.load_failed(path, LoadError::new(LoadStage::Manifest, e))),
        };
        info!(path = %path, version = %manifest.version, entry = %manifest.entry, "probe verified");

        if let ProbeSlot::Active(previous) = std::mem::replace(&mut *slot, ProbeSlot::Empty) {
            info!(identity = %previous.identity, "replacing active probe");
            let result = release(previous);
            self.status.publish(keys::ACTIVE_IDENTITY, "");
            match result {
                Ok(()) => self.status.publish(keys::TRANSITION_STATUS, status::DETACH),
                Err(e) => {
                    // Best-effort replace: keep going with the new probe.
                    warn!(error = %e, "previous probe did not unload cleanly");
                    self.status
                        .publish(keys::TRANSITION_STATUS, status::UNLOAD_FAIL);
                }
            }
        }

        let context = match self.bring_up(module_path, checksum, host) {
            Ok(context) => context,
            Err(e) => return Err(self.load_failed(path, e)),
        };

        let identity = ProbeIdentity::new(manifest.version, checksum);
        *slot = ProbeSlot::Active(ActiveProbe {
            context,
            identity: identity.clone(),
        });
        self.status
            .publish(keys::ACTIVE_IDENTITY, &identity.to_string());
        self.status.publish(keys::TRANSITION_STATUS, status::ATTACH);
        info!(identity = %identity, "probe attached");
        Ok(Transition::Attached(identity))
    }

    fn load_failed(&self, path: String, source: LoadError) -> LifecycleError {
        warn!(path = %path, stage = %source.stage, error = %source, "probe loading failed");
        self.status
            .publish(keys::TRANSITION_STATUS, &status::loading_failed(&path));
        LifecycleError::Load { path, source }
    }

    /// load → setHost → init → start. On failure the context is dropped here.
    fn bring_up(
        &self,
        module_path: &Path,
        checksum: &str,
        host: &HostHandle,
    ) -> Result<LoaderContext, LoadError> {
        let mut context = self.loader.load(module_path, checksum)?;
        let probe = context.probe_mut();

        call_guarded(|| probe.set_host(host.clone()))
            .map_err(|e| LoadError::new(LoadStage::SetHost, e))?;
        call_guarded(|| probe.init()).map_err(|e| LoadError::new(LoadStage::Init, e))?;

        if let Err(e) = call_guarded(|| probe.start()) {
            // Initialized but not running: undo what we can before discarding.
            if let Err(stop_err) = call_guarded(|| probe.stop()) {
                debug!(error = %stop_err, "rollback stop failed");
            }
            if let Err(uninit_err) = call_guarded(|| probe.uninit()) {
                debug!(error = %uninit_err, "rollback uninit failed");
            }
            return Err(LoadError::new(LoadStage::Start, e));
        }

        Ok(context)
    }
}

/// stop → uninit, then drop the context. A failed `stop` skips `uninit`.
fn release(mut active: ActiveProbe) -> Result<(), UnloadError> {
    debug!(
        identity = %active.identity,
        path = %active.context.module_path().display(),
        "releasing probe context"
    );
    let probe = active.context.probe_mut();
    let result = call_guarded(|| probe.stop())
        .map_err(|e| UnloadError::new(UnloadStage::Stop, e))
        .and_then(|()| {
            call_guarded(|| probe.uninit()).map_err(|e| UnloadError::new(UnloadStage::Uninit, e))
        });
    drop(active);
    result
}
