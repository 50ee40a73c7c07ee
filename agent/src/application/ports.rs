//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `rasp_common`, never from
//! `crate::infra` or `crate::commands`.

use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use rasp_common::{StatusSnapshot, keys};

use crate::domain::{LoadError, ProbeManifest};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Opaque handle to the host's instrumentation capability.
///
/// The agent passes it through to the probe via
/// [`ProbeLifecycle::set_host`] and never looks inside. Probes recover the
/// concrete capability with [`HostHandle::downcast_ref`].
#[derive(Clone)]
pub struct HostHandle(Arc<dyn Any + Send + Sync>);

impl HostHandle {
    pub fn new<T: Any + Send + Sync>(capability: T) -> Self {
        Self(Arc::new(capability))
    }

    pub fn from_arc(capability: Arc<dyn Any + Send + Sync>) -> Self {
        Self(capability)
    }

    /// Borrow the capability as `T`, if that is what the host supplied.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HostHandle(..)")
    }
}

/// An isolated loading context: one module path, one probe instance.
///
/// Owned exclusively by the lifecycle manager's probe slot. Dropping it drops
/// the probe first and then any resources backing the context (for a package
/// loader, the private directory the container was unpacked into).
pub struct LoaderContext {
    probe: Box<dyn ProbeLifecycle>,
    module_path: PathBuf,
    manifest: ProbeManifest,
    resources: Option<Box<dyn Any + Send>>,
}

impl LoaderContext {
    pub fn new(
        module_path: impl Into<PathBuf>,
        manifest: ProbeManifest,
        probe: Box<dyn ProbeLifecycle>,
    ) -> Self {
        Self {
            probe,
            module_path: module_path.into(),
            manifest,
            resources: None,
        }
    }

    /// Attach resources that must live exactly as long as the probe.
    #[must_use]
    pub fn with_resources(mut self, resources: Box<dyn Any + Send>) -> Self {
        self.resources = Some(resources);
        self
    }

    pub fn probe_mut(&mut self) -> &mut dyn ProbeLifecycle {
        self.probe.as_mut()
    }

    pub fn module_path(&self) -> &Path {
        &self.module_path
    }

    pub fn manifest(&self) -> &ProbeManifest {
        &self.manifest
    }
}

impl fmt::Debug for LoaderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderContext")
            .field("module_path", &self.module_path)
            .field("manifest", &self.manifest)
            .field("has_resources", &self.resources.is_some())
            .finish_non_exhaustive()
    }
}

// ── Probe Port ────────────────────────────────────────────────────────────────

/// Lifecycle capabilities every probe exposes.
///
/// The agent drives a probe exclusively through this surface:
/// `set_host` → `init` → `start` on attach, `stop` → `uninit` on detach.
/// Calls are synchronous and run on the caller's thread while the agent's
/// lifecycle lock is held.
pub trait ProbeLifecycle: Send {
    /// Hand the probe the host's instrumentation capability.
    fn set_host(&mut self, host: HostHandle) -> Result<()>;
    fn init(&mut self) -> Result<()>;
    fn start(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn uninit(&mut self) -> Result<()>;
}

// ── Module Ports ──────────────────────────────────────────────────────────────

/// Integrity gate run before any loading attempt.
pub trait IntegrityVerifier: Send + Sync {
    /// `true` only when the module's checksum equals `expected_checksum`
    /// exactly and the container is well formed. Never errors: unreadable or
    /// malformed modules are simply not trusted.
    fn verify(&self, module_path: &Path, expected_checksum: &str) -> bool;
}

/// Reads module metadata without loading the module.
pub trait ModuleInspector: Send + Sync {
    /// Read the manifest embedded in the container at `module_path`.
    fn read_manifest(&self, module_path: &Path) -> Result<ProbeManifest>;
}

/// Composite trait: anything that can both verify and inspect modules.
pub trait ModuleSource: IntegrityVerifier + ModuleInspector {}

/// Blanket implementation: any verifier that is also an inspector is a `ModuleSource`.
impl<T> ModuleSource for T where T: IntegrityVerifier + ModuleInspector {}

/// Creates a fresh isolated context per call and instantiates the probe in it.
pub trait ProbeLoader: Send + Sync {
    /// Load the module at `module_path` into a new context.
    ///
    /// `expected_checksum` is the checksum the module was verified against;
    /// a loader that reads the module again must refuse bytes that no longer
    /// match it.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] naming the failing stage. Nothing from a failed
    /// load survives the call.
    fn load(
        &self,
        module_path: &Path,
        expected_checksum: &str,
    ) -> Result<LoaderContext, LoadError>;
}

// ── Status Port ───────────────────────────────────────────────────────────────

/// Process-wide key/value bulletin board read by external monitors.
///
/// Last write wins; no history. Reads are not serialized with writes.
pub trait StatusRegistry: Send + Sync {
    fn publish(&self, key: &str, value: &str);

    /// `None` when the key has never been written.
    fn read(&self, key: &str) -> Option<String>;

    /// Copy of every key the agent writes; unset keys read as `""`.
    fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            active_identity: self.read(keys::ACTIVE_IDENTITY).unwrap_or_default(),
            transition_status: self.read(keys::TRANSITION_STATUS).unwrap_or_default(),
            agent_marker: self.read(keys::AGENT_MARKER).unwrap_or_default(),
        }
    }
}

impl<T: StatusRegistry + ?Sized> StatusRegistry for Arc<T> {
    fn publish(&self, key: &str, value: &str) {
        (**self).publish(key, value);
    }

    fn read(&self, key: &str) -> Option<String> {
        (**self).read(key)
    }
}
