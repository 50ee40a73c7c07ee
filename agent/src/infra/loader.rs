//! Isolated module loader: implements the `ProbeLoader` port.
//!
//! Every load gets a private directory the container is unpacked into and a
//! fresh probe instance obtained from the entry type the manifest names.
//! Nothing is shared between loads, so state from a previous probe cannot
//! leak into the next one.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::application::ports::{LoaderContext, ProbeLifecycle, ProbeLoader};
use crate::application::services::guard::call_guarded;
use crate::domain::{LoadError, LoadStage, ProbeManifest};
use crate::infra::package::{self, RESOURCES_DIR};

/// What an entry type sees of the context it is being instantiated in.
#[derive(Debug, Clone, Copy)]
pub struct ModuleContext<'a> {
    root: &'a Path,
    module_path: &'a Path,
    manifest: &'a ProbeManifest,
}

impl<'a> ModuleContext<'a> {
    /// Private directory holding the unpacked container.
    pub fn root(&self) -> &'a Path {
        self.root
    }

    /// The probe's own files, as packed under `resources/`.
    pub fn resources_dir(&self) -> PathBuf {
        self.root.join(RESOURCES_DIR)
    }

    /// Container the context was created from.
    pub fn module_path(&self) -> &'a Path {
        self.module_path
    }

    pub fn manifest(&self) -> &'a ProbeManifest {
        self.manifest
    }
}

/// Accessor that hands out the probe instance for one loading context.
pub type EntryFactory =
    dyn Fn(&ModuleContext<'_>) -> Result<Box<dyn ProbeLifecycle>> + Send + Sync;

/// Entry types the host can resolve, keyed by the name a manifest's `entry`
/// field uses.
#[derive(Clone, Default)]
pub struct ProbeCatalog {
    entries: BTreeMap<String, Arc<EntryFactory>>,
}

impl ProbeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `entry`, replacing any previous registration.
    pub fn register<F>(&mut self, entry: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&ModuleContext<'_>) -> Result<Box<dyn ProbeLifecycle>> + Send + Sync + 'static,
    {
        self.entries.insert(entry.into(), Arc::new(factory));
        self
    }

    /// Builder form of [`Self::register`].
    #[must_use]
    pub fn with_entry<F>(mut self, entry: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&ModuleContext<'_>) -> Result<Box<dyn ProbeLifecycle>> + Send + Sync + 'static,
    {
        self.register(entry, factory);
        self
    }

    pub fn resolve(&self, entry: &str) -> Option<Arc<EntryFactory>> {
        self.entries.get(entry).cloned()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains_key(entry)
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl fmt::Debug for ProbeCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

/// Production `ProbeLoader`: unpacks probe packages into per-load temp dirs.
#[derive(Debug, Clone)]
pub struct PackageLoader {
    catalog: ProbeCatalog,
    extract_root: Option<PathBuf>,
}

impl PackageLoader {
    pub fn new(catalog: ProbeCatalog) -> Self {
        Self {
            catalog,
            extract_root: None,
        }
    }

    /// Create loading contexts under `root` instead of the system temp dir.
    #[must_use]
    pub fn with_extract_root(mut self, root: Option<PathBuf>) -> Self {
        self.extract_root = root;
        self
    }

    fn context_dir(&self) -> Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("rasp-probe-");
        match &self.extract_root {
            Some(root) => {
                std::fs::create_dir_all(root)
                    .with_context(|| format!("creating {}", root.display()))?;
                builder
                    .tempdir_in(root)
                    .with_context(|| format!("creating loading context under {}", root.display()))
            }
            None => builder.tempdir().context("creating loading context"),
        }
    }
}

impl ProbeLoader for PackageLoader {
    fn load(
        &self,
        module_path: &Path,
        expected_checksum: &str,
    ) -> Result<LoaderContext, LoadError> {
        let dir = self
            .context_dir()
            .map_err(|e| LoadError::new(LoadStage::Context, e))?;
        package::unpack_verified(module_path, expected_checksum, dir.path())
            .map_err(|e| LoadError::new(LoadStage::Context, e))?;
        let manifest = package::read_unpacked_manifest(dir.path())
            .map_err(|e| LoadError::new(LoadStage::Manifest, e))?;

        let factory = self.catalog.resolve(&manifest.entry).ok_or_else(|| {
            LoadError::new(
                LoadStage::Resolve,
                anyhow::anyhow!("entry type '{}' is not registered", manifest.entry),
            )
        })?;

        let module = ModuleContext {
            root: dir.path(),
            module_path,
            manifest: &manifest,
        };
        let probe = call_guarded(|| factory(&module))
            .map_err(|e| LoadError::new(LoadStage::Instantiate, e))?;

        debug!(
            path = %module_path.display(),
            context = %dir.path().display(),
            entry = %manifest.entry,
            "probe instantiated in fresh context"
        );
        Ok(LoaderContext::new(module_path, manifest, probe).with_resources(Box::new(dir)))
    }
}
