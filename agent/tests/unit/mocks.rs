//! Shared mock infrastructure for unit tests.
//!
//! `mockall` mocks for the module ports, where call expectations matter, plus
//! a hand-written probe that records its lifecycle calls.

#![allow(clippy::expect_used, dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use rasp_agent::application::ports::{
    HostHandle, IntegrityVerifier, LoaderContext, ModuleInspector, ProbeLifecycle, ProbeLoader,
};
use rasp_agent::domain::{LoadError, ProbeManifest};

mockall::mock! {
    pub Source {}

    impl IntegrityVerifier for Source {
        fn verify(&self, module_path: &Path, expected_checksum: &str) -> bool;
    }

    impl ModuleInspector for Source {
        fn read_manifest(&self, module_path: &Path) -> Result<ProbeManifest>;
    }
}

mockall::mock! {
    pub Loader {}

    impl ProbeLoader for Loader {
        fn load(&self, module_path: &Path, expected_checksum: &str) -> Result<LoaderContext, LoadError>;
    }
}

// ── Probe ─────────────────────────────────────────────────────────────────────

pub type Journal = Arc<Mutex<Vec<&'static str>>>;

/// Probe that appends every lifecycle call to a shared journal.
pub struct JournalProbe {
    journal: Journal,
    fail_start: bool,
}

impl JournalProbe {
    pub fn boxed(journal: &Journal) -> Box<dyn ProbeLifecycle> {
        Box::new(Self {
            journal: Arc::clone(journal),
            fail_start: false,
        })
    }

    pub fn failing_start(journal: &Journal) -> Box<dyn ProbeLifecycle> {
        Box::new(Self {
            journal: Arc::clone(journal),
            fail_start: true,
        })
    }

    fn record(&self, call: &'static str) {
        self.journal.lock().expect("journal lock").push(call);
    }
}

impl ProbeLifecycle for JournalProbe {
    fn set_host(&mut self, _host: HostHandle) -> Result<()> {
        self.record("set_host");
        Ok(())
    }
    fn init(&mut self) -> Result<()> {
        self.record("init");
        Ok(())
    }
    fn start(&mut self) -> Result<()> {
        self.record("start");
        anyhow::ensure!(!self.fail_start, "start refused");
        Ok(())
    }
    fn stop(&mut self) -> Result<()> {
        self.record("stop");
        Ok(())
    }
    fn uninit(&mut self) -> Result<()> {
        self.record("uninit");
        Ok(())
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

pub fn manifest(version: &str) -> ProbeManifest {
    ProbeManifest {
        name: "test-probe".into(),
        version: version.into(),
        entry: "test.probe".into(),
    }
}

pub fn context(path: &Path, version: &str, probe: Box<dyn ProbeLifecycle>) -> LoaderContext {
    LoaderContext::new(path, manifest(version), probe)
}

/// Source that trusts `checksum` for any path and reports `version`.
pub fn trusting_source(checksum: &'static str, version: &'static str) -> MockSource {
    let mut source = MockSource::new();
    source
        .expect_verify()
        .returning(move |_, c| c == checksum);
    source
        .expect_read_manifest()
        .returning(move |_| Ok(manifest(version)));
    source
}

/// Loader handing out journaling probes.
pub fn journaling_loader(journal: &Journal, version: &'static str) -> MockLoader {
    let journal = Arc::clone(journal);
    let mut loader = MockLoader::new();
    loader
        .expect_load()
        .returning(move |path, _| Ok(context(path, version, JournalProbe::boxed(&journal))));
    loader
}

pub fn host() -> HostHandle {
    HostHandle::new("test-host")
}
