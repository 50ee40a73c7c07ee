//! Full attach/detach cycles over real probe packages: checksum, manifest,
//! per-attach loading context, catalog resolution and status mirroring.

#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use rasp_agent::application::ports::{HostHandle, ProbeLifecycle, StatusRegistry};
use rasp_agent::domain::{LifecycleError, LoadStage, ProbeManifest};
use rasp_agent::infra::package::pack;
use rasp_agent::infra::{ModuleContext, PackageLoader, PackageSource, ProbeCatalog, ProcessStatusRegistry};
use rasp_agent::{Agent, Transition};
use rasp_common::{EnvelopeSerializer, ProbeIdentity};

/// What the host hands probes: somewhere to report hooks they installed.
#[derive(Default)]
struct HookTable {
    installed: Mutex<Vec<String>>,
}

/// Probe that installs one hook per rule file found in its resources.
struct RuleProbe {
    rules: Vec<String>,
    host: Option<HostHandle>,
}

impl RuleProbe {
    fn from_context(ctx: &ModuleContext<'_>) -> Result<Box<dyn ProbeLifecycle>> {
        let dir = ctx.resources_dir();
        let mut rules = Vec::new();
        if dir.is_dir() {
            for entry in std::fs::read_dir(&dir).context("listing resources")? {
                rules.push(entry?.file_name().to_string_lossy().into_owned());
            }
        }
        rules.sort();
        Ok(Box::new(Self { rules, host: None }))
    }

    fn table(&self) -> Result<&HookTable> {
        self.host
            .as_ref()
            .and_then(HostHandle::downcast_ref::<HookTable>)
            .context("no hook table")
    }
}

impl ProbeLifecycle for RuleProbe {
    fn set_host(&mut self, host: HostHandle) -> Result<()> {
        self.host = Some(host);
        Ok(())
    }
    fn init(&mut self) -> Result<()> {
        anyhow::ensure!(!self.rules.is_empty(), "no rules packaged");
        Ok(())
    }
    fn start(&mut self) -> Result<()> {
        let mut installed = self.table()?.installed.lock().expect("hooks");
        installed.extend(self.rules.iter().cloned());
        Ok(())
    }
    fn stop(&mut self) -> Result<()> {
        let rules = self.rules.clone();
        self.table()?
            .installed
            .lock()
            .expect("hooks")
            .retain(|r| !rules.contains(r));
        Ok(())
    }
    fn uninit(&mut self) -> Result<()> {
        self.host = None;
        Ok(())
    }
}

struct Fixture {
    agent: Agent,
    status: Arc<ProcessStatusRegistry>,
    hooks: Arc<HookTable>,
    work: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let work = tempfile::tempdir().expect("tempdir");
        let status = Arc::new(ProcessStatusRegistry::with_mirror(work.path().join("status.json")));
        let catalog = ProbeCatalog::new().with_entry("test.rules", RuleProbe::from_context);
        let loader = PackageLoader::new(catalog).with_extract_root(Some(work.path().join("contexts")));
        let registry: Arc<dyn StatusRegistry> = status.clone();
        let agent = Agent::new(
            PackageSource,
            loader,
            registry,
            Arc::new(EnvelopeSerializer::new(7)),
        );
        Self {
            agent,
            status,
            hooks: Arc::new(HookTable::default()),
            work,
        }
    }

    fn host(&self) -> HostHandle {
        HostHandle::from_arc(self.hooks.clone())
    }

    /// Pack a probe whose resources hold one file per rule.
    fn package(&self, name: &str, version: &str, entry: &str, rules: &[&str]) -> (PathBuf, String) {
        let resources = self.work.path().join(format!("{name}-resources"));
        std::fs::create_dir_all(&resources).expect("resources dir");
        for rule in rules {
            std::fs::write(resources.join(rule), b"{}").expect("rule file");
        }
        let out = self.work.path().join(format!("{name}.pkg"));
        let manifest = ProbeManifest {
            name: name.into(),
            version: version.into(),
            entry: entry.into(),
        };
        let checksum = pack(&manifest, Some(&resources), &out).expect("pack");
        (out, checksum)
    }

    fn handle(&self, params: &str) -> Result<Transition, LifecycleError> {
        self.agent.handle(params, &self.host())
    }

    fn hooks(&self) -> Vec<String> {
        self.hooks.installed.lock().expect("hooks").clone()
    }

    fn contexts(&self) -> usize {
        std::fs::read_dir(self.work.path().join("contexts"))
            .map(|d| d.count())
            .unwrap_or(0)
    }

    fn mirrored(&self) -> rasp_common::StatusSnapshot {
        rasp_agent::infra::status::read_snapshot(&self.work.path().join("status.json"))
            .expect("mirror")
    }
}

fn attach_cmd(checksum: &str, path: &Path) -> String {
    format!("attach;{checksum};{}", path.display())
}

#[test]
fn attach_runs_packaged_probe_and_detach_removes_it() {
    let fx = Fixture::new();
    let (pkg, sum) = fx.package("smith", "1.2.0", "test.rules", &["exec.json", "file.json"]);

    let outcome = fx.handle(&attach_cmd(&sum, &pkg)).expect("attach");

    assert_eq!(outcome, Transition::Attached(ProbeIdentity::new("1.2.0", &sum)));
    assert_eq!(fx.hooks(), ["exec.json", "file.json"]);
    assert_eq!(fx.contexts(), 1);
    let mirrored = fx.mirrored();
    assert_eq!(mirrored.active_identity, format!("1.2.0-{sum}"));
    assert_eq!(mirrored.transition_status, "attach");
    assert_eq!(mirrored.agent_marker, "rasp-agent");

    fx.handle("detach").expect("detach");

    assert!(fx.hooks().is_empty());
    assert_eq!(fx.contexts(), 0, "loading context must be removed on detach");
    assert_eq!(fx.mirrored().active_identity, "");
    assert_eq!(fx.mirrored().transition_status, "detach");
}

#[test]
fn tampered_package_is_refused() {
    let fx = Fixture::new();
    let (pkg, sum) = fx.package("smith", "1.2.0", "test.rules", &["exec.json"]);
    let mut bytes = std::fs::read(&pkg).expect("read");
    bytes.push(0);
    std::fs::write(&pkg, bytes).expect("write");

    let err = fx.handle(&attach_cmd(&sum, &pkg)).unwrap_err();

    assert!(matches!(err, LifecycleError::Integrity { .. }));
    assert!(fx.hooks().is_empty());
    assert_eq!(fx.contexts(), 0);
    assert_eq!(
        fx.status.snapshot().transition_status,
        format!("{} check fail!", pkg.display())
    );
}

#[test]
fn replacing_a_probe_swaps_hooks_and_contexts() {
    let fx = Fixture::new();
    let (a, sum_a) = fx.package("a", "1.0.0", "test.rules", &["a.json"]);
    let (b, sum_b) = fx.package("b", "2.0.0", "test.rules", &["b.json"]);

    fx.handle(&attach_cmd(&sum_a, &a)).expect("attach a");
    fx.handle(&attach_cmd(&sum_b, &b)).expect("attach b");

    assert_eq!(fx.hooks(), ["b.json"]);
    assert_eq!(fx.contexts(), 1);
    assert_eq!(fx.status.snapshot().active_identity, format!("2.0.0-{sum_b}"));
    assert_eq!(fx.agent.envelopes().probe_version(), "2.0.0");
}

#[test]
fn unregistered_entry_type_is_a_resolve_failure() {
    let fx = Fixture::new();
    let (pkg, sum) = fx.package("other", "1.0.0", "other.probe", &["x.json"]);

    let err = fx.handle(&attach_cmd(&sum, &pkg)).unwrap_err();

    let LifecycleError::Load { source, .. } = err else {
        panic!("expected load error, got {err:?}");
    };
    assert_eq!(source.stage, LoadStage::Resolve);
    assert_eq!(fx.contexts(), 0, "failed load must not leave its context behind");
    assert_eq!(
        fx.mirrored().transition_status,
        format!("{} loading fail!", pkg.display())
    );
}

#[test]
fn probe_refusing_init_leaves_nothing_installed() {
    let fx = Fixture::new();
    let (pkg, sum) = fx.package("empty", "1.0.0", "test.rules", &[]);

    let err = fx.handle(&attach_cmd(&sum, &pkg)).unwrap_err();

    assert!(matches!(err, LifecycleError::Load { ref source, .. } if source.stage == LoadStage::Init));
    assert!(!fx.agent.manager().is_active());
    assert_eq!(fx.contexts(), 0);
}

#[test]
fn teardown_at_exit_unloads_the_probe() {
    let fx = Fixture::new();
    let (pkg, sum) = fx.package("smith", "1.2.0", "test.rules", &["exec.json"]);
    fx.handle(&attach_cmd(&sum, &pkg)).expect("attach");

    fx.agent.teardown().expect("teardown");

    assert!(fx.hooks().is_empty());
    assert_eq!(fx.contexts(), 0);
    assert_eq!(fx.mirrored().transition_status, "detach");
}
