//! Tests touching the process-wide status registry and envelope serializer.
//!
//! These singletons are shared by every test in this binary, so each test
//! here runs serially and restores what it changed.

#![allow(clippy::expect_used)]

use rasp_agent::application::ports::StatusRegistry;
use rasp_agent::infra::{ProbeCatalog, ProcessStatusRegistry};
use rasp_agent::{Agent, Transition};
use rasp_common::{AgentConfig, EnvelopeSerializer, keys};
use serial_test::serial;

use crate::mocks::host;

#[test]
#[serial]
fn production_agent_reports_through_global_registry() {
    let agent = Agent::from_config(&AgentConfig::default(), ProbeCatalog::new());

    assert_eq!(
        agent.handle("detach", &host()).expect("detach"),
        Transition::NothingLoaded
    );
    assert_eq!(
        ProcessStatusRegistry::global()
            .read(keys::AGENT_MARKER)
            .as_deref(),
        Some("rasp-agent")
    );
}

#[test]
#[serial]
fn from_config_stamps_runtime_version_on_global_envelopes() {
    let config = AgentConfig {
        runtime_version: "17.0.9".into(),
        ..AgentConfig::default()
    };
    let _agent = Agent::from_config(&config, ProbeCatalog::new());

    let global = EnvelopeSerializer::global();
    assert_eq!(global.runtime_version(), "17.0.9");
    assert_eq!(global.pid(), std::process::id());
    global.reset();
}

#[test]
#[serial]
fn configured_status_file_gets_a_private_mirrored_registry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("status.json");
    let config = AgentConfig {
        status_file: Some(path.clone()),
        ..AgentConfig::default()
    };
    let agent = Agent::from_config(&config, ProbeCatalog::new());

    agent
        .handle("attach;zzz;/nonexistent/x.pkg", &host())
        .expect_err("nothing to verify");

    let mirrored = rasp_agent::infra::status::read_snapshot(&path).expect("mirror");
    assert_eq!(mirrored.transition_status, "/nonexistent/x.pkg check fail!");
    assert_eq!(mirrored, agent.status_snapshot());
    EnvelopeSerializer::global().reset();
}
