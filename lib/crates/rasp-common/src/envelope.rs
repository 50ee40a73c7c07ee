//! Event envelopes: agent identity metadata wrapped around every security
//! event before it leaves the process.
//!
//! The identity fields (pid, runtime version, probe version) are cached in an
//! [`EnvelopeSerializer`]; [`EnvelopeSerializer::global`] is the process-wide
//! instance probes emit through. Wrapping never fails: an unset version is
//! emitted as `""` so consumers always see the same envelope shape.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Constant `runtime` field naming the host runtime.
pub const RUNTIME_NAME: &str = "host-runtime";

/// A domain event tagged with agent identity. Built only by
/// [`EnvelopeSerializer::wrap`] and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    #[serde(rename = "message_type")]
    event_type: String,
    #[serde(rename = "data")]
    payload: T,
    pid: u32,
    runtime: String,
    runtime_version: String,
    probe_version: String,
    time: i64,
}

impl<T> EventEnvelope<T> {
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &T {
        &self.payload
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    pub fn runtime_version(&self) -> &str {
        &self.runtime_version
    }

    pub fn probe_version(&self) -> &str {
        &self.probe_version
    }

    /// Emission time in epoch seconds.
    pub fn time(&self) -> i64 {
        self.time
    }
}

impl<T: Serialize> EventEnvelope<T> {
    /// Serialize to the wire JSON handed to the transport.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Default)]
struct CachedIdentity {
    runtime_version: String,
    probe_version: String,
}

/// Cache of the identity fields stamped onto every envelope.
#[derive(Debug)]
pub struct EnvelopeSerializer {
    pid: u32,
    identity: RwLock<CachedIdentity>,
    last_time: AtomicI64,
}

static GLOBAL: LazyLock<Arc<EnvelopeSerializer>> =
    LazyLock::new(|| Arc::new(EnvelopeSerializer::new(std::process::id())));

impl EnvelopeSerializer {
    /// A serializer for `pid` with both versions unset.
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            identity: RwLock::new(CachedIdentity::default()),
            last_time: AtomicI64::new(i64::MIN),
        }
    }

    /// The process-wide serializer, keyed to the current process id.
    pub fn global() -> Arc<EnvelopeSerializer> {
        Arc::clone(&GLOBAL)
    }

    /// Cache the host runtime version and, if known, the probe version.
    pub fn init(&self, runtime_version: &str, probe_version: Option<&str>) {
        let mut identity = self.identity.write().unwrap_or_else(PoisonError::into_inner);
        identity.runtime_version = runtime_version.to_string();
        identity.probe_version = probe_version.unwrap_or_default().to_string();
    }

    pub fn set_probe_version(&self, probe_version: &str) {
        self.identity
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .probe_version = probe_version.to_string();
    }

    pub fn clear_probe_version(&self) {
        self.identity
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .probe_version
            .clear();
    }

    /// Forget both cached versions. The pid is kept.
    pub fn reset(&self) {
        *self.identity.write().unwrap_or_else(PoisonError::into_inner) =
            CachedIdentity::default();
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn probe_version(&self) -> String {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .probe_version
            .clone()
    }

    pub fn runtime_version(&self) -> String {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .runtime_version
            .clone()
    }

    /// Wrap `payload` stamped with the current wall-clock second.
    pub fn wrap<T>(&self, event_type: &str, payload: T) -> EventEnvelope<T> {
        self.wrap_at(event_type, payload, Utc::now().timestamp())
    }

    /// Wrap `payload` stamped with `now` (epoch seconds).
    ///
    /// The stamped time never goes below one already handed out by this
    /// serializer, so a clock stepping backwards cannot reorder events.
    pub fn wrap_at<T>(&self, event_type: &str, payload: T, now: i64) -> EventEnvelope<T> {
        let previous = self.last_time.fetch_max(now, Ordering::SeqCst);
        let time = previous.max(now);

        let identity = self.identity.read().unwrap_or_else(PoisonError::into_inner);
        EventEnvelope {
            event_type: event_type.to_string(),
            payload,
            pid: self.pid,
            runtime: RUNTIME_NAME.to_string(),
            runtime_version: identity.runtime_version.clone(),
            probe_version: identity.probe_version.clone(),
            time,
        }
    }
}
