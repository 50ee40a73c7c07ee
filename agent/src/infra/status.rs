//! Infrastructure implementation of the `StatusRegistry` port.
//!
//! The bulletin board lives in process memory. When a mirror file is
//! configured, every write also rewrites a JSON snapshot of the board so a
//! monitor in another process can read it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use anyhow::{Context, Result};
use rasp_common::{StatusSnapshot, keys};
use tracing::warn;

use crate::application::ports::StatusRegistry;

static GLOBAL: LazyLock<Arc<ProcessStatusRegistry>> =
    LazyLock::new(|| Arc::new(ProcessStatusRegistry::new()));

/// Process-wide key/value board. Last write wins.
#[derive(Debug, Default)]
pub struct ProcessStatusRegistry {
    values: RwLock<BTreeMap<String, String>>,
    mirror: Option<PathBuf>,
}

impl ProcessStatusRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that also mirrors every write to `path`.
    pub fn with_mirror(path: impl Into<PathBuf>) -> Self {
        Self {
            values: RwLock::default(),
            mirror: Some(path.into()),
        }
    }

    /// The registry shared by everything in this process that has no mirror
    /// configured.
    pub fn global() -> Arc<ProcessStatusRegistry> {
        Arc::clone(&GLOBAL)
    }

    fn write_mirror(&self, path: &Path, values: &BTreeMap<String, String>) {
        if let Err(e) = write_snapshot(path, &snapshot_of(values)) {
            warn!(path = %path.display(), error = %format!("{e:#}"), "status mirror not updated");
        }
    }
}

impl StatusRegistry for ProcessStatusRegistry {
    fn publish(&self, key: &str, value: &str) {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_string(), value.to_string());
        // Written under the lock so mirror writes land in publish order.
        if let Some(path) = &self.mirror {
            self.write_mirror(path, &values);
        }
    }

    fn read(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

fn snapshot_of(values: &BTreeMap<String, String>) -> StatusSnapshot {
    let get = |key: &str| values.get(key).cloned().unwrap_or_default();
    StatusSnapshot {
        active_identity: get(keys::ACTIVE_IDENTITY),
        transition_status: get(keys::TRANSITION_STATUS),
        agent_marker: get(keys::AGENT_MARKER),
    }
}

/// Atomically replace `path` with `snapshot` as JSON.
///
/// # Errors
///
/// Returns an error if the temp file cannot be written or renamed.
pub fn write_snapshot(path: &Path, snapshot: &StatusSnapshot) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let json = serde_json::to_vec_pretty(snapshot).context("serializing status snapshot")?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    std::io::Write::write_all(&mut tmp, &json).context("writing status snapshot")?;
    tmp.persist(path)
        .with_context(|| format!("renaming status snapshot to {}", path.display()))?;
    Ok(())
}

/// Read a snapshot written by a mirrored registry.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a snapshot.
pub fn read_snapshot(path: &Path) -> Result<StatusSnapshot> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))
}
