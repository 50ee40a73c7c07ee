//! Module containers ("probe packages"): gzip-compressed tar archives carrying
//! a `probe-manifest.json` at the top level and the probe's resources under
//! `resources/`.
//!
//! Implements the `IntegrityVerifier` and `ModuleInspector` ports.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use tracing::debug;

use crate::application::ports::{IntegrityVerifier, ModuleInspector};
use crate::domain::{MANIFEST_FILE, ProbeManifest};
use crate::infra::fs::{sha256_file, sha256_reader};

/// Directory inside a container holding the probe's own files.
pub const RESOURCES_DIR: &str = "resources";

/// Manifests larger than this are rejected without being read.
const MAX_MANIFEST_BYTES: u64 = 64 * 1024;

/// Production implementation of `IntegrityVerifier` + `ModuleInspector` over
/// probe packages on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct PackageSource;

impl IntegrityVerifier for PackageSource {
    fn verify(&self, module_path: &Path, expected_checksum: &str) -> bool {
        let actual = match sha256_file(module_path) {
            Ok(actual) => actual,
            Err(e) => {
                debug!(path = %module_path.display(), error = %format!("{e:#}"), "module unreadable");
                return false;
            }
        };
        if actual != expected_checksum {
            debug!(path = %module_path.display(), expected = expected_checksum, actual = %actual, "checksum mismatch");
            return false;
        }
        match read_container_manifest(module_path) {
            Ok(_) => true,
            Err(e) => {
                debug!(path = %module_path.display(), error = %format!("{e:#}"), "malformed module container");
                false
            }
        }
    }
}

impl ModuleInspector for PackageSource {
    fn read_manifest(&self, module_path: &Path) -> Result<ProbeManifest> {
        read_container_manifest(module_path)
    }
}

fn open_archive(path: &Path) -> Result<tar::Archive<GzDecoder<File>>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(tar::Archive::new(GzDecoder::new(file)))
}

fn is_manifest_entry(path: &Path) -> bool {
    let normalized: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    normalized == Path::new(MANIFEST_FILE)
}

/// Read the manifest of the container at `path`.
///
/// Streams the archive only until the manifest entry is found; nothing is
/// written to disk.
///
/// # Errors
///
/// Returns an error if the file is not a gzip'd tar, has no manifest, or the
/// manifest is invalid.
pub fn read_container_manifest(path: &Path) -> Result<ProbeManifest> {
    let mut archive = open_archive(path)?;
    for entry in archive
        .entries()
        .with_context(|| format!("reading module container {}", path.display()))?
    {
        let mut entry = entry.context("reading container entry")?;
        if !is_manifest_entry(&entry.path().context("reading entry path")?) {
            continue;
        }
        anyhow::ensure!(
            entry.size() <= MAX_MANIFEST_BYTES,
            "{MANIFEST_FILE} exceeds {MAX_MANIFEST_BYTES} bytes"
        );
        let mut bytes = Vec::new();
        entry
            .read_to_end(&mut bytes)
            .with_context(|| format!("reading {MANIFEST_FILE}"))?;
        return ProbeManifest::from_slice(&bytes);
    }
    anyhow::bail!("{} has no {MANIFEST_FILE}", path.display())
}

/// Unpack the container at `path` into `dest`, provided its bytes still hash
/// to `expected_checksum`.
///
/// The file is opened once; the checksum and the unpack both read that same
/// handle, so a file replaced at `path` after the check is never unpacked.
/// Entries that would land outside `dest` are refused by the tar reader.
///
/// # Errors
///
/// Returns an error if the container cannot be read, no longer matches
/// `expected_checksum`, or cannot be unpacked.
pub fn unpack_verified(path: &Path, expected_checksum: &str, dest: &Path) -> Result<()> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let actual =
        sha256_reader(&mut file).with_context(|| format!("reading {}", path.display()))?;
    anyhow::ensure!(
        actual == expected_checksum,
        "{} changed since verification (checksum {actual})",
        path.display()
    );
    file.seek(SeekFrom::Start(0))
        .with_context(|| format!("rewinding {}", path.display()))?;
    tar::Archive::new(GzDecoder::new(file))
        .unpack(dest)
        .with_context(|| format!("unpacking {} into {}", path.display(), dest.display()))
}

/// Read the manifest of a container already unpacked into `root`.
///
/// # Errors
///
/// Returns an error if the manifest is missing or invalid.
pub fn read_unpacked_manifest(root: &Path) -> Result<ProbeManifest> {
    let manifest_path = root.join(MANIFEST_FILE);
    let bytes = std::fs::read(&manifest_path)
        .with_context(|| format!("reading {}", manifest_path.display()))?;
    ProbeManifest::from_slice(&bytes)
}

/// Build a container at `out` from `manifest` and, optionally, the files under
/// `resources`. Returns the container's checksum.
///
/// Entry metadata is normalized so the same inputs produce the same checksum.
///
/// # Errors
///
/// Returns an error if the manifest is invalid or any file cannot be read or
/// written.
pub fn pack(manifest: &ProbeManifest, resources: Option<&Path>, out: &Path) -> Result<String> {
    manifest.validate()?;
    if let Some(dir) = resources {
        anyhow::ensure!(dir.is_dir(), "{} is not a directory", dir.display());
    }

    let file = File::create(out).with_context(|| format!("creating {}", out.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.mode(tar::HeaderMode::Deterministic);

    let json = serde_json::to_vec_pretty(manifest).context("serializing probe manifest")?;
    let mut header = tar::Header::new_gnu();
    header.set_size(json.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_cksum();
    builder
        .append_data(&mut header, MANIFEST_FILE, json.as_slice())
        .context("writing probe manifest")?;

    if let Some(dir) = resources {
        builder
            .append_dir_all(RESOURCES_DIR, dir)
            .with_context(|| format!("adding resources from {}", dir.display()))?;
    }

    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .with_context(|| format!("finishing {}", out.display()))?;

    sha256_file(out)
}
