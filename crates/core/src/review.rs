//! Reviewing references and failed artifacts on disk
//!
//! Failed candidates land in `<artifacts>/<source stem>/<reference file name>`
//! next to any attachments named `<test>.<identifier>.<attachment>`.
//! Pairing them back with references lets a reviewer accept or discard them.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{SnapshotError, SnapshotResult};
use crate::path::{artifact_stem, SNAPSHOTS_DIR};

/// One reference file found under a `__Snapshots__` directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    pub path: PathBuf,
    /// Stem of the test source file owning the reference
    pub source: String,
    pub platform: Option<String>,
    pub file_name: String,
}

/// A failed candidate paired with the reference it was compared against
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingArtifact {
    pub reference: PathBuf,
    pub failed: PathBuf,
    pub attachments: Vec<PathBuf>,
}

/// Every reference file below `root`, sorted by path.
pub fn scan_references(root: &Path) -> SnapshotResult<Vec<ReferenceEntry>> {
    let mut entries = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| SnapshotError::Io {
            action: "Couldn't scan",
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(reference) = reference_entry(entry.path()) {
            entries.push(reference);
        }
    }

    debug!("Found {} reference(s) under {}", entries.len(), root.display());
    Ok(entries)
}

/// Interpret a path as `.../__Snapshots__/<source>[/<platform>]/<file>`.
fn reference_entry(path: &Path) -> Option<ReferenceEntry> {
    let components: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let marker = components.iter().rposition(|c| c == SNAPSHOTS_DIR)?;
    let rest = &components[marker + 1..];

    let file_name = rest.last()?.clone();
    if file_name.starts_with('.') {
        return None;
    }
    let (source, platform) = match rest.len() {
        2 => (rest[0].clone(), None),
        3 => (rest[0].clone(), Some(rest[1].clone())),
        _ => return None,
    };

    Some(ReferenceEntry {
        path: path.to_path_buf(),
        source,
        platform,
        file_name,
    })
}

/// Failed candidates in `artifacts_dir` whose reference lives below `root`
/// under the given platform subdirectory.
pub fn pending_artifacts(
    root: &Path,
    artifacts_dir: &Path,
    platform: Option<&str>,
) -> SnapshotResult<Vec<PendingArtifact>> {
    let mut pending = Vec::new();

    for reference in scan_references(root)? {
        if reference.platform.as_deref() != platform {
            continue;
        }
        let source_dir = artifacts_dir.join(&reference.source);
        let failed = source_dir.join(&reference.file_name);
        if !failed.is_file() {
            continue;
        }

        let prefix = format!("{}.", artifact_stem(&reference.file_name));
        let mut attachments = Vec::new();
        for entry in std::fs::read_dir(&source_dir)
            .map_err(SnapshotError::io("Couldn't list", &source_dir))?
        {
            let path = entry
                .map_err(SnapshotError::io("Couldn't list", &source_dir))?
                .path();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if path != failed && name.starts_with(&prefix) {
                attachments.push(path);
            }
        }
        attachments.sort();

        pending.push(PendingArtifact {
            reference: reference.path,
            failed,
            attachments,
        });
    }

    Ok(pending)
}

/// Make the failed candidate the new reference and drop its artifacts.
pub fn accept(artifact: &PendingArtifact) -> SnapshotResult<()> {
    std::fs::copy(&artifact.failed, &artifact.reference)
        .map_err(SnapshotError::io("Couldn't copy", &artifact.failed))?;
    discard(artifact)?;
    info!("Accepted {}", artifact.reference.display());
    Ok(())
}

/// Remove the failed candidate and its attachments, keeping the reference.
pub fn discard(artifact: &PendingArtifact) -> SnapshotResult<()> {
    for path in std::iter::once(&artifact.failed).chain(&artifact.attachments) {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(SnapshotError::Io {
                    action: "Couldn't remove",
                    path: path.clone(),
                    source: e,
                })
            }
        }
    }
    Ok(())
}

/// Discard every pending artifact; returns how many were removed.
pub fn clean_artifacts(
    root: &Path,
    artifacts_dir: &Path,
    platform: Option<&str>,
) -> SnapshotResult<usize> {
    let pending = pending_artifacts(root, artifacts_dir, platform)?;
    for artifact in &pending {
        discard(artifact)?;
    }
    if !pending.is_empty() {
        info!("Discarded {} failed artifact(s) from {}", pending.len(), artifacts_dir.display());
    }
    Ok(pending.len())
}
