//! Failed-artifact review: pending, accept, discard, clean

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use refsnap::review::{self, PendingArtifact};

use super::Context;
use crate::output::{print_list, print_message, print_success, print_warning, TableDisplay};

/// Which pending artifacts a command applies to
#[derive(Debug, Args)]
pub struct Selection {
    /// Apply to every pending artifact
    #[arg(long, conflicts_with = "files")]
    pub all: bool,

    /// Reference or failed-artifact paths (a trailing part is enough,
    /// e.g. `render/linux/header.1.txt`)
    pub files: Vec<PathBuf>,
}

#[derive(Serialize)]
pub struct PendingDisplay {
    pub reference: String,
    pub failed: String,
    pub attachments: usize,
}

impl From<&PendingArtifact> for PendingDisplay {
    fn from(artifact: &PendingArtifact) -> Self {
        Self {
            reference: artifact.reference.display().to_string(),
            failed: artifact.failed.display().to_string(),
            attachments: artifact.attachments.len(),
        }
    }
}

impl TableDisplay for PendingDisplay {
    fn headers() -> Vec<&'static str> {
        vec!["Reference", "Failed", "Attachments"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.reference.clone(),
            self.failed.clone(),
            self.attachments.to_string(),
        ]
    }
}

fn load(ctx: &Context) -> Result<Vec<PendingArtifact>> {
    Ok(review::pending_artifacts(
        &ctx.root,
        &ctx.artifacts_dir(),
        ctx.platform(),
    )?)
}

fn matches(artifact: &PendingArtifact, file: &Path) -> bool {
    artifact.reference.ends_with(file) || artifact.failed.ends_with(file)
}

/// Resolve a selection against the pending artifacts.
pub fn select(
    pending: Vec<PendingArtifact>,
    selection: &Selection,
) -> Result<Vec<PendingArtifact>> {
    if selection.all {
        return Ok(pending);
    }
    if selection.files.is_empty() {
        bail!("Pass --all or at least one file");
    }
    for file in &selection.files {
        if !pending.iter().any(|artifact| matches(artifact, file)) {
            bail!("No failed artifact for {}", file.display());
        }
    }
    Ok(pending
        .into_iter()
        .filter(|artifact| selection.files.iter().any(|file| matches(artifact, file)))
        .collect())
}

pub fn pending(ctx: &Context) -> Result<()> {
    let displays: Vec<PendingDisplay> = load(ctx)?.iter().map(PendingDisplay::from).collect();
    print_list(&displays, ctx.format);
    Ok(())
}

pub fn accept(ctx: &Context, selection: &Selection) -> Result<()> {
    let chosen = select(load(ctx)?, selection)?;
    for artifact in &chosen {
        review::accept(artifact)?;
        print_success(&format!("Accepted {}", artifact.reference.display()));
    }
    print_message(&format!("{} reference(s) updated", chosen.len()), ctx.format);
    Ok(())
}

pub fn discard(ctx: &Context, selection: &Selection) -> Result<()> {
    let chosen = select(load(ctx)?, selection)?;
    for artifact in &chosen {
        review::discard(artifact)?;
        print_warning(&format!("Discarded {}", artifact.failed.display()));
    }
    print_message(&format!("{} failed artifact(s) discarded", chosen.len()), ctx.format);
    Ok(())
}

pub fn clean(ctx: &Context) -> Result<()> {
    let removed = review::clean_artifacts(&ctx.root, &ctx.artifacts_dir(), ctx.platform())?;
    print_message(&format!("{} failed artifact(s) removed", removed), ctx.format);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(name: &str) -> PendingArtifact {
        PendingArtifact {
            reference: PathBuf::from(format!("/repo/tests/__Snapshots__/render/linux/{name}")),
            failed: PathBuf::from(format!("/tmp/render/{name}")),
            attachments: Vec::new(),
        }
    }

    fn selection(all: bool, files: &[&str]) -> Selection {
        Selection {
            all,
            files: files.iter().map(PathBuf::from).collect(),
        }
    }

    #[test]
    fn test_select_all() {
        let pending = vec![artifact("a.1.txt"), artifact("b.1.txt")];
        let chosen = select(pending, &selection(true, &[])).unwrap();
        assert_eq!(chosen.len(), 2);
    }

    #[test]
    fn test_select_by_trailing_path() {
        let pending = vec![artifact("a.1.txt"), artifact("b.1.txt")];
        let chosen = select(pending, &selection(false, &["linux/b.1.txt"])).unwrap();
        assert_eq!(chosen, vec![artifact("b.1.txt")]);
    }

    #[test]
    fn test_select_requires_files() {
        assert!(select(vec![artifact("a.1.txt")], &selection(false, &[])).is_err());
        let err = select(vec![artifact("a.1.txt")], &selection(false, &["zzz.txt"])).unwrap_err();
        assert_eq!(err.to_string(), "No failed artifact for zzz.txt");
    }
}
