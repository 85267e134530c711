//! CLI command implementations

pub mod artifacts;
pub mod config;
pub mod references;

use std::path::PathBuf;

use refsnap::SnapshotConfig;

use crate::output::OutputFormat;

/// Settings shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory searched for `__Snapshots__` directories
    pub root: PathBuf,
    pub config: SnapshotConfig,
    pub format: OutputFormat,
}

impl Context {
    pub fn artifacts_dir(&self) -> PathBuf {
        self.config.artifacts_dir()
    }

    pub fn platform(&self) -> Option<&str> {
        self.config.platform.as_deref()
    }
}
