//! Reference file layout
//!
//! ```text
//! <source dir>/__Snapshots__/<source file stem>[/<platform>]/<test>.<identifier>[.<ext>]
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::store::CounterStore;

/// Directory created next to each test source file.
pub const SNAPSHOTS_DIR: &str = "__Snapshots__";

static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").expect("static pattern"));

/// Collapse runs of non-word characters to `-` and trim `-` from both ends.
pub fn sanitize_path_component(component: &str) -> String {
    NON_WORD
        .replace_all(component, "-")
        .trim_matches('-')
        .to_string()
}

/// What distinguishes several snapshots taken by one test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    /// Sanitized caller-supplied name, stable across runs
    Named(String),
    /// Position of the call within the test for this run
    Counter(usize),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Identifier::Named(name) => f.write_str(name),
            Identifier::Counter(n) => write!(f, "{}", n),
        }
    }
}

/// Resolved location of one reference file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLocation {
    pub directory: PathBuf,
    pub reference_file: PathBuf,
    /// Stem of the test source file, also the failed-artifact subdirectory
    pub base_file_name: String,
    pub identifier: Identifier,
}

impl SnapshotLocation {
    pub fn file_name(&self) -> String {
        self.reference_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// `<test>.<identifier>`, the prefix shared by the failed artifact and
    /// its attachments.
    pub fn artifact_stem(&self) -> String {
        artifact_stem(&self.file_name()).to_string()
    }
}

/// The `<test>.<identifier>` part of a reference file name. Both parts are
/// sanitized and contain no `.`, so whatever follows the second `.` is the
/// strategy's extension.
pub fn artifact_stem(file_name: &str) -> &str {
    match file_name.match_indices('.').nth(1) {
        Some((end, _)) => &file_name[..end],
        None => file_name,
    }
}

/// Maps call sites to reference files.
#[derive(Debug, Clone, Default)]
pub struct PathAllocator {
    platform: Option<String>,
}

impl PathAllocator {
    pub fn new(platform: Option<String>) -> Self {
        Self { platform }
    }

    /// Snapshot directory for a test source file, and the file's stem.
    pub fn directory(&self, source_file: &Path) -> (PathBuf, String) {
        let base_file_name = source_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut directory = source_file
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(SNAPSHOTS_DIR)
            .join(&base_file_name);
        if let Some(platform) = &self.platform {
            directory.push(platform);
        }
        (directory, base_file_name)
    }

    /// Resolve the reference file for one assertion.
    ///
    /// Unnamed calls draw the next counter for `(directory, test)` from
    /// `counters`, so they are positional within a run.
    pub fn resolve(
        &self,
        counters: &CounterStore,
        source_file: &Path,
        name: Option<&str>,
        test_name: &str,
        extension: Option<&str>,
    ) -> SnapshotLocation {
        let (directory, base_file_name) = self.directory(source_file);
        let test_name = sanitize_path_component(test_name);

        let identifier = match name {
            Some(name) => Identifier::Named(sanitize_path_component(name)),
            None => Identifier::Counter(counters.next_call(&directory, &test_name)),
        };

        let mut file_name = format!("{}.{}", test_name, identifier);
        if let Some(ext) = extension.filter(|e| !e.is_empty()) {
            file_name.push('.');
            file_name.push_str(ext);
        }
        let reference_file = directory.join(file_name);
        debug!("Resolved snapshot {}", reference_file.display());

        SnapshotLocation {
            directory,
            reference_file,
            base_file_name,
            identifier,
        }
    }
}
