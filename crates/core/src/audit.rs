//! Completeness audit: every reference on disk must have been exercised
//!
//! Each test in a source file calls the audit once when it finishes. Only the
//! call that brings the per-directory counter up to the number of tests in
//! that file compares the directory listing with the checked set, so a
//! filtered run never reports files whose tests simply did not run.

use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::engine::SnapshotEngine;
use crate::error::{SnapshotError, SnapshotResult};
use crate::fs::FileSystem;
use crate::path::PathAllocator;
use crate::store::{CheckedRegistry, CounterStore};

/// Counts the tests declared by a test class.
pub trait TestInventory {
    /// `None` when the class cannot be introspected.
    fn count_tests(&self, class: &str) -> Option<usize>;
}

impl<F> TestInventory for F
where
    F: Fn(&str) -> Option<usize>,
{
    fn count_tests(&self, class: &str) -> Option<usize> {
        self(class)
    }
}

/// A fixed test count, for hosts that already know it.
#[derive(Debug, Clone, Copy)]
pub struct FixedInventory(pub usize);

impl TestInventory for FixedInventory {
    fn count_tests(&self, _class: &str) -> Option<usize> {
        Some(self.0)
    }
}

static TEST_ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*#\[\s*(?:[A-Za-z_][A-Za-z0-9_]*::)*test\s*(?:\([^\]]*\))?\s*\]")
        .expect("static pattern")
});

/// Treats the class as a source file path and counts its test attributes
/// (`#[test]`, `#[tokio::test]`, `#[tokio::test(flavor = ...)]`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceInventory;

impl SourceInventory {
    pub fn count_in(source: &str) -> usize {
        TEST_ATTRIBUTE.find_iter(source).count()
    }
}

impl TestInventory for SourceInventory {
    fn count_tests(&self, class: &str) -> Option<usize> {
        let source = std::fs::read_to_string(class).ok()?;
        Some(Self::count_in(&source))
    }
}

/// What an audit call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    /// Not every test has finished yet
    Deferred { completed: usize, expected: usize },
    /// All references in the directory were exercised
    Complete { checked: usize },
}

pub struct CompletenessAuditor<'a> {
    allocator: &'a PathAllocator,
    counters: &'a CounterStore,
    checked: &'a CheckedRegistry,
    fs: &'a dyn FileSystem,
}

impl<'a> CompletenessAuditor<'a> {
    pub fn new(
        allocator: &'a PathAllocator,
        counters: &'a CounterStore,
        checked: &'a CheckedRegistry,
        fs: &'a dyn FileSystem,
    ) -> Self {
        Self {
            allocator,
            counters,
            checked,
            fs,
        }
    }

    /// Count this call and audit the snapshot directory of `source_file` if
    /// it was the last test of `class` to finish.
    pub fn audit_if_last(
        &self,
        class: &str,
        source_file: &Path,
        inventory: &dyn TestInventory,
    ) -> SnapshotResult<AuditOutcome> {
        let expected = inventory
            .count_tests(class)
            .ok_or_else(|| SnapshotError::Introspection {
                class: class.to_string(),
            })?;

        let (directory, _) = self.allocator.directory(source_file);
        let completed = self.counters.next_audit(&directory);
        if completed != expected {
            debug!("Audit of {} deferred ({}/{})", directory.display(), completed, expected);
            return Ok(AuditOutcome::Deferred { completed, expected });
        }

        let present = self
            .fs
            .list_dir(&directory)
            .map_err(SnapshotError::io("Couldn't list", &directory))?;
        let checked = self.checked.checked(&directory);

        let unchecked: Vec<PathBuf> = present
            .into_iter()
            .filter(|file| !checked.contains(file))
            .collect();

        if unchecked.is_empty() {
            info!("All {} snapshots in {} were checked", checked.len(), directory.display());
            Ok(AuditOutcome::Complete {
                checked: checked.len(),
            })
        } else {
            warn!("{} unchecked snapshot(s) in {}", unchecked.len(), directory.display());
            Err(SnapshotError::Unchecked { files: unchecked })
        }
    }
}

/// Counts one finished test when dropped, whether the test passed or
/// panicked. The last test of the file to finish fails if a reference went
/// unexercised; while already panicking the report is only logged.
#[must_use = "the audit runs when the guard is dropped"]
pub struct AuditGuard<'a, I: TestInventory> {
    engine: &'a SnapshotEngine,
    source_file: PathBuf,
    inventory: I,
    done: bool,
}

impl<'a, I: TestInventory> AuditGuard<'a, I> {
    pub fn new(engine: &'a SnapshotEngine, source_file: PathBuf, inventory: I) -> Self {
        Self {
            engine,
            source_file,
            inventory,
            done: false,
        }
    }

    /// Run the audit now instead of on drop.
    pub fn finish(mut self) -> SnapshotResult<AuditOutcome> {
        self.done = true;
        self.run()
    }

    fn run(&self) -> SnapshotResult<AuditOutcome> {
        let class = self.source_file.to_string_lossy().into_owned();
        self.engine
            .auditor()
            .audit_if_last(&class, &self.source_file, &self.inventory)
    }
}

impl<I: TestInventory> Drop for AuditGuard<'_, I> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        match self.run() {
            Ok(_) => {}
            Err(e) if std::thread::panicking() => {
                warn!("Snapshot audit failed during a panicking test: {}", e)
            }
            Err(e) => panic!("{}", e),
        }
    }
}
