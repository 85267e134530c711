//! Shared bookkeeping for a test run
//!
//! Both stores are process-lifetime, never persisted, and mutate only under
//! their own lock so concurrently running tests observe a single order.

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

/// Per-(directory, test) call counters and per-directory audit counters.
#[derive(Debug, Default)]
pub struct CounterStore {
    state: Mutex<CounterState>,
}

#[derive(Debug, Default)]
struct CounterState {
    calls: HashMap<(PathBuf, String), usize>,
    audits: HashMap<PathBuf, usize>,
}

impl CounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment and return the call counter for `test_name` in `directory`.
    /// The first call yields 1.
    pub fn next_call(&self, directory: &Path, test_name: &str) -> usize {
        let mut state = self.state.lock();
        let counter = state
            .calls
            .entry((directory.to_path_buf(), test_name.to_string()))
            .or_insert(0);
        *counter += 1;
        *counter
    }

    /// Increment and return how many completeness audits fired for `directory`.
    pub fn next_audit(&self, directory: &Path) -> usize {
        let mut state = self.state.lock();
        let counter = state.audits.entry(directory.to_path_buf()).or_insert(0);
        *counter += 1;
        *counter
    }
}

/// Reference files exercised during this run, grouped by snapshot directory.
#[derive(Debug, Default)]
pub struct CheckedRegistry {
    checked: Mutex<HashMap<PathBuf, BTreeSet<PathBuf>>>,
}

impl CheckedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, directory: &Path, file: &Path) {
        self.checked
            .lock()
            .entry(directory.to_path_buf())
            .or_default()
            .insert(file.to_path_buf());
    }

    pub fn is_checked(&self, directory: &Path, file: &Path) -> bool {
        self.checked
            .lock()
            .get(directory)
            .map(|files| files.contains(file))
            .unwrap_or(false)
    }

    /// Copy of the files marked for `directory`.
    pub fn checked(&self, directory: &Path) -> BTreeSet<PathBuf> {
        self.checked
            .lock()
            .get(directory)
            .cloned()
            .unwrap_or_default()
    }
}
