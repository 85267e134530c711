//! Snapshot verification: resolve, render, then record or compare
//!
//! ```text
//! verify(value, strategy, call)
//!   ├── PathAllocator::resolve ── CounterStore
//!   ├── create directory, CheckedRegistry::mark
//!   ├── value() ── strategy.render ── bounded wait
//!   ├── record (requested / no reference)  -> RecordMode | NoReference
//!   └── compare against reference          -> Ok | Mismatch (+ failed artifact)
//! ```

use std::fmt::Display;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::mpsc::{sync_channel, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use tokio::runtime::{Handle, Runtime};
use tracing::{debug, info, warn};

use crate::audit::{AuditGuard, CompletenessAuditor, TestInventory};
use crate::config::SnapshotConfig;
use crate::error::{SnapshotError, SnapshotResult, MINUS, PLUS};
use crate::fs::{FileSystem, StdFileSystem};
use crate::location::SourceLocation;
use crate::path::{PathAllocator, SnapshotLocation};
use crate::store::{CheckedRegistry, CounterStore};
use crate::strategy::{Difference, RenderState, Snapshotting};

/// Drives deferred renders for every engine in the process. Never dropped,
/// so engines can be created and dropped inside async tests.
static RENDER_RUNTIME: OnceCell<Runtime> = OnceCell::new();

fn render_runtime() -> SnapshotResult<Handle> {
    RENDER_RUNTIME
        .get_or_try_init(|| {
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .thread_name("refsnap-render")
                .enable_all()
                .build()
        })
        .map(|runtime| runtime.handle().clone())
        .map_err(|e| SnapshotError::Config(format!("Couldn't start render runtime: {}", e)))
}

/// Per-assertion parameters
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotCall {
    pub test_name: String,
    pub source_file: PathBuf,
    pub line: u32,
    /// Explicit snapshot name; unnamed calls are numbered
    pub name: Option<String>,
    /// Record this call even when record mode is off
    pub record: bool,
    /// Overrides the configured render timeout
    pub timeout: Option<Duration>,
}

impl SnapshotCall {
    pub fn new(test_name: impl Into<String>, source_file: impl Into<PathBuf>) -> Self {
        Self {
            test_name: test_name.into(),
            source_file: source_file.into(),
            line: 0,
            name: None,
            record: false,
            timeout: None,
        }
    }

    pub fn from_location(test_name: impl Into<String>, location: SourceLocation) -> Self {
        Self::new(test_name, location.source_path()).line(location.line)
    }

    pub fn line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn record(mut self, record: bool) -> Self {
        self.record = record;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Verifies values against references on disk
pub struct SnapshotEngine {
    config: SnapshotConfig,
    allocator: PathAllocator,
    counters: Arc<CounterStore>,
    checked: Arc<CheckedRegistry>,
    fs: Arc<dyn FileSystem>,
    runtime: Handle,
}

impl SnapshotEngine {
    /// Create an engine with fresh stores and the real filesystem
    pub fn new(config: SnapshotConfig) -> SnapshotResult<Self> {
        let runtime = render_runtime()?;

        Ok(Self {
            allocator: PathAllocator::new(config.platform.clone()),
            config,
            counters: Arc::new(CounterStore::new()),
            checked: Arc::new(CheckedRegistry::new()),
            fs: Arc::new(StdFileSystem),
            runtime,
        })
    }

    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn config(&self) -> &SnapshotConfig {
        &self.config
    }

    pub fn allocator(&self) -> &PathAllocator {
        &self.allocator
    }

    pub fn counters(&self) -> &CounterStore {
        &self.counters
    }

    pub fn checked(&self) -> &CheckedRegistry {
        &self.checked
    }

    pub fn auditor(&self) -> CompletenessAuditor<'_> {
        CompletenessAuditor::new(&self.allocator, &self.counters, &self.checked, self.fs.as_ref())
    }

    /// Guard that audits the snapshot directory of `source_file` when the
    /// test holding it ends.
    pub fn audit_guard<I: TestInventory>(
        &self,
        source_file: impl Into<PathBuf>,
        inventory: I,
    ) -> AuditGuard<'_, I> {
        AuditGuard::new(self, source_file.into(), inventory)
    }

    /// Verify an infallibly produced value.
    pub fn verify<V, S, P>(&self, value: P, strategy: &S, call: &SnapshotCall) -> SnapshotResult<()>
    where
        S: Snapshotting<V> + ?Sized,
        P: FnOnce() -> V,
    {
        self.try_verify(|| Ok::<V, std::convert::Infallible>(value()), strategy, call)
    }

    /// Verify a value whose producer may fail. The producer runs at most
    /// once, after the reference location is prepared; errors and panics
    /// from it become [`SnapshotError::Value`].
    pub fn try_verify<V, E, S, P>(
        &self,
        value: P,
        strategy: &S,
        call: &SnapshotCall,
    ) -> SnapshotResult<()>
    where
        E: Display,
        S: Snapshotting<V> + ?Sized,
        P: FnOnce() -> Result<V, E>,
    {
        let recording = call.record || self.config.record;

        let location = self.allocator.resolve(
            &self.counters,
            &call.source_file,
            call.name.as_deref(),
            &call.test_name,
            strategy.path_extension(),
        );
        self.fs
            .create_dir_all(&location.directory)
            .map_err(SnapshotError::io("Couldn't create directory", &location.directory))?;
        self.checked.mark(&location.directory, &location.reference_file);

        let value = match catch_unwind(AssertUnwindSafe(value)) {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => return Err(SnapshotError::Value(e.to_string())),
            Err(panic) => return Err(SnapshotError::Value(panic_message(panic.as_ref()))),
        };

        let timeout = call.timeout.unwrap_or_else(|| self.config.timeout());
        let candidate = self.render(strategy, value, timeout)?;

        if recording || !self.fs.exists(&location.reference_file) {
            return self.record(strategy, &candidate, &location, call, recording);
        }

        let data = self
            .fs
            .read(&location.reference_file)
            .map_err(SnapshotError::io("Couldn't read", &location.reference_file))?;
        let reference = strategy
            .from_bytes(&data)
            .map_err(|source| SnapshotError::Decode {
                path: location.reference_file.clone(),
                source,
            })?;

        match strategy.diff(&reference, &candidate) {
            None => {
                debug!("Snapshot matches {}", location.reference_file.display());
                Ok(())
            }
            Some(difference) => {
                Err(self.mismatch(strategy, &candidate, &location, call, difference)?)
            }
        }
    }

    fn render<V, S>(&self, strategy: &S, value: V, timeout: Duration) -> SnapshotResult<S::Format>
    where
        S: Snapshotting<V> + ?Sized,
    {
        let rendering = catch_unwind(AssertUnwindSafe(|| strategy.render(value)))
            .map_err(|_| SnapshotError::RenderFailed)?;

        let future = match rendering.into_state() {
            RenderState::Ready(format) => return format.ok_or(SnapshotError::RenderFailed),
            RenderState::Pending(future) => future,
        };

        // The receiver is dropped on timeout, so a late result goes nowhere.
        let (tx, rx) = sync_channel(1);
        let task = self.runtime.spawn(async move {
            let _ = tx.send(future.await);
        });

        match rx.recv_timeout(timeout) {
            Ok(Some(format)) => Ok(format),
            Ok(None) | Err(RecvTimeoutError::Disconnected) => Err(SnapshotError::RenderFailed),
            Err(RecvTimeoutError::Timeout) => {
                task.abort();
                warn!("Render abandoned after {:?}", timeout);
                Err(SnapshotError::Timeout { timeout })
            }
        }
    }

    fn record<V, S>(
        &self,
        strategy: &S,
        candidate: &S::Format,
        location: &SnapshotLocation,
        call: &SnapshotCall,
        recording: bool,
    ) -> SnapshotResult<()>
    where
        S: Snapshotting<V> + ?Sized,
    {
        let path = &location.reference_file;

        let previous_diff = if recording {
            self.fs
                .read(path)
                .ok()
                .and_then(|data| strategy.from_bytes(&data).ok())
                .and_then(|reference| strategy.diff(&reference, candidate))
                .map(|difference| difference.message.trim().to_string())
        } else {
            None
        };

        let data = strategy.to_bytes(candidate).map_err(SnapshotError::Encode)?;
        self.fs
            .write(path, &data)
            .map_err(SnapshotError::io("Couldn't write", path))?;
        info!(
            "Recorded snapshot {} ({} bytes) at {}:{}",
            path.display(),
            data.len(),
            call.source_file.display(),
            call.line
        );

        if recording {
            Err(SnapshotError::RecordMode {
                path: path.clone(),
                test_name: call.test_name.clone(),
                diff: previous_diff.unwrap_or_else(|| "Recorded snapshot: \u{2026}".to_string()),
            })
        } else {
            Err(SnapshotError::NoReference {
                path: path.clone(),
                test_name: call.test_name.clone(),
            })
        }
    }

    /// Persist the failing candidate and its attachments, then describe the
    /// mismatch. I/O failures while persisting take precedence.
    fn mismatch<V, S>(
        &self,
        strategy: &S,
        candidate: &S::Format,
        location: &SnapshotLocation,
        call: &SnapshotCall,
        difference: Difference,
    ) -> SnapshotResult<SnapshotError>
    where
        S: Snapshotting<V> + ?Sized,
    {
        let artifacts_dir = self.config.artifacts_dir().join(&location.base_file_name);
        self.fs
            .create_dir_all(&artifacts_dir)
            .map_err(SnapshotError::io("Couldn't create directory", &artifacts_dir))?;

        let failed = artifacts_dir.join(location.file_name());
        let data = strategy.to_bytes(candidate).map_err(SnapshotError::Encode)?;
        self.fs
            .write(&failed, &data)
            .map_err(SnapshotError::io("Couldn't write", &failed))?;

        let stem = location.artifact_stem();
        let mut attachments = Vec::with_capacity(difference.attachments.len());
        for attachment in &difference.attachments {
            let path = artifacts_dir.join(format!("{}.{}", stem, attachment.name));
            self.fs
                .write(&path, &attachment.data)
                .map_err(SnapshotError::io("Couldn't write", &path))?;
            attachments.push(path);
        }

        let reference = location.reference_file.clone();
        let command = match &self.config.diff_tool {
            Some(tool) => format!("{} \"{}\" \"{}\"", tool, reference.display(), failed.display()),
            None => format!(
                "@{}\n\"{}\"\n@{}\n\"{}\"",
                MINUS,
                reference.display(),
                PLUS,
                failed.display()
            ),
        };

        warn!(
            "Snapshot mismatch for {} at {}:{} (candidate at {})",
            reference.display(),
            call.source_file.display(),
            call.line,
            failed.display()
        );

        Ok(SnapshotError::Mismatch {
            reference,
            failed,
            command,
            diff: difference.message.trim().to_string(),
            attachments,
        })
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "value producer panicked".to_string()
    }
}
