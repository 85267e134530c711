//! Assertion entry points backed by the process-wide engine

use once_cell::sync::OnceCell;
use std::fmt::Write as _;

use crate::audit::{AuditGuard, SourceInventory};
use crate::config::SnapshotConfig;
use crate::engine::{SnapshotCall, SnapshotEngine};
use crate::error::{SnapshotError, SnapshotResult};
use crate::location::SourceLocation;
use crate::strategy::Snapshotting;

static ENGINE: OnceCell<SnapshotEngine> = OnceCell::new();

/// Install the process-wide configuration. Must run before the first
/// assertion; later calls are rejected.
pub fn configure(config: SnapshotConfig) -> SnapshotResult<()> {
    let engine = SnapshotEngine::new(config)?;
    ENGINE
        .set(engine)
        .map_err(|_| SnapshotError::Config("snapshot engine is already configured".to_string()))
}

/// The process-wide engine, configured from the environment on first use.
pub fn shared_engine() -> SnapshotResult<&'static SnapshotEngine> {
    ENGINE.get_or_try_init(|| SnapshotEngine::new(SnapshotConfig::from_env()?))
}

/// Verify one value; `Err` carries the failure message.
pub fn verify_snapshot<V, S, P>(value: P, strategy: &S, call: SnapshotCall) -> SnapshotResult<()>
where
    S: Snapshotting<V> + ?Sized,
    P: FnOnce() -> V,
{
    shared_engine()?.verify(value, strategy, &call)
}

/// Assert one value matches its reference, panicking with the failure message.
#[track_caller]
pub fn assert_snapshot<V, S, P>(value: P, strategy: &S, call: SnapshotCall)
where
    S: Snapshotting<V> + ?Sized,
    P: FnOnce() -> V,
{
    if let Err(e) = verify_snapshot(value, strategy, call) {
        panic!("{}", e);
    }
}

/// Verify a value against several named strategies. The value is produced
/// once per strategy and every strategy runs regardless of earlier failures.
pub fn verify_named_snapshots<'s, V, S, N, P, I>(
    value: P,
    strategies: I,
    call: SnapshotCall,
) -> Vec<(String, SnapshotResult<()>)>
where
    S: Snapshotting<V> + ?Sized + 's,
    N: Into<String>,
    P: Fn() -> V,
    I: IntoIterator<Item = (N, &'s S)>,
{
    strategies
        .into_iter()
        .map(|(name, strategy)| {
            let name = name.into();
            let result = verify_snapshot(&value, strategy, call.clone().named(name.clone()));
            (name, result)
        })
        .collect()
}

/// Verify a value against several unnamed strategies, numbered in order.
pub fn verify_snapshots<'s, V, S, P, I>(
    value: P,
    strategies: I,
    call: SnapshotCall,
) -> Vec<SnapshotResult<()>>
where
    S: Snapshotting<V> + ?Sized + 's,
    P: Fn() -> V,
    I: IntoIterator<Item = &'s S>,
{
    strategies
        .into_iter()
        .map(|strategy| verify_snapshot(&value, strategy, call.clone()))
        .collect()
}

/// Assert every named strategy matches, reporting all failures together.
#[track_caller]
pub fn assert_named_snapshots<'s, V, S, N, P, I>(value: P, strategies: I, call: SnapshotCall)
where
    S: Snapshotting<V> + ?Sized + 's,
    N: Into<String>,
    P: Fn() -> V,
    I: IntoIterator<Item = (N, &'s S)>,
{
    let results = verify_named_snapshots(value, strategies, call);
    let total = results.len();
    let failures: Vec<(String, SnapshotError)> = results
        .into_iter()
        .filter_map(|(name, result)| result.err().map(|e| (name, e)))
        .collect();
    if !failures.is_empty() {
        panic!("{}", failure_report(total, &failures));
    }
}

/// Assert every strategy matches, reporting all failures together.
#[track_caller]
pub fn assert_snapshots<'s, V, S, P, I>(value: P, strategies: I, call: SnapshotCall)
where
    S: Snapshotting<V> + ?Sized + 's,
    P: Fn() -> V,
    I: IntoIterator<Item = &'s S>,
{
    let results = verify_snapshots(value, strategies, call);
    let total = results.len();
    let failures: Vec<(String, SnapshotError)> = results
        .into_iter()
        .enumerate()
        .filter_map(|(i, result)| result.err().map(|e| (format!("#{}", i + 1), e)))
        .collect();
    if !failures.is_empty() {
        panic!("{}", failure_report(total, &failures));
    }
}

fn failure_report(total: usize, failures: &[(String, SnapshotError)]) -> String {
    let mut report = format!("{} of {} snapshots failed", failures.len(), total);
    for (label, error) in failures {
        let _ = write!(report, "\n\n[{}] {}", label, error);
    }
    report
}

/// Guard auditing the source file at `location` when the test ends,
/// including when it panics.
#[track_caller]
pub fn snapshot_audit(location: SourceLocation) -> AuditGuard<'static, SourceInventory> {
    match shared_engine() {
        Ok(engine) => engine.audit_guard(location.source_path(), SourceInventory),
        Err(e) => panic!("{}", e),
    }
}
