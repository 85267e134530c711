//! refsnap: snapshot testing over pluggable strategies
//!
//! A test asserts that a value matches a reference recorded on disk. A
//! strategy decides how the value is rendered into a comparable artifact,
//! how that artifact is persisted and how two artifacts are diffed.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  assert_snapshot! / verify_snapshot! / assert_snapshots!    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  SnapshotEngine                                             │
//! │    ├── PathAllocator  -> __Snapshots__/<file>/<os>/<t>.<id> │
//! │    ├── CounterStore   -> per-test call counters             │
//! │    ├── CheckedRegistry-> references exercised this run      │
//! │    ├── Snapshotting   -> render / to_bytes / from_bytes /   │
//! │    │                     diff                               │
//! │    └── FileSystem     -> create / read / write / list       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CompletenessAuditor (snapshot_audit!)                      │
//! │    └── lists references nobody exercised                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ```ignore
//! #[test]
//! fn renders_greeting() {
//!     let _audit = snapshot_audit!();
//!     assert_snapshot!(greet("Ferris"), Lines);
//!     assert_snapshot!(greet("Corro"), Lines, named: "corro");
//! }
//! ```

pub mod assert;
pub mod audit;
pub mod config;
pub mod engine;
pub mod error;
pub mod fs;
pub mod location;
pub mod path;
pub mod review;
pub mod store;
pub mod strategy;

pub use assert::{
    assert_named_snapshots, assert_snapshot, assert_snapshots, configure, shared_engine,
    snapshot_audit, verify_named_snapshots, verify_snapshot, verify_snapshots,
};
pub use audit::{
    AuditGuard, AuditOutcome, CompletenessAuditor, FixedInventory, SourceInventory, TestInventory,
};
pub use config::SnapshotConfig;
pub use engine::{SnapshotCall, SnapshotEngine};
pub use error::{SnapshotError, SnapshotResult};
pub use fs::{FileSystem, StdFileSystem};
pub use location::SourceLocation;
pub use path::{sanitize_path_component, Identifier, PathAllocator, SnapshotLocation};
pub use store::{CheckedRegistry, CounterStore};
pub use strategy::{
    Attachment, Difference, Pullback, Rendering, Snapshotting, SnapshottingExt, StrategyError,
};

/// Build a [`SnapshotCall`] for the enclosing test, applying builder options
/// such as `named: "dark"`, `record: true` or `timeout: Duration::from_secs(1)`.
#[macro_export]
macro_rules! snapshot_call {
    ($($option:ident : $arg:expr),* $(,)?) => {
        $crate::SnapshotCall::from_location($crate::function_name!(), $crate::source_location!())
            $( .$option($arg) )*
    };
}

/// Assert that a value matches its reference.
///
/// ```ignore
/// assert_snapshot!(user, Json);
/// assert_snapshot!(page, Image::default(), named: "dark", timeout: Duration::from_secs(10));
/// ```
#[macro_export]
macro_rules! assert_snapshot {
    ($value:expr, $strategy:expr $(, $option:ident : $arg:expr)* $(,)?) => {
        $crate::assert_snapshot(|| $value, &$strategy, $crate::snapshot_call!($($option : $arg),*))
    };
}

/// Like [`assert_snapshot!`] but returns the result instead of panicking.
#[macro_export]
macro_rules! verify_snapshot {
    ($value:expr, $strategy:expr $(, $option:ident : $arg:expr)* $(,)?) => {
        $crate::verify_snapshot(|| $value, &$strategy, $crate::snapshot_call!($($option : $arg),*))
    };
}

/// Assert a value against several strategies, either named
/// (`{ "dark" => a, "light" => b }`) or numbered (`[a, b]`).
#[macro_export]
macro_rules! assert_snapshots {
    ($value:expr, { $($name:expr => $strategy:expr),+ $(,)? } $(, $option:ident : $arg:expr)* $(,)?) => {
        $crate::assert_named_snapshots(
            || $value,
            [$(($name, &$strategy)),+],
            $crate::snapshot_call!($($option : $arg),*),
        )
    };
    ($value:expr, [ $($strategy:expr),+ $(,)? ] $(, $option:ident : $arg:expr)* $(,)?) => {
        $crate::assert_snapshots(
            || $value,
            [$(&$strategy),+],
            $crate::snapshot_call!($($option : $arg),*),
        )
    };
}

/// Hold for the whole test: `let _audit = snapshot_audit!();`. Every test
/// in the file is counted when it ends, passed or panicked, and the last one
/// to finish fails if a reference in the file's snapshot directory was never
/// exercised.
#[macro_export]
macro_rules! snapshot_audit {
    () => {
        $crate::snapshot_audit($crate::source_location!())
    };
}
