//! Error types for snapshot verification
//!
//! Every failure an assertion can produce is a variant here; the `Display`
//! text is the message the test author sees.

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::strategy::StrategyError;

/// Result type alias using [`SnapshotError`]
pub type SnapshotResult<T> = std::result::Result<T, SnapshotError>;

/// Marker printed before the reference path in mismatch reports.
pub const MINUS: &str = "\u{2212}";
/// Marker printed before the failed artifact path in mismatch reports.
pub const PLUS: &str = "+";

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("{action} \"{}\": {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Couldn't decode reference \"{}\": {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: StrategyError,
    },

    #[error("Couldn't serialize snapshot: {0}")]
    Encode(#[source] StrategyError),

    #[error("Couldn't evaluate value: {0}")]
    Value(String),

    #[error("Exceeded timeout of {} seconds waiting for snapshot", .timeout.as_secs_f64())]
    Timeout { timeout: Duration },

    #[error("Couldn't snapshot value")]
    RenderFailed,

    #[error(
        "Record mode is on. Turn record mode off and re-run \"{test_name}\" to test against the newly-recorded snapshot.\n\nopen \"{}\"\n\n{diff}",
        .path.display()
    )]
    RecordMode {
        path: PathBuf,
        test_name: String,
        diff: String,
    },

    #[error(
        "No reference was found on disk. Automatically recorded snapshot: \u{2026}\n\nopen \"{}\"\n\nRe-run \"{test_name}\" to test against the newly-recorded snapshot.",
        .path.display()
    )]
    NoReference { path: PathBuf, test_name: String },

    #[error(
        "Snapshot does not match reference.\n\n{command}\n\n{diff}{}",
        attachment_list(.attachments)
    )]
    Mismatch {
        reference: PathBuf,
        failed: PathBuf,
        command: String,
        diff: String,
        attachments: Vec<PathBuf>,
    },

    #[error("Couldn't find test methods for {class}")]
    Introspection { class: String },

    #[error("These files were not checked:\n{}", path_list(.files))]
    Unchecked { files: Vec<PathBuf> },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SnapshotError {
    /// Build an `Io` error mapper for `?` chains.
    pub(crate) fn io(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.to_path_buf();
        move |source| SnapshotError::Io { action, path, source }
    }

    /// Whether this failure only reports that a reference was written.
    pub fn is_recording(&self) -> bool {
        matches!(self, SnapshotError::RecordMode { .. } | SnapshotError::NoReference { .. })
    }

    /// Whether the candidate differed from an existing reference.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, SnapshotError::Mismatch { .. })
    }
}

fn path_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

fn attachment_list(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return String::new();
    }
    format!("\n\nAttachments:\n{}", path_list(paths))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_duration() {
        let err = SnapshotError::Timeout {
            timeout: Duration::from_millis(1500),
        };
        assert_eq!(
            err.to_string(),
            "Exceeded timeout of 1.5 seconds waiting for snapshot"
        );
    }

    #[test]
    fn test_recording_wording_is_distinct() {
        let record = SnapshotError::RecordMode {
            path: PathBuf::from("/tmp/a.1.txt"),
            test_name: "a".into(),
            diff: "Recorded snapshot: \u{2026}".into(),
        };
        let missing = SnapshotError::NoReference {
            path: PathBuf::from("/tmp/a.1.txt"),
            test_name: "a".into(),
        };
        assert!(record.to_string().starts_with("Record mode is on."));
        assert!(missing.to_string().starts_with("No reference was found on disk."));
        assert!(record.is_recording() && missing.is_recording());
    }

    #[test]
    fn test_mismatch_lists_attachments() {
        let err = SnapshotError::Mismatch {
            reference: PathBuf::from("/r/a.1.png"),
            failed: PathBuf::from("/f/a.1.png"),
            command: "ksdiff \"/r/a.1.png\" \"/f/a.1.png\"".into(),
            diff: "3 pixels differ".into(),
            attachments: vec![PathBuf::from("/f/a.1.difference.png")],
        };
        let message = err.to_string();
        assert!(message.starts_with("Snapshot does not match reference."));
        assert!(message.contains("ksdiff"));
        assert!(message.ends_with("Attachments:\n/f/a.1.difference.png"));
    }
}
