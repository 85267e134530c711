//! Strategies and helpers shared by the engine integration tests

#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use refsnap::{
    Attachment, Difference, FileSystem, Rendering, SnapshotConfig, SnapshotEngine, Snapshotting,
    StdFileSystem, StrategyError,
};
use tempfile::TempDir;

/// Plain text compared for exact equality
pub struct Text;

impl Snapshotting<String> for Text {
    type Format = String;

    fn path_extension(&self) -> Option<&str> {
        Some("txt")
    }

    fn render(&self, value: String) -> Rendering<String> {
        Rendering::ready(value)
    }

    fn to_bytes(&self, format: &String) -> Result<Vec<u8>, StrategyError> {
        Ok(format.as_bytes().to_vec())
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<String, StrategyError> {
        String::from_utf8(bytes.to_vec()).map_err(|e| StrategyError::new(e.to_string()))
    }

    fn diff(&self, reference: &String, candidate: &String) -> Option<Difference> {
        (reference != candidate).then(|| {
            Difference::new(format!("\u{2212} {}\n+ {}\n", reference, candidate))
        })
    }
}

/// [`Text`] whose differences carry an attachment
pub struct Annotated;

impl Snapshotting<String> for Annotated {
    type Format = String;

    fn path_extension(&self) -> Option<&str> {
        Text.path_extension()
    }

    fn render(&self, value: String) -> Rendering<String> {
        Text.render(value)
    }

    fn to_bytes(&self, format: &String) -> Result<Vec<u8>, StrategyError> {
        Text.to_bytes(format)
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<String, StrategyError> {
        Text.from_bytes(bytes)
    }

    fn diff(&self, reference: &String, candidate: &String) -> Option<Difference> {
        Text.diff(reference, candidate).map(|d| {
            let lengths = format!("{} {}", reference.len(), candidate.len());
            d.with_attachment(Attachment::new("lengths.txt", lengths.into_bytes()))
        })
    }
}

/// Extensionless references whose differences carry a `note` attachment
pub struct Raw;

impl Snapshotting<String> for Raw {
    type Format = String;

    fn render(&self, value: String) -> Rendering<String> {
        Text.render(value)
    }

    fn to_bytes(&self, format: &String) -> Result<Vec<u8>, StrategyError> {
        Text.to_bytes(format)
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<String, StrategyError> {
        Text.from_bytes(bytes)
    }

    fn diff(&self, reference: &String, candidate: &String) -> Option<Difference> {
        Text.diff(reference, candidate)
            .map(|d| d.with_attachment(Attachment::new("note", candidate.clone().into_bytes())))
    }
}

/// Text produced on the render runtime after a delay
pub struct Slow(pub Duration);

impl Snapshotting<String> for Slow {
    type Format = String;

    fn path_extension(&self) -> Option<&str> {
        Some("txt")
    }

    fn render(&self, value: String) -> Rendering<String> {
        let delay = self.0;
        Rendering::deferred(async move {
            tokio::time::sleep(delay).await;
            Some(value)
        })
    }

    fn to_bytes(&self, format: &String) -> Result<Vec<u8>, StrategyError> {
        Text.to_bytes(format)
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<String, StrategyError> {
        Text.from_bytes(bytes)
    }

    fn diff(&self, reference: &String, candidate: &String) -> Option<Difference> {
        Text.diff(reference, candidate)
    }
}

/// Never finishes rendering
pub struct Never;

impl Snapshotting<String> for Never {
    type Format = String;

    fn render(&self, _value: String) -> Rendering<String> {
        Rendering::deferred(futures::future::pending())
    }

    fn to_bytes(&self, format: &String) -> Result<Vec<u8>, StrategyError> {
        Text.to_bytes(format)
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<String, StrategyError> {
        Text.from_bytes(bytes)
    }

    fn diff(&self, reference: &String, candidate: &String) -> Option<Difference> {
        Text.diff(reference, candidate)
    }
}

/// Finishes rendering without an artifact
pub struct GiveUp;

impl Snapshotting<String> for GiveUp {
    type Format = String;

    fn render(&self, _value: String) -> Rendering<String> {
        Rendering::deferred(async { None })
    }

    fn to_bytes(&self, format: &String) -> Result<Vec<u8>, StrategyError> {
        Text.to_bytes(format)
    }

    fn from_bytes(&self, bytes: &[u8]) -> Result<String, StrategyError> {
        Text.from_bytes(bytes)
    }

    fn diff(&self, reference: &String, candidate: &String) -> Option<Difference> {
        Text.diff(reference, candidate)
    }
}

/// Filesystem whose directory creation always fails
pub struct ReadOnlyFs;

impl FileSystem for ReadOnlyFs {
    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only filesystem"))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        StdFileSystem.read(path)
    }

    fn write(&self, _path: &Path, _data: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only filesystem"))
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        StdFileSystem.list_dir(path)
    }

    fn exists(&self, path: &Path) -> bool {
        StdFileSystem.exists(path)
    }
}

/// Scratch workspace holding a pretend test source file and an artifacts dir
pub struct Workspace {
    pub tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            tmp: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn source_file(&self) -> PathBuf {
        self.tmp.path().join("tests").join("render.rs")
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.tmp.path().join("tests").join("__Snapshots__").join("render").join("linux")
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.tmp.path().join("artifacts")
    }

    pub fn config(&self) -> SnapshotConfig {
        SnapshotConfig {
            artifacts_dir: Some(self.artifacts_dir()),
            platform: Some("linux".to_string()),
            ..SnapshotConfig::default()
        }
    }

    pub fn engine(&self) -> SnapshotEngine {
        self.engine_with(self.config())
    }

    pub fn engine_with(&self, config: SnapshotConfig) -> SnapshotEngine {
        SnapshotEngine::new(config).expect("create engine")
    }
}
