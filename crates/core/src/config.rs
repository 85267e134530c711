//! Process-wide snapshot configuration

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{SnapshotError, SnapshotResult};

/// Default time a strategy gets to produce an artifact.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment variable naming a TOML config file.
pub const ENV_CONFIG: &str = "SNAPSHOT_CONFIG";
/// Environment variable switching record mode on for every assertion.
pub const ENV_RECORD: &str = "SNAPSHOT_RECORD";
/// Environment variable holding the external diff tool command.
pub const ENV_DIFF_TOOL: &str = "SNAPSHOT_DIFF_TOOL";
/// Environment variable overriding the failed-artifact directory.
pub const ENV_ARTIFACTS: &str = "SNAPSHOT_ARTIFACTS";
/// Environment variable overriding the render timeout, in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "SNAPSHOT_TIMEOUT_MS";
/// Environment variable overriding the platform subdirectory (empty disables it).
pub const ENV_PLATFORM: &str = "SNAPSHOT_PLATFORM";

/// Snapshot configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotConfig {
    /// Record every reference instead of comparing
    pub record: bool,

    /// External diff tool, e.g. `ksdiff`
    pub diff_tool: Option<String>,

    /// Where failing candidates are written (system temp dir when unset)
    pub artifacts_dir: Option<PathBuf>,

    /// Default render timeout in milliseconds
    pub timeout_ms: u64,

    /// Platform subdirectory under each snapshot directory; written as an
    /// empty string in files when disabled
    #[serde(
        serialize_with = "serialize_platform",
        deserialize_with = "deserialize_platform"
    )]
    pub platform: Option<String>,
}

fn serialize_platform<S: Serializer>(platform: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(platform.as_deref().unwrap_or(""))
}

fn deserialize_platform<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let platform = String::deserialize(d)?;
    Ok(Some(platform).filter(|p| !p.trim().is_empty()))
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            record: false,
            diff_tool: None,
            artifacts_dir: None,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            platform: Some(current_platform().to_string()),
        }
    }
}

impl SnapshotConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> SnapshotResult<Self> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(SnapshotError::io("Couldn't read", path))?;
            toml::from_str(&content)
                .map_err(|e| SnapshotError::Config(format!("{}: {}", path.display(), e)))
        } else {
            Ok(Self::default())
        }
    }

    /// Configuration from `SNAPSHOT_CONFIG` (if set) overlaid with the other
    /// `SNAPSHOT_*` variables.
    pub fn from_env() -> SnapshotResult<Self> {
        let mut config = match std::env::var_os(ENV_CONFIG) {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_vars(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Overlay values from a variable lookup.
    pub fn apply_vars(&mut self, lookup: impl Fn(&str) -> Option<String>) -> SnapshotResult<()> {
        if let Some(value) = lookup(ENV_RECORD) {
            self.record = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "all"
            );
        }
        if let Some(tool) = lookup(ENV_DIFF_TOOL) {
            self.diff_tool = Some(tool).filter(|t| !t.trim().is_empty());
        }
        if let Some(dir) = lookup(ENV_ARTIFACTS) {
            self.artifacts_dir = Some(PathBuf::from(dir));
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            self.timeout_ms = value.trim().parse().map_err(|_| {
                SnapshotError::Config(format!(
                    "{} must be a number of milliseconds, got {:?}",
                    ENV_TIMEOUT_MS, value
                ))
            })?;
        }
        if let Some(platform) = lookup(ENV_PLATFORM) {
            self.platform = Some(platform).filter(|p| !p.trim().is_empty());
        }
        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> SnapshotResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| SnapshotError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(SnapshotError::io("Couldn't create directory", parent))?;
        }
        std::fs::write(path, content).map_err(SnapshotError::io("Couldn't write", path))
    }

    /// Default render timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Directory failing candidates are written under
    pub fn artifacts_dir(&self) -> PathBuf {
        self.artifacts_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Platform tag of the running process (`linux`, `macos`, `windows`, ...).
pub fn current_platform() -> &'static str {
    std::env::consts::OS
}
