//! Triage configuration
//!
//! Loaded once at startup from a TOML file. Every key is optional; missing
//! keys take the defaults below, and a missing file means all defaults.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the device's `.metadata` / `.content` files
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,

    /// JSON file holding per-document observation records
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,

    /// Case-insensitive substrings that mark a document as a sent article
    #[serde(default = "default_source_patterns")]
    pub source_patterns: Vec<String>,

    /// Seconds between passes in daemon mode
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Minutes a document must sit unmodified before it is considered
    #[serde(default = "default_file_age_threshold")]
    pub file_age_threshold: u64,

    /// File moved documents under a dated sub-folder of the role folder
    #[serde(default)]
    pub organize_by_date: bool,

    /// strftime-style format for dated sub-folder names
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Drop observation records for documents that no longer exist
    #[serde(default = "default_true")]
    pub prune_orphaned_observations: bool,

    // Tables last so the struct serializes to valid TOML
    #[serde(default)]
    pub folders: FoldersConfig,

    #[serde(default)]
    pub reading_detection: ReadingDetectionConfig,

    #[serde(default)]
    pub archive_read_articles: ArchiveConfig,
}

/// Display names of the three role folders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldersConfig {
    #[serde(default = "default_to_read_folder")]
    pub to_read: String,

    #[serde(default = "default_read_folder")]
    pub read: String,

    #[serde(default = "default_archive_folder")]
    pub archive: String,
}

impl Default for FoldersConfig {
    fn default() -> Self {
        Self {
            to_read: default_to_read_folder(),
            read: default_read_folder(),
            archive: default_archive_folder(),
        }
    }
}

/// Thresholds used by the progress analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingDetectionConfig {
    /// Move documents out of "to read" once they look read
    #[serde(default = "default_true")]
    pub enable_auto_move: bool,

    /// Completion ratio at which a document counts as read
    #[serde(default = "default_pages_threshold")]
    pub pages_threshold: f64,

    /// Accumulated reading seconds at which a document counts as read
    #[serde(default = "default_time_threshold")]
    pub time_threshold: u64,

    /// Annotations plus >30% completion count as read
    #[serde(default = "default_true")]
    pub annotation_indicates_read: bool,
}

impl Default for ReadingDetectionConfig {
    fn default() -> Self {
        Self {
            enable_auto_move: true,
            pages_threshold: default_pages_threshold(),
            time_threshold: default_time_threshold(),
            annotation_indicates_read: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    #[serde(default)]
    pub enable: bool,

    /// Days since last opened before a read document is archived
    #[serde(default = "default_days_threshold")]
    pub days_threshold: u64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            enable: false,
            days_threshold: default_days_threshold(),
        }
    }
}

// Defaults
fn default_store_dir() -> PathBuf { PathBuf::from("/home/root/.local/share/remarkable/xochitl") }
fn default_state_file() -> PathBuf { PathBuf::from("/home/root/.rm-triage/reading_state.json") }
fn default_to_read_folder() -> String { "To Read".to_string() }
fn default_read_folder() -> String { "Read Articles".to_string() }
fn default_archive_folder() -> String { "Archived Articles".to_string() }
fn default_source_patterns() -> Vec<String> {
    vec![
        "read on remarkable".to_string(),
        "chrome extension".to_string(),
        "web article".to_string(),
    ]
}
fn default_poll_interval() -> u64 { 30 }
fn default_file_age_threshold() -> u64 { 5 }
fn default_date_format() -> String { "%Y-%m-%d".to_string() }
fn default_pages_threshold() -> f64 { 0.8 }
fn default_time_threshold() -> u64 { 300 } // 5 minutes
fn default_days_threshold() -> u64 { 30 }
fn default_true() -> bool { true }

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            state_file: default_state_file(),
            folders: FoldersConfig::default(),
            source_patterns: default_source_patterns(),
            poll_interval: default_poll_interval(),
            file_age_threshold: default_file_age_threshold(),
            organize_by_date: false,
            date_format: default_date_format(),
            reading_detection: ReadingDetectionConfig::default(),
            archive_read_articles: ArchiveConfig::default(),
            prune_orphaned_observations: true,
        }
    }
}

impl Config {
    /// Load the config file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Render this config as TOML (used by `init-config`)
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    /// Reject settings the triage engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval == 0 {
            return Err(ConfigError::Invalid("poll_interval must be at least 1 second".into()));
        }

        let threshold = self.reading_detection.pages_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::Invalid(format!(
                "reading_detection.pages_threshold must be within 0.0..=1.0, got {}",
                threshold
            )));
        }

        let names = [
            ("to_read", &self.folders.to_read),
            ("read", &self.folders.read),
            ("archive", &self.folders.archive),
        ];
        let mut seen = HashSet::new();
        for (key, name) in names {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("folders.{} must not be empty", key)));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "folders.{} reuses the folder name '{}'",
                    key, name
                )));
            }
        }

        if self.organize_by_date {
            let items = chrono::format::StrftimeItems::new(&self.date_format);
            if items.clone().any(|item| matches!(item, chrono::format::Item::Error)) {
                return Err(ConfigError::Invalid(format!(
                    "date_format '{}' is not a valid strftime format",
                    self.date_format
                )));
            }
        }

        Ok(())
    }
}
