//! Sync configuration.
//!
//! Loaded from TOML and passed by reference into every component; nothing reads
//! configuration from global state.
//!
//! ```toml
//! destination = "individual"
//! filename_pattern = "{date} {title}"
//! transcripts = "separate"
//! link_transcripts = true
//!
//! [folder]
//! policy = "custom"
//! folder = "Meetings"
//! subfolder = { kind = "month" }
//! ```

use crate::error::{Result, SyncError};
use crate::pattern::{validate_pattern, DATE_VARIABLES, VALID_VARIABLES};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where synced documents end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Destination {
    /// One file per document.
    #[default]
    Individual,
    /// Document bodies merged into a section of the daily note.
    DailyNotes,
    /// One file per document plus a link list in the daily note.
    DailyLinks,
}

/// How transcripts are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptMode {
    #[default]
    None,
    /// A transcript file next to each note.
    Separate,
    /// Transcript appended to the note in a single file.
    Combined,
}

/// Date-based subfolder below a custom folder.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SubfolderPattern {
    #[default]
    None,
    /// `2024-01-15`
    Day,
    /// `2024/01`
    Month,
    /// `2024-01`
    YearMonth,
    /// `2024/Q1`
    YearQuarter,
    /// Template over date variables, e.g. `{year}/{quarter}`.
    Custom { template: String },
}

/// Base-folder policy. Exactly one applies to a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "kebab-case")]
pub enum FolderPolicy {
    /// Folder derived from the daily-note date format (all segments but the last).
    Integrated,
    /// A fixed folder, optionally with a date subfolder.
    Custom {
        folder: String,
        #[serde(default)]
        subfolder: SubfolderPattern,
    },
    /// The document's own grouping hint below a base folder.
    SourceHierarchy { base_folder: String },
}

impl Default for FolderPolicy {
    fn default() -> Self {
        FolderPolicy::Custom {
            folder: "Meetings".to_string(),
            subfolder: SubfolderPattern::None,
        }
    }
}

/// Settings shared with the host's daily-note feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DailyConfig {
    /// Folder holding daily notes.
    pub folder: String,
    /// Moment-style date format used for daily-note paths.
    pub format: String,
    /// Text of the section heading documents are merged under.
    pub heading: String,
    /// Level of the section heading (1-6).
    pub heading_level: u8,
    /// Prefix link bullets with `HH:MM`.
    pub include_time: bool,
}

impl Default for DailyConfig {
    fn default() -> Self {
        Self {
            folder: String::new(),
            format: "YYYY-MM-DD".to_string(),
            heading: "Meetings".to_string(),
            heading_level: 2,
            include_time: true,
        }
    }
}

/// Full sync configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub destination: Destination,
    pub folder: FolderPolicy,
    pub filename_pattern: String,
    pub transcript_filename_pattern: String,
    pub transcripts: TranscriptMode,
    /// Add a backlink from each note to its separate transcript.
    pub link_transcripts: bool,
    pub include_private_notes: bool,
    pub daily: DailyConfig,
    /// Rewrite files even when the remote copy is unchanged.
    pub force_overwrite: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            destination: Destination::default(),
            folder: FolderPolicy::default(),
            filename_pattern: "{title}".to_string(),
            transcript_filename_pattern: "{title}-transcript".to_string(),
            transcripts: TranscriptMode::default(),
            link_transcripts: true,
            include_private_notes: false,
            daily: DailyConfig::default(),
            force_overwrite: false,
        }
    }
}

impl SyncConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every user-supplied pattern before anything is resolved.
    pub fn validate(&self) -> Result<()> {
        validate_pattern(&self.filename_pattern, VALID_VARIABLES)?;
        validate_pattern(&self.transcript_filename_pattern, VALID_VARIABLES)?;

        if let FolderPolicy::Custom {
            subfolder: SubfolderPattern::Custom { template },
            ..
        } = &self.folder
        {
            validate_pattern(template, DATE_VARIABLES)?;
        }

        if !(1..=6).contains(&self.daily.heading_level) {
            return Err(SyncError::ConfigError(format!(
                "daily.heading_level must be between 1 and 6 (got {})",
                self.daily.heading_level
            )));
        }
        if self.daily.heading.trim().is_empty() {
            return Err(SyncError::ConfigError(
                "daily.heading must not be empty".to_string(),
            ));
        }
        if self.daily.heading.contains(['\n', '\r']) {
            return Err(SyncError::ConfigError(
                "daily.heading must be a single line".to_string(),
            ));
        }
        if self.daily.format.trim().is_empty() {
            return Err(SyncError::ConfigError(
                "daily.format must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether notes should carry a backlink to a separate transcript.
    pub fn backlinks_enabled(&self) -> bool {
        self.link_transcripts && self.transcripts == TranscriptMode::Separate
    }
}
