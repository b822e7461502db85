//! Error types and exit codes for notesync.

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the `notesync` binary.
pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_PATTERN: i32 = 4;
    pub const INVALID_FRONTMATTER: i32 = 5;
    pub const SETUP_FAILED: i32 = 6;
    pub const MIGRATION_ISSUES: i32 = 10;
}

/// Main error type for notesync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Document {id} has no usable content")]
    ContentMissing { id: String },

    #[error("Invalid pattern variable '{{{token}}}' (valid variables: {valid})")]
    PatternValidation { token: String, valid: String },

    #[error("Failed to write {path}: {message}")]
    WriteFailure { path: PathBuf, message: String },

    #[error("Migration failed for {path}: {message}")]
    MigrationFailure { path: PathBuf, message: String },

    #[error("Sync setup failed: {0}")]
    SetupFailure(String),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] crate::types::FetchError),

    #[error("Note not found: {0}")]
    NoteNotFound(PathBuf),

    #[error("Note already exists: {0}")]
    NoteAlreadyExists(PathBuf),

    #[error("Invalid frontmatter in {path}: {message}")]
    InvalidFrontmatter { path: PathBuf, message: String },

    #[error("Vault not found at: {0}")]
    VaultNotFound(PathBuf),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Glob pattern error: {0}")]
    GlobPattern(#[from] glob::PatternError),
}

impl SyncError {
    /// Returns the appropriate exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            SyncError::PatternValidation { .. } => exit_code::INVALID_PATTERN,
            SyncError::InvalidFrontmatter { .. } => exit_code::INVALID_FRONTMATTER,
            SyncError::SetupFailure(_) => exit_code::SETUP_FAILED,
            _ => exit_code::GENERAL_ERROR,
        }
    }

    /// Wrap a store error as a write failure for `path`.
    pub fn write_failure(path: impl Into<PathBuf>, source: &SyncError) -> Self {
        SyncError::WriteFailure {
            path: path.into(),
            message: source.to_string(),
        }
    }

    /// Like [`SyncError::write_failure`], but keeps an existing write failure as is.
    pub fn into_write_failure(self, path: impl Into<PathBuf>) -> Self {
        match self {
            err @ SyncError::WriteFailure { .. } => err,
            other => SyncError::write_failure(path, &other),
        }
    }
}

/// Result type alias for notesync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    GeneralError,
    MigrationIssues,
}

impl ExitCode {
    /// Convert to exit code integer.
    pub fn code(self) -> i32 {
        match self {
            ExitCode::Success => exit_code::SUCCESS,
            ExitCode::GeneralError => exit_code::GENERAL_ERROR,
            ExitCode::MigrationIssues => exit_code::MIGRATION_ISSUES,
        }
    }
}
