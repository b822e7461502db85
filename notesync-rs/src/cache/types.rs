//! Identity index data structures.

use crate::types::ArtifactKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Index key: one file per identity and artifact kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct IndexKey {
    pub source_id: String,
    pub kind: ArtifactKind,
}

impl IndexKey {
    pub fn new(source_id: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            source_id: source_id.into(),
            kind,
        }
    }
}

/// Indexed file for a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    /// Store-relative path.
    pub path: PathBuf,
    /// Last known remote-updated timestamp.
    pub updated: Option<DateTime<Utc>>,
}

/// Flattened entry for display.
#[derive(Debug, Clone, Serialize)]
pub struct IndexRow {
    pub source_id: String,
    pub kind: ArtifactKind,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

/// What an upsert did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(PathBuf),
    Updated(PathBuf),
    /// Moved to a new path, then written.
    Moved { from: PathBuf, to: PathBuf },
    /// Not newer than the indexed copy; nothing written.
    Skipped(PathBuf),
}

impl UpsertOutcome {
    /// Path of the file after the upsert.
    pub fn path(&self) -> &Path {
        match self {
            UpsertOutcome::Created(path)
            | UpsertOutcome::Updated(path)
            | UpsertOutcome::Skipped(path) => path,
            UpsertOutcome::Moved { to, .. } => to,
        }
    }

    pub fn wrote(&self) -> bool {
        !matches!(self, UpsertOutcome::Skipped(_))
    }
}

/// Whether a remote timestamp is newer than the indexed one.
///
/// A document without a timestamp is never newer.
pub fn is_newer(remote: Option<DateTime<Utc>>, indexed: Option<DateTime<Utc>>) -> bool {
    match (remote, indexed) {
        (Some(remote), Some(indexed)) => remote > indexed,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
