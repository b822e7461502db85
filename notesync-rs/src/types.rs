//! Shared types for notesync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A document supplied by the remote source for one sync pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Stable, globally unique identity.
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,

    /// Body content tree, converted to markdown by a [`ContentConverter`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,

    /// Free-form notes the user typed privately during the meeting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_notes: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<String>,

    /// Hierarchical grouping hint (e.g. "Work/Clients/Acme").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_hint: Option<String>,
}

impl SourceDocument {
    /// Create a document with only an identity set.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: None,
            created: None,
            updated: None,
            body: None,
            private_notes: None,
            attendees: Vec::new(),
            folder_hint: None,
        }
    }

    /// The single date used for every date-dependent computation.
    ///
    /// `now` must be the clock captured at the start of the pass.
    pub fn effective_date(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.created.or(self.updated).unwrap_or(now)
    }

    /// Title with surrounding whitespace removed, if any remains.
    pub fn trimmed_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }
}

/// One utterance of a meeting transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    /// Who spoke (display name or a source label such as "microphone").
    pub speaker: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<DateTime<Utc>>,
}

/// Artifact category governing metadata and body shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArtifactKind {
    Note,
    Transcript,
    Combined,
    DayFragment,
}

impl ArtifactKind {
    /// The value stored in the `kind` metadata field.
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKind::Note => "note",
            ArtifactKind::Transcript => "transcript",
            ArtifactKind::Combined => "combined",
            ArtifactKind::DayFragment => "day-fragment",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "note" => Ok(ArtifactKind::Note),
            "transcript" => Ok(ArtifactKind::Transcript),
            "combined" => Ok(ArtifactKind::Combined),
            "day-fragment" => Ok(ArtifactKind::DayFragment),
            _ => Err(format!("Invalid artifact kind: {}", s)),
        }
    }
}

/// Computed file artifact. Never persisted separately; it *is* the file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub filename: String,
    pub content: String,
}

/// Opaque failure from a remote collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub message: String,
    /// HTTP-like status classification, when the source has one.
    pub status: Option<u16>,
}

impl FetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Whether the source rejected our credentials.
    pub fn is_auth(&self) -> bool {
        matches!(self.status, Some(401) | Some(403))
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {})", self.message, status),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for FetchError {}

/// Converts a document's body content tree to markdown. Pure and deterministic.
pub trait ContentConverter {
    fn to_markdown(&self, tree: &serde_json::Value) -> String;
}

/// Formats transcript entries into a markdown body.
pub trait TranscriptFormatter {
    fn format_body(&self, entries: &[TranscriptEntry]) -> String;
}

/// Supplies the batch of documents for a pass.
pub trait DocumentSource {
    fn fetch_documents(&self) -> std::result::Result<Vec<SourceDocument>, FetchError>;
}

/// Supplies the transcript of a single document.
pub trait TranscriptSource {
    fn fetch_transcript(&self, id: &str) -> std::result::Result<Vec<TranscriptEntry>, FetchError>;
}
