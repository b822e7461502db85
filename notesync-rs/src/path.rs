//! Folder and filename computation.

use crate::config::{FolderPolicy, SyncConfig};
use crate::pattern::{
    fallback_title, format_moment, resolve_pattern, resolve_subfolder, sanitize_filename,
    sanitize_path, PatternVars,
};
use crate::types::SourceDocument;
use chrono::{DateTime, NaiveDate, Utc};
use std::path::PathBuf;

/// Resolves store paths for documents under one configuration and one pass clock.
#[derive(Debug, Clone)]
pub struct PathResolver<'a> {
    config: &'a SyncConfig,
    now: DateTime<Utc>,
}

impl<'a> PathResolver<'a> {
    /// `now` is the clock captured at the start of the pass.
    pub fn new(config: &'a SyncConfig, now: DateTime<Utc>) -> Self {
        Self { config, now }
    }

    pub fn config(&self) -> &'a SyncConfig {
        self.config
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn effective_date(&self, document: &SourceDocument) -> DateTime<Utc> {
        document.effective_date(self.now)
    }

    /// Sanitized title, falling back to a dated placeholder.
    pub fn title(&self, document: &SourceDocument) -> String {
        document
            .trimmed_title()
            .map(sanitize_filename)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| fallback_title(self.effective_date(document)))
    }

    /// Title as displayed in metadata and links: the raw trimmed title or the fallback.
    pub fn display_title(&self, document: &SourceDocument) -> String {
        document
            .trimmed_title()
            .map(str::to_string)
            .unwrap_or_else(|| fallback_title(self.effective_date(document)))
    }

    /// Folder for a document under the configured base-folder policy. Empty means the store root.
    pub fn resolve_folder(&self, document: &SourceDocument) -> String {
        let date = self.effective_date(document);

        match &self.config.folder {
            FolderPolicy::Integrated => {
                let formatted = format_moment(date, &self.config.daily.format);
                let segments: Vec<&str> = formatted.split('/').collect();
                let parent = segments[..segments.len().saturating_sub(1)].join("/");
                join_folders(&self.config.daily.folder, &parent)
            }
            FolderPolicy::Custom { folder, subfolder } => {
                let sub = resolve_subfolder(subfolder, date).unwrap_or_default();
                join_folders(folder, &sub)
            }
            FolderPolicy::SourceHierarchy { base_folder } => {
                let hint = document.folder_hint.as_deref().unwrap_or_default();
                join_folders(base_folder, hint)
            }
        }
    }

    /// File name (with `.md`) for a document under `pattern`.
    pub fn resolve_filename(&self, document: &SourceDocument, pattern: &str) -> String {
        let date = self.effective_date(document);
        let vars = PatternVars::new(self.title(document), date);
        let mut stem = resolve_pattern(pattern, &vars);
        if stem.is_empty() {
            stem = fallback_title(date);
        }
        format!("{}.md", stem)
    }

    pub fn note_path(&self, document: &SourceDocument) -> PathBuf {
        let filename = self.resolve_filename(document, &self.config.filename_pattern);
        join_path(&self.resolve_folder(document), &filename)
    }

    pub fn transcript_path(&self, document: &SourceDocument) -> PathBuf {
        let filename = self.resolve_filename(document, &self.config.transcript_filename_pattern);
        join_path(&self.resolve_folder(document), &filename)
    }

    /// Path of the daily note for `day`, from the daily-note folder and format.
    pub fn daily_note_path(&self, day: NaiveDate) -> PathBuf {
        let date = day.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
        let formatted = sanitize_path(&format_moment(date, &self.config.daily.format));
        let name = if formatted.is_empty() {
            day.format("%Y-%m-%d").to_string()
        } else {
            formatted
        };
        join_path(&sanitize_path(&self.config.daily.folder), &format!("{}.md", name))
    }
}

/// Join two folder paths, sanitizing both and dropping empty segments.
fn join_folders(base: &str, sub: &str) -> String {
    let base = sanitize_path(base);
    let sub = sanitize_path(sub);
    match (base.is_empty(), sub.is_empty()) {
        (true, _) => sub,
        (false, true) => base,
        (false, false) => format!("{}/{}", base, sub),
    }
}

fn join_path(folder: &str, filename: &str) -> PathBuf {
    if folder.is_empty() {
        PathBuf::from(filename)
    } else {
        PathBuf::from(folder).join(filename)
    }
}
