//! One-shot normalization of legacy metadata blocks.
//!
//! Legacy files either lack `kind` or mark transcripts by suffixing the
//! identity with `-transcript`. Migration rewrites only the affected lines of
//! the metadata block and leaves everything else byte-identical.

use crate::error::{Result, SyncError};
use crate::escape::quote_scalar;
use crate::note::Note;
use crate::parser::{get_str, parse_heading_line, parse_metadata};
use crate::section::SectionEditor;
use crate::store::Store;
use crate::types::ArtifactKind;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const TRANSCRIPT_SUFFIX: &str = "-transcript";

/// A file that could not be migrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationIssue {
    pub path: PathBuf,
    pub message: String,
}

/// Summary of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Documents examined.
    pub scanned: usize,
    /// Documents rewritten (or that would be, on a dry run).
    pub migrated: usize,
    pub failed: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<MigrationIssue>,
}

impl MigrationReport {
    fn record_failure(&mut self, err: SyncError) {
        warn!(error = %err, "migration failed");
        let (path, message) = match err {
            SyncError::MigrationFailure { path, message } => (path, message),
            other => (PathBuf::new(), other.to_string()),
        };
        self.failed += 1;
        self.issues.push(MigrationIssue { path, message });
    }
}

/// Rewrites legacy metadata in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaMigrator {
    dry_run: bool,
}

impl SchemaMigrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report what would change without writing.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Migrate every document in the store. Per-file failures are counted, not returned.
    pub fn migrate<S: Store + ?Sized>(&self, store: &mut S) -> Result<MigrationReport> {
        let mut report = MigrationReport::default();

        for path in store.list_all()? {
            report.scanned += 1;
            match self.migrate_file(store, &path) {
                Ok(true) => report.migrated += 1,
                Ok(false) => {}
                Err(e) => report.record_failure(e),
            }
        }

        info!(
            scanned = report.scanned,
            migrated = report.migrated,
            failed = report.failed,
            "migration finished"
        );
        Ok(report)
    }

    fn migrate_file<S: Store + ?Sized>(&self, store: &mut S, path: &Path) -> Result<bool> {
        let failure = |message: String| SyncError::MigrationFailure {
            path: path.to_path_buf(),
            message,
        };

        let note = Note::load(&*store, path).map_err(|e| failure(e.to_string()))?;
        let Some(block) = migrated_block(&note).map_err(|e| failure(e.to_string()))? else {
            return Ok(false);
        };

        if self.dry_run {
            debug!(path = %path.display(), "would migrate");
            return Ok(true);
        }

        SectionEditor::new(store)
            .replace_leading_block(path, &block)
            .map_err(|e| failure(e.to_string()))?;
        debug!(path = %path.display(), "migrated");
        Ok(true)
    }
}

/// Compute the migrated metadata block for `note`, or `None` when it is
/// already conformant or carries no identity.
pub fn migrated_block(note: &Note) -> Result<Option<String>> {
    let Some(metadata) = note.metadata()? else {
        return Ok(None);
    };
    let Some(source_id) = get_str(&metadata, "source_id") else {
        return Ok(None);
    };

    let (new_id, kind) = match source_id.strip_suffix(TRANSCRIPT_SUFFIX) {
        Some(stripped) if !stripped.is_empty() => {
            (Some(stripped.to_string()), ArtifactKind::Transcript)
        }
        _ if metadata.contains_key("kind") => return Ok(None),
        _ => (None, infer_kind(note.body())),
    };

    let yaml = note.frontmatter_raw().unwrap_or_default();
    let lines = rewrite_lines(yaml, new_id.as_deref(), kind);
    let block = format!("---\n{}\n---\n", lines.join("\n"));

    // The rewritten block must still parse.
    parse_metadata(&block, &note.path)?;
    Ok(Some(block))
}

/// `transcript` when the body opens with a heading mentioning transcripts.
fn infer_kind(body: &str) -> ArtifactKind {
    let first = body.lines().map(str::trim).find(|l| !l.is_empty());
    match first.and_then(parse_heading_line) {
        Some((_, text)) if text.to_lowercase().contains("transcript") => ArtifactKind::Transcript,
        _ => ArtifactKind::Note,
    }
}

fn is_key_line(line: &str, key: &str) -> bool {
    line.strip_prefix(key)
        .is_some_and(|rest| rest.starts_with(':'))
}

fn rewrite_lines(yaml: &str, new_id: Option<&str>, kind: ArtifactKind) -> Vec<String> {
    let kind_line = format!("kind: {}", kind);
    let has_kind = yaml.lines().any(|l| is_key_line(l, "kind"));

    let mut out = Vec::new();
    let mut lines = yaml.lines().peekable();
    while let Some(line) = lines.next() {
        if is_key_line(line, "kind") {
            out.push(kind_line.clone());
            continue;
        }
        if !is_key_line(line, "source_id") {
            out.push(line.to_string());
            continue;
        }

        match new_id {
            Some(id) => {
                out.push(format!("source_id: {}", quote_scalar(id)));
                // Drop continuation lines of a multi-line value.
                while lines.next_if(|l| l.starts_with(' ') || l.starts_with('\t')).is_some() {}
            }
            None => {
                out.push(line.to_string());
                while let Some(cont) = lines.next_if(|l| l.starts_with(' ') || l.starts_with('\t')) {
                    out.push(cont.to_string());
                }
            }
        }
        if !has_kind {
            out.push(kind_line.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_legacy_transcript_suffix() {
        let content = "---\nsource_id: x-transcript\ntitle: \"Standup\"\n---\n\n# Transcript\n\nhi\n";
        let block = migrated_block(&Note::new("a.md", content)).unwrap().unwrap();
        assert_eq!(block, "---\nsource_id: \"x\"\nkind: transcript\ntitle: \"Standup\"\n---\n");
    }

    #[test]
    fn test_suffix_overrides_existing_kind() {
        let content = "---\nsource_id: \"x-transcript\"\nkind: note\n---\n";
        let block = migrated_block(&Note::new("a.md", content)).unwrap().unwrap();
        assert_eq!(block, "---\nsource_id: \"x\"\nkind: transcript\n---\n");
    }

    #[test]
    fn test_missing_kind_inferred_from_heading() {
        let transcript = "---\nsource_id: d1\n---\n\n\n## Meeting Transcript\n";
        let block = migrated_block(&Note::new("a.md", transcript)).unwrap().unwrap();
        assert_eq!(block, "---\nsource_id: d1\nkind: transcript\n---\n");

        let note = "---\nsource_id: d1\nattendees: []\n---\n\nNotes about the transcript\n";
        let block = migrated_block(&Note::new("a.md", note)).unwrap().unwrap();
        assert_eq!(block, "---\nsource_id: d1\nkind: note\nattendees: []\n---\n");
    }

    #[test]
    fn test_conformant_and_foreign_files_untouched() {
        let conformant = "---\nsource_id: d1\nkind: note\n---\n\nBody";
        assert_eq!(migrated_block(&Note::new("a.md", conformant)).unwrap(), None);
        assert_eq!(migrated_block(&Note::new("a.md", "---\ntitle: x\n---\n")).unwrap(), None);
        assert_eq!(migrated_block(&Note::new("a.md", "no metadata")).unwrap(), None);
    }

    #[test]
    fn test_bare_suffix_is_not_stripped() {
        let content = "---\nsource_id: \"-transcript\"\n---\n";
        let block = migrated_block(&Note::new("a.md", content)).unwrap().unwrap();
        assert!(block.contains("source_id: \"-transcript\"\nkind: note"));
    }

    #[test]
    fn test_migrate_store_counts_and_preserves_body() {
        let mut store = MemoryStore::new();
        store.insert("a.md", "---\nsource_id: x-transcript\n---\n\n# Transcript\n\nBody stays.\n");
        store.insert("b.md", "---\nsource_id: d2\nkind: note\n---\n\nFine\n");
        store.insert("c.md", "---\nsource_id: [broken\n---\n");
        store.insert("d.md", "plain");

        let report = SchemaMigrator::new().migrate(&mut store).unwrap();
        assert_eq!(report.scanned, 4);
        assert_eq!(report.migrated, 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.issues[0].path, PathBuf::from("c.md"));
        assert_eq!(store.writes, 1);
        assert_eq!(
            store.get("a.md"),
            Some("---\nsource_id: \"x\"\nkind: transcript\n---\n\n# Transcript\n\nBody stays.\n")
        );

        // Second run: nothing left to do.
        let report = SchemaMigrator::new().migrate(&mut store).unwrap();
        assert_eq!(report.migrated, 0);
        assert_eq!(store.writes, 1);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let mut store = MemoryStore::new();
        store.insert("a.md", "---\nsource_id: d1\n---\n");
        let report = SchemaMigrator::new().dry_run(true).migrate(&mut store).unwrap();
        assert_eq!(report.migrated, 1);
        assert_eq!(store.writes, 0);
    }

    #[test]
    fn test_write_failure_is_counted() {
        let mut store = MemoryStore::new();
        store.insert("a.md", "---\nsource_id: d1\n---\n");
        store.insert("b.md", "---\nsource_id: d2\n---\n");
        store.fail_writes_to("a.md");
        let report = SchemaMigrator::new().migrate(&mut store).unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.migrated, 1);
        assert!(store.get("b.md").unwrap().contains("kind: note"));
    }
}
