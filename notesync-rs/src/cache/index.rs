//! Identity index build and upsert.

use super::types::*;
use super::available_path;
use crate::artifact::parse_timestamp;
use crate::error::Result;
use crate::parser::get_str;
use crate::store::Store;
use crate::types::{ArtifactKind, SourceDocument};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Identity → file index for one pass.
#[derive(Debug, Default)]
pub struct IdentityIndex {
    entries: BTreeMap<IndexKey, IndexEntry>,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan every document in the store and index those carrying an identity.
    ///
    /// A document without `kind` is indexed as a note. When two files claim the
    /// same key, the first in path order wins.
    pub fn build<S: Store + ?Sized>(store: &S) -> Result<Self> {
        let mut index = Self::new();

        for path in store.list_all()? {
            let metadata = match store.read_metadata(&path) {
                Ok(Some(metadata)) => metadata,
                Ok(None) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable metadata");
                    continue;
                }
            };

            let Some(source_id) = get_str(&metadata, "source_id").filter(|s| !s.is_empty()) else {
                continue;
            };

            let kind = match get_str(&metadata, "kind") {
                None => ArtifactKind::Note,
                Some(kind) => match kind.parse::<ArtifactKind>() {
                    Ok(kind) => kind,
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "skipping unknown kind");
                        continue;
                    }
                },
            };

            let key = IndexKey::new(source_id, kind);
            if let Some(existing) = index.entries.get(&key) {
                warn!(
                    source_id,
                    %kind,
                    kept = %existing.path.display(),
                    ignored = %path.display(),
                    "duplicate identity"
                );
                continue;
            }

            let updated = get_str(&metadata, "updated").and_then(parse_timestamp);
            index.entries.insert(key, IndexEntry { path, updated });
        }

        debug!(entries = index.len(), "built identity index");
        Ok(index)
    }

    pub fn get(&self, source_id: &str, kind: ArtifactKind) -> Option<&IndexEntry> {
        self.entries.get(&IndexKey::new(source_id, kind))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&IndexKey, &IndexEntry)> {
        self.entries.iter()
    }

    pub fn rows(&self) -> Vec<IndexRow> {
        self.entries
            .iter()
            .map(|(key, entry)| IndexRow {
                source_id: key.source_id.clone(),
                kind: key.kind,
                path: entry.path.clone(),
                updated: entry.updated,
            })
            .collect()
    }

    /// Create, update, move or skip the file for `(document.id, kind)`.
    ///
    /// `compute_content` runs before any store mutation, so a document without
    /// usable content leaves the store untouched.
    pub fn upsert<S, P, C>(
        &mut self,
        store: &mut S,
        document: &SourceDocument,
        kind: ArtifactKind,
        compute_path: P,
        compute_content: C,
        force: bool,
    ) -> Result<UpsertOutcome>
    where
        S: Store + ?Sized,
        P: FnOnce() -> PathBuf,
        C: FnOnce() -> Result<String>,
    {
        let key = IndexKey::new(document.id.clone(), kind);

        let Some(entry) = self.entries.get(&key).cloned() else {
            let content = compute_content()?;
            let wanted = compute_path();
            let path = available_path(store, &wanted);
            if path != wanted {
                warn!(
                    wanted = %wanted.display(),
                    using = %path.display(),
                    "path occupied by an unrelated file"
                );
            }

            store
                .write(&path, &content)
                .map_err(|e| e.into_write_failure(&path))?;
            info!(id = %document.id, %kind, path = %path.display(), "created");
            self.entries.insert(
                key,
                IndexEntry {
                    path: path.clone(),
                    updated: document.updated,
                },
            );
            return Ok(UpsertOutcome::Created(path));
        };

        if !force && !is_newer(document.updated, entry.updated) {
            debug!(id = %document.id, %kind, "unchanged");
            return Ok(UpsertOutcome::Skipped(entry.path));
        }

        let content = compute_content()?;
        let current = entry.path;
        let wanted = compute_path();
        let path = self.relocate(store, &current, wanted)?;

        // A failed write keeps the indexed timestamp so the next pass retries.
        let written = store.write(&path, &content);
        self.entries.insert(
            key,
            IndexEntry {
                path: path.clone(),
                updated: if written.is_ok() {
                    document.updated
                } else {
                    entry.updated
                },
            },
        );
        written.map_err(|e| e.into_write_failure(&path))?;

        if path == current {
            info!(id = %document.id, %kind, path = %path.display(), "updated");
            Ok(UpsertOutcome::Updated(path))
        } else {
            info!(id = %document.id, %kind, from = %current.display(), to = %path.display(), "moved");
            Ok(UpsertOutcome::Moved {
                from: current,
                to: path,
            })
        }
    }

    /// Move `current` to `wanted` when it is free; otherwise stay put.
    fn relocate<S: Store + ?Sized>(
        &self,
        store: &mut S,
        current: &Path,
        wanted: PathBuf,
    ) -> Result<PathBuf> {
        if wanted == current {
            return Ok(wanted);
        }
        if !store.exists(current) {
            return Ok(wanted);
        }
        if store.exists(&wanted) {
            warn!(
                current = %current.display(),
                wanted = %wanted.display(),
                "rename target occupied, keeping current path"
            );
            return Ok(current.to_path_buf());
        }

        store
            .rename(current, &wanted)
            .map_err(|e| e.into_write_failure(current))?;
        Ok(wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;
    use crate::store::MemoryStore;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, 0, 0).unwrap()
    }

    fn note(id: &str, kind: &str, updated: &str) -> String {
        format!("---\nsource_id: \"{id}\"\ntitle: \"T\"\nkind: {kind}\nupdated: {updated}\nattendees: []\n---\n\nBody\n")
    }

    fn document(updated: DateTime<Utc>) -> SourceDocument {
        let mut doc = SourceDocument::new("d1");
        doc.updated = Some(updated);
        doc
    }

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert("Meetings/Standup.md", note("d1", "note", "2024-01-15T10:00:00Z"));
        store.insert("Meetings/Standup-transcript.md", note("d1", "transcript", "2024-01-15T10:00:00Z"));
        store.insert("Inbox/loose.md", "# no metadata\n");
        store.insert("Inbox/other.md", "---\ntitle: no identity\n---\n");
        store
    }

    #[test]
    fn test_build_indexes_identity_and_kind() {
        let index = IdentityIndex::build(&seeded()).unwrap();
        assert_eq!(index.len(), 2);
        let entry = index.get("d1", ArtifactKind::Note).unwrap();
        assert_eq!(entry.path, PathBuf::from("Meetings/Standup.md"));
        assert_eq!(entry.updated, Some(at(10)));
        assert!(index.get("d1", ArtifactKind::Transcript).is_some());
    }

    #[test]
    fn test_build_defaults_kind_and_ignores_broken() {
        let mut store = MemoryStore::new();
        store.insert("a.md", "---\nsource_id: legacy\n---\n");
        store.insert("b.md", "---\nsource_id: [unclosed\n---\n");
        store.insert("c.md", "---\nsource_id: x\nkind: summary\n---\n");
        let index = IdentityIndex::build(&store).unwrap();
        assert_eq!(index.len(), 1);
        assert!(index.get("legacy", ArtifactKind::Note).is_some());
    }

    #[test]
    fn test_build_keeps_first_duplicate() {
        let mut store = MemoryStore::new();
        store.insert("b.md", note("d1", "note", "2024-01-15T10:00:00Z"));
        store.insert("a.md", note("d1", "note", "2024-01-15T11:00:00Z"));
        let index = IdentityIndex::build(&store).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.get("d1", ArtifactKind::Note).unwrap().path, PathBuf::from("a.md"));
    }

    #[test]
    fn test_upsert_creates_absent() {
        let mut store = MemoryStore::new();
        let mut index = IdentityIndex::new();
        let outcome = index
            .upsert(
                &mut store,
                &document(at(10)),
                ArtifactKind::Note,
                || PathBuf::from("Standup.md"),
                || Ok("content".to_string()),
                false,
            )
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Created(PathBuf::from("Standup.md")));
        assert_eq!(store.get("Standup.md"), Some("content"));
        assert_eq!(index.get("d1", ArtifactKind::Note).unwrap().updated, Some(at(10)));
    }

    #[test]
    fn test_upsert_never_overwrites_unrelated_file() {
        let mut store = MemoryStore::new();
        store.insert("Standup.md", "my own notes");
        let mut index = IdentityIndex::build(&store).unwrap();
        let outcome = index
            .upsert(
                &mut store,
                &document(at(10)),
                ArtifactKind::Note,
                || PathBuf::from("Standup.md"),
                || Ok("synced".to_string()),
                false,
            )
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Created(PathBuf::from("Standup 1.md")));
        assert_eq!(store.get("Standup.md"), Some("my own notes"));
    }

    #[test]
    fn test_upsert_skips_unchanged() {
        let mut store = seeded();
        let mut index = IdentityIndex::build(&store).unwrap();
        let outcome = index
            .upsert(
                &mut store,
                &document(at(10)),
                ArtifactKind::Note,
                || PathBuf::from("Meetings/Standup.md"),
                || panic!("content must not be computed"),
                false,
            )
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Skipped(PathBuf::from("Meetings/Standup.md")));
        assert_eq!(store.writes, 0);
    }

    #[test]
    fn test_upsert_forced_rewrites() {
        let mut store = seeded();
        let mut index = IdentityIndex::build(&store).unwrap();
        let outcome = index
            .upsert(
                &mut store,
                &document(at(10)),
                ArtifactKind::Note,
                || PathBuf::from("Meetings/Standup.md"),
                || Ok("forced".to_string()),
                true,
            )
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated(PathBuf::from("Meetings/Standup.md")));
        assert_eq!(store.get("Meetings/Standup.md"), Some("forced"));
    }

    #[test]
    fn test_upsert_moves_on_path_change() {
        let mut store = seeded();
        let mut index = IdentityIndex::build(&store).unwrap();
        let outcome = index
            .upsert(
                &mut store,
                &document(at(11)),
                ArtifactKind::Note,
                || PathBuf::from("Meetings/Daily Standup.md"),
                || Ok("renamed".to_string()),
                false,
            )
            .unwrap();

        assert_eq!(
            outcome,
            UpsertOutcome::Moved {
                from: PathBuf::from("Meetings/Standup.md"),
                to: PathBuf::from("Meetings/Daily Standup.md"),
            }
        );
        assert!(!store.exists(Path::new("Meetings/Standup.md")));
        assert_eq!(store.get("Meetings/Daily Standup.md"), Some("renamed"));
        assert_eq!(
            index.get("d1", ArtifactKind::Note).unwrap().path,
            PathBuf::from("Meetings/Daily Standup.md")
        );
        assert_eq!(
            index.entries().filter(|(k, _)| k.source_id == "d1" && k.kind == ArtifactKind::Note).count(),
            1
        );
    }

    #[test]
    fn test_upsert_keeps_path_when_target_occupied() {
        let mut store = seeded();
        store.insert("Meetings/Retro.md", "someone else's file");
        let mut index = IdentityIndex::build(&store).unwrap();
        let outcome = index
            .upsert(
                &mut store,
                &document(at(11)),
                ArtifactKind::Note,
                || PathBuf::from("Meetings/Retro.md"),
                || Ok("new".to_string()),
                false,
            )
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated(PathBuf::from("Meetings/Standup.md")));
        assert_eq!(store.get("Meetings/Retro.md"), Some("someone else's file"));
        assert_eq!(store.get("Meetings/Standup.md"), Some("new"));
    }

    #[test]
    fn test_upsert_content_missing_leaves_store_untouched() {
        let mut store = seeded();
        let mut index = IdentityIndex::build(&store).unwrap();
        let result = index.upsert(
            &mut store,
            &document(at(11)),
            ArtifactKind::Note,
            || PathBuf::from("Meetings/Moved.md"),
            || Err(SyncError::ContentMissing { id: "d1".to_string() }),
            false,
        );
        assert!(matches!(result, Err(SyncError::ContentMissing { .. })));
        assert_eq!(store.writes + store.renames, 0);
    }

    #[test]
    fn test_upsert_write_failure() {
        let mut store = MemoryStore::new();
        store.fail_writes_to("Standup.md");
        let mut index = IdentityIndex::new();
        let result = index.upsert(
            &mut store,
            &document(at(10)),
            ArtifactKind::Note,
            || PathBuf::from("Standup.md"),
            || Ok("x".to_string()),
            false,
        );
        assert!(matches!(result, Err(SyncError::WriteFailure { .. })));
        assert!(index.is_empty());
    }

    #[test]
    fn test_upsert_failed_update_keeps_indexed_timestamp() {
        let mut store = seeded();
        let mut index = IdentityIndex::build(&store).unwrap();
        store.fail_writes_to("Meetings/Standup.md");

        let result = index.upsert(
            &mut store,
            &document(at(18)),
            ArtifactKind::Note,
            || PathBuf::from("Meetings/Standup.md"),
            || Ok("new".to_string()),
            false,
        );
        assert!(matches!(result, Err(SyncError::WriteFailure { .. })));
        let entry = index.get("d1", ArtifactKind::Note).unwrap();
        assert_eq!(entry.updated, Some(at(10)));
        assert_eq!(entry.path, PathBuf::from("Meetings/Standup.md"));

        // The same document is still due on the next attempt.
        let mut healthy = seeded();
        let outcome = index
            .upsert(
                &mut healthy,
                &document(at(18)),
                ArtifactKind::Note,
                || PathBuf::from("Meetings/Standup.md"),
                || Ok("new".to_string()),
                false,
            )
            .unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated(PathBuf::from("Meetings/Standup.md")));
        assert_eq!(index.get("d1", ArtifactKind::Note).unwrap().updated, Some(at(18)));
    }
}
