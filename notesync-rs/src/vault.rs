//! Filesystem-backed store rooted at a vault directory.

use crate::error::{Result, SyncError};
use crate::store::Store;
use glob::glob;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A markdown vault on disk.
#[derive(Debug, Clone)]
pub struct Vault {
    /// Root path of the vault.
    pub root: PathBuf,
}

impl Vault {
    /// Open an existing vault directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();

        if !root.is_dir() {
            return Err(SyncError::VaultNotFound(root));
        }

        Ok(Self { root })
    }

    /// Get the full path to a note.
    pub fn note_path(&self, relative_path: &Path) -> PathBuf {
        self.root.join(relative_path)
    }

    /// Check if a note exists.
    pub fn note_exists(&self, relative_path: &Path) -> bool {
        self.note_path(relative_path).is_file()
    }

    /// List all markdown files in the vault, skipping hidden files and directories.
    pub fn list_notes(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.root.join("**/*.md");
        let pattern_str = pattern.to_string_lossy();

        let mut notes = Vec::new();

        for entry in glob(&pattern_str)? {
            match entry {
                Ok(path) => {
                    if let Ok(relative) = path.strip_prefix(&self.root) {
                        if !relative
                            .components()
                            .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
                        {
                            notes.push(relative.to_path_buf());
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "glob error while listing notes");
                }
            }
        }

        notes.sort();
        Ok(notes)
    }
}

/// Atomic write: write to a hidden temp file beside `path`, then rename over it.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| SyncError::write_failure(path, &SyncError::NoteNotFound(path.to_path_buf())))?;
    fs::create_dir_all(parent)?;

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{}.tmp.{}", file_name, std::process::id()));

    fs::write(&temp_path, contents)?;

    fs::rename(&temp_path, path).map_err(|e| {
        // Clean up temp file on failure
        let _ = fs::remove_file(&temp_path);
        SyncError::Io(e)
    })?;

    Ok(())
}

impl Store for Vault {
    fn read(&self, path: &Path) -> Result<String> {
        if !self.note_exists(path) {
            return Err(SyncError::NoteNotFound(path.to_path_buf()));
        }
        Ok(fs::read_to_string(self.note_path(path))?)
    }

    fn write(&mut self, path: &Path, content: &str) -> Result<()> {
        atomic_write(&self.note_path(path), content.as_bytes())
            .map_err(|e| e.into_write_failure(path))
    }

    fn rename(&mut self, from: &Path, to: &Path) -> Result<()> {
        if !self.note_exists(from) {
            return Err(SyncError::NoteNotFound(from.to_path_buf()));
        }
        if self.note_exists(to) {
            return Err(SyncError::NoteAlreadyExists(to.to_path_buf()));
        }

        let to_full = self.note_path(to);
        if let Some(parent) = to_full.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::rename(self.note_path(from), to_full)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.note_exists(path)
    }

    fn list_all(&self) -> Result<Vec<PathBuf>> {
        self.list_notes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_vault() -> (TempDir, Vault) {
        let temp_dir = TempDir::new().unwrap();
        let vault = Vault::new(temp_dir.path()).unwrap();

        fs::write(temp_dir.path().join("note1.md"), "# Note 1").unwrap();
        fs::write(
            temp_dir.path().join("note2.md"),
            "---\nsource_id: \"d1\"\nkind: note\n---\n\n# Note 2",
        )
        .unwrap();
        fs::create_dir(temp_dir.path().join("Meetings")).unwrap();
        fs::write(temp_dir.path().join("Meetings/standup.md"), "# Standup").unwrap();
        fs::create_dir(temp_dir.path().join(".obsidian")).unwrap();
        fs::write(temp_dir.path().join(".obsidian/workspace.md"), "hidden").unwrap();
        fs::write(temp_dir.path().join("image.png"), "binary").unwrap();

        (temp_dir, vault)
    }

    #[test]
    fn test_vault_not_found() {
        assert!(matches!(
            Vault::new("/nonexistent/vault/path"),
            Err(SyncError::VaultNotFound(_))
        ));
    }

    #[test]
    fn test_list_notes_skips_hidden() {
        let (_temp, vault) = create_test_vault();
        let notes = vault.list_all().unwrap();
        assert_eq!(
            notes,
            vec![
                PathBuf::from("Meetings/standup.md"),
                PathBuf::from("note1.md"),
                PathBuf::from("note2.md"),
            ]
        );
    }

    #[test]
    fn test_write_creates_parent_folders() {
        let (temp, mut vault) = create_test_vault();
        let path = Path::new("Meetings/2024/Q1/Standup.md");
        vault.write(path, "hello").unwrap();
        assert_eq!(fs::read_to_string(temp.path().join(path)).unwrap(), "hello");
        assert_eq!(vault.read(path).unwrap(), "hello");
    }

    #[test]
    fn test_write_leaves_no_temp_files() {
        let (temp, mut vault) = create_test_vault();
        vault.write(Path::new("note1.md"), "replaced").unwrap();
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
        assert_eq!(vault.read(Path::new("note1.md")).unwrap(), "replaced");
    }

    #[test]
    fn test_rename() {
        let (_temp, mut vault) = create_test_vault();
        vault
            .rename(Path::new("note1.md"), Path::new("Archive/note1.md"))
            .unwrap();
        assert!(!vault.exists(Path::new("note1.md")));
        assert!(vault.exists(Path::new("Archive/note1.md")));

        let err = vault
            .rename(Path::new("note2.md"), Path::new("Meetings/standup.md"))
            .unwrap_err();
        assert!(matches!(err, SyncError::NoteAlreadyExists(_)));
    }

    #[test]
    fn test_read_missing() {
        let (_temp, vault) = create_test_vault();
        assert!(matches!(
            vault.read(Path::new("missing.md")),
            Err(SyncError::NoteNotFound(_))
        ));
    }

    #[test]
    fn test_read_metadata() {
        let (_temp, vault) = create_test_vault();
        let meta = vault.read_metadata(Path::new("note2.md")).unwrap().unwrap();
        assert_eq!(meta.get("source_id").and_then(|v| v.as_str()), Some("d1"));
        assert!(vault.read_metadata(Path::new("note1.md")).unwrap().is_none());
    }
}
