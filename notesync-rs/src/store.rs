//! Persisted-store abstraction.
//!
//! Paths are always relative to the store root. [`crate::vault::Vault`] is the
//! filesystem implementation; [`MemoryStore`] keeps everything in memory and is
//! what tests run against.

use crate::error::{Result, SyncError};
use crate::parser::parse_metadata;
use serde_yaml::Mapping;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// An in-memory, currently-open representation of a file, distinct from its persisted bytes.
pub trait LiveBuffer {
    /// Current text of the buffer.
    fn text(&self) -> String;

    /// Replace the byte range `range` of the current text with `text`.
    fn apply_range_edit(&mut self, range: Range<usize>, text: &str);
}

/// Persisted-store primitives used by the sync core.
pub trait Store {
    fn read(&self, path: &Path) -> Result<String>;

    /// Replace the whole file in a single operation, creating parent folders.
    fn write(&mut self, path: &Path, content: &str) -> Result<()>;

    /// Move a file. Fails if `to` exists.
    fn rename(&mut self, from: &Path, to: &Path) -> Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Every markdown document in the store, sorted.
    fn list_all(&self) -> Result<Vec<PathBuf>>;

    /// Parsed metadata block of a document, `None` when it has none.
    fn read_metadata(&self, path: &Path) -> Result<Option<Mapping>> {
        parse_metadata(&self.read(path)?, path)
    }

    /// The live buffer attached to `path`, if the host has one open.
    fn live_buffer(&mut self, _path: &Path) -> Option<&mut dyn LiveBuffer> {
        None
    }
}

/// A plain string-backed live buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    pub text: String,
    /// Number of range edits applied.
    pub edits: usize,
}

impl TextBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            edits: 0,
        }
    }
}

impl LiveBuffer for TextBuffer {
    fn text(&self) -> String {
        self.text.clone()
    }

    fn apply_range_edit(&mut self, range: Range<usize>, text: &str) {
        self.text.replace_range(range, text);
        self.edits += 1;
    }
}

/// In-memory store that counts writes and can simulate failures.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: BTreeMap<PathBuf, String>,
    live: HashMap<PathBuf, TextBuffer>,
    failing: HashSet<PathBuf>,
    /// Number of successful writes.
    pub writes: usize,
    /// Number of successful renames.
    pub renames: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file without counting it as a write.
    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    /// Persisted content of a file.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    /// Open a live buffer for an existing file, seeded from its persisted text.
    pub fn attach_live(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        let text = self.files.get(&path).cloned().unwrap_or_default();
        self.live.insert(path, TextBuffer::new(text));
    }

    /// The live buffer for a path, if attached.
    pub fn live(&self, path: impl AsRef<Path>) -> Option<&TextBuffer> {
        self.live.get(path.as_ref())
    }

    /// Make every future write or rename touching `path` fail.
    pub fn fail_writes_to(&mut self, path: impl Into<PathBuf>) {
        self.failing.insert(path.into());
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn check_writable(&self, path: &Path) -> Result<()> {
        if self.failing.contains(path) {
            return Err(SyncError::write_failure(
                path,
                &SyncError::Io(std::io::Error::other("simulated write failure")),
            ));
        }
        Ok(())
    }
}

impl Store for MemoryStore {
    fn read(&self, path: &Path) -> Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| SyncError::NoteNotFound(path.to_path_buf()))
    }

    fn write(&mut self, path: &Path, content: &str) -> Result<()> {
        self.check_writable(path)?;
        self.files.insert(path.to_path_buf(), content.to_string());
        self.writes += 1;
        Ok(())
    }

    fn rename(&mut self, from: &Path, to: &Path) -> Result<()> {
        self.check_writable(from)?;
        self.check_writable(to)?;
        if self.files.contains_key(to) {
            return Err(SyncError::NoteAlreadyExists(to.to_path_buf()));
        }
        let content = self
            .files
            .remove(from)
            .ok_or_else(|| SyncError::NoteNotFound(from.to_path_buf()))?;
        self.files.insert(to.to_path_buf(), content);
        if let Some(buffer) = self.live.remove(from) {
            self.live.insert(to.to_path_buf(), buffer);
        }
        self.renames += 1;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn list_all(&self) -> Result<Vec<PathBuf>> {
        Ok(self
            .files
            .keys()
            .filter(|p| p.extension().is_some_and(|e| e == "md"))
            .cloned()
            .collect())
    }

    fn live_buffer(&mut self, path: &Path) -> Option<&mut dyn LiveBuffer> {
        self.live.get_mut(path).map(|b| b as &mut dyn LiveBuffer)
    }
}

/// Wikilink target for a store path: `/` separators, `.md` stripped.
pub fn link_target(path: &Path) -> String {
    let text = path.to_string_lossy().replace('\\', "/");
    match text.strip_suffix(".md") {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}
