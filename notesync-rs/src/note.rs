//! A stored document and accessors over its metadata block.

use crate::error::Result;
use crate::parser::{self, split_frontmatter};
use crate::store::Store;
use serde_yaml::Mapping;
use std::path::{Path, PathBuf};

/// A document read from a store.
#[derive(Debug, Clone)]
pub struct Note {
    /// Path relative to the store root (e.g., "Meetings/Standup.md").
    pub path: PathBuf,

    /// Raw content of the note.
    pub content: String,
}

impl Note {
    /// Create a new note from path and content.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    /// Read a note from a store.
    pub fn load<S: Store + ?Sized>(store: &S, path: &Path) -> Result<Self> {
        Ok(Self::new(path, store.read(path)?))
    }

    /// Raw YAML of the metadata block.
    pub fn frontmatter_raw(&self) -> Option<&str> {
        parser::extract_frontmatter(&self.content)
    }

    /// Parsed metadata block.
    pub fn metadata(&self) -> Result<Option<Mapping>> {
        parser::parse_metadata(&self.content, &self.path)
    }

    /// Content without the metadata block.
    pub fn body(&self) -> &str {
        split_frontmatter(&self.content).content
    }
}
