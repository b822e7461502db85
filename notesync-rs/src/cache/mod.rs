//! Identity-keyed index over the store.
//!
//! Built from every document's metadata block at the start of a pass and
//! dropped at the end of it. The files themselves are ground truth; the index
//! is never persisted.

mod index;
mod types;

pub use index::IdentityIndex;
pub use types::*;

use crate::store::Store;
use std::path::{Path, PathBuf};

/// First free path among `path`, `Name 1.md`, `Name 2.md`, ...
pub fn available_path<S: Store + ?Sized>(store: &S, path: &Path) -> PathBuf {
    if !store.exists(path) {
        return path.to_path_buf();
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut n = 1;
    loop {
        let candidate = path.with_file_name(format!("{} {}{}", stem, n, extension));
        if !store.exists(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
