//! notesync - Sync remote meeting documents into a markdown vault.
//!
//! # Overview
//!
//! Each pass turns a batch of remote documents into files:
//! - One note per document, optionally with a separate or combined transcript
//! - Or a section of the daily note holding every document of that day
//! - Or one note per document plus a link list in the daily note
//!
//! Files are matched to documents by the `source_id` in their metadata block,
//! never by path, so renamed or moved files keep syncing. Daily-note sections
//! are merged in place without touching the rest of the file.
//!
//! # Example
//!
//! ```no_run
//! use chrono::Utc;
//! use notesync::{SyncConfig, Synchronizer, Vault};
//! # use notesync::{ContentConverter, DocumentSource, FetchError, SourceDocument,
//! #     TranscriptEntry, TranscriptFormatter};
//! # struct Converter;
//! # impl ContentConverter for Converter {
//! #     fn to_markdown(&self, _: &serde_json::Value) -> String { String::new() }
//! # }
//! # struct Formatter;
//! # impl TranscriptFormatter for Formatter {
//! #     fn format_body(&self, _: &[TranscriptEntry]) -> String { String::new() }
//! # }
//! # struct Remote;
//! # impl DocumentSource for Remote {
//! #     fn fetch_documents(&self) -> Result<Vec<SourceDocument>, FetchError> { Ok(Vec::new()) }
//! # }
//!
//! let config = SyncConfig::load("notesync.toml".as_ref()).unwrap();
//! let mut vault = Vault::new("/path/to/vault").unwrap();
//!
//! let sync = Synchronizer::new(&config, &Converter, &Formatter);
//! let summary = sync.run(&mut vault, &Remote, Utc::now()).unwrap();
//! println!("{} created, {} updated", summary.created, summary.updated);
//! ```

pub mod artifact;
pub mod cache;
pub mod cli;
pub mod config;
pub mod daily;
pub mod error;
pub mod escape;
pub mod migrate;
pub mod note;
pub mod parser;
pub mod path;
pub mod pattern;
pub mod section;
pub mod store;
pub mod sync;
pub mod types;
pub mod vault;

// Re-export main types at crate root
pub use artifact::ArtifactBuilder;
pub use cache::{IdentityIndex, UpsertOutcome};
pub use config::SyncConfig;
pub use daily::DayAggregator;
pub use error::{Result, SyncError};
pub use migrate::{MigrationReport, SchemaMigrator};
pub use note::Note;
pub use path::PathResolver;
pub use section::{EditOutcome, SectionEditor};
pub use store::{LiveBuffer, MemoryStore, Store};
pub use sync::{SyncSummary, Synchronizer};
pub use types::*;
pub use vault::Vault;
