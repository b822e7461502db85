//! One sync pass: fetch, build, upsert, merge.

use crate::artifact::ArtifactBuilder;
use crate::cache::{IdentityIndex, UpsertOutcome};
use crate::config::{Destination, SyncConfig, TranscriptMode};
use crate::daily::{DayAggregator, DayLink};
use crate::error::{Result, SyncError};
use crate::path::PathResolver;
use crate::section::EditOutcome;
use crate::store::Store;
use crate::types::{
    ArtifactKind, ContentConverter, DocumentSource, SourceDocument, TranscriptFormatter,
    TranscriptSource,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Per-pass counts. File-level outcomes count each written artifact.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub created: usize,
    pub updated: usize,
    pub moved: usize,
    pub unchanged: usize,
    /// Documents without usable content.
    pub skipped: usize,
    pub failed: usize,
    /// Daily notes created or rewritten.
    pub days_written: usize,
}

impl SyncSummary {
    /// Files created, updated or moved.
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.moved + self.days_written
    }

    fn record(&mut self, outcome: &UpsertOutcome) {
        match outcome {
            UpsertOutcome::Created(_) => self.created += 1,
            UpsertOutcome::Updated(_) => self.updated += 1,
            UpsertOutcome::Moved { .. } => self.moved += 1,
            UpsertOutcome::Skipped(_) => self.unchanged += 1,
        }
    }

    fn record_error(&mut self, id: &str, err: &SyncError) {
        match err {
            SyncError::ContentMissing { .. } => {
                debug!(id, "skipping document without content");
                self.skipped += 1;
            }
            other => {
                warn!(id, error = %other, "document failed to sync");
                self.failed += 1;
            }
        }
    }
}

/// Runs sync passes against a store.
pub struct Synchronizer<'a> {
    config: &'a SyncConfig,
    converter: &'a dyn ContentConverter,
    formatter: &'a dyn TranscriptFormatter,
    transcripts: Option<&'a dyn TranscriptSource>,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        config: &'a SyncConfig,
        converter: &'a dyn ContentConverter,
        formatter: &'a dyn TranscriptFormatter,
    ) -> Self {
        Self {
            config,
            converter,
            formatter,
            transcripts: None,
        }
    }

    /// Source of transcripts for the `separate` and `combined` modes.
    pub fn with_transcripts(mut self, source: &'a dyn TranscriptSource) -> Self {
        self.transcripts = Some(source);
        self
    }

    /// Fetch documents and sync them. Setup failures abort before any write.
    pub fn run<S: Store + ?Sized>(
        &self,
        store: &mut S,
        source: &dyn DocumentSource,
        now: DateTime<Utc>,
    ) -> Result<SyncSummary> {
        self.config.validate()?;

        let documents = source
            .fetch_documents()
            .map_err(|e| SyncError::SetupFailure(format!("could not fetch documents: {}", e)))?;
        if documents.is_empty() {
            return Err(SyncError::SetupFailure("no documents returned".to_string()));
        }

        self.sync_documents(store, &documents, now)
    }

    /// Sync an already-fetched batch. `now` is the pass clock.
    pub fn sync_documents<S: Store + ?Sized>(
        &self,
        store: &mut S,
        documents: &[SourceDocument],
        now: DateTime<Utc>,
    ) -> Result<SyncSummary> {
        self.config.validate()?;

        let resolver = PathResolver::new(self.config, now);
        let builder = ArtifactBuilder::new(self.config, resolver, self.converter);
        let mut summary = SyncSummary::default();

        match self.config.destination {
            Destination::Individual => {
                let mut index = IdentityIndex::build(store)?;
                for document in documents {
                    self.sync_individual(store, &mut index, &builder, document, &mut summary);
                }
            }
            Destination::DailyLinks => {
                let mut index = IdentityIndex::build(store)?;
                let mut links = Vec::new();
                for document in documents {
                    if let Some(target) =
                        self.sync_individual(store, &mut index, &builder, document, &mut summary)
                    {
                        links.push(DayLink {
                            date: builder.resolver().effective_date(document),
                            target,
                            title: builder.resolver().display_title(document),
                        });
                    }
                }

                let aggregator = DayAggregator::new(&builder);
                for (day, links) in aggregator.group_links(links) {
                    let fragment = aggregator.link_fragment(&links);
                    self.merge(store, &aggregator, day, &fragment, &mut summary);
                }
            }
            Destination::DailyNotes => {
                let aggregator = DayAggregator::new(&builder);
                let days = aggregator.group_by_day(documents);
                let grouped: usize = days.values().map(Vec::len).sum();
                summary.skipped += documents.len() - grouped;

                for (day, notes) in days {
                    let fragment = aggregator.content_fragment(&notes);
                    self.merge(store, &aggregator, day, &fragment, &mut summary);
                }
            }
        }

        info!(
            created = summary.created,
            updated = summary.updated,
            moved = summary.moved,
            unchanged = summary.unchanged,
            skipped = summary.skipped,
            failed = summary.failed,
            days_written = summary.days_written,
            "sync pass finished"
        );
        Ok(summary)
    }

    fn merge<S: Store + ?Sized>(
        &self,
        store: &mut S,
        aggregator: &DayAggregator<'_, '_>,
        day: chrono::NaiveDate,
        fragment: &str,
        summary: &mut SyncSummary,
    ) {
        match aggregator.merge_day(store, day, fragment, self.config.force_overwrite) {
            Ok(EditOutcome::Created | EditOutcome::Written) => summary.days_written += 1,
            Ok(EditOutcome::Unchanged) => {}
            Err(e) => {
                warn!(%day, error = %e, "failed to merge day");
                summary.failed += 1;
            }
        }
    }

    /// Sync one document to its own file(s). Returns the note's path when it is
    /// in the store after the upsert.
    fn sync_individual<S: Store + ?Sized>(
        &self,
        store: &mut S,
        index: &mut IdentityIndex,
        builder: &ArtifactBuilder<'_>,
        document: &SourceDocument,
        summary: &mut SyncSummary,
    ) -> Option<PathBuf> {
        if let Err(e) = builder.ensure_content(document) {
            summary.record_error(&document.id, &e);
            return None;
        }

        let force = self.config.force_overwrite;
        let resolver = builder.resolver();

        let result = match self.config.transcripts {
            TranscriptMode::None => index.upsert(
                store,
                document,
                ArtifactKind::Note,
                || resolver.note_path(document),
                || Ok(builder.prepare_note(document, None)?.content),
                force,
            ),
            TranscriptMode::Separate => {
                let transcript = self.sync_transcript(store, index, builder, document, summary);
                index.upsert(
                    store,
                    document,
                    ArtifactKind::Note,
                    || resolver.note_path(document),
                    || Ok(builder.prepare_note(document, transcript.as_deref())?.content),
                    force,
                )
            }
            TranscriptMode::Combined => index.upsert(
                store,
                document,
                ArtifactKind::Combined,
                || resolver.note_path(document),
                || {
                    let body = self.transcript_body(document)?.unwrap_or_default();
                    Ok(builder.prepare_combined(document, &body)?.content)
                },
                force,
            ),
        };

        match result {
            Ok(outcome) => {
                summary.record(&outcome);
                Some(outcome.path().to_path_buf())
            }
            Err(e) => {
                summary.record_error(&document.id, &e);
                None
            }
        }
    }

    /// Upsert the separate transcript file. Returns its path when one exists.
    fn sync_transcript<S: Store + ?Sized>(
        &self,
        store: &mut S,
        index: &mut IdentityIndex,
        builder: &ArtifactBuilder<'_>,
        document: &SourceDocument,
        summary: &mut SyncSummary,
    ) -> Option<PathBuf> {
        if self.transcripts.is_none() {
            return None;
        }

        let resolver = builder.resolver();
        let result = index.upsert(
            store,
            document,
            ArtifactKind::Transcript,
            || resolver.transcript_path(document),
            || {
                let body = self.transcript_body(document)?.ok_or_else(|| {
                    SyncError::ContentMissing {
                        id: document.id.clone(),
                    }
                })?;
                Ok(builder.prepare_transcript(document, &body)?.content)
            },
            self.config.force_overwrite,
        );

        match result {
            Ok(outcome) => {
                summary.record(&outcome);
                Some(outcome.path().to_path_buf())
            }
            Err(SyncError::ContentMissing { .. }) => {
                debug!(id = %document.id, "no transcript available");
                index
                    .get(&document.id, ArtifactKind::Transcript)
                    .map(|entry| entry.path.clone())
            }
            Err(e) => {
                summary.record_error(&document.id, &e);
                None
            }
        }
    }

    /// Formatted transcript body, `None` when there is no source or no entries.
    fn transcript_body(&self, document: &SourceDocument) -> Result<Option<String>> {
        let Some(source) = self.transcripts else {
            return Ok(None);
        };
        let entries = source.fetch_transcript(&document.id)?;
        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(self.formatter.format_body(&entries)))
    }
}
