//! Metadata block and body construction for every artifact shape.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::escape::{quote_scalar, quote_wikilink, render_sequence};
use crate::parser::{format_heading, format_nested_heading, nest_headings};
use crate::path::PathResolver;
use crate::store::link_target;
use crate::types::{Artifact, ArtifactKind, ContentConverter, SourceDocument};
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;

/// Heading level of top-level sections inside standalone artifacts.
pub const NOTE_HEADING_LEVEL: u8 = 2;

/// Attendee placeholder the source uses for unresolved people.
const UNKNOWN_ATTENDEE: &str = "Unknown";

/// Render a timestamp the way metadata blocks store it.
///
/// Sub-second precision is kept so stored values compare equal to the source.
pub fn format_timestamp(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parse a stored timestamp. Accepts any RFC 3339 offset.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Ordered metadata fields of an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub source_id: String,
    pub title: String,
    pub kind: ArtifactKind,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub attendees: Vec<String>,
    /// Store path of the linked transcript.
    pub transcript: Option<String>,
}

impl MetadataRecord {
    /// Render the `---` delimited block, including the closing delimiter's newline.
    pub fn render(&self) -> String {
        let mut lines = vec![
            "---".to_string(),
            format!("source_id: {}", quote_scalar(&self.source_id)),
            format!("title: {}", quote_scalar(&self.title)),
            format!("kind: {}", self.kind),
        ];
        if let Some(created) = self.created {
            lines.push(format!("created: {}", format_timestamp(created)));
        }
        if let Some(updated) = self.updated {
            lines.push(format!("updated: {}", format_timestamp(updated)));
        }
        lines.push(render_sequence("attendees", &self.attendees));
        if let Some(transcript) = &self.transcript {
            lines.push(format!("transcript: {}", quote_wikilink(transcript)));
        }
        lines.push("---".to_string());

        let mut block = lines.join("\n");
        block.push('\n');
        block
    }
}

/// One document prepared for a day's content fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayNote {
    pub metadata: MetadataRecord,
    pub date: DateTime<Utc>,
    /// Body built one heading level below the note's sub-heading.
    pub body: String,
}

/// Builds artifacts for one pass.
pub struct ArtifactBuilder<'a> {
    config: &'a SyncConfig,
    resolver: PathResolver<'a>,
    converter: &'a dyn ContentConverter,
}

impl<'a> ArtifactBuilder<'a> {
    pub fn new(
        config: &'a SyncConfig,
        resolver: PathResolver<'a>,
        converter: &'a dyn ContentConverter,
    ) -> Self {
        Self {
            config,
            resolver,
            converter,
        }
    }

    pub fn resolver(&self) -> &PathResolver<'a> {
        &self.resolver
    }

    /// Fail with `ContentMissing` unless the document has a usable content tree.
    pub fn ensure_content(&self, document: &SourceDocument) -> Result<()> {
        self.content_tree(document).map(|_| ())
    }

    /// The document's content tree, if it has the `{"type": "doc", "content": [...]}` shape.
    fn content_tree<'d>(&self, document: &'d SourceDocument) -> Result<&'d serde_json::Value> {
        let missing = || SyncError::ContentMissing {
            id: document.id.clone(),
        };
        let tree = document.body.as_ref().ok_or_else(missing)?;
        let is_doc = tree.get("type").and_then(|t| t.as_str()) == Some("doc");
        let has_content = tree.get("content").is_some_and(|c| c.is_array());
        if is_doc && has_content {
            Ok(tree)
        } else {
            Err(missing())
        }
    }

    /// Metadata for `kind`. The backlink is kept only for notes with transcript linking on.
    pub fn build_metadata(
        &self,
        document: &SourceDocument,
        kind: ArtifactKind,
        backlink: Option<&Path>,
    ) -> MetadataRecord {
        let mut attendees: Vec<String> = Vec::new();
        for attendee in &document.attendees {
            let attendee = attendee.trim();
            if attendee.is_empty() || attendee == UNKNOWN_ATTENDEE {
                continue;
            }
            if !attendees.iter().any(|a| a == attendee) {
                attendees.push(attendee.to_string());
            }
        }

        let transcript = backlink
            .filter(|_| kind == ArtifactKind::Note && self.config.backlinks_enabled())
            .map(link_target);

        MetadataRecord {
            source_id: document.id.clone(),
            title: self.resolver.display_title(document),
            kind,
            created: document.created,
            updated: document.updated,
            attendees,
            transcript,
        }
    }

    /// Converted body, optionally preceded by the private notes.
    pub fn build_body(&self, document: &SourceDocument, heading_level: u8) -> Result<String> {
        self.assemble_body(document, heading_level as usize, None)
    }

    /// Body with its section headings at `heading_level`.
    ///
    /// With `floor` set, headings inside the converted content are pushed to it.
    fn assemble_body(
        &self,
        document: &SourceDocument,
        heading_level: usize,
        floor: Option<usize>,
    ) -> Result<String> {
        let tree = self.content_tree(document)?;
        let converted = self.converter.to_markdown(tree);
        let converted = match floor {
            Some(floor) => nest_headings(converted.trim(), floor),
            None => converted.trim().to_string(),
        };

        let private_notes = document
            .private_notes
            .as_deref()
            .map(str::trim)
            .filter(|n| self.config.include_private_notes && !n.is_empty());

        let body = match private_notes {
            Some(notes) => {
                let mut body = format!(
                    "{}\n\n{}\n\n{}",
                    format_nested_heading(heading_level, "Private Notes"),
                    notes,
                    format_nested_heading(heading_level, "Enhanced Notes")
                );
                if !converted.is_empty() {
                    body.push_str("\n\n");
                    body.push_str(&converted);
                }
                body
            }
            None => converted,
        };
        Ok(body)
    }

    /// Standalone note, with a backlink to `transcript` when linking applies.
    pub fn prepare_note(
        &self,
        document: &SourceDocument,
        transcript: Option<&Path>,
    ) -> Result<Artifact> {
        let body = self.build_body(document, NOTE_HEADING_LEVEL)?;
        let metadata = self.build_metadata(document, ArtifactKind::Note, transcript);
        Ok(Artifact {
            kind: ArtifactKind::Note,
            filename: self
                .resolver
                .resolve_filename(document, &self.config.filename_pattern),
            content: compose(&metadata, &body),
        })
    }

    /// Standalone transcript wrapping a pre-formatted transcript body.
    pub fn prepare_transcript(
        &self,
        document: &SourceDocument,
        transcript_body: &str,
    ) -> Result<Artifact> {
        self.content_tree(document)?;
        let metadata = self.build_metadata(document, ArtifactKind::Transcript, None);
        let body = format!("{}\n\n{}", format_heading(1, "Transcript"), transcript_body.trim());
        Ok(Artifact {
            kind: ArtifactKind::Transcript,
            filename: self
                .resolver
                .resolve_filename(document, &self.config.transcript_filename_pattern),
            content: compose(&metadata, &body),
        })
    }

    /// Note and transcript in one file. Never carries a backlink.
    pub fn prepare_combined(
        &self,
        document: &SourceDocument,
        transcript_body: &str,
    ) -> Result<Artifact> {
        let notes = self.build_body(document, NOTE_HEADING_LEVEL)?;
        let metadata = self.build_metadata(document, ArtifactKind::Combined, None);

        let mut body = notes;
        if !body.is_empty() {
            body.push_str("\n\n");
        }
        body.push_str(&format_heading(NOTE_HEADING_LEVEL, "Transcript"));
        body.push_str("\n\n");
        body.push_str(transcript_body.trim());

        Ok(Artifact {
            kind: ArtifactKind::Combined,
            filename: self
                .resolver
                .resolve_filename(document, &self.config.filename_pattern),
            content: compose(&metadata, &body),
        })
    }

    /// Metadata and body for embedding under a day's section heading.
    pub fn extract_for_day_fragment(&self, document: &SourceDocument) -> Result<DayNote> {
        // Two below the section: one for the note's sub-heading, one for its body.
        let level = self.config.daily.heading_level as usize + 2;
        let body = self.assemble_body(document, level, Some(level))?;
        Ok(DayNote {
            metadata: self.build_metadata(document, ArtifactKind::DayFragment, None),
            date: self.resolver.effective_date(document),
            body,
        })
    }
}

fn compose(metadata: &MetadataRecord, body: &str) -> String {
    let block = metadata.render();
    let body = body.trim_end();
    if body.is_empty() {
        block
    } else {
        format!("{}\n{}\n", block, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscriptMode;
    use crate::parser::parse_metadata;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    /// Joins the `text` of every top-level node, one paragraph each.
    struct TextConverter;

    impl ContentConverter for TextConverter {
        fn to_markdown(&self, tree: &serde_json::Value) -> String {
            tree["content"]
                .as_array()
                .map(|nodes| {
                    nodes
                        .iter()
                        .filter_map(|n| n["text"].as_str())
                        .collect::<Vec<_>>()
                        .join("\n\n")
                })
                .unwrap_or_default()
        }
    }

    fn jan15(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, 0, 0).unwrap()
    }

    fn standup() -> SourceDocument {
        let mut doc = SourceDocument::new("d1");
        doc.title = Some("Standup \"daily\"".to_string());
        doc.created = Some(jan15(9));
        doc.updated = Some(jan15(10));
        doc.attendees = vec![
            "Ana".to_string(),
            "Unknown".to_string(),
            "Bo".to_string(),
            "Ana".to_string(),
        ];
        doc.body = Some(json!({"type": "doc", "content": [{"text": "Agreed on scope."}]}));
        doc
    }

    fn builder_for(config: &SyncConfig) -> ArtifactBuilder<'_> {
        ArtifactBuilder::new(config, PathResolver::new(config, jan15(12)), &TextConverter)
    }

    #[test]
    fn test_metadata_field_order() {
        let config = SyncConfig {
            transcripts: TranscriptMode::Separate,
            ..SyncConfig::default()
        };
        let builder = builder_for(&config);
        let record = builder.build_metadata(
            &standup(),
            ArtifactKind::Note,
            Some(Path::new("Meetings/Standup-transcript.md")),
        );
        assert_eq!(
            record.render(),
            "---\n\
             source_id: \"d1\"\n\
             title: \"Standup \\\"daily\\\"\"\n\
             kind: note\n\
             created: 2024-01-15T09:00:00Z\n\
             updated: 2024-01-15T10:00:00Z\n\
             attendees:\n  - \"Ana\"\n  - \"Bo\"\n\
             transcript: \"[[Meetings/Standup-transcript]]\"\n\
             ---\n"
        );
    }

    #[test]
    fn test_metadata_omits_absent_fields() {
        let config = SyncConfig::default();
        let mut doc = SourceDocument::new("d2");
        doc.updated = Some(jan15(8));
        let record = builder_for(&config).build_metadata(&doc, ArtifactKind::Transcript, None);
        let block = record.render();
        assert!(!block.contains("created:"));
        assert!(block.contains("updated: 2024-01-15T08:00:00Z"));
        assert!(block.contains("attendees: []"));
        assert!(block.contains("title: \"Untitled Note 2024-01-15 08-00\""));
    }

    #[test]
    fn test_backlink_only_for_notes_with_linking() {
        let config = SyncConfig {
            transcripts: TranscriptMode::Separate,
            ..SyncConfig::default()
        };
        let builder = builder_for(&config);
        let link = Some(Path::new("t.md"));
        assert!(builder.build_metadata(&standup(), ArtifactKind::Combined, link).transcript.is_none());
        assert!(builder.build_metadata(&standup(), ArtifactKind::Note, link).transcript.is_some());

        let config = SyncConfig {
            transcripts: TranscriptMode::Separate,
            link_transcripts: false,
            ..SyncConfig::default()
        };
        assert!(builder_for(&config)
            .build_metadata(&standup(), ArtifactKind::Note, link)
            .transcript
            .is_none());
    }

    #[test]
    fn test_rendered_block_parses_back() {
        let config = SyncConfig::default();
        let note = builder_for(&config).prepare_note(&standup(), None).unwrap();
        let map = parse_metadata(&note.content, Path::new("Standup.md")).unwrap().unwrap();
        assert_eq!(map.get("title").and_then(|v| v.as_str()), Some("Standup \"daily\""));
        assert_eq!(map.get("kind").and_then(|v| v.as_str()), Some("note"));
        assert_eq!(
            map.get("created").and_then(|v| v.as_str()).and_then(parse_timestamp),
            Some(jan15(9))
        );
    }

    #[test]
    fn test_prepare_note_layout() {
        let config = SyncConfig::default();
        let note = builder_for(&config).prepare_note(&standup(), None).unwrap();
        assert_eq!(note.kind, ArtifactKind::Note);
        assert_eq!(note.filename, "Standup daily.md");
        assert!(note.content.ends_with("---\n\nAgreed on scope.\n"));
    }

    #[test]
    fn test_missing_content_tree() {
        let config = SyncConfig::default();
        let builder = builder_for(&config);

        let mut doc = standup();
        doc.body = None;
        assert!(matches!(
            builder.prepare_note(&doc, None),
            Err(SyncError::ContentMissing { id }) if id == "d1"
        ));

        doc.body = Some(json!({"type": "paragraph", "content": []}));
        assert!(builder.prepare_combined(&doc, "text").is_err());
        doc.body = Some(json!({"type": "doc"}));
        assert!(builder.extract_for_day_fragment(&doc).is_err());
    }

    #[test]
    fn test_private_notes_section() {
        let config = SyncConfig {
            include_private_notes: true,
            ..SyncConfig::default()
        };
        let mut doc = standup();
        doc.private_notes = Some("  ask about budget  ".to_string());
        let body = builder_for(&config).build_body(&doc, 3).unwrap();
        assert_eq!(
            body,
            "### Private Notes\n\nask about budget\n\n### Enhanced Notes\n\nAgreed on scope."
        );

        doc.private_notes = Some("   ".to_string());
        assert_eq!(builder_for(&config).build_body(&doc, 3).unwrap(), "Agreed on scope.");
    }

    #[test]
    fn test_private_notes_disabled() {
        let config = SyncConfig::default();
        let mut doc = standup();
        doc.private_notes = Some("secret".to_string());
        assert!(!builder_for(&config).build_body(&doc, 2).unwrap().contains("secret"));
    }

    #[test]
    fn test_prepare_transcript_and_combined() {
        let config = SyncConfig::default();
        let builder = builder_for(&config);

        let transcript = builder.prepare_transcript(&standup(), "**Ana:** hi\n").unwrap();
        assert_eq!(transcript.filename, "Standup daily-transcript.md");
        assert!(transcript.content.contains("kind: transcript"));
        assert!(transcript.content.ends_with("---\n\n# Transcript\n\n**Ana:** hi\n"));

        let combined = builder.prepare_combined(&standup(), "**Ana:** hi").unwrap();
        assert!(combined.content.contains("kind: combined"));
        assert!(!combined.content.contains("transcript:"));
        assert!(combined
            .content
            .ends_with("Agreed on scope.\n\n## Transcript\n\n**Ana:** hi\n"));
    }

    #[test]
    fn test_day_fragment_nests_body() {
        let config = SyncConfig {
            include_private_notes: true,
            ..SyncConfig::default()
        };
        let mut doc = standup();
        doc.private_notes = Some("p".to_string());
        let note = builder_for(&config).extract_for_day_fragment(&doc).unwrap();
        assert_eq!(note.metadata.kind, ArtifactKind::DayFragment);
        assert_eq!(note.date, jan15(9));
        assert!(note.body.starts_with("#### Private Notes"));
    }

    #[test]
    fn test_day_fragment_nests_converted_headings() {
        let config = SyncConfig::default();
        let mut doc = standup();
        doc.body = Some(json!({"type": "doc", "content": [
            {"text": "# Recap"},
            {"text": "## Action Items\n- ship it"},
        ]}));
        let note = builder_for(&config).extract_for_day_fragment(&doc).unwrap();
        assert_eq!(note.body, "#### Recap\n\n##### Action Items\n- ship it");

        let standalone = builder_for(&config).build_body(&doc, NOTE_HEADING_LEVEL).unwrap();
        assert!(standalone.starts_with("# Recap"));
    }

    #[test]
    fn test_day_fragment_under_deep_section_uses_bold() {
        let mut config = SyncConfig {
            include_private_notes: true,
            ..SyncConfig::default()
        };
        config.daily.heading_level = 5;
        let mut doc = standup();
        doc.private_notes = Some("p".to_string());
        doc.body = Some(json!({"type": "doc", "content": [{"text": "## Decisions"}]}));
        let note = builder_for(&config).extract_for_day_fragment(&doc).unwrap();
        assert_eq!(
            note.body,
            "**Private Notes**\n\np\n\n**Enhanced Notes**\n\n**Decisions**"
        );
    }

    #[test]
    fn test_timestamp_keeps_milliseconds() {
        let stamp = jan15(10) + chrono::Duration::milliseconds(123);
        assert_eq!(format_timestamp(stamp), "2024-01-15T10:00:00.123Z");
        assert_eq!(format_timestamp(jan15(10)), "2024-01-15T10:00:00Z");
        assert_eq!(parse_timestamp(&format_timestamp(stamp)), Some(stamp));
    }

    #[test]
    fn test_parse_timestamp_accepts_offsets() {
        assert_eq!(parse_timestamp("2024-01-15T10:00:00+01:00"), Some(jan15(9)));
        assert_eq!(parse_timestamp("yesterday"), None);
    }
}
