//! Day-aggregated destinations.
//!
//! Every merge rebuilds the whole section for a day from the complete set of
//! documents for that day, then replaces the section in one edit.

use crate::artifact::{format_timestamp, ArtifactBuilder, DayNote};
use crate::error::Result;
use crate::parser::{format_heading, format_nested_heading};
use crate::section::{EditOutcome, SectionEditor};
use crate::store::{link_target, Store};
use crate::types::SourceDocument;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::debug;

/// A link bullet for a day's link section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayLink {
    pub date: DateTime<Utc>,
    /// Store path of the linked file.
    pub target: PathBuf,
    pub title: String,
}

/// Content fragment: the section heading, then each note's sub-heading,
/// identity and timestamps, and body.
pub fn build_content_fragment(heading: &str, notes: &[DayNote], level: u8) -> String {
    let sub_level = level as usize + 1;
    let mut out = format_heading(level, heading);

    for note in notes {
        let meta = &note.metadata;
        out.push_str("\n\n");
        out.push_str(&format_nested_heading(sub_level, &single_line(&meta.title)));
        out.push_str(&format!("\n**ID:** {}", meta.source_id));
        if let Some(created) = meta.created {
            out.push_str(&format!("\n**Created:** {}", format_timestamp(created)));
        }
        if let Some(updated) = meta.updated {
            out.push_str(&format!("\n**Updated:** {}", format_timestamp(updated)));
        }
        let body = note.body.trim();
        if !body.is_empty() {
            out.push_str("\n\n");
            out.push_str(body);
        }
    }

    out.trim_end().to_string()
}

/// Link fragment: the section heading, then one bullet per link in time order.
pub fn build_link_fragment(heading: &str, links: &[DayLink], level: u8, include_time: bool) -> String {
    let mut sorted: Vec<&DayLink> = links.iter().collect();
    sorted.sort_by_key(|l| l.date);

    let mut out = format_heading(level, heading);
    for link in sorted {
        out.push_str("\n- ");
        if include_time {
            out.push_str(&link.date.format("%H:%M ").to_string());
        }
        out.push_str(&format!(
            "[[{}|{}]]",
            link_target(&link.target),
            link_display(&link.title)
        ));
    }
    out
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Display text that cannot close or split a wikilink.
fn link_display(title: &str) -> String {
    single_line(&title.replace(['[', ']', '|'], ""))
}

/// Groups documents by day and merges day fragments into daily notes.
pub struct DayAggregator<'b, 'a> {
    builder: &'b ArtifactBuilder<'a>,
}

impl<'b, 'a> DayAggregator<'b, 'a> {
    pub fn new(builder: &'b ArtifactBuilder<'a>) -> Self {
        Self { builder }
    }

    fn section_level(&self) -> u8 {
        self.builder.resolver().config().daily.heading_level
    }

    /// The section heading line, e.g. `## Meetings`.
    pub fn heading(&self) -> String {
        let daily = &self.builder.resolver().config().daily;
        format_heading(daily.heading_level, &daily.heading)
    }

    /// Group documents by the calendar day of their effective date.
    ///
    /// Documents without usable content are left out of their day.
    pub fn group_by_day(&self, documents: &[SourceDocument]) -> BTreeMap<NaiveDate, Vec<DayNote>> {
        let mut days: BTreeMap<NaiveDate, Vec<DayNote>> = BTreeMap::new();
        for document in documents {
            match self.builder.extract_for_day_fragment(document) {
                Ok(note) => days.entry(note.date.date_naive()).or_default().push(note),
                Err(e) => debug!(id = %document.id, error = %e, "excluded from day fragment"),
            }
        }
        days
    }

    /// Group links by the calendar day of their date.
    pub fn group_links(&self, links: Vec<DayLink>) -> BTreeMap<NaiveDate, Vec<DayLink>> {
        let mut days: BTreeMap<NaiveDate, Vec<DayLink>> = BTreeMap::new();
        for link in links {
            days.entry(link.date.date_naive()).or_default().push(link);
        }
        days
    }

    pub fn content_fragment(&self, notes: &[DayNote]) -> String {
        let daily = &self.builder.resolver().config().daily;
        build_content_fragment(&daily.heading, notes, self.section_level())
    }

    pub fn link_fragment(&self, links: &[DayLink]) -> String {
        let daily = &self.builder.resolver().config().daily;
        build_link_fragment(&daily.heading, links, self.section_level(), daily.include_time)
    }

    pub fn daily_note_path(&self, day: NaiveDate) -> PathBuf {
        self.builder.resolver().daily_note_path(day)
    }

    /// Write `fragment` as the day's section, creating the daily note when absent.
    pub fn merge_day<S: Store + ?Sized>(
        &self,
        store: &mut S,
        day: NaiveDate,
        fragment: &str,
        force: bool,
    ) -> Result<EditOutcome> {
        let path = self.daily_note_path(day);
        let outcome =
            SectionEditor::new(store).replace_section(&path, &self.heading(), fragment, force)?;
        debug!(path = %path.display(), ?outcome, "merged day section");
        Ok(outcome)
    }
}
