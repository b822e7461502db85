//! Heading-scoped replace/append over live buffers or persisted text.
//!
//! Every edit is first computed as a single byte-range [`TextEdit`] over the
//! current text. The same edit is then either handed to the store's live buffer
//! or spliced into the persisted text and written back, so both paths produce
//! identical bytes.

use crate::error::Result;
use crate::parser::{fenced_line_mask, parse_heading_line, split_frontmatter};
use crate::store::Store;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

/// Replacement of one byte range of a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEdit {
    pub range: Range<usize>,
    pub text: String,
}

impl TextEdit {
    /// Splice the edit into `content`.
    pub fn apply(&self, content: &str) -> String {
        let mut out =
            String::with_capacity(content.len() - self.range.len() + self.text.len());
        out.push_str(&content[..self.range.start]);
        out.push_str(&self.text);
        out.push_str(&content[self.range.end..]);
        out
    }

    /// Whether applying the edit leaves `content` unchanged.
    pub fn is_noop(&self, content: &str) -> bool {
        content.get(self.range.clone()) == Some(self.text.as_str())
    }
}

/// Result of a section edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The file did not exist and was created.
    Created,
    Written,
    /// Computed text equals the existing text; nothing was written.
    Unchanged,
}

/// Locate the section introduced by `heading` (e.g. `"## Meetings"`).
///
/// The section starts at the heading line and extends to the next heading of
/// equal or shallower level, or end of file. Trailing whitespace before that
/// boundary is not part of the section. Headings inside fenced code or the
/// leading metadata block are ignored.
pub fn locate_section(content: &str, heading: &str) -> Option<Range<usize>> {
    let (level, text) = parse_heading_line(heading.trim())?;
    let fenced = fenced_line_mask(content);
    let metadata_end = split_frontmatter(content).block_len;

    let mut start = None;
    let mut end = content.len();
    let mut offset = 0;

    for (idx, raw) in content.split_inclusive('\n').enumerate() {
        let line_start = offset;
        offset += raw.len();

        if line_start < metadata_end || fenced.get(idx).copied().unwrap_or(false) {
            continue;
        }
        let Some((found_level, found_text)) = parse_heading_line(raw.trim_end()) else {
            continue;
        };

        match start {
            None if found_level == level && found_text == text => start = Some(line_start),
            Some(_) if found_level <= level => {
                end = line_start;
                break;
            }
            _ => {}
        }
    }

    let start = start?;
    Some(start..start + content[start..end].trim_end().len())
}

/// Edit replacing the section under `heading` with `new_content`, or appending
/// `new_content` when the heading is absent.
pub fn section_edit(content: &str, heading: &str, new_content: &str) -> TextEdit {
    if let Some(range) = locate_section(content, heading) {
        return TextEdit {
            range,
            text: new_content.to_string(),
        };
    }

    let separator = if content.is_empty() || content.ends_with("\n\n") {
        ""
    } else if content.ends_with('\n') {
        "\n"
    } else {
        "\n\n"
    };
    let terminator = if new_content.ends_with('\n') { "" } else { "\n" };

    TextEdit {
        range: content.len()..content.len(),
        text: format!("{}{}{}", separator, new_content, terminator),
    }
}

/// Edit replacing the leading `---` block, or prepending `new_block` when there is none.
pub fn leading_block_edit(content: &str, new_block: &str) -> TextEdit {
    let split = split_frontmatter(content);
    let end = if split.yaml.is_some() { split.block_len } else { 0 };
    TextEdit {
        range: 0..end,
        text: new_block.to_string(),
    }
}

/// Pure form of [`SectionEditor::replace_section`].
pub fn replace_section(content: &str, heading: &str, new_content: &str) -> String {
    section_edit(content, heading, new_content).apply(content)
}

/// Pure form of [`SectionEditor::replace_leading_block`].
pub fn replace_leading_block(content: &str, new_block: &str) -> String {
    leading_block_edit(content, new_block).apply(content)
}

/// Applies section edits to files in a [`Store`].
pub struct SectionEditor<'a, S: Store + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: Store + ?Sized> SectionEditor<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Replace (or prepend) the leading metadata block of `path`.
    pub fn replace_leading_block(&mut self, path: &Path, new_block: &str) -> Result<EditOutcome> {
        self.edit(path, false, |content| leading_block_edit(content, new_block))
    }

    /// Replace the section under `heading` in `path`, appending it when absent.
    ///
    /// A missing file is created with `new_content` alone. `force_overwrite`
    /// writes even when the result equals the existing text.
    pub fn replace_section(
        &mut self,
        path: &Path,
        heading: &str,
        new_content: &str,
        force_overwrite: bool,
    ) -> Result<EditOutcome> {
        self.edit(path, force_overwrite, |content| {
            section_edit(content, heading, new_content)
        })
    }

    fn edit(
        &mut self,
        path: &Path,
        force: bool,
        compute: impl Fn(&str) -> TextEdit,
    ) -> Result<EditOutcome> {
        if let Some(buffer) = self.store.live_buffer(path) {
            let current = buffer.text();
            let edit = compute(&current);
            if edit.is_noop(&current) && !force {
                return Ok(EditOutcome::Unchanged);
            }
            debug!(path = %path.display(), range = ?edit.range, "applying edit to live buffer");
            buffer.apply_range_edit(edit.range, &edit.text);
            return Ok(EditOutcome::Written);
        }

        let exists = self.store.exists(path);
        let current = if exists {
            self.store.read(path)?
        } else {
            String::new()
        };

        let edit = compute(&current);
        if exists && edit.is_noop(&current) && !force {
            return Ok(EditOutcome::Unchanged);
        }

        self.store
            .write(path, &edit.apply(&current))
            .map_err(|e| e.into_write_failure(path))?;

        Ok(if exists {
            EditOutcome::Written
        } else {
            EditOutcome::Created
        })
    }
}
