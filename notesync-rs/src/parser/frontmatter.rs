//! Leading `---` metadata block parsing.

use crate::error::{Result, SyncError};
use serde_yaml::{Mapping, Value};
use std::path::Path;

/// Frontmatter extraction result.
#[derive(Debug, Clone)]
pub struct FrontmatterSplit<'a> {
    /// The raw YAML string (without delimiters).
    pub yaml: Option<&'a str>,
    /// The content after the frontmatter.
    pub content: &'a str,
    /// Byte length of the leading block including its closing delimiter line.
    pub block_len: usize,
}

impl FrontmatterSplit<'_> {
    fn none(content: &str) -> FrontmatterSplit<'_> {
        FrontmatterSplit {
            yaml: None,
            content,
            block_len: 0,
        }
    }
}

/// Split content into the leading metadata block and the body.
pub fn split_frontmatter(content: &str) -> FrontmatterSplit<'_> {
    // Frontmatter must start at the very beginning with ---
    if !content.starts_with("---") {
        return FrontmatterSplit::none(content);
    }

    let after_first_delimiter = &content[3..];
    let yaml_start = if after_first_delimiter.starts_with('\n') {
        4
    } else if after_first_delimiter.starts_with("\r\n") {
        5
    } else {
        return FrontmatterSplit::none(content);
    };

    // Empty block: "---\n---"
    let remaining = &content[yaml_start..];
    if remaining.starts_with("---") {
        let after = &remaining[3..];
        if after.is_empty() || after.starts_with('\n') || after.starts_with("\r\n") {
            return finish(content, yaml_start, yaml_start, yaml_start + 3);
        }
    }

    // The closing delimiter must be on its own line: \n---\n or \n--- at EOF
    let closing_pos = remaining
        .find("\n---\n")
        .or_else(|| remaining.find("\n---\r\n"))
        .or_else(|| {
            if remaining.ends_with("\n---") {
                Some(remaining.len() - 4)
            } else {
                None
            }
        });

    match closing_pos {
        Some(pos) => {
            let yaml_end = yaml_start + pos;
            finish(content, yaml_start, yaml_end, yaml_end + 4)
        }
        None => FrontmatterSplit::none(content),
    }
}

/// Build a split where `delimiter_end` points just past the closing `---`.
fn finish(content: &str, yaml_start: usize, yaml_end: usize, delimiter_end: usize) -> FrontmatterSplit<'_> {
    let rest = &content[delimiter_end..];
    let block_len = if rest.starts_with('\n') {
        delimiter_end + 1
    } else if rest.starts_with("\r\n") {
        delimiter_end + 2
    } else {
        delimiter_end
    };

    FrontmatterSplit {
        yaml: Some(&content[yaml_start..yaml_end]),
        content: &content[block_len..],
        block_len,
    }
}

/// Extract frontmatter as a raw YAML string.
pub fn extract_frontmatter(content: &str) -> Option<&str> {
    split_frontmatter(content).yaml
}

/// Parse the metadata block into a mapping, with path context for error messages.
///
/// Returns `Ok(None)` when there is no block. An empty block is an empty mapping.
pub fn parse_metadata(content: &str, path: &Path) -> Result<Option<Mapping>> {
    let Some(yaml) = extract_frontmatter(content) else {
        return Ok(None);
    };

    if yaml.trim().is_empty() {
        return Ok(Some(Mapping::new()));
    }

    let value: Value = serde_yaml::from_str(yaml).map_err(|e| SyncError::InvalidFrontmatter {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    match value {
        Value::Mapping(map) => Ok(Some(map)),
        Value::Null => Ok(Some(Mapping::new())),
        _ => Err(SyncError::InvalidFrontmatter {
            path: path.to_path_buf(),
            message: "metadata block is not a mapping".to_string(),
        }),
    }
}

/// Read a string field from a metadata mapping.
pub fn get_str<'a>(map: &'a Mapping, key: &str) -> Option<&'a str> {
    map.get(key).and_then(Value::as_str)
}
