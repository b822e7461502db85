//! ATX heading detection.

use crate::parser::code_block::fenced_line_mask;

/// Deepest heading level markdown supports.
pub const MAX_HEADING_LEVEL: u8 = 6;

/// Parse a single line as a heading, returning its level and text.
///
/// A line is a heading of level N iff it starts with exactly N `#` characters
/// (1..=6) followed by a space and at least one non-space character.
pub fn parse_heading_line(line: &str) -> Option<(u8, &str)> {
    let hashes = line.bytes().take_while(|&b| b == b'#').count();
    if hashes == 0 || hashes > MAX_HEADING_LEVEL as usize {
        return None;
    }

    let rest = line[hashes..].strip_prefix(' ')?;
    let text = rest.trim();
    if text.is_empty() {
        return None;
    }

    Some((hashes as u8, text))
}

/// Render a heading line, clamping the level to 1..=6.
pub fn format_heading(level: u8, text: &str) -> String {
    let level = level.clamp(1, MAX_HEADING_LEVEL);
    format!("{} {}", "#".repeat(level as usize), text.trim())
}

/// Render a heading that may sit deeper than markdown allows.
///
/// Levels past 6 fall back to a bold line, which never opens a section.
pub fn format_nested_heading(level: usize, text: &str) -> String {
    if level > MAX_HEADING_LEVEL as usize {
        format!("**{}**", text.trim())
    } else {
        format_heading(level as u8, text)
    }
}

/// Shift every heading outside fenced code so the shallowest one lands on `floor`.
///
/// Relative nesting is kept. Content already at or below `floor` is returned unchanged.
pub fn nest_headings(content: &str, floor: usize) -> String {
    let fenced = fenced_line_mask(content);
    let is_open = |idx: usize| !fenced.get(idx).copied().unwrap_or(false);

    let shallowest = content
        .lines()
        .enumerate()
        .filter(|(idx, _)| is_open(*idx))
        .filter_map(|(_, line)| parse_heading_line(line))
        .map(|(level, _)| level as usize)
        .min();
    let shift = match shallowest {
        Some(top) if top < floor => floor - top,
        _ => return content.to_string(),
    };

    let mut nested = String::with_capacity(content.len());
    for (idx, line) in content.split_inclusive('\n').enumerate() {
        let (text, eol) = match line.strip_suffix('\n') {
            Some(text) => (text, "\n"),
            None => (line, ""),
        };
        match parse_heading_line(text).filter(|_| is_open(idx)) {
            Some((level, heading)) => {
                nested.push_str(&format_nested_heading(level as usize + shift, heading))
            }
            None => nested.push_str(text),
        }
        nested.push_str(eol);
    }
    nested
}
