//! Fenced code block detection, so headings inside code are not treated as headings.

/// Lines covered by a fenced code block (1-indexed, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FencedRange {
    pub start_line: usize,
    pub end_line: usize,
}

/// Opening fence of a line: the fence character and run length (``` or ~~~, 3+).
fn fence_of(line: &str) -> Option<(char, usize)> {
    let c = line.chars().next()?;
    if c != '`' && c != '~' {
        return None;
    }
    let len = line.chars().take_while(|&x| x == c).count();
    (len >= 3).then_some((c, len))
}

/// Find all fenced code blocks. An opening fence without a closing fence is not a block.
pub fn find_fenced_ranges(content: &str) -> Vec<FencedRange> {
    let mut ranges = Vec::new();
    let mut open: Option<(char, usize, usize)> = None;

    let lines: Vec<&str> = content.lines().collect();
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        let line_num = idx + 1;

        match open {
            None => {
                if let Some((c, len)) = fence_of(line) {
                    open = Some((c, len, line_num));
                }
            }
            Some((c, len, start_line)) => {
                let trimmed = line.trim();
                if trimmed.len() >= len && trimmed.chars().all(|x| x == c) {
                    ranges.push(FencedRange {
                        start_line,
                        end_line: line_num,
                    });
                    open = None;
                }
            }
        }

        idx += 1;

        // Unclosed fence: rescan from the line after the opener.
        if idx == lines.len() {
            if let Some((_, _, start_line)) = open.take() {
                idx = start_line;
            }
        }
    }

    ranges
}

/// Per-line flags: `true` when the line (0-indexed) sits inside a fenced block.
pub fn fenced_line_mask(content: &str) -> Vec<bool> {
    let line_count = content.lines().count();
    let mut mask = vec![false; line_count];
    for range in find_fenced_ranges(content) {
        for flag in &mut mask[range.start_line - 1..range.end_line] {
            *flag = true;
        }
    }
    mask
}
