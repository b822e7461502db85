//! Parsers for the markdown structure the sync core edits.

pub mod code_block;
pub mod frontmatter;
pub mod heading;

pub use code_block::{fenced_line_mask, find_fenced_ranges, FencedRange};
pub use frontmatter::{
    extract_frontmatter, get_str, parse_metadata, split_frontmatter, FrontmatterSplit,
};
pub use heading::{
    format_heading, format_nested_heading, nest_headings, parse_heading_line, MAX_HEADING_LEVEL,
};
