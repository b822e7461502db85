//! Pattern variables, filename sanitization and date formatting.

use crate::config::SubfolderPattern;
use crate::error::{Result, SyncError};
use chrono::{DateTime, Datelike, Timelike, Utc};
use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Variables accepted in filename patterns.
pub const VALID_VARIABLES: &[&str] = &["title", "date", "time", "year", "month", "day", "quarter"];

/// Variables accepted in custom subfolder templates.
pub const DATE_VARIABLES: &[&str] = &["date", "year", "month", "day", "quarter"];

/// Maximum length of a sanitized name, in characters.
pub const MAX_NAME_LEN: usize = 200;

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{([^{}]*)\}").unwrap());

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Characters stripped from names: invalid in paths, or meaningful inside wikilinks.
const INVALID_CHARS: &[char] = &[
    '<', '>', ':', '"', '/', '\\', '|', '?', '*', '#', '^', '[', ']', '{', '}',
];

/// Check that every `{...}` token in `pattern` is one of `allowed`.
pub fn validate_pattern(pattern: &str, allowed: &[&str]) -> Result<()> {
    for cap in VARIABLE.captures_iter(pattern) {
        let token = &cap[1];
        if !allowed.contains(&token) {
            return Err(SyncError::PatternValidation {
                token: token.to_string(),
                valid: allowed
                    .iter()
                    .map(|v| format!("{{{}}}", v))
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }
    }
    Ok(())
}

/// Values substituted into patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternVars {
    pub title: String,
    pub date: String,
    pub time: String,
    pub year: String,
    pub month: String,
    pub day: String,
    pub quarter: String,
}

impl PatternVars {
    /// Build variables for a (sanitized) title and an effective date.
    pub fn new(title: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            date: date.format("%Y-%m-%d").to_string(),
            time: date.format("%H-%M").to_string(),
            year: date.format("%Y").to_string(),
            month: date.format("%m").to_string(),
            day: date.format("%d").to_string(),
            quarter: format!("Q{}", quarter(date)),
        }
    }

    fn get(&self, name: &str) -> Option<&str> {
        match name {
            "title" => Some(&self.title),
            "date" => Some(&self.date),
            "time" => Some(&self.time),
            "year" => Some(&self.year),
            "month" => Some(&self.month),
            "day" => Some(&self.day),
            "quarter" => Some(&self.quarter),
            _ => None,
        }
    }
}

/// Substitute every known variable occurrence in a single pass.
///
/// Unknown tokens are left untouched; validate the pattern first.
fn substitute(pattern: &str, vars: &PatternVars) -> String {
    VARIABLE
        .replace_all(pattern, |caps: &regex::Captures| match vars.get(&caps[1]) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Resolve a filename pattern and sanitize the result.
pub fn resolve_pattern(pattern: &str, vars: &PatternVars) -> String {
    sanitize_filename(&substitute(pattern, vars))
}

/// Make text safe for use as a file name.
///
/// Normalizes unicode, strips invalid characters, collapses whitespace, caps the
/// length and trims. Leading dots are dropped so the file is never hidden.
/// Sanitizing already-sanitized text returns it unchanged.
pub fn sanitize_filename(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| c.is_whitespace() || !(INVALID_CHARS.contains(c) || c.is_control()))
        .collect();
    let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
    let capped: String = collapsed.nfc().take(MAX_NAME_LEN).collect();
    capped
        .trim_start_matches(|c: char| c == '.' || c.is_whitespace())
        .trim_end()
        .to_string()
}

/// Sanitize a `/`-separated path, dropping empty segments.
pub fn sanitize_path(path: &str) -> String {
    path.replace('\\', "/")
        .split('/')
        .map(sanitize_filename)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Title used when a document has none. Minute precision keeps it stable across passes.
pub fn fallback_title(date: DateTime<Utc>) -> String {
    format!("Untitled Note {}", date.format("%Y-%m-%d %H-%M"))
}

/// Calendar quarter (1-4) of a date.
pub fn quarter(date: DateTime<Utc>) -> u32 {
    (date.month() - 1) / 3 + 1
}

/// Resolve a date subfolder. Returns `None` when no subfolder applies.
pub fn resolve_subfolder(pattern: &SubfolderPattern, date: DateTime<Utc>) -> Option<String> {
    let folder = match pattern {
        SubfolderPattern::None => return None,
        SubfolderPattern::Day => date.format("%Y-%m-%d").to_string(),
        SubfolderPattern::Month => date.format("%Y/%m").to_string(),
        SubfolderPattern::YearMonth => date.format("%Y-%m").to_string(),
        SubfolderPattern::YearQuarter => format!("{}/Q{}", date.year(), quarter(date)),
        SubfolderPattern::Custom { template } => {
            substitute(template, &PatternVars::new(String::new(), date))
        }
    };

    let folder = sanitize_path(&folder);
    if folder.is_empty() { None } else { Some(folder) }
}

const MOMENT_TOKENS: &[&str] = &[
    "YYYY", "YY", "MMMM", "MMM", "MM", "M", "DD", "D", "dddd", "ddd", "HH", "H", "mm", "ss", "Q",
];

/// Format a date with a moment-style format string (the daily-note convention).
///
/// Text inside `[...]` is emitted literally; unrecognized characters pass through.
pub fn format_moment(date: DateTime<Utc>, format: &str) -> String {
    let mut out = String::new();
    let mut rest = format;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            match rest.find(']') {
                Some(end) => {
                    out.push_str(&rest[1..end]);
                    rest = &rest[end + 1..];
                }
                None => {
                    out.push_str(&rest[1..]);
                    rest = "";
                }
            }
            continue;
        }

        if let Some(token) = MOMENT_TOKENS.iter().find(|t| rest.starts_with(**t)) {
            out.push_str(&format_token(date, token));
            rest = &rest[token.len()..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }

    out
}

fn format_token(date: DateTime<Utc>, token: &str) -> String {
    match token {
        "YYYY" => format!("{:04}", date.year()),
        "YY" => format!("{:02}", date.year() % 100),
        "MMMM" => date.format("%B").to_string(),
        "MMM" => date.format("%b").to_string(),
        "MM" => format!("{:02}", date.month()),
        "M" => date.month().to_string(),
        "DD" => format!("{:02}", date.day()),
        "D" => date.day().to_string(),
        "dddd" => date.format("%A").to_string(),
        "ddd" => date.format("%a").to_string(),
        "HH" => format!("{:02}", date.hour()),
        "H" => date.hour().to_string(),
        "mm" => format!("{:02}", date.minute()),
        "ss" => format!("{:02}", date.second()),
        "Q" => quarter(date).to_string(),
        _ => token.to_string(),
    }
}
