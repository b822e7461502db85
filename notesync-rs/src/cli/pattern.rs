//! Check-pattern command.

use crate::cli::output::Output;
use crate::config::SubfolderPattern;
use crate::error::{ExitCode, Result};
use crate::pattern::{
    resolve_pattern, resolve_subfolder, sanitize_filename, validate_pattern, PatternVars,
    DATE_VARIABLES, VALID_VARIABLES,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, PartialEq, Eq, Serialize)]
struct PatternCheck {
    pattern: String,
    sample: String,
}

fn check(pattern: &str, title: &str, subfolder: bool, now: DateTime<Utc>) -> Result<PatternCheck> {
    let sample = if subfolder {
        validate_pattern(pattern, DATE_VARIABLES)?;
        let template = SubfolderPattern::Custom {
            template: pattern.to_string(),
        };
        resolve_subfolder(&template, now).unwrap_or_default()
    } else {
        validate_pattern(pattern, VALID_VARIABLES)?;
        let vars = PatternVars::new(sanitize_filename(title), now);
        format!("{}.md", resolve_pattern(pattern, &vars))
    };

    Ok(PatternCheck {
        pattern: pattern.to_string(),
        sample,
    })
}

/// Validate `pattern` and print how it resolves for `title` right now.
pub fn run(pattern: &str, title: &str, subfolder: bool, output: &Output) -> Result<ExitCode> {
    output.print(&check(pattern, title, subfolder, Utc::now())?)?;
    Ok(ExitCode::Success)
}
