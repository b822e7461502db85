//! Quoting of scalars and sequences for the YAML metadata block.

/// Quote a string as a double-quoted YAML scalar.
///
/// The result always parses back to exactly `value`.
pub fn quote_scalar(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() || c == '\u{2028}' || c == '\u{2029}' => {
                out.push_str(&format!("\\u{:04X}", c as u32))
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Render `key` with a block sequence of quoted scalars, or `[]` when empty.
pub fn render_sequence(key: &str, items: &[String]) -> String {
    if items.is_empty() {
        return format!("{}: []", key);
    }

    let mut out = format!("{}:", key);
    for item in items {
        out.push_str("\n  - ");
        out.push_str(&quote_scalar(item));
    }
    out
}

/// Render a wikilink to `target` as a quoted scalar (`"[[target]]"`).
pub fn quote_wikilink(target: &str) -> String {
    quote_scalar(&format!("[[{}]]", target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_quote_plain() {
        assert_eq!(quote_scalar("Standup"), "\"Standup\"");
    }

    #[test]
    fn test_quote_escapes_quotes_and_backslashes() {
        assert_eq!(quote_scalar(r#"Say "hi" \o/"#), r#""Say \"hi\" \\o/""#);
    }

    #[test]
    fn test_quote_yaml_significant_text() {
        let value: serde_yaml::Value =
            serde_yaml::from_str(&format!("t: {}", quote_scalar("key: value # not a comment"))).unwrap();
        assert_eq!(value["t"].as_str(), Some("key: value # not a comment"));
    }

    #[test]
    fn test_render_empty_sequence() {
        assert_eq!(render_sequence("attendees", &[]), "attendees: []");
    }

    #[test]
    fn test_render_sequence_one_per_line() {
        let items = vec!["Ana".to_string(), "Bo \"B\"".to_string()];
        assert_eq!(
            render_sequence("attendees", &items),
            "attendees:\n  - \"Ana\"\n  - \"Bo \\\"B\\\"\""
        );
    }

    #[test]
    fn test_quote_wikilink() {
        assert_eq!(quote_wikilink("Meetings/Standup-transcript"), "\"[[Meetings/Standup-transcript]]\"");
    }

    proptest! {
        #[test]
        fn prop_quoted_scalar_parses_back(value in "\\PC{0,40}") {
            let yaml = format!("v: {}", quote_scalar(&value));
            let parsed: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
            prop_assert_eq!(parsed["v"].as_str(), Some(value.as_str()));
        }
    }
}
