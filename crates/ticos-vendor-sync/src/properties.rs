//! Line-preserving editor for `.properties` files.
//!
//! Arduino's `library.properties` is a key/value file in the Java
//! properties family. Edits must leave every untouched line exactly as it
//! was, line terminator included, so the document keeps the raw text of
//! each logical line and only regenerates the lines it changes.
//!
//! Supported syntax: `#`/`!` comments, blank lines, `=`, `:` or whitespace
//! separators, and backslash line continuations. Values are kept verbatim;
//! no escape processing is applied.

use thiserror::Error;

/// Errors from editing a properties document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertiesError {
    /// Keys must be non-empty.
    #[error("property key must not be empty")]
    EmptyKey,

    /// Values are written on a single line.
    #[error("value for '{key}' spans multiple lines")]
    MultiLineValue {
        /// The key being set.
        key: String,
    },

    /// A value ending in an odd run of backslashes would join the next line.
    #[error("value for '{key}' ends in an unpaired backslash")]
    TrailingBackslash {
        /// The key being set.
        key: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Line {
    /// Blank line or comment.
    Other {
        text: String,
        ending: &'static str,
    },
    Entry {
        key: String,
        /// Indentation, key and separator, used when the line is regenerated.
        lead: String,
        /// Logical value with continuations joined.
        value: String,
        /// Original physical text, inner terminators included.
        raw: Option<String>,
        /// Terminator of the last physical line; empty at end of file.
        ending: &'static str,
    },
}

impl Line {
    fn ending(&self) -> &'static str {
        match self {
            Self::Other { ending, .. } | Self::Entry { ending, .. } => ending,
        }
    }

    fn set_ending(&mut self, new: &'static str) {
        match self {
            Self::Other { ending, .. } | Self::Entry { ending, .. } => *ending = new,
        }
    }

    fn render_into(&self, out: &mut String) {
        match self {
            Self::Other { text, .. } => out.push_str(text),
            Self::Entry {
                raw: Some(raw), ..
            } => out.push_str(raw),
            Self::Entry {
                lead, value, raw: None, ..
            } => {
                out.push_str(lead);
                out.push_str(value);
            },
        }
        out.push_str(self.ending());
    }
}

/// How [`PropertiesDocument::set`] applied a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The key already held this value.
    Unchanged,
    /// Existing entries were rewritten (count of entries).
    Replaced(usize),
    /// The key was absent and has been appended.
    Appended,
}

/// A parsed properties file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertiesDocument {
    lines: Vec<Line>,
    /// Terminator for appended lines: the first one seen in the file.
    default_ending: &'static str,
}

/// Split `text` into `(content, terminator)` pairs.
fn physical_lines(text: &str) -> Vec<(&str, &'static str)> {
    text.split_inclusive('\n')
        .map(|line| {
            if let Some(content) = line.strip_suffix("\r\n") {
                (content, "\r\n")
            } else if let Some(content) = line.strip_suffix('\n') {
                (content, "\n")
            } else {
                (line, "")
            }
        })
        .collect()
}

impl PropertiesDocument {
    /// Parse `text`. Parsing never fails; unrecognised lines are kept as is.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut physical = physical_lines(text);
        let default_ending = physical
            .iter()
            .map(|(_, ending)| *ending)
            .find(|ending| !ending.is_empty())
            .unwrap_or("\n");
        physical.reverse();

        let mut lines = Vec::new();
        while let Some((first, first_ending)) = physical.pop() {
            let trimmed = first.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                lines.push(Line::Other {
                    text: first.to_owned(),
                    ending: first_ending,
                });
                continue;
            }

            let mut raw = first.to_owned();
            let mut ending = first_ending;
            let mut logical = first.to_owned();
            while continues(&logical) {
                logical.pop();
                match physical.pop() {
                    Some((next, next_ending)) => {
                        raw.push_str(ending);
                        raw.push_str(next);
                        ending = next_ending;
                        logical.push_str(next.trim_start());
                    },
                    None => break,
                }
            }

            let (key, lead, value) = split_entry(&logical);
            lines.push(Line::Entry {
                key,
                lead,
                value,
                raw: Some(raw),
                ending,
            });
        }

        Self {
            lines,
            default_ending,
        }
    }

    /// Value of `key`. When a key repeats, the last entry wins.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Entry { key: k, value, .. } if k == key => Some(value.as_str()),
            _ => None,
        })
    }

    /// Set `key` to `value`.
    ///
    /// Every existing entry for `key` is rewritten in place, keeping its
    /// indentation, separator and line terminator. An absent key is
    /// appended as `key=value`.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty key, or a value that contains a line
    /// break or ends in an unpaired backslash.
    pub fn set(&mut self, key: &str, value: &str) -> Result<SetOutcome, PropertiesError> {
        if key.is_empty() {
            return Err(PropertiesError::EmptyKey);
        }
        if value.contains(['\n', '\r']) {
            return Err(PropertiesError::MultiLineValue {
                key: key.to_owned(),
            });
        }
        if continues(value) {
            return Err(PropertiesError::TrailingBackslash {
                key: key.to_owned(),
            });
        }

        let mut matched = 0usize;
        let mut changed = 0usize;
        for line in &mut self.lines {
            if let Line::Entry {
                key: k,
                value: v,
                raw,
                ..
            } = line
            {
                if k.as_str() != key {
                    continue;
                }
                matched = matched.saturating_add(1);
                if v.as_str() != value {
                    value.clone_into(v);
                    *raw = None;
                    changed = changed.saturating_add(1);
                }
            }
        }

        if matched == 0 {
            if let Some(last) = self.lines.last_mut().filter(|l| l.ending().is_empty()) {
                last.set_ending(self.default_ending);
            }
            self.lines.push(Line::Entry {
                key: key.to_owned(),
                lead: format!("{key}="),
                value: value.to_owned(),
                raw: None,
                ending: self.default_ending,
            });
            return Ok(SetOutcome::Appended);
        }

        if changed == 0 {
            Ok(SetOutcome::Unchanged)
        } else {
            Ok(SetOutcome::Replaced(changed))
        }
    }

    /// Serialize the document.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            line.render_into(&mut out);
        }
        out
    }
}

/// A logical line continues when it ends in an odd number of backslashes.
fn continues(line: &str) -> bool {
    let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
    trailing % 2 == 1
}

/// Split a logical entry line into `(key, lead, value)`.
fn split_entry(line: &str) -> (String, String, String) {
    let indent = line.len().saturating_sub(line.trim_start().len());
    let rest = &line[indent..];

    let mut key_end = rest.len();
    let mut escaped = false;
    for (i, c) in rest.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' | ' ' | '\t' | '\x0c' => {
                key_end = i;
                break;
            },
            _ => {},
        }
    }

    let key = &rest[..key_end];
    let after_key = &rest[key_end..];

    // Bare key: a regenerated line needs a separator of its own.
    if after_key.trim().is_empty() {
        let lead = format!("{}=", &line[..indent.saturating_add(key_end)]);
        return (key.to_owned(), lead, String::new());
    }

    // Separator: optional whitespace, at most one `=`/`:`, optional whitespace.
    let mut sep_len = after_key.len().saturating_sub(after_key.trim_start().len());
    let after_ws = &after_key[sep_len..];
    if after_ws.starts_with('=') || after_ws.starts_with(':') {
        sep_len = sep_len.saturating_add(1);
        let after_sep = &after_key[sep_len..];
        sep_len = sep_len.saturating_add(after_sep.len().saturating_sub(after_sep.trim_start().len()));
    }

    let lead_len = indent.saturating_add(key_end).saturating_add(sep_len);
    (
        key.to_owned(),
        line[..lead_len].to_owned(),
        line[lead_len..].to_owned(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY_PROPERTIES: &str = "\
name=Ticos SDK for C
version=1.0.0
author=Tiwater Technologies
maintainer=Tiwater <support@tiwater.com>
sentence=Ticos IoT SDK for C, ported to Arduino.
paragraph=Supports Ticos Hub on ESP32.
category=Communication
url=https://github.com/tiwater/ticos-sdk-for-c/tree/1.0.0
architectures=*
includes=ti_core.h,ti_iot.h
";

    #[test]
    fn test_parse_and_get() {
        let doc = PropertiesDocument::parse(LIBRARY_PROPERTIES);
        assert_eq!(doc.get("version"), Some("1.0.0"));
        assert_eq!(doc.get("maintainer"), Some("Tiwater <support@tiwater.com>"));
        assert_eq!(doc.get("includes"), Some("ti_core.h,ti_iot.h"));
        assert_eq!(doc.get("missing"), None);
    }

    #[test]
    fn test_unmodified_render_is_identical() {
        let doc = PropertiesDocument::parse(LIBRARY_PROPERTIES);
        assert_eq!(doc.render(), LIBRARY_PROPERTIES);
    }

    #[test]
    fn test_set_replaces_only_target_line() {
        let mut doc = PropertiesDocument::parse(LIBRARY_PROPERTIES);
        assert_eq!(doc.set("version", "2.3.0").unwrap(), SetOutcome::Replaced(1));
        let expected = LIBRARY_PROPERTIES.replace("version=1.0.0", "version=2.3.0");
        assert_eq!(doc.render(), expected);
    }

    #[test]
    fn test_set_same_value_is_unchanged() {
        let mut doc = PropertiesDocument::parse(LIBRARY_PROPERTIES);
        assert_eq!(doc.set("version", "1.0.0").unwrap(), SetOutcome::Unchanged);
        assert_eq!(doc.render(), LIBRARY_PROPERTIES);
    }

    #[test]
    fn test_set_keeps_separator_style() {
        let mut doc = PropertiesDocument::parse("  version : 1.0.0\nurl   http://old\n");
        doc.set("version", "2.0.0").unwrap();
        doc.set("url", "http://new").unwrap();
        assert_eq!(doc.render(), "  version : 2.0.0\nurl   http://new\n");
    }

    #[test]
    fn test_set_appends_missing_key() {
        let mut doc = PropertiesDocument::parse("name=Lib");
        assert_eq!(doc.set("url", "https://x").unwrap(), SetOutcome::Appended);
        assert_eq!(doc.render(), "name=Lib\nurl=https://x\n");
    }

    #[test]
    fn test_set_on_empty_document() {
        let mut doc = PropertiesDocument::parse("");
        doc.set("version", "0.1.0").unwrap();
        assert_eq!(doc.render(), "version=0.1.0\n");
    }

    #[test]
    fn test_comments_and_blank_lines_preserved() {
        let text = "# generated\n\n! legacy comment\nversion=1\n";
        let mut doc = PropertiesDocument::parse(text);
        doc.set("version", "2").unwrap();
        assert_eq!(doc.render(), "# generated\n\n! legacy comment\nversion=2\n");
    }

    #[test]
    fn test_crlf_preserved() {
        let text = "name=Lib\r\nversion=1\r\n";
        let mut doc = PropertiesDocument::parse(text);
        assert_eq!(doc.render(), text);
        doc.set("version", "2").unwrap();
        assert_eq!(doc.render(), "name=Lib\r\nversion=2\r\n");
    }

    #[test]
    fn test_continuation_lines() {
        let text = "paragraph=first \\\n    second\nversion=1\n";
        let mut doc = PropertiesDocument::parse(text);
        assert_eq!(doc.get("paragraph"), Some("first second"));
        assert_eq!(doc.render(), text);

        doc.set("paragraph", "one line").unwrap();
        assert_eq!(doc.render(), "paragraph=one line\nversion=1\n");
    }

    #[test]
    fn test_escaped_separator_in_key() {
        let doc = PropertiesDocument::parse("a\\=b=c\n");
        assert_eq!(doc.get("a\\=b"), Some("c"));
    }

    #[test]
    fn test_duplicate_keys_last_wins_and_all_are_set() {
        let mut doc = PropertiesDocument::parse("version=1\nversion=2\n");
        assert_eq!(doc.get("version"), Some("2"));
        assert_eq!(doc.set("version", "3").unwrap(), SetOutcome::Replaced(2));
        assert_eq!(doc.render(), "version=3\nversion=3\n");
    }

    #[test]
    fn test_rejects_bad_input() {
        let mut doc = PropertiesDocument::parse("");
        assert_eq!(doc.set("", "x"), Err(PropertiesError::EmptyKey));
        assert!(matches!(
            doc.set("version", "1\n2"),
            Err(PropertiesError::MultiLineValue { .. })
        ));
    }

    #[test]
    fn test_set_bare_key_gains_separator() {
        let mut doc = PropertiesDocument::parse("name=Lib\nversion\nurl=x\n");
        assert_eq!(doc.set("version", "2.3.0").unwrap(), SetOutcome::Replaced(1));
        let rendered = doc.render();
        assert_eq!(rendered, "name=Lib\nversion=2.3.0\nurl=x\n");

        let reparsed = PropertiesDocument::parse(&rendered);
        assert_eq!(reparsed.get("version"), Some("2.3.0"));
        assert_eq!(reparsed.get("url"), Some("x"));
    }

    #[test]
    fn test_set_bare_key_with_trailing_spaces() {
        let mut doc = PropertiesDocument::parse("  version   \n");
        doc.set("version", "1").unwrap();
        assert_eq!(doc.render(), "  version=1\n");
    }

    #[test]
    fn test_trailing_backslash_value_rejected() {
        let text = "version=1.0.0\nurl=x\n";
        let mut doc = PropertiesDocument::parse(text);
        assert_eq!(
            doc.set("version", "2.3.0\\"),
            Err(PropertiesError::TrailingBackslash {
                key: "version".to_owned()
            })
        );
        assert_eq!(doc.render(), text);

        // A paired backslash does not join the next line.
        doc.set("version", "2.3.0\\\\").unwrap();
        let reparsed = PropertiesDocument::parse(&doc.render());
        assert_eq!(reparsed.get("version"), Some("2.3.0\\\\"));
        assert_eq!(reparsed.get("url"), Some("x"));
    }

    #[test]
    fn test_mixed_line_endings_preserved() {
        let text = "name=Lib\r\nversion=1\nurl=x\r\nsentence=s";
        let mut doc = PropertiesDocument::parse(text);
        assert_eq!(doc.render(), text);

        doc.set("version", "2").unwrap();
        assert_eq!(doc.render(), "name=Lib\r\nversion=2\nurl=x\r\nsentence=s");

        doc.set("depends", "Other").unwrap();
        assert_eq!(
            doc.render(),
            "name=Lib\r\nversion=2\nurl=x\r\nsentence=s\r\ndepends=Other\r\n"
        );
    }

    #[test]
    fn test_continuation_keeps_inner_terminators() {
        let text = "paragraph=first \\\r\n  second\nversion=1\r\n";
        let doc = PropertiesDocument::parse(text);
        assert_eq!(doc.get("paragraph"), Some("first second"));
        assert_eq!(doc.render(), text);
    }

    #[test]
    fn test_empty_value() {
        let doc = PropertiesDocument::parse("depends=\nkey\n");
        assert_eq!(doc.get("depends"), Some(""));
        assert_eq!(doc.get("key"), Some(""));
    }
}
