//! Leading `@charset` detection.

use once_cell::sync::Lazy;
use regex::Regex;

static CHARSET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)^\s*@charset\s+(?:"[^"]+"|'[^']+')\s*;\s*"#)
        .expect("charset pattern is valid")
});

/// Stylesheet body with its leading `@charset` statement split off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharsetSplit<'a> {
    /// The trimmed statement, e.g. `@charset "utf-8";`.
    pub statement: Option<&'a str>,
    /// Remaining text after the statement and any whitespace following it.
    pub body: &'a str,
}

/// Split a leading `@charset` statement from `css`.
///
/// Only a statement at the very start (after whitespace) is recognized; later occurrences are
/// ordinary text.
pub fn split_charset(css: &str) -> CharsetSplit<'_> {
    match CHARSET_RE.find(css) {
        Some(found) => CharsetSplit {
            statement: Some(found.as_str().trim()),
            body: &css[found.end()..],
        },
        None => CharsetSplit {
            statement: None,
            body: css,
        },
    }
}
