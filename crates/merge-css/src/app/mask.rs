//! Comment masking for lexical scans over stylesheet text.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("comment pattern is valid"));

/// Blank out every `/* ... */` block with spaces of the same byte length.
///
/// Offsets found in the returned text address the same bytes in `css`, so matches can be
/// spliced against the original (comment-preserving) stylesheet. An unterminated comment is
/// left as-is.
pub fn mask_comments(css: &str) -> Cow<'_, str> {
    COMMENT_RE.replace_all(css, |caps: &Captures<'_>| " ".repeat(caps[0].len()))
}
