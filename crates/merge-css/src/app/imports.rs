//! Lexical scanner for `@import` statements.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::model::ImportDirective;

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?ix)
        @import\s+(?:url\(\s*)?
        (?:
            "(?P<double>[^"]+)"
            |'(?P<single>[^']+)'
            |(?P<bare>[^);]+)
        )
        \s*\)?\s*(?P<media>[^;]*)\s*;"#,
    )
    .expect("import pattern is valid")
});

/// Find every `@import` statement in `masked`, in source order.
///
/// `masked` should already have its comments blanked out (see
/// [`mask_comments`](crate::app::mask::mask_comments)); the returned spans then index the
/// original text as well.
pub fn scan_imports(masked: &str) -> Vec<ImportDirective> {
    IMPORT_RE
        .captures_iter(masked)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let target = caps
                .name("double")
                .or_else(|| caps.name("single"))
                .or_else(|| caps.name("bare"))
                .map_or("", |m| m.as_str().trim());
            let media = caps.name("media").map_or("", |m| m.as_str().trim());
            Some(ImportDirective {
                target: target.to_owned(),
                media: media.to_owned(),
                span: whole.range(),
            })
        })
        .collect()
}
